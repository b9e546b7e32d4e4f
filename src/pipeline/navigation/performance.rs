use scraper::{ElementRef, Html, Selector};

use super::strategic::collapse_whitespace;
use super::NavigationError;

/// One row of the performance table: category label and cleaned amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceEntry {
    pub label: String,
    pub amount: String,
}

/// Rows of the first `table.table--chart`, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerformanceTable {
    entries: Vec<PerformanceEntry>,
}

impl PerformanceTable {
    pub fn entries(&self) -> &[PerformanceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `label: amount` lines, one per row, for a remote prompt.
    pub fn as_prompt_text(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.label, e.amount))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Amount for an exact label. The first row wins on duplicates.
    pub fn amount(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.amount.as_str())
    }
}

/// Parse the performance table.
///
/// Rows with fewer than two cells, an empty label, or an empty amount are
/// skipped. Footnote markers (`sup`) are dropped from labels.
pub fn read_performance_table(html: &str) -> Result<PerformanceTable, NavigationError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table.table--chart")?;
    let row_sel = selector("tbody tr")?;
    let cell_sel = selector("td")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or(NavigationError::TableNotFound)?;

    let mut entries = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if cells.len() < 2 {
            continue;
        }

        let mut raw_label = String::new();
        text_excluding(cells[0], "sup", &mut raw_label);
        let label = collapse_whitespace(&raw_label);
        if label.is_empty() {
            continue;
        }

        let amount = clean_amount(&cells[1].text().collect::<String>());
        if amount.is_empty() {
            continue;
        }

        tracing::debug!(label = %label, amount = %amount, "Performance row");
        entries.push(PerformanceEntry { label, amount });
    }

    tracing::info!(rows = entries.len(), "Read performance table");
    Ok(PerformanceTable { entries })
}

fn selector(css: &str) -> Result<Selector, NavigationError> {
    Selector::parse(css).map_err(|e| NavigationError::Selector(e.to_string()))
}

/// Concatenate descendant text, skipping elements named `skip`.
fn text_excluding(element: ElementRef<'_>, skip: &str, out: &mut String) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if child_el.value().name() != skip {
                text_excluding(child_el, skip, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

/// Strip non-breaking spaces, narrow no-break spaces, spaces and thousands
/// separators: `1 234,5` → `12345`, `-1,234` → `-1234`.
pub fn clean_amount(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '\u{a0}' | '\u{202f}' | ' ' | ','))
        .collect()
}
