use std::collections::BTreeMap;

use super::layout::{strategic_column, COLUMN_COUNT, MISSING_MARKER, PERFORMANCE_TABLE_MAPPING};
use crate::pipeline::allocation::{ExtractionResult, Field};
use crate::pipeline::navigation::PerformanceTable;

/// The single DATA row of a report. Unfilled cells render as `NA`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    cells: Vec<Option<String>>,
}

impl ReportRow {
    pub fn new(year: i32) -> Self {
        let mut cells = vec![None; COLUMN_COUNT];
        cells[0] = Some(year.to_string());
        Self { cells }
    }

    pub fn year(&self) -> Option<&str> {
        self.cell(0)
    }

    pub fn cell(&self, column: usize) -> Option<&str> {
        self.cells.get(column).and_then(|c| c.as_deref())
    }

    /// Set a cell; out-of-range columns are ignored.
    pub fn set(&mut self, column: usize, value: impl Into<String>) {
        if let Some(cell) = self.cells.get_mut(column) {
            *cell = Some(value.into());
        }
    }

    /// Copy mapped performance amounts into their columns.
    /// Returns how many mapped labels were found.
    pub fn fill_performance(&mut self, table: &PerformanceTable) -> usize {
        let mut found = 0;
        for (label, column) in PERFORMANCE_TABLE_MAPPING {
            match table.amount(label) {
                Some(amount) => {
                    self.set(*column, amount);
                    found += 1;
                }
                None => tracing::debug!(label = %label, column, "Performance label not on page"),
            }
        }
        if found < PERFORMANCE_TABLE_MAPPING.len() {
            tracing::warn!(
                found,
                expected = PERFORMANCE_TABLE_MAPPING.len(),
                "Some performance columns left as NA"
            );
        }
        found
    }

    /// Mapped performance labels whose column is still empty.
    pub fn missing_performance_labels(&self) -> Vec<&'static str> {
        PERFORMANCE_TABLE_MAPPING
            .iter()
            .filter(|(_, column)| self.cells[*column].is_none())
            .map(|(label, _)| *label)
            .collect()
    }

    /// Fill still-empty performance columns from label → amount pairs.
    /// Returns how many columns were set.
    pub fn fill_performance_amounts(&mut self, amounts: &BTreeMap<String, String>) -> usize {
        let mut filled = 0;
        for (label, column) in PERFORMANCE_TABLE_MAPPING {
            if self.cells[*column].is_some() {
                continue;
            }
            if let Some(amount) = amounts.get(*label) {
                self.set(*column, amount.as_str());
                filled += 1;
            }
        }
        filled
    }

    /// Copy resolved allocation percentages into columns 28–32.
    pub fn fill_allocation(&mut self, result: &ExtractionResult) {
        for field in Field::ALL {
            if let Some(value) = result.value(field) {
                self.set(strategic_column(field), format_percent(value));
            }
        }
    }

    /// All cells as text, `NA` for missing ones.
    pub fn rendered(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|c| c.clone().unwrap_or_else(|| MISSING_MARKER.to_string()))
            .collect()
    }

    /// Data columns (1..) still empty.
    pub fn missing_columns(&self) -> Vec<usize> {
        (1..COLUMN_COUNT).filter(|c| self.cells[*c].is_none()).collect()
    }
}

/// `28.0` → `28`, `23.5` → `23.5`.
pub fn format_percent(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
