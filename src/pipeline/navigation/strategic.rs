use scraper::{ElementRef, Html, Selector};

use super::NavigationError;

/// Heading that opens the strategic allocation prose.
pub const STRATEGIC_HEADING: &str = "Structure of the strategic allocation";

/// Anchor id carried by the same heading on the live site.
const STRATEGIC_ANCHOR: &str = "a#a4";

/// Text of the strategic allocation section: every non-empty paragraph after
/// the heading, up to the next `h2`/`h3`/`h4`, joined with single spaces.
pub fn extract_strategic_text(html: &str) -> Result<String, NavigationError> {
    let document = Html::parse_document(html);
    let heading = find_heading(&document)?.ok_or(NavigationError::SectionNotFound)?;

    let mut paragraphs = Vec::new();
    for sibling in heading.next_siblings() {
        let Some(element) = ElementRef::wrap(sibling) else {
            continue;
        };
        match element.value().name() {
            "p" => {
                let text = collapse_whitespace(&element.text().collect::<String>());
                if !text.is_empty() {
                    paragraphs.push(text);
                }
            }
            "h2" | "h3" | "h4" => break,
            _ => {}
        }
    }

    let text = paragraphs.join(" ");
    tracing::info!(
        paragraphs = paragraphs.len(),
        chars = text.chars().count(),
        "Extracted strategic allocation text"
    );
    Ok(text)
}

fn find_heading(document: &Html) -> Result<Option<ElementRef<'_>>, NavigationError> {
    let h3 = Selector::parse("h3").map_err(|e| NavigationError::Selector(e.to_string()))?;
    let wanted = STRATEGIC_HEADING.to_lowercase();
    let by_text = document.select(&h3).find(|h| {
        h.text()
            .collect::<String>()
            .to_lowercase()
            .contains(&wanted)
    });
    if by_text.is_some() {
        return Ok(by_text);
    }

    let anchor =
        Selector::parse(STRATEGIC_ANCHOR).map_err(|e| NavigationError::Selector(e.to_string()))?;
    let by_anchor = document.select(&anchor).next().and_then(|a| {
        a.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "h3")
    });
    if by_anchor.is_some() {
        tracing::debug!("Strategic heading located through its anchor");
    }
    Ok(by_anchor)
}

/// Collapse runs of whitespace (including non-breaking spaces) to one space.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <h2>Investments</h2>
  <p>Intro paragraph that must not be included.</p>
  <h3>Structure of the strategic allocation</h3>
  <p>Foreign currency bonds account for <strong>37%</strong> of the allocations.</p>
  <div class="figure">chart</div>
  <p>   </p>
  <p>Equities account
     for 28%.</p>
  <h4>Footnotes</h4>
  <p>Real estate accounts for 99%.</p>
</body></html>"#;

    #[test]
    fn collects_paragraphs_until_next_heading() {
        let text = extract_strategic_text(PAGE).unwrap();
        assert_eq!(
            text,
            "Foreign currency bonds account for 37% of the allocations. Equities account for 28%."
        );
    }

    #[test]
    fn heading_match_is_case_insensitive() {
        let html = "<h3>STRUCTURE OF THE STRATEGIC ALLOCATION</h3><p>Gold 2%.</p>";
        assert_eq!(extract_strategic_text(html).unwrap(), "Gold 2%.");
    }

    #[test]
    fn anchor_fallback_finds_heading() {
        let html = r#"<h3><a id="a4"></a>Asset mix</h3><p>Equities account for 28%.</p><h3>Next</h3><p>x</p>"#;
        assert_eq!(extract_strategic_text(html).unwrap(), "Equities account for 28%.");
    }

    #[test]
    fn missing_section_is_an_error() {
        let err = extract_strategic_text("<h3>Other</h3><p>1%</p>").unwrap_err();
        assert!(matches!(err, NavigationError::SectionNotFound));
    }

    #[test]
    fn heading_without_paragraphs_gives_empty_text() {
        let html = "<h3>Structure of the strategic allocation</h3><h3>Next</h3>";
        assert_eq!(extract_strategic_text(html).unwrap(), "");
    }

    #[test]
    fn whitespace_collapsed() {
        assert_eq!(collapse_whitespace("  a \n\t b\u{a0}c "), "a b c");
    }
}
