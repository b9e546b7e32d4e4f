use crate::pipeline::allocation::Field;

use super::types::PromptRequest;

pub const EXTRACTION_SYSTEM_PROMPT: &str =
    "You are a precise data extraction assistant. Always return valid JSON.";

/// Longest source text forwarded to a provider, in characters.
pub const MAX_PROMPT_TEXT_CHARS: usize = 12_000;

/// Longest performance-table excerpt forwarded to a provider, in characters.
pub const MAX_TABLE_TEXT_CHARS: usize = 5_000;

/// Build the extraction prompt for the unresolved fields only.
pub fn build_allocation_prompt(text: &str, fields: &[Field]) -> String {
    let expected = fields
        .iter()
        .map(|f| format!("- {} ({})", f.as_str(), f.label()))
        .collect::<Vec<_>>()
        .join("\n");

    let example = fields
        .iter()
        .map(|f| format!("  \"{}\": 0.0", f.as_str()))
        .collect::<Vec<_>>()
        .join(",\n");

    let source = truncate_chars(text, MAX_PROMPT_TEXT_CHARS);

    format!(
        r#"Extract strategic allocation percentages from the text below.

EXPECTED FIELDS (return ONLY these keys):
{expected}

INSTRUCTIONS:
1. Find the percentage allocation of each listed asset class.
2. Return ONLY a JSON object with the field keys above and numeric values.
3. Use the bare number (43, not "43%"). Decimals are allowed (23.5). 0 is a valid value.
4. If an asset class is not mentioned, omit its key.
5. Do not return any other keys.

<document>
{source}
</document>

Return format:
{{
{example}
}}

JSON OUTPUT:"#
    )
}

/// Assemble the full request sent to every provider in a run.
pub fn build_prompt_request(text: &str, fields: &[Field]) -> PromptRequest {
    PromptRequest {
        system: EXTRACTION_SYSTEM_PROMPT.to_string(),
        prompt: build_allocation_prompt(text, fields),
        fields: fields.to_vec(),
    }
}

/// Build the prompt asking for amounts of performance rows the table
/// reader could not map.
pub fn build_performance_prompt(table_text: &str, labels: &[&str]) -> String {
    let expected = labels
        .iter()
        .map(|l| format!("- {l}"))
        .collect::<Vec<_>>()
        .join("\n");

    let source = truncate_chars(table_text, MAX_TABLE_TEXT_CHARS);

    format!(
        r#"Extract investment performance amounts from the table below.

EXPECTED CATEGORIES:
{expected}

INSTRUCTIONS:
1. Find each category in the table, even if its wording differs slightly.
2. Extract the corresponding amount (in CHF millions).
3. Return ONLY a JSON object with the category names above as keys and amounts as values.
4. If a category is not found, omit it.
5. Remove all formatting (commas, spaces) from numbers. Keep the sign of negative amounts (-582).

<table>
{source}
</table>

Return format:
{{
  "Money market investments": "452",
  "Foreign currency bonds:": "15829"
}}

JSON OUTPUT:"#
    )
}

/// Request for missing performance rows. No allocation fields are asked for.
pub fn build_performance_request(table_text: &str, labels: &[&str]) -> PromptRequest {
    PromptRequest {
        system: EXTRACTION_SYSTEM_PROMPT.to_string(),
        prompt: build_performance_prompt(table_text, labels),
        fields: Vec::new(),
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}
