//! Pattern tier: ordered regular-expression rules per field.
//!
//! Rules are tried in table order for the queried field. Each rule walks its
//! matches in document order and the first in-range capture wins; an
//! out-of-range capture moves on to the next match, then the next rule.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use super::confidence::tier_confidence;
use super::types::{AllocationTier, Candidate, Field, Tier};
use super::validation::{is_valid_percent, normalize_decimal_comma, parse_percent};
use super::AllocationError;

/// Post-capture normalization of the matched number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTransform {
    #[default]
    None,
    /// `23,5` → `23.5`
    CommaDecimal,
}

impl ValueTransform {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            Self::None => raw.trim().to_string(),
            Self::CommaDecimal => normalize_decimal_comma(raw.trim()),
        }
    }
}

/// A compiled rule: capture group 1 holds the percentage number.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub field: Field,
    pub name: String,
    pub regex: Regex,
    pub transform: ValueTransform,
}

impl ExtractionRule {
    /// Compile a case-insensitive rule.
    pub fn new(
        field: Field,
        name: &str,
        pattern: &str,
        transform: ValueTransform,
    ) -> Result<Self, AllocationError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| AllocationError::InvalidPattern {
                rule: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            field,
            name: name.to_string(),
            regex,
            transform,
        })
    }

    /// First in-range capture of the rule over the whole text. Silent on no match.
    pub fn apply(&self, text: &str) -> Option<f64> {
        self.regex.captures_iter(text).find_map(|caps| {
            let raw = caps.get(1)?.as_str();
            let value = parse_percent(&self.transform.apply(raw))?;
            if is_valid_percent(value) {
                Some(value)
            } else {
                tracing::debug!(rule = %self.name, value, "Skipping out-of-range capture");
                None
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Default rule table
// ═══════════════════════════════════════════════════════════

/// Percentage number, decimal point or decimal comma.
const NUM: &str = r"\b(\d+(?:[.,]\d+)?)\s*%";

/// Verb phrases linking an asset class to its share.
const VERB: &str = r"(?:accounts?\s+for|accounted\s+for|represents?|represented|comprises?|comprised|makes?\s+up|made\s+up|amounts?\s+to|amounted\s+to|stands?\s+at|stood\s+at|remains?\s+at|remained\s+at|held(?:\s+steady)?(?:\s+(?:at|near))?|totals?|totalled|is|are|was|were)";

/// Optional hedge between verb and number.
const QUAL: &str = r"(?:\s+(?:approximately|roughly|about|around|nearly|some|just\s+under|just\s+over))?";

/// Optional adverb between subject and verb.
const ADVERB: &str = r"(?:,?\s+which)?(?:\s+(?:currently|still|now|again|together))?";

/// "<subject> [which] [currently] <verb> [about] N%"
fn subject_verb(subject: &str) -> String {
    format!(r"{subject}{ADVERB}\s+{VERB}{QUAL}\s+{NUM}")
}

/// "N% [of|in] <subject>"
fn share_of(subject: &str) -> String {
    format!(r"{NUM}\s+(?:of\s+|in\s+)?(?:the\s+)?{subject}")
}

const FOREIGN_BONDS: &str = r"\bforeign[- ]currency\s+bonds?";
const EQUITIES: &str = r"\bequit(?:y|ies)";
const CHF_BONDS: &str =
    r"\b(?:bonds?|investments?)\s+(?:denominated\s+)?in\s+(?:swiss\s+francs?\s*)?\(?chf\)?";
const CHF_DENOMINATED: &str = r"\bdenominated\s+in\s+(?:swiss\s+)?(?:francs?\s*)?\(?chf\)?";
const CHF_ADJECTIVE: &str = r"\b(?:chf|swiss[- ]francs?)\s+bonds?";
const REAL_ESTATE: &str = r"\breal[- ]estate";
const PRECIOUS_METALS: &str = r"\bprecious\s+metals?";

/// Rule source table: (field, name, pattern), in priority order per field.
fn default_rule_sources() -> Vec<(Field, &'static str, String)> {
    vec![
        // Foreign currency bonds
        (Field::ForeignCurrencyBonds, "foreign_bonds_verb", subject_verb(FOREIGN_BONDS)),
        (Field::ForeignCurrencyBonds, "foreign_bonds_share", share_of(FOREIGN_BONDS)),
        // Equities
        (Field::Equities, "equities_verb", subject_verb(EQUITIES)),
        (Field::Equities, "equities_share", share_of(EQUITIES)),
        // Bonds in CHF
        (Field::BondsChf, "chf_denominated_verb", subject_verb(CHF_DENOMINATED)),
        (Field::BondsChf, "chf_bonds_verb", subject_verb(CHF_BONDS)),
        (Field::BondsChf, "chf_adjective_verb", subject_verb(CHF_ADJECTIVE)),
        (Field::BondsChf, "chf_bonds_share", share_of(CHF_ADJECTIVE)),
        // Real estate
        (Field::RealEstate, "real_estate_verb", subject_verb(REAL_ESTATE)),
        (
            Field::RealEstate,
            "real_estate_clause",
            format!(r"{REAL_ESTATE}\b[^.%]{{0,80}}?\b(?:accounts?\s+for|represents?|comprises?){QUAL}\s+{NUM}"),
        ),
        (Field::RealEstate, "real_estate_share", share_of(REAL_ESTATE)),
        // Precious metals
        (
            Field::PreciousMetals,
            "precious_metals_invests",
            format!(r"\b(?:invests?|holds?){QUAL}\s+{NUM}\s+(?:in\s+|of\s+)?(?:the\s+)?(?:precious\s+metals?|gold)"),
        ),
        (Field::PreciousMetals, "precious_metals_verb", subject_verb(PRECIOUS_METALS)),
        (Field::PreciousMetals, "precious_metals_share", share_of(PRECIOUS_METALS)),
    ]
}

/// Compiled once. Patterns are constants, so a failure here is a programmer error.
static DEFAULT_RULES: LazyLock<Vec<ExtractionRule>> = LazyLock::new(|| {
    default_rule_sources()
        .into_iter()
        .map(|(field, name, pattern)| {
            ExtractionRule::new(field, name, &pattern, ValueTransform::CommaDecimal)
                .expect("default allocation rule is invalid")
        })
        .collect()
});

// ═══════════════════════════════════════════════════════════
// Rule files
// ═══════════════════════════════════════════════════════════

/// One `[[rule]]` entry of a TOML rule file.
#[derive(Debug, Deserialize)]
struct RuleDef {
    field: Field,
    name: String,
    pattern: String,
    #[serde(default)]
    transform: ValueTransform,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rule: Vec<RuleDef>,
}

// ═══════════════════════════════════════════════════════════
// Library
// ═══════════════════════════════════════════════════════════

/// Ordered rule table; the pattern tier.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    rules: Vec<ExtractionRule>,
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
        }
    }
}

impl PatternLibrary {
    pub fn new(rules: Vec<ExtractionRule>) -> Self {
        Self { rules }
    }

    /// A library with no rules: every field misses.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Parse rules from TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self, AllocationError> {
        let file: RuleFile =
            toml::from_str(source).map_err(|e| AllocationError::RuleFileParse(e.to_string()))?;
        let rules = file
            .rule
            .into_iter()
            .map(|def| ExtractionRule::new(def.field, &def.name, &def.pattern, def.transform))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Load rules from a TOML file on disk.
    pub fn from_file(path: &Path) -> Result<Self, AllocationError> {
        let source = std::fs::read_to_string(path)?;
        let library = Self::from_toml_str(&source)?;
        tracing::info!(
            path = %path.display(),
            rule_count = library.rules.len(),
            "Loaded allocation rule file"
        );
        Ok(library)
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules targeting one field, in priority order.
    pub fn rules_for(&self, field: Field) -> impl Iterator<Item = &ExtractionRule> {
        self.rules.iter().filter(move |r| r.field == field)
    }
}

impl AllocationTier for PatternLibrary {
    fn tier(&self) -> Tier {
        Tier::Pattern
    }

    fn match_field(&self, text: &str, field: Field) -> Option<Candidate> {
        self.rules_for(field).find_map(|rule| {
            rule.apply(text).map(|value| Candidate {
                field,
                value,
                tier: Tier::Pattern,
                confidence: tier_confidence::PATTERN,
                detail: rule.name.clone(),
            })
        })
    }
}
