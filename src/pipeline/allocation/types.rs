use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::inference::ProviderFailure;

/// One of the five strategic-allocation percentage targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "foreign_currency_bonds_pct")]
    ForeignCurrencyBonds,
    #[serde(rename = "equities_pct")]
    Equities,
    #[serde(rename = "bonds_chf_pct")]
    BondsChf,
    #[serde(rename = "real_estate_pct")]
    RealEstate,
    #[serde(rename = "precious_metals_pct")]
    PreciousMetals,
}

impl Field {
    /// All fields, in report-column order.
    pub const ALL: [Field; 5] = [
        Field::ForeignCurrencyBonds,
        Field::Equities,
        Field::BondsChf,
        Field::RealEstate,
        Field::PreciousMetals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForeignCurrencyBonds => "foreign_currency_bonds_pct",
            Self::Equities => "equities_pct",
            Self::BondsChf => "bonds_chf_pct",
            Self::RealEstate => "real_estate_pct",
            Self::PreciousMetals => "precious_metals_pct",
        }
    }

    /// Asset-class name as it appears in the report prose.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ForeignCurrencyBonds => "Foreign currency bonds",
            Self::Equities => "Equities",
            Self::BondsChf => "Bonds in CHF",
            Self::RealEstate => "Real estate",
            Self::PreciousMetals => "Precious metals",
        }
    }

    /// Lower-case label terms used by the proximity tier.
    /// Multi-word terms are matched as consecutive words; a term ending in
    /// `*` matches any word with that prefix.
    pub fn label_terms(&self) -> &'static [&'static str] {
        match self {
            Self::ForeignCurrencyBonds => &["foreign currency bond*", "foreign bond*"],
            Self::Equities => &["equit*"],
            Self::BondsChf => &["denominated in", "chf", "swiss franc*"],
            Self::RealEstate => &["real estate", "real-estate", "propert*"],
            Self::PreciousMetals => &["precious metal*", "gold"],
        }
    }

    /// Resolve a field from its snake-case name or its human label.
    pub fn from_key(key: &str) -> Option<Field> {
        let normalized = key.trim().to_lowercase().replace(['-', ' '], "_");
        Field::ALL.into_iter().find(|f| {
            normalized == f.as_str()
                || normalized == f.as_str().trim_end_matches("_pct")
                || normalized == f.label().to_lowercase().replace(' ', "_")
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction strategy, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Pattern,
    Proximity,
    Llm,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern => write!(f, "pattern"),
            Self::Proximity => write!(f, "proximity"),
            Self::Llm => write!(f, "llm"),
        }
    }
}

/// A proposed value for a field, produced by one tier attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub field: Field,
    pub value: f64,
    pub tier: Tier,
    pub confidence: f32,
    /// Rule name, matched label, or provider name.
    pub detail: String,
}

/// Final value of a resolved field plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub value: f64,
    pub tier: Tier,
    pub confidence: f32,
    pub detail: String,
}

impl From<Candidate> for Resolution {
    fn from(c: Candidate) -> Self {
        Self {
            value: c.value,
            tier: c.tier,
            confidence: c.confidence,
            detail: c.detail,
        }
    }
}

/// Outcome of one extraction run. Fields missing from the map are unresolved.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    run_id: Uuid,
    resolved: BTreeMap<Field, Resolution>,
    provider_failures: Vec<ProviderFailure>,
}

impl ExtractionResult {
    pub(crate) fn new(
        run_id: Uuid,
        resolved: BTreeMap<Field, Resolution>,
        provider_failures: Vec<ProviderFailure>,
    ) -> Self {
        Self {
            run_id,
            resolved,
            provider_failures,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn value(&self, field: Field) -> Option<f64> {
        self.resolved.get(&field).map(|r| r.value)
    }

    pub fn tier(&self, field: Field) -> Option<Tier> {
        self.resolved.get(&field).map(|r| r.tier)
    }

    pub fn resolution(&self, field: Field) -> Option<&Resolution> {
        self.resolved.get(&field)
    }

    pub fn resolved(&self) -> &BTreeMap<Field, Resolution> {
        &self.resolved
    }

    /// Fields no tier could resolve, in report-column order.
    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| !self.resolved.contains_key(f))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.resolved.len() == Field::ALL.len()
    }

    pub fn provider_failures(&self) -> &[ProviderFailure] {
        &self.provider_failures
    }
}

/// A local extraction strategy with the uniform `(text, field)` contract.
pub trait AllocationTier {
    fn tier(&self) -> Tier;

    fn match_field(&self, text: &str, field: Field) -> Option<Candidate>;
}
