//! Fixed report layout: column codes, descriptions, table-label mapping, and
//! per-column metadata.
//!
//! Column 0 is the year. Columns 1–27 are performance amounts (CHF
//! millions), columns 28–32 the strategic allocation percentages.

use crate::config;
use crate::pipeline::allocation::Field;

/// Total cells in a DATA row, year included.
pub const COLUMN_COUNT: usize = 33;

/// Last performance column.
pub const LAST_PERFORMANCE_COLUMN: usize = 27;

/// First strategic allocation column.
pub const FIRST_STRATEGIC_COLUMN: usize = 28;

/// Last strategic allocation column.
pub const LAST_STRATEGIC_COLUMN: usize = COLUMN_COUNT - 1;

/// Cell value written for anything that could not be scraped.
pub const MISSING_MARKER: &str = "NA";

pub const COLUMN_CODES: [&str; COLUMN_COUNT] = [
    "",
    "COMPENSWISS.MONEYMARKET.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.LOANS.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.DOMESTICBONDSLOCALFX.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.FOREIGNBONDS.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.GOVERNMENTBONDS.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.ILBONDS.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.EMBONDS.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.CORPORATEBONDS.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.HIGHYIELD.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.OTHERBONDS.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.EQUITIES.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.LARGECAPEQUITIES.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.EMEQUITIES.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.SMALLCAPEQUITIES.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.REALESTATE.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.DOMESTICREALESTATE.LEVEL.DIRECT.A.1@COMPENSWISS",
    "COMPENSWISS.DOMESTICREALESTATE.LEVEL.INDIRECT.A.1@COMPENSWISS",
    "COMPENSWISS.FOREIGNREALESTATE.LEVEL.INDIRECT.A.1@COMPENSWISS",
    "COMPENSWISS.FOREIGNREALESTATE.LEVEL.DIRECT.A.1@COMPENSWISS",
    "COMPENSWISS.GOLD.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.MULTIASSET.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.TOTAL.LEVEL.UNHEDGED.A.1@COMPENSWISS",
    "COMPENSWISS.CURRENCYHEDGING.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.INTERESTRATEHEDGING.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.EQUITYOVERLAY.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.TOTAL.LEVEL.HEDGED.A.1@COMPENSWISS",
    "COMPENSWISS.CASH.LEVEL.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.FOREIGNBONDS.TARGETALLOCATION.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.EQUITIES.TARGETALLOCATION.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.DOMESTICBONDSLOCALFX.TARGETALLOCATION.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.REALESTATE.TARGETALLOCATION.NONE.A.1@COMPENSWISS",
    "COMPENSWISS.PRECIOUSMETALS.TARGETALLOCATION.NONE.A.1@COMPENSWISS",
];

pub const COLUMN_DESCRIPTIONS: [&str; COLUMN_COUNT] = [
    "",
    "Detailed investment perfomance, Money market investment, Amount",
    "Detailed investment perfomance, Loans, Amount",
    "Detailed investment perfomance, Swiss francs bonds, Amount",
    "Detailed investment perfomance, Foreign currency bonds, Amount",
    "Detailed investment perfomance, Government bonds, Amount",
    "Detailed investment perfomance, Inflation-protected Bonds, Amount",
    "Detailed investment perfomance, Emerging markets Bonds, Amount",
    "Detailed investment perfomance, Corporate bonds, Amount",
    "Detailed investment perfomance, Higher Yielding Bonds, Amount",
    "Detailed investment perfomance, Securitised Bonds, Amount",
    "Detailed investment perfomance, Equities, Amount",
    "Detailed investment perfomance, Large Caps, Amount",
    "Detailed investment perfomance, Emerging markets Bonds, Amount",
    "Detailed investment perfomance, Small and mid caps, Amount",
    "Detailed investment perfomance, Real Estate, Amount",
    "Detailed investment perfomance, Swiss Direct, Amount",
    "Detailed investment perfomance, Swiss Listed, Amount",
    "Detailed investment perfomance, Global Listed, Amount",
    "Detailed investment perfomance, Global not listed, Amount",
    "Detailed investment perfomance, Gold, Amount",
    "Detailed investment perfomance, Multi-Asset Portfolio, Amount",
    "Detailed investment perfomance, Market Portfolio, Amount",
    "Detailed investment perfomance, Currency Hedging, Amount",
    "Detailed investment perfomance, Interest Rate Hedging, Amount",
    "Detailed investment perfomance, Equity Overlay, Amount",
    "Detailed investment perfomance, Market Portfolio After Hedging, Amount",
    "Detailed investment perfomance, Basic Portfolio - Treasury, Amount",
    "Structure of the strategic allocation, Foreign Currency Bonds",
    "Structure of the strategic allocation, Equities",
    "Structure of the strategic allocation, Bonds in CHF",
    "Structure of the strategic allocation, Real Estate",
    "Structure of the strategic allocation, Precious Metals",
];

/// Performance-table label → report column. Labels are matched exactly,
/// trailing colons included. Columns 24 and 25 have no table row.
pub const PERFORMANCE_TABLE_MAPPING: &[(&str, usize)] = &[
    ("Money market investments", 1),
    ("Loans to public entities in Switzerland", 2),
    ("Swiss francs bonds", 3),
    ("Foreign currency bonds:", 4),
    ("Government bonds", 5),
    ("Inflation-protected bonds", 6),
    ("Emerging market bonds", 7),
    ("Corporate bonds", 8),
    ("High yield bonds", 9),
    ("Securitised bonds", 10),
    ("Equities:", 11),
    ("Large caps", 12),
    ("Emerging markets", 13),
    ("Small and mid caps", 14),
    ("Real estate:", 15),
    ("Switzerland direct", 16),
    ("Switzerland listed", 17),
    ("Global listed", 18),
    ("Global not listed", 19),
    ("Gold", 20),
    ("Multi-Asset portfolio", 21),
    ("Market portfolio", 22),
    ("Hedging of currency risk", 23),
    ("Market portfolio after hedging", 26),
    ("Basic portfolio - Treasury", 27),
];

/// Report column of a strategic allocation field.
pub fn strategic_column(field: Field) -> usize {
    let offset = Field::ALL.iter().position(|f| *f == field).unwrap_or(0);
    FIRST_STRATEGIC_COLUMN + offset
}

/// The two column families and their META attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Performance,
    Strategic,
}

impl ColumnKind {
    /// Kind of a data column (1..=32). Column 0 is not a data column.
    pub fn of(column: usize) -> Option<Self> {
        match column {
            1..=LAST_PERFORMANCE_COLUMN => Some(Self::Performance),
            FIRST_STRATEGIC_COLUMN..=LAST_STRATEGIC_COLUMN => Some(Self::Strategic),
            _ => None,
        }
    }

    pub fn multiplier(&self) -> u8 {
        match self {
            Self::Performance => 6,
            Self::Strategic => 0,
        }
    }

    pub fn unit_type(&self) -> &'static str {
        match self {
            Self::Performance => "FLOW",
            Self::Strategic => "LEVEL",
        }
    }

    pub fn data_type(&self) -> &'static str {
        match self {
            Self::Performance => "CURRENCY",
            Self::Strategic => "PERCENT",
        }
    }

    pub fn data_unit(&self) -> &'static str {
        match self {
            Self::Performance => "CHF",
            Self::Strategic => "PERCENT",
        }
    }

    pub fn measure_url(&self) -> String {
        match self {
            Self::Performance => config::investments_page(),
            Self::Strategic => config::strategic_measure_url(),
        }
    }
}

/// META attributes shared by every column.
pub mod metadata_common {
    pub const FREQUENCY: &str = "A";
    pub const AGGREGATION_TYPE: &str = "UNDEFINED";
    pub const SEASONALLY_ADJUSTED: &str = "NSA";
    pub const ANNUALIZED: &str = "False";
    pub const STATE: &str = "ACTIVE";
    pub const PROVIDER: &str = "AfricaAI";
    pub const SOURCE: &str = "COMPENSWISS";
    pub const SOURCE_DESCRIPTION: &str = "Compenswiss - Fonds de compensation AVS";
    pub const COUNTRY: &str = "CHE";
    pub const DATASET: &str = "CHEF";
}

/// Code without its `@PROVIDER` suffix and trailing `.A.1`.
pub fn code_mnemonic(code: &str) -> &str {
    let base = code.split('@').next().unwrap_or(code);
    base.strip_suffix(".A.1").unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategic_columns_follow_field_order() {
        assert_eq!(strategic_column(Field::ForeignCurrencyBonds), 28);
        assert_eq!(strategic_column(Field::Equities), 29);
        assert_eq!(strategic_column(Field::BondsChf), 30);
        assert_eq!(strategic_column(Field::RealEstate), 31);
        assert_eq!(strategic_column(Field::PreciousMetals), 32);
    }

    #[test]
    fn strategic_codes_line_up_with_fields() {
        assert!(COLUMN_CODES[strategic_column(Field::PreciousMetals)].contains("PRECIOUSMETALS"));
        assert!(COLUMN_DESCRIPTIONS[strategic_column(Field::BondsChf)].ends_with("Bonds in CHF"));
    }

    #[test]
    fn mapping_targets_performance_columns_once() {
        let mut seen = std::collections::HashSet::new();
        for (_, column) in PERFORMANCE_TABLE_MAPPING {
            assert!(ColumnKind::of(*column) == Some(ColumnKind::Performance));
            assert!(seen.insert(*column), "column {column} mapped twice");
        }
        assert_eq!(PERFORMANCE_TABLE_MAPPING.len(), 25);
    }

    #[test]
    fn column_kinds() {
        assert_eq!(ColumnKind::of(0), None);
        assert_eq!(ColumnKind::of(1), Some(ColumnKind::Performance));
        assert_eq!(ColumnKind::of(27), Some(ColumnKind::Performance));
        assert_eq!(ColumnKind::of(28), Some(ColumnKind::Strategic));
        assert_eq!(ColumnKind::of(32), Some(ColumnKind::Strategic));
        assert_eq!(ColumnKind::of(33), None);
    }

    #[test]
    fn mnemonic_strips_provider_and_frequency_suffix() {
        assert_eq!(
            code_mnemonic("COMPENSWISS.GOLD.LEVEL.NONE.A.1@COMPENSWISS"),
            "COMPENSWISS.GOLD.LEVEL.NONE"
        );
        assert_eq!(code_mnemonic("PLAIN.CODE"), "PLAIN.CODE");
    }

    #[test]
    fn measure_urls_differ_by_kind() {
        assert!(ColumnKind::Performance.measure_url().ends_with("/investments"));
        assert!(ColumnKind::Strategic.measure_url().ends_with("-sva"));
    }
}
