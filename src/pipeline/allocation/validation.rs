// Value-validity rules applied identically to every tier's candidates.

/// Lowest accepted allocation percentage.
pub const MIN_PERCENT: f64 = 0.0;

/// Highest accepted allocation percentage.
pub const MAX_PERCENT: f64 = 100.0;

/// Parse a captured number. Accepts a trailing `%` and surrounding
/// whitespace; a decimal comma must be normalized first.
pub fn parse_percent(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_end_matches('%').trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Turn a decimal comma (`23,5`) into a decimal point.
pub fn normalize_decimal_comma(raw: &str) -> String {
    raw.replace(',', ".")
}

/// Whether a value is an acceptable allocation percentage.
pub fn is_valid_percent(value: f64) -> bool {
    value.is_finite() && (MIN_PERCENT..=MAX_PERCENT).contains(&value)
}

/// Parse (tolerating a decimal comma) and range-check in one step.
pub fn validated_percent(raw: &str) -> Option<f64> {
    parse_percent(&normalize_decimal_comma(raw)).filter(|v| is_valid_percent(*v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integer_and_decimal() {
        assert_eq!(parse_percent("43"), Some(43.0));
        assert_eq!(parse_percent("23.5"), Some(23.5));
        assert_eq!(parse_percent(" 23.5% "), Some(23.5));
    }

    #[test]
    fn comma_decimal_needs_normalizing() {
        assert_eq!(parse_percent("23,5"), None);
        assert_eq!(parse_percent(&normalize_decimal_comma("23,5")), Some(23.5));
        assert_eq!(validated_percent("23,5"), Some(23.5));
    }

    #[test]
    fn zero_is_a_value_not_absence() {
        assert_eq!(validated_percent("0"), Some(0.0));
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(is_valid_percent(0.0));
        assert!(is_valid_percent(100.0));
        assert!(!is_valid_percent(100.01));
        assert!(!is_valid_percent(-1.0));
        assert!(!is_valid_percent(f64::NAN));
    }

    #[test]
    fn out_of_range_rejected() {
        assert_eq!(validated_percent("150"), None);
    }

    #[test]
    fn garbage_rejected() {
        assert_eq!(parse_percent("n/a"), None);
        assert_eq!(parse_percent(""), None);
        assert_eq!(parse_percent("%"), None);
    }
}
