//! Value normalization: postal codes for both sides of the join, and the
//! loose number parsing used for prices and reference metrics.
//!
//! Reference codes are the canonical side: trimmed and zero-padded so a ZIP
//! stored as an integer (`2134`) compares equal to its printed form (`02134`).
//! Listing codes are free text and go through a configurable extraction.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Listing key extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKey {
    /// First run of ASCII digits: `"325XX"` -> `"325"`.
    #[default]
    DigitPrefix,
    /// Every digit, concatenated: `"32-5X9"` -> `"3259"`.
    Digits,
    /// Whitespace-trimmed raw value.
    Trim,
    /// Raw value, untouched.
    None,
}

impl std::fmt::Display for ListingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DigitPrefix => write!(f, "digit_prefix"),
            Self::Digits => write!(f, "digits"),
            Self::Trim => write!(f, "trim"),
            Self::None => write!(f, "none"),
        }
    }
}

fn digit_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("digit-run pattern is valid"))
}

/// Extract the comparable key from a listing's raw postal field.
/// An empty result means the listing cannot be matched.
pub fn listing_key(raw: &str, mode: ListingKey) -> String {
    match mode {
        ListingKey::DigitPrefix => digit_run()
            .find(raw)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        ListingKey::Digits => raw.chars().filter(|c| c.is_ascii_digit()).collect(),
        ListingKey::Trim => raw.trim().to_string(),
        ListingKey::None => raw.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Canonical codes
// ---------------------------------------------------------------------------

/// Normalize a reference postal code.
///
/// Numeric codes lose a trailing `.0` (spreadsheet exports render integer
/// columns as floats) and are left-padded with zeros to `pad_width`.
/// Non-numeric codes (`"SW1A 1AA"`) are only trimmed.
pub fn canonical_code(raw: &str, pad_width: usize) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);

    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }

    format!("{trimmed:0>pad_width$}")
}

// ---------------------------------------------------------------------------
// Numeric values
// ---------------------------------------------------------------------------

/// Parse a listing price, floor area or demographic figure.
///
/// Accepts what listing exports and census tables actually contain:
/// currency prefixes (`"$685,000"`, `"€ 1,250"`), a trailing area unit
/// (`"1,750 sq ft"`), and accounting negatives (`"(500)"`). Anything else
/// left over, such as `"N/A"` or a category label, is `None`.
pub fn parse_number(s: &str) -> Option<f64> {
    let mut text = s.trim();
    for unit in AREA_UNITS {
        if let Some(head) = strip_suffix_ignore_case(text, unit) {
            text = head.trim_end();
            break;
        }
    }

    // Accounting negative: (500.00) -> -500.00
    let (negative, body) = match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, text),
    };

    let digits: String = body
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();
    if digits.is_empty() {
        return None;
    }

    // Sign only up front, and never inside parentheses
    let well_formed = digits.char_indices().all(|(i, c)| match c {
        '0'..='9' | '.' => true,
        '-' | '+' => i == 0 && !negative,
        _ => false,
    });
    if !well_formed {
        return None;
    }

    let value: f64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];
const AREA_UNITS: [&str; 3] = ["sq ft", "sqft", "ft²"];

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let split = text.len().checked_sub(suffix.len())?;
    let tail = text.get(split..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &text[..split])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_prefix_stops_at_first_non_digit() {
        assert_eq!(listing_key("325XX", ListingKey::DigitPrefix), "325");
        assert_eq!(listing_key("FL 32501", ListingKey::DigitPrefix), "32501");
        assert_eq!(listing_key("32501-1234", ListingKey::DigitPrefix), "32501");
    }

    #[test]
    fn digit_prefix_without_digits_is_empty() {
        assert_eq!(listing_key("unknown", ListingKey::DigitPrefix), "");
        assert_eq!(listing_key("", ListingKey::DigitPrefix), "");
    }

    #[test]
    fn digits_concatenates_runs() {
        assert_eq!(listing_key("32-5X9", ListingKey::Digits), "3259");
    }

    #[test]
    fn trim_and_none() {
        assert_eq!(listing_key("  SW1A 1AA ", ListingKey::Trim), "SW1A 1AA");
        assert_eq!(listing_key("  SW1A ", ListingKey::None), "  SW1A ");
    }

    #[test]
    fn canonical_pads_short_numeric_codes() {
        assert_eq!(canonical_code("2134", 5), "02134");
        assert_eq!(canonical_code(" 501 ", 5), "00501");
        assert_eq!(canonical_code("32599", 5), "32599");
    }

    #[test]
    fn canonical_strips_float_suffix() {
        assert_eq!(canonical_code("2134.0", 5), "02134");
    }

    #[test]
    fn canonical_leaves_alphanumeric_codes() {
        assert_eq!(canonical_code(" SW1A 1AA", 5), "SW1A 1AA");
    }

    #[test]
    fn parse_number_money_formats() {
        assert_eq!(parse_number("$685,000"), Some(685000.0));
        assert_eq!(parse_number(" 1,250.5 "), Some(1250.5));
        assert_eq!(parse_number("(500.00)"), Some(-500.0));
        assert_eq!(parse_number("-50"), Some(-50.0));
    }

    #[test]
    fn parse_number_listing_and_area_formats() {
        assert_eq!(parse_number("€ 1,250"), Some(1250.0));
        assert_eq!(parse_number("£410,000"), Some(410000.0));
        assert_eq!(parse_number("1,750 sq ft"), Some(1750.0));
        assert_eq!(parse_number("2100 SqFt"), Some(2100.0));
        assert_eq!(parse_number("950ft²"), Some(950.0));
        assert_eq!(parse_number("sq ft"), None);
    }

    #[test]
    fn parse_number_sign_rules() {
        assert_eq!(parse_number("+12"), Some(12.0));
        assert_eq!(parse_number("(-5)"), None);
        assert_eq!(parse_number("5-"), None);
        assert_eq!(parse_number("()"), None);
    }

    #[test]
    fn parse_number_rejects_text() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("Low"), None);
        assert_eq!(parse_number("12abc"), None);
    }

    #[test]
    fn canonical_never_truncates() {
        assert_eq!(canonical_code("123456789", 5), "123456789");
    }
}
