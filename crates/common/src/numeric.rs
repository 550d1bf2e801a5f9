//! Safe-number coercion for external payloads.
//!
//! Indexers and price APIs send numbers as JSON numbers, decimal strings,
//! `null`, or garbage. Everything entering the system goes through these
//! helpers so that no `NaN` or infinity ever reaches a row.

use serde_json::Value;

/// Decimals used when a token does not report a usable value.
pub const DEFAULT_DECIMALS: u32 = 18;

/// Coerce a JSON value to a finite `f64`, or 0.
///
/// Accepts numbers and numeric strings (surrounding whitespace allowed).
pub fn safe_number(v: &Value) -> f64 {
    let n = match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_f64(s),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    };
    finite_or_zero(n)
}

/// Coerce an optional JSON value (e.g. from `Value::get`) to a finite `f64`.
pub fn safe_number_opt(v: Option<&Value>) -> f64 {
    v.map(safe_number).unwrap_or(0.0)
}

/// Parse a numeric string, 0 on failure.
pub fn parse_f64(s: &str) -> f64 {
    finite_or_zero(s.trim().parse::<f64>().unwrap_or(0.0))
}

pub fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Read a string field, `""` when missing or not a string.
pub fn safe_str(v: Option<&Value>) -> String {
    v.and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Read an optional non-empty string field.
pub fn opt_str(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Token decimals from a number or numeric string; [`DEFAULT_DECIMALS`] if
/// missing or unparsable. Zero is a valid value.
pub fn parse_decimals(v: Option<&Value>) -> u32 {
    let parsed = match v {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match parsed {
        Some(d) if d <= 255 => d as u32,
        _ => DEFAULT_DECIMALS,
    }
}

/// Convert a raw integer amount into human units: `raw / 10^decimals`.
///
/// `raw` is the decimal-string (or JSON number) the indexer returned;
/// missing or unparsable input yields 0.
pub fn from_units(raw: Option<&Value>, decimals: u32) -> f64 {
    let raw = safe_number_opt(raw);
    if raw == 0.0 {
        return 0.0;
    }
    finite_or_zero(raw / 10f64.powi(decimals as i32))
}

/// [`from_units`] for a raw string.
pub fn from_units_str(raw: &str, decimals: u32) -> f64 {
    let raw = parse_f64(raw);
    if raw == 0.0 {
        return 0.0;
    }
    finite_or_zero(raw / 10f64.powi(decimals as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_number_variants() {
        assert_eq!(safe_number(&json!(1.5)), 1.5);
        assert_eq!(safe_number(&json!("2.25")), 2.25);
        assert_eq!(safe_number(&json!(" 3 ")), 3.0);
        assert_eq!(safe_number(&json!("abc")), 0.0);
        assert_eq!(safe_number(&json!(null)), 0.0);
        assert_eq!(safe_number(&json!({"usd": 1})), 0.0);
        assert_eq!(safe_number(&json!("NaN")), 0.0);
        assert_eq!(safe_number(&json!("inf")), 0.0);
    }

    #[test]
    fn test_from_units_matches_division() {
        let cases = [
            ("1000000000000000000", 18u32),
            ("123456789", 6),
            ("5", 0),
            ("98765432109876543210987654321", 18),
        ];
        for (raw, d) in cases {
            let expected = raw.parse::<f64>().unwrap() / 10f64.powi(d as i32);
            assert_eq!(from_units(Some(&json!(raw)), d), expected, "{raw} / 10^{d}");
            assert_eq!(from_units_str(raw, d), expected);
        }
    }

    #[test]
    fn test_from_units_null_is_zero() {
        assert_eq!(from_units(None, 18), 0.0);
        assert_eq!(from_units(Some(&json!(null)), 6), 0.0);
        assert_eq!(from_units_str("", 18), 0.0);
    }

    #[test]
    fn test_parse_decimals() {
        assert_eq!(parse_decimals(Some(&json!("6"))), 6);
        assert_eq!(parse_decimals(Some(&json!(8))), 8);
        assert_eq!(parse_decimals(Some(&json!(0))), 0);
        assert_eq!(parse_decimals(Some(&json!("x"))), DEFAULT_DECIMALS);
        assert_eq!(parse_decimals(Some(&json!(-1))), DEFAULT_DECIMALS);
        assert_eq!(parse_decimals(None), DEFAULT_DECIMALS);
    }

    #[test]
    fn test_string_helpers() {
        let v = json!({"symbol": "PLSX", "blank": "  ", "n": 1});
        assert_eq!(safe_str(v.get("symbol")), "PLSX");
        assert_eq!(safe_str(v.get("missing")), "");
        assert_eq!(safe_str(v.get("n")), "");
        assert_eq!(opt_str(v.get("blank")), None);
        assert_eq!(opt_str(v.get("symbol")).as_deref(), Some("PLSX"));
    }
}
