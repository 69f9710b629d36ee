//! Conversion of heterogeneous cell and text values into `f64`.
//!
//! Everything that cannot be read as a finite number maps to `None`, never to
//! zero, so downstream ratio checks can tell "missing" from "nil".

use serde_json::Value;

/// Normalizes a spreadsheet cell, tag value or model-produced JSON value.
pub fn normalize(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().and_then(normalize_f64),
        Value::String(text) => normalize_str(text),
        _ => None,
    }
}

pub fn normalize_f64(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Parses accounting-formatted text: `"(1,234.50)"` -> `-1234.5`,
/// `"$45,000"` -> `45000`, `"12%"` -> `12`.
pub fn normalize_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (negative, body) = match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let without_tokens = body.replace("USD", "");
    let cleaned: String = without_tokens
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    let number: f64 = cleaned.parse().ok()?;
    let signed = if negative { -number } else { number };
    normalize_f64(signed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accounting_negative() {
        assert_eq!(normalize_str("(1,234.50)"), Some(-1234.50));
        assert_eq!(normalize_str(" ($2,000) "), Some(-2000.0));
    }

    #[test]
    fn test_currency_and_percent() {
        assert_eq!(normalize_str("$45,000"), Some(45000.0));
        assert_eq!(normalize_str("12%"), Some(12.0));
        assert_eq!(normalize_str("USD 1,500.25"), Some(1500.25));
        assert_eq!(normalize_str("£ 900"), Some(900.0));
    }

    #[test]
    fn test_unknown_inputs() {
        assert_eq!(normalize_str(""), None);
        assert_eq!(normalize_str("   "), None);
        assert_eq!(normalize_str("-"), None);
        assert_eq!(normalize_str("n/a"), None);
        assert_eq!(normalize_str("1.2.3"), None);
        assert_eq!(normalize_str("5-"), None);
    }

    #[test]
    fn test_leading_minus() {
        assert_eq!(normalize_str("-750"), Some(-750.0));
        assert_eq!(normalize_str("-$1,000"), Some(-1000.0));
    }

    #[test]
    fn test_json_values() {
        assert_eq!(normalize(&json!(42)), Some(42.0));
        assert_eq!(normalize(&json!(-3.5)), Some(-3.5));
        assert_eq!(normalize(&json!("1,000")), Some(1000.0));
        assert_eq!(normalize(&json!(null)), None);
        assert_eq!(normalize(&json!(true)), None);
        assert_eq!(normalize(&json!([1, 2])), None);
        assert_eq!(normalize_f64(f64::NAN), None);
        assert_eq!(normalize_f64(f64::INFINITY), None);
    }
}
