/// Turns a snake_case identifier into a title-cased label
/// ("debt_to_asset_ratio" -> "Debt To Asset Ratio").
pub fn humanize(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lower-case, space separated form of a snake_case identifier.
pub fn spaced(name: &str) -> String {
    name.replace('_', " ")
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Strips prose and code fences around a JSON payload returned by a model,
/// keeping the outermost array or object.
pub fn clean_json_output(raw: &str) -> String {
    if let Some(start) = raw.find('{') {
        if let Some(end) = raw.rfind('}') {
            if end > start {
                return raw[start..=end].to_string();
            }
        }
    }
    if let Some(start) = raw.find('[') {
        if let Some(end) = raw.rfind(']') {
            if end > start {
                return raw[start..=end].to_string();
            }
        }
    }
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("profit_margin"), "Profit Margin");
        assert_eq!(humanize("roa"), "Roa");
        assert_eq!(humanize("debt_to_equity_ratio"), "Debt To Equity Ratio");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(15.004), 15.0);
        assert_eq!(round2(-2.345678), -2.35);
        assert_eq!(round2(20.000000000000004), 20.0);
    }

    #[test]
    fn test_clean_json_output_strips_fences() {
        let raw = "Here you go:\n```json\n{\"revenue\": 10}\n```";
        assert_eq!(clean_json_output(raw), "{\"revenue\": 10}");

        assert_eq!(clean_json_output("  plain text "), "plain text");
    }
}
