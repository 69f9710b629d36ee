//! Format-specific adapters that turn reader output into `FinancialMetrics`.
//!
//! Each adapter starts from an all-unknown record and only ever writes a field
//! that is still unknown, so the first match in document order wins.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::keywords::{compact, match_label, COMPILED_KEYWORDS, METRIC_KEYWORDS};
use crate::normalize::{normalize, normalize_str};
use crate::schema::{FinancialMetrics, MetricField, TabularRow};

/// Column names that mark a row's label column.
pub const ROW_LABEL_KEYS: [&str; 7] = [
    "metric",
    "item",
    "description",
    "account",
    "name",
    "line",
    "category",
];

// Plain amounts with optional thousand grouping; parenthesized amounts and
// amounts preceded by whitespace + '-' are negative.
static NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\((?P<paren>\d+(?:,\d{3})*(?:\.\d+)?)\)|(?P<sign>(?:^|\s)-)?(?P<plain>\d+(?:,\d{3})*(?:\.\d+)?)",
    )
    .expect("number pattern is valid")
});

/// All amounts appearing on a line, left to right.
pub fn extract_numbers(line: &str) -> Vec<f64> {
    NUMBER_PATTERN
        .captures_iter(line)
        .filter_map(|caps| {
            if let Some(paren) = caps.name("paren") {
                return normalize_str(paren.as_str()).map(|v| -v);
            }
            let plain = caps.name("plain")?;
            let value = normalize_str(plain.as_str())?;
            if caps.name("sign").is_some() {
                Some(-value)
            } else {
                Some(value)
            }
        })
        .collect()
}

/// Free-form text adapter. Statements usually list the most recent period
/// last, so the last amount on a matching line is taken.
pub fn extract_from_text(text: &str) -> FinancialMetrics {
    let mut metrics = FinancialMetrics::empty();

    for line in text.lines() {
        let lowered = line.to_lowercase();
        if lowered.trim().is_empty() {
            continue;
        }

        for compiled in COMPILED_KEYWORDS.iter() {
            let field = compiled.entry.field;
            if metrics.is_known(field) || !compiled.matches(&lowered) {
                continue;
            }
            if let Some(value) = extract_numbers(&lowered).last() {
                metrics.set_if_unknown(field, *value);
            }
        }
    }

    apply_sales_fallback(&mut metrics);
    debug!(
        "Text adapter recognised {} of {} fields",
        metrics.known_count(),
        MetricField::ALL.len()
    );
    metrics
}

/// Spreadsheet / CSV adapter. Each row is run through the three passes in
/// order and composed first-known-wins.
pub fn extract_from_rows(rows: &[TabularRow]) -> FinancialMetrics {
    let mut metrics = FinancialMetrics::empty();

    for row in rows {
        metrics.fill_unknown_from(&header_pass(row));
        metrics.fill_unknown_from(&label_value_pass(row));
        metrics.fill_unknown_from(&label_column_pass(row));
    }

    apply_sales_fallback(&mut metrics);
    debug!(
        "Tabular adapter scanned {} rows, recognised {} fields",
        rows.len(),
        metrics.known_count()
    );
    metrics
}

/// Pass (a): column headers are metric names, cells are the values.
pub fn header_pass(row: &TabularRow) -> FinancialMetrics {
    let mut patch = FinancialMetrics::empty();
    for (header, cell) in row {
        if let (Some(field), Some(value)) = (match_label(header), normalize(cell)) {
            patch.set_if_unknown(field, value);
        }
    }
    patch
}

/// Pass (b): a string cell names the metric; the first other cell holding a
/// number is its value.
pub fn label_value_pass(row: &TabularRow) -> FinancialMetrics {
    let mut patch = FinancialMetrics::empty();
    for (key, cell) in row {
        let Value::String(label) = cell else {
            continue;
        };
        let Some(field) = match_label(label) else {
            continue;
        };
        if patch.is_known(field) {
            continue;
        }
        let first_number = row
            .iter()
            .filter(|(other_key, _)| *other_key != key)
            .find_map(|(_, other)| normalize(other));
        if let Some(value) = first_number {
            patch.set_if_unknown(field, value);
        }
    }
    patch
}

/// Pass (c): a dedicated label column (Metric / Item / Account ...) names the
/// metric; the first non-label column holding a number is its value.
pub fn label_column_pass(row: &TabularRow) -> FinancialMetrics {
    let mut patch = FinancialMetrics::empty();

    let label = row
        .iter()
        .find(|(key, _)| is_label_column(key))
        .and_then(|(_, value)| value.as_str());

    let Some(field) = label.and_then(match_label) else {
        return patch;
    };

    let first_number = row
        .iter()
        .filter(|(key, _)| !is_label_column(key))
        .find_map(|(_, value)| normalize(value));
    if let Some(value) = first_number {
        patch.set_if_unknown(field, value);
    }
    patch
}

fn is_label_column(key: &str) -> bool {
    let lowered = key.trim().to_lowercase();
    ROW_LABEL_KEYS.contains(&lowered.as_str())
}

/// XBRL / XML adapter over a flat tag -> text map.
pub fn extract_from_tags(tags: &BTreeMap<String, String>) -> FinancialMetrics {
    let mut metrics = FinancialMetrics::empty();
    if tags.is_empty() {
        return metrics;
    }

    let normalized: Vec<(String, &String)> = tags
        .iter()
        .map(|(name, value)| (compact(name), value))
        .collect();

    for entry in METRIC_KEYWORDS {
        let exclusions: Vec<String> = entry.exclude.iter().map(|ex| compact(ex)).collect();
        let candidates: Vec<&(String, &String)> = normalized
            .iter()
            .filter(|(name, _)| !exclusions.iter().any(|ex| name.contains(ex.as_str())))
            .collect();

        for keyword in entry.keywords {
            let needle = compact(keyword);
            let exact = candidates
                .iter()
                .filter(|(name, _)| *name == needle)
                .find_map(|(_, value)| normalize_str(value));
            let value = exact.or_else(|| {
                candidates
                    .iter()
                    .filter(|(name, _)| name.contains(needle.as_str()))
                    .find_map(|(_, value)| normalize_str(value))
            });

            if let Some(value) = value {
                metrics.set_if_unknown(entry.field, value);
                break;
            }
        }
    }

    apply_sales_fallback(&mut metrics);
    debug!(
        "Tag adapter matched {} fields from {} tags",
        metrics.known_count(),
        tags.len()
    );
    metrics
}

fn apply_sales_fallback(metrics: &mut FinancialMetrics) {
    if metrics.revenue.is_none() {
        if let Some(sales) = metrics.sales {
            metrics.revenue = Some(sales);
        }
    }
}
