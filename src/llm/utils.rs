use serde_json::Value;

use crate::benchmark::BenchmarkComparison;
use crate::ratios::{RatioCategory, RatioSet};
use crate::risk::Risk;
use crate::schema::FinancialMetrics;
use crate::trends::{Trend, TrendAnalysis};
use crate::utils::humanize;

// Keys the Gemini schema dialect rejects.
const UNSUPPORTED_SCHEMA_KEYS: [&str; 6] = [
    "$schema",
    "definitions",
    "title",
    "default",
    "additionalProperties",
    "format",
];

/// Strips schema keywords structured-output endpoints do not accept.
pub fn clean_schema(schema: &mut Value) {
    match schema {
        Value::Object(map) => {
            for key in UNSUPPORTED_SCHEMA_KEYS {
                map.remove(key);
            }
            for value in map.values_mut() {
                clean_schema(value);
            }
        }
        Value::Array(items) => {
            for item in items {
                clean_schema(item);
            }
        }
        _ => {}
    }
}

pub fn format_metrics(metrics: &FinancialMetrics) -> String {
    if metrics.is_empty() {
        return "  - No metrics could be extracted".to_string();
    }
    metrics
        .known()
        .map(|(field, value)| format!("  - {}: {:.2}", humanize(field.as_str()), value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ratios grouped under their category headings.
pub fn format_ratios(ratios: &RatioSet) -> String {
    if ratios.is_empty() {
        return "  - No ratios could be computed".to_string();
    }
    let mut lines = Vec::new();
    for category in RatioCategory::ALL {
        let mut group = ratios
            .iter()
            .filter(|(ratio, _)| ratio.category() == category)
            .peekable();
        if group.peek().is_none() {
            continue;
        }
        lines.push(format!("  {}:", category.label()));
        lines.extend(group.map(|(ratio, value)| format!("  - {}: {:.2}", ratio.label(), value)));
    }
    lines.join("\n")
}

pub fn format_risks(risks: &[Risk]) -> String {
    if risks.is_empty() {
        return "  - No significant risks identified".to_string();
    }
    risks
        .iter()
        .map(|r| format!("  - [{}] {}: {}", r.severity, r.risk_type, r.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_trend(name: &str, trend: &Trend) -> String {
    let mut line = format!("  - {}: {:?}", name, trend.direction).to_lowercase();
    if let Some(growth) = trend.growth_rate {
        line.push_str(&format!(", total growth {:.2}%", growth));
    }
    if let Some(cagr) = trend.cagr {
        line.push_str(&format!(", CAGR {:.2}%", cagr));
    }
    if let Some(yoy) = trend.yoy {
        line.push_str(&format!(", latest period {:.2}%", yoy));
    }
    line
}

pub fn format_trends(trends: Option<&TrendAnalysis>) -> String {
    match trends {
        Some(TrendAnalysis::Trends(result)) => {
            let mut lines = vec![format!(
                "  - Periods: {}",
                result.period_labels.join(", ")
            )];
            lines.push(format_trend("Revenue", &result.revenue));
            lines.push(format_trend("Net income", &result.profit));
            lines.push(format_trend("Total assets", &result.assets));
            lines.join("\n")
        }
        Some(TrendAnalysis::InsufficientData { message, .. }) => format!("  - {}", message),
        None => "  - Single period only".to_string(),
    }
}

pub fn format_benchmark(benchmark: Option<&BenchmarkComparison>) -> String {
    match benchmark {
        Some(BenchmarkComparison::Compared(result)) => {
            let mut lines = vec![format!("  - Industry: {}", result.industry)];
            for row in &result.metrics {
                lines.push(format!(
                    "  - {}: company {:.2} vs peers {:.2} ({:+.2})",
                    row.metric.label(),
                    row.company_value,
                    row.benchmark_value,
                    row.difference
                ));
            }
            lines.extend(result.alerts.iter().map(|alert| format!("  - Alert: {}", alert)));
            lines.push(format!("  - Summary: {}", result.summary));
            lines.join("\n")
        }
        Some(BenchmarkComparison::NoComparison { message, .. }) => format!("  - {}", message),
        None => "  - No benchmark comparison available".to_string(),
    }
}
