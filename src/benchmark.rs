//! Peer comparison against a static per-industry ratio table.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{FinancialAnalysisError, Result};
use crate::ratios::{Ratio, RatioSet};
use crate::utils::{humanize, round2, spaced};

pub const DEFAULT_INDUSTRY: &str = "general";

/// Expected ratio values for one industry. Ratios keep the order they were
/// listed in, which is the order comparison rows come out in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndustryBenchmark {
    #[serde(with = "ordered_ratios")]
    pub ratios: Vec<(Ratio, f64)>,
}

impl IndustryBenchmark {
    fn from_pairs(pairs: &[(Ratio, f64)]) -> Self {
        Self {
            ratios: pairs.to_vec(),
        }
    }

    pub fn get(&self, ratio: Ratio) -> Option<f64> {
        self.ratios
            .iter()
            .find(|(name, _)| *name == ratio)
            .map(|(_, value)| *value)
    }
}

// Ratio tables are JSON objects on the wire; reading them through a
// `serde_json::Map` keeps the file's key order.
mod ordered_ratios {
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::{Map, Value};

    use crate::ratios::Ratio;

    pub fn serialize<S: Serializer>(
        ratios: &[(Ratio, f64)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ratios.len()))?;
        for (ratio, value) in ratios {
            map.serialize_entry(ratio, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(Ratio, f64)>, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, value)| {
                let ratio: Ratio =
                    serde_json::from_value(Value::String(key.clone())).map_err(D::Error::custom)?;
                let number = value
                    .as_f64()
                    .ok_or_else(|| D::Error::custom(format!("{} must be a number", key)))?;
                Ok((ratio, number))
            })
            .collect()
    }
}

/// Industry key (lowercase) -> expected ratio values. Immutable once built;
/// always contains the `general` industry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BenchmarkTable(BTreeMap<String, IndustryBenchmark>);

impl Default for BenchmarkTable {
    fn default() -> Self {
        use Ratio::*;
        let industries = [
            (
                "general",
                [8.0, 5.0, 12.0, 1.5, 1.0, 55.0, 110.0],
            ),
            (
                "technology",
                [12.0, 8.0, 15.0, 1.8, 1.4, 45.0, 90.0],
            ),
            ("retail", [6.0, 4.0, 10.0, 1.3, 0.8, 65.0, 150.0]),
            (
                "manufacturing",
                [9.0, 6.0, 13.0, 1.6, 1.1, 60.0, 130.0],
            ),
        ];
        let order = [
            ProfitMargin,
            Roa,
            Roe,
            CurrentRatio,
            QuickRatio,
            DebtToAssetRatio,
            DebtToEquityRatio,
        ];

        BenchmarkTable(
            industries
                .into_iter()
                .map(|(name, values)| {
                    let pairs: Vec<(Ratio, f64)> = order.into_iter().zip(values).collect();
                    (name.to_string(), IndustryBenchmark::from_pairs(&pairs))
                })
                .collect(),
        )
    }
}

impl BenchmarkTable {
    /// Builds a table from explicit industries; keys are lowercased.
    pub fn new(industries: BTreeMap<String, IndustryBenchmark>) -> Result<Self> {
        let table = BenchmarkTable(
            industries
                .into_iter()
                .map(|(name, benchmark)| (name.trim().to_lowercase(), benchmark))
                .collect(),
        );
        table.validate()?;
        Ok(table)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, IndustryBenchmark> = serde_json::from_str(json)?;
        Self::new(raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    fn validate(&self) -> Result<()> {
        if !self.0.contains_key(DEFAULT_INDUSTRY) {
            return Err(FinancialAnalysisError::InvalidBenchmarkTable(format!(
                "missing required '{}' industry",
                DEFAULT_INDUSTRY
            )));
        }
        for (industry, benchmark) in &self.0 {
            if let Some((ratio, value)) = benchmark.ratios.iter().find(|(_, v)| !v.is_finite()) {
                return Err(FinancialAnalysisError::InvalidBenchmarkTable(format!(
                    "{}.{} is not a finite number ({})",
                    industry, ratio, value
                )));
            }
        }
        Ok(())
    }

    pub fn industries(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Resolves a free-text industry name, falling back to the general table.
    pub fn resolve(&self, industry: Option<&str>) -> Option<(&str, &IndustryBenchmark)> {
        let key = industry
            .map(|name| name.trim().to_lowercase())
            .unwrap_or_default();
        self.0
            .get_key_value(key.as_str())
            .or_else(|| self.0.get_key_value(DEFAULT_INDUSTRY))
            .map(|(name, benchmark)| (name.as_str(), benchmark))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub metric: Ratio,
    pub company_value: f64,
    pub benchmark_value: f64,
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub industry: String,
    pub metrics: Vec<BenchmarkRow>,
    pub alerts: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BenchmarkComparison {
    /// None of the company's ratios appear in the industry table.
    NoComparison { industry: String, message: String },
    Compared(BenchmarkResult),
}

impl BenchmarkComparison {
    pub fn result(&self) -> Option<&BenchmarkResult> {
        match self {
            BenchmarkComparison::Compared(result) => Some(result),
            BenchmarkComparison::NoComparison { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PeerBenchmark {
    table: Arc<BenchmarkTable>,
}

impl PeerBenchmark {
    pub fn new(table: BenchmarkTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn from_shared(table: Arc<BenchmarkTable>) -> Self {
        Self { table }
    }

    /// Compares `ratios` to the industry's table. `None` when there are no
    /// ratios at all.
    pub fn compare(&self, ratios: &RatioSet, industry: Option<&str>) -> Option<BenchmarkComparison> {
        if ratios.is_empty() {
            return None;
        }

        let (key, benchmark) = self.table.resolve(industry)?;
        let industry_name = title_case(key);

        let mut rows = Vec::new();
        let mut alerts = Vec::new();

        for &(metric, benchmark_value) in &benchmark.ratios {
            let Some(company_value) = ratios.get(metric) else {
                continue;
            };
            let difference = company_value - benchmark_value;
            rows.push(BenchmarkRow {
                metric,
                company_value: round2(company_value),
                benchmark_value,
                difference: round2(difference),
            });
            if let Some(alert) = alert_for(metric, difference) {
                alerts.push(alert);
            }
        }

        if rows.is_empty() {
            debug!("No overlapping ratios with the {} benchmark", key);
            return Some(BenchmarkComparison::NoComparison {
                industry: industry_name,
                message: "None of the computed ratios have an industry benchmark".to_string(),
            });
        }

        let summary = summarize(&rows);
        Some(BenchmarkComparison::Compared(BenchmarkResult {
            industry: industry_name,
            metrics: rows,
            alerts,
            summary,
        }))
    }
}

fn alert_for(metric: Ratio, difference: f64) -> Option<String> {
    let name = humanize(metric.as_str());
    match metric {
        Ratio::ProfitMargin | Ratio::Roa | Ratio::Roe if difference <= -5.0 => {
            Some(format!("{} is {:.2}% below peers.", name, round2(difference).abs()))
        }
        Ratio::CurrentRatio | Ratio::QuickRatio if difference <= -0.3 => {
            Some(format!("{} is materially weaker than peers.", name))
        }
        Ratio::DebtToAssetRatio | Ratio::DebtToEquityRatio if difference >= 10.0 => {
            Some(format!(
                "{} exceeds peer leverage by {:.2}%.",
                name,
                round2(difference)
            ))
        }
        _ => None,
    }
}

// Ties keep the first row in table order.
fn summarize(rows: &[BenchmarkRow]) -> String {
    let mut best: Option<&BenchmarkRow> = None;
    let mut worst: Option<&BenchmarkRow> = None;

    for row in rows {
        if row.difference > 0.0 && best.map_or(true, |b| row.difference > b.difference) {
            best = Some(row);
        }
        if row.difference < 0.0 && worst.map_or(true, |w| row.difference < w.difference) {
            worst = Some(row);
        }
    }

    let mut parts = Vec::new();
    if let Some(row) = best {
        parts.push(format!(
            "Outperforms peers on {} by {:.2}.",
            spaced(row.metric.as_str()),
            row.difference.abs()
        ));
    }
    if let Some(row) = worst {
        parts.push(format!(
            "Lags industry on {} by {:.2}.",
            spaced(row.metric.as_str()),
            row.difference.abs()
        ));
    }

    if parts.is_empty() {
        "Company performance is broadly in line with peer benchmarks.".to_string()
    } else {
        parts.join(" ")
    }
}

fn title_case(key: &str) -> String {
    key.split_whitespace()
        .map(humanize)
        .collect::<Vec<_>>()
        .join(" ")
}
