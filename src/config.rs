use log::info;
use std::env;
use std::sync::Arc;

use crate::benchmark::{BenchmarkTable, DEFAULT_INDUSTRY};
use crate::error::Result;

pub const INDUSTRY_ENV: &str = "ANALYZER_INDUSTRY";
pub const BENCHMARKS_FILE_ENV: &str = "ANALYZER_BENCHMARKS_FILE";

/// Settings shared by every analysis run by one `FinancialAnalyzer`.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Industry key used when a call does not name one.
    pub industry: String,
    pub benchmarks: Arc<BenchmarkTable>,
    /// Run batch analysis on the rayon pool.
    pub parallel: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            industry: DEFAULT_INDUSTRY.to_string(),
            benchmarks: Arc::new(BenchmarkTable::default()),
            parallel: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = industry.into();
        self
    }

    pub fn with_benchmarks(mut self, benchmarks: BenchmarkTable) -> Self {
        self.benchmarks = Arc::new(benchmarks);
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Reads `ANALYZER_INDUSTRY` and `ANALYZER_BENCHMARKS_FILE`; unset
    /// variables keep the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(industry) = env::var(INDUSTRY_ENV) {
            if !industry.trim().is_empty() {
                config.industry = industry;
            }
        }

        if let Ok(path) = env::var(BENCHMARKS_FILE_ENV) {
            if !path.trim().is_empty() {
                info!("Loading benchmark table from {}", path);
                config = config.with_benchmarks(BenchmarkTable::from_path(&path)?);
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let table =
            BenchmarkTable::from_json_str(r#"{"general": {"ratios": {"roe": 10.0}}}"#).unwrap();
        let config = AnalyzerConfig::new()
            .with_industry("retail")
            .with_benchmarks(table.clone())
            .sequential();

        assert_eq!(config.industry, "retail");
        assert_eq!(*config.benchmarks, table);
        assert!(!config.parallel);
    }

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.industry, "general");
        assert!(config.parallel);
        assert_eq!(config.benchmarks.industries().count(), 4);
    }
}
