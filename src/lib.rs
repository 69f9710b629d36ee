//! # Financial Statement Analyzer
//!
//! Turns the intermediate output of document readers (page text, spreadsheet
//! rows, XBRL tag maps, vision-model text) into a normalized metric record,
//! then derives ratios, risk flags, a DuPont decomposition, peer benchmark
//! comparisons and multi-period trends.
//!
//! ## Core Concepts
//!
//! - **FinancialMetrics**: fixed set of optional metrics; unknown is never zero
//! - **Adapters**: text, tabular and tag extraction converging on one record
//! - **RatioSet**: only ratios whose preconditions hold are present
//! - **Risks**: ordered threshold rules, one tier per rule group
//! - **Benchmarks**: an immutable industry table injected through configuration
//!
//! The pipeline never fails: documents it cannot read produce an all-unknown
//! record and empty downstream results.
//!
//! ## Example
//!
//! ```rust
//! use financial_statement_analyzer::*;
//!
//! let document = DocumentInput::from_text(
//!     "Total revenue 1,000,000\nNet income 80,000\nTotal assets 2,000,000",
//! );
//! let report = FinancialAnalyzer::default().analyze(&document);
//!
//! assert_eq!(report.financial_data.revenue, Some(1_000_000.0));
//! let margin = report.ratios.get(Ratio::ProfitMargin).unwrap();
//! assert!((margin - 8.0).abs() < 1e-9);
//! ```

pub mod benchmark;
pub mod composer;
pub mod config;
pub mod dupont;
pub mod error;
pub mod extraction;
pub mod ingestion;
pub mod keywords;
pub mod normalize;
pub mod ratios;
pub mod risk;
pub mod schema;
pub mod trends;
pub mod utils;

#[cfg(feature = "llm")]
pub mod llm;

pub use benchmark::{
    BenchmarkComparison, BenchmarkResult, BenchmarkRow, BenchmarkTable, IndustryBenchmark,
    PeerBenchmark,
};
pub use composer::{
    derive_missing_fields, merge_and_derive, merge_llm_structured_data, ChangeKind, FieldChange,
    MergeAudit, StructuredExtraction,
};
pub use config::AnalyzerConfig;
pub use dupont::DupontAnalysis;
pub use error::{FinancialAnalysisError, Result};
pub use ingestion::extract_metrics;
pub use normalize::normalize;
pub use ratios::{calculate_ratios, Ratio, RatioCategory, RatioSet};
pub use risk::{assess_risks, Risk, RiskType, Severity};
pub use schema::*;
pub use trends::{analyze_trends, PeriodMetrics, Trend, TrendAnalysis, TrendDirection, TrendResult};

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Reports for a set of documents, in input order, plus the trend across
/// them when more than one document was given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAnalysis {
    pub reports: Vec<AnalysisReport>,
    pub trends: Option<TrendAnalysis>,
}

impl BatchAnalysis {
    /// Attaches the trend across `reports` when there is more than one.
    pub fn from_reports(reports: Vec<AnalysisReport>) -> Self {
        let trends = (reports.len() > 1).then(|| {
            let periods: Vec<PeriodMetrics> = reports
                .iter()
                .map(|report| PeriodMetrics::unlabeled(report.financial_data.clone()))
                .collect();
            analyze_trends(&periods)
        });
        Self { reports, trends }
    }

    pub fn latest(&self) -> Option<&AnalysisReport> {
        self.reports.last()
    }
}

#[derive(Debug, Clone)]
pub struct FinancialAnalyzer {
    config: AnalyzerConfig,
    benchmark: PeerBenchmark,
}

impl Default for FinancialAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl FinancialAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let benchmark = PeerBenchmark::from_shared(config.benchmarks.clone());
        Self { config, benchmark }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Runs the whole pipeline for one document against the configured industry.
    pub fn analyze(&self, document: &DocumentInput) -> AnalysisReport {
        self.analyze_for_industry(document, None)
    }

    pub fn analyze_for_industry(
        &self,
        document: &DocumentInput,
        industry: Option<&str>,
    ) -> AnalysisReport {
        info!("Analyzing {} document", document.kind());
        let metrics = extract_metrics(document);
        self.analyze_metrics(metrics, industry)
    }

    /// Ratio, risk, DuPont and benchmark stages over an already extracted record.
    pub fn analyze_metrics(&self, metrics: FinancialMetrics, industry: Option<&str>) -> AnalysisReport {
        let industry = industry.unwrap_or(self.config.industry.as_str());

        let ratios = calculate_ratios(&metrics);
        let risks = assess_risks(&metrics, &ratios);
        let dupont = DupontAnalysis::from_ratios(&ratios);
        let benchmark = self.benchmark.compare(&ratios, Some(industry));
        let cash_flow_summary = CashFlowSummary::from_metrics(&metrics);

        info!(
            "Analysis complete: {} metrics, {} ratios, {} risks",
            metrics.known_count(),
            ratios.len(),
            risks.len()
        );

        AnalysisReport {
            financial_data: metrics,
            ratios,
            risks,
            dupont,
            benchmark,
            cash_flow_summary,
            trends: None,
            insights: None,
            merge_audit: None,
        }
    }

    /// Analyzes documents independently; output order matches input order.
    pub fn analyze_batch(&self, documents: &[DocumentInput]) -> BatchAnalysis {
        info!("Analyzing batch of {} documents", documents.len());

        let reports: Vec<AnalysisReport> = if self.config.parallel {
            documents.par_iter().map(|doc| self.analyze(doc)).collect()
        } else {
            documents.iter().map(|doc| self.analyze(doc)).collect()
        };

        BatchAnalysis::from_reports(reports)
    }

    /// Analyzes the newest period and attaches the trend across all periods
    /// (oldest first).
    pub fn analyze_history(&self, periods: &[PeriodMetrics]) -> AnalysisReport {
        let latest = periods
            .last()
            .map(|period| period.metrics.clone())
            .unwrap_or_default();
        debug!("Analyzing history of {} periods", periods.len());

        let mut report = self.analyze_metrics(latest, None);
        report.trends = Some(analyze_trends(periods));
        report
    }

    /// Extracts every labelled document, then behaves like `analyze_history`.
    pub fn analyze_periods<S: AsRef<str>>(&self, documents: &[(S, DocumentInput)]) -> AnalysisReport {
        let periods: Vec<PeriodMetrics> = documents
            .iter()
            .map(|(label, document)| PeriodMetrics::new(label.as_ref(), extract_metrics(document)))
            .collect();
        self.analyze_history(&periods)
    }
}

/// One-shot analysis with the default configuration.
pub fn analyze_document(document: &DocumentInput) -> AnalysisReport {
    FinancialAnalyzer::default().analyze(document)
}
