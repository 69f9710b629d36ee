use futures::future::join_all;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::mpsc::Sender;

use crate::composer::{merge_and_derive, MergeAudit};
use crate::ingestion::extract_metrics;
use crate::llm::provider::FinancialLlm;
use crate::llm::types::{AnalysisEvent, ImageInput};
use crate::schema::{AnalysisReport, DocumentInput, FinancialMetrics};
use crate::{BatchAnalysis, FinancialAnalyzer};

/// Which optional model calls `LlmAnalyzer` makes per document. Each runs at
/// most once and its failure never fails the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmAnalysisOptions {
    pub structured_extraction: bool,
    pub insights: bool,
}

impl Default for LlmAnalysisOptions {
    fn default() -> Self {
        Self {
            structured_extraction: true,
            insights: true,
        }
    }
}

/// The local pipeline enriched with model-extracted metrics and narrative
/// insights.
pub struct LlmAnalyzer {
    analyzer: FinancialAnalyzer,
    llm: Arc<dyn FinancialLlm>,
    options: LlmAnalysisOptions,
}

impl LlmAnalyzer {
    pub fn new(analyzer: FinancialAnalyzer, llm: Arc<dyn FinancialLlm>) -> Self {
        Self {
            analyzer,
            llm,
            options: LlmAnalysisOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LlmAnalysisOptions) -> Self {
        self.options = options;
        self
    }

    pub fn llm(&self) -> Arc<dyn FinancialLlm> {
        Arc::clone(&self.llm)
    }

    pub async fn analyze(
        &self,
        document: &DocumentInput,
        progress: Option<Sender<AnalysisEvent>>,
    ) -> AnalysisReport {
        self.send_event(
            &progress,
            AnalysisEvent::Starting {
                document_kind: document.kind().to_string(),
            },
        )
        .await;

        let local = extract_metrics(document);
        self.send_event(
            &progress,
            AnalysisEvent::LocalExtraction {
                fields_found: local.known_count(),
            },
        )
        .await;

        let (metrics, audit) = match document.text_content() {
            Some(text) if self.options.structured_extraction && !text.trim().is_empty() => {
                self.enrich(local, &text, &progress).await
            }
            _ => (local, None),
        };

        let mut report = self.analyzer.analyze_metrics(metrics, None);
        report.merge_audit = audit;

        if self.options.insights && !report.is_insufficient() {
            self.send_event(&progress, AnalysisEvent::GeneratingInsights)
                .await;
            match self.llm.generate_insights(&report).await {
                Ok(insights) => report.insights = Some(insights),
                Err(e) => {
                    warn!("Insight generation failed, continuing without: {}", e);
                    self.degraded(&progress, "insights", e.to_string()).await;
                }
            }
        }

        self.send_event(&progress, AnalysisEvent::Success).await;
        report
    }

    /// Reads an image through the model's vision capability, then analyzes
    /// the returned text. A failed vision call yields an empty report.
    pub async fn analyze_image(
        &self,
        image: &ImageInput,
        progress: Option<Sender<AnalysisEvent>>,
    ) -> AnalysisReport {
        self.send_event(&progress, AnalysisEvent::VisionExtraction)
            .await;
        let document = match self.llm.vision_extract(image).await {
            Ok(raw_text) => DocumentInput::VisionExtraction { raw_text },
            Err(e) => {
                warn!("Vision extraction failed: {}", e);
                self.degraded(&progress, "vision", e.to_string()).await;
                DocumentInput::Unsupported
            }
        };
        self.analyze(&document, progress).await
    }

    /// Analyzes documents concurrently; report order matches input order.
    pub async fn analyze_batch(&self, documents: &[DocumentInput]) -> BatchAnalysis {
        info!(
            "Analyzing batch of {} documents with {}",
            documents.len(),
            self.llm.provider_name()
        );
        let reports = join_all(documents.iter().map(|doc| self.analyze(doc, None))).await;
        BatchAnalysis::from_reports(reports)
    }

    async fn enrich(
        &self,
        local: FinancialMetrics,
        text: &str,
        progress: &Option<Sender<AnalysisEvent>>,
    ) -> (FinancialMetrics, Option<MergeAudit>) {
        self.send_event(progress, AnalysisEvent::StructuredExtraction)
            .await;

        match self.llm.extract_structured_data(text).await {
            Ok(extraction) => {
                let (merged, audit) = merge_and_derive(&local, &extraction.metrics);
                self.send_event(
                    progress,
                    AnalysisEvent::Merged {
                        fields_changed: audit.changes.len(),
                    },
                )
                .await;
                (merged, Some(audit))
            }
            Err(e) => {
                warn!(
                    "Structured extraction via {} failed, using local metrics: {}",
                    self.llm.provider_name(),
                    e
                );
                self.degraded(progress, "structured_extraction", e.to_string())
                    .await;
                (local, None)
            }
        }
    }

    async fn degraded(
        &self,
        progress: &Option<Sender<AnalysisEvent>>,
        stage: &str,
        reason: String,
    ) {
        self.send_event(
            progress,
            AnalysisEvent::Degraded {
                stage: stage.to_string(),
                reason,
            },
        )
        .await;
    }

    async fn send_event(&self, sender: &Option<Sender<AnalysisEvent>>, event: AnalysisEvent) {
        if let Some(tx) = sender {
            let _ = tx.send(event).await;
        }
    }
}
