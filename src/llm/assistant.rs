use log::debug;
use std::sync::Arc;

use crate::error::Result;
use crate::llm::provider::FinancialLlm;
use crate::llm::types::ChatMessage;
use crate::schema::AnalysisReport;

/// Number of prior messages sent along with each question.
pub const HISTORY_WINDOW: usize = 5;

/// Conversational Q&A over one analysis report.
pub struct FinancialAssistant {
    llm: Arc<dyn FinancialLlm>,
    report: AnalysisReport,
    history: Vec<ChatMessage>,
}

impl FinancialAssistant {
    pub fn new(llm: Arc<dyn FinancialLlm>, report: AnalysisReport) -> Self {
        Self {
            llm,
            report,
            history: Vec::new(),
        }
    }

    /// Ask a question about the current report.
    ///
    /// The exchange is recorded only when the model answers, so a failed call
    /// can simply be retried.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let start = self.history.len().saturating_sub(HISTORY_WINDOW);
        let recent = &self.history[start..];
        debug!(
            "Asking {} with {} messages of history",
            self.llm.provider_name(),
            recent.len()
        );

        let answer = self
            .llm
            .answer_question(question, &self.report, recent)
            .await?;

        self.history.push(ChatMessage::user(question));
        self.history.push(ChatMessage::assistant(answer.clone()));
        Ok(answer)
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn report(&self) -> &AnalysisReport {
        &self.report
    }

    /// Switches to another report and starts a fresh conversation.
    pub fn set_report(&mut self, report: AnalysisReport) {
        self.report = report;
        self.reset_conversation();
    }

    pub fn reset_conversation(&mut self) {
        self.history.clear();
    }
}
