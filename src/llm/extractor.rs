use crate::composer::{parse_structured_metrics, StructuredExtraction};
use crate::error::{FinancialAnalysisError, Result};
use crate::llm::prompts::{extraction_prompt, SYSTEM_PROMPT_EXTRACTION};
use crate::llm::types::{ChatMessage, CompletionRequest};

/// Request asking a model for the canonical metrics stated in `document_text`,
/// constrained to the `StructuredExtraction` schema.
pub fn extraction_request(document_text: &str) -> Result<CompletionRequest> {
    let schema = StructuredExtraction::response_schema()?;
    let schema_text = serde_json::to_string_pretty(&schema)?;

    Ok(CompletionRequest::new(SYSTEM_PROMPT_EXTRACTION)
        .message(ChatMessage::user(extraction_prompt(document_text, &schema_text)))
        .schema(schema)
        .temperature(0.0))
}

/// Reads the model's answer. Anything without at least one known metric is an
/// error so the caller falls back to local extraction.
pub fn parse_extraction(raw: &str) -> Result<StructuredExtraction> {
    parse_structured_metrics(raw).ok_or_else(|| {
        let preview: String = raw.chars().take(200).collect();
        FinancialAnalysisError::InvalidLlmResponse(format!(
            "No usable metrics in extraction response: {}",
            preview
        ))
    })
}
