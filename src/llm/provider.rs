use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::composer::StructuredExtraction;
use crate::error::{FinancialAnalysisError, Result};
use crate::llm::client::GeminiClient;
use crate::llm::extractor::{extraction_request, parse_extraction};
use crate::llm::openai::OpenAiClient;
use crate::llm::prompts::{
    insights_prompt, qa_system_prompt, SYSTEM_PROMPT_ANALYST, SYSTEM_PROMPT_VISION, VISION_PROMPT,
};
use crate::llm::types::{ChatMessage, CompletionRequest, ImageInput};
use crate::schema::AnalysisReport;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// The capabilities the analysis pipeline needs from a language model.
///
/// Implemented by `LlmBackend` for the real providers and by test doubles.
#[async_trait]
pub trait FinancialLlm: Send + Sync {
    /// Metrics explicitly stated in `document_text`, plus free-text notes.
    async fn extract_structured_data(&self, document_text: &str) -> Result<StructuredExtraction>;

    async fn generate_insights(&self, report: &AnalysisReport) -> Result<String>;

    async fn answer_question(
        &self,
        question: &str,
        report: &AnalysisReport,
        history: &[ChatMessage],
    ) -> Result<String>;

    /// Raw text read from an image of a statement.
    async fn vision_extract(&self, image: &ImageInput) -> Result<String>;

    fn provider_name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Gemini,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Gemini => "gemini",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => DEFAULT_OPENAI_MODEL,
            LlmProvider::Gemini => DEFAULT_GEMINI_MODEL,
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = FinancialAnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            other => Err(FinancialAnalysisError::Configuration(format!(
                "Unknown LLM provider '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub model: String,
    pub vision_model: Option<String>,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(provider: LlmProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            vision_model: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new(LlmProvider::OpenAi, api_key)
    }

    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::new(LlmProvider::Gemini, api_key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `LLM_PROVIDER` (defaults to whichever API key is set, OpenAI
    /// first), the provider's key and model variables, and `LLM_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let provider = match non_empty_var("LLM_PROVIDER") {
            Some(name) => name.parse()?,
            None if non_empty_var("OPENAI_API_KEY").is_some() => LlmProvider::OpenAi,
            None if non_empty_var("GEMINI_API_KEY").is_some() => LlmProvider::Gemini,
            None => {
                return Err(FinancialAnalysisError::Configuration(
                    "Set OPENAI_API_KEY or GEMINI_API_KEY to enable LLM features".to_string(),
                ))
            }
        };

        let (key_var, model_var, vision_var) = match provider {
            LlmProvider::OpenAi => ("OPENAI_API_KEY", "OPENAI_MODEL", Some("OPENAI_VISION_MODEL")),
            LlmProvider::Gemini => ("GEMINI_API_KEY", "GEMINI_MODEL", None),
        };

        let api_key = non_empty_var(key_var).ok_or_else(|| {
            FinancialAnalysisError::Configuration(format!("{} is not set", key_var))
        })?;

        let mut config = Self::new(provider, api_key);
        if let Some(model) = non_empty_var(model_var) {
            config.model = model;
        }
        config.vision_model = vision_var.and_then(non_empty_var);

        if let Some(secs) = non_empty_var("LLM_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                FinancialAnalysisError::Configuration(format!(
                    "LLM_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    secs
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Provider implementations selected by `LlmConfig`.
#[derive(Clone)]
pub enum LlmBackend {
    OpenAi(OpenAiClient),
    Gemini(GeminiClient),
}

impl LlmBackend {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let backend = match config.provider {
            LlmProvider::OpenAi => {
                let mut client =
                    OpenAiClient::new(config.api_key.clone(), config.model.clone(), config.timeout)?;
                if let Some(vision) = &config.vision_model {
                    client = client.with_vision_model(vision.clone());
                }
                LlmBackend::OpenAi(client)
            }
            LlmProvider::Gemini => {
                let mut client =
                    GeminiClient::new(config.api_key.clone(), config.model.clone(), config.timeout)?;
                if let Some(vision) = &config.vision_model {
                    client = client.with_vision_model(vision.clone());
                }
                LlmBackend::Gemini(client)
            }
        };
        Ok(backend)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(&LlmConfig::from_env()?)
    }

    pub fn provider(&self) -> LlmProvider {
        match self {
            LlmBackend::OpenAi(_) => LlmProvider::OpenAi,
            LlmBackend::Gemini(_) => LlmProvider::Gemini,
        }
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        match self {
            LlmBackend::OpenAi(client) => client.complete(request).await,
            LlmBackend::Gemini(client) => client.complete(request).await,
        }
    }
}

#[async_trait]
impl FinancialLlm for LlmBackend {
    async fn extract_structured_data(&self, document_text: &str) -> Result<StructuredExtraction> {
        let request = extraction_request(document_text)?;
        let raw = self.complete(&request).await?;
        parse_extraction(&raw)
    }

    async fn generate_insights(&self, report: &AnalysisReport) -> Result<String> {
        let request = CompletionRequest::new(SYSTEM_PROMPT_ANALYST)
            .message(ChatMessage::user(insights_prompt(report)))
            .temperature(0.7)
            .max_tokens(1000);
        self.complete(&request).await
    }

    async fn answer_question(
        &self,
        question: &str,
        report: &AnalysisReport,
        history: &[ChatMessage],
    ) -> Result<String> {
        let request = CompletionRequest::new(qa_system_prompt(report))
            .messages(history.iter().cloned())
            .message(ChatMessage::user(question))
            .temperature(0.7)
            .max_tokens(500);
        self.complete(&request).await
    }

    async fn vision_extract(&self, image: &ImageInput) -> Result<String> {
        let request = CompletionRequest::new(SYSTEM_PROMPT_VISION)
            .message(ChatMessage::user(VISION_PROMPT))
            .image(image.clone())
            .max_tokens(1500);
        self.complete(&request).await
    }

    fn provider_name(&self) -> &'static str {
        self.provider().as_str()
    }
}
