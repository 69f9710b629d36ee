use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinancialAnalysisError {
    #[error("Invalid benchmark table: {0}")]
    InvalidBenchmarkTable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("LLM request failed: {0}")]
    LlmRequestFailed(String),

    #[error("LLM returned an unusable response: {0}")]
    InvalidLlmResponse(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "llm")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, FinancialAnalysisError>;
