use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::error::{FinancialAnalysisError, Result};
use crate::llm::types::*;
use crate::llm::utils::clean_schema;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Raw REST client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    vision_model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let model = model.into();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            vision_model: model.clone(),
            model,
        })
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let model = if request.image.is_some() {
            &self.vision_model
        } else {
            &self.model
        };
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let mut contents: Vec<Content> = request.messages.iter().map(Content::from_message).collect();
        if let Some(image) = &request.image {
            let part = Part::InlineData {
                inline_data: Blob {
                    mime_type: image.mime_type.clone(),
                    data: image.base64(),
                },
            };
            match contents.iter_mut().rev().find(|c| c.role == "user") {
                Some(last_user) => last_user.parts.push(part),
                None => contents.push(Content {
                    role: "user".to_string(),
                    parts: vec![part],
                }),
            }
        }

        let response_schema = request.response_schema.clone().map(|mut schema| {
            clean_schema(&mut schema);
            schema
        });
        let payload = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::user(request.system.clone())),
            generation_config: Some(GenerationConfig {
                response_mime_type: response_schema
                    .as_ref()
                    .map(|_| "application/json".to_string()),
                response_schema,
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            }),
        };

        debug!("Sending Gemini request to model {}", model);
        let res = self.client.post(&url).json(&payload).send().await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(FinancialAnalysisError::LlmRequestFailed(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;
        let parts = body
            .candidates
            .ok_or_else(|| {
                FinancialAnalysisError::InvalidLlmResponse("No candidates returned".to_string())
            })?
            .into_iter()
            .next()
            .ok_or_else(|| {
                FinancialAnalysisError::InvalidLlmResponse("Empty candidates list".to_string())
            })?
            .content
            .parts;

        let text: String = parts
            .into_iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text),
                Part::InlineData { .. } => None,
            })
            .collect();

        if text.trim().is_empty() {
            return Err(FinancialAnalysisError::InvalidLlmResponse(
                "Model returned no text content".to_string(),
            ));
        }
        Ok(text)
    }
}
