use log::debug;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::error::{FinancialAnalysisError, Result};
use crate::llm::types::*;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Raw REST client for the OpenAI chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    vision_model: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let model = model.into();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
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

    fn build_messages(request: &CompletionRequest) -> Vec<OpenAiMessage> {
        let mut messages = vec![OpenAiMessage {
            role: "system".to_string(),
            content: OpenAiContent::Text(request.system.clone()),
        }];

        let last_user = request
            .messages
            .iter()
            .rposition(|m| m.role == Role::User);

        for (i, message) in request.messages.iter().enumerate() {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            let content = match (&request.image, Some(i) == last_user) {
                (Some(image), true) => OpenAiContent::Parts(vec![
                    OpenAiContentPart::Text {
                        text: message.content.clone(),
                    },
                    OpenAiContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_url(),
                        },
                    },
                ]),
                _ => OpenAiContent::Text(message.content.clone()),
            };
            messages.push(OpenAiMessage {
                role: role.to_string(),
                content,
            });
        }
        messages
    }

    pub(crate) async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let model = if request.image.is_some() {
            &self.vision_model
        } else {
            &self.model
        };

        // Schema text is carried by the prompt; the endpoint only guarantees JSON.
        let payload = ChatCompletionRequest {
            model: model.clone(),
            messages: Self::build_messages(request),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .response_schema
                .as_ref()
                .map(|_| json!({ "type": "json_object" })),
        };

        debug!("Sending OpenAI request to model {}", model);
        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(FinancialAnalysisError::LlmRequestFailed(format!(
                "OpenAI API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: ChatCompletionResponse = res.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                FinancialAnalysisError::InvalidLlmResponse("No message content returned".to_string())
            })
    }
}
