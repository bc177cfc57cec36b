//! Client for the OpenAI chat-completions API.

use std::future::Future;

use super::types::{ApiErrorBody, ApiErrorEnvelope, ChatMessage, ChatRequest, ChatResponse};
use crate::error::CompletionError;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Anything that can turn a prompt into generated text.
pub trait CompletionService {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send;
}

/// Sends single-turn prompts to a fixed model
#[derive(Clone)]
pub struct CompletionClient {
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

impl CompletionClient {
    /// Create a client for the default endpoint
    pub fn new(api_key: Option<String>) -> Self {
        Self::builder().api_key(api_key).build()
    }

    pub fn builder() -> CompletionClientBuilder {
        CompletionClientBuilder::default()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The whole prompt goes out as one system message.
    pub fn chat_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(prompt)],
        }
    }
}

impl CompletionService for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .clone()
            .ok_or(CompletionError::MissingApiKey)?;
        let request = self.chat_request(prompt);
        let endpoint = self.endpoint.clone();

        tracing::debug!(model = %request.model, prompt_len = prompt.len(), "Requesting completion");

        // smolhttp is synchronous
        let response_text = smol::unblock(move || send_request(&endpoint, &api_key, &request)).await?;

        parse_chat_response(&response_text).inspect_err(|e| {
            tracing::warn!("Completion failed: {}", e);
        })
    }
}

fn send_request(
    endpoint: &str,
    api_key: &str,
    request: &ChatRequest,
) -> Result<String, CompletionError> {
    let body = serde_json::to_string(request)
        .map_err(|e| CompletionError::Transport(format!("Failed to serialize request: {}", e)))?;

    let response = smolhttp::Client::new(endpoint)
        .map_err(|e| CompletionError::Transport(format!("Failed to create HTTP client: {}", e)))?
        .post()
        .headers(vec![
            ("authorization".to_string(), format!("Bearer {}", api_key)),
            ("content-type".to_string(), "application/json".to_string()),
        ])
        .body(body.into())
        .send()
        .map_err(|e| CompletionError::Transport(e.to_string()))?;

    Ok(response.text())
}

/// Extracts the first choice's text, or classifies the service's error body.
pub fn parse_chat_response(response_text: &str) -> Result<String, CompletionError> {
    if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(response_text) {
        return Err(classify_api_error(envelope.error));
    }

    let response: ChatResponse = serde_json::from_str(response_text).map_err(|e| {
        CompletionError::InvalidResponse(format!("{}. Response: {}", e, response_text))
    })?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CompletionError::InvalidResponse("no choices in response".to_string()))
}

fn classify_api_error(error: ApiErrorBody) -> CompletionError {
    let code = error.code.as_deref().unwrap_or_default();
    let error_type = error.error_type.as_deref().unwrap_or_default();

    match (code, error_type) {
        ("invalid_api_key", _) | (_, "authentication_error") => CompletionError::Auth(error.message),
        ("rate_limit_exceeded" | "insufficient_quota", _)
        | (_, "rate_limit_error" | "insufficient_quota") => {
            CompletionError::RateLimited(error.message)
        }
        _ => CompletionError::Api(error.message),
    }
}

/// Builder for creating clients with custom configuration
pub struct CompletionClientBuilder {
    api_key: Option<String>,
    endpoint: String,
}

impl Default for CompletionClientBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl CompletionClientBuilder {
    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn build(self) -> CompletionClient {
        CompletionClient {
            api_key: self.api_key,
            endpoint: self.endpoint,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}
