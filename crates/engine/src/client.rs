//! Blocking client for the Anthropic messages API.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tcfd_core::{Error, Result};

use crate::generator::{
    CompletionError, CompletionRequest, CompletionService, DEFAULT_API_VERSION, DEFAULT_ENDPOINT,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Completion service backed by `POST /v1/messages`.
pub struct AnthropicClient {
    client: reqwest::blocking::Client,
    api_key: String,
    endpoint: String,
    api_version: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }
}

impl CompletionService for AnthropicClient {
    fn complete(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> std::result::Result<String, CompletionError> {
        let body = MessagesRequest {
            model,
            max_tokens: request.max_tokens,
            messages: [Message {
                role: "user",
                content: &request.instruction,
            }],
        };

        log::debug!("Requesting completion from {}", model);
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(model, status.as_u16(), &text));
        }

        extract_text(&text)
    }
}

/// Map an error response to a completion error.
fn classify_failure(model: &str, status: u16, body: &str) -> CompletionError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let not_found = status == 404
        || envelope
            .as_ref()
            .map(|e| e.error.kind == "not_found_error")
            .unwrap_or(false);
    if not_found {
        return CompletionError::ModelUnavailable(model.to_string());
    }
    CompletionError::Api {
        status,
        message: envelope
            .map(|e| e.error.message)
            .unwrap_or_else(|| body.chars().take(200).collect()),
    }
}

/// Pull the first text block out of a messages response.
fn extract_text(body: &str) -> std::result::Result<String, CompletionError> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;
    response
        .content
        .into_iter()
        .find_map(|block| block.text)
        .ok_or_else(|| CompletionError::InvalidResponse("no text block in response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let body = MessagesRequest {
            model: "m",
            max_tokens: 2000,
            messages: [Message {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["max_tokens"], 2000);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_extract_text() {
        let body = r#"{"content":[{"type":"text","text":"a ||| b ||| c"}]}"#;
        assert_eq!(extract_text(body).unwrap(), "a ||| b ||| c");
        assert!(matches!(
            extract_text(r#"{"content":[]}"#),
            Err(CompletionError::InvalidResponse(_))
        ));
        assert!(extract_text("not json").is_err());
    }

    #[test]
    fn test_not_found_is_model_unavailable() {
        let body = r#"{"type":"error","error":{"type":"not_found_error","message":"model: x"}}"#;
        assert!(classify_failure("x", 400, body).is_model_unavailable());
        assert!(classify_failure("x", 404, "").is_model_unavailable());
    }

    #[test]
    fn test_other_failures_are_not_retryable() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        match classify_failure("x", 401, body) {
            CompletionError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid x-api-key");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
