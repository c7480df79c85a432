//! Transport for any provider exposing an OpenAI-compatible
//! `/chat/completions` endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::{Conformance, LlmTransport, RawResponse, RequestOptions};
use crate::config::ProviderConfig;
use crate::error::TransportError;
use crate::prompt::Prompt;

const ERROR_BODY_LIMIT: usize = 512;

pub struct OpenAiCompatibleTransport {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    conformance: Conformance,
}

impl OpenAiCompatibleTransport {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            conformance: config.conformance,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    /// Request body for one call. Strict providers get the schema as a
    /// `json_schema` response format; free-text providers get none.
    pub fn request_body(&self, prompt: &Prompt, options: &RequestOptions) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });
        if let (Conformance::Strict, Some(schema)) = (self.conformance, &options.schema) {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "strict": true,
                    "schema": schema.document,
                },
            });
        }
        body
    }
}

#[async_trait]
impl LlmTransport for OpenAiCompatibleTransport {
    fn conformance(&self) -> Conformance {
        self.conformance
    }

    async fn request(
        &self,
        prompt: &Prompt,
        options: &RequestOptions,
    ) -> Result<RawResponse, TransportError> {
        let remaining = options.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransportError::Timeout);
        }

        let body = self.request_body(prompt, options);
        info!(model = %self.model, url = %self.completions_url(), "[TRANSPORT] POST chat completion");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .timeout(remaining)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    error!(error = ?e, "[TRANSPORT][ERROR] Request failed");
                    TransportError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network(e.to_string())
            }
        })?;
        debug!(status, bytes = text.len(), "[TRANSPORT] Response received");

        interpret_chat_completion(status, &text)
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(ERROR_BODY_LIMIT).collect()
}

/// Map a chat-completion HTTP response onto a [`RawResponse`] or a
/// [`TransportError`]. Pure, so the mapping is testable without a server.
pub fn interpret_chat_completion(status: u16, body: &str) -> Result<RawResponse, TransportError> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if !(200..300).contains(&status) {
        let code = parsed
            .as_ref()
            .and_then(|v| v.pointer("/error/code"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let message = parsed
            .as_ref()
            .and_then(|v| v.pointer("/error/message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| truncate(body));
        return Err(match code {
            "content_policy_violation" | "content_filter" => TransportError::PolicyRefusal(message),
            "json_validate_failed" | "invalid_json_output" => TransportError::SchemaViolation(message),
            _ => TransportError::Http {
                status,
                body: truncate(body),
            },
        });
    }

    let Some(value) = parsed else {
        return Err(TransportError::Malformed("response body is not JSON".into()));
    };
    if !value.is_object() {
        return Err(TransportError::Malformed("response body is not a JSON object".into()));
    }

    let choice = value
        .pointer("/choices/0")
        .ok_or_else(|| TransportError::Malformed("response has no choices".into()))?;

    if let Some(refusal) = choice.pointer("/message/refusal").and_then(Value::as_str) {
        return Err(TransportError::PolicyRefusal(refusal.to_string()));
    }
    if choice.get("finish_reason").and_then(Value::as_str) == Some("content_filter") {
        return Err(TransportError::PolicyRefusal(
            "completion stopped by content filter".into(),
        ));
    }

    match choice.pointer("/message/content").and_then(Value::as_str) {
        Some(content) if !content.trim().is_empty() => Ok(RawResponse::new(content)),
        _ => Err(TransportError::Malformed("completion has no content".into())),
    }
}
