#![allow(unused)]

//! # transport: the LLM request/response seam
//!
//! This module defines a single trait ([`LlmTransport`]) and the plain data
//! types that cross it. The transport is the only part of the crate that
//! touches the network; everything else is a pure function over data.
//!
//! ## Contract
//! - One call to [`LlmTransport::request`] is one provider request. The
//!   transport never retries; retry policy belongs to the engine.
//! - [`dispatch`] is the suspension point callers go through. It yields
//!   [`TransportError::Cancelled`] when the token fires and
//!   [`TransportError::Timeout`] when the deadline passes, before or during
//!   the call, and drops the in-flight future in both cases.
//! - Failures are reported as distinct [`TransportError`] variants: network,
//!   HTTP status, policy refusal, provider-side schema violation, malformed
//!   body.
//!
//! ## Conformance levels
//! - [`Conformance::Strict`] (L1): the provider enforces the response schema.
//! - [`Conformance::FreeText`] (L2): the provider returns free text; the
//!   engine extracts and parses JSON itself and leans on its repair attempt.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, exported behind the default
//!   `test-export-mocks` feature so integration tests can script providers.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TransportError;
use crate::prompt::Prompt;

pub use http::OpenAiCompatibleTransport;

/// How much of the response contract the provider enforces itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conformance {
    Strict,
    FreeText,
}

/// Schema document attached to a request for strict-mode providers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    pub name: String,
    pub document: Value,
}

/// Per-call options. The deadline is absolute.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub schema: Option<ResponseSchema>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub deadline: Instant,
    pub cancel_token: CancellationToken,
}

/// Text body returned by the provider, before any JSON parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub text: String,
}

impl RawResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Trait for sending one prompt to a language-model provider.
///
/// Implementors translate the prompt and options into their provider's wire
/// format and report failures through [`TransportError`]; they should honour
/// `options.deadline` in their own client timeouts, but cancellation and
/// deadline enforcement around the call are handled by [`dispatch`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait LlmTransport: Send + Sync {
    /// Declared conformance level; decides how the engine parses responses.
    fn conformance(&self) -> Conformance;

    /// Send a single request to the provider.
    async fn request(
        &self,
        prompt: &Prompt,
        options: &RequestOptions,
    ) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: LlmTransport + ?Sized> LlmTransport for Arc<T> {
    fn conformance(&self) -> Conformance {
        (**self).conformance()
    }

    async fn request(
        &self,
        prompt: &Prompt,
        options: &RequestOptions,
    ) -> Result<RawResponse, TransportError> {
        (**self).request(prompt, options).await
    }
}

/// Perform one transport call under the options' deadline and cancel token.
pub async fn dispatch<T>(
    transport: &T,
    prompt: &Prompt,
    options: &RequestOptions,
) -> Result<RawResponse, TransportError>
where
    T: LlmTransport + ?Sized,
{
    if options.cancel_token.is_cancelled() {
        return Err(TransportError::Cancelled);
    }
    if Instant::now() >= options.deadline {
        return Err(TransportError::Timeout);
    }

    debug!(
        conformance = ?transport.conformance(),
        schema = options.schema.as_ref().map(|s| s.name.as_str()),
        "[TRANSPORT] Sending provider request"
    );

    tokio::select! {
        biased;
        _ = options.cancel_token.cancelled() => Err(TransportError::Cancelled),
        outcome = tokio::time::timeout_at(options.deadline, transport.request(prompt, options)) => {
            match outcome {
                Ok(result) => result,
                Err(_elapsed) => Err(TransportError::Timeout),
            }
        }
    }
}
