//! High-level pipeline: orchestrates prompt → transport → parse → validate →
//! post-process for one generation request.
//!
//! # Responsibilities
//! - Resolves the request deadline (caller's, or now + the configured default)
//! - Assembles the prompt and attaches the composed schema for strict providers
//! - Spends at most one repair call on a transport-class or parse failure
//! - Validates against the composed schema; validation failures are final
//! - Post-processes and re-checks the emitted value before returning it
//!
//! # Failure policy
//! Policy refusals, timeouts and cancellations are never repaired. A schema
//! violation is returned with its first offending path and no further calls.
//!
//! # Cancellation
//! The cancel token and deadline are checked before the provider call,
//! between the call and the repair decision, and before returning; the
//! provider call itself is abandoned if either fires while it is in flight.
//!
//! # Navigation
//! - Entrypoints: [`GenerationEngine::generate_deck`],
//!   [`GenerationEngine::generate_citations`],
//!   [`GenerationEngine::generate_citation_detail`]
//! - Citation search façade: [`crate::citations::CitationResolver`]

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::citations::{clamp_relevance, rank_citations, CitationResolver};
use crate::config::EngineConfig;
use crate::error::{GenerationError, Result};
use crate::model::{Citation, CitationResult, Deck, DeckRequest, GenerationRequest, TaskKind};
use crate::parse::parse_response;
use crate::postprocess::PostProcessor;
use crate::prompt::{Prompt, PromptAssembler, RepairCause};
use crate::schema::{ComposedSchema, SchemaComposer};
use crate::transport::{self, Conformance, LlmTransport, RawResponse, RequestOptions, ResponseSchema};
use crate::error::TransportError;

/// Per-request pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Prompting,
    Awaiting,
    Parsing,
    Repairing,
    Validating,
    PostProcessing,
    Done,
    Failed,
}

/// Tracks one request through the state machine and rejects transitions the
/// pipeline must never take.
#[derive(Debug)]
pub struct RunState {
    task: TaskKind,
    stage: Stage,
    repaired: bool,
    history: Vec<Stage>,
}

impl RunState {
    pub fn new(task: TaskKind) -> Self {
        Self {
            task,
            stage: Stage::Idle,
            repaired: false,
            history: vec![Stage::Idle],
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn advance(&mut self, next: Stage) -> Result<()> {
        use Stage::*;
        let legal = match (self.stage, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Repairing, Awaiting) => true,
            (Parsing | Awaiting, Repairing) => !self.repaired,
            (from, to) => matches!(
                (from, to),
                (Idle, Prompting)
                    | (Prompting, Awaiting)
                    | (Awaiting, Parsing)
                    | (Parsing, Validating)
                    | (Validating, PostProcessing)
                    | (PostProcessing, Done)
            ),
        };
        if !legal {
            return Err(GenerationError::Internal(format!(
                "illegal pipeline transition {:?} -> {:?} for {}",
                self.stage,
                next,
                self.task.as_str()
            )));
        }
        if next == Repairing {
            self.repaired = true;
        }
        debug!(task = self.task.as_str(), from = ?self.stage, to = ?next, "[SCGE] Stage transition");
        self.stage = next;
        self.history.push(next);
        Ok(())
    }
}

/// Outcome of one provider attempt that did not yield a JSON object.
enum AttemptFailure {
    /// Worth the single repair call; `error` is what surfaces if the repair
    /// fails the same way.
    Repairable {
        cause: RepairCause,
        diagnostic: String,
        error: GenerationError,
    },
    Fatal(GenerationError),
}

fn checkpoint(cancel: &CancellationToken, deadline: Instant) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(GenerationError::Cancelled);
    }
    if Instant::now() >= deadline {
        return Err(GenerationError::Timeout);
    }
    Ok(())
}

fn decode<D: DeserializeOwned>(value: Value, what: &str) -> Result<D> {
    serde_json::from_value(value)
        .map_err(|e| GenerationError::Internal(format!("validated {what} failed to deserialize: {e}")))
}

fn deadline_from_ms(deadline_ms: Option<u64>) -> Option<Instant> {
    deadline_ms.map(|ms| Instant::now() + Duration::from_millis(ms))
}

/// The structured content generation engine. Holds no request-scoped state,
/// so one engine can serve concurrent requests.
pub struct GenerationEngine<T> {
    transport: T,
    composer: SchemaComposer,
    config: EngineConfig,
}

impl<T: LlmTransport> GenerationEngine<T> {
    pub fn new(transport: T, config: EngineConfig) -> Self {
        Self::with_composer(transport, SchemaComposer::default(), config)
    }

    pub fn with_composer(transport: T, composer: SchemaComposer, config: EngineConfig) -> Self {
        config.trace_loaded();
        Self {
            transport,
            composer,
            config,
        }
    }

    pub fn composer(&self) -> &SchemaComposer {
        &self.composer
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Citation search and detail façade sharing this engine.
    pub fn citations(&self) -> CitationResolver<'_, T> {
        CitationResolver::new(self)
    }

    /// Generate a validated, post-processed deck from free-form legal prose.
    pub async fn generate_deck(&self, request: DeckRequest, cancel: &CancellationToken) -> Result<Deck> {
        if request.input.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        let request = GenerationRequest::new(TaskKind::Deck, request.input)
            .with_hints(request.hints)
            .with_deadline(deadline_from_ms(request.deadline_ms));
        let schema = self.composer.deck_schema();

        self.run(&request, schema, self.config.deck_temperature, cancel, |value| {
            let deck: Deck = decode(value, "deck")?;
            let deck = PostProcessor::new(self.composer.registry()).process(deck);
            let emitted = serde_json::to_value(&deck)
                .map_err(|e| GenerationError::Internal(format!("deck failed to serialize: {e}")))?;
            if let Err(violation) = self.composer.validate(&emitted, schema) {
                return Err(GenerationError::Internal(format!(
                    "post-processed deck violates schema at {}: {}",
                    violation.path, violation.expected
                )));
            }
            info!(
                slides = deck.total_slides,
                blocks = deck.slides.iter().map(|s| s.blocks.len()).sum::<usize>(),
                "[SCGE] Deck post-processed"
            );
            Ok(deck)
        })
        .await
    }

    /// Run a citation search. The result is ranked, clamped and deduplicated;
    /// input normalization is the resolver's job.
    pub async fn generate_citations(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<CitationResult> {
        let schema = self.composer.citation_result_schema();
        self.run(&request, schema, self.config.citation_temperature, cancel, |value| {
            let result: CitationResult = decode(value, "citation result")?;
            Ok(rank_citations(result))
        })
        .await
    }

    /// Fetch an expanded explanation of a single named authority.
    pub async fn generate_citation_detail(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Citation> {
        let schema = self.composer.citation_schema();
        self.run(&request, schema, self.config.citation_temperature, cancel, |value| {
            let mut citation: Citation = decode(value, "citation")?;
            citation.relevance = clamp_relevance(citation.relevance);
            Ok(citation)
        })
        .await
    }

    async fn run<R, F>(
        &self,
        request: &GenerationRequest,
        schema: &ComposedSchema,
        temperature: f32,
        cancel: &CancellationToken,
        finish: F,
    ) -> Result<R>
    where
        F: FnOnce(Value) -> Result<R>,
    {
        let mut state = RunState::new(request.kind);
        let started = Instant::now();
        info!(task = request.kind.as_str(), input_len = request.input.len(), "[SCGE] Starting generation");

        let outcome = self
            .drive(&mut state, request, schema, temperature, cancel, finish)
            .await;

        match &outcome {
            Ok(_) => info!(
                task = request.kind.as_str(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                repaired = state.repaired,
                "[SCGE] Generation complete"
            ),
            Err(e) => {
                let failed_at = state.stage();
                // Done/Failed are terminal; anything else may still fail
                let _ = state.advance(Stage::Failed);
                match e {
                    GenerationError::Cancelled | GenerationError::Timeout => warn!(
                        task = request.kind.as_str(),
                        stage = ?failed_at,
                        error = %e,
                        "[SCGE] Generation stopped"
                    ),
                    _ => error!(
                        task = request.kind.as_str(),
                        stage = ?failed_at,
                        kind = e.kind(),
                        error = %e,
                        "[SCGE][ERROR] Generation failed"
                    ),
                }
            }
        }
        outcome
    }

    async fn drive<R, F>(
        &self,
        state: &mut RunState,
        request: &GenerationRequest,
        schema: &ComposedSchema,
        temperature: f32,
        cancel: &CancellationToken,
        finish: F,
    ) -> Result<R>
    where
        F: FnOnce(Value) -> Result<R>,
    {
        let deadline = request
            .deadline
            .unwrap_or_else(|| Instant::now() + self.config.default_timeout());

        state.advance(Stage::Prompting)?;
        let conformance = self.transport.conformance();
        let prompt = PromptAssembler::new(&self.composer).assemble(request, conformance);
        let options = RequestOptions {
            schema: Some(ResponseSchema {
                name: schema.name().to_string(),
                document: schema.document().clone(),
            }),
            temperature,
            max_tokens: self.config.max_tokens,
            deadline,
            cancel_token: cancel.clone(),
        };

        checkpoint(cancel, deadline)?;
        state.advance(Stage::Awaiting)?;
        let first = transport::dispatch(&self.transport, &prompt, &options).await;
        checkpoint(cancel, deadline)?;

        let value = match self.interpret(state, first, conformance)? {
            Ok(value) => value,
            Err(AttemptFailure::Fatal(e)) => return Err(e),
            Err(AttemptFailure::Repairable { cause, diagnostic, .. }) => {
                state.advance(Stage::Repairing)?;
                warn!(
                    task = request.kind.as_str(),
                    diagnostic = %diagnostic,
                    "[SCGE][REPAIR] First response unusable, attempting one repair"
                );
                let repair_prompt: Prompt = prompt.with_repair_notice(cause, &diagnostic);
                state.advance(Stage::Awaiting)?;
                let second = transport::dispatch(&self.transport, &repair_prompt, &options).await;
                match self.interpret(state, second, conformance)? {
                    Ok(value) => value,
                    Err(AttemptFailure::Fatal(e)) => return Err(e),
                    Err(AttemptFailure::Repairable { error, .. }) => return Err(error),
                }
            }
        };

        state.advance(Stage::Validating)?;
        if let Err(violation) = self.composer.validate(&value, schema) {
            return Err(GenerationError::SchemaInvalid {
                path: violation.path,
                expected: violation.expected,
            });
        }

        state.advance(Stage::PostProcessing)?;
        let output = finish(value)?;

        checkpoint(cancel, deadline)?;
        state.advance(Stage::Done)?;
        Ok(output)
    }

    /// Classify one provider attempt. The outer `Result` carries state
    /// machine bugs; the inner one separates usable JSON from failures.
    fn interpret(
        &self,
        state: &mut RunState,
        attempt: std::result::Result<RawResponse, TransportError>,
        conformance: Conformance,
    ) -> Result<std::result::Result<Value, AttemptFailure>> {
        let raw = match attempt {
            Ok(raw) => raw,
            Err(e) if e.is_repairable() => {
                let cause = match e {
                    TransportError::SchemaViolation(_) | TransportError::Malformed(_) => {
                        RepairCause::InvalidResponse
                    }
                    _ => RepairCause::ProviderFailure,
                };
                return Ok(Err(AttemptFailure::Repairable {
                    cause,
                    diagnostic: e.to_string(),
                    error: e.into(),
                }))
            }
            Err(e) => return Ok(Err(AttemptFailure::Fatal(e.into()))),
        };

        state.advance(Stage::Parsing)?;
        match parse_response(&raw.text, conformance) {
            Ok(value) => Ok(Ok(value)),
            Err(failure) => {
                debug!(bytes = raw.text.len(), reason = %failure, "[SCGE] Response did not parse");
                Ok(Err(AttemptFailure::Repairable {
                    cause: RepairCause::InvalidResponse,
                    diagnostic: failure.0.clone(),
                    error: GenerationError::Transport(failure.0),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        let mut state = RunState::new(TaskKind::Deck);
        for stage in [
            Stage::Prompting,
            Stage::Awaiting,
            Stage::Parsing,
            Stage::Repairing,
            Stage::Awaiting,
            Stage::Parsing,
            Stage::Validating,
            Stage::PostProcessing,
            Stage::Done,
        ] {
            state.advance(stage).unwrap();
        }
        assert_eq!(state.history().len(), 10);
    }

    #[test]
    fn repairing_is_entered_at_most_once() {
        let mut state = RunState::new(TaskKind::Deck);
        state.advance(Stage::Prompting).unwrap();
        state.advance(Stage::Awaiting).unwrap();
        state.advance(Stage::Repairing).unwrap();
        state.advance(Stage::Awaiting).unwrap();
        assert!(matches!(
            state.advance(Stage::Repairing),
            Err(GenerationError::Internal(_))
        ));
    }

    #[test]
    fn any_live_stage_may_fail_but_terminal_stages_are_final() {
        let mut state = RunState::new(TaskKind::Citations);
        state.advance(Stage::Prompting).unwrap();
        state.advance(Stage::Failed).unwrap();
        assert!(state.advance(Stage::Failed).is_err());
        assert!(state.advance(Stage::Awaiting).is_err());
    }

    #[test]
    fn skipping_validation_is_rejected() {
        let mut state = RunState::new(TaskKind::Deck);
        state.advance(Stage::Prompting).unwrap();
        state.advance(Stage::Awaiting).unwrap();
        state.advance(Stage::Parsing).unwrap();
        assert!(state.advance(Stage::PostProcessing).is_err());
    }

    #[test]
    fn checkpoint_prefers_cancellation_over_timeout() {
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(
            checkpoint(&token, Instant::now()),
            Err(GenerationError::Cancelled)
        );
        assert_eq!(
            checkpoint(&CancellationToken::new(), Instant::now()),
            Err(GenerationError::Timeout)
        );
    }
}
