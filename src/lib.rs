//! Structured content generation for legal slide decks and citation lookup.
//!
//! A [`GenerationEngine`] turns free-form legal prose into a validated,
//! post-processed [`Deck`] by driving an [`LlmTransport`] against schemas
//! composed from the [`BlockRegistry`]. Citation search and detail lookups
//! go through the same pipeline via [`CitationResolver`].

pub mod citations;
pub mod config;
pub mod engine;
pub mod error;
pub mod markup;
pub mod model;
pub mod parse;
pub mod postprocess;
pub mod prompt;
pub mod registry;
pub mod schema;
pub mod transport;

pub use citations::{rank_citations, CitationResolver};
pub use config::{load_config, AppConfig, EngineConfig, ProviderConfig};
pub use engine::{GenerationEngine, Stage};
pub use error::{GenerationError, TransportError};
pub use model::{
    Block, BlockContent, BlockKind, Citation, CitationDetailRequest, CitationKind, CitationQuery,
    CitationResult, Deck, DeckRequest, Slide, StyleHints,
};
pub use registry::BlockRegistry;
pub use schema::{SchemaComposer, SchemaViolation, SlideBounds};
pub use transport::{Conformance, LlmTransport, OpenAiCompatibleTransport};
pub use tokio_util::sync::CancellationToken;
