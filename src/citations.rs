//! Citation search and detail lookup on top of the generation engine.
//!
//! The resolver owns input normalization and stamps the result with the
//! normalized query and the measured search time. Ranking runs inside the
//! engine's post-processing stage via [`rank_citations`].

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::GenerationEngine;
use crate::error::{GenerationError, Result};
use crate::model::{Citation, CitationDetailRequest, CitationKind, CitationQuery, CitationResult, GenerationRequest, TaskKind};
use crate::transport::LlmTransport;

pub const MIN_RELEVANCE: f64 = 0.0;
pub const MAX_RELEVANCE: f64 = 100.0;

/// Clamp a relevance score into `[0, 100]`. NaN counts as zero.
pub fn clamp_relevance(relevance: f64) -> f64 {
    if relevance.is_nan() {
        return MIN_RELEVANCE;
    }
    relevance.clamp(MIN_RELEVANCE, MAX_RELEVANCE)
}

fn dedup_key(citation: &Citation) -> (CitationKind, String, String) {
    (
        citation.kind,
        citation.name.trim().to_lowercase(),
        citation.year.trim().to_string(),
    )
}

/// Normalize a provider's citation list: clamp relevance, sort descending
/// (stable, so ties keep provider order), drop duplicate authorities keeping
/// the highest-ranked copy, and make `totalFound` cover what is returned.
///
/// Inside the engine the citation schema already bounds `relevance` to
/// `[0, 100]`, so an out-of-range value fails validation before ranking and
/// clamping only changes results handed in by other callers.
pub fn rank_citations(mut result: CitationResult) -> CitationResult {
    for citation in &mut result.citations {
        citation.relevance = clamp_relevance(citation.relevance);
    }
    result
        .citations
        .sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

    let before = result.citations.len();
    let mut seen = HashSet::new();
    result.citations.retain(|c| seen.insert(dedup_key(c)));
    if result.citations.len() != before {
        debug!(
            dropped = before - result.citations.len(),
            "[CITE] Removed duplicate citations"
        );
    }

    result.total_found = result.total_found.max(result.citations.len());
    result
}

fn normalize(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(trimmed.to_string())
}

fn format_search_time(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}

pub struct CitationResolver<'e, T> {
    engine: &'e GenerationEngine<T>,
}

impl<'e, T: LlmTransport> CitationResolver<'e, T> {
    pub fn new(engine: &'e GenerationEngine<T>) -> Self {
        Self { engine }
    }

    pub async fn search_citations(
        &self,
        query: CitationQuery,
        cancel: &CancellationToken,
    ) -> Result<CitationResult> {
        let normalized = normalize(&query.query)?;
        let started = Instant::now();
        let request = GenerationRequest::new(TaskKind::Citations, normalized.clone())
            .with_deadline(query.deadline_ms.map(|ms| started + Duration::from_millis(ms)));

        let mut result = self.engine.generate_citations(request, cancel).await?;
        result.query = normalized;
        result.search_time = format_search_time(started.elapsed());
        info!(
            query = %result.query,
            returned = result.citations.len(),
            total_found = result.total_found,
            search_time = %result.search_time,
            "[CITE] Citation search complete"
        );
        Ok(result)
    }

    pub async fn detail(&self, request: CitationDetailRequest, cancel: &CancellationToken) -> Result<Citation> {
        let name = normalize(&request.name)?;
        let started = Instant::now();
        let generation = GenerationRequest::new(TaskKind::CitationDetail, name.clone())
            .with_deadline(request.deadline_ms.map(|ms| started + Duration::from_millis(ms)));

        let citation = self.engine.generate_citation_detail(generation, cancel).await?;
        info!(
            requested = %name,
            name = %citation.name,
            relevance = citation.relevance,
            "[CITE] Citation detail resolved"
        );
        Ok(citation)
    }
}
