use lexdeck::transport::{MockLlmTransport, RawResponse};
use lexdeck::{
    CancellationToken, CitationDetailRequest, CitationKind, CitationQuery, Conformance, EngineConfig,
    GenerationEngine, GenerationError, TransportError,
};
use serde_json::json;

fn strict_mock() -> MockLlmTransport {
    let mut transport = MockLlmTransport::new();
    transport.expect_conformance().return_const(Conformance::Strict);
    transport
}

fn citation(kind: &str, name: &str, year: &str, relevance: f64) -> serde_json::Value {
    json!({
        "type": kind,
        "name": name,
        "year": year,
        "fullTitle": format!("{name} (full title)"),
        "summary": "Summary.",
        "relevance": relevance,
        "url": ""
    })
}

#[tokio::test]
async fn search_ranks_by_relevance_and_stamps_query() {
    let mut transport = strict_mock();
    let body = json!({
        "query": "something else",
        "citations": [
            citation("section", "Section 43A IT Act", "", 70.0),
            citation("act", "Digital Personal Data Protection Act", "2023", 40.0),
            citation("article", "Article 21", "", 90.0),
        ],
        "totalFound": 1,
        "searchTime": "made up"
    })
    .to_string();
    transport
        .expect_request()
        .times(1)
        .withf(|prompt, options| {
            prompt.user.contains("right to privacy India")
                && options.schema.as_ref().is_some_and(|s| s.name == "citation_result")
        })
        .returning(move |_, _| Ok(RawResponse::new(body.clone())));

    let engine = GenerationEngine::new(transport, EngineConfig::default());
    let result = engine
        .citations()
        .search_citations(
            CitationQuery::new("  right to privacy India \n"),
            &CancellationToken::new(),
        )
        .await
        .expect("search should succeed");

    let relevance: Vec<f64> = result.citations.iter().map(|c| c.relevance).collect();
    assert_eq!(relevance, vec![90.0, 70.0, 40.0]);
    assert_eq!(result.citations[0].kind, CitationKind::Article);
    assert_eq!(result.total_found, 3);
    assert_eq!(result.query, "right to privacy India");
    assert!(result.search_time.ends_with('s'), "got {}", result.search_time);
    assert_ne!(result.search_time, "made up");
}

#[tokio::test]
async fn duplicate_authorities_are_collapsed() {
    let mut transport = strict_mock();
    let body = json!({
        "query": "privacy",
        "citations": [
            citation("case", "K.S. Puttaswamy v. Union of India", "2017", 80.0),
            citation("case", "k.s. puttaswamy v. union of india", "2017", 95.0),
        ],
        "totalFound": 2,
        "searchTime": ""
    })
    .to_string();
    transport
        .expect_request()
        .times(1)
        .returning(move |_, _| Ok(RawResponse::new(body.clone())));

    let engine = GenerationEngine::new(transport, EngineConfig::default());
    let result = engine
        .citations()
        .search_citations(CitationQuery::new("privacy"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.citations.len(), 1);
    assert_eq!(result.citations[0].relevance, 95.0);
    assert_eq!(result.total_found, 2);
}

#[tokio::test]
async fn out_of_range_relevance_is_schema_invalid() {
    let mut transport = strict_mock();
    let body = json!({
        "query": "privacy",
        "citations": [citation("article", "Article 21", "", 140.0)],
        "totalFound": 1,
        "searchTime": ""
    })
    .to_string();
    transport
        .expect_request()
        .times(1)
        .returning(move |_, _| Ok(RawResponse::new(body.clone())));

    let engine = GenerationEngine::new(transport, EngineConfig::default());
    let err = engine
        .citations()
        .search_citations(CitationQuery::new("privacy"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(
        matches!(&err, GenerationError::SchemaInvalid { path, .. } if path == "citations[0].relevance"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn blank_query_is_empty() {
    let mut transport = strict_mock();
    transport.expect_request().never();

    let engine = GenerationEngine::new(transport, EngineConfig::default());
    let err = engine
        .citations()
        .search_citations(CitationQuery::new("   "), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::Empty);
}

#[tokio::test]
async fn provider_schema_violation_is_repaired_then_reported() {
    let mut transport = strict_mock();
    transport
        .expect_request()
        .times(2)
        .returning(|_, _| Err(TransportError::SchemaViolation("json_validate_failed".into())));

    let engine = GenerationEngine::new(transport, EngineConfig::default());
    let err = engine
        .citations()
        .search_citations(CitationQuery::new("privacy"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(
        matches!(&err, GenerationError::SchemaInvalid { path, .. } if path == "$"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn detail_returns_single_citation() {
    let mut transport = strict_mock();
    let body = citation("article", "Article 21", "", 98.0).to_string();
    transport
        .expect_request()
        .times(1)
        .withf(|prompt, options| {
            prompt.user.contains("Citation: Article 21")
                && options.schema.as_ref().is_some_and(|s| s.name == "citation")
        })
        .returning(move |_, _| Ok(RawResponse::new(body.clone())));

    let engine = GenerationEngine::new(transport, EngineConfig::default());
    let citation = engine
        .citations()
        .detail(CitationDetailRequest::new(" Article 21 "), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(citation.name, "Article 21");
    assert_eq!(citation.kind, CitationKind::Article);
    assert_eq!(citation.relevance, 98.0);
}

#[tokio::test]
async fn detail_with_cancelled_token_makes_no_call() {
    let mut transport = strict_mock();
    transport.expect_request().never();

    let token = CancellationToken::new();
    token.cancel();
    let engine = GenerationEngine::new(transport, EngineConfig::default());
    let err = engine
        .citations()
        .detail(CitationDetailRequest::new("Article 21"), &token)
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::Cancelled);
}
