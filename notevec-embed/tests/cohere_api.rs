//! HTTP contract tests for the Cohere client against a local mock server.

use std::time::Duration;

use notevec_embed::{
    CohereClient, EmbeddingProvider, InputPurpose, ProviderConfig, ProviderError, RerankProvider,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, dim: usize) -> CohereClient {
    let config = ProviderConfig::new("test-key")
        .with_base_url(server.uri())
        .with_embed_dim(dim)
        .with_timeout(Duration::from_secs(5));
    CohereClient::new(config).expect("client builds")
}

#[tokio::test]
async fn embed_sends_document_purpose_and_parses_vectors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/embed"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "input_type": "search_document",
            "embedding_types": ["float"],
            "output_dimension": 3,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": { "float": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let texts = vec!["first passage".to_string(), "second passage".to_string()];
    let vectors = client
        .embed(&texts, InputPurpose::Document)
        .await
        .expect("embed succeeds");

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
    assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
}

#[tokio::test]
async fn embed_sends_query_purpose_for_queries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/embed"))
        .and(body_partial_json(json!({ "input_type": "search_query" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": { "float": [[1.0, 0.0, 0.0]] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let vectors = client
        .embed(&["what did I plant".to_string()], InputPurpose::Query)
        .await
        .expect("embed succeeds");
    assert_eq!(vectors.len(), 1);
}

#[tokio::test]
async fn embed_maps_missing_vectors_to_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": {} })))
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let err = client
        .embed(&["text".to_string()], InputPurpose::Document)
        .await
        .expect_err("should fail");
    assert!(matches!(err, ProviderError::EmptyResponse));
}

#[tokio::test]
async fn embed_surfaces_api_errors_with_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/embed"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api token"))
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let err = client
        .embed(&["text".to_string()], InputPurpose::Document)
        .await
        .expect_err("should fail");
    match err {
        ProviderError::Api { status, message, .. } => {
            assert_eq!(status.as_u16(), 401);
            assert!(message.contains("invalid api token"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn embed_skips_request_for_empty_input() {
    let server = MockServer::start().await;
    // No mock mounted: any request would 404 and fail the call.
    let client = client_for(&server, 3);
    let vectors = client
        .embed(&[], InputPurpose::Document)
        .await
        .expect("empty input is a no-op");
    assert!(vectors.is_empty());
}

#[tokio::test]
async fn rerank_parses_indices_and_scores() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/rerank"))
        .and(body_partial_json(json!({ "query": "bread", "top_n": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "index": 2, "relevance_score": 0.9 },
                { "index": 0, "relevance_score": 0.5 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let documents = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let ranked = client
        .rerank("bread", &documents, 2)
        .await
        .expect("rerank succeeds");

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].index, 2);
    assert!((ranked[0].relevance_score - 0.9).abs() < 1e-9);
    assert_eq!(ranked[1].index, 0);
}

#[tokio::test]
async fn validate_key_reports_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let err = client.validate_key().await.expect_err("should fail");
    assert!(matches!(err, ProviderError::Api { .. }));
}
