//! AI service client integration tests

use kbsync_core::ports::ai_service::IAiService;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{ai_client, node_id};

#[tokio::test]
async fn test_ingest_uploads_multipart_document() {
    let (server, client) = ai_client().await;

    Mock::given(method("POST"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .ingest(&node_id("d1"), "report.pdf", "document text")
        .await
        .unwrap();

    // The multipart body carries the id, the name, and the file content
    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(body.contains("documentId"));
    assert!(body.contains("d1"));
    assert!(body.contains("report.pdf"));
    assert!(body.contains("document text"));
}

#[tokio::test]
async fn test_ingest_error_status_is_an_error() {
    let (server, client) = ai_client().await;

    Mock::given(method("POST"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(client
        .ingest(&node_id("d1"), "report.pdf", "text")
        .await
        .is_err());
}

#[tokio::test]
async fn test_analyze_returns_bare_payload() {
    let (server, client) = ai_client().await;

    Mock::given(method("POST"))
        .and(path("/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "classification": { "labels": ["Report"] },
                "classification_multi": { "labels": ["Report"], "scores": [0.95] },
                "classification_public": { "scores": [0.7] },
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let payload = client
        .analyze("text", &["Report".to_string(), "Invoice".to_string()])
        .await
        .unwrap();
    assert_eq!(
        payload.pointer("/data/classification/labels/0"),
        Some(&json!("Report"))
    );

    // Candidate tags travel as repeated form fields
    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert_eq!(body.matches("candidateTags").count(), 2);
    assert!(body.contains("Invoice"));
}

#[tokio::test]
async fn test_analyze_unwraps_chat_envelope() {
    let (server, client) = ai_client().await;

    let inner = json!({
        "data": { "classification": { "labels": ["Invoice"] } }
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path("/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": inner } }]
        })))
        .mount(&server)
        .await;

    let payload = client.analyze("text", &[]).await.unwrap();
    assert_eq!(
        payload.pointer("/data/classification/labels/0"),
        Some(&json!("Invoice"))
    );
}

#[tokio::test]
async fn test_remove_document_by_query_param() {
    let (server, client) = ai_client().await;

    Mock::given(method("DELETE"))
        .and(path("/documents"))
        .and(query_param("documentId", "d1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.remove_document(&node_id("d1")).await.unwrap();
}

#[tokio::test]
async fn test_remove_folder_by_query_param() {
    let (server, client) = ai_client().await;

    Mock::given(method("DELETE"))
        .and(path("/folders"))
        .and(query_param("folderId", "f1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.remove_folder(&node_id("f1")).await.unwrap();
}
