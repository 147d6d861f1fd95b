//! Repository client integration tests

use chrono::{TimeZone, Utc};
use kbsync_core::domain::newtypes::{AspectName, FolderPath};
use kbsync_core::ports::repository::IRepositoryClient;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{node_id, nodes_path, repository_client, search_entries, SEARCH_API};

#[tokio::test]
async fn test_find_folders_with_aspect() {
    let (server, client) = repository_client().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_API))
        .and(body_partial_json(json!({
            "query": { "query": "ASPECT:\"ai:synced\" AND TYPE:\"cm:folder\"" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_entries(
            vec![json!({
                "id": "f1",
                "name": "Reports",
                "isFolder": true,
                "path": { "name": "/Company Home/Knowledge Base" },
                "properties": { "ai:updatedTime": "2026-08-01T12:00:00Z" }
            })],
            false,
        )))
        .mount(&server)
        .await;

    let folders = client
        .find_folders_with_aspect(&AspectName::new("ai:synced").unwrap())
        .await
        .unwrap();

    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].id.as_str(), "f1");
    assert_eq!(
        folders[0].path.as_str(),
        "Company Home|Knowledge Base|Reports"
    );
    assert_eq!(
        folders[0].properties.get("ai:updatedTime").map(String::as_str),
        Some("2026-08-01T12:00:00Z")
    );
}

#[tokio::test]
async fn test_resolve_path_walks_children() {
    let (server, client) = repository_client().await;

    Mock::given(method("GET"))
        .and(path(nodes_path("/-root-/children")))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_entries(
            vec![json!({ "id": "kb", "name": "Knowledge Base", "isFolder": true })],
            false,
        )))
        .mount(&server)
        .await;

    let found = client
        .resolve_path(&FolderPath::rooted_at("Company Home|Knowledge Base", "Company Home").unwrap())
        .await
        .unwrap();
    assert_eq!(found, Some(node_id("kb")));
}

#[tokio::test]
async fn test_resolve_path_missing_segment_is_none() {
    let (server, client) = repository_client().await;

    Mock::given(method("GET"))
        .and(path(nodes_path("/-root-/children")))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_entries(vec![], false)))
        .mount(&server)
        .await;

    let found = client
        .resolve_path(&FolderPath::rooted_at("Company Home|Missing", "Company Home").unwrap())
        .await
        .unwrap();
    assert_eq!(found, None);
}

#[tokio::test]
async fn test_create_folder_path_creates_missing_segments() {
    let (server, client) = repository_client().await;

    Mock::given(method("GET"))
        .and(path(nodes_path("/-root-/children")))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_entries(vec![], false)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(nodes_path("/-root-/children")))
        .and(body_partial_json(json!({
            "name": "Knowledge Base",
            "nodeType": "cm:folder"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "entry": { "id": "new-kb", "name": "Knowledge Base", "isFolder": true }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_folder_path(
            &FolderPath::rooted_at("Company Home|Knowledge Base", "Company Home").unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(created, node_id("new-kb"));
}

#[tokio::test]
async fn test_create_folder_path_decodes_qname_segments() {
    let (server, client) = repository_client().await;

    Mock::given(method("GET"))
        .and(path(nodes_path("/-root-/children")))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_entries(vec![], false)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(nodes_path("/-root-/children")))
        .and(body_partial_json(json!({ "name": "Knowledge Base" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "entry": { "id": "kb", "name": "Knowledge Base", "isFolder": true }
        })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .create_folder_path(
            &FolderPath::rooted_at("Company Home|cm:Knowledge_x0020_Base", "Company Home")
                .unwrap(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_is_indexed() {
    let (server, client) = repository_client().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_API))
        .and(body_partial_json(json!({
            "query": { "query": "ID:\"workspace://SpacesStore/f1\"" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_entries(
            vec![json!({ "id": "f1", "name": "Reports" })],
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_API))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_entries(vec![], false)))
        .mount(&server)
        .await;

    assert!(client.is_indexed(&node_id("f1")).await.unwrap());
    assert!(!client.is_indexed(&node_id("f2")).await.unwrap());
}

#[tokio::test]
async fn test_list_documents_maps_page() {
    let (server, client) = repository_client().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_API))
        .and(body_partial_json(json!({
            "query": {
                "query": "ANCESTOR:\"workspace://SpacesStore/f1\" AND TYPE:\"cm:content\""
            },
            "paging": { "skipCount": 0, "maxItems": 2 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_entries(
            vec![
                json!({ "id": "d1", "name": "a.txt", "modifiedAt": "2026-08-01T12:00:00Z" }),
                json!({ "id": "d2", "name": "b.txt", "modifiedAt": "2026-08-02T12:00:00Z" }),
            ],
            true,
        )))
        .mount(&server)
        .await;

    let page = client.list_documents(&node_id("f1"), 0, 2).await.unwrap();
    assert!(page.has_more);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id.as_str(), "d1");
    assert_eq!(
        page.items[1].modified_at,
        Utc.with_ymd_and_hms(2026, 8, 2, 12, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_latest_modification() {
    let (server, client) = repository_client().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_API))
        .and(body_partial_json(json!({
            "sort": [{ "field": "cm:modified", "ascending": false }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_entries(
            vec![json!({ "id": "d9", "name": "new.txt", "modifiedAt": "2026-08-15T09:30:00Z" })],
            false,
        )))
        .mount(&server)
        .await;

    let latest = client.latest_modification(&node_id("f1")).await.unwrap();
    assert_eq!(
        latest,
        Some(Utc.with_ymd_and_hms(2026, 8, 15, 9, 30, 0).unwrap())
    );
}

#[tokio::test]
async fn test_download_text() {
    let (server, client) = repository_client().await;

    Mock::given(method("GET"))
        .and(path(nodes_path("/d1/content")))
        .respond_with(ResponseTemplate::new(200).set_body_string("document body"))
        .mount(&server)
        .await;

    let text = client.download_text(&node_id("d1")).await.unwrap();
    assert_eq!(text, "document body");
}

#[tokio::test]
async fn test_download_error_status_is_an_error() {
    let (server, client) = repository_client().await;

    Mock::given(method("GET"))
        .and(path(nodes_path("/d1/content")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(client.download_text(&node_id("d1")).await.is_err());
}

#[tokio::test]
async fn test_ensure_child_folder_reuses_existing() {
    let (server, client) = repository_client().await;

    Mock::given(method("GET"))
        .and(path(nodes_path("/root/children")))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_entries(
            vec![json!({ "id": "y2026", "name": "2026", "isFolder": true })],
            false,
        )))
        .mount(&server)
        .await;

    let id = client
        .ensure_child_folder(&node_id("root"), "2026")
        .await
        .unwrap();
    assert_eq!(id, node_id("y2026"));
}

#[tokio::test]
async fn test_add_tags_posts_one_request_per_tag() {
    let (server, client) = repository_client().await;

    Mock::given(method("POST"))
        .and(path(nodes_path("/d1/tags")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "entry": { "tag": "x", "id": "tag-id" }
        })))
        .expect(2)
        .mount(&server)
        .await;

    client
        .add_tags(&node_id("d1"), &["Invoice".to_string(), "taggedByAI".to_string()])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_public_access_replaces_everyone_entry() {
    let (server, client) = repository_client().await;

    Mock::given(method("GET"))
        .and(path(nodes_path("/d1")))
        .and(query_param("include", "permissions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entry": {
                "id": "d1",
                "name": "a.txt",
                "permissions": {
                    "locallySet": [
                        { "authorityId": "GROUP_EVERYONE", "name": "Consumer", "accessStatus": "ALLOWED" },
                        { "authorityId": "jdoe", "name": "Editor", "accessStatus": "ALLOWED" }
                    ]
                }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(nodes_path("/d1")))
        .and(body_partial_json(json!({
            "permissions": {
                "isInheritanceEnabled": false,
                "locallySet": [
                    { "authorityId": "jdoe", "name": "Editor", "accessStatus": "ALLOWED" }
                ]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entry": { "id": "d1", "name": "a.txt" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    client.set_public_access(&node_id("d1"), false).await.unwrap();
}

#[tokio::test]
async fn test_install_ingestion_rule() {
    let (server, client) = repository_client().await;

    Mock::given(method("POST"))
        .and(path("/alfresco/service/api/ai/setupFolderRule"))
        .and(query_param("nodeId", "kb"))
        .and(query_param("aspectId", "ai:synced"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .install_ingestion_rule(&node_id("kb"), &AspectName::new("ai:synced").unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stamp_sync_times_writes_both_properties() {
    let (server, client) = repository_client().await;
    let now = Utc.with_ymd_and_hms(2026, 8, 29, 10, 0, 0).unwrap();

    Mock::given(method("PUT"))
        .and(path(nodes_path("/f1")))
        .and(body_partial_json(json!({
            "properties": {
                "ai:updatedTime": now.to_rfc3339(),
                "ai:publishedTime": now.to_rfc3339()
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entry": { "id": "f1", "name": "Reports" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .stamp_sync_times(&node_id("f1"), Some(now), now)
        .await
        .unwrap();
}
