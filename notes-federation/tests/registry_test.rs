mod common;

use chrono::Utc;
use common::*;
use notes_federation::{
    Discovery, Endpoint, EndpointManager, EndpointStatus, EndpointStore, FederationError,
    JsonFileStore, MemoryStore, Result,
};
use wiremock::MockServer;

fn manager_with(store: MemoryStore) -> EndpointManager<MemoryStore> {
    EndpointManager::new(store, Discovery::new(transport(test_config())))
}

fn endpoint(url: &str, name: &str) -> Endpoint {
    Endpoint {
        url: url.to_string(),
        name: name.to_string(),
        avatar: None,
        added_at: Utc::now(),
        last_checked: None,
        status: EndpointStatus::Unknown,
    }
}

#[tokio::test]
async fn test_add_registers_discovered_url() -> Result<()> {
    init_tracing();

    let server = MockServer::start().await;
    mount_json(&server, "/api/metadata.json", discovery_doc("Ada", "/notes.json")).await;

    let mut manager = manager_with(MemoryStore::new());
    let added = manager.add(&server.uri()).await?;

    assert_eq!(added.url, metadata_url(&server));
    assert_eq!(added.name, "Ada");
    assert_eq!(added.avatar.as_deref(), Some("/avatar.png"));
    assert_eq!(added.status, EndpointStatus::Online);
    assert_eq!(added.last_checked, Some(added.added_at));

    assert_eq!(manager.list(), &[added.clone()]);
    assert_eq!(manager.store().snapshot(), vec![added]);
    Ok(())
}

#[tokio::test]
async fn test_add_twice_is_duplicate() -> Result<()> {
    init_tracing();

    let server = MockServer::start().await;
    mount_json(&server, "/api/metadata.json", discovery_doc("Ada", "/notes.json")).await;

    let mut manager = manager_with(MemoryStore::new());
    manager.add(&server.uri()).await?;

    let err = manager.add(&server.uri()).await.unwrap_err();
    assert!(matches!(err, FederationError::DuplicateEndpoint { ref url } if *url == metadata_url(&server)));

    // The full metadata URL resolves to the same key.
    let err = manager.add(&metadata_url(&server)).await.unwrap_err();
    assert!(matches!(err, FederationError::DuplicateEndpoint { .. }));

    assert_eq!(manager.list().len(), 1);
    assert_eq!(manager.store().snapshot().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_add_invalid_site_leaves_registry_untouched() {
    init_tracing();

    let server = MockServer::start().await;
    let mut manager = manager_with(MemoryStore::new());

    assert!(manager.add(&server.uri()).await.is_err());
    assert!(manager.list().is_empty());
}

#[test]
fn test_remove_absent_is_noop() {
    let store = MemoryStore::with_endpoints(vec![
        endpoint("https://a.dev/api/metadata.json", "A"),
        endpoint("https://b.dev/api/metadata.json", "B"),
    ]);
    let mut manager = manager_with(store);

    manager.remove("https://nobody.dev/api/metadata.json");
    assert_eq!(manager.list().len(), 2);

    manager.remove("https://a.dev/api/metadata.json");
    assert_eq!(manager.urls(), vec!["https://b.dev/api/metadata.json"]);
    assert_eq!(manager.store().snapshot().len(), 1);
}

#[test]
fn test_duplicate_entries_in_storage_are_collapsed() {
    let store = MemoryStore::with_endpoints(vec![
        endpoint("https://a.dev/api/metadata.json", "First"),
        endpoint("https://a.dev/api/metadata.json", "Second"),
    ]);
    let manager = manager_with(store);

    assert_eq!(manager.list().len(), 1);
    assert_eq!(manager.list()[0].name, "First");
}

#[test]
fn test_update_status_stamps_last_checked() {
    let url = "https://a.dev/api/metadata.json";
    let mut manager = manager_with(MemoryStore::with_endpoints(vec![endpoint(url, "A")]));

    manager.update_status(url, EndpointStatus::Offline);
    manager.update_status("https://unknown.dev", EndpointStatus::Online);

    let stored = manager.store().snapshot();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, EndpointStatus::Offline);
    assert!(stored[0].last_checked.is_some());
}

#[tokio::test]
async fn test_check_health_tracks_availability() -> Result<()> {
    init_tracing();

    let server = MockServer::start().await;
    mount_json(&server, "/api/metadata.json", discovery_doc("Ada", "/notes.json")).await;

    let mut manager = manager_with(MemoryStore::new());
    let added = manager.add(&server.uri()).await?;

    assert_eq!(manager.check_health(&added.url).await, EndpointStatus::Online);

    server.reset().await;
    assert_eq!(manager.check_health(&added.url).await, EndpointStatus::Offline);

    let stored = manager.get(&added.url).expect("endpoint kept");
    assert_eq!(stored.status, EndpointStatus::Offline);
    assert!(stored.last_checked >= added.last_checked);
    Ok(())
}

#[tokio::test]
async fn test_check_health_of_unreachable_host_is_offline() {
    init_tracing();

    let mut manager = manager_with(MemoryStore::with_endpoints(vec![endpoint(UNREACHABLE_METADATA_URL, "Gone")]));
    let results = manager.check_all().await;

    assert_eq!(results, vec![(UNREACHABLE_METADATA_URL.to_string(), EndpointStatus::Offline)]);
    assert_eq!(manager.list()[0].status, EndpointStatus::Offline);
}

#[test]
fn test_json_file_store_persists_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("endpoints.json");
    let store = JsonFileStore::new(&path);

    assert!(store.load().is_empty());

    let endpoints = vec![
        endpoint("https://b.dev/api/metadata.json", "B"),
        endpoint("https://a.dev/api/metadata.json", "A"),
    ];
    store.save(&endpoints);

    let reopened = JsonFileStore::new(&path);
    assert_eq!(reopened.load(), endpoints);

    let raw = std::fs::read_to_string(&path).expect("store file");
    assert!(raw.contains("\"addedAt\""));
    assert!(raw.contains("\"status\": \"unknown\""));
}

#[test]
fn test_json_file_store_degrades_on_corrupt_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("endpoints.json");
    std::fs::write(&path, "not json").expect("write");

    let manager = EndpointManager::new(JsonFileStore::new(&path), Discovery::new(transport(test_config())));
    assert!(manager.list().is_empty());
}

#[test]
fn test_remove_absent_leaves_unreadable_store_intact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("endpoints.json");
    let original = r#"[
  {"url":"https://a.dev/api/metadata.json","name":"A","addedAt":"2025-01-01T00:00:00Z","status":"online"},
  {"url":"https://b.dev/api/metadata.json","name":"B","addedAt":"2025-01-01T00:00:00Z","status":"paused"}
]"#;
    std::fs::write(&path, original).expect("write");

    let mut manager = EndpointManager::new(JsonFileStore::new(&path), Discovery::new(transport(test_config())));
    assert!(manager.list().is_empty());

    manager.remove("https://nobody.dev/api/metadata.json");

    assert_eq!(std::fs::read_to_string(&path).expect("store file"), original);
}
