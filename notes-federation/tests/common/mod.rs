#![allow(dead_code)]

use notes_federation::{FetchConfig, Fetcher, Transport};
use serde_json::{json, Value};
use std::sync::{Arc, Once};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// An address nothing listens on, so direct fetches fail at the transport.
pub const UNREACHABLE_METADATA_URL: &str = "http://127.0.0.1:1/api/metadata.json";

pub fn test_config() -> FetchConfig {
    FetchConfig {
        user_agent: "Notes-Federation-Test/1.0".to_string(),
        timeout_seconds: 5,
        max_retries: 0,
        retry_delay_ms: 10,
        proxy_url: None,
        max_concurrency: 4,
    }
}

pub fn transport(config: FetchConfig) -> Arc<dyn Transport> {
    Arc::new(Fetcher::new(config).expect("http client"))
}

pub fn discovery_doc(name: &str, file_list_url: &str) -> Value {
    json!({
        "version": "1.0",
        "profile": {
            "name": name,
            "avatar": "/avatar.png",
            "contact": { "github": "https://github.com/example" }
        },
        "fileList": {
            "url": file_list_url,
            "format": "json",
            "lastUpdated": "2025-06-01T00:00:00Z"
        }
    })
}

pub async fn mount_json(server: &MockServer, at: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_text(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn mount_status(server: &MockServer, at: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// A source serving its discovery document at `/api/metadata.json` and its
/// file list at `/notes.json`.
pub async fn start_source(name: &str, file_list: Value) -> MockServer {
    let server = MockServer::start().await;
    mount_json(&server, "/api/metadata.json", discovery_doc(name, "/notes.json")).await;
    mount_json(&server, "/notes.json", file_list).await;
    server
}

pub fn metadata_url(server: &MockServer) -> String {
    format!("{}/api/metadata.json", server.uri())
}
