use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity and contact block of a discovery document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<ContactLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactLink {
    pub platform: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Where a source publishes its note listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListInfo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Self-describing document a source publishes about itself.
///
/// Only documents carrying `version`, `profile.name` and `fileList.url` are
/// ever constructed; see [`DiscoveryDocument::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryDocument {
    pub version: String,
    pub profile: Profile,
    pub file_list: FileListInfo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Online,
    Offline,
    #[default]
    Unknown,
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointStatus::Online => write!(f, "online"),
            EndpointStatus::Offline => write!(f, "offline"),
            EndpointStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// A registered source, keyed by the literal URL of its discovery document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub url: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: EndpointStatus,
}

/// A note in the shape every source is normalized into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalNote {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub metadata_url: String,
}

/// A canonical note tagged with the endpoint it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederatedNote {
    #[serde(flatten)]
    pub note: CanonicalNote,
    pub source: NoteSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub metadata_url: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Success,
    Error,
}

/// Outcome of one endpoint's pipeline within an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub url: String,
    pub name: String,
    pub status: SourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FederationResult {
    pub notes: Vec<FederatedNote>,
    pub sources: Vec<SourceReport>,
}

impl FederationResult {
    /// True when at least one endpoint was attempted and none succeeded.
    pub fn all_sources_failed(&self) -> bool {
        !self.sources.is_empty()
            && self.sources.iter().all(|s| s.status == SourceStatus::Error)
    }
}

/// A response as seen by the rest of the crate, whichever tier produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    pub content_type: Option<String>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Base URL of the proxy indirection, e.g. `https://notes.example`.
    /// Requests go to `{proxy_url}/api/proxy?url=<target>`.
    pub proxy_url: Option<String>,
    pub max_concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Notes-Federation/1.0".to_string(),
            timeout_seconds: 15,
            max_retries: 1,
            retry_delay_ms: 250,
            proxy_url: None,
            max_concurrency: 8,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Invalid metadata: {0}")]
    Validation(String),

    #[error("Endpoint already exists: {url}")]
    DuplicateEndpoint { url: String },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, FederationError>;
