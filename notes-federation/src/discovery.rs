use crate::traits::Transport;
use crate::types::{
    Contact, DiscoveryDocument, FederationError, FileListInfo, Profile, Result,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Conventional locations of a discovery document, relative to a site root.
pub const CANDIDATE_SUFFIXES: [&str; 4] = [
    "/api/metadata.json",
    "/api/metadata",
    "/api/profile.json",
    "/api/profile",
];

const JSON_ACCEPT: &str = "application/json";

// Wire shape before validation; every field is optional so a document missing
// a required field is reported as such rather than as a serde error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDiscoveryDocument {
    version: Option<serde_json::Value>,
    profile: Option<RawProfile>,
    file_list: Option<RawFileList>,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    name: Option<String>,
    avatar: Option<String>,
    contact: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFileList {
    url: Option<String>,
    format: Option<String>,
    last_updated: Option<String>,
}

impl DiscoveryDocument {
    /// Parse and validate a discovery document body.
    ///
    /// Malformed JSON is a `Parse` error; well-formed JSON lacking `version`,
    /// `profile.name` or `fileList.url` is a `Validation` error.
    pub fn from_json(body: &str) -> Result<Self> {
        let raw: RawDiscoveryDocument = serde_json::from_str(body)?;

        let version = match raw.version {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(missing("version")),
        };

        let profile = raw.profile.ok_or_else(|| missing("profile.name"))?;
        let name = non_empty(profile.name).ok_or_else(|| missing("profile.name"))?;

        let file_list = raw.file_list.ok_or_else(|| missing("fileList.url"))?;
        let file_list_url = non_empty(file_list.url).ok_or_else(|| missing("fileList.url"))?;

        Ok(DiscoveryDocument {
            version,
            profile: Profile {
                name,
                avatar: non_empty(profile.avatar),
                contact: profile
                    .contact
                    .and_then(|value| serde_json::from_value::<Contact>(value).ok()),
            },
            file_list: FileListInfo {
                url: file_list_url,
                format: file_list.format,
                last_updated: file_list.last_updated,
            },
        })
    }
}

fn missing(field: &str) -> FederationError {
    FederationError::Validation(format!("missing required field `{}`", field))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// A validated discovery document and the exact URL it was served from.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovered {
    pub document: DiscoveryDocument,
    pub actual_url: String,
}

/// Candidate discovery-document URLs for user input, in the order they are tried.
///
/// The input itself always comes first. Conventional suffixes are only added
/// when the input does not already look like an API path.
pub fn candidate_urls(base_url: &str) -> Vec<String> {
    let trimmed = base_url.trim();
    let input = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut candidates = vec![input.clone()];

    if !input.contains("/api/") {
        let base = input.trim_end_matches('/');
        candidates.extend(CANDIDATE_SUFFIXES.iter().map(|suffix| format!("{}{}", base, suffix)));
    }

    candidates
}

/// Tries candidate locations until one serves a valid discovery document.
#[derive(Clone)]
pub struct Discovery {
    transport: Arc<dyn Transport>,
}

impl Discovery {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn validate(&self, base_url: &str) -> Result<Discovered> {
        let mut last_error = None;

        for candidate in candidate_urls(base_url) {
            match self.fetch_document(&candidate).await {
                Ok(document) => {
                    info!("Discovered metadata for '{}' at {}", document.profile.name, candidate);
                    return Ok(Discovered {
                        document,
                        actual_url: candidate,
                    });
                }
                Err(e) => {
                    debug!("Candidate {} rejected: {}", candidate, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FederationError::Validation("failed to fetch metadata from any known endpoint".to_string())
        }))
    }

    /// Fetch and validate a single discovery document without probing.
    pub async fn fetch_document(&self, url: &str) -> Result<DiscoveryDocument> {
        let response = self.transport.fetch(url, JSON_ACCEPT).await?;

        if !response.is_success() {
            return Err(FederationError::Http {
                status: response.status,
                url: url.to_string(),
            });
        }

        DiscoveryDocument::from_json(&response.body)
    }
}
