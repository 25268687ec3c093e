use crate::frontmatter::{split_list, FrontMatter};
use crate::resolver::resolve_url;
use crate::traits::Transport;
use crate::types::CanonicalNote;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MARKDOWN_ACCEPT: &str = "text/markdown, text/plain";

/// A structured note record as published in a `{ "notes": [...] }` listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNote {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub tags: Option<RawTags>,
}

/// Tags arrive either as a JSON array or as one comma separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTags {
    List(Vec<serde_json::Value>),
    Csv(String),
}

impl RawTags {
    fn into_vec(self) -> Vec<String> {
        match self {
            RawTags::List(values) => values
                .into_iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    _ => None,
                })
                .collect(),
            RawTags::Csv(value) => split_list(&value),
        }
    }
}

/// The recognised shapes of a file-list document.
#[derive(Debug, Clone)]
pub enum FileList {
    /// Links to raw note files carrying front matter.
    Urls(Vec<String>),
    /// Structured note records.
    Notes(Vec<RawNote>),
    /// Anything else, including bodies that are not JSON.
    Unknown,
}

impl FileList {
    pub fn decode(body: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                warn!("File list is not valid JSON: {}", e);
                return FileList::Unknown;
            }
        };

        match value {
            serde_json::Value::Array(items) => FileList::Urls(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        serde_json::Value::String(url) if !url.trim().is_empty() => Some(url),
                        other => {
                            debug!("Skipping non-string file list entry: {}", other);
                            None
                        }
                    })
                    .collect(),
            ),
            serde_json::Value::Object(mut map) => match map.remove("notes") {
                Some(serde_json::Value::Array(records)) => FileList::Notes(
                    records
                        .into_iter()
                        .filter_map(|record| match serde_json::from_value::<RawNote>(record) {
                            Ok(note) => Some(note),
                            Err(e) => {
                                debug!("Skipping malformed note record: {}", e);
                                None
                            }
                        })
                        .collect(),
                ),
                _ => FileList::Unknown,
            },
            _ => FileList::Unknown,
        }
    }
}

/// Turns file-list documents into canonical notes. Never fails: entries that
/// cannot be fetched or understood are dropped.
#[derive(Clone)]
pub struct NoteNormalizer {
    transport: Arc<dyn Transport>,
    max_concurrency: usize,
}

impl NoteNormalizer {
    pub fn new(transport: Arc<dyn Transport>, max_concurrency: usize) -> Self {
        Self {
            transport,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Normalize a file-list body fetched from `origin_url`.
    pub async fn normalize_file_list(&self, body: &str, origin_url: &str) -> Vec<CanonicalNote> {
        let notes = match FileList::decode(body) {
            FileList::Urls(urls) => self.fetch_markdown_notes(urls, origin_url).await,
            FileList::Notes(records) => records
                .into_iter()
                .map(|record| normalize_note(record, origin_url))
                .collect(),
            FileList::Unknown => {
                warn!("Unrecognised file list format at {}, treating as empty", origin_url);
                Vec::new()
            }
        };

        info!("Normalized {} notes from {}", notes.len(), origin_url);
        notes
    }

    async fn fetch_markdown_notes(&self, urls: Vec<String>, origin_url: &str) -> Vec<CanonicalNote> {
        let resolved: Vec<String> = urls
            .iter()
            .filter_map(|url| match resolve_url(origin_url, url) {
                Ok(resolved) => Some(resolved),
                Err(e) => {
                    debug!("Skipping unresolvable note URL {}: {}", url, e);
                    None
                }
            })
            .collect();

        stream::iter(resolved)
            .map(|url| async move { self.fetch_markdown_note(&url).await })
            .buffered(self.max_concurrency)
            .filter_map(|note| async move { note })
            .collect()
            .await
    }

    /// Fetch one raw note file and build a note from its front matter.
    pub async fn fetch_markdown_note(&self, url: &str) -> Option<CanonicalNote> {
        let response = match self.transport.fetch(url, MARKDOWN_ACCEPT).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Skipping note {}: {}", url, e);
                return None;
            }
        };

        if !response.is_success() {
            debug!("Skipping note {}: HTTP {}", url, response.status);
            return None;
        }

        let note = note_from_markdown(url, &response.body);
        if note.is_none() {
            debug!("Skipping note {}: no front matter", url);
        }
        note
    }
}

/// Build a note from a raw file's front matter; `url` is the file's absolute URL.
pub fn note_from_markdown(url: &str, content: &str) -> Option<CanonicalNote> {
    let front = FrontMatter::parse(content)?;
    let key = slug_from_url(url);

    let (excerpt, description) = backfill(
        front.get_non_empty("excerpt").map(str::to_string),
        front.get_non_empty("description").map(str::to_string),
    );

    Some(CanonicalNote {
        id: key.clone(),
        title: front
            .get_non_empty("title")
            .map(str::to_string)
            .unwrap_or_else(|| key.clone()),
        slug: key,
        date: front
            .get_non_empty("date")
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().to_rfc3339()),
        excerpt,
        description,
        tagline: front.get_non_empty("tagline").map(str::to_string),
        author: front.get_non_empty("author").map(str::to_string),
        image: front.get_non_empty("image").map(str::to_string),
        url: url.to_string(),
        tags: front.get_list("tags"),
    })
}

/// Map a structured record onto the canonical shape.
///
/// `id` and `slug` stand in for each other. When neither is present both stay
/// empty and the note is kept.
pub fn normalize_note(raw: RawNote, origin_url: &str) -> CanonicalNote {
    let id = match raw.id {
        Some(serde_json::Value::String(s)) => non_empty(Some(s)),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    let slug = non_empty(raw.slug);

    let id_or_slug = id.clone().or_else(|| slug.clone()).unwrap_or_default();
    let slug_or_id = slug.or(id).unwrap_or_default();

    let (excerpt, description) = backfill(non_empty(raw.excerpt), non_empty(raw.description));

    let url = match non_empty(raw.api_url).or_else(|| non_empty(raw.url)) {
        Some(link) => resolve_url(origin_url, &link).unwrap_or(link),
        None => String::new(),
    };

    CanonicalNote {
        id: id_or_slug,
        title: raw.title.unwrap_or_default(),
        slug: slug_or_id,
        date: raw.date.unwrap_or_default(),
        excerpt,
        description,
        tagline: non_empty(raw.tagline),
        author: non_empty(raw.author),
        image: non_empty(raw.image),
        url,
        tags: raw.tags.map(RawTags::into_vec).unwrap_or_default(),
    }
}

/// Trailing path segment of `url` without its extension.
pub fn slug_from_url(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or("").to_string(),
    };

    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    match segment.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => segment.to_string(),
    }
}

// Each of excerpt/description fills the other when only one is present.
fn backfill(excerpt: Option<String>, description: Option<String>) -> (Option<String>, Option<String>) {
    match (excerpt, description) {
        (Some(e), None) => (Some(e.clone()), Some(e)),
        (None, Some(d)) => (Some(d.clone()), Some(d)),
        pair => pair,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
