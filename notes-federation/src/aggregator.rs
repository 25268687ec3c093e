use crate::discovery::Discovery;
use crate::fetcher::Fetcher;
use crate::parser::NoteNormalizer;
use crate::resolver::resolve_url;
use crate::traits::Transport;
use crate::types::{
    FederatedNote, FederationError, FederationResult, FetchConfig, NoteSource, Result,
    SourceReport, SourceStatus,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

const JSON_ACCEPT: &str = "application/json";

/// What one endpoint contributed to an aggregation.
struct EndpointOutcome {
    url: String,
    result: Result<(String, Vec<FederatedNote>)>,
}

/// Collects notes from many endpoints into one date-ordered feed.
pub struct FederationAggregator {
    transport: Arc<dyn Transport>,
    discovery: Discovery,
    normalizer: NoteNormalizer,
    max_concurrency: usize,
}

impl FederationAggregator {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        let max_concurrency = fetch_config.max_concurrency;
        let fetcher = Fetcher::new(fetch_config)?;
        Ok(Self::with_transport(Arc::new(fetcher), max_concurrency))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            discovery: Discovery::new(transport.clone()),
            normalizer: NoteNormalizer::new(transport.clone(), max_concurrency),
            transport,
            max_concurrency,
        }
    }

    /// Run every endpoint's pipeline, wait for all of them, then merge.
    ///
    /// A failing endpoint contributes an error report and no notes; it never
    /// fails the aggregation as a whole.
    pub async fn aggregate(&self, endpoint_urls: &[String]) -> FederationResult {
        info!("Aggregating notes from {} endpoints", endpoint_urls.len());

        let outcomes: Vec<EndpointOutcome> = stream::iter(endpoint_urls.iter().cloned())
            .map(|url| async move {
                let result = self.fetch_endpoint(&url).await;
                EndpointOutcome { url, result }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut notes = Vec::new();
        let mut sources = Vec::with_capacity(outcomes.len());

        for outcome in outcomes {
            match outcome.result {
                Ok((name, endpoint_notes)) => {
                    sources.push(SourceReport {
                        url: outcome.url,
                        name,
                        status: SourceStatus::Success,
                        error: None,
                        count: endpoint_notes.len(),
                    });
                    notes.extend(endpoint_notes);
                }
                Err(e) => {
                    warn!("Failed to aggregate {}: {}", outcome.url, e);
                    sources.push(SourceReport {
                        name: outcome.url.clone(),
                        url: outcome.url,
                        status: SourceStatus::Error,
                        error: Some(e.to_string()),
                        count: 0,
                    });
                }
            }
        }

        sort_by_date_desc(&mut notes);

        let failed = sources.iter().filter(|s| s.status == SourceStatus::Error).count();
        info!(
            "Aggregated {} notes from {}/{} endpoints",
            notes.len(),
            sources.len() - failed,
            sources.len()
        );

        FederationResult { notes, sources }
    }

    /// One endpoint's pipeline: discovery document, file list, notes.
    /// Returns the source's display name with its tagged notes.
    pub async fn fetch_endpoint(&self, endpoint_url: &str) -> Result<(String, Vec<FederatedNote>)> {
        let discovered = self.discovery.validate(endpoint_url).await?;
        let document = discovered.document;

        let file_list_url = resolve_url(&discovered.actual_url, &document.file_list.url)?;
        debug!("File list for {} is {}", endpoint_url, file_list_url);

        let response = self.transport.fetch(&file_list_url, JSON_ACCEPT).await?;
        if !response.is_success() {
            return Err(FederationError::Http {
                status: response.status,
                url: file_list_url,
            });
        }

        let notes = self
            .normalizer
            .normalize_file_list(&response.body, &file_list_url)
            .await;

        let avatar = match &document.profile.avatar {
            Some(avatar) => Some(resolve_url(&discovered.actual_url, avatar)?),
            None => None,
        };

        let source = NoteSource {
            name: document.profile.name.clone(),
            avatar,
            metadata_url: endpoint_url.to_string(),
        };

        let federated = notes
            .into_iter()
            .map(|note| FederatedNote {
                note,
                source: source.clone(),
            })
            .collect();

        Ok((document.profile.name, federated))
    }
}

/// Newest first. Notes whose date cannot be read sort after every dated note,
/// keeping their relative order.
pub fn sort_by_date_desc(notes: &mut [FederatedNote]) {
    notes.sort_by_cached_key(|n| std::cmp::Reverse(note_timestamp(&n.note.date)));
}

/// Timestamp used for ordering; unreadable dates map to the oldest instant.
pub fn note_timestamp(date: &str) -> DateTime<Utc> {
    parse_note_date(date).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Accepts RFC 3339, RFC 2822, `YYYY-MM-DDTHH:MM:SS[.f]`, `YYYY-MM-DD HH:MM:SS`
/// and date-only forms (`2025-01-05`, `2025/01/05`, `January 5, 2025`,
/// `5 January 2025`) at midnight UTC.
pub fn parse_note_date(date: &str) -> Option<DateTime<Utc>> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(date) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(date, format) {
            return Some(naive.and_utc());
        }
    }
    ["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
