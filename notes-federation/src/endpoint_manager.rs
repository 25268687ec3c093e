use crate::discovery::Discovery;
use crate::traits::EndpointStore;
use crate::types::{Endpoint, EndpointStatus, FederationError, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Owns the list of registered endpoints and keeps it in step with storage.
///
/// Entries are kept in insertion order and are unique by `url`. Every
/// mutation is saved before the call returns.
pub struct EndpointManager<S: EndpointStore> {
    store: S,
    discovery: Discovery,
    endpoints: Vec<Endpoint>,
}

impl<S: EndpointStore> EndpointManager<S> {
    pub fn new(store: S, discovery: Discovery) -> Self {
        let mut endpoints = store.load();

        // A hand-edited store may carry duplicates; the first entry wins.
        let loaded = endpoints.len();
        let mut seen = std::collections::HashSet::new();
        endpoints.retain(|e| seen.insert(e.url.clone()));
        if endpoints.len() != loaded {
            warn!("Dropped {} duplicate endpoints from storage", loaded - endpoints.len());
        }

        debug!("Loaded {} endpoints", endpoints.len());
        Self {
            store,
            discovery,
            endpoints,
        }
    }

    pub fn list(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn get(&self, url: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.url == url)
    }

    /// Discovery-document URLs of every registered endpoint, in order.
    pub fn urls(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.url.clone()).collect()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate `raw_url` and register the endpoint it resolves to.
    pub async fn add(&mut self, raw_url: &str) -> Result<Endpoint> {
        let discovered = self.discovery.validate(raw_url).await?;

        if self.get(&discovered.actual_url).is_some() {
            return Err(FederationError::DuplicateEndpoint {
                url: discovered.actual_url,
            });
        }

        let now = Utc::now();
        let endpoint = Endpoint {
            url: discovered.actual_url,
            name: discovered.document.profile.name,
            avatar: discovered.document.profile.avatar,
            added_at: now,
            last_checked: Some(now),
            status: EndpointStatus::Online,
        };

        self.endpoints.push(endpoint.clone());
        self.flush();

        info!("Added endpoint '{}' at {}", endpoint.name, endpoint.url);
        Ok(endpoint)
    }

    /// Remove the entry keyed by `url`. Absent keys are ignored.
    pub fn remove(&mut self, url: &str) {
        let before = self.endpoints.len();
        self.endpoints.retain(|e| e.url != url);

        if self.endpoints.len() == before {
            debug!("Remove of unknown endpoint {} ignored", url);
            return;
        }

        info!("Removed endpoint {}", url);
        self.flush();
    }

    /// Set the status of an existing entry and stamp `last_checked`.
    pub fn update_status(&mut self, url: &str, status: EndpointStatus) {
        let Some(endpoint) = self.endpoints.iter_mut().find(|e| e.url == url) else {
            debug!("Status update for unknown endpoint {} ignored", url);
            return;
        };

        endpoint.status = status;
        endpoint.last_checked = Some(Utc::now());
        self.flush();
    }

    /// Re-validate `url` and record the outcome. Never fails.
    pub async fn check_health(&mut self, url: &str) -> EndpointStatus {
        let status = match self.discovery.validate(url).await {
            Ok(_) => EndpointStatus::Online,
            Err(e) => {
                warn!("Health check failed for {}: {}", url, e);
                EndpointStatus::Offline
            }
        };

        self.update_status(url, status);
        status
    }

    /// Health-check every registered endpoint, one after another.
    pub async fn check_all(&mut self) -> Vec<(String, EndpointStatus)> {
        let mut results = Vec::with_capacity(self.endpoints.len());
        for url in self.urls() {
            let status = self.check_health(&url).await;
            results.push((url, status));
        }
        results
    }

    fn flush(&self) {
        self.store.save(&self.endpoints);
    }
}
