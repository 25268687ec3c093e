use crate::types::{Endpoint, FetchResponse, Result};
use async_trait::async_trait;

/// A GET-only transport shared by every component that performs network I/O.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` with the given `Accept` header.
    ///
    /// HTTP error statuses come back as ordinary responses; only a transport
    /// failure that every available tier failed to work around is an `Err`.
    async fn fetch(&self, url: &str, accept: &str) -> Result<FetchResponse>;
}

/// Persistence for the endpoint registry.
///
/// Neither side reports failure to the caller: a failed load yields an empty
/// list and a failed save is dropped after being logged.
pub trait EndpointStore: Send + Sync {
    fn load(&self) -> Vec<Endpoint>;

    fn save(&self, endpoints: &[Endpoint]);
}
