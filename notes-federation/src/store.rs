use crate::traits::EndpointStore;
use crate::types::{Endpoint, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, warn};

/// In-process store, used by tests and by embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    endpoints: Mutex<Vec<Endpoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoints(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints: Mutex::new(endpoints),
        }
    }

    /// What the last `save` wrote.
    pub fn snapshot(&self) -> Vec<Endpoint> {
        self.endpoints.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

impl EndpointStore for MemoryStore {
    fn load(&self) -> Vec<Endpoint> {
        self.snapshot()
    }

    fn save(&self, endpoints: &[Endpoint]) {
        match self.endpoints.lock() {
            Ok(mut guard) => *guard = endpoints.to_vec(),
            Err(e) => error!("Failed to save endpoints to memory store: {}", e),
        }
    }
}

/// Endpoint list kept as a pretty-printed JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<Endpoint>> {
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    // Written to a sibling temp file and renamed into place.
    fn write(&self, endpoints: &[Endpoint]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(endpoints)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl EndpointStore for JsonFileStore {
    fn load(&self) -> Vec<Endpoint> {
        if !self.path.exists() {
            debug!("No endpoint file at {}, starting empty", self.path.display());
            return Vec::new();
        }

        match self.read() {
            Ok(endpoints) => endpoints,
            Err(e) => {
                warn!("Failed to read endpoints from {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn save(&self, endpoints: &[Endpoint]) {
        if let Err(e) = self.write(endpoints) {
            error!("Failed to save endpoints to {}: {}", self.path.display(), e);
        }
    }
}
