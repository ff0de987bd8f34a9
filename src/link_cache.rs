//! Cache of resolved download links, keyed by access code.
//!
//! Filled on the first successful remote lookup of a code and consulted
//! before any further remote call for the same code.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageResult};

/// Storage slot holding the link map
pub const LINKS_KEY: &str = "download_links";

/// Persistent code → URL map
pub struct LinkCache<S: KeyValueStore> {
    store: S,
    links: BTreeMap<String, String>,
}

impl<S: KeyValueStore> LinkCache<S> {
    /// Load the cache; a missing or corrupt slot yields an empty cache.
    pub fn load(store: S) -> Self {
        let links = match store.read(LINKS_KEY) {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "Stored download links are corrupt, starting empty");
                BTreeMap::new()
            }),
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read download links, starting empty");
                BTreeMap::new()
            }
        };

        Self { store, links }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.links.get(code).map(String::as_str)
    }

    /// Record a link and persist the whole map.
    pub fn insert(&mut self, code: &str, url: &str) {
        self.links.insert(code.to_string(), url.to_string());
        debug!(code, url, "Cached download link");
        if let Err(e) = self.persist() {
            warn!(error = %e, "Failed to persist download links");
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn persist(&self) -> StorageResult<()> {
        let bytes = serde_json::to_vec(&self.links)?;
        self.store.write(LINKS_KEY, &bytes)
    }
}
