use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use log::debug;

use super::{CacheKey, ContextStore, RepositoryFingerprint};
use crate::context::Context;
use crate::error::CacheError;

/// Process-local context store.
#[derive(Debug, Default)]
pub struct MemoryCache {
    /// request digest -> fingerprint digest -> context
    entries: RwLock<HashMap<String, BTreeMap<String, Context>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored contexts
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContextStore for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Context>, CacheError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(&key.request_digest())
            .and_then(|by_fp| by_fp.get(&key.fingerprint_digest()))
            .cloned())
    }

    fn put(&self, key: &CacheKey, context: &Context) -> Result<bool, CacheError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let by_fp = entries.entry(key.request_digest()).or_default();
        let fp = key.fingerprint_digest();
        if by_fp.contains_key(&fp) {
            debug!("context for '{}' already cached", key.requests);
            return Ok(false);
        }
        by_fp.insert(fp, context.clone());
        Ok(true)
    }

    fn fingerprints(&self, request_digest: &str) -> Result<Vec<RepositoryFingerprint>, CacheError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(request_digest)
            .map(|by_fp| {
                by_fp
                    .values()
                    .map(|ctx| ctx.metadata.fingerprint.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
