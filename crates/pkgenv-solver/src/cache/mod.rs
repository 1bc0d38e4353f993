//! Context cache.
//!
//! Contexts are keyed by the canonical request text and the fingerprint of
//! every package family the solve touched. Entries are immutable: the first
//! `put` for a key wins and later ones are ignored. A reader finds
//! candidates through [`ContextStore::fingerprints`] and only trusts one
//! whose recorded fingerprint still matches the repository.

mod disk;
mod key;
mod memory;

use crate::context::Context;
use crate::error::CacheError;

pub use disk::DiskCache;
pub use key::{canonical_requests, request_digest, CacheKey, RepositoryFingerprint};
pub use memory::MemoryCache;

/// Storage for resolved contexts.
///
/// Implementations must serialize `put` per key so concurrent resolves of
/// the same requests store exactly one context.
pub trait ContextStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<Context>, CacheError>;

    /// Store `context` unless the key is already present.
    ///
    /// Returns whether this call stored it.
    fn put(&self, key: &CacheKey, context: &Context) -> Result<bool, CacheError>;

    /// Fingerprints stored for a request digest
    fn fingerprints(&self, request_digest: &str) -> Result<Vec<RepositoryFingerprint>, CacheError>;
}
