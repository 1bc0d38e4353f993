use std::collections::BTreeMap;

use pkgenv_version::Requirement;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::RepositoryError;
use crate::repository::Repository;

/// Fingerprint tokens of the package families one solve touched.
///
/// A family the repository did not know is recorded as `None`, so a cached
/// solve that relied on its absence goes stale once it appears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryFingerprint {
    pub repository: String,
    pub families: BTreeMap<String, Option<String>>,
}

impl RepositoryFingerprint {
    /// Ask the repository for the current token of each family
    pub fn capture<I, S>(repository: &dyn Repository, families: I) -> Result<Self, RepositoryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens = BTreeMap::new();
        for family in families {
            let family = family.as_ref();
            tokens.insert(family.to_string(), repository.fingerprint(family)?);
        }
        Ok(Self {
            repository: repository.name().to_string(),
            families: tokens,
        })
    }

    /// Hex SHA-256 over the repository name and every family token
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.repository.as_bytes());
        hasher.update(b"\n");
        for (family, token) in &self.families {
            hasher.update(family.as_bytes());
            hasher.update(b"=");
            hasher.update(token.as_deref().unwrap_or("-").as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// Identifies one cached context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    /// Canonical request text
    pub requests: String,
    pub fingerprint: RepositoryFingerprint,
}

impl CacheKey {
    pub fn new(requests: &[Requirement], fingerprint: RepositoryFingerprint) -> Self {
        Self {
            requests: canonical_requests(requests),
            fingerprint,
        }
    }

    pub fn request_digest(&self) -> String {
        request_digest(&self.requests)
    }

    pub fn fingerprint_digest(&self) -> String {
        self.fingerprint.digest()
    }
}

/// Requests rendered canonically and sorted, one per line
pub fn canonical_requests(requests: &[Requirement]) -> String {
    let mut lines: Vec<String> = requests.iter().map(ToString::to_string).collect();
    lines.sort();
    lines.join("\n")
}

/// Hex SHA-256 of canonical request text
pub fn request_digest(canonical: &str) -> String {
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageDefinition;
    use crate::repository::MemoryRepository;

    fn reqs(texts: &[&str]) -> Vec<Requirement> {
        texts.iter().map(|t| Requirement::parse(t).unwrap()).collect()
    }

    fn repo() -> MemoryRepository {
        MemoryRepository::from_definitions(
            "test",
            vec![PackageDefinition::new("a", "1.0"), PackageDefinition::new("b", "2.0")],
        )
        .unwrap()
    }

    #[test]
    fn test_canonical_requests_ignore_order_and_spelling() {
        let one = canonical_requests(&reqs(&["b<2,>=1", "a-1.0"]));
        let two = canonical_requests(&reqs(&["a-1.0", "b>=1,<2"]));
        assert_eq!(one, two);
        assert_ne!(one, canonical_requests(&reqs(&["a-1.0"])));
    }

    #[test]
    fn test_capture_records_unknown_families() {
        let repo = repo();
        let fp = RepositoryFingerprint::capture(&repo, ["a", "ghost"]).unwrap();
        assert_eq!(fp.repository, "test");
        assert!(fp.families["a"].is_some());
        assert_eq!(fp.families["ghost"], None);
    }

    #[test]
    fn test_digest_tracks_tokens() {
        let mut repo = repo();
        let before = RepositoryFingerprint::capture(&repo, ["a"]).unwrap();
        assert_eq!(before.digest(), RepositoryFingerprint::capture(&repo, ["a"]).unwrap().digest());

        repo.set_fingerprint("a", "mtime-42");
        let after = RepositoryFingerprint::capture(&repo, ["a"]).unwrap();
        assert_ne!(before.digest(), after.digest());
        assert_eq!(after.digest().len(), 64);
    }

    #[test]
    fn test_key_digests() {
        let repo = repo();
        let fp = RepositoryFingerprint::capture(&repo, ["a"]).unwrap();
        let key = CacheKey::new(&reqs(&["a"]), fp.clone());
        assert_eq!(key.requests, "a");
        assert_eq!(key.request_digest(), request_digest("a"));
        assert_eq!(key.fingerprint_digest(), fp.digest());
    }
}
