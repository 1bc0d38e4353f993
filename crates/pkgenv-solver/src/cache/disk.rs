use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{debug, warn};
use walkdir::WalkDir;

use super::{CacheKey, ContextStore, RepositoryFingerprint};
use crate::context::Context;
use crate::error::CacheError;

/// Filesystem context store
///
/// Layout: `<root>/<request-digest>/<fingerprint-digest>.json`. Writes go
/// through a temporary file in the target directory and are persisted
/// without clobbering, so concurrent writers of one key leave the first
/// complete entry in place.
#[derive(Debug, Clone)]
pub struct DiskCache {
    /// Root directory of the cache
    root: PathBuf,
    /// Whether the cache is enabled
    enabled: bool,
    /// Whether the cache is read-only
    read_only: bool,
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl DiskCache {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            enabled: true,
            read_only: false,
        }
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the cache can be used at all.
    ///
    /// A writable cache creates its root on demand; a read-only one needs it
    /// to exist already.
    pub fn is_enabled(&self) -> bool {
        if !self.enabled || !Self::is_usable(&self.root) {
            return false;
        }

        if self.read_only {
            return self.root.is_dir();
        }

        self.root.is_dir() || fs::create_dir_all(&self.root).is_ok()
    }

    /// Whether entries can be read without touching the filesystem layout
    fn is_readable(&self) -> bool {
        self.enabled && Self::is_usable(&self.root) && self.root.is_dir()
    }

    /// Reject null-device paths
    pub fn is_usable(path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        !(path_str.contains("/dev/null")
            || path_str.contains("\\dev\\null")
            || path_str.eq_ignore_ascii_case("nul")
            || path_str.contains("$null"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(key.request_digest())
            .join(format!("{}.json", key.fingerprint_digest()))
    }

    fn read_entry(&self, path: &Path) -> Result<Option<Context>, CacheError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(path)(e)),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Remove every entry, keeping the root directory
    pub fn clear(&self) -> Result<(), CacheError> {
        if !self.is_enabled() || self.read_only {
            return Ok(());
        }

        for entry in fs::read_dir(&self.root).map_err(io_error(&self.root))? {
            let path = entry.map_err(io_error(&self.root))?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path).map_err(io_error(&path))?;
            } else {
                fs::remove_file(&path).map_err(io_error(&path))?;
            }
        }
        debug!("cleared context cache at {}", self.root.display());
        Ok(())
    }

    /// Remove entries older than `ttl` and the request directories they
    /// leave empty, returning the bytes freed
    pub fn gc(&self, ttl: Duration) -> Result<u64, CacheError> {
        if !self.is_readable() || self.read_only {
            return Ok(0);
        }

        let now = SystemTime::now();
        let mut freed = 0u64;

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let expired = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > ttl);
            if expired && fs::remove_file(path).is_ok() {
                freed += metadata.len();
            }
        }

        for entry in fs::read_dir(&self.root).map_err(io_error(&self.root))? {
            let path = entry.map_err(io_error(&self.root))?.path();
            let empty = path.is_dir()
                && fs::read_dir(&path).is_ok_and(|mut entries| entries.next().is_none());
            if empty && fs::remove_dir(&path).is_ok() {
                debug!("removed empty cache directory {}", path.display());
            }
        }

        Ok(freed)
    }

    /// Total size of all entries in bytes
    pub fn size(&self) -> Result<u64, CacheError> {
        if !self.is_readable() {
            return Ok(0);
        }

        Ok(WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.metadata().ok())
            .filter(|m| m.is_file())
            .map(|m| m.len())
            .sum())
    }
}

impl ContextStore for DiskCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Context>, CacheError> {
        if !self.is_readable() {
            return Ok(None);
        }
        self.read_entry(&self.entry_path(key))
    }

    fn put(&self, key: &CacheKey, context: &Context) -> Result<bool, CacheError> {
        if !self.is_enabled() || self.read_only {
            return Ok(false);
        }

        let path = self.entry_path(key);
        if path.exists() {
            return Ok(false);
        }
        let dir = self.root.join(key.request_digest());
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;

        let data = serde_json::to_vec_pretty(context)?;
        let mut temp = tempfile::Builder::new()
            .prefix(".context")
            .tempfile_in(&dir)
            .map_err(io_error(&dir))?;
        temp.write_all(&data).map_err(io_error(temp.path()))?;
        temp.as_file().sync_all().map_err(io_error(&path))?;

        match temp.persist_noclobber(&path) {
            Ok(_) => {
                debug!("cached context for '{}' at {}", key.requests, path.display());
                Ok(true)
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(io_error(&path)(e.error)),
        }
    }

    fn fingerprints(&self, request_digest: &str) -> Result<Vec<RepositoryFingerprint>, CacheError> {
        if !self.is_readable() {
            return Ok(Vec::new());
        }

        let dir = self.root.join(request_digest);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir)(e)),
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut fingerprints = Vec::new();
        for path in paths {
            match self.read_entry(&path) {
                Ok(Some(context)) => fingerprints.push(context.metadata.fingerprint),
                Ok(None) => {}
                Err(e) => warn!("skipping unreadable cache entry: {}", e),
            }
        }
        Ok(fingerprints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::tests::sample;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_cache_new() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path().to_path_buf());

        assert_eq!(cache.root(), temp.path());
        assert!(cache.is_enabled());
        assert!(!cache.is_read_only());
    }

    #[test]
    fn test_cache_get_put() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path().join("contexts"));
        let (key, ctx) = sample("t1", 1);

        assert!(cache.get(&key).unwrap().is_none());
        assert!(cache.put(&key, &ctx).unwrap());
        assert_eq!(cache.get(&key).unwrap(), Some(ctx));

        let expected = temp
            .path()
            .join("contexts")
            .join(key.request_digest())
            .join(format!("{}.json", key.fingerprint_digest()));
        assert!(expected.is_file());
    }

    #[test]
    fn test_cache_first_writer_wins() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path().to_path_buf());
        let (key, first) = sample("t1", 1);
        let (_, second) = sample("t1", 2);

        assert!(cache.put(&key, &first).unwrap());
        assert!(!cache.put(&key, &second).unwrap());
        assert_eq!(cache.get(&key).unwrap().unwrap().metadata.steps, 1);
    }

    #[test]
    fn test_cache_fingerprints() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path().to_path_buf());
        let (k1, c1) = sample("t1", 1);
        let (k2, c2) = sample("t2", 1);
        cache.put(&k1, &c1).unwrap();
        cache.put(&k2, &c2).unwrap();

        let fps = cache.fingerprints(&k1.request_digest()).unwrap();
        assert_eq!(fps.len(), 2);
        assert!(fps.contains(&k1.fingerprint));
        assert!(fps.contains(&k2.fingerprint));
        assert!(cache.fingerprints("missing").unwrap().is_empty());
    }

    #[test]
    fn test_cache_corrupt_entry() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path().to_path_buf());
        let (key, _) = sample("t1", 1);

        let dir = temp.path().join(key.request_digest());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.json", key.fingerprint_digest())), b"{not json").unwrap();

        assert!(matches!(cache.get(&key), Err(CacheError::Corrupt { .. })));
        assert!(cache.fingerprints(&key.request_digest()).unwrap().is_empty());
    }

    #[test]
    fn test_cache_clear() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path().to_path_buf());
        let (key, ctx) = sample("t1", 1);
        cache.put(&key, &ctx).unwrap();

        cache.clear().unwrap();
        assert!(cache.get(&key).unwrap().is_none());
        assert!(temp.path().is_dir());
    }

    #[test]
    fn test_cache_gc() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path().to_path_buf());
        let (old_key, old) = sample("old", 1);
        cache.put(&old_key, &old).unwrap();

        thread::sleep(Duration::from_millis(100));

        let (new_key, new) = sample("new", 1);
        cache.put(&new_key, &new).unwrap();

        let freed = cache.gc(Duration::from_millis(50)).unwrap();
        assert!(freed > 0);
        assert!(cache.get(&old_key).unwrap().is_none());
        assert!(cache.get(&new_key).unwrap().is_some());
    }

    #[test]
    fn test_cache_gc_removes_empty_directories() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path().to_path_buf());
        let (key, ctx) = sample("t1", 1);
        cache.put(&key, &ctx).unwrap();
        let dir = temp.path().join(key.request_digest());
        assert!(dir.is_dir());

        thread::sleep(Duration::from_millis(100));
        assert!(cache.gc(Duration::from_millis(50)).unwrap() > 0);
        assert!(!dir.exists());
        assert!(temp.path().is_dir());
    }

    #[test]
    fn test_cache_size_does_not_create_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("contexts");
        let cache = DiskCache::new(root.clone());

        assert_eq!(cache.size().unwrap(), 0);
        assert!(cache.fingerprints("missing").unwrap().is_empty());
        assert!(!root.exists());
    }

    #[test]
    fn test_cache_size() {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(temp.path().to_path_buf());
        assert_eq!(cache.size().unwrap(), 0);

        let (key, ctx) = sample("t1", 1);
        cache.put(&key, &ctx).unwrap();
        let written = serde_json::to_vec_pretty(&ctx).unwrap().len() as u64;
        assert_eq!(cache.size().unwrap(), written);
    }

    #[test]
    fn test_cache_read_only() {
        let temp = TempDir::new().unwrap();
        let mut cache = DiskCache::new(temp.path().to_path_buf());
        let (key, ctx) = sample("t1", 1);
        cache.put(&key, &ctx).unwrap();

        cache.set_read_only(true);
        let (other_key, other) = sample("t2", 1);
        assert!(!cache.put(&other_key, &other).unwrap());
        assert!(cache.get(&other_key).unwrap().is_none());
        assert!(cache.get(&key).unwrap().is_some());
    }

    #[test]
    fn test_cache_disabled() {
        let temp = TempDir::new().unwrap();
        let mut cache = DiskCache::new(temp.path().to_path_buf());
        cache.set_enabled(false);
        let (key, ctx) = sample("t1", 1);
        assert!(!cache.put(&key, &ctx).unwrap());
        assert!(cache.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_is_usable() {
        assert!(!DiskCache::is_usable(Path::new("/dev/null")));
        assert!(!DiskCache::is_usable(Path::new("NUL")));
        assert!(!DiskCache::is_usable(Path::new("$null")));
        assert!(DiskCache::is_usable(Path::new("/tmp/pkgenv")));
    }
}
