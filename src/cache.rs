//! File cache of analysis bundles, keyed by spreadsheet URL and filters.
//!
//! A read never fails: missing, expired and unreadable entries are all
//! misses, and expired or unreadable files are removed on the way.
use crate::config::CacheConfig;
use crate::report::AnalysisBundle;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

const ENTRY_EXTENSION: &str = "json";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Parameters besides the URL that change the analysis result.
pub type CacheFilters = BTreeMap<String, String>;

/// Hex SHA-256 of the canonical JSON `{"filters": ..., "url": ...}`.
pub fn cache_key(url: &str, filters: &CacheFilters) -> String {
    // serde_json::Map keeps keys sorted, so equal inputs serialize identically
    let canonical = serde_json::json!({ "url": url, "filters": filters }).to_string();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    bundle: AnalysisBundle,
}

pub struct ResultCache {
    config: CacheConfig,
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.config.directory.join(format!("{key}.{ENTRY_EXTENSION}"))
    }

    fn is_expired(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        // A timestamp in the future cannot be trusted either
        now.signed_duration_since(stored_at)
            .to_std()
            .map_or(true, |age| age >= self.config.ttl)
    }

    /// Cached bundle for `url` and `filters`, if present and fresh.
    pub fn get(&self, url: &str, filters: &CacheFilters) -> Option<AnalysisBundle> {
        self.lookup(&cache_key(url, filters), Utc::now())
    }

    fn lookup(&self, key: &str, now: DateTime<Utc>) -> Option<AnalysisBundle> {
        let path = self.entry_path(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return None,
            Err(error) => {
                warn!(path = %path.display(), %error, "unreadable cache entry");
                remove_entry(&path);
                return None;
            }
        };
        let entry: CacheEntry = match serde_json::from_str(&text) {
            Ok(entry) => entry,
            Err(error) => {
                warn!(path = %path.display(), %error, "corrupt cache entry removed");
                remove_entry(&path);
                return None;
            }
        };
        if self.is_expired(entry.stored_at, now) {
            debug!(path = %path.display(), "expired cache entry removed");
            remove_entry(&path);
            return None;
        }
        info!(key, stored_at = %entry.stored_at, "cache hit");
        Some(entry.bundle)
    }

    /// Stores a bundle. Failures are logged and otherwise ignored.
    pub fn put(&self, url: &str, filters: &CacheFilters, bundle: &AnalysisBundle) {
        if let Err(error) = self.store(&cache_key(url, filters), bundle, Utc::now()) {
            warn!(%error, "cache write failed");
        }
    }

    fn store(&self, key: &str, bundle: &AnalysisBundle, stored_at: DateTime<Utc>) -> Result<(), CacheError> {
        let directory = &self.config.directory;
        fs::create_dir_all(directory).map_err(|source| CacheError::Io { path: directory.clone(), source })?;
        let text = serde_json::to_string(&CacheEntry { stored_at, bundle: bundle.clone() })?;
        let path = self.entry_path(key);
        fs::write(&path, text).map_err(|source| CacheError::Io { path, source })
    }

    /// Removes every entry. Returns the number of files removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        self.remove_where(|_| true)
    }

    /// Removes expired and unreadable entries. Returns the number of files removed.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        self.remove_where(|path| {
            fs::read_to_string(path)
                .ok()
                .and_then(|text| serde_json::from_str::<CacheEntry>(&text).ok())
                .map_or(true, |entry| self.is_expired(entry.stored_at, now))
        })
    }

    fn remove_where(&self, predicate: impl Fn(&Path) -> bool) -> Result<usize, CacheError> {
        let directory = &self.config.directory;
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => Err(CacheError::Io { path: directory.clone(), source })?,
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(|source| CacheError::Io { path: directory.clone(), source })?.path();
            let is_entry = path.extension().is_some_and(|extension| extension == ENTRY_EXTENSION);
            if is_entry && predicate(&path) {
                fs::remove_file(&path).map_err(|source| CacheError::Io { path: path.clone(), source })?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn remove_entry(path: &Path) {
    if let Err(error) = fs::remove_file(path) {
        debug!(path = %path.display(), %error, "cache entry not removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::set::ClassifiedWorksheetSet;
    use std::time::Duration;

    const URL: &str = "https://docs.google.com/spreadsheets/d/abc123/edit";

    fn cache(directory: &Path) -> ResultCache {
        ResultCache::new(CacheConfig { directory: directory.to_path_buf(), ttl: Duration::from_secs(3600) })
    }

    fn bundle() -> AnalysisBundle {
        AnalysisBundle::from_worksheets("abc123", &ClassifiedWorksheetSet::new())
    }

    fn filters(store: &str) -> CacheFilters {
        CacheFilters::from([("store".to_owned(), store.to_owned())])
    }

    #[test]
    fn test_cache_key() {
        let key = cache_key(URL, &filters("Centro"));
        assert_eq!(key.len(), 64);
        assert_eq!(key, cache_key(URL, &filters("Centro")));
        assert_ne!(key, cache_key(URL, &filters("Norte")));
        assert_ne!(key, cache_key(URL, &CacheFilters::new()));
    }

    #[test]
    fn test_put_then_get() {
        let directory = tempfile::tempdir().unwrap();
        let cache = cache(directory.path());
        assert!(cache.get(URL, &filters("Centro")).is_none());
        cache.put(URL, &filters("Centro"), &bundle());
        assert_eq!(cache.get(URL, &filters("Centro")), Some(bundle()));
        assert!(cache.get(URL, &filters("Norte")).is_none());
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_removed() {
        let directory = tempfile::tempdir().unwrap();
        let cache = cache(directory.path());
        let key = cache_key(URL, &CacheFilters::new());
        let stored_at = Utc::now() - chrono::Duration::seconds(3601);
        cache.store(&key, &bundle(), stored_at).unwrap();
        assert!(cache.lookup(&key, Utc::now()).is_none());
        assert!(!cache.entry_path(&key).exists());
    }

    #[test]
    fn test_fresh_entry_within_ttl() {
        let directory = tempfile::tempdir().unwrap();
        let cache = cache(directory.path());
        let key = cache_key(URL, &CacheFilters::new());
        let stored_at = Utc::now() - chrono::Duration::seconds(3500);
        cache.store(&key, &bundle(), stored_at).unwrap();
        assert!(cache.lookup(&key, Utc::now()).is_some());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss_and_removed() {
        let directory = tempfile::tempdir().unwrap();
        let cache = cache(directory.path());
        let key = cache_key(URL, &CacheFilters::new());
        fs::write(cache.entry_path(&key), "{not json").unwrap();
        assert!(cache.get(URL, &CacheFilters::new()).is_none());
        assert!(!cache.entry_path(&key).exists());
    }

    #[test]
    fn test_write_failure_is_ignored() {
        let directory = tempfile::tempdir().unwrap();
        let blocker = directory.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();
        let cache = cache(&blocker);
        cache.put(URL, &CacheFilters::new(), &bundle());
        assert!(cache.get(URL, &CacheFilters::new()).is_none());
    }

    #[test]
    fn test_clear_and_purge() {
        let directory = tempfile::tempdir().unwrap();
        let cache = cache(directory.path());
        let old = Utc::now() - chrono::Duration::hours(2);
        cache.store("old", &bundle(), old).unwrap();
        cache.store("new", &bundle(), Utc::now()).unwrap();
        fs::write(directory.path().join("broken.json"), "").unwrap();
        fs::write(directory.path().join("notes.txt"), "kept").unwrap();

        assert_eq!(cache.purge_expired().unwrap(), 2);
        assert!(cache.entry_path("new").exists());
        assert_eq!(cache.clear().unwrap(), 1);
        assert!(directory.path().join("notes.txt").exists());
    }

    #[test]
    fn test_clear_missing_directory() {
        let directory = tempfile::tempdir().unwrap();
        let cache = cache(&directory.path().join("absent"));
        assert_eq!(cache.clear().unwrap(), 0);
    }
}
