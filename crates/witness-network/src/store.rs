//! Bounded, thread-safe store of finalized network log entries.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use witness_core::{DEFAULT_NETWORK_LOG_CAPACITY, RingBuffer};

use crate::entry::NetworkLogEntry;
use crate::error::{NetworkError, NetworkResult};

/// File name used for network log exports.
pub const NETWORK_LOG_FILE_NAME: &str = "witness_network_logs.json";

/// Holds the most recent `capacity` network log entries.
///
/// Every operation goes through one lock. Readers get a point-in-time copy
/// and never observe a partially applied append or clear.
pub struct NetworkLogStore {
    entries: Mutex<RingBuffer<NetworkLogEntry>>,
}

impl NetworkLogStore {
    /// Create a store retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(RingBuffer::new(capacity)),
        }
    }

    /// Append an entry, evicting the oldest if the store is full.
    pub fn append(&self, entry: NetworkLogEntry) {
        let evicted = self.entries.lock().push(entry);
        if let Some(old) = evicted {
            tracing::trace!(request_id = %old.request_id(), "Evicted oldest network log entry");
        }
    }

    /// Copy of every retained entry, oldest first.
    pub fn all(&self) -> Vec<NetworkLogEntry> {
        self.entries.lock().to_vec()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.entries.lock().capacity()
    }

    /// Change the capacity, dropping the oldest entries that no longer fit.
    pub fn set_capacity(&self, capacity: usize) -> usize {
        self.entries.lock().set_capacity(capacity)
    }

    /// Write the current contents to `path` as a JSON array.
    ///
    /// The contents are copied under the lock and serialized after it is
    /// released, so appends are never blocked on disk IO. The file is
    /// replaced atomically. Returns the number of entries written.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Flush`] if the file cannot be written. Nothing
    /// is retained from a failed attempt; the next flush writes whatever the
    /// store holds at that point.
    pub fn flush_to_durable_form(&self, path: &Path) -> NetworkResult<usize> {
        let entries = self.all();
        let json = serde_json::to_vec_pretty(&entries)?;

        witness_core::write_atomic(path, &json).map_err(|source| NetworkError::Flush {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            path = %path.display(),
            entries = entries.len(),
            "Flushed network logs"
        );
        Ok(entries.len())
    }

    /// Default export location: [`NETWORK_LOG_FILE_NAME`] in the system temp
    /// directory.
    pub fn default_export_path() -> PathBuf {
        std::env::temp_dir().join(NETWORK_LOG_FILE_NAME)
    }
}

impl Default for NetworkLogStore {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORK_LOG_CAPACITY)
    }
}

impl std::fmt::Debug for NetworkLogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("NetworkLogStore")
            .field("len", &entries.len())
            .field("capacity", &entries.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::sample_entry;
    use proptest::prelude::*;

    #[test]
    fn test_default_capacity() {
        let store = NetworkLogStore::default();
        assert_eq!(store.capacity(), 100);
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_evicts_in_insertion_order() {
        let store = NetworkLogStore::new(2);
        store.append(sample_entry("https://a.example"));
        store.append(sample_entry("https://b.example"));
        store.append(sample_entry("https://c.example"));

        let urls: Vec<String> = store.all().iter().map(|e| e.url().to_string()).collect();
        assert_eq!(urls, vec!["https://b.example", "https://c.example"]);
    }

    #[test]
    fn test_huge_capacity() {
        let store = NetworkLogStore::new(usize::MAX);
        store.append(sample_entry("https://a.example"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.capacity(), usize::MAX);
    }

    #[test]
    fn test_concurrent_append_clear_and_read() {
        let store = NetworkLogStore::new(16);
        let writers = 4;
        let per_writer = 500;

        std::thread::scope(|scope| {
            for w in 0..writers {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..per_writer {
                        store.append(sample_entry(&format!("https://w{}.example/{}", w, i)));
                    }
                });
            }

            let store = &store;
            scope.spawn(move || {
                for _ in 0..50 {
                    store.clear();
                    std::thread::yield_now();
                }
            });

            scope.spawn(move || {
                for _ in 0..500 {
                    let entries = store.all();
                    assert!(entries.len() <= 16);

                    // Each writer's entries stay in the order they were appended.
                    let mut last_seen = vec![None::<usize>; writers];
                    for entry in &entries {
                        let (host, index) = entry
                            .url()
                            .trim_start_matches("https://w")
                            .split_once(".example/")
                            .unwrap();
                        let w: usize = host.parse().unwrap();
                        let i: usize = index.parse().unwrap();
                        if let Some(previous) = last_seen[w] {
                            assert!(i > previous);
                        }
                        last_seen[w] = Some(i);
                    }
                }
            });
        });

        assert!(store.len() <= 16);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_flushes_to_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(NETWORK_LOG_FILE_NAME);
        let store = NetworkLogStore::new(2000);
        for i in 0..2000 {
            store.append(sample_entry(&format!("https://a.example/{}", i)));
        }

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let (store, path) = (&store, &path);
                scope.spawn(move || {
                    for _ in 0..10 {
                        assert_eq!(store.flush_to_durable_form(path).unwrap(), 2000);
                    }
                });
            }
        });

        let entries: Vec<NetworkLogEntry> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(entries.len(), 2000);
    }

    #[test]
    fn test_clear() {
        let store = NetworkLogStore::new(4);
        store.append(sample_entry("https://a.example"));
        store.clear();
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_set_capacity_trims_oldest() {
        let store = NetworkLogStore::new(5);
        for i in 0..5 {
            store.append(sample_entry(&format!("https://{}.example", i)));
        }
        assert_eq!(store.set_capacity(2), 3);
        assert_eq!(store.all()[0].url(), "https://3.example");
    }

    #[test]
    fn test_flush_writes_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(NETWORK_LOG_FILE_NAME);
        let store = NetworkLogStore::new(10);
        store.append(sample_entry("https://a.example"));
        store.append(sample_entry("https://b.example"));

        assert_eq!(store.flush_to_durable_form(&path).unwrap(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<NetworkLogEntry> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].url(), "https://b.example");
    }

    #[test]
    fn test_flush_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        let store = NetworkLogStore::new(10);

        assert_eq!(store.flush_to_durable_form(&path).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_flush_failure_then_retry() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = NetworkLogStore::new(10);
        store.append(sample_entry("https://a.example"));

        let err = store
            .flush_to_durable_form(&blocker.join("logs.json"))
            .unwrap_err();
        assert!(matches!(err, NetworkError::Flush { .. }));

        store.append(sample_entry("https://b.example"));
        let written = store
            .flush_to_durable_form(&dir.path().join("logs.json"))
            .unwrap();
        assert_eq!(written, 2);
    }

    #[test]
    fn test_default_export_path() {
        let path = NetworkLogStore::default_export_path();
        assert!(path.ends_with(NETWORK_LOG_FILE_NAME));
    }

    proptest! {
        #[test]
        fn prop_store_never_exceeds_capacity(capacity in 1usize..16, appends in 0usize..64) {
            let store = NetworkLogStore::new(capacity);
            for i in 0..appends {
                store.append(sample_entry(&format!("https://{}.example", i)));
            }

            prop_assert_eq!(store.len(), appends.min(capacity));
            if appends > 0 {
                let all = store.all();
                let last = format!("https://{}.example", appends - 1);
                prop_assert_eq!(all[all.len() - 1].url(), last.as_str());
            }
        }
    }
}
