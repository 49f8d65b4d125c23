//! Durable storage for crash records: one JSON file per crash.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{CrashError, CrashResult};
use crate::record::CrashRecord;

/// Name of the default crash directory inside the system temp directory.
pub const DEFAULT_CRASH_DIR_NAME: &str = "witness_crashes";

/// Directory of `crash_<millis>.json` files.
pub struct CrashStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl CrashStore {
    /// Store records under `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Directory records are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<temp_dir>/witness_crashes`.
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join(DEFAULT_CRASH_DIR_NAME)
    }

    /// Write `record` synchronously and return its path.
    ///
    /// The file is fully synced before this returns. Two records from the
    /// same millisecond get distinct names.
    pub fn persist(&self, record: &CrashRecord) -> CrashResult<PathBuf> {
        let json = serde_json::to_vec_pretty(record)?;

        // Bounded wait: this runs inside the panic hook, possibly on several
        // threads at once.
        let _guard = self.write_lock.try_lock_for(Duration::from_secs(1));
        let path = self.unique_path(record);

        witness_core::write_atomic(&path, &json).map_err(|source| CrashError::Persist {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Every stored record, oldest first.
    pub fn load_all(&self) -> CrashResult<Vec<CrashRecord>> {
        let mut records = Vec::new();
        for path in self.record_paths()? {
            let bytes = fs::read(&path).map_err(|source| CrashError::Read {
                path: path.clone(),
                source,
            })?;
            let record = serde_json::from_slice(&bytes)
                .map_err(|source| CrashError::Parse { path, source })?;
            records.push(record);
        }
        records.sort_by_key(|r: &CrashRecord| r.timestamp);
        Ok(records)
    }

    /// Delete every stored record. Returns how many were removed.
    pub fn clear(&self) -> CrashResult<usize> {
        let paths = self.record_paths()?;
        for path in &paths {
            fs::remove_file(path).map_err(|source| CrashError::Read {
                path: path.clone(),
                source,
            })?;
        }
        Ok(paths.len())
    }

    fn record_paths(&self) -> CrashResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CrashError::Read {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_record_file(path))
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn unique_path(&self, record: &CrashRecord) -> PathBuf {
        let path = self.dir.join(record.file_name());
        if !path.exists() {
            return path;
        }
        let millis = record.timestamp.timestamp_millis();
        (1u32..)
            .map(|n| self.dir.join(format!("crash_{}_{}.json", millis, n)))
            .find(|candidate| !candidate.exists())
            .unwrap_or(path)
    }
}

impl Default for CrashStore {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

impl std::fmt::Debug for CrashStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrashStore").field("dir", &self.dir).finish()
    }
}

fn is_record_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with("crash_") && name.ends_with(".json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Fault;

    #[test]
    fn test_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrashStore::new(dir.path().join("crashes"));
        let record = CrashRecord::from_fault(&Fault::new("panic", "boom", "trace"));

        let path = store.persist(&record).unwrap();
        assert!(path.ends_with(record.file_name()));

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, vec![record]);
    }

    #[test]
    fn test_same_millisecond_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrashStore::new(dir.path());
        let record = CrashRecord::from_fault(&Fault::new("panic", "boom", "trace"));

        let first = store.persist(&record).unwrap();
        let second = store.persist(&record).unwrap();

        assert_ne!(first, second);
        assert_eq!(store.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrashStore::new(dir.path().join("never-created"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_ignores_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        let store = CrashStore::new(dir.path());
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrashStore::new(dir.path());
        store
            .persist(&CrashRecord::from_fault(&Fault::new("panic", "a", "")))
            .unwrap();

        assert_eq!(store.clear().unwrap(), 1);
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_persist_into_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let store = CrashStore::new(&blocker);
        let err = store
            .persist(&CrashRecord::from_fault(&Fault::new("panic", "a", "")))
            .unwrap_err();
        assert!(matches!(err, CrashError::Persist { .. }));
    }
}
