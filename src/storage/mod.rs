//! Persistence engine for the JSON documents backing titles, profiles, and
//! runtime configuration.
//!
//! Each concern is one document in the data directory, independently loadable
//! and independently corruptible. Loading an absent file writes and returns
//! the caller's default; loading an unparsable file logs the corruption and
//! returns the default, leaving the broken file in place until the next
//! successful save overwrites it. Saves write the full document atomically
//! (exclusive file lock, unique temp file, rename) so a torn write can never
//! reach disk. There is no background retry: an I/O failure is reported to
//! the mutation that triggered it, and in-memory state stays authoritative
//! until the next save attempt.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use fs2::FileExt;
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::TagError;

/// Load a document from `path`, falling back to `default` when the file is
/// absent (the default is persisted immediately) or unparsable (the corruption
/// is logged and the file left for the next save to overwrite).
pub fn load_or_init<T>(path: &Path, default: T) -> Result<T, TagError>
where
    T: Serialize + DeserializeOwned,
{
    match fs::read_to_string(path) {
        Ok(data) => {
            // Guard against any accidental leading NULs
            let cleaned = data.trim_start_matches('\0');
            match serde_json::from_str(cleaned) {
                Ok(doc) => Ok(doc),
                Err(e) => {
                    let corrupt = TagError::DataCorrupt {
                        path: path.display().to_string(),
                        detail: e.to_string(),
                    };
                    warn!("{corrupt}; continuing with the default document");
                    Ok(default)
                }
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            save(path, &default)?;
            Ok(default)
        }
        Err(e) => Err(e.into()),
    }
}

/// Write the full document to `path`. Failures are logged here and returned
/// to the caller; in-memory state remains the source of truth.
pub fn save<T: Serialize>(path: &Path, doc: &T) -> Result<(), TagError> {
    let content = serde_json::to_string_pretty(doc)?;
    match write_atomic(path, &content) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("failed to save {}: {}", path.display(), e);
            Err(e)
        }
    }
}

/// Atomically replace `path` with `content` under an exclusive file lock.
fn write_atomic(path: &Path, content: &str) -> Result<(), TagError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    // Open (or create) the destination to hold the lock for the whole replace.
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(path)?;
    lock_file.lock_exclusive()?;

    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("doc.json");
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                tmp.write_all(content.as_bytes())?;
                tmp.flush()?;
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    };

    fs::rename(&tmp_path, path)?;

    // Fsync the directory so the rename survives a crash (best-effort).
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }

    drop(lock_file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct Doc {
        entries: HashMap<String, u32>,
    }

    #[test]
    fn absent_file_writes_and_returns_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.json");
        let mut default = Doc::default();
        default.entries.insert("a".into(), 1);

        let loaded = load_or_init(&path, default.clone()).unwrap();
        assert_eq!(loaded, default);
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.json");
        let mut doc = Doc::default();
        doc.entries.insert("steve".into(), 7);
        doc.entries.insert("alex".into(), 2);

        save(&path, &doc).unwrap();
        let loaded: Doc = load_or_init(&path, Doc::default()).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn corrupt_file_falls_back_to_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.json");
        fs::write(&path, "{ not json at all").unwrap();

        let loaded: Doc = load_or_init(&path, Doc::default()).unwrap();
        assert_eq!(loaded, Doc::default());
        // the broken file is left in place until the next save
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json at all");

        let mut doc = Doc::default();
        doc.entries.insert("fixed".into(), 1);
        save(&path, &doc).unwrap();
        let reloaded: Doc = load_or_init(&path, Doc::default()).unwrap();
        assert_eq!(reloaded, doc);
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.json");
        save(&path, &Doc::default()).unwrap();
        let stray: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(stray.is_empty());
    }
}
