//! Description cache — persistent JSON-lines storage of retrieval entries.
//!
//! Each line is a JSON-encoded `RetrievalEntry`. During a build new entries
//! are appended one line at a time; a later line for the same path wins on
//! load. [`DescriptionCache::compact`] rewrites the file sorted by path with
//! one line per entry, through a sibling temp file that is renamed over the
//! cache.

use codewright_core::error::IndexError;
use codewright_core::retrieval::RetrievalEntry;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Entries keyed (and therefore ordered) by repository path.
pub type EntryMap = BTreeMap<String, RetrievalEntry>;

pub struct DescriptionCache {
    path: PathBuf,
}

impl DescriptionCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all entries. A missing file is an empty cache; a bad line is fatal,
    /// except an unterminated last line left by an interrupted append.
    pub fn load(&self) -> Result<EntryMap, IndexError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(EntryMap::new()),
            Err(e) => {
                return Err(IndexError::Storage(format!(
                    "Failed to read cache {}: {e}",
                    self.path.display()
                )));
            }
        };

        let torn_tail = !content.is_empty() && !content.ends_with('\n');
        let last = content.lines().count().saturating_sub(1);

        let mut entries = EntryMap::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: RetrievalEntry = match serde_json::from_str(line) {
                Ok(entry) => entry,
                Err(e) if torn_tail && i == last => {
                    warn!(path = %self.path.display(), line = i + 1, error = %e, "Ignoring truncated cache line");
                    break;
                }
                Err(e) => {
                    return Err(IndexError::CacheCorrupted {
                        path: self.path.display().to_string(),
                        line: i + 1,
                        reason: e.to_string(),
                    });
                }
            };
            entries.insert(entry.path.clone(), entry);
        }

        debug!(path = %self.path.display(), count = entries.len(), "Description cache loaded");
        Ok(entries)
    }

    /// Append one entry as a single line.
    pub fn append(&self, entry: &RetrievalEntry) -> Result<(), IndexError> {
        self.ensure_parent()?;
        let mut line = encode(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| IndexError::Storage(format!("Failed to open cache: {e}")))?;
        file.write_all(line.as_bytes())
            .map_err(|e| IndexError::Storage(format!("Failed to append to cache: {e}")))
    }

    /// Rewrite the cache as exactly `entries`, sorted by path.
    pub fn compact(&self, entries: &EntryMap) -> Result<(), IndexError> {
        self.ensure_parent()?;

        let mut content = String::new();
        for entry in entries.values() {
            content.push_str(&encode(entry)?);
            content.push('\n');
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        std::fs::write(&tmp, &content)
            .map_err(|e| IndexError::Storage(format!("Failed to write cache: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| IndexError::Storage(format!("Failed to replace cache: {e}")))?;

        Ok(())
    }

    fn ensure_parent(&self) -> Result<(), IndexError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IndexError::Storage(format!("Failed to create cache directory: {e}"))
            })?;
        }
        Ok(())
    }

    /// Delete the cache file if present.
    pub fn clear(&self) -> Result<(), IndexError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IndexError::Storage(format!("Failed to clear cache: {e}"))),
        }
    }
}

fn encode(entry: &RetrievalEntry) -> Result<String, IndexError> {
    serde_json::to_string(entry)
        .map_err(|e| IndexError::Storage(format!("Failed to serialize cache entry: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(path: &str) -> RetrievalEntry {
        RetrievalEntry {
            path: path.into(),
            embedding: vec![0.5, -0.25],
            description: format!("Summary of {path}"),
            content_hash: "ab".repeat(32),
            updated_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn compact_and_load_persists_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DescriptionCache::new(dir.path().join("nested/descriptions.jsonl"));

        let mut entries = EntryMap::new();
        entries.insert("z.py".into(), entry("z.py"));
        entries.insert("a.py".into(), entry("a.py"));
        cache.compact(&entries).unwrap();

        let raw = std::fs::read_to_string(cache.path()).unwrap();
        let first = raw.lines().next().unwrap();
        assert!(first.contains("\"a.py\""));

        let loaded = cache.load().unwrap();
        assert_eq!(loaded, entries);
        assert!(!dir.path().join("nested/descriptions.jsonl.tmp").exists());
    }

    #[test]
    fn appended_lines_win_and_compact_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DescriptionCache::new(dir.path().join("descriptions.jsonl"));

        let mut updated = entry("b.py");
        updated.description = "Newer summary".into();
        cache.append(&entry("b.py")).unwrap();
        cache.append(&entry("a.py")).unwrap();
        cache.append(&updated).unwrap();
        assert_eq!(std::fs::read_to_string(cache.path()).unwrap().lines().count(), 3);

        let loaded = cache.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["b.py"].description, "Newer summary");

        cache.compact(&loaded).unwrap();
        let raw = std::fs::read_to_string(cache.path()).unwrap();
        let paths: Vec<String> = raw
            .lines()
            .map(|l| serde_json::from_str::<RetrievalEntry>(l).unwrap().path)
            .collect();
        assert_eq!(paths, vec!["a.py", "b.py"]);
    }

    #[test]
    fn truncated_last_line_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("descriptions.jsonl");
        let good = serde_json::to_string(&entry("a.py")).unwrap();
        let torn = &serde_json::to_string(&entry("b.py")).unwrap()[..20];
        std::fs::write(&path, format!("{good}\n{torn}")).unwrap();

        let loaded = DescriptionCache::new(path).load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("a.py"));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DescriptionCache::new(dir.path().join("descriptions.jsonl"));
        assert!(cache.load().unwrap().is_empty());
    }

    #[test]
    fn corrupted_line_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("descriptions.jsonl");
        let good = serde_json::to_string(&entry("a.py")).unwrap();
        std::fs::write(&path, format!("{good}\nthis is not json\n")).unwrap();

        let err = DescriptionCache::new(path).load().unwrap_err();
        match err {
            IndexError::CacheCorrupted { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DescriptionCache::new(dir.path().join("descriptions.jsonl"));
        let mut entries = EntryMap::new();
        entries.insert("a.py".into(), entry("a.py"));
        cache.compact(&entries).unwrap();
        cache.clear().unwrap();
        assert!(!cache.path().exists());
        cache.clear().unwrap();
    }
}
