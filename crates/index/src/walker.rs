//! Repository walker — finds indexable files and hashes their contents.

use codewright_config::IndexConfig;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Which files the walker yields.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Extensions without the leading dot, compared case-insensitively
    pub extensions: Vec<String>,
    /// Directory names pruned anywhere below the root
    pub exclude_dirs: Vec<String>,
    pub max_file_bytes: u64,
}

impl From<&IndexConfig> for WalkOptions {
    fn from(config: &IndexConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            exclude_dirs: config.exclude_dirs.clone(),
            max_file_bytes: config.max_file_bytes,
        }
    }
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self::from(&IndexConfig::default())
    }
}

/// A readable text file inside the repository.
#[derive(Debug, Clone)]
pub struct RepoFile {
    /// Repository-relative, `/`-separated
    pub path: String,
    pub content: String,
    /// Hex SHA-256 of the file bytes
    pub hash: String,
}

/// Files found by one walk, plus how many candidates were skipped.
#[derive(Debug, Default)]
pub struct WalkResult {
    pub files: Vec<RepoFile>,
    /// Oversized, non-UTF-8, or unreadable files with a matching extension
    pub skipped: usize,
}

/// Hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// `root`-relative path with `/` separators.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Walk `root` in file-name order and collect every indexable file.
pub fn walk(root: &Path, options: &WalkOptions) -> WalkResult {
    let mut result = WalkResult::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !options.exclude_dirs.iter().any(|d| *d == name)
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable path");
                result.skipped += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() || !has_extension(entry.path(), &options.extensions) {
            continue;
        }

        let Some(path) = relative_path(root, entry.path()) else {
            continue;
        };

        let size = entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX);
        if size > options.max_file_bytes {
            debug!(path = %path, size, "Skipping oversized file");
            result.skipped += 1;
            continue;
        }

        let bytes = match std::fs::read(entry.path()) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %path, error = %e, "Skipping unreadable file");
                result.skipped += 1;
                continue;
            }
        };

        let hash = content_hash(&bytes);
        let content = match String::from_utf8(bytes) {
            Ok(c) => c,
            Err(_) => {
                debug!(path = %path, "Skipping binary file");
                result.skipped += 1;
                continue;
            }
        };

        result.files.push(RepoFile {
            path,
            content,
            hash,
        });
    }

    result
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}
