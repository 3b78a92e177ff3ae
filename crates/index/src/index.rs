//! The retrieval index: one cached description and embedding per file.
//!
//! Built once per repository and reused across runs: a file is only
//! re-described when its content hash changes. Entries for files that
//! disappear stay until an explicit [`RetrievalIndex::rebuild`].

use chrono::Utc;
use codewright_core::error::{IndexError, ProviderError};
use codewright_core::event::{DomainEvent, EventBus};
use codewright_core::retrieval::{Describer, Embedder, RetrievalEntry, ScoredEntry};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{DescriptionCache, EntryMap};
use crate::lock::BuildLock;
use crate::vector;
use crate::walker::{self, WalkOptions};

const CACHE_FILE: &str = "descriptions.jsonl";
const LOCK_FILE: &str = "build.lock";

/// What one build did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Indexable files found
    pub scanned: usize,
    /// Files whose cached entry was still current
    pub reused: usize,
    /// Files sent to the describer
    pub described: usize,
    /// Matching files that could not be indexed
    pub skipped: usize,
}

pub struct RetrievalIndex {
    root: PathBuf,
    cache: DescriptionCache,
    lock_path: PathBuf,
    options: WalkOptions,
    describer: Arc<dyn Describer>,
    embedder: Arc<dyn Embedder>,
    entries: RwLock<EntryMap>,
    events: Option<Arc<EventBus>>,
}

/// Cache directory for a repository: the first 16 hex chars of the
/// SHA-256 of its canonical path.
pub fn repository_cache_dir(cache_dir: &Path, canonical_root: &Path) -> PathBuf {
    let digest = hex::encode(Sha256::digest(canonical_root.to_string_lossy().as_bytes()));
    cache_dir.join(&digest[..16])
}

impl RetrievalIndex {
    /// Open the index for `repository_root`, loading any existing cache.
    pub fn open(
        repository_root: &Path,
        cache_dir: &Path,
        options: WalkOptions,
        describer: Arc<dyn Describer>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, IndexError> {
        let root = repository_root.canonicalize().map_err(|e| {
            IndexError::RepositoryNotFound(format!("{}: {e}", repository_root.display()))
        })?;
        if !root.is_dir() {
            return Err(IndexError::RepositoryNotFound(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let dir = repository_cache_dir(cache_dir, &root);
        let cache = DescriptionCache::new(dir.join(CACHE_FILE));
        let entries = cache.load()?;

        info!(
            repository = %root.display(),
            cache = %cache.path().display(),
            entries = entries.len(),
            "Retrieval index opened"
        );

        Ok(Self {
            root,
            cache,
            lock_path: dir.join(LOCK_FILE),
            options,
            describer,
            embedder,
            entries: RwLock::new(entries),
            events: None,
        })
    }

    /// Publish `IndexBuilt` events on `bus`.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn repository_root(&self) -> &Path {
        &self.root
    }

    pub fn cache_path(&self) -> &Path {
        self.cache.path()
    }

    /// Describe and embed every new or changed file.
    pub async fn build(&self) -> Result<BuildReport, IndexError> {
        let _lock = BuildLock::acquire(&self.lock_path).await?;
        self.build_locked().await
    }

    /// Drop the cache, then build from scratch.
    pub async fn rebuild(&self) -> Result<BuildReport, IndexError> {
        let _lock = BuildLock::acquire(&self.lock_path).await?;
        self.cache.clear()?;
        self.entries.write().await.clear();
        info!(repository = %self.root.display(), "Description cache cleared");
        self.build_locked().await
    }

    async fn build_locked(&self) -> Result<BuildReport, IndexError> {
        // Another process may have built while we waited for the lock
        let mut current = self.cache.load()?;
        *self.entries.write().await = current.clone();

        let walk = walker::walk(&self.root, &self.options);
        let mut report = BuildReport {
            scanned: walk.files.len(),
            skipped: walk.skipped,
            ..BuildReport::default()
        };

        for file in walk.files {
            if current
                .get(&file.path)
                .is_some_and(|e| e.content_hash == file.hash)
            {
                report.reused += 1;
                continue;
            }

            debug!(path = %file.path, "Describing file");
            let description = self.describer.describe(&file.path, &file.content).await?;
            let embedding = single_embedding(self.embedder.embed(vec![description.clone()]).await?)?;

            let entry = RetrievalEntry {
                path: file.path.clone(),
                embedding,
                description,
                content_hash: file.hash,
                updated_at: Utc::now(),
            };
            self.cache.append(&entry)?;
            current.insert(file.path.clone(), entry.clone());
            self.entries.write().await.insert(file.path, entry);
            report.described += 1;
        }

        if report.described > 0 {
            self.cache.compact(&current)?;
        }

        info!(
            repository = %self.root.display(),
            scanned = report.scanned,
            reused = report.reused,
            described = report.described,
            skipped = report.skipped,
            "Retrieval index built"
        );

        if let Some(bus) = &self.events {
            bus.publish(DomainEvent::IndexBuilt {
                repository: self.root.display().to_string(),
                scanned: report.scanned,
                reused: report.reused,
                described: report.described,
                timestamp: Utc::now(),
            });
        }

        Ok(report)
    }

    /// The `k` entries most similar to `question`.
    pub async fn query(&self, question: &str, k: usize) -> Result<Vec<ScoredEntry>, IndexError> {
        if k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        let query_embedding = single_embedding(self.embedder.embed(vec![question.to_string()]).await?)?;

        let entries = self.entries.read().await;
        if let Some(stale) = entries
            .values()
            .find(|e| e.embedding.len() != query_embedding.len())
        {
            return Err(invalid_embedding(format!(
                "query embedding has {} dimensions but {} has {}; rebuild the index after changing the embedding model",
                query_embedding.len(),
                stale.path,
                stale.embedding.len()
            )));
        }
        Ok(vector::rank(entries.values(), &query_embedding, k))
    }

    /// All entries in path order.
    pub async fn entries(&self) -> Vec<RetrievalEntry> {
        self.entries.read().await.values().cloned().collect()
    }

    pub async fn get(&self, path: &str) -> Option<RetrievalEntry> {
        self.entries.read().await.get(path).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// The one non-empty vector expected back from a single-text embed call.
fn single_embedding(mut vectors: Vec<Vec<f32>>) -> Result<Vec<f32>, IndexError> {
    match vectors.pop() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(invalid_embedding("embedder returned no vectors".into())),
    }
}

fn invalid_embedding(message: String) -> IndexError {
    IndexError::Backend(ProviderError::ApiError {
        status_code: 200,
        message,
    })
}
