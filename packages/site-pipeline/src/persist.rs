//! Content artifact storage.
//!
//! One pretty-printed JSON file per slug at `<content_dir>/<slug>.json`.
//! Writes for the same slug are serialized in-process and land via
//! temp-file-and-rename, so readers never observe a partial artifact.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::error::PersistError;
use crate::types::Site;

pub struct Persister {
    content_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Persister {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Where the artifact for `slug` lives.
    pub fn path_for(&self, slug: &str) -> Result<PathBuf, PersistError> {
        check_slug(slug)?;
        Ok(self.content_dir.join(format!("{}.json", slug)))
    }

    /// Write `site`, replacing any previous artifact for its slug.
    pub async fn save(&self, site: &Site) -> Result<PathBuf, PersistError> {
        let path = self.path_for(&site.slug)?;
        let mut json = serde_json::to_string_pretty(site)?;
        json.push('\n');

        let result = self.write_locked(&site.slug, &path, json.as_bytes()).await;
        self.prune_locks();
        result?;

        info!(slug = %site.slug, path = %path.display(), bytes = json.len(), "Artifact written");
        Ok(path)
    }

    async fn write_locked(&self, slug: &str, path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
        let lock = self.lock_for(slug);
        let _guard = lock.lock().await;

        tokio::fs::create_dir_all(&self.content_dir)
            .await
            .map_err(|source| PersistError::Io {
                path: self.content_dir.clone(),
                source,
            })?;

        let tmp = self.content_dir.join(format!(".{}.json.tmp", slug));
        let written = match tokio::fs::write(&tmp, bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, path)
                .await
                .map_err(|source| PersistError::Io {
                    path: path.to_path_buf(),
                    source,
                }),
            Err(source) => Err(PersistError::Io {
                path: tmp.clone(),
                source,
            }),
        };

        if written.is_err() {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %tmp.display(), error = %e, "Failed to remove temp file");
                }
            }
        }
        written
    }

    /// Read the artifact for `slug`, if one exists.
    pub async fn load(&self, slug: &str) -> Result<Option<Site>, PersistError> {
        let path = self.path_for(slug)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(slug = %slug, "No artifact on disk");
                return Ok(None);
            }
            Err(source) => return Err(PersistError::Io { path, source }),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn lock_for(&self, slug: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(slug.to_string()).or_default().clone()
    }

    /// Forget locks nobody holds or waits on.
    fn prune_locks(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

/// Slugs are path components; only `[a-z0-9-]` is allowed.
fn check_slug(slug: &str) -> Result<(), PersistError> {
    let valid = !slug.is_empty()
        && !slug.starts_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PersistError::InvalidSlug(slug.to_string()))
    }
}
