// src/cache/store.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::cache::Cache;
use crate::errors::{BundlediffError, Result};

/// Result of loading the persisted cache.
///
/// A missing file is not an error: it means "everything changed" (first
/// build, or the cache dir was wiped). A file that exists but does not parse
/// IS an error: it may be the remains of a partial write, and silently
/// treating it as empty would be indistinguishable from a legitimate first
/// build while hiding the corruption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedCache {
    Present(Cache),
    Missing,
}

impl LoadedCache {
    /// The cache to diff against, empty on a miss.
    pub fn into_cache(self) -> Cache {
        match self {
            LoadedCache::Present(cache) => cache,
            LoadedCache::Missing => Cache::new(),
        }
    }
}

/// Loads and persists the bundle cache as a single JSON document.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deserialize the persisted cache.
    ///
    /// Absent file → `LoadedCache::Missing`. Unparseable file →
    /// [`BundlediffError::CacheCorrupt`]; callers must pass force-full
    /// explicitly to proceed past a corrupt cache.
    pub fn load(&self) -> Result<LoadedCache> {
        if !self.path.exists() {
            warn!(path = ?self.path, "no cache file found; treating all bundles as changed");
            return Ok(LoadedCache::Missing);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading cache file at {:?}", self.path))?;

        let cache: Cache = serde_json::from_str(&contents).map_err(|source| {
            BundlediffError::CacheCorrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        info!(path = ?self.path, entries = cache.len(), "loaded bundle cache");
        Ok(LoadedCache::Present(cache))
    }

    /// Serialize the full cache and replace the prior file atomically.
    ///
    /// Writes to `<path>.tmp` then renames into place; a half-written cache
    /// is never observable. A corrupt cache silently read back as "unchanged"
    /// would mean missed rebuilds, which is worse than a full rebuild.
    pub fn save(&self, cache: &Cache) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating cache directory at {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(cache)
            .context("serializing bundle cache")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes())
            .with_context(|| format!("writing cache temp file at {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing cache file at {:?}", self.path))?;

        info!(path = ?self.path, entries = cache.len(), "persisted bundle cache");
        Ok(())
    }
}
