// src/cache/mod.rs

//! Persisted bundle cache: the durable state that makes builds incremental.

pub mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use store::{CacheStore, LoadedCache};

/// Persisted record for one bundle: asset path → content fingerprint of its
/// members as of the last successful build.
///
/// If a `BundleCacheEntry` exists for a bundle and its `file_info` exactly
/// matches the bundle's current member fingerprints (same key set, same
/// values), the bundle is unchanged and must not be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleCacheEntry {
    pub bundle_name: String,
    pub file_info: BTreeMap<String, String>,
}

impl BundleCacheEntry {
    pub fn new(bundle_name: impl Into<String>) -> Self {
        Self {
            bundle_name: bundle_name.into(),
            file_info: BTreeMap::new(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.file_info.len()
    }
}

/// The entire persisted state: bundle name → last-known member fingerprints.
///
/// Exclusively owned by the build engine for the duration of one cycle;
/// loaded once at cycle start, mutated only as a staged copy, written back
/// atomically after a fully successful cycle. `BTreeMap` keeps serialization
/// byte-stable so `save(load(x)) == x`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cache {
    entries: BTreeMap<String, BundleCacheEntry>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bundle_name: &str) -> Option<&BundleCacheEntry> {
        self.entries.get(bundle_name)
    }

    pub fn contains(&self, bundle_name: &str) -> bool {
        self.entries.contains_key(bundle_name)
    }

    /// Insert or replace the entry for a bundle.
    pub fn insert(&mut self, entry: BundleCacheEntry) {
        self.entries.insert(entry.bundle_name.clone(), entry);
    }

    /// Drop entries for bundles not present in `active_bundles`.
    ///
    /// Returns how many entries were removed.
    pub fn prune(&mut self, active_bundles: &[&str]) -> usize {
        let initial_len = self.entries.len();
        self.entries.retain(|k, _| active_bundles.contains(&k.as_str()));
        initial_len - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BundleCacheEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, files: &[(&str, &str)]) -> BundleCacheEntry {
        let mut e = BundleCacheEntry::new(name);
        for (path, fp) in files {
            e.file_info.insert(path.to_string(), fp.to_string());
        }
        e
    }

    #[test]
    fn insert_replaces_existing_entry() {
        let mut cache = Cache::new();
        cache.insert(entry("ui", &[("a.png", "1")]));
        cache.insert(entry("ui", &[("a.png", "2")]));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("ui").unwrap().file_info["a.png"], "2");
    }

    #[test]
    fn prune_drops_only_inactive_entries() {
        let mut cache = Cache::new();
        cache.insert(entry("ui", &[("a.png", "1")]));
        cache.insert(entry("audio", &[("b.ogg", "2")]));
        cache.insert(entry("retired", &[("c.bin", "3")]));

        let removed = cache.prune(&["ui", "audio"]);

        assert_eq!(removed, 1);
        assert!(cache.contains("ui"));
        assert!(cache.contains("audio"));
        assert!(!cache.contains("retired"));
    }
}
