// src/publish/manifest.rs

//! Version manifest emission.
//!
//! After a successful publish pass, a version file in the output root lists
//! every published artifact with its size and checksum, so downstream
//! consumers can verify what they downloaded.
//!
//! The manifest describes the whole output tree, not one cycle's delta: an
//! incremental cycle publishes only the rebuilt bundles, so the new records
//! are merged into the prior manifest and entries for bundles dropped from
//! the build are retired.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::Result;
use crate::publish::PublishedArtifact;

pub const VERSION_MANIFEST_FILE: &str = "vc.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub bundle: String,
    pub size: u64,
    pub checksum: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionManifest {
    pub artifacts: Vec<VersionRecord>,
}

impl VersionManifest {
    pub fn from_published(published: &[PublishedArtifact]) -> Self {
        Self {
            artifacts: published
                .iter()
                .map(|p| VersionRecord {
                    bundle: p.bundle.clone(),
                    size: p.size,
                    checksum: p.checksum.clone(),
                })
                .collect(),
        }
    }

    /// Load the manifest from a prior cycle's `<output_dir>/vc.json`.
    ///
    /// A missing file yields an empty manifest (first cycle). An unreadable
    /// one is logged and treated as empty: unlike the bundle cache, the
    /// manifest is derived state and is rebuilt as bundles republish.
    pub fn load_from(output_dir: &Path) -> Self {
        let path = output_dir.join(VERSION_MANIFEST_FILE);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                warn!(?path, error = %err, "could not read version manifest, starting empty");
                return Self::default();
            }
        };
        match serde_json::from_str(&json) {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!(?path, error = %err, "version manifest unreadable, starting empty");
                Self::default()
            }
        }
    }

    /// Fold this cycle's published artifacts into the manifest, replacing
    /// any prior record for the same bundle. Records are kept sorted by
    /// bundle name so the file is byte-stable across cycles.
    pub fn merge_published(&mut self, published: &[PublishedArtifact]) {
        let mut by_bundle: BTreeMap<String, VersionRecord> = self
            .artifacts
            .drain(..)
            .map(|record| (record.bundle.clone(), record))
            .collect();
        for p in published {
            by_bundle.insert(
                p.bundle.clone(),
                VersionRecord {
                    bundle: p.bundle.clone(),
                    size: p.size,
                    checksum: p.checksum.clone(),
                },
            );
        }
        self.artifacts = by_bundle.into_values().collect();
    }

    /// Drop records for bundles no longer part of the build.
    pub fn retain_bundles(&mut self, active: &[&str]) {
        self.artifacts.retain(|record| active.contains(&record.bundle.as_str()));
    }

    /// Write the manifest to `<output_dir>/vc.json`, atomically like the
    /// bundle cache (temp file + rename).
    pub fn write_to(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(VERSION_MANIFEST_FILE);
        let json =
            serde_json::to_string_pretty(self).context("serializing version manifest")?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes())
            .with_context(|| format!("writing version manifest temp file at {:?}", tmp))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("replacing version manifest at {:?}", path))?;

        info!(?path, artifacts = self.artifacts.len(), "wrote version manifest");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn manifest_lists_published_artifacts() {
        let dir = tempdir().unwrap();
        let published = vec![PublishedArtifact {
            bundle: "ui".to_string(),
            path: dir.path().join("ui.bytes"),
            size: 7,
            checksum: "deadbeef".to_string(),
        }];

        let manifest = VersionManifest::from_published(&published);
        let path = manifest.write_to(dir.path()).unwrap();

        let read: VersionManifest =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(read, manifest);
        assert_eq!(read.artifacts[0].bundle, "ui");
        assert_eq!(read.artifacts[0].size, 7);
    }

    fn published(bundle: &str, size: u64, checksum: &str) -> PublishedArtifact {
        PublishedArtifact {
            bundle: bundle.to_string(),
            path: PathBuf::from(format!("{bundle}.bytes")),
            size,
            checksum: checksum.to_string(),
        }
    }

    #[test]
    fn load_from_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert_eq!(VersionManifest::load_from(dir.path()), VersionManifest::default());
    }

    #[test]
    fn load_from_garbage_file_is_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(VERSION_MANIFEST_FILE), b"not json").unwrap();
        assert_eq!(VersionManifest::load_from(dir.path()), VersionManifest::default());
    }

    #[test]
    fn merge_keeps_prior_records_and_replaces_republished_ones() {
        let mut manifest = VersionManifest::from_published(&[
            published("chars", 10, "aaaa"),
            published("ui", 7, "bbbb"),
        ]);

        manifest.merge_published(&[published("ui", 9, "cccc")]);

        assert_eq!(manifest.artifacts.len(), 2);
        assert_eq!(manifest.artifacts[0].bundle, "chars");
        assert_eq!(manifest.artifacts[0].checksum, "aaaa");
        assert_eq!(manifest.artifacts[1].bundle, "ui");
        assert_eq!(manifest.artifacts[1].size, 9);
        assert_eq!(manifest.artifacts[1].checksum, "cccc");
    }

    #[test]
    fn retain_drops_records_for_removed_bundles() {
        let mut manifest = VersionManifest::from_published(&[
            published("chars", 10, "aaaa"),
            published("ui", 7, "bbbb"),
        ]);

        manifest.retain_bundles(&["ui"]);

        assert_eq!(manifest.artifacts.len(), 1);
        assert_eq!(manifest.artifacts[0].bundle, "ui");
    }

    #[test]
    fn round_trip_through_output_dir_preserves_merged_records() {
        let dir = tempdir().unwrap();
        VersionManifest::from_published(&[published("chars", 10, "aaaa")])
            .write_to(dir.path())
            .unwrap();

        let mut manifest = VersionManifest::load_from(dir.path());
        manifest.merge_published(&[published("ui", 7, "bbbb")]);
        manifest.write_to(dir.path()).unwrap();

        let reread = VersionManifest::load_from(dir.path());
        assert_eq!(reread.artifacts.len(), 2);
        assert_eq!(reread.artifacts[0].bundle, "chars");
        assert_eq!(reread.artifacts[1].bundle, "ui");
    }
}
