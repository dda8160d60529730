#![allow(dead_code)]

use std::path::PathBuf;

use bundlediff::config::{BundleSection, Manifest, OptionsSection, PathsSection, RawManifest};
use bundlediff::types::Bundle;

/// Builder for `Manifest` to simplify test setup without TOML files.
pub struct ManifestBuilder {
    raw: RawManifest,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawManifest {
                paths: PathsSection::default(),
                options: OptionsSection::default(),
                bundle: Vec::new(),
            },
        }
    }

    pub fn with_bundle(mut self, name: &str, members: &[&str]) -> Self {
        self.raw.bundle.push(BundleSection {
            name: name.to_string(),
            members: members.iter().map(PathBuf::from).collect(),
        });
        self
    }

    pub fn with_output_root(mut self, path: &str) -> Self {
        self.raw.paths.output_root = PathBuf::from(path);
        self
    }

    pub fn with_cache_root(mut self, path: &str) -> Self {
        self.raw.paths.cache_root = PathBuf::from(path);
        self
    }

    pub fn with_pool_root(mut self, path: &str) -> Self {
        self.raw.paths.pool_root = PathBuf::from(path);
        self
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.raw.options.suffix = suffix.to_string();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.raw.options.workers = workers;
        self
    }

    pub fn build(self) -> Manifest {
        Manifest::try_from(self.raw).expect("Failed to build valid manifest from builder")
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for constructing a `Bundle` from string paths.
pub fn bundle(name: &str, members: &[&str]) -> Bundle {
    Bundle::new(name, members.iter().map(PathBuf::from).collect())
}

/// A `Bundle` whose members live under an absolute root (e.g. a tempdir).
pub fn bundle_under(root: &std::path::Path, name: &str, members: &[&str]) -> Bundle {
    Bundle::new(name, members.iter().map(|m| root.join(m)).collect())
}
