// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{Bundle, Platform};

/// Top-level bundle manifest as read from a TOML file.
///
/// ```toml
/// [paths]
/// output_root = "bundles/out"
/// cache_root  = "bundles/cache"
/// pool_root   = "bundles/pool"
///
/// [options]
/// suffix  = ".bytes"
/// workers = 8
///
/// [[bundle]]
/// name    = "characters/hero"
/// members = ["assets/hero.png", "assets/hero.anim"]
/// ```
///
/// `[[bundle]]` is an array of tables so that manifest order is preserved:
/// the rebuild list keeps this order, which keeps builds deterministic and
/// logs reproducible.
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    /// Output/cache/pool roots from `[paths]`.
    #[serde(default)]
    pub paths: PathsSection,

    /// Global behaviour options from `[options]`.
    #[serde(default)]
    pub options: OptionsSection,

    /// All bundles from `[[bundle]]`, in manifest order.
    #[serde(default)]
    pub bundle: Vec<BundleSection>,
}

/// `[paths]` section.
///
/// The platform segment is appended at build time, so with the defaults the
/// Windows cache file ends up at `bundles/cache/windows/cache.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,

    /// Staging directory the packager writes raw artifacts into. Cleared at
    /// the start of every cycle so stale artifacts never leak into a new
    /// build's output.
    #[serde(default = "default_pool_root")]
    pub pool_root: PathBuf,
}

fn default_output_root() -> PathBuf {
    PathBuf::from("bundles/out")
}

fn default_cache_root() -> PathBuf {
    PathBuf::from("bundles/cache")
}

fn default_pool_root() -> PathBuf {
    PathBuf::from("bundles/pool")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            cache_root: default_cache_root(),
            pool_root: default_pool_root(),
        }
    }
}

/// `[options]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionsSection {
    /// Suffix appended to published artifact file names.
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Upper bound on concurrent fingerprint/packaging workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_suffix() -> String {
    ".bytes".to_string()
}

fn default_workers() -> usize {
    8
}

impl Default for OptionsSection {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            workers: default_workers(),
        }
    }
}

/// One `[[bundle]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleSection {
    /// Unique, stable bundle name. May contain `/` separators, which become
    /// subdirectories in the output tree.
    pub name: String,

    /// Asset paths belonging to this bundle, relative to the manifest's
    /// directory (or absolute).
    pub members: Vec<PathBuf>,
}

/// Validated manifest. Construct via `Manifest::try_from(RawManifest)`.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub paths: PathsSection,
    pub options: OptionsSection,
    bundles: Vec<BundleSection>,
}

impl Manifest {
    /// Internal constructor used by the validation layer.
    pub(crate) fn new_unchecked(
        paths: PathsSection,
        options: OptionsSection,
        bundles: Vec<BundleSection>,
    ) -> Self {
        Self {
            paths,
            options,
            bundles,
        }
    }

    /// Bundles in manifest order.
    pub fn bundles(&self) -> impl Iterator<Item = &BundleSection> {
        self.bundles.iter()
    }

    pub fn bundle_count(&self) -> usize {
        self.bundles.len()
    }

    /// Materialize `Bundle` values with member paths resolved against `root`.
    pub fn resolved_bundles(&self, root: &std::path::Path) -> Vec<Bundle> {
        self.bundles
            .iter()
            .map(|b| {
                let members = b
                    .members
                    .iter()
                    .map(|m| if m.is_absolute() { m.clone() } else { root.join(m) })
                    .collect();
                Bundle::new(b.name.clone(), members)
            })
            .collect()
    }

    /// Per-platform cache file path.
    pub fn cache_file(&self, platform: Platform) -> PathBuf {
        platform.join(&self.paths.cache_root).join("cache.json")
    }

    /// Per-platform output root.
    pub fn output_dir(&self, platform: Platform) -> PathBuf {
        platform.join(&self.paths.output_root)
    }

    /// Per-platform pool (staging) directory.
    pub fn pool_dir(&self, platform: Platform) -> PathBuf {
        platform.join(&self.paths.pool_root)
    }
}
