use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

/// Name of a bundle, as given in the manifest.
pub type BundleName = String;

/// Target platform for a build.
///
/// Selects which per-platform cache file and output root the engine operates
/// against; the packaged bytes themselves are platform-agnostic here (the
/// packager collaborator is what would differ per platform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Android,
    Ios,
}

impl Default for Platform {
    fn default() -> Self {
        Platform::Windows
    }
}

impl Platform {
    /// Path segment appended to the output/cache/pool roots.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }

    pub fn join(&self, root: &Path) -> PathBuf {
        root.join(self.path_segment())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "windows" => Ok(Platform::Windows),
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            other => Err(format!(
                "invalid platform: {other} (expected \"windows\", \"android\" or \"ios\")"
            )),
        }
    }
}

/// A named unit of packaging: a bundle and the asset paths that belong to it.
///
/// Membership is supplied externally per build invocation (via the manifest);
/// the engine never infers it. Member order within a bundle is irrelevant to
/// change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub name: BundleName,
    pub members: Vec<PathBuf>,
}

impl Bundle {
    pub fn new(name: impl Into<String>, members: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }
}
