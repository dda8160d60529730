// src/errors.rs

//! Crate-wide error taxonomy and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundlediffError {
    #[error("Manifest error: {0}")]
    ManifestError(String),

    #[error(
        "Cache file at {path:?} is corrupt: {source} (pass --full to rebuild from scratch)"
    )]
    CacheCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Bundle {bundle}: member asset not found: {path:?}")]
    AssetNotFound { bundle: String, path: PathBuf },

    #[error("Packaging failed for bundle {bundle}: {message}")]
    Packaging { bundle: String, message: String },

    #[error("{failed} of {total} bundles failed; cache left untouched")]
    CycleFailed { failed: usize, total: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BundlediffError>;
