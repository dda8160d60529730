// src/publish/mod.rs

//! Publishing: copy packaged artifacts into the output tree.
//!
//! Thin I/O glue around the core. The engine hands over packaged bytes keyed
//! by bundle name; the publisher writes `<output_root>/<bundle><suffix>`,
//! optionally transforming the bytes first (the encryption hook of the
//! output pipeline sits behind [`ArtifactTransform`]), and reports size plus
//! a blake3 checksum of the final file for downstream verification.

pub mod manifest;

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{debug, info};

use crate::errors::Result;
use crate::types::BundleName;

pub use manifest::{VersionManifest, VersionRecord};

/// A packaged artifact handed over for publishing.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bundle: BundleName,
    pub bytes: Vec<u8>,
}

/// Record of one published output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    pub bundle: BundleName,
    pub path: PathBuf,
    pub size: u64,
    pub checksum: String,
}

/// Byte transform applied before the output file is written.
///
/// Identity by default; an encrypting transform slots in here without the
/// engine or publisher knowing.
pub trait ArtifactTransform: Send + Sync {
    fn transform(&self, bytes: Vec<u8>) -> Result<Vec<u8>>;
}

/// The default no-op transform.
#[derive(Debug, Clone, Default)]
pub struct IdentityTransform;

impl ArtifactTransform for IdentityTransform {
    fn transform(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        Ok(bytes)
    }
}

/// Consumes packaged artifacts keyed by bundle name and writes them out.
///
/// Tests can substitute a fake that records calls instead of touching disk.
pub trait Publisher: Send {
    fn publish(&mut self, artifacts: Vec<Artifact>) -> Result<Vec<PublishedArtifact>>;
}

/// Production publisher writing into an output directory tree.
pub struct DiskPublisher {
    output_dir: PathBuf,
    suffix: String,
    transform: Box<dyn ArtifactTransform>,
}

impl DiskPublisher {
    pub fn new(output_dir: PathBuf, suffix: String) -> Self {
        Self {
            output_dir,
            suffix,
            transform: Box::new(IdentityTransform),
        }
    }

    pub fn with_transform(mut self, transform: Box<dyn ArtifactTransform>) -> Self {
        self.transform = transform;
        self
    }
}

impl Publisher for DiskPublisher {
    fn publish(&mut self, artifacts: Vec<Artifact>) -> Result<Vec<PublishedArtifact>> {
        let mut published = Vec::with_capacity(artifacts.len());

        for artifact in artifacts {
            // Bundle names may contain '/' separators; mirror them as
            // subdirectories in the output tree.
            let file_name = format!("{}{}", artifact.bundle, self.suffix);
            let path = self.output_dir.join(&file_name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating output subdirectory {:?}", parent))?;
            }

            let bytes = self.transform.transform(artifact.bytes)?;
            fs::write(&path, &bytes)
                .with_context(|| format!("writing published artifact at {:?}", path))?;

            let size = bytes.len() as u64;
            let checksum = blake3::hash(&bytes).to_hex().to_string();
            debug!(bundle = %artifact.bundle, ?path, size, "published artifact");

            published.push(PublishedArtifact {
                bundle: artifact.bundle,
                path,
                size,
                checksum,
            });
        }

        info!(count = published.len(), dir = ?self.output_dir, "publish pass complete");
        Ok(published)
    }
}
