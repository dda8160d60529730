// src/package/mod.rs

//! Pluggable packager abstraction.
//!
//! The build engine talks to a [`Packager`] instead of a concrete packaging
//! pipeline. This makes it easy to swap in a fake packager in tests while
//! keeping the production archive implementation in [`archive`].
//!
//! - `ArchivePackager` is the default implementation used by `bundlediff`.
//!   It packs each bundle's members into a compressed archive and stages the
//!   raw artifact in the pool directory.
//! - Tests can provide their own `Packager` that records which bundles were
//!   requested and returns deterministic bytes or canned failures.

pub mod archive;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::errors::Result;
use crate::types::BundleName;

pub use archive::ArchivePackager;

/// One packaging request: a bundle name and its member asset paths, in
/// manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    pub bundle: BundleName,
    pub members: Vec<PathBuf>,
}

impl PackageRequest {
    pub fn from_bundle(bundle: &crate::types::Bundle) -> Self {
        Self {
            bundle: bundle.name.clone(),
            members: bundle.members.clone(),
        }
    }
}

/// Per-bundle packaging result: the packaged artifact bytes, or the failure
/// message for that bundle alone.
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    pub bundle: BundleName,
    pub result: std::result::Result<Vec<u8>, String>,
}

/// Trait abstracting how the rebuild set is packaged.
///
/// The outer `Result` is for infrastructure failures (e.g. the staging
/// directory cannot be written at all); per-bundle failures are reported in
/// the outcomes so one bad bundle never hides the others.
pub trait Packager: Send {
    /// Package every requested bundle, returning one outcome per request in
    /// request order.
    fn package_all(
        &mut self,
        requests: Vec<PackageRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PackageOutcome>>> + Send + '_>>;
}
