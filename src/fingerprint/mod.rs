// src/fingerprint/mod.rs

//! Content fingerprinting for bundle member assets.
//!
//! A fingerprint must change if and only if the asset's packaged content
//! would change. It is derived from the asset bytes (and the bytes of an
//! optional `<asset>.meta` sidecar carrying build-dependency state), never
//! from filesystem metadata, so checkouts that preserve content but alter
//! timestamps do not spuriously invalidate the cache.

pub mod cache;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use blake3::Hasher;
use tracing::debug;

use crate::errors::{BundlediffError, Result};

pub use cache::FingerprintCache;

/// Computes a stable per-asset content fingerprint.
///
/// Production code uses [`Blake3Fingerprinter`]; tests can substitute an
/// implementation returning canned values.
pub trait Fingerprinter: Send + Sync {
    /// Deterministic for unchanged content. Pure read, no side effects.
    ///
    /// Fails with [`BundlediffError::AssetNotFound`] if the asset is gone;
    /// the caller attributes the failure to the bundle being diffed.
    fn fingerprint(&self, path: &Path) -> Result<String>;
}

/// Blake3-based fingerprinter over asset content plus sidecar metadata.
#[derive(Debug, Clone, Default)]
pub struct Blake3Fingerprinter;

impl Fingerprinter for Blake3Fingerprinter {
    fn fingerprint(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(BundlediffError::AssetNotFound {
                bundle: String::new(),
                path: path.to_path_buf(),
            });
        }

        let mut hasher = Hasher::new();
        hash_file_into(&mut hasher, path)?;

        // Fold in the sidecar, if present. Import-settings edits change the
        // packaged output without touching the asset bytes themselves.
        let meta = sidecar_path(path);
        if meta.is_file() {
            debug!("including sidecar {:?} in fingerprint", meta);
            hash_file_into(&mut hasher, &meta)?;
        }

        Ok(hasher.finalize().to_hex().to_string())
    }
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".meta");
    PathBuf::from(os)
}

fn hash_file_into(hasher: &mut Hasher, path: &Path) -> Result<()> {
    let mut file = File::open(path)
        .with_context(|| format!("opening file for fingerprinting: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn fingerprint_is_deterministic_for_unchanged_content() {
        let dir = tempdir().unwrap();
        let asset = dir.path().join("a.png");
        fs::write(&asset, b"pixels").unwrap();

        let fp = Blake3Fingerprinter;
        let h1 = fp.fingerprint(&asset).unwrap();
        let h2 = fp.fingerprint(&asset).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn fingerprint_tracks_content_changes() {
        let dir = tempdir().unwrap();
        let asset = dir.path().join("a.png");
        fs::write(&asset, b"pixels").unwrap();

        let fp = Blake3Fingerprinter;
        let before = fp.fingerprint(&asset).unwrap();
        fs::write(&asset, b"PIXELS").unwrap();
        let after = fp.fingerprint(&asset).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn sidecar_edit_changes_fingerprint() {
        let dir = tempdir().unwrap();
        let asset = dir.path().join("a.png");
        fs::write(&asset, b"pixels").unwrap();

        let fp = Blake3Fingerprinter;
        let bare = fp.fingerprint(&asset).unwrap();

        fs::write(dir.path().join("a.png.meta"), b"compress: true").unwrap();
        let with_meta = fp.fingerprint(&asset).unwrap();
        assert_ne!(bare, with_meta);

        fs::write(dir.path().join("a.png.meta"), b"compress: false").unwrap();
        let edited_meta = fp.fingerprint(&asset).unwrap();
        assert_ne!(with_meta, edited_meta);
    }

    #[test]
    fn missing_asset_is_asset_not_found() {
        let dir = tempdir().unwrap();
        let fp = Blake3Fingerprinter;
        let err = fp.fingerprint(&dir.path().join("gone.png")).unwrap_err();
        assert!(matches!(err, BundlediffError::AssetNotFound { .. }));
    }
}
