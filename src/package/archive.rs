// src/package/archive.rs

//! Production packager: one compressed member archive per bundle.
//!
//! Artifact layout (before gzip): for each member in request order,
//! `u32 LE path length | path bytes | u64 LE content length | content`.
//! The raw artifact is also staged at `<pool>/<bundle name>` so the pool
//! directory mirrors what the last packaging pass produced.

use std::fs;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::errors::{BundlediffError, Result};
use crate::package::{PackageOutcome, PackageRequest, Packager};

pub struct ArchivePackager {
    pool_dir: PathBuf,
    workers: usize,
}

impl ArchivePackager {
    pub fn new(pool_dir: PathBuf, workers: usize) -> Self {
        Self {
            pool_dir,
            workers: workers.max(1),
        }
    }
}

impl Packager for ArchivePackager {
    fn package_all(
        &mut self,
        requests: Vec<PackageRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PackageOutcome>>> + Send + '_>> {
        let pool_dir = self.pool_dir.clone();
        let workers = self.workers;

        Box::pin(async move {
            let semaphore = Arc::new(Semaphore::new(workers));
            let mut join_set = JoinSet::new();

            // Bundles are independent; fan out across the bounded pool and
            // stitch outcomes back into request order by index.
            for (index, request) in requests.into_iter().enumerate() {
                let permit = Arc::clone(&semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|e| anyhow!("worker semaphore closed: {e}"))?;
                let pool_dir = pool_dir.clone();

                join_set.spawn(async move {
                    let _permit = permit;
                    let bundle = request.bundle.clone();
                    let result = tokio::task::spawn_blocking(move || {
                        package_one(&pool_dir, &request)
                    })
                    .await;

                    let result = match result {
                        Ok(Ok(bytes)) => Ok(bytes),
                        Ok(Err(err)) => Err(err.to_string()),
                        Err(join_err) => Err(format!("packaging task panicked: {join_err}")),
                    };

                    (index, PackageOutcome { bundle, result })
                });
            }

            let mut outcomes: Vec<Option<PackageOutcome>> = Vec::new();
            while let Some(joined) = join_set.join_next().await {
                let (index, outcome) =
                    joined.map_err(|e| anyhow!("packaging worker panicked: {e}"))?;
                if outcomes.len() <= index {
                    outcomes.resize_with(index + 1, || None);
                }
                outcomes[index] = Some(outcome);
            }

            let outcomes: Vec<PackageOutcome> = outcomes.into_iter().flatten().collect();
            info!(
                packaged = outcomes.iter().filter(|o| o.result.is_ok()).count(),
                failed = outcomes.iter().filter(|o| o.result.is_err()).count(),
                "archive packaging pass complete"
            );
            Ok(outcomes)
        })
    }
}

/// Build the archive for one bundle and stage it in the pool directory.
fn package_one(pool_dir: &Path, request: &PackageRequest) -> Result<Vec<u8>> {
    debug!(bundle = %request.bundle, members = request.members.len(), "packaging bundle");

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());

    for member in request.members.iter() {
        let content = fs::read(member).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                BundlediffError::AssetNotFound {
                    bundle: request.bundle.clone(),
                    path: member.clone(),
                }
            } else {
                BundlediffError::Packaging {
                    bundle: request.bundle.clone(),
                    message: format!("reading member {:?}: {err}", member),
                }
            }
        })?;

        let path_bytes = member.to_string_lossy().into_owned().into_bytes();
        encoder
            .write_all(&(path_bytes.len() as u32).to_le_bytes())
            .context("writing member path length")?;
        encoder.write_all(&path_bytes).context("writing member path")?;
        encoder
            .write_all(&(content.len() as u64).to_le_bytes())
            .context("writing member content length")?;
        encoder.write_all(&content).context("writing member content")?;
    }

    let bytes = encoder
        .finish()
        .with_context(|| format!("finalizing archive for bundle {}", request.bundle))?;

    // Bundle names may contain '/' separators; mirror them in the pool tree.
    let staged_path = pool_dir.join(&request.bundle);
    if let Some(parent) = staged_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating pool subdirectory {:?}", parent))?;
    }
    fs::write(&staged_path, &bytes)
        .with_context(|| format!("staging artifact at {:?}", staged_path))?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn request(bundle: &str, members: &[&PathBuf]) -> PackageRequest {
        PackageRequest {
            bundle: bundle.to_string(),
            members: members.iter().map(|p| (*p).clone()).collect(),
        }
    }

    #[tokio::test]
    async fn packages_each_bundle_and_stages_in_pool() {
        let dir = tempdir().unwrap();
        let a1 = dir.path().join("a1.png");
        let b1 = dir.path().join("b1.png");
        fs::write(&a1, b"aaa").unwrap();
        fs::write(&b1, b"bbb").unwrap();

        let pool = dir.path().join("pool");
        let mut packager = ArchivePackager::new(pool.clone(), 4);

        let outcomes = packager
            .package_all(vec![
                request("ui/main", &[&a1]),
                request("audio", &[&b1]),
            ])
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].bundle, "ui/main");
        assert_eq!(outcomes[1].bundle, "audio");
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_ok());

        // Raw artifacts staged in the pool, nested name included.
        assert!(pool.join("ui/main").is_file());
        assert!(pool.join("audio").is_file());
        assert_eq!(
            fs::read(pool.join("audio")).unwrap(),
            *outcomes[1].result.as_ref().unwrap()
        );
    }

    #[tokio::test]
    async fn deterministic_bytes_for_unchanged_members() {
        let dir = tempdir().unwrap();
        let a1 = dir.path().join("a1.png");
        fs::write(&a1, b"aaa").unwrap();

        let mut packager = ArchivePackager::new(dir.path().join("pool"), 2);

        let first = packager
            .package_all(vec![request("ui", &[&a1])])
            .await
            .unwrap();
        let second = packager
            .package_all(vec![request("ui", &[&a1])])
            .await
            .unwrap();

        assert_eq!(
            first[0].result.as_ref().unwrap(),
            second[0].result.as_ref().unwrap()
        );
    }

    #[tokio::test]
    async fn missing_member_fails_only_that_bundle() {
        let dir = tempdir().unwrap();
        let b1 = dir.path().join("b1.png");
        fs::write(&b1, b"bbb").unwrap();

        let mut packager = ArchivePackager::new(dir.path().join("pool"), 2);
        let gone = dir.path().join("gone.png");

        let outcomes = packager
            .package_all(vec![request("broken", &[&gone]), request("ok", &[&b1])])
            .await
            .unwrap();

        assert!(outcomes[0].result.is_err());
        assert!(outcomes[1].result.is_ok());
        assert!(!dir.path().join("pool/broken").exists());
    }
}
