// src/engine/mod.rs

//! The build engine: drives one incremental build cycle.
//!
//! A cycle is logically sequential: load cache → diff → package → commit →
//! publish. Fingerprinting and packaging of independent bundles fan out over
//! a bounded worker pool; the cache commit is the single-writer barrier after
//! all parallel work is done. If the process dies mid-cycle, the on-disk
//! cache still reflects the last successful cycle.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::{Cache, CacheStore};
use crate::diff::{self, BundleFailure, DiffOutcome};
use crate::errors::Result;
use crate::fingerprint::{FingerprintCache, Fingerprinter};
use crate::package::{PackageRequest, Packager};
use crate::publish::{Artifact, PublishedArtifact, Publisher, VersionManifest};
use crate::types::{Bundle, BundleName};

/// Per-cycle filesystem locations, already platform-qualified.
#[derive(Debug, Clone)]
pub struct CyclePaths {
    pub cache_file: PathBuf,
    pub output_dir: PathBuf,
    pub pool_dir: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Treat the cache as empty without reading it. The on-disk cache file
    /// survives until the full rebuild commits successfully.
    pub force_full: bool,
    /// Compute and report the rebuild decision, then stop: no packaging, no
    /// cache mutation, no publishing.
    pub dry_run: bool,
    /// Upper bound on concurrent fingerprint/packaging workers.
    pub workers: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            force_full: false,
            dry_run: false,
            workers: 8,
        }
    }
}

/// What one cycle did, for the final user-visible report.
#[derive(Debug)]
pub struct BuildReport {
    /// Bundles (re)packaged, in manifest order.
    pub rebuilt: Vec<BundleName>,
    /// Bundles skipped as unchanged, in manifest order.
    pub skipped: Vec<BundleName>,
    /// Per-bundle failures (fingerprinting or packaging). Non-empty means
    /// the staged cache was NOT committed.
    pub failures: Vec<BundleFailure>,
    /// Output files written by the publisher (empty on dry-run or failure).
    pub published: Vec<PublishedArtifact>,
    pub elapsed: Duration,
    pub dry_run: bool,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Exclusively owns the cache for the duration of one build cycle.
pub struct BuildEngine {
    paths: CyclePaths,
    options: EngineOptions,
    store: CacheStore,
}

impl BuildEngine {
    pub fn new(paths: CyclePaths, options: EngineOptions) -> Self {
        let store = CacheStore::new(paths.cache_file.clone());
        Self {
            paths,
            options,
            store,
        }
    }

    /// Run one full build cycle over the given bundles.
    ///
    /// The staged cache is committed only if every bundle fingerprinted and
    /// packaged successfully; any failure leaves the persisted cache exactly
    /// as it was before the cycle. A stale cache entry costs a redundant
    /// rebuild next time; a falsely-updated one would silently publish stale
    /// content, so the trade always goes the same way.
    pub async fn run(
        &self,
        bundles: Vec<Bundle>,
        fingerprinter: Arc<dyn Fingerprinter>,
        packager: &mut dyn Packager,
        publisher: &mut dyn Publisher,
    ) -> Result<BuildReport> {
        let started = Instant::now();

        let cache = self.load_cache()?;

        let outcome = self
            .diff_bundles(&bundles, &cache, Arc::clone(&fingerprinter))
            .await;

        info!(
            rebuild = outcome.rebuild.len(),
            skipped = outcome.skipped.len(),
            "need to build {} bundle(s)",
            outcome.rebuild.len()
        );

        if self.options.dry_run {
            return Ok(BuildReport {
                rebuilt: outcome.rebuild.iter().map(|b| b.name.clone()).collect(),
                skipped: outcome.skipped,
                failures: outcome.failures,
                published: Vec::new(),
                elapsed: started.elapsed(),
                dry_run: true,
            });
        }

        let DiffOutcome {
            rebuild,
            staged,
            skipped,
            mut failures,
        } = outcome;

        self.prepare_directories()?;

        let artifacts = self.package_rebuild_set(&rebuild, packager, &mut failures).await?;

        if !failures.is_empty() {
            warn!(
                failed = failures.len(),
                "cycle failed; previous cache left untouched"
            );
            let failed: HashSet<&str> = failures.iter().map(|f| f.bundle.as_str()).collect();
            return Ok(BuildReport {
                rebuilt: rebuild
                    .iter()
                    .map(|b| b.name.clone())
                    .filter(|name| !failed.contains(name.as_str()))
                    .collect(),
                skipped,
                failures,
                published: Vec::new(),
                elapsed: started.elapsed(),
                dry_run: false,
            });
        }

        // The barrier: every parallel packaging task finished cleanly, so the
        // staged cache is now the truth. Commit before publishing so an
        // interrupted publish costs a redundant republish, never a missed
        // rebuild.
        self.store.save(&staged)?;

        let published = publisher.publish(artifacts)?;

        // The version manifest covers the whole output tree, so an
        // incremental cycle folds its delta into the prior manifest instead
        // of replacing it, and retires bundles dropped from the build.
        let active: Vec<&str> = bundles.iter().map(|b| b.name.as_str()).collect();
        let mut version = VersionManifest::load_from(&self.paths.output_dir);
        version.merge_published(&published);
        version.retain_bundles(&active);
        version.write_to(&self.paths.output_dir)?;

        let elapsed = started.elapsed();
        info!(seconds = elapsed.as_secs_f64(), "build cycle complete");

        Ok(BuildReport {
            rebuilt: rebuild.iter().map(|b| b.name.clone()).collect(),
            skipped,
            failures,
            published,
            elapsed,
            dry_run: false,
        })
    }

    /// Create output and cache directories if missing; clear the pool so a
    /// prior run's artifacts never leak into this build's output.
    fn prepare_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.paths.output_dir)
            .with_context(|| format!("creating output dir {:?}", self.paths.output_dir))?;
        if let Some(cache_dir) = self.paths.cache_file.parent() {
            fs::create_dir_all(cache_dir)
                .with_context(|| format!("creating cache dir {:?}", cache_dir))?;
        }

        if self.paths.pool_dir.exists() {
            debug!(pool = ?self.paths.pool_dir, "clearing stale pool directory");
            fs::remove_dir_all(&self.paths.pool_dir)
                .with_context(|| format!("clearing pool dir {:?}", self.paths.pool_dir))?;
        }
        fs::create_dir_all(&self.paths.pool_dir)
            .with_context(|| format!("creating pool dir {:?}", self.paths.pool_dir))?;

        Ok(())
    }

    fn load_cache(&self) -> Result<Cache> {
        if self.options.force_full {
            info!("force full rebuild: treating cache as empty (on-disk file kept until commit)");
            return Ok(Cache::new());
        }
        Ok(self.store.load()?.into_cache())
    }

    /// Prewarm fingerprints across the worker pool, then run the pure diff.
    ///
    /// Prewarm failures are dropped here; the diff recomputes the failing
    /// path and attributes the error to the owning bundle.
    async fn diff_bundles(
        &self,
        bundles: &[Bundle],
        cache: &Cache,
        fingerprinter: Arc<dyn Fingerprinter>,
    ) -> DiffOutcome {
        let mut memo = FingerprintCache::new(fingerprinter.as_ref());

        match self.prewarm(bundles, Arc::clone(&fingerprinter)).await {
            Ok(seeded) => {
                for (path, fp) in seeded {
                    memo.seed(path, fp);
                }
            }
            Err(err) => warn!(error = %err, "fingerprint prewarm failed; diffing serially"),
        }

        diff::diff(bundles, cache, &mut memo)
    }

    async fn prewarm(
        &self,
        bundles: &[Bundle],
        fingerprinter: Arc<dyn Fingerprinter>,
    ) -> Result<Vec<(PathBuf, String)>> {
        let unique: HashSet<PathBuf> = bundles
            .iter()
            .flat_map(|b| b.members.iter().cloned())
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let mut join_set = JoinSet::new();

        for path in unique {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| anyhow!("worker semaphore closed: {e}"))?;
            let fingerprinter = Arc::clone(&fingerprinter);

            join_set.spawn(async move {
                let _permit = permit;
                tokio::task::spawn_blocking(move || {
                    let fp = fingerprinter.fingerprint(&path);
                    (path, fp)
                })
                .await
            });
        }

        let mut seeded = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            let inner = joined.map_err(|e| anyhow!("prewarm worker panicked: {e}"))?;
            let (path, fp) = inner.map_err(|e| anyhow!("prewarm task panicked: {e}"))?;
            match fp {
                Ok(fp) => seeded.push((path, fp)),
                // Leave the failure to the diff, which knows the bundle.
                Err(err) => debug!(?path, error = %err, "prewarm fingerprint failed"),
            }
        }

        Ok(seeded)
    }

    /// Invoke the packager on the rebuild set, splitting outcomes into
    /// publishable artifacts and per-bundle failures.
    async fn package_rebuild_set(
        &self,
        rebuild: &[Bundle],
        packager: &mut dyn Packager,
        failures: &mut Vec<BundleFailure>,
    ) -> Result<Vec<Artifact>> {
        if rebuild.is_empty() {
            return Ok(Vec::new());
        }

        let requests: Vec<PackageRequest> =
            rebuild.iter().map(PackageRequest::from_bundle).collect();
        let outcomes = packager.package_all(requests).await?;

        let mut artifacts = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(bytes) => artifacts.push(Artifact {
                    bundle: outcome.bundle,
                    bytes,
                }),
                Err(message) => {
                    warn!(bundle = %outcome.bundle, %message, "bundle failed to package");
                    failures.push(BundleFailure {
                        bundle: outcome.bundle,
                        error: message,
                    });
                }
            }
        }

        Ok(artifacts)
    }
}
