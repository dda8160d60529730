// src/diff/mod.rs

//! The diff engine: decides the minimal rebuild set for a cycle.
//!
//! Correctness contract: never skip a bundle that actually changed, never
//! falsely invalidate an unchanged one. The verdict for a bundle is derived
//! purely from its current member fingerprints versus the persisted cache
//! entry; bundles never influence each other's verdicts.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::cache::{BundleCacheEntry, Cache};
use crate::errors::{BundlediffError, Result};
use crate::fingerprint::FingerprintCache;
use crate::types::{Bundle, BundleName};

/// A bundle that could not be diffed (e.g. a member asset vanished).
///
/// Failures are per-bundle: unrelated bundles are still diffed, but the
/// cycle as a whole must not commit the staged cache.
#[derive(Debug, Clone)]
pub struct BundleFailure {
    pub bundle: BundleName,
    pub error: String,
}

/// Result of diffing all bundles against the cache.
#[derive(Debug)]
pub struct DiffOutcome {
    /// Bundles to (re)package, in input order.
    pub rebuild: Vec<Bundle>,
    /// The cache as it should be persisted if the whole cycle succeeds:
    /// fresh entries for changed bundles, untouched entries for unchanged
    /// ones, stale entries pruned.
    pub staged: Cache,
    /// Bundles left out of the rebuild set, in input order.
    pub skipped: Vec<BundleName>,
    /// Bundles whose diffing failed.
    pub failures: Vec<BundleFailure>,
}

enum Verdict {
    Changed(BundleCacheEntry),
    Unchanged,
}

/// Compare current bundle membership/fingerprints against the cache.
///
/// Bundles are processed in input order and that order is preserved in
/// `rebuild`, keeping builds deterministic and logs reproducible. Worst case
/// this costs one fingerprint computation per member across all bundles;
/// the per-cycle memo in `fingerprints` keeps shared assets at one hash each.
pub fn diff(
    bundles: &[Bundle],
    cache: &Cache,
    fingerprints: &mut FingerprintCache<'_>,
) -> DiffOutcome {
    let mut staged = cache.clone();

    // Entries for bundles no longer in the manifest are dropped from the
    // staged cache; the drop only takes effect if the cycle commits.
    let active: Vec<&str> = bundles.iter().map(|b| b.name.as_str()).collect();
    let pruned = staged.prune(&active);
    if pruned > 0 {
        info!(pruned, "pruned cache entries for bundles absent from the manifest");
    }

    let mut rebuild = Vec::new();
    let mut skipped = Vec::new();
    let mut failures = Vec::new();

    for bundle in bundles {
        match diff_one(bundle, cache, fingerprints) {
            Ok(Verdict::Changed(entry)) => {
                debug!(bundle = %bundle.name, "changed; staging fresh cache entry");
                staged.insert(entry);
                rebuild.push(bundle.clone());
            }
            Ok(Verdict::Unchanged) => {
                debug!(bundle = %bundle.name, "unchanged; keeping cached entry");
                skipped.push(bundle.name.clone());
            }
            Err(err) => {
                warn!(bundle = %bundle.name, error = %err, "failed to diff bundle");
                failures.push(BundleFailure {
                    bundle: bundle.name.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    info!(
        rebuild = rebuild.len(),
        skipped = skipped.len(),
        failed = failures.len(),
        "diff complete"
    );

    DiffOutcome {
        rebuild,
        staged,
        skipped,
        failures,
    }
}

fn diff_one(
    bundle: &Bundle,
    cache: &Cache,
    fingerprints: &mut FingerprintCache<'_>,
) -> Result<Verdict> {
    let changed = is_changed(bundle, cache, fingerprints)?;
    if !changed {
        return Ok(Verdict::Unchanged);
    }

    // Recompute the full fingerprint set for the current members. The memo
    // makes this free for members already hashed during the comparison.
    let mut entry = BundleCacheEntry::new(bundle.name.clone());
    for member in bundle.members.iter() {
        let fp = fingerprints
            .get_or_compute(member)
            .map_err(|err| attribute(err, &bundle.name))?;
        entry.file_info.insert(member_key(member), fp);
    }

    Ok(Verdict::Changed(entry))
}

fn is_changed(
    bundle: &Bundle,
    cache: &Cache,
    fingerprints: &mut FingerprintCache<'_>,
) -> Result<bool> {
    let Some(entry) = cache.get(&bundle.name) else {
        debug!(bundle = %bundle.name, "no cache entry");
        return Ok(true);
    };

    if entry.member_count() != bundle.members.len() {
        debug!(
            bundle = %bundle.name,
            cached = entry.member_count(),
            current = bundle.members.len(),
            "member count mismatch"
        );
        return Ok(true);
    }

    for member in bundle.members.iter() {
        let key = member_key(member);
        let Some(cached_fp) = entry.file_info.get(&key) else {
            debug!(bundle = %bundle.name, member = %key, "member not in cached entry");
            return Ok(true);
        };

        let current_fp = fingerprints
            .get_or_compute(member)
            .map_err(|err| attribute(err, &bundle.name))?;
        if current_fp != *cached_fp {
            debug!(bundle = %bundle.name, member = %key, "member fingerprint differs");
            return Ok(true);
        }
    }

    // A cached path no longer in the current member set means the bundle's
    // content changed even when the count check above cannot see it.
    let current: HashSet<String> = bundle.members.iter().map(|m| member_key(m)).collect();
    for cached_path in entry.file_info.keys() {
        if !current.contains(cached_path) {
            debug!(bundle = %bundle.name, member = %cached_path, "cached member removed");
            return Ok(true);
        }
    }

    Ok(false)
}

/// Cache key for a member path.
fn member_key(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Pin an `AssetNotFound` raised by the fingerprinter to the bundle being
/// diffed.
fn attribute(err: BundlediffError, bundle: &str) -> BundlediffError {
    match err {
        BundlediffError::AssetNotFound { path, .. } => BundlediffError::AssetNotFound {
            bundle: bundle.to_string(),
            path,
        },
        other => other,
    }
}
