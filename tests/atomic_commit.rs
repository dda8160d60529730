// tests/atomic_commit.rs

//! Failure paths: a failed cycle must leave the persisted cache exactly as
//! it was before the cycle, byte for byte.

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::sync::Arc;

use tempfile::tempdir;

use bundlediff::cache::{CacheStore, LoadedCache};
use bundlediff::engine::{BuildEngine, CyclePaths, EngineOptions};
use bundlediff::errors::BundlediffError;
use bundlediff::fingerprint::Blake3Fingerprinter;
use bundlediff::types::Bundle;
use bundlediff_test_utils::builders::bundle_under;
use bundlediff_test_utils::fakes::{FakePackager, FakePublisher};

type TestResult = Result<(), Box<dyn Error>>;

fn paths(root: &std::path::Path) -> CyclePaths {
    CyclePaths {
        cache_file: root.join("cache/cache.json"),
        output_dir: root.join("out"),
        pool_dir: root.join("pool"),
    }
}

async fn run_cycle(
    root: &std::path::Path,
    bundles: Vec<Bundle>,
    packager: &mut FakePackager,
) -> bundlediff::engine::BuildReport {
    let engine = BuildEngine::new(paths(root), EngineOptions::default());
    let mut publisher = FakePublisher::new();
    engine
        .run(bundles, Arc::new(Blake3Fingerprinter), packager, &mut publisher)
        .await
        .expect("engine run should not error")
}

#[tokio::test]
async fn packaging_failure_leaves_cache_byte_identical() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();

    fs::create_dir_all(root.join("assets"))?;
    fs::write(root.join("assets/a1.png"), "a1-v1")?;
    fs::write(root.join("assets/b1.png"), "b1-v1")?;

    let bundles = || {
        vec![
            bundle_under(root, "A", &["assets/a1.png"]),
            bundle_under(root, "B", &["assets/b1.png"]),
        ]
    };

    // Successful first cycle establishes the prior cache.
    let mut packager = FakePackager::new();
    assert!(run_cycle(root, bundles(), &mut packager).await.is_success());
    let before = fs::read(root.join("cache/cache.json"))?;

    // Change both assets, then fail B's packaging.
    fs::write(root.join("assets/a1.png"), "a1-v2")?;
    fs::write(root.join("assets/b1.png"), "b1-v2")?;

    let mut packager = FakePackager::failing(&["B"]);
    let mut publisher = FakePublisher::new();
    let engine = BuildEngine::new(paths(root), EngineOptions::default());
    let report = engine
        .run(
            bundles(),
            Arc::new(Blake3Fingerprinter),
            &mut packager,
            &mut publisher,
        )
        .await?;

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].bundle, "B");
    // Nothing published on a failed cycle, A's fresh entry included: the
    // orchestrator never persists a mix of old and new entries.
    assert!(publisher.published_bundles().is_empty());

    let after = fs::read(root.join("cache/cache.json"))?;
    assert_eq!(before, after);

    // The next cycle therefore redoes both bundles (redundant for A, but
    // never a silently stale artifact).
    let mut packager = FakePackager::new();
    let report = run_cycle(root, bundles(), &mut packager).await;
    assert_eq!(report.rebuilt, vec!["A".to_string(), "B".to_string()]);

    Ok(())
}

#[tokio::test]
async fn failed_bundle_is_listed_only_under_failures() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();

    fs::create_dir_all(root.join("assets"))?;
    fs::write(root.join("assets/a1.png"), "a1-v1")?;
    fs::write(root.join("assets/b1.png"), "b1-v1")?;

    let bundles = vec![
        bundle_under(root, "A", &["assets/a1.png"]),
        bundle_under(root, "B", &["assets/b1.png"]),
    ];

    let mut packager = FakePackager::failing(&["B"]);
    let mut publisher = FakePublisher::new();
    let engine = BuildEngine::new(paths(root), EngineOptions::default());
    let report = engine
        .run(
            bundles,
            Arc::new(Blake3Fingerprinter),
            &mut packager,
            &mut publisher,
        )
        .await?;

    // Both bundles were selected, only A actually packaged: B belongs in
    // `failures`, not `rebuilt`.
    assert!(!report.is_success());
    assert_eq!(report.rebuilt, vec!["A".to_string()]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].bundle, "B");

    Ok(())
}

#[tokio::test]
async fn missing_asset_fails_its_bundle_without_aborting_others() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();

    fs::create_dir_all(root.join("assets"))?;
    fs::write(root.join("assets/b1.png"), "b1-v1")?;

    let bundles = vec![
        bundle_under(root, "A", &["assets/gone.png"]),
        bundle_under(root, "B", &["assets/b1.png"]),
    ];

    let mut packager = FakePackager::new();
    let report = run_cycle(root, bundles, &mut packager).await;

    assert!(!report.is_success());
    assert_eq!(report.failures[0].bundle, "A");
    // B was still diffed and packaged.
    assert_eq!(report.rebuilt, vec!["B".to_string()]);
    assert_eq!(packager.all_requested(), vec!["B".to_string()]);
    // But the failed cycle committed nothing.
    assert!(!root.join("cache/cache.json").exists());

    Ok(())
}

#[tokio::test]
async fn corrupt_cache_is_a_loud_error() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();

    fs::create_dir_all(root.join("cache"))?;
    fs::write(root.join("cache/cache.json"), "{ definitely not json")?;
    fs::create_dir_all(root.join("assets"))?;
    fs::write(root.join("assets/a1.png"), "a1-v1")?;

    let engine = BuildEngine::new(paths(root), EngineOptions::default());
    let mut packager = FakePackager::new();
    let mut publisher = FakePublisher::new();

    let err = engine
        .run(
            vec![bundle_under(root, "A", &["assets/a1.png"])],
            Arc::new(Blake3Fingerprinter),
            &mut packager,
            &mut publisher,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BundlediffError::CacheCorrupt { .. }));
    // The corrupt file is left in place for inspection.
    assert!(root.join("cache/cache.json").exists());

    Ok(())
}

#[tokio::test]
async fn force_full_bypasses_corrupt_cache_and_replaces_it_on_success() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();

    fs::create_dir_all(root.join("cache"))?;
    fs::write(root.join("cache/cache.json"), "{ definitely not json")?;
    fs::create_dir_all(root.join("assets"))?;
    fs::write(root.join("assets/a1.png"), "a1-v1")?;

    let options = EngineOptions {
        force_full: true,
        ..EngineOptions::default()
    };
    let engine = BuildEngine::new(paths(root), options);
    let mut packager = FakePackager::new();
    let mut publisher = FakePublisher::new();

    let report = engine
        .run(
            vec![bundle_under(root, "A", &["assets/a1.png"])],
            Arc::new(Blake3Fingerprinter),
            &mut packager,
            &mut publisher,
        )
        .await?;

    assert!(report.is_success());

    // A valid cache replaced the corrupt one.
    let store = CacheStore::new(root.join("cache/cache.json"));
    let loaded = store.load()?;
    assert!(matches!(loaded, LoadedCache::Present(ref c) if c.len() == 1));

    Ok(())
}
