// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod diff;
pub mod engine;
pub mod errors;
pub mod fingerprint;
pub mod logging;
pub mod package;
pub mod publish;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::engine::{BuildEngine, BuildReport, CyclePaths, EngineOptions};
use crate::errors::{BundlediffError, Result};
use crate::fingerprint::Blake3Fingerprinter;
use crate::package::ArchivePackager;
use crate::publish::DiskPublisher;
use crate::types::Platform;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading
/// - platform path selection
/// - fingerprinter / packager / publisher
/// - the build engine
pub async fn run(args: CliArgs) -> Result<()> {
    let manifest_path = PathBuf::from(&args.manifest);
    let manifest = load_and_validate(&manifest_path)?;

    let platform: Platform = args.platform.into();
    let root = manifest_root_dir(&manifest_path);

    let paths = CyclePaths {
        cache_file: root.join(manifest.cache_file(platform)),
        output_dir: root.join(manifest.output_dir(platform)),
        pool_dir: root.join(manifest.pool_dir(platform)),
    };

    let options = EngineOptions {
        force_full: args.full,
        dry_run: args.dry_run,
        workers: manifest.options.workers,
    };

    info!(
        platform = platform.path_segment(),
        bundles = manifest.bundle_count(),
        full = args.full,
        "starting build cycle"
    );

    let bundles = manifest.resolved_bundles(&root);

    let fingerprinter = Arc::new(Blake3Fingerprinter);
    let mut packager = ArchivePackager::new(paths.pool_dir.clone(), options.workers);
    let mut publisher = DiskPublisher::new(
        paths.output_dir.clone(),
        manifest.options.suffix.clone(),
    );

    let engine = BuildEngine::new(paths, options);
    let report = engine
        .run(bundles, fingerprinter, &mut packager, &mut publisher)
        .await?;

    print_report(&report);

    if !report.is_success() {
        return Err(BundlediffError::CycleFailed {
            failed: report.failures.len(),
            total: report.rebuilt.len() + report.skipped.len() + report.failures.len(),
        });
    }

    Ok(())
}

/// Resolve the directory bundle member paths are relative to.
///
/// - If the manifest path has a non-empty parent (e.g. "project/Bundles.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Bundles.toml" (parent = ""),
///   we fall back to the current working directory "."
fn manifest_root_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Final user-visible report on stdout; logs stay on stderr.
fn print_report(report: &BuildReport) {
    if report.dry_run {
        println!("bundlediff dry-run (nothing packaged, cache untouched)");
    }

    println!(
        "rebuilt {} bundle(s), skipped {} unchanged, {} failure(s) in {:.2}s",
        report.rebuilt.len(),
        report.skipped.len(),
        report.failures.len(),
        report.elapsed.as_secs_f64()
    );

    for name in report.rebuilt.iter() {
        println!("  rebuilt: {name}");
    }
    for name in report.skipped.iter() {
        println!("  skipped: {name}");
    }
    for failure in report.failures.iter() {
        println!("  FAILED:  {} ({})", failure.bundle, failure.error);
    }
    for artifact in report.published.iter() {
        println!(
            "  published: {} -> {} ({} bytes, {})",
            artifact.bundle,
            artifact.path.display(),
            artifact.size,
            artifact.checksum
        );
    }
}
