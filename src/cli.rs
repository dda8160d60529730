// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `bundlediff`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bundlediff",
    version,
    about = "Incrementally rebuild asset bundles whose members changed.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the bundle manifest (TOML).
    ///
    /// Default: `Bundles.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Bundles.toml")]
    pub manifest: String,

    /// Ignore the persisted cache and rebuild every bundle.
    ///
    /// The on-disk cache file is not deleted; it is only replaced once the
    /// full rebuild succeeds.
    #[arg(long)]
    pub full: bool,

    /// Target platform; selects the per-platform cache file and output root.
    #[arg(long, value_enum, value_name = "PLATFORM", default_value = "windows")]
    pub platform: PlatformArg,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUNDLEDIFF_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Compute and print the rebuild decision, but package nothing and leave
    /// the cache untouched.
    #[arg(long)]
    pub dry_run: bool,
}

/// Target platform as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    Windows,
    Android,
    Ios,
}

impl From<PlatformArg> for crate::types::Platform {
    fn from(p: PlatformArg) -> Self {
        match p {
            PlatformArg::Windows => crate::types::Platform::Windows,
            PlatformArg::Android => crate::types::Platform::Android,
            PlatformArg::Ios => crate::types::Platform::Ios,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
