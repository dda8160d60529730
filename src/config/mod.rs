// src/config/mod.rs

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_manifest_path, load_and_validate, load_from_path};
pub use model::{BundleSection, Manifest, OptionsSection, PathsSection, RawManifest};
