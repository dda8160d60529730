// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{Manifest, RawManifest};
use crate::errors::{BundlediffError, Result};

impl TryFrom<RawManifest> for Manifest {
    type Error = crate::errors::BundlediffError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        validate_raw_manifest(&raw)?;
        Ok(Manifest::new_unchecked(raw.paths, raw.options, raw.bundle))
    }
}

fn validate_raw_manifest(raw: &RawManifest) -> Result<()> {
    ensure_has_bundles(raw)?;
    validate_options(raw)?;
    validate_bundles(raw)?;
    Ok(())
}

fn ensure_has_bundles(raw: &RawManifest) -> Result<()> {
    if raw.bundle.is_empty() {
        return Err(BundlediffError::ManifestError(
            "manifest must contain at least one [[bundle]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_options(raw: &RawManifest) -> Result<()> {
    if raw.options.workers == 0 {
        return Err(BundlediffError::ManifestError(
            "[options].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_bundles(raw: &RawManifest) -> Result<()> {
    let mut seen_names: HashSet<&str> = HashSet::new();

    for bundle in raw.bundle.iter() {
        if bundle.name.trim().is_empty() {
            return Err(BundlediffError::ManifestError(
                "bundle name must not be empty".to_string(),
            ));
        }

        if !seen_names.insert(bundle.name.as_str()) {
            return Err(BundlediffError::ManifestError(format!(
                "duplicate bundle name '{}'",
                bundle.name
            )));
        }

        if bundle.members.is_empty() {
            return Err(BundlediffError::ManifestError(format!(
                "bundle '{}' has no members",
                bundle.name
            )));
        }

        let mut seen_members = HashSet::new();
        for member in bundle.members.iter() {
            if !seen_members.insert(member) {
                return Err(BundlediffError::ManifestError(format!(
                    "bundle '{}' lists member {:?} more than once",
                    bundle.name, member
                )));
            }
        }
    }

    Ok(())
}
