use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use bundlediff::errors::Result;
use bundlediff::package::{PackageOutcome, PackageRequest, Packager};
use bundlediff::publish::{Artifact, PublishedArtifact, Publisher};

/// A fake packager that:
/// - records which bundles were requested, per call
/// - returns deterministic artifact bytes (`packed:<name>`) for each bundle
/// - fails any bundle listed in `fail_bundles` with a canned message.
pub struct FakePackager {
    pub requested: Arc<Mutex<Vec<Vec<String>>>>,
    pub fail_bundles: Vec<String>,
}

impl FakePackager {
    pub fn new() -> Self {
        Self {
            requested: Arc::new(Mutex::new(Vec::new())),
            fail_bundles: Vec::new(),
        }
    }

    pub fn failing(bundles: &[&str]) -> Self {
        Self {
            requested: Arc::new(Mutex::new(Vec::new())),
            fail_bundles: bundles.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Bundle names requested across all `package_all` calls, flattened.
    pub fn all_requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().iter().flatten().cloned().collect()
    }

    pub fn call_count(&self) -> usize {
        self.requested.lock().unwrap().len()
    }
}

impl Default for FakePackager {
    fn default() -> Self {
        Self::new()
    }
}

impl Packager for FakePackager {
    fn package_all(
        &mut self,
        requests: Vec<PackageRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PackageOutcome>>> + Send + '_>> {
        let requested = Arc::clone(&self.requested);
        let fail_bundles = self.fail_bundles.clone();

        Box::pin(async move {
            let names: Vec<String> = requests.iter().map(|r| r.bundle.clone()).collect();
            requested.lock().unwrap().push(names);

            let outcomes = requests
                .into_iter()
                .map(|r| {
                    let result = if fail_bundles.contains(&r.bundle) {
                        Err(format!("fake packaging failure for {}", r.bundle))
                    } else {
                        Ok(format!("packed:{}", r.bundle).into_bytes())
                    };
                    PackageOutcome {
                        bundle: r.bundle,
                        result,
                    }
                })
                .collect();

            Ok(outcomes)
        })
    }
}

/// A fake publisher that records published artifacts in memory.
pub struct FakePublisher {
    pub published: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl FakePublisher {
    pub fn new() -> Self {
        Self {
            published: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn published_bundles(&self) -> Vec<String> {
        let mut names: Vec<String> = self.published.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for FakePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher for FakePublisher {
    fn publish(&mut self, artifacts: Vec<Artifact>) -> Result<Vec<PublishedArtifact>> {
        let mut records = Vec::with_capacity(artifacts.len());
        let mut map = self.published.lock().unwrap();

        for artifact in artifacts {
            let size = artifact.bytes.len() as u64;
            let checksum = format!("fake-checksum-{}", artifact.bundle);
            records.push(PublishedArtifact {
                bundle: artifact.bundle.clone(),
                path: std::path::PathBuf::from(format!("fake/{}", artifact.bundle)),
                size,
                checksum,
            });
            map.insert(artifact.bundle, artifact.bytes);
        }

        Ok(records)
    }
}
