// src/fingerprint/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::Result;
use crate::fingerprint::Fingerprinter;

/// Per-cycle memoization of asset fingerprints.
///
/// A shared asset listed by several bundles is hashed once per cycle, not
/// once per bundle. The memo lives for one build cycle only; durable state
/// across cycles is the bundle cache, not this map.
pub struct FingerprintCache<'a> {
    fingerprinter: &'a dyn Fingerprinter,
    memo: HashMap<PathBuf, String>,
}

impl<'a> FingerprintCache<'a> {
    pub fn new(fingerprinter: &'a dyn Fingerprinter) -> Self {
        Self {
            fingerprinter,
            memo: HashMap::new(),
        }
    }

    /// Get the fingerprint for an asset, computing and memoizing it if
    /// necessary.
    pub fn get_or_compute(&mut self, path: &Path) -> Result<String> {
        if let Some(fp) = self.memo.get(path) {
            return Ok(fp.clone());
        }

        debug!("memo miss: fingerprinting {:?}", path);
        let fp = self.fingerprinter.fingerprint(path)?;
        self.memo.insert(path.to_path_buf(), fp.clone());
        Ok(fp)
    }

    /// Seed a precomputed fingerprint (used by the parallel prewarm).
    pub fn seed(&mut self, path: PathBuf, fingerprint: String) {
        self.memo.insert(path, fingerprint);
    }

    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFingerprinter {
        calls: AtomicUsize,
    }

    impl Fingerprinter for CountingFingerprinter {
        fn fingerprint(&self, path: &Path) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("fp:{}", path.display()))
        }
    }

    #[test]
    fn repeated_lookups_compute_once() {
        let fp = CountingFingerprinter {
            calls: AtomicUsize::new(0),
        };
        let mut cache = FingerprintCache::new(&fp);

        let a = Path::new("assets/a.png");
        let first = cache.get_or_compute(a).unwrap();
        let second = cache.get_or_compute(a).unwrap();

        assert_eq!(first, second);
        assert_eq!(fp.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn seeded_values_are_not_recomputed() {
        let fp = CountingFingerprinter {
            calls: AtomicUsize::new(0),
        };
        let mut cache = FingerprintCache::new(&fp);

        cache.seed(PathBuf::from("assets/a.png"), "pre".to_string());
        let got = cache.get_or_compute(Path::new("assets/a.png")).unwrap();

        assert_eq!(got, "pre");
        assert_eq!(fp.calls.load(Ordering::SeqCst), 0);
    }
}
