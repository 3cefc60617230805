//! Recomputing archive fingerprints of an existing lock.

use async_trait::async_trait;
use burrow_core::error::BurrowResult;
use tracing::{debug, info};

use crate::{Lock, LockError, LockResult, LockedPackage, PackageOrigin};

/// Computes the fingerprint of a locked package's archive
#[async_trait]
pub trait ArtifactFingerprinter: Send + Sync {
    async fn fingerprint(&self, package: &LockedPackage) -> BurrowResult<String>;
}

impl Lock {
    /// Copy of this lock with every source package's fingerprint recomputed.
    ///
    /// Versions, origins and dependency edges are left untouched; repository
    /// and core packages keep whatever they had.
    pub async fn repair_hashes<F>(&self, fingerprinter: &F) -> LockResult<Lock>
    where
        F: ArtifactFingerprinter + ?Sized,
    {
        let mut repaired = self.clone();
        let mut changed = 0usize;

        for package in &mut repaired.packages {
            if !matches!(package.origin, PackageOrigin::Source { .. }) {
                continue;
            }
            let value = fingerprinter
                .fingerprint(package)
                .await
                .map_err(|e| LockError::Fingerprint {
                    package: package.name.clone(),
                    source: Box::new(e),
                })?;
            if package.fingerprint.as_deref() != Some(value.as_str()) {
                debug!("Fingerprint of {} changed to {}", package.name, value);
                package.fingerprint = Some(value);
                changed += 1;
            }
        }

        info!("Repaired {} fingerprint(s)", changed);
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::error::BurrowError;
    use burrow_core::types::{RootRequest, VcsReference, Version};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NameFingerprinter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ArtifactFingerprinter for NameFingerprinter {
        async fn fingerprint(&self, package: &LockedPackage) -> BurrowResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("sha256:{}", package.name))
        }
    }

    struct Failing;

    #[async_trait]
    impl ArtifactFingerprinter for Failing {
        async fn fingerprint(&self, package: &LockedPackage) -> BurrowResult<String> {
            Err(BurrowError::PackageNotFound {
                name: package.name.clone(),
            })
        }
    }

    fn lock() -> Lock {
        let v = |s: &str| Version::parse(s).unwrap();
        Lock::new(
            &RootRequest::default(),
            vec![
                LockedPackage::from_source("a", v("1.0"), "cran", "src/contrib/a_1.0.tar.gz")
                    .with_fingerprint("sha256:stale")
                    .with_dependencies(["b"]),
                LockedPackage::from_source("b", v("2.0"), "cran", "src/contrib/b_2.0.tar.gz"),
                LockedPackage::from_vcs("g", "https://git.example.com/g.git", VcsReference::DefaultBranch, "abc")
                    .with_fingerprint("kept"),
                LockedPackage::core("stats", None),
            ],
            false,
        )
    }

    #[tokio::test]
    async fn test_repair_updates_source_packages_only() {
        let fingerprinter = NameFingerprinter {
            calls: AtomicUsize::new(0),
        };
        let original = lock();
        let repaired = original.repair_hashes(&fingerprinter).await.unwrap();

        assert_eq!(fingerprinter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(repaired.package("a").unwrap().fingerprint.as_deref(), Some("sha256:a"));
        assert_eq!(repaired.package("b").unwrap().fingerprint.as_deref(), Some("sha256:b"));
        assert_eq!(repaired.package("g").unwrap().fingerprint.as_deref(), Some("kept"));
        assert_eq!(repaired.package("stats").unwrap().fingerprint, None);

        // Everything but fingerprints is preserved
        for (before, after) in original.packages().iter().zip(repaired.packages()) {
            assert_eq!(before.version, after.version);
            assert_eq!(before.origin, after.origin);
            assert_eq!(before.dependencies, after.dependencies);
        }
        assert_eq!(original.roots, repaired.roots);
    }

    #[tokio::test]
    async fn test_repair_failure_names_package() {
        match lock().repair_hashes(&Failing).await {
            Err(LockError::Fingerprint { package, .. }) => assert_eq!(package, "a"),
            other => panic!("expected fingerprint error, got {other:?}"),
        }
    }
}
