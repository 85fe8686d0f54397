//! The host runtime seen from inside a namespace.
//!
//! The registry and the control endpoint only touch the host process
//! through [`HostRuntime`], which keeps them testable and lets the spy
//! bootstrap path be inspected.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use latch_core::{ResolutionError, Result};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::boundary::BOUNDARY_ABI_VERSION;
use crate::domain::{ExportCatalog, IsolatedDomain, PackageManifest};

/// Services the host process offers to the lifecycle manager.
pub trait HostRuntime: Send + Sync {
    /// Make a package visible to every domain in the process.
    ///
    /// Appending the same package twice is a no-op.
    fn append_bootstrap_package(&self, package: &Path) -> Result<()>;

    /// Define a new isolated domain from a package file.
    fn define_domain(
        &self,
        name: &str,
        package: &Path,
        parent: Option<Arc<IsolatedDomain>>,
    ) -> Result<Arc<IsolatedDomain>>;
}

/// A host whose packages are linked into the running binary.
pub struct LinkedHost {
    catalog: Arc<ExportCatalog>,
    bootstrap: Mutex<Vec<PathBuf>>,
}

impl LinkedHost {
    /// Create a host resolving symbols against a catalog.
    pub fn new(catalog: Arc<ExportCatalog>) -> Self {
        Self {
            catalog,
            bootstrap: Mutex::new(Vec::new()),
        }
    }

    /// The shared export catalog.
    pub fn catalog(&self) -> &Arc<ExportCatalog> {
        &self.catalog
    }

    /// Packages appended to the bootstrap path, in append order.
    pub fn bootstrap_packages(&self) -> Vec<PathBuf> {
        self.bootstrap.lock().clone()
    }
}

impl HostRuntime for LinkedHost {
    fn append_bootstrap_package(&self, package: &Path) -> Result<()> {
        let mut bootstrap = self.bootstrap.lock();
        if bootstrap.iter().any(|p| p == package) {
            debug!("Bootstrap package already present: {}", package.display());
            return Ok(());
        }

        let manifest = PackageManifest::load(package)?;
        if manifest.abi != BOUNDARY_ABI_VERSION {
            return Err(ResolutionError::AbiMismatch {
                path: package.to_path_buf(),
                expected: BOUNDARY_ABI_VERSION,
                found: manifest.abi,
            }
            .into());
        }

        info!("Appended bootstrap package {}", package.display());
        bootstrap.push(package.to_path_buf());
        Ok(())
    }

    fn define_domain(
        &self,
        name: &str,
        package: &Path,
        parent: Option<Arc<IsolatedDomain>>,
    ) -> Result<Arc<IsolatedDomain>> {
        Ok(IsolatedDomain::define(
            name,
            package,
            parent,
            Arc::clone(&self.catalog),
        )?)
    }
}

impl fmt::Debug for LinkedHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedHost")
            .field("catalog", &self.catalog)
            .field("bootstrap", &*self.bootstrap.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::spy_manifest;
    use latch_core::Error;
    use tempfile::TempDir;

    #[test]
    fn test_bootstrap_append_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let spy = dir.path().join("latch-spy.pkg");
        spy_manifest().write(&spy).unwrap();

        let host = LinkedHost::new(Arc::new(ExportCatalog::new()));
        host.append_bootstrap_package(&spy).unwrap();
        host.append_bootstrap_package(&spy).unwrap();
        assert_eq!(host.bootstrap_packages(), vec![spy]);
    }

    #[test]
    fn test_missing_bootstrap_package() {
        let dir = TempDir::new().unwrap();
        let host = LinkedHost::new(Arc::new(ExportCatalog::new()));
        let err = host
            .append_bootstrap_package(&dir.path().join("absent.pkg"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Resolution(ResolutionError::InvalidPackage { .. })
        ));
        assert!(host.bootstrap_packages().is_empty());
    }
}
