//! The versioned boundary between the registry and a namespace domain.
//!
//! The registry never links against the core package directly. It asks the
//! namespace domain for two well-known symbols and talks to them through
//! the contracts in [`crate::contract`]. Bumping the ABI version invalidates
//! every package built against the old one.

use std::path::Path;
use std::sync::Arc;

use latch_core::{ConfigError, ResolutionError, TypedConfiguration};

use crate::contract::ControlEndpoint;
use crate::domain::{ConfigureFn, IsolatedDomain, PackageManifest};

/// Boundary ABI version understood by this build.
pub const BOUNDARY_ABI_VERSION: u32 = 1;

/// Symbol of the configuration entry point.
pub const SYMBOL_CONFIGURE: &str = "latch.core.configure";

/// Symbol of the control endpoint factory.
pub const SYMBOL_CONTROL_ENDPOINT: &str = "latch.core.control-endpoint";

/// Name of the core package.
pub const CORE_PACKAGE_NAME: &str = "latch-core";

/// Name of the spy package.
pub const SPY_PACKAGE_NAME: &str = "latch-spy";

/// The core boundary as resolved inside one namespace domain.
pub struct CoreBoundary {
    domain: Arc<IsolatedDomain>,
    configure: ConfigureFn,
}

impl CoreBoundary {
    /// Resolve the boundary exports in a domain.
    ///
    /// Fails if the domain cannot see the configuration entry point.
    pub fn resolve(domain: &Arc<IsolatedDomain>) -> Result<Self, ResolutionError> {
        let configure = domain.resolve_configure(SYMBOL_CONFIGURE)?;
        Ok(Self {
            domain: Arc::clone(domain),
            configure,
        })
    }

    /// Materialize the namespace configuration on the domain side.
    pub fn configure(
        &self,
        core_features: &str,
        properties_path: &Path,
    ) -> Result<Arc<TypedConfiguration>, ConfigError> {
        (self.configure)(core_features, properties_path).map(Arc::new)
    }

    /// The namespace's control endpoint singleton.
    pub fn control_endpoint(&self) -> Result<Arc<dyn ControlEndpoint>, ResolutionError> {
        self.domain.control_endpoint(SYMBOL_CONTROL_ENDPOINT)
    }

    /// The domain the boundary was resolved in.
    pub fn domain(&self) -> &Arc<IsolatedDomain> {
        &self.domain
    }
}

/// The manifest of the core package.
pub fn core_manifest() -> PackageManifest {
    PackageManifest::new(
        CORE_PACKAGE_NAME,
        BOUNDARY_ABI_VERSION,
        vec![
            SYMBOL_CONFIGURE.to_string(),
            SYMBOL_CONTROL_ENDPOINT.to_string(),
        ],
    )
}

/// The manifest of the spy package. It exports nothing; it only has to be
/// on the bootstrap path.
pub fn spy_manifest() -> PackageManifest {
    PackageManifest::new(SPY_PACKAGE_NAME, BOUNDARY_ABI_VERSION, Vec::new())
}
