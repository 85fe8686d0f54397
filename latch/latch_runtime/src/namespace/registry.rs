//! Namespace Registry
//!
//! Maps namespace names to their isolated domains and runs the install
//! protocol. One lock is held across every install and uninstall, so two
//! callers can never race on the same namespace.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use latch_core::config::layout;
use latch_core::{BindError, Error, FeatureMap, InstallPhase, LaunchMode, ModuleRecord, Result};
use latch_isolation::{
    ControlEndpoint, CoreBoundary, HostRuntime, IsolatedDomain, SYMBOL_CONTROL_ENDPOINT,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// The registry of installed namespaces
pub struct NamespaceRegistry {
    /// Host the domains are defined in
    host: Arc<dyn HostRuntime>,

    /// Namespace name to domain
    domains: Mutex<HashMap<String, Arc<IsolatedDomain>>>,
}

impl NamespaceRegistry {
    /// Create an empty registry
    pub fn new(host: Arc<dyn HostRuntime>) -> Self {
        Self {
            host,
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// Install a namespace, or confirm it is installed.
    ///
    /// Returns the address of the namespace's control endpoint. Installing
    /// an installed namespace returns the address it already has. If the
    /// call created the namespace and then failed, the namespace is removed
    /// again.
    pub fn install(&self, features: &FeatureMap, mode: LaunchMode) -> Result<SocketAddr> {
        let namespace = features.namespace().to_string();
        let fail = |phase: InstallPhase| {
            let namespace = namespace.clone();
            move |e: Error| e.in_phase(namespace, phase)
        };

        let mut domains = self.domains.lock();
        info!("Installing namespace '{}' ({})", namespace, mode);

        let home = features
            .home()
            .map_err(Error::from)
            .map_err(fail(InstallPhase::Configure))?;

        self.host
            .append_bootstrap_package(&layout::spy_package_path(&home))
            .map_err(fail(InstallPhase::Bootstrap))?;

        let (domain, created) = match domains.get(&namespace) {
            Some(domain) => {
                debug!("Reusing domain {} for '{}'", domain.id(), namespace);
                (Arc::clone(domain), false)
            }
            None => {
                let domain = self
                    .host
                    .define_domain(&namespace, &layout::core_package_path(&home), None)
                    .map_err(fail(InstallPhase::DefineDomain))?;
                domains.insert(namespace.clone(), Arc::clone(&domain));
                (domain, true)
            }
        };

        match self.boot(&namespace, &domain, features, mode) {
            Ok(address) => {
                info!("Namespace '{}' installed at {}", namespace, address);
                Ok(address)
            }
            Err(e) => {
                if created {
                    warn!("Rolling back namespace '{}': {}", namespace, e);
                    domains.remove(&namespace);
                    domain.close();
                }
                Err(e)
            }
        }
    }

    fn boot(
        &self,
        namespace: &str,
        domain: &Arc<IsolatedDomain>,
        features: &FeatureMap,
        mode: LaunchMode,
    ) -> Result<SocketAddr> {
        let wrap = |phase: InstallPhase| move |e: Error| e.in_phase(namespace, phase);

        let boundary = CoreBoundary::resolve(domain)
            .map_err(Error::from)
            .map_err(wrap(InstallPhase::ResolveBoundary))?;

        let core_features = features
            .to_core_feature_string(mode)
            .map_err(Error::from)
            .map_err(wrap(InstallPhase::Configure))?;
        let properties_path = features
            .properties_path()
            .map_err(Error::from)
            .map_err(wrap(InstallPhase::Configure))?;
        let config = boundary
            .configure(&core_features, &properties_path)
            .map_err(Error::from)
            .map_err(wrap(InstallPhase::Configure))?;

        let endpoint = boundary
            .control_endpoint()
            .map_err(Error::from)
            .map_err(wrap(InstallPhase::ResolveBoundary))?;

        if !endpoint.is_bound() {
            if let Err(e) = endpoint.bind(config, Arc::clone(&self.host)) {
                endpoint.destroy();
                return Err(e.in_phase(namespace, InstallPhase::Bind));
            }
        }

        endpoint
            .local_address()
            .ok_or_else(|| Error::from(BindError::NotBound))
            .map_err(wrap(InstallPhase::Bind))
    }

    /// Uninstall a namespace.
    ///
    /// Destroys the control endpoint and closes the domain. Returns `false`
    /// if the namespace was not installed.
    pub fn uninstall(&self, namespace: &str) -> bool {
        let mut domains = self.domains.lock();
        let Some(domain) = domains.remove(namespace) else {
            debug!("Namespace '{}' is not installed", namespace);
            return false;
        };

        if let Some(endpoint) = domain.cached_control_endpoint(SYMBOL_CONTROL_ENDPOINT) {
            endpoint.destroy();
        }
        domain.close();
        info!("Namespace '{}' uninstalled", namespace);
        true
    }

    /// Whether a namespace is installed
    pub fn is_installed(&self, namespace: &str) -> bool {
        self.domains.lock().contains_key(namespace)
    }

    /// Names of the installed namespaces, sorted
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.domains.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// The domain of an installed namespace
    pub fn domain(&self, namespace: &str) -> Option<Arc<IsolatedDomain>> {
        self.domains.lock().get(namespace).cloned()
    }

    /// The control endpoint address of an installed namespace
    pub fn local_address(&self, namespace: &str) -> Option<SocketAddr> {
        self.endpoint_of(namespace)
            .and_then(|endpoint| endpoint.local_address())
    }

    /// Records of the modules loaded in an installed namespace
    pub fn module_records(&self, namespace: &str) -> Option<Vec<ModuleRecord>> {
        self.endpoint_of(namespace)
            .map(|endpoint| endpoint.module_records())
    }

    fn endpoint_of(&self, namespace: &str) -> Option<Arc<dyn ControlEndpoint>> {
        self.domain(namespace)
            .and_then(|domain| domain.cached_control_endpoint(SYMBOL_CONTROL_ENDPOINT))
    }
}

impl fmt::Debug for NamespaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceRegistry")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
