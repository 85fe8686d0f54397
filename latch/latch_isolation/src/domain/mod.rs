//! Isolated loading domains.
//!
//! A domain is created from one package file. It can only see the exports
//! its own manifest declares, plus whatever its parent can see. Sibling
//! domains never see each other's exports, which is what keeps two
//! namespaces, or two providers, apart.

mod export;
mod manifest;

pub use export::{
    ConfigureFn, EndpointFactory, Export, ExportCatalog, ExportKind, ModuleChainFactory,
    ModuleFactory, PackageChainFactory,
};
pub use manifest::PackageManifest;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use latch_core::{DomainId, ResolutionError};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::boundary::BOUNDARY_ABI_VERSION;
use crate::contract::ControlEndpoint;

/// An isolated loading domain backed by one package file.
pub struct IsolatedDomain {
    /// Unique id of this domain
    id: DomainId,

    /// Human-readable name, usually the namespace or provider package name
    name: String,

    /// The package file the domain was defined from
    package: PathBuf,

    /// The package's manifest
    manifest: PackageManifest,

    /// Domain consulted when a symbol is not declared locally
    parent: Option<Arc<IsolatedDomain>>,

    /// Shared export table
    catalog: Arc<ExportCatalog>,

    /// Control endpoint singletons, keyed by symbol
    endpoints: Mutex<HashMap<String, Arc<dyn ControlEndpoint>>>,

    /// Set once the domain has been closed
    closed: AtomicBool,
}

impl IsolatedDomain {
    /// Define a new domain from a package file.
    ///
    /// # Arguments
    ///
    /// * `name` - The domain name.
    /// * `package` - The package file backing the domain.
    /// * `parent` - The domain to delegate unresolved symbols to.
    /// * `catalog` - The export table symbols are resolved against.
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<IsolatedDomain>)` - The new domain.
    /// * `Err` - If the package is unreadable or targets another ABI version.
    pub fn define(
        name: impl Into<String>,
        package: &Path,
        parent: Option<Arc<IsolatedDomain>>,
        catalog: Arc<ExportCatalog>,
    ) -> Result<Arc<Self>, ResolutionError> {
        let manifest = PackageManifest::load(package)?;
        if manifest.abi != BOUNDARY_ABI_VERSION {
            return Err(ResolutionError::AbiMismatch {
                path: package.to_path_buf(),
                expected: BOUNDARY_ABI_VERSION,
                found: manifest.abi,
            });
        }

        let domain = Arc::new(Self {
            id: DomainId::new(),
            name: name.into(),
            package: package.to_path_buf(),
            manifest,
            parent,
            catalog,
            endpoints: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        });

        info!(
            "Defined domain '{}' ({}) from {}",
            domain.name,
            domain.id,
            domain.package.display()
        );
        Ok(domain)
    }

    /// The domain id.
    pub fn id(&self) -> DomainId {
        self.id
    }

    /// The domain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backing package file.
    pub fn package(&self) -> &Path {
        &self.package
    }

    /// The package manifest.
    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    /// The parent domain, if any.
    pub fn parent(&self) -> Option<&Arc<IsolatedDomain>> {
        self.parent.as_ref()
    }

    /// Whether the domain has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resolve a symbol visible from this domain.
    ///
    /// The domain's own manifest is consulted first, then its parent chain.
    pub fn resolve(&self, symbol: &str) -> Result<Export, ResolutionError> {
        if self.is_closed() {
            return Err(self.closed_error());
        }

        self.lookup(symbol)
            .ok_or_else(|| ResolutionError::SymbolNotFound {
                symbol: symbol.to_string(),
                domain: self.name.clone(),
                domain_id: self.id,
            })
    }

    fn lookup(&self, symbol: &str) -> Option<Export> {
        if self.manifest.exports_symbol(symbol) {
            if let Some(export) = self.catalog.get(symbol) {
                return Some(export);
            }
        }

        self.parent
            .as_ref()
            .filter(|parent| !parent.is_closed())
            .and_then(|parent| parent.lookup(symbol))
    }

    /// Resolve a configuration entry point.
    pub fn resolve_configure(&self, symbol: &str) -> Result<ConfigureFn, ResolutionError> {
        match self.resolve(symbol)? {
            Export::Configure(f) => Ok(f),
            other => Err(self.kind_mismatch(symbol, ExportKind::Configure, other.kind())),
        }
    }

    /// Resolve a package loading-chain extension factory.
    pub fn resolve_package_chain(
        &self,
        symbol: &str,
    ) -> Result<PackageChainFactory, ResolutionError> {
        match self.resolve(symbol)? {
            Export::PackageLoadingChain(f) => Ok(f),
            other => Err(self.kind_mismatch(
                symbol,
                ExportKind::PackageLoadingChain,
                other.kind(),
            )),
        }
    }

    /// Resolve a module loading-chain extension factory.
    pub fn resolve_module_chain(
        &self,
        symbol: &str,
    ) -> Result<ModuleChainFactory, ResolutionError> {
        match self.resolve(symbol)? {
            Export::ModuleLoadingChain(f) => Ok(f),
            other => Err(self.kind_mismatch(
                symbol,
                ExportKind::ModuleLoadingChain,
                other.kind(),
            )),
        }
    }

    /// Resolve a module factory, returning the module id with it.
    pub fn resolve_module(&self, symbol: &str) -> Result<(String, ModuleFactory), ResolutionError> {
        match self.resolve(symbol)? {
            Export::Module { id, factory } => Ok((id, factory)),
            other => Err(self.kind_mismatch(symbol, ExportKind::Module, other.kind())),
        }
    }

    /// The control endpoint singleton for a symbol.
    ///
    /// The first call creates the endpoint; later calls return the same
    /// instance until the domain is closed.
    pub fn control_endpoint(
        self: &Arc<Self>,
        symbol: &str,
    ) -> Result<Arc<dyn ControlEndpoint>, ResolutionError> {
        if self.is_closed() {
            return Err(self.closed_error());
        }

        let mut endpoints = self.endpoints.lock();
        if let Some(endpoint) = endpoints.get(symbol) {
            return Ok(Arc::clone(endpoint));
        }

        let factory = match self.resolve(symbol)? {
            Export::ControlEndpoint(f) => f,
            other => {
                return Err(self.kind_mismatch(
                    symbol,
                    ExportKind::ControlEndpoint,
                    other.kind(),
                ))
            }
        };

        debug!("Creating control endpoint '{}' in domain '{}'", symbol, self.name);
        let endpoint = factory(Arc::downgrade(self));
        endpoints.insert(symbol.to_string(), Arc::clone(&endpoint));
        Ok(endpoint)
    }

    /// The control endpoint singleton for a symbol, if one was created.
    pub fn cached_control_endpoint(&self, symbol: &str) -> Option<Arc<dyn ControlEndpoint>> {
        self.endpoints.lock().get(symbol).cloned()
    }

    /// Close the domain.
    ///
    /// Further resolution fails and held singletons are released. Returns
    /// `false` if the domain was already closed.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        let released = std::mem::take(&mut *self.endpoints.lock());
        info!(
            "Closed domain '{}' ({}), released {} singleton(s)",
            self.name,
            self.id,
            released.len()
        );
        true
    }

    fn closed_error(&self) -> ResolutionError {
        ResolutionError::Closed {
            domain: self.name.clone(),
            domain_id: self.id,
        }
    }

    fn kind_mismatch(
        &self,
        symbol: &str,
        expected: ExportKind,
        actual: ExportKind,
    ) -> ResolutionError {
        ResolutionError::KindMismatch {
            symbol: symbol.to_string(),
            domain: self.name.clone(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl fmt::Debug for IsolatedDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsolatedDomain")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("package", &self.package)
            .field("closed", &self.is_closed())
            .finish()
    }
}
