//! The export catalog.
//!
//! Packages in this runtime are linked into the host binary. A package file
//! on disk names the symbols it exports; the catalog maps each symbol to
//! the factory that implements it. A domain only sees a catalog entry when
//! its package manifest declares the symbol, so the catalog is shared while
//! visibility stays per-domain.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use latch_core::{ConfigError, TypedConfiguration};
use tracing::debug;

use super::IsolatedDomain;
use crate::contract::{ControlEndpoint, Module, ModuleLoadingChain, PackageLoadingChain};

/// Materializes a configuration from a core feature string and the
/// properties file path.
pub type ConfigureFn =
    Arc<dyn Fn(&str, &Path) -> Result<TypedConfiguration, ConfigError> + Send + Sync>;

/// Creates the control endpoint for a namespace domain.
pub type EndpointFactory =
    Arc<dyn Fn(Weak<IsolatedDomain>) -> Arc<dyn ControlEndpoint> + Send + Sync>;

/// Creates a package loading-chain extension.
pub type PackageChainFactory = Arc<dyn Fn() -> Box<dyn PackageLoadingChain> + Send + Sync>;

/// Creates a module loading-chain extension.
pub type ModuleChainFactory = Arc<dyn Fn() -> Box<dyn ModuleLoadingChain> + Send + Sync>;

/// Creates a module instance.
pub type ModuleFactory = Arc<dyn Fn() -> Arc<dyn Module> + Send + Sync>;

/// The kind of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    /// Configuration entry point
    Configure,
    /// Control endpoint factory
    ControlEndpoint,
    /// Package loading-chain extension
    PackageLoadingChain,
    /// Module loading-chain extension
    ModuleLoadingChain,
    /// Module
    Module,
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configure => "configure entry point",
            Self::ControlEndpoint => "control endpoint",
            Self::PackageLoadingChain => "package loading chain",
            Self::ModuleLoadingChain => "module loading chain",
            Self::Module => "module",
        };
        f.write_str(name)
    }
}

/// A registered export.
#[derive(Clone)]
pub enum Export {
    /// Configuration entry point
    Configure(ConfigureFn),
    /// Control endpoint factory
    ControlEndpoint(EndpointFactory),
    /// Package loading-chain extension
    PackageLoadingChain(PackageChainFactory),
    /// Module loading-chain extension
    ModuleLoadingChain(ModuleChainFactory),
    /// Module with its id
    Module {
        /// Module id, unique within a namespace
        id: String,
        /// Module factory
        factory: ModuleFactory,
    },
}

impl Export {
    /// The kind of this export.
    pub fn kind(&self) -> ExportKind {
        match self {
            Self::Configure(_) => ExportKind::Configure,
            Self::ControlEndpoint(_) => ExportKind::ControlEndpoint,
            Self::PackageLoadingChain(_) => ExportKind::PackageLoadingChain,
            Self::ModuleLoadingChain(_) => ExportKind::ModuleLoadingChain,
            Self::Module { .. } => ExportKind::Module,
        }
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module { id, .. } => f.debug_struct("Module").field("id", id).finish(),
            other => write!(f, "Export({})", other.kind()),
        }
    }
}

/// The process-wide table of linked exports.
#[derive(Default)]
pub struct ExportCatalog {
    exports: DashMap<String, Export>,
}

impl ExportCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an export under a symbol, replacing any previous entry.
    pub fn register(&self, symbol: impl Into<String>, export: Export) {
        let symbol = symbol.into();
        debug!("Registering {} export '{}'", export.kind(), symbol);
        self.exports.insert(symbol, export);
    }

    /// Register a configuration entry point.
    pub fn register_configure<F>(&self, symbol: impl Into<String>, f: F)
    where
        F: Fn(&str, &Path) -> Result<TypedConfiguration, ConfigError> + Send + Sync + 'static,
    {
        self.register(symbol, Export::Configure(Arc::new(f)));
    }

    /// Register a control endpoint factory.
    pub fn register_control_endpoint<F>(&self, symbol: impl Into<String>, f: F)
    where
        F: Fn(Weak<IsolatedDomain>) -> Arc<dyn ControlEndpoint> + Send + Sync + 'static,
    {
        self.register(symbol, Export::ControlEndpoint(Arc::new(f)));
    }

    /// Register a package loading-chain extension.
    pub fn register_package_chain<F>(&self, symbol: impl Into<String>, f: F)
    where
        F: Fn() -> Box<dyn PackageLoadingChain> + Send + Sync + 'static,
    {
        self.register(symbol, Export::PackageLoadingChain(Arc::new(f)));
    }

    /// Register a module loading-chain extension.
    pub fn register_module_chain<F>(&self, symbol: impl Into<String>, f: F)
    where
        F: Fn() -> Box<dyn ModuleLoadingChain> + Send + Sync + 'static,
    {
        self.register(symbol, Export::ModuleLoadingChain(Arc::new(f)));
    }

    /// Register a module. The symbol doubles as the module id.
    pub fn register_module<F>(&self, symbol: impl Into<String>, f: F)
    where
        F: Fn() -> Arc<dyn Module> + Send + Sync + 'static,
    {
        let symbol = symbol.into();
        let export = Export::Module {
            id: symbol.clone(),
            factory: Arc::new(f),
        };
        self.register(symbol, export);
    }

    /// Look up an export by symbol.
    pub fn get(&self, symbol: &str) -> Option<Export> {
        self.exports.get(symbol).map(|entry| entry.value().clone())
    }

    /// Whether a symbol is registered.
    pub fn contains(&self, symbol: &str) -> bool {
        self.exports.contains_key(symbol)
    }

    /// Number of registered exports.
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

impl fmt::Debug for ExportCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportCatalog")
            .field("exports", &self.exports.len())
            .finish()
    }
}
