//! Module Manager for Latch Runtime
//!
//! Owns the modules loaded in one namespace and drives them through the
//! provider chains.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use latch_core::{Error, ModuleError, ModuleRecord, ModuleState, Result, TypedConfiguration};
use latch_isolation::{Export, HostRuntime, IsolatedDomain, Module};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::provider::{list_packages, ProviderChains};

/// A module with its tracked record
struct LoadedModule {
    record: ModuleRecord,
    instance: Arc<dyn Module>,
}

#[derive(Default)]
struct ModuleTable {
    /// Loaded modules in load order
    modules: Vec<LoadedModule>,

    /// Domains of module packages with at least one loaded module
    domains: Vec<Arc<IsolatedDomain>>,
}

impl ModuleTable {
    fn contains(&self, id: &str) -> bool {
        self.modules.iter().any(|m| m.record.id() == id)
    }
}

/// The module manager of one namespace
pub struct ModuleManager {
    /// Namespace configuration
    config: Arc<TypedConfiguration>,

    /// Discovered provider chains
    providers: ProviderChains,

    /// Host used to define module package domains
    host: Arc<dyn HostRuntime>,

    /// The namespace domain; parent of every module domain
    namespace_domain: Arc<IsolatedDomain>,

    /// Loaded modules
    table: Mutex<ModuleTable>,

    /// Completed unload passes
    unload_passes: AtomicUsize,
}

impl ModuleManager {
    /// Create a new module manager
    pub fn new(
        config: Arc<TypedConfiguration>,
        providers: ProviderChains,
        host: Arc<dyn HostRuntime>,
        namespace_domain: Arc<IsolatedDomain>,
    ) -> Self {
        Self {
            config,
            providers,
            host,
            namespace_domain,
            table: Mutex::new(ModuleTable::default()),
            unload_passes: AtomicUsize::new(0),
        }
    }

    /// The provider chains this manager consults
    pub fn providers(&self) -> &ProviderChains {
        &self.providers
    }

    /// Run a package file through the package loading chain.
    ///
    /// The first extension to reject the package stops the chain.
    pub fn load_package(&self, package: &Path) -> Result<()> {
        for entry in self.providers.package_chains() {
            let extension = entry.extension();
            if let Err(e) = extension.loading(package) {
                warn!(
                    "Package {} rejected by '{}': {}",
                    package.display(),
                    extension.name(),
                    e
                );
                return Err(ModuleError::Rejected {
                    extension: extension.name().to_string(),
                    target: package.display().to_string(),
                    reason: e.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Load one module.
    ///
    /// # Arguments
    ///
    /// * `id` - Module id, unique within the namespace.
    /// * `kind` - Declared kind of the module.
    /// * `module` - The module instance.
    /// * `package` - The package the module came from.
    /// * `domain` - The domain the package was loaded into.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the module was accepted and activated.
    /// * `Err` - If the id is taken, a chain extension rejected the module,
    ///   or activation failed. No record is kept in that case.
    pub fn load_module(
        &self,
        id: &str,
        kind: &str,
        module: Arc<dyn Module>,
        package: &Path,
        domain: &Arc<IsolatedDomain>,
    ) -> Result<()> {
        let mut table = self.table.lock();
        self.load_module_locked(&mut table, id, kind, module, package, domain)
    }

    fn load_module_locked(
        &self,
        table: &mut ModuleTable,
        id: &str,
        kind: &str,
        module: Arc<dyn Module>,
        package: &Path,
        domain: &Arc<IsolatedDomain>,
    ) -> Result<()> {
        if table.contains(id) {
            return Err(ModuleError::Duplicate(id.to_string()).into());
        }

        for entry in self.providers.module_chains() {
            let extension = entry.extension();
            if let Err(e) = extension.loading(id, kind, &module, package, domain) {
                warn!("Module '{}' rejected by '{}': {}", id, extension.name(), e);
                return Err(ModuleError::Rejected {
                    extension: extension.name().to_string(),
                    target: id.to_string(),
                    reason: e.to_string(),
                }
                .into());
            }
        }

        let mut record = ModuleRecord::new(id, kind, package, domain.id());
        if let Err(e) = module.on_active() {
            error!("Module '{}' failed to activate: {}", id, e);
            return Err(ModuleError::ActivationFailed {
                id: id.to_string(),
                reason: e.to_string(),
            }
            .into());
        }
        record.transition_to(ModuleState::Active)?;

        info!("Loaded module '{}' ({}) from {}", id, kind, package.display());
        table.modules.push(LoadedModule {
            record,
            instance: module,
        });
        Ok(())
    }

    /// Load every module package found in the configured module paths.
    ///
    /// Failures are logged per package and per module. Returns the number
    /// of modules loaded.
    pub fn load_module_packages(&self) -> usize {
        let mut loaded = 0;
        for dir in self.config.module_paths() {
            if !dir.is_dir() {
                debug!("Module path {} does not exist, skipping", dir.display());
                continue;
            }

            let packages = match list_packages(&dir) {
                Ok(packages) => packages,
                Err(e) => {
                    warn!("Failed to scan module path {}: {}", dir.display(), e);
                    continue;
                }
            };

            for package in packages {
                match self.load_module_package(&package) {
                    Ok(count) => loaded += count,
                    Err(e) => warn!("Failed to load module package {}: {}", package.display(), e),
                }
            }
        }

        info!("Loaded {} module(s) for namespace '{}'", loaded, self.config.namespace());
        loaded
    }

    /// Load the modules exported by one package.
    ///
    /// The table stays locked for the whole package, so an unload pass
    /// sees either none of its modules or all of them.
    pub fn load_module_package(&self, package: &Path) -> Result<usize> {
        let mut table = self.table.lock();
        self.load_package(package)?;

        let name = package
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let domain =
            self.host
                .define_domain(&name, package, Some(Arc::clone(&self.namespace_domain)))?;

        let mut loaded = 0;
        for symbol in &domain.manifest().exports {
            let (id, factory) = match domain.resolve(symbol) {
                Ok(Export::Module { id, factory }) => (id, factory),
                Ok(other) => {
                    debug!("Export '{}' is a {}, not a module", symbol, other.kind());
                    continue;
                }
                Err(e) => {
                    warn!("Cannot resolve module '{}': {}", symbol, e);
                    continue;
                }
            };

            let module = factory();
            let kind = module.kind();
            match self.load_module_locked(&mut table, &id, kind, module, package, &domain) {
                Ok(()) => loaded += 1,
                Err(e) => warn!("{}", e),
            }
        }

        if loaded == 0 {
            domain.close();
        } else {
            table.domains.push(domain);
        }
        Ok(loaded)
    }

    /// Unload every module.
    ///
    /// Records move to `Unloaded`, each module's unload hook runs, module
    /// domains are closed and the table is emptied. Returns the number of
    /// modules unloaded.
    pub fn unload_all(&self) -> usize {
        let mut table = self.table.lock();
        let count = table.modules.len();

        for loaded in table.modules.iter_mut().rev() {
            if let Err(e) = loaded.record.transition_to(ModuleState::Unloaded) {
                warn!("{}", Error::from(e));
            }
            loaded.instance.on_unload();
            debug!("Unloaded module '{}'", loaded.record.id());
        }
        table.modules.clear();

        for domain in table.domains.drain(..) {
            domain.close();
        }

        let pass = self.unload_passes.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "Unload pass {} for namespace '{}' released {} module(s)",
            pass,
            self.config.namespace(),
            count
        );
        count
    }

    /// Unload every module and close the provider domains.
    pub fn shutdown(&self) {
        self.unload_all();
        self.providers.close();
    }

    /// Records of the loaded modules, in load order
    pub fn records(&self) -> Vec<ModuleRecord> {
        self.table
            .lock()
            .modules
            .iter()
            .map(|m| m.record.clone())
            .collect()
    }

    /// Number of loaded modules
    pub fn module_count(&self) -> usize {
        self.table.lock().modules.len()
    }

    /// Number of completed unload passes
    pub fn unload_passes(&self) -> usize {
        self.unload_passes.load(Ordering::SeqCst)
    }
}
