//! Contracts implemented by code living behind a domain boundary.
//!
//! Provider packages implement the two loading-chain contracts, module
//! packages implement [`Module`], and the core package supplies the
//! [`ControlEndpoint`] singleton.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use latch_core::{ConfigView, ModuleRecord, Result, TypedConfiguration};

use crate::domain::IsolatedDomain;
use crate::host::HostRuntime;

/// Capabilities an extension may ask to have injected.
///
/// Injection happens once, after the extension is instantiated and before
/// it is first invoked. Extensions that need nothing keep the defaults.
pub trait Injectable {
    /// Whether the extension wants a configuration view.
    fn wants_config(&self) -> bool {
        false
    }

    /// Receive the configuration view.
    fn set_config(&mut self, _view: ConfigView) {}
}

/// An extension invoked for every module package before it is loaded.
pub trait PackageLoadingChain: Injectable + Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Inspect a module package. Returning an error stops the remaining
    /// chain entries and rejects the package.
    fn loading(&self, package: &Path) -> Result<()>;
}

/// An extension invoked for every module before it is activated.
pub trait ModuleLoadingChain: Injectable + Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Inspect a module. Returning an error stops the remaining chain
    /// entries and rejects the module.
    fn loading(
        &self,
        id: &str,
        kind: &str,
        module: &Arc<dyn Module>,
        package: &Path,
        domain: &Arc<IsolatedDomain>,
    ) -> Result<()>;
}

/// A runtime extension module.
pub trait Module: Send + Sync {
    /// The declared kind of the module.
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Called once the loading chain has accepted the module.
    fn on_active(&self) -> Result<()> {
        Ok(())
    }

    /// Called when the module is unloaded.
    fn on_unload(&self) {}
}

/// The per-namespace control endpoint.
///
/// One instance lives in each namespace domain as a singleton.
pub trait ControlEndpoint: Send + Sync {
    /// Whether the endpoint is bound.
    fn is_bound(&self) -> bool;

    /// Boot the namespace and bind the endpoint.
    fn bind(&self, config: Arc<TypedConfiguration>, host: Arc<dyn HostRuntime>) -> Result<()>;

    /// The bound address, if bound.
    fn local_address(&self) -> Option<SocketAddr>;

    /// Records of the modules loaded in the namespace, in load order.
    fn module_records(&self) -> Vec<ModuleRecord> {
        Vec::new()
    }

    /// Release everything the endpoint holds. Safe to call repeatedly and
    /// on an endpoint that never finished binding.
    fn destroy(&self);
}
