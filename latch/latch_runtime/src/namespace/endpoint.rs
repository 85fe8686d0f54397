//! The TCP control endpoint.
//!
//! Binding boots the namespace: providers are discovered, the module
//! manager is created and the module packages are loaded. Only then is the
//! listener bound. The wire protocol served on the listener lives outside
//! this crate.

use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::{Arc, Weak};

use latch_core::error::bind_failed;
use latch_core::{BindError, ModuleRecord, Result, TypedConfiguration};
use latch_isolation::{ControlEndpoint, HostRuntime, IsolatedDomain};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::module::ModuleManager;
use crate::provider;

#[derive(Default)]
struct EndpointState {
    listener: Option<TcpListener>,
    address: Option<SocketAddr>,
    modules: Option<Arc<ModuleManager>>,
}

/// Control endpoint listening on a TCP socket.
pub struct TcpControlEndpoint {
    domain: Weak<IsolatedDomain>,
    state: Mutex<EndpointState>,
}

impl TcpControlEndpoint {
    /// Create an unbound endpoint for a namespace domain.
    pub fn new(domain: Weak<IsolatedDomain>) -> Self {
        Self {
            domain,
            state: Mutex::new(EndpointState::default()),
        }
    }

    /// The namespace's module manager, once bound.
    pub fn modules(&self) -> Option<Arc<ModuleManager>> {
        self.state.lock().modules.clone()
    }
}

impl ControlEndpoint for TcpControlEndpoint {
    fn is_bound(&self) -> bool {
        self.state.lock().listener.is_some()
    }

    fn bind(&self, config: Arc<TypedConfiguration>, host: Arc<dyn HostRuntime>) -> Result<()> {
        let mut state = self.state.lock();
        if state.listener.is_some() {
            return Ok(());
        }

        let domain = self.domain.upgrade().ok_or(BindError::DomainGone)?;

        if state.modules.is_none() {
            let providers =
                provider::discover(&config.provider_dir(), &domain, &config, host.as_ref());
            let modules = Arc::new(ModuleManager::new(
                Arc::clone(&config),
                providers,
                host,
                domain,
            ));
            modules.load_module_packages();
            state.modules = Some(modules);
        }

        let requested = config.listen_address();
        let address = requested
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| BindError::InvalidAddress(requested.clone()))?;

        let listener = TcpListener::bind(address).map_err(|e| bind_failed(address, e))?;
        let local = listener
            .local_addr()
            .map_err(|e| bind_failed(address, e))?;

        info!(
            "Control endpoint for namespace '{}' bound on {}",
            config.namespace(),
            local
        );
        state.listener = Some(listener);
        state.address = Some(local);
        Ok(())
    }

    fn local_address(&self) -> Option<SocketAddr> {
        self.state.lock().address
    }

    fn module_records(&self) -> Vec<ModuleRecord> {
        self.modules()
            .map(|modules| modules.records())
            .unwrap_or_default()
    }

    fn destroy(&self) {
        let mut state = self.state.lock();
        if let Some(listener) = state.listener.take() {
            debug!("Closing listener {:?}", listener.local_addr().ok());
        }
        state.address = None;
        if let Some(modules) = state.modules.take() {
            modules.shutdown();
        }
    }
}
