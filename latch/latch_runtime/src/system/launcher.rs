//! The exposed install surface.
//!
//! A static load installs a namespace as the process starts; a dynamic
//! attach installs one into a process that is already running and records
//! the result so the attaching tool can find the endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use latch_core::{FeatureMap, LaunchMode, Result};
use latch_isolation::{ExportCatalog, HostRuntime, LinkedHost};
use tracing::info;

use super::bootstrap::register_core_exports;
use super::result::ResultSink;
use crate::namespace::NamespaceRegistry;

/// Entry point for installing and uninstalling namespaces
#[derive(Debug)]
pub struct Launcher {
    registry: NamespaceRegistry,
    sink: ResultSink,
}

impl Launcher {
    /// Create a launcher over a host runtime
    pub fn new(host: Arc<dyn HostRuntime>, sink: ResultSink) -> Self {
        Self {
            registry: NamespaceRegistry::new(host),
            sink,
        }
    }

    /// Create a launcher over a linked host.
    ///
    /// The core exports are registered into `catalog` alongside whatever
    /// provider and module exports it already holds.
    pub fn linked(catalog: Arc<ExportCatalog>, sink: ResultSink) -> Self {
        register_core_exports(&catalog);
        Self::new(Arc::new(LinkedHost::new(catalog)), sink)
    }

    /// Install a namespace at process start.
    pub fn install_via_static_load(&self, raw: &str) -> Result<SocketAddr> {
        let features = FeatureMap::parse(raw);
        self.registry.install(&features, LaunchMode::Agent)
    }

    /// Install a namespace into a running process and record the result.
    ///
    /// A failure to record is reported, but the namespace stays installed.
    pub fn install_via_dynamic_attach(&self, raw: &str) -> Result<SocketAddr> {
        let features = FeatureMap::parse(raw);
        let address = self.registry.install(&features, LaunchMode::Attach)?;
        self.sink
            .persist(features.namespace(), features.token(), address)?;
        info!(
            "Attached namespace '{}' at {}",
            features.namespace(),
            address
        );
        Ok(address)
    }

    /// Uninstall a namespace. Returns `false` if it was not installed.
    pub fn uninstall(&self, namespace: &str) -> bool {
        self.registry.uninstall(namespace)
    }

    /// The namespace registry
    pub fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    /// The result sink
    pub fn sink(&self) -> &ResultSink {
        &self.sink
    }
}
