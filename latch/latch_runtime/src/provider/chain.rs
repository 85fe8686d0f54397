//! Extension chains built by provider discovery.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use latch_core::DiscoveryWarning;
use latch_isolation::{IsolatedDomain, ModuleLoadingChain, PackageLoadingChain};
use tracing::debug;

/// One discovered extension and the provider package it came from.
pub struct ChainEntry<T: ?Sized> {
    /// Position in the chain
    ordinal: usize,

    /// Provider package file
    provider: PathBuf,

    /// Domain of the provider package
    domain: Arc<IsolatedDomain>,

    /// The extension instance
    extension: Box<T>,
}

impl<T: ?Sized> ChainEntry<T> {
    pub(crate) fn new(
        ordinal: usize,
        provider: PathBuf,
        domain: Arc<IsolatedDomain>,
        extension: Box<T>,
    ) -> Self {
        Self {
            ordinal,
            provider,
            domain,
            extension,
        }
    }

    /// Position in the chain; invocation follows this order.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// The provider package the extension was discovered in.
    pub fn provider(&self) -> &Path {
        &self.provider
    }

    /// The provider package's domain.
    pub fn domain(&self) -> &Arc<IsolatedDomain> {
        &self.domain
    }

    /// The extension.
    pub fn extension(&self) -> &T {
        &self.extension
    }
}

impl<T: ?Sized> fmt::Debug for ChainEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainEntry")
            .field("ordinal", &self.ordinal)
            .field("provider", &self.provider)
            .finish()
    }
}

/// The result of provider discovery.
#[derive(Default)]
pub struct ProviderChains {
    pub(crate) package_chains: Vec<ChainEntry<dyn PackageLoadingChain>>,
    pub(crate) module_chains: Vec<ChainEntry<dyn ModuleLoadingChain>>,
    pub(crate) warnings: Vec<DiscoveryWarning>,
    pub(crate) domains: Vec<Arc<IsolatedDomain>>,
}

impl ProviderChains {
    /// Package loading-chain entries in discovery order.
    pub fn package_chains(&self) -> &[ChainEntry<dyn PackageLoadingChain>] {
        &self.package_chains
    }

    /// Module loading-chain entries in discovery order.
    pub fn module_chains(&self) -> &[ChainEntry<dyn ModuleLoadingChain>] {
        &self.module_chains
    }

    /// Warnings recorded while scanning.
    pub fn warnings(&self) -> &[DiscoveryWarning] {
        &self.warnings
    }

    /// Domains of the provider packages that contributed.
    pub fn domains(&self) -> &[Arc<IsolatedDomain>] {
        &self.domains
    }

    /// Close every provider domain. Safe to call repeatedly.
    pub fn close(&self) {
        for domain in &self.domains {
            if domain.close() {
                debug!("Closed provider domain '{}'", domain.name());
            }
        }
    }
}

impl fmt::Debug for ProviderChains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderChains")
            .field("package_chains", &self.package_chains.len())
            .field("module_chains", &self.module_chains.len())
            .field("warnings", &self.warnings)
            .finish()
    }
}
