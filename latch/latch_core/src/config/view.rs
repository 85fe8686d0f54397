//! A read-only configuration view handed to extensions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{LaunchMode, TypedConfiguration};

/// Read-only access to the configuration of the namespace an extension
/// was discovered in.
///
/// Cloning a view is cheap; all clones share the same configuration.
#[derive(Debug, Clone)]
pub struct ConfigView {
    inner: Arc<TypedConfiguration>,
}

impl ConfigView {
    /// Create a view over a configuration.
    pub fn new(config: Arc<TypedConfiguration>) -> Self {
        Self { inner: config }
    }

    /// The namespace name.
    pub fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    /// The home directory.
    pub fn home(&self) -> &Path {
        self.inner.home()
    }

    /// How the framework was installed.
    pub fn mode(&self) -> LaunchMode {
        self.inner.mode()
    }

    /// Whether unsafe operations are allowed.
    pub fn unsafe_enabled(&self) -> bool {
        self.inner.unsafe_enabled()
    }

    /// `host:port` the control endpoint was asked to listen on.
    pub fn listen_address(&self) -> String {
        self.inner.listen_address()
    }

    /// Every module search directory, in search order.
    pub fn module_paths(&self) -> Vec<PathBuf> {
        self.inner.module_paths()
    }

    /// The provider package directory.
    pub fn provider_dir(&self) -> PathBuf {
        self.inner.provider_dir()
    }
}
