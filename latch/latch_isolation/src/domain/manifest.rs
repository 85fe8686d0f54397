//! Package manifests.
//!
//! Every package file is a small TOML document naming the package, the
//! boundary ABI it was built against, and the symbols it exports:
//!
//! ```toml
//! name = "acme-audit"
//! abi = 1
//! exports = ["acme.audit-log", "acme.deny-list"]
//! ```

use std::path::Path;

use latch_core::ResolutionError;
use serde::{Deserialize, Serialize};

/// The parsed contents of a package file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Package name
    pub name: String,

    /// Boundary ABI version the package targets
    pub abi: u32,

    /// Exported symbols, in declaration order
    #[serde(default)]
    pub exports: Vec<String>,
}

impl PackageManifest {
    /// Create a manifest.
    pub fn new(name: impl Into<String>, abi: u32, exports: Vec<String>) -> Self {
        Self {
            name: name.into(),
            abi,
            exports,
        }
    }

    /// Read and parse a package file.
    pub fn load(path: &Path) -> Result<Self, ResolutionError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ResolutionError::InvalidPackage {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        toml::from_str(&content).map_err(|e| ResolutionError::InvalidPackage {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Render the manifest as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }

    /// Write the manifest to a package file, creating parent directories.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml())
    }

    /// Whether the package declares a symbol.
    pub fn exports_symbol(&self, symbol: &str) -> bool {
        self.exports.iter().any(|s| s == symbol)
    }
}
