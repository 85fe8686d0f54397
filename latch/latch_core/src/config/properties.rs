//! The TOML properties file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

/// Settings read from `<home>/cfg/latch.toml` (or the `prop` path).
///
/// Values given in the feature string override these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Properties {
    /// Whether extensions may perform unsafe operations on the host
    pub unsafe_enabled: bool,

    /// Control endpoint host
    pub server_ip: Option<String>,

    /// Control endpoint port
    pub server_port: Option<u16>,

    /// Extra module search directories, searched after the built-in ones
    pub module_paths: Vec<PathBuf>,
}

impl Properties {
    /// Load properties from a file.
    ///
    /// A missing file yields defaults. A file that exists but cannot be read
    /// or parsed is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!("Properties file not found: {}, using defaults", path.display());
            return Ok(Self::default());
        }

        info!("Loading properties from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|reason| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse properties from TOML text.
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Render these properties as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
