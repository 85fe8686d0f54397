//! System Bootstrap for Latch Runtime
//!
//! Registers the core package exports and lays out a home directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use latch_core::config::{layout, Properties};
use latch_core::TypedConfiguration;
use latch_isolation::{
    core_manifest, spy_manifest, ControlEndpoint, ExportCatalog, SYMBOL_CONFIGURE,
    SYMBOL_CONTROL_ENDPOINT,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::namespace::TcpControlEndpoint;

/// Errors that can occur while laying out a home directory
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("home path {0} exists and is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Register the core package's exports: the configuration entry point and
/// the TCP control endpoint.
pub fn register_core_exports(catalog: &ExportCatalog) {
    catalog.register_configure(SYMBOL_CONFIGURE, TypedConfiguration::from_core_feature_string);
    catalog.register_control_endpoint(SYMBOL_CONTROL_ENDPOINT, |domain| {
        Arc::new(TcpControlEndpoint::new(domain)) as Arc<dyn ControlEndpoint>
    });
}

/// A catalog holding only the core package's exports.
pub fn default_catalog() -> Arc<ExportCatalog> {
    let catalog = ExportCatalog::new();
    register_core_exports(&catalog);
    Arc::new(catalog)
}

/// Lay out a home directory.
///
/// Creates the config, library, provider and module directories, writes the
/// core and spy package manifests, and writes a default properties file
/// unless one exists. Existing packages are overwritten.
pub fn init_home(home: &Path) -> Result<(), LayoutError> {
    if home.exists() && !home.is_dir() {
        return Err(LayoutError::NotADirectory(home.to_path_buf()));
    }

    info!("Initializing home at {}", home.display());

    for dir in [
        layout::config_dir(home),
        layout::lib_dir(home),
        layout::provider_dir(home),
        layout::system_module_dir(home),
        layout::user_module_dir(home),
    ] {
        std::fs::create_dir_all(&dir).map_err(|source| LayoutError::Io {
            path: dir.clone(),
            source,
        })?;
    }

    for (path, manifest) in [
        (layout::core_package_path(home), core_manifest()),
        (layout::spy_package_path(home), spy_manifest()),
    ] {
        manifest
            .write(&path)
            .map_err(|source| LayoutError::Io { path: path.clone(), source })?;
        debug!("Wrote package {}", path.display());
    }

    let properties = layout::properties_path(home);
    if !properties.exists() {
        std::fs::write(&properties, Properties::default().to_toml()).map_err(|source| {
            LayoutError::Io {
                path: properties.clone(),
                source,
            }
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use latch_isolation::PackageManifest;
    use tempfile::TempDir;

    #[test]
    fn test_init_home_layout() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("latch");
        init_home(&home).unwrap();

        assert!(home.join("cfg").join("latch.toml").is_file());
        assert!(home.join("provider").is_dir());
        assert!(home.join("module").is_dir());
        assert!(home.join("latch-module").is_dir());

        let core = PackageManifest::load(&home.join("lib").join("latch-core.pkg")).unwrap();
        assert!(core.exports_symbol(SYMBOL_CONFIGURE));
        assert!(core.exports_symbol(SYMBOL_CONTROL_ENDPOINT));
    }

    #[test]
    fn test_init_home_keeps_properties() {
        let dir = TempDir::new().unwrap();
        init_home(dir.path()).unwrap();
        let properties = dir.path().join("cfg").join("latch.toml");
        std::fs::write(&properties, "unsafe_enabled = true\n").unwrap();

        init_home(dir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&properties).unwrap(),
            "unsafe_enabled = true\n"
        );
    }

    #[test]
    fn test_init_home_on_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("home");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(
            init_home(&file).unwrap_err(),
            LayoutError::NotADirectory(_)
        ));
    }

    #[test]
    fn test_default_catalog_has_core_exports() {
        let catalog = default_catalog();
        assert!(catalog.contains(SYMBOL_CONFIGURE));
        assert!(catalog.contains(SYMBOL_CONTROL_ENDPOINT));
    }
}
