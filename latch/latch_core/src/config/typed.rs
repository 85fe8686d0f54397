//! The resolved, immutable configuration of one namespace instance.

use std::path::{Path, PathBuf};

use super::feature::{
    FeatureMap, LaunchMode, DEFAULT_NAMESPACE, DEFAULT_SERVER_IP, KEY_HOME, KEY_NAMESPACE,
    KEY_SERVER_IP, KEY_SERVER_PORT,
};
use super::layout;
use super::properties::Properties;
use super::CORE_KEY_MODE;
use crate::error::ConfigError;

/// Resolved settings for one namespace.
///
/// Derived paths are computed from `home` on demand, so they can never
/// drift from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedConfiguration {
    namespace: String,
    home: PathBuf,
    mode: LaunchMode,
    server_ip: String,
    server_port: u16,
    unsafe_enabled: bool,
    extra_module_paths: Vec<PathBuf>,
}

impl TypedConfiguration {
    /// Resolve a configuration directly from an operator feature string.
    ///
    /// Equivalent to rendering the core feature string and materializing
    /// it, without crossing a domain boundary.
    pub fn resolve(raw: &str, mode: LaunchMode) -> Result<Self, ConfigError> {
        let features = FeatureMap::parse(raw);
        let core = features.to_core_feature_string(mode)?;
        Self::from_core_feature_string(&core, &features.properties_path()?)
    }

    /// Materialize a configuration from a core feature string.
    ///
    /// The properties file is read first; values in the feature string win.
    pub fn from_core_feature_string(
        core: &str,
        properties_path: &Path,
    ) -> Result<Self, ConfigError> {
        let features = FeatureMap::parse(core);
        let properties = Properties::load(properties_path)?;

        let home = features
            .get(KEY_HOME)
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::Missing(KEY_HOME.to_string()))?;

        let mode = match features.get(CORE_KEY_MODE) {
            Some(value) => LaunchMode::parse(value).ok_or_else(|| ConfigError::Invalid {
                key: CORE_KEY_MODE.to_string(),
                value: value.to_string(),
            })?,
            None => LaunchMode::Agent,
        };

        let server_ip = match features.get(KEY_SERVER_IP) {
            Some(ip) => ip.to_string(),
            None => properties
                .server_ip
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVER_IP.to_string()),
        };

        let server_port = match features.get(KEY_SERVER_PORT) {
            Some(port) => port.trim().parse().map_err(|_| ConfigError::Invalid {
                key: KEY_SERVER_PORT.to_string(),
                value: port.to_string(),
            })?,
            None => properties.server_port.unwrap_or(0),
        };

        Ok(Self {
            namespace: features.get_or(KEY_NAMESPACE, DEFAULT_NAMESPACE).to_string(),
            home,
            mode,
            server_ip,
            server_port,
            unsafe_enabled: properties.unsafe_enabled,
            extra_module_paths: properties.module_paths,
        })
    }

    /// The namespace name.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// How the framework was installed.
    pub fn mode(&self) -> LaunchMode {
        self.mode
    }

    /// Control endpoint host.
    pub fn server_ip(&self) -> &str {
        &self.server_ip
    }

    /// Control endpoint port; zero means the system chooses.
    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    /// `host:port` for the control endpoint listener.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server_ip, self.server_port)
    }

    /// Whether unsafe operations are allowed.
    pub fn unsafe_enabled(&self) -> bool {
        self.unsafe_enabled
    }

    /// `<home>/cfg`
    pub fn config_dir(&self) -> PathBuf {
        layout::config_dir(&self.home)
    }

    /// `<home>/lib/latch-core.pkg`
    pub fn core_package_path(&self) -> PathBuf {
        layout::core_package_path(&self.home)
    }

    /// `<home>/provider`
    pub fn provider_dir(&self) -> PathBuf {
        layout::provider_dir(&self.home)
    }

    /// `<home>/module`
    pub fn system_module_dir(&self) -> PathBuf {
        layout::system_module_dir(&self.home)
    }

    /// `<home>/latch-module`
    pub fn user_module_dir(&self) -> PathBuf {
        layout::user_module_dir(&self.home)
    }

    /// Every module search directory, in search order.
    pub fn module_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.system_module_dir(), self.user_module_dir()];
        paths.extend(self.extra_module_paths.iter().cloned());
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let home = TempDir::new().unwrap();
        let raw = format!("home={}", home.path().display());
        let config = TypedConfiguration::resolve(&raw, LaunchMode::Agent).unwrap();

        assert_eq!(config.namespace(), "default");
        assert_eq!(config.server_ip(), "0.0.0.0");
        assert_eq!(config.server_port(), 0);
        assert_eq!(config.mode(), LaunchMode::Agent);
        assert!(!config.unsafe_enabled());
    }

    #[test]
    fn test_derived_paths_follow_home() {
        let home = TempDir::new().unwrap();
        let raw = format!("home={};namespace=ns1", home.path().display());
        let config = TypedConfiguration::resolve(&raw, LaunchMode::Attach).unwrap();

        assert_eq!(config.home(), home.path());
        assert_eq!(config.provider_dir(), home.path().join("provider"));
        assert_eq!(
            config.core_package_path(),
            home.path().join("lib").join("latch-core.pkg")
        );
        assert_eq!(
            config.module_paths(),
            vec![home.path().join("module"), home.path().join("latch-module")]
        );
        assert_eq!(config.mode(), LaunchMode::Attach);
    }

    #[test]
    fn test_feature_string_overrides_properties() {
        let home = TempDir::new().unwrap();
        std::fs::create_dir_all(home.path().join("cfg")).unwrap();
        std::fs::write(
            home.path().join("cfg").join("latch.toml"),
            "unsafe_enabled = true\nserver_ip = \"10.0.0.1\"\nserver_port = 7000\nmodule_paths = [\"/srv/extra\"]\n",
        )
        .unwrap();

        let raw = format!("home={};server.port=7100", home.path().display());
        let config = TypedConfiguration::resolve(&raw, LaunchMode::Agent).unwrap();

        assert_eq!(config.server_ip(), "10.0.0.1");
        assert_eq!(config.server_port(), 7100);
        assert!(config.unsafe_enabled());
        assert_eq!(config.module_paths().last().unwrap(), Path::new("/srv/extra"));
    }

    #[test]
    fn test_invalid_port() {
        let home = TempDir::new().unwrap();
        let raw = format!("home={};server.port=http", home.path().display());
        let err = TypedConfiguration::resolve(&raw, LaunchMode::Agent).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == "server.port"));
    }

    #[test]
    fn test_missing_home_in_core_string() {
        let dir = TempDir::new().unwrap();
        let err = TypedConfiguration::from_core_feature_string(
            "namespace=a;",
            &dir.path().join("none.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }
}
