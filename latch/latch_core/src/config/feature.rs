//! Feature string parsing.
//!
//! A feature string is a flat list of `key=value` pairs separated by `;`,
//! for example `home=/opt/latch;namespace=default;server.port=0`. Parsing is
//! lenient: malformed segments are dropped and lookups fall back to defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConfigError;

/// Separator between `key=value` records.
pub const RECORD_SEPARATOR: char = ';';

/// Key holding the home directory.
pub const KEY_HOME: &str = "home";
/// Key holding the namespace name.
pub const KEY_NAMESPACE: &str = "namespace";
/// Key holding the control endpoint host.
pub const KEY_SERVER_IP: &str = "server.ip";
/// Key holding the control endpoint port.
pub const KEY_SERVER_PORT: &str = "server.port";
/// Key holding the attach correlation token.
pub const KEY_TOKEN: &str = "token";
/// Key holding an explicit properties file path.
pub const KEY_PROPERTIES: &str = "prop";

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";
/// Control endpoint host used when none is given.
pub const DEFAULT_SERVER_IP: &str = "0.0.0.0";
/// Control endpoint port used when none is given; zero lets the system choose.
pub const DEFAULT_SERVER_PORT: &str = "0";
/// Token used when none is given.
pub const DEFAULT_TOKEN: &str = "";

/// How the framework is being installed into the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Installed at process startup
    Agent,

    /// Attached to an already-running process
    Attach,
}

impl LaunchMode {
    /// The wire name of this mode in a core feature string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Attach => "attach",
        }
    }

    /// Parse a wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "agent" => Some(Self::Agent),
            "attach" => Some(Self::Attach),
            _ => None,
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// An ordered map of feature keys to values.
///
/// Keys keep their first-seen position; a repeated key overwrites the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureMap {
    entries: Vec<(String, String)>,
}

impl FeatureMap {
    /// Parse a raw feature string.
    ///
    /// Segments that do not split into exactly a key and a value on `=`,
    /// or have a blank key or value, are silently dropped. Trailing empty
    /// parts do not count, so `token=abc=` still yields `abc`.
    pub fn parse(raw: &str) -> Self {
        let mut map = Self::default();
        if is_blank(raw) {
            return map;
        }

        for segment in raw.split(RECORD_SEPARATOR) {
            if is_blank(segment) {
                continue;
            }
            let mut parts: Vec<&str> = segment.split('=').collect();
            while parts.last().map_or(false, |part| part.is_empty()) {
                parts.pop();
            }
            if parts.len() != 2 || is_blank(parts[0]) || is_blank(parts[1]) {
                debug!("Dropping malformed feature segment '{}'", segment);
                continue;
            }
            map.insert(parts[0], parts[1]);
        }

        map
    }

    /// Insert or overwrite a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Get a raw value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Get a value, falling back to `default` when absent or blank.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.get(key) {
            Some(value) if !is_blank(value) => value,
            _ => default,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The namespace, or `default`.
    pub fn namespace(&self) -> &str {
        self.get_or(KEY_NAMESPACE, DEFAULT_NAMESPACE)
    }

    /// The attach token, or the empty string.
    pub fn token(&self) -> &str {
        self.get_or(KEY_TOKEN, DEFAULT_TOKEN)
    }

    /// Resolve the home directory.
    ///
    /// Uses the `home` key when present, otherwise the grandparent of the
    /// running executable (`<home>/bin/latch`). Drive-style prefixes are
    /// normalized on Windows hosts.
    pub fn home(&self) -> Result<PathBuf, ConfigError> {
        let home = match self.get(KEY_HOME).filter(|v| !is_blank(v)) {
            Some(home) => home.to_string(),
            None => default_home()?.to_string_lossy().into_owned(),
        };
        Ok(PathBuf::from(normalize_home(&home, cfg!(windows))))
    }

    /// The properties file path, or `<home>/cfg/latch.toml`.
    pub fn properties_path(&self) -> Result<PathBuf, ConfigError> {
        match self.get(KEY_PROPERTIES).filter(|v| !is_blank(v)) {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(super::layout::properties_path(&self.home()?)),
        }
    }

    /// Build the core feature string handed across the domain boundary.
    ///
    /// It always carries every derived path, the launch mode and the
    /// namespace; `server.ip` and `server.port` are only forwarded when the
    /// operator supplied them, so a properties file can still provide them.
    pub fn to_core_feature_string(&self, mode: LaunchMode) -> Result<String, ConfigError> {
        let home = self.home()?;
        let mut out = String::new();
        let mut push = |key: &str, value: &str| {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push(RECORD_SEPARATOR);
        };

        push(
            super::CORE_KEY_CFG,
            &path_str(&super::layout::config_dir(&home)),
        );
        push(
            super::CORE_KEY_SYSTEM_MODULE,
            &path_str(&super::layout::system_module_dir(&home)),
        );
        push(super::CORE_KEY_MODE, mode.as_str());
        push(KEY_HOME, &path_str(&home));
        push(
            super::CORE_KEY_USER_MODULE,
            &path_str(&super::layout::user_module_dir(&home)),
        );
        push(
            super::CORE_KEY_PROVIDER,
            &path_str(&super::layout::provider_dir(&home)),
        );
        push(KEY_NAMESPACE, self.namespace());

        if self.contains_key(KEY_SERVER_IP) {
            push(KEY_SERVER_IP, self.get_or(KEY_SERVER_IP, DEFAULT_SERVER_IP));
        }
        if self.contains_key(KEY_SERVER_PORT) {
            push(
                KEY_SERVER_PORT,
                self.get_or(KEY_SERVER_PORT, DEFAULT_SERVER_PORT),
            );
        }

        Ok(out)
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// The home directory implied by the running executable's location.
pub fn default_home() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().map_err(|e| ConfigError::HomeUnresolved(e.to_string()))?;
    exe.parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            ConfigError::HomeUnresolved(format!("{} has no grandparent", exe.display()))
        })
}

/// Rewrite a leading `/c/` (or `\c\`) segment to `c:/` on Windows hosts.
///
/// This is a pure string transform; nothing touches the filesystem.
pub fn normalize_home(home: &str, windows: bool) -> String {
    if !windows {
        return home.to_string();
    }

    let bytes = home.as_bytes();
    let is_sep = |b: u8| b == b'/' || b == b'\\';
    if bytes.len() >= 3 && is_sep(bytes[0]) && bytes[1].is_ascii_alphabetic() && is_sep(bytes[2])
    {
        format!("{}:/{}", bytes[1] as char, &home[3..])
    } else {
        home.to_string()
    }
}
