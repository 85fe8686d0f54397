//! Configuration resolution.
//!
//! Turns a raw feature string plus an optional TOML properties file into an
//! immutable [`TypedConfiguration`]. Resolution happens in two stages: the
//! registry parses the operator's feature string into a [`FeatureMap`] and
//! renders the *core feature string*; the namespace's isolated domain then
//! materializes a [`TypedConfiguration`] from that string.

mod feature;
pub mod layout;
mod properties;
mod typed;
mod view;

pub use feature::{
    default_home, normalize_home, FeatureMap, LaunchMode, DEFAULT_NAMESPACE, DEFAULT_SERVER_IP,
    DEFAULT_SERVER_PORT, DEFAULT_TOKEN, KEY_HOME, KEY_NAMESPACE, KEY_PROPERTIES, KEY_SERVER_IP,
    KEY_SERVER_PORT, KEY_TOKEN, RECORD_SEPARATOR,
};
pub use properties::Properties;
pub use typed::TypedConfiguration;
pub use view::ConfigView;

/// Core feature key for the config directory.
pub const CORE_KEY_CFG: &str = "cfg";
/// Core feature key for the system module directory.
pub const CORE_KEY_SYSTEM_MODULE: &str = "system_module";
/// Core feature key for the user module directory.
pub const CORE_KEY_USER_MODULE: &str = "user_module";
/// Core feature key for the provider directory.
pub const CORE_KEY_PROVIDER: &str = "provider";
/// Core feature key for the launch mode.
pub const CORE_KEY_MODE: &str = "mode";
