//! The on-disk layout of a Latch home directory.
//!
//! Every path here is a deterministic child of `home`.

use std::path::{Path, PathBuf};

/// File extension shared by core, provider and module packages.
pub const PACKAGE_EXTENSION: &str = "pkg";

/// File name of the core package inside `lib/`.
pub const CORE_PACKAGE_FILE: &str = "latch-core.pkg";

/// File name of the spy package inside `lib/`.
pub const SPY_PACKAGE_FILE: &str = "latch-spy.pkg";

/// File name of the properties file inside `cfg/`.
pub const PROPERTIES_FILE: &str = "latch.toml";

/// `<home>/cfg`
pub fn config_dir(home: &Path) -> PathBuf {
    home.join("cfg")
}

/// `<home>/cfg/latch.toml`
pub fn properties_path(home: &Path) -> PathBuf {
    config_dir(home).join(PROPERTIES_FILE)
}

/// `<home>/module`
pub fn system_module_dir(home: &Path) -> PathBuf {
    home.join("module")
}

/// `<home>/latch-module`
pub fn user_module_dir(home: &Path) -> PathBuf {
    home.join("latch-module")
}

/// `<home>/lib`
pub fn lib_dir(home: &Path) -> PathBuf {
    home.join("lib")
}

/// `<home>/lib/latch-core.pkg`
pub fn core_package_path(home: &Path) -> PathBuf {
    lib_dir(home).join(CORE_PACKAGE_FILE)
}

/// `<home>/lib/latch-spy.pkg`
pub fn spy_package_path(home: &Path) -> PathBuf {
    lib_dir(home).join(SPY_PACKAGE_FILE)
}

/// `<home>/provider`
pub fn provider_dir(home: &Path) -> PathBuf {
    home.join("provider")
}

/// Whether a path looks like a package file.
pub fn is_package_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(PACKAGE_EXTENSION))
            .unwrap_or(false)
}
