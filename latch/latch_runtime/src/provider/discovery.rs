//! Provider package discovery.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use latch_core::config::layout;
use latch_core::{ConfigView, DiscoveryWarning, TypedConfiguration};
use latch_isolation::{
    Export, HostRuntime, Injectable, IsolatedDomain, ModuleLoadingChain, PackageLoadingChain,
};
use tracing::{debug, info, warn};

use super::chain::{ChainEntry, ProviderChains};

/// Discover the extensions in a provider directory.
///
/// Every `*.pkg` file directly inside `provider_dir` is loaded into its own
/// domain parented to `parent`. Its exported loading-chain extensions are
/// instantiated, given the configuration view if they ask for it, and
/// appended to the chains in directory order.
///
/// Nothing here is fatal. A missing directory or a broken package is
/// recorded as a warning and the scan carries on.
pub fn discover(
    provider_dir: &Path,
    parent: &Arc<IsolatedDomain>,
    config: &Arc<TypedConfiguration>,
    host: &dyn HostRuntime,
) -> ProviderChains {
    let mut chains = ProviderChains::default();

    let packages = match list_packages(provider_dir) {
        Ok(packages) => packages,
        Err(e) => {
            warn!(
                "Provider directory {} not scanned: {}",
                provider_dir.display(),
                e
            );
            chains
                .warnings
                .push(DiscoveryWarning::new(provider_dir, e.to_string()));
            return chains;
        }
    };

    let view = ConfigView::new(Arc::clone(config));
    for package in packages {
        match load_provider(&package, parent, &view, host) {
            Ok(found) => found.append_to(&mut chains),
            Err(reason) => {
                warn!("Skipping provider {}: {}", package.display(), reason);
                chains.warnings.push(DiscoveryWarning::new(package, reason));
            }
        }
    }

    info!(
        "Discovered {} package chain(s) and {} module chain(s) in {} ({} warning(s))",
        chains.package_chains.len(),
        chains.module_chains.len(),
        provider_dir.display(),
        chains.warnings.len()
    );
    chains
}

/// `*.pkg` files directly inside a directory, in enumeration order.
///
/// Entries that cannot be read are skipped.
pub(crate) fn list_packages(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut packages = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if layout::is_package_file(&path) {
            packages.push(path);
        }
    }
    Ok(packages)
}

/// Extensions found in one provider package, held back until the whole
/// package has loaded.
struct Found {
    package: PathBuf,
    domain: Arc<IsolatedDomain>,
    package_chains: Vec<Box<dyn PackageLoadingChain>>,
    module_chains: Vec<Box<dyn ModuleLoadingChain>>,
}

impl Found {
    fn append_to(self, chains: &mut ProviderChains) {
        for extension in self.package_chains {
            let ordinal = chains.package_chains.len();
            chains.package_chains.push(ChainEntry::new(
                ordinal,
                self.package.clone(),
                Arc::clone(&self.domain),
                extension,
            ));
        }
        for extension in self.module_chains {
            let ordinal = chains.module_chains.len();
            chains.module_chains.push(ChainEntry::new(
                ordinal,
                self.package.clone(),
                Arc::clone(&self.domain),
                extension,
            ));
        }
        chains.domains.push(self.domain);
    }
}

fn load_provider(
    package: &Path,
    parent: &Arc<IsolatedDomain>,
    view: &ConfigView,
    host: &dyn HostRuntime,
) -> Result<Found, String> {
    let name = package
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let domain = host
        .define_domain(&name, package, Some(Arc::clone(parent)))
        .map_err(|e| e.to_string())?;

    let mut found = Found {
        package: package.to_path_buf(),
        domain: Arc::clone(&domain),
        package_chains: Vec::new(),
        module_chains: Vec::new(),
    };

    for symbol in &domain.manifest().exports {
        let export = match domain.resolve(symbol) {
            Ok(export) => export,
            Err(e) => {
                domain.close();
                return Err(e.to_string());
            }
        };

        match export {
            Export::PackageLoadingChain(factory) => {
                let mut extension = factory();
                inject(extension.as_mut(), view);
                debug!("Provider {} contributes package chain '{}'", name, extension.name());
                found.package_chains.push(extension);
            }
            Export::ModuleLoadingChain(factory) => {
                let mut extension = factory();
                inject(extension.as_mut(), view);
                debug!("Provider {} contributes module chain '{}'", name, extension.name());
                found.module_chains.push(extension);
            }
            other => debug!(
                "Provider {} export '{}' is a {}, ignored",
                name,
                symbol,
                other.kind()
            ),
        }
    }

    Ok(found)
}

fn inject<T: Injectable + ?Sized>(extension: &mut T, view: &ConfigView) {
    if extension.wants_config() {
        extension.set_config(view.clone());
    }
}
