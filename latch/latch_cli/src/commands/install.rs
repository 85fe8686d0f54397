use anyhow::{Context, Result};
use latch_core::FeatureMap;
use latch_runtime::{default_catalog, Launcher, ResultSink};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// How the namespace is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Load,
    Attach,
}

#[derive(Serialize)]
struct InstallReport {
    namespace: String,
    address: String,
}

/// Install a namespace, report its address, then uninstall it once Ctrl-C
/// arrives (or right away when `wait` is false).
pub async fn run(
    feature: &str,
    mode: Mode,
    result_file: Option<PathBuf>,
    wait: bool,
    json: bool,
) -> Result<()> {
    let result_path = match result_file {
        Some(path) => path,
        None if mode == Mode::Attach => {
            ResultSink::default_location().context("cannot locate the result file")?
        }
        // static loads never persist
        None => PathBuf::new(),
    };
    let launcher = Launcher::linked(default_catalog(), ResultSink::new(result_path));
    let namespace = FeatureMap::parse(feature).namespace().to_string();

    let address = match mode {
        Mode::Load => launcher.install_via_static_load(feature),
        Mode::Attach => launcher.install_via_dynamic_attach(feature),
    }
    .with_context(|| format!("failed to install namespace '{}'", namespace))?;

    if json {
        let report = InstallReport {
            namespace: namespace.clone(),
            address: address.to_string(),
        };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("Namespace '{}' listening on {}", namespace, address);
    }

    if wait {
        info!("Press Ctrl-C to uninstall");
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;
    }

    launcher.uninstall(&namespace);
    Ok(())
}
