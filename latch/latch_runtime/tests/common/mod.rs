//! Shared fixtures for latch_runtime integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use latch_core::{ConfigView, Error, ModuleError, Result};
use latch_isolation::{
    ExportCatalog, Injectable, IsolatedDomain, Module, ModuleLoadingChain, PackageLoadingChain,
    PackageManifest, BOUNDARY_ABI_VERSION,
};
use latch_runtime::init_home;
use parking_lot::Mutex;
use tempfile::TempDir;

pub const COUNTER_MODULE: &str = "test.counter";
pub const SECOND_COUNTER_MODULE: &str = "test.counter-2";
pub const FAILING_MODULE: &str = "test.failing";
pub const DENIED_MODULE: &str = "deny.me";
pub const AUDIT_CHAIN: &str = "test.audit";
pub const DENY_CHAIN: &str = "test.deny";
pub const SIGNAL_CHAIN: &str = "test.signal";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Counters shared between the test and the extensions it registers.
#[derive(Default)]
pub struct Probe {
    pub activated: AtomicUsize,
    pub unloaded: AtomicUsize,
    pub audited: Mutex<Vec<PathBuf>>,
    pub audit_namespaces: Mutex<Vec<String>>,
    /// Taken and signalled by the first module the signal chain sees
    pub first_module: Mutex<Option<Sender<String>>>,
}

impl Probe {
    pub fn activated(&self) -> usize {
        self.activated.load(Ordering::SeqCst)
    }

    pub fn unloaded(&self) -> usize {
        self.unloaded.load(Ordering::SeqCst)
    }
}

struct CounterModule {
    probe: Arc<Probe>,
}

impl Module for CounterModule {
    fn kind(&self) -> &'static str {
        "counter"
    }

    fn on_active(&self) -> Result<()> {
        self.probe.activated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_unload(&self) {
        self.probe.unloaded.fetch_add(1, Ordering::SeqCst);
    }
}

struct FailingModule;

impl Module for FailingModule {
    fn on_active(&self) -> Result<()> {
        Err(Error::Module(ModuleError::ActivationFailed {
            id: FAILING_MODULE.to_string(),
            reason: "refuses to start".to_string(),
        }))
    }
}

/// Records every package it sees, and the namespace it was configured for.
struct AuditChain {
    probe: Arc<Probe>,
    namespace: Option<String>,
}

impl Injectable for AuditChain {
    fn wants_config(&self) -> bool {
        true
    }

    fn set_config(&mut self, view: ConfigView) {
        self.namespace = Some(view.namespace().to_string());
    }
}

impl PackageLoadingChain for AuditChain {
    fn name(&self) -> &str {
        "audit"
    }

    fn loading(&self, package: &Path) -> Result<()> {
        self.probe.audited.lock().push(package.to_path_buf());
        if let Some(namespace) = &self.namespace {
            self.probe.audit_namespaces.lock().push(namespace.clone());
        }
        Ok(())
    }
}

/// Rejects modules whose id starts with `deny.`.
struct DenyChain;

impl Injectable for DenyChain {}

impl ModuleLoadingChain for DenyChain {
    fn name(&self) -> &str {
        "deny"
    }

    fn loading(
        &self,
        id: &str,
        _kind: &str,
        _module: &Arc<dyn Module>,
        _package: &Path,
        _domain: &Arc<IsolatedDomain>,
    ) -> Result<()> {
        if id.starts_with("deny.") {
            return Err(Error::Module(ModuleError::Rejected {
                extension: "deny".to_string(),
                target: id.to_string(),
                reason: "denied by policy".to_string(),
            }));
        }
        Ok(())
    }
}

/// Tells the test thread which module it is about to accept first.
struct SignalChain {
    probe: Arc<Probe>,
}

impl Injectable for SignalChain {}

impl ModuleLoadingChain for SignalChain {
    fn name(&self) -> &str {
        "signal"
    }

    fn loading(
        &self,
        id: &str,
        _kind: &str,
        _module: &Arc<dyn Module>,
        _package: &Path,
        _domain: &Arc<IsolatedDomain>,
    ) -> Result<()> {
        if let Some(tx) = self.probe.first_module.lock().take() {
            let _ = tx.send(id.to_string());
        }
        Ok(())
    }
}

/// A catalog with the test extensions registered under fixed symbols.
pub fn test_catalog(probe: &Arc<Probe>) -> Arc<ExportCatalog> {
    let catalog = ExportCatalog::new();

    let p = Arc::clone(probe);
    catalog.register_module(COUNTER_MODULE, move || {
        Arc::new(CounterModule { probe: p.clone() }) as Arc<dyn Module>
    });
    let p = Arc::clone(probe);
    catalog.register_module(SECOND_COUNTER_MODULE, move || {
        Arc::new(CounterModule { probe: p.clone() }) as Arc<dyn Module>
    });
    catalog.register_module(FAILING_MODULE, || Arc::new(FailingModule) as Arc<dyn Module>);
    let p = Arc::clone(probe);
    catalog.register_module(DENIED_MODULE, move || {
        Arc::new(CounterModule { probe: p.clone() }) as Arc<dyn Module>
    });

    let p = Arc::clone(probe);
    catalog.register_package_chain(AUDIT_CHAIN, move || {
        Box::new(AuditChain {
            probe: p.clone(),
            namespace: None,
        }) as Box<dyn PackageLoadingChain>
    });
    catalog.register_module_chain(DENY_CHAIN, || {
        Box::new(DenyChain) as Box<dyn ModuleLoadingChain>
    });

    let p = Arc::clone(probe);
    catalog.register_module_chain(SIGNAL_CHAIN, move || {
        Box::new(SignalChain { probe: p.clone() }) as Box<dyn ModuleLoadingChain>
    });

    Arc::new(catalog)
}

/// A laid-out home directory.
pub struct Home {
    dir: TempDir,
}

impl Home {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        init_home(dir.path()).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Feature string for a namespace bound to an ephemeral loopback port.
    pub fn features(&self, namespace: &str) -> String {
        format!(
            "home={};namespace={};server.ip=127.0.0.1;server.port=0",
            self.path().display(),
            namespace
        )
    }

    pub fn add_provider(&self, file: &str, exports: &[&str]) -> PathBuf {
        write_package(&self.path().join("provider"), file, exports)
    }

    pub fn add_module_package(&self, file: &str, exports: &[&str]) -> PathBuf {
        write_package(&self.path().join("module"), file, exports)
    }
}

pub fn write_package(dir: &Path, file: &str, exports: &[&str]) -> PathBuf {
    let path = dir.join(file);
    PackageManifest::new(
        file.trim_end_matches(".pkg"),
        BOUNDARY_ABI_VERSION,
        exports.iter().map(|s| s.to_string()).collect(),
    )
    .write(&path)
    .unwrap();
    path
}
