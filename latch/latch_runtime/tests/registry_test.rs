//! Integration tests for the namespace registry and launcher.

mod common;

use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use common::*;
use latch_core::{BindError, Error, FeatureMap, InstallPhase, LaunchMode, ModuleState};
use latch_isolation::LinkedHost;
use latch_runtime::{Launcher, NamespaceRegistry, ResultSink};
use tempfile::TempDir;

fn registry(probe: &Arc<Probe>) -> NamespaceRegistry {
    let catalog = test_catalog(probe);
    latch_runtime::system::register_core_exports(&catalog);
    NamespaceRegistry::new(Arc::new(LinkedHost::new(catalog)))
}

fn install(registry: &NamespaceRegistry, raw: &str) -> latch_core::Result<std::net::SocketAddr> {
    registry.install(&FeatureMap::parse(raw), LaunchMode::Agent)
}

#[test]
fn test_install_is_idempotent() {
    init_tracing();
    let probe = Arc::new(Probe::default());
    let registry = registry(&probe);
    let home = Home::new();
    home.add_module_package("counter.pkg", &[COUNTER_MODULE]);

    let first = install(&registry, &home.features("ns1")).unwrap();
    let domain = registry.domain("ns1").unwrap();
    let second = install(&registry, &home.features("ns1")).unwrap();

    assert_eq!(first, second);
    assert_eq!(registry.namespaces(), vec!["ns1".to_string()]);
    assert_eq!(registry.domain("ns1").unwrap().id(), domain.id());
    assert_eq!(probe.activated(), 1);
}

#[test]
fn test_namespaces_are_isolated() {
    let probe = Arc::new(Probe::default());
    let registry = registry(&probe);
    let (home_a, home_b) = (Home::new(), Home::new());
    home_a.add_module_package("counter.pkg", &[COUNTER_MODULE]);
    home_b.add_module_package("counter.pkg", &[COUNTER_MODULE]);

    let a = install(&registry, &home_a.features("a")).unwrap();
    let b = install(&registry, &home_b.features("b")).unwrap();
    assert_ne!(a, b);
    assert_ne!(
        registry.domain("a").unwrap().id(),
        registry.domain("b").unwrap().id()
    );
    assert_eq!(probe.activated(), 2);
    let before = registry.module_records("b").unwrap();

    assert!(registry.uninstall("a"));
    assert!(!registry.is_installed("a"));
    assert!(registry.is_installed("b"));
    assert_eq!(registry.local_address("b"), Some(b));
    assert!(TcpListener::bind(a).is_ok());
    assert_eq!(probe.unloaded(), 1);

    let after = registry.module_records("b").unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id(), before[0].id());
    assert_eq!(after[0].domain(), before[0].domain());
    assert_eq!(after[0].state(), ModuleState::Active);
}

#[test]
fn test_concurrent_install_creates_one_namespace() {
    let probe = Arc::new(Probe::default());
    let registry = registry(&probe);
    let home = Home::new();
    home.add_module_package("counter.pkg", &[COUNTER_MODULE]);
    let features = home.features("shared");

    let installs: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    let address = install(&registry, &features).unwrap();
                    (address, registry.domain("shared").unwrap().id())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let (address, domain) = installs[0];
    assert!(installs.iter().all(|&(a, d)| a == address && d == domain));
    assert_eq!(registry.namespaces(), vec!["shared".to_string()]);
    assert_eq!(probe.activated(), 1);
    assert_eq!(registry.module_records("shared").unwrap().len(), 1);
}

#[test]
fn test_uninstall_round_trip() {
    let probe = Arc::new(Probe::default());
    let registry = registry(&probe);
    let home = Home::new();
    home.add_module_package("counter.pkg", &[COUNTER_MODULE]);

    install(&registry, &home.features("ns1")).unwrap();
    let records = registry.module_records("ns1").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id(), COUNTER_MODULE);
    assert_eq!(records[0].kind(), "counter");
    assert_eq!(records[0].state(), ModuleState::Active);

    let domain = registry.domain("ns1").unwrap();
    assert!(registry.uninstall("ns1"));
    assert!(domain.is_closed());
    assert_eq!(probe.unloaded(), 1);
    assert!(registry.module_records("ns1").is_none());

    assert!(!registry.uninstall("ns1"));
    assert_eq!(probe.unloaded(), 1);

    install(&registry, &home.features("ns1")).unwrap();
    assert_eq!(probe.activated(), 2);
    assert_eq!(registry.module_records("ns1").unwrap().len(), 1);
}

#[test]
fn test_bind_failure_rolls_back() {
    let probe = Arc::new(Probe::default());
    let registry = registry(&probe);
    let home = Home::new();
    home.add_module_package("counter.pkg", &[COUNTER_MODULE]);

    let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();
    let raw = format!(
        "home={};namespace=ns1;server.ip=127.0.0.1;server.port={}",
        home.path().display(),
        port
    );

    let err = install(&registry, &raw).unwrap_err();
    assert!(matches!(
        err,
        Error::Install {
            phase: InstallPhase::Bind,
            ..
        }
    ));
    assert!(matches!(
        err.root_cause(),
        Error::Bind(BindError::Io { .. })
    ));
    assert!(!registry.is_installed("ns1"));
    assert_eq!(probe.activated(), 1);
    assert_eq!(probe.unloaded(), 1);

    drop(occupied);
    install(&registry, &home.features("ns1")).unwrap();
    assert!(registry.is_installed("ns1"));
}

#[test]
fn test_missing_core_package() {
    let probe = Arc::new(Probe::default());
    let registry = registry(&probe);
    let home = Home::new();
    std::fs::remove_file(home.path().join("lib").join("latch-core.pkg")).unwrap();

    let err = install(&registry, &home.features("ns1")).unwrap_err();
    assert!(matches!(
        err,
        Error::Install {
            phase: InstallPhase::DefineDomain,
            ..
        }
    ));
    assert!(registry.namespaces().is_empty());
}

#[test]
fn test_missing_spy_package() {
    let probe = Arc::new(Probe::default());
    let registry = registry(&probe);
    let home = Home::new();
    std::fs::remove_file(home.path().join("lib").join("latch-spy.pkg")).unwrap();

    let err = install(&registry, &home.features("ns1")).unwrap_err();
    assert!(matches!(
        err,
        Error::Install {
            phase: InstallPhase::Bootstrap,
            ..
        }
    ));
}

#[test]
fn test_invalid_port_is_configure_error() {
    let probe = Arc::new(Probe::default());
    let registry = registry(&probe);
    let home = Home::new();
    let raw = format!("home={};server.port=http", home.path().display());

    let err = install(&registry, &raw).unwrap_err();
    assert!(matches!(
        err,
        Error::Install {
            phase: InstallPhase::Configure,
            ..
        }
    ));
    assert!(!registry.is_installed("default"));
}

#[test]
fn test_attach_appends_result_lines() {
    let probe = Arc::new(Probe::default());
    let dir = TempDir::new().unwrap();
    let sink = ResultSink::new(dir.path().join("latch.token"));
    let launcher = Launcher::linked(test_catalog(&probe), sink);
    let home = Home::new();

    let n1 = launcher
        .install_via_dynamic_attach(&format!("{};token=t1", home.features("n1")))
        .unwrap();
    let n2 = launcher
        .install_via_dynamic_attach(&format!("{};token=t2", home.features("n2")))
        .unwrap();

    let content = std::fs::read_to_string(launcher.sink().path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            format!("n1;t1;127.0.0.1;{}", n1.port()),
            format!("n2;t2;127.0.0.1;{}", n2.port()),
        ]
    );
}

#[test]
fn test_static_load_does_not_persist() {
    let probe = Arc::new(Probe::default());
    let dir = TempDir::new().unwrap();
    let sink = ResultSink::new(dir.path().join("latch.token"));
    let launcher = Launcher::linked(test_catalog(&probe), sink);
    let home = Home::new();

    launcher
        .install_via_static_load(&home.features("n1"))
        .unwrap();
    assert!(!launcher.sink().path().exists());
    assert!(launcher.uninstall("n1"));
}

#[test]
fn test_persist_failure_keeps_namespace() {
    let probe = Arc::new(Probe::default());
    let dir = TempDir::new().unwrap();
    let launcher = Launcher::linked(test_catalog(&probe), ResultSink::new(dir.path()));
    let home = Home::new();

    let err = launcher
        .install_via_dynamic_attach(&home.features("n1"))
        .unwrap_err();
    assert!(matches!(err, Error::Persist(_)));
    assert!(launcher.registry().is_installed("n1"));
}
