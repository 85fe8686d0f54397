//! Latch Runtime - namespace lifecycle for the Latch manager
//!
//! This crate installs and uninstalls namespaces, discovers provider
//! extensions, drives modules through their lifecycle and records attach
//! results.

pub mod module;
pub mod namespace;
pub mod provider;
pub mod system;

pub use module::ModuleManager;
pub use namespace::{NamespaceRegistry, TcpControlEndpoint};
pub use provider::{discover, ChainEntry, ProviderChains};
pub use system::{default_catalog, init_home, Launcher, ResultSink};
