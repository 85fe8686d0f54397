//! # Latch Isolation
//!
//! `latch_isolation` provides the isolated loading domains that keep
//! namespaces, providers and modules apart inside one host process.
//!
//! Key concepts:
//!
//! 1. **Package**: a file on disk whose manifest names the symbols it
//!    exports and the boundary ABI it was built against.
//!
//! 2. **Export Catalog**: the process-wide table mapping symbols to the
//!    factories linked into the binary.
//!
//! 3. **Isolated Domain**: a loading scope created from one package. It
//!    resolves its own declared symbols first and then asks its parent.
//!
//! 4. **Core Boundary**: the two versioned symbols the registry resolves in
//!    each namespace domain to configure it and reach its control endpoint.
//!
//! 5. **Host Runtime**: the services of the host process, such as the
//!    bootstrap path the spy package is appended to.

pub mod boundary;
pub mod contract;
pub mod domain;
pub mod host;

pub use boundary::{
    core_manifest, spy_manifest, CoreBoundary, BOUNDARY_ABI_VERSION, SYMBOL_CONFIGURE,
    SYMBOL_CONTROL_ENDPOINT,
};
pub use contract::{ControlEndpoint, Injectable, Module, ModuleLoadingChain, PackageLoadingChain};
pub use domain::{Export, ExportCatalog, ExportKind, IsolatedDomain, PackageManifest};
pub use host::{HostRuntime, LinkedHost};
