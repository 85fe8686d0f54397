//! # Latch Core
//!
//! `latch_core` provides the building blocks shared by every Latch crate:
//! error types, identifiers, configuration resolution and module records.
//!
//! ## Concepts
//!
//! 1. **Namespace**: a named, independently installable instance of the
//!    framework inside one host process.
//!
//! 2. **Feature string**: the flat `key=value;...` text an operator passes
//!    to install or attach. It is parsed leniently; malformed segments are
//!    dropped and missing values fall back to defaults.
//!
//! 3. **Typed configuration**: the immutable, resolved settings for one
//!    namespace, including every path derived from its home directory.
//!
//! 4. **Module record**: the tracked state of one loaded module, which only
//!    ever moves forward from loaded to active to unloaded.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all Latch components
//! - **id**: Strongly-typed identifier types
//! - **config**: Feature string parsing and configuration resolution
//! - **types**: Data structures shared across crates

pub mod config;
pub mod error;
pub mod id;
pub mod types;

pub use config::{ConfigView, FeatureMap, LaunchMode, TypedConfiguration};
pub use error::{
    BindError, ConfigError, DiscoveryWarning, Error, InstallPhase, ModuleError, PersistError,
    ResolutionError, Result,
};
pub use id::DomainId;
pub use types::{ModuleRecord, ModuleState};
