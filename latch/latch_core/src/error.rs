//! Error types for the Latch namespace manager.
//!
//! Each subsystem has its own error type. The root error type, `Error`,
//! wraps all of them so callers at the top level can handle failures
//! uniformly, while local code can still match on precise variants.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::id::DomainId;

/// Root error type for Latch.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Symbol or package resolution errors inside a domain
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Control endpoint bind errors
    #[error("Bind error: {0}")]
    Bind(#[from] BindError),

    /// Result persistence errors
    #[error("Persist error: {0}")]
    Persist(#[from] PersistError),

    /// Module loading errors
    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    /// A failure in the registry's critical path, tagged with where it happened
    #[error("namespace '{namespace}' failed during {phase}: {source}")]
    Install {
        /// The namespace being installed or uninstalled
        namespace: String,

        /// The phase that failed
        phase: InstallPhase,

        /// The underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the namespace and phase it occurred in.
    pub fn in_phase(self, namespace: impl Into<String>, phase: InstallPhase) -> Self {
        Error::Install {
            namespace: namespace.into(),
            phase,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through any `Install` wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Install { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Phases of the install protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    /// Resolving the feature string and home directory
    Configure,

    /// Appending the spy package to the host bootstrap path
    Bootstrap,

    /// Looking up or defining the namespace domain
    DefineDomain,

    /// Resolving the core boundary exports inside the domain
    ResolveBoundary,

    /// Binding the control endpoint
    Bind,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configure => "configure",
            Self::Bootstrap => "bootstrap",
            Self::DefineDomain => "define-domain",
            Self::ResolveBoundary => "resolve-boundary",
            Self::Bind => "bind",
        };
        f.write_str(name)
    }
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The home directory could not be determined
    #[error("home directory could not be determined: {0}")]
    HomeUnresolved(String),

    /// The properties file exists but could not be read
    #[error("failed to read properties file {path}: {source}")]
    Unreadable {
        /// Path of the properties file
        path: PathBuf,

        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The properties file could not be parsed
    #[error("failed to parse properties file {path}: {reason}")]
    ParseFailed {
        /// Path of the properties file
        path: PathBuf,

        /// Why parsing failed
        reason: String,
    },

    /// A value is present but invalid
    #[error("invalid value for '{key}': {value}")]
    Invalid {
        /// The configuration key
        key: String,

        /// The offending value
        value: String,
    },

    /// A required key is missing from the core feature string
    #[error("missing required key '{0}'")]
    Missing(String),
}

/// Errors raised while resolving symbols or packages inside a domain.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// No export with this symbol is visible from the domain
    #[error("symbol '{symbol}' not found in domain '{domain}' ({domain_id})")]
    SymbolNotFound {
        /// The symbol that was requested
        symbol: String,

        /// Name of the domain
        domain: String,

        /// ID of the domain
        domain_id: DomainId,
    },

    /// The export exists but is of a different kind than requested
    #[error("symbol '{symbol}' in domain '{domain}' is a {actual}, expected a {expected}")]
    KindMismatch {
        /// The symbol that was requested
        symbol: String,

        /// Name of the domain
        domain: String,

        /// The kind the caller asked for
        expected: String,

        /// The kind actually registered
        actual: String,
    },

    /// The domain has been closed
    #[error("domain '{domain}' ({domain_id}) is closed")]
    Closed {
        /// Name of the domain
        domain: String,

        /// ID of the domain
        domain_id: DomainId,
    },

    /// The package manifest could not be read or parsed
    #[error("invalid package {path}: {reason}")]
    InvalidPackage {
        /// Path of the package file
        path: PathBuf,

        /// Why the package is invalid
        reason: String,
    },

    /// The package was built against a different boundary version
    #[error("package {path} declares abi {found}, expected {expected}")]
    AbiMismatch {
        /// Path of the package file
        path: PathBuf,

        /// ABI version this build understands
        expected: u32,

        /// ABI version declared by the package
        found: u32,
    },
}

/// Errors raised by a control endpoint.
#[derive(Debug, Error)]
pub enum BindError {
    /// The listener could not be bound
    #[error("failed to bind {address}: {source}")]
    Io {
        /// The address that was requested
        address: String,

        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configured host or port is not a valid socket address
    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),

    /// The endpoint reported itself bound but has no local address
    #[error("endpoint has no local address")]
    NotBound,

    /// The endpoint's namespace domain is gone
    #[error("endpoint domain was dropped before bind")]
    DomainGone,
}

/// Errors raised while persisting an attach result.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The result path exists but is not a writable regular file
    #[error("result file {0} is not a writable file")]
    NotWritable(PathBuf),

    /// Writing the result line failed
    #[error("failed to write result file {path}: {source}")]
    Io {
        /// Path of the result file
        path: PathBuf,

        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// No location for the result file could be determined
    #[error("no home directory for the result file")]
    NoLocation,
}

/// Errors related to module loading.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A module with this id is already loaded in the namespace
    #[error("module '{0}' is already loaded")]
    Duplicate(String),

    /// An extension in a loading chain rejected the target
    #[error("extension '{extension}' rejected {target}: {reason}")]
    Rejected {
        /// Name of the rejecting extension
        extension: String,

        /// The package file or module id being loaded
        target: String,

        /// Why it was rejected
        reason: String,
    },

    /// The module failed its own activation hook
    #[error("module '{id}' failed to activate: {reason}")]
    ActivationFailed {
        /// The module id
        id: String,

        /// Why activation failed
        reason: String,
    },

    /// A module state transition went backwards
    #[error("module '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        /// The module id
        id: String,

        /// Current state
        from: String,

        /// Requested state
        to: String,
    },
}

/// A non-fatal problem encountered while discovering provider packages.
///
/// Warnings are collected instead of propagated: one bad provider must not
/// block the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryWarning {
    /// The provider directory or package file the warning concerns
    pub path: PathBuf,

    /// A description of what went wrong
    pub reason: String,
}

impl DiscoveryWarning {
    /// Create a new discovery warning.
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Convenience constructor for a bind failure on a specific address.
pub fn bind_failed(address: SocketAddr, source: std::io::Error) -> BindError {
    BindError::Io {
        address: address.to_string(),
        source,
    }
}

/// Result type used throughout Latch.
pub type Result<T> = std::result::Result<T, Error>;
