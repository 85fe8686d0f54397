//! Namespaces: the registry that installs them and the control endpoint
//! each one binds.

mod endpoint;
mod registry;

pub use endpoint::TcpControlEndpoint;
pub use registry::NamespaceRegistry;
