//! Provider extensions.
//!
//! Providers are packages dropped into `<home>/provider`. Each one can
//! contribute package loading-chain and module loading-chain extensions,
//! which the module manager consults before loading anything.

mod chain;
mod discovery;

pub use chain::{ChainEntry, ProviderChains};
pub use discovery::discover;
pub(crate) use discovery::list_packages;
