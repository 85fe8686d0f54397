//! Module lifecycle for one namespace.

mod manager;

pub use manager::ModuleManager;
