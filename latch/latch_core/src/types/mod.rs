//! Data structures shared across Latch crates.

pub mod module;

pub use module::{ModuleRecord, ModuleState};
