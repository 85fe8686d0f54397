//! System-level components: bootstrap, the launcher and the result sink.

pub mod bootstrap;
pub mod launcher;
pub mod result;

pub use bootstrap::{default_catalog, init_home, register_core_exports, LayoutError};
pub use launcher::Launcher;
pub use result::{ResultSink, RESULT_FILE};
