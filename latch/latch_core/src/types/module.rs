//! Module records.
//!
//! A record tracks one loaded module inside a namespace.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModuleError;
use crate::id::DomainId;

/// The state of a module.
///
/// States only move forward: `Loaded` → `Active` → `Unloaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModuleState {
    /// Accepted by the loading chain, not yet activated
    Loaded,

    /// Activated and serving
    Active,

    /// Unloaded; terminal
    Unloaded,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loaded => "loaded",
            Self::Active => "active",
            Self::Unloaded => "unloaded",
        };
        f.write_str(name)
    }
}

/// A loaded module within a namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Unique id within the namespace
    id: String,

    /// Declared kind of the module
    kind: String,

    /// Package file the module was loaded from
    package: PathBuf,

    /// Domain the module's package was loaded into
    domain: DomainId,

    /// Current state
    state: ModuleState,

    /// When the module was loaded
    loaded_at: DateTime<Utc>,

    /// When the module last changed state
    last_state_change: DateTime<Utc>,
}

impl ModuleRecord {
    /// Create a record in the `Loaded` state.
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        package: impl Into<PathBuf>,
        domain: DomainId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind: kind.into(),
            package: package.into(),
            domain,
            state: ModuleState::Loaded,
            loaded_at: now,
            last_state_change: now,
        }
    }

    /// The module id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The declared kind of the module.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The backing package file.
    pub fn package(&self) -> &Path {
        &self.package
    }

    /// The loading domain.
    pub fn domain(&self) -> DomainId {
        self.domain
    }

    /// The current state.
    pub fn state(&self) -> ModuleState {
        self.state
    }

    /// When the module was loaded.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// When the module last changed state.
    pub fn last_state_change(&self) -> DateTime<Utc> {
        self.last_state_change
    }

    /// Move to a later state.
    ///
    /// Staying in the same state is a no-op; moving backwards is an error.
    pub fn transition_to(&mut self, state: ModuleState) -> Result<(), ModuleError> {
        if state < self.state {
            return Err(ModuleError::InvalidTransition {
                id: self.id.clone(),
                from: self.state.to_string(),
                to: state.to_string(),
            });
        }
        if state != self.state {
            self.state = state;
            self.last_state_change = Utc::now();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_lifecycle_is_monotonic() {
        let mut record = ModuleRecord::new("trace", "demo::Trace", "/m/trace.pkg", DomainId::new());
        assert_eq!(record.state(), ModuleState::Loaded);

        record.transition_to(ModuleState::Active).unwrap();
        assert_eq!(record.state(), ModuleState::Active);
        assert!(record.last_state_change() >= record.loaded_at());

        record.transition_to(ModuleState::Active).unwrap();

        record.transition_to(ModuleState::Unloaded).unwrap();
        let err = record.transition_to(ModuleState::Active).unwrap_err();
        assert!(matches!(err, ModuleError::InvalidTransition { .. }));
        assert_eq!(record.state(), ModuleState::Unloaded);
    }

    #[test]
    fn test_record_serialization() {
        let record = ModuleRecord::new("trace", "demo::Trace", "/m/trace.pkg", DomainId::new());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"Loaded\""));
        let back: ModuleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), "trace");
        assert_eq!(back.domain(), record.domain());
    }
}
