use thiserror::Error;

use crate::conflict::Conflict;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Every failure a store reports. All are raised to the caller of the
/// triggering operation; nothing is retried or swallowed internally.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A modifier was registered with no path and the store has no default.
    #[error("cannot add a state modifier for {event} without a path")]
    MissingPath { event: String },

    /// A path with no segments once dots are collapsed.
    #[error("invalid path: {path:?}")]
    InvalidPath { path: String },

    #[error("cannot register two state modifiers for the same event and path: {event}: {path}")]
    DuplicateModifier { event: String, path: String },

    #[error("cannot register {registering} at {path}: {conflict}")]
    Conflict {
        /// What was being registered ("state modifier" or "branch").
        registering: &'static str,
        path: String,
        conflict: Conflict,
    },

    /// External code tried to fire the reserved meta-dispatch event.
    #[error("cannot manually invoke a dispatch for the \"{0}\" event")]
    ReservedEvent(String),

    #[error("store is already mounted as a branch at {path}")]
    AlreadyMounted { path: String },

    #[error("a store cannot be mounted as a branch of itself")]
    SelfMount,

    /// The would-be child already contains the would-be parent.
    #[error("mounting at {path} would make the store a branch of its own branch")]
    BranchCycle { path: String },

    #[error("dispatch depth limit of {limit} exceeded while dispatching {event}")]
    DepthExceeded { event: String, limit: usize },

    /// A listener returned an error. The remaining listeners and the
    /// meta-dispatch of that call did not run.
    #[error("listener for {event} failed")]
    Listener {
        event: String,
        #[source]
        source: anyhow::Error,
    },
}

impl StoreError {
    /// Registration-time mistakes: missing/invalid path, duplicate modifier,
    /// or a branch that cannot be mounted.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StoreError::MissingPath { .. }
                | StoreError::InvalidPath { .. }
                | StoreError::DuplicateModifier { .. }
                | StoreError::AlreadyMounted { .. }
                | StoreError::SelfMount
                | StoreError::BranchCycle { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// The engine's own sequencing was violated.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, StoreError::ReservedEvent(_))
    }
}
