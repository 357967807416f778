//! Error types for the state-machine engine
//!
//! Domain errors use thiserror. Only authoring mistakes, structural invariant
//! violations at clone time, asset decoding, and config I/O are errors.
//! Runtime lookup misses, dangling targets, and condition type mismatches
//! degrade to "never fires" and are logged instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::ids::{ControllerId, StateId};
use super::state::StateRole;

/// Top-level engine error
#[derive(Debug, Error)]
pub enum HsmError {
    /// Authoring-related errors
    #[error("Authoring error: {0}")]
    Authoring(#[from] AuthoringError),

    /// Instancing errors
    #[error("Instance error: {0}")]
    Instance(#[from] InstanceError),

    /// Asset document errors
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by graph editing operations
#[derive(Debug, Error)]
pub enum AuthoringError {
    /// Controller not found
    #[error("Controller {0} not found")]
    ControllerNotFound(ControllerId),

    /// State not found
    #[error("State {0} not found")]
    StateNotFound(StateId),

    /// A reserved role already exists in the controller
    #[error("{controller} already has a {role:?} state")]
    DuplicateRole {
        /// Controller that already owns the role
        controller: ControllerId,
        /// Role being duplicated
        role: StateRole,
    },

    /// The root controller may not own an Up state
    #[error("Up states only exist inside sub-state-machines")]
    UpInRoot,

    /// The root controller cannot be deleted
    #[error("The root controller cannot be deleted")]
    DeleteRoot,

    /// Entry states are structural and cannot be deleted
    #[error("Entry state {0} cannot be deleted")]
    DeleteEntry(StateId),

    /// A state of this role cannot be the source of a transition
    #[error("{role:?} state {state} cannot have outgoing transitions")]
    InvalidSource {
        /// Source state
        state: StateId,
        /// Its role
        role: StateRole,
    },

    /// A state of this role cannot be the target of a transition
    #[error("{role:?} state {state} cannot be a transition target")]
    InvalidTarget {
        /// Target state
        state: StateId,
        /// Its role
        role: StateRole,
    },

    /// Entry states have exactly one outgoing transition
    #[error("Entry state {0} already has its transition")]
    EntryAlreadyWired(StateId),

    /// Outward transitions must come from Plain or Exit states
    #[error("{role:?} state {state} cannot host an outward transition")]
    OutwardFromRole {
        /// Source state
        state: StateId,
        /// Its role
        role: StateRole,
    },

    /// Outward transitions must leave the source controller
    #[error("Outward transition from {source_state} targets its own controller")]
    OutwardStaysInside {
        /// Source state
        source_state: StateId,
    },

    /// Transition index out of range
    #[error("State {state} has no transition #{index}")]
    TransitionNotFound {
        /// Source state
        state: StateId,
        /// Requested index
        index: usize,
    },

    /// Behaviour index out of range
    #[error("State {state} has no behaviour #{index}")]
    BehaviorNotFound {
        /// Owning state
        state: StateId,
        /// Requested index
        index: usize,
    },

    /// Parameter index out of range
    #[error("Parameter #{0} not found")]
    ParameterNotFound(usize),

    /// Property index out of range
    #[error("Property #{0} not found")]
    PropertyNotFound(usize),

    /// Condition operator does not fit the parameter kind
    #[error("Condition on parameter '{parameter}' does not match its kind")]
    ConditionKindMismatch {
        /// Parameter name
        parameter: String,
    },

    /// Conditions on an Entry transition would never be evaluated
    #[error("Entry state {0} transitions are unconditional")]
    ConditionOnEntry(StateId),
}

/// Convenience result alias for authoring operations
pub type AuthoringResult<T> = std::result::Result<T, AuthoringError>;

/// Structural invariant violations detected while cloning a graph
#[derive(Debug, Error)]
pub enum InstanceError {
    /// A controller has no Entry state
    #[error("{controller} ('{name}') has no Entry state")]
    MissingEntry {
        /// Controller
        controller: ControllerId,
        /// Controller name
        name: String,
    },

    /// A controller has more than one state with a reserved role
    #[error("{controller} ('{name}') has {count} {role:?} states")]
    DuplicateRole {
        /// Controller
        controller: ControllerId,
        /// Controller name
        name: String,
        /// Duplicated role
        role: StateRole,
        /// How many were found
        count: usize,
    },
}

/// Convenience result alias for instancing
pub type InstanceResult<T> = std::result::Result<T, InstanceError>;

/// Errors raised while converting asset documents
#[derive(Debug, Error)]
pub enum AssetError {
    /// Behaviour kind not present in the catalog
    #[error("Unknown behaviour kind: {0}")]
    UnknownBehavior(String),

    /// Behaviour factory rejected its configuration
    #[error("Behaviour '{kind}' rejected its configuration: {detail}")]
    InvalidBehaviorConfig {
        /// Behaviour kind
        kind: String,
        /// Factory error
        detail: String,
    },

    /// Two states share an id
    #[error("Duplicate state id {0}")]
    DuplicateStateId(StateId),

    /// Two parameters or two properties share a name
    #[error("Duplicate {registry} name '{name}'")]
    DuplicateName {
        /// `parameter` or `property`
        registry: &'static str,
        /// Repeated name
        name: String,
    },

    /// Unsupported document version
    #[error("Unsupported asset format version {0}")]
    UnsupportedVersion(u32),

    /// Structural rule broken by the document
    #[error("Invalid asset: {0}")]
    Invalid(#[from] AuthoringError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience result alias for asset operations
pub type AssetResult<T> = std::result::Result<T, AssetError>;

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Atomic write failed
    #[error("Atomic write failed for {path}: {detail}")]
    AtomicWriteFailed {
        /// Path where write failed
        path: PathBuf,
        /// Error details
        detail: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type using HsmError
pub type Result<T> = std::result::Result<T, HsmError>;
