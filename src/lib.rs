//! HSM – hierarchical state machines for game actors
//!
//! This crate implements an authored-graph / per-actor-instance state machine
//! engine with:
//! - A tree of controllers (a root machine plus nested sub-state-machines)
//!   holding states, typed parameters, and typed exposed properties
//! - Guarded transitions with first-match-wins resolution, global Any-state
//!   transitions, and one-level outward bubbling from sub-machines
//! - Clone-on-instantiate: every actor runs a private copy of the authored
//!   graph with its own value registries and behaviour instances
//! - A binder boundary through which host components push scene values into
//!   exposed properties each frame

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Engine core: authoring model, instancing, and runtime driver
pub mod runtime;

// Re-export key types for convenience
pub use runtime::{EngineConfig, Graph, Instance};

/// Current version of the engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the authored asset document format
pub const ASSET_FORMAT_VERSION: u32 = 1;
