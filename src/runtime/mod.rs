//! Engine core and configuration
//!
//! The authoring side is a [`Graph`]: a controller tree with states,
//! transitions, parameters, and properties. Each actor runs an [`Instance`]
//! cloned from a graph and advanced by `update_current_state()` once per frame.

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

// Submodules
pub mod asset;
pub mod behavior;
pub mod binder;
pub mod catalog;
pub mod condition;
pub mod controller;
pub mod driver;
pub mod error;
pub mod event;
pub mod ids;
pub mod instance;
pub mod registry;
pub mod state;
pub mod transition;
pub mod value;

pub use behavior::{Behavior, BehaviorContext};
pub use controller::{Controller, Graph};
pub use driver::{TickOutcome, TransitionSource};
pub use error::{HsmError, Result};
pub use ids::{ControllerId, NameHash, StateId};
pub use instance::{clone_for_instance, Instance};
pub use state::StateRole;

use error::{ConfigError, ConfigResult};

/// What a transition landing on an Exit state does when that Exit state has
/// no outward transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExitPolicy {
    /// Land on the Entry state of the controller owning the Exit
    #[default]
    RestartOwner,
    /// Land on the root controller's Entry state
    RestartRoot,
    /// Land on the Exit state itself
    Enter,
}

/// Configuration applied to every instance created with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Exit-state fallback when no outward transition was authored
    pub exit_policy: ExitPolicy,

    /// Initial "being inspected" flag of new instances
    pub selected: bool,

    /// Run root global behaviours every tick
    pub run_global_behaviours: bool,

    /// Enable debug tracing in binaries
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exit_policy: ExitPolicy::default(),
            selected: false,
            run_global_behaviours: true,
            debug: false,
        }
    }
}

impl EngineConfig {
    /// Read a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Write this configuration as pretty JSON, atomically
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json).map_err(|e| ConfigError::AtomicWriteFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

/// Write through a temporary sibling file, sync, then rename over `path`
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        OpenOptions::new().read(true).open(parent)?.sync_all()?;
    }
    Ok(())
}
