//! Engine-to-host notifications
//!
//! Each instance owns its observer list; there is no process-wide event bus,
//! so notifications from one actor never reach observers of another.

use serde::{Deserialize, Serialize};

use super::ids::{ObserverId, StateId};
use super::instance::Instance;

/// Notification delivered to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MachineEvent {
    /// A state became inactive (`active == false`, fired by every state
    /// change with the previous state) or is still active on a tick of a
    /// selected instance (`active == true`)
    StateChanged {
        /// State concerned; `None` for the first change of an instance
        state: Option<StateId>,
        /// Whether this is a per-tick "still active" notification
        active: bool,
    },

    /// A host write changed a parameter of a selected instance
    ParameterChanged {
        /// Parameter name
        name: String,
    },
}

/// Receiver of [`MachineEvent`]s
pub trait StateObserver: Send {
    /// Handle one event
    fn notify(&mut self, event: &MachineEvent);
}

impl<F> StateObserver for F
where
    F: FnMut(&MachineEvent) + Send,
{
    fn notify(&mut self, event: &MachineEvent) {
        self(event)
    }
}

impl Instance {
    /// Register an observer; returns a handle for removal
    pub fn add_observer(&mut self, observer: impl StateObserver + 'static) -> ObserverId {
        let id = ObserverId::new();
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer; returns whether it was registered
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(o, _)| *o != id);
        before != self.observers.len()
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn emit(&mut self, event: MachineEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer.notify(&event);
        }
    }
}
