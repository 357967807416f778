//! Per-actor runtime instances
//!
//! Instancing deep-copies an authored [`Graph`]: registries are frozen into
//! private hash-indexed copies, states keep their ids but receive fresh
//! behaviour clones, and every transition target is resolved once into the
//! instance's own arena. The authored graph and the instance share nothing
//! mutable afterwards, so instances can be ticked on different threads.

use std::collections::HashMap;

use super::behavior::Behavior;
use super::binder::PropertyBinder;
use super::controller::{Controller, Graph};
use super::error::InstanceResult;
use super::event::StateObserver;
use super::ids::{BinderId, ControllerId, ObserverId, StateId, StateIndex};
use super::registry::{ParameterRegistry, PropertyRegistry};
use super::state::{State, StateRole};
use super::EngineConfig;

/// Private runtime copy of a graph for one actor
pub struct Instance {
    pub(crate) config: EngineConfig,
    pub(crate) controllers: Vec<Option<Controller>>,
    pub(crate) states: Vec<Option<State>>,
    pub(crate) state_index: HashMap<StateId, StateIndex>,
    /// Any states ordered root first, then by depth, then by registration
    pub(crate) any_states: Vec<StateIndex>,
    pub(crate) parameters: ParameterRegistry,
    pub(crate) properties: PropertyRegistry,
    pub(crate) global_behaviours: Vec<Box<dyn Behavior>>,
    pub(crate) current: Option<StateIndex>,
    pub(crate) previous: Option<StateIndex>,
    pub(crate) selected: bool,
    pub(crate) observers: Vec<(ObserverId, Box<dyn StateObserver>)>,
    pub(crate) binders: Vec<(BinderId, Box<dyn PropertyBinder>)>,
}

/// Clone an authored graph into a new runtime instance
pub fn clone_for_instance(graph: &Graph, config: &EngineConfig) -> InstanceResult<Instance> {
    Instance::new(graph, config)
}

impl Instance {
    /// Clone an authored graph into a new runtime instance
    ///
    /// Fails when a controller lacks its Entry state or holds a reserved role
    /// twice. Dangling transition targets and condition kind mismatches are
    /// tolerated: they are logged here once and never fire at runtime.
    pub fn new(graph: &Graph, config: &EngineConfig) -> InstanceResult<Self> {
        graph.validate()?;

        let (controllers, authored_states) = graph.arenas();
        let parameters = graph.parameters().freeze();
        let properties = graph.properties().freeze();

        let mut states: Vec<Option<State>> = authored_states.to_vec();
        let state_index: HashMap<StateId, StateIndex> = states
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (s.id, StateIndex(i))))
            .collect();

        let mut dangling = 0;
        for state in states.iter_mut().flatten() {
            for transition in &mut state.transitions {
                transition.resolved = match graph.state(transition.target) {
                    Some(target) if target.role.can_be_current() => {
                        state_index.get(&transition.target).copied()
                    }
                    Some(target) => {
                        tracing::warn!(
                            source = %state.name,
                            target = %target.name,
                            role = ?target.role,
                            "Transition targets a state that cannot become current; it will never fire"
                        );
                        None
                    }
                    None => {
                        tracing::warn!(
                            source = %state.name,
                            target = %transition.target,
                            "Transition target does not resolve; it will never fire"
                        );
                        None
                    }
                };
                if transition.resolved.is_none() {
                    dangling += 1;
                }
                for condition in &transition.conditions {
                    if !condition.binding_matches(&parameters) {
                        tracing::warn!(
                            source = %state.name,
                            parameter = condition.parameter,
                            "Condition is bound to a missing or retyped parameter; it evaluates false"
                        );
                    }
                }
            }
        }

        let mut any_states: Vec<StateIndex> = graph
            .any_states()
            .iter()
            .filter_map(|id| state_index.get(id).copied())
            .collect();
        // Stable sort keeps registration order within one depth
        any_states.sort_by_key(|i| {
            states[i.0]
                .as_ref()
                .and_then(|s| controllers.get(s.owner.0))
                .and_then(Option::as_ref)
                .map(|c| c.depth)
                .unwrap_or(u32::MAX)
        });

        tracing::info!(
            graph = graph.name(),
            states = state_index.len(),
            controllers = graph.controllers().count(),
            any_states = any_states.len(),
            dangling,
            "Created state machine instance"
        );

        Ok(Self {
            config: config.clone(),
            controllers: controllers.to_vec(),
            states,
            state_index,
            any_states,
            parameters,
            properties,
            global_behaviours: graph.global_behaviours().to_vec(),
            current: None,
            previous: None,
            selected: config.selected,
            observers: Vec::new(),
            binders: Vec::new(),
        })
    }

    /// Configuration this instance was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Instance-private parameters
    pub fn parameters(&self) -> &ParameterRegistry {
        &self.parameters
    }

    /// Instance-private exposed properties
    pub fn properties(&self) -> &PropertyRegistry {
        &self.properties
    }

    /// State by id
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.state_index.get(&id).and_then(|i| self.state_at(*i))
    }

    pub(crate) fn state_at(&self, index: StateIndex) -> Option<&State> {
        self.states.get(index.0)?.as_ref()
    }

    pub(crate) fn state_at_mut(&mut self, index: StateIndex) -> Option<&mut State> {
        self.states.get_mut(index.0)?.as_mut()
    }

    /// Controller by id
    pub fn controller(&self, id: ControllerId) -> Option<&Controller> {
        self.controllers.get(id.0)?.as_ref()
    }

    /// Controller owning a state
    pub fn owner_of(&self, id: StateId) -> Option<&Controller> {
        self.controller(self.state(id)?.owner)
    }

    /// State of a reserved role in a controller
    pub fn role_state(&self, controller: ControllerId, role: StateRole) -> Option<StateId> {
        self.role_index(controller, role)
            .and_then(|i| self.state_at(i))
            .map(|s| s.id)
    }

    pub(crate) fn role_index(&self, controller: ControllerId, role: StateRole) -> Option<StateIndex> {
        self.controller(controller)?
            .states
            .iter()
            .copied()
            .find(|i| self.state_at(*i).is_some_and(|s| s.role == role))
    }

    /// Entry state of the root controller
    pub fn entry_state(&self) -> Option<StateId> {
        self.role_state(ControllerId::ROOT, StateRole::Entry)
    }

    /// Any states in evaluation order
    pub fn any_states(&self) -> Vec<StateId> {
        self.any_states
            .iter()
            .filter_map(|i| self.state_at(*i).map(|s| s.id))
            .collect()
    }

    /// Currently active state
    pub fn current_state(&self) -> Option<&State> {
        self.current.and_then(|i| self.state_at(i))
    }

    /// Id of the currently active state
    pub fn current_state_id(&self) -> Option<StateId> {
        self.current_state().map(|s| s.id)
    }

    /// State that was active before the last change
    pub fn previous_state(&self) -> Option<&State> {
        self.previous.and_then(|i| self.state_at(i))
    }

    /// Whether the instance is being inspected
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Toggle per-tick and parameter-change notifications
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Lock or unlock a state's transition evaluation
    ///
    /// Returns false when the state is unknown.
    pub fn set_locked(&mut self, id: StateId, locked: bool) -> bool {
        let Some(index) = self.state_index.get(&id).copied() else {
            return false;
        };
        match self.state_at_mut(index) {
            Some(state) => {
                state.locked = locked;
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("states", &self.state_index.len())
            .field("current", &self.current_state().map(|s| s.name.as_str()))
            .field("selected", &self.selected)
            .field("observers", &self.observers.len())
            .field("binders", &self.binders.len())
            .finish()
    }
}

impl Graph {
    /// Clone this graph into a runtime instance with the default configuration
    pub fn instantiate(&self) -> InstanceResult<Instance> {
        Instance::new(self, &EngineConfig::default())
    }
}
