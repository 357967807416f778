//! Controller tree and authoring operations
//!
//! A [`Graph`] is the authored asset: an arena of controllers (the root plus
//! nested sub-state-machines), an arena of states, the parameter and property
//! registries, and the root's global behaviours. Parent, root, and owner links
//! are arena indices, so a clone of the arenas is a consistent tree with no
//! pointer fix-ups.

use std::collections::{HashMap, HashSet};

use super::behavior::Behavior;
use super::condition::Condition;
use super::error::{AuthoringError, AuthoringResult, InstanceError, InstanceResult};
use super::ids::{ControllerId, StateId, StateIndex};
use super::registry::{ParameterRegistry, PropertyRegistry};
use super::state::{State, StateRole};
use super::transition::Transition;
use super::value::{ParameterValue, PropertyValue, Vec2};

/// Reserved roles checked for uniqueness per controller
const RESERVED_ROLES: [StateRole; 4] = [
    StateRole::Entry,
    StateRole::Exit,
    StateRole::Any,
    StateRole::Up,
];

/// A node of the state-machine tree
#[derive(Debug, Clone)]
pub struct Controller {
    /// Arena slot of this controller
    pub id: ControllerId,

    /// Display name
    pub name: String,

    /// Editor position of the sub-machine node; not used by the engine
    pub position: Vec2,

    /// Parent controller (`None` for the root)
    pub parent: Option<ControllerId>,

    /// Root ("main") controller; the root points at itself
    pub root: ControllerId,

    /// Nesting depth; 0 for the root
    pub depth: u32,

    /// Owned states in creation order
    pub states: Vec<StateIndex>,

    /// Child sub-state-machines in creation order
    pub children: Vec<ControllerId>,
}

impl Controller {
    /// Create a root controller
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            id: ControllerId::ROOT,
            name: name.into(),
            position: Vec2::default(),
            parent: None,
            root: ControllerId::ROOT,
            depth: 0,
            states: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Whether this controller is a sub-state-machine
    pub fn is_sub_machine(&self) -> bool {
        self.parent.is_some()
    }
}

/// Authored state-machine asset
#[derive(Debug, Clone)]
pub struct Graph {
    controllers: Vec<Option<Controller>>,
    states: Vec<Option<State>>,
    state_index: HashMap<StateId, StateIndex>,
    any_states: Vec<StateId>,
    parameters: ParameterRegistry,
    properties: PropertyRegistry,
    global_behaviours: Vec<Box<dyn Behavior>>,
}

impl Graph {
    /// Create a graph whose root owns Entry, Exit, and Any states
    pub fn new(name: impl Into<String>) -> Self {
        let mut graph = Self::empty(name);
        for (role, position) in [
            (StateRole::Entry, Vec2::new(0.0, 0.0)),
            (StateRole::Exit, Vec2::new(400.0, 0.0)),
            (StateRole::Any, Vec2::new(0.0, 300.0)),
        ] {
            graph.push_state(State::new(role, ControllerId::ROOT, position));
        }
        graph
    }

    /// Create a graph with a bare root controller and no states
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            controllers: vec![Some(Controller::root(name))],
            states: Vec::new(),
            state_index: HashMap::new(),
            any_states: Vec::new(),
            parameters: ParameterRegistry::new(),
            properties: PropertyRegistry::new(),
            global_behaviours: Vec::new(),
        }
    }

    // ========== Lookup ==========

    /// Root controller id
    pub fn root(&self) -> ControllerId {
        ControllerId::ROOT
    }

    /// Display name of the graph (its root controller)
    pub fn name(&self) -> &str {
        self.controllers[0]
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or_default()
    }

    /// Controller by id
    pub fn controller(&self, id: ControllerId) -> Option<&Controller> {
        self.controllers.get(id.0)?.as_ref()
    }

    pub(crate) fn controller_mut(&mut self, id: ControllerId) -> AuthoringResult<&mut Controller> {
        self.controllers
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(AuthoringError::ControllerNotFound(id))
    }

    /// Live controllers in arena order
    pub fn controllers(&self) -> impl Iterator<Item = &Controller> {
        self.controllers.iter().flatten()
    }

    /// State by id
    pub fn state(&self, id: StateId) -> Option<&State> {
        let index = self.state_index.get(&id)?;
        self.states.get(index.0)?.as_ref()
    }

    pub(crate) fn state_mut(&mut self, id: StateId) -> Option<&mut State> {
        let index = self.state_index.get(&id)?;
        self.states.get_mut(index.0)?.as_mut()
    }

    fn require_state(&self, id: StateId) -> AuthoringResult<&State> {
        self.state(id).ok_or(AuthoringError::StateNotFound(id))
    }

    fn require_state_mut(&mut self, id: StateId) -> AuthoringResult<&mut State> {
        self.state_mut(id).ok_or(AuthoringError::StateNotFound(id))
    }

    /// Live states in arena order
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.iter().flatten()
    }

    /// States owned directly by a controller, in creation order
    pub fn states_of(&self, controller: ControllerId) -> Vec<&State> {
        self.controller(controller)
            .map(|c| {
                c.states
                    .iter()
                    .filter_map(|i| self.states.get(i.0).and_then(Option::as_ref))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of live states
    pub fn state_count(&self) -> usize {
        self.state_index.len()
    }

    /// Any states across the tree in registration order
    pub fn any_states(&self) -> &[StateId] {
        &self.any_states
    }

    /// State of a reserved role owned by a controller
    pub fn role_state(&self, controller: ControllerId, role: StateRole) -> Option<StateId> {
        self.states_of(controller)
            .into_iter()
            .find(|s| s.role == role)
            .map(|s| s.id)
    }

    /// Entry state of a controller
    pub fn get_entry_state(&self, controller: ControllerId) -> Option<StateId> {
        self.role_state(controller, StateRole::Entry)
    }

    /// Exit state of a controller
    pub fn get_exit_state(&self, controller: ControllerId) -> Option<StateId> {
        self.role_state(controller, StateRole::Exit)
    }

    /// Ancestors of a controller, ordered root first and ending with itself
    pub fn get_parents(&self, controller: ControllerId) -> Vec<ControllerId> {
        let mut chain = Vec::new();
        let mut cursor = self.controller(controller);
        while let Some(c) = cursor {
            chain.push(c.id);
            cursor = c.parent.and_then(|p| self.controller(p));
        }
        chain.reverse();
        chain
    }

    /// Slash-separated controller path for display, e.g. `Root/Combat/Melee`
    pub fn path(&self, controller: ControllerId) -> String {
        self.get_parents(controller)
            .into_iter()
            .filter_map(|id| self.controller(id).map(|c| c.name.as_str()))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Whether `controller` is `ancestor` or nested anywhere below it
    pub fn is_within(&self, controller: ControllerId, ancestor: ControllerId) -> bool {
        self.get_parents(controller).contains(&ancestor)
    }

    /// Transitions leaving a state
    pub fn transitions(&self, source: StateId) -> AuthoringResult<&[Transition]> {
        Ok(&self.require_state(source)?.transitions)
    }

    /// Every `(source, transition index)` whose target is `target`
    pub fn transitions_targeting(&self, target: StateId) -> Vec<(StateId, usize)> {
        self.states()
            .flat_map(|s| {
                s.transitions
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.target == target)
                    .map(move |(i, _)| (s.id, i))
            })
            .collect()
    }

    // ========== States and sub-machines ==========

    /// Create a state in a controller
    pub fn create_state(
        &mut self,
        controller: ControllerId,
        role: StateRole,
        position: Vec2,
    ) -> AuthoringResult<StateId> {
        let owner = self
            .controller(controller)
            .ok_or(AuthoringError::ControllerNotFound(controller))?;
        if role == StateRole::Up && !owner.is_sub_machine() {
            return Err(AuthoringError::UpInRoot);
        }
        if role.is_reserved() && self.role_state(controller, role).is_some() {
            return Err(AuthoringError::DuplicateRole { controller, role });
        }
        let state = State::new(role, controller, position);
        let id = state.id;
        self.push_state(state);
        Ok(id)
    }

    /// Create a plain state with a display name
    pub fn add_state(
        &mut self,
        controller: ControllerId,
        name: impl Into<String>,
    ) -> AuthoringResult<StateId> {
        let id = self.create_state(controller, StateRole::Plain, Vec2::default())?;
        self.require_state_mut(id)?.name = name.into();
        Ok(id)
    }

    /// Rename a state
    pub fn rename_state(&mut self, id: StateId, name: impl Into<String>) -> AuthoringResult<()> {
        self.require_state_mut(id)?.name = name.into();
        Ok(())
    }

    /// Move a state in the editor
    pub fn set_state_position(&mut self, id: StateId, position: Vec2) -> AuthoringResult<()> {
        self.require_state_mut(id)?.position = position;
        Ok(())
    }

    /// Create a sub-state-machine with its local Entry, Exit, Any, and Up states
    pub fn create_substate_machine(
        &mut self,
        parent: ControllerId,
        name: impl Into<String>,
        position: Vec2,
    ) -> AuthoringResult<ControllerId> {
        let id = self.push_controller(parent, name.into(), position)?;
        for (role, position) in [
            (StateRole::Entry, Vec2::new(0.0, 0.0)),
            (StateRole::Exit, Vec2::new(400.0, 20.0)),
            (StateRole::Any, Vec2::new(20.0, 300.0)),
            (StateRole::Up, Vec2::new(400.0, 300.0)),
        ] {
            self.push_state(State::new(role, id, position));
        }
        Ok(id)
    }

    /// Delete a state and every transition that targets it
    ///
    /// Returns how many incoming transitions were removed.
    pub fn delete_state(&mut self, id: StateId) -> AuthoringResult<usize> {
        let state = self.require_state(id)?;
        if state.role == StateRole::Entry {
            return Err(AuthoringError::DeleteEntry(id));
        }
        self.remove_state_slot(id);
        let removed = self.strip_transitions_to(&HashSet::from([id]));
        tracing::debug!(state = %id, removed, "Deleted state");
        Ok(removed)
    }

    /// Delete a sub-state-machine, its nested sub-machines, and all their
    /// states; transitions elsewhere that pointed into it are removed too.
    pub fn delete_substate_machine(&mut self, id: ControllerId) -> AuthoringResult<usize> {
        if id.is_root() {
            return Err(AuthoringError::DeleteRoot);
        }
        let parent = self
            .controller(id)
            .ok_or(AuthoringError::ControllerNotFound(id))?
            .parent;

        let subtree = self.subtree(id);
        let mut doomed = HashSet::new();
        for controller in &subtree {
            for state in self.states_of(*controller) {
                doomed.insert(state.id);
            }
        }
        for state in &doomed {
            self.remove_state_slot(*state);
        }
        for controller in &subtree {
            self.controllers[controller.0] = None;
        }
        if let Some(parent) = parent {
            self.controller_mut(parent)?.children.retain(|c| *c != id);
        }
        let removed = self.strip_transitions_to(&doomed);
        tracing::debug!(
            controller = %id,
            states = doomed.len(),
            removed,
            "Deleted sub-state-machine"
        );
        Ok(removed)
    }

    /// Controllers in the subtree rooted at `id`, parents before children
    fn subtree(&self, id: ControllerId) -> Vec<ControllerId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(c) = self.controller(next) {
                out.push(next);
                stack.extend(c.children.iter().rev().copied());
            }
        }
        out
    }

    // ========== Transitions ==========

    /// Add a transition from `source` to `target`
    ///
    /// Returns the transition's index in the source's list.
    pub fn add_transition(
        &mut self,
        source: StateId,
        target: StateId,
        outward: bool,
    ) -> AuthoringResult<usize> {
        let from = self.require_state(source)?;
        self.require_state(target)?;
        if from.role == StateRole::Entry && !from.transitions.is_empty() {
            return Err(AuthoringError::EntryAlreadyWired(source));
        }
        self.check_edge(from, target, outward)?;

        let state = self.require_state_mut(source)?;
        state.transitions.push(Transition::new(target, outward));
        Ok(state.transitions.len() - 1)
    }

    /// Role rules for an edge leaving `source`
    ///
    /// An unknown target passes; instances tolerate it and it never fires.
    pub(crate) fn check_edge(&self, source: &State, target: StateId, outward: bool) -> AuthoringResult<()> {
        if !source.role.can_be_source() {
            return Err(AuthoringError::InvalidSource { state: source.id, role: source.role });
        }
        if outward && !source.role.can_host_outward() {
            return Err(AuthoringError::OutwardFromRole { state: source.id, role: source.role });
        }
        let Some(to) = self.state(target) else {
            return Ok(());
        };
        if !to.role.can_be_target() {
            return Err(AuthoringError::InvalidTarget { state: target, role: to.role });
        }
        if outward && self.is_within(to.owner, source.owner) {
            return Err(AuthoringError::OutwardStaysInside { source_state: source.id });
        }
        Ok(())
    }

    /// Remove one transition by index
    pub fn remove_transition(&mut self, source: StateId, index: usize) -> AuthoringResult<Transition> {
        let state = self.require_state_mut(source)?;
        if index >= state.transitions.len() {
            return Err(AuthoringError::TransitionNotFound { state: source, index });
        }
        Ok(state.transitions.remove(index))
    }

    /// Remove every transition from `source` to `target`; returns how many
    pub fn remove_transitions_to(&mut self, source: StateId, target: StateId) -> AuthoringResult<usize> {
        let state = self.require_state_mut(source)?;
        let before = state.transitions.len();
        state.transitions.retain(|t| t.target != target);
        Ok(before - state.transitions.len())
    }

    /// Append a condition to a transition, checking it against the parameter kind
    pub fn add_condition(
        &mut self,
        source: StateId,
        transition: usize,
        condition: Condition,
    ) -> AuthoringResult<()> {
        let entry = self
            .parameters
            .entry(condition.parameter)
            .ok_or(AuthoringError::ParameterNotFound(condition.parameter))?;
        if entry.value.kind() != condition.comparison.parameter_kind() {
            return Err(AuthoringError::ConditionKindMismatch {
                parameter: entry.name.clone(),
            });
        }

        let state = self.require_state_mut(source)?;
        if state.role == StateRole::Entry {
            return Err(AuthoringError::ConditionOnEntry(source));
        }
        let t = state
            .transitions
            .get_mut(transition)
            .ok_or(AuthoringError::TransitionNotFound { state: source, index: transition })?;
        t.conditions.push(condition);
        Ok(())
    }

    // ========== Behaviours ==========

    /// Attach a behaviour prototype to a state
    pub fn add_behaviour(&mut self, state: StateId, behaviour: Box<dyn Behavior>) -> AuthoringResult<()> {
        self.require_state_mut(state)?.behaviours.push(behaviour);
        Ok(())
    }

    /// Detach a behaviour prototype from a state
    pub fn remove_behaviour(&mut self, state: StateId, index: usize) -> AuthoringResult<Box<dyn Behavior>> {
        let s = self.require_state_mut(state)?;
        if index >= s.behaviours.len() {
            return Err(AuthoringError::BehaviorNotFound { state, index });
        }
        Ok(s.behaviours.remove(index))
    }

    /// Attach a behaviour that runs every tick regardless of the current state
    pub fn add_global_behaviour(&mut self, behaviour: Box<dyn Behavior>) {
        self.global_behaviours.push(behaviour);
    }

    /// Global behaviour prototypes
    pub fn global_behaviours(&self) -> &[Box<dyn Behavior>] {
        &self.global_behaviours
    }

    // ========== Parameters and properties ==========

    /// Parameter registry
    pub fn parameters(&self) -> &ParameterRegistry {
        &self.parameters
    }

    /// Property registry
    pub fn properties(&self) -> &PropertyRegistry {
        &self.properties
    }

    /// Add a parameter; the name is made unique. Returns its index.
    pub fn add_parameter(&mut self, name: &str, value: ParameterValue) -> usize {
        self.parameters.add(name, value)
    }

    /// Rename a parameter; returns the name actually assigned
    pub fn rename_parameter(&mut self, index: usize, name: &str) -> AuthoringResult<String> {
        self.parameters
            .rename(index, name)
            .ok_or(AuthoringError::ParameterNotFound(index))
    }

    /// Replace a parameter's authored default (its kind may change)
    pub fn set_parameter_value(&mut self, index: usize, value: ParameterValue) -> AuthoringResult<()> {
        let slot = self
            .parameters
            .value_mut(index)
            .ok_or(AuthoringError::ParameterNotFound(index))?;
        *slot = value;
        Ok(())
    }

    /// Remove a parameter
    ///
    /// Conditions bound to it are dropped and conditions bound to later
    /// parameters are shifted, keeping every binding on the same parameter.
    pub fn remove_parameter(&mut self, index: usize) -> AuthoringResult<String> {
        let entry = self
            .parameters
            .remove(index)
            .ok_or(AuthoringError::ParameterNotFound(index))?;
        let mut dropped = 0;
        for state in self.states.iter_mut().flatten() {
            for transition in &mut state.transitions {
                let before = transition.conditions.len();
                transition.conditions.retain(|c| c.parameter != index);
                dropped += before - transition.conditions.len();
                for condition in &mut transition.conditions {
                    if condition.parameter > index {
                        condition.parameter -= 1;
                    }
                }
            }
        }
        tracing::debug!(parameter = %entry.name, dropped, "Removed parameter");
        Ok(entry.name)
    }

    /// Add an exposed property; the name is made unique. Returns its index.
    pub fn add_property(&mut self, name: &str, value: PropertyValue) -> usize {
        self.properties.add(name, value)
    }

    /// Rename a property; returns the name actually assigned
    pub fn rename_property(&mut self, index: usize, name: &str) -> AuthoringResult<String> {
        self.properties
            .rename(index, name)
            .ok_or(AuthoringError::PropertyNotFound(index))
    }

    /// Replace a property's authored default
    pub fn set_property_value(&mut self, index: usize, value: PropertyValue) -> AuthoringResult<()> {
        let slot = self
            .properties
            .value_mut(index)
            .ok_or(AuthoringError::PropertyNotFound(index))?;
        *slot = value;
        Ok(())
    }

    /// Remove a property
    pub fn remove_property(&mut self, index: usize) -> AuthoringResult<String> {
        self.properties
            .remove(index)
            .map(|e| e.name)
            .ok_or(AuthoringError::PropertyNotFound(index))
    }

    // ========== Structure ==========

    /// Check the per-controller role invariants an instance depends on
    ///
    /// Every controller needs exactly one Entry state; Exit, Any, and Up are
    /// optional but unique.
    pub fn validate(&self) -> InstanceResult<()> {
        for controller in self.controllers() {
            let states = self.states_of(controller.id);
            for role in RESERVED_ROLES {
                let count = states.iter().filter(|s| s.role == role).count();
                if role == StateRole::Entry && count == 0 {
                    return Err(InstanceError::MissingEntry {
                        controller: controller.id,
                        name: controller.name.clone(),
                    });
                }
                if count > 1 {
                    return Err(InstanceError::DuplicateRole {
                        controller: controller.id,
                        name: controller.name.clone(),
                        role,
                        count,
                    });
                }
            }
        }
        Ok(())
    }

    // ========== Arena plumbing ==========

    /// Append a controller under `parent` without creating any states
    pub(crate) fn push_controller(
        &mut self,
        parent: ControllerId,
        name: String,
        position: Vec2,
    ) -> AuthoringResult<ControllerId> {
        let (root, depth) = {
            let p = self
                .controller(parent)
                .ok_or(AuthoringError::ControllerNotFound(parent))?;
            (p.root, p.depth + 1)
        };
        let id = ControllerId(self.controllers.len());
        self.controllers.push(Some(Controller {
            id,
            name,
            position,
            parent: Some(parent),
            root,
            depth,
            states: Vec::new(),
            children: Vec::new(),
        }));
        self.controller_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Append a state to the arena and its owner without role checks
    ///
    /// The owner must exist and the id must be unused; callers check both.
    pub(crate) fn push_state(&mut self, state: State) -> StateIndex {
        let index = StateIndex(self.states.len());
        if let Some(Some(owner)) = self.controllers.get_mut(state.owner.0) {
            owner.states.push(index);
        }
        if state.role == StateRole::Any {
            self.any_states.push(state.id);
        }
        self.state_index.insert(state.id, index);
        self.states.push(Some(state));
        index
    }

    fn remove_state_slot(&mut self, id: StateId) {
        let Some(index) = self.state_index.remove(&id) else {
            return;
        };
        if let Some(state) = self.states[index.0].take() {
            if let Some(Some(owner)) = self.controllers.get_mut(state.owner.0) {
                owner.states.retain(|i| *i != index);
            }
        }
        self.any_states.retain(|s| *s != id);
    }

    fn strip_transitions_to(&mut self, targets: &HashSet<StateId>) -> usize {
        let mut removed = 0;
        for state in self.states.iter_mut().flatten() {
            let before = state.transitions.len();
            state.transitions.retain(|t| !targets.contains(&t.target));
            removed += before - state.transitions.len();
        }
        removed
    }

    /// Raw arenas, for instancing
    pub(crate) fn arenas(&self) -> (&[Option<Controller>], &[Option<State>]) {
        (&self.controllers, &self.states)
    }

    /// Whether a state id is already taken
    pub(crate) fn contains_state(&self, id: StateId) -> bool {
        self.state_index.contains_key(&id)
    }
}
