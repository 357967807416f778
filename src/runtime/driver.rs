//! Runtime driver: state changes, the per-tick algorithm, and the host API
//!
//! A tick runs global behaviours and the current state's `on_update`, then
//! looks for the first matching transition in three tiers: the current
//! state's own transitions, every Any state (root first, then by depth and
//! registration order), and finally the outward transitions of the owning
//! sub-machine's Exit state. The first tier that matches wins the tick.

use serde::{Deserialize, Serialize};

use super::behavior::{dispatch, Behavior, BehaviorContext, Hook};
use super::event::MachineEvent;
use super::ids::{ControllerId, NameHash, StateId, StateIndex};
use super::instance::Instance;
use super::registry::SetOutcome;
use super::state::StateRole;
use super::value::{Color, EntityRef, ParameterValue, PropertyValue, Transform, Vec2, Vec3, Vec4};
use super::ExitPolicy;

/// Which tier produced a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionSource {
    /// The current state's own transitions
    Own,
    /// An Any state's transitions
    Any,
    /// The owning sub-machine's Exit state outward transitions
    Outward,
}

/// Result of one `update_current_state` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No current state; nothing ran
    Idle,
    /// Behaviours ran but the state is locked
    Locked,
    /// No transition changed the state
    Stayed,
    /// A transition fired
    Changed {
        /// State that was left
        from: StateId,
        /// State that became current
        to: StateId,
        /// Tier the transition came from
        source: TransitionSource,
    },
}

impl TickOutcome {
    /// Whether the tick changed the current state
    pub fn changed(&self) -> bool {
        matches!(self, TickOutcome::Changed { .. })
    }
}

impl Instance {
    // ========== State changes ==========

    /// Enter the root Entry state; the first tick then follows its transition
    pub fn start(&mut self) -> bool {
        match self.entry_state() {
            Some(entry) => self.set_state(entry),
            None => false,
        }
    }

    /// Make `id` the current state
    ///
    /// Setting the current state again is a no-op. Any and Up states can never
    /// be current; those targets and unknown ids are rejected with a warning.
    /// Returns whether the state changed.
    pub fn set_state(&mut self, id: StateId) -> bool {
        let Some(index) = self.state_index.get(&id).copied() else {
            tracing::warn!(state = %id, "set_state: unknown state");
            return false;
        };
        let Some(role) = self.state_at(index).map(|s| s.role) else {
            return false;
        };
        if !role.can_be_current() {
            tracing::warn!(state = %id, ?role, "set_state: state cannot become current");
            return false;
        }
        self.change_to(index)
    }

    fn change_to(&mut self, target: StateIndex) -> bool {
        if self.current == Some(target) {
            return false;
        }
        if let Some(current) = self.current {
            self.run_state_hook(current, Hook::Exit);
        }
        self.previous = self.current;
        self.current = Some(target);
        self.run_state_hook(target, Hook::Enter);

        let previous = self.previous.and_then(|i| self.state_at(i));
        tracing::debug!(
            from = previous.map(|s| s.name.as_str()),
            to = self.state_at(target).map(|s| s.name.as_str()),
            "State changed"
        );
        let previous = previous.map(|s| s.id);
        self.emit(MachineEvent::StateChanged {
            state: previous,
            active: false,
        });
        true
    }

    // ========== Tick ==========

    /// Advance the machine by one tick
    pub fn update_current_state(&mut self) -> TickOutcome {
        let Some(current) = self.current else {
            return TickOutcome::Idle;
        };

        self.run_global_update();
        self.run_state_hook(current, Hook::Update);

        let Some(state) = self.state_at(current) else {
            return TickOutcome::Idle;
        };
        let (id, locked) = (state.id, state.locked);
        tracing::trace!(state = %state.name, locked, "Tick");

        if self.selected {
            self.emit(MachineEvent::StateChanged {
                state: Some(id),
                active: true,
            });
        }
        if locked {
            return TickOutcome::Locked;
        }

        let Some((target, source)) = self.find_transition(current) else {
            return TickOutcome::Stayed;
        };
        let target = self.apply_exit_policy(target);
        if !self.change_to(target) {
            return TickOutcome::Stayed;
        }
        match self.state_at(target) {
            Some(to) => {
                tracing::debug!(to = %to.name, ?source, "Transition fired");
                TickOutcome::Changed { from: id, to: to.id, source }
            }
            None => TickOutcome::Stayed,
        }
    }

    /// First matching transition for the current state, across all tiers
    fn find_transition(&self, current: StateIndex) -> Option<(StateIndex, TransitionSource)> {
        let state = self.state_at(current)?;

        if let Some(target) = state.resolve_transitions(&self.parameters, false) {
            return Some((target, TransitionSource::Own));
        }

        let any = self.any_states.iter().find_map(|i| {
            self.state_at(*i)?
                .resolve_transitions(&self.parameters, false)
        });
        if let Some(target) = any {
            return Some((target, TransitionSource::Any));
        }

        // One level of bubbling; the Exit state itself already evaluated
        // these transitions as its own above.
        if !self.controller(state.owner)?.is_sub_machine() {
            return None;
        }
        let exit = self.role_index(state.owner, StateRole::Exit)?;
        if exit == current {
            return None;
        }
        self.state_at(exit)?
            .resolve_transitions(&self.parameters, true)
            .map(|target| (target, TransitionSource::Outward))
    }

    /// Translate a transition landing on an Exit state with no outward wiring
    fn apply_exit_policy(&self, target: StateIndex) -> StateIndex {
        let Some(state) = self.state_at(target) else {
            return target;
        };
        if state.role != StateRole::Exit || state.has_outward_transition() {
            return target;
        }
        let restart = match self.config.exit_policy {
            ExitPolicy::Enter => return target,
            ExitPolicy::RestartOwner => state.owner,
            ExitPolicy::RestartRoot => ControllerId::ROOT,
        };
        self.role_index(restart, StateRole::Entry).unwrap_or(target)
    }

    // ========== Behaviour dispatch ==========

    fn run_state_hook(&mut self, index: StateIndex, hook: Hook) {
        let Some(state) = self.state_at_mut(index) else {
            return;
        };
        if state.behaviours.is_empty() {
            return;
        }
        let owner = state.owner;
        let mut behaviours = std::mem::take(&mut state.behaviours);
        let locked = self.dispatch_hook(&mut behaviours, hook, Some(index), owner);
        if let Some(state) = self.state_at_mut(index) {
            state.behaviours = behaviours;
            if let Some(locked) = locked {
                state.locked = locked;
            }
        }
    }

    fn run_global_update(&mut self) {
        if !self.config.run_global_behaviours || self.global_behaviours.is_empty() {
            return;
        }
        let mut behaviours = std::mem::take(&mut self.global_behaviours);
        let locked = self.dispatch_hook(&mut behaviours, Hook::Update, self.current, ControllerId::ROOT);
        self.global_behaviours = behaviours;
        if let (Some(locked), Some(current)) = (locked, self.current) {
            if let Some(state) = self.state_at_mut(current) {
                state.locked = locked;
            }
        }
    }

    /// Run one hook over `behaviours`; returns the state's lock flag afterwards
    ///
    /// Parameter writes made by the behaviours notify observers of a selected
    /// instance, like host writes do.
    fn dispatch_hook(
        &mut self,
        behaviours: &mut [Box<dyn Behavior>],
        hook: Hook,
        state: Option<StateIndex>,
        controller: ControllerId,
    ) -> Option<bool> {
        let controller = self.controllers.get(controller.0)?.as_ref()?;
        let state = state
            .and_then(|i| self.states.get(i.0))
            .and_then(Option::as_ref);
        let mut ctx = BehaviorContext::new(
            &mut self.parameters,
            &self.properties,
            controller,
            state.map(|s| (s.id, s.name.as_str())),
            state.is_some_and(|s| s.locked),
        );
        dispatch(behaviours, hook, &mut ctx);
        let (locked, changed) = ctx.finish();
        let locked = state.map(|_| locked);

        if self.selected {
            for name in changed {
                self.emit(MachineEvent::ParameterChanged { name });
            }
        }
        locked
    }

    // ========== Parameters ==========

    /// Write a parameter by name or hash; the kind must match the stored one
    pub fn set_parameter(&mut self, key: impl Into<NameHash>, value: ParameterValue) -> SetOutcome {
        let hash = key.into();
        let outcome = self.parameters.set(hash, value);
        match outcome {
            SetOutcome::Missing => {
                tracing::debug!(%hash, "Parameter lookup miss");
            }
            SetOutcome::KindMismatch => {
                tracing::warn!(%hash, kind = ?value.kind(), "Parameter write with wrong kind ignored");
            }
            SetOutcome::Changed if self.selected => {
                let name = self
                    .parameters
                    .position(hash)
                    .and_then(|i| self.parameters.entry(i))
                    .map(|e| e.name.clone())
                    .unwrap_or_default();
                self.emit(MachineEvent::ParameterChanged { name });
            }
            _ => {}
        }
        outcome
    }

    /// Write a float parameter; returns whether the write was accepted
    pub fn set_float(&mut self, key: impl Into<NameHash>, value: f32) -> bool {
        self.accepted(key, ParameterValue::Float(value))
    }

    /// Write an int parameter; returns whether the write was accepted
    pub fn set_int(&mut self, key: impl Into<NameHash>, value: i32) -> bool {
        self.accepted(key, ParameterValue::Int(value))
    }

    /// Write a bool parameter; returns whether the write was accepted
    pub fn set_bool(&mut self, key: impl Into<NameHash>, value: bool) -> bool {
        self.accepted(key, ParameterValue::Bool(value))
    }

    fn accepted(&mut self, key: impl Into<NameHash>, value: ParameterValue) -> bool {
        matches!(
            self.set_parameter(key, value),
            SetOutcome::Changed | SetOutcome::Unchanged
        )
    }

    /// Parameter value by name or hash
    pub fn get_parameter(&self, key: impl Into<NameHash>) -> Option<ParameterValue> {
        let hash = key.into();
        let value = self.parameters.get(hash).copied();
        if value.is_none() {
            tracing::debug!(%hash, "Parameter lookup miss");
        }
        value
    }

    /// Float parameter by name or hash
    pub fn get_float(&self, key: impl Into<NameHash>) -> Option<f32> {
        self.get_parameter(key)?.as_float()
    }

    /// Int parameter by name or hash
    pub fn get_int(&self, key: impl Into<NameHash>) -> Option<i32> {
        self.get_parameter(key)?.as_int()
    }

    /// Bool parameter by name or hash
    pub fn get_bool(&self, key: impl Into<NameHash>) -> Option<bool> {
        self.get_parameter(key)?.as_bool()
    }

    // ========== Properties ==========

    /// Exposed property by name or hash
    pub fn get_property(&self, key: impl Into<NameHash>) -> Option<&PropertyValue> {
        let hash = key.into();
        let value = self.properties.get(hash);
        if value.is_none() {
            tracing::debug!(%hash, "Property lookup miss");
        }
        value
    }

    /// Write an exposed property; the kind must match the stored one
    pub fn set_property(&mut self, key: impl Into<NameHash>, value: PropertyValue) -> SetOutcome {
        let hash = key.into();
        let outcome = self.properties.set(hash, value);
        match outcome {
            SetOutcome::Missing => tracing::debug!(%hash, "Property lookup miss"),
            SetOutcome::KindMismatch => {
                tracing::warn!(%hash, kind = ?value.kind(), "Property write with wrong kind ignored")
            }
            _ => {}
        }
        outcome
    }

    /// Float property
    pub fn get_float_property(&self, key: impl Into<NameHash>) -> Option<f32> {
        match self.get_property(key)? {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Bool property
    pub fn get_bool_property(&self, key: impl Into<NameHash>) -> Option<bool> {
        match self.get_property(key)? {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Transform property
    pub fn get_transform(&self, key: impl Into<NameHash>) -> Option<Transform> {
        match self.get_property(key)? {
            PropertyValue::Transform(v) => Some(*v),
            _ => None,
        }
    }

    /// Vector2 property
    pub fn get_vector2(&self, key: impl Into<NameHash>) -> Option<Vec2> {
        match self.get_property(key)? {
            PropertyValue::Vector2(v) => Some(*v),
            _ => None,
        }
    }

    /// Vector3 property
    pub fn get_vector3(&self, key: impl Into<NameHash>) -> Option<Vec3> {
        match self.get_property(key)? {
            PropertyValue::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    /// Vector4 property
    pub fn get_vector4(&self, key: impl Into<NameHash>) -> Option<Vec4> {
        match self.get_property(key)? {
            PropertyValue::Vector4(v) => Some(*v),
            _ => None,
        }
    }

    /// Color property
    pub fn get_color(&self, key: impl Into<NameHash>) -> Option<Color> {
        match self.get_property(key)? {
            PropertyValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    /// Entity property; `None` when unset or not an entity property
    pub fn get_entity(&self, key: impl Into<NameHash>) -> Option<EntityRef> {
        match self.get_property(key)? {
            PropertyValue::Entity(v) => *v,
            _ => None,
        }
    }
}
