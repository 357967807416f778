//! States and their structural roles

use serde::{Deserialize, Serialize};

use super::behavior::Behavior;
use super::ids::{ControllerId, StateId, StateIndex};
use super::registry::ParameterRegistry;
use super::transition::Transition;
use super::value::Vec2;

/// Structural role of a state
///
/// One state type carries a role tag instead of a type per role. The role
/// decides which authoring operations are legal on the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateRole {
    /// Ordinary state with behaviours
    Plain,
    /// Where a controller starts; its single transition is taken unconditionally
    Entry,
    /// Marks sub-machine completion; hosts outward transitions
    Exit,
    /// Global transition source, consulted every tick, never current
    Any,
    /// Authoring-only "return to caller" marker inside sub-machines
    Up,
}

impl StateRole {
    /// Whether at most one state per controller may have this role
    pub fn is_reserved(&self) -> bool {
        !matches!(self, StateRole::Plain)
    }

    /// Whether transitions may leave a state with this role
    pub fn can_be_source(&self) -> bool {
        !matches!(self, StateRole::Up)
    }

    /// Whether transitions may target a state with this role
    pub fn can_be_target(&self) -> bool {
        !matches!(self, StateRole::Any | StateRole::Up)
    }

    /// Whether a state with this role may host outward transitions
    pub fn can_host_outward(&self) -> bool {
        matches!(self, StateRole::Plain | StateRole::Exit)
    }

    /// Whether a state with this role can become the current state
    pub fn can_be_current(&self) -> bool {
        !matches!(self, StateRole::Any | StateRole::Up)
    }

    /// Default display name for freshly created states
    pub fn default_name(&self) -> &'static str {
        match self {
            StateRole::Plain => "New State",
            StateRole::Entry => "Entry",
            StateRole::Exit => "Exit",
            StateRole::Any => "Any State",
            StateRole::Up => "Up",
        }
    }
}

/// A node of a controller
#[derive(Debug, Clone)]
pub struct State {
    /// Stable id, preserved by cloning
    pub id: StateId,

    /// Display name
    pub name: String,

    /// Structural role
    pub role: StateRole,

    /// Editor position; not used by the engine
    pub position: Vec2,

    /// Controller that owns this state
    pub owner: ControllerId,

    /// Outgoing transitions in authored order
    pub transitions: Vec<Transition>,

    /// Behaviours in authored order
    pub behaviours: Vec<Box<dyn Behavior>>,

    /// While set, the runtime skips transition evaluation for this state
    pub locked: bool,
}

impl State {
    /// Create a state
    pub fn new(role: StateRole, owner: ControllerId, position: Vec2) -> Self {
        Self {
            id: StateId::new(),
            name: role.default_name().to_string(),
            role,
            position,
            owner,
            transitions: Vec::new(),
            behaviours: Vec::new(),
            locked: false,
        }
    }

    /// First transition whose conditions pass, in authored order
    pub fn check_transitions(&self, registry: &ParameterRegistry) -> Option<StateId> {
        self.transitions.iter().find_map(|t| t.try_match(registry))
    }

    /// Runtime variant of `check_transitions` over resolved targets
    ///
    /// Entry states take their first resolved transition without evaluating
    /// conditions. With `outward_only`, non-outward transitions are skipped.
    pub(crate) fn resolve_transitions(
        &self,
        registry: &ParameterRegistry,
        outward_only: bool,
    ) -> Option<StateIndex> {
        if self.role == StateRole::Entry {
            return self.transitions.iter().find_map(|t| t.resolved);
        }
        self.transitions
            .iter()
            .filter(|t| !outward_only || t.outward)
            .find_map(|t| t.try_resolve(registry))
    }

    /// Whether any transition leaves the owning controller
    pub fn has_outward_transition(&self) -> bool {
        self.transitions.iter().any(|t| t.outward)
    }

    /// Whether this state has a transition to `target`
    pub fn has_transition_to(&self, target: StateId) -> bool {
        self.transitions.iter().any(|t| t.target == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::condition::{BoolOp, Condition};
    use crate::runtime::value::ParameterValue;

    fn registry(a: bool, b: bool) -> ParameterRegistry {
        let mut reg = ParameterRegistry::new();
        reg.add("A", ParameterValue::Bool(a));
        reg.add("B", ParameterValue::Bool(b));
        reg.freeze()
    }

    #[test]
    fn test_first_match_wins() {
        let mut state = State::new(StateRole::Plain, ControllerId::ROOT, Vec2::default());
        let (t1, t2, t3) = (StateId::new(), StateId::new(), StateId::new());
        state.transitions.push(Transition::new(t1, false).with_condition(Condition::bool(0, BoolOp::True)));
        state.transitions.push(Transition::new(t2, false).with_condition(Condition::bool(1, BoolOp::True)));
        state.transitions.push(Transition::new(t3, false));

        assert_eq!(state.check_transitions(&registry(false, true)), Some(t2));
        assert_eq!(state.check_transitions(&registry(true, true)), Some(t1));
        assert_eq!(state.check_transitions(&registry(false, false)), Some(t3));
    }

    #[test]
    fn test_no_transitions_no_match() {
        let state = State::new(StateRole::Plain, ControllerId::ROOT, Vec2::default());
        assert_eq!(state.check_transitions(&registry(true, true)), None);
    }

    #[test]
    fn test_entry_transition_is_forced() {
        let mut entry = State::new(StateRole::Entry, ControllerId::ROOT, Vec2::default());
        let mut t = Transition::new(StateId::new(), false).with_condition(Condition::bool(0, BoolOp::True));
        t.resolved = Some(StateIndex(7));
        entry.transitions.push(t);

        assert_eq!(entry.resolve_transitions(&registry(false, false), false), Some(StateIndex(7)));
    }

    #[test]
    fn test_outward_only_filter() {
        let mut exit = State::new(StateRole::Exit, ControllerId(1), Vec2::default());
        let mut inner = Transition::new(StateId::new(), false);
        inner.resolved = Some(StateIndex(1));
        let mut outer = Transition::new(StateId::new(), true);
        outer.resolved = Some(StateIndex(2));
        exit.transitions.push(inner);
        exit.transitions.push(outer);

        assert_eq!(exit.resolve_transitions(&registry(false, false), true), Some(StateIndex(2)));
        assert!(exit.has_outward_transition());
    }

    #[test]
    fn test_role_rules() {
        assert!(!StateRole::Up.can_be_source());
        assert!(!StateRole::Any.can_be_target());
        assert!(StateRole::Entry.can_be_target());
        assert!(!StateRole::Entry.can_host_outward());
        assert!(!StateRole::Any.can_be_current());
        assert!(!StateRole::Plain.is_reserved());
    }
}
