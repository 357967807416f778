//! Guarded edges between states

use super::condition::Condition;
use super::ids::{StateId, StateIndex};
use super::registry::ParameterRegistry;

/// Edge from the owning state to `target`, guarded by AND-ed conditions
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Target state id, resolved anywhere in the controller tree
    pub target: StateId,

    /// Set on transitions that leave a sub-machine through its Exit state
    pub outward: bool,

    /// Guards, evaluated in order; all must pass
    pub conditions: Vec<Condition>,

    /// Arena slot of `target`, filled in when an instance is built.
    /// `None` on authored graphs and for dangling targets.
    pub(crate) resolved: Option<StateIndex>,
}

impl Transition {
    /// Unconditional transition
    pub fn new(target: StateId, outward: bool) -> Self {
        Self {
            target,
            outward,
            conditions: Vec::new(),
            resolved: None,
        }
    }

    /// Builder-style condition append
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Whether every condition passes (true for an empty list)
    pub fn conditions_pass(&self, registry: &ParameterRegistry) -> bool {
        self.conditions.iter().all(|c| c.evaluate(registry))
    }

    /// Target id if all conditions pass
    pub fn try_match(&self, registry: &ParameterRegistry) -> Option<StateId> {
        self.conditions_pass(registry).then_some(self.target)
    }

    /// Resolved arena slot if all conditions pass
    ///
    /// Dangling transitions never match.
    pub(crate) fn try_resolve(&self, registry: &ParameterRegistry) -> Option<StateIndex> {
        let index = self.resolved?;
        self.conditions_pass(registry).then_some(index)
    }

    /// Slot of the target in an instance arena, if it resolved
    pub fn resolved_target(&self) -> Option<StateIndex> {
        self.resolved
    }
}
