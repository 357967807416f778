//! State behaviours and their activation context
//!
//! Behaviours are host-supplied callback sets attached to states (or to the
//! root controller as global behaviours). The authored graph holds prototypes;
//! every instance receives fresh clones, so a behaviour may keep per-actor
//! mutable fields such as a countdown without leaking them between actors.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::controller::Controller;
use super::ids::{NameHash, StateId};
use super::registry::{ParameterRegistry, PropertyRegistry, SetOutcome};
use super::value::{ParameterValue, PropertyValue};

/// Callback set attached to a state
///
/// All hooks default to no-ops. Implementors must be `Clone` so instances can
/// receive private copies; `clone_box` is provided by a blanket impl.
pub trait Behavior: BehaviorClone + Send + 'static {
    /// Catalog name used when the behaviour is persisted in an asset
    fn kind(&self) -> &str;

    /// Called when the owning state becomes current
    fn on_enter(&mut self, _ctx: &mut BehaviorContext<'_>) {}

    /// Called every tick while the owning state is current
    fn on_update(&mut self, _ctx: &mut BehaviorContext<'_>) {}

    /// Called when the owning state stops being current
    fn on_exit(&mut self, _ctx: &mut BehaviorContext<'_>) {}

    /// Authored configuration, persisted next to `kind`
    fn config(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Object-safe cloning for boxed behaviours
pub trait BehaviorClone {
    /// Clone into a new box
    fn clone_box(&self) -> Box<dyn Behavior>;
}

impl<T> BehaviorClone for T
where
    T: Behavior + Clone,
{
    fn clone_box(&self) -> Box<dyn Behavior> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Behavior> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl fmt::Debug for dyn Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior").field("kind", &self.kind()).finish()
    }
}

/// Which hook is being dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hook {
    /// `on_enter`
    Enter,
    /// `on_update`
    Update,
    /// `on_exit`
    Exit,
}

/// Activation context handed to behaviour hooks
///
/// Exposes the instance's parameters (read/write) and properties (read), the
/// controller owning the state, and the state's lock flag.
pub struct BehaviorContext<'a> {
    parameters: &'a mut ParameterRegistry,
    properties: &'a PropertyRegistry,
    controller: &'a Controller,
    state: Option<StateId>,
    state_name: Option<&'a str>,
    locked: bool,
    changed: Vec<String>,
}

impl<'a> BehaviorContext<'a> {
    /// Create a new activation context
    pub(crate) fn new(
        parameters: &'a mut ParameterRegistry,
        properties: &'a PropertyRegistry,
        controller: &'a Controller,
        state: Option<(StateId, &'a str)>,
        locked: bool,
    ) -> Self {
        Self {
            parameters,
            properties,
            controller,
            state: state.map(|(id, _)| id),
            state_name: state.map(|(_, name)| name),
            locked,
            changed: Vec::new(),
        }
    }

    /// State whose behaviour is running; `None` for global behaviours while
    /// the machine has no current state
    pub fn state(&self) -> Option<StateId> {
        self.state
    }

    /// Display name of the state
    pub fn state_name(&self) -> Option<&str> {
        self.state_name
    }

    /// Controller that owns the state
    pub fn controller(&self) -> &Controller {
        self.controller
    }

    /// Read-only view of the parameters
    pub fn parameters(&self) -> &ParameterRegistry {
        self.parameters
    }

    /// Float parameter by name
    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.parameters.get(NameHash::of(name))?.as_float()
    }

    /// Int parameter by name
    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.parameters.get(NameHash::of(name))?.as_int()
    }

    /// Bool parameter by name
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.parameters.get(NameHash::of(name))?.as_bool()
    }

    /// Write a float parameter
    pub fn set_float(&mut self, name: &str, value: f32) -> SetOutcome {
        self.set(name, ParameterValue::Float(value))
    }

    /// Write an int parameter
    pub fn set_int(&mut self, name: &str, value: i32) -> SetOutcome {
        self.set(name, ParameterValue::Int(value))
    }

    /// Write a bool parameter
    pub fn set_bool(&mut self, name: &str, value: bool) -> SetOutcome {
        self.set(name, ParameterValue::Bool(value))
    }

    /// Write any parameter value; the kind must match the stored one
    pub fn set(&mut self, name: &str, value: ParameterValue) -> SetOutcome {
        let outcome = self.parameters.set(NameHash::of(name), value);
        match outcome {
            SetOutcome::Changed => self.changed.push(name.to_string()),
            SetOutcome::Missing | SetOutcome::KindMismatch => {
                tracing::debug!(parameter = name, ?outcome, "Behaviour parameter write ignored");
            }
            SetOutcome::Unchanged => {}
        }
        outcome
    }

    /// Exposed property by name
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(NameHash::of(name))
    }

    /// Freeze transition evaluation while this state is current
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Resume transition evaluation
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Whether the state is locked
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Final lock flag and the names of parameters whose value changed
    pub(crate) fn finish(self) -> (bool, Vec<String>) {
        (self.locked, self.changed)
    }
}

/// Dispatch one hook to a behaviour list in authored order
pub(crate) fn dispatch(
    behaviours: &mut [Box<dyn Behavior>],
    hook: Hook,
    ctx: &mut BehaviorContext<'_>,
) {
    for behaviour in behaviours.iter_mut() {
        match hook {
            Hook::Enter => behaviour.on_enter(ctx),
            Hook::Update => behaviour.on_update(ctx),
            Hook::Exit => behaviour.on_exit(ctx),
        }
    }
}

/// Configuration of [`Countdown`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountdownConfig {
    /// Bool parameter raised when the countdown expires
    pub parameter: String,
    /// Updates to wait after entering the state
    pub ticks: u32,
}

/// Counts updates after entering its state, then raises a bool parameter
///
/// The remaining count is per-instance state.
#[derive(Debug, Clone)]
pub struct Countdown {
    config: CountdownConfig,
    remaining: u32,
}

impl Countdown {
    /// Catalog name
    pub const KIND: &'static str = "countdown";

    /// Create a countdown
    pub fn new(parameter: impl Into<String>, ticks: u32) -> Self {
        Self::from_config(CountdownConfig {
            parameter: parameter.into(),
            ticks,
        })
    }

    /// Create from persisted configuration
    pub fn from_config(config: CountdownConfig) -> Self {
        let remaining = config.ticks;
        Self { config, remaining }
    }

    /// Updates left before the parameter is raised
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl Behavior for Countdown {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn on_enter(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.remaining = self.config.ticks;
        ctx.set_bool(&self.config.parameter, false);
    }

    fn on_update(&mut self, ctx: &mut BehaviorContext<'_>) {
        if self.remaining == 0 {
            return;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            ctx.set_bool(&self.config.parameter, true);
        }
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

/// Configuration of [`SetParameter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetParameterConfig {
    /// Parameter to write
    pub parameter: String,
    /// Value to write
    pub value: ParameterValue,
    /// Hook on which the write happens
    pub hook: Hook,
}

/// Writes a fixed parameter value on one hook
#[derive(Debug, Clone)]
pub struct SetParameter {
    config: SetParameterConfig,
}

impl SetParameter {
    /// Catalog name
    pub const KIND: &'static str = "set-parameter";

    /// Create from configuration
    pub fn from_config(config: SetParameterConfig) -> Self {
        Self { config }
    }

    /// Write `value` when the state is entered
    pub fn when_entered(parameter: impl Into<String>, value: ParameterValue) -> Self {
        Self::from_config(SetParameterConfig {
            parameter: parameter.into(),
            value,
            hook: Hook::Enter,
        })
    }

    fn apply(&self, hook: Hook, ctx: &mut BehaviorContext<'_>) {
        if hook == self.config.hook {
            ctx.set(&self.config.parameter, self.config.value);
        }
    }
}

impl Behavior for SetParameter {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn on_enter(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.apply(Hook::Enter, ctx);
    }

    fn on_update(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.apply(Hook::Update, ctx);
    }

    fn on_exit(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.apply(Hook::Exit, ctx);
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::controller::Controller;

    fn registries() -> (ParameterRegistry, PropertyRegistry) {
        let mut params = ParameterRegistry::new();
        params.add("Done", ParameterValue::Bool(false));
        params.add("Speed", ParameterValue::Float(0.0));
        (params.freeze(), PropertyRegistry::new().freeze())
    }

    #[test]
    fn test_countdown_raises_parameter() {
        let (mut params, props) = registries();
        let controller = Controller::root("Root");
        let mut behaviours: Vec<Box<dyn Behavior>> = vec![Box::new(Countdown::new("Done", 2))];

        let mut ctx = BehaviorContext::new(&mut params, &props, &controller, None, false);
        dispatch(&mut behaviours, Hook::Enter, &mut ctx);
        dispatch(&mut behaviours, Hook::Update, &mut ctx);
        assert_eq!(ctx.get_bool("Done"), Some(false));
        dispatch(&mut behaviours, Hook::Update, &mut ctx);
        assert_eq!(ctx.get_bool("Done"), Some(true));
    }

    #[test]
    fn test_cloned_behaviours_do_not_share_fields() {
        let (mut params, props) = registries();
        let controller = Controller::root("Root");
        let prototype = Countdown::new("Done", 3);
        let mut copy = prototype.clone();

        let mut ctx = BehaviorContext::new(&mut params, &props, &controller, None, false);
        copy.on_update(&mut ctx);

        assert_eq!(copy.remaining(), 2);
        assert_eq!(prototype.remaining(), 3);

        let boxed: Box<dyn Behavior> = Box::new(prototype);
        assert_eq!(boxed.clone().config(), boxed.config());
        assert_eq!(format!("{:?}", boxed), r#"Behavior { kind: "countdown" }"#);
    }

    #[test]
    fn test_context_lock_flag() {
        let (mut params, props) = registries();
        let controller = Controller::root("Root");
        let mut ctx = BehaviorContext::new(&mut params, &props, &controller, None, false);
        ctx.lock();
        assert!(ctx.is_locked());
        assert_eq!(ctx.finish(), (true, Vec::new()));
    }

    #[test]
    fn test_set_parameter_kind_checked() {
        let (mut params, props) = registries();
        let controller = Controller::root("Root");
        let mut ctx = BehaviorContext::new(&mut params, &props, &controller, None, false);
        assert_eq!(ctx.set_bool("Speed", true), SetOutcome::KindMismatch);
        assert_eq!(ctx.set_float("Speed", 3.0), SetOutcome::Changed);
        assert_eq!(ctx.set_float("Speed", 3.0), SetOutcome::Unchanged);
        assert_eq!(ctx.get_float("Speed"), Some(3.0));
        assert_eq!(ctx.finish().1, vec!["Speed".to_string()]);
    }
}
