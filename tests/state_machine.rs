//! Integration tests for the per-tick algorithm
//!
//! Covers first-match-wins, self-loop suppression, Any-state precedence,
//! outward bubbling from sub-machines, and locking.

use hsm::runtime::behavior::{Behavior, BehaviorContext};
use hsm::runtime::condition::{BoolOp, Condition, FloatOp, IntOp};
use hsm::runtime::event::MachineEvent;
use hsm::runtime::value::{ParameterValue, Vec2};
use hsm::runtime::{Graph, Instance, StateId, StateRole, TickOutcome, TransitionSource};
use parking_lot::Mutex;
use std::sync::Arc;

type Log = Arc<Mutex<Vec<String>>>;

/// Records hooks and optionally locks its state on enter
#[derive(Clone)]
struct Recorder {
    name: &'static str,
    lock_on_enter: bool,
    log: Log,
}

impl Recorder {
    fn new(name: &'static str, log: &Log) -> Box<Self> {
        Box::new(Self {
            name,
            lock_on_enter: false,
            log: log.clone(),
        })
    }
}

impl Behavior for Recorder {
    fn kind(&self) -> &str {
        "recorder"
    }

    fn on_enter(&mut self, ctx: &mut BehaviorContext<'_>) {
        if self.lock_on_enter {
            ctx.lock();
        }
        self.log.lock().push(format!("{}:enter", self.name));
    }

    fn on_update(&mut self, _ctx: &mut BehaviorContext<'_>) {
        self.log.lock().push(format!("{}:update", self.name));
    }

    fn on_exit(&mut self, _ctx: &mut BehaviorContext<'_>) {
        self.log.lock().push(format!("{}:exit", self.name));
    }
}

fn events(instance: &mut Instance) -> Arc<Mutex<Vec<MachineEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    instance.add_observer(move |e: &MachineEvent| sink.lock().push(e.clone()));
    events
}

#[test]
fn test_round_trip_scenario() {
    let mut graph = Graph::new("Root");
    let root = graph.root();
    let go = graph.add_parameter("Go", ParameterValue::Bool(false));
    let entry = graph.get_entry_state(root).unwrap();
    let a = graph.add_state(root, "A").unwrap();
    let b = graph.add_state(root, "B").unwrap();
    graph.add_transition(entry, a, false).unwrap();
    let t = graph.add_transition(a, b, false).unwrap();
    graph.add_condition(a, t, Condition::bool(go, BoolOp::True)).unwrap();

    let mut instance = graph.instantiate().unwrap();
    assert!(instance.set_state(entry));
    instance.update_current_state();
    assert_eq!(instance.current_state_id(), Some(a));

    instance.set_bool("Go", true);
    instance.update_current_state();
    assert_eq!(instance.current_state_id(), Some(b));
}

#[test]
fn test_first_match_wins() {
    let mut graph = Graph::new("Root");
    let root = graph.root();
    let speed = graph.add_parameter("Speed", ParameterValue::Float(0.0));
    let s = graph.add_state(root, "S").unwrap();
    let t1 = graph.add_state(root, "T1").unwrap();
    let t2 = graph.add_state(root, "T2").unwrap();
    let t3 = graph.add_state(root, "T3").unwrap();

    let i = graph.add_transition(s, t1, false).unwrap();
    graph.add_condition(s, i, Condition::float(speed, FloatOp::Greater, 10.0)).unwrap();
    let i = graph.add_transition(s, t2, false).unwrap();
    graph.add_condition(s, i, Condition::float(speed, FloatOp::Greater, 1.0)).unwrap();
    let i = graph.add_transition(s, t3, false).unwrap();
    graph.add_condition(s, i, Condition::float(speed, FloatOp::Greater, 0.5)).unwrap();

    assert_eq!(
        graph.state(s).unwrap().check_transitions(&graph.parameters().freeze()),
        None
    );

    let mut instance = graph.instantiate().unwrap();
    instance.set_state(s);
    instance.set_float("Speed", 5.0);
    assert_eq!(
        instance.update_current_state(),
        TickOutcome::Changed { from: s, to: t2, source: TransitionSource::Own }
    );
    assert_ne!(instance.current_state_id(), Some(t3));
}

#[test]
fn test_self_loop_is_suppressed() {
    let mut graph = Graph::new("Root");
    let s = graph.add_state(graph.root(), "S").unwrap();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    graph.add_behaviour(s, Recorder::new("S", &log)).unwrap();
    graph.add_transition(s, s, false).unwrap();

    let mut instance = graph.instantiate().unwrap();
    instance.set_state(s);
    let seen = events(&mut instance);
    log.lock().clear();

    assert!(!instance.set_state(s));
    assert!(log.lock().is_empty());
    assert!(seen.lock().is_empty());

    // An unconditional transition to itself keeps the state without hooks
    assert_eq!(instance.update_current_state(), TickOutcome::Stayed);
    assert_eq!(*log.lock(), vec!["S:update"]);
    assert!(seen.lock().is_empty());
}

#[test]
fn test_state_change_notifies_previous_state() {
    let mut graph = Graph::new("Root");
    let a = graph.add_state(graph.root(), "A").unwrap();
    let b = graph.add_state(graph.root(), "B").unwrap();
    let mut instance = graph.instantiate().unwrap();
    let seen = events(&mut instance);

    instance.set_state(a);
    instance.set_state(b);
    instance.update_current_state();
    assert_eq!(
        *seen.lock(),
        vec![
            MachineEvent::StateChanged { state: None, active: false },
            MachineEvent::StateChanged { state: Some(a), active: false },
        ]
    );

    instance.set_selected(true);
    instance.update_current_state();
    assert_eq!(
        seen.lock().last(),
        Some(&MachineEvent::StateChanged { state: Some(b), active: true })
    );
}

#[test]
fn test_any_state_precedence() {
    let mut graph = Graph::new("Root");
    let root = graph.root();
    let hit = graph.add_parameter("Hit", ParameterValue::Bool(false));
    let s = graph.add_state(root, "S").unwrap();
    let other = graph.add_state(root, "Other").unwrap();
    let stagger = graph.add_state(root, "Stagger").unwrap();
    let any = graph.role_state(root, StateRole::Any).unwrap();

    let i = graph.add_transition(s, other, false).unwrap();
    graph.add_condition(s, i, Condition::bool(hit, BoolOp::False)).unwrap();
    let i = graph.add_transition(any, stagger, false).unwrap();
    graph.add_condition(any, i, Condition::bool(hit, BoolOp::True)).unwrap();

    let mut instance = graph.instantiate().unwrap();
    instance.set_state(s);
    instance.set_bool("Hit", true);
    assert_eq!(
        instance.update_current_state(),
        TickOutcome::Changed { from: s, to: stagger, source: TransitionSource::Any }
    );

    // Own transitions are checked before Any states
    instance.set_state(s);
    instance.set_bool("Hit", false);
    let outcome = instance.update_current_state();
    assert_eq!(
        outcome,
        TickOutcome::Changed { from: s, to: other, source: TransitionSource::Own }
    );
}

#[test]
fn test_any_states_root_first() {
    let mut graph = Graph::new("Root");
    let root = graph.root();
    let sub = graph.create_substate_machine(root, "Sub", Vec2::default()).unwrap();
    let inner = graph.add_state(sub, "Inner").unwrap();
    let from_root = graph.add_state(root, "FromRoot").unwrap();
    let from_sub = graph.add_state(sub, "FromSub").unwrap();

    let sub_any = graph.role_state(sub, StateRole::Any).unwrap();
    let root_any = graph.role_state(root, StateRole::Any).unwrap();
    graph.add_transition(sub_any, from_sub, false).unwrap();
    graph.add_transition(root_any, from_root, false).unwrap();

    let mut instance = graph.instantiate().unwrap();
    instance.set_state(inner);
    instance.update_current_state();
    assert_eq!(instance.current_state_id(), Some(from_root));
}

#[test]
fn test_any_states_same_depth_follow_registration_order() {
    let mut graph = Graph::new("Root");
    let root = graph.root();
    let idle = graph.add_state(root, "Idle").unwrap();
    let to_left = graph.add_state(root, "ToLeft").unwrap();
    let to_right = graph.add_state(root, "ToRight").unwrap();
    let left = graph.create_substate_machine(root, "Left", Vec2::default()).unwrap();
    let right = graph.create_substate_machine(root, "Right", Vec2::default()).unwrap();

    let left_any = graph.role_state(left, StateRole::Any).unwrap();
    let right_any = graph.role_state(right, StateRole::Any).unwrap();
    graph.add_transition(left_any, to_left, false).unwrap();
    graph.add_transition(right_any, to_right, false).unwrap();

    let mut instance = graph.instantiate().unwrap();
    instance.set_state(idle);
    assert_eq!(
        instance.update_current_state(),
        TickOutcome::Changed { from: idle, to: to_left, source: TransitionSource::Any }
    );

    // Recreating Left's Any registers it after Right's
    graph.delete_state(left_any).unwrap();
    let left_any = graph.create_state(left, StateRole::Any, Vec2::default()).unwrap();
    graph.add_transition(left_any, to_left, false).unwrap();

    let mut instance = graph.instantiate().unwrap();
    instance.set_state(idle);
    assert_eq!(
        instance.update_current_state(),
        TickOutcome::Changed { from: idle, to: to_right, source: TransitionSource::Any }
    );
}

/// Root: Idle --Go--> [Combat: Entry -> Swing --Hits>2--> Exit] --outward--> Idle
fn combat_graph() -> (Graph, StateId, StateId, StateId) {
    let mut graph = Graph::new("Root");
    let root = graph.root();
    let go = graph.add_parameter("Go", ParameterValue::Bool(false));
    let hits = graph.add_parameter("Hits", ParameterValue::Int(0));
    let idle = graph.add_state(root, "Idle").unwrap();
    let combat = graph.create_substate_machine(root, "Combat", Vec2::default()).unwrap();
    let swing = graph.add_state(combat, "Swing").unwrap();
    let entry = graph.get_entry_state(combat).unwrap();
    let exit = graph.get_exit_state(combat).unwrap();

    let i = graph.add_transition(idle, entry, false).unwrap();
    graph.add_condition(idle, i, Condition::bool(go, BoolOp::True)).unwrap();
    graph.add_transition(entry, swing, false).unwrap();
    let i = graph.add_transition(swing, exit, false).unwrap();
    graph.add_condition(swing, i, Condition::int(hits, IntOp::Greater, 2)).unwrap();
    let i = graph.add_transition(exit, idle, true).unwrap();
    graph.add_condition(exit, i, Condition::bool(go, BoolOp::False)).unwrap();
    (graph, idle, swing, exit)
}

#[test]
fn test_exit_bubbling_through_exit_state() {
    let (graph, idle, swing, exit) = combat_graph();
    let mut instance = graph.instantiate().unwrap();
    instance.set_state(idle);

    instance.set_bool("Go", true);
    instance.update_current_state();
    instance.update_current_state();
    assert_eq!(instance.current_state_id(), Some(swing));

    instance.set_int("Hits", 3);
    instance.update_current_state();
    assert_eq!(instance.current_state_id(), Some(exit));

    instance.set_bool("Go", false);
    assert_eq!(
        instance.update_current_state(),
        TickOutcome::Changed { from: exit, to: idle, source: TransitionSource::Own }
    );
    assert_eq!(instance.owner_of(idle).map(|c| c.depth), Some(0));
}

#[test]
fn test_outward_transition_from_inside_sub_machine() {
    let (graph, idle, swing, _) = combat_graph();
    let mut instance = graph.instantiate().unwrap();
    instance.set_state(swing);

    // Swing has no matching transition; the Combat Exit's outward edge fires
    assert_eq!(
        instance.update_current_state(),
        TickOutcome::Changed { from: swing, to: idle, source: TransitionSource::Outward }
    );
}

#[test]
fn test_bubbling_is_one_level() {
    let mut graph = Graph::new("Root");
    let root = graph.root();
    let outside = graph.add_state(root, "Outside").unwrap();
    let outer = graph.create_substate_machine(root, "Outer", Vec2::default()).unwrap();
    let inner = graph.create_substate_machine(outer, "Inner", Vec2::default()).unwrap();
    let deep = graph.add_state(inner, "Deep").unwrap();
    let outer_exit = graph.get_exit_state(outer).unwrap();
    graph.add_transition(outer_exit, outside, true).unwrap();

    let mut instance = graph.instantiate().unwrap();
    instance.set_state(deep);
    for _ in 0..3 {
        assert_eq!(instance.update_current_state(), TickOutcome::Stayed);
    }
    assert_eq!(instance.current_state_id(), Some(deep));
}

#[test]
fn test_locked_state_freezes_transitions() {
    let mut graph = Graph::new("Root");
    let a = graph.add_state(graph.root(), "A").unwrap();
    let b = graph.add_state(graph.root(), "B").unwrap();
    graph.add_transition(a, b, false).unwrap();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut recorder = Recorder::new("A", &log);
    recorder.lock_on_enter = true;
    graph.add_behaviour(a, recorder).unwrap();

    let mut instance = graph.instantiate().unwrap();
    instance.set_state(a);
    for _ in 0..4 {
        assert_eq!(instance.update_current_state(), TickOutcome::Locked);
    }
    assert_eq!(instance.current_state_id(), Some(a));
    assert_eq!(
        log.lock().iter().filter(|l| *l == "A:update").count(),
        4
    );

    instance.set_locked(a, false);
    assert!(instance.update_current_state().changed());
    assert_eq!(instance.current_state_id(), Some(b));
}
