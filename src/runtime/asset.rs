//! Authored asset documents
//!
//! A serde document mirroring the controller tree: each controller lists its
//! states and nested sub-controllers, each state its transitions (`outward`,
//! `conditions`, `target_id`) and behaviours stored as `{kind, config}`.
//! Loading rebuilds behaviours through a [`BehaviorRegistry`] snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::behavior::Behavior;
use super::catalog::BehaviorRegistry;
use super::condition::Condition;
use super::controller::Graph;
use super::error::{AssetError, AssetResult, AuthoringError};
use super::ids::{ControllerId, StateId};
use super::state::{State, StateRole};
use super::transition::Transition;
use super::value::{ParameterValue, PropertyValue, Vec2};
use crate::ASSET_FORMAT_VERSION;

/// Whole authored asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDocument {
    /// Format version
    pub version: u32,
    /// Parameters in registry order
    #[serde(default)]
    pub parameters: Vec<NamedValue<ParameterValue>>,
    /// Exposed properties in registry order
    #[serde(default)]
    pub properties: Vec<NamedValue<PropertyValue>>,
    /// Behaviours run every tick by the root
    #[serde(default)]
    pub global_behaviours: Vec<BehaviorDocument>,
    /// Root controller
    pub root: ControllerDocument,
}

/// Named registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue<V> {
    /// Entry name
    pub name: String,
    /// Authored default
    pub value: V,
}

/// Controller node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerDocument {
    /// Display name
    pub name: String,
    /// Editor position
    #[serde(default)]
    pub position: Vec2,
    /// Owned states
    #[serde(default)]
    pub states: Vec<StateDocument>,
    /// Nested sub-state-machines
    #[serde(default)]
    pub sub_controllers: Vec<ControllerDocument>,
}

/// State node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    /// Stable id
    pub id: StateId,
    /// Display name
    pub name: String,
    /// Structural role
    pub role: StateRole,
    /// Editor position
    #[serde(default)]
    pub position: Vec2,
    /// Outgoing transitions
    #[serde(default)]
    pub transitions: Vec<TransitionDocument>,
    /// Attached behaviours
    #[serde(default)]
    pub behaviours: Vec<BehaviorDocument>,
}

/// Transition edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDocument {
    /// Leaves the owning sub-machine
    #[serde(default)]
    pub outward: bool,
    /// Guards
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Target state id; may dangle
    pub target_id: StateId,
}

/// Persisted behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDocument {
    /// Catalog kind
    pub kind: String,
    /// Kind-specific configuration
    #[serde(default)]
    pub config: serde_json::Value,
}

impl BehaviorDocument {
    fn of(behaviour: &dyn Behavior) -> Self {
        Self {
            kind: behaviour.kind().to_string(),
            config: behaviour.config(),
        }
    }

    fn build(&self, registry: &BehaviorRegistry) -> AssetResult<Box<dyn Behavior>> {
        registry.create(&self.kind, &self.config)
    }
}

impl Graph {
    /// Export the graph as a document
    pub fn to_asset(&self) -> AssetDocument {
        AssetDocument {
            version: ASSET_FORMAT_VERSION,
            parameters: self
                .parameters()
                .iter()
                .map(|e| NamedValue { name: e.name.clone(), value: e.value })
                .collect(),
            properties: self
                .properties()
                .iter()
                .map(|e| NamedValue { name: e.name.clone(), value: e.value })
                .collect(),
            global_behaviours: self
                .global_behaviours()
                .iter()
                .map(|b| BehaviorDocument::of(b.as_ref()))
                .collect(),
            root: self.controller_document(self.root()),
        }
    }

    fn controller_document(&self, id: ControllerId) -> ControllerDocument {
        let Some(controller) = self.controller(id) else {
            return ControllerDocument {
                name: String::new(),
                position: Vec2::default(),
                states: Vec::new(),
                sub_controllers: Vec::new(),
            };
        };
        ControllerDocument {
            name: controller.name.clone(),
            position: controller.position,
            states: self
                .states_of(id)
                .into_iter()
                .map(|s| StateDocument {
                    id: s.id,
                    name: s.name.clone(),
                    role: s.role,
                    position: s.position,
                    transitions: s
                        .transitions
                        .iter()
                        .map(|t| TransitionDocument {
                            outward: t.outward,
                            conditions: t.conditions.clone(),
                            target_id: t.target,
                        })
                        .collect(),
                    behaviours: s
                        .behaviours
                        .iter()
                        .map(|b| BehaviorDocument::of(b.as_ref()))
                        .collect(),
                })
                .collect(),
            sub_controllers: controller
                .children
                .iter()
                .map(|child| self.controller_document(*child))
                .collect(),
        }
    }

    /// Rebuild a graph from a document
    ///
    /// State ids are kept. Transitions must obey the same role rules as
    /// [`Graph::add_transition`], but a document may carry dangling targets;
    /// instances tolerate those.
    pub fn from_asset(document: &AssetDocument, registry: &BehaviorRegistry) -> AssetResult<Self> {
        if document.version != ASSET_FORMAT_VERSION {
            return Err(AssetError::UnsupportedVersion(document.version));
        }

        let mut graph = Graph::empty(document.root.name.clone());
        graph.controller_mut(ControllerId::ROOT)?.position = document.root.position;

        for entry in &document.parameters {
            if graph.parameters().position_by_name(&entry.name).is_some() {
                return Err(AssetError::DuplicateName { registry: "parameter", name: entry.name.clone() });
            }
            graph.add_parameter(&entry.name, entry.value);
        }
        for entry in &document.properties {
            if graph.properties().position_by_name(&entry.name).is_some() {
                return Err(AssetError::DuplicateName { registry: "property", name: entry.name.clone() });
            }
            graph.add_property(&entry.name, entry.value);
        }
        for behaviour in &document.global_behaviours {
            graph.add_global_behaviour(behaviour.build(registry)?);
        }

        let mut seen = HashSet::new();
        graph.load_controller(ControllerId::ROOT, &document.root, registry, &mut seen)?;
        graph.check_loaded_transitions()?;
        tracing::debug!(
            graph = graph.name(),
            states = graph.state_count(),
            "Loaded asset"
        );
        Ok(graph)
    }

    fn load_controller(
        &mut self,
        id: ControllerId,
        document: &ControllerDocument,
        registry: &BehaviorRegistry,
        seen: &mut HashSet<StateId>,
    ) -> AssetResult<()> {
        let mut roles = HashSet::new();
        for doc in &document.states {
            if !seen.insert(doc.id) || self.contains_state(doc.id) {
                return Err(AssetError::DuplicateStateId(doc.id));
            }
            if doc.role == StateRole::Up && id.is_root() {
                return Err(AuthoringError::UpInRoot.into());
            }
            if doc.role.is_reserved() && !roles.insert(doc.role) {
                return Err(AuthoringError::DuplicateRole { controller: id, role: doc.role }.into());
            }

            let mut state = State::new(doc.role, id, doc.position);
            state.id = doc.id;
            state.name = doc.name.clone();
            state.transitions = doc
                .transitions
                .iter()
                .map(|t| {
                    let mut transition = Transition::new(t.target_id, t.outward);
                    transition.conditions = t.conditions.clone();
                    transition
                })
                .collect();
            state.behaviours = doc
                .behaviours
                .iter()
                .map(|b| b.build(registry))
                .collect::<AssetResult<_>>()?;
            self.push_state(state);
        }

        for child in &document.sub_controllers {
            let child_id = self.push_controller(id, child.name.clone(), child.position)?;
            self.load_controller(child_id, child, registry, seen)?;
        }
        Ok(())
    }

    /// Apply the authoring edge rules to every loaded transition
    fn check_loaded_transitions(&self) -> AssetResult<()> {
        for state in self.states() {
            if state.role == StateRole::Entry {
                if state.transitions.len() > 1 {
                    return Err(AuthoringError::EntryAlreadyWired(state.id).into());
                }
                if state.transitions.iter().any(|t| !t.conditions.is_empty()) {
                    return Err(AuthoringError::ConditionOnEntry(state.id).into());
                }
            }
            for transition in &state.transitions {
                self.check_edge(state, transition.target, transition.outward)?;
            }
        }
        Ok(())
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> AssetResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_asset())?)
    }

    /// Parse from JSON
    pub fn from_json(json: &str, registry: &BehaviorRegistry) -> AssetResult<Self> {
        let document: AssetDocument = serde_json::from_str(json)?;
        Self::from_asset(&document, registry)
    }

    /// Write the asset file atomically
    pub fn save(&self, path: &Path) -> AssetResult<()> {
        let json = self.to_json()?;
        super::write_atomic(path, json.as_bytes())?;
        Ok(())
    }

    /// Read an asset file
    pub fn load(path: &Path, registry: &BehaviorRegistry) -> AssetResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::behavior::Countdown;
    use crate::runtime::catalog::BehaviorCatalog;
    use crate::runtime::condition::{BoolOp, IntOp};

    fn sample() -> (Graph, ControllerId) {
        let mut graph = Graph::new("Root");
        let root = graph.root();
        let go = graph.add_parameter("Go", ParameterValue::Bool(false));
        let hits = graph.add_parameter("Hits", ParameterValue::Int(0));
        graph.add_property("Health", PropertyValue::Float(100.0));
        let sub = graph.create_substate_machine(root, "Combat", Vec2::new(200.0, 0.0)).unwrap();
        let idle = graph.add_state(root, "Idle").unwrap();
        let swing = graph.add_state(sub, "Swing").unwrap();
        let sub_entry = graph.get_entry_state(sub).unwrap();
        let sub_exit = graph.get_exit_state(sub).unwrap();

        let t = graph.add_transition(idle, sub_entry, false).unwrap();
        graph.add_condition(idle, t, Condition::bool(go, BoolOp::True)).unwrap();
        graph.add_transition(sub_entry, swing, false).unwrap();
        let t = graph.add_transition(swing, sub_exit, false).unwrap();
        graph.add_condition(swing, t, Condition::int(hits, IntOp::Greater, 2)).unwrap();
        graph.add_transition(sub_exit, idle, true).unwrap();
        graph.add_behaviour(swing, Box::new(Countdown::new("Go", 4))).unwrap();
        (graph, sub)
    }

    #[test]
    fn test_document_shape() {
        let (graph, _) = sample();
        let doc = graph.to_asset();
        assert_eq!(doc.version, ASSET_FORMAT_VERSION);
        assert_eq!(doc.root.states.len(), 4);
        assert_eq!(doc.root.sub_controllers.len(), 1);

        let combat = &doc.root.sub_controllers[0];
        assert_eq!(combat.name, "Combat");
        let exit = combat.states.iter().find(|s| s.role == StateRole::Exit).unwrap();
        assert!(exit.transitions[0].outward);
        let swing = combat.states.iter().find(|s| s.name == "Swing").unwrap();
        assert_eq!(swing.behaviours[0].kind, "countdown");
    }

    #[test]
    fn test_round_trip_preserves_topology() {
        let (graph, _) = sample();
        let registry = BehaviorCatalog::new().snapshot();
        let json = graph.to_json().unwrap();
        let loaded = Graph::from_json(&json, &registry).unwrap();

        assert_eq!(loaded.to_asset(), graph.to_asset());
        assert_eq!(loaded.any_states().len(), 2);
        assert_eq!(loaded.path(ControllerId(1)), "Root/Combat");
        assert!(loaded.instantiate().is_ok());
    }

    #[test]
    fn test_unknown_behaviour_kind() {
        let (graph, _) = sample();
        let mut doc = graph.to_asset();
        doc.root.sub_controllers[0]
            .states
            .iter_mut()
            .find(|s| s.name == "Swing")
            .unwrap()
            .behaviours[0]
            .kind = "teleport".into();

        let registry = BehaviorCatalog::new().snapshot();
        assert!(matches!(
            Graph::from_asset(&doc, &registry),
            Err(AssetError::UnknownBehavior(kind)) if kind == "teleport"
        ));
    }

    #[test]
    fn test_duplicate_state_id_rejected() {
        let (graph, _) = sample();
        let mut doc = graph.to_asset();
        let id = doc.root.states[0].id;
        doc.root.sub_controllers[0].states[0].id = id;

        let registry = BehaviorCatalog::new().snapshot();
        assert!(matches!(
            Graph::from_asset(&doc, &registry),
            Err(AssetError::DuplicateStateId(dup)) if dup == id
        ));
    }

    #[test]
    fn test_transition_to_any_rejected() {
        let (graph, _) = sample();
        let mut doc = graph.to_asset();
        let any = doc.root.states.iter().find(|s| s.role == StateRole::Any).unwrap().id;
        let idle = doc.root.states.iter_mut().find(|s| s.name == "Idle").unwrap();
        idle.transitions.push(TransitionDocument {
            outward: false,
            conditions: Vec::new(),
            target_id: any,
        });

        let registry = BehaviorCatalog::new().snapshot();
        assert!(matches!(
            Graph::from_asset(&doc, &registry),
            Err(AssetError::Invalid(AuthoringError::InvalidTarget { role: StateRole::Any, .. }))
        ));
    }

    #[test]
    fn test_edge_rules_enforced_on_load() {
        let (graph, _) = sample();
        let registry = BehaviorCatalog::new().snapshot();
        let idle = graph.to_asset().root.states.iter().find(|s| s.name == "Idle").unwrap().id;

        // Second transition on the sub-machine Entry
        let mut doc = graph.to_asset();
        let entry = doc.root.sub_controllers[0]
            .states
            .iter_mut()
            .find(|s| s.role == StateRole::Entry)
            .unwrap();
        entry.transitions.push(entry.transitions[0].clone());
        assert!(matches!(
            Graph::from_asset(&doc, &registry),
            Err(AssetError::Invalid(AuthoringError::EntryAlreadyWired(_)))
        ));

        // Outward transition that stays inside the sub-machine
        let mut doc = graph.to_asset();
        let combat = &mut doc.root.sub_controllers[0];
        let swing = combat.states.iter().find(|s| s.name == "Swing").unwrap().id;
        let exit = combat.states.iter_mut().find(|s| s.role == StateRole::Exit).unwrap();
        exit.transitions[0].target_id = swing;
        assert!(matches!(
            Graph::from_asset(&doc, &registry),
            Err(AssetError::Invalid(AuthoringError::OutwardStaysInside { .. }))
        ));

        // Dangling targets still load
        let mut doc = graph.to_asset();
        doc.root.states.retain(|s| s.id != idle);
        assert!(Graph::from_asset(&doc, &registry).is_ok());
    }

    #[test]
    fn test_duplicate_parameter_name_rejected() {
        let (graph, _) = sample();
        let mut doc = graph.to_asset();
        doc.parameters.push(doc.parameters[0].clone());

        let registry = BehaviorCatalog::new().snapshot();
        assert!(matches!(
            Graph::from_asset(&doc, &registry),
            Err(AssetError::DuplicateName { registry: "parameter", name }) if name == "Go"
        ));

        let mut doc = graph.to_asset();
        doc.properties.push(doc.properties[0].clone());
        assert!(matches!(
            Graph::from_asset(&doc, &registry),
            Err(AssetError::DuplicateName { registry: "property", .. })
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let (graph, _) = sample();
        let mut doc = graph.to_asset();
        doc.version = 99;
        let registry = BehaviorCatalog::new().snapshot();
        assert!(matches!(
            Graph::from_asset(&doc, &registry),
            Err(AssetError::UnsupportedVersion(99))
        ));
    }
}
