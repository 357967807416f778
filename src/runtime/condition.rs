//! Transition conditions and their evaluation
//!
//! A condition is bound structurally to a parameter position in the owning
//! registry, never by name, so evaluation on the tick path is an indexed read
//! and a comparison.

use serde::{Deserialize, Serialize};

use super::registry::ParameterRegistry;
use super::value::{ParameterKind, ParameterValue};

/// Comparison operators for bool parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    /// Passes when the parameter is true
    True,
    /// Passes when the parameter is false
    False,
}

/// Comparison operators for float parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloatOp {
    /// parameter > comparand
    Greater,
    /// parameter < comparand
    Less,
}

/// Comparison operators for int parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntOp {
    /// parameter > comparand
    Greater,
    /// parameter < comparand
    Less,
    /// parameter == comparand
    Equal,
    /// parameter != comparand
    NotEqual,
}

/// Operator plus literal comparand, typed per parameter kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Comparison {
    /// Bool test; bool conditions carry no comparand
    Bool {
        /// Operator
        op: BoolOp,
    },
    /// Float comparison
    Float {
        /// Operator
        op: FloatOp,
        /// Literal comparand
        value: f32,
    },
    /// Int comparison
    Int {
        /// Operator
        op: IntOp,
        /// Literal comparand
        value: i32,
    },
}

impl Comparison {
    /// Parameter kind this comparison applies to
    pub fn parameter_kind(&self) -> ParameterKind {
        match self {
            Comparison::Bool { .. } => ParameterKind::Bool,
            Comparison::Float { .. } => ParameterKind::Float,
            Comparison::Int { .. } => ParameterKind::Int,
        }
    }

    /// Compare a parameter value; `None` when the kinds do not match
    pub fn test(&self, value: &ParameterValue) -> Option<bool> {
        match (self, value) {
            (Comparison::Bool { op }, ParameterValue::Bool(v)) => Some(match op {
                BoolOp::True => *v,
                BoolOp::False => !*v,
            }),
            (Comparison::Float { op, value: rhs }, ParameterValue::Float(v)) => Some(match op {
                FloatOp::Greater => *v > *rhs,
                FloatOp::Less => *v < *rhs,
            }),
            (Comparison::Int { op, value: rhs }, ParameterValue::Int(v)) => Some(match op {
                IntOp::Greater => *v > *rhs,
                IntOp::Less => *v < *rhs,
                IntOp::Equal => *v == *rhs,
                IntOp::NotEqual => *v != *rhs,
            }),
            _ => None,
        }
    }
}

/// A single guard on a transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Position of the bound parameter in the registry
    pub parameter: usize,
    /// Operator and comparand
    pub comparison: Comparison,
}

impl Condition {
    /// Bool condition
    pub fn bool(parameter: usize, op: BoolOp) -> Self {
        Self {
            parameter,
            comparison: Comparison::Bool { op },
        }
    }

    /// Float condition
    pub fn float(parameter: usize, op: FloatOp, value: f32) -> Self {
        Self {
            parameter,
            comparison: Comparison::Float { op, value },
        }
    }

    /// Int condition
    pub fn int(parameter: usize, op: IntOp, value: i32) -> Self {
        Self {
            parameter,
            comparison: Comparison::Int { op, value },
        }
    }

    /// Evaluate against a registry
    ///
    /// A missing parameter or a kind mismatch evaluates to false. Both are
    /// reported once when an instance is built, so nothing is logged here.
    pub fn evaluate(&self, registry: &ParameterRegistry) -> bool {
        registry
            .value(self.parameter)
            .and_then(|value| self.comparison.test(value))
            .unwrap_or(false)
    }

    /// Whether the bound parameter exists and has the expected kind
    pub fn binding_matches(&self, registry: &ParameterRegistry) -> bool {
        registry
            .value(self.parameter)
            .is_some_and(|v| v.kind() == self.comparison.parameter_kind())
    }
}
