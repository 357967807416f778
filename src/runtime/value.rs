//! Typed values held by parameters and exposed properties

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ParameterValue {
    /// Floating point parameter
    Float(f32),
    /// Integer parameter
    Int(i32),
    /// Boolean parameter
    Bool(bool),
}

/// Variant tag of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    /// `ParameterValue::Float`
    Float,
    /// `ParameterValue::Int`
    Int,
    /// `ParameterValue::Bool`
    Bool,
}

impl ParameterValue {
    /// Variant tag of this value
    pub fn kind(&self) -> ParameterKind {
        match self {
            ParameterValue::Float(_) => ParameterKind::Float,
            ParameterValue::Int(_) => ParameterKind::Int,
            ParameterValue::Bool(_) => ParameterKind::Bool,
        }
    }

    /// Float payload, if this is a float
    pub fn as_float(&self) -> Option<f32> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Int payload, if this is an int
    pub fn as_int(&self) -> Option<i32> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Bool payload, if this is a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Default value for a kind
    pub fn default_for(kind: ParameterKind) -> Self {
        match kind {
            ParameterKind::Float => ParameterValue::Float(0.0),
            ParameterKind::Int => ParameterValue::Int(0),
            ParameterKind::Bool => ParameterValue::Bool(false),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Float(v) => write!(f, "{v}"),
            ParameterValue::Int(v) => write!(f, "{v}"),
            ParameterValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Two-component vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X
    pub x: f32,
    /// Y
    pub y: f32,
}

impl Vec2 {
    /// Construct a vector
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Three-component vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X
    pub x: f32,
    /// Y
    pub y: f32,
    /// Z
    pub z: f32,
}

impl Vec3 {
    /// Construct a vector
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// All components one
    pub const ONE: Vec3 = Vec3::new(1.0, 1.0, 1.0);
}

/// Four-component vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec4 {
    /// X
    pub x: f32,
    /// Y
    pub y: f32,
    /// Z
    pub z: f32,
    /// W
    pub w: f32,
}

impl Vec4 {
    /// Construct a vector
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

/// Linear RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self { r: 1.0, g: 1.0, b: 1.0, a: 1.0 }
    }
}

/// Position, scale, and euler rotation of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// World position
    pub position: Vec3,
    /// Local scale
    pub scale: Vec3,
    /// Euler angles in degrees
    pub rotation: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::default(),
            scale: Vec3::ONE,
            rotation: Vec3::default(),
        }
    }
}

/// Opaque handle to a host entity (scene object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef(pub u64);

/// Value of an exposed property
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PropertyValue {
    /// Floating point property
    Float(f32),
    /// Boolean property
    Bool(bool),
    /// Transform property
    Transform(Transform),
    /// 2D vector property
    Vector2(Vec2),
    /// 3D vector property
    Vector3(Vec3),
    /// 4D vector property
    Vector4(Vec4),
    /// Color property
    Color(Color),
    /// Entity reference; `None` until a binder or the host assigns one
    Entity(Option<EntityRef>),
}

/// Variant tag of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    /// `PropertyValue::Float`
    Float,
    /// `PropertyValue::Bool`
    Bool,
    /// `PropertyValue::Transform`
    Transform,
    /// `PropertyValue::Vector2`
    Vector2,
    /// `PropertyValue::Vector3`
    Vector3,
    /// `PropertyValue::Vector4`
    Vector4,
    /// `PropertyValue::Color`
    Color,
    /// `PropertyValue::Entity`
    Entity,
}

impl PropertyValue {
    /// Variant tag of this value
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Float(_) => PropertyKind::Float,
            PropertyValue::Bool(_) => PropertyKind::Bool,
            PropertyValue::Transform(_) => PropertyKind::Transform,
            PropertyValue::Vector2(_) => PropertyKind::Vector2,
            PropertyValue::Vector3(_) => PropertyKind::Vector3,
            PropertyValue::Vector4(_) => PropertyKind::Vector4,
            PropertyValue::Color(_) => PropertyKind::Color,
            PropertyValue::Entity(_) => PropertyKind::Entity,
        }
    }

    /// Default value for a kind
    pub fn default_for(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::Float => PropertyValue::Float(0.0),
            PropertyKind::Bool => PropertyValue::Bool(false),
            PropertyKind::Transform => PropertyValue::Transform(Transform::default()),
            PropertyKind::Vector2 => PropertyValue::Vector2(Vec2::default()),
            PropertyKind::Vector3 => PropertyValue::Vector3(Vec3::default()),
            PropertyKind::Vector4 => PropertyValue::Vector4(Vec4::default()),
            PropertyKind::Color => PropertyValue::Color(Color::default()),
            PropertyKind::Entity => PropertyValue::Entity(None),
        }
    }
}

/// Kind tag shared by parameter and property values, used by the registry
pub trait TypedValue: Clone + PartialEq + fmt::Debug {
    /// Tag type
    type Kind: Copy + PartialEq + fmt::Debug;

    /// Tag of this value
    fn value_kind(&self) -> Self::Kind;
}

impl TypedValue for ParameterValue {
    type Kind = ParameterKind;

    fn value_kind(&self) -> ParameterKind {
        self.kind()
    }
}

impl TypedValue for PropertyValue {
    type Kind = PropertyKind;

    fn value_kind(&self) -> PropertyKind {
        self.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_kinds() {
        assert_eq!(ParameterValue::Float(1.0).kind(), ParameterKind::Float);
        assert_eq!(ParameterValue::Int(1).as_int(), Some(1));
        assert_eq!(ParameterValue::Bool(true).as_float(), None);
    }

    #[test]
    fn test_property_defaults() {
        let t = PropertyValue::default_for(PropertyKind::Transform);
        match t {
            PropertyValue::Transform(t) => assert_eq!(t.scale, Vec3::ONE),
            other => panic!("expected transform, got {other:?}"),
        }
        assert_eq!(
            PropertyValue::default_for(PropertyKind::Entity),
            PropertyValue::Entity(None)
        );
    }

    #[test]
    fn test_value_json_shape() {
        let json = serde_json::to_string(&ParameterValue::Int(3)).unwrap();
        assert_eq!(json, r#"{"type":"Int","value":3}"#);
    }
}
