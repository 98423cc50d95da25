// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node sockets and the values they hold.

use nodeshare_graph::{HostValue, SinkError, Value};

/// Socket direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketDirection {
    /// Input socket
    Input,
    /// Output socket
    Output,
}

/// Data type a socket carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// 3D vector
    Vector,
    /// Color (RGBA)
    Color,
    /// String value
    String,
    /// Closure, no value
    Shader,
    /// Geometry, no value
    Geometry,
}

impl SocketKind {
    /// Interface socket type identifier.
    pub fn socket_type(self) -> &'static str {
        match self {
            Self::Bool => "NodeSocketBool",
            Self::Int => "NodeSocketInt",
            Self::Float => "NodeSocketFloat",
            Self::Vector => "NodeSocketVector",
            Self::Color => "NodeSocketColor",
            Self::String => "NodeSocketString",
            Self::Shader => "NodeSocketShader",
            Self::Geometry => "NodeSocketGeometry",
        }
    }

    /// Kind for an interface socket type identifier.
    pub fn from_socket_type(socket_type: &str) -> Option<Self> {
        let kind = match socket_type {
            "NodeSocketBool" => Self::Bool,
            "NodeSocketInt" => Self::Int,
            "NodeSocketFloat" => Self::Float,
            "NodeSocketVector" => Self::Vector,
            "NodeSocketColor" => Self::Color,
            "NodeSocketString" => Self::String,
            "NodeSocketShader" => Self::Shader,
            "NodeSocketGeometry" => Self::Geometry,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether sockets of this kind hold a default value.
    pub fn has_value(self) -> bool {
        !matches!(self, Self::Shader | Self::Geometry)
    }

    /// Check if this kind can be linked into another kind
    pub fn can_connect_to(self, other: SocketKind) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            // Closures and geometry only link to their own kind
            (Self::Shader | Self::Geometry, _) | (_, Self::Shader | Self::Geometry) => false,
            // Strings only link to strings
            (Self::String, _) | (_, Self::String) => false,
            // Numbers, vectors and colors convert implicitly
            _ => true,
        }
    }

    /// Normalize `value` for a socket of this kind.
    pub fn coerce(self, value: &Value) -> Result<Value, SinkError> {
        let mismatch = || SinkError::TypeMismatch(format!("{value:?} for a {self:?} socket"));
        let coerced = match (self, value) {
            (Self::Bool, Value::Bool(_)) | (Self::Int, Value::Int(_)) | (Self::String, Value::Text(_)) => value.clone(),
            (Self::Bool, Value::Int(v)) => Value::Bool(*v != 0),
            (Self::Float, Value::Int(v)) => Value::Float(*v as f64),
            (Self::Float, Value::Float(_)) => value.clone(),
            (Self::Vector, Value::Tuple(items)) if items.len() == 3 => numeric_tuple(value).ok_or_else(mismatch)?,
            (Self::Color, Value::Tuple(items)) if items.len() == 4 => numeric_tuple(value).ok_or_else(mismatch)?,
            _ => return Err(mismatch()),
        };
        Ok(coerced)
    }
}

fn numeric_tuple(value: &Value) -> Option<Value> {
    value.as_floats().map(Value::floats)
}

/// Convert a stored value to the read-side view.
pub fn host_value(value: &Value) -> HostValue {
    match value {
        Value::Null => HostValue::None,
        Value::Bool(v) => HostValue::Bool(*v),
        Value::Int(v) => HostValue::Int(*v),
        Value::Float(v) => HostValue::Float(*v),
        Value::Text(v) => HostValue::Text(v.clone()),
        Value::Tuple(items) => HostValue::Sequence(items.iter().map(host_value).collect()),
        Value::Map(_) => HostValue::Opaque,
    }
}

/// A socket on a node
#[derive(Debug, Clone, PartialEq)]
pub struct Socket {
    /// Socket name
    pub name: String,
    /// Socket direction
    pub direction: SocketDirection,
    /// Data type
    pub kind: SocketKind,
    /// Current default value, `None` for kinds without one
    pub default_value: Option<Value>,
}

impl Socket {
    /// Create a new input socket
    pub fn input(name: impl Into<String>, kind: SocketKind) -> Self {
        Self {
            name: name.into(),
            direction: SocketDirection::Input,
            kind,
            default_value: None,
        }
    }

    /// Create a new output socket
    pub fn output(name: impl Into<String>, kind: SocketKind) -> Self {
        Self {
            name: name.into(),
            direction: SocketDirection::Output,
            kind,
            default_value: None,
        }
    }

    /// Set the default value
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Float socket with a default.
    pub fn float(name: impl Into<String>, default: f64) -> Self {
        Self::input(name, SocketKind::Float).with_default(default)
    }

    /// Color socket with a default.
    pub fn color(name: impl Into<String>, rgba: [f64; 4]) -> Self {
        Self::input(name, SocketKind::Color).with_default(Value::floats(rgba))
    }

    /// Vector socket with a default.
    pub fn vector(name: impl Into<String>, xyz: [f64; 3]) -> Self {
        Self::input(name, SocketKind::Vector).with_default(Value::floats(xyz))
    }

    /// Replace the default value, checking it against the kind.
    pub fn set_default(&mut self, value: &Value) -> Result<(), SinkError> {
        if !self.kind.has_value() {
            return Err(SinkError::TypeMismatch(format!("{} socket {:?} holds no value", self.kind.socket_type(), self.name)));
        }
        self.default_value = Some(self.kind.coerce(value)?);
        Ok(())
    }

    /// Check if a link from this socket into `other` is valid
    pub fn can_connect(&self, other: &Socket) -> bool {
        self.direction == SocketDirection::Output
            && other.direction == SocketDirection::Input
            && self.kind.can_connect_to(other.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_conversions() {
        assert!(SocketKind::Float.can_connect_to(SocketKind::Color));
        assert!(SocketKind::Vector.can_connect_to(SocketKind::Float));
        assert!(SocketKind::Shader.can_connect_to(SocketKind::Shader));
        assert!(!SocketKind::Shader.can_connect_to(SocketKind::Float));
        assert!(!SocketKind::Color.can_connect_to(SocketKind::Geometry));
        assert!(!SocketKind::String.can_connect_to(SocketKind::Float));
    }

    #[test]
    fn test_set_default() {
        let mut roughness = Socket::float("Roughness", 0.5);
        roughness.set_default(&Value::Int(1)).unwrap();
        assert_eq!(roughness.default_value, Some(Value::Float(1.0)));
        assert!(matches!(
            roughness.set_default(&Value::from("rough")),
            Err(SinkError::TypeMismatch(_))
        ));

        let mut color = Socket::color("Base Color", [0.8, 0.8, 0.8, 1.0]);
        assert!(color.set_default(&Value::floats([1.0, 0.0, 0.0])).is_err());
        color.set_default(&Value::Tuple(vec![Value::Int(1), Value::Float(0.5), Value::Int(0), Value::Int(1)])).unwrap();
        assert_eq!(color.default_value, Some(Value::floats([1.0, 0.5, 0.0, 1.0])));

        let mut bsdf = Socket::output("BSDF", SocketKind::Shader);
        assert!(bsdf.set_default(&Value::Float(0.0)).is_err());
    }

    #[test]
    fn test_socket_type_names() {
        for kind in [SocketKind::Float, SocketKind::Color, SocketKind::Geometry] {
            assert_eq!(SocketKind::from_socket_type(kind.socket_type()), Some(kind));
        }
        assert_eq!(SocketKind::from_socket_type("NodeSocketVirtual"), None);
    }
}
