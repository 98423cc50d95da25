// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node types and node instances.

use indexmap::IndexMap;
use nodeshare_graph::{ColorRamp, ColorStop, CurveMapping, SinkError, Value};
use uuid::Uuid;

use crate::graph::TreeId;
use crate::socket::Socket;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    /// Input nodes (constants, textures)
    Input,
    /// Output nodes
    Output,
    /// Shader closures
    Shader,
    /// Math and conversion
    Converter,
    /// Color adjustments
    Color,
    /// Geometry operations
    Geometry,
    /// Frames, reroutes, group sockets
    Layout,
    /// Group instances
    Group,
}

/// What a node type does beyond holding sockets and attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeBehavior {
    /// Sockets and attributes only
    Plain,
    /// Can be the parent of other nodes
    Frame,
    /// Instances an embedded tree; sockets mirror its interface
    Group,
    /// Outputs mirror the tree's input items
    GroupInput,
    /// Inputs mirror the tree's output items
    GroupOutput,
    /// Carries a color ramp
    ColorRamp,
    /// Carries a curve mapping with this many curves
    Curves(usize),
}

/// Maximum number of color ramp elements.
pub const MAX_RAMP_ELEMENTS: usize = 32;

/// Attributes only the host writes.
pub const READ_ONLY_ATTRIBUTES: &[&str] = &["dimensions", "width_hidden"];

const COLOR_MODES: &[&str] = &["RGB", "HSV", "HSL"];
const HUE_INTERPOLATIONS: &[&str] = &["NEAR", "FAR", "CW", "CCW"];
const INTERPOLATIONS: &[&str] = &["EASE", "CARDINAL", "LINEAR", "B_SPLINE", "CONSTANT"];
const CURVE_EXTENDS: &[&str] = &["HORIZONTAL", "EXTRAPOLATED"];
const CURVE_TONES: &[&str] = &["STANDARD", "FILMLIKE"];

/// Attributes every node has, with their defaults.
pub fn common_attributes() -> IndexMap<String, Value> {
    let mut attributes = IndexMap::new();
    attributes.insert("hide".into(), Value::Bool(false));
    attributes.insert("label".into(), Value::from(""));
    attributes.insert("mute".into(), Value::Bool(false));
    attributes.insert("select".into(), Value::Bool(false));
    attributes.insert("show_options".into(), Value::Bool(true));
    attributes.insert("show_preview".into(), Value::Bool(false));
    attributes.insert("show_texture".into(), Value::Bool(false));
    attributes.insert("use_custom_color".into(), Value::Bool(false));
    attributes.insert("color".into(), Value::floats([0.608, 0.608, 0.608]));
    attributes.insert("width".into(), Value::Float(140.0));
    attributes.insert("height".into(), Value::Float(100.0));
    attributes.insert("dimensions".into(), Value::floats([0.0, 0.0]));
    attributes
}

/// Node type definition
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Unique type identifier
    pub id: String,
    /// Default node name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Default input sockets
    pub inputs: Vec<Socket>,
    /// Default output sockets
    pub outputs: Vec<Socket>,
    /// Type-specific attributes and their defaults
    pub attributes: IndexMap<String, Value>,
    /// Allowed identifiers of enum attributes
    pub choices: IndexMap<String, Vec<&'static str>>,
    /// Behavior
    pub behavior: NodeBehavior,
}

impl NodeType {
    /// Create a plain node type without sockets
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: NodeCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            inputs: Vec::new(),
            outputs: Vec::new(),
            attributes: IndexMap::new(),
            choices: IndexMap::new(),
            behavior: NodeBehavior::Plain,
        }
    }

    /// Add an input socket
    pub fn input(mut self, socket: Socket) -> Self {
        self.inputs.push(socket);
        self
    }

    /// Append input sockets
    pub fn with_inputs(mut self, sockets: impl IntoIterator<Item = Socket>) -> Self {
        self.inputs.extend(sockets);
        self
    }

    /// Add an output socket
    pub fn output(mut self, socket: Socket) -> Self {
        self.outputs.push(socket);
        self
    }

    /// Add a type-specific attribute
    pub fn attribute(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), default.into());
        self
    }

    /// Add an enum attribute; the first choice is the default
    pub fn choice(mut self, name: impl Into<String>, choices: &[&'static str]) -> Self {
        let name = name.into();
        let default = choices.first().copied().unwrap_or_default();
        self.attributes.insert(name.clone(), Value::from(default));
        self.choices.insert(name, choices.to_vec());
        self
    }

    /// Set the behavior
    pub fn with_behavior(mut self, behavior: NodeBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

/// A node instance in a tree
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type ID
    pub type_id: String,
    /// Name, unique within the tree
    pub name: String,
    /// Position in the editor
    pub location: [f64; 2],
    /// Input sockets
    pub inputs: Vec<Socket>,
    /// Output sockets
    pub outputs: Vec<Socket>,
    /// Attribute values
    pub attributes: IndexMap<String, Value>,
    /// Enclosing frame
    pub parent: Option<NodeId>,
    /// Bound group tree
    pub node_tree: Option<TreeId>,
    /// Color ramp, for ramp nodes
    pub color_ramp: Option<ColorRamp>,
    /// Curve mapping, for curve nodes
    pub mapping: Option<CurveMapping>,
    behavior: NodeBehavior,
    choices: IndexMap<String, Vec<&'static str>>,
}

impl Node {
    /// Create a new node from a type definition
    pub fn new(node_type: &NodeType) -> Self {
        let mut attributes = common_attributes();
        attributes.extend(node_type.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            id: NodeId::new(),
            type_id: node_type.id.clone(),
            name: node_type.name.clone(),
            location: [0.0, 0.0],
            inputs: node_type.inputs.clone(),
            outputs: node_type.outputs.clone(),
            attributes,
            parent: None,
            node_tree: None,
            color_ramp: (node_type.behavior == NodeBehavior::ColorRamp).then(default_ramp),
            mapping: match node_type.behavior {
                NodeBehavior::Curves(count) => Some(default_mapping(count)),
                _ => None,
            },
            behavior: node_type.behavior,
            choices: node_type.choices.clone(),
        }
    }

    /// Set the location
    pub fn with_location(mut self, x: f64, y: f64) -> Self {
        self.location = [x, y];
        self
    }

    /// Behavior of the node's type
    pub fn behavior(&self) -> NodeBehavior {
        self.behavior
    }

    /// Get an input socket by index
    pub fn input(&self, index: usize) -> Option<&Socket> {
        self.inputs.get(index)
    }

    /// Get an output socket by index
    pub fn output(&self, index: usize) -> Option<&Socket> {
        self.outputs.get(index)
    }

    /// Get an attribute value
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Set an input socket's default.
    pub fn set_input_default(&mut self, index: usize, value: &Value) -> Result<(), SinkError> {
        self.inputs
            .get_mut(index)
            .ok_or(SinkError::NoSuchSocket(index))?
            .set_default(value)
    }

    /// Set an output socket's default.
    pub fn set_output_default(&mut self, index: usize, value: &Value) -> Result<(), SinkError> {
        self.outputs
            .get_mut(index)
            .ok_or(SinkError::NoSuchSocket(index))?
            .set_default(value)
    }

    /// Set an attribute, keeping the type it already has.
    pub fn set_attribute(&mut self, name: &str, value: &Value) -> Result<(), SinkError> {
        if READ_ONLY_ATTRIBUTES.contains(&name) {
            return Err(SinkError::ReadOnly(name.to_string()));
        }
        let current = self
            .attributes
            .get(name)
            .ok_or_else(|| SinkError::Rejected(format!("{} has no attribute {name:?}", self.type_id)))?;
        let value = conform(name, current, value)?;
        if let (Some(choices), Value::Text(text)) = (self.choices.get(name), &value) {
            check_choice(name, text, choices)?;
        }
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    /// The color ramp, or an error for nodes without one.
    pub fn ramp_mut(&mut self) -> Result<&mut ColorRamp, SinkError> {
        let type_id = &self.type_id;
        self.color_ramp
            .as_mut()
            .ok_or_else(|| SinkError::Rejected(format!("{type_id} has no color ramp")))
    }

    /// The curve mapping, or an error for nodes without one.
    pub fn mapping_mut(&mut self) -> Result<&mut CurveMapping, SinkError> {
        let type_id = &self.type_id;
        self.mapping
            .as_mut()
            .ok_or_else(|| SinkError::Rejected(format!("{type_id} has no curve mapping")))
    }

    /// Number of points on one curve.
    pub fn curve_len(&self, curve: usize) -> Result<usize, SinkError> {
        let mapping = self
            .mapping
            .as_ref()
            .ok_or_else(|| SinkError::Rejected(format!("{} has no curve mapping", self.type_id)))?;
        mapping
            .curves
            .get(curve)
            .map(Vec::len)
            .ok_or_else(|| SinkError::Rejected(format!("no curve {curve}")))
    }
}

/// Value `value` converted to the type of `current`.
fn conform(name: &str, current: &Value, value: &Value) -> Result<Value, SinkError> {
    let mismatch = || SinkError::TypeMismatch(format!("{value:?} for attribute {name:?}"));
    let conformed = match (current, value) {
        (Value::Bool(_), Value::Bool(_))
        | (Value::Int(_), Value::Int(_))
        | (Value::Float(_), Value::Float(_))
        | (Value::Text(_), Value::Text(_)) => value.clone(),
        (Value::Bool(_), Value::Int(v)) => Value::Bool(*v != 0),
        (Value::Float(_), Value::Int(v)) => Value::Float(*v as f64),
        (Value::Tuple(have), Value::Tuple(given)) if have.len() == given.len() => {
            value.as_floats().map(Value::floats).ok_or_else(mismatch)?
        }
        _ => return Err(mismatch()),
    };
    Ok(conformed)
}

fn check_choice(name: &str, value: &str, choices: &[&str]) -> Result<(), SinkError> {
    if choices.contains(&value) {
        Ok(())
    } else {
        Err(SinkError::Rejected(format!("{value:?} is not a valid {name}")))
    }
}

/// A black to white ramp.
pub fn default_ramp() -> ColorRamp {
    ColorRamp {
        color_mode: "RGB".into(),
        hue_interpolation: "NEAR".into(),
        interpolation: "LINEAR".into(),
        elements: vec![
            ColorStop {
                position: 0.0,
                color: vec![0.0, 0.0, 0.0, 1.0],
            },
            ColorStop {
                position: 1.0,
                color: vec![1.0, 1.0, 1.0, 1.0],
            },
        ],
    }
}

/// Identity curves.
pub fn default_mapping(curves: usize) -> CurveMapping {
    CurveMapping {
        clip_max_x: 1.0,
        clip_max_y: 1.0,
        clip_min_x: 0.0,
        clip_min_y: 0.0,
        extend: "EXTRAPOLATED".into(),
        tone: "STANDARD".into(),
        use_clip: true,
        curves: vec![vec![[0.0, 0.0], [1.0, 1.0]]; curves],
    }
}

/// Validate and set the ramp's mode identifiers.
pub fn set_ramp_modes(
    ramp: &mut ColorRamp,
    color_mode: &str,
    hue_interpolation: &str,
    interpolation: &str,
) -> Result<(), SinkError> {
    check_choice("color_mode", color_mode, COLOR_MODES)?;
    check_choice("hue_interpolation", hue_interpolation, HUE_INTERPOLATIONS)?;
    check_choice("interpolation", interpolation, INTERPOLATIONS)?;
    ramp.color_mode = color_mode.to_string();
    ramp.hue_interpolation = hue_interpolation.to_string();
    ramp.interpolation = interpolation.to_string();
    Ok(())
}

fn ramp_color(color: &[f64]) -> Result<Vec<f64>, SinkError> {
    if color.len() == 4 {
        Ok(color.to_vec())
    } else {
        Err(SinkError::TypeMismatch(format!("ramp color with {} components", color.len())))
    }
}

fn sort_stops(ramp: &mut ColorRamp) {
    ramp.elements.sort_by(|a, b| a.position.total_cmp(&b.position));
}

/// Move and recolor element `index`; elements stay sorted by position.
pub fn set_ramp_element(ramp: &mut ColorRamp, index: usize, position: f64, color: &[f64]) -> Result<(), SinkError> {
    let color = ramp_color(color)?;
    let stop = ramp
        .elements
        .get_mut(index)
        .ok_or_else(|| SinkError::Rejected(format!("no color ramp element {index}")))?;
    stop.position = position.clamp(0.0, 1.0);
    stop.color = color;
    sort_stops(ramp);
    Ok(())
}

/// Insert an element at its sorted position.
pub fn add_ramp_element(ramp: &mut ColorRamp, position: f64, color: &[f64]) -> Result<(), SinkError> {
    if ramp.elements.len() >= MAX_RAMP_ELEMENTS {
        return Err(SinkError::Rejected(format!("color ramp is full ({MAX_RAMP_ELEMENTS} elements)")));
    }
    let color = ramp_color(color)?;
    ramp.elements.push(ColorStop {
        position: position.clamp(0.0, 1.0),
        color,
    });
    sort_stops(ramp);
    Ok(())
}

fn curve_mut(mapping: &mut CurveMapping, curve: usize) -> Result<&mut Vec<[f64; 2]>, SinkError> {
    mapping
        .curves
        .get_mut(curve)
        .ok_or_else(|| SinkError::Rejected(format!("no curve {curve}")))
}

fn sort_points(points: &mut [[f64; 2]]) {
    points.sort_by(|a, b| a[0].total_cmp(&b[0]));
}

/// Move point `index` of a curve; points stay sorted by x.
pub fn set_curve_point(mapping: &mut CurveMapping, curve: usize, index: usize, point: [f64; 2]) -> Result<(), SinkError> {
    let points = curve_mut(mapping, curve)?;
    let slot = points
        .get_mut(index)
        .ok_or_else(|| SinkError::Rejected(format!("no point {index} on curve {curve}")))?;
    *slot = point;
    sort_points(points);
    Ok(())
}

/// Insert a point at its sorted position.
pub fn add_curve_point(mapping: &mut CurveMapping, curve: usize, point: [f64; 2]) -> Result<(), SinkError> {
    let points = curve_mut(mapping, curve)?;
    points.push(point);
    sort_points(points);
    Ok(())
}

/// Set one scalar setting of a curve mapping.
pub fn set_mapping_setting(mapping: &mut CurveMapping, name: &str, value: &Value) -> Result<(), SinkError> {
    let mismatch = || SinkError::TypeMismatch(format!("{value:?} for mapping setting {name:?}"));
    match name {
        "clip_max_x" | "clip_max_y" | "clip_min_x" | "clip_min_y" => {
            let v = value.as_f64().ok_or_else(mismatch)?;
            let field = match name {
                "clip_max_x" => &mut mapping.clip_max_x,
                "clip_max_y" => &mut mapping.clip_max_y,
                "clip_min_x" => &mut mapping.clip_min_x,
                _ => &mut mapping.clip_min_y,
            };
            *field = v;
        }
        "extend" => {
            let v = value.as_str().ok_or_else(mismatch)?;
            check_choice(name, v, CURVE_EXTENDS)?;
            mapping.extend = v.to_string();
        }
        "tone" => {
            let v = value.as_str().ok_or_else(mismatch)?;
            check_choice(name, v, CURVE_TONES)?;
            mapping.tone = v.to_string();
        }
        "use_clip" => mapping.use_clip = value.as_bool().ok_or_else(mismatch)?,
        _ => return Err(SinkError::Rejected(format!("curve mapping has no setting {name:?}"))),
    }
    Ok(())
}

/// Registry of available node types
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    /// Registered node types by ID
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self { types: IndexMap::new() }
    }

    /// Register a node type
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create a node from a type ID
    pub fn create_node(&self, type_id: &str) -> Option<Node> {
        self.get(type_id).map(Node::new)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
