// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property extraction from live host objects.
//!
//! The host exposes its graph through [`HostTree`] and [`HostNode`]. The
//! codec walks those read-only views and decides, attribute by attribute,
//! what goes into a [`NodeDocument`]:
//!
//! - [`COMMON_FIELDS`] are always written.
//! - [`OPTIONAL_FIELDS`] are written only when they differ from their
//!   default, so a document is a delta against a freshly created node.
//! - [`IGNORED_FIELDS`] and names starting with `_` are never written.
//! - `node_tree`, `color_ramp` and `mapping` have their own schemas.
//! - Anything else is written if it is a scalar, by name if it refers to
//!   another object, and dropped otherwise.
//!
//! Embedded subtrees found through `node_tree` are extracted once each into
//! the document's flat `groups` map, however deeply they nest.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::document::{ColorRamp, ColorStop, CurveMapping, NodeDocument, TreeDocument, MATERIAL_KIND};
use crate::value::{round_float, HostValue, Value};

/// Fields every node document carries.
pub const COMMON_FIELDS: &[&str] = &["name", "bl_idname", "location", "inputs", "outputs"];

/// Default of an optional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// Boolean default
    Bool(bool),
    /// String default
    Text(&'static str),
    /// No object set
    Unset,
}

impl FieldDefault {
    /// Whether `value` equals this default.
    pub fn matches(self, value: &HostValue) -> bool {
        match (self, value) {
            (Self::Bool(d), HostValue::Bool(v)) => d == *v,
            (Self::Text(d), HostValue::Text(v)) => d == v,
            (Self::Unset, HostValue::None) => true,
            _ => false,
        }
    }
}

/// Fields written only when they differ from their default.
pub const OPTIONAL_FIELDS: &[(&str, FieldDefault)] = &[
    ("hide", FieldDefault::Bool(false)),
    ("label", FieldDefault::Text("")),
    ("mute", FieldDefault::Bool(false)),
    ("parent", FieldDefault::Unset),
    ("select", FieldDefault::Bool(false)),
    ("show_options", FieldDefault::Bool(true)),
    ("show_preview", FieldDefault::Bool(false)),
    ("show_texture", FieldDefault::Bool(false)),
    ("use_custom_color", FieldDefault::Bool(false)),
];

/// Fields that are derivable, recreated by the host, or noise.
pub const IGNORED_FIELDS: &[&str] = &[
    "bl_description",
    "bl_icon",
    "bl_label",
    "type",
    "bl_height_default",
    "bl_height_max",
    "bl_height_min",
    "bl_rna",
    "bl_static_type",
    "bl_width_default",
    "bl_width_max",
    "bl_width_min",
    "draw_buttons",
    "draw_buttons_ext",
    "input_template",
    "texture_mapping",
    "uv_map",
    "color_mapping",
    "internal_links",
    "is_registered_node_type",
    "output_template",
    "poll",
    "poll_instance",
    "rna_type",
    "socket_value_update",
    "update",
    "image_user",
    "dimensions",
    "width_hidden",
    "interface",
    "object",
    "text",
    "color",
    "height",
    "image",
    "width",
    "filepath",
];

/// Fields with their own schema.
pub const SPECIAL_FIELDS: &[&str] = &["node_tree", "color_ramp", "mapping"];

/// Interface item properties never written.
pub const INTERFACE_IGNORED: &[&str] = &["index", "rna_type", "bl_rna", "bl_socket_idname", "interface_items"];

/// Interface item properties written even when default.
pub const INTERFACE_ALWAYS_SAVED: &[&str] = &["position"];

/// How the codec treats one node attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Always written through its own path
    Common,
    /// Written when not equal to the default
    Optional(FieldDefault),
    /// Never written
    Ignored,
    /// Written through its own schema
    Special,
    /// Written by the catch-all rule
    Extra,
}

/// Look up the policy for an attribute name.
pub fn field_policy(name: &str) -> FieldPolicy {
    if COMMON_FIELDS.contains(&name) {
        FieldPolicy::Common
    } else if let Some((_, default)) = OPTIONAL_FIELDS.iter().find(|(field, _)| *field == name) {
        FieldPolicy::Optional(*default)
    } else if IGNORED_FIELDS.contains(&name) || name.starts_with('_') {
        FieldPolicy::Ignored
    } else if SPECIAL_FIELDS.contains(&name) {
        FieldPolicy::Special
    } else {
        FieldPolicy::Extra
    }
}

/// One link leaving an output socket.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkView {
    /// Name of the destination node
    pub to_node: String,
    /// Index of the destination input
    pub to_input: usize,
}

/// Read view of one socket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocketView {
    /// Current default, `None` if the socket type has none
    pub default_value: Option<HostValue>,
    /// Links leaving this socket (outputs only)
    pub links: Vec<LinkView>,
}

/// One property of an interface item, with the default the host declares.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceProperty {
    /// Property name
    pub name: String,
    /// Current value
    pub value: HostValue,
    /// Declared default, if the property has one
    pub default: Option<HostValue>,
}

/// Read view of one interface item (socket or panel).
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceItemView {
    /// Display name
    pub name: String,
    /// Non-callable properties
    pub properties: Vec<InterfaceProperty>,
}

/// A live node tree the codec can read.
pub trait HostTree: Sized {
    /// Node view type
    type Node: HostNode<Tree = Self>;

    /// Tree name
    fn name(&self) -> &str;

    /// Tree type identifier
    fn type_id(&self) -> &str;

    /// Nodes in host order
    fn nodes(&self) -> Vec<Self::Node>;

    /// Interface items, panels included
    fn interface_items(&self) -> Vec<InterfaceItemView>;
}

/// A live node the codec can read.
pub trait HostNode {
    /// Tree view type, for embedded subtrees
    type Tree: HostTree;

    /// Node name
    fn name(&self) -> &str;

    /// Node type identifier
    fn type_id(&self) -> &str;

    /// Editor location
    fn location(&self) -> [f64; 2];

    /// Input sockets in order
    fn inputs(&self) -> Vec<SocketView>;

    /// Output sockets in order
    fn outputs(&self) -> Vec<SocketView>;

    /// Every named attribute besides sockets, location and the special fields
    fn attributes(&self) -> Vec<(String, HostValue)>;

    /// Embedded subtree of a group node
    fn node_tree(&self) -> Option<Self::Tree>;

    /// Color ramp of a ramp node
    fn color_ramp(&self) -> Option<ColorRamp>;

    /// Curve mapping of a curves node
    fn mapping(&self) -> Option<CurveMapping>;
}

/// A node document plus the subtree it embeds, if any.
#[derive(Debug)]
pub struct NodeExtract<T> {
    /// The node's properties
    pub document: NodeDocument,
    /// Subtree found through `node_tree`
    pub group: Option<T>,
}

/// Socket default as stored: strings verbatim, numbers rounded, vectors tupled.
fn socket_default(value: &HostValue) -> Option<Value> {
    match value {
        HostValue::None => None,
        HostValue::Text(text) => Some(Value::Text(text.clone())),
        other => other.to_primitive().or_else(|| other.to_tuple()),
    }
}

fn round_floats(values: &[f64]) -> Vec<f64> {
    values.iter().copied().map(round_float).collect()
}

/// Extract one node. Pure over the node view.
pub fn extract_node<N: HostNode>(node: &N) -> NodeExtract<N::Tree> {
    let [x, y] = node.location();
    let mut doc = NodeDocument::new(node.name(), node.type_id()).with_location(x.round() as i64, y.round() as i64);

    for (index, socket) in node.inputs().iter().enumerate() {
        if let Some(value) = socket.default_value.as_ref().and_then(socket_default) {
            doc.inputs.insert(index, value);
        }
    }

    for (index, socket) in node.outputs().iter().enumerate() {
        if let Some(value) = socket.default_value.as_ref().and_then(socket_default) {
            doc.out_dv.insert(index, value);
        }
        for link in &socket.links {
            doc.add_link(index, &link.to_node, link.to_input);
        }
    }

    let attributes = node.attributes();
    for (name, value) in &attributes {
        match field_policy(name) {
            FieldPolicy::Common | FieldPolicy::Ignored | FieldPolicy::Special => {}
            FieldPolicy::Optional(default) => {
                if default.matches(value) {
                    continue;
                }
                if name == "parent" {
                    match value.reference_name() {
                        Some(parent) => doc.parent = Some(parent.to_string()),
                        None => tracing::warn!("Node {:?} has a parent without a name", doc.name),
                    }
                    continue;
                }
                let Some(stored) = value.to_scalar() else {
                    tracing::debug!("Optional field {} on {:?} is not a scalar, dropped", name, doc.name);
                    continue;
                };
                doc.attributes.insert(name.clone(), stored);
                if name == "use_custom_color" {
                    let color = attributes.iter().find(|(n, _)| n == "color").and_then(|(_, c)| c.to_tuple());
                    if let Some(color) = color {
                        doc.attributes.insert("color".into(), color);
                    }
                }
            }
            FieldPolicy::Extra => {
                if let Some(stored) = value.to_scalar() {
                    doc.attributes.insert(name.clone(), stored);
                } else if let Some(reference) = value.reference_name() {
                    doc.attributes.insert(name.clone(), Value::from(reference));
                } else {
                    tracing::trace!("Dropped attribute {} on {:?}", name, doc.name);
                }
            }
        }
    }

    let group = node.node_tree();
    if let Some(tree) = &group {
        doc.node_tree = Some(tree.name().to_string());
    }

    doc.color_ramp = node.color_ramp().map(|ramp| ColorRamp {
        elements: ramp
            .elements
            .iter()
            .map(|stop| ColorStop {
                position: round_float(stop.position),
                color: round_floats(&stop.color),
            })
            .collect(),
        ..ramp
    });

    doc.mapping = node.mapping().map(|mapping| CurveMapping {
        curves: mapping
            .curves
            .iter()
            .map(|points| points.iter().map(|[x, y]| [round_float(*x), round_float(*y)]).collect())
            .collect(),
        ..mapping
    });

    NodeExtract { document: doc, group }
}

/// Extract the sparse properties of one interface item.
pub fn extract_interface_item(item: &InterfaceItemView) -> IndexMap<String, Value> {
    let mut stored = IndexMap::new();
    for prop in &item.properties {
        let name = prop.name.as_str();
        if name.starts_with('_') || INTERFACE_IGNORED.contains(&name) || prop.value == HostValue::None {
            continue;
        }
        if !INTERFACE_ALWAYS_SAVED.contains(&name) && prop.default.as_ref() == Some(&prop.value) {
            continue;
        }

        if name == "parent" {
            if let HostValue::Object(parent) = &prop.value {
                if let Some(uid) = parent.persistent_uid {
                    stored.insert(prop.name.clone(), Value::Int(uid));
                    continue;
                }
            }
        }

        let value = if let Some(value) = prop.value.to_scalar() {
            value
        } else if let Some(tuple) = prop.value.to_tuple() {
            tracing::debug!("Saved {} of {:?} as a tuple", name, item.name);
            tuple
        } else if let Some(reference) = prop.value.reference_name() {
            tracing::debug!("Saved {} of {:?} as a name", name, item.name);
            Value::from(reference)
        } else {
            tracing::warn!("Could not save {} of {:?}, stored as null", name, item.name);
            Value::Null
        };
        stored.insert(prop.name.clone(), value);
    }
    stored
}

/// Extraction state for one call: the group registry it owns.
#[derive(Debug, Default)]
struct Extraction {
    groups: IndexMap<String, TreeDocument>,
    visiting: HashSet<String>,
}

impl Extraction {
    fn tree<T: HostTree>(&mut self, tree: &T, kind: &str, with_interface: bool) -> TreeDocument {
        let mut doc = TreeDocument::new(tree.name(), kind);
        self.visiting.insert(doc.name.clone());

        for node in tree.nodes() {
            let NodeExtract { document, group } = extract_node(&node);
            if let Some(group) = group {
                self.group(&group);
            }
            doc.add_node(document);
        }

        if with_interface {
            for item in tree.interface_items() {
                doc.interface.insert(item.name.clone(), extract_interface_item(&item));
            }
        }

        self.visiting.remove(&doc.name);
        doc
    }

    fn group<T: HostTree>(&mut self, tree: &T) {
        let name = tree.name();
        if self.groups.contains_key(name) {
            return;
        }
        if self.visiting.contains(name) {
            tracing::warn!("Group {:?} contains itself, not descending again", name);
            return;
        }
        tracing::debug!("Extracting group {:?}", name);
        let doc = self.tree(tree, tree.type_id(), true);
        self.groups.insert(doc.name.clone(), doc);
    }
}

/// Extract a node tree with its groups and interface.
pub fn extract_tree<T: HostTree>(tree: &T) -> TreeDocument {
    let mut extraction = Extraction::default();
    let mut doc = extraction.tree(tree, tree.type_id(), true);
    doc.groups = extraction.groups;
    doc
}

/// Extract the node tree of a material named `name`.
pub fn extract_material<T: HostTree>(name: &str, tree: &T) -> TreeDocument {
    let mut extraction = Extraction::default();
    let mut doc = extraction.tree(tree, MATERIAL_KIND, false);
    doc.name = name.to_string();
    doc.groups = extraction.groups;
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LinkTarget;
    use crate::value::ObjectRef;

    #[derive(Debug, Clone, Default)]
    struct FakeTree {
        name: String,
        kind: String,
        nodes: Vec<FakeNode>,
        interface: Vec<InterfaceItemView>,
    }

    #[derive(Debug, Clone, Default)]
    struct FakeNode {
        name: String,
        kind: String,
        location: [f64; 2],
        inputs: Vec<SocketView>,
        outputs: Vec<SocketView>,
        attributes: Vec<(String, HostValue)>,
        group: Option<Box<FakeTree>>,
        ramp: Option<ColorRamp>,
    }

    impl HostTree for FakeTree {
        type Node = FakeNode;

        fn name(&self) -> &str {
            &self.name
        }

        fn type_id(&self) -> &str {
            &self.kind
        }

        fn nodes(&self) -> Vec<FakeNode> {
            self.nodes.clone()
        }

        fn interface_items(&self) -> Vec<InterfaceItemView> {
            self.interface.clone()
        }
    }

    impl HostNode for FakeNode {
        type Tree = FakeTree;

        fn name(&self) -> &str {
            &self.name
        }

        fn type_id(&self) -> &str {
            &self.kind
        }

        fn location(&self) -> [f64; 2] {
            self.location
        }

        fn inputs(&self) -> Vec<SocketView> {
            self.inputs.clone()
        }

        fn outputs(&self) -> Vec<SocketView> {
            self.outputs.clone()
        }

        fn attributes(&self) -> Vec<(String, HostValue)> {
            self.attributes.clone()
        }

        fn node_tree(&self) -> Option<FakeTree> {
            self.group.as_deref().cloned()
        }

        fn color_ramp(&self) -> Option<ColorRamp> {
            self.ramp.clone()
        }

        fn mapping(&self) -> Option<CurveMapping> {
            None
        }
    }

    fn node(name: &str, kind: &str) -> FakeNode {
        FakeNode {
            name: name.into(),
            kind: kind.into(),
            attributes: vec![
                ("hide".into(), HostValue::Bool(false)),
                ("label".into(), HostValue::Text(String::new())),
                ("parent".into(), HostValue::None),
                ("show_options".into(), HostValue::Bool(true)),
                ("use_custom_color".into(), HostValue::Bool(false)),
                ("color".into(), HostValue::floats([0.6, 0.6, 0.6])),
                ("width".into(), HostValue::Float(140.0)),
            ],
            ..FakeNode::default()
        }
    }

    fn set(node: &mut FakeNode, name: &str, value: HostValue) {
        match node.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => node.attributes.push((name.into(), value)),
        }
    }

    fn link(to: &str, input: usize) -> LinkView {
        LinkView {
            to_node: to.into(),
            to_input: input,
        }
    }

    #[test]
    fn test_policy_table() {
        assert_eq!(field_policy("name"), FieldPolicy::Common);
        assert_eq!(field_policy("mute"), FieldPolicy::Optional(FieldDefault::Bool(false)));
        assert_eq!(field_policy("show_options"), FieldPolicy::Optional(FieldDefault::Bool(true)));
        assert_eq!(field_policy("bl_rna"), FieldPolicy::Ignored);
        assert_eq!(field_policy("__doc__"), FieldPolicy::Ignored);
        assert_eq!(field_policy("node_tree"), FieldPolicy::Special);
        assert_eq!(field_policy("operation"), FieldPolicy::Extra);
    }

    #[test]
    fn test_defaults_are_not_stored() {
        let doc = extract_node(&node("Math", "ShaderNodeMath")).document;
        assert!(doc.attributes.is_empty());
        assert_eq!(doc.parent, None);
    }

    #[test]
    fn test_sparse_flag_appears_and_disappears() {
        let mut n = node("Math", "ShaderNodeMath");
        set(&mut n, "mute", HostValue::Bool(true));
        set(&mut n, "show_options", HostValue::Bool(false));
        let doc = extract_node(&n).document;
        assert_eq!(doc.attribute("mute"), Some(&Value::Bool(true)));
        assert_eq!(doc.attribute("show_options"), Some(&Value::Bool(false)));

        set(&mut n, "mute", HostValue::Bool(false));
        let doc = extract_node(&n).document;
        assert_eq!(doc.attribute("mute"), None);
        let json = doc.attributes.keys().cloned().collect::<Vec<_>>();
        assert_eq!(json, vec!["show_options".to_string()]);
    }

    #[test]
    fn test_custom_color_and_parent() {
        let mut n = node("Mix", "ShaderNodeMixRGB");
        set(&mut n, "use_custom_color", HostValue::Bool(true));
        set(&mut n, "color", HostValue::floats([0.1234567, 0.5, 0.0]));
        set(&mut n, "parent", HostValue::Object(ObjectRef::named("Frame")));
        let doc = extract_node(&n).document;
        assert_eq!(doc.attribute("use_custom_color"), Some(&Value::Bool(true)));
        assert_eq!(doc.attribute("color"), Some(&Value::floats([0.12346, 0.5, 0.0])));
        assert_eq!(doc.parent.as_deref(), Some("Frame"));
        assert_eq!(doc.attribute("width"), None);
    }

    #[test]
    fn test_extras_rule() {
        let mut n = node("Tex", "ShaderNodeTexImage");
        set(&mut n, "interpolation", HostValue::Text("Linear".into()));
        set(&mut n, "extension", HostValue::Int(2));
        set(&mut n, "target", HostValue::Object(ObjectRef::named("Cube")));
        set(&mut n, "dims", HostValue::floats([1.0, 2.0]));
        set(&mut n, "handle", HostValue::Opaque);
        set(&mut n, "_private", HostValue::Int(1));
        let doc = extract_node(&n).document;
        assert_eq!(doc.attribute("interpolation"), Some(&Value::from("Linear")));
        assert_eq!(doc.attribute("extension"), Some(&Value::Int(2)));
        assert_eq!(doc.attribute("target"), Some(&Value::from("Cube")));
        assert_eq!(doc.attribute("dims"), None);
        assert_eq!(doc.attribute("handle"), None);
        assert_eq!(doc.attribute("_private"), None);
    }

    #[test]
    fn test_sockets() {
        let mut n = node("Value", "ShaderNodeMath");
        n.location = [10.6, -3.2];
        n.inputs = vec![
            SocketView {
                default_value: Some(HostValue::Float(0.333333333)),
                ..SocketView::default()
            },
            SocketView::default(),
            SocketView {
                default_value: Some(HostValue::None),
                ..SocketView::default()
            },
            SocketView {
                default_value: Some(HostValue::floats([0.8, 0.8, 0.8, 1.0])),
                ..SocketView::default()
            },
        ];
        n.outputs = vec![
            SocketView {
                default_value: Some(HostValue::Text("label".into())),
                links: vec![link("A", 0), link("B", 1), link("B", 2)],
            },
            SocketView {
                default_value: Some(HostValue::Float(0.5)),
                links: vec![],
            },
        ];
        let doc = extract_node(&n).document;
        assert_eq!(doc.location, [11, -3]);
        assert_eq!(doc.inputs.len(), 2);
        assert_eq!(doc.inputs[&0], Value::Float(0.33333));
        assert_eq!(doc.inputs[&3], Value::floats([0.8, 0.8, 0.8, 1.0]));
        assert_eq!(doc.out_dv[&0], Value::from("label"));
        assert_eq!(doc.out_dv[&1], Value::Float(0.5));
        assert_eq!(doc.outputs.len(), 1);
        assert_eq!(doc.outputs[&0]["A"], LinkTarget::Single(0));
        assert_eq!(doc.outputs[&0]["B"], LinkTarget::Many(vec![1, 2]));
    }

    #[test]
    fn test_color_ramp_rounded() {
        let mut n = node("Ramp", "ShaderNodeValToRGB");
        n.ramp = Some(ColorRamp {
            color_mode: "RGB".into(),
            hue_interpolation: "NEAR".into(),
            interpolation: "EASE".into(),
            elements: vec![ColorStop {
                position: 0.4999999,
                color: vec![1.0, 0.0000001, 0.0, 1.0],
            }],
        });
        let ramp = extract_node(&n).document.color_ramp.unwrap();
        assert_eq!(ramp.interpolation, "EASE");
        assert_eq!(ramp.elements[0].position, 0.5);
        assert_eq!(ramp.elements[0].color, vec![1.0, 0.0, 0.0, 1.0]);
    }

    fn item(name: &str, props: Vec<(&str, HostValue, Option<HostValue>)>) -> InterfaceItemView {
        InterfaceItemView {
            name: name.into(),
            properties: props
                .into_iter()
                .map(|(name, value, default)| InterfaceProperty {
                    name: name.into(),
                    value,
                    default,
                })
                .collect(),
        }
    }

    #[test]
    fn test_interface_item() {
        let fac = item(
            "Fac",
            vec![
                ("position", HostValue::Int(0), Some(HostValue::Int(0))),
                ("index", HostValue::Int(3), None),
                ("in_out", HostValue::Text("INPUT".into()), Some(HostValue::Text("INPUT".into()))),
                ("socket_type", HostValue::Text("NodeSocketFloat".into()), None),
                ("min_value", HostValue::Float(0.0), Some(HostValue::Float(-3.4e38))),
                ("description", HostValue::None, None),
                ("default_value", HostValue::floats([0.5, 0.5]), None),
                ("parent", HostValue::Object(ObjectRef::uid(7)), None),
                ("attribute_domain", HostValue::Object(ObjectRef::named("POINT")), None),
                ("layer", HostValue::Opaque, None),
            ],
        );
        let stored = extract_interface_item(&fac);
        let keys = stored.keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec!["position", "socket_type", "min_value", "default_value", "parent", "attribute_domain", "layer"]
        );
        assert_eq!(stored["position"], Value::Int(0));
        assert_eq!(stored["default_value"], Value::floats([0.5, 0.5]));
        assert_eq!(stored["parent"], Value::Int(7));
        assert_eq!(stored["attribute_domain"], Value::from("POINT"));
        assert_eq!(stored["layer"], Value::Null);
    }

    fn group_tree(name: &str, inner: Option<FakeTree>) -> FakeTree {
        let mut n = node("Inner Node", "ShaderNodeMath");
        if let Some(inner) = inner {
            n.kind = "ShaderNodeGroup".into();
            n.group = Some(Box::new(inner));
        }
        FakeTree {
            name: name.into(),
            kind: "ShaderNodeTree".into(),
            nodes: vec![n],
            interface: vec![item("Value", vec![("position", HostValue::Int(0), None)])],
        }
    }

    #[test]
    fn test_groups_flattened_and_deduplicated() {
        let deep = group_tree("Deep", None);
        let middle = group_tree("Middle", Some(deep));

        let mut a = node("Group A", "ShaderNodeGroup");
        a.group = Some(Box::new(middle.clone()));
        let mut b = node("Group B", "ShaderNodeGroup");
        b.group = Some(Box::new(middle));
        let tree = FakeTree {
            name: "Material Tree".into(),
            kind: "ShaderNodeTree".into(),
            nodes: vec![a, b],
            interface: vec![],
        };

        let doc = extract_material("Gold", &tree);
        assert_eq!(doc.name, "Gold");
        assert!(doc.is_material());
        assert_eq!(doc.groups.keys().collect::<Vec<_>>(), vec!["Deep", "Middle"]);
        assert!(doc.groups.values().all(|g| g.groups.is_empty()));
        assert_eq!(doc.nodes["Group A"].node_tree.as_deref(), Some("Middle"));
        assert_eq!(doc.groups["Middle"].nodes["Inner Node"].node_tree.as_deref(), Some("Deep"));
        assert!(doc.groups["Middle"].interface.contains_key("Value"));
    }

    #[test]
    fn test_self_referencing_group_terminates() {
        let mut looped = group_tree("Loop", None);
        let mut inner = node("Again", "ShaderNodeGroup");
        inner.group = Some(Box::new(looped.clone()));
        looped.nodes.push(inner);

        let doc = extract_tree(&looped);
        assert_eq!(doc.name, "Loop");
        assert!(doc.groups.is_empty());
        assert_eq!(doc.nodes["Again"].node_tree.as_deref(), Some("Loop"));
    }

    #[test]
    fn test_registry_is_per_call() {
        let mut g = node("G", "ShaderNodeGroup");
        g.group = Some(Box::new(group_tree("Shared", None)));
        let with_group = FakeTree {
            name: "A".into(),
            kind: "ShaderNodeTree".into(),
            nodes: vec![g],
            interface: vec![],
        };
        let plain = group_tree("B", None);

        assert_eq!(extract_tree(&with_group).groups.len(), 1);
        assert!(extract_tree(&plain).groups.is_empty());
    }
}
