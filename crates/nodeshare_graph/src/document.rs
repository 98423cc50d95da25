// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory node tree documents and their JSON text form.
//!
//! A [`TreeDocument`] is what gets shared: the tree's nodes keyed by name,
//! the embedded subtrees used by group nodes (flattened into one sibling
//! map) and the tree's interface items. Links are stored on the source
//! node as `output index -> target node name -> target input(s)`, and are
//! resolved by name when the tree is rebuilt.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, FormatError, SchemaError};
use crate::value::Value;

/// Tree kind used for material documents.
pub const MATERIAL_KIND: &str = "material";

/// Map a legacy tree kind to its tree type identifier.
pub fn normalize_kind(kind: &str) -> &str {
    match kind {
        "GEOMETRY" => "GeometryNodeTree",
        "COMPOSITING" => "CompositorNodeTree",
        "SHADER" => "ShaderNodeTree",
        "TEXTURE" => "TextureNodeTree",
        other => other,
    }
}

/// Destination input(s) of one link entry.
///
/// Both shapes are legal and kept as read: a bare integer for a single
/// destination, a list when one output feeds several inputs of the same
/// node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkTarget {
    /// One destination input
    Single(usize),
    /// Several destination inputs
    Many(Vec<usize>),
}

impl LinkTarget {
    /// Destination inputs, whatever the stored shape.
    pub fn indices(&self) -> &[usize] {
        match self {
            Self::Single(index) => std::slice::from_ref(index),
            Self::Many(indices) => indices,
        }
    }

    /// Add another destination, widening a single target to a list.
    pub fn push(&mut self, index: usize) {
        match self {
            Self::Single(first) => *self = Self::Many(vec![*first, index]),
            Self::Many(indices) => indices.push(index),
        }
    }

    /// Rewrite every destination, dropping those mapped to `None`.
    ///
    /// Returns `false` if nothing is left. The stored shape is kept.
    pub fn remap(&mut self, mut f: impl FnMut(usize) -> Option<usize>) -> bool {
        match self {
            Self::Single(index) => match f(*index) {
                Some(new) => {
                    *index = new;
                    true
                }
                None => false,
            },
            Self::Many(indices) => {
                *indices = indices.iter().filter_map(|i| f(*i)).collect();
                !indices.is_empty()
            }
        }
    }
}

/// Links leaving one output: target node name to destination input(s).
pub type LinkMap = IndexMap<String, LinkTarget>;

/// One control point of a color ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorStop {
    /// Position along the ramp
    pub position: f64,
    /// RGBA color
    pub color: Vec<f64>,
}

/// Color ramp settings of a ramp node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRamp {
    /// Color mode identifier
    pub color_mode: String,
    /// Hue interpolation identifier
    pub hue_interpolation: String,
    /// Interpolation identifier
    pub interpolation: String,
    /// Control points, keyed by position on the wire.
    ///
    /// Stops sharing a position share a key, so only the last of them is
    /// written.
    #[serde(with = "color_stops")]
    pub elements: Vec<ColorStop>,
}

/// Curve mapping settings of a curves node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveMapping {
    /// Clip rectangle, max x
    pub clip_max_x: f64,
    /// Clip rectangle, max y
    pub clip_max_y: f64,
    /// Clip rectangle, min x
    pub clip_min_x: f64,
    /// Clip rectangle, min y
    pub clip_min_y: f64,
    /// Extrapolation identifier
    pub extend: String,
    /// Tone identifier
    pub tone: String,
    /// Whether clipping is enabled
    pub use_clip: bool,
    /// Points of each curve, keyed by index on the wire
    #[serde(with = "indexed_curves")]
    pub curves: Vec<Vec<[f64; 2]>>,
}

impl CurveMapping {
    /// Scalar settings as attribute name/value pairs.
    pub fn settings(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("clip_max_x", Value::Float(self.clip_max_x)),
            ("clip_max_y", Value::Float(self.clip_max_y)),
            ("clip_min_x", Value::Float(self.clip_min_x)),
            ("clip_min_y", Value::Float(self.clip_min_y)),
            ("extend", Value::Text(self.extend.clone())),
            ("tone", Value::Text(self.tone.clone())),
            ("use_clip", Value::Bool(self.use_clip)),
        ]
    }
}

/// One node of a tree document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Unique name within the owning tree
    pub name: String,
    /// Host node type identifier
    #[serde(rename = "bl_idname")]
    pub type_id: String,
    /// Integer-rounded editor location
    #[serde(deserialize_with = "location::deserialize")]
    pub location: [i64; 2],
    /// Input socket defaults by socket index
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", with = "slot_map")]
    pub inputs: BTreeMap<usize, Value>,
    /// Links by output socket index
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", with = "slot_map")]
    pub outputs: BTreeMap<usize, LinkMap>,
    /// Output socket defaults by socket index
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", with = "slot_map")]
    pub out_dv: BTreeMap<usize, Value>,
    /// Name of the containing frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Name of the embedded subtree, for group nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_tree: Option<String>,
    /// Color ramp, for ramp nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_ramp: Option<ColorRamp>,
    /// Curve mapping, for curve nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<CurveMapping>,
    /// Non-default flags and any other stored attribute
    #[serde(flatten)]
    pub attributes: IndexMap<String, Value>,
}

impl NodeDocument {
    /// Create a node with no stored properties.
    pub fn new(name: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: type_id.into(),
            location: [0, 0],
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            out_dv: BTreeMap::new(),
            parent: None,
            node_tree: None,
            color_ramp: None,
            mapping: None,
            attributes: IndexMap::new(),
        }
    }

    /// Set the location.
    pub fn with_location(mut self, x: i64, y: i64) -> Self {
        self.location = [x, y];
        self
    }

    /// Record a link from `output` to `input` on node `target`.
    pub fn add_link(&mut self, output: usize, target: &str, input: usize) {
        let links = self.outputs.entry(output).or_default();
        match links.get_mut(target) {
            Some(existing) => existing.push(input),
            None => {
                links.insert(target.to_string(), LinkTarget::Single(input));
            }
        }
    }

    /// Stored attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Every `(output, target, input)` link of this node.
    pub fn links(&self) -> impl Iterator<Item = (usize, &str, usize)> + '_ {
        self.outputs.iter().flat_map(|(output, links)| {
            links.iter().flat_map(move |(target, ids)| {
                ids.indices().iter().map(move |input| (*output, target.as_str(), *input))
            })
        })
    }
}

/// A node tree document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDocument {
    /// Tree (or material) name
    pub name: String,
    /// Tree type identifier, or [`MATERIAL_KIND`]
    #[serde(rename = "type")]
    pub kind: String,
    /// Nodes keyed by name, in document order
    pub nodes: IndexMap<String, NodeDocument>,
    /// Embedded subtrees keyed by name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty", deserialize_with = "groups::deserialize")]
    pub groups: IndexMap<String, TreeDocument>,
    /// Interface items keyed by display name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub interface: IndexMap<String, IndexMap<String, Value>>,
    /// Fields this version does not know about
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl TreeDocument {
    /// Create an empty tree document.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            nodes: IndexMap::new(),
            groups: IndexMap::new(),
            interface: IndexMap::new(),
            extra: IndexMap::new(),
        }
    }

    /// Add a node, replacing any node of the same name.
    pub fn add_node(&mut self, node: NodeDocument) {
        if let Some(old) = self.nodes.insert(node.name.clone(), node) {
            tracing::warn!("Replaced duplicate node {:?} in tree {:?}", old.name, self.name);
        }
    }

    /// Node by name.
    pub fn node(&self, name: &str) -> Option<&NodeDocument> {
        self.nodes.get(name)
    }

    /// Mutable node by name.
    pub fn node_mut(&mut self, name: &str) -> Option<&mut NodeDocument> {
        self.nodes.get_mut(name)
    }

    /// Whether this document describes a material.
    pub fn is_material(&self) -> bool {
        self.kind == MATERIAL_KIND
    }

    /// This tree followed by every group.
    pub fn trees(&self) -> impl Iterator<Item = &TreeDocument> {
        std::iter::once(self).chain(self.groups.values())
    }

    /// Indented JSON, for reading and for plain-text export.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Compact JSON, the form that gets compressed.
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse either JSON form.
    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        let doc: Self = serde_json::from_str(text).map_err(classify_json_error)?;
        doc.validate()?;
        Ok(doc)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for tree in self.trees() {
            for (key, node) in &tree.nodes {
                if node.name.is_empty() {
                    return Err(SchemaError::EmptyName {
                        tree: tree.name.clone(),
                    });
                }
                if *key != node.name {
                    return Err(SchemaError::NodeKeyMismatch {
                        tree: tree.name.clone(),
                        key: key.clone(),
                        name: node.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Split serde_json failures into syntax (format) and shape (schema) errors.
pub(crate) fn classify_json_error(e: serde_json::Error) -> DecodeError {
    use serde_json::error::Category;

    match e.classify() {
        Category::Data => {
            let message = e.to_string();
            match message
                .strip_prefix("missing field `")
                .and_then(|rest| rest.split('`').next())
            {
                Some(field) => SchemaError::MissingField {
                    field: field.to_string(),
                }
                .into(),
                None => SchemaError::WrongShape(message).into(),
            }
        }
        Category::Syntax | Category::Eof | Category::Io => FormatError::Json(e.to_string()).into(),
    }
}

/// Maps keyed by socket index; JSON object keys are strings.
mod slot_map {
    use std::collections::BTreeMap;

    use indexmap::IndexMap;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<V: Serialize, S: Serializer>(
        map: &BTreeMap<usize, V>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(map.iter().map(|(k, v)| (k.to_string(), v)))
    }

    pub fn deserialize<'de, V, D>(deserializer: D) -> Result<BTreeMap<usize, V>, D::Error>
    where
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let raw = IndexMap::<String, V>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, value)| {
                key.parse::<usize>()
                    .map(|index| (index, value))
                    .map_err(|_| D::Error::custom(format!("invalid socket index {key:?}")))
            })
            .collect()
    }
}

mod location {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[i64; 2], D::Error> {
        let [x, y] = <[f64; 2]>::deserialize(deserializer)?;
        Ok([x.round() as i64, y.round() as i64])
    }
}

mod color_stops {
    use indexmap::IndexMap;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::ColorStop;

    pub fn serialize<S: Serializer>(stops: &[ColorStop], serializer: S) -> Result<S::Ok, S::Error> {
        let mut keyed = IndexMap::with_capacity(stops.len());
        for stop in stops {
            let key = format!("{:?}", stop.position);
            if keyed.insert(key, &stop.color).is_some() {
                tracing::warn!("Color ramp has several stops at {}, keeping the last", stop.position);
            }
        }
        serializer.collect_map(keyed)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ColorStop>, D::Error> {
        let raw = IndexMap::<String, Vec<f64>>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, color)| {
                key.parse::<f64>()
                    .map(|position| ColorStop { position, color })
                    .map_err(|_| D::Error::custom(format!("invalid color ramp position {key:?}")))
            })
            .collect()
    }
}

mod indexed_curves {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(transparent)]
    struct Points(#[serde(with = "super::slot_map")] BTreeMap<usize, [f64; 2]>);

    pub fn serialize<S: Serializer>(curves: &[Vec<[f64; 2]>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(curves.iter().enumerate().map(|(i, points)| {
            (i.to_string(), Points(points.iter().copied().enumerate().collect()))
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<[f64; 2]>>, D::Error> {
        #[derive(Deserialize)]
        #[serde(transparent)]
        struct Curves(#[serde(with = "super::slot_map")] BTreeMap<usize, Points>);

        let Curves(curves) = Curves::deserialize(deserializer)?;
        Ok(curves
            .into_values()
            .map(|Points(points)| points.into_values().collect())
            .collect())
    }
}

/// Groups are tree documents. Older documents hold them as bare node
/// maps, which are promoted to trees named by their key.
mod groups {
    use indexmap::IndexMap;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    use super::{NodeDocument, TreeDocument};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<IndexMap<String, TreeDocument>, D::Error> {
        let raw = IndexMap::<String, serde_json::Value>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(name, value)| {
                let is_tree = value.get("nodes").is_some_and(serde_json::Value::is_object)
                    && value.get("name").is_some_and(serde_json::Value::is_string);
                let tree = if is_tree {
                    serde_json::from_value::<TreeDocument>(value)
                } else {
                    serde_json::from_value::<IndexMap<String, NodeDocument>>(value).map(|nodes| {
                        let mut tree = TreeDocument::new(name.clone(), String::new());
                        tree.nodes = nodes;
                        tree
                    })
                };
                tree.map(|tree| (name.clone(), tree))
                    .map_err(|e| D::Error::custom(format!("group {name:?}: {e}")))
            })
            .collect()
    }
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use crate::test_support::arb_document;

    proptest! {
        #[test]
        fn json_round_trip(doc in arb_document()) {
            let compact = doc.to_json_compact().unwrap();
            prop_assert_eq!(TreeDocument::from_json(&compact).unwrap(), doc.clone());
            let pretty = doc.to_json_pretty().unwrap();
            prop_assert_eq!(TreeDocument::from_json(&pretty).unwrap(), doc);
        }
    }
}
