// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rebuilding live node trees from documents.
//!
//! The builder drives a host [`GraphSink`]. Groups are created first so
//! group nodes can bind to them, then each tree is built in passes: every
//! node is created and configured, then the interface items are applied
//! (group input and output sockets come from them), then every link is
//! made, then every parent is set. Links and parents name nodes that may
//! come later in the document, hence the passes.
//!
//! Nothing past the creation of the target tree is fatal. Each refused
//! operation becomes a [`BuildIssue`] in the [`BuildReport`] and the build
//! carries on with the next item.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::document::{normalize_kind, ColorRamp, CurveMapping, NodeDocument, TreeDocument};
use crate::error::{BuildIssue, PropertyApplyError, ReferenceError, SinkError};
use crate::value::Value;

/// Tree kind used for the groups of a material document.
pub const MATERIAL_GROUP_KIND: &str = "ShaderNodeTree";

/// Write side of the host: creates and configures live objects.
///
/// Handles are cheap identifiers; a node handle must identify its tree.
pub trait GraphSink {
    /// Live tree handle
    type Tree: Clone;
    /// Live node handle
    type Node: Clone;

    /// Create a tree. `kind` is a tree type identifier or `"material"`.
    fn create_tree(&mut self, name: &str, kind: &str) -> Result<Self::Tree, SinkError>;

    /// Remove every node of a tree.
    fn clear_tree(&mut self, tree: &Self::Tree) -> Result<(), SinkError>;

    /// Create a node of the given type.
    fn create_node(&mut self, tree: &Self::Tree, type_id: &str) -> Result<Self::Node, SinkError>;

    /// Rename a node. The host may pick a different name on collision.
    fn set_node_name(&mut self, node: &Self::Node, name: &str) -> Result<(), SinkError>;

    /// Move a node.
    fn set_location(&mut self, node: &Self::Node, location: [f64; 2]) -> Result<(), SinkError>;

    /// Point a group node at a subtree.
    fn bind_node_tree(&mut self, node: &Self::Node, group: &Self::Tree) -> Result<(), SinkError>;

    /// Set the default of an input socket.
    fn set_input_default(&mut self, node: &Self::Node, index: usize, value: &Value) -> Result<(), SinkError>;

    /// Set the default of an output socket.
    fn set_output_default(&mut self, node: &Self::Node, index: usize, value: &Value) -> Result<(), SinkError>;

    /// Link an output socket to an input socket.
    fn link(&mut self, from: &Self::Node, output: usize, to: &Self::Node, input: usize) -> Result<(), SinkError>;

    /// Put a node inside a frame.
    fn set_parent(&mut self, child: &Self::Node, parent: &Self::Node) -> Result<(), SinkError>;

    /// Set any other attribute.
    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &Value) -> Result<(), SinkError>;

    /// Number of control points the color ramp has now.
    fn color_ramp_len(&self, node: &Self::Node) -> Result<usize, SinkError>;

    /// Set the color ramp's mode identifiers.
    fn set_color_ramp_modes(
        &mut self,
        node: &Self::Node,
        color_mode: &str,
        hue_interpolation: &str,
        interpolation: &str,
    ) -> Result<(), SinkError>;

    /// Move and recolor an existing control point.
    fn set_color_ramp_element(
        &mut self,
        node: &Self::Node,
        index: usize,
        position: f64,
        color: &[f64],
    ) -> Result<(), SinkError>;

    /// Append a control point.
    fn add_color_ramp_element(&mut self, node: &Self::Node, position: f64, color: &[f64]) -> Result<(), SinkError>;

    /// Number of points a mapping curve has now.
    fn curve_point_count(&self, node: &Self::Node, curve: usize) -> Result<usize, SinkError>;

    /// Move an existing curve point.
    fn set_curve_point(&mut self, node: &Self::Node, curve: usize, index: usize, point: [f64; 2])
        -> Result<(), SinkError>;

    /// Append a curve point.
    fn add_curve_point(&mut self, node: &Self::Node, curve: usize, point: [f64; 2]) -> Result<(), SinkError>;

    /// Set a scalar setting of the curve mapping.
    fn set_mapping_attribute(&mut self, node: &Self::Node, name: &str, value: &Value) -> Result<(), SinkError>;

    /// Create or update an interface item.
    fn set_interface_item(
        &mut self,
        tree: &Self::Tree,
        name: &str,
        properties: &IndexMap<String, Value>,
    ) -> Result<(), SinkError>;
}

/// Outcome of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Group trees created
    pub groups: usize,
    /// Nodes created, across all trees
    pub nodes: usize,
    /// Links made
    pub links: usize,
    /// Parents set
    pub parents: usize,
    /// Items that were skipped
    pub issues: Vec<BuildIssue>,
}

impl BuildReport {
    /// Whether every item was built.
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }

    fn push(&mut self, issue: impl Into<BuildIssue>) {
        let issue = issue.into();
        tracing::warn!("{}", issue);
        self.issues.push(issue);
    }

    fn property(&mut self, node: &str, target: impl Into<String>, source: SinkError) {
        self.push(PropertyApplyError {
            node: node.to_string(),
            target: target.into(),
            source,
        });
    }
}

/// Where the top-level tree is built.
#[derive(Debug, Clone)]
pub enum BuildTarget<T> {
    /// Create a new tree named after the document
    New,
    /// Build into an existing tree
    Existing(T),
}

/// Builds documents through a sink.
pub struct GraphBuilder<'a, S: GraphSink> {
    sink: &'a mut S,
    clear_target: bool,
}

impl<'a, S: GraphSink> GraphBuilder<'a, S> {
    /// Create a builder over `sink`.
    pub fn new(sink: &'a mut S) -> Self {
        Self {
            sink,
            clear_target: false,
        }
    }

    /// Remove the target's existing nodes before building.
    pub fn clear_target(mut self, clear: bool) -> Self {
        self.clear_target = clear;
        self
    }

    /// Build `document`. Fails only if the target tree cannot be created.
    pub fn build(
        self,
        document: &TreeDocument,
        target: BuildTarget<S::Tree>,
    ) -> Result<(S::Tree, BuildReport), BuildIssue> {
        let mut report = BuildReport::default();
        let kind = normalize_kind(&document.kind);

        let tree = match target {
            BuildTarget::Existing(tree) => tree,
            BuildTarget::New => self.sink.create_tree(&document.name, kind).map_err(|source| BuildIssue::Create {
                what: "tree",
                name: document.name.clone(),
                source,
            })?,
        };
        if self.clear_target {
            if let Err(source) = self.sink.clear_tree(&tree) {
                report.property(&document.name, "clear", source);
            }
        }

        let group_kind = if document.is_material() { MATERIAL_GROUP_KIND } else { kind };
        let mut groups = HashMap::new();
        for (name, group) in &document.groups {
            let kind = match normalize_kind(&group.kind) {
                "" => group_kind,
                kind => kind,
            };
            match self.sink.create_tree(name, kind) {
                Ok(handle) => {
                    groups.insert(name.clone(), handle);
                    report.groups += 1;
                }
                Err(source) => report.push(BuildIssue::Create {
                    what: "group",
                    name: name.clone(),
                    source,
                }),
            }
        }

        let mut pass = TreePass {
            sink: self.sink,
            groups: &groups,
            report: &mut report,
        };
        for (name, group) in &document.groups {
            if let Some(handle) = groups.get(name) {
                tracing::debug!("Building group {:?}", name);
                pass.tree(group, handle);
            }
        }
        tracing::debug!("Building tree {:?}", document.name);
        pass.tree(document, &tree);

        tracing::info!(
            "Built {:?}: {} groups, {} nodes, {} links, {} parents, {} issues",
            document.name,
            report.groups,
            report.nodes,
            report.links,
            report.parents,
            report.issues.len()
        );
        Ok((tree, report))
    }
}

/// Build a document into a new tree with default options.
pub fn build<S: GraphSink>(document: &TreeDocument, sink: &mut S) -> Result<(S::Tree, BuildReport), BuildIssue> {
    GraphBuilder::new(sink).build(document, BuildTarget::New)
}

struct TreePass<'a, S: GraphSink> {
    sink: &'a mut S,
    groups: &'a HashMap<String, S::Tree>,
    report: &'a mut BuildReport,
}

impl<S: GraphSink> TreePass<'_, S> {
    fn tree(&mut self, document: &TreeDocument, tree: &S::Tree) {
        let mut built = HashMap::new();
        for node in document.nodes.values() {
            if let Some(handle) = self.node(tree, node) {
                built.insert(node.name.as_str(), handle);
            }
        }

        for (name, properties) in &document.interface {
            if let Err(source) = self.sink.set_interface_item(tree, name, properties) {
                self.report.property(&document.name, format!("interface item {name:?}"), source);
            }
        }

        for node in document.nodes.values() {
            self.links(node, &built);
        }

        for node in document.nodes.values() {
            let Some(parent) = &node.parent else {
                continue;
            };
            let (Some(child), Some(frame)) = (built.get(node.name.as_str()), built.get(parent.as_str())) else {
                if built.contains_key(node.name.as_str()) {
                    self.report.push(ReferenceError::Parent {
                        node: node.name.clone(),
                        parent: parent.clone(),
                    });
                }
                continue;
            };
            match self.sink.set_parent(child, frame) {
                Ok(()) => self.report.parents += 1,
                Err(source) => self.report.property(&node.name, "parent", source),
            }
        }
    }

    fn node(&mut self, tree: &S::Tree, doc: &NodeDocument) -> Option<S::Node> {
        let node = match self.sink.create_node(tree, &doc.type_id) {
            Ok(node) => node,
            Err(source) => {
                self.report.push(BuildIssue::Create {
                    what: "node",
                    name: doc.name.clone(),
                    source,
                });
                return None;
            }
        };
        self.report.nodes += 1;
        let name = doc.name.as_str();

        if let Err(source) = self.sink.set_node_name(&node, name) {
            self.report.property(name, "name", source);
        }
        let [x, y] = doc.location;
        if let Err(source) = self.sink.set_location(&node, [x as f64, y as f64]) {
            self.report.property(name, "location", source);
        }

        if let Some(group) = &doc.node_tree {
            match self.groups.get(group) {
                Some(handle) => {
                    if let Err(source) = self.sink.bind_node_tree(&node, handle) {
                        self.report.property(name, "node_tree", source);
                    }
                }
                None => self.report.push(ReferenceError::Group {
                    node: name.to_string(),
                    group: group.clone(),
                }),
            }
        }

        for (index, value) in &doc.inputs {
            if let Err(source) = self.sink.set_input_default(&node, *index, value) {
                self.report.property(name, format!("inputs[{index}]"), source);
            }
        }
        for (index, value) in &doc.out_dv {
            if let Err(source) = self.sink.set_output_default(&node, *index, value) {
                self.report.property(name, format!("outputs[{index}]"), source);
            }
        }

        if let Some(ramp) = &doc.color_ramp {
            self.color_ramp(&node, name, ramp);
        }
        if let Some(mapping) = &doc.mapping {
            self.mapping(&node, name, mapping);
        }

        for (attribute, value) in &doc.attributes {
            if let Err(source) = self.sink.set_attribute(&node, attribute, value) {
                self.report.property(name, format!("attribute {attribute}"), source);
            }
        }
        Some(node)
    }

    fn color_ramp(&mut self, node: &S::Node, name: &str, ramp: &ColorRamp) {
        if let Err(source) =
            self.sink
                .set_color_ramp_modes(node, &ramp.color_mode, &ramp.hue_interpolation, &ramp.interpolation)
        {
            self.report.property(name, "color_ramp modes", source);
        }
        let existing = match self.sink.color_ramp_len(node) {
            Ok(len) => len,
            Err(source) => {
                self.report.property(name, "color_ramp", source);
                return;
            }
        };
        for (index, stop) in ramp.elements.iter().enumerate() {
            let result = if index < existing {
                self.sink.set_color_ramp_element(node, index, stop.position, &stop.color)
            } else {
                self.sink.add_color_ramp_element(node, stop.position, &stop.color)
            };
            if let Err(source) = result {
                self.report.property(name, format!("color_ramp element {index}"), source);
            }
        }
    }

    fn mapping(&mut self, node: &S::Node, name: &str, mapping: &CurveMapping) {
        for (curve, points) in mapping.curves.iter().enumerate() {
            let existing = match self.sink.curve_point_count(node, curve) {
                Ok(count) => count,
                Err(source) => {
                    self.report.property(name, format!("mapping curve {curve}"), source);
                    continue;
                }
            };
            for (index, point) in points.iter().enumerate() {
                let result = if index < existing {
                    self.sink.set_curve_point(node, curve, index, *point)
                } else {
                    self.sink.add_curve_point(node, curve, *point)
                };
                if let Err(source) = result {
                    self.report.property(name, format!("mapping curve {curve} point {index}"), source);
                }
            }
        }
        for (setting, value) in mapping.settings() {
            if let Err(source) = self.sink.set_mapping_attribute(node, setting, &value) {
                self.report.property(name, format!("mapping {setting}"), source);
            }
        }
    }

    fn links(&mut self, node: &NodeDocument, built: &HashMap<&str, S::Node>) {
        if node.outputs.is_empty() {
            return;
        }
        let Some(from) = built.get(node.name.as_str()) else {
            self.report.push(ReferenceError::LinkSource {
                from: node.name.clone(),
            });
            return;
        };
        for (output, target, input) in node.links() {
            let Some(to) = built.get(target) else {
                self.report.push(ReferenceError::LinkTarget {
                    from: node.name.clone(),
                    output,
                    to: target.to_string(),
                    input,
                });
                continue;
            };
            match self.sink.link(from, output, to, input) {
                Ok(()) => self.report.links += 1,
                Err(source) => self.report.push(BuildIssue::Link {
                    from: node.name.clone(),
                    output,
                    to: target.to_string(),
                    input,
                    source,
                }),
            }
        }
    }
}
