// SPDX-License-Identifier: MIT OR Apache-2.0
//! The in-memory host: an arena of trees, read views over it and the
//! build sink that writes into it.

use indexmap::IndexMap;
use nodeshare_graph::document::MATERIAL_KIND;
use nodeshare_graph::extract::InterfaceProperty;
use nodeshare_graph::settings::DEFAULT_HOST_VERSION;
use nodeshare_graph::{
    ColorRamp, CurveMapping, GraphSink, HostNode, HostTree, HostValue, HostVersion, InterfaceItemView, LinkView,
    ObjectRef, SinkError, SocketView, Value,
};

use crate::catalog::{fits_tree, Catalog, TREE_KINDS};
use crate::graph::{kind_default, InOut, InterfaceItem, MemoryTree, TreeId};
use crate::node::{self, Node, NodeBehavior, NodeId, NodeRegistry};
use crate::socket::{host_value, SocketKind};

/// A node inside a tree of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    /// Owning tree
    pub tree: TreeId,
    /// The node
    pub node: NodeId,
}

/// Trees and the node types they can hold.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    version: HostVersion,
    registry: NodeRegistry,
    trees: IndexMap<TreeId, MemoryTree>,
}

impl MemoryHost {
    /// A host of `version` with the standard catalog
    pub fn new(version: HostVersion) -> Self {
        Self::with_registry(version, Catalog::standard(version))
    }

    /// A host with a custom node catalog
    pub fn with_registry(version: HostVersion, registry: NodeRegistry) -> Self {
        Self {
            version,
            registry,
            trees: IndexMap::new(),
        }
    }

    /// Host version
    pub fn version(&self) -> HostVersion {
        self.version
    }

    /// Node types this host knows
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Create a tree. `kind` is a tree type identifier, or `"material"`
    /// for a shader tree with the default material nodes.
    pub fn create_tree(&mut self, name: &str, kind: &str) -> Result<TreeId, SinkError> {
        let is_material = kind == MATERIAL_KIND;
        let kind = if is_material { "ShaderNodeTree" } else { kind };
        if !TREE_KINDS.contains(&kind) {
            return Err(SinkError::Rejected(format!("unknown tree type {kind:?}")));
        }

        let mut tree = MemoryTree::new(self.unique_tree_name(name), kind);
        tree.is_material = is_material;
        let id = tree.id;
        tracing::debug!("Created {} {:?}", kind, tree.name);
        self.trees.insert(id, tree);

        if is_material {
            self.add_material_defaults(id);
        }
        Ok(id)
    }

    fn unique_tree_name(&self, name: &str) -> String {
        let taken = |candidate: &str| self.trees.values().any(|t| t.name == candidate);
        if !taken(name) {
            return name.to_string();
        }
        (1..)
            .map(|n| format!("{name}.{n:03}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| name.to_string())
    }

    fn add_material_defaults(&mut self, tree: TreeId) {
        let bsdf = self.add_node(tree, "ShaderNodeBsdfPrincipled");
        let output = self.add_node(tree, "ShaderNodeOutputMaterial");
        let (Ok(bsdf), Ok(output)) = (bsdf, output) else {
            tracing::debug!("Catalog has no default material nodes");
            return;
        };
        if let Some(tree) = self.trees.get_mut(&tree) {
            if let Some(node) = tree.node_mut(bsdf) {
                node.location = [10.0, 300.0];
            }
            if let Some(node) = tree.node_mut(output) {
                node.location = [300.0, 300.0];
            }
            if let Err(err) = tree.connect(bsdf, 0, output, 0) {
                tracing::debug!("Default material link failed: {}", err);
            }
        }
    }

    /// Get a tree by ID
    pub fn tree(&self, id: TreeId) -> Option<&MemoryTree> {
        self.trees.get(&id)
    }

    /// Get a mutable tree by ID
    pub fn tree_mut(&mut self, id: TreeId) -> Option<&mut MemoryTree> {
        self.trees.get_mut(&id)
    }

    /// Get a tree by name
    pub fn tree_by_name(&self, name: &str) -> Option<&MemoryTree> {
        self.trees.values().find(|t| t.name == name)
    }

    /// Get all trees
    pub fn trees(&self) -> impl Iterator<Item = &MemoryTree> {
        self.trees.values()
    }

    /// Read view of a tree
    pub fn view(&self, id: TreeId) -> Option<TreeView<'_>> {
        self.trees.get(&id).map(|tree| TreeView { host: self, tree })
    }

    /// Add a node of `type_id` to a tree
    pub fn add_node(&mut self, tree: TreeId, type_id: &str) -> Result<NodeId, SinkError> {
        let node_type = self
            .registry
            .get(type_id)
            .ok_or_else(|| SinkError::UnknownType(type_id.to_string()))?;
        let target = self
            .trees
            .get_mut(&tree)
            .ok_or_else(|| SinkError::Rejected(format!("no tree {tree:?}")))?;
        if !fits_tree(type_id, &target.kind) {
            return Err(SinkError::Rejected(format!("{type_id} cannot be added to a {}", target.kind)));
        }
        Ok(target.add_node(Node::new(node_type)))
    }

    fn existing_tree(&mut self, id: TreeId) -> Result<&mut MemoryTree, SinkError> {
        self.trees
            .get_mut(&id)
            .ok_or_else(|| SinkError::Rejected(format!("no tree {id:?}")))
    }

    fn node(&self, at: &NodeRef) -> Result<&Node, SinkError> {
        self.trees
            .get(&at.tree)
            .and_then(|tree| tree.node(at.node))
            .ok_or_else(|| SinkError::Rejected(format!("no node {:?}", at.node)))
    }

    fn node_mut(&mut self, at: &NodeRef) -> Result<&mut Node, SinkError> {
        self.trees
            .get_mut(&at.tree)
            .and_then(|tree| tree.node_mut(at.node))
            .ok_or_else(|| SinkError::Rejected(format!("no node {:?}", at.node)))
    }

    /// Give every group node bound to `group` the group's interface sockets
    fn sync_group_nodes(&mut self, group: TreeId) {
        let Some(source) = self.trees.get(&group) else {
            return;
        };
        let inputs = source.interface_sockets(InOut::Input);
        let outputs = source.interface_sockets(InOut::Output);
        for tree in self.trees.values_mut() {
            let bound: Vec<NodeId> = tree
                .nodes()
                .filter(|n| n.node_tree == Some(group))
                .map(|n| n.id)
                .collect();
            for id in bound {
                tree.replace_sockets(id, inputs.clone(), outputs.clone());
            }
        }
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new(DEFAULT_HOST_VERSION)
    }
}

fn set_interface_property(item: &mut InterfaceItem, name: &str, value: &Value) -> Result<(), SinkError> {
    let mismatch = || SinkError::TypeMismatch(format!("{value:?} for interface property {name:?}"));
    match name {
        "name" | "in_out" | "position" => {}
        "item_type" => {
            if value.as_str() != Some("SOCKET") {
                return Err(SinkError::Rejected(format!("unsupported item type {value:?}")));
            }
        }
        "socket_type" => {
            let kind = value
                .as_str()
                .and_then(SocketKind::from_socket_type)
                .ok_or_else(|| SinkError::Rejected(format!("unknown socket type {value:?}")))?;
            if kind != item.kind {
                item.kind = kind;
                item.default_value = kind_default(kind);
            }
        }
        "description" => item.description = value.as_str().ok_or_else(mismatch)?.to_string(),
        "default_value" => {
            if !item.kind.has_value() {
                return Err(SinkError::TypeMismatch(format!("{:?} has no default value", item.name)));
            }
            item.default_value = Some(item.kind.coerce(value)?);
        }
        "min_value" => item.min_value = value.as_f64().ok_or_else(mismatch)?,
        "max_value" => item.max_value = value.as_f64().ok_or_else(mismatch)?,
        "hide_value" => item.hide_value = value.as_bool().ok_or_else(mismatch)?,
        // Panels are not modeled; the root panel has uid 0
        "parent" => {
            if value != &Value::Int(0) {
                return Err(SinkError::Rejected(format!("no interface panel {value:?}")));
            }
        }
        "identifier" | "index" => return Err(SinkError::ReadOnly(name.to_string())),
        _ => return Err(SinkError::Rejected(format!("interface items have no property {name:?}"))),
    }
    Ok(())
}

impl GraphSink for MemoryHost {
    type Tree = TreeId;
    type Node = NodeRef;

    fn create_tree(&mut self, name: &str, kind: &str) -> Result<TreeId, SinkError> {
        MemoryHost::create_tree(self, name, kind)
    }

    fn clear_tree(&mut self, tree: &TreeId) -> Result<(), SinkError> {
        self.existing_tree(*tree)?.clear();
        Ok(())
    }

    fn create_node(&mut self, tree: &TreeId, type_id: &str) -> Result<NodeRef, SinkError> {
        let node = self.add_node(*tree, type_id)?;
        Ok(NodeRef { tree: *tree, node })
    }

    fn set_node_name(&mut self, node: &NodeRef, name: &str) -> Result<(), SinkError> {
        let given = self.existing_tree(node.tree)?.rename_node(node.node, name)?;
        if given != name {
            tracing::debug!("Node name {:?} is taken, renamed to {:?}", name, given);
        }
        Ok(())
    }

    fn set_location(&mut self, node: &NodeRef, location: [f64; 2]) -> Result<(), SinkError> {
        self.node_mut(node)?.location = location;
        Ok(())
    }

    fn bind_node_tree(&mut self, node: &NodeRef, group: &TreeId) -> Result<(), SinkError> {
        let owner_kind = self.existing_tree(node.tree)?.kind.clone();
        let group_kind = self.existing_tree(*group)?.kind.clone();
        if *group == node.tree {
            return Err(SinkError::Rejected("a group cannot contain itself".into()));
        }
        if group_kind != owner_kind {
            return Err(SinkError::Rejected(format!("cannot use a {group_kind} in a {owner_kind}")));
        }
        let target = self.node_mut(node)?;
        if target.behavior() != NodeBehavior::Group {
            return Err(SinkError::Rejected(format!("{} has no node tree", target.type_id)));
        }
        target.node_tree = Some(*group);
        self.sync_group_nodes(*group);
        Ok(())
    }

    fn set_input_default(&mut self, node: &NodeRef, index: usize, value: &Value) -> Result<(), SinkError> {
        self.node_mut(node)?.set_input_default(index, value)
    }

    fn set_output_default(&mut self, node: &NodeRef, index: usize, value: &Value) -> Result<(), SinkError> {
        self.node_mut(node)?.set_output_default(index, value)
    }

    fn link(&mut self, from: &NodeRef, output: usize, to: &NodeRef, input: usize) -> Result<(), SinkError> {
        if from.tree != to.tree {
            return Err(SinkError::Rejected("cannot link nodes of different trees".into()));
        }
        self.existing_tree(from.tree)?.connect(from.node, output, to.node, input)?;
        Ok(())
    }

    fn set_parent(&mut self, child: &NodeRef, parent: &NodeRef) -> Result<(), SinkError> {
        if child.tree != parent.tree {
            return Err(SinkError::Rejected("parent is in another tree".into()));
        }
        self.existing_tree(child.tree)?.set_parent(child.node, parent.node)?;
        Ok(())
    }

    fn set_attribute(&mut self, node: &NodeRef, name: &str, value: &Value) -> Result<(), SinkError> {
        self.node_mut(node)?.set_attribute(name, value)
    }

    fn color_ramp_len(&self, node: &NodeRef) -> Result<usize, SinkError> {
        let target = self.node(node)?;
        target
            .color_ramp
            .as_ref()
            .map(|ramp| ramp.elements.len())
            .ok_or_else(|| SinkError::Rejected(format!("{} has no color ramp", target.type_id)))
    }

    fn set_color_ramp_modes(
        &mut self,
        node: &NodeRef,
        color_mode: &str,
        hue_interpolation: &str,
        interpolation: &str,
    ) -> Result<(), SinkError> {
        let ramp = self.node_mut(node)?.ramp_mut()?;
        node::set_ramp_modes(ramp, color_mode, hue_interpolation, interpolation)
    }

    fn set_color_ramp_element(
        &mut self,
        node: &NodeRef,
        index: usize,
        position: f64,
        color: &[f64],
    ) -> Result<(), SinkError> {
        let ramp = self.node_mut(node)?.ramp_mut()?;
        node::set_ramp_element(ramp, index, position, color)
    }

    fn add_color_ramp_element(&mut self, node: &NodeRef, position: f64, color: &[f64]) -> Result<(), SinkError> {
        let ramp = self.node_mut(node)?.ramp_mut()?;
        node::add_ramp_element(ramp, position, color)
    }

    fn curve_point_count(&self, node: &NodeRef, curve: usize) -> Result<usize, SinkError> {
        self.node(node)?.curve_len(curve)
    }

    fn set_curve_point(&mut self, node: &NodeRef, curve: usize, index: usize, point: [f64; 2]) -> Result<(), SinkError> {
        let mapping = self.node_mut(node)?.mapping_mut()?;
        node::set_curve_point(mapping, curve, index, point)
    }

    fn add_curve_point(&mut self, node: &NodeRef, curve: usize, point: [f64; 2]) -> Result<(), SinkError> {
        let mapping = self.node_mut(node)?.mapping_mut()?;
        node::add_curve_point(mapping, curve, point)
    }

    fn set_mapping_attribute(&mut self, node: &NodeRef, name: &str, value: &Value) -> Result<(), SinkError> {
        let mapping = self.node_mut(node)?.mapping_mut()?;
        node::set_mapping_setting(mapping, name, value)
    }

    fn set_interface_item(
        &mut self,
        tree: &TreeId,
        name: &str,
        properties: &IndexMap<String, Value>,
    ) -> Result<(), SinkError> {
        let in_out = match properties.get("in_out") {
            None => InOut::Input,
            Some(value) => value
                .as_str()
                .and_then(InOut::from_identifier)
                .ok_or_else(|| SinkError::TypeMismatch(format!("{value:?} for interface property \"in_out\"")))?,
        };

        let target = self.existing_tree(*tree)?;
        let mut position = match target.interface_position(name, in_out) {
            Some(position) => position,
            None => {
                let kind = properties
                    .get("socket_type")
                    .and_then(Value::as_str)
                    .and_then(SocketKind::from_socket_type)
                    .ok_or_else(|| SinkError::Rejected(format!("interface item {name:?} needs a known socket_type")))?;
                target.add_interface_item(InterfaceItem::new(name, in_out, kind))
            }
        };

        let mut first_error = None;
        if let Some(item) = target.interface_item_mut(position) {
            for (property, value) in properties {
                if let Err(err) = set_interface_property(item, property, value) {
                    tracing::warn!("Interface item {:?}: {}", name, err);
                    first_error.get_or_insert(err);
                }
            }
        }
        match properties.get("position").map(|value| value.as_f64()) {
            Some(Some(to)) if to >= 0.0 => {
                target.move_interface_item(position, to as usize);
                position = target.interface_position(name, in_out).unwrap_or(position);
            }
            Some(_) => {
                first_error.get_or_insert(SinkError::TypeMismatch("interface position".into()));
            }
            None => {}
        }
        tracing::trace!("Interface item {:?} at {}", name, position);

        target.sync_group_sockets();
        self.sync_group_nodes(*tree);
        first_error.map_or(Ok(()), Err)
    }
}

/// Read view of one tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeView<'a> {
    host: &'a MemoryHost,
    tree: &'a MemoryTree,
}

impl<'a> TreeView<'a> {
    /// The viewed tree
    pub fn tree(&self) -> &'a MemoryTree {
        self.tree
    }
}

fn interface_properties(item: &InterfaceItem, position: usize) -> Vec<InterfaceProperty> {
    let prop = |name: &str, value: HostValue, default: HostValue| InterfaceProperty {
        name: name.to_string(),
        value,
        default: Some(default),
    };
    let root_panel = HostValue::Object(ObjectRef::uid(0));
    let mut properties = vec![
        prop("item_type", HostValue::Text("SOCKET".into()), HostValue::Text("SOCKET".into())),
        prop("name", HostValue::Text(item.name.clone()), HostValue::Text(String::new())),
        prop(
            "in_out",
            HostValue::Text(item.in_out.identifier().into()),
            HostValue::Text("INPUT".into()),
        ),
        prop(
            "socket_type",
            HostValue::Text(item.kind.socket_type().into()),
            HostValue::Text(String::new()),
        ),
        prop(
            "bl_socket_idname",
            HostValue::Text(item.kind.socket_type().into()),
            HostValue::Text(String::new()),
        ),
        prop(
            "description",
            HostValue::Text(item.description.clone()),
            HostValue::Text(String::new()),
        ),
    ];
    if let Some(value) = &item.default_value {
        let default = kind_default(item.kind).map_or(HostValue::None, |v| host_value(&v));
        properties.push(prop("default_value", host_value(value), default));
    }
    properties.extend([
        prop("min_value", HostValue::Float(item.min_value), HostValue::Float(f32::MIN as f64)),
        prop("max_value", HostValue::Float(item.max_value), HostValue::Float(f32::MAX as f64)),
        prop("hide_value", HostValue::Bool(item.hide_value), HostValue::Bool(false)),
        prop("parent", root_panel.clone(), root_panel),
        prop("position", HostValue::Int(position as i64), HostValue::Int(0)),
        prop("index", HostValue::Int(position as i64), HostValue::Int(0)),
    ]);
    properties
}

impl<'a> HostTree for TreeView<'a> {
    type Node = NodeView<'a>;

    fn name(&self) -> &str {
        &self.tree.name
    }

    fn type_id(&self) -> &str {
        &self.tree.kind
    }

    fn nodes(&self) -> Vec<NodeView<'a>> {
        let (host, tree) = (self.host, self.tree);
        tree.nodes().map(|node| NodeView { host, tree, node }).collect()
    }

    fn interface_items(&self) -> Vec<InterfaceItemView> {
        self.tree
            .interface()
            .iter()
            .enumerate()
            .map(|(position, item)| InterfaceItemView {
                name: item.name.clone(),
                properties: interface_properties(item, position),
            })
            .collect()
    }
}

/// Read view of one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    host: &'a MemoryHost,
    tree: &'a MemoryTree,
    node: &'a Node,
}

impl<'a> NodeView<'a> {
    /// The viewed node
    pub fn node(&self) -> &'a Node {
        self.node
    }
}

impl<'a> HostNode for NodeView<'a> {
    type Tree = TreeView<'a>;

    fn name(&self) -> &str {
        &self.node.name
    }

    fn type_id(&self) -> &str {
        &self.node.type_id
    }

    fn location(&self) -> [f64; 2] {
        self.node.location
    }

    fn inputs(&self) -> Vec<SocketView> {
        self.node
            .inputs
            .iter()
            .map(|socket| SocketView {
                default_value: socket.default_value.as_ref().map(host_value),
                links: Vec::new(),
            })
            .collect()
    }

    fn outputs(&self) -> Vec<SocketView> {
        self.node
            .outputs
            .iter()
            .enumerate()
            .map(|(index, socket)| SocketView {
                default_value: socket.default_value.as_ref().map(host_value),
                links: self
                    .tree
                    .connections_from(self.node.id, index)
                    .filter_map(|c| {
                        self.tree.node(c.to_node).map(|target| LinkView {
                            to_node: target.name.clone(),
                            to_input: c.to_socket,
                        })
                    })
                    .collect(),
            })
            .collect()
    }

    fn attributes(&self) -> Vec<(String, HostValue)> {
        let parent = self
            .node
            .parent
            .and_then(|id| self.tree.node(id))
            .map_or(HostValue::None, |frame| HostValue::Object(ObjectRef::named(frame.name.clone())));
        self.node
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), host_value(value)))
            .chain(std::iter::once(("parent".to_string(), parent)))
            .collect()
    }

    fn node_tree(&self) -> Option<TreeView<'a>> {
        self.node.node_tree.and_then(|id| self.host.view(id))
    }

    fn color_ramp(&self) -> Option<ColorRamp> {
        self.node.color_ramp.clone()
    }

    fn mapping(&self) -> Option<CurveMapping> {
        self.node.mapping.clone()
    }
}
