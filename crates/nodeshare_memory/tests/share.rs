// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end share tests: export from one host, import into another.

use nodeshare_graph::{
    build, copy_material, copy_tree, decode_text, export_json, export_material, export_tree, import, paste,
    BuildIssue, BuildTarget, Clipboard, FileChannel, GraphSink, HostVersion, LinkTarget, MigrationError, NodeDocument,
    ReferenceError, ShareError, ShareSettings, TreeDocument, Value,
};
use nodeshare_memory::{
    Catalog, InOut, MemoryHost, MemoryTree, NodeCategory, NodeRef, NodeType, Socket, SocketKind, TreeId,
};

const V290: HostVersion = HostVersion::new(2, 90, 0);
const V300: HostVersion = HostVersion::new(3, 0, 0);

fn node_ref(host: &MemoryHost, tree: TreeId, name: &str) -> NodeRef {
    let node = host.tree(tree).unwrap().node_by_name(name).unwrap().id;
    NodeRef { tree, node }
}

fn input_index(tree: &MemoryTree, node: &str, socket: &str) -> usize {
    let node = tree.node_by_name(node).unwrap();
    node.inputs.iter().position(|s| s.name == socket).unwrap()
}

fn input_value(tree: &MemoryTree, node: &str, socket: &str) -> Option<Value> {
    let index = input_index(tree, node, socket);
    tree.node_by_name(node).unwrap().inputs[index].default_value.clone()
}

/// Links as (from, output, to, input) names and indices, sorted.
fn links(tree: &MemoryTree) -> Vec<(String, usize, String, usize)> {
    let name = |id| tree.node(id).unwrap().name.clone();
    let mut links: Vec<_> = tree
        .connections()
        .map(|c| (name(c.from_node), c.from_socket, name(c.to_node), c.to_socket))
        .collect();
    links.sort();
    links
}

fn test_node_registry() -> nodeshare_memory::NodeRegistry {
    let mut registry = Catalog::shader(V300);
    registry.register(
        NodeType::new("TestNode", "Test", NodeCategory::Converter)
            .output(Socket::output("A", SocketKind::Float))
            .output(Socket::output("B", SocketKind::Float))
            .output(Socket::output("C", SocketKind::Float)),
    );
    registry.register(
        NodeType::new("TestSink", "Sink", NodeCategory::Output)
            .input(Socket::float("X", 0.0))
            .input(Socket::float("Y", 0.0))
            .input(Socket::float("Z", 0.0)),
    );
    registry
}

#[test]
fn test_node_links_survive_the_container() {
    let settings = ShareSettings::for_host(V300);
    let mut source = MemoryHost::with_registry(V300, test_node_registry());
    let tree = source.create_tree("Links", "ShaderNodeTree").unwrap();
    let test = source.create_node(&tree, "TestNode").unwrap();
    let first = source.create_node(&tree, "TestSink").unwrap();
    let second = source.create_node(&tree, "TestSink").unwrap();
    source.link(&test, 0, &first, 0).unwrap();
    source.link(&test, 1, &second, 0).unwrap();
    source.link(&test, 1, &second, 2).unwrap();
    source.link(&test, 2, &first, 1).unwrap();

    let text = export_tree(&source.view(tree).unwrap(), source.version(), &settings).unwrap();
    assert!(text.starts_with("NS0B300!"));

    let decoded = decode_text(&text, settings.decode_limits()).unwrap();
    let test_doc = decoded.document.node("Test").unwrap();
    assert_eq!(test_doc.outputs[&0]["Sink"], LinkTarget::Single(0));
    assert_eq!(test_doc.outputs[&1]["Sink.001"], LinkTarget::Many(vec![0, 2]));

    let mut target = MemoryHost::with_registry(V300, test_node_registry());
    let imported = import(&text, &settings, &mut target, BuildTarget::New).unwrap();
    assert!(imported.build.is_complete(), "{:?}", imported.build.issues);
    assert_eq!(imported.build.links, 4);
    assert_eq!(
        links(target.tree(imported.tree).unwrap()),
        links(source.tree(tree).unwrap())
    );
}

#[test]
fn test_material_upgrades_from_290() {
    let settings = ShareSettings::for_host(V300);
    let mut old = MemoryHost::new(V290);
    let material = old.create_tree("Brick", "material").unwrap();
    let bsdf = node_ref(&old, material, "Principled BSDF");
    let alpha = input_index(old.tree(material).unwrap(), "Principled BSDF", "Alpha");
    assert_eq!(alpha, 18);
    old.set_input_default(&bsdf, alpha, &Value::Float(0.5)).unwrap();
    old.set_input_default(&bsdf, 7, &Value::Float(0.2)).unwrap();
    let value = old.create_node(&material, "ShaderNodeValue").unwrap();
    old.link(&value, 0, &bsdf, alpha).unwrap();

    let text = export_material("Brick", &old.view(material).unwrap(), old.version(), &settings).unwrap();
    assert!(text.starts_with("NS0B2900!"));

    let mut new = MemoryHost::new(V300);
    let imported = import(&text, &settings, &mut new, BuildTarget::New).unwrap();
    assert_eq!(imported.producer, Some(V290));
    assert_eq!(imported.fix.applied.len(), 2);
    assert!(imported.fix.skipped.is_empty());
    assert!(imported.build.is_complete(), "{:?}", imported.build.issues);

    let tree = new.tree(imported.tree).unwrap();
    assert!(tree.is_material);
    assert_eq!(tree.node_count(), 3);
    assert_eq!(input_value(tree, "Principled BSDF", "Alpha"), Some(Value::Float(0.5)));
    assert_eq!(input_value(tree, "Principled BSDF", "Roughness"), Some(Value::Float(0.2)));
    assert_eq!(input_value(tree, "Principled BSDF", "Subsurface IOR"), Some(Value::Float(1.4)));

    let alpha = input_index(tree, "Principled BSDF", "Alpha");
    assert_eq!(alpha, 21);
    assert!(links(tree).contains(&("Value".into(), 0, "Principled BSDF".into(), alpha)));
}

#[test]
fn test_downgrade_drops_links_into_new_sockets() {
    let settings = ShareSettings::for_host(V290);
    let mut current = MemoryHost::new(V300);
    let material = current.create_tree("Skin", "material").unwrap();
    let bsdf = node_ref(&current, material, "Principled BSDF");
    let value = current.create_node(&material, "ShaderNodeValue").unwrap();
    let ior = input_index(current.tree(material).unwrap(), "Principled BSDF", "Subsurface IOR");
    current.link(&value, 0, &bsdf, ior).unwrap();

    let mut clipboard = Clipboard::new();
    copy_material("Skin", &current.view(material).unwrap(), current.version(), &settings, &mut clipboard).unwrap();

    let mut old = MemoryHost::new(V290);
    let imported = paste(&mut clipboard, &settings, &mut old).unwrap();
    assert!(imported
        .fix
        .skipped
        .iter()
        .any(|e| matches!(e, MigrationError::RemovedSlotLinked { slot: 4, .. })));
    assert!(imported.build.is_complete(), "{:?}", imported.build.issues);

    let tree = old.tree(imported.tree).unwrap();
    assert_eq!(links(tree), vec![("Principled BSDF".into(), 0, "Material Output".into(), 0)]);
}

#[test]
fn test_groups_and_interface_round_trip() {
    let settings = ShareSettings::for_host(V300);
    let mut source = MemoryHost::new(V300);

    let inner = source.create_tree("Inflate", "GeometryNodeTree").unwrap();
    let mut mesh = indexmap::IndexMap::new();
    mesh.insert("socket_type".to_string(), Value::from("NodeSocketGeometry"));
    source.set_interface_item(&inner, "Mesh", &mesh).unwrap();
    let mut scale = indexmap::IndexMap::new();
    scale.insert("socket_type".to_string(), Value::from("NodeSocketFloat"));
    scale.insert("default_value".to_string(), Value::Float(2.0));
    source.set_interface_item(&inner, "Scale", &scale).unwrap();
    let mut result = indexmap::IndexMap::new();
    result.insert("in_out".to_string(), Value::from("OUTPUT"));
    result.insert("socket_type".to_string(), Value::from("NodeSocketGeometry"));
    source.set_interface_item(&inner, "Result", &result).unwrap();

    let group_in = source.create_node(&inner, "NodeGroupInput").unwrap();
    let transform = source.create_node(&inner, "GeometryNodeTransform").unwrap();
    let group_out = source.create_node(&inner, "NodeGroupOutput").unwrap();
    source.link(&group_in, 0, &transform, 0).unwrap();
    source.link(&group_in, 1, &transform, 3).unwrap();
    source.link(&transform, 0, &group_out, 0).unwrap();

    let main = source.create_tree("Main", "GeometryNodeTree").unwrap();
    let cube = source.create_node(&main, "GeometryNodeMeshCube").unwrap();
    let group = source.create_node(&main, "GeometryNodeGroup").unwrap();
    let frame = source.create_node(&main, "NodeFrame").unwrap();
    source.bind_node_tree(&group, &inner).unwrap();
    source.link(&cube, 0, &group, 0).unwrap();
    source.set_parent(&cube, &frame).unwrap();
    source.set_attribute(&frame, "label", &Value::from("Inputs")).unwrap();

    let text = export_tree(&source.view(main).unwrap(), source.version(), &settings).unwrap();
    let decoded = decode_text(&text, settings.decode_limits()).unwrap();
    assert_eq!(decoded.document.groups.len(), 1);
    let interface = &decoded.document.groups["Inflate"].interface;
    assert_eq!(interface["Scale"]["default_value"], Value::Float(2.0));
    assert_eq!(interface["Result"]["in_out"], Value::from("OUTPUT"));
    assert!(!interface["Mesh"].contains_key("in_out"));
    assert!(!interface["Mesh"].contains_key("index"));

    let mut target = MemoryHost::new(V300);
    let imported = import(&text, &settings, &mut target, BuildTarget::New).unwrap();
    assert!(imported.build.is_complete(), "{:?}", imported.build.issues);
    assert_eq!(imported.build.groups, 1);
    assert_eq!(imported.build.parents, 1);

    let rebuilt_inner = target.tree_by_name("Inflate").unwrap();
    let names: Vec<(&str, InOut)> = rebuilt_inner
        .interface()
        .iter()
        .map(|item| (item.name.as_str(), item.in_out))
        .collect();
    assert_eq!(
        names,
        vec![("Mesh", InOut::Input), ("Scale", InOut::Input), ("Result", InOut::Output)]
    );
    assert_eq!(links(rebuilt_inner), links(source.tree(inner).unwrap()));

    let rebuilt_main = target.tree(imported.tree).unwrap();
    let group_node = rebuilt_main.node_by_name("Group").unwrap();
    assert_eq!(group_node.node_tree, Some(rebuilt_inner.id));
    assert_eq!(group_node.inputs[1].default_value, Some(Value::Float(2.0)));
    let frame_node = rebuilt_main.node_by_name("Frame").unwrap();
    assert_eq!(frame_node.attribute("label"), Some(&Value::from("Inputs")));
    assert_eq!(rebuilt_main.node_by_name("Cube").unwrap().parent, Some(frame_node.id));
    assert_eq!(links(rebuilt_main), links(source.tree(main).unwrap()));
}

#[test]
fn test_ramp_and_curves_round_trip() {
    let settings = ShareSettings::for_host(V300);
    let mut source = MemoryHost::new(V300);
    let tree = source.create_tree("Grade", "ShaderNodeTree").unwrap();
    let ramp = source.create_node(&tree, "ShaderNodeValToRGB").unwrap();
    let curves = source.create_node(&tree, "ShaderNodeRGBCurve").unwrap();
    source.set_color_ramp_modes(&ramp, "HSV", "FAR", "EASE").unwrap();
    source.add_color_ramp_element(&ramp, 0.5, &[1.0, 0.0, 0.0, 1.0]).unwrap();
    source.add_color_ramp_element(&ramp, 0.75, &[0.0, 0.0, 1.0, 1.0]).unwrap();
    source.add_curve_point(&curves, 3, [0.5, 0.25]).unwrap();
    source.set_mapping_attribute(&curves, "use_clip", &Value::Bool(false)).unwrap();

    let text = export_tree(&source.view(tree).unwrap(), source.version(), &settings).unwrap();
    let mut target = MemoryHost::new(V300);
    let imported = import(&text, &settings, &mut target, BuildTarget::New).unwrap();
    assert!(imported.build.is_complete(), "{:?}", imported.build.issues);

    let before = source.tree(tree).unwrap();
    let after = target.tree(imported.tree).unwrap();
    let rebuilt_ramp = after.node_by_name("Color Ramp").unwrap().color_ramp.as_ref().unwrap();
    assert_eq!(rebuilt_ramp.elements.len(), 4);
    assert_eq!(rebuilt_ramp.color_mode, "HSV");
    assert_eq!(
        Some(rebuilt_ramp),
        before.node_by_name("Color Ramp").unwrap().color_ramp.as_ref()
    );
    assert_eq!(
        after.node_by_name("RGB Curves").unwrap().mapping,
        before.node_by_name("RGB Curves").unwrap().mapping
    );
}

#[test]
fn test_bare_json_is_not_migrated() {
    let settings = ShareSettings::for_host(V300);
    let mut source = MemoryHost::new(V300);
    let tree = source.create_tree("Plain", "ShaderNodeTree").unwrap();
    let math = source.create_node(&tree, "ShaderNodeMath").unwrap();
    source.set_attribute(&math, "operation", &Value::from("POWER")).unwrap();
    source.set_attribute(&math, "use_custom_color", &Value::Bool(true)).unwrap();

    let json = export_json(&source.view(tree).unwrap(), true).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["nodes"]["Math"]["operation"], "POWER");
    assert_eq!(parsed["nodes"]["Math"]["color"], serde_json::json!([0.608, 0.608, 0.608]));
    assert!(parsed["nodes"]["Math"].get("hide").is_none());

    let mut target = MemoryHost::new(V300);
    let imported = import(&json, &settings, &mut target, BuildTarget::New).unwrap();
    assert_eq!(imported.producer, None);
    assert!(imported.fix.is_noop());
    let math = target.tree(imported.tree).unwrap().node_by_name("Math").unwrap();
    assert_eq!(math.attribute("operation"), Some(&Value::from("POWER")));
    assert_eq!(math.attribute("use_custom_color"), Some(&Value::Bool(true)));
}

#[test]
fn test_missing_parent_leaves_other_nodes() {
    let mut doc = TreeDocument::new("Loose", "ShaderNodeTree");
    let mut orphan = NodeDocument::new("Math", "ShaderNodeMath");
    orphan.parent = Some("Ghost Frame".into());
    doc.add_node(orphan);
    doc.add_node(NodeDocument::new("Value", "ShaderNodeValue").with_location(-200, 0));

    let mut host = MemoryHost::new(V300);
    let (tree, report) = build(&doc, &mut host).unwrap();
    assert_eq!(report.nodes, 2);
    assert_eq!(
        report.issues,
        vec![BuildIssue::Reference(ReferenceError::Parent {
            node: "Math".into(),
            parent: "Ghost Frame".into(),
        })]
    );
    let tree = host.tree(tree).unwrap();
    assert_eq!(tree.node_count(), 2);
    assert_eq!(tree.node_by_name("Value").unwrap().location, [-200.0, 0.0]);
}

#[test]
fn test_refusals_are_reported_not_fatal() {
    let mut doc = TreeDocument::new("Rough", "ShaderNodeTree");
    let mut math = NodeDocument::new("Math", "ShaderNodeMath");
    math.inputs.insert(0, Value::from("not a number"));
    math.inputs.insert(1, Value::Float(3.0));
    math.attributes.insert("operation".into(), Value::from("TELEPORT"));
    math.attributes.insert("dimensions".into(), Value::floats([1.0, 1.0]));
    math.add_link(0, "Value", 9);
    doc.add_node(math);
    doc.add_node(NodeDocument::new("Value", "ShaderNodeValue"));
    doc.add_node(NodeDocument::new("Cube", "GeometryNodeMeshCube"));

    let mut host = MemoryHost::new(V300);
    let (tree, report) = build(&doc, &mut host).unwrap();
    assert_eq!(report.nodes, 2);
    assert_eq!(report.issues.len(), 5, "{:?}", report.issues);
    assert!(matches!(report.issues[4], BuildIssue::Link { .. }));

    let tree = host.tree(tree).unwrap();
    assert_eq!(input_value(tree, "Math", "Value"), Some(Value::Float(0.5)));
    assert_eq!(tree.node_by_name("Math").unwrap().inputs[1].default_value, Some(Value::Float(3.0)));
}

#[test]
fn test_file_channel_copy_and_paste() {
    let settings = ShareSettings::for_host(V300);
    let mut source = MemoryHost::new(V300);
    let tree = source.create_tree("Saved", "ShaderNodeTree").unwrap();
    source.create_node(&tree, "ShaderNodeTexNoise").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut channel = FileChannel::new(dir.path().join("saved.txt"));
    copy_tree(&source.view(tree).unwrap(), source.version(), &settings, &mut channel).unwrap();

    let mut target = MemoryHost::new(V300);
    let imported = paste(&mut channel, &settings, &mut target).unwrap();
    assert_eq!(target.tree(imported.tree).unwrap().name, "Saved");
    assert!(target.tree(imported.tree).unwrap().node_by_name("Noise Texture").is_some());

    let mut missing = FileChannel::new(dir.path().join("absent.txt"));
    assert!(matches!(
        paste(&mut missing, &settings, &mut target),
        Err(ShareError::Channel(_))
    ));
}

#[test]
fn test_bad_magic_builds_nothing() {
    let mut host = MemoryHost::new(V300);
    let result = import("XX0B290!abc", &ShareSettings::default(), &mut host, BuildTarget::New);
    assert!(matches!(result, Err(ShareError::Decode(_))));
    assert_eq!(host.trees().count(), 0);
}
