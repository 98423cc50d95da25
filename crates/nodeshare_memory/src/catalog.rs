// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node type catalogs per host version.
//!
//! Socket layouts follow the host release they model. The Principled BSDF
//! is the one type whose input order changed between the releases the
//! codec migrates across.

use nodeshare_graph::{HostVersion, Value};

use crate::node::{NodeBehavior, NodeCategory, NodeRegistry, NodeType};
use crate::socket::{Socket, SocketKind};

/// Tree type identifiers the catalog knows.
pub const TREE_KINDS: &[&str] = &["ShaderNodeTree", "GeometryNodeTree", "CompositorNodeTree", "TextureNodeTree"];

/// Node type prefixes bound to one tree type.
const TREE_PREFIXES: &[(&str, &str)] = &[
    ("ShaderNode", "ShaderNodeTree"),
    ("GeometryNode", "GeometryNodeTree"),
    ("FunctionNode", "GeometryNodeTree"),
    ("CompositorNode", "CompositorNodeTree"),
    ("TextureNode", "TextureNodeTree"),
];

/// Whether nodes of `type_id` may live in a tree of `tree_kind`. Types
/// without a tree-specific prefix fit anywhere.
pub fn fits_tree(type_id: &str, tree_kind: &str) -> bool {
    TREE_PREFIXES
        .iter()
        .find(|(prefix, _)| type_id.starts_with(prefix))
        .map_or(true, |(_, kind)| *kind == tree_kind)
}

/// Group node type for a tree kind.
pub fn group_node_type(tree_kind: &str) -> Option<&'static str> {
    match tree_kind {
        "ShaderNodeTree" => Some("ShaderNodeGroup"),
        "GeometryNodeTree" => Some("GeometryNodeGroup"),
        _ => None,
    }
}

/// Node type catalogs.
pub struct Catalog;

impl Catalog {
    /// Shader nodes, layout nodes and group nodes as `version` lays them out.
    pub fn shader(version: HostVersion) -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        register_layout(&mut registry);
        register_shader(&mut registry, version);
        registry
    }

    /// Everything: shader and geometry nodes.
    pub fn standard(version: HostVersion) -> NodeRegistry {
        let mut registry = Self::shader(version);
        register_geometry(&mut registry);
        registry
    }
}

/// Principled BSDF inputs in host order.
pub fn principled_inputs(version: HostVersion) -> Vec<Socket> {
    let has_emission_strength = version >= HostVersion::new(2, 91, 0);
    let has_subsurface_ior = version >= HostVersion::new(3, 0, 0);

    let mut inputs = vec![
        Socket::color("Base Color", [0.8, 0.8, 0.8, 1.0]),
        Socket::float("Subsurface", 0.0),
        Socket::vector("Subsurface Radius", [1.0, 0.2, 0.1]),
        Socket::color("Subsurface Color", [0.8, 0.8, 0.8, 1.0]),
    ];
    if has_subsurface_ior {
        inputs.push(Socket::float("Subsurface IOR", 1.4));
        inputs.push(Socket::float("Subsurface Anisotropy", 0.0));
    }
    inputs.extend([
        Socket::float("Metallic", 0.0),
        Socket::float("Specular", 0.5),
        Socket::float("Specular Tint", 0.0),
        Socket::float("Roughness", 0.5),
        Socket::float("Anisotropic", 0.0),
        Socket::float("Anisotropic Rotation", 0.0),
        Socket::float("Sheen", 0.0),
        Socket::float("Sheen Tint", 0.5),
        Socket::float("Clearcoat", 0.0),
        Socket::float("Clearcoat Roughness", 0.03),
        Socket::float("IOR", 1.45),
        Socket::float("Transmission", 0.0),
        Socket::float("Transmission Roughness", 0.0),
        Socket::color("Emission", [0.0, 0.0, 0.0, 1.0]),
    ]);
    if has_emission_strength {
        inputs.push(Socket::float("Emission Strength", 1.0));
    }
    inputs.extend([
        Socket::float("Alpha", 1.0),
        Socket::vector("Normal", [0.0, 0.0, 0.0]),
        Socket::vector("Clearcoat Normal", [0.0, 0.0, 0.0]),
        Socket::vector("Tangent", [0.0, 0.0, 0.0]),
    ]);
    inputs
}

fn register_layout(registry: &mut NodeRegistry) {
    registry.register(
        NodeType::new("NodeFrame", "Frame", NodeCategory::Layout)
            .attribute("label_size", 20_i64)
            .attribute("shrink", true)
            .with_behavior(NodeBehavior::Frame),
    );

    registry.register(
        NodeType::new("NodeReroute", "Reroute", NodeCategory::Layout)
            .input(Socket::color("Input", [0.0, 0.0, 0.0, 1.0]))
            .output(Socket::output("Output", SocketKind::Color)),
    );

    registry.register(
        NodeType::new("NodeGroupInput", "Group Input", NodeCategory::Layout).with_behavior(NodeBehavior::GroupInput),
    );

    registry.register(
        NodeType::new("NodeGroupOutput", "Group Output", NodeCategory::Layout)
            .attribute("is_active_output", true)
            .with_behavior(NodeBehavior::GroupOutput),
    );
}

fn register_shader(registry: &mut NodeRegistry, version: HostVersion) {
    // ========================================================================
    // Output and shader nodes
    // ========================================================================

    registry.register(
        NodeType::new("ShaderNodeOutputMaterial", "Material Output", NodeCategory::Output)
            .input(Socket::input("Surface", SocketKind::Shader))
            .input(Socket::input("Volume", SocketKind::Shader))
            .input(Socket::vector("Displacement", [0.0, 0.0, 0.0]))
            .choice("target", &["ALL", "EEVEE", "CYCLES"])
            .attribute("is_active_output", true),
    );

    registry.register(
        NodeType::new("ShaderNodeBsdfPrincipled", "Principled BSDF", NodeCategory::Shader)
            .choice("distribution", &["GGX", "MULTI_GGX"])
            .choice("subsurface_method", &["BURLEY", "RANDOM_WALK", "RANDOM_WALK_FIXED_RADIUS"])
            .output(Socket::output("BSDF", SocketKind::Shader))
            .with_inputs(principled_inputs(version)),
    );

    registry.register(
        NodeType::new("ShaderNodeMixShader", "Mix Shader", NodeCategory::Shader)
            .input(Socket::float("Fac", 0.5))
            .input(Socket::input("Shader", SocketKind::Shader))
            .input(Socket::input("Shader", SocketKind::Shader))
            .output(Socket::output("Shader", SocketKind::Shader)),
    );

    registry.register(
        NodeType::new("ShaderNodeEmission", "Emission", NodeCategory::Shader)
            .input(Socket::color("Color", [1.0, 1.0, 1.0, 1.0]))
            .input(Socket::float("Strength", 1.0))
            .output(Socket::output("Emission", SocketKind::Shader)),
    );

    // ========================================================================
    // Input and texture nodes
    // ========================================================================

    registry.register(
        NodeType::new("ShaderNodeValue", "Value", NodeCategory::Input)
            .output(Socket::output("Value", SocketKind::Float).with_default(0.5)),
    );

    registry.register(
        NodeType::new("ShaderNodeRGB", "RGB", NodeCategory::Input)
            .output(Socket::output("Color", SocketKind::Color).with_default(Value::floats([0.5, 0.5, 0.5, 1.0]))),
    );

    registry.register(
        NodeType::new("ShaderNodeTexImage", "Image Texture", NodeCategory::Input)
            .input(Socket::vector("Vector", [0.0, 0.0, 0.0]))
            .output(Socket::output("Color", SocketKind::Color))
            .output(Socket::output("Alpha", SocketKind::Float))
            .choice("interpolation", &["Linear", "Closest", "Cubic", "Smart"])
            .choice("projection", &["FLAT", "BOX", "SPHERE", "TUBE"])
            .choice("extension", &["REPEAT", "EXTEND", "CLIP"]),
    );

    registry.register(
        NodeType::new("ShaderNodeTexNoise", "Noise Texture", NodeCategory::Input)
            .input(Socket::vector("Vector", [0.0, 0.0, 0.0]))
            .input(Socket::float("W", 0.0))
            .input(Socket::float("Scale", 5.0))
            .input(Socket::float("Detail", 2.0))
            .input(Socket::float("Roughness", 0.5))
            .input(Socket::float("Distortion", 0.0))
            .output(Socket::output("Fac", SocketKind::Float))
            .output(Socket::output("Color", SocketKind::Color))
            .choice("noise_dimensions", &["3D", "1D", "2D", "4D"]),
    );

    // ========================================================================
    // Converter and color nodes
    // ========================================================================

    registry.register(
        NodeType::new("ShaderNodeMath", "Math", NodeCategory::Converter)
            .input(Socket::float("Value", 0.5))
            .input(Socket::float("Value", 0.5))
            .input(Socket::float("Value", 0.5))
            .output(Socket::output("Value", SocketKind::Float))
            .choice(
                "operation",
                &["ADD", "SUBTRACT", "MULTIPLY", "DIVIDE", "POWER", "MINIMUM", "MAXIMUM", "SINE", "COSINE"],
            )
            .attribute("use_clamp", false),
    );

    registry.register(
        NodeType::new("ShaderNodeValToRGB", "Color Ramp", NodeCategory::Converter)
            .input(Socket::float("Fac", 0.5))
            .output(Socket::output("Color", SocketKind::Color))
            .output(Socket::output("Alpha", SocketKind::Float))
            .with_behavior(NodeBehavior::ColorRamp),
    );

    registry.register(
        NodeType::new("ShaderNodeRGBCurve", "RGB Curves", NodeCategory::Color)
            .input(Socket::float("Fac", 1.0))
            .input(Socket::color("Color", [1.0, 1.0, 1.0, 1.0]))
            .output(Socket::output("Color", SocketKind::Color))
            .with_behavior(NodeBehavior::Curves(4)),
    );

    registry.register(
        NodeType::new("ShaderNodeGroup", "Group", NodeCategory::Group).with_behavior(NodeBehavior::Group),
    );
}

fn register_geometry(registry: &mut NodeRegistry) {
    registry.register(
        NodeType::new("GeometryNodeMeshCube", "Cube", NodeCategory::Geometry)
            .input(Socket::vector("Size", [1.0, 1.0, 1.0]))
            .input(Socket::input("Vertices X", SocketKind::Int).with_default(2_i64))
            .input(Socket::input("Vertices Y", SocketKind::Int).with_default(2_i64))
            .input(Socket::input("Vertices Z", SocketKind::Int).with_default(2_i64))
            .output(Socket::output("Mesh", SocketKind::Geometry)),
    );

    registry.register(
        NodeType::new("GeometryNodeSetPosition", "Set Position", NodeCategory::Geometry)
            .input(Socket::input("Geometry", SocketKind::Geometry))
            .input(Socket::input("Selection", SocketKind::Bool).with_default(true))
            .input(Socket::vector("Position", [0.0, 0.0, 0.0]))
            .input(Socket::vector("Offset", [0.0, 0.0, 0.0]))
            .output(Socket::output("Geometry", SocketKind::Geometry)),
    );

    registry.register(
        NodeType::new("GeometryNodeTransform", "Transform", NodeCategory::Geometry)
            .input(Socket::input("Geometry", SocketKind::Geometry))
            .input(Socket::vector("Translation", [0.0, 0.0, 0.0]))
            .input(Socket::vector("Rotation", [0.0, 0.0, 0.0]))
            .input(Socket::vector("Scale", [1.0, 1.0, 1.0]))
            .output(Socket::output("Geometry", SocketKind::Geometry)),
    );

    registry.register(
        NodeType::new("FunctionNodeInputString", "String", NodeCategory::Input)
            .output(Socket::output("String", SocketKind::String).with_default("")),
    );

    registry.register(
        NodeType::new("GeometryNodeGroup", "Group", NodeCategory::Group).with_behavior(NodeBehavior::Group),
    );
}
