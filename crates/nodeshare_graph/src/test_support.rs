// SPDX-License-Identifier: MIT OR Apache-2.0
//! Proptest strategies shared by the unit tests.

use indexmap::IndexMap;
use proptest::collection::{btree_map, btree_set, vec};
use proptest::option;
use proptest::prelude::*;
use proptest::sample::Index;

use crate::compat::HostVersion;
use crate::document::{ColorRamp, ColorStop, CurveMapping, NodeDocument, TreeDocument};
use crate::value::Value;

/// Floats on a quarter grid, exact through JSON text.
pub(crate) fn arb_float() -> impl Strategy<Value = f64> {
    (-4000i32..4000).prop_map(|n| f64::from(n) / 4.0)
}

pub(crate) fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(Value::Int),
        arb_float().prop_map(Value::Float),
        "[a-zA-Z ]{0,8}".prop_map(Value::Text),
        vec(arb_float(), 3..=4).prop_map(Value::floats),
    ]
}

/// Versions on both sides of the packed prefix boundary.
pub(crate) fn arb_host_version() -> impl Strategy<Value = HostVersion> {
    prop_oneof![
        (0u32..10, 0u32..200, 0u32..10),
        (0u32..10, 0u32..200, 10u32..100),
        (10u32..1000, 0u32..200, 0u32..100),
    ]
    .prop_map(|(major, minor, patch)| HostVersion::new(major, minor, patch))
}

fn arb_slots() -> impl Strategy<Value = std::collections::BTreeMap<usize, Value>> {
    btree_map(0usize..30, arb_value(), 0..4)
}

fn arb_ramp() -> impl Strategy<Value = ColorRamp> {
    (
        "[A-Z]{3,5}",
        "[A-Z]{3,5}",
        "[A-Z]{3,8}",
        btree_map(0u32..=40, vec(arb_float(), 4), 1..5),
    )
        .prop_map(|(color_mode, hue_interpolation, interpolation, stops)| ColorRamp {
            color_mode,
            hue_interpolation,
            interpolation,
            elements: stops
                .into_iter()
                .map(|(step, color)| ColorStop {
                    position: f64::from(step) / 40.0,
                    color,
                })
                .collect(),
        })
}

fn arb_mapping() -> impl Strategy<Value = CurveMapping> {
    (
        (arb_float(), arb_float(), arb_float(), arb_float()),
        "[A-Z]{4,12}",
        "[A-Z]{4,8}",
        any::<bool>(),
        vec(vec((arb_float(), arb_float()).prop_map(|(x, y)| [x, y]), 0..4), 1..4),
    )
        .prop_map(
            |((clip_max_x, clip_max_y, clip_min_x, clip_min_y), extend, tone, use_clip, curves)| CurveMapping {
                clip_max_x,
                clip_max_y,
                clip_min_x,
                clip_min_y,
                extend,
                tone,
                use_clip,
                curves,
            },
        )
}

/// An unnamed node, its links as `(output, target pick, input)` and a
/// parent pick. Picks are resolved against the tree's node names.
type NodeParts = (NodeDocument, Vec<(usize, Index, usize)>, Option<Index>);

fn arb_node() -> impl Strategy<Value = NodeParts> {
    (
        "[A-Z][A-Za-z]{2,12}",
        (-2000i64..2000, -2000i64..2000),
        arb_slots(),
        arb_slots(),
        btree_map("attr_[a-z]{1,6}", arb_value(), 0..3),
        option::of(arb_ramp()),
        option::of(arb_mapping()),
        option::of("[A-Z][a-z]{0,5}"),
        vec((0usize..4, any::<Index>(), 0usize..30), 0..4),
        option::of(any::<Index>()),
    )
        .prop_map(
            |(type_id, (x, y), inputs, out_dv, attributes, color_ramp, mapping, node_tree, links, parent)| {
                let mut node = NodeDocument::new(String::new(), type_id).with_location(x, y);
                node.inputs = inputs;
                node.out_dv = out_dv;
                node.attributes = attributes.into_iter().collect();
                node.color_ramp = color_ramp;
                node.mapping = mapping;
                node.node_tree = node_tree;
                (node, links, parent)
            },
        )
}

fn arb_tree() -> impl Strategy<Value = TreeDocument> {
    (
        "[A-Z][a-z]{0,8}",
        prop_oneof![Just("material"), Just("ShaderNodeTree"), Just("GeometryNodeTree")],
        btree_set("[A-Z][a-z]{0,7}( [0-9])?", 1..6),
        vec(arb_node(), 5),
        btree_map(
            "[A-Z][a-z]{1,6}",
            btree_map("[a-z_]{1,8}", arb_value(), 0..3),
            0..3,
        ),
        btree_map("x_[a-z]{1,6}", arb_value(), 0..2),
    )
        .prop_map(|(name, kind, names, parts, interface, extra)| {
            let names: Vec<String> = names.into_iter().collect();
            let mut tree = TreeDocument::new(name, kind);
            for (name, (mut node, links, parent)) in names.iter().zip(parts) {
                node.name = name.clone();
                for (output, target, input) in links {
                    node.add_link(output, target.get::<String>(&names), input);
                }
                node.parent = parent.map(|pick| pick.get(&names).clone());
                tree.add_node(node);
            }
            tree.interface = interface
                .into_iter()
                .map(|(item, fields)| (item, fields.into_iter().collect::<IndexMap<_, _>>()))
                .collect();
            tree.extra = extra.into_iter().collect();
            tree
        })
}

/// Any well-formed document: every node section populated at random,
/// links and parents between its own nodes, up to two groups.
pub(crate) fn arb_document() -> impl Strategy<Value = TreeDocument> {
    (arb_tree(), vec(arb_tree(), 0..3)).prop_map(|(mut tree, groups)| {
        for (i, mut group) in groups.into_iter().enumerate() {
            group.name = format!("Group {i}");
            tree.groups.insert(group.name.clone(), group);
        }
        tree
    })
}

/// A material with a Principled BSDF holding integer defaults at random
/// input slots, and a source node linked into random inputs.
pub(crate) fn arb_bsdf_document() -> impl Strategy<Value = TreeDocument> {
    (btree_set(0usize..22, 0..8), vec((0usize..3, 0usize..22), 0..6)).prop_map(|(slots, links)| {
        let mut tree = TreeDocument::new("T", "material");
        let mut bsdf = NodeDocument::new("BSDF", "ShaderNodeBsdfPrincipled");
        for slot in slots {
            bsdf.inputs.insert(slot, Value::Int(slot as i64));
        }
        tree.add_node(bsdf);
        let mut src = NodeDocument::new("Src", "ShaderNodeValue");
        for (output, input) in links {
            src.add_link(output, "BSDF", input);
        }
        tree.add_node(src);
        tree
    })
}
