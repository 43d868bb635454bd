//! Canvas JSON export (Obsidian `.canvas` layout, version 3.1.1)
//!
//! Nodes sit in columns by depth and are spread evenly around y = 0 within a column.
//! Ids follow pre-order position, so the same tree always renders the same file.

use mindmap_core::OutlineNode;
use serde_json::{Value, json};

const LEVEL_SPACING: i64 = 400;
const NODE_SPACING: i64 = 200;
const NODE_WIDTH: i64 = 250;
const NODE_HEIGHT: i64 = 60;
const CANVAS_VERSION: &str = "3.1.1";

pub fn to_canvas(root: &OutlineNode) -> String {
    let mut per_depth: Vec<usize> = Vec::new();
    let mut placed: Vec<(usize, usize, &OutlineNode)> = Vec::new();
    for (depth, node) in root.walk() {
        if per_depth.len() <= depth {
            per_depth.resize(depth + 1, 0);
        }
        placed.push((depth, per_depth[depth], node));
        per_depth[depth] += 1;
    }

    let nodes: Vec<Value> = placed
        .iter()
        .enumerate()
        .map(|(id, (depth, slot, node))| {
            json!({
                "id": format!("node-{id}"),
                "type": "text",
                "text": node.label,
                "x": LEVEL_SPACING * to_i64(*depth),
                "y": spread(*slot, per_depth[*depth]),
                "width": NODE_WIDTH,
                "height": NODE_HEIGHT,
            })
        })
        .collect();

    // pre-order: a node's parent is the closest earlier node one level up
    let mut edges = Vec::new();
    let mut ancestors: Vec<usize> = Vec::new();
    for (id, (depth, _, _)) in placed.iter().enumerate() {
        ancestors.truncate(*depth);
        if let Some(parent) = ancestors.last() {
            edges.push(json!({
                "id": format!("edge-{}", edges.len()),
                "fromNode": format!("node-{parent}"),
                "toNode": format!("node-{id}"),
                "fromSide": "right",
                "toSide": "left",
            }));
        }
        ancestors.push(id);
    }

    let canvas = json!({
        "nodes": nodes,
        "edges": edges,
        "version": CANVAS_VERSION,
    });
    format!("{canvas:#}")
}

/// `(slot - (count - 1) / 2) * NODE_SPACING`, kept in integer arithmetic
fn spread(slot: usize, count: usize) -> i64 {
    (2 * to_i64(slot) - (to_i64(count) - 1)) * NODE_SPACING / 2
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
