use crate::config::LayoutConfig;
use crate::ir::{Diagram, NodeKind};

use super::hierarchical::assign_layers;
use super::normalize_layout;

/// Move every `end` node into one shared final layer so converging arrows
/// meet in a single row instead of stacking on top of each other.
pub(super) fn consolidate_end_nodes(diagram: &Diagram, layers: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    let is_end = |idx: &usize| diagram.nodes[*idx].kind == NodeKind::End;
    let mut ends = Vec::new();
    let mut kept: Vec<Vec<usize>> = Vec::with_capacity(layers.len() + 1);
    for layer in layers {
        let (layer_ends, rest): (Vec<usize>, Vec<usize>) = layer.into_iter().partition(is_end);
        ends.extend(layer_ends);
        if !rest.is_empty() {
            kept.push(rest);
        }
    }
    if !ends.is_empty() {
        kept.push(ends);
    }
    kept
}

pub(super) fn compute_flow_layout(diagram: &mut Diagram, config: &LayoutConfig) {
    let layers = consolidate_end_nodes(diagram, assign_layers(diagram));
    let flow = &config.flow;

    let row_widths: Vec<f32> = layers
        .iter()
        .map(|layer| {
            let total: f32 = layer.iter().map(|idx| diagram.nodes[*idx].width).sum();
            total + flow.node_separation * layer.len().saturating_sub(1) as f32
        })
        .collect();
    let widest = row_widths.iter().copied().fold(0.0f32, f32::max);

    let mut top = 0.0f32;
    for (layer, row_width) in layers.iter().zip(&row_widths) {
        let mut cursor = (widest - row_width) / 2.0;
        let mut tallest = 0.0f32;
        for &idx in layer {
            let node = &mut diagram.nodes[idx];
            node.place_top_left(cursor, top);
            cursor += node.width + flow.node_separation;
            tallest = tallest.max(node.height);
        }
        top += tallest + flow.rank_separation;
    }

    normalize_layout(&mut diagram.nodes, config.padding);

    // Shift whole rows right when their leftmost node crosses the bound, so
    // clamping never makes neighbours collide.
    for layer in &layers {
        let leftmost = layer
            .iter()
            .map(|idx| diagram.nodes[*idx].bounds().x)
            .fold(f32::INFINITY, f32::min);
        if leftmost < flow.min_x {
            let shift = flow.min_x - leftmost;
            for &idx in layer {
                diagram.nodes[idx].x += shift;
            }
        }
    }
}
