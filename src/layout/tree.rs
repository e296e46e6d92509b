use std::collections::VecDeque;

use crate::config::{LayoutConfig, MindmapConfig};
use crate::ir::{Diagram, NodeKind, bounds_of};

use super::hierarchical::build_adjacency;
use super::normalize_layout;

const COLUMN_GAP: f32 = 40.0;

/// Spanning forest over the diagram plus the subtree weight of every node.
pub(super) struct TreePlan {
    pub(super) roots: Vec<usize>,
    pub(super) children: Vec<Vec<usize>>,
    pub(super) depth: Vec<usize>,
    pub(super) weight: Vec<usize>,
}

impl TreePlan {
    /// Vertical band allotted to `idx`.
    pub(super) fn span(&self, idx: usize, unit_height: f32) -> f32 {
        self.weight[idx] as f32 * unit_height
    }
}

/// Leaves weigh one unit, every other node the sum of its children. `order`
/// lists parents before their children, so walking it backwards sees each
/// child first.
fn subtree_weights(order: &[usize], children: &[Vec<usize>]) -> Vec<usize> {
    let mut weight = vec![1usize; children.len()];
    for &idx in order.iter().rev() {
        if !children[idx].is_empty() {
            weight[idx] = children[idx].iter().map(|child| weight[*child]).sum();
        }
    }
    weight
}

/// Build the forest by BFS. Root-kind and parentless nodes are tried first in
/// node order; anything still unvisited (a cycle with no way in) starts its
/// own tree.
pub(super) fn plan_tree(diagram: &Diagram) -> TreePlan {
    let count = diagram.nodes.len();
    let adjacency = build_adjacency(diagram);
    let preferred: Vec<usize> = (0..count)
        .filter(|idx| {
            diagram.nodes[*idx].kind == NodeKind::Root || adjacency.reverse[*idx].is_empty()
        })
        .collect();

    let mut visited = vec![false; count];
    let mut children = vec![Vec::new(); count];
    let mut depth = vec![0usize; count];
    let mut roots = Vec::new();
    let mut order = Vec::with_capacity(count);
    for seed in preferred.into_iter().chain(0..count) {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        roots.push(seed);
        let mut queue = VecDeque::from([seed]);
        while let Some(current) = queue.pop_front() {
            order.push(current);
            for &next in &adjacency.forward[current] {
                if !visited[next] {
                    visited[next] = true;
                    children[current].push(next);
                    depth[next] = depth[current] + 1;
                    queue.push_back(next);
                }
            }
        }
    }

    let weight = subtree_weights(&order, &children);
    TreePlan {
        roots,
        children,
        depth,
        weight,
    }
}

/// Center-x offset per depth for one side of a tree. Columns are at least
/// `horizontal_step` apart and never closer than the two widest boxes allow.
fn column_offsets(
    diagram: &Diagram,
    plan: &TreePlan,
    root: usize,
    side: &[usize],
    config: &MindmapConfig,
) -> Vec<f32> {
    let mut widths = vec![diagram.nodes[root].width];
    let mut stack: Vec<usize> = side.to_vec();
    while let Some(idx) = stack.pop() {
        let depth = plan.depth[idx];
        if widths.len() <= depth {
            widths.resize(depth + 1, 0.0);
        }
        widths[depth] = widths[depth].max(diagram.nodes[idx].width);
        stack.extend(plan.children[idx].iter().copied());
    }
    let mut offsets = vec![0.0f32; widths.len()];
    for depth in 1..widths.len() {
        let needed = widths[depth - 1] / 2.0 + widths[depth] / 2.0 + COLUMN_GAP;
        offsets[depth] = offsets[depth - 1] + config.horizontal_step.max(needed);
    }
    offsets
}

/// Stack `nodes` from `top` down, each in a band as tall as its span, and do
/// the same for every node's children inside that node's band.
#[allow(clippy::too_many_arguments)]
fn place_band(
    diagram: &mut Diagram,
    plan: &TreePlan,
    nodes: &[usize],
    top: f32,
    direction: f32,
    columns: &[f32],
    unit_height: f32,
    placed: &mut Vec<usize>,
) {
    let mut bands: Vec<(&[usize], f32)> = vec![(nodes, top)];
    while let Some((members, top)) = bands.pop() {
        let mut cursor = top;
        for &idx in members {
            let span = plan.span(idx, unit_height);
            let center_x = direction * columns[plan.depth[idx]];
            diagram.nodes[idx].place_center(center_x, cursor + span / 2.0);
            placed.push(idx);
            if !plan.children[idx].is_empty() {
                bands.push((&plan.children[idx], cursor));
            }
            cursor += span;
        }
    }
}

pub(super) fn compute_tree_layout(diagram: &mut Diagram, config: &LayoutConfig) {
    let plan = plan_tree(diagram);
    let mindmap = &config.mindmap;
    let unit = mindmap.unit_height;

    let mut next_top = 0.0f32;
    for &root in &plan.roots {
        let kids = &plan.children[root];
        let (right, left) = kids.split_at(kids.len().div_ceil(2));
        let mut placed = vec![root];
        diagram.nodes[root].place_center(0.0, 0.0);
        for (side, direction) in [(right, 1.0f32), (left, -1.0f32)] {
            if side.is_empty() {
                continue;
            }
            let columns = column_offsets(diagram, &plan, root, side, mindmap);
            let total: f32 = side.iter().map(|idx| plan.span(*idx, unit)).sum();
            place_band(
                diagram,
                &plan,
                side,
                -total / 2.0,
                direction,
                &columns,
                unit,
                &mut placed,
            );
        }

        let Some(bounds) = bounds_of(placed.iter().map(|idx| &diagram.nodes[*idx])) else {
            continue;
        };
        let shift = next_top - bounds.y;
        for &idx in &placed {
            diagram.nodes[idx].y += shift;
        }
        next_top = bounds.bottom() + shift + unit;
        tracing::trace!(
            root = %diagram.nodes[root].id,
            nodes = placed.len(),
            "placed mind-map tree"
        );
    }

    normalize_layout(&mut diagram.nodes, config.padding);
}
