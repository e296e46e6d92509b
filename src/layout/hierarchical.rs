use std::collections::{HashMap, VecDeque};

use crate::config::LayoutConfig;
use crate::ir::{Diagram, DiagramKind, NodeKind};

use super::normalize_layout;

/// Forward and reverse adjacency by node index. Dangling references and
/// self-loops are left out.
pub(super) struct Adjacency {
    pub(super) forward: Vec<Vec<usize>>,
    pub(super) reverse: Vec<Vec<usize>>,
}

pub(super) fn build_adjacency(diagram: &Diagram) -> Adjacency {
    let index: HashMap<&str, usize> = diagram
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let mut forward = vec![Vec::new(); diagram.nodes.len()];
    let mut reverse = vec![Vec::new(); diagram.nodes.len()];
    for edge in &diagram.edges {
        let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        else {
            continue;
        };
        if from == to {
            continue;
        }
        forward[from].push(to);
        reverse[to].push(from);
    }
    Adjacency { forward, reverse }
}

fn default_root_kind(kind: DiagramKind) -> NodeKind {
    match kind {
        DiagramKind::Class => NodeKind::Class,
        DiagramKind::Flow => NodeKind::Process,
        DiagramKind::Mindmap => NodeKind::Root,
        DiagramKind::Sequence | DiagramKind::UseCase => NodeKind::Actor,
        DiagramKind::Generic => NodeKind::Generic,
    }
}

pub(super) fn root_set(diagram: &Diagram, adjacency: &Adjacency) -> Vec<usize> {
    let roots: Vec<usize> = diagram
        .nodes
        .iter()
        .enumerate()
        .filter(|(idx, node)| adjacency.reverse[*idx].is_empty() || node.kind.is_root_like())
        .map(|(idx, _)| idx)
        .collect();
    if !roots.is_empty() {
        return roots;
    }
    let fallback = default_root_kind(diagram.kind);
    let first = diagram
        .nodes
        .iter()
        .position(|node| node.kind == fallback)
        .unwrap_or(0);
    vec![first]
}

/// BFS layering from every root at once. Each layer keeps first-discovery
/// order. Nodes the roots never reach are seeded as extra roots, except
/// terminal nodes, which join the final layer.
pub(super) fn assign_layers(diagram: &Diagram) -> Vec<Vec<usize>> {
    let count = diagram.nodes.len();
    if count == 0 {
        return Vec::new();
    }
    let adjacency = build_adjacency(diagram);
    let mut layer_of: Vec<Option<usize>> = vec![None; count];
    let mut discovery: Vec<usize> = Vec::with_capacity(count);

    let mut run_bfs = |seeds: &[usize], layer_of: &mut Vec<Option<usize>>| {
        let mut queue = VecDeque::new();
        for &seed in seeds {
            if layer_of[seed].is_none() {
                layer_of[seed] = Some(0);
                discovery.push(seed);
                queue.push_back(seed);
            }
        }
        while let Some(current) = queue.pop_front() {
            let next_layer = layer_of[current].unwrap_or(0) + 1;
            for &next in &adjacency.forward[current] {
                if layer_of[next].is_none() {
                    layer_of[next] = Some(next_layer);
                    discovery.push(next);
                    queue.push_back(next);
                }
            }
        }
    };

    run_bfs(&root_set(diagram, &adjacency), &mut layer_of);
    for idx in 0..count {
        if layer_of[idx].is_none() && !diagram.nodes[idx].kind.is_terminal() {
            run_bfs(&[idx], &mut layer_of);
        }
    }

    let mut layers: Vec<Vec<usize>> = Vec::new();
    for &idx in &discovery {
        let layer = layer_of[idx].unwrap_or(0);
        if layers.len() <= layer {
            layers.resize_with(layer + 1, Vec::new);
        }
        layers[layer].push(idx);
    }
    let stragglers: Vec<usize> = (0..count).filter(|idx| layer_of[*idx].is_none()).collect();
    if !stragglers.is_empty() {
        if layers.is_empty() {
            layers.push(Vec::new());
        }
        if let Some(last) = layers.last_mut() {
            last.extend(stragglers);
        }
    }
    layers.retain(|layer| !layer.is_empty());
    layers
}

pub(super) fn compute_hierarchical_layout(diagram: &mut Diagram, config: &LayoutConfig) {
    let layers = assign_layers(diagram);
    let spacing = &config.hierarchical;

    // Per-node advances so wide or tall content always gets more room.
    let mut row_widths = Vec::with_capacity(layers.len());
    for layer in &layers {
        let mut cursor = 0.0f32;
        let mut extent = 0.0f32;
        for &idx in layer {
            let width = diagram.nodes[idx].width;
            extent = cursor + width;
            cursor += spacing.horizontal_spacing.max(width + spacing.node_margin);
        }
        row_widths.push(extent);
    }
    let widest = row_widths.iter().copied().fold(0.0f32, f32::max);

    let mut top = 0.0f32;
    for (layer, row_width) in layers.iter().zip(&row_widths) {
        let mut cursor = (widest - row_width) / 2.0;
        let mut tallest = 0.0f32;
        for &idx in layer {
            let node = &mut diagram.nodes[idx];
            node.place_top_left(cursor, top);
            tracing::trace!(id = %node.id, x = cursor, y = top, "placed node");
            cursor += spacing.horizontal_spacing.max(node.width + spacing.node_margin);
            tallest = tallest.max(node.height);
        }
        top += spacing
            .vertical_spacing
            .max(tallest + spacing.layer_margin);
    }

    normalize_layout(&mut diagram.nodes, config.padding);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, Node};

    fn node(id: &str, kind: NodeKind, width: f32) -> Node {
        Node::new(id.into(), kind, id, (width, 60.0))
    }

    fn graph(nodes: Vec<Node>, edges: &[(&str, &str)]) -> Diagram {
        let mut diagram = Diagram::new(DiagramKind::Generic);
        diagram.nodes = nodes;
        for (idx, (from, to)) in edges.iter().enumerate() {
            diagram
                .edges
                .push(Edge::new(format!("e{idx}"), from, to, None));
        }
        diagram
    }

    fn labels(diagram: &Diagram, layers: &[Vec<usize>]) -> Vec<Vec<String>> {
        layers
            .iter()
            .map(|layer| {
                layer
                    .iter()
                    .map(|idx| diagram.nodes[*idx].label.clone())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn layers_follow_shortest_bfs_distance() {
        let diagram = graph(
            vec![
                node("a", NodeKind::Generic, 100.0),
                node("b", NodeKind::Generic, 100.0),
                node("c", NodeKind::Generic, 100.0),
                node("d", NodeKind::Generic, 100.0),
            ],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("a", "d")],
        );
        let layers = assign_layers(&diagram);
        assert_eq!(
            labels(&diagram, &layers),
            vec![vec!["a"], vec!["b", "c", "d"]]
        );
    }

    #[test]
    fn cycles_fall_back_to_default_root() {
        let diagram = graph(
            vec![
                node("x", NodeKind::Generic, 100.0),
                node("y", NodeKind::Generic, 100.0),
            ],
            &[("x", "y"), ("y", "x")],
        );
        let layers = assign_layers(&diagram);
        assert_eq!(labels(&diagram, &layers), vec![vec!["x"], vec!["y"]]);
    }

    #[test]
    fn root_like_kinds_seed_even_with_incoming_edges() {
        let diagram = graph(
            vec![
                node("begin", NodeKind::Generic, 100.0),
                node("s", NodeKind::Start, 100.0),
                node("t", NodeKind::Generic, 100.0),
            ],
            &[("begin", "s"), ("s", "t")],
        );
        let layers = assign_layers(&diagram);
        assert_eq!(
            labels(&diagram, &layers),
            vec![vec!["begin", "s"], vec!["t"]]
        );
    }

    #[test]
    fn unreached_nodes_are_seeded_and_terminals_join_the_final_layer() {
        // Both cycles are unreachable from `a`; the `end` pair has no other way in.
        let diagram = graph(
            vec![
                node("a", NodeKind::Generic, 100.0),
                node("b", NodeKind::Generic, 100.0),
                node("c", NodeKind::Generic, 100.0),
                node("end1", NodeKind::End, 100.0),
                node("end2", NodeKind::End, 100.0),
                node("loop1", NodeKind::Generic, 100.0),
                node("loop2", NodeKind::Generic, 100.0),
            ],
            &[
                ("a", "b"),
                ("b", "c"),
                ("end1", "end2"),
                ("end2", "end1"),
                ("loop1", "loop2"),
                ("loop2", "loop1"),
            ],
        );
        let layers = assign_layers(&diagram);
        assert_eq!(
            labels(&diagram, &layers),
            vec![
                vec!["a", "loop1"],
                vec!["b", "loop2"],
                vec!["c", "end1", "end2"]
            ]
        );
    }

    #[test]
    fn same_layer_nodes_never_overlap() {
        let diagram = graph(
            vec![
                node("root", NodeKind::Generic, 120.0),
                node("w1", NodeKind::Generic, 390.0),
                node("w2", NodeKind::Generic, 60.0),
                node("w3", NodeKind::Generic, 250.0),
            ],
            &[("root", "w1"), ("root", "w2"), ("root", "w3")],
        );
        let mut laid_out = diagram.clone();
        compute_hierarchical_layout(&mut laid_out, &LayoutConfig::default());
        let row: Vec<_> = laid_out.nodes[1..].iter().map(Node::bounds).collect();
        for (i, a) in row.iter().enumerate() {
            for b in &row[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
        assert_eq!(row[0].y, row[1].y);
        // Advance is the larger of the configured spacing and width + margin.
        assert_eq!(row[1].x - row[0].x, 440.0);
        assert_eq!(row[2].x - row[1].x, 180.0);
    }

    #[test]
    fn single_node_layers_are_centered() {
        let diagram = graph(
            vec![
                node("top", NodeKind::Generic, 100.0),
                node("l", NodeKind::Generic, 100.0),
                node("r", NodeKind::Generic, 100.0),
            ],
            &[("top", "l"), ("top", "r")],
        );
        let mut laid_out = diagram.clone();
        compute_hierarchical_layout(&mut laid_out, &LayoutConfig::default());
        let top = laid_out.nodes[0].center().x;
        let left = laid_out.nodes[1].center().x;
        let right = laid_out.nodes[2].center().x;
        assert!((top - (left + right) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn tall_layers_push_the_next_layer_down() {
        let mut tall = node("tall", NodeKind::Generic, 100.0);
        tall.height = 300.0;
        let diagram = graph(
            vec![tall, node("below", NodeKind::Generic, 100.0)],
            &[("tall", "below")],
        );
        let mut laid_out = diagram.clone();
        compute_hierarchical_layout(&mut laid_out, &LayoutConfig::default());
        let gap = laid_out.nodes[1].y - laid_out.nodes[0].y;
        assert_eq!(gap, 330.0);
    }
}
