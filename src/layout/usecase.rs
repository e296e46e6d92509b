use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::ir::{Diagram, NodeKind};

use super::normalize_layout;

/// Use-cases form one column; each actor sits to the left at the average
/// height of the use-cases it touches. Actors without links queue up below.
pub(super) fn compute_usecase_layout(diagram: &mut Diagram, config: &LayoutConfig) {
    let gaps = &config.usecase;
    let (actors, cases): (Vec<usize>, Vec<usize>) =
        (0..diagram.nodes.len()).partition(|idx| diagram.nodes[*idx].kind == NodeKind::Actor);

    let actor_column = actors
        .iter()
        .map(|idx| diagram.nodes[*idx].width)
        .fold(0.0f32, f32::max);
    let case_column = cases
        .iter()
        .map(|idx| diagram.nodes[*idx].width)
        .fold(0.0f32, f32::max);
    let case_center_x = actor_column + gaps.column_gap + case_column / 2.0;

    let mut top = 0.0f32;
    for &idx in &cases {
        let node = &mut diagram.nodes[idx];
        node.place_top_left(case_center_x - node.width / 2.0, top);
        top += node.height + gaps.row_gap;
    }

    let index: HashMap<&str, usize> = diagram
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let mut linked: HashMap<usize, Vec<f32>> = HashMap::new();
    for edge in diagram.connected_edges() {
        let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        else {
            continue;
        };
        let from_actor = diagram.nodes[from].kind == NodeKind::Actor;
        let to_actor = diagram.nodes[to].kind == NodeKind::Actor;
        match (from_actor, to_actor) {
            (true, false) => linked.entry(from).or_default().push(diagram.nodes[to].center().y),
            (false, true) => linked.entry(to).or_default().push(diagram.nodes[from].center().y),
            _ => {}
        }
    }

    // Barycenter targets, then push down in order so actors never collide.
    let mut targets: Vec<(usize, f32)> = actors
        .iter()
        .filter_map(|idx| {
            let ys = linked.get(idx)?;
            let mean = ys.iter().sum::<f32>() / ys.len() as f32;
            Some((*idx, mean - diagram.nodes[*idx].height / 2.0))
        })
        .collect();
    targets.sort_by(|a, b| a.1.total_cmp(&b.1));
    let mut floor = f32::NEG_INFINITY;
    let mut lowest = top - gaps.row_gap;
    for (idx, target) in targets {
        let node = &mut diagram.nodes[idx];
        let y = target.max(floor);
        node.place_top_left((actor_column - node.width) / 2.0, y);
        floor = y + node.height + gaps.row_gap;
        lowest = lowest.max(y + node.height);
    }

    let mut cursor = lowest.max(0.0) + gaps.row_gap;
    for &idx in &actors {
        if linked.contains_key(&idx) {
            continue;
        }
        let node = &mut diagram.nodes[idx];
        node.place_top_left((actor_column - node.width) / 2.0, cursor);
        cursor += node.height + gaps.row_gap;
    }

    normalize_layout(&mut diagram.nodes, config.padding);
}
