use std::collections::VecDeque;

use crate::ir::{Diagram, NodeKind};

use super::node_index;

/// Hop count from the nearest root, following edges forward. Roots are
/// root-kind nodes plus anything without an incoming edge. Nodes no root
/// reaches are collected into one last level.
pub(super) fn bfs_levels(diagram: &Diagram) -> Vec<Vec<usize>> {
    let count = diagram.nodes.len();
    let index = node_index(diagram);
    let mut forward = vec![Vec::new(); count];
    let mut has_parent = vec![false; count];
    for edge in &diagram.edges {
        let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        else {
            continue;
        };
        if from != to {
            forward[from].push(to);
            has_parent[to] = true;
        }
    }

    let mut level: Vec<Option<usize>> = vec![None; count];
    let mut queue = VecDeque::new();
    for idx in 0..count {
        if diagram.nodes[idx].kind == NodeKind::Root || !has_parent[idx] {
            level[idx] = Some(0);
            queue.push_back(idx);
        }
    }
    while let Some(current) = queue.pop_front() {
        let next_level = level[current].unwrap_or(0) + 1;
        for &next in &forward[current] {
            if level[next].is_none() {
                level[next] = Some(next_level);
                queue.push_back(next);
            }
        }
    }

    let depth = level.iter().flatten().max().map_or(0, |deepest| deepest + 1);
    let mut levels: Vec<Vec<usize>> = vec![Vec::new(); depth];
    let mut unreached = Vec::new();
    for (idx, assigned) in level.iter().enumerate() {
        match assigned {
            Some(hops) => levels[*hops].push(idx),
            None => unreached.push(idx),
        }
    }
    if !unreached.is_empty() {
        levels.push(unreached);
    }
    levels
}
