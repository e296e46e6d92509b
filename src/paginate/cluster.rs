use crate::ir::{Diagram, NodeKind};

use super::neighbours;

/// One-hop clusters: each unvisited node pulls in every neighbour that is not
/// already taken.
pub(super) fn neighbour_clusters(diagram: &Diagram) -> Vec<Vec<usize>> {
    let adjacency = neighbours(diagram);
    let mut taken = vec![false; diagram.nodes.len()];
    let mut clusters = Vec::new();
    for seed in 0..diagram.nodes.len() {
        if taken[seed] {
            continue;
        }
        taken[seed] = true;
        let mut cluster = vec![seed];
        for &next in &adjacency[seed] {
            if !taken[next] {
                taken[next] = true;
                cluster.push(next);
            }
        }
        clusters.push(cluster);
    }
    clusters
}

/// Group every use-case with the actor it has most links to (ties go to the
/// earlier actor). Use-cases only reachable through other use-cases follow
/// the group of their neighbour; whatever is left forms a final group.
pub(super) fn actor_groups(diagram: &Diagram) -> Vec<Vec<usize>> {
    let adjacency = neighbours(diagram);
    let actors: Vec<usize> = (0..diagram.nodes.len())
        .filter(|idx| diagram.nodes[*idx].kind == NodeKind::Actor)
        .collect();
    let is_actor = |idx: usize| diagram.nodes[idx].kind == NodeKind::Actor;

    let mut owner: Vec<Option<usize>> = vec![None; diagram.nodes.len()];
    for idx in 0..diagram.nodes.len() {
        if is_actor(idx) {
            continue;
        }
        let mut best: Option<(usize, usize)> = None;
        for (slot, &actor) in actors.iter().enumerate() {
            let links = adjacency[idx].iter().filter(|n| **n == actor).count();
            if links > 0 && best.is_none_or(|(_, count)| links > count) {
                best = Some((slot, links));
            }
        }
        owner[idx] = best.map(|(slot, _)| slot);
    }

    let mut changed = true;
    while changed {
        changed = false;
        for idx in 0..diagram.nodes.len() {
            if is_actor(idx) || owner[idx].is_some() {
                continue;
            }
            let inherited = adjacency[idx]
                .iter()
                .filter(|n| !is_actor(**n))
                .find_map(|n| owner[*n]);
            if inherited.is_some() {
                owner[idx] = inherited;
                changed = true;
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = actors.iter().map(|actor| vec![*actor]).collect();
    let mut orphans = Vec::new();
    for idx in 0..diagram.nodes.len() {
        if is_actor(idx) {
            continue;
        }
        match owner[idx] {
            Some(slot) => groups[slot].push(idx),
            None => orphans.push(idx),
        }
    }
    if !orphans.is_empty() {
        groups.push(orphans);
    }
    groups
}
