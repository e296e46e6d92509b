//! Splitting laid-out diagrams that exceed the configured page size.
//!
//! Every strategy produces groups of node indices ("units") in reading order.
//! Units are packed greedily onto pages; a unit that is larger than a page on
//! its own is first broken into chunks that fit.

mod cluster;
mod levels;
mod sequence;
mod spatial;

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::{BreakStrategy, PaginationConfig};
use crate::ir::{Diagram, DiagramKind, Edge, Node, Rect, bounds_of};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// 1-based.
    pub page_number: usize,
    pub total_pages: usize,
    pub title: String,
    /// Tight bounds of the page content plus padding.
    pub view_box: Rect,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Edges left off this page because their other endpoint lives elsewhere.
    pub external_edges: Vec<String>,
}

/// What a strategy decided to put on one page, by index into the diagram.
pub(crate) struct PageSelection {
    pub(crate) nodes: Vec<usize>,
    pub(crate) edges: Vec<usize>,
    pub(crate) external: Vec<usize>,
    pub(crate) view_box: Option<Rect>,
    /// Vertical move applied to the page's copies of its nodes.
    pub(crate) shift_y: f32,
}

/// Split `diagram` into pages no larger than the configured maximum. A
/// diagram that already fits comes back as a single page; an empty diagram
/// yields no pages.
pub fn paginate(diagram: &Diagram, config: &PaginationConfig) -> Vec<Page> {
    let Some(bounds) = diagram.bounds() else {
        return Vec::new();
    };

    let selections = if diagram.kind == DiagramKind::Sequence {
        sequence::sequence_pages(diagram, config)
    } else if fits(&bounds, config) {
        vec![select(diagram, (0..diagram.nodes.len()).collect())]
    } else {
        let groups = match diagram.kind {
            DiagramKind::Class => pack_units(diagram, cluster::neighbour_clusters(diagram), config),
            DiagramKind::Mindmap => pack_units(diagram, levels::bfs_levels(diagram), config),
            DiagramKind::UseCase => pack_units(diagram, cluster::actor_groups(diagram), config),
            // Flow and generic graphs honour the configured strategy.
            _ => match config.strategy {
                BreakStrategy::Layers => {
                    pack_units(diagram, spatial::y_bands(diagram, config.band_tolerance), config)
                }
                BreakStrategy::Clusters => {
                    pack_units(diagram, cluster::neighbour_clusters(diagram), config)
                }
                BreakStrategy::Grid => spatial::grid_cells(diagram, &bounds, config),
            },
        };
        groups
            .into_iter()
            .map(|group| select(diagram, group))
            .collect()
    };

    let pages = assemble(diagram, selections, config);
    tracing::debug!(
        kind = %diagram.kind,
        pages = pages.len(),
        width = bounds.width,
        height = bounds.height,
        "paginated diagram"
    );
    pages
}

pub(crate) fn fits(rect: &Rect, config: &PaginationConfig) -> bool {
    rect.width <= config.max_width + config.overlap_margin
        && rect.height <= config.max_height + config.overlap_margin
}

pub(crate) fn node_index(diagram: &Diagram) -> HashMap<&str, usize> {
    diagram
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect()
}

/// Undirected neighbours by node index, in edge order, without self-loops or
/// dangling references.
pub(crate) fn neighbours(diagram: &Diagram) -> Vec<Vec<usize>> {
    let index = node_index(diagram);
    let mut out = vec![Vec::new(); diagram.nodes.len()];
    for edge in &diagram.edges {
        let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        else {
            continue;
        };
        if from != to {
            out[from].push(to);
            out[to].push(from);
        }
    }
    out
}

fn group_bounds(diagram: &Diagram, group: &[usize]) -> Option<Rect> {
    bounds_of(group.iter().map(|idx| &diagram.nodes[*idx]))
}

/// Break a unit that is too large for one page into chunks that fit, placing
/// nodes in reading order into the first chunk with room. Only a single node
/// larger than the page can still overflow.
fn split_unit(diagram: &Diagram, mut unit: Vec<usize>, config: &PaginationConfig) -> Vec<Vec<usize>> {
    unit.sort_by(|a, b| {
        let ra = diagram.nodes[*a].bounds();
        let rb = diagram.nodes[*b].bounds();
        ra.y.total_cmp(&rb.y).then(ra.x.total_cmp(&rb.x))
    });
    let mut chunks: Vec<(Vec<usize>, Rect)> = Vec::new();
    for idx in unit {
        let rect = diagram.nodes[idx].bounds();
        let slot = chunks
            .iter()
            .position(|(_, bounds)| fits(&bounds.union(&rect), config));
        match slot {
            Some(pos) => {
                let (members, bounds) = &mut chunks[pos];
                members.push(idx);
                *bounds = bounds.union(&rect);
            }
            None => chunks.push((vec![idx], rect)),
        }
    }
    chunks.into_iter().map(|(members, _)| members).collect()
}

/// Greedy accumulation: keep adding units to the current page until the next
/// one would push it past the limits.
pub(crate) fn pack_units(
    diagram: &Diagram,
    units: Vec<Vec<usize>>,
    config: &PaginationConfig,
) -> Vec<Vec<usize>> {
    let mut pages: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut current_bounds: Option<Rect> = None;

    for unit in units {
        let Some(unit_bounds) = group_bounds(diagram, &unit) else {
            continue;
        };
        let chunks = if fits(&unit_bounds, config) {
            vec![unit]
        } else {
            split_unit(diagram, unit, config)
        };
        for chunk in chunks {
            let Some(chunk_bounds) = group_bounds(diagram, &chunk) else {
                continue;
            };
            let merged = match current_bounds {
                Some(bounds) => bounds.union(&chunk_bounds),
                None => chunk_bounds,
            };
            if current.is_empty() || fits(&merged, config) {
                current.extend(chunk);
                current_bounds = Some(merged);
            } else {
                pages.push(std::mem::take(&mut current));
                current = chunk;
                current_bounds = Some(chunk_bounds);
            }
        }
    }
    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

/// Page contents for a node group: edges with both ends on the page, plus the
/// ones that cross to another page.
pub(crate) fn select(diagram: &Diagram, mut nodes: Vec<usize>) -> PageSelection {
    nodes.sort_unstable();
    nodes.dedup();
    let on_page: HashSet<&str> = nodes
        .iter()
        .map(|idx| diagram.nodes[*idx].id.as_str())
        .collect();
    let index = node_index(diagram);
    let mut edges = Vec::new();
    let mut external = Vec::new();
    for (idx, edge) in diagram.edges.iter().enumerate() {
        if !index.contains_key(edge.from.as_str()) || !index.contains_key(edge.to.as_str()) {
            continue;
        }
        match (
            on_page.contains(edge.from.as_str()),
            on_page.contains(edge.to.as_str()),
        ) {
            (true, true) => edges.push(idx),
            (true, false) | (false, true) => external.push(idx),
            (false, false) => {}
        }
    }
    PageSelection {
        nodes,
        edges,
        external,
        view_box: None,
        shift_y: 0.0,
    }
}

fn page_title(title: Option<&str>, number: usize, total: usize) -> String {
    match title {
        Some(title) => format!("{title} (page {number} of {total})"),
        None => format!("Page {number} of {total}"),
    }
}

fn assemble(diagram: &Diagram, selections: Vec<PageSelection>, config: &PaginationConfig) -> Vec<Page> {
    let total = selections.len();
    selections
        .into_iter()
        .enumerate()
        .map(|(idx, selection)| {
            let view_box = selection
                .view_box
                .or_else(|| group_bounds(diagram, &selection.nodes))
                .unwrap_or_default()
                .expand(config.padding);
            Page {
                page_number: idx + 1,
                total_pages: total,
                title: page_title(diagram.metadata.title.as_deref(), idx + 1, total),
                view_box,
                nodes: selection
                    .nodes
                    .iter()
                    .map(|node| {
                        let mut node = diagram.nodes[*node].clone();
                        node.y += selection.shift_y;
                        node
                    })
                    .collect(),
                edges: selection
                    .edges
                    .iter()
                    .map(|edge| diagram.edges[*edge].clone())
                    .collect(),
                external_edges: selection
                    .external
                    .iter()
                    .map(|edge| diagram.edges[*edge].id.clone())
                    .collect(),
            }
        })
        .collect()
}
