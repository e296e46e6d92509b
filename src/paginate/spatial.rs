use std::collections::BTreeMap;

use crate::config::PaginationConfig;
use crate::ir::{Diagram, Rect};

/// Horizontal bands: nodes sorted by top edge, a band collecting every node
/// whose top is within `tolerance` of the band's first node.
pub(super) fn y_bands(diagram: &Diagram, tolerance: f32) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..diagram.nodes.len()).collect();
    order.sort_by(|a, b| {
        let ra = diagram.nodes[*a].bounds();
        let rb = diagram.nodes[*b].bounds();
        ra.y.total_cmp(&rb.y).then(ra.x.total_cmp(&rb.x))
    });

    let mut bands: Vec<Vec<usize>> = Vec::new();
    let mut band_top = f32::NEG_INFINITY;
    for idx in order {
        let top = diagram.nodes[idx].bounds().y;
        match bands.last_mut() {
            Some(band) if top - band_top <= tolerance => band.push(idx),
            _ => {
                bands.push(vec![idx]);
                band_top = top;
            }
        }
    }
    bands
}

/// Cut the bounding box into page-sized cells and give each node to the cell
/// holding its center, row by row. Only occupied cells are materialised.
pub(super) fn grid_cells(diagram: &Diagram, bounds: &Rect, config: &PaginationConfig) -> Vec<Vec<usize>> {
    let cell_width = config.max_width.max(1.0);
    let cell_height = config.max_height.max(1.0);
    let columns = ((bounds.width / cell_width).ceil() as usize).max(1);
    let rows = ((bounds.height / cell_height).ceil() as usize).max(1);

    let mut cells: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
    for (idx, node) in diagram.nodes.iter().enumerate() {
        let center = node.center();
        let column = (((center.x - bounds.x) / cell_width).floor().max(0.0) as usize).min(columns - 1);
        let row = (((center.y - bounds.y) / cell_height).floor().max(0.0) as usize).min(rows - 1);
        cells.entry((row, column)).or_default().push(idx);
    }
    tracing::trace!(columns, rows, occupied = cells.len(), "grid pagination");
    cells.into_values().collect()
}
