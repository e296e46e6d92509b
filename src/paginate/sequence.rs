use crate::config::PaginationConfig;
use crate::ir::{Diagram, Rect, bounds_of};

use super::{PageSelection, node_index};

/// Room kept for the actor header and footer on every page.
const FRAME_HEIGHT: f32 = 200.0;

pub(super) fn messages_per_page(config: &PaginationConfig) -> usize {
    let per_page = ((config.max_height - FRAME_HEIGHT) / config.pixels_per_message.max(1.0)).floor();
    per_page.max(1.0) as usize
}

/// Messages are cut into fixed-size runs in message order; every page repeats
/// the full actor row. Later pages move their actor row down so it sits right
/// above the page's first message, keeping the page's own message rows inside
/// its view box.
pub(super) fn sequence_pages(diagram: &Diagram, config: &PaginationConfig) -> Vec<PageSelection> {
    let index = node_index(diagram);
    let mut messages: Vec<(usize, usize)> = diagram
        .edges
        .iter()
        .enumerate()
        .filter(|(_, edge)| {
            index.contains_key(edge.from.as_str()) && index.contains_key(edge.to.as_str())
        })
        .map(|(position, edge)| (edge.order().unwrap_or(position), position))
        .collect();
    messages.sort_unstable();

    let actors: Vec<usize> = (0..diagram.nodes.len()).collect();
    let header = bounds_of(diagram.nodes.iter()).unwrap_or_default();
    let rows = config.pixels_per_message;
    let frame = |first: usize, last: usize| {
        let shift = first as f32 * rows;
        let span = (last + 1).saturating_sub(first);
        let height = (FRAME_HEIGHT + span as f32 * rows).max(header.height);
        (shift, Rect::new(header.x, header.y + shift, header.width, height))
    };

    if messages.is_empty() {
        return vec![PageSelection {
            nodes: actors,
            edges: Vec::new(),
            external: Vec::new(),
            view_box: Some(frame(0, 0).1),
            shift_y: 0.0,
        }];
    }
    messages
        .chunks(messages_per_page(config))
        .map(|chunk| {
            let first = chunk.first().map_or(0, |(order, _)| *order);
            let last = chunk.last().map_or(first, |(order, _)| *order);
            let (shift_y, view_box) = frame(first, last);
            tracing::trace!(first, last, shift_y, "sequence page");
            PageSelection {
                nodes: actors.clone(),
                edges: chunk.iter().map(|(_, position)| *position).collect(),
                external: Vec::new(),
                view_box: Some(view_box),
                shift_y,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::DiagramKind;
    use crate::layout::{EdgeRoute, compute_layout, default_path_style, route_edges};
    use crate::paginate::Page;
    use crate::paginate::paginate;
    use crate::parser::parse;

    fn conversation(messages: usize) -> Diagram {
        let mut text = String::from("participant Client\nparticipant Server\n");
        for idx in 0..messages {
            if idx % 2 == 0 {
                text.push_str(&format!("Client -> Server: request {idx}\n"));
            } else {
                text.push_str(&format!("Server --> Client: reply {idx}\n"));
            }
        }
        compute_layout(
            &parse(DiagramKind::Sequence, &text).unwrap(),
            &LayoutConfig::default(),
        )
    }

    #[test]
    fn page_capacity_reserves_the_frame() {
        assert_eq!(messages_per_page(&PaginationConfig::default()), 14);
        let tiny = PaginationConfig {
            max_height: 150.0,
            ..PaginationConfig::default()
        };
        assert_eq!(messages_per_page(&tiny), 1);
    }

    #[test]
    fn every_page_repeats_the_actors() {
        let diagram = conversation(30);
        let pages = paginate(&diagram, &PaginationConfig::default());
        assert_eq!(pages.len(), 3);
        let sizes: Vec<usize> = pages.iter().map(|p| p.edges.len()).collect();
        assert_eq!(sizes, vec![14, 14, 2]);
        for page in &pages {
            let labels: Vec<&str> = page.nodes.iter().map(|n| n.label.as_str()).collect();
            assert_eq!(labels, vec!["Client", "Server"]);
            assert!(page.view_box.height <= 900.0 + 2.0 * 40.0);
        }
        assert_eq!(pages[1].edges[0].order(), Some(14));
    }

    #[test]
    fn short_conversations_stay_on_one_page() {
        let pages = paginate(&conversation(5), &PaginationConfig::default());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].edges.len(), 5);
    }

    #[test]
    fn later_pages_frame_their_own_messages() {
        let layout = LayoutConfig::default();
        let diagram = conversation(30);
        let routes = route_edges(&diagram, &layout, default_path_style(diagram.kind));
        let pages = paginate(&diagram, &PaginationConfig::default());
        assert_eq!(pages.len(), 3);
        for page in &pages {
            let top = page.view_box.y;
            let bottom = page.view_box.bottom();
            for edge in &page.edges {
                let route = routes.iter().find(|r| r.edge_id == edge.id).unwrap();
                for point in &route.points {
                    assert!(
                        point.y >= top && point.y <= bottom,
                        "page {}: message {} at y={} outside {top}..{bottom}",
                        page.page_number,
                        edge.id,
                        point.y
                    );
                }
            }
            for actor in &page.nodes {
                let rect = actor.bounds();
                assert!(rect.y >= top && rect.bottom() <= bottom);
                assert!(rect.bottom() <= routes_top(&routes, page));
            }
        }
        // The layout itself is untouched; only the page copies move.
        assert_eq!(pages[0].nodes[0].y, diagram.nodes[0].y);
        assert_eq!(pages[1].nodes[0].y, diagram.nodes[0].y + 14.0 * 50.0);
    }

    fn routes_top(routes: &[EdgeRoute], page: &Page) -> f32 {
        page.edges
            .iter()
            .filter_map(|edge| routes.iter().find(|r| r.edge_id == edge.id))
            .flat_map(|route| route.points.iter().map(|p| p.y))
            .fold(f32::INFINITY, f32::min)
    }
}
