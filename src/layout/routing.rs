use std::collections::HashMap;

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::ir::{Diagram, DiagramKind, Edge, Node, NodeKind, Point};

use super::sequence::message_y;

const ALIGN_EPSILON: f32 = 0.5;
const SELF_LOOP_PAD: f32 = 24.0;
const SEQUENCE_SELF_WIDTH: f32 = 40.0;
const CURVE_SEGMENTS: usize = 12;
const TARGET_VERTICAL_RATIO: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

/// Which axis the middle segment of an orthogonal path runs across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BendAxis {
    /// Bend at the vertical midpoint: down, across, down.
    Vertical,
    /// Bend at the horizontal midpoint: across, down, across.
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    Direct,
    Orthogonal(BendAxis),
    Mermaid,
    Curved,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuadraticCurve {
    pub start: Point,
    pub control: Point,
    pub end: Point,
}

impl QuadraticCurve {
    pub fn point_at(&self, t: f32) -> Point {
        let u = 1.0 - t;
        Point::new(
            u * u * self.start.x + 2.0 * u * t * self.control.x + t * t * self.end.x,
            u * u * self.start.y + 2.0 * u * t * self.control.y + t * t * self.end.y,
        )
    }

    /// Polyline approximation with `segments` pieces (at least one).
    pub fn sample(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|step| self.point_at(step as f32 / segments as f32))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeRoute {
    pub edge_id: String,
    pub points: Vec<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<QuadraticCurve>,
}

/// Flowchart shapes lean towards top/bottom attachment.
fn vertical_bias(kind: NodeKind) -> f32 {
    match kind {
        NodeKind::Decision => 1.8,
        kind if kind.is_flow_shape() => 1.5,
        _ => 1.0,
    }
}

fn side_point(node: &Node, side: Side) -> Point {
    let rect = node.bounds();
    let center = rect.center();
    match side {
        Side::Top => Point::new(center.x, rect.y),
        Side::Right => Point::new(rect.right(), center.y),
        Side::Bottom => Point::new(center.x, rect.bottom()),
        Side::Left => Point::new(rect.x, center.y),
    }
}

/// Side of `source` an edge towards `target` leaves from.
pub fn connection_side(source: &Node, target: &Node) -> Side {
    let from = source.center();
    let to = target.center();
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx.abs() > dy.abs() * vertical_bias(source.kind) {
        if dx >= 0.0 { Side::Right } else { Side::Left }
    } else if dy >= 0.0 {
        Side::Bottom
    } else {
        Side::Top
    }
}

/// Border point of `source` for an edge towards `target`. Side midpoints of a
/// decision's bounds are exactly its diamond vertices.
pub fn connection_point(source: &Node, target: &Node) -> Point {
    side_point(source, connection_side(source, target))
}

/// Side of `target` an edge from `source` arrives on. Any noticeable vertical
/// component wins, so arrows mostly come in from above or below.
pub fn target_connection_side(source: &Node, target: &Node) -> Side {
    let from = source.center();
    let to = target.center();
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dy.abs() > TARGET_VERTICAL_RATIO * dx.abs() {
        if dy >= 0.0 { Side::Top } else { Side::Bottom }
    } else if dx >= 0.0 {
        Side::Left
    } else {
        Side::Right
    }
}

pub fn target_connection_point(source: &Node, target: &Node) -> Point {
    side_point(target, target_connection_side(source, target))
}

pub fn direct_path(start: Point, end: Point) -> Vec<Point> {
    vec![start, end]
}

pub fn orthogonal_path(start: Point, end: Point, axis: BendAxis) -> Vec<Point> {
    match axis {
        BendAxis::Vertical => {
            let mid_y = (start.y + end.y) / 2.0;
            vec![
                start,
                Point::new(start.x, mid_y),
                Point::new(end.x, mid_y),
                end,
            ]
        }
        BendAxis::Horizontal => {
            let mid_x = (start.x + end.x) / 2.0;
            vec![
                start,
                Point::new(mid_x, start.y),
                Point::new(mid_x, end.y),
                end,
            ]
        }
    }
}

fn is_aligned(start: Point, end: Point) -> bool {
    (start.x - end.x).abs() < ALIGN_EPSILON || (start.y - end.y).abs() < ALIGN_EPSILON
}

/// Three points when the endpoints line up, otherwise a four point path that
/// bends across the smaller of the two deltas.
pub fn mermaid_path(start: Point, end: Point) -> Vec<Point> {
    if is_aligned(start, end) {
        let mid = Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
        return vec![start, mid, end];
    }
    let dx = (end.x - start.x).abs();
    let dy = (end.y - start.y).abs();
    if dx < dy {
        orthogonal_path(start, end, BendAxis::Vertical)
    } else {
        orthogonal_path(start, end, BendAxis::Horizontal)
    }
}

/// Move the interior of a path sideways by `offset`, perpendicular to the
/// segment being moved. Four point paths shift their middle segment (or the
/// chord, when that segment has collapsed because the endpoints line up);
/// straight paths push the midpoint off the chord.
fn offset_middle(points: &mut Vec<Point>, offset: f32) {
    if offset == 0.0 || points.len() < 2 {
        return;
    }
    let start = points[0];
    let end = points[points.len() - 1];
    if points.len() == 4 {
        let (a, b) = (points[1], points[2]);
        let Some((nx, ny)) = unit_normal(a, b).or_else(|| unit_normal(start, end)) else {
            return;
        };
        for point in &mut points[1..3] {
            point.x += nx * offset;
            point.y += ny * offset;
        }
        return;
    }
    let Some((nx, ny)) = unit_normal(start, end) else {
        return;
    };
    let mid = Point::new(
        (start.x + end.x) / 2.0 + nx * offset,
        (start.y + end.y) / 2.0 + ny * offset,
    );
    *points = vec![start, mid, end];
}

/// Left-hand normal of the direction `from -> to`.
fn unit_normal(from: Point, to: Point) -> Option<(f32, f32)> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let length = (dx * dx + dy * dy).sqrt();
    (length >= ALIGN_EPSILON).then(|| (-dy / length, dx / length))
}

fn parallel_offset(index: usize, total: usize, spacing: f32) -> f32 {
    if total < 2 {
        return 0.0;
    }
    spacing * (index as f32 - (total as f32 - 1.0) / 2.0)
}

/// [`mermaid_path`] with its middle displaced so `total` edges between the
/// same pair of nodes fan out symmetrically.
pub fn parallel_offset_path(
    start: Point,
    end: Point,
    index: usize,
    total: usize,
    spacing: f32,
) -> Vec<Point> {
    let mut points = mermaid_path(start, end);
    offset_middle(&mut points, parallel_offset(index, total, spacing));
    points
}

/// Quadratic curve bowing away from the chord by `min(0.3 * length, cap)`.
pub fn curved_path(start: Point, end: Point, cap: f32) -> QuadraticCurve {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length = (dx * dx + dy * dy).sqrt();
    let mid = Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
    let control = if length < f32::EPSILON {
        mid
    } else {
        let bow = (0.3 * length).min(cap);
        Point::new(mid.x - dy / length * bow, mid.y + dx / length * bow)
    };
    QuadraticCurve {
        start,
        control,
        end,
    }
}

pub fn default_path_style(kind: DiagramKind) -> PathStyle {
    match kind {
        DiagramKind::Mindmap => PathStyle::Curved,
        DiagramKind::Flow => PathStyle::Mermaid,
        DiagramKind::Sequence => PathStyle::Direct,
        DiagramKind::Class | DiagramKind::UseCase | DiagramKind::Generic => {
            PathStyle::Orthogonal(BendAxis::Vertical)
        }
    }
}

pub(super) fn edge_pair_key(edge: &Edge) -> (String, String) {
    if edge.from <= edge.to {
        (edge.from.clone(), edge.to.clone())
    } else {
        (edge.to.clone(), edge.from.clone())
    }
}

pub(super) fn build_edge_pair_counts<'a>(
    edges: impl IntoIterator<Item = &'a Edge>,
) -> HashMap<(String, String), usize> {
    let mut counts: HashMap<(String, String), usize> = HashMap::new();
    for edge in edges {
        let key = edge_pair_key(edge);
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Loop leaving the right side and coming back in through the top.
pub(super) fn route_self_loop(node: &Node, pad: f32) -> Vec<Point> {
    let rect = node.bounds();
    let center = rect.center();
    vec![
        Point::new(rect.right(), center.y),
        Point::new(rect.right() + pad, center.y),
        Point::new(rect.right() + pad, rect.y - pad),
        Point::new(center.x, rect.y - pad),
        Point::new(center.x, rect.y),
    ]
}

fn route_message(from: &Node, to: &Node, y: f32, config: &LayoutConfig) -> Vec<Point> {
    let start_x = from.center().x;
    if from.id == to.id {
        let out = start_x + SEQUENCE_SELF_WIDTH;
        let back = y + config.sequence.pixels_per_message / 2.0;
        return vec![
            Point::new(start_x, y),
            Point::new(out, y),
            Point::new(out, back),
            Point::new(start_x, back),
        ];
    }
    direct_path(Point::new(start_x, y), Point::new(to.center().x, y))
}

/// Route every edge of a laid-out diagram. Edges referencing missing nodes
/// produce no route. Sequence messages always run horizontally at their
/// message row regardless of `style`.
pub fn route_edges(diagram: &Diagram, config: &LayoutConfig, style: PathStyle) -> Vec<EdgeRoute> {
    let nodes: HashMap<&str, &Node> = diagram
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), node))
        .collect();
    let pair_counts = build_edge_pair_counts(diagram.connected_edges());
    let mut pair_seen: HashMap<(String, String), usize> = HashMap::new();
    let spacing = config.routing.parallel_spacing;

    let mut routes = Vec::with_capacity(diagram.edges.len());
    for (position, edge) in diagram.edges.iter().enumerate() {
        let (Some(from), Some(to)) = (nodes.get(edge.from.as_str()), nodes.get(edge.to.as_str()))
        else {
            tracing::debug!(edge = %edge.id, "skipping edge with a missing endpoint");
            continue;
        };

        if diagram.kind == DiagramKind::Sequence {
            let y = message_y(config, edge.order().unwrap_or(position));
            routes.push(EdgeRoute {
                edge_id: edge.id.clone(),
                points: route_message(from, to, y, config),
                curve: None,
            });
            continue;
        }

        if from.id == to.id {
            routes.push(EdgeRoute {
                edge_id: edge.id.clone(),
                points: route_self_loop(from, SELF_LOOP_PAD),
                curve: None,
            });
            continue;
        }

        let key = edge_pair_key(edge);
        let total = pair_counts.get(&key).copied().unwrap_or(1);
        let slot = pair_seen.entry(key).or_insert(0);
        let seen = *slot;
        *slot += 1;
        // Offsets are measured against the pair's canonical direction, so a
        // reversed edge takes the mirrored slot.
        let index = if edge.from > edge.to {
            total.saturating_sub(seen + 1)
        } else {
            seen
        };

        let start = connection_point(from, to);
        let end = target_connection_point(from, to);
        let route = match style {
            PathStyle::Direct => EdgeRoute {
                edge_id: edge.id.clone(),
                points: direct_path(start, end),
                curve: None,
            },
            PathStyle::Orthogonal(axis) => {
                let mut points = orthogonal_path(start, end, axis);
                offset_middle(&mut points, parallel_offset(index, total, spacing));
                EdgeRoute {
                    edge_id: edge.id.clone(),
                    points,
                    curve: None,
                }
            }
            PathStyle::Mermaid => EdgeRoute {
                edge_id: edge.id.clone(),
                points: parallel_offset_path(start, end, index, total, spacing),
                curve: None,
            },
            PathStyle::Curved => {
                let cap = config.routing.curve_cap + parallel_offset(index, total, spacing);
                let curve = curved_path(start, end, cap);
                EdgeRoute {
                    edge_id: edge.id.clone(),
                    points: curve.sample(CURVE_SEGMENTS),
                    curve: Some(curve),
                }
            }
        };
        routes.push(route);
    }
    routes
}
