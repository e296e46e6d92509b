mod flow;
mod hierarchical;
pub mod routing;
mod sequence;
mod tree;
mod usecase;

pub use routing::{
    BendAxis, EdgeRoute, PathStyle, QuadraticCurve, Side, connection_point, connection_side,
    curved_path, default_path_style, direct_path, mermaid_path, orthogonal_path,
    parallel_offset_path, route_edges, target_connection_point, target_connection_side,
};
pub use sequence::message_y;

use crate::config::LayoutConfig;
use crate::ir::{Diagram, DiagramKind, Node, NodeKind};
use flow::compute_flow_layout;
use hierarchical::compute_hierarchical_layout;
use sequence::compute_sequence_layout;
use tree::compute_tree_layout;
use usecase::compute_usecase_layout;

/// Assign coordinates to every node of `diagram`.
///
/// The result is a new diagram with the same node and edge identities; sizes
/// computed by the parser are kept, only missing sizes are filled in.
pub fn compute_layout(diagram: &Diagram, config: &LayoutConfig) -> Diagram {
    let mut out = diagram.clone();
    for node in &mut out.nodes {
        ensure_size(node);
    }
    if out.nodes.is_empty() {
        return out;
    }
    match out.kind {
        DiagramKind::Class | DiagramKind::Generic => compute_hierarchical_layout(&mut out, config),
        DiagramKind::Flow => compute_flow_layout(&mut out, config),
        DiagramKind::Mindmap => compute_tree_layout(&mut out, config),
        DiagramKind::Sequence => compute_sequence_layout(&mut out, config),
        DiagramKind::UseCase => compute_usecase_layout(&mut out, config),
    }
    tracing::debug!(
        kind = %out.kind,
        nodes = out.nodes.len(),
        bounds = ?out.bounds(),
        "computed layout"
    );
    out
}

fn default_size(kind: NodeKind) -> (f32, f32) {
    match kind {
        NodeKind::Class => (200.0, 80.0),
        NodeKind::Actor => (80.0, 100.0),
        NodeKind::Start | NodeKind::End => (80.0, 80.0),
        NodeKind::Decision => (140.0, 90.0),
        NodeKind::UseCase => (140.0, 60.0),
        NodeKind::Root => (120.0, 60.0),
        NodeKind::Branch => (100.0, 44.0),
        NodeKind::Leaf => (80.0, 36.0),
        NodeKind::Process | NodeKind::Input | NodeKind::Output | NodeKind::Generic => {
            (120.0, 60.0)
        }
    }
}

fn ensure_size(node: &mut Node) {
    let (width, height) = default_size(node.kind);
    if !(node.width > 0.0) {
        node.width = width;
    }
    if !(node.height > 0.0) {
        node.height = height;
    }
}

/// Shift every node so the top-left of the overall bounds sits at `padding`.
fn normalize_layout(nodes: &mut [Node], padding: f32) {
    let Some(bounds) = crate::ir::bounds_of(nodes.iter()) else {
        return;
    };
    let shift_x = padding - bounds.x;
    let shift_y = padding - bounds.y;
    if shift_x == 0.0 && shift_y == 0.0 {
        return;
    }
    for node in nodes.iter_mut() {
        node.x += shift_x;
        node.y += shift_y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, Node};
    use crate::parser::parse;

    #[test]
    fn keeps_parser_sizes_and_identity() {
        let diagram = parse(
            DiagramKind::Class,
            "class Wide {\n+a_really_long_attribute_name: HashMap<String, Vec<u8>>\n}\nclass B extends Wide {}",
        )
        .unwrap();
        let laid_out = compute_layout(&diagram, &LayoutConfig::default());
        for (before, after) in diagram.nodes.iter().zip(&laid_out.nodes) {
            assert_eq!(before.id, after.id);
            assert_eq!(before.width, after.width);
            assert_eq!(before.height, after.height);
        }
        assert_eq!(diagram.edges, laid_out.edges);
    }

    #[test]
    fn fills_missing_sizes() {
        let mut diagram = Diagram::new(DiagramKind::Generic);
        diagram
            .nodes
            .push(Node::new("a".into(), NodeKind::Generic, "a", (0.0, -3.0)));
        let laid_out = compute_layout(&diagram, &LayoutConfig::default());
        assert_eq!(laid_out.nodes[0].width, 120.0);
        assert_eq!(laid_out.nodes[0].height, 60.0);
    }

    #[test]
    fn every_kind_starts_at_padding() {
        let inputs = [
            (DiagramKind::Class, "class A {}\nclass B extends A {}"),
            (DiagramKind::Sequence, "A -> B: hi"),
            (DiagramKind::Flow, "start -> work\nwork -> end"),
            (DiagramKind::UseCase, "User -> (Login)"),
            (DiagramKind::Mindmap, "Root\n  A\n  B"),
        ];
        let config = LayoutConfig::default();
        for (kind, text) in inputs {
            let laid_out = compute_layout(&parse(kind, text).unwrap(), &config);
            let bounds = laid_out.bounds().unwrap();
            assert!((bounds.y - config.padding).abs() < 1e-3, "{kind}");
            assert!(bounds.x >= config.padding - 1e-3, "{kind}");
        }
    }

    #[test]
    fn dangling_edges_are_ignored() {
        let mut diagram = Diagram::new(DiagramKind::Generic);
        diagram
            .nodes
            .push(Node::new("a".into(), NodeKind::Generic, "a", (100.0, 40.0)));
        diagram.edges.push(Edge::new("e".into(), "a", "ghost", None));
        let laid_out = compute_layout(&diagram, &LayoutConfig::default());
        assert_eq!(laid_out.nodes.len(), 1);
        assert_eq!(laid_out.edges.len(), 1);
    }
}
