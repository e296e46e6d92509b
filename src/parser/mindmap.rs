use super::{finish, label_width, source_lines, strip_quotes};
use crate::error::ParseError;
use crate::ids::IdSource;
use crate::ir::{Diagram, DiagramKind, Edge, EdgeKind, Node, NodeData, NodeKind};
use std::collections::HashSet;

/// Box size by tree role: the root is the largest, leaves the smallest.
pub(crate) fn mindmap_node_size(kind: NodeKind, label: &str) -> (f32, f32) {
    let chars = label.chars().count();
    match kind {
        NodeKind::Root => (label_width(chars, 48.0, 120.0, 260.0), 60.0),
        NodeKind::Branch => (label_width(chars, 36.0, 100.0, 220.0), 44.0),
        _ => (label_width(chars, 28.0, 80.0, 200.0), 36.0),
    }
}

fn strip_bullet(text: &str) -> &str {
    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = text.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }
    text
}

pub(super) fn parse_mindmap_diagram(
    input: &str,
    ids: &mut dyn IdSource,
) -> Result<Diagram, ParseError> {
    let lines = source_lines(input, Some("#"));
    let mut diagram = Diagram::new(DiagramKind::Mindmap);
    // Open ancestors as (level, node index).
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut has_parent: HashSet<usize> = HashSet::new();
    let mut has_children: HashSet<usize> = HashSet::new();

    for line in &lines {
        let label = strip_quotes(strip_bullet(line.text));
        if label.is_empty() {
            diagram.metadata.skipped_lines.push(line.number);
            continue;
        }
        let level = line.indent / 2;
        while stack.last().is_some_and(|(open_level, _)| *open_level >= level) {
            stack.pop();
        }
        let idx = diagram.nodes.len();
        let mut node = Node::new(ids.next_id("node"), NodeKind::Leaf, label, (1.0, 1.0));
        node.data = Some(NodeData::Mindmap { level });
        if let Some(&(_, parent)) = stack.last() {
            let parent_id = diagram.nodes[parent].id.clone();
            diagram.edges.push(Edge::new(
                ids.next_id("edge"),
                &parent_id,
                &node.id,
                Some(EdgeKind::Branch),
            ));
            has_parent.insert(idx);
            has_children.insert(parent);
        }
        diagram.nodes.push(node);
        stack.push((level, idx));
    }

    for (idx, node) in diagram.nodes.iter_mut().enumerate() {
        node.kind = if !has_parent.contains(&idx) {
            NodeKind::Root
        } else if has_children.contains(&idx) {
            NodeKind::Branch
        } else {
            NodeKind::Leaf
        };
        let (width, height) = mindmap_node_size(node.kind, &node.label);
        node.width = width;
        node.height = height;
    }

    finish(diagram, lines.len())
}
