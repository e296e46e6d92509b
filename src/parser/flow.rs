use super::{finish, label_width, source_lines, strip_quotes, title_of};
use crate::error::ParseError;
use crate::ids::IdSource;
use crate::ir::{Diagram, DiagramKind, Edge, EdgeKind, Node, NodeKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static ARROW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-{1,2}>\s*").unwrap());

/// Shape inferred from the node name. Order matters: `start` wins over `end`
/// for names such as "restart endpoint".
pub(crate) fn infer_flow_kind(name: &str) -> NodeKind {
    let lower = name.to_ascii_lowercase();
    if lower.contains("start") {
        NodeKind::Start
    } else if lower.contains("end") {
        NodeKind::End
    } else if lower.contains("decision") {
        NodeKind::Decision
    } else if lower.contains("input") {
        NodeKind::Input
    } else if lower.contains("output") {
        NodeKind::Output
    } else {
        NodeKind::Process
    }
}

pub(crate) fn flow_node_size(kind: NodeKind, label: &str) -> (f32, f32) {
    let chars = label.chars().count();
    match kind {
        NodeKind::Start | NodeKind::End => (80.0, 80.0),
        NodeKind::Decision => (label_width(chars, 60.0, 140.0, 260.0), 90.0),
        _ => (label_width(chars, 40.0, 120.0, 240.0), 60.0),
    }
}

pub(super) fn parse_flow_diagram(
    input: &str,
    ids: &mut dyn IdSource,
) -> Result<Diagram, ParseError> {
    parse_with_kinds(input, ids, DiagramKind::Flow, infer_flow_kind)
}

/// Same grammar as flow diagrams, but every node is a plain generic box.
pub(super) fn parse_generic_diagram(
    input: &str,
    ids: &mut dyn IdSource,
) -> Result<Diagram, ParseError> {
    parse_with_kinds(input, ids, DiagramKind::Generic, |_| NodeKind::Generic)
}

fn parse_with_kinds(
    input: &str,
    ids: &mut dyn IdSource,
    kind: DiagramKind,
    node_kind: fn(&str) -> NodeKind,
) -> Result<Diagram, ParseError> {
    let lines = source_lines(input, None);
    let mut diagram = Diagram::new(kind);
    let mut by_name: HashMap<String, String> = HashMap::new();

    for line in &lines {
        if let Some(title) = title_of(line.text) {
            diagram.metadata.title = Some(title);
            continue;
        }
        let (body, label) = match line.text.split_once(':') {
            Some((body, label)) => (body, Some(label.trim()).filter(|l| !l.is_empty())),
            None => (line.text, None),
        };
        let names: Vec<&str> = ARROW_RE.split(body).map(strip_quotes).collect();
        if names.iter().any(|name| name.is_empty()) {
            tracing::debug!(line = line.number, "skipping flow line with an empty node name");
            diagram.metadata.skipped_lines.push(line.number);
            continue;
        }
        if names.len() == 1 {
            if label.is_some() {
                diagram.metadata.skipped_lines.push(line.number);
            } else {
                ensure_node(&mut diagram, &mut *ids, &mut by_name, node_kind, names[0]);
            }
            continue;
        }
        let node_ids: Vec<String> = names
            .iter()
            .map(|name| ensure_node(&mut diagram, &mut *ids, &mut by_name, node_kind, name))
            .collect();
        let hops = node_ids.len() - 1;
        for (hop, pair) in node_ids.windows(2).enumerate() {
            let hop_label = if hop + 1 == hops {
                label.map(str::to_string)
            } else {
                None
            };
            let edge = Edge::new(ids.next_id("edge"), &pair[0], &pair[1], Some(EdgeKind::Flow))
                .with_label(hop_label);
            diagram.edges.push(edge);
        }
    }

    finish(diagram, lines.len())
}

fn ensure_node(
    diagram: &mut Diagram,
    ids: &mut dyn IdSource,
    by_name: &mut HashMap<String, String>,
    node_kind: fn(&str) -> NodeKind,
    name: &str,
) -> String {
    if let Some(id) = by_name.get(name) {
        return id.clone();
    }
    let id = ids.next_id("node");
    let kind = node_kind(name);
    diagram
        .nodes
        .push(Node::new(id.clone(), kind, name, flow_node_size(kind, name)));
    by_name.insert(name.to_string(), id.clone());
    id
}
