use super::{finish, label_width, source_lines, strip_quotes, title_of};
use crate::error::ParseError;
use crate::ids::IdSource;
use crate::ir::{Diagram, DiagramKind, Edge, EdgeData, EdgeKind, Node, NodeKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

const ACTOR_HEIGHT: f32 = 50.0;

static MESSAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<from>[^:]+?)\s*(?P<arrow>-->|->)\s*(?P<to>[^:]+?)\s*(?::\s*(?P<text>.*))?$")
        .unwrap()
});
static DECLARE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:participant|actor)\s+(.+)$").unwrap());

struct ActorSet<'a> {
    ids: &'a mut dyn IdSource,
    by_name: HashMap<String, String>,
}

impl ActorSet<'_> {
    /// First appearance fixes the column order.
    fn ensure(&mut self, diagram: &mut Diagram, name: &str) -> String {
        if let Some(id) = self.by_name.get(name) {
            return id.clone();
        }
        let id = self.ids.next_id("node");
        let width = label_width(name.chars().count(), 40.0, 100.0, 240.0);
        diagram.nodes.push(Node::new(
            id.clone(),
            NodeKind::Actor,
            name,
            (width, ACTOR_HEIGHT),
        ));
        self.by_name.insert(name.to_string(), id.clone());
        id
    }
}

pub(super) fn parse_sequence_diagram(
    input: &str,
    ids: &mut dyn IdSource,
) -> Result<Diagram, ParseError> {
    let lines = source_lines(input, None);
    let mut diagram = Diagram::new(DiagramKind::Sequence);
    let mut actors = ActorSet {
        ids,
        by_name: HashMap::new(),
    };
    let mut order = 0usize;

    for line in &lines {
        if let Some(caps) = MESSAGE_RE.captures(line.text) {
            let from_name = strip_quotes(&caps["from"]);
            let to_name = strip_quotes(&caps["to"]);
            if from_name.is_empty() || to_name.is_empty() {
                diagram.metadata.skipped_lines.push(line.number);
                continue;
            }
            let from = actors.ensure(&mut diagram, from_name);
            let to = actors.ensure(&mut diagram, to_name);
            let kind = if &caps["arrow"] == "-->" {
                EdgeKind::Async
            } else {
                EdgeKind::Sync
            };
            let label = caps
                .name("text")
                .map(|m| m.as_str().trim())
                .filter(|text| !text.is_empty())
                .map(str::to_string);
            let mut edge =
                Edge::new(actors.ids.next_id("edge"), &from, &to, Some(kind)).with_label(label);
            edge.data = Some(EdgeData::Message { order });
            order += 1;
            diagram.edges.push(edge);
            continue;
        }
        if let Some(caps) = DECLARE_RE.captures(line.text) {
            let name = strip_quotes(&caps[1]);
            if !name.is_empty() {
                actors.ensure(&mut diagram, name);
                continue;
            }
        }
        if let Some(title) = title_of(line.text) {
            diagram.metadata.title = Some(title);
            continue;
        }
        tracing::debug!(line = line.number, "skipping unrecognised sequence line");
        diagram.metadata.skipped_lines.push(line.number);
    }

    finish(diagram, lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    fn parse(input: &str) -> Result<Diagram, ParseError> {
        parse_sequence_diagram(input, &mut SequentialIds::new())
    }

    #[test]
    fn single_sync_message() {
        let diagram = parse("X -> Y: hi").unwrap();
        let labels: Vec<&str> = diagram.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["X", "Y"]);
        assert_eq!(diagram.edges.len(), 1);
        let edge = &diagram.edges[0];
        assert_eq!(edge.order(), Some(0));
        assert_eq!(edge.kind, Some(EdgeKind::Sync));
        assert_eq!(edge.label.as_deref(), Some("hi"));
        assert!(diagram.nodes.iter().all(|n| n.kind == NodeKind::Actor));
    }

    #[test]
    fn async_messages_and_first_appearance_order() {
        let diagram =
            parse("Client --> Server: request\nServer -> Db: query\nDb --> Server\nServer -> Client: done")
                .unwrap();
        let labels: Vec<&str> = diagram.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["Client", "Server", "Db"]);
        assert_eq!(diagram.edges[0].kind, Some(EdgeKind::Async));
        assert_eq!(diagram.edges[1].kind, Some(EdgeKind::Sync));
        assert_eq!(diagram.edges[2].label, None);
        let orders: Vec<usize> = diagram.edges.iter().filter_map(Edge::order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[test]
    fn participants_fix_column_order() {
        let diagram = parse("participant B\nactor A\nA -> B: ping").unwrap();
        let labels: Vec<&str> = diagram.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "A"]);
    }

    #[test]
    fn self_messages_and_bad_lines() {
        let diagram = parse("A -> A: think\nnonsense\n -> B: x").unwrap();
        assert_eq!(diagram.nodes.len(), 1);
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.metadata.skipped_lines, vec![2, 3]);
    }
}
