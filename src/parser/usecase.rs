use super::{finish, label_width, source_lines, strip_quotes, title_of};
use crate::error::ParseError;
use crate::ids::IdSource;
use crate::ir::{Diagram, DiagramKind, Edge, EdgeKind, Node, NodeKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

const ACTOR_HEIGHT: f32 = 100.0;
const USECASE_HEIGHT: f32 = 60.0;

static ACTOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^actor\s+(.+)$").unwrap());
static ACTOR_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<actor>[^()]+?)\s*-{1,2}>\s*\((?P<case>[^()]+)\)\s*(?::\s*(?P<label>.+))?$")
        .unwrap()
});
static CASE_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\((?P<from>[^()]+)\)\s*[.\-]{1,2}>\s*\((?P<to>[^()]+)\)\s*(?::\s*(?P<label>.+))?$")
        .unwrap()
});
static CASE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(([^()]+)\)$").unwrap());

#[derive(Default)]
struct Registry {
    actors: HashMap<String, String>,
    cases: HashMap<String, String>,
}

impl Registry {
    fn actor(&mut self, diagram: &mut Diagram, ids: &mut dyn IdSource, name: &str) -> String {
        if let Some(id) = self.actors.get(name) {
            return id.clone();
        }
        let id = ids.next_id("node");
        let width = label_width(name.chars().count(), 20.0, 80.0, 160.0);
        diagram.nodes.push(Node::new(
            id.clone(),
            NodeKind::Actor,
            name,
            (width, ACTOR_HEIGHT),
        ));
        self.actors.insert(name.to_string(), id.clone());
        id
    }

    /// Use-cases are created on first reference and deduplicated by label.
    fn case(&mut self, diagram: &mut Diagram, ids: &mut dyn IdSource, label: &str) -> String {
        if let Some(id) = self.cases.get(label) {
            return id.clone();
        }
        let id = ids.next_id("node");
        let width = label_width(label.chars().count(), 40.0, 140.0, 300.0);
        diagram.nodes.push(Node::new(
            id.clone(),
            NodeKind::UseCase,
            label,
            (width, USECASE_HEIGHT),
        ));
        self.cases.insert(label.to_string(), id.clone());
        id
    }
}

fn case_relation(label: Option<&str>) -> (EdgeKind, Option<String>) {
    let Some(label) = label else {
        return (EdgeKind::Association, None);
    };
    let token = label
        .trim()
        .trim_start_matches("<<")
        .trim_end_matches(">>")
        .to_ascii_lowercase();
    match token.as_str() {
        "include" | "includes" => (EdgeKind::Includes, Some(label.to_string())),
        "extend" | "extends" => (EdgeKind::Extends, Some(label.to_string())),
        _ => (EdgeKind::Association, Some(label.to_string())),
    }
}

pub(super) fn parse_usecase_diagram(
    input: &str,
    ids: &mut dyn IdSource,
) -> Result<Diagram, ParseError> {
    let lines = source_lines(input, None);
    let mut diagram = Diagram::new(DiagramKind::UseCase);
    let mut registry = Registry::default();

    for line in &lines {
        if let Some(caps) = CASE_LINK_RE.captures(line.text) {
            let from = registry.case(&mut diagram, ids, caps["from"].trim());
            let to = registry.case(&mut diagram, ids, caps["to"].trim());
            let (kind, label) = case_relation(caps.name("label").map(|m| m.as_str().trim()));
            let edge = Edge::new(ids.next_id("edge"), &from, &to, Some(kind)).with_label(label);
            diagram.edges.push(edge);
            continue;
        }
        if let Some(caps) = ACTOR_LINK_RE.captures(line.text) {
            let actor_name = strip_quotes(&caps["actor"]);
            if actor_name.is_empty() {
                diagram.metadata.skipped_lines.push(line.number);
                continue;
            }
            let actor = registry.actor(&mut diagram, ids, actor_name);
            let case = registry.case(&mut diagram, ids, caps["case"].trim());
            let label = caps.name("label").map(|m| m.as_str().trim().to_string());
            let edge = Edge::new(ids.next_id("edge"), &actor, &case, Some(EdgeKind::Association))
                .with_label(label);
            diagram.edges.push(edge);
            continue;
        }
        if let Some(caps) = ACTOR_RE.captures(line.text) {
            let name = strip_quotes(&caps[1]);
            if !name.is_empty() {
                registry.actor(&mut diagram, ids, name);
                continue;
            }
        }
        if let Some(caps) = CASE_RE.captures(line.text) {
            registry.case(&mut diagram, ids, caps[1].trim());
            continue;
        }
        if let Some(title) = title_of(line.text) {
            diagram.metadata.title = Some(title);
            continue;
        }
        tracing::debug!(line = line.number, "skipping unrecognised use-case line");
        diagram.metadata.skipped_lines.push(line.number);
    }

    finish(diagram, lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    fn parse(input: &str) -> Result<Diagram, ParseError> {
        parse_usecase_diagram(input, &mut SequentialIds::new())
    }

    fn count(diagram: &Diagram, kind: NodeKind) -> usize {
        diagram.nodes.iter().filter(|n| n.kind == kind).count()
    }

    #[test]
    fn use_case_referenced_first_by_actor_is_created_once() {
        let diagram =
            parse("actor Customer\nactor Clerk\nCustomer -> (Place Order)\nClerk -> (Place Order)")
                .unwrap();
        assert_eq!(count(&diagram, NodeKind::UseCase), 1);
        assert_eq!(count(&diagram, NodeKind::Actor), 2);
        assert_eq!(diagram.edges.len(), 2);
        assert_eq!(diagram.edges[0].to, diagram.edges[1].to);
    }

    #[test]
    fn undeclared_actors_are_created_implicitly() {
        let diagram = parse("Admin -> (Manage Users) : owns").unwrap();
        assert_eq!(count(&diagram, NodeKind::Actor), 1);
        assert_eq!(diagram.edges[0].label.as_deref(), Some("owns"));
    }

    #[test]
    fn include_and_extend_relations() {
        let diagram = parse(
            "actor User\nUser -> (Checkout)\n(Checkout) -> (Pay) : <<include>>\n(Coupon) .> (Checkout) : extends",
        )
        .unwrap();
        assert_eq!(count(&diagram, NodeKind::UseCase), 3);
        assert_eq!(diagram.edges[1].kind, Some(EdgeKind::Includes));
        assert_eq!(diagram.edges[2].kind, Some(EdgeKind::Extends));
    }

    #[test]
    fn standalone_use_case_and_junk() {
        let diagram = parse("(Browse)\n???").unwrap();
        assert_eq!(count(&diagram, NodeKind::UseCase), 1);
        assert_eq!(diagram.metadata.skipped_lines, vec![2]);
    }
}
