use super::{SourceLine, finish, source_lines, title_of};
use crate::error::ParseError;
use crate::ids::IdSource;
use crate::ir::{
    ClassAttribute, ClassMethod, Diagram, DiagramKind, Edge, EdgeKind, Node, NodeData, NodeKind,
    Visibility,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

const TITLE_BAND: f32 = 30.0;
const MEMBER_ROW: f32 = 18.0;
const SEPARATOR_BAND: f32 = 15.0;
const BODY_PADDING: f32 = 30.0;
const MIN_HEIGHT: f32 = 80.0;
const MIN_WIDTH: f32 = 200.0;
const MAX_WIDTH: f32 = 400.0;

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^class\s+([A-Za-z_][\w.]*)(?:\s+extends\s+([A-Za-z_][\w.]*))?\s*(\{.*)?$").unwrap()
});
static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+\-#~])?\s*([A-Za-z_]\w*)\s*\(([^)]*)\)\s*(?::\s*(.+))?$").unwrap()
});
static ATTRIBUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+\-#~])?\s*([A-Za-z_]\w*)\s*:\s*(.+)$").unwrap());
static RELATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][\w.]*)\s*(-->|--\|>)\s*([A-Za-z_][\w.]*)\s*(?::\s*(.+))?$").unwrap()
});

#[derive(Debug, Default)]
struct ClassDecl {
    name: String,
    parent: Option<String>,
    attributes: Vec<ClassAttribute>,
    methods: Vec<ClassMethod>,
}

struct Relation {
    from: String,
    to: String,
    kind: EdgeKind,
    label: Option<String>,
}

enum Member {
    Attribute(ClassAttribute),
    Method(ClassMethod),
}

#[derive(Default)]
struct ClassCollector {
    classes: Vec<ClassDecl>,
    index: HashMap<String, usize>,
    relations: Vec<Relation>,
}

impl ClassCollector {
    fn declare(&mut self, name: &str) -> usize {
        if let Some(idx) = self.index.get(name) {
            return *idx;
        }
        let idx = self.classes.len();
        self.classes.push(ClassDecl {
            name: name.to_string(),
            ..ClassDecl::default()
        });
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Returns false when any `;`-separated member fails to parse.
    fn add_members(&mut self, idx: usize, body: &str) -> bool {
        let mut ok = true;
        for raw in body.split(';') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match parse_member(raw) {
                Some(Member::Attribute(attr)) => self.classes[idx].attributes.push(attr),
                Some(Member::Method(method)) => self.classes[idx].methods.push(method),
                None => ok = false,
            }
        }
        ok
    }
}

fn parse_member(text: &str) -> Option<Member> {
    if let Some(caps) = METHOD_RE.captures(text) {
        let parameters = caps
            .get(3)
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        return Some(Member::Method(ClassMethod {
            visibility: Visibility::from_prefix(caps.get(1).map(|m| m.as_str())),
            name: caps[2].to_string(),
            parameters,
            return_type: caps
                .get(4)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_else(|| "void".to_string()),
        }));
    }
    let caps = ATTRIBUTE_RE.captures(text)?;
    Some(Member::Attribute(ClassAttribute {
        visibility: Visibility::from_prefix(caps.get(1).map(|m| m.as_str())),
        name: caps[2].to_string(),
        ty: caps[3].trim().to_string(),
    }))
}

/// Size of a class box from its compartments.
pub(crate) fn class_node_size(
    name: &str,
    attributes: &[ClassAttribute],
    methods: &[ClassMethod],
) -> (f32, f32) {
    let separator = if !attributes.is_empty() && !methods.is_empty() {
        SEPARATOR_BAND
    } else {
        0.0
    };
    let height = TITLE_BAND
        + attributes.len() as f32 * MEMBER_ROW
        + separator
        + methods.len() as f32 * MEMBER_ROW
        + BODY_PADDING;
    let longest = attributes
        .iter()
        .map(|a| a.display().chars().count())
        .chain(methods.iter().map(|m| m.display().chars().count()))
        .chain(std::iter::once(name.chars().count()))
        .max()
        .unwrap_or(0);
    (
        super::label_width(longest, 40.0, MIN_WIDTH, MAX_WIDTH),
        height.max(MIN_HEIGHT),
    )
}

pub(super) fn parse_class_diagram(
    input: &str,
    ids: &mut dyn IdSource,
) -> Result<Diagram, ParseError> {
    let lines = source_lines(input, None);
    let mut diagram = Diagram::new(DiagramKind::Class);
    let mut collector = ClassCollector::default();
    // Class whose body is currently open, or declared and waiting for `{`.
    let mut open: Option<usize> = None;
    let mut awaiting_brace: Option<usize> = None;

    for SourceLine { number, text, .. } in lines.iter().copied() {
        if let Some(idx) = open {
            let (body, closes) = match text.find('}') {
                Some(pos) => (&text[..pos], true),
                None => (text, false),
            };
            if !collector.add_members(idx, body) {
                tracing::debug!(line = number, "skipping malformed class member");
                diagram.metadata.skipped_lines.push(number);
            }
            if closes {
                open = None;
            }
            continue;
        }
        if let Some(idx) = awaiting_brace.take()
            && let Some(rest) = text.strip_prefix('{')
        {
            open_body(&mut collector, idx, rest, &mut open, number, &mut diagram);
            continue;
        }
        if let Some(caps) = CLASS_RE.captures(text) {
            let idx = collector.declare(&caps[1]);
            if let Some(parent) = caps.get(2) {
                collector.classes[idx].parent = Some(parent.as_str().to_string());
            }
            match caps.get(3) {
                Some(body) => open_body(
                    &mut collector,
                    idx,
                    &body.as_str()[1..],
                    &mut open,
                    number,
                    &mut diagram,
                ),
                None => awaiting_brace = Some(idx),
            }
            continue;
        }
        if let Some(caps) = RELATION_RE.captures(text) {
            let kind = if &caps[2] == "--|>" {
                EdgeKind::Inheritance
            } else {
                EdgeKind::Association
            };
            collector.relations.push(Relation {
                from: caps[1].to_string(),
                to: caps[3].to_string(),
                kind,
                label: caps.get(4).map(|m| m.as_str().trim().to_string()),
            });
            continue;
        }
        if let Some(title) = title_of(text) {
            diagram.metadata.title = Some(title);
            continue;
        }
        tracing::debug!(line = number, text, "skipping unrecognised class line");
        diagram.metadata.skipped_lines.push(number);
    }

    build_diagram(&mut diagram, collector, ids);
    finish(diagram, lines.len())
}

fn open_body(
    collector: &mut ClassCollector,
    idx: usize,
    rest: &str,
    open: &mut Option<usize>,
    number: usize,
    diagram: &mut Diagram,
) {
    let (body, closes) = match rest.find('}') {
        Some(pos) => (&rest[..pos], true),
        None => (rest, false),
    };
    if !collector.add_members(idx, body) {
        diagram.metadata.skipped_lines.push(number);
    }
    if !closes {
        *open = Some(idx);
    }
}

/// Second pass: every class is known, so inheritance and association
/// targets can be resolved regardless of declaration order.
fn build_diagram(diagram: &mut Diagram, collector: ClassCollector, ids: &mut dyn IdSource) {
    let mut node_ids: HashMap<String, String> = HashMap::new();
    let mut pending = Vec::new();
    for class in collector.classes {
        let id = ids.next_id("node");
        let size = class_node_size(&class.name, &class.attributes, &class.methods);
        let mut node = Node::new(id.clone(), NodeKind::Class, class.name.clone(), size);
        node.data = Some(NodeData::Class {
            attributes: class.attributes,
            methods: class.methods,
        });
        diagram.nodes.push(node);
        node_ids.insert(class.name.clone(), id);
        if let Some(parent) = class.parent {
            pending.push(Relation {
                from: class.name,
                to: parent,
                kind: EdgeKind::Inheritance,
                label: None,
            });
        }
    }
    pending.extend(collector.relations);

    for relation in pending {
        let (Some(from), Some(to)) = (node_ids.get(&relation.from), node_ids.get(&relation.to))
        else {
            let missing = if node_ids.contains_key(&relation.from) {
                relation.to
            } else {
                relation.from
            };
            tracing::debug!(class = %missing, "dropping relation to undeclared class");
            if !diagram.metadata.unresolved.contains(&missing) {
                diagram.metadata.unresolved.push(missing);
            }
            continue;
        };
        let edge = Edge::new(ids.next_id("edge"), from, to, Some(relation.kind))
            .with_label(relation.label);
        diagram.edges.push(edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    fn parse(input: &str) -> Result<Diagram, ParseError> {
        parse_class_diagram(input, &mut SequentialIds::new())
    }

    #[test]
    fn resolves_inheritance_after_all_classes_are_known() {
        let diagram = parse("class A{}\nclass B extends A{}").unwrap();
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.edges.len(), 1);
        let edge = &diagram.edges[0];
        assert_eq!(edge.kind, Some(EdgeKind::Inheritance));
        assert_eq!(diagram.node(&edge.from).unwrap().label, "B");
        assert_eq!(diagram.node(&edge.to).unwrap().label, "A");
    }

    #[test]
    fn parent_declared_after_child() {
        let diagram = parse("class Dog extends Animal {\n}\nclass Animal {\n}").unwrap();
        assert_eq!(diagram.edges.len(), 1);
        let edge = &diagram.edges[0];
        assert_eq!(diagram.node(&edge.from).unwrap().label, "Dog");
        assert_eq!(diagram.node(&edge.to).unwrap().label, "Animal");
        assert!(diagram.metadata.unresolved.is_empty());
    }

    #[test]
    fn undeclared_parent_is_recorded_not_linked() {
        let diagram = parse("class Dog extends Animal {}").unwrap();
        assert_eq!(diagram.nodes.len(), 1);
        assert!(diagram.edges.is_empty());
        assert_eq!(diagram.metadata.unresolved, vec!["Animal".to_string()]);
    }

    #[test]
    fn parses_members_and_visibility() {
        let input = "class Account {\n  +id: u64\n  -balance: f64\n  #deposit(amount: f64, note: String): bool\n  close()\n}";
        let diagram = parse(input).unwrap();
        let Some(NodeData::Class {
            attributes,
            methods,
        }) = &diagram.nodes[0].data
        else {
            panic!("missing class data");
        };
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].visibility, Visibility::Public);
        assert_eq!(attributes[1].visibility, Visibility::Private);
        assert_eq!(attributes[1].ty, "f64");
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].visibility, Visibility::Protected);
        assert_eq!(methods[0].parameters, vec!["amount: f64", "note: String"]);
        assert_eq!(methods[0].return_type, "bool");
        assert_eq!(methods[1].return_type, "void");
    }

    #[test]
    fn height_follows_compartments() {
        let diagram = parse("class A {\n+a: i32\n+b: i32\n+c(): i32\n}\nclass B {}").unwrap();
        // 30 + 2*18 + 15 + 1*18 + 30
        assert_eq!(diagram.nodes[0].height, 129.0);
        assert_eq!(diagram.nodes[1].height, 80.0);
        assert_eq!(diagram.nodes[1].width, 200.0);
    }

    #[test]
    fn width_is_clamped() {
        let long = "x".repeat(80);
        let diagram = parse(&format!("class A {{ +{long}: String }}")).unwrap();
        assert_eq!(diagram.nodes[0].width, 400.0);
    }

    #[test]
    fn malformed_members_are_skipped() {
        let diagram = parse("class A {\n+ok: i32\n???\n}\ngarbage line").unwrap();
        assert_eq!(diagram.metadata.skipped_lines, vec![3, 5]);
        let Some(NodeData::Class { attributes, .. }) = &diagram.nodes[0].data else {
            panic!("missing class data");
        };
        assert_eq!(attributes.len(), 1);
    }

    #[test]
    fn brace_on_next_line_and_repeated_declarations_merge() {
        let diagram = parse("class A\n{\n+x: i32\n}\nclass A { +y(): i32 }").unwrap();
        assert_eq!(diagram.nodes.len(), 1);
        let Some(NodeData::Class {
            attributes,
            methods,
        }) = &diagram.nodes[0].data
        else {
            panic!("missing class data");
        };
        assert_eq!(attributes.len(), 1);
        assert_eq!(methods.len(), 1);
    }

    #[test]
    fn association_arrows() {
        let diagram = parse("class A {}\nclass B {}\nA --> B : owns\nB --|> A").unwrap();
        assert_eq!(diagram.edges.len(), 2);
        assert_eq!(diagram.edges[0].kind, Some(EdgeKind::Association));
        assert_eq!(diagram.edges[0].label.as_deref(), Some("owns"));
        assert_eq!(diagram.edges[1].kind, Some(EdgeKind::Inheritance));
    }

    #[test]
    fn no_classes_is_an_error() {
        assert_eq!(
            parse("just words"),
            Err(ParseError::NoNodes {
                kind: DiagramKind::Class
            })
        );
    }
}
