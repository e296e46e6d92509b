use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    Class,
    Sequence,
    Flow,
    UseCase,
    Mindmap,
    Generic,
}

impl DiagramKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "class" | "classdiagram" => Some(Self::Class),
            "sequence" | "sequencediagram" => Some(Self::Sequence),
            "flow" | "flowchart" => Some(Self::Flow),
            "usecase" | "usecasediagram" | "use-case" => Some(Self::UseCase),
            "mindmap" | "mind-map" => Some(Self::Mindmap),
            "generic" | "graph" => Some(Self::Generic),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Sequence => "sequence",
            Self::Flow => "flow",
            Self::UseCase => "usecase",
            Self::Mindmap => "mindmap",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of node tags. The tag decides shape, sizing and which layout
/// heuristics apply to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Class,
    Actor,
    Start,
    End,
    Process,
    Decision,
    Input,
    Output,
    UseCase,
    Root,
    Branch,
    Leaf,
    Generic,
}

impl NodeKind {
    /// Mind-map shapes store their center in `x`/`y` rather than the top-left corner.
    pub fn is_centered(self) -> bool {
        matches!(self, Self::Root | Self::Branch | Self::Leaf)
    }

    /// Kinds that seed the layering BFS regardless of in-degree.
    pub fn is_root_like(self) -> bool {
        matches!(self, Self::Start | Self::Root | Self::Actor)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::End | Self::Leaf)
    }

    pub fn is_flow_shape(self) -> bool {
        matches!(
            self,
            Self::Start | Self::End | Self::Process | Self::Decision | Self::Input | Self::Output
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Association,
    Inheritance,
    Sync,
    Async,
    Flow,
    Extends,
    Includes,
    Branch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Protected,
}

impl Visibility {
    pub fn from_prefix(prefix: Option<&str>) -> Self {
        match prefix {
            Some("-") => Self::Private,
            Some("#") => Self::Protected,
            _ => Self::Public,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Public => '+',
            Self::Private => '-',
            Self::Protected => '#',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub visibility: Visibility,
}

impl ClassAttribute {
    pub fn display(&self) -> String {
        format!("{}{}: {}", self.visibility.symbol(), self.name, self.ty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMethod {
    pub name: String,
    pub return_type: String,
    pub parameters: Vec<String>,
    pub visibility: Visibility,
}

impl ClassMethod {
    pub fn display(&self) -> String {
        format!(
            "{}{}({}): {}",
            self.visibility.symbol(),
            self.name,
            self.parameters.join(", "),
            self.return_type
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeData {
    Class {
        attributes: Vec<ClassAttribute>,
        methods: Vec<ClassMethod>,
    },
    Mindmap {
        level: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EdgeData {
    /// Sequence messages keep their source position so vertical placement
    /// survives reordering of the edge list.
    Message { order: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Strict interior overlap; rectangles that only touch do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn expand(&self, pad: f32) -> Rect {
        Rect::new(
            self.x - pad,
            self.y - pad,
            self.width + pad * 2.0,
            self.height + pad * 2.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<NodeData>,
}

impl Node {
    pub fn new(id: String, kind: NodeKind, label: impl Into<String>, size: (f32, f32)) -> Self {
        Self {
            id,
            kind,
            x: 0.0,
            y: 0.0,
            width: size.0,
            height: size.1,
            label: label.into(),
            data: None,
        }
    }

    /// Top-left anchored bounds, re-derived for centered shapes.
    pub fn bounds(&self) -> Rect {
        if self.kind.is_centered() {
            Rect::new(
                self.x - self.width / 2.0,
                self.y - self.height / 2.0,
                self.width,
                self.height,
            )
        } else {
            Rect::new(self.x, self.y, self.width, self.height)
        }
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Place the node so its bounds start at `(left, top)`, honouring the
    /// centered-coordinate convention.
    pub fn place_top_left(&mut self, left: f32, top: f32) {
        if self.kind.is_centered() {
            self.x = left + self.width / 2.0;
            self.y = top + self.height / 2.0;
        } else {
            self.x = left;
            self.y = top;
        }
    }

    pub fn place_center(&mut self, cx: f32, cy: f32) {
        self.place_top_left(cx - self.width / 2.0, cy - self.height / 2.0);
    }

    pub fn level(&self) -> Option<usize> {
        match self.data {
            Some(NodeData::Mindmap { level }) => Some(level),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EdgeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<EdgeData>,
}

impl Edge {
    pub fn new(id: String, from: &str, to: &str, kind: Option<EdgeKind>) -> Self {
        Self {
            id,
            from: from.to_string(),
            to: to.to_string(),
            label: None,
            kind,
            data: None,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn order(&self) -> Option<usize> {
        match self.data {
            Some(EdgeData::Message { order }) => Some(order),
            None => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// 1-based line numbers that could not be parsed.
    pub skipped_lines: Vec<usize>,
    /// Names referenced but never declared (e.g. an `extends` target).
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub kind: DiagramKind,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub metadata: Metadata,
}

impl Diagram {
    pub fn new(kind: DiagramKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
            edges: Vec::new(),
            metadata: Metadata::default(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Edges whose endpoints both exist. Anything else is dropped here so every
    /// geometry stage sees the same filtered view.
    pub fn connected_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(|edge| self.node(&edge.from).is_some() && self.node(&edge.to).is_some())
    }

    /// Union of all node bounds, or `None` for an empty diagram.
    pub fn bounds(&self) -> Option<Rect> {
        bounds_of(self.nodes.iter())
    }
}

pub fn bounds_of<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Option<Rect> {
    nodes
        .into_iter()
        .map(Node::bounds)
        .reduce(|acc, rect| acc.union(&rect))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_nodes_derive_bounds_from_center() {
        let mut node = Node::new("n".into(), NodeKind::Root, "Root", (100.0, 40.0));
        node.x = 200.0;
        node.y = 100.0;
        let rect = node.bounds();
        assert_eq!(rect, Rect::new(150.0, 80.0, 100.0, 40.0));
        node.place_top_left(0.0, 0.0);
        assert_eq!((node.x, node.y), (50.0, 20.0));
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(9.0, 9.0, 5.0, 5.0)));
    }

    #[test]
    fn connected_edges_skip_dangling_references() {
        let mut diagram = Diagram::new(DiagramKind::Generic);
        diagram
            .nodes
            .push(Node::new("a".into(), NodeKind::Generic, "A", (10.0, 10.0)));
        diagram.edges.push(Edge::new("e1".into(), "a", "missing", None));
        diagram.edges.push(Edge::new("e2".into(), "a", "a", None));
        let ids: Vec<&str> = diagram.connected_edges().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2"]);
    }
}
