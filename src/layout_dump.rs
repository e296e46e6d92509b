use crate::ir::{Diagram, Edge, Node, Rect};
use crate::layout::EdgeRoute;
use crate::paginate::Page;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub skipped_lines: Vec<usize>,
    pub unresolved: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub kind: String,
    pub label: String,
    /// Top-left corner, whatever convention the node itself stores.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub center: [f32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,
    pub points: Vec<[f32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<[f32; 2]>,
}

#[derive(Debug, Serialize)]
pub struct PageDump {
    pub page_number: usize,
    pub total_pages: usize,
    pub title: String,
    pub view_box: [f32; 4],
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub external_edges: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PaginationDump {
    pub kind: String,
    pub pages: Vec<PageDump>,
}

fn node_dump(node: &Node) -> NodeDump {
    let rect = node.bounds();
    let center = rect.center();
    NodeDump {
        id: node.id.clone(),
        kind: format!("{:?}", node.kind).to_lowercase(),
        label: node.label.clone(),
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        center: [center.x, center.y],
        level: node.level(),
    }
}

fn edge_dump(edge: &Edge, routes: &HashMap<&str, &EdgeRoute>) -> EdgeDump {
    let route = routes.get(edge.id.as_str());
    EdgeDump {
        id: edge.id.clone(),
        from: edge.from.clone(),
        to: edge.to.clone(),
        kind: edge.kind.map(|kind| format!("{kind:?}").to_lowercase()),
        label: edge.label.clone(),
        order: edge.order(),
        points: route
            .map(|route| route.points.iter().map(|p| [p.x, p.y]).collect())
            .unwrap_or_default(),
        control: route
            .and_then(|route| route.curve)
            .map(|curve| [curve.control.x, curve.control.y]),
    }
}

fn route_map(routes: &[EdgeRoute]) -> HashMap<&str, &EdgeRoute> {
    routes
        .iter()
        .map(|route| (route.edge_id.as_str(), route))
        .collect()
}

fn rect_array(rect: &Rect) -> [f32; 4] {
    [rect.x, rect.y, rect.width, rect.height]
}

impl LayoutDump {
    /// Snapshot of a laid-out diagram. Width and height cover the content plus
    /// `padding` on the far sides.
    pub fn from_diagram(diagram: &Diagram, routes: &[EdgeRoute], padding: f32) -> Self {
        let routes = route_map(routes);
        let (width, height) = diagram
            .bounds()
            .map(|rect| (rect.right() + padding, rect.bottom() + padding))
            .unwrap_or((0.0, 0.0));
        LayoutDump {
            kind: diagram.kind.to_string(),
            title: diagram.metadata.title.clone(),
            width,
            height,
            nodes: diagram.nodes.iter().map(node_dump).collect(),
            edges: diagram
                .connected_edges()
                .map(|edge| edge_dump(edge, &routes))
                .collect(),
            skipped_lines: diagram.metadata.skipped_lines.clone(),
            unresolved: diagram.metadata.unresolved.clone(),
        }
    }
}

impl PaginationDump {
    pub fn from_pages(diagram: &Diagram, pages: &[Page], routes: &[EdgeRoute]) -> Self {
        let routes = route_map(routes);
        let pages = pages
            .iter()
            .map(|page| PageDump {
                page_number: page.page_number,
                total_pages: page.total_pages,
                title: page.title.clone(),
                view_box: rect_array(&page.view_box),
                nodes: page.nodes.iter().map(node_dump).collect(),
                edges: page
                    .edges
                    .iter()
                    .map(|edge| edge_dump(edge, &routes))
                    .collect(),
                external_edges: page.external_edges.clone(),
            })
            .collect();
        PaginationDump {
            kind: diagram.kind.to_string(),
            pages,
        }
    }
}

/// Pretty JSON to `path`, or to stdout when no path is given.
pub fn write_layout_dump(path: Option<&Path>, value: &impl Serialize) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}
