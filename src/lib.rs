#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ids;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod paginate;
pub mod parser;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, PaginationConfig, load_config};
pub use error::ParseError;
pub use ids::{IdSource, RandomIds, SequentialIds};
pub use ir::{Diagram, DiagramKind, Edge, EdgeKind, Node, NodeKind};
pub use layout::{compute_layout, route_edges};
pub use paginate::{Page, paginate};
pub use parser::{detect_diagram_kind, parse, parse_with_ids};
