use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchicalConfig {
    pub horizontal_spacing: f32,
    pub vertical_spacing: f32,
    /// Gap added to a node's width when deriving its horizontal advance.
    pub node_margin: f32,
    /// Gap added to the tallest node of a layer when deriving the layer advance.
    pub layer_margin: f32,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: 180.0,
            vertical_spacing: 120.0,
            node_margin: 50.0,
            layer_margin: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    pub node_separation: f32,
    pub rank_separation: f32,
    /// Left bound for node x; terminal circles get clipped below it.
    pub min_x: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            node_separation: 60.0,
            rank_separation: 80.0,
            min_x: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindmapConfig {
    /// Vertical space granted to one leaf.
    pub unit_height: f32,
    /// Horizontal distance between the centers of consecutive depths.
    pub horizontal_step: f32,
}

impl Default for MindmapConfig {
    fn default() -> Self {
        Self {
            unit_height: 56.0,
            horizontal_step: 200.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    pub actor_spacing: f32,
    pub header_height: f32,
    pub pixels_per_message: f32,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            actor_spacing: 160.0,
            header_height: 80.0,
            pixels_per_message: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseCaseConfig {
    pub column_gap: f32,
    pub row_gap: f32,
}

impl Default for UseCaseConfig {
    fn default() -> Self {
        Self {
            column_gap: 200.0,
            row_gap: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub parallel_spacing: f32,
    pub curve_cap: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            parallel_spacing: 16.0,
            curve_cap: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub padding: f32,
    pub hierarchical: HierarchicalConfig,
    pub flow: FlowConfig,
    pub mindmap: MindmapConfig,
    pub sequence: SequenceConfig,
    pub usecase: UseCaseConfig,
    pub routing: RoutingConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: 40.0,
            hierarchical: HierarchicalConfig::default(),
            flow: FlowConfig::default(),
            mindmap: MindmapConfig::default(),
            sequence: SequenceConfig::default(),
            usecase: UseCaseConfig::default(),
            routing: RoutingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BreakStrategy {
    #[default]
    Layers,
    Clusters,
    Grid,
}

impl BreakStrategy {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "layers" | "layer" => Some(Self::Layers),
            "clusters" | "cluster" => Some(Self::Clusters),
            "grid" => Some(Self::Grid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub max_width: f32,
    pub max_height: f32,
    /// Extra room tolerated on each page before a unit is pushed to the next one.
    pub overlap_margin: f32,
    pub padding: f32,
    pub strategy: BreakStrategy,
    pub pixels_per_message: f32,
    /// Nodes whose tops lie within this distance share a band.
    pub band_tolerance: f32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_width: 1200.0,
            max_height: 900.0,
            overlap_margin: 0.0,
            padding: 40.0,
            strategy: BreakStrategy::Layers,
            pixels_per_message: 50.0,
            band_tolerance: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct HierarchicalConfigFile {
    horizontal_spacing: Option<f32>,
    vertical_spacing: Option<f32>,
    node_margin: Option<f32>,
    layer_margin: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FlowConfigFile {
    node_separation: Option<f32>,
    rank_separation: Option<f32>,
    min_x: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MindmapConfigFile {
    unit_height: Option<f32>,
    horizontal_step: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SequenceConfigFile {
    actor_spacing: Option<f32>,
    header_height: Option<f32>,
    pixels_per_message: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UseCaseConfigFile {
    column_gap: Option<f32>,
    row_gap: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RoutingConfigFile {
    parallel_spacing: Option<f32>,
    curve_cap: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PaginationConfigFile {
    max_width: Option<f32>,
    max_height: Option<f32>,
    overlap_margin: Option<f32>,
    padding: Option<f32>,
    strategy: Option<BreakStrategy>,
    pixels_per_message: Option<f32>,
    band_tolerance: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    padding: Option<f32>,
    hierarchical: Option<HierarchicalConfigFile>,
    flow: Option<FlowConfigFile>,
    mindmap: Option<MindmapConfigFile>,
    sequence: Option<SequenceConfigFile>,
    #[serde(alias = "useCase")]
    usecase: Option<UseCaseConfigFile>,
    routing: Option<RoutingConfigFile>,
    pagination: Option<PaginationConfigFile>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse a config document (JSON, or JSON5 as a fallback) and merge it over
/// the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents).map_err(|json5_err| {
            anyhow::anyhow!("invalid config: {json_err} (json5: {json5_err})")
        })?,
    };
    let mut config = Config::default();
    apply_config_file(&mut config, parsed);
    Ok(config)
}

fn apply_config_file(config: &mut Config, file: ConfigFile) {
    // Page framing for sequence diagrams follows the layout's message rows
    // unless pagination sets its own.
    let message_rows = file
        .pagination
        .as_ref()
        .and_then(|page| page.pixels_per_message)
        .or_else(|| file.sequence.as_ref().and_then(|seq| seq.pixels_per_message));
    let layout = &mut config.layout;
    set(&mut layout.padding, file.padding);
    if let Some(h) = file.hierarchical {
        set(&mut layout.hierarchical.horizontal_spacing, h.horizontal_spacing);
        set(&mut layout.hierarchical.vertical_spacing, h.vertical_spacing);
        set(&mut layout.hierarchical.node_margin, h.node_margin);
        set(&mut layout.hierarchical.layer_margin, h.layer_margin);
    }
    if let Some(flow) = file.flow {
        set(&mut layout.flow.node_separation, flow.node_separation);
        set(&mut layout.flow.rank_separation, flow.rank_separation);
        set(&mut layout.flow.min_x, flow.min_x);
    }
    if let Some(mindmap) = file.mindmap {
        set(&mut layout.mindmap.unit_height, mindmap.unit_height);
        set(&mut layout.mindmap.horizontal_step, mindmap.horizontal_step);
    }
    if let Some(seq) = file.sequence {
        set(&mut layout.sequence.actor_spacing, seq.actor_spacing);
        set(&mut layout.sequence.header_height, seq.header_height);
        set(&mut layout.sequence.pixels_per_message, seq.pixels_per_message);
    }
    if let Some(usecase) = file.usecase {
        set(&mut layout.usecase.column_gap, usecase.column_gap);
        set(&mut layout.usecase.row_gap, usecase.row_gap);
    }
    if let Some(routing) = file.routing {
        set(&mut layout.routing.parallel_spacing, routing.parallel_spacing);
        set(&mut layout.routing.curve_cap, routing.curve_cap);
    }
    if let Some(page) = file.pagination {
        let pagination = &mut config.pagination;
        set(&mut pagination.max_width, page.max_width);
        set(&mut pagination.max_height, page.max_height);
        set(&mut pagination.overlap_margin, page.overlap_margin);
        set(&mut pagination.padding, page.padding);
        set(&mut pagination.strategy, page.strategy);
        set(&mut pagination.band_tolerance, page.band_tolerance);
    }
    set(&mut config.pagination.pixels_per_message, message_rows);
}
