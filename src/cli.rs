use crate::config::{BreakStrategy, Config, load_config};
use crate::ir::DiagramKind;
use crate::layout::{compute_layout, default_path_style, route_edges};
use crate::layout_dump::{LayoutDump, PaginationDump, write_layout_dump};
use crate::paginate::paginate;
use crate::parser::{detect_diagram_kind, parse};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "diagrammer",
    version,
    about = "Lay out class, sequence, flow, use-case and mind-map text as positioned JSON"
)]
pub struct Args {
    /// Input file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output JSON file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Diagram type. Detected from the input when omitted.
    #[arg(short = 't', long = "type", value_parser = parse_kind)]
    pub diagram_type: Option<DiagramKind>,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Split the result into pages
    #[arg(long = "paginate")]
    pub paginate: bool,

    /// Page break strategy for flow diagrams
    #[arg(long = "strategy", value_parser = parse_strategy)]
    pub strategy: Option<BreakStrategy>,

    /// Maximum page width
    #[arg(long = "max-width")]
    pub max_width: Option<f32>,

    /// Maximum page height
    #[arg(long = "max-height")]
    pub max_height: Option<f32>,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

fn parse_kind(value: &str) -> std::result::Result<DiagramKind, String> {
    DiagramKind::from_token(value).ok_or_else(|| format!("unknown diagram type '{value}'"))
}

fn parse_strategy(value: &str) -> std::result::Result<BreakStrategy, String> {
    BreakStrategy::from_token(value).ok_or_else(|| format!("unknown page break strategy '{value}'"))
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn init_logging(verbose: u8) {
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(log_level(verbose))
        .try_init();
}

pub fn run() -> Result<()> {
    run_with(Args::parse())
}

pub fn run_with(args: Args) -> Result<()> {
    init_logging(args.verbose);
    let config = apply_overrides(load_config(args.config.as_deref())?, &args);

    let input = read_input(args.input.as_deref())?;
    let kind = resolve_kind(args.diagram_type, &input);
    tracing::info!(%kind, bytes = input.len(), "parsing input");

    let diagram = parse(kind, &input).with_context(|| format!("failed to parse {kind} diagram"))?;
    if !diagram.metadata.skipped_lines.is_empty() {
        tracing::warn!(lines = ?diagram.metadata.skipped_lines, "skipped unparsable lines");
    }
    let laid_out = compute_layout(&diagram, &config.layout);
    let routes = route_edges(&laid_out, &config.layout, default_path_style(kind));

    if args.paginate {
        let pages = paginate(&laid_out, &config.pagination);
        tracing::info!(pages = pages.len(), "paginated");
        let dump = PaginationDump::from_pages(&laid_out, &pages, &routes);
        write_layout_dump(args.output.as_deref(), &dump)?;
    } else {
        let dump = LayoutDump::from_diagram(&laid_out, &routes, config.layout.padding);
        write_layout_dump(args.output.as_deref(), &dump)?;
    }
    Ok(())
}

fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(strategy) = args.strategy {
        config.pagination.strategy = strategy;
    }
    if let Some(width) = args.max_width {
        config.pagination.max_width = width;
    }
    if let Some(height) = args.max_height {
        config.pagination.max_height = height;
    }
    config
}

/// Explicit type first, then whatever the input announces, then flow.
fn resolve_kind(explicit: Option<DiagramKind>, input: &str) -> DiagramKind {
    explicit
        .or_else(|| detect_diagram_kind(input))
        .unwrap_or(DiagramKind::Flow)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "diagrammer",
            "-i",
            "in.txt",
            "-t",
            "mindmap",
            "--paginate",
            "--strategy",
            "grid",
            "--max-height",
            "600",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.diagram_type, Some(DiagramKind::Mindmap));
        assert_eq!(args.strategy, Some(BreakStrategy::Grid));
        assert!(args.paginate);
        assert_eq!(args.verbose, 2);
        assert_eq!(log_level(args.verbose), Level::DEBUG);

        let config = apply_overrides(Config::default(), &args);
        assert_eq!(config.pagination.strategy, BreakStrategy::Grid);
        assert_eq!(config.pagination.max_height, 600.0);
        assert_eq!(config.pagination.max_width, 1200.0);
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(Args::try_parse_from(["diagrammer", "-t", "gantt"]).is_err());
    }

    #[test]
    fn resolves_kind_from_flag_then_content() {
        assert_eq!(
            resolve_kind(Some(DiagramKind::Class), "sequenceDiagram\nA -> B: x"),
            DiagramKind::Class
        );
        assert_eq!(
            resolve_kind(None, "sequenceDiagram\nA -> B: x"),
            DiagramKind::Sequence
        );
        assert_eq!(resolve_kind(None, "a -> b"), DiagramKind::Flow);
    }

    #[test]
    fn writes_a_layout_file() {
        let dir = std::env::temp_dir();
        let input = dir.join(format!("diagrammer-cli-{}.txt", std::process::id()));
        let output = dir.join(format!("diagrammer-cli-{}.json", std::process::id()));
        std::fs::write(&input, "mindmap\nRoot\n  A\n  B\n").unwrap();
        let args = Args::try_parse_from([
            "diagrammer",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();
        run_with(args).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();
        assert_eq!(json["kind"], "mindmap");
        assert_eq!(json["nodes"].as_array().map(Vec::len), Some(3));
    }
}
