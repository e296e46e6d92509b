mod class;
mod flow;
mod mindmap;
mod sequence;
mod usecase;

use crate::error::ParseError;
use crate::ids::{IdSource, SequentialIds};
use crate::ir::{Diagram, DiagramKind};
use once_cell::sync::Lazy;
use regex::Regex;

static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^title\s*:?\s+(.+)$").unwrap());
/// A header is the bare keyword, optionally followed by a direction token.
static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(classdiagram|sequencediagram|flowchart|flow|usecasediagram|usecase|mindmap)(?:\s+(?:td|tb|bt|lr|rl))?$",
    )
    .unwrap()
});

/// Parse `input` as a diagram of `kind` with deterministic sequential ids.
pub fn parse(kind: DiagramKind, input: &str) -> Result<Diagram, ParseError> {
    parse_with_ids(kind, input, &mut SequentialIds::new())
}

/// Parse `input` as a diagram of `kind`, drawing node and edge ids from `ids`.
///
/// Malformed lines are skipped and recorded in the diagram metadata; an
/// error is returned only when nothing usable was extracted.
pub fn parse_with_ids(
    kind: DiagramKind,
    input: &str,
    ids: &mut dyn IdSource,
) -> Result<Diagram, ParseError> {
    let diagram = match kind {
        DiagramKind::Class => class::parse_class_diagram(input, ids),
        DiagramKind::Sequence => sequence::parse_sequence_diagram(input, ids),
        DiagramKind::Flow => flow::parse_flow_diagram(input, ids),
        DiagramKind::Generic => flow::parse_generic_diagram(input, ids),
        DiagramKind::UseCase => usecase::parse_usecase_diagram(input, ids),
        DiagramKind::Mindmap => mindmap::parse_mindmap_diagram(input, ids),
    }?;
    tracing::debug!(
        kind = %diagram.kind,
        nodes = diagram.nodes.len(),
        edges = diagram.edges.len(),
        skipped = diagram.metadata.skipped_lines.len(),
        "parsed diagram"
    );
    Ok(diagram)
}

/// Guess the diagram language from a header line, falling back to a few
/// unambiguous leading keywords.
pub fn detect_diagram_kind(input: &str) -> Option<DiagramKind> {
    let first = input
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !is_comment(line))?;
    if let Some(kind) = header_kind(first) {
        return Some(kind);
    }
    let lower = first.to_ascii_lowercase();
    if lower.starts_with("class ") {
        return Some(DiagramKind::Class);
    }
    if lower.starts_with("participant ") {
        return Some(DiagramKind::Sequence);
    }
    if lower.starts_with("actor ") || (first.contains('(') && first.contains("->")) {
        return Some(DiagramKind::UseCase);
    }
    None
}

fn header_kind(line: &str) -> Option<DiagramKind> {
    let caps = HEADER_RE.captures(line)?;
    match caps.get(1)?.as_str().to_ascii_lowercase().as_str() {
        "classdiagram" => Some(DiagramKind::Class),
        "sequencediagram" => Some(DiagramKind::Sequence),
        "flowchart" | "flow" => Some(DiagramKind::Flow),
        "usecasediagram" | "usecase" => Some(DiagramKind::UseCase),
        "mindmap" => Some(DiagramKind::Mindmap),
        _ => None,
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with("%%") || line.starts_with("//")
}

/// One meaningful input line.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SourceLine<'a> {
    /// 1-based position in the original input.
    pub number: usize,
    /// Leading whitespace width, tabs counted as two spaces.
    pub indent: usize,
    pub text: &'a str,
}

/// Split `input` into trimmed lines, dropping blanks, comments and a leading
/// header line. `extra_comment` adds a language-specific comment prefix.
pub(crate) fn source_lines<'a>(input: &'a str, extra_comment: Option<&str>) -> Vec<SourceLine<'a>> {
    let mut lines = Vec::new();
    let mut seen_content = false;
    for (idx, raw) in input.lines().enumerate() {
        let text = raw.trim();
        if text.is_empty() || is_comment(text) {
            continue;
        }
        if extra_comment.is_some_and(|prefix| text.starts_with(prefix)) {
            continue;
        }
        if !seen_content {
            seen_content = true;
            if header_kind(text).is_some() {
                continue;
            }
        }
        lines.push(SourceLine {
            number: idx + 1,
            indent: indent_width(raw),
            text,
        });
    }
    lines
}

fn indent_width(raw: &str) -> usize {
    raw.chars()
        .take_while(|ch| ch.is_whitespace())
        .map(|ch| if ch == '\t' { 2 } else { 1 })
        .sum()
}

pub(crate) fn title_of(line: &str) -> Option<String> {
    TITLE_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Width heuristic shared by the parsers: eight pixels per character plus
/// `pad`, clamped to `[min, max]`.
pub(crate) fn label_width(chars: usize, pad: f32, min: f32, max: f32) -> f32 {
    (chars as f32 * 8.0 + pad).clamp(min, max)
}

pub(crate) fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text)
}

pub(crate) fn finish(diagram: Diagram, line_count: usize) -> Result<Diagram, ParseError> {
    if line_count == 0 {
        return Err(ParseError::EmptyInput);
    }
    if diagram.nodes.is_empty() {
        return Err(ParseError::NoNodes { kind: diagram.kind });
    }
    Ok(diagram)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_header_and_keywords() {
        assert_eq!(detect_diagram_kind("mindmap\n  Root"), Some(DiagramKind::Mindmap));
        assert_eq!(
            detect_diagram_kind("%% note\nclassDiagram\nclass A {}"),
            Some(DiagramKind::Class)
        );
        assert_eq!(detect_diagram_kind("class A {}"), Some(DiagramKind::Class));
        assert_eq!(
            detect_diagram_kind("Shopper -> (Checkout)"),
            Some(DiagramKind::UseCase)
        );
        assert_eq!(detect_diagram_kind("a -> b"), None);
        assert_eq!(detect_diagram_kind("   \n"), None);
    }

    #[test]
    fn source_lines_skip_header_comments_and_blanks() {
        let lines = source_lines("flowchart\n\n// c\n  a -> b\n%% d\n\tc", None);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 4);
        assert_eq!(lines[0].indent, 2);
        assert_eq!(lines[0].text, "a -> b");
        assert_eq!(lines[1].indent, 2);
    }

    #[test]
    fn only_bare_keywords_count_as_headers() {
        let lines = source_lines("flowchart LR\nstart -> work", None);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "start -> work");

        let mindmap = parse(DiagramKind::Mindmap, "Mindmap ideas\n  Alpha\n  Beta").unwrap();
        let labels: Vec<&str> = mindmap.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["Mindmap ideas", "Alpha", "Beta"]);
        assert_eq!(mindmap.edges.len(), 2);

        let flow = parse(DiagramKind::Flow, "flowchart start -> work\nwork -> end").unwrap();
        let labels: Vec<&str> = flow.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["flowchart start", "work", "end"]);
        assert_eq!(flow.edges.len(), 2);
        assert_eq!(detect_diagram_kind("flowchart start -> work"), None);
    }

    #[test]
    fn blank_input_is_an_error_for_every_language() {
        for kind in [
            DiagramKind::Class,
            DiagramKind::Sequence,
            DiagramKind::Flow,
            DiagramKind::UseCase,
            DiagramKind::Mindmap,
        ] {
            assert_eq!(parse(kind, "  \n %% only a comment\n"), Err(ParseError::EmptyInput));
        }
    }

    #[test]
    fn parsing_is_idempotent() {
        let input = "start -> check decision\ncheck decision -> work : yes\nwork -> end";
        let first = parse(DiagramKind::Flow, input).unwrap();
        let second = parse(DiagramKind::Flow, input).unwrap();
        assert_eq!(first.nodes.len(), second.nodes.len());
        assert_eq!(first.edges.len(), second.edges.len());
        for (a, b) in first.nodes.iter().zip(&second.nodes) {
            assert_eq!(a.label, b.label);
            assert_eq!(a.kind, b.kind);
        }
        for (a, b) in first.edges.iter().zip(&second.edges) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.label, b.label);
        }
    }

    #[test]
    fn injected_ids_are_used() {
        let diagram =
            parse_with_ids(DiagramKind::Flow, "a -> b", &mut crate::ids::RandomIds).unwrap();
        assert!(diagram.nodes[0].id.starts_with("node-"));
        assert_ne!(diagram.nodes[0].id, "node-1");
    }
}
