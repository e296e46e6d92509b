use crate::config::LayoutConfig;
use crate::ir::Diagram;

use super::normalize_layout;

const ACTOR_GAP: f32 = 50.0;

/// Vertical position of the message with the given source order, measured in
/// the same frame as the laid-out actors.
pub fn message_y(config: &LayoutConfig, order: usize) -> f32 {
    config.padding + config.sequence.header_height + order as f32 * config.sequence.pixels_per_message
}

/// Actors go left to right in first-appearance order; messages carry no
/// geometry of their own beyond [`message_y`].
pub(super) fn compute_sequence_layout(diagram: &mut Diagram, config: &LayoutConfig) {
    let spacing = config.sequence.actor_spacing;
    let mut cursor = 0.0f32;
    for node in &mut diagram.nodes {
        node.place_top_left(cursor, 0.0);
        cursor += spacing.max(node.width + ACTOR_GAP);
    }
    normalize_layout(&mut diagram.nodes, config.padding);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DiagramKind;
    use crate::parser::parse;

    #[test]
    fn actors_share_one_row_in_appearance_order() {
        let mut diagram = parse(
            DiagramKind::Sequence,
            "Client -> Server: request\nServer -> Database: query\nDatabase --> Server: rows",
        )
        .unwrap();
        compute_sequence_layout(&mut diagram, &LayoutConfig::default());
        let labels: Vec<&str> = diagram.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["Client", "Server", "Database"]);
        assert!(diagram.nodes.iter().all(|n| n.y == 40.0));
        assert!(diagram.nodes.windows(2).all(|w| w[1].x - w[0].x >= 160.0));
    }

    #[test]
    fn wide_actors_get_more_room() {
        let mut diagram = parse(
            DiagramKind::Sequence,
            "participant AnExtremelyLongParticipantName\nAnExtremelyLongParticipantName -> B: hi",
        )
        .unwrap();
        compute_sequence_layout(&mut diagram, &LayoutConfig::default());
        let first = diagram.nodes[0].bounds();
        assert!(!first.intersects(&diagram.nodes[1].bounds()));
        assert_eq!(diagram.nodes[1].x - first.x, first.width + 50.0);
    }

    #[test]
    fn messages_step_down_by_order() {
        let config = LayoutConfig::default();
        assert_eq!(message_y(&config, 0), 40.0 + 80.0);
        assert_eq!(message_y(&config, 3) - message_y(&config, 2), 50.0);
    }
}
