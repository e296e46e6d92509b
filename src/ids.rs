//! Id generation injected into each parse call.
//!
//! Ids are only unique within one diagram; callers must not expect the same
//! text to produce the same ids across parses unless they pass a fresh
//! [`SequentialIds`].

use std::collections::HashMap;

pub trait IdSource {
    fn next_id(&mut self, prefix: &str) -> String;
}

/// Deterministic `prefix-N` ids, counted per prefix.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    counters: HashMap<String, usize>,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        format!("{prefix}-{counter}")
    }
}

/// Random v4 UUID ids, for callers that merge diagrams from several parses.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self, prefix: &str) -> String {
        format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_count_per_prefix() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.next_id("node"), "node-1");
        assert_eq!(ids.next_id("node"), "node-2");
        assert_eq!(ids.next_id("edge"), "edge-1");
    }

    #[test]
    fn random_ids_are_distinct() {
        let mut ids = RandomIds;
        assert_ne!(ids.next_id("node"), ids.next_id("node"));
    }
}
