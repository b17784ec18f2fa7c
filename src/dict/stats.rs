use serde::Serialize;

use crate::fsa::{AutomatonStore, ValueKind};

/// Diagnostic summary of a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DictStats {
    pub version: u8,
    pub value_kind: ValueKind,
    pub key_count: u64,
    pub state_count: u32,
    pub transition_count: u32,
    pub final_state_count: u32,
    pub value_count: u32,
    /// Length in bytes of the longest key.
    pub max_key_len: u32,
    /// Best score in the dictionary, `None` when it is empty.
    pub max_score: Option<f64>,
    pub byte_len: usize,
    pub backing: &'static str,
}

impl DictStats {
    pub(crate) fn collect(store: &AutomatonStore) -> Self {
        let count = store.state_count();
        // Longest accepting suffix per state. Targets precede their source,
        // so an ascending pass sees children first.
        let mut depth: Vec<Option<u32>> = Vec::with_capacity(count as usize);
        let mut final_state_count = 0u32;
        for id in 0..count {
            let s = store.state(id);
            let mut best = s.is_final().then_some(0u32);
            if s.is_final() {
                final_state_count += 1;
            }
            for (_, target) in store.transitions(&s) {
                if let Some(d) = depth[target as usize] {
                    best = Some(best.map_or(d + 1, |b| b.max(d + 1)));
                }
            }
            depth.push(best);
        }

        let start = store.state(store.start());
        let header = store.header();
        Self {
            version: header.version,
            value_kind: header.value_kind,
            key_count: header.key_count,
            state_count: header.state_count,
            transition_count: header.transition_count,
            final_state_count,
            value_count: header.value_count,
            max_key_len: depth[store.start() as usize].unwrap_or(0),
            max_score: start.weight().is_finite().then_some(start.weight()),
            byte_len: store.byte_len(),
            backing: store.backing_kind(),
        }
    }

    pub fn to_json(&self) -> String {
        // Every field is a plain scalar or string, so serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
