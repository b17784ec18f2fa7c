use std::sync::Arc;

use crate::fsa::{AutomatonStore, StateId, ValueDecoder};
use crate::matching::Match;

/// Depth-first walk over every stored key in byte-lexicographic order.
pub struct Entries {
    store: Arc<AutomatonStore>,
    decoder: Arc<dyn ValueDecoder>,
    /// (state, index of the next transition to follow)
    stack: Vec<(StateId, u32)>,
    key: Vec<u8>,
    /// Value of the state just entered, emitted before descending further.
    pending: Option<u32>,
}

impl Entries {
    pub(crate) fn new(store: Arc<AutomatonStore>, decoder: Arc<dyn ValueDecoder>) -> Self {
        let start = store.state(store.start());
        Self {
            pending: start.value_id(),
            stack: vec![(start.id, 0)],
            key: Vec::new(),
            store,
            decoder,
        }
    }

    fn emit(&self, value_id: u32) -> Match {
        let (score, raw) = self.store.value(value_id);
        let key = String::from_utf8(self.key.clone())
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
        let end = key.len();
        Match::new(key, 0, end, score, self.decoder.decode(raw))
    }
}

impl Iterator for Entries {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        loop {
            if let Some(value_id) = self.pending.take() {
                return Some(self.emit(value_id));
            }
            let (state_id, index) = *self.stack.last()?;
            let state = self.store.state(state_id);
            if index < state.transition_count() {
                if let Some(top) = self.stack.last_mut() {
                    top.1 += 1;
                }
                let (label, target) = self.store.transition(&state, index);
                self.key.push(label);
                self.stack.push((target, 0));
                self.pending = self.store.state(target).value_id();
            } else {
                self.stack.pop();
                if !self.stack.is_empty() {
                    self.key.pop();
                }
            }
        }
    }
}
