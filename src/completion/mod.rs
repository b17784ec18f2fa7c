//! Ranked prefix completion.
//!
//! Completion is a best-first expansion of the automaton below the state
//! reached by the prefix. Each state's weight is the best score reachable
//! through it, so a frontier ordered by weight pops accepting states in
//! score order and never has to look at subtrees whose bound is below the
//! results already produced. Equal scores are ordered by shorter key, then
//! by byte order of the key.

mod fuzzy;
mod iter;

pub use iter::MatchIterator;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use tracing::debug_span;

use crate::dict::Dictionary;
use crate::fsa::{AutomatonStore, StateId, ValueDecoder};
use crate::matching::Match;

/// Completions of `prefix`, best score first.
pub fn complete(dict: &Dictionary, prefix: &str) -> MatchIterator {
    let _span = debug_span!("complete", prefix).entered();
    let store = dict.store();
    let Some(state) = store.walk(prefix.as_bytes()) else {
        return MatchIterator::empty();
    };

    let mut frontier = Frontier::new(store.clone(), dict.decoder().clone());
    frontier.seed(state.id, prefix.as_bytes().to_vec());
    MatchIterator::new(frontier)
}

/// Completions of every key prefix within `max_edits` (Levenshtein, counted in
/// characters) of `query`, best score first. The first `exact_prefix`
/// characters of `query` must match exactly.
pub fn fuzzy_complete(
    dict: &Dictionary,
    query: &str,
    max_edits: u32,
    exact_prefix: usize,
) -> MatchIterator {
    let _span = debug_span!("fuzzy_complete", query, max_edits, exact_prefix).entered();
    let store = dict.store();
    let anchors = fuzzy::anchors(store, query, max_edits, exact_prefix);
    if anchors.is_empty() {
        return MatchIterator::empty();
    }

    let mut frontier = Frontier::new(store.clone(), dict.decoder().clone());
    for (state, path) in anchors {
        frontier.seed(state, path);
    }
    MatchIterator::new(frontier)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Visit a state: queue its own value and its children.
    Expand(StateId),
    /// Produce the Match for an accepting state.
    Emit(u32),
}

/// A frontier entry: a path from the start state and what to do with it.
///
/// Entries compare by weight (higher first), then path length (shorter
/// first), then path bytes (smaller first). A descendant never compares
/// ahead of its ancestor, so popping the heap yields Matches in order.
#[derive(Debug)]
struct Candidate {
    weight: f64,
    path: Vec<u8>,
    step: Step,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // +0.0 folds -0.0 into 0.0; stores from other writers may carry it.
        (self.weight + 0.0)
            .total_cmp(&(other.weight + 0.0))
            .then_with(|| other.path.len().cmp(&self.path.len()))
            .then_with(|| other.path.cmp(&self.path))
            .then_with(|| match (self.step, other.step) {
                (Step::Expand(_), Step::Emit(_)) => Ordering::Greater,
                (Step::Emit(_), Step::Expand(_)) => Ordering::Less,
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Best-first search state behind a [`MatchIterator`].
pub(crate) struct Frontier {
    store: Arc<AutomatonStore>,
    decoder: Arc<dyn ValueDecoder>,
    heap: BinaryHeap<Candidate>,
}

impl Frontier {
    fn new(store: Arc<AutomatonStore>, decoder: Arc<dyn ValueDecoder>) -> Self {
        Self {
            store,
            decoder,
            heap: BinaryHeap::new(),
        }
    }

    fn seed(&mut self, state: StateId, path: Vec<u8>) {
        let weight = self.store.state(state).weight();
        // States with no reachable key carry -inf and contribute nothing.
        if weight == f64::NEG_INFINITY {
            return;
        }
        self.heap.push(Candidate {
            weight,
            path,
            step: Step::Expand(state),
        });
    }

    /// Expand until the next accepting state surfaces.
    pub(crate) fn next_match(&mut self) -> Option<Match> {
        while let Some(candidate) = self.heap.pop() {
            match candidate.step {
                Step::Emit(value_id) => return Some(self.emit(candidate.path, value_id)),
                Step::Expand(id) => self.expand(id, candidate.path),
            }
        }
        None
    }

    fn expand(&mut self, id: StateId, path: Vec<u8>) {
        let state = self.store.state(id);
        for (label, target) in self.store.transitions(&state) {
            let mut child = Vec::with_capacity(path.len() + 1);
            child.extend_from_slice(&path);
            child.push(label);
            self.heap.push(Candidate {
                weight: self.store.state(target).weight(),
                path: child,
                step: Step::Expand(target),
            });
        }
        if let Some(value_id) = state.value_id() {
            let (score, _) = self.store.value(value_id);
            self.heap.push(Candidate {
                weight: score,
                path,
                step: Step::Emit(value_id),
            });
        }
    }

    fn emit(&self, path: Vec<u8>, value_id: u32) -> Match {
        let (score, raw) = self.store.value(value_id);
        let key = String::from_utf8(path)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
        let end = key.len();
        Match::new(key, 0, end, score, self.decoder.decode(raw))
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}
