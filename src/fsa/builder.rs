//! Offline construction of [`AutomatonStore`]s.
//!
//! Keys must arrive in strictly ascending byte order. The builder keeps the
//! path of the previous key open; when a new key diverges, the part of the old
//! path below the common prefix is frozen bottom-up and each frozen state is
//! replaced by an equivalent, already registered state when one exists. The
//! result is the minimal acyclic automaton for the (key, value, weight) set.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use super::value::ValueKind;
use super::{AutomatonStore, Header, StateId, HEADER_SIZE, NO_VALUE, VERSION};
use crate::dict::DictError;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("key {key:?} is not greater than the previous key {previous:?}")]
    OutOfOrder { previous: String, key: String },

    #[error("duplicate key {0:?}")]
    DuplicateKey(String),

    #[error("score for key {key:?} must be finite, got {score}")]
    InvalidScore { key: String, score: f64 },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("{0} exceeds the store format limit")]
    TooLarge(&'static str),
}

/// A state on the open path of the previous key.
struct PendingState {
    /// Label of the transition leading into this state.
    label: u8,
    transitions: Vec<(u8, StateId)>,
    value_id: u32,
    score: f64,
}

impl PendingState {
    fn new(label: u8) -> Self {
        Self {
            label,
            transitions: Vec::new(),
            value_id: NO_VALUE,
            score: f64::NEG_INFINITY,
        }
    }
}

/// Equivalence key of a frozen state. Two states with the same signature
/// accept the same suffixes with the same values and weights.
#[derive(Hash, PartialEq, Eq)]
struct Signature {
    value_id: u32,
    weight_bits: u64,
    transitions: Vec<(u8, StateId)>,
}

struct FrozenState {
    trans_start: u32,
    trans_len: u32,
    value_id: u32,
    weight: f64,
}

pub struct AutomatonBuilder {
    kind: ValueKind,
    dedup_values: bool,

    states: Vec<FrozenState>,
    transitions: Vec<(u8, StateId)>,
    registry: HashMap<Signature, StateId>,

    slots: Vec<(f64, u32, u32)>,
    value_data: Vec<u8>,
    value_ids: HashMap<(u64, Vec<u8>), u32>,

    /// `pending[0]` is the root; `pending[i]` is reached by `last_key[..i]`.
    pending: Vec<PendingState>,
    last_key: Option<Vec<u8>>,
    key_count: u64,
}

impl AutomatonBuilder {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            dedup_values: crate::settings::settings().build.dedup_values,
            states: Vec::new(),
            transitions: Vec::new(),
            registry: HashMap::new(),
            slots: Vec::new(),
            value_data: Vec::new(),
            value_ids: HashMap::new(),
            pending: vec![PendingState::new(0)],
            last_key: None,
            key_count: 0,
        }
    }

    /// Share value slots between keys with identical `(score, payload)`.
    pub fn dedup_values(mut self, enabled: bool) -> Self {
        self.dedup_values = enabled;
        self
    }

    pub fn value_kind(&self) -> ValueKind {
        self.kind
    }

    /// Number of keys inserted so far.
    pub fn len(&self) -> u64 {
        self.key_count
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Insert a key. Keys must be inserted in strictly ascending order.
    pub fn insert(&mut self, key: &str, score: f64, payload: &[u8]) -> Result<(), BuildError> {
        let bytes = key.as_bytes();
        if !score.is_finite() {
            return Err(BuildError::InvalidScore {
                key: key.to_string(),
                score,
            });
        }
        // Fold -0.0 into 0.0 so equal scores tie in ranking.
        let score = score + 0.0;

        let prefix_len = match &self.last_key {
            Some(prev) => {
                match prev.as_slice().cmp(bytes) {
                    std::cmp::Ordering::Less => {}
                    std::cmp::Ordering::Equal => {
                        return Err(BuildError::DuplicateKey(key.to_string()))
                    }
                    std::cmp::Ordering::Greater => {
                        return Err(BuildError::OutOfOrder {
                            previous: String::from_utf8_lossy(prev).into_owned(),
                            key: key.to_string(),
                        })
                    }
                }
                prev.iter().zip(bytes).take_while(|(a, b)| a == b).count()
            }
            None => 0,
        };

        let value_id = self.intern_value(score, payload)?;

        self.freeze_down_to(prefix_len)?;
        for &b in &bytes[prefix_len..] {
            self.pending.push(PendingState::new(b));
        }
        // A new key is never a prefix of the previous one, so the last pending
        // state is fresh (or the root, for the empty key).
        let last = self
            .pending
            .last_mut()
            .ok_or(BuildError::TooLarge("pending path"))?;
        last.value_id = value_id;
        last.score = score;

        self.last_key = Some(bytes.to_vec());
        self.key_count += 1;
        Ok(())
    }

    fn intern_value(&mut self, score: f64, payload: &[u8]) -> Result<u32, BuildError> {
        let payload = if self.kind == ValueKind::KeyOnly {
            &[][..]
        } else {
            payload
        };
        if self.dedup_values {
            if let Some(&id) = self.value_ids.get(&(score.to_bits(), payload.to_vec())) {
                return Ok(id);
            }
        }

        let id: u32 = self
            .slots
            .len()
            .try_into()
            .map_err(|_| BuildError::TooLarge("value count"))?;
        if id == NO_VALUE {
            return Err(BuildError::TooLarge("value count"));
        }
        let offset: u32 = self
            .value_data
            .len()
            .try_into()
            .map_err(|_| BuildError::TooLarge("value data"))?;
        let len: u32 = payload
            .len()
            .try_into()
            .map_err(|_| BuildError::TooLarge("value payload"))?;
        self.value_data.extend_from_slice(payload);
        self.slots.push((score, offset, len));
        if self.dedup_values {
            self.value_ids.insert((score.to_bits(), payload.to_vec()), id);
        }
        Ok(id)
    }

    /// Freeze pending states until only `depth + 1` remain open.
    fn freeze_down_to(&mut self, depth: usize) -> Result<(), BuildError> {
        while self.pending.len() > depth + 1 {
            let Some(state) = self.pending.pop() else {
                break;
            };
            let label = state.label;
            let id = self.freeze(state)?;
            if let Some(parent) = self.pending.last_mut() {
                parent.transitions.push((label, id));
            }
        }
        Ok(())
    }

    fn freeze(&mut self, state: PendingState) -> Result<StateId, BuildError> {
        let weight = state
            .transitions
            .iter()
            .map(|&(_, t)| self.states[t as usize].weight)
            .fold(state.score, f64::max);

        let signature = Signature {
            value_id: state.value_id,
            weight_bits: weight.to_bits(),
            transitions: state.transitions,
        };
        if let Some(&id) = self.registry.get(&signature) {
            return Ok(id);
        }

        let id: StateId = self
            .states
            .len()
            .try_into()
            .map_err(|_| BuildError::TooLarge("state count"))?;
        let trans_start: u32 = self
            .transitions
            .len()
            .try_into()
            .map_err(|_| BuildError::TooLarge("transition count"))?;
        self.transitions.extend_from_slice(&signature.transitions);
        self.states.push(FrozenState {
            trans_start,
            trans_len: signature.transitions.len() as u32,
            value_id: signature.value_id,
            weight,
        });
        self.registry.insert(signature, id);
        Ok(id)
    }

    /// Close the automaton and serialize it.
    pub fn into_bytes(mut self) -> Result<Vec<u8>, BuildError> {
        self.freeze_down_to(0)?;
        let root = self
            .pending
            .pop()
            .ok_or(BuildError::TooLarge("pending path"))?;
        let start = self.freeze(root)?;

        let transition_count: u32 = self
            .transitions
            .len()
            .try_into()
            .map_err(|_| BuildError::TooLarge("transition count"))?;
        let value_data_len: u32 = self
            .value_data
            .len()
            .try_into()
            .map_err(|_| BuildError::TooLarge("value data"))?;

        let body_len = self.states.len() * super::STATE_SIZE
            + self.transitions.len() * super::TRANSITION_SIZE
            + self.slots.len() * super::VALUE_SLOT_SIZE
            + self.value_data.len();
        let mut body = Vec::with_capacity(body_len);
        for s in &self.states {
            body.extend_from_slice(&s.trans_start.to_le_bytes());
            body.extend_from_slice(&s.trans_len.to_le_bytes());
            body.extend_from_slice(&s.value_id.to_le_bytes());
            body.extend_from_slice(&s.weight.to_bits().to_le_bytes());
        }
        for &(label, target) in &self.transitions {
            body.push(label);
            body.extend_from_slice(&target.to_le_bytes());
        }
        for &(score, offset, len) in &self.slots {
            body.extend_from_slice(&score.to_bits().to_le_bytes());
            body.extend_from_slice(&offset.to_le_bytes());
            body.extend_from_slice(&len.to_le_bytes());
        }
        body.extend_from_slice(&self.value_data);

        let header = Header {
            version: VERSION,
            value_kind: self.kind,
            key_count: self.key_count,
            state_count: self.states.len() as u32,
            transition_count,
            start_state: start,
            value_count: self.slots.len() as u32,
            value_data_len,
            checksum: crc32fast::hash(&body),
        };

        let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
        header.write(&mut buf);
        buf.extend_from_slice(&body);

        debug!(
            keys = self.key_count,
            states = self.states.len(),
            transitions = self.transitions.len(),
            values = self.slots.len(),
            bytes = buf.len(),
            "automaton built"
        );
        Ok(buf)
    }

    /// Close the automaton and load it as an in-memory store.
    pub fn into_store(self) -> Result<AutomatonStore, DictError> {
        AutomatonStore::from_bytes(self.into_bytes()?)
    }

    /// Close the automaton and write it to `path`.
    pub fn save(self, path: &Path) -> Result<(), DictError> {
        Ok(fs::write(path, self.into_bytes()?)?)
    }
}

/// Build a store from unsorted entries. When a key appears more than once,
/// the last occurrence wins.
pub fn build_from_entries<K, V>(
    kind: ValueKind,
    entries: impl IntoIterator<Item = (K, f64, V)>,
) -> Result<AutomatonBuilder, BuildError>
where
    K: AsRef<str>,
    V: AsRef<[u8]>,
{
    let mut entries: Vec<(K, f64, V)> = entries.into_iter().collect();
    // Stable sort keeps insertion order among equal keys.
    entries.sort_by(|a, b| a.0.as_ref().as_bytes().cmp(b.0.as_ref().as_bytes()));

    let mut builder = AutomatonBuilder::new(kind);
    let mut iter = entries.iter().peekable();
    while let Some((key, score, value)) = iter.next() {
        if iter
            .peek()
            .is_some_and(|(next, _, _)| next.as_ref() == key.as_ref())
        {
            continue;
        }
        builder.insert(key.as_ref(), *score, value.as_ref())?;
    }
    Ok(builder)
}
