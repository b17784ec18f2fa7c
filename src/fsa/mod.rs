//! Immutable weighted automaton store.
//!
//! The store is an acyclic, minimized automaton over key bytes. Every state
//! carries a weight equal to the best score of any key reachable through it,
//! and accepting states point into a value table of `(score, payload)` slots.
//! The serialized form is read in place, either from a read-only memory map
//! or from an owned buffer produced by [`AutomatonBuilder`].
//!
//! Layout (little-endian):
//!
//! | offset | field              |
//! |--------|--------------------|
//! | 0      | magic `LXFA`       |
//! | 4      | version (u8)       |
//! | 5      | value kind (u8)    |
//! | 6      | reserved (2)       |
//! | 8      | key count (u64)    |
//! | 16     | state count (u32)  |
//! | 20     | transition count   |
//! | 24     | start state        |
//! | 28     | value count        |
//! | 32     | value data length  |
//! | 36     | CRC32 of the body  |
//!
//! followed by the state table, transition table, value slots and value data.

pub mod builder;
#[cfg(test)]
mod tests;
pub mod value;

pub use builder::{AutomatonBuilder, BuildError};
pub use value::{ValueDecoder, ValueKind};

use std::fs::File;
use std::io;
use std::ops::Range;
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, debug_span, warn};

use crate::dict::DictError;

pub(crate) const MAGIC: &[u8; 4] = b"LXFA";
pub(crate) const VERSION: u8 = 1;
pub(crate) const HEADER_SIZE: usize = 40;
/// trans_start u32 + trans_len u32 + value_id u32 + weight f64
pub(crate) const STATE_SIZE: usize = 20;
/// label u8 + target u32
pub(crate) const TRANSITION_SIZE: usize = 5;
/// score f64 + offset u32 + len u32
pub(crate) const VALUE_SLOT_SIZE: usize = 16;
/// `value_id` of a non-accepting state.
pub(crate) const NO_VALUE: u32 = u32::MAX;

pub type StateId = u32;

#[inline]
pub(crate) fn le_u32(data: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(b)
}

#[inline]
pub(crate) fn le_u64(data: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(b)
}

#[inline]
pub(crate) fn le_f64(data: &[u8], at: usize) -> f64 {
    f64::from_bits(le_u64(data, at))
}

/// Fixed-size file header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {
    pub version: u8,
    pub value_kind: ValueKind,
    pub key_count: u64,
    pub state_count: u32,
    pub transition_count: u32,
    pub start_state: StateId,
    pub value_count: u32,
    pub value_data_len: u32,
    pub checksum: u32,
}

impl Header {
    pub fn parse(data: &[u8]) -> Result<Self, DictError> {
        if data.len() < 5 {
            return Err(DictError::InvalidHeader);
        }
        if &data[..4] != MAGIC {
            return Err(DictError::InvalidMagic);
        }
        if data[4] != VERSION {
            return Err(DictError::UnsupportedVersion(data[4]));
        }
        if data.len() < HEADER_SIZE {
            return Err(DictError::InvalidHeader);
        }
        let value_kind = ValueKind::from_u8(data[5])
            .ok_or_else(|| DictError::Corrupt(format!("unknown value kind tag {}", data[5])))?;

        Ok(Self {
            version: data[4],
            value_kind,
            key_count: le_u64(data, 8),
            state_count: le_u32(data, 16),
            transition_count: le_u32(data, 20),
            start_state: le_u32(data, 24),
            value_count: le_u32(data, 28),
            value_data_len: le_u32(data, 32),
            checksum: le_u32(data, 36),
        })
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(MAGIC);
        buf.push(self.version);
        buf.push(self.value_kind as u8);
        buf.extend_from_slice(&[0u8; 2]); // reserved
        buf.extend_from_slice(&self.key_count.to_le_bytes());
        buf.extend_from_slice(&self.state_count.to_le_bytes());
        buf.extend_from_slice(&self.transition_count.to_le_bytes());
        buf.extend_from_slice(&self.start_state.to_le_bytes());
        buf.extend_from_slice(&self.value_count.to_le_bytes());
        buf.extend_from_slice(&self.value_data_len.to_le_bytes());
        buf.extend_from_slice(&self.checksum.to_le_bytes());
    }

    /// Byte ranges of the four body sections, or `None` on arithmetic overflow.
    fn sections(&self) -> Option<Sections> {
        let states_len = (self.state_count as usize).checked_mul(STATE_SIZE)?;
        let trans_len = (self.transition_count as usize).checked_mul(TRANSITION_SIZE)?;
        let slots_len = (self.value_count as usize).checked_mul(VALUE_SLOT_SIZE)?;

        let states = HEADER_SIZE..HEADER_SIZE.checked_add(states_len)?;
        let transitions = states.end..states.end.checked_add(trans_len)?;
        let slots = transitions.end..transitions.end.checked_add(slots_len)?;
        let data = slots.end..slots.end.checked_add(self.value_data_len as usize)?;
        Some(Sections {
            states,
            transitions,
            slots,
            data,
        })
    }
}

#[derive(Debug, Clone)]
struct Sections {
    states: Range<usize>,
    transitions: Range<usize>,
    slots: Range<usize>,
    data: Range<usize>,
}

enum Backing {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Backing {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Mmap(m) => &m[..],
            Backing::Owned(v) => v.as_slice(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Backing::Mmap(_) => "mmap",
            Backing::Owned(_) => "owned",
        }
    }
}

/// One decoded state record.
#[derive(Debug, Clone, Copy)]
pub struct State {
    pub id: StateId,
    trans_start: u32,
    trans_len: u32,
    value_id: u32,
    weight: f64,
}

impl State {
    #[inline]
    pub fn is_final(&self) -> bool {
        self.value_id != NO_VALUE
    }

    /// Value slot of an accepting state.
    #[inline]
    pub fn value_id(&self) -> Option<u32> {
        self.is_final().then_some(self.value_id)
    }

    /// Best score of any key reachable from this state, `-inf` if none.
    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[inline]
    pub fn transition_count(&self) -> u32 {
        self.trans_len
    }
}

/// Read-only view over a serialized automaton.
///
/// All accessors assume the invariants checked by [`AutomatonStore::validate`]
/// hold; a store that failed validation is never handed out.
pub struct AutomatonStore {
    header: Header,
    sections: Sections,
    backing: Backing,
}

impl AutomatonStore {
    /// Map the file at `path` read-only and validate it.
    pub fn open(path: &Path) -> Result<Self, DictError> {
        let _span = debug_span!("store_open", path = %path.display()).entered();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DictError::NotFound(path.to_path_buf()),
            _ => DictError::Io(e),
        })?;
        if file.metadata()?.len() == 0 {
            return Err(DictError::InvalidHeader);
        }
        // SAFETY: The file is opened read-only and the mapping is immutable.
        // The store never hands out the mapping mutably, and it is dropped
        // together with the store.
        let mmap = unsafe { Mmap::map(&file)? };
        let verify = crate::settings::settings().open.verify_checksum;
        Self::from_backing(Backing::Mmap(mmap), verify)
    }

    /// Validate and take ownership of an in-memory serialized store.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, DictError> {
        Self::from_backing(Backing::Owned(data), true)
    }

    fn from_backing(backing: Backing, verify_checksum: bool) -> Result<Self, DictError> {
        let data = backing.bytes();
        let header = Header::parse(data)?;
        let sections = header
            .sections()
            .ok_or_else(|| DictError::Corrupt("section sizes overflow".to_string()))?;

        if data.len() < sections.data.end {
            return Err(DictError::Truncated {
                expected: sections.data.end,
                actual: data.len(),
            });
        }
        if data.len() > sections.data.end {
            return Err(DictError::Corrupt(format!(
                "{} trailing bytes after value data",
                data.len() - sections.data.end
            )));
        }
        if verify_checksum {
            let actual = crc32fast::hash(&data[HEADER_SIZE..]);
            if actual != header.checksum {
                warn!(expected = header.checksum, actual, "store checksum mismatch");
                return Err(DictError::ChecksumMismatch {
                    expected: header.checksum,
                    actual,
                });
            }
        }

        let store = Self {
            header,
            sections,
            backing,
        };
        store.validate()?;
        debug!(
            keys = header.key_count,
            states = header.state_count,
            transitions = header.transition_count,
            backing = store.backing.kind(),
            "store loaded"
        );
        Ok(store)
    }

    /// Structural validation: bounds, ordering, acyclicity, weights and the
    /// key count. Runs in one pass over the state table.
    fn validate(&self) -> Result<(), DictError> {
        let h = &self.header;
        if h.state_count == 0 {
            return Err(DictError::Corrupt("empty state table".to_string()));
        }
        if h.start_state >= h.state_count {
            return Err(DictError::Corrupt(format!(
                "start state {} out of range",
                h.start_state
            )));
        }

        for slot in 0..h.value_count {
            let (score, range) = self.slot(slot);
            if !score.is_finite() {
                return Err(DictError::Corrupt(format!("value {slot} has non-finite score")));
            }
            if range.end > h.value_data_len as usize {
                return Err(DictError::Corrupt(format!("value {slot} out of bounds")));
            }
        }

        // Targets always precede their source, so one ascending pass sees every
        // child before its parent.
        let mut paths: Vec<u64> = Vec::with_capacity(h.state_count as usize);
        for id in 0..h.state_count {
            let s = self.state(id);
            let end = u64::from(s.trans_start) + u64::from(s.trans_len);
            if end > u64::from(h.transition_count) {
                return Err(DictError::Corrupt(format!(
                    "state {id} transitions out of bounds"
                )));
            }

            let mut expected_weight = f64::NEG_INFINITY;
            let mut count = 0u64;
            if let Some(v) = s.value_id() {
                if v >= h.value_count {
                    return Err(DictError::Corrupt(format!("state {id} value {v} out of range")));
                }
                expected_weight = self.slot(v).0;
                count = 1;
            }

            let mut prev_label: Option<u8> = None;
            for i in 0..s.trans_len {
                let (label, target) = self.transition(&s, i);
                if target >= id {
                    return Err(DictError::Corrupt(format!(
                        "state {id} has a forward or cyclic transition to {target}"
                    )));
                }
                if prev_label.is_some_and(|p| p >= label) {
                    return Err(DictError::Corrupt(format!(
                        "state {id} transitions are not sorted"
                    )));
                }
                prev_label = Some(label);
                expected_weight = expected_weight.max(self.state(target).weight);
                count = count.saturating_add(paths[target as usize]);
            }

            if s.weight.to_bits() != expected_weight.to_bits() {
                return Err(DictError::Corrupt(format!("state {id} has an inconsistent weight")));
            }
            paths.push(count);
        }

        let accepting = paths[h.start_state as usize];
        if accepting != h.key_count {
            return Err(DictError::Corrupt(format!(
                "header claims {} keys but the automaton accepts {accepting}",
                h.key_count
            )));
        }
        Ok(())
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        self.backing.bytes()
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn value_kind(&self) -> ValueKind {
        self.header.value_kind
    }

    pub fn key_count(&self) -> u64 {
        self.header.key_count
    }

    pub fn state_count(&self) -> u32 {
        self.header.state_count
    }

    pub fn transition_count(&self) -> u32 {
        self.header.transition_count
    }

    pub fn value_count(&self) -> u32 {
        self.header.value_count
    }

    /// Total size of the serialized store in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.backing, Backing::Mmap(_))
    }

    pub(crate) fn backing_kind(&self) -> &'static str {
        self.backing.kind()
    }

    pub fn start(&self) -> StateId {
        self.header.start_state
    }

    #[inline]
    pub fn state(&self, id: StateId) -> State {
        let at = self.sections.states.start + id as usize * STATE_SIZE;
        let data = self.bytes();
        State {
            id,
            trans_start: le_u32(data, at),
            trans_len: le_u32(data, at + 4),
            value_id: le_u32(data, at + 8),
            weight: le_f64(data, at + 12),
        }
    }

    /// The `index`-th outgoing transition of `state` as `(label, target)`.
    #[inline]
    pub fn transition(&self, state: &State, index: u32) -> (u8, StateId) {
        let at = self.sections.transitions.start
            + (state.trans_start + index) as usize * TRANSITION_SIZE;
        let data = self.bytes();
        (data[at], le_u32(data, at + 1))
    }

    /// Outgoing transitions of `state` in ascending label order.
    pub fn transitions<'a>(&'a self, state: &State) -> impl Iterator<Item = (u8, StateId)> + 'a {
        let state = *state;
        (0..state.trans_len).map(move |i| self.transition(&state, i))
    }

    /// Follow the transition labeled `label`, if any.
    pub fn next(&self, state: &State, label: u8) -> Option<StateId> {
        let (mut lo, mut hi) = (0u32, state.trans_len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (l, target) = self.transition(state, mid);
            match l.cmp(&label) {
                std::cmp::Ordering::Equal => return Some(target),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        None
    }

    /// Consume `bytes` from the start state; `None` on a dead end.
    pub fn walk(&self, bytes: &[u8]) -> Option<State> {
        self.walk_from(self.state(self.start()), bytes)
    }

    pub fn walk_from(&self, mut state: State, bytes: &[u8]) -> Option<State> {
        for &b in bytes {
            state = self.state(self.next(&state, b)?);
        }
        Some(state)
    }

    fn slot(&self, value_id: u32) -> (f64, Range<usize>) {
        let at = self.sections.slots.start + value_id as usize * VALUE_SLOT_SIZE;
        let data = self.bytes();
        let score = le_f64(data, at);
        let offset = le_u32(data, at + 8) as usize;
        let len = le_u32(data, at + 12) as usize;
        (score, offset..offset.saturating_add(len))
    }

    /// Score and raw payload of a value slot.
    pub fn value(&self, value_id: u32) -> (f64, &[u8]) {
        let (score, range) = self.slot(value_id);
        let data_start = self.sections.data.start;
        (
            score,
            &self.bytes()[data_start + range.start..data_start + range.end],
        )
    }
}

impl std::fmt::Debug for AutomatonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomatonStore")
            .field("header", &self.header)
            .field("backing", &self.backing.kind())
            .finish()
    }
}
