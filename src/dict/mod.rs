//! Read-only dictionary over an [`AutomatonStore`].
//!
//! `Dictionary` is a cheap handle: the store sits behind an `Arc`, so clones
//! and dictionaries created with [`Dictionary::from_store`] share one mapping
//! and can be used from any number of threads without locking.

mod entries;
mod stats;
#[cfg(test)]
mod tests;

pub use entries::Entries;
pub use stats::DictStats;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::completion::{self, MatchIterator};
use crate::fsa::{builder, AutomatonStore, BuildError, ValueDecoder, ValueKind};
use crate::matching::Match;

/// Errors raised while opening, building or iterating dictionaries.
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    #[error("dictionary not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid header (too short)")]
    InvalidHeader,

    #[error("invalid magic bytes (expected LXFA)")]
    InvalidMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("truncated store: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("checksum mismatch: header says {expected:#010x}, body hashes to {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("corrupt store: {0}")]
    Corrupt(String),

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("build error: {0}")]
    Build(#[from] BuildError),
}

impl DictError {
    /// True for every failure caused by the file contents rather than by
    /// the file system.
    pub fn is_corrupt_format(&self) -> bool {
        matches!(
            self,
            DictError::InvalidHeader
                | DictError::InvalidMagic
                | DictError::UnsupportedVersion(_)
                | DictError::Truncated { .. }
                | DictError::ChecksumMismatch { .. }
                | DictError::Corrupt(_)
        )
    }
}

#[derive(Clone)]
pub struct Dictionary {
    store: Arc<AutomatonStore>,
    decoder: Arc<dyn ValueDecoder>,
    stats: Arc<OnceLock<DictStats>>,
}

impl Dictionary {
    /// Open and validate a dictionary file via mmap.
    pub fn open(path: &Path) -> Result<Self, DictError> {
        let store = AutomatonStore::open(path)?;
        debug!(path = %path.display(), keys = store.key_count(), "dictionary opened");
        Ok(Self::from_store(Arc::new(store)))
    }

    /// Wrap an already loaded store. The store is shared, not copied.
    pub fn from_store(store: Arc<AutomatonStore>) -> Self {
        let decoder = store.value_kind().decoder();
        Self {
            store,
            decoder,
            stats: Arc::new(OnceLock::new()),
        }
    }

    /// Build an in-memory dictionary from unsorted `(key, score, payload)`
    /// entries. Later duplicates replace earlier ones.
    pub fn from_entries<K, V>(
        kind: ValueKind,
        entries: impl IntoIterator<Item = (K, f64, V)>,
    ) -> Result<Self, DictError>
    where
        K: AsRef<str>,
        V: AsRef<[u8]>,
    {
        let store = builder::build_from_entries(kind, entries)?.into_store()?;
        Ok(Self::from_store(Arc::new(store)))
    }

    /// Replace the payload decoder used for every Match this handle produces.
    pub fn with_decoder(mut self, decoder: Arc<dyn ValueDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn store(&self) -> &Arc<AutomatonStore> {
        &self.store
    }

    pub(crate) fn decoder(&self) -> &Arc<dyn ValueDecoder> {
        &self.decoder
    }

    /// Number of stored keys.
    pub fn size(&self) -> u64 {
        self.store.key_count()
    }

    pub fn value_kind(&self) -> ValueKind {
        self.store.value_kind()
    }

    /// Structural statistics, computed on first use.
    pub fn stats(&self) -> &DictStats {
        self.stats.get_or_init(|| DictStats::collect(&self.store))
    }

    /// Statistics rendered as a JSON object.
    pub fn statistics(&self) -> String {
        self.stats().to_json()
    }

    /// Exact lookup. An absent key yields an empty Match.
    pub fn get(&self, key: &str) -> Match {
        let Some(state) = self.store.walk(key.as_bytes()) else {
            return Match::empty();
        };
        match state.value_id() {
            Some(value_id) => self.make_match(key.to_string(), 0, value_id),
            None => Match::empty(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store
            .walk(key.as_bytes())
            .is_some_and(|s| s.is_final())
    }

    /// Every stored key that is a prefix of `query`, shortest first.
    pub fn common_prefix_search(&self, query: &str) -> Vec<Match> {
        let store = &self.store;
        let bytes = query.as_bytes();
        let mut state = store.state(store.start());
        let mut results = Vec::new();

        for len in 0..=bytes.len() {
            if let Some(value_id) = state.value_id() {
                if let Some(prefix) = query.get(..len) {
                    results.push(self.make_match(prefix.to_string(), 0, value_id));
                }
            }
            let Some(&b) = bytes.get(len) else {
                break;
            };
            match store.next(&state, b) {
                Some(next) => state = store.state(next),
                None => break,
            }
        }
        results
    }

    /// All entries in byte-lexicographic key order.
    pub fn iter(&self) -> Entries {
        Entries::new(self.store.clone(), self.decoder.clone())
    }

    /// Completions of `prefix`, best score first.
    pub fn complete(&self, prefix: &str) -> MatchIterator {
        completion::complete(self, prefix)
    }

    /// Completions of every key prefix within `max_edits` of `query`, best
    /// score first. The leading `completion.fuzzy_exact_prefix` characters
    /// must match exactly. `max_edits` is capped at
    /// [`MAX_FUZZY_EDITS`](crate::settings::MAX_FUZZY_EDITS).
    pub fn fuzzy_complete(&self, query: &str, max_edits: u32) -> MatchIterator {
        let exact_prefix = crate::settings::settings().completion.fuzzy_exact_prefix;
        let max_edits = max_edits.min(crate::settings::MAX_FUZZY_EDITS);
        completion::fuzzy_complete(self, query, max_edits, exact_prefix)
    }

    pub(crate) fn make_match(&self, key: String, start: usize, value_id: u32) -> Match {
        let (score, raw) = self.store.value(value_id);
        let end = start + key.len();
        Match::new(key, start, end, score, self.decoder.decode(raw))
    }
}

impl std::fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
