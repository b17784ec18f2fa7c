//! Compact, immutable dictionary engine over a weighted acyclic automaton.
//!
//! Dictionaries are built offline with [`AutomatonBuilder`] (or the `dictool`
//! binary), memory-mapped with [`Dictionary::open`], and queried with exact
//! lookup or ranked prefix completion. The [`ffi`] module exposes the same
//! surface to C through opaque handles.

// FFI functions perform null checks before dereferencing raw pointers.
// Clippy cannot verify this statically, so we allow it at crate level.
#![allow(clippy::not_unsafe_ptr_arg_deref)]

pub mod completion;
pub mod dict;
pub mod ffi;
pub mod fsa;
pub mod matching;
pub mod settings;
mod trace_init;

pub use completion::MatchIterator;
pub use dict::{DictError, DictStats, Dictionary};
pub use fsa::{AutomatonBuilder, AutomatonStore, BuildError, ValueDecoder, ValueKind};
pub use matching::Match;
