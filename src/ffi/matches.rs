use std::ffi::c_char;
use std::ptr;

use super::{ffi_close, ffi_guard, owned_new, string_to_c, LexFsaStatus};
use crate::completion::MatchIterator;
use crate::matching::Match;

/// Opaque Match handle. Independent of the dictionary it came from.
pub struct LexFsaMatch {
    pub(crate) inner: Match,
}

/// Opaque completion cursor. Keeps the dictionary's store alive on its own.
pub struct LexFsaMatchIterator {
    pub(crate) inner: MatchIterator,
}

// --- Match ---

#[no_mangle]
pub extern "C" fn lex_fsa_match_is_empty(m: *const LexFsaMatch) -> bool {
    ffi_guard!(true;
        ref: m = m,
    );
    m.inner.is_empty()
}

#[no_mangle]
pub extern "C" fn lex_fsa_match_score(m: *const LexFsaMatch) -> f64 {
    ffi_guard!(0.0;
        ref: m = m,
    );
    m.inner.score()
}

/// Decoded value. Free with `lex_fsa_string_free`.
///
/// Returns null for a null handle and also when the value contains an
/// interior NUL byte, which a C string cannot carry.
#[no_mangle]
pub extern "C" fn lex_fsa_match_value_as_string(m: *const LexFsaMatch) -> *mut c_char {
    ffi_guard!(ptr::null_mut();
        ref: m = m,
    );
    string_to_c(m.inner.value_as_string())
}

/// Matched key. Free with `lex_fsa_string_free`.
///
/// Returns null for a null handle and also when the key contains an
/// interior NUL byte, which a C string cannot carry.
#[no_mangle]
pub extern "C" fn lex_fsa_match_matched_string(m: *const LexFsaMatch) -> *mut c_char {
    ffi_guard!(ptr::null_mut();
        ref: m = m,
    );
    string_to_c(m.inner.matched_string())
}

ffi_close!(lex_fsa_match_close, LexFsaMatch);

// --- MatchIterator ---

#[no_mangle]
pub extern "C" fn lex_fsa_match_iterator_is_empty(it: *const LexFsaMatchIterator) -> bool {
    ffi_guard!(true;
        ref: it = it,
    );
    it.inner.is_exhausted()
}

/// A new Match handle for the current position, or null when exhausted.
#[no_mangle]
pub extern "C" fn lex_fsa_match_iterator_dereference(
    it: *const LexFsaMatchIterator,
) -> *mut LexFsaMatch {
    ffi_guard!(ptr::null_mut();
        ref: it = it,
    );
    match it.inner.current() {
        Ok(m) => owned_new(LexFsaMatch { inner: m.clone() }),
        Err(_) => ptr::null_mut(),
    }
}

#[no_mangle]
pub extern "C" fn lex_fsa_match_iterator_increment(it: *mut LexFsaMatchIterator) -> LexFsaStatus {
    ffi_guard!(LexFsaStatus::InvalidArgument;
        mut: it = it,
    );
    match it.inner.advance() {
        Ok(()) => LexFsaStatus::Ok,
        Err(ref e) => LexFsaStatus::from(e),
    }
}

ffi_close!(lex_fsa_match_iterator_close, LexFsaMatchIterator);
