use std::ffi::c_char;
use std::path::Path;
use std::ptr;

use tracing::warn;

use super::{ffi_close, ffi_guard, owned_new, set_status, string_to_c, LexFsaStatus};
use super::{LexFsaMatch, LexFsaMatchIterator};
use crate::dict::Dictionary;

/// Opaque dictionary handle.
pub struct LexFsaDictionary {
    pub(crate) inner: Dictionary,
}

/// Open a dictionary file. Returns null on failure and, when `status_out` is
/// non-null, stores the reason there.
#[no_mangle]
pub extern "C" fn lex_fsa_dictionary_open(
    path: *const c_char,
    status_out: *mut LexFsaStatus,
) -> *mut LexFsaDictionary {
    ffi_guard!({
            set_status(status_out, LexFsaStatus::InvalidArgument);
            ptr::null_mut()
        };
        str: path_str = path,
    );
    match Dictionary::open(Path::new(path_str)) {
        Ok(inner) => {
            set_status(status_out, LexFsaStatus::Ok);
            owned_new(LexFsaDictionary { inner })
        }
        Err(e) => {
            warn!(path = path_str, error = %e, "dictionary open failed");
            set_status(status_out, LexFsaStatus::from(&e));
            ptr::null_mut()
        }
    }
}

ffi_close!(lex_fsa_dictionary_close, LexFsaDictionary);

#[no_mangle]
pub extern "C" fn lex_fsa_dictionary_size(dict: *const LexFsaDictionary) -> u64 {
    ffi_guard!(0;
        ref: dict = dict,
    );
    dict.inner.size()
}

/// Statistics as a JSON object. Free with `lex_fsa_string_free`.
#[no_mangle]
pub extern "C" fn lex_fsa_dictionary_statistics(dict: *const LexFsaDictionary) -> *mut c_char {
    ffi_guard!(ptr::null_mut();
        ref: dict = dict,
    );
    string_to_c(&dict.inner.statistics())
}

/// Exact lookup. An absent key yields an empty Match handle; null is returned
/// only for invalid arguments.
#[no_mangle]
pub extern "C" fn lex_fsa_dictionary_get(
    dict: *const LexFsaDictionary,
    key: *const c_char,
) -> *mut LexFsaMatch {
    ffi_guard!(ptr::null_mut();
        ref: dict = dict,
        str: key = key,
    );
    owned_new(LexFsaMatch {
        inner: dict.inner.get(key),
    })
}

#[no_mangle]
pub extern "C" fn lex_fsa_dictionary_prefix_completions(
    dict: *const LexFsaDictionary,
    prefix: *const c_char,
) -> *mut LexFsaMatchIterator {
    ffi_guard!(ptr::null_mut();
        ref: dict = dict,
        str: prefix = prefix,
    );
    owned_new(LexFsaMatchIterator {
        inner: dict.inner.complete(prefix),
    })
}

#[no_mangle]
pub extern "C" fn lex_fsa_dictionary_fuzzy_completions(
    dict: *const LexFsaDictionary,
    query: *const c_char,
    max_edits: u32,
) -> *mut LexFsaMatchIterator {
    ffi_guard!(ptr::null_mut();
        ref: dict = dict,
        str: query = query,
    );
    owned_new(LexFsaMatchIterator {
        inner: dict.inner.fuzzy_complete(query, max_edits),
    })
}
