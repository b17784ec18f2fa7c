//! Anchor search for fuzzy completion.
//!
//! An anchor is the shortest automaton path whose decoded text is within the
//! edit budget of the whole query. Anchors are found depth-first while
//! carrying one row of the Levenshtein table per path; a branch is cut as
//! soon as every cell of its row exceeds the budget. Because the search never
//! descends below an anchor, anchor paths are prefix-free and the completions
//! seeded from them never overlap.

use crate::fsa::{AutomatonStore, StateId};

/// Bytes in a UTF-8 sequence given its lead byte. Stray continuation bytes
/// count as a one-byte (replacement) character.
fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

struct Branch {
    state: StateId,
    path: Vec<u8>,
    /// Start of the incomplete UTF-8 sequence at the end of `path`.
    pending_from: usize,
    row: Vec<u32>,
}

/// Next Levenshtein row after consuming `c`.
fn next_row(row: &[u32], query: &[char], c: char) -> Vec<u32> {
    let mut next = Vec::with_capacity(row.len());
    next.push(row[0] + 1);
    for j in 1..row.len() {
        let substitute = row[j - 1] + u32::from(query[j - 1] != c);
        let delete = row[j] + 1;
        let insert = next[j - 1] + 1;
        next.push(substitute.min(delete).min(insert));
    }
    next
}

pub(super) fn anchors(
    store: &AutomatonStore,
    query: &str,
    max_edits: u32,
    exact_prefix: usize,
) -> Vec<(StateId, Vec<u8>)> {
    // Walk the exact part first.
    let exact_end = query
        .char_indices()
        .nth(exact_prefix)
        .map_or(query.len(), |(i, _)| i);
    let Some(start) = store.walk(query[..exact_end].as_bytes()) else {
        return Vec::new();
    };

    let rest: Vec<char> = query[exact_end..].chars().collect();
    let first_row: Vec<u32> = (0..=rest.len() as u32).collect();
    let path = query.as_bytes()[..exact_end].to_vec();
    if first_row[rest.len()] <= max_edits {
        return vec![(start.id, path)];
    }

    let mut found = Vec::new();
    let mut stack = vec![Branch {
        state: start.id,
        pending_from: path.len(),
        path,
        row: first_row,
    }];

    while let Some(branch) = stack.pop() {
        let state = store.state(branch.state);
        // Reverse so that the stack pops children in label order.
        let children: Vec<(u8, StateId)> = store.transitions(&state).collect();
        for &(label, target) in children.iter().rev() {
            let mut path = Vec::with_capacity(branch.path.len() + 1);
            path.extend_from_slice(&branch.path);
            path.push(label);

            let pending = &path[branch.pending_from..];
            if pending.len() < utf8_width(pending[0]) {
                stack.push(Branch {
                    state: target,
                    pending_from: branch.pending_from,
                    path,
                    row: branch.row.clone(),
                });
                continue;
            }

            let c = std::str::from_utf8(pending)
                .ok()
                .and_then(|s| s.chars().next())
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            let row = next_row(&branch.row, &rest, c);
            if row[rest.len()] <= max_edits {
                found.push((target, path));
            } else if row.iter().any(|&d| d <= max_edits) {
                stack.push(Branch {
                    state: target,
                    pending_from: path.len(),
                    path,
                    row,
                });
            }
        }
    }
    found
}
