use super::*;

fn sample_builder() -> AutomatonBuilder {
    let mut b = AutomatonBuilder::new(ValueKind::String);
    b.insert("car", 3.0, b"v2").unwrap();
    b.insert("cart", 4.0, b"v3").unwrap();
    b.insert("cat", 5.0, b"v1").unwrap();
    b
}

fn sample_bytes() -> Vec<u8> {
    sample_builder().into_bytes().unwrap()
}

/// Recompute the body checksum after an in-place edit.
fn reseal(bytes: &mut [u8]) {
    let crc = crc32fast::hash(&bytes[HEADER_SIZE..]);
    bytes[36..40].copy_from_slice(&crc.to_le_bytes());
}

fn corrupt_message(result: Result<AutomatonStore, DictError>) -> String {
    match result {
        Err(DictError::Corrupt(msg)) => msg,
        other => panic!("expected Corrupt, got {other:?}"),
    }
}

#[test]
fn test_lookup_exact() {
    let store = sample_builder().into_store().unwrap();
    assert_eq!(store.key_count(), 3);
    assert_eq!(store.value_kind(), ValueKind::String);

    let state = store.walk(b"cart").unwrap();
    let (score, payload) = store.value(state.value_id().unwrap());
    assert_eq!(score, 4.0);
    assert_eq!(payload, b"v3");

    // "ca" is a path but not a key
    let ca = store.walk(b"ca").unwrap();
    assert!(!ca.is_final());
    assert_eq!(ca.weight(), 5.0);
    assert!(store.walk(b"dog").is_none());
}

#[test]
fn test_weights_are_subtree_maxima() {
    let store = sample_builder().into_store().unwrap();
    assert_eq!(store.state(store.start()).weight(), 5.0);
    assert_eq!(store.walk(b"car").unwrap().weight(), 4.0);
    assert_eq!(store.walk(b"cart").unwrap().weight(), 4.0);
}

#[test]
fn test_transitions_sorted() {
    let store = sample_builder().into_store().unwrap();
    let ca = store.walk(b"ca").unwrap();
    let labels: Vec<u8> = store.transitions(&ca).map(|(l, _)| l).collect();
    assert_eq!(labels, b"rt");
    assert!(store.next(&ca, b'r').is_some());
    assert!(store.next(&ca, b'x').is_none());
}

#[test]
fn test_minimized_suffixes() {
    let mut b = AutomatonBuilder::new(ValueKind::KeyOnly);
    b.insert("ab", 1.0, b"").unwrap();
    b.insert("cb", 1.0, b"").unwrap();
    let store = b.into_store().unwrap();
    // root, shared "b" state, shared final state
    assert_eq!(store.state_count(), 3);
    assert_eq!(store.transition_count(), 3);
    assert_eq!(store.value_count(), 1);
}

#[test]
fn test_dedup_disabled_keeps_slots_apart() {
    let mut b = AutomatonBuilder::new(ValueKind::KeyOnly).dedup_values(false);
    b.insert("ab", 1.0, b"").unwrap();
    b.insert("cb", 1.0, b"").unwrap();
    let store = b.into_store().unwrap();
    assert_eq!(store.value_count(), 2);
    assert_eq!(store.state_count(), 5);
}

#[test]
fn test_different_scores_not_merged() {
    let mut b = AutomatonBuilder::new(ValueKind::KeyOnly);
    b.insert("ab", 1.0, b"").unwrap();
    b.insert("cb", 2.0, b"").unwrap();
    let store = b.into_store().unwrap();
    assert_eq!(store.state_count(), 5);
    assert_eq!(store.walk(b"a").unwrap().weight(), 1.0);
    assert_eq!(store.walk(b"c").unwrap().weight(), 2.0);
}

#[test]
fn test_key_only_drops_payload() {
    let mut b = AutomatonBuilder::new(ValueKind::KeyOnly);
    b.insert("a", 1.0, b"ignored").unwrap();
    let store = b.into_store().unwrap();
    let (_, payload) = store.value(0);
    assert!(payload.is_empty());
    assert_eq!(store.header().value_data_len, 0);
}

#[test]
fn test_empty_key() {
    let mut b = AutomatonBuilder::new(ValueKind::String);
    b.insert("", 2.0, b"root").unwrap();
    b.insert("a", 1.0, b"a").unwrap();
    let store = b.into_store().unwrap();
    let root = store.walk(b"").unwrap();
    assert!(root.is_final());
    assert_eq!(store.value(root.value_id().unwrap()), (2.0, &b"root"[..]));
    assert_eq!(store.key_count(), 2);
}

#[test]
fn test_empty_builder() {
    let b = AutomatonBuilder::new(ValueKind::String);
    assert!(b.is_empty());
    let store = b.into_store().unwrap();
    assert_eq!(store.key_count(), 0);
    assert_eq!(store.state_count(), 1);
    let root = store.state(store.start());
    assert!(!root.is_final());
    assert_eq!(root.weight(), f64::NEG_INFINITY);
}

#[test]
fn test_out_of_order() {
    let mut b = AutomatonBuilder::new(ValueKind::KeyOnly);
    b.insert("b", 1.0, b"").unwrap();
    let err = b.insert("a", 1.0, b"").unwrap_err();
    assert!(matches!(err, BuildError::OutOfOrder { .. }));
}

#[test]
fn test_duplicate_key() {
    let mut b = AutomatonBuilder::new(ValueKind::KeyOnly);
    b.insert("a", 1.0, b"").unwrap();
    let err = b.insert("a", 2.0, b"").unwrap_err();
    assert!(matches!(err, BuildError::DuplicateKey(k) if k == "a"));
    assert_eq!(b.len(), 1);
}

#[test]
fn test_invalid_score() {
    let mut b = AutomatonBuilder::new(ValueKind::KeyOnly);
    assert!(matches!(
        b.insert("a", f64::NAN, b""),
        Err(BuildError::InvalidScore { .. })
    ));
    assert!(matches!(
        b.insert("a", f64::INFINITY, b""),
        Err(BuildError::InvalidScore { .. })
    ));
    assert!(b.is_empty());
}

#[test]
fn test_build_from_entries_last_wins() {
    let store = builder::build_from_entries(
        ValueKind::String,
        vec![("b", 1.0, "first"), ("a", 2.0, "a"), ("b", 3.0, "second")],
    )
    .unwrap()
    .into_store()
    .unwrap();
    assert_eq!(store.key_count(), 2);
    let b = store.walk(b"b").unwrap();
    assert_eq!(store.value(b.value_id().unwrap()), (3.0, &b"second"[..]));
}

#[test]
fn test_invalid_magic() {
    let mut bytes = sample_bytes();
    bytes[0] = b'X';
    assert!(matches!(
        AutomatonStore::from_bytes(bytes),
        Err(DictError::InvalidMagic)
    ));
}

#[test]
fn test_header_too_short() {
    assert!(matches!(
        AutomatonStore::from_bytes(b"LX".to_vec()),
        Err(DictError::InvalidHeader)
    ));
    let short = sample_bytes()[..20].to_vec();
    assert!(matches!(
        AutomatonStore::from_bytes(short),
        Err(DictError::InvalidHeader)
    ));
}

#[test]
fn test_unsupported_version() {
    let mut bytes = sample_bytes();
    bytes[4] = 0x99;
    assert!(matches!(
        AutomatonStore::from_bytes(bytes),
        Err(DictError::UnsupportedVersion(0x99))
    ));
}

#[test]
fn test_unknown_value_kind() {
    let mut bytes = sample_bytes();
    bytes[5] = 42;
    let msg = corrupt_message(AutomatonStore::from_bytes(bytes));
    assert!(msg.contains("value kind"), "{msg}");
}

#[test]
fn test_truncated() {
    let bytes = sample_bytes();
    let len = bytes.len();
    let err = AutomatonStore::from_bytes(bytes[..len - 3].to_vec()).unwrap_err();
    assert!(matches!(
        err,
        DictError::Truncated { expected, actual } if expected == len && actual == len - 3
    ));
    assert!(err.is_corrupt_format());
}

#[test]
fn test_trailing_bytes() {
    let mut bytes = sample_bytes();
    bytes.push(0);
    let msg = corrupt_message(AutomatonStore::from_bytes(bytes));
    assert!(msg.contains("trailing"), "{msg}");
}

#[test]
fn test_checksum_mismatch() {
    let mut bytes = sample_bytes();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    assert!(matches!(
        AutomatonStore::from_bytes(bytes),
        Err(DictError::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_inconsistent_weight() {
    let mut bytes = sample_bytes();
    // weight field of state 0
    bytes[HEADER_SIZE + 12..HEADER_SIZE + 20].copy_from_slice(&99.0f64.to_le_bytes());
    reseal(&mut bytes);
    let msg = corrupt_message(AutomatonStore::from_bytes(bytes));
    assert!(msg.contains("weight"), "{msg}");
}

#[test]
fn test_forward_transition_rejected() {
    let mut b = AutomatonBuilder::new(ValueKind::KeyOnly);
    b.insert("ab", 1.0, b"").unwrap();
    let mut bytes = b.into_bytes().unwrap();
    let header = Header::parse(&bytes).unwrap();
    // The first transition belongs to a state below the start state; point
    // it at the start state.
    let at = HEADER_SIZE + header.state_count as usize * STATE_SIZE + 1;
    bytes[at..at + 4].copy_from_slice(&header.start_state.to_le_bytes());
    reseal(&mut bytes);
    let msg = corrupt_message(AutomatonStore::from_bytes(bytes));
    assert!(msg.contains("cyclic"), "{msg}");
}

#[test]
fn test_key_count_mismatch() {
    let mut bytes = sample_bytes();
    // The header is outside the checksum.
    bytes[8..16].copy_from_slice(&7u64.to_le_bytes());
    let msg = corrupt_message(AutomatonStore::from_bytes(bytes));
    assert!(msg.contains("claims 7 keys"), "{msg}");
}

#[test]
fn test_open_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.lxfa");
    sample_builder().save(&path).unwrap();

    let store = AutomatonStore::open(&path).unwrap();
    assert!(store.is_mapped());
    assert_eq!(store.key_count(), 3);
    assert_eq!(store.byte_len(), sample_bytes().len());
    assert!(store.walk(b"cat").unwrap().is_final());
}

#[test]
fn test_open_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.lxfa");
    assert!(matches!(
        AutomatonStore::open(&path),
        Err(DictError::NotFound(p)) if p == path
    ));
}

#[test]
fn test_open_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.lxfa");
    std::fs::write(&path, b"").unwrap();
    assert!(matches!(
        AutomatonStore::open(&path),
        Err(DictError::InvalidHeader)
    ));
}
