use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;

use super::*;

#[test]
fn test_get_found() {
    let dict = sample_dict();
    let m = dict.get("car");
    assert!(!m.is_empty());
    assert_eq!(m.matched_string(), "car");
    assert_eq!(m.score(), 3.0);
    assert_eq!(m.value_as_string(), "v2");
    assert_eq!((m.start(), m.end()), (0, 3));
}

#[test]
fn test_get_not_found() {
    let dict = sample_dict();
    assert!(dict.get("dog").is_empty());
    // inner path, not a key
    assert!(dict.get("ca").is_empty());
    assert!(dict.get("").is_empty());
    assert!(dict.get("carts").is_empty());
    assert!(!dict.contains("ca"));
    assert!(dict.contains("cart"));
}

#[test]
fn test_size() {
    assert_eq!(sample_dict().size(), 3);
    let empty =
        Dictionary::from_entries(ValueKind::KeyOnly, Vec::<(&str, f64, &[u8])>::new()).unwrap();
    assert_eq!(empty.size(), 0);
    assert!(empty.get("").is_empty());
    assert_eq!(empty.iter().count(), 0);
}

#[test]
fn test_empty_key_lookup() {
    let dict =
        Dictionary::from_entries(ValueKind::String, vec![("", 1.0, "root"), ("a", 2.0, "a")])
            .unwrap();
    let m = dict.get("");
    assert!(!m.is_empty());
    assert_eq!(m.value_as_string(), "root");
    assert_eq!(m.matched_string(), "");
}

#[test]
fn test_common_prefix_search() {
    let dict = sample_dict();
    let found: Vec<(String, usize)> = dict
        .common_prefix_search("cartwheel")
        .iter()
        .map(|m| (m.matched_string().to_string(), m.end()))
        .collect();
    assert_eq!(
        found,
        vec![("car".to_string(), 3), ("cart".to_string(), 4)]
    );
    assert!(dict.common_prefix_search("dog").is_empty());
}

#[test]
fn test_iter_lexicographic() {
    let dict = sample_dict();
    let all: Vec<(String, f64)> = dict
        .iter()
        .map(|m| (m.matched_string().to_string(), m.score()))
        .collect();
    assert_eq!(
        all,
        vec![
            ("car".to_string(), 3.0),
            ("cart".to_string(), 4.0),
            ("cat".to_string(), 5.0),
        ]
    );
}

#[test]
fn test_with_decoder() {
    let dict = sample_dict().with_decoder(Arc::new(|raw: &[u8]| raw.len().to_string()));
    assert_eq!(dict.get("cat").value_as_string(), "2");
    let completed: Vec<String> = dict
        .complete("ca")
        .map(|m| m.value_as_string().to_string())
        .collect();
    assert_eq!(completed, vec!["2", "2", "2"]);
}

#[test]
fn test_int_and_json_values() {
    let dict = Dictionary::from_entries(
        ValueKind::Int,
        vec![("answer", 1.0, 42u64.to_le_bytes().to_vec())],
    )
    .unwrap();
    assert_eq!(dict.get("answer").value_as_string(), "42");

    let payload = ValueKind::Json.encode_text(r#"{ "a" : [1, 2] }"#).unwrap();
    let dict = Dictionary::from_entries(ValueKind::Json, vec![("k", 1.0, payload)]).unwrap();
    assert_eq!(dict.get("k").value_as_string(), r#"{"a":[1,2]}"#);
}

#[test]
fn test_statistics() {
    let dict = sample_dict();
    let stats = dict.stats();
    assert_eq!(stats.key_count, 3);
    assert_eq!(stats.final_state_count, 3);
    assert_eq!(stats.max_key_len, 4);
    assert_eq!(stats.max_score, Some(5.0));
    assert_eq!(stats.backing, "owned");

    let json: serde_json::Value = serde_json::from_str(&dict.statistics()).unwrap();
    assert_eq!(json["key_count"], 3);
    assert_eq!(json["value_kind"], "string");
    assert_eq!(json["max_key_len"], 4);
}

#[test]
fn test_shared_across_threads() {
    let dict = Arc::new(sample_dict());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dict = Arc::clone(&dict);
            thread::spawn(move || {
                let top = dict.complete("ca").next().unwrap();
                (dict.get("cart").score(), top.matched_string().to_string())
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), (4.0, "cat".to_string()));
    }
}

#[test]
fn test_clone_shares_store() {
    let dict = sample_dict();
    let other = dict.clone();
    assert!(Arc::ptr_eq(dict.store(), other.store()));
    let third = Dictionary::from_store(Arc::clone(dict.store()));
    assert_eq!(third.get("cat").value_as_string(), "v1");
}

proptest! {
    #[test]
    fn test_get_and_size_match_entries(
        entries in prop::collection::vec(("[a-c]{0,5}", -10i32..10), 0..40),
        probes in prop::collection::vec("[a-d]{0,5}", 0..20),
    ) {
        let dict = Dictionary::from_entries(
            ValueKind::Int,
            entries
                .iter()
                .enumerate()
                .map(|(i, (k, s))| (k.clone(), f64::from(*s), (i as u64).to_le_bytes())),
        )
        .unwrap();

        // Last duplicate wins.
        let mut expected: BTreeMap<&str, (f64, String)> = BTreeMap::new();
        for (i, (k, s)) in entries.iter().enumerate() {
            expected.insert(k.as_str(), (f64::from(*s), i.to_string()));
        }
        prop_assert_eq!(dict.size(), expected.len() as u64);

        for (k, (score, value)) in &expected {
            let m = dict.get(k);
            prop_assert!(!m.is_empty());
            prop_assert_eq!(m.matched_string(), *k);
            prop_assert_eq!(m.score(), *score);
            prop_assert_eq!(m.value_as_string(), value.as_str());
        }
        for probe in &probes {
            let m = dict.get(probe);
            prop_assert_eq!(m.is_empty(), !expected.contains_key(probe.as_str()));
        }
    }
}
