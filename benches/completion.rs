use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lex_fsa::{Dictionary, ValueKind};

/// Synthetic vocabulary: every 1-5 letter word over a small alphabet, scored
/// by a cheap hash so that rankings are not aligned with key order.
fn bench_dict() -> Dictionary {
    const ALPHABET: &[u8] = b"abcdefgh";
    let mut entries = Vec::new();
    let mut stack: Vec<Vec<u8>> = ALPHABET.iter().map(|&c| vec![c]).collect();
    while let Some(word) = stack.pop() {
        let score = word
            .iter()
            .fold(17u32, |h, &b| h.wrapping_mul(31).wrapping_add(u32::from(b)))
            % 10_000;
        let key = String::from_utf8(word.clone()).unwrap();
        entries.push((key.clone(), f64::from(score), key.into_bytes()));
        if word.len() < 5 {
            for &c in ALPHABET {
                let mut next = word.clone();
                next.push(c);
                stack.push(next);
            }
        }
    }
    Dictionary::from_entries(ValueKind::String, entries).unwrap()
}

static PREFIXES: &[(&str, &str)] = &[("empty", ""), ("short", "a"), ("long", "abcd")];

fn bench_get(c: &mut Criterion) {
    let dict = bench_dict();
    c.bench_function("lookup/get", |b| {
        b.iter(|| dict.get("abcde"));
    });
}

fn bench_complete(c: &mut Criterion) {
    let dict = bench_dict();
    let mut group = c.benchmark_group("completion/top10");
    for &(label, prefix) in PREFIXES {
        group.bench_with_input(BenchmarkId::new(label, prefix.len()), &prefix, |b, &prefix| {
            b.iter(|| dict.complete(prefix).take(10).count());
        });
    }
    group.finish();
}

fn bench_fuzzy(c: &mut Criterion) {
    let dict = bench_dict();
    let mut group = c.benchmark_group("completion/fuzzy_top10");
    for k in 0..=2u32 {
        group.bench_with_input(BenchmarkId::new("abxd", k), &k, |b, &k| {
            b.iter(|| dict.fuzzy_complete("abxd", k).take(10).count());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_get, bench_complete, bench_fuzzy);
criterion_main!(benches);
