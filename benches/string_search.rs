//! String search benchmarks for structview
//!
//! Compares the naive scan with bitap across haystack and needle sizes, and
//! measures the adaptive `Searcher::search` that picks between them.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use structview::views::string::search_naive;
use structview::{Searcher, StringView};

fn haystack(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(b'a'..=b'd')).collect()
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for len in [64usize, 1024, 16 * 1024] {
        let hay = haystack(len, len as u64);
        for needle_len in [4usize, 16, 48] {
            let needle = vec![b'e'; needle_len];
            let id = format!("{}b/{}n", len, needle_len);

            group.bench_with_input(BenchmarkId::new("naive", &id), &hay, |b, h| {
                b.iter(|| search_naive(black_box(h), black_box(&needle), 0));
            });

            let mut searcher = Searcher::new();
            group.bench_with_input(BenchmarkId::new("bitap", &id), &hay, |b, h| {
                b.iter(|| searcher.search_bitap(black_box(h), black_box(&needle), 0));
            });

            let mut searcher = Searcher::new();
            group.bench_with_input(BenchmarkId::new("adaptive", &id), &hay, |b, h| {
                b.iter(|| searcher.search(black_box(h), black_box(&needle), 0));
            });
        }
    }

    group.finish();
}

fn bench_in_place(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_in_place");
    let text: String = haystack(4096, 3).into_iter().map(char::from).collect();

    group.bench_function("reverse_4k", |b| {
        let mut view = StringView::from_str(&text, None);
        b.iter(|| view.reverse());
    });

    group.bench_function("replace_4k", |b| {
        b.iter(|| {
            let mut view = StringView::from_str(black_box(&text), None);
            view.replace(b"abc", b"xyz")
        });
    });

    group.bench_function("replace_4k_shared_searcher", |b| {
        let mut searcher = Searcher::new();
        b.iter(|| {
            let mut view = StringView::from_str(black_box(&text), None);
            view.replace_with(&mut searcher, b"abc", b"xyz")
        });
    });

    group.finish();
}

criterion_group!(benches, bench_search, bench_in_place);
criterion_main!(benches);
