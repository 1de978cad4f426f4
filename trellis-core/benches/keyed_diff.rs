use std::rc::Rc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis_core::render::{h, longest_increasing_subsequence, Renderer, VNode};
use trellis_core::testing::TestHost;

fn list(keys: &[usize]) -> VNode {
    h("ul")
        .children(keys.iter().map(|&key| h("li").key(key).text(key.to_string())))
        .build()
}

fn keyed_diff_shuffle(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_diff_shuffle");

    for size in [100usize, 1_000] {
        let forward: Vec<usize> = (0..size).collect();
        // Swap every pair in the middle: worst case for the move pass.
        let mut swapped = forward.clone();
        for pair in swapped[1..size - 1].chunks_mut(2) {
            pair.reverse();
        }

        let host = Rc::new(TestHost::new());
        let root = host.create_root();
        let renderer = Renderer::new(host.clone());
        renderer.render(Some(&list(&forward)), root).expect("initial render");

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            let mut flip = false;
            b.iter(|| {
                let keys = if flip { &forward } else { &swapped };
                flip = !flip;
                renderer.render(Some(&list(keys)), root).expect("render");
                host.clear_ops();
            });
        });
    }

    group.finish();
}

fn lis(c: &mut Criterion) {
    let input: Vec<usize> = (0..10_000).map(|i| (i * 7919) % 10_007 + 1).collect();

    c.bench_function("longest_increasing_subsequence_10k", |b| {
        b.iter(|| longest_increasing_subsequence(criterion::black_box(&input)));
    });
}

criterion_group!(benches, keyed_diff_shuffle, lis);
criterion_main!(benches);
