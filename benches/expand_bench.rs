use criterion::{criterion_group, criterion_main, Criterion, black_box};
use cozy_chess::Color;
use repertoire::oracle::synthetic::SyntheticOracle;
use repertoire::repertoire::RetryPolicy;
use repertoire::{ExpansionPolicy, Expander};

fn bench_expand(c: &mut Criterion) {
    let oracle = SyntheticOracle::new(42);
    let p = ExpansionPolicy { max_depth: 6, min_frequency: 0.05, max_loss: 60.0, max_branching: 3, ..Default::default() };
    for threads in [1usize, 4] {
        c.bench_function(&format!("expand_synthetic_depth_6_threads_{threads}"), |ben| {
            ben.iter(|| {
                let t = Expander::new(&oracle, &oracle)
                    .with_retry(RetryPolicy::none())
                    .with_threads(threads)
                    .expand(Color::White, black_box(&p))
                    .unwrap();
                black_box(t.stats.nodes)
            })
        });
    }
}

fn bench_emit(c: &mut Criterion) {
    let oracle = SyntheticOracle::new(42);
    let p = ExpansionPolicy { max_depth: 6, min_frequency: 0.0, max_loss: f64::INFINITY, max_branching: 3, ..Default::default() };
    let tree = Expander::new(&oracle, &oracle).with_retry(RetryPolicy::none()).expand(Color::Black, &p).unwrap();
    c.bench_function("emit_san_lines", |ben| {
        ben.iter(|| black_box(repertoire::emit(black_box(&tree), repertoire::LineStyle::San).len()))
    });
}

criterion_group!(benches, bench_expand, bench_emit);
criterion_main!(benches);
