//! Criterion benchmarks for the hypothesis store.
//!
//! Every evidence update reranks the whole problem, so cost grows with the
//! size of the differential.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dpe_common::{DiagnosisId, HypothesisId, ProblemId};
use dpe_config::StorePolicy;
use dpe_core::store::HypothesisStore;

fn seeded(size: usize) -> (HypothesisStore, ProblemId, Vec<HypothesisId>) {
    let store = HypothesisStore::new(StorePolicy {
        elimination_floor: 0.0,
        confirmation_ceiling: None,
    })
    .expect("store policy");
    let problem = store.open_problem().expect("open problem");
    let ids = (0..size)
        .map(|i| {
            let dx = DiagnosisId::parse(&format!("dx-{i}")).expect("diagnosis id");
            let pretest = 0.05 + 0.9 * (i as f64) / (size as f64);
            store.propose(problem, dx, pretest).expect("propose").id
        })
        .collect();
    (store, problem, ids)
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    for size in [5usize, 25, 100] {
        let (store, problem, ids) = seeded(size);
        let target = ids[size / 2];
        let mut flip = false;

        group.bench_with_input(
            BenchmarkId::new("record_evidence", size),
            &size,
            |b, _| {
                b.iter(|| {
                    // Alternate so the probability stays bounded.
                    flip = !flip;
                    let lr = if flip { 1.2 } else { 1.0 / 1.2 };
                    black_box(store.record_evidence(problem, target, black_box(lr)))
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("list_ranked", size), &size, |b, _| {
            b.iter(|| black_box(store.list_ranked(problem)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_store);
criterion_main!(benches);
