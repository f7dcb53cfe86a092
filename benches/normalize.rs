use criterion::{criterion_group, criterion_main, Criterion};
use rbpmaps::prelude::*;
use rbpmaps::test_utilities::random_event_matrix;

const NEVENTS: usize = 2_000;
const NPOSITIONS: usize = 1_400;

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    group.sample_size(10);

    let signal = random_event_matrix(NEVENTS, NPOSITIONS, 0.05);
    let control = random_event_matrix(NEVENTS, NPOSITIONS, 0.05);

    group.bench_function("calculate_pdf", |b| {
        b.iter(|| calculate_pdf(&signal, 0.0).unwrap().nevents());
    });

    group.bench_function("normalize_and_subtract", |b| {
        b.iter(|| normalize_and_subtract(&signal, &control, 0.0).unwrap().len());
    });

    group.bench_function("kl_divergence", |b| {
        b.iter(|| kl_divergence(&signal, &control, 0.0).unwrap().nevents());
    });

    group.finish();
}

fn bench_significance(c: &mut Criterion) {
    let mut group = c.benchmark_group("significance");
    group.sample_size(10);

    let events = random_event_matrix(200, 350, 0.0);
    let background = random_event_matrix(NEVENTS, 350, 0.0);

    for test in [SignificanceTest::KolmogorovSmirnov, SignificanceTest::MannWhitneyU] {
        group.bench_function(format!("{:?}", test), |b| {
            b.iter(|| {
                let mut statistics = EventStatistics::new(events.clone(), 0.95).unwrap();
                statistics
                    .calculate_and_set_significance(&background, test)
                    .unwrap();
                statistics.num_events()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_significance);
criterion_main!(benches);
