use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use deepsim_runtime::{
    run_trials, DeepLayer, LayerRole, Network, NetworkBuilder, ProjectionKind, Shape, SimulationParams,
    TrialInput,
};

fn build_loop(n: usize) -> Network {
    NetworkBuilder::new()
        .add_layer(DeepLayer::new("V1", LayerRole::Superficial, Shape::new(&[n])))
        .add_layer(DeepLayer::new("V1D", LayerRole::Deep, Shape::new(&[n])))
        .add_layer(DeepLayer::new("LGN", LayerRole::ThalamicRelay, Shape::new(&[n])))
        .add_layer(DeepLayer::new("V2", LayerRole::Superficial, Shape::new(&[n])))
        .connect("V1", "V2", ProjectionKind::Standard)
        .connect("V1", "V1D", ProjectionKind::BurstCtxt)
        .connect("V1", "LGN", ProjectionKind::BurstTrc)
        .connect("V1D", "V1", ProjectionKind::DeepAttn)
        .build()
        .expect("bench network build")
}

fn pattern(n: usize) -> Vec<f32> {
    (0..n).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }).collect()
}

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("deepsim_cycle");

    for &n in &[16usize, 64, 256] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("steady", n), &n, |b, &n| {
            let mut net = build_loop(n);
            net.apply_ext("V1", &pattern(n)).expect("clamp");
            b.iter(|| net.cycle(0));
        });

        // Alternating clamps force a send and a retraction on every other cycle
        group.bench_with_input(BenchmarkId::new("toggle", n), &n, |b, &n| {
            let mut net = build_loop(n);
            let on = pattern(n);
            let off = vec![0.0; n];
            let mut flip = false;
            b.iter(|| {
                flip = !flip;
                net.apply_ext("V1", if flip { &on } else { &off }).expect("clamp");
                net.cycle(3)
            });
        });
    }

    group.finish();
}

fn bench_trials(c: &mut Criterion) {
    let mut group = c.benchmark_group("deepsim_trials");
    let params = SimulationParams::new(25, 2).expect("params");

    for &n in &[16usize, 64] {
        group.bench_with_input(BenchmarkId::new("loop", n), &n, |b, &n| {
            b.iter_batched(
                || build_loop(n),
                |net| {
                    let inputs = vec![vec![TrialInput::new("V1", pattern(n))]];
                    let _res = run_trials(net, params.clone(), inputs).unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cycle, bench_trials);
criterion_main!(benches);
