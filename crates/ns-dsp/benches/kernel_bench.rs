use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ns_dsp::{ResamplerConfig, StepKernel};
use ns_ir::StepEvent;

fn bench_kernel_build(c: &mut Criterion) {
    c.bench_function("lanczos_5x32", |b| {
        b.iter(|| StepKernel::lanczos(black_box(5), black_box(32)))
    });
}

fn bench_resample_square(c: &mut Criterion) {
    // One second of a 440 Hz square wave as step events
    let events: Vec<StepEvent> = (1..=880)
        .map(|i| {
            let level = if i % 2 == 0 { 0.0 } else { 0.25 };
            StepEvent::new(i as f64 / 880.0, level)
        })
        .collect();
    let config = ResamplerConfig::default();

    c.bench_function("resample_1s_square", |b| {
        b.iter(|| {
            let mut rs = config.build().unwrap();
            black_box(rs.process(black_box(&events)))
        })
    });
}

criterion_group!(benches, bench_kernel_build, bench_resample_square);
criterion_main!(benches);
