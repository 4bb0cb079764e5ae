//! Single-threaded cost of the profiler's hot paths

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use section_profiler::{ProfilerConfig, SectionProfiler};
use std::time::Duration;

fn bench_enter_exit(c: &mut Criterion) {
    let profiler = SectionProfiler::new();
    c.bench_function("enter_exit", |b| {
        b.iter(|| {
            profiler.enter(black_box("bench"));
            profiler.exit(black_box("bench"), None)
        })
    });

    let bare = SectionProfiler::with_config(ProfilerConfig {
        histograms: false,
        ..Default::default()
    });
    c.bench_function("enter_exit_no_histogram", |b| {
        b.iter(|| {
            bare.enter(black_box("bench"));
            bare.exit(black_box("bench"), None)
        })
    });

    let disabled = SectionProfiler::with_config(ProfilerConfig {
        enabled: false,
        ..Default::default()
    });
    c.bench_function("enter_exit_disabled", |b| {
        b.iter(|| {
            disabled.enter(black_box("bench"));
            disabled.exit(black_box("bench"), None)
        })
    });
}

fn bench_scoped(c: &mut Criterion) {
    let profiler = SectionProfiler::new();
    c.bench_function("scoped_section", |b| {
        b.iter(|| {
            let _section = profiler.scope(black_box("scoped"));
        })
    });

    c.bench_function("nested_depth_8", |b| {
        b.iter(|| {
            for _ in 0..8 {
                profiler.enter("nested");
            }
            for _ in 0..8 {
                profiler.exit("nested", None);
            }
        })
    });
}

fn bench_reports(c: &mut Criterion) {
    c.bench_function("console_report_100_sections", |b| {
        b.iter_batched(
            || {
                let profiler = SectionProfiler::new();
                for i in 0..100u64 {
                    profiler.record(format!("section_{i:03}"), Duration::from_micros(i + 1), None);
                }
                profiler
            },
            |profiler| black_box(profiler.console_report()),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_enter_exit, bench_scoped, bench_reports);
criterion_main!(benches);
