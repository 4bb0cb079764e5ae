//! Enter/exit throughput with several threads sharing one profiler

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use section_profiler::{ProfilerConfig, SectionProfiler, StackMode};
use std::sync::Arc;
use std::thread;

const PAIRS_PER_THREAD: u64 = 1_000;

fn run_threads(profiler: &Arc<SectionProfiler>, threads: usize) {
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let profiler = Arc::clone(profiler);
            thread::spawn(move || {
                for _ in 0..PAIRS_PER_THREAD {
                    profiler.enter("contended");
                    profiler.exit("contended", None);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");

    for threads in [1usize, 2, 4, 8] {
        group.throughput(Throughput::Elements(PAIRS_PER_THREAD * threads as u64));

        for mode in [StackMode::PerThread, StackMode::Shared] {
            let profiler = Arc::new(SectionProfiler::with_config(ProfilerConfig {
                stack_mode: mode,
                ..Default::default()
            }));
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}"), threads),
                &threads,
                |b, &threads| b.iter(|| run_threads(&profiler, threads)),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_contention);
criterion_main!(benches);
