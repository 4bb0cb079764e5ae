use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use section_profiler::{ProfilerError, SectionProfiler};
use sectionprof::config::AppConfig;
use sectionprof::utils::{describe_section, format_duration};
use sectionprof::workload::{self, InstrumentationStyle, TrigSpeedTest};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

struct ProfilerDemo {
    config: AppConfig,
    profiler: Arc<SectionProfiler>,
}

impl ProfilerDemo {
    fn new(config: AppConfig) -> Self {
        let profiler = Arc::new(SectionProfiler::with_config(config.profiler.clone()));
        Self { config, profiler }
    }

    fn run_sequential(&self) {
        let workload = &self.config.workload;
        let mut test = TrigSpeedTest::new(workload.entries, workload.seed);

        for iteration in 0..workload.iterations {
            for style in InstrumentationStyle::ALL {
                let biggest = test.run(&self.profiler, style);
                info!("Iteration {} ({:?}): biggest cos+sin = {}", iteration, style, biggest);
            }
        }
    }

    async fn run_parallel(&self) -> anyhow::Result<()> {
        let workload = &self.config.workload;
        if workload.parallel_workers == 0 {
            return Ok(());
        }

        info!("Running {} parallel workers...", workload.parallel_workers);
        let results = workload::run_parallel(
            Arc::clone(&self.profiler),
            workload.parallel_workers,
            workload.entries,
            workload.seed,
        )
        .await?;

        for (worker, biggest) in results.iter().enumerate() {
            info!("Worker {}: biggest cos+sin = {}", worker, biggest);
        }
        Ok(())
    }

    /// Print and export the statistics; returns how many exports failed
    fn report(&self) -> usize {
        let output = &self.config.output;

        if output.print_console {
            self.profiler.print_stats();
        }

        let mut failed = 0;
        if let Some(path) = output.json_path() {
            failed += export_failed("JSON", path, self.profiler.export_json(path));
        }
        if let Some(path) = output.csv_path() {
            failed += export_failed("CSV", path, self.profiler.export_csv(path));
        }
        if let Some(path) = output.timeline_path() {
            failed += export_failed("Timeline", path, self.profiler.export_timeline_json(path));
        }
        failed
    }

    fn print_summary(&self, wall_time: std::time::Duration) {
        let summary = self.profiler.summary();
        info!("=== Profile Summary ===");
        for stat in self.profiler.snapshot() {
            info!("{}", describe_section(&stat));
            if let Some(histogram) = self.profiler.histogram(stat.name()) {
                let p = histogram.percentiles();
                debug!("{}: p50={:.6}ms p99={:.6}ms", stat.name(), p.p50, p.p99);
            }
        }
        info!(
            "{} sections, {} calls, wall time {}",
            summary.sections,
            summary.total_calls,
            format_duration(wall_time)
        );

        if summary.anomalies.total() > 0 || summary.open_sections > 0 {
            warn!(
                "Unbalanced exits: {}, name mismatches: {}, still open: {}",
                summary.anomalies.unbalanced_exits,
                summary.anomalies.name_mismatches,
                summary.open_sections
            );
        }

        match serde_json::to_string(&summary) {
            Ok(json) => debug!("Summary: {}", json),
            Err(e) => warn!("Failed to serialize summary: {}", e),
        }
    }
}

fn export_failed(kind: &str, path: &str, result: Result<(), ProfilerError>) -> usize {
    match result {
        Ok(()) => 0,
        Err(e) => {
            debug!("{} export to {} failed: {}", kind, path, e);
            1
        }
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_file(&path),
        None => Ok(AppConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting {} v{}", sectionprof::NAME, sectionprof::VERSION);

    let started = Instant::now();
    let demo = ProfilerDemo::new(config);

    demo.run_sequential();
    demo.run_parallel().await?;

    let failed_exports = demo.report();
    if failed_exports > 0 {
        warn!("{} report export(s) failed", failed_exports);
    }
    demo.print_summary(started.elapsed());

    info!("Profiling demo complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_with_outputs(json: &str, csv: &str, timeline: &str) -> ProfilerDemo {
        let mut config = AppConfig::default();
        config.workload.entries = 16;
        config.workload.parallel_workers = 0;
        config.output.print_console = false;
        config.output.json_path = json.to_string();
        config.output.csv_path = csv.to_string();
        config.output.timeline_path = timeline.to_string();
        ProfilerDemo::new(config)
    }

    #[test]
    fn test_report_counts_failed_exports() {
        let demo = demo_with_outputs(
            "/nonexistent-dir/sectionprof/stats.json",
            "/nonexistent-dir/sectionprof/stats.csv",
            "",
        );
        demo.run_sequential();

        assert_eq!(demo.report(), 2);
        assert!(demo.profiler.section_count() > 0);
    }

    #[test]
    fn test_report_writes_configured_outputs() {
        let dir = std::env::temp_dir();
        let json = dir.join(format!("sectionprof_main_{}.json", std::process::id()));
        let csv = dir.join(format!("sectionprof_main_{}.csv", std::process::id()));
        let demo = demo_with_outputs(json.to_str().unwrap(), csv.to_str().unwrap(), "");
        demo.run_sequential();

        assert_eq!(demo.report(), 0);
        assert!(json.exists());
        assert!(csv.exists());

        std::fs::remove_file(&json).ok();
        std::fs::remove_file(&csv).ok();
    }
}
