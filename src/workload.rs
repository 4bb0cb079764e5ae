//! Trigonometric speed test used to exercise the profiler

use std::sync::Arc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use section_profiler::{section_enter, section_exit, SectionProfiler};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEGREES_TO_RADIANS: f32 = std::f32::consts::PI / 180.0;

pub const TRIG_SPEED_TEST: &str = "Trig Speed Test";
pub const ANGLE_GENERATION: &str = "Random Angle Generation";
pub const TOTAL_COMPUTE: &str = "Total Cos and Sin Compute";
pub const SINGLE_COMPUTE: &str = "Cos and Sine Compute";

/// How the speed test brackets its sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentationStyle {
    /// Plain `enter`/`exit` calls without source locations
    Manual,
    /// `section_enter!`/`section_exit!`, recording file, function and line
    Located,
    /// Outer section held by a scope guard, inner sections via the macros
    Scoped,
}

impl InstrumentationStyle {
    pub const ALL: [InstrumentationStyle; 3] = [Self::Manual, Self::Located, Self::Scoped];
}

#[derive(Debug)]
pub struct TrigSpeedTest {
    entries: usize,
    rng: StdRng,
}

impl TrigSpeedTest {
    pub fn new(entries: usize, seed: u64) -> Self {
        Self {
            entries,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Run one pass and return the biggest `cos + sin` seen
    pub fn run(&mut self, profiler: &SectionProfiler, style: InstrumentationStyle) -> f32 {
        let biggest = match style {
            InstrumentationStyle::Manual => self.run_manual(profiler),
            InstrumentationStyle::Located => self.run_located(profiler),
            InstrumentationStyle::Scoped => self.run_scoped(profiler),
        };
        debug!("{:?} pass: biggest cos+sin = {}", style, biggest);
        biggest
    }

    fn random_angles(&mut self) -> Vec<f32> {
        (0..self.entries)
            .map(|_| 360.0 * self.rng.gen::<f32>())
            .collect()
    }

    fn run_manual(&mut self, profiler: &SectionProfiler) -> f32 {
        profiler.enter(TRIG_SPEED_TEST);

        profiler.enter(ANGLE_GENERATION);
        let angles = self.random_angles();
        profiler.exit(ANGLE_GENERATION, None);

        let mut biggest = 0.0f32;
        profiler.enter(TOTAL_COMPUTE);
        for &yaw_degrees in &angles {
            profiler.enter(SINGLE_COMPUTE);
            let (sin, cos) = (yaw_degrees * DEGREES_TO_RADIANS).sin_cos();
            profiler.exit(SINGLE_COMPUTE, None);

            biggest = biggest.max(cos + sin);
        }
        profiler.exit(TOTAL_COMPUTE, None);

        profiler.exit(TRIG_SPEED_TEST, None);
        biggest
    }

    fn run_located(&mut self, profiler: &SectionProfiler) -> f32 {
        section_enter!(profiler, TRIG_SPEED_TEST);

        section_enter!(profiler, ANGLE_GENERATION);
        let angles = self.random_angles();
        section_exit!(profiler, ANGLE_GENERATION);

        let biggest = compute_located(profiler, &angles);

        section_exit!(profiler, TRIG_SPEED_TEST);
        biggest
    }

    fn run_scoped(&mut self, profiler: &SectionProfiler) -> f32 {
        let _test = profiler.scope(TRIG_SPEED_TEST);

        section_enter!(profiler, ANGLE_GENERATION);
        let angles = self.random_angles();
        section_exit!(profiler, ANGLE_GENERATION);

        compute_located(profiler, &angles)
    }
}

fn compute_located(profiler: &SectionProfiler, angles: &[f32]) -> f32 {
    let mut biggest = 0.0f32;
    section_enter!(profiler, TOTAL_COMPUTE);
    for &yaw_degrees in angles {
        section_enter!(profiler, SINGLE_COMPUTE);
        let (sin, cos) = (yaw_degrees * DEGREES_TO_RADIANS).sin_cos();
        section_exit!(profiler, SINGLE_COMPUTE);

        biggest = biggest.max(cos + sin);
    }
    section_exit!(profiler, TOTAL_COMPUTE);
    biggest
}

/// Run the speed test on `workers` blocking tasks sharing one profiler
pub async fn run_parallel(
    profiler: Arc<SectionProfiler>,
    workers: usize,
    entries: usize,
    seed: u64,
) -> anyhow::Result<Vec<f32>> {
    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let profiler = Arc::clone(&profiler);
            let style = InstrumentationStyle::ALL[worker % InstrumentationStyle::ALL.len()];
            tokio::task::spawn_blocking(move || {
                TrigSpeedTest::new(entries, seed.wrapping_add(worker as u64)).run(&profiler, style)
            })
        })
        .collect();

    let mut results = Vec::with_capacity(workers);
    for handle in handles {
        results.push(handle.await?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_style_records_the_same_sections() {
        for style in InstrumentationStyle::ALL {
            let profiler = SectionProfiler::new();
            let biggest = TrigSpeedTest::new(100, 7).run(&profiler, style);

            assert!(biggest > 0.0 && biggest <= std::f32::consts::SQRT_2 + 1e-6);
            assert_eq!(profiler.section(TRIG_SPEED_TEST).unwrap().count(), 1);
            assert_eq!(profiler.section(ANGLE_GENERATION).unwrap().count(), 1);
            assert_eq!(profiler.section(TOTAL_COMPUTE).unwrap().count(), 1);
            assert_eq!(profiler.section(SINGLE_COMPUTE).unwrap().count(), 100);
            assert_eq!(profiler.stack_depth(), 0);
            assert_eq!(profiler.anomalies().total(), 0);
        }
    }

    #[test]
    fn test_located_style_records_source() {
        let profiler = SectionProfiler::new();
        TrigSpeedTest::new(10, 1).run(&profiler, InstrumentationStyle::Located);

        let stat = profiler.section(SINGLE_COMPUTE).unwrap();
        let location = stat.location().unwrap();
        assert!(location.file.ends_with("workload.rs"));
        assert!(location.function.unwrap().ends_with("compute_located"));

        let manual = SectionProfiler::new();
        TrigSpeedTest::new(10, 1).run(&manual, InstrumentationStyle::Manual);
        assert!(manual.section(SINGLE_COMPUTE).unwrap().location().is_none());
    }

    #[test]
    fn test_outer_section_contains_inner() {
        let profiler = SectionProfiler::new();
        TrigSpeedTest::new(1000, 3).run(&profiler, InstrumentationStyle::Scoped);

        let outer = profiler.section(TRIG_SPEED_TEST).unwrap();
        let total = profiler.section(TOTAL_COMPUTE).unwrap();
        let single = profiler.section(SINGLE_COMPUTE).unwrap();
        assert!(total.total_time() <= outer.total_time());
        assert!(single.total_time() <= total.total_time());
    }

    #[test]
    fn test_same_seed_same_result() {
        let profiler = SectionProfiler::new();
        let a = TrigSpeedTest::new(500, 11).run(&profiler, InstrumentationStyle::Manual);
        let b = TrigSpeedTest::new(500, 11).run(&profiler, InstrumentationStyle::Scoped);
        assert_eq!(a, b);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_parallel() {
        let profiler = Arc::new(SectionProfiler::new());
        let results = run_parallel(Arc::clone(&profiler), 4, 200, 9).await.unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(profiler.section(TRIG_SPEED_TEST).unwrap().count(), 4);
        assert_eq!(profiler.section(SINGLE_COMPUTE).unwrap().count(), 800);
        assert_eq!(profiler.open_sections(), 0);
        assert_eq!(profiler.anomalies().total(), 0);
    }
}
