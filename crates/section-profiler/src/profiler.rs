use crate::clock::{seconds_to_duration, Clock, MonotonicClock};
use crate::config::ProfilerConfig;
use crate::error::ProfilerError;
use crate::histogram::SectionHistogram;
use crate::metrics::{Anomalies, ProfileSummary, SectionStat, SourceLocation};
use crate::report::{self, ProfileReport};
use crate::stack::{StackMode, StackSet};
use crate::timeline::{SectionRecord, Timeline};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Everything guarded by the profiler lock
#[derive(Debug)]
struct ProfilerState {
    stacks: StackSet,
    stats: BTreeMap<Cow<'static, str>, SectionStat>,
    histograms: HashMap<Cow<'static, str>, SectionHistogram>,
    timeline: Timeline,
    anomalies: Anomalies,
}

impl ProfilerState {
    fn new(config: &ProfilerConfig) -> Self {
        Self {
            stacks: StackSet::new(config.stack_mode, config.stack_capacity),
            stats: BTreeMap::new(),
            histograms: HashMap::new(),
            timeline: Timeline::new(config.timeline_capacity),
            anomalies: Anomalies::default(),
        }
    }

    fn update(
        &mut self,
        config: &ProfilerConfig,
        name: &Cow<'static, str>,
        elapsed: f64,
        location: Option<SourceLocation>,
    ) {
        match self.stats.get_mut(name.as_ref()) {
            Some(stat) => stat.record(elapsed),
            None => {
                self.stats
                    .insert(name.clone(), SectionStat::first(name.clone(), elapsed, location));
            }
        }

        if config.histograms {
            self.histograms
                .entry(name.clone())
                .or_insert_with(|| SectionHistogram::with_sigfig(config.histogram_sigfig))
                .record_seconds(elapsed);
        }
    }
}

/// Section timing profiler.
///
/// Callers bracket named sections with [`enter`](Self::enter) and
/// [`exit`](Self::exit), or hold a [`ScopedSection`] guard. Each exit pops
/// the most recent open section of the calling thread (or of the single
/// shared stack in [`StackMode::Shared`]) and folds the elapsed time into
/// the statistics for the exit's name. Protocol violations are logged and
/// counted, never fatal.
///
/// The stacks and the statistics table sit behind one lock that is held for
/// the duration of a single enter, exit or report snapshot.
pub struct SectionProfiler {
    state: Mutex<ProfilerState>,
    clock: Box<dyn Clock>,
    config: ProfilerConfig,
    enabled: AtomicBool,
}

impl SectionProfiler {
    #[inline]
    pub fn new() -> Self {
        Self::with_config(ProfilerConfig::default())
    }

    pub fn with_config(config: ProfilerConfig) -> Self {
        Self::with_clock(config, MonotonicClock::new())
    }

    pub fn with_clock(config: ProfilerConfig, clock: impl Clock + 'static) -> Self {
        Self {
            state: Mutex::new(ProfilerState::new(&config)),
            clock: Box::new(clock),
            enabled: AtomicBool::new(config.enabled),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    #[inline]
    pub fn stack_mode(&self) -> StackMode {
        self.config.stack_mode
    }

    /// Current reading of the profiler's clock, in seconds
    #[inline]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Open a section named `name` on the calling thread's stack
    #[inline]
    pub fn enter(&self, name: impl Into<Cow<'static, str>>) {
        self.push(name.into());
    }

    fn push(&self, name: Cow<'static, str>) -> bool {
        if !self.enabled.load(Ordering::Relaxed) {
            return false;
        }

        let thread = std::thread::current().id();
        let mut state = self.state.lock();
        let now = self.clock.now();
        state.stacks.stack_mut(thread).push(name, now);
        true
    }

    /// Close the most recently opened section and record its elapsed time under `name`.
    ///
    /// The pop is LIFO regardless of `name`: a name that differs from the
    /// open section is reported but the sample is still recorded under
    /// `name`. `location` is attached to the section's statistics only when
    /// this is the first sample for `name`.
    ///
    /// Returns the elapsed time, or `None` if nothing was recorded because
    /// the profiler is disabled or no section is open.
    pub fn exit(
        &self,
        name: impl Into<Cow<'static, str>>,
        location: Option<SourceLocation>,
    ) -> Option<Duration> {
        if !self.enabled.load(Ordering::Relaxed) {
            return None;
        }

        let name = name.into();
        let thread = std::thread::current().id();

        let elapsed = {
            let mut state = self.state.lock();
            let now = self.clock.now();

            let Some(open) = state.stacks.pop(thread) else {
                state.anomalies.unbalanced_exits += 1;
                drop(state);
                let err = ProfilerError::UnbalancedExit {
                    name: name.into_owned(),
                };
                warn!("{}", err);
                return None;
            };

            if open.name != name {
                state.anomalies.name_mismatches += 1;
                let err = ProfilerError::NameMismatch {
                    expected: open.name.to_string(),
                    found: name.to_string(),
                };
                warn!("{}", err);
            }

            let elapsed = (now - open.start_time).max(0.0);
            state.update(&self.config, &name, elapsed, location);

            if state.timeline.is_enabled() {
                let depth = state.stacks.depth(thread);
                let parent = state
                    .stacks
                    .stack(thread)
                    .and_then(|stack| stack.top())
                    .map(|top| top.name.clone());
                state.timeline.push(SectionRecord {
                    name: name.clone(),
                    start_time: open.start_time,
                    end_time: open.start_time + elapsed,
                    depth,
                    parent,
                    thread: Some(thread),
                });
            }

            elapsed
        };

        if self.config.publish_metrics {
            publish_sample(&name, elapsed);
        }

        Some(seconds_to_duration(elapsed))
    }

    /// Fold an externally measured sample into the statistics table
    pub fn record(
        &self,
        name: impl Into<Cow<'static, str>>,
        elapsed: Duration,
        location: Option<SourceLocation>,
    ) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }

        let name = name.into();
        let seconds = elapsed.as_secs_f64();
        self.state.lock().update(&self.config, &name, seconds, location);

        if self.config.publish_metrics {
            publish_sample(&name, seconds);
        }
    }

    /// Open `name` until the returned guard is dropped
    #[inline]
    #[track_caller]
    pub fn scope(&self, name: impl Into<Cow<'static, str>>) -> ScopedSection<'_> {
        ScopedSection::new(self, name)
    }

    pub fn section(&self, name: &str) -> Option<SectionStat> {
        self.state.lock().stats.get(name).cloned()
    }

    /// Statistics for every section, ordered by name
    pub fn snapshot(&self) -> Vec<SectionStat> {
        self.state.lock().stats.values().cloned().collect()
    }

    pub fn section_count(&self) -> usize {
        self.state.lock().stats.len()
    }

    pub fn histogram(&self, name: &str) -> Option<SectionHistogram> {
        self.state.lock().histograms.get(name).cloned()
    }

    pub fn timeline(&self) -> Vec<SectionRecord> {
        self.state.lock().timeline.records()
    }

    pub fn timeline_dropped(&self) -> u64 {
        self.state.lock().timeline.dropped()
    }

    /// Open sections on the calling thread's stack
    pub fn stack_depth(&self) -> usize {
        self.state.lock().stacks.depth(std::thread::current().id())
    }

    /// Open sections across all stacks
    pub fn open_sections(&self) -> usize {
        self.state.lock().stacks.total_open()
    }

    pub fn anomalies(&self) -> Anomalies {
        self.state.lock().anomalies
    }

    pub fn summary(&self) -> ProfileSummary {
        let state = self.state.lock();
        ProfileSummary::from_stats(state.stats.values(), state.stacks.total_open(), state.anomalies)
    }

    /// Drop every open section, statistic, histogram and timeline record
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.stacks.clear();
        state.stats.clear();
        state.histograms.clear();
        state.timeline.clear();
        state.anomalies = Anomalies::default();
        debug!("Profiler reset");
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
        debug!("Profiler enabled");
    }

    /// Stop recording and discard every open section.
    ///
    /// Exits while disabled are no-ops, so sections left open across a
    /// disabled period could never be closed in order. Exiting one of them
    /// after [`enable`](Self::enable) is reported as an unbalanced exit.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
        self.state.lock().stacks.clear();
        debug!("Profiler disabled");
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> ProfileReport {
        ProfileReport::from_stats(&self.snapshot())
    }

    pub fn console_report(&self) -> String {
        report::format_console_report(&self.snapshot())
    }

    /// Write the console report to stdout
    pub fn print_stats(&self) {
        print!("{}", self.console_report());
    }

    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<(), ProfilerError> {
        report::write_json(path.as_ref(), &self.report())
    }

    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<(), ProfilerError> {
        report::write_csv(path.as_ref(), &self.report())
    }

    pub fn export_timeline_json(&self, path: impl AsRef<Path>) -> Result<(), ProfilerError> {
        report::write_timeline_json(path.as_ref(), &self.timeline())
    }
}

impl Default for SectionProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SectionProfiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionProfiler")
            .field("clock", &self.clock)
            .field("config", &self.config)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

fn publish_sample(name: &str, elapsed: f64) {
    let section = name.to_string();
    ::metrics::counter!("section_calls_total", "section" => section.clone()).increment(1);
    ::metrics::histogram!("section_time_seconds", "section" => section).record(elapsed);
}

static GLOBAL_PROFILER: Lazy<SectionProfiler> = Lazy::new(SectionProfiler::new);

/// Process-wide profiler for call sites that have no profiler handle
#[inline]
pub fn global() -> &'static SectionProfiler {
    &GLOBAL_PROFILER
}

/// Keeps a section open for the lifetime of the guard.
///
/// The guard is `!Send`: its section lives on the stack of the thread that
/// created it and must be closed there.
#[must_use = "the section closes as soon as the guard is dropped"]
pub struct ScopedSection<'a> {
    profiler: &'a SectionProfiler,
    name: Cow<'static, str>,
    location: SourceLocation,
    entered: bool,
    _not_send: PhantomData<*const ()>,
}

impl<'a> ScopedSection<'a> {
    #[inline]
    #[track_caller]
    pub fn new(profiler: &'a SectionProfiler, name: impl Into<Cow<'static, str>>) -> Self {
        Self::with_location(profiler, name, SourceLocation::caller())
    }

    #[inline]
    pub fn with_location(
        profiler: &'a SectionProfiler,
        name: impl Into<Cow<'static, str>>,
        location: SourceLocation,
    ) -> Self {
        let name = name.into();
        let entered = profiler.push(name.clone());
        Self {
            profiler,
            name,
            location,
            entered,
            _not_send: PhantomData,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<'a> Drop for ScopedSection<'a> {
    fn drop(&mut self) {
        if self.entered {
            self.profiler
                .exit(std::mem::take(&mut self.name), Some(self.location));
        }
    }
}

/// Fully qualified path of the enclosing function
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        name.strip_suffix("::f").unwrap_or(name)
    }};
}

#[macro_export]
macro_rules! source_location {
    () => {
        $crate::metrics::SourceLocation::new(file!(), $crate::function_name!(), line!())
    };
}

#[macro_export]
macro_rules! section_enter {
    ($profiler:expr, $name:expr) => {
        $profiler.enter($name)
    };
}

/// Exit with the call site's file, function and line attached
#[macro_export]
macro_rules! section_exit {
    ($profiler:expr, $name:expr) => {
        $profiler.exit($name, Some($crate::source_location!()))
    };
}

/// Open a section until the end of the enclosing block
#[macro_export]
macro_rules! profile_scope {
    ($profiler:expr, $name:expr) => {
        let _section_guard = $crate::profiler::ScopedSection::with_location(
            $profiler,
            $name,
            $crate::source_location!(),
        );
    };
}

#[macro_export]
macro_rules! measure {
    ($profiler:expr, $name:expr, $code:block) => {{
        let _section_guard = $crate::profiler::ScopedSection::with_location(
            $profiler,
            $name,
            $crate::source_location!(),
        );
        $code
    }};
}

/// Time an awaited future.
///
/// The future may interleave with others on the same thread, so the sample
/// bypasses the section stacks and is folded in directly with `record`.
#[macro_export]
macro_rules! measure_async {
    ($profiler:expr, $name:expr, $code:expr) => {{
        let profiler = &$profiler;
        let name: ::std::borrow::Cow<'static, str> = ::std::convert::Into::into($name);
        let start = profiler.now();
        let result = $code.await;
        let elapsed = $crate::clock::seconds_to_duration(profiler.now() - start);
        profiler.record(name, elapsed, Some($crate::source_location!()));
        result
    }};
}
