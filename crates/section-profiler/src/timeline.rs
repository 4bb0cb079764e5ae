use std::borrow::Cow;
use std::collections::VecDeque;
use serde::Serialize;

/// One completed section instance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    #[serde(rename = "sectionName")]
    pub name: Cow<'static, str>,
    #[serde(serialize_with = "seconds_as_ms")]
    pub start_time: f64,
    #[serde(serialize_with = "seconds_as_ms")]
    pub end_time: f64,
    /// Nesting depth at entry, 0 for a root section
    pub depth: usize,
    #[serde(rename = "parentSection")]
    pub parent: Option<Cow<'static, str>>,
    #[serde(skip)]
    pub thread: Option<std::thread::ThreadId>,
}

impl SectionRecord {
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.end_time - self.start_time
    }
}

fn seconds_as_ms<S: serde::Serializer>(seconds: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(seconds * 1000.0)
}

/// Bounded log of completed sections, oldest first
#[derive(Debug, Default)]
pub struct Timeline {
    capacity: usize,
    records: VecDeque<SectionRecord>,
    dropped: u64,
}

impl Timeline {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity.min(4096)),
            dropped: 0,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    pub fn push(&mut self, record: SectionRecord) {
        if !self.is_enabled() {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
            self.dropped += 1;
        }
        self.records.push_back(record);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records evicted because the log was full
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn records(&self) -> Vec<SectionRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.dropped = 0;
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TimelineDocument<'a> {
    pub records: &'a [SectionRecord],
}
