//! Console, CSV and JSON renderings of the statistics table

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::ProfilerError;
use crate::metrics::SectionStat;
use crate::timeline::{SectionRecord, TimelineDocument};

const NOT_AVAILABLE: &str = "N/A";

const CSV_HEADER: [&str; 9] = [
    "sectionName",
    "count",
    "totalTime",
    "minTime",
    "maxTime",
    "averageTime",
    "fileName",
    "functionName",
    "lineNumber",
];

/// One line per section, times in milliseconds with six decimals
pub fn format_console_report(stats: &[SectionStat]) -> String {
    let mut out = String::new();
    for stat in stats {
        let _ = writeln!(
            out,
            "Section \"{}\" had {} calls for {:.6}ms; avg={:.6}ms, min={:.6}ms, max={:.6}ms",
            stat.name(),
            stat.count(),
            stat.total_time() * 1000.0,
            stat.avg_time() * 1000.0,
            stat.min_time() * 1000.0,
            stat.max_time() * 1000.0,
        );
    }
    out
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// Exported view of one section. Times are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSection {
    pub section_name: String,
    pub count: u64,
    pub total_time: f64,
    pub min_time: f64,
    pub max_time: f64,
    pub average_time: f64,
    #[serde(default = "not_available")]
    pub file_name: String,
    #[serde(default = "not_available")]
    pub function_name: String,
    #[serde(default)]
    pub line_number: u32,
}

impl From<&SectionStat> for ExportedSection {
    fn from(stat: &SectionStat) -> Self {
        let location = stat.location();
        Self {
            section_name: stat.name().to_string(),
            count: stat.count(),
            total_time: stat.total_time() * 1000.0,
            min_time: stat.min_time() * 1000.0,
            max_time: stat.max_time() * 1000.0,
            average_time: stat.avg_time() * 1000.0,
            file_name: location.map_or_else(not_available, |l| l.file.to_string()),
            function_name: location
                .and_then(|l| l.function)
                .map_or_else(not_available, str::to_string),
            line_number: location.map_or(0, |l| l.line),
        }
    }
}

impl ExportedSection {
    fn key(&self, key: SortKey) -> f64 {
        match key {
            SortKey::AverageTime => self.average_time,
            SortKey::TotalTime => self.total_time,
            SortKey::MinTime => self.min_time,
            SortKey::MaxTime => self.max_time,
            SortKey::Count => self.count as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    AverageTime,
    TotalTime,
    MinTime,
    MaxTime,
    Count,
}

/// The exported `{"sections": [...]}` document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub sections: Vec<ExportedSection>,
}

impl ProfileReport {
    pub fn from_stats(stats: &[SectionStat]) -> Self {
        Self {
            sections: stats.iter().map(ExportedSection::from).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, ProfilerError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a previously exported JSON report
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn section(&self, name: &str) -> Option<&ExportedSection> {
        self.sections.iter().find(|s| s.section_name == name)
    }

    /// Sections with a positive `key`, sorted by it and truncated to `top_n`
    pub fn ranked(&self, key: SortKey, descending: bool, top_n: usize) -> Vec<&ExportedSection> {
        let mut ranked: Vec<_> = self.sections.iter().filter(|s| s.key(key) > 0.0).collect();
        ranked.sort_by(|a, b| {
            let ordering = a.key(key).total_cmp(&b.key(key));
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        ranked.truncate(top_n);
        ranked
    }
}

pub fn write_json(path: &Path, report: &ProfileReport) -> Result<(), ProfilerError> {
    let result = report
        .to_json()
        .and_then(|json| write_atomically(path, |writer| writer.write_all(json.as_bytes())));
    log_outcome("JSON statistics", path, result)
}

pub fn write_csv(path: &Path, report: &ProfileReport) -> Result<(), ProfilerError> {
    let result = write_atomically(path, |writer| {
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv.write_record(CSV_HEADER)?;
        for section in &report.sections {
            csv.serialize(section)?;
        }
        csv.flush()
    });
    log_outcome("CSV statistics", path, result)
}

pub fn write_timeline_json(path: &Path, records: &[SectionRecord]) -> Result<(), ProfilerError> {
    let result = serde_json::to_string_pretty(&TimelineDocument { records })
        .map_err(ProfilerError::from)
        .and_then(|json| write_atomically(path, |writer| writer.write_all(json.as_bytes())));
    log_outcome("Timeline", path, result)
}

fn log_outcome(
    what: &str,
    path: &Path,
    result: Result<(), ProfilerError>,
) -> Result<(), ProfilerError> {
    match &result {
        Ok(()) => info!("{} successfully written to {}", what, path.display()),
        Err(e) => error!("{}", e),
    }
    result
}

/// Write through a sibling temporary file and rename it into place, so the
/// destination is either complete or untouched
fn write_atomically<F>(path: &Path, write: F) -> Result<(), ProfilerError>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let tmp = temp_path(path);

    let outcome = (|| {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        write(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    outcome.map_err(|source| {
        let _ = fs::remove_file(&tmp);
        ProfilerError::io(path, source)
    })
}

/// Unique sibling of `path` for one write: `<path>.<pid>.<seq>.tmp`
fn temp_path(path: &Path) -> PathBuf {
    static NEXT_TEMP: AtomicU64 = AtomicU64::new(0);

    let seq = NEXT_TEMP.fetch_add(1, Ordering::Relaxed);
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.{}.tmp", std::process::id(), seq));
    PathBuf::from(tmp)
}
