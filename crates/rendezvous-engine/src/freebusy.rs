//! Free/busy timelines for a single calendar account.
//!
//! Backends summarise an account as a compact status string with one
//! character per fixed-size cell (`"0022"` = free, free, busy, busy), and may
//! also return explicit intervals. Decoding never fails: characters outside
//! the status table become [`FreeBusyStatus::Unknown`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Status of one free/busy interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FreeBusyStatus {
    Free,
    Tentative,
    Busy,
    #[serde(rename = "oof")]
    OutOfOffice,
    WorkingElsewhere,
    Unknown,
}

impl FreeBusyStatus {
    /// Map one status-string character.
    ///
    /// `4` (working elsewhere) is reported as `Busy`; the string encoding
    /// does not distinguish the two for availability.
    pub fn from_code(code: char) -> Self {
        match code {
            '0' => FreeBusyStatus::Free,
            '1' => FreeBusyStatus::Tentative,
            '2' | '4' => FreeBusyStatus::Busy,
            '3' => FreeBusyStatus::OutOfOffice,
            _ => FreeBusyStatus::Unknown,
        }
    }

    /// Map a backend status label (case-insensitive). Unrecognised labels
    /// become `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "free" => FreeBusyStatus::Free,
            "tentative" => FreeBusyStatus::Tentative,
            "busy" => FreeBusyStatus::Busy,
            "oof" | "outofoffice" | "out-of-office" => FreeBusyStatus::OutOfOffice,
            "workingelsewhere" | "working-elsewhere" => FreeBusyStatus::WorkingElsewhere,
            _ => FreeBusyStatus::Unknown,
        }
    }

    /// Whether this status blocks a meeting.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            FreeBusyStatus::Busy | FreeBusyStatus::OutOfOffice | FreeBusyStatus::WorkingElsewhere
        )
    }
}

impl<'de> Deserialize<'de> for FreeBusyStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(FreeBusyStatus::from_label(&label))
    }
}

/// A half-open interval `[start, end)` with a single status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeBusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: FreeBusyStatus,
}

impl FreeBusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, status: FreeBusyStatus) -> Self {
        Self { start, end, status }
    }

    /// True when this interval shares any time with `[start, end)`.
    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

/// Decode a status string into contiguous intervals starting at `range_start`.
///
/// The result covers exactly `[range_start, range_start + len * interval)`,
/// one interval per character. A zero interval yields no intervals.
pub fn decode_status_string(
    view: &str,
    range_start: DateTime<Utc>,
    interval_minutes: u32,
) -> Vec<FreeBusyInterval> {
    if interval_minutes == 0 {
        return Vec::new();
    }
    let cell = Duration::minutes(i64::from(interval_minutes));

    let mut cursor = range_start;
    view.chars()
        .map(|code| {
            let start = cursor;
            cursor = start + cell;
            FreeBusyInterval::new(start, cursor, FreeBusyStatus::from_code(code))
        })
        .collect()
}

/// The free/busy timeline of one account over the queried range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub email: String,
    pub intervals: Vec<FreeBusyInterval>,
}

impl Timeline {
    pub fn new(email: impl Into<String>, intervals: Vec<FreeBusyInterval>) -> Self {
        Self {
            email: email.into(),
            intervals,
        }
    }

    /// Build a timeline from a status string plus explicit intervals.
    ///
    /// Explicit intervals define the status wherever they are present;
    /// decoded cells only survive on the parts of the range that no explicit
    /// interval covers. The result is ordered and non-overlapping.
    pub fn from_sources(
        email: impl Into<String>,
        view: &str,
        explicit: &[FreeBusyInterval],
        range_start: DateTime<Utc>,
        interval_minutes: u32,
    ) -> Self {
        let decoded = decode_status_string(view, range_start, interval_minutes);
        let intervals = if explicit.is_empty() {
            decoded
        } else {
            overlay(decoded, explicit)
        };
        Self::new(email, intervals)
    }

    /// Merged busy periods of this timeline.
    pub fn busy_periods(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        merge_periods(
            self.intervals
                .iter()
                .filter(|i| i.status.is_busy())
                .map(|i| (i.start, i.end)),
        )
    }
}

/// Replace decoded cells by explicit intervals wherever the latter exist.
///
/// Explicit intervals that overlap each other are resolved busy-class first,
/// then by start time; later ones only keep the time nobody claimed yet.
fn overlay(decoded: Vec<FreeBusyInterval>, explicit: &[FreeBusyInterval]) -> Vec<FreeBusyInterval> {
    let mut explicit: Vec<&FreeBusyInterval> = explicit.iter().filter(|i| i.start < i.end).collect();
    explicit.sort_by_key(|i| (!i.status.is_busy(), i.start, i.end));

    let mut out = Vec::new();
    let mut covered: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
    for interval in explicit {
        for (start, end) in uncovered(interval.start, interval.end, &covered) {
            out.push(FreeBusyInterval::new(start, end, interval.status));
        }
        covered.push((interval.start, interval.end));
        covered = merge_periods(covered);
    }
    for cell in decoded {
        for (start, end) in uncovered(cell.start, cell.end, &covered) {
            out.push(FreeBusyInterval::new(start, end, cell.status));
        }
    }

    out.sort_by_key(|i| (i.start, i.end));
    out
}

/// Parts of `[start, end)` outside every period in `covered`, which must be
/// sorted and disjoint.
fn uncovered(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    covered: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut pieces = Vec::new();
    let mut cursor = start;
    for &(cov_start, cov_end) in covered {
        if cov_end <= cursor {
            continue;
        }
        if cov_start >= end {
            break;
        }
        if cov_start > cursor {
            pieces.push((cursor, cov_start));
        }
        cursor = cursor.max(cov_end);
        if cursor >= end {
            break;
        }
    }
    if cursor < end {
        pieces.push((cursor, end));
    }
    pieces
}

/// Merge overlapping or adjacent periods.
///
/// Returns a sorted, non-overlapping list of (start, end) intervals. Empty
/// or inverted periods are discarded.
pub fn merge_periods(
    periods: impl IntoIterator<Item = (DateTime<Utc>, DateTime<Utc>)>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)> =
        periods.into_iter().filter(|(s, e)| s < e).collect();

    // Sort by start time (then by end time for stability).
    intervals.sort_by_key(|&(start, end)| (start, end));

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }

    merged
}
