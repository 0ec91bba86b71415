//! Per-person availability across every account the person holds.
//!
//! One human may sit behind several calendars in different tenants. Their
//! busy periods are OR'd together: a conflict in any account makes the
//! person unavailable. Accounts with no fetched data contribute nothing, so a
//! person without timelines is always free.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::freebusy::{merge_periods, FreeBusyStatus, Timeline};
use crate::temporal::{local_clock, round_minutes};

/// Remaining busy time at or below which the context counts down minutes.
const ENDS_SOON_MINUTES: i64 = 60;
/// Gap to the next conflict at or below which it is called out in minutes.
const NEXT_MEETING_SOON_MINUTES: i64 = 30;
/// Gap to the next conflict beyond which it is not mentioned at all.
const FREE_UNTIL_HORIZON_MINUTES: i64 = 120;

/// Busy/free answer for one person over one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotAvailability {
    pub is_busy: bool,
    /// End of the busy block overlapping the slot, when busy.
    pub busy_until: Option<DateTime<Utc>>,
    /// Start of the earliest busy block after the slot, when free.
    pub next_busy: Option<DateTime<Utc>>,
    /// Some account reported an unrecognised status during the slot.
    pub unknown: bool,
}

/// Merged busy and unknown periods for one person.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonCalendar {
    busy: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    unknown: Vec<(DateTime<Utc>, DateTime<Utc>)>,
}

impl PersonCalendar {
    /// A calendar with no conflicts at all.
    pub fn free() -> Self {
        Self::default()
    }

    /// Merge the timelines of every account belonging to one person.
    pub fn from_timelines<'a>(timelines: impl IntoIterator<Item = &'a Timeline>) -> Self {
        let mut busy = Vec::new();
        let mut unknown = Vec::new();
        for interval in timelines.into_iter().flat_map(|t| t.intervals.iter()) {
            if interval.status.is_busy() {
                busy.push((interval.start, interval.end));
            } else if interval.status == FreeBusyStatus::Unknown {
                unknown.push((interval.start, interval.end));
            }
        }
        Self {
            busy: merge_periods(busy),
            unknown: merge_periods(unknown),
        }
    }

    /// Merged busy blocks, sorted by start.
    pub fn busy_periods(&self) -> &[(DateTime<Utc>, DateTime<Utc>)] {
        &self.busy
    }

    /// Evaluate the slot `[slot_start, slot_end)`.
    pub fn check(&self, slot_start: DateTime<Utc>, slot_end: DateTime<Utc>) -> SlotAvailability {
        // Busy blocks are merged and sorted, so the first overlap is the
        // earliest one and the first block starting after the slot is the
        // next conflict.
        if let Some(&(_, end)) = self
            .busy
            .iter()
            .find(|&&(start, end)| start < slot_end && slot_start < end)
        {
            return SlotAvailability {
                is_busy: true,
                busy_until: Some(end),
                next_busy: None,
                unknown: false,
            };
        }

        let next_busy = self
            .busy
            .iter()
            .find(|&&(start, _)| start >= slot_end)
            .map(|&(start, _)| start);
        let unknown = self
            .unknown
            .iter()
            .any(|&(start, end)| start < slot_end && slot_start < end);

        SlotAvailability {
            is_busy: false,
            busy_until: None,
            next_busy,
            unknown,
        }
    }
}

/// Human-readable context for a slot, rendered in the person's time zone.
///
/// - busy, ending within an hour of the slot start: `"Meeting ends in N min"`
/// - busy otherwise: `"Busy until HH:MM"`
/// - free with unrecognised status data: `"Availability unknown"`
/// - free, next conflict within 30 min after the slot: `"Next meeting in N min"`
/// - free, next conflict 30–120 min after the slot: `"Free until HH:MM"`
/// - anything further away: no context
pub fn schedule_context(
    availability: &SlotAvailability,
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
    tz: Tz,
) -> Option<String> {
    if availability.is_busy {
        let until = availability.busy_until?;
        let remaining = round_minutes(until - slot_start);
        return Some(if remaining > 0 && remaining <= ENDS_SOON_MINUTES {
            format!("Meeting ends in {} min", remaining)
        } else {
            format!("Busy until {}", local_clock(until, tz))
        });
    }

    if availability.unknown {
        return Some("Availability unknown".to_string());
    }

    let next = availability.next_busy?;
    let gap = round_minutes(next - slot_end);
    if (0..=NEXT_MEETING_SOON_MINUTES).contains(&gap) {
        Some(format!("Next meeting in {} min", gap))
    } else if gap > NEXT_MEETING_SOON_MINUTES && gap <= FREE_UNTIL_HORIZON_MINUTES {
        Some(format!("Free until {}", local_clock(next, tz)))
    } else {
        None
    }
}
