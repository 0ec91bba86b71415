//! Candidate slot enumeration, scoring and ranking.
//!
//! Slots of the requested duration start at `range_start` and advance by a
//! fixed step (independent of the duration) while they still fit inside the
//! range. Each slot starts from [`BASE_SCORE`], gains or loses each
//! participant's [`TimeTier`] contribution, and is pushed down by
//! [`CONFLICT_PENALTY`] when anyone is busy. Conflicted slots stay in the
//! ranking as fallbacks.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::availability::{schedule_context, PersonCalendar};
use crate::config::RecommendConfig;
use crate::error::Result;
use crate::model::Person;
use crate::preference::{classify, TimeTier};
use crate::temporal::{local_clock, local_stamp, local_weekday_and_time};

/// Starting score of every slot.
pub const BASE_SCORE: i32 = 100;
/// Subtracted once from a slot where at least one participant is busy.
pub const CONFLICT_PENALTY: i32 = 500;

/// One participant's view of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDetail {
    pub person_id: String,
    pub display_name: String,
    /// Slot start in the participant's zone, e.g. "Mon, Mar 16, 09:00".
    pub local_time: String,
    pub status: TimeTier,
    pub is_busy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_until: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_busy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_context: Option<String>,
}

/// A scored candidate meeting slot `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub score: i32,
    pub all_available: bool,
    pub details: Vec<SlotDetail>,
}

/// A person prepared for scoring: parsed zone plus merged calendar.
#[derive(Debug, Clone)]
pub struct Participant<'a> {
    pub person: &'a Person,
    pub tz: Tz,
    pub calendar: PersonCalendar,
}

impl<'a> Participant<'a> {
    pub fn new(person: &'a Person, calendar: PersonCalendar) -> Result<Self> {
        Ok(Self {
            person,
            tz: person.tz()?,
            calendar,
        })
    }
}

/// Score every candidate slot in `[range_start, range_end)` and return the
/// best `config.max_results`, highest score first.
///
/// Ties keep chronological order. A non-positive duration, an empty range or
/// a duration longer than the range yields no slots.
pub fn score_slots(
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    duration_minutes: i64,
    participants: &[Participant<'_>],
    config: &RecommendConfig,
) -> Vec<TimeSlot> {
    if duration_minutes <= 0 || range_end <= range_start || config.slot_step_minutes == 0 {
        return Vec::new();
    }
    let Some(duration) = Duration::try_minutes(duration_minutes) else {
        return Vec::new();
    };
    let step = Duration::minutes(i64::from(config.slot_step_minutes));

    let mut slots = Vec::new();
    let mut start = range_start;
    while let Some(end) = start.checked_add_signed(duration) {
        if end > range_end {
            break;
        }
        slots.push(score_slot(start, end, participants));
        match start.checked_add_signed(step) {
            Some(next) => start = next,
            None => break,
        }
    }

    // Stable: equal scores stay in generation (chronological) order.
    slots.sort_by(|a, b| b.score.cmp(&a.score));
    slots.truncate(config.max_results);
    slots
}

fn score_slot(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    participants: &[Participant<'_>],
) -> TimeSlot {
    let mut score = BASE_SCORE;
    let mut all_available = true;
    let mut details = Vec::with_capacity(participants.len());

    for participant in participants {
        let person = participant.person;
        let (weekday, time) = local_weekday_and_time(start, participant.tz);
        let tier = classify(
            time,
            person.working_hours.for_weekday(weekday),
            person.flexibility,
        );
        score += tier.score();

        let availability = participant.calendar.check(start, end);
        if availability.is_busy {
            all_available = false;
        }

        details.push(SlotDetail {
            person_id: person.id.clone(),
            display_name: person.display_name.clone(),
            local_time: local_stamp(start, participant.tz),
            status: tier,
            is_busy: availability.is_busy,
            busy_until: availability
                .busy_until
                .map(|t| local_clock(t, participant.tz)),
            next_busy: availability
                .next_busy
                .map(|t| local_clock(t, participant.tz)),
            schedule_context: schedule_context(&availability, start, end, participant.tz),
        });
    }

    if !all_available {
        score -= CONFLICT_PENALTY;
    }

    TimeSlot {
        start,
        end,
        score,
        all_available,
        details,
    }
}
