//! Person, account and working-hour value objects.
//!
//! Persistence lives elsewhere; the engine only ever sees an immutable
//! snapshot of these records per request.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RendezvousError, Result};
use crate::temporal;

/// Day keys accepted in a working-hours mapping, Monday first.
pub const WEEKDAY_KEYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Lowercase English name used as the working-hours key for `day`.
pub fn weekday_key(day: Weekday) -> &'static str {
    WEEKDAY_KEYS[day.num_days_from_monday() as usize]
}

// ---------------------------------------------------------------------------
// TimeOfDay
// ---------------------------------------------------------------------------

/// Local wall-clock time as minutes since midnight, `00:00` through `24:00`.
///
/// `24:00` is only meaningful as the end of a working window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(24 * 60);

    /// Build from hour and minute, rejecting anything past `24:00`.
    pub fn from_hm(hour: u16, minute: u16) -> Result<Self> {
        if minute >= 60 || hour > 24 || (hour == 24 && minute != 0) {
            return Err(RendezvousError::InvalidTimeOfDay(format!(
                "{:02}:{:02}",
                hour, minute
            )));
        }
        Ok(TimeOfDay(hour * 60 + minute))
    }

    pub(crate) const fn hm(hour: u16, minute: u16) -> Self {
        TimeOfDay(hour * 60 + minute)
    }

    pub const fn minutes(self) -> u16 {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = RendezvousError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RendezvousError::InvalidTimeOfDay(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u16 = h.parse().map_err(|_| invalid())?;
        let minute: u16 = m.parse().map_err(|_| invalid())?;
        TimeOfDay::from_hm(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Working hours
// ---------------------------------------------------------------------------

/// One contiguous block of working time within a day, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl WorkingWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Parse a window from two `"HH:MM"` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self::new(start.parse()?, end.parse()?))
    }

    pub fn contains(&self, time: TimeOfDay) -> bool {
        self.start <= time && time < self.end
    }
}

/// Weekday name → ordered working windows. Days absent from the map have no
/// working hours at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkingHours(BTreeMap<String, Vec<WorkingWindow>>);

impl WorkingHours {
    /// No working hours on any day.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Monday through Friday 09:00–17:00; Saturday and Sunday present but empty.
    pub fn standard() -> Self {
        let nine_to_five = WorkingWindow::new(TimeOfDay::hm(9, 0), TimeOfDay::hm(17, 0));
        let mut days = BTreeMap::new();
        for key in &WEEKDAY_KEYS[..5] {
            days.insert(key.to_string(), vec![nine_to_five]);
        }
        for key in &WEEKDAY_KEYS[5..] {
            days.insert(key.to_string(), Vec::new());
        }
        WorkingHours(days)
    }

    /// Replace the windows for one weekday.
    pub fn with_day(mut self, day: Weekday, windows: Vec<WorkingWindow>) -> Self {
        self.0.insert(weekday_key(day).to_string(), windows);
        self
    }

    /// Remove a weekday from the mapping entirely.
    pub fn without_day(mut self, day: Weekday) -> Self {
        self.0.remove(weekday_key(day));
        self
    }

    /// Windows for `day`; an absent day yields an empty slice.
    pub fn for_weekday(&self, day: Weekday) -> &[WorkingWindow] {
        self.0
            .get(weekday_key(day))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Check day keys, window bounds, and that windows within a day are disjoint.
    pub fn validate(&self) -> Result<()> {
        for (day, windows) in &self.0 {
            if !WEEKDAY_KEYS.contains(&day.as_str()) {
                return Err(RendezvousError::InvalidWorkingHours(format!(
                    "unknown weekday '{}'",
                    day
                )));
            }

            let mut sorted = windows.clone();
            sorted.sort_by_key(|w| w.start);
            for w in &sorted {
                if w.start >= w.end {
                    return Err(RendezvousError::InvalidWorkingHours(format!(
                        "{}: window {}-{} ends before it starts",
                        day, w.start, w.end
                    )));
                }
            }
            for pair in sorted.windows(2) {
                if pair[1].start < pair[0].end {
                    return Err(RendezvousError::InvalidWorkingHours(format!(
                        "{}: windows {}-{} and {}-{} overlap",
                        day, pair[0].start, pair[0].end, pair[1].start, pair[1].end
                    )));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Person / Account
// ---------------------------------------------------------------------------

/// How out-of-hours time is treated when scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flexibility {
    Low,
    #[default]
    Medium,
    High,
}

/// One calendar identity, scoped to exactly one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub email: String,
    pub tenant_id: String,
}

impl Account {
    pub fn new(email: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            tenant_id: tenant_id.into(),
        }
    }
}

/// A participant together with every account they hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub display_name: String,
    /// IANA time zone name, e.g. "Europe/Berlin".
    #[serde(rename = "timezone")]
    pub time_zone: String,
    #[serde(default)]
    pub flexibility: Flexibility,
    #[serde(default = "WorkingHours::standard")]
    pub working_hours: WorkingHours,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

impl Person {
    /// A person with the standard working week, medium flexibility and no accounts.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        time_zone: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            time_zone: time_zone.into(),
            flexibility: Flexibility::default(),
            working_hours: WorkingHours::standard(),
            accounts: Vec::new(),
        }
    }

    pub fn with_flexibility(mut self, flexibility: Flexibility) -> Self {
        self.flexibility = flexibility;
        self
    }

    pub fn with_working_hours(mut self, working_hours: WorkingHours) -> Self {
        self.working_hours = working_hours;
        self
    }

    pub fn with_account(mut self, email: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        self.accounts.push(Account::new(email, tenant_id));
        self
    }

    pub fn tz(&self) -> Result<Tz> {
        temporal::parse_time_zone(&self.time_zone)
    }

    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        self.working_hours.validate().map_err(|e| match e {
            RendezvousError::InvalidWorkingHours(msg) => {
                RendezvousError::InvalidWorkingHours(format!("person {}: {}", self.id, msg))
            }
            other => other,
        })
    }
}

/// Read-only lookup of persons by id.
#[derive(Debug, Clone, Default)]
pub struct PersonDirectory {
    persons: HashMap<String, Person>,
}

impl PersonDirectory {
    pub fn new(persons: impl IntoIterator<Item = Person>) -> Self {
        Self {
            persons: persons.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Person> {
        self.persons.get(id)
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    /// Resolve `ids` in the order given. Every missing id is named in one error.
    pub fn resolve<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Person>> {
        if ids.is_empty() {
            return Err(RendezvousError::InvalidRequest(
                "at least one person id is required".to_string(),
            ));
        }

        let missing: Vec<&str> = ids
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| !self.persons.contains_key(*id))
            .collect();
        if !missing.is_empty() {
            return Err(RendezvousError::InvalidRequest(format!(
                "persons not found: {}",
                missing.join(", ")
            )));
        }

        Ok(ids
            .iter()
            .filter_map(|id| self.persons.get(id.as_ref()).cloned())
            .collect())
    }
}
