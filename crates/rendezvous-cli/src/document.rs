//! The JSON request document read by `recommend` and `availability`.
//!
//! ```json
//! {
//!   "persons": [ { "id": "alice", "displayName": "Alice", "timezone": "UTC",
//!                  "accounts": [ { "email": "alice@north.test", "tenantId": "north" } ] } ],
//!   "start": "2026-03-16T09:00:00Z",
//!   "end": "2026-03-16T12:00:00Z",
//!   "durationMinutes": 30,
//!   "calendars": {
//!     "north": { "schedules": [ { "email": "alice@north.test", "availabilityView": "002200" } ] },
//!     "south": { "error": "invalid client secret" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use rendezvous_engine::{RecommendRequest, ScheduleEntry, StaticCalendarSource};
use serde::Deserialize;

/// Free/busy answer of one tenant: either schedules or a failure message.
#[derive(Debug, Default, Deserialize)]
pub struct TenantCalendar {
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RequestDocument {
    #[serde(flatten)]
    pub request: RecommendRequest,
    #[serde(default)]
    pub calendars: BTreeMap<String, TenantCalendar>,
}

impl RequestDocument {
    /// Split into the engine request and a source serving the inline calendars.
    pub fn into_parts(self) -> (RecommendRequest, StaticCalendarSource) {
        let source = self
            .calendars
            .into_iter()
            .fold(StaticCalendarSource::new(), |source, (tenant, calendar)| {
                match calendar.error {
                    Some(message) => source.with_failure(tenant, message),
                    None => source.with_schedules(tenant, calendar.schedules),
                }
            });
        (self.request, source)
    }
}
