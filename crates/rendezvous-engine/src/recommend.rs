//! Per-tenant fetching and response assembly.
//!
//! Accounts are grouped by tenant and each tenant is fetched once, on its own
//! task, with a timeout. Every task reports into its own result slot; slots
//! are merged into a single email lookup only after all tasks finish. A
//! failed tenant becomes an entry in the response's error list and the
//! persons it covered are scored with whatever data remains.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::availability::PersonCalendar;
use crate::config::RecommendConfig;
use crate::error::{FetchError, RendezvousError, Result};
use crate::freebusy::{FreeBusyInterval, Timeline};
use crate::model::Person;
use crate::scorer::{score_slots, Participant, TimeSlot};
use crate::source::{CalendarSource, FetchRequest, ScheduleEntry};
use crate::temporal;

fn default_duration_minutes() -> i64 {
    30
}

/// Input of a recommendation: resolved persons, a range and a duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    pub persons: Vec<Person>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: i64,
    /// Zone passed to calendar backends; the configured default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RecommendRequest {
    pub fn new(
        persons: Vec<Person>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Self {
        Self {
            persons,
            start,
            end,
            duration_minutes,
            time_zone: None,
        }
    }
}

/// A fetch failure surfaced to the caller. `email` is set when a single
/// mailbox failed inside an otherwise successful tenant fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantFetchError {
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub persons_count: usize,
    pub tenants_count: usize,
    pub time_range: TimeRange,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    /// Ranked slots where everyone is free.
    pub recommendations: Vec<TimeSlot>,
    /// Best-ranked slots with at least one conflict.
    pub alternatives_with_conflicts: Vec<TimeSlot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<TenantFetchError>,
    pub meta: ResponseMeta,
}

/// The timeline of one account, labelled with its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSchedule {
    pub person_id: String,
    pub display_name: String,
    pub tenant_id: String,
    pub email: String,
    pub intervals: Vec<FreeBusyInterval>,
}

/// Raw free/busy data for a set of persons, without scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCollection {
    pub schedules: Vec<AccountSchedule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<TenantFetchError>,
}

struct TenantGroup {
    tenant_id: String,
    emails: Vec<String>,
}

/// Group accounts by tenant, in first-seen order, without duplicate emails.
fn group_by_tenant(persons: &[Person]) -> Vec<TenantGroup> {
    let mut groups: Vec<TenantGroup> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for account in persons.iter().flat_map(|p| p.accounts.iter()) {
        if !seen.insert(account.email.to_ascii_lowercase()) {
            continue;
        }
        match groups.iter_mut().find(|g| g.tenant_id == account.tenant_id) {
            Some(group) => group.emails.push(account.email.clone()),
            None => groups.push(TenantGroup {
                tenant_id: account.tenant_id.clone(),
                emails: vec![account.email.clone()],
            }),
        }
    }
    groups
}

type FetchOutcome = std::result::Result<Vec<ScheduleEntry>, FetchError>;

/// Everything gathered from the calendar sources for one request.
struct Collected {
    /// Keyed by lowercase email.
    timelines: HashMap<String, Timeline>,
    errors: Vec<TenantFetchError>,
}

impl Collected {
    fn timeline(&self, email: &str) -> Option<&Timeline> {
        self.timelines.get(&email.to_ascii_lowercase())
    }

    fn calendar_for(&self, person: &Person) -> PersonCalendar {
        PersonCalendar::from_timelines(
            person
                .accounts
                .iter()
                .filter_map(|account| self.timeline(&account.email)),
        )
    }
}

/// Drives fetching and scoring for recommendation requests.
pub struct Recommender {
    source: Arc<dyn CalendarSource>,
    config: RecommendConfig,
}

impl Recommender {
    pub fn new(source: Arc<dyn CalendarSource>) -> Self {
        Self::with_config(source, RecommendConfig::default())
    }

    pub fn with_config(source: Arc<dyn CalendarSource>, config: RecommendConfig) -> Self {
        Self { source, config }
    }

    /// Recommend meeting slots for everyone in `request`.
    ///
    /// Validation failures are returned as errors before anything is fetched.
    /// Fetch failures never are: they appear in the response's `errors`.
    pub async fn recommend(&self, request: &RecommendRequest) -> Result<RecommendationResponse> {
        if request.duration_minutes <= 0 {
            return Err(RendezvousError::InvalidRequest(format!(
                "duration must be positive, got {} minutes",
                request.duration_minutes
            )));
        }
        let time_zone = self.validate(
            &request.persons,
            request.start,
            request.end,
            request.time_zone.as_deref(),
        )?;

        let groups = group_by_tenant(&request.persons);
        let collected = self
            .fetch_all(&groups, request.start, request.end, &time_zone)
            .await;

        let participants = request
            .persons
            .iter()
            .map(|person| Participant::new(person, collected.calendar_for(person)))
            .collect::<Result<Vec<_>>>()?;

        let ranked = score_slots(
            request.start,
            request.end,
            request.duration_minutes,
            &participants,
            &self.config,
        );

        let (recommendations, conflicted): (Vec<TimeSlot>, Vec<TimeSlot>) =
            ranked.into_iter().partition(|slot| slot.all_available);
        let alternatives_with_conflicts: Vec<TimeSlot> = conflicted
            .into_iter()
            .take(self.config.max_alternatives)
            .collect();

        info!(
            persons = request.persons.len(),
            tenants = groups.len(),
            recommendations = recommendations.len(),
            alternatives = alternatives_with_conflicts.len(),
            errors = collected.errors.len(),
            "recommendation complete"
        );

        Ok(RecommendationResponse {
            recommendations,
            alternatives_with_conflicts,
            errors: collected.errors,
            meta: ResponseMeta {
                persons_count: request.persons.len(),
                tenants_count: groups.len(),
                time_range: TimeRange {
                    start: request.start,
                    end: request.end,
                },
                duration_minutes: request.duration_minutes,
            },
        })
    }

    /// Fetch the free/busy timeline of every account held by `persons`.
    pub async fn collect_schedules(
        &self,
        persons: &[Person],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        time_zone: Option<&str>,
    ) -> Result<ScheduleCollection> {
        let time_zone = self.validate(persons, start, end, time_zone)?;
        let groups = group_by_tenant(persons);
        let collected = self.fetch_all(&groups, start, end, &time_zone).await;

        let mut schedules = Vec::new();
        for person in persons {
            for account in &person.accounts {
                if let Some(timeline) = collected.timeline(&account.email) {
                    schedules.push(AccountSchedule {
                        person_id: person.id.clone(),
                        display_name: person.display_name.clone(),
                        tenant_id: account.tenant_id.clone(),
                        email: account.email.clone(),
                        intervals: timeline.intervals.clone(),
                    });
                }
            }
        }

        Ok(ScheduleCollection {
            schedules,
            errors: collected.errors,
        })
    }

    /// Check persons, range and zone; returns the zone to hand to backends.
    fn validate(
        &self,
        persons: &[Person],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        time_zone: Option<&str>,
    ) -> Result<String> {
        if persons.is_empty() {
            return Err(RendezvousError::InvalidRequest(
                "at least one person is required".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for person in persons {
            if !ids.insert(person.id.as_str()) {
                return Err(RendezvousError::InvalidRequest(format!(
                    "duplicate person id: {}",
                    person.id
                )));
            }
            person.validate()?;
        }

        if end <= start {
            return Err(RendezvousError::InvalidRequest(format!(
                "range end {} is not after start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        if end - start > Duration::days(i64::from(self.config.max_range_days)) {
            return Err(RendezvousError::InvalidRequest(format!(
                "range exceeds {} days",
                self.config.max_range_days
            )));
        }

        let time_zone = time_zone.unwrap_or(&self.config.default_time_zone);
        temporal::parse_time_zone(time_zone)?;
        Ok(time_zone.to_string())
    }

    /// Run one fetch per tenant concurrently and merge the results.
    async fn fetch_all(
        &self,
        groups: &[TenantGroup],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        time_zone: &str,
    ) -> Collected {
        let timeout = self.config.fetch_timeout();

        // Dropping the set aborts outstanding fetches, so a cancelled request
        // never merges partial results.
        let mut set: JoinSet<(usize, FetchOutcome)> = JoinSet::new();
        for (index, group) in groups.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let request = FetchRequest {
                tenant_id: group.tenant_id.clone(),
                emails: group.emails.clone(),
                start,
                end,
                time_zone: time_zone.to_string(),
            };
            debug!(
                tenant = %group.tenant_id,
                emails = group.emails.len(),
                "fetching free/busy"
            );
            set.spawn(async move {
                let outcome = match tokio::time::timeout(timeout, source.fetch(&request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(FetchError::Timeout(timeout)),
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<FetchOutcome>> = groups.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!(error = %e, "free/busy fetch task failed"),
            }
        }

        let mut collected = Collected {
            timelines: HashMap::new(),
            errors: Vec::new(),
        };
        for (group, slot) in groups.iter().zip(slots) {
            let outcome = slot.unwrap_or_else(|| {
                Err(FetchError::Task("task panicked or was aborted".to_string()))
            });
            match outcome {
                Ok(entries) => self.merge_entries(group, entries, start, &mut collected),
                Err(e) => {
                    warn!(tenant = %group.tenant_id, error = %e, "tenant fetch failed");
                    collected.errors.push(TenantFetchError {
                        tenant_id: group.tenant_id.clone(),
                        email: None,
                        error: e.to_string(),
                    });
                }
            }
        }
        collected
    }

    fn merge_entries(
        &self,
        group: &TenantGroup,
        entries: Vec<ScheduleEntry>,
        range_start: DateTime<Utc>,
        collected: &mut Collected,
    ) {
        for entry in entries {
            if !group
                .emails
                .iter()
                .any(|email| email.eq_ignore_ascii_case(&entry.email))
            {
                debug!(tenant = %group.tenant_id, email = %entry.email, "ignoring unrequested mailbox");
                continue;
            }
            if let Some(error) = entry.error {
                warn!(tenant = %group.tenant_id, email = %entry.email, %error, "mailbox fetch failed");
                collected.errors.push(TenantFetchError {
                    tenant_id: group.tenant_id.clone(),
                    email: Some(entry.email),
                    error,
                });
                continue;
            }

            let timeline = Timeline::from_sources(
                entry.email.as_str(),
                &entry.availability_view,
                &entry.schedule_items,
                range_start,
                self.config.granularity_minutes,
            );
            collected
                .timelines
                .insert(entry.email.to_ascii_lowercase(), timeline);
        }

        let missing = group
            .emails
            .iter()
            .filter(|email| !collected.timelines.contains_key(&email.to_ascii_lowercase()))
            .count();
        if missing > 0 {
            debug!(tenant = %group.tenant_id, missing, "mailboxes without usable free/busy data");
        }
    }
}
