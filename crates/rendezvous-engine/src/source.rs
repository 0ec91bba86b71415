//! The calendar fetch capability.
//!
//! Each tenant is reachable only through its own backend and credentials; a
//! [`CalendarSource`] hides that and answers free/busy queries per tenant.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::freebusy::FreeBusyInterval;

/// One free/busy query against a single tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub tenant_id: String,
    pub emails: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// IANA zone the backend should interpret the range in.
    pub time_zone: String,
}

/// Free/busy data for one mailbox as returned by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub email: String,
    /// Per-cell status string (see [`crate::freebusy::FreeBusyStatus::from_code`]).
    #[serde(default)]
    pub availability_view: String,
    /// Explicit intervals; authoritative wherever present.
    #[serde(default)]
    pub schedule_items: Vec<FreeBusyInterval>,
    /// Set when this mailbox's data is unusable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScheduleEntry {
    pub fn new(email: impl Into<String>, availability_view: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            availability_view: availability_view.into(),
            schedule_items: Vec::new(),
            error: None,
        }
    }

    pub fn with_items(mut self, items: Vec<FreeBusyInterval>) -> Self {
        self.schedule_items = items;
        self
    }

    pub fn failed(email: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            availability_view: String::new(),
            schedule_items: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Free/busy lookup for the mailboxes of one tenant.
///
/// Implementations should return one entry per requested email when they
/// can. A whole-call failure is reported as `Err`; a single unusable mailbox
/// as an entry with `error` set.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<ScheduleEntry>, FetchError>;
}

/// A source answering from data held in memory, keyed by tenant id.
#[derive(Debug, Clone, Default)]
pub struct StaticCalendarSource {
    tenants: HashMap<String, Result<Vec<ScheduleEntry>, String>>,
}

impl StaticCalendarSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schedules(mut self, tenant_id: impl Into<String>, entries: Vec<ScheduleEntry>) -> Self {
        self.tenants.insert(tenant_id.into(), Ok(entries));
        self
    }

    /// Make every fetch against `tenant_id` fail with `message`.
    pub fn with_failure(mut self, tenant_id: impl Into<String>, message: impl Into<String>) -> Self {
        self.tenants.insert(tenant_id.into(), Err(message.into()));
        self
    }
}

#[async_trait]
impl CalendarSource for StaticCalendarSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<ScheduleEntry>, FetchError> {
        match self.tenants.get(&request.tenant_id) {
            None => Err(FetchError::UnknownTenant(request.tenant_id.clone())),
            Some(Err(message)) => Err(FetchError::Backend(message.clone())),
            Some(Ok(entries)) => Ok(entries
                .iter()
                .filter(|entry| {
                    request
                        .emails
                        .iter()
                        .any(|email| email.eq_ignore_ascii_case(&entry.email))
                })
                .cloned()
                .collect()),
        }
    }
}
