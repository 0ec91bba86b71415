//! Error types for rendezvous-engine operations.

use std::time::Duration;

use thiserror::Error;

/// Errors reported directly to the caller. Nothing is fetched or scored when
/// one of these is returned.
#[derive(Error, Debug)]
pub enum RendezvousError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid working hours: {0}")]
    InvalidWorkingHours(String),

    #[error("Invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure of a single tenant fetch. These are absorbed into the response's
/// error list and never abort a recommendation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("calendar backend error: {0}")]
    Backend(String),

    #[error("no calendar source for tenant {0}")]
    UnknownTenant(String),

    #[error("fetch timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("fetch task did not complete: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, RendezvousError>;
