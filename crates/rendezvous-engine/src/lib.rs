//! # rendezvous-engine
//!
//! Meeting time recommendation across independent calendar tenants.
//!
//! Participants may hold accounts in several organisations, each reachable
//! only through its own calendar backend. The engine fetches free/busy data
//! per tenant (tolerating failures), decodes it, and scores fixed-size
//! candidate slots against every participant's availability and working-hour
//! preferences in their own time zone.
//!
//! ## Modules
//!
//! - [`model`] — Person, account and working-hour value objects
//! - [`freebusy`] — Status string decoding and per-account timelines
//! - [`availability`] — Per-person busy/free answers across many accounts
//! - [`preference`] — Working-hour desirability tiers
//! - [`scorer`] — Candidate slot enumeration, scoring and ranking
//! - [`source`] — The calendar fetch capability
//! - [`recommend`] — Per-tenant fetching and response assembly
//! - [`temporal`] — Time zone conversion and local-time formatting
//! - [`config`] — Tunables loadable from TOML
//! - [`error`] — Error types

pub mod availability;
pub mod config;
pub mod error;
pub mod freebusy;
pub mod model;
pub mod preference;
pub mod recommend;
pub mod scorer;
pub mod source;
pub mod temporal;

pub use availability::{schedule_context, PersonCalendar, SlotAvailability};
pub use config::RecommendConfig;
pub use error::{FetchError, RendezvousError};
pub use freebusy::{decode_status_string, FreeBusyInterval, FreeBusyStatus, Timeline};
pub use model::{
    Account, Flexibility, Person, PersonDirectory, TimeOfDay, WorkingHours, WorkingWindow,
};
pub use preference::{classify, TimeTier};
pub use recommend::{
    AccountSchedule, RecommendRequest, RecommendationResponse, Recommender, ResponseMeta,
    ScheduleCollection, TenantFetchError, TimeRange,
};
pub use scorer::{score_slots, Participant, SlotDetail, TimeSlot};
pub use source::{CalendarSource, FetchRequest, ScheduleEntry, StaticCalendarSource};
