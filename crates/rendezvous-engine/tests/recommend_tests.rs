//! Tests for per-tenant fetching and response assembly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc, Weekday};
use rendezvous_engine::{
    CalendarSource, FetchError, FetchRequest, Flexibility, FreeBusyInterval, FreeBusyStatus,
    Person, RecommendConfig, RecommendRequest, Recommender, RendezvousError, ScheduleEntry,
    StaticCalendarSource, WorkingHours,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

/// 2026-03-16 is a Monday.
fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, h, m, 0).unwrap()
}

fn alice() -> Person {
    Person::new("alice", "Alice", "UTC")
        .with_flexibility(Flexibility::Low)
        .with_account("alice@north.test", "north")
}

fn bob() -> Person {
    Person::new("bob", "Bob", "UTC")
        .with_flexibility(Flexibility::Low)
        .with_account("bob@south.test", "south")
}

/// A morning request 09:00-12:00 for 30 minute meetings.
fn morning(persons: Vec<Person>) -> RecommendRequest {
    RecommendRequest::new(persons, at(9, 0), at(12, 0), 30)
}

fn recommender(source: impl CalendarSource + 'static) -> Recommender {
    Recommender::new(Arc::new(source))
}

/// Source that records how many fetches it served and never answers for
/// tenant "slow".
#[derive(Default)]
struct CountingSource {
    calls: AtomicUsize,
    inner: StaticCalendarSource,
}

#[async_trait]
impl CalendarSource for CountingSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<ScheduleEntry>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.tenant_id == "slow" {
            tokio::time::sleep(StdDuration::from_secs(3600)).await;
        }
        self.inner.fetch(request).await
    }
}

/// Source that panics for every fetch.
struct PanickingSource;

#[async_trait]
impl CalendarSource for PanickingSource {
    async fn fetch(&self, _request: &FetchRequest) -> Result<Vec<ScheduleEntry>, FetchError> {
        panic!("backend client exploded");
    }
}

// ── Happy path ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn everyone_free_yields_only_recommendations() {
    let source = StaticCalendarSource::new()
        .with_schedules("north", vec![ScheduleEntry::new("alice@north.test", "000000")])
        .with_schedules("south", vec![ScheduleEntry::new("bob@south.test", "000000")]);

    let response = recommender(source)
        .recommend(&morning(vec![alice(), bob()]))
        .await
        .unwrap();

    assert_eq!(response.recommendations.len(), 6);
    assert!(response.alternatives_with_conflicts.is_empty());
    assert!(response.errors.is_empty());
    assert_eq!(response.meta.persons_count, 2);
    assert_eq!(response.meta.tenants_count, 2);
    assert_eq!(response.meta.duration_minutes, 30);
    assert_eq!(response.meta.time_range.start, at(9, 0));

    // Core slots (10:00 onwards) outrank the 09:xx edge slots.
    assert_eq!(response.recommendations[0].start, at(10, 0));
    assert_eq!(response.recommendations[0].score, 140);
}

#[tokio::test]
async fn conflicts_are_split_into_alternatives() {
    // Alice busy 10:00-11:00.
    let source = StaticCalendarSource::new()
        .with_schedules("north", vec![ScheduleEntry::new("alice@north.test", "002200")])
        .with_schedules("south", vec![ScheduleEntry::new("bob@south.test", "000000")]);

    let response = recommender(source)
        .recommend(&morning(vec![alice(), bob()]))
        .await
        .unwrap();

    assert_eq!(response.recommendations.len(), 4);
    assert!(response.recommendations.iter().all(|s| s.all_available));
    assert_eq!(response.alternatives_with_conflicts.len(), 2);
    assert!(response
        .alternatives_with_conflicts
        .iter()
        .all(|s| !s.all_available));
    assert_eq!(response.alternatives_with_conflicts[0].start, at(10, 0));
    assert_eq!(response.alternatives_with_conflicts[1].start, at(10, 30));
}

#[tokio::test]
async fn alternatives_are_capped() {
    // Alice busy all day: every slot is conflicted.
    let source = StaticCalendarSource::new()
        .with_schedules("north", vec![ScheduleEntry::new("alice@north.test", "222222")]);

    let response = recommender(source)
        .recommend(&morning(vec![alice()]))
        .await
        .unwrap();

    assert!(response.recommendations.is_empty());
    assert_eq!(response.alternatives_with_conflicts.len(), 5);
    let scores: Vec<i32> = response
        .alternatives_with_conflicts
        .iter()
        .map(|s| s.score)
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn accounts_in_several_tenants_are_ored() {
    let carol = Person::new("carol", "Carol", "UTC")
        .with_account("carol@north.test", "north")
        .with_account("carol@south.test", "south");
    let source = StaticCalendarSource::new()
        .with_schedules("north", vec![ScheduleEntry::new("carol@north.test", "000000")])
        .with_schedules("south", vec![ScheduleEntry::new("carol@south.test", "000020")]);

    let response = recommender(source)
        .recommend(&morning(vec![carol]))
        .await
        .unwrap();

    assert_eq!(response.meta.tenants_count, 2);
    assert_eq!(response.alternatives_with_conflicts.len(), 1);
    assert_eq!(response.alternatives_with_conflicts[0].start, at(11, 0));
}

#[tokio::test]
async fn explicit_items_take_precedence_over_the_view() {
    let entry = ScheduleEntry::new("alice@north.test", "000000").with_items(vec![
        FreeBusyInterval::new(at(11, 30), at(12, 0), FreeBusyStatus::OutOfOffice),
    ]);
    let source = StaticCalendarSource::new().with_schedules("north", vec![entry]);

    let response = recommender(source)
        .recommend(&morning(vec![alice()]))
        .await
        .unwrap();

    assert_eq!(response.alternatives_with_conflicts.len(), 1);
    assert_eq!(response.alternatives_with_conflicts[0].start, at(11, 30));
}

// ── Failures ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_tenant_is_reported_and_others_still_scored() {
    let source = StaticCalendarSource::new()
        .with_failure("north", "invalid client secret")
        .with_schedules("south", vec![ScheduleEntry::new("bob@south.test", "220000")]);

    let response = recommender(source)
        .recommend(&morning(vec![alice(), bob()]))
        .await
        .unwrap();

    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].tenant_id, "north");
    assert!(response.errors[0].error.contains("invalid client secret"));
    assert_eq!(response.errors[0].email, None);

    // Bob's conflict is still honoured; Alice is simply treated as free.
    assert_eq!(response.recommendations.len(), 4);
    assert_eq!(response.alternatives_with_conflicts.len(), 2);
    let first_conflict = &response.alternatives_with_conflicts[0];
    assert!(first_conflict.details.iter().any(|d| d.person_id == "bob" && d.is_busy));
    assert!(first_conflict.details.iter().any(|d| d.person_id == "alice" && !d.is_busy));
}

#[tokio::test]
async fn mailbox_error_is_reported_with_its_email() {
    let source = StaticCalendarSource::new().with_schedules(
        "north",
        vec![ScheduleEntry::failed("alice@north.test", "mailbox not found")],
    );

    let response = recommender(source)
        .recommend(&morning(vec![alice()]))
        .await
        .unwrap();

    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].email.as_deref(), Some("alice@north.test"));
    assert_eq!(response.recommendations.len(), 6);
}

#[tokio::test]
async fn unconfigured_tenant_is_a_fetch_error() {
    let response = recommender(StaticCalendarSource::new())
        .recommend(&morning(vec![alice()]))
        .await
        .unwrap();

    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].error.contains("north"));
}

#[tokio::test(start_paused = true)]
async fn slow_tenant_times_out_without_blocking_the_rest() {
    let source = CountingSource {
        calls: AtomicUsize::new(0),
        inner: StaticCalendarSource::new()
            .with_schedules("north", vec![ScheduleEntry::new("alice@north.test", "000000")]),
    };
    let stuck = Person::new("dan", "Dan", "UTC").with_account("dan@slow.test", "slow");
    let config = RecommendConfig {
        fetch_timeout_secs: 5,
        ..RecommendConfig::default()
    };
    let recommender = Recommender::with_config(Arc::new(source), config);

    let response = recommender
        .recommend(&morning(vec![alice(), stuck]))
        .await
        .unwrap();

    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].tenant_id, "slow");
    assert!(response.errors[0].error.contains("timed out"));
    assert_eq!(response.recommendations.len(), 6);
}

#[tokio::test]
async fn panicking_fetch_is_isolated() {
    let response = recommender(PanickingSource)
        .recommend(&morning(vec![alice(), bob()]))
        .await
        .unwrap();

    assert_eq!(response.errors.len(), 2);
    assert_eq!(response.recommendations.len(), 6);
}

#[tokio::test]
async fn each_tenant_is_fetched_once() {
    let erin = Person::new("erin", "Erin", "UTC").with_account("erin@north.test", "north");
    let source = Arc::new(CountingSource {
        calls: AtomicUsize::new(0),
        inner: StaticCalendarSource::new().with_schedules(
            "north",
            vec![
                ScheduleEntry::new("alice@north.test", "000000"),
                ScheduleEntry::new("erin@north.test", "000000"),
            ],
        ),
    });
    let recommender = Recommender::new(source.clone());

    let response = recommender
        .recommend(&morning(vec![alice(), erin]))
        .await
        .unwrap();

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(response.meta.tenants_count, 1);
}

// ── Validation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn duration_longer_than_any_range_yields_empty_response() {
    let source = StaticCalendarSource::new()
        .with_schedules("north", vec![ScheduleEntry::new("alice@north.test", "00")]);

    let request = RecommendRequest::new(vec![alice()], at(9, 0), at(10, 0), i64::MAX);
    let response = recommender(source).recommend(&request).await.unwrap();

    assert!(response.recommendations.is_empty());
    assert!(response.alternatives_with_conflicts.is_empty());
    assert_eq!(response.meta.duration_minutes, i64::MAX);
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_fetching() {
    let source = Arc::new(CountingSource::default());
    let recommender = Recommender::new(source.clone());

    let empty = morning(vec![]);
    assert!(matches!(
        recommender.recommend(&empty).await,
        Err(RendezvousError::InvalidRequest(_))
    ));

    let backwards = RecommendRequest::new(vec![alice()], at(12, 0), at(9, 0), 30);
    assert!(matches!(
        recommender.recommend(&backwards).await,
        Err(RendezvousError::InvalidRequest(_))
    ));

    let zero = RecommendRequest::new(vec![alice()], at(9, 0), at(12, 0), 0);
    assert!(matches!(
        recommender.recommend(&zero).await,
        Err(RendezvousError::InvalidRequest(_))
    ));

    let too_long = RecommendRequest::new(vec![alice()], at(9, 0), at(9, 0) + Duration::days(60), 30);
    assert!(matches!(
        recommender.recommend(&too_long).await,
        Err(RendezvousError::InvalidRequest(_))
    ));

    let duplicate = morning(vec![alice(), alice()]);
    assert!(matches!(
        recommender.recommend(&duplicate).await,
        Err(RendezvousError::InvalidRequest(_))
    ));

    let mut lost = alice();
    lost.time_zone = "Mars/Olympus_Mons".to_string();
    assert!(matches!(
        recommender.recommend(&morning(vec![lost])).await,
        Err(RendezvousError::InvalidTimezone(_))
    ));

    let mut bad_zone = morning(vec![alice()]);
    bad_zone.time_zone = Some("Nowhere/Special".to_string());
    assert!(matches!(
        recommender.recommend(&bad_zone).await,
        Err(RendezvousError::InvalidTimezone(_))
    ));

    let overlapping = alice().with_working_hours(WorkingHours::empty().with_day(
        Weekday::Mon,
        vec![
            rendezvous_engine::WorkingWindow::parse("09:00", "12:00").unwrap(),
            rendezvous_engine::WorkingWindow::parse("11:00", "13:00").unwrap(),
        ],
    ));
    assert!(matches!(
        recommender.recommend(&morning(vec![overlapping])).await,
        Err(RendezvousError::InvalidWorkingHours(_))
    ));

    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

// ── Schedules & determinism ─────────────────────────────────────────────────

#[tokio::test]
async fn collect_schedules_labels_each_account() {
    let source = StaticCalendarSource::new()
        .with_schedules("north", vec![ScheduleEntry::new("alice@north.test", "0022")])
        .with_failure("south", "throttled");

    let collection = recommender(source)
        .collect_schedules(&[alice(), bob()], at(9, 0), at(11, 0), None)
        .await
        .unwrap();

    assert_eq!(collection.schedules.len(), 1);
    let schedule = &collection.schedules[0];
    assert_eq!(schedule.person_id, "alice");
    assert_eq!(schedule.tenant_id, "north");
    assert_eq!(schedule.intervals.len(), 4);
    assert_eq!(schedule.intervals[2].status, FreeBusyStatus::Busy);
    assert_eq!(collection.errors.len(), 1);
    assert_eq!(collection.errors[0].tenant_id, "south");
}

#[tokio::test]
async fn identical_inputs_give_identical_output() {
    let source = StaticCalendarSource::new()
        .with_schedules("north", vec![ScheduleEntry::new("alice@north.test", "020100")])
        .with_failure("south", "down");
    let recommender = recommender(source);
    let request = morning(vec![alice(), bob()]);

    let first = recommender.recommend(&request).await.unwrap();
    let second = recommender.recommend(&request).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn response_serialises_in_camel_case() {
    let source = StaticCalendarSource::new()
        .with_schedules("north", vec![ScheduleEntry::new("alice@north.test", "000000")]);

    let response = recommender(source)
        .recommend(&morning(vec![alice()]))
        .await
        .unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert!(json.get("alternativesWithConflicts").is_some());
    assert!(json.get("errors").is_none(), "empty errors are omitted");
    assert_eq!(json["meta"]["personsCount"], 1);
    assert_eq!(json["recommendations"][0]["allAvailable"], true);
    assert_eq!(json["recommendations"][0]["details"][0]["status"], "core");
}
