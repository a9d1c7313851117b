use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use daylight::error::{FetchFailure, GeolocationFailure, LookupFailure, ScheduleError};
use daylight::geolocation::Geolocator;
use daylight::location::{Coordinates, PostalCode, PostalLookup, ResolvedLocation};
use daylight::preference::{MemoryPreference, PreferenceStore, TomlPreference};
use daylight::schedule::{RawSunTimes, Schedule, Variant};
use daylight::sun::SunTimesSource;
use daylight::view::{Phase, ScheduleView, Services};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

const HOME: Coordinates = Coordinates {
    latitude: 40.7506,
    longitude: -73.9972,
};

/// Counts calls, answers with `position` or a denial
struct FakeDevice {
    position: Option<Coordinates>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Geolocator for FakeDevice {
    async fn locate(&self) -> Result<Coordinates, GeolocationFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.position.ok_or(GeolocationFailure::Denied)
    }
}

/// Knows only "10001"
struct FakeLookup {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl PostalLookup for FakeLookup {
    async fn lookup(&self, code: &PostalCode) -> Result<ResolvedLocation, LookupFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if code.as_str() == "10001" {
            Ok(ResolvedLocation {
                coordinates: HOME,
                label: "New York City, NY".to_string(),
            })
        } else {
            Err(LookupFailure::NotFound)
        }
    }
}

/// Plays back queued answers, then keeps repeating the last one
struct FakeSun {
    answers: Mutex<Vec<Result<RawSunTimes, FetchFailure>>>,
}

impl FakeSun {
    fn new(mut answers: Vec<Result<RawSunTimes, FetchFailure>>) -> FakeSun {
        answers.reverse();
        FakeSun {
            answers: Mutex::new(answers),
        }
    }
}

#[async_trait]
impl SunTimesSource for FakeSun {
    async fn sun_times(&self, _coordinates: &Coordinates) -> Result<RawSunTimes, FetchFailure> {
        let mut answers = self.answers.lock().unwrap();
        if answers.len() > 1 {
            answers.pop().unwrap()
        } else {
            answers[0].clone()
        }
    }
}

fn june_first() -> RawSunTimes {
    RawSunTimes {
        sunrise: Utc.with_ymd_and_hms(2024, 6, 1, 6, 12, 0).unwrap(),
        sunset: Utc.with_ymd_and_hms(2024, 6, 1, 19, 47, 0).unwrap(),
    }
}

fn june_second() -> RawSunTimes {
    RawSunTimes {
        sunrise: Utc.with_ymd_and_hms(2024, 6, 2, 6, 11, 0).unwrap(),
        sunset: Utc.with_ymd_and_hms(2024, 6, 2, 19, 48, 0).unwrap(),
    }
}

struct Counters {
    device: Arc<AtomicUsize>,
    lookup: Arc<AtomicUsize>,
}

fn view_with(
    position: Option<Coordinates>,
    sun: Vec<Result<RawSunTimes, FetchFailure>>,
    preference: Box<dyn PreferenceStore>,
) -> (ScheduleView, Counters) {
    let counters = Counters {
        device: Arc::new(AtomicUsize::new(0)),
        lookup: Arc::new(AtomicUsize::new(0)),
    };
    let services = Services {
        geolocator: Box::new(FakeDevice {
            position,
            calls: counters.device.clone(),
        }),
        lookup: Box::new(FakeLookup {
            calls: counters.lookup.clone(),
        }),
        sun: Box::new(FakeSun::new(sun)),
        preference,
    };
    (ScheduleView::new(services, Variant::Adult), counters)
}

fn code(s: &str) -> PostalCode {
    s.parse().unwrap()
}

#[tokio::test]
async fn geolocation_success_test() {
    let (mut view, counters) =
        view_with(Some(HOME), vec![Ok(june_first())], Box::new(MemoryPreference::new()));
    assert_eq!(view.phase(), Phase::Initializing);
    assert_eq!(view.start().await, Phase::Ready);
    assert_eq!(counters.device.load(Ordering::SeqCst), 1);
    assert_eq!(counters.lookup.load(Ordering::SeqCst), 0);
    assert_eq!(
        view.state().location_label.as_deref(),
        Some("current location")
    );
    assert_eq!(
        view.schedule(),
        Some(&Schedule::from_sun_times(&june_first(), Variant::Adult))
    );
}

#[tokio::test]
async fn geolocation_denied_switches_to_manual_entry_test() {
    let (mut view, counters) =
        view_with(None, vec![Ok(june_first())], Box::new(MemoryPreference::new()));
    assert_eq!(view.start().await, Phase::NeedsManualEntry);
    assert_eq!(view.state().error, Some(ScheduleError::GeolocationDenied));
    assert!(view.state().manual_entry);
    assert!(!view.state().loading);
    assert!(view.schedule().is_none());
    // one attempt, no retry
    assert_eq!(counters.device.load(Ordering::SeqCst), 1);

    assert_eq!(view.submit_postal_code(&code("10001")).await, Phase::Ready);
    assert_eq!(view.state().error, None);
    assert!(!view.state().manual_entry);
}

#[tokio::test]
async fn unknown_postal_code_keeps_schedule_test() {
    let (mut view, _) =
        view_with(Some(HOME), vec![Ok(june_first())], Box::new(MemoryPreference::new()));
    view.start().await;
    let before = view.schedule().copied();
    assert!(before.is_some());

    assert_eq!(
        view.submit_postal_code(&code("99999")).await,
        Phase::NeedsManualEntry
    );
    assert_eq!(view.state().error, Some(ScheduleError::InvalidPostalCode));
    assert_eq!(view.schedule().copied(), before);
    assert_eq!(
        view.state().location_label.as_deref(),
        Some("current location")
    );
}

#[tokio::test]
async fn sun_status_failure_never_sets_schedule_test() {
    let (mut view, _) = view_with(
        Some(HOME),
        vec![Err(FetchFailure::Status("INVALID_REQUEST".to_string()))],
        Box::new(MemoryPreference::new()),
    );
    assert_eq!(view.start().await, Phase::NeedsManualEntry);
    assert_eq!(view.state().error, Some(ScheduleError::SunDataFetchFailed));
    assert!(view.schedule().is_none());
    assert_eq!(
        view.state().error_message().as_deref(),
        Some("Failed to fetch sunrise and sunset times. Please try again.")
    );
}

#[tokio::test]
async fn failed_fetch_leaves_previous_schedule_test() {
    let (mut view, _) = view_with(
        Some(HOME),
        vec![
            Ok(june_first()),
            Err(FetchFailure::Network("connection reset".to_string())),
            Ok(june_second()),
        ],
        Box::new(MemoryPreference::new()),
    );
    view.start().await;
    let first = Schedule::from_sun_times(&june_first(), Variant::Adult);

    assert_eq!(
        view.submit_postal_code(&code("10001")).await,
        Phase::NeedsManualEntry
    );
    assert_eq!(view.schedule(), Some(&first));

    assert_eq!(view.submit_postal_code(&code("10001")).await, Phase::Ready);
    assert_eq!(
        view.schedule(),
        Some(&Schedule::from_sun_times(&june_second(), Variant::Adult))
    );
    assert_eq!(view.state().error, None);
}

#[tokio::test]
async fn persisted_code_skips_geolocation_test() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("zip.toml");

    let (mut view, counters) = view_with(
        None,
        vec![Ok(june_first())],
        Box::new(TomlPreference::new(&file)),
    );
    assert_eq!(view.start().await, Phase::NeedsManualEntry);
    assert_eq!(view.submit_postal_code(&code("10001")).await, Phase::Ready);
    assert_eq!(counters.device.load(Ordering::SeqCst), 1);
    assert_eq!(TomlPreference::new(&file).get(), Some(code("10001")));

    // restart
    let (mut view, counters) = view_with(
        None,
        vec![Ok(june_first())],
        Box::new(TomlPreference::new(&file)),
    );
    assert_eq!(view.start().await, Phase::Ready);
    assert_eq!(counters.device.load(Ordering::SeqCst), 0);
    assert_eq!(counters.lookup.load(Ordering::SeqCst), 1);
    assert_eq!(
        view.state().location_label.as_deref(),
        Some("New York City, NY")
    );
}

#[tokio::test]
async fn failed_lookup_is_not_persisted_test() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("zip.toml");
    let (mut view, _) = view_with(
        None,
        vec![Ok(june_first())],
        Box::new(TomlPreference::new(&file)),
    );
    view.submit_postal_code(&code("99999")).await;
    assert_eq!(TomlPreference::new(&file).get(), None);
}

#[tokio::test]
async fn reset_clears_code_and_geolocates_test() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("zip.toml");
    TomlPreference::new(&file).set(&code("10001")).unwrap();

    let (mut view, counters) = view_with(
        Some(HOME),
        vec![Ok(june_first())],
        Box::new(TomlPreference::new(&file)),
    );
    assert_eq!(view.reset().await, Phase::Ready);
    assert_eq!(counters.device.load(Ordering::SeqCst), 1);
    assert_eq!(counters.lookup.load(Ordering::SeqCst), 0);
    assert_eq!(TomlPreference::new(&file).get(), None);
}

#[tokio::test]
async fn can_submit_test() {
    let (mut view, _) = view_with(None, vec![Ok(june_first())], Box::new(MemoryPreference::new()));
    view.start().await;
    assert!(view.can_submit("10001"));
    assert!(view.can_submit("10001\n"));
    assert!(!view.can_submit("1000"));
    assert!(!view.can_submit("100011"));
    assert!(!view.can_submit("1000a"));
    assert!(!view.can_submit(""));
}

#[tokio::test]
async fn reject_test() {
    let (mut view, _) = view_with(Some(HOME), vec![Ok(june_first())], Box::new(MemoryPreference::new()));
    view.start().await;
    view.reject(ScheduleError::InvalidPostalCode);
    assert_eq!(view.phase(), Phase::NeedsManualEntry);
    assert!(view.schedule().is_some());
}
