//! Schedule view state
//!
//! [`InteractionState`] only changes through the pure transitions below;
//! [`ScheduleView`] runs one resolve → fetch cycle at a time and applies them.
//! The front ends (console and web) only read the view and call its actions.

use crate::error::ScheduleError;
use crate::geolocation::Geolocator;
use crate::location::{LocationResolver, PostalCode, PostalLookup, ResolvedLocation};
use crate::preference::PreferenceStore;
use crate::schedule::{RawSunTimes, Schedule, Variant};
use crate::sun::SunTimesSource;
use log::{info, warn};

/// What the view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Loading,
    Ready,
    NeedsManualEntry,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionState {
    pub loading: bool,
    pub error: Option<ScheduleError>,
    pub manual_entry: bool,
    pub location_label: Option<String>,
}

impl InteractionState {
    /// A resolution or fetch is outstanding
    pub fn begin(self) -> InteractionState {
        InteractionState {
            loading: true,
            ..self
        }
    }

    /// Release loading with a visible error and show the form
    pub fn fail(self, error: ScheduleError) -> InteractionState {
        InteractionState {
            loading: false,
            error: Some(error),
            manual_entry: true,
            ..self
        }
    }

    /// A fresh schedule for `label` is in place
    pub fn succeed(self, label: &str) -> InteractionState {
        InteractionState {
            loading: false,
            error: None,
            manual_entry: false,
            location_label: Some(label.to_string()),
        }
    }

    /// The form is only submittable with 5 digits and nothing in flight
    pub fn can_submit(&self, input: &str) -> bool {
        !self.loading && PostalCode::is_valid(input.trim())
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.map(|e| e.to_string())
    }

    pub fn phase(&self, has_schedule: bool) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.error.is_some() || self.manual_entry {
            Phase::NeedsManualEntry
        } else if has_schedule {
            Phase::Ready
        } else {
            Phase::Initializing
        }
    }
}

/// Apply the outcome of a sun-data fetch.
///
/// The schedule is replaced only on success. On failure the previous one is
/// returned untouched next to the error.
pub fn apply_fetch(
    state: InteractionState,
    schedule: Option<Schedule>,
    result: Result<RawSunTimes, ScheduleError>,
    location: &ResolvedLocation,
    variant: Variant,
) -> (InteractionState, Option<Schedule>) {
    match result {
        Ok(sun) => (
            state.succeed(&location.label),
            Some(Schedule::from_sun_times(&sun, variant)),
        ),
        Err(error) => (state.fail(error), schedule),
    }
}

/// Collaborators of a view
pub struct Services {
    pub geolocator: Box<dyn Geolocator>,
    pub lookup: Box<dyn PostalLookup>,
    pub sun: Box<dyn SunTimesSource>,
    pub preference: Box<dyn PreferenceStore>,
}

pub struct ScheduleView {
    state: InteractionState,
    schedule: Option<Schedule>,
    variant: Variant,
    services: Services,
}

impl ScheduleView {
    pub fn new(services: Services, variant: Variant) -> ScheduleView {
        ScheduleView {
            state: InteractionState::default(),
            schedule: None,
            variant,
            services,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase(self.schedule.is_some())
    }

    /// Whether the manual entry form may be submitted with `input`
    pub fn can_submit(&self, input: &str) -> bool {
        self.state.can_submit(input)
    }

    fn transition(&mut self, f: impl FnOnce(InteractionState) -> InteractionState) {
        let state = std::mem::take(&mut self.state);
        self.state = f(state);
    }

    fn resolver(&self) -> LocationResolver<'_> {
        LocationResolver::new(self.services.geolocator.as_ref(), self.services.lookup.as_ref())
    }

    /// First cycle of a session: saved postal code if any, device otherwise
    pub async fn start(&mut self) -> Phase {
        match self.services.preference.get() {
            Some(code) => {
                info!("using saved ZIP code {}", code);
                self.submit_postal_code(&code).await
            }
            None => self.locate().await,
        }
    }

    /// Resolve through device geolocation and fetch
    pub async fn locate(&mut self) -> Phase {
        self.transition(InteractionState::begin);
        let resolved = self.resolver().from_device().await;
        match resolved {
            Ok(location) => self.fetch(location).await,
            Err(error) => self.transition(|s| s.fail(error)),
        }
        self.phase()
    }

    /// Resolve a postal code, remember it, and fetch
    pub async fn submit_postal_code(&mut self, code: &PostalCode) -> Phase {
        self.transition(InteractionState::begin);
        let resolved = self.resolver().from_postal_code(code).await;
        match resolved {
            Ok(location) => {
                if let Err(why) = self.services.preference.set(code) {
                    warn!("could not save ZIP code {}: {}", code, why);
                }
                self.fetch(location).await;
            }
            Err(error) => self.transition(|s| s.fail(error)),
        }
        self.phase()
    }

    /// Forget the saved postal code and go back to device geolocation
    pub async fn reset(&mut self) -> Phase {
        if let Err(why) = self.services.preference.clear() {
            warn!("could not clear saved ZIP code: {}", why);
        }
        self.locate().await
    }

    /// Input that never reached a lookup
    pub fn reject(&mut self, error: ScheduleError) {
        self.transition(|s| s.fail(error));
    }

    async fn fetch(&mut self, location: ResolvedLocation) {
        let result = self
            .services
            .sun
            .sun_times(&location.coordinates)
            .await
            .map_err(|why| {
                warn!("{}: {}", location.label, why);
                ScheduleError::from(why)
            });
        let state = std::mem::take(&mut self.state);
        let (state, schedule) =
            apply_fetch(state, self.schedule.take(), result, &location, self.variant);
        self.state = state;
        self.schedule = schedule;
        if self.schedule.is_some() && self.state.error.is_none() {
            info!("schedule ready for {}", location.label);
        }
    }
}

#[cfg(test)]
fn sample() -> (RawSunTimes, ResolvedLocation) {
    use crate::location::Coordinates;
    use chrono::{TimeZone, Utc};

    let sun = RawSunTimes {
        sunrise: Utc.with_ymd_and_hms(2024, 6, 1, 6, 12, 0).unwrap(),
        sunset: Utc.with_ymd_and_hms(2024, 6, 1, 19, 47, 0).unwrap(),
    };
    let location = ResolvedLocation {
        coordinates: Coordinates {
            latitude: 34.0901,
            longitude: -118.4065,
        },
        label: "Beverly Hills, CA".to_string(),
    };
    (sun, location)
}

#[test]
fn phase_test() {
    let s = InteractionState::default();
    assert_eq!(s.phase(false), Phase::Initializing);
    let s = s.begin();
    assert_eq!(s.phase(false), Phase::Loading);
    let failed = s.clone().fail(ScheduleError::GeolocationDenied);
    assert!(!failed.loading);
    assert!(failed.manual_entry);
    assert_eq!(failed.phase(false), Phase::NeedsManualEntry);
    // a stale schedule does not hide the error
    assert_eq!(failed.phase(true), Phase::NeedsManualEntry);
    let ready = failed.begin().succeed("current location");
    assert_eq!(ready.error, None);
    assert_eq!(ready.phase(true), Phase::Ready);
}

#[test]
fn apply_fetch_test() {
    let (sun, location) = sample();
    let (state, schedule) = apply_fetch(
        InteractionState::default().begin().fail(ScheduleError::InvalidPostalCode).begin(),
        None,
        Ok(sun),
        &location,
        Variant::Adult,
    );
    assert_eq!(state.phase(schedule.is_some()), Phase::Ready);
    assert_eq!(state.location_label.as_deref(), Some("Beverly Hills, CA"));
    assert_eq!(schedule, Some(Schedule::from_sun_times(&sun, Variant::Adult)));
}

#[test]
fn apply_fetch_failure_keeps_schedule_test() {
    let (sun, location) = sample();
    let previous = Schedule::from_sun_times(&sun, Variant::Adult);
    let (state, schedule) = apply_fetch(
        InteractionState::default().begin(),
        Some(previous),
        Err(ScheduleError::SunDataFetchFailed),
        &location,
        Variant::Adult,
    );
    assert_eq!(state.error, Some(ScheduleError::SunDataFetchFailed));
    assert!(!state.loading);
    assert_eq!(state.location_label, None);
    assert_eq!(schedule, Some(previous));
}

#[test]
fn can_submit_while_loading_test() {
    let idle = InteractionState::default().fail(ScheduleError::GeolocationDenied);
    assert!(idle.can_submit("10001"));
    assert!(!idle.can_submit("1000"));
    let loading = idle.begin();
    assert!(!loading.can_submit("10001"));
    assert!(!loading.can_submit("1000"));
}
