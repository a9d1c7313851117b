use crate::error::ScheduleError;
use crate::location::PostalCode;
use crate::schedule::Schedule;
use crate::utils::{clock, ALL_DAY, FOOTNOTES};
use crate::view::{Phase, ScheduleView};
use askama::Template;
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, Redirect},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, TimeZone};
use log::{debug, error};
use serde::Deserialize;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The single view behind the web page. A held lock means a cycle is running.
pub type SharedView = Arc<Mutex<ScheduleView>>;

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    loading: bool,
    show_form: bool,
    error_message: String,
    location_label: String,
    entries: Vec<(String, String)>,
    walks: Vec<(String, String)>,
    footnotes: Vec<&'static str>,
}

impl HomeTemplate {
    fn loading() -> HomeTemplate {
        HomeTemplate {
            loading: true,
            show_form: false,
            error_message: String::new(),
            location_label: String::new(),
            entries: Vec::new(),
            walks: Vec::new(),
            footnotes: FOOTNOTES.to_vec(),
        }
    }

    fn from_view<Tz: TimeZone>(view: &ScheduleView, tz: &Tz) -> HomeTemplate
    where
        Tz::Offset: Display,
    {
        let state = view.state();
        let phase = view.phase();
        let (entries, walks) = match view.schedule() {
            Some(schedule) => (entries(schedule, tz), walks(schedule, tz)),
            None => (Vec::new(), Vec::new()),
        };
        HomeTemplate {
            loading: matches!(phase, Phase::Loading | Phase::Initializing),
            show_form: phase == Phase::NeedsManualEntry,
            error_message: state.error_message().unwrap_or_default(),
            location_label: state.location_label.clone().unwrap_or_default(),
            entries,
            walks,
            footnotes: FOOTNOTES.to_vec(),
        }
    }
}

fn entries<Tz: TimeZone>(schedule: &Schedule, tz: &Tz) -> Vec<(String, String)>
where
    Tz::Offset: Display,
{
    schedule
        .entries()
        .into_iter()
        .map(|(point, t)| (point.to_string(), clock(&t, &schedule.sunrise, tz)))
        .collect()
}

fn walks<Tz: TimeZone>(schedule: &Schedule, tz: &Tz) -> Vec<(String, String)>
where
    Tz::Offset: Display,
{
    ALL_DAY
        .iter()
        .map(|part| {
            let (begin, end) = schedule.walk(*part);
            let window = format!(
                "{} - {}",
                clock(&begin, &schedule.sunrise, tz),
                clock(&end, &schedule.sunrise, tz)
            );
            (part.label().to_string(), window)
        })
        .collect()
}

fn render(page: HomeTemplate) -> Result<Html<String>, StatusCode> {
    match page.render() {
        Ok(html) => Ok(Html(html)),
        Err(why) => {
            error!("{}", why);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn home_handler(State(view): State<SharedView>) -> Result<Html<String>, StatusCode> {
    let page = match view.try_lock() {
        Ok(v) => HomeTemplate::from_view(&v, &Local),
        Err(_) => HomeTemplate::loading(),
    };
    render(page)
}

#[derive(Clone, Debug, Deserialize)]
pub struct ZipForm {
    zip_code: String,
}

pub async fn zip_handler(State(view): State<SharedView>, Form(form): Form<ZipForm>) -> Redirect {
    // submission is disabled while loading
    let Ok(mut v) = view.try_lock_owned() else {
        debug!("busy, ignoring ZIP code {:?}", form.zip_code);
        return Redirect::to("/");
    };
    if !v.can_submit(&form.zip_code) {
        v.reject(ScheduleError::InvalidPostalCode);
        return Redirect::to("/");
    }
    let code: PostalCode = match form.zip_code.parse() {
        Ok(c) => c,
        Err(_) => {
            v.reject(ScheduleError::InvalidPostalCode);
            return Redirect::to("/");
        }
    };
    // the task owns the lock, so a dropped request cannot stop the cycle halfway
    let cycle = tokio::spawn(async move { v.submit_postal_code(&code).await });
    if let Err(why) = cycle.await {
        error!("{}", why);
    }
    Redirect::to("/")
}

pub async fn reset_handler(State(view): State<SharedView>) -> Redirect {
    let Ok(mut v) = view.try_lock_owned() else {
        debug!("busy, ignoring reset");
        return Redirect::to("/");
    };
    let cycle = tokio::spawn(async move { v.reset().await });
    if let Err(why) = cycle.await {
        error!("{}", why);
    }
    Redirect::to("/")
}

pub async fn schedule_handler(State(view): State<SharedView>) -> Result<Json<Schedule>, StatusCode> {
    let v = view
        .try_lock()
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    match v.schedule() {
        Some(s) => Ok(Json(*s)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

pub fn router(view: SharedView) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/zip", post(zip_handler))
        .route("/reset", post(reset_handler))
        .route("/api/schedule", get(schedule_handler))
        .with_state(view)
}

#[cfg(test)]
use crate::error::{FetchFailure, GeolocationFailure, LookupFailure};
#[cfg(test)]
use crate::geolocation::Geolocator;
#[cfg(test)]
use crate::location::{Coordinates, PostalLookup, ResolvedLocation};
#[cfg(test)]
use crate::schedule::RawSunTimes;
#[cfg(test)]
use crate::sun::SunTimesSource;
#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(test)]
struct NoDevice;

#[cfg(test)]
#[async_trait]
impl Geolocator for NoDevice {
    async fn locate(&self) -> Result<Coordinates, GeolocationFailure> {
        Err(GeolocationFailure::Denied)
    }
}

#[cfg(test)]
struct OnePlace {
    calls: Arc<AtomicUsize>,
}

#[cfg(test)]
#[async_trait]
impl PostalLookup for OnePlace {
    async fn lookup(&self, _code: &PostalCode) -> Result<ResolvedLocation, LookupFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ResolvedLocation {
            coordinates: Coordinates {
                latitude: 40.7506,
                longitude: -73.9972,
            },
            label: "New York City, NY".to_string(),
        })
    }
}

/// Answers June 1st after `delay_ms`
#[cfg(test)]
struct FixedSun {
    delay_ms: u64,
}

#[cfg(test)]
#[async_trait]
impl SunTimesSource for FixedSun {
    async fn sun_times(&self, _coordinates: &Coordinates) -> Result<RawSunTimes, FetchFailure> {
        use chrono::Utc;

        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        Ok(RawSunTimes {
            sunrise: Utc.with_ymd_and_hms(2024, 6, 1, 6, 12, 0).unwrap(),
            sunset: Utc.with_ymd_and_hms(2024, 6, 1, 19, 47, 0).unwrap(),
        })
    }
}

#[cfg(test)]
fn test_view(delay_ms: u64) -> (ScheduleView, Arc<AtomicUsize>) {
    use crate::preference::MemoryPreference;
    use crate::schedule::Variant;
    use crate::view::Services;

    let calls = Arc::new(AtomicUsize::new(0));
    let services = Services {
        geolocator: Box::new(NoDevice),
        lookup: Box::new(OnePlace {
            calls: calls.clone(),
        }),
        sun: Box::new(FixedSun { delay_ms }),
        preference: Box::new(MemoryPreference::new()),
    };
    (ScheduleView::new(services, Variant::WithToddler), calls)
}

#[test]
fn loading_page_test() {
    let html = HomeTemplate::loading().render().unwrap();
    assert!(html.contains("Loading"));
    assert!(html.contains("http-equiv=\"refresh\""));
    assert!(!html.contains("<form"));
}

#[tokio::test]
async fn manual_entry_page_test() {
    use chrono::Utc;

    let (mut v, _) = test_view(0);
    v.start().await;
    let html = HomeTemplate::from_view(&v, &Utc).render().unwrap();
    assert!(html.contains("name=\"zip_code\""));
    assert!(html.contains("Unable to get your location"));
    assert!(!html.contains("<dl>"));
}

#[tokio::test]
async fn ready_page_test() {
    use chrono::Utc;

    let (mut v, _) = test_view(0);
    v.submit_postal_code(&"10001".parse().unwrap()).await;
    let html = HomeTemplate::from_view(&v, &Utc).render().unwrap();
    assert!(html.contains("New York City, NY"));
    assert!(html.contains("04:52"));
    assert!(html.contains("22:17"));
    assert!(html.contains("17:52 (previous day)"));
    assert!(html.contains("05:37 - 06:12"));
    assert!(!html.contains("name=\"zip_code\""));
}

#[tokio::test]
async fn dropped_submit_still_finishes_test() {
    let (v, _) = test_view(300);
    let shared: SharedView = Arc::new(Mutex::new(v));
    assert_eq!(shared.lock().await.start().await, Phase::NeedsManualEntry);

    let form = ZipForm {
        zip_code: "10001".to_string(),
    };
    let request = zip_handler(State(shared.clone()), Form(form));
    // the client goes away long before the sun service answers
    let dropped = tokio::time::timeout(std::time::Duration::from_millis(20), request).await;
    assert!(dropped.is_err());

    let v = shared.lock().await;
    assert_eq!(v.phase(), Phase::Ready);
    assert!(!v.state().loading);
    assert_eq!(v.state().location_label.as_deref(), Some("New York City, NY"));
}

#[tokio::test]
async fn reset_form_test() {
    let (v, _) = test_view(0);
    let shared: SharedView = Arc::new(Mutex::new(v));
    reset_handler(State(shared.clone())).await;

    let v = shared.lock().await;
    assert_eq!(v.phase(), Phase::NeedsManualEntry);
    assert_eq!(v.state().error, Some(ScheduleError::GeolocationDenied));
}

#[tokio::test]
async fn busy_view_ignores_submit_test() {
    let (v, calls) = test_view(0);
    let shared: SharedView = Arc::new(Mutex::new(v));
    let held = shared.lock().await;

    let form = ZipForm {
        zip_code: "10001".to_string(),
    };
    zip_handler(State(shared.clone()), Form(form)).await;
    reset_handler(State(shared.clone())).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let page = match home_handler(State(shared.clone())).await {
        Ok(html) => html.0,
        Err(status) => panic!("{}", status),
    };
    assert!(page.contains("Loading"));
    assert!(!page.contains("name=\"zip_code\""));

    drop(held);
    assert_eq!(shared.lock().await.phase(), Phase::Initializing);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_zip_form_test() {
    let (v, calls) = test_view(0);
    let shared: SharedView = Arc::new(Mutex::new(v));
    let form = ZipForm {
        zip_code: "1234".to_string(),
    };
    zip_handler(State(shared.clone()), Form(form)).await;
    let v = shared.lock().await;
    assert_eq!(v.state().error, Some(ScheduleError::InvalidPostalCode));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
