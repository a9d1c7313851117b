//! Sunrise and sunset times
//! Using sunrise-sunset.org API

use crate::error::FetchFailure;
use crate::location::Coordinates;
use crate::schedule::RawSunTimes;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

pub const DEFAULT_SUN_API: &str = "https://api.sunrise-sunset.org/json";

/// Today's sun times for a position
#[async_trait]
pub trait SunTimesSource: Send + Sync {
    async fn sun_times(&self, coordinates: &Coordinates) -> Result<RawSunTimes, FetchFailure>;
}

/// <https://sunrise-sunset.org/api>
///
/// `results` is only meaningful when `status` is `OK`; on errors the service
/// sends an empty string there.
#[derive(Debug, Deserialize)]
struct SunResponse {
    status: String,
    #[serde(default)]
    results: serde_json::Value,
}

/// Extract sunrise and sunset from a response body requested with `formatted=0`
pub fn parse_sun_times(body: &str) -> Result<RawSunTimes, FetchFailure> {
    let response: SunResponse =
        serde_json::from_str(body).map_err(|why| FetchFailure::Malformed(why.to_string()))?;
    if response.status != "OK" {
        return Err(FetchFailure::Status(response.status));
    }
    serde_json::from_value(response.results).map_err(|why| FetchFailure::Malformed(why.to_string()))
}

pub struct SunriseSunsetClient {
    client: reqwest::Client,
    url: String,
}

impl SunriseSunsetClient {
    pub fn new(client: reqwest::Client, url: &str) -> SunriseSunsetClient {
        SunriseSunsetClient {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl SunTimesSource for SunriseSunsetClient {
    async fn sun_times(&self, coordinates: &Coordinates) -> Result<RawSunTimes, FetchFailure> {
        let query = [
            ("lat", coordinates.latitude.to_string()),
            ("lng", coordinates.longitude.to_string()),
            ("date", "today".to_string()),
            ("formatted", "0".to_string()),
        ];
        debug!("GET {} {:?}", self.url, query);
        let resp = self
            .client
            .get(&self.url)
            .query(&query)
            .send()
            .await
            .map_err(|why| FetchFailure::Network(why.to_string()))?;
        // errors come back as 400 with a status field, so parse regardless
        let body = resp
            .text()
            .await
            .map_err(|why| FetchFailure::Network(why.to_string()))?;
        parse_sun_times(&body)
    }
}

#[test]
fn parse_sun_times_test() {
    use chrono::{TimeZone, Utc};

    let body = r#"{"results":{"sunrise":"2015-05-21T05:05:35+00:00",
        "sunset":"2015-05-21T19:22:59+00:00","solar_noon":"2015-05-21T12:14:17+00:00",
        "day_length":51444,"civil_twilight_begin":"2015-05-21T04:36:17+00:00",
        "civil_twilight_end":"2015-05-21T19:52:17+00:00"},"status":"OK","tzid":"UTC"}"#;
    let sun = parse_sun_times(body).unwrap();
    assert_eq!(sun.sunrise, Utc.with_ymd_and_hms(2015, 5, 21, 5, 5, 35).unwrap());
    assert_eq!(sun.sunset, Utc.with_ymd_and_hms(2015, 5, 21, 19, 22, 59).unwrap());
}

#[test]
fn parse_sun_times_failure_test() {
    assert_eq!(
        parse_sun_times(r#"{"results":"","status":"INVALID_REQUEST"}"#),
        Err(FetchFailure::Status("INVALID_REQUEST".to_string()))
    );
    assert_eq!(
        parse_sun_times(r#"{"status":"UNKNOWN_ERROR"}"#),
        Err(FetchFailure::Status("UNKNOWN_ERROR".to_string()))
    );
    assert!(matches!(
        parse_sun_times(r#"{"results":{"sunrise":"6am"},"status":"OK"}"#),
        Err(FetchFailure::Malformed(_))
    ));
    assert!(matches!(
        parse_sun_times("Service Unavailable"),
        Err(FetchFailure::Malformed(_))
    ));
}
