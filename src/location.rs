//! Location resolution
//!
//! Coordinates come either from the geolocation capability or from a postal
//! code looked up on zippopotam.us:
//! <https://api.zippopotam.us/us/90210>

use crate::error::{LookupFailure, PostalCodeError, ScheduleError};
use crate::geolocation::Geolocator;
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_POSTAL_API: &str = "https://api.zippopotam.us";
pub const CURRENT_LOCATION_LABEL: &str = "current location";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Five-digit postal code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn is_valid(code: &str) -> bool {
        code.len() == 5 && code.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PostalCode {
    type Err = PostalCodeError;

    fn from_str(s: &str) -> Result<PostalCode, PostalCodeError> {
        let code = s.trim();
        if PostalCode::is_valid(code) {
            Ok(PostalCode(code.to_string()))
        } else {
            Err(PostalCodeError(s.to_string()))
        }
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub coordinates: Coordinates,
    pub label: String,
}

/// Postal-code to coordinates lookup
#[async_trait]
pub trait PostalLookup: Send + Sync {
    async fn lookup(&self, code: &PostalCode) -> Result<ResolvedLocation, LookupFailure>;
}

/// One entry of the zippopotam.us `places` list
#[derive(Debug, Deserialize)]
struct ZipPlace {
    #[serde(rename = "place name")]
    place_name: String,
    #[serde(rename = "state abbreviation", default)]
    state_abbreviation: String,
    latitude: String,
    longitude: String,
}

#[derive(Debug, Deserialize)]
struct ZipResponse {
    #[serde(default)]
    places: Vec<ZipPlace>,
}

/// Pick the first place of a zippopotam.us response body.
///
/// An empty `places` list means the code is unknown.
pub fn parse_places(body: &str) -> Result<ResolvedLocation, LookupFailure> {
    let response: ZipResponse =
        serde_json::from_str(body).map_err(|why| LookupFailure::Malformed(why.to_string()))?;
    let place = match response.places.into_iter().next() {
        Some(p) => p,
        None => return Err(LookupFailure::NotFound),
    };
    let latitude = place
        .latitude
        .trim()
        .parse::<f64>()
        .map_err(|why| LookupFailure::Malformed(format!("latitude: {}", why)))?;
    let longitude = place
        .longitude
        .trim()
        .parse::<f64>()
        .map_err(|why| LookupFailure::Malformed(format!("longitude: {}", why)))?;
    let label = if place.state_abbreviation.is_empty() {
        place.place_name
    } else {
        format!("{}, {}", place.place_name, place.state_abbreviation)
    };
    Ok(ResolvedLocation {
        coordinates: Coordinates {
            latitude,
            longitude,
        },
        label,
    })
}

/// zippopotam.us client for one country
pub struct ZippopotamClient {
    client: reqwest::Client,
    base_url: String,
    country: String,
}

impl ZippopotamClient {
    pub fn new(client: reqwest::Client, base_url: &str, country: &str) -> ZippopotamClient {
        ZippopotamClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            country: country.to_lowercase(),
        }
    }

    fn url(&self, code: &PostalCode) -> String {
        format!("{}/{}/{}", self.base_url, self.country, code)
    }
}

#[async_trait]
impl PostalLookup for ZippopotamClient {
    async fn lookup(&self, code: &PostalCode) -> Result<ResolvedLocation, LookupFailure> {
        let url = self.url(code);
        debug!("GET {}", url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|why| LookupFailure::Network(why.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupFailure::NotFound);
        }
        if !resp.status().is_success() {
            return Err(LookupFailure::Network(format!("HTTP {}", resp.status())));
        }
        let body = resp
            .text()
            .await
            .map_err(|why| LookupFailure::Network(why.to_string()))?;
        parse_places(&body)
    }
}

/// Turns a location input into coordinates, one attempt per call
pub struct LocationResolver<'a> {
    geolocator: &'a dyn Geolocator,
    lookup: &'a dyn PostalLookup,
}

impl<'a> LocationResolver<'a> {
    pub fn new(geolocator: &'a dyn Geolocator, lookup: &'a dyn PostalLookup) -> Self {
        LocationResolver { geolocator, lookup }
    }

    /// Geolocation strategy
    pub async fn from_device(&self) -> Result<ResolvedLocation, ScheduleError> {
        match self.geolocator.locate().await {
            Ok(coordinates) => {
                debug!(
                    "geolocation: ({}, {})",
                    coordinates.latitude, coordinates.longitude
                );
                Ok(ResolvedLocation {
                    coordinates,
                    label: CURRENT_LOCATION_LABEL.to_string(),
                })
            }
            Err(why) => {
                warn!("{}", why);
                Err(why.into())
            }
        }
    }

    /// Postal-code strategy
    pub async fn from_postal_code(
        &self,
        code: &PostalCode,
    ) -> Result<ResolvedLocation, ScheduleError> {
        match self.lookup.lookup(code).await {
            Ok(location) => {
                debug!(
                    "{}: {} ({}, {})",
                    code,
                    location.label,
                    location.coordinates.latitude,
                    location.coordinates.longitude
                );
                Ok(location)
            }
            Err(why) => {
                warn!("{}: {}", code, why);
                Err(why.into())
            }
        }
    }
}

#[test]
fn postal_code_test() {
    assert!("90210".parse::<PostalCode>().is_ok());
    assert_eq!(" 02134 ".parse::<PostalCode>().unwrap().as_str(), "02134");
    for bad in ["", "9021", "902100", "9021a", "90 10", "٩٠٢١٠"] {
        assert!(bad.parse::<PostalCode>().is_err(), "{:?}", bad);
        assert!(!PostalCode::is_valid(bad), "{:?}", bad);
    }
}

#[test]
fn parse_places_test() {
    let body = r#"{"post code": "90210", "country": "United States",
        "country abbreviation": "US",
        "places": [{"place name": "Beverly Hills", "longitude": "-118.4065",
        "state": "California", "state abbreviation": "CA", "latitude": "34.0901"}]}"#;
    let location = parse_places(body).unwrap();
    assert_eq!(location.label, "Beverly Hills, CA");
    assert_eq!(location.coordinates.latitude, 34.0901);
    assert_eq!(location.coordinates.longitude, -118.4065);
}

#[test]
fn parse_places_failure_test() {
    assert_eq!(parse_places("{}"), Err(LookupFailure::NotFound));
    assert_eq!(
        parse_places(r#"{"places": []}"#),
        Err(LookupFailure::NotFound)
    );
    assert!(matches!(
        parse_places("<html>"),
        Err(LookupFailure::Malformed(_))
    ));
    let body = r#"{"places": [{"place name": "Nowhere", "latitude": "north", "longitude": "1.0"}]}"#;
    assert!(matches!(parse_places(body), Err(LookupFailure::Malformed(_))));
}

#[test]
fn url_test() {
    let client = ZippopotamClient::new(reqwest::Client::new(), "https://api.zippopotam.us/", "US");
    let code: PostalCode = "90210".parse().unwrap();
    assert_eq!(client.url(&code), "https://api.zippopotam.us/us/90210");
}
