//! Device geolocation
//!
//! A host has no GPS, so the "device" position is whatever the configured
//! [`Geolocator`] can tell: an IP based estimate, fixed coordinates, or
//! nothing at all.

use crate::error::GeolocationFailure;
use crate::location::Coordinates;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

pub const DEFAULT_GEOLOCATION_API: &str = "http://ip-api.com/json/";

/// Single-shot position request, exactly one outcome per call
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<Coordinates, GeolocationFailure>;
}

/// Always fails, as a browser without the capability would
pub struct Unsupported;

#[async_trait]
impl Geolocator for Unsupported {
    async fn locate(&self) -> Result<Coordinates, GeolocationFailure> {
        Err(GeolocationFailure::Unsupported)
    }
}

/// Position given in the configuration
pub struct FixedGeolocator(pub Coordinates);

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn locate(&self) -> Result<Coordinates, GeolocationFailure> {
        Ok(self.0)
    }
}

/// <https://ip-api.com/docs/api:json>
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpApiResponse {
    fn coordinates(self) -> Result<Coordinates, GeolocationFailure> {
        if self.status != "success" {
            let message = self.message.unwrap_or(self.status);
            // ip-api answers "private range" / "reserved range" for LAN addresses
            return Err(GeolocationFailure::Unavailable(message));
        }
        match (self.lat, self.lon) {
            (Some(latitude), Some(longitude)) => Ok(Coordinates {
                latitude,
                longitude,
            }),
            _ => Err(GeolocationFailure::Unavailable(
                "no coordinates in response".to_string(),
            )),
        }
    }
}

/// Estimate the position from the public IP address
pub struct IpGeolocator {
    client: reqwest::Client,
    url: String,
}

impl IpGeolocator {
    pub fn new(client: reqwest::Client, url: &str) -> IpGeolocator {
        IpGeolocator {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn locate(&self) -> Result<Coordinates, GeolocationFailure> {
        debug!("GET {}", self.url);
        let resp = self
            .client
            .get(&self.url)
            .query(&[("fields", "status,message,lat,lon")])
            .send()
            .await
            .map_err(|why| {
                if why.is_timeout() {
                    GeolocationFailure::Timeout
                } else {
                    GeolocationFailure::Unavailable(why.to_string())
                }
            })?;
        if resp.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(GeolocationFailure::Denied);
        }
        let body: IpApiResponse = resp
            .json()
            .await
            .map_err(|why| GeolocationFailure::Unavailable(why.to_string()))?;
        body.coordinates()
    }
}

#[test]
fn ip_api_response_test() {
    let ok: IpApiResponse =
        serde_json::from_str(r#"{"status":"success","lat":35.6895,"lon":139.6917}"#).unwrap();
    assert_eq!(
        ok.coordinates(),
        Ok(Coordinates {
            latitude: 35.6895,
            longitude: 139.6917
        })
    );

    let private: IpApiResponse =
        serde_json::from_str(r#"{"status":"fail","message":"private range"}"#).unwrap();
    assert_eq!(
        private.coordinates(),
        Err(GeolocationFailure::Unavailable("private range".to_string()))
    );
}

#[tokio::test]
async fn fixed_and_unsupported_test() {
    let here = Coordinates {
        latitude: 43.0686663,
        longitude: 141.3507557,
    };
    assert_eq!(FixedGeolocator(here).locate().await, Ok(here));
    assert_eq!(
        Unsupported.locate().await,
        Err(GeolocationFailure::Unsupported)
    );
}
