//! Error taxonomy
//!
//! Every failure a schedule cycle can hit ends up as one of the three
//! [`ScheduleError`] variants. The collaborator failures below carry the
//! detail that gets logged before the conversion.

use thiserror::Error;

/// User-facing failures. All of them route the view into manual entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Unable to get your location. Please enter your ZIP code.")]
    GeolocationDenied,
    #[error("Invalid ZIP code. Please check it and try again.")]
    InvalidPostalCode,
    #[error("Failed to fetch sunrise and sunset times. Please try again.")]
    SunDataFetchFailed,
}

/// Input that is not exactly five ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ZIP code must be exactly 5 digits, got {0:?}")]
pub struct PostalCodeError(pub String);

/// Why the geolocation capability gave no position
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationFailure {
    #[error("geolocation was denied")]
    Denied,
    #[error("geolocation timed out")]
    Timeout,
    #[error("geolocation is not supported")]
    Unsupported,
    #[error("geolocation unavailable: {0}")]
    Unavailable(String),
}

/// Postal-code lookup failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupFailure {
    #[error("no place matches the postal code")]
    NotFound,
    #[error("malformed lookup response: {0}")]
    Malformed(String),
    #[error("lookup request failed: {0}")]
    Network(String),
}

/// Sunrise/sunset fetch failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("sun service reported status {0:?}")]
    Status(String),
    #[error("malformed sun service response: {0}")]
    Malformed(String),
    #[error("sun service request failed: {0}")]
    Network(String),
}

impl From<GeolocationFailure> for ScheduleError {
    fn from(_: GeolocationFailure) -> ScheduleError {
        ScheduleError::GeolocationDenied
    }
}

impl From<LookupFailure> for ScheduleError {
    fn from(_: LookupFailure) -> ScheduleError {
        ScheduleError::InvalidPostalCode
    }
}

impl From<FetchFailure> for ScheduleError {
    fn from(_: FetchFailure) -> ScheduleError {
        ScheduleError::SunDataFetchFailed
    }
}

#[test]
fn distinct_messages_test() {
    let messages = [
        ScheduleError::GeolocationDenied.to_string(),
        ScheduleError::InvalidPostalCode.to_string(),
        ScheduleError::SunDataFetchFailed.to_string(),
    ];
    assert_ne!(messages[0], messages[1]);
    assert_ne!(messages[1], messages[2]);
    assert_ne!(messages[0], messages[2]);
}

#[test]
fn failure_conversion_test() {
    assert_eq!(
        ScheduleError::from(GeolocationFailure::Timeout),
        ScheduleError::GeolocationDenied
    );
    assert_eq!(
        ScheduleError::from(LookupFailure::NotFound),
        ScheduleError::InvalidPostalCode
    );
    assert_eq!(
        ScheduleError::from(FetchFailure::Status("INVALID_REQUEST".to_string())),
        ScheduleError::SunDataFetchFailed
    );
}
