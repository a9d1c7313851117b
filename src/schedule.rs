//! Daily light schedule
//!
//! Every instant of a [`Schedule`] is a fixed offset from sunrise or sunset.
//! The arithmetic is done on UTC instants so day boundaries take care of
//! themselves; turning them into wall-clock strings is left to
//! [`crate::utils::clock`].

use crate::utils::{PartOfDay, PointOfDay, ALL_POINTS};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Civil dawn before sunrise and civil dusk after sunset [min]
pub const CIVIL_TWILIGHT_MINUTES: i64 = 35;
/// Wake time before civil dawn [min]
pub const WAKE_BEFORE_DAWN_MINUTES: i64 = 45;
/// Adult bedtime after sunset [min]
pub const ADULT_BEDTIME_AFTER_SUNSET_MINUTES: i64 = 150;
/// Toddler sleep before wake time [h]
pub const TODDLER_SLEEP_HOURS: i64 = 11;

/// Today's sunrise and sunset as reported by the sun service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawSunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// Which bedtime targets a schedule carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    #[default]
    Adult,
    WithToddler,
}

impl Variant {
    pub fn from_toddler(toddler: bool) -> Variant {
        if toddler {
            Variant::WithToddler
        } else {
            Variant::Adult
        }
    }
}

/// Derived schedule for one day. Never mutated, only replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub wake_time: DateTime<Utc>,
    pub civil_dawn: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub civil_dusk: DateTime<Utc>,
    pub adult_bedtime: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toddler_bedtime: Option<DateTime<Utc>>,
}

impl Schedule {
    /// Apply the fixed offsets to today's sun times
    pub fn from_sun_times(sun: &RawSunTimes, variant: Variant) -> Schedule {
        let civil_dawn = sun.sunrise - Duration::minutes(CIVIL_TWILIGHT_MINUTES);
        let civil_dusk = sun.sunset + Duration::minutes(CIVIL_TWILIGHT_MINUTES);
        let wake_time = civil_dawn - Duration::minutes(WAKE_BEFORE_DAWN_MINUTES);
        let adult_bedtime = sun.sunset + Duration::minutes(ADULT_BEDTIME_AFTER_SUNSET_MINUTES);
        let toddler_bedtime = match variant {
            Variant::Adult => None,
            Variant::WithToddler => Some(wake_time - Duration::hours(TODDLER_SLEEP_HOURS)),
        };
        Schedule {
            wake_time,
            civil_dawn,
            sunrise: sun.sunrise,
            sunset: sun.sunset,
            civil_dusk,
            adult_bedtime,
            toddler_bedtime,
        }
    }

    pub fn variant(&self) -> Variant {
        Variant::from_toddler(self.toddler_bedtime.is_some())
    }

    /// Instant of a named point, `None` for points the variant lacks
    pub fn at(&self, point: PointOfDay) -> Option<DateTime<Utc>> {
        match point {
            PointOfDay::WakeTime => Some(self.wake_time),
            PointOfDay::CivilDawn => Some(self.civil_dawn),
            PointOfDay::Sunrise => Some(self.sunrise),
            PointOfDay::Sunset => Some(self.sunset),
            PointOfDay::CivilDusk => Some(self.civil_dusk),
            PointOfDay::AdultBedtime => Some(self.adult_bedtime),
            PointOfDay::ToddlerBedtime => self.toddler_bedtime,
        }
    }

    /// Begin and end of a walk window
    pub fn walk(&self, part: PartOfDay) -> (DateTime<Utc>, DateTime<Utc>) {
        match part {
            PartOfDay::Morning => (self.civil_dawn, self.sunrise),
            PartOfDay::Evening => (self.sunset, self.civil_dusk),
        }
    }

    /// Labelled instants in display order
    pub fn entries(&self) -> Vec<(PointOfDay, DateTime<Utc>)> {
        ALL_POINTS
            .iter()
            .filter_map(|p| self.at(*p).map(|t| (*p, t)))
            .collect()
    }
}

#[cfg(test)]
fn sample_sun_times() -> RawSunTimes {
    use chrono::TimeZone;
    RawSunTimes {
        sunrise: Utc.with_ymd_and_hms(2024, 6, 1, 6, 12, 0).unwrap(),
        sunset: Utc.with_ymd_and_hms(2024, 6, 1, 19, 47, 0).unwrap(),
    }
}

#[test]
fn offsets_test() {
    use chrono::TimeZone;

    let s = Schedule::from_sun_times(&sample_sun_times(), Variant::WithToddler);
    assert_eq!(s.civil_dawn, Utc.with_ymd_and_hms(2024, 6, 1, 5, 37, 0).unwrap());
    assert_eq!(s.wake_time, Utc.with_ymd_and_hms(2024, 6, 1, 4, 52, 0).unwrap());
    assert_eq!(s.civil_dusk, Utc.with_ymd_and_hms(2024, 6, 1, 20, 22, 0).unwrap());
    assert_eq!(s.adult_bedtime, Utc.with_ymd_and_hms(2024, 6, 1, 22, 17, 0).unwrap());
    // 11 hours before 04:52 is 17:52 on the day before
    assert_eq!(
        s.toddler_bedtime,
        Some(Utc.with_ymd_and_hms(2024, 5, 31, 17, 52, 0).unwrap())
    );
}

#[test]
fn adult_variant_test() {
    let s = Schedule::from_sun_times(&sample_sun_times(), Variant::Adult);
    assert_eq!(s.toddler_bedtime, None);
    assert_eq!(s.variant(), Variant::Adult);
    assert_eq!(s.entries().len(), 6);
    assert!(s
        .entries()
        .iter()
        .all(|(p, _)| *p != PointOfDay::ToddlerBedtime));
}

#[test]
fn walk_window_test() {
    let s = Schedule::from_sun_times(&sample_sun_times(), Variant::Adult);
    let (begin, end) = s.walk(PartOfDay::Morning);
    assert_eq!(begin, s.civil_dawn);
    assert_eq!(end, s.sunrise);
    let (begin, end) = s.walk(PartOfDay::Evening);
    assert_eq!(begin, s.sunset);
    assert_eq!(end, s.civil_dusk);
}

#[test]
fn midnight_crossing_test() {
    use chrono::TimeZone;

    // Sunset after midnight UTC, as for western time zones
    let sun = RawSunTimes {
        sunrise: Utc.with_ymd_and_hms(2024, 12, 1, 0, 20, 0).unwrap(),
        sunset: Utc.with_ymd_and_hms(2024, 12, 1, 23, 0, 0).unwrap(),
    };
    let s = Schedule::from_sun_times(&sun, Variant::Adult);
    assert_eq!(s.wake_time, Utc.with_ymd_and_hms(2024, 11, 30, 23, 0, 0).unwrap());
    assert_eq!(s.civil_dusk, Utc.with_ymd_and_hms(2024, 12, 1, 23, 35, 0).unwrap());
    assert_eq!(s.adult_bedtime, Utc.with_ymd_and_hms(2024, 12, 2, 1, 30, 0).unwrap());
}

#[test]
fn serialize_test() {
    let s = Schedule::from_sun_times(&sample_sun_times(), Variant::Adult);
    let json = serde_json::to_value(s).unwrap();
    assert_eq!(json["sunrise"], "2024-06-01T06:12:00Z");
    assert!(json.get("toddler_bedtime").is_none());
}
