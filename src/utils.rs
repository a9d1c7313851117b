//! Common Library

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;

/// Outdoor walk windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOfDay {
    Morning,
    Evening,
}
impl PartOfDay {
    pub fn label(&self) -> &'static str {
        match self {
            PartOfDay::Morning => "Morning walk",
            PartOfDay::Evening => "Evening walk",
        }
    }
}

pub const ALL_DAY: [PartOfDay; 2] = [PartOfDay::Morning, PartOfDay::Evening];

/// Named instants of a schedule, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointOfDay {
    WakeTime,
    CivilDawn,
    Sunrise,
    Sunset,
    CivilDusk,
    AdultBedtime,
    ToddlerBedtime,
}
impl PointOfDay {
    pub fn label(&self) -> &'static str {
        match self {
            PointOfDay::WakeTime => "Wake up",
            PointOfDay::CivilDawn => "Civil dawn (morning walk)",
            PointOfDay::Sunrise => "Sunrise",
            PointOfDay::Sunset => "Sunset (evening walk)",
            PointOfDay::CivilDusk => "Civil dusk",
            PointOfDay::AdultBedtime => "Adult bedtime",
            PointOfDay::ToddlerBedtime => "Toddler bedtime",
        }
    }
}

impl fmt::Display for PointOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const ALL_POINTS: [PointOfDay; 7] = [
    PointOfDay::WakeTime,
    PointOfDay::CivilDawn,
    PointOfDay::Sunrise,
    PointOfDay::Sunset,
    PointOfDay::CivilDusk,
    PointOfDay::AdultBedtime,
    PointOfDay::ToddlerBedtime,
];

/// Static notes shown under every schedule
pub const FOOTNOTES: [&str; 4] = [
    "Civil dawn and dusk are approximated as 35 minutes before sunrise and after sunset.",
    "Wake up 45 minutes before civil dawn so the morning walk starts with the first light.",
    "Adult bedtime is two and a half hours after sunset.",
    "Toddler bedtime leaves 11 hours of sleep before the next wake up.",
];

/// Hour and minute of an instant in the display time zone.
///
/// When the local date differs from `reference`'s local date the day shift
/// is appended, e.g. `20:52 (previous day)`.
pub fn clock<Tz: TimeZone>(instant: &DateTime<Utc>, reference: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    let local = instant.with_timezone(tz);
    let time = local.format("%H:%M").to_string();
    let day = local.date_naive();
    let reference_day = reference.with_timezone(tz).date_naive();
    if day < reference_day {
        format!("{} (previous day)", time)
    } else if day > reference_day {
        format!("{} (next day)", time)
    } else {
        time
    }
}

#[test]
fn clock_test() {
    use chrono::FixedOffset;

    let utc = Utc;
    let sunrise = utc.with_ymd_and_hms(2024, 3, 10, 6, 12, 0).unwrap();
    let earlier = utc.with_ymd_and_hms(2024, 3, 9, 17, 52, 0).unwrap();
    assert_eq!(clock(&sunrise, &sunrise, &utc), "06:12");
    assert_eq!(clock(&earlier, &sunrise, &utc), "17:52 (previous day)");

    // 06:12 UTC is still the 10th in UTC-5, 17:52 UTC on the 9th is 12:52 local
    let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
    assert_eq!(clock(&sunrise, &sunrise, &eastern), "01:12");
    assert_eq!(clock(&earlier, &sunrise, &eastern), "12:52 (previous day)");
}
