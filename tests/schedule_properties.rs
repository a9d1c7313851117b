use chrono::{DateTime, Duration, TimeZone, Utc};
use daylight::schedule::{RawSunTimes, Schedule, Variant};
use proptest::prelude::*;

/// Instants between 1970 and 2100, at second precision
fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_102_444_800).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

/// Sunrise and a sunset up to a day later
fn sun_times_strategy() -> impl Strategy<Value = RawSunTimes> {
    (instant_strategy(), 0i64..86_400).prop_map(|(sunrise, day_length)| RawSunTimes {
        sunrise,
        sunset: sunrise + Duration::seconds(day_length),
    })
}

proptest! {
    #[test]
    fn test_morning_offsets(sun in sun_times_strategy()) {
        let s = Schedule::from_sun_times(&sun, Variant::Adult);
        prop_assert_eq!(s.civil_dawn, sun.sunrise - Duration::minutes(35));
        prop_assert_eq!(s.wake_time, s.civil_dawn - Duration::minutes(45));
        prop_assert_eq!(s.sunrise, sun.sunrise);
    }

    #[test]
    fn test_evening_offsets(sun in sun_times_strategy()) {
        let s = Schedule::from_sun_times(&sun, Variant::WithToddler);
        prop_assert_eq!(s.civil_dusk, sun.sunset + Duration::minutes(35));
        prop_assert_eq!(s.adult_bedtime, sun.sunset + Duration::minutes(150));
        prop_assert_eq!(s.toddler_bedtime, Some(s.wake_time - Duration::minutes(660)));
        prop_assert_eq!(s.sunset, sun.sunset);
    }

    #[test]
    fn test_variants_agree(sun in sun_times_strategy()) {
        let adult = Schedule::from_sun_times(&sun, Variant::Adult);
        let family = Schedule::from_sun_times(&sun, Variant::WithToddler);
        prop_assert_eq!(adult.toddler_bedtime, None);
        prop_assert_eq!(Schedule { toddler_bedtime: None, ..family }, adult);
    }

    #[test]
    fn test_entries_are_chronological(sun in sun_times_strategy()) {
        // toddler bedtime belongs to the evening before, so it is left out
        let s = Schedule::from_sun_times(&sun, Variant::Adult);
        let times: Vec<_> = s.entries().into_iter().map(|(_, t)| t).collect();
        prop_assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }
}
