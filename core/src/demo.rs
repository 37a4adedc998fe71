//! Demo data generation: a realistic 90-day weight-loss curve used to
//! populate an empty tracker for demonstration. Every generated record is
//! flagged `is_demo` so it can be removed later without touching manual
//! entries.

use chrono::{Datelike, Duration, Local, NaiveDate, TimeZone, Weekday};
use rand::Rng;

use crate::models::NewMeasurement;

pub const DEMO_START_WEIGHT: f64 = 195.0;
pub const DEMO_END_WEIGHT: f64 = 170.0;
pub const DEMO_TOTAL_DAYS: u32 = 90;
pub const DEMO_GOAL_WEIGHT: f64 = 165.0;

const SKIP_PROBABILITY: f64 = 0.25;
const MORNING_PROBABILITY: f64 = 0.7;
const DAILY_FLUCTUATION: f64 = 2.5;
const WEEKEND_EFFECT: f64 = 0.3;

/// Epoch milliseconds for a local date and time, skipping times that do not
/// exist locally (DST gaps).
fn local_ms(date: NaiveDate, hour: u32, minute: u32) -> Option<i64> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

/// Generate a demo weight-loss history ending on `today`.
///
/// The curve runs 195 → ~170 lbs over 90 days with sub-linear progression
/// (faster loss early), ±1.25 lb daily noise, a small weekend bump, two
/// plateaus with a "whoosh" after each, and roughly a quarter of days skipped
/// so the series looks like a real log. The first and last days are always
/// present so the range is stable.
#[must_use]
pub fn generate_demo_measurements(today: NaiveDate) -> Vec<NewMeasurement> {
    let mut rng = rand::rng();
    let total_loss = DEMO_START_WEIGHT - DEMO_END_WEIGHT;
    let mut data = Vec::new();

    for day in 0..=DEMO_TOTAL_DAYS {
        let date = today - Duration::days(i64::from(DEMO_TOTAL_DAYS - day));

        // Sub-linear progression: faster loss at the start.
        let progress = f64::from(day) / f64::from(DEMO_TOTAL_DAYS);
        let base = DEMO_START_WEIGHT - total_loss * progress.powf(0.7);

        let fluctuation = (rng.random::<f64>() - 0.5) * DAILY_FLUCTUATION;

        let weekend = match date.weekday() {
            Weekday::Sat | Weekday::Sun => WEEKEND_EFFECT,
            _ => 0.0,
        };

        // Plateaus with a whoosh at the end of each.
        let mut plateau = match day {
            20..=30 => 1.5,
            31 => -1.5,
            50..=55 => 1.0,
            56 => -1.0,
            _ => 0.0,
        };
        if rng.random::<f64>() < 0.1 {
            plateau += (rng.random::<f64>() - 0.5) * 1.5;
        }

        let weight = ((base + fluctuation + weekend + plateau) * 10.0).round() / 10.0;
        let weight = weight.max(DEMO_END_WEIGHT - 2.0);

        let include =
            day == 0 || day == DEMO_TOTAL_DAYS || rng.random::<f64>() > SKIP_PROBABILITY;
        if !include {
            continue;
        }

        // Mostly morning weigh-ins, the rest in the evening.
        let hour = if rng.random::<f64>() < MORNING_PROBABILITY {
            rng.random_range(6..9)
        } else {
            rng.random_range(19..22)
        };
        let minute = rng.random_range(0..60);

        if let Some(recorded_at) = local_ms(date, hour, minute) {
            data.push(NewMeasurement {
                weight_lbs: weight,
                recorded_at,
                is_demo: true,
            });
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_all_entries_flagged_demo() {
        let data = generate_demo_measurements(today());
        assert!(data.iter().all(|m| m.is_demo));
    }

    #[test]
    fn test_first_and_last_days_always_present() {
        let data = generate_demo_measurements(today());
        let first_day = today() - Duration::days(i64::from(DEMO_TOTAL_DAYS));
        let first = local_ms(first_day, 0, 0).unwrap();
        let next = local_ms(first_day + Duration::days(1), 0, 0).unwrap();
        assert!(data.first().is_some_and(|m| (first..next).contains(&m.recorded_at)));

        let last_start = local_ms(today(), 0, 0).unwrap();
        assert!(data.last().is_some_and(|m| m.recorded_at >= last_start));
    }

    #[test]
    fn test_entry_count_reflects_skipped_days() {
        let data = generate_demo_measurements(today());
        // Endpoints always included; around 25% of the rest skipped.
        assert!(data.len() >= 2);
        assert!(data.len() <= (DEMO_TOTAL_DAYS + 1) as usize);
    }

    #[test]
    fn test_weights_within_plausible_bounds() {
        let data = generate_demo_measurements(today());
        for m in &data {
            assert!(m.weight_lbs >= DEMO_END_WEIGHT - 2.0, "too low: {}", m.weight_lbs);
            assert!(m.weight_lbs <= DEMO_START_WEIGHT + 4.0, "too high: {}", m.weight_lbs);
        }
    }

    #[test]
    fn test_entries_sorted_by_timestamp() {
        let data = generate_demo_measurements(today());
        for pair in data.windows(2) {
            assert!(pair[0].recorded_at < pair[1].recorded_at);
        }
    }

    #[test]
    fn test_weights_rounded_to_one_decimal() {
        let data = generate_demo_measurements(today());
        for m in &data {
            let scaled = m.weight_lbs * 10.0;
            assert!((scaled - scaled.round()).abs() < 1e-6);
        }
    }
}
