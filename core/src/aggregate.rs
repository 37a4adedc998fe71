//! The aggregation engine: pure functions that turn a snapshot of raw
//! measurements into daily aggregates, chart series, and summary stats.
//!
//! Everything here is synchronous, side-effect-free, and referentially
//! transparent. Callers pass an immutable slice; the engine never retains
//! references past a call and never mutates its input.

use std::collections::BTreeMap;

use chrono::{Duration, Local, NaiveDate, TimeZone};

use crate::models::{ChartPoint, DailyAggregate, LabelFormat, Measurement, WeightChange};

/// Local calendar day for an epoch-milliseconds timestamp, or `None` when the
/// value is outside the range chrono can represent.
fn local_day(ts_ms: i64) -> Option<NaiveDate> {
    Local
        .timestamp_millis_opt(ts_ms)
        .single()
        .map(|dt| dt.date_naive())
}

/// Group measurements by local calendar day and collapse each day to a single
/// aggregate.
///
/// Days with one reading pass the weight through unchanged; days with several
/// use the arithmetic mean rounded to one decimal. The representative fields
/// come from the day's strictly-latest reading (`>` on timestamp). Output is
/// sorted ascending by day with no duplicate days.
///
/// Records whose timestamp cannot be expressed as a local datetime are
/// skipped rather than failing the call; one corrupt row must not make
/// the whole history unviewable.
#[must_use]
pub fn average_by_day(measurements: &[Measurement]) -> Vec<DailyAggregate> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&Measurement>> = BTreeMap::new();
    for m in measurements {
        if let Some(day) = local_day(m.recorded_at) {
            by_day.entry(day).or_default().push(m);
        }
    }

    by_day
        .into_iter()
        .filter_map(|(day, group)| {
            let count = group.len();
            let mut members = group.iter().copied();
            let first = members.next()?;
            // Strict `>` keeps the earliest of timestamp-tied readings.
            let latest = members.fold(first, |latest, m| {
                if m.recorded_at > latest.recorded_at {
                    m
                } else {
                    latest
                }
            });

            #[allow(clippy::cast_precision_loss)]
            let weight_lbs = if count == 1 {
                latest.weight_lbs
            } else {
                let sum: f64 = group.iter().map(|m| m.weight_lbs).sum();
                (sum / count as f64 * 10.0).round() / 10.0
            };

            Some(DailyAggregate {
                id: latest.id,
                day,
                weight_lbs,
                recorded_at: latest.recorded_at,
                is_demo: latest.is_demo,
                is_averaged: count > 1,
                original_entries: count,
            })
        })
        .collect()
}

/// Chart series for the trailing `window_days` calendar days ending today
/// (local time), inclusive.
#[must_use]
pub fn chart_data(
    measurements: &[Measurement],
    window_days: u32,
    format: LabelFormat,
) -> Vec<ChartPoint> {
    chart_data_ending(measurements, window_days, format, Local::now().date_naive())
}

/// Chart series for the trailing window ending on an explicit day. This is
/// the pure variant `chart_data` delegates to; tests and callers that need a
/// fixed clock use it directly.
///
/// The series is filter-only: every aggregate whose day falls inside
/// `[end - (window_days - 1), end]` is included, and days with no data are
/// omitted entirely, so the series may be sparse.
#[must_use]
pub fn chart_data_ending(
    measurements: &[Measurement],
    window_days: u32,
    format: LabelFormat,
    end: NaiveDate,
) -> Vec<ChartPoint> {
    if window_days == 0 {
        return Vec::new();
    }
    let start = end - Duration::days(i64::from(window_days) - 1);

    average_by_day(measurements)
        .into_iter()
        .filter(|a| a.day >= start && a.day <= end)
        .map(|a| ChartPoint {
            date: a.day.format(format.pattern()).to_string(),
            weight_lbs: a.weight_lbs,
            is_averaged: a.is_averaged,
            original_entries: a.original_entries,
        })
        .collect()
}

/// Net change between the first and last tracked day.
#[must_use]
pub fn weight_change(measurements: &[Measurement]) -> WeightChange {
    let aggregates = average_by_day(measurements);
    let (Some(first), Some(last)) = (aggregates.first(), aggregates.last()) else {
        return WeightChange {
            current: 0.0,
            start: 0.0,
            change: 0.0,
        };
    };
    WeightChange {
        current: last.weight_lbs,
        start: first.weight_lbs,
        change: last.weight_lbs - first.weight_lbs,
    }
}

/// The most recent daily aggregate, or `None` when no measurements exist.
#[must_use]
pub fn latest_weight(measurements: &[Measurement]) -> Option<DailyAggregate> {
    average_by_day(measurements).pop()
}
