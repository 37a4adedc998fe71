use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;
use std::io::{self, BufRead, Write};

/// Parse a date argument: YYYY-MM-DD or today/yesterday (default: today).
pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday")
            }),
        },
    }
}

/// Parse a time argument in HH:MM (24-hour) form.
pub(crate) fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .with_context(|| format!("Invalid time '{s}'. Use HH:MM (24-hour)"))
}

/// Epoch milliseconds for a local date and time. When the combination falls
/// in a DST gap the earlier valid interpretation is used; for a date with no
/// explicit time, noon avoids midnight DST edge cases entirely.
pub(crate) fn timestamp_for(date: NaiveDate, time: Option<NaiveTime>) -> Result<i64> {
    let time = time.unwrap_or_else(|| NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default());
    let naive = date.and_time(time);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .with_context(|| format!("Time {naive} does not exist in the local timezone"))
}

/// Render an epoch-milliseconds timestamp as a local "YYYY-MM-DD HH:MM".
pub(crate) fn format_timestamp(ts_ms: i64) -> String {
    Local
        .timestamp_millis_opt(ts_ms)
        .single()
        .map_or_else(|| format!("@{ts_ms}"), |dt| dt.format("%Y-%m-%d %H:%M").to_string())
}

/// Signed weight delta for display: "+1.2", "-0.8", "0.0".
pub(crate) fn format_change(change: f64) -> String {
    if change > 0.0 {
        format!("+{change:.1}")
    } else {
        format!("{change:.1}")
    }
}

/// Ask the user to confirm a destructive action. Returns true on "y"/"yes".
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N]: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(
            parse_time("07:30").unwrap(),
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        assert_eq!(
            parse_time("21:05").unwrap(),
            NaiveTime::from_hms_opt(21, 5, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_time_invalid() {
        assert!(parse_time("7:30pm").is_err());
        assert!(parse_time("25:00").is_err());
    }

    #[test]
    fn test_timestamp_for_round_trips_through_local_day() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let ts = timestamp_for(date, None).unwrap();
        let back = Local.timestamp_millis_opt(ts).single().unwrap();
        assert_eq!(back.date_naive(), date);
    }

    #[test]
    fn test_timestamp_for_explicit_time() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let time = NaiveTime::from_hms_opt(7, 30, 0).unwrap();
        let ts = timestamp_for(date, Some(time)).unwrap();
        let back = Local.timestamp_millis_opt(ts).single().unwrap();
        assert_eq!(back.time(), time);
    }

    #[test]
    fn test_format_timestamp() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let time = NaiveTime::from_hms_opt(7, 30, 0).unwrap();
        let ts = timestamp_for(date, Some(time)).unwrap();
        assert_eq!(format_timestamp(ts), "2024-06-15 07:30");
    }

    #[test]
    fn test_format_change_sign() {
        assert_eq!(format_change(1.25), "+1.2");
        assert_eq!(format_change(-0.8), "-0.8");
        assert_eq!(format_change(0.0), "0.0");
    }

    #[test]
    fn test_json_error() {
        let s = json_error("boom");
        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(v["error"], "boom");
    }
}
