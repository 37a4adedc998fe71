use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One logged weight reading.
///
/// `recorded_at` (epoch milliseconds) is the sole source of truth for which
/// calendar day the reading belongs to; the day is derived in local time, not
/// UTC. Serialized field names match the backup/wire format of the companion
/// web UI (`weight`, `timestamp`, `isDemoData`), so backups round-trip
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    #[serde(rename = "weight")]
    pub weight_lbs: f64,
    #[serde(rename = "timestamp")]
    pub recorded_at: i64,
    #[serde(rename = "isDemoData", default)]
    pub is_demo: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewMeasurement {
    pub weight_lbs: f64,
    pub recorded_at: i64,
    pub is_demo: bool,
}

/// One entry per distinct local calendar day: the single reading for that day,
/// or the mean of the day's readings rounded to one decimal. The
/// representative fields (`id`, `recorded_at`, `is_demo`) come from the
/// strictly-latest reading of the day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub id: i64,
    pub day: NaiveDate,
    #[serde(rename = "weight")]
    pub weight_lbs: f64,
    #[serde(rename = "timestamp")]
    pub recorded_at: i64,
    #[serde(rename = "isDemoData")]
    pub is_demo: bool,
    pub is_averaged: bool,
    pub original_entries: usize,
}

/// One rendered point in the trend chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: String,
    #[serde(rename = "weight")]
    pub weight_lbs: f64,
    pub is_averaged: bool,
    pub original_entries: usize,
}

/// Net change between the first and last tracked day. All zero when no
/// measurements exist. `change` is signed; positive means weight went up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightChange {
    pub current: f64,
    pub start: f64,
    pub change: f64,
}

/// The conventional trailing windows offered by the chart UI. Any positive
/// window length is accepted by the engine; these are just the presets.
pub const CHART_PERIODS: &[u32] = &[7, 30, 90];

/// Display format for chart date labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFormat {
    /// "Jan 05"
    Short,
    /// "01/05"
    Medium,
    /// "Jan 05, 2024"
    Full,
    /// "2024-01-05"
    Iso,
}

impl LabelFormat {
    #[must_use]
    pub fn pattern(self) -> &'static str {
        match self {
            Self::Short => "%b %d",
            Self::Medium => "%m/%d",
            Self::Full => "%b %d, %Y",
            Self::Iso => "%Y-%m-%d",
        }
    }

    /// Default label format for a given window length: day-and-month for the
    /// short windows, compact numeric for quarter-length and beyond.
    #[must_use]
    pub fn for_window(window_days: u32) -> Self {
        if window_days <= 30 {
            Self::Short
        } else {
            Self::Medium
        }
    }
}

impl std::str::FromStr for LabelFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "full" => Ok(Self::Full),
            "iso" => Ok(Self::Iso),
            _ => bail!("Invalid label format '{s}'. Use short, medium, full, or iso"),
        }
    }
}

// --- Backup / restore types ---

pub const BACKUP_VERSION: &str = "1.0";

/// Backup document: `{ weights, goal, exportDate, version }`. The goal is
/// carried as a string because that is how the original store kept it;
/// `parse_goal` recovers the number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupData {
    pub weights: Vec<Measurement>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(rename = "exportDate")]
    pub export_date: String,
    pub version: String,
}

impl BackupData {
    /// Parse the goal field, if present and non-empty.
    pub fn parse_goal(&self) -> Result<Option<f64>> {
        match self.goal.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => {
                let lbs: f64 = s
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid goal weight '{s}' in backup"))?;
                validate_weight(lbs)?;
                Ok(Some(lbs))
            }
        }
    }
}

// --- Validation ---

/// A weight must be a positive, finite number of pounds.
pub fn validate_weight(lbs: f64) -> Result<()> {
    if !lbs.is_finite() {
        bail!("Weight must be a number");
    }
    if lbs <= 0.0 {
        bail!("Weight must be greater than 0");
    }
    Ok(())
}

/// Validate a backup document before restoring it: every entry must carry a
/// positive weight, and the goal (when present) must parse.
pub fn validate_backup(backup: &BackupData) -> Result<()> {
    for entry in &backup.weights {
        validate_weight(entry.weight_lbs)?;
    }
    backup.parse_goal()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_weight_positive() {
        assert!(validate_weight(180.0).is_ok());
        assert!(validate_weight(0.1).is_ok());
    }

    #[test]
    fn test_validate_weight_rejects_zero_and_negative() {
        assert!(validate_weight(0.0).is_err());
        assert!(validate_weight(-150.0).is_err());
    }

    #[test]
    fn test_validate_weight_rejects_non_finite() {
        assert!(validate_weight(f64::NAN).is_err());
        assert!(validate_weight(f64::INFINITY).is_err());
    }

    #[test]
    fn test_label_format_patterns() {
        assert_eq!(LabelFormat::Short.pattern(), "%b %d");
        assert_eq!(LabelFormat::Iso.pattern(), "%Y-%m-%d");
    }

    #[test]
    fn test_label_format_for_window() {
        assert_eq!(LabelFormat::for_window(7), LabelFormat::Short);
        assert_eq!(LabelFormat::for_window(30), LabelFormat::Short);
        assert_eq!(LabelFormat::for_window(90), LabelFormat::Medium);
    }

    #[test]
    fn test_label_format_from_str() {
        assert_eq!(
            "short".parse::<LabelFormat>().unwrap(),
            LabelFormat::Short
        );
        assert_eq!("FULL".parse::<LabelFormat>().unwrap(), LabelFormat::Full);
        assert!("fancy".parse::<LabelFormat>().is_err());
    }

    #[test]
    fn test_measurement_wire_field_names() {
        let m = Measurement {
            id: 1,
            uuid: "u".to_string(),
            weight_lbs: 180.5,
            recorded_at: 1_700_000_000_000,
            is_demo: true,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["weight"], 180.5);
        assert_eq!(json["timestamp"], 1_700_000_000_000_i64);
        assert_eq!(json["isDemoData"], true);
    }

    #[test]
    fn test_measurement_deserializes_minimal_backup_entry() {
        // Entries written by the original web UI carry no audit fields.
        let m: Measurement = serde_json::from_str(
            r#"{"id": 7, "weight": 172.4, "timestamp": 1700000000000}"#,
        )
        .unwrap();
        assert_eq!(m.id, 7);
        assert!((m.weight_lbs - 172.4).abs() < f64::EPSILON);
        assert!(!m.is_demo);
        assert!(m.uuid.is_empty());
    }

    #[test]
    fn test_backup_export_date_field_name() {
        let backup = BackupData {
            weights: vec![],
            goal: Some("165".to_string()),
            export_date: "2024-06-15T00:00:00Z".to_string(),
            version: BACKUP_VERSION.to_string(),
        };
        let json = serde_json::to_value(&backup).unwrap();
        assert_eq!(json["exportDate"], "2024-06-15T00:00:00Z");
        assert_eq!(json["version"], "1.0");
    }

    #[test]
    fn test_backup_parse_goal() {
        let mut backup = BackupData {
            weights: vec![],
            goal: Some("165".to_string()),
            export_date: String::new(),
            version: BACKUP_VERSION.to_string(),
        };
        assert_eq!(backup.parse_goal().unwrap(), Some(165.0));

        backup.goal = None;
        assert_eq!(backup.parse_goal().unwrap(), None);

        backup.goal = Some(String::new());
        assert_eq!(backup.parse_goal().unwrap(), None);

        backup.goal = Some("heavy".to_string());
        assert!(backup.parse_goal().is_err());
    }

    #[test]
    fn test_validate_backup_rejects_bad_entry() {
        let backup = BackupData {
            weights: vec![Measurement {
                id: 1,
                uuid: String::new(),
                weight_lbs: -5.0,
                recorded_at: 0,
                is_demo: false,
                created_at: String::new(),
                updated_at: String::new(),
            }],
            goal: None,
            export_date: String::new(),
            version: BACKUP_VERSION.to_string(),
        };
        assert!(validate_backup(&backup).is_err());
    }
}
