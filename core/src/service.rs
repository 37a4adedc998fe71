use std::path::Path;

use anyhow::{Result, bail};
use chrono::{Local, Utc};
use serde::Serialize;

use crate::aggregate;
use crate::db::Database;
use crate::demo;
use crate::models::{
    BACKUP_VERSION, BackupData, ChartPoint, DailyAggregate, LabelFormat, Measurement,
    NewMeasurement, WeightChange, validate_backup, validate_weight,
};

const GOAL_WEIGHT_KEY: &str = "goal_weight_lbs";
const GOAL_IS_DEMO_KEY: &str = "goal_is_demo";

/// Persistence collaborator for the tracker.
///
/// The aggregation engine never touches storage; everything flows through
/// this seam, so an alternate backend (remote API, ledger-signed store) only
/// has to implement these operations. The store guarantees unique, stable ids
/// and well-formed timestamps.
pub trait MeasurementStore {
    fn load_measurements(&self) -> Result<Vec<Measurement>>;
    fn insert_measurement(&self, entry: &NewMeasurement) -> Result<Measurement>;
    fn insert_measurements(&self, entries: &[NewMeasurement]) -> Result<i64>;
    fn delete_measurement(&self, id: i64) -> Result<bool>;
    fn delete_demo_measurements(&self) -> Result<i64>;
    fn delete_all_measurements(&self) -> Result<i64>;
    fn replace_measurements(&self, entries: &[Measurement]) -> Result<i64>;
    fn get_setting(&self, key: &str) -> Result<Option<String>>;
    fn set_setting(&self, key: &str, value: &str) -> Result<()>;
    fn delete_setting(&self, key: &str) -> Result<bool>;
}

impl MeasurementStore for Database {
    fn load_measurements(&self) -> Result<Vec<Measurement>> {
        Database::load_measurements(self)
    }

    fn insert_measurement(&self, entry: &NewMeasurement) -> Result<Measurement> {
        Database::insert_measurement(self, entry)
    }

    fn insert_measurements(&self, entries: &[NewMeasurement]) -> Result<i64> {
        Database::insert_measurements(self, entries)
    }

    fn delete_measurement(&self, id: i64) -> Result<bool> {
        Database::delete_measurement(self, id)
    }

    fn delete_demo_measurements(&self) -> Result<i64> {
        Database::delete_demo_measurements(self)
    }

    fn delete_all_measurements(&self) -> Result<i64> {
        Database::delete_all_measurements(self)
    }

    fn replace_measurements(&self, entries: &[Measurement]) -> Result<i64> {
        Database::replace_measurements(self, entries)
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Database::get_setting(self, key)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        Database::set_setting(self, key, value)
    }

    fn delete_setting(&self, key: &str) -> Result<bool> {
        Database::delete_setting(self, key)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoLoadSummary {
    pub added: i64,
    pub total: usize,
    pub goal_set: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoClearSummary {
    pub removed: i64,
    pub preserved: usize,
    pub goal_cleared: bool,
}

pub struct TrackerService<S> {
    store: S,
}

impl TrackerService<Database> {
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::with_store(Database::open(db_path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::with_store(Database::open_in_memory()?))
    }
}

impl<S: MeasurementStore> TrackerService<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    // --- Measurements ---

    /// Log a reading. `recorded_at` defaults to now.
    pub fn log_weight(
        &self,
        weight_lbs: f64,
        recorded_at: Option<i64>,
    ) -> Result<Measurement> {
        validate_weight(weight_lbs)?;
        let recorded_at = recorded_at.unwrap_or_else(|| Local::now().timestamp_millis());
        self.store.insert_measurement(&NewMeasurement {
            weight_lbs,
            recorded_at,
            is_demo: false,
        })
    }

    pub fn measurements(&self) -> Result<Vec<Measurement>> {
        self.store.load_measurements()
    }

    pub fn delete_measurement(&self, id: i64) -> Result<bool> {
        self.store.delete_measurement(id)
    }

    // --- Derived views ---

    /// Daily aggregates, optionally limited to the most recent `days` days
    /// that have data.
    pub fn daily_history(&self, days: Option<usize>) -> Result<Vec<DailyAggregate>> {
        let mut aggregates = aggregate::average_by_day(&self.store.load_measurements()?);
        if let Some(n) = days {
            let skip = aggregates.len().saturating_sub(n);
            aggregates.drain(..skip);
        }
        Ok(aggregates)
    }

    pub fn chart(&self, window_days: u32, format: Option<LabelFormat>) -> Result<Vec<ChartPoint>> {
        if window_days == 0 {
            bail!("Chart period must be at least 1 day");
        }
        let format = format.unwrap_or_else(|| LabelFormat::for_window(window_days));
        Ok(aggregate::chart_data(
            &self.store.load_measurements()?,
            window_days,
            format,
        ))
    }

    pub fn stats(&self) -> Result<WeightChange> {
        Ok(aggregate::weight_change(&self.store.load_measurements()?))
    }

    pub fn latest(&self) -> Result<Option<DailyAggregate>> {
        Ok(aggregate::latest_weight(&self.store.load_measurements()?))
    }

    // --- Goal weight ---

    pub fn set_goal(&self, lbs: f64) -> Result<()> {
        validate_weight(lbs)?;
        self.store.set_setting(GOAL_WEIGHT_KEY, &lbs.to_string())?;
        // A goal the user set explicitly is never demo-owned.
        self.store.delete_setting(GOAL_IS_DEMO_KEY)?;
        Ok(())
    }

    pub fn goal(&self) -> Result<Option<f64>> {
        match self.store.get_setting(GOAL_WEIGHT_KEY)? {
            Some(v) => Ok(Some(v.parse::<f64>()?)),
            None => Ok(None),
        }
    }

    pub fn clear_goal(&self) -> Result<bool> {
        self.store.delete_setting(GOAL_IS_DEMO_KEY)?;
        self.store.delete_setting(GOAL_WEIGHT_KEY)
    }

    // --- Demo data ---

    pub fn has_demo_data(&self) -> Result<bool> {
        Ok(self
            .store
            .load_measurements()?
            .iter()
            .any(|m| m.is_demo))
    }

    /// Merge generated demo entries into the store. Manual entries are never
    /// touched; a demo goal is set only when the user has no goal of their
    /// own, and is flagged so `clear_demo_data` can remove it.
    pub fn load_demo_data(&self) -> Result<DemoLoadSummary> {
        if self.has_demo_data()? {
            bail!("Demo data already loaded. Clear it first to reload.");
        }

        let generated = demo::generate_demo_measurements(Local::now().date_naive());
        let added = self.store.insert_measurements(&generated)?;

        let goal_set = if self.goal()?.is_none() {
            self.store
                .set_setting(GOAL_WEIGHT_KEY, &demo::DEMO_GOAL_WEIGHT.to_string())?;
            self.store.set_setting(GOAL_IS_DEMO_KEY, "true")?;
            true
        } else {
            false
        };

        Ok(DemoLoadSummary {
            added,
            total: self.store.load_measurements()?.len(),
            goal_set,
        })
    }

    /// Remove demo entries, preserving manual ones. The goal is cleared only
    /// when demo loading set it.
    pub fn clear_demo_data(&self) -> Result<DemoClearSummary> {
        let removed = self.store.delete_demo_measurements()?;

        let goal_is_demo = self
            .store
            .get_setting(GOAL_IS_DEMO_KEY)?
            .is_some_and(|v| v == "true");
        if goal_is_demo {
            self.store.delete_setting(GOAL_WEIGHT_KEY)?;
            self.store.delete_setting(GOAL_IS_DEMO_KEY)?;
        }

        Ok(DemoClearSummary {
            removed,
            preserved: self.store.load_measurements()?.len(),
            goal_cleared: goal_is_demo,
        })
    }

    /// Delete everything: demo and manual entries, plus the goal.
    pub fn clear_all_data(&self) -> Result<i64> {
        let removed = self.store.delete_all_measurements()?;
        self.store.delete_setting(GOAL_WEIGHT_KEY)?;
        self.store.delete_setting(GOAL_IS_DEMO_KEY)?;
        Ok(removed)
    }

    // --- Backup / restore ---

    pub fn export_backup(&self) -> Result<BackupData> {
        let weights = self.store.load_measurements()?;
        if weights.is_empty() {
            bail!("No data to backup");
        }
        Ok(BackupData {
            weights,
            goal: self.goal()?.map(|g| g.to_string()),
            export_date: Utc::now().to_rfc3339(),
            version: BACKUP_VERSION.to_string(),
        })
    }

    /// Replace all current data with the backup's contents. Returns the
    /// number of restored entries.
    pub fn import_backup(&self, backup: &BackupData) -> Result<i64> {
        validate_backup(backup)?;
        let count = self.store.replace_measurements(&backup.weights)?;
        if let Some(goal) = backup.parse_goal()? {
            self.set_goal(goal)?;
        }
        Ok(count)
    }
}
