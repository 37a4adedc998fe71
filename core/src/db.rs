use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::models::{Measurement, NewMeasurement};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS measurements (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    weight_lbs REAL NOT NULL,
                    recorded_at INTEGER NOT NULL,
                    is_demo INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_measurements_recorded_at
                    ON measurements(recorded_at);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS user_settings (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
                );

                PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn measurement_from_row(row: &rusqlite::Row) -> rusqlite::Result<Measurement> {
        Ok(Measurement {
            id: row.get(0)?,
            uuid: row.get(1)?,
            weight_lbs: row.get(2)?,
            recorded_at: row.get(3)?,
            is_demo: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    // --- Measurements ---

    pub fn insert_measurement(&self, entry: &NewMeasurement) -> Result<Measurement> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO measurements (uuid, weight_lbs, recorded_at, is_demo, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![uuid, entry.weight_lbs, entry.recorded_at, entry.is_demo, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_measurement(id)?
            .context("Measurement not found after insert")
    }

    pub fn insert_measurements(&self, entries: &[NewMeasurement]) -> Result<i64> {
        self.conn.execute_batch("BEGIN")?;
        let result: Result<()> = entries.iter().try_for_each(|entry| {
            let now = Local::now().to_rfc3339();
            let uuid = Uuid::new_v4().to_string();
            self.conn.execute(
                "INSERT INTO measurements (uuid, weight_lbs, recorded_at, is_demo, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![uuid, entry.weight_lbs, entry.recorded_at, entry.is_demo, now, now],
            )?;
            Ok(())
        });
        match result {
            Ok(()) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(entries.len() as i64)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    pub fn get_measurement(&self, id: i64) -> Result<Option<Measurement>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, weight_lbs, recorded_at, is_demo, created_at, updated_at
             FROM measurements WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::measurement_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// All measurements, ordered ascending by timestamp.
    pub fn load_measurements(&self) -> Result<Vec<Measurement>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, weight_lbs, recorded_at, is_demo, created_at, updated_at
             FROM measurements ORDER BY recorded_at ASC, id ASC",
        )?;
        let entries = stmt
            .query_map([], Self::measurement_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn delete_measurement(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM measurements WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Delete demo-flagged rows only; manual entries are untouched.
    pub fn delete_demo_measurements(&self) -> Result<i64> {
        let rows = self
            .conn
            .execute("DELETE FROM measurements WHERE is_demo = 1", [])?;
        Ok(rows as i64)
    }

    pub fn delete_all_measurements(&self) -> Result<i64> {
        let rows = self.conn.execute("DELETE FROM measurements", [])?;
        Ok(rows as i64)
    }

    /// Replace the whole measurement set (backup restore). Incoming rows keep
    /// their uuid when they have one and their demo flag; ids are reassigned.
    pub fn replace_measurements(&self, entries: &[Measurement]) -> Result<i64> {
        self.conn.execute_batch("BEGIN")?;
        let result: Result<()> = (|| {
            self.conn.execute("DELETE FROM measurements", [])?;
            for entry in entries {
                let now = Local::now().to_rfc3339();
                let uuid = if entry.uuid.is_empty() {
                    Uuid::new_v4().to_string()
                } else {
                    entry.uuid.clone()
                };
                let created_at = if entry.created_at.is_empty() {
                    now.clone()
                } else {
                    entry.created_at.clone()
                };
                self.conn.execute(
                    "INSERT INTO measurements (uuid, weight_lbs, recorded_at, is_demo, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![uuid, entry.weight_lbs, entry.recorded_at, entry.is_demo, created_at, now],
                )?;
            }
            Ok(())
        })();
        match result {
            Ok(()) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(entries.len() as i64)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    // --- User settings ---

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO user_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM user_settings WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM user_settings WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(weight_lbs: f64, recorded_at: i64, is_demo: bool) -> NewMeasurement {
        NewMeasurement {
            weight_lbs,
            recorded_at,
            is_demo,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let m = db.insert_measurement(&sample(180.0, 1_700_000_000_000, false)).unwrap();
        assert!(m.id > 0);
        assert!(!m.uuid.is_empty());
        assert!((m.weight_lbs - 180.0).abs() < f64::EPSILON);
        assert_eq!(m.recorded_at, 1_700_000_000_000);
        assert!(!m.is_demo);
        assert!(!m.created_at.is_empty());
    }

    #[test]
    fn test_load_ordered_by_timestamp() {
        let db = Database::open_in_memory().unwrap();
        db.insert_measurement(&sample(179.0, 3_000, false)).unwrap();
        db.insert_measurement(&sample(180.0, 1_000, false)).unwrap();
        db.insert_measurement(&sample(178.5, 2_000, false)).unwrap();

        let all = db.load_measurements().unwrap();
        let timestamps: Vec<i64> = all.iter().map(|m| m.recorded_at).collect();
        assert_eq!(timestamps, vec![1_000, 2_000, 3_000]);
    }

    #[test]
    fn test_ids_are_unique_and_stable() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_measurement(&sample(180.0, 1, false)).unwrap();
        let b = db.insert_measurement(&sample(181.0, 2, false)).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(db.get_measurement(a.id).unwrap().unwrap().uuid, a.uuid);
    }

    #[test]
    fn test_delete_measurement() {
        let db = Database::open_in_memory().unwrap();
        let m = db.insert_measurement(&sample(180.0, 1, false)).unwrap();
        assert!(db.delete_measurement(m.id).unwrap());
        assert!(db.get_measurement(m.id).unwrap().is_none());
        // Deleting again reports not-found.
        assert!(!db.delete_measurement(m.id).unwrap());
    }

    #[test]
    fn test_bulk_insert() {
        let db = Database::open_in_memory().unwrap();
        let entries = vec![
            sample(195.0, 1, true),
            sample(194.2, 2, true),
            sample(193.8, 3, true),
        ];
        let count = db.insert_measurements(&entries).unwrap();
        assert_eq!(count, 3);
        assert_eq!(db.load_measurements().unwrap().len(), 3);
    }

    #[test]
    fn test_delete_demo_preserves_manual() {
        let db = Database::open_in_memory().unwrap();
        db.insert_measurement(&sample(180.0, 1, false)).unwrap();
        db.insert_measurement(&sample(195.0, 2, true)).unwrap();
        db.insert_measurement(&sample(194.0, 3, true)).unwrap();

        let removed = db.delete_demo_measurements().unwrap();
        assert_eq!(removed, 2);

        let remaining = db.load_measurements().unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(!remaining[0].is_demo);
    }

    #[test]
    fn test_delete_all() {
        let db = Database::open_in_memory().unwrap();
        db.insert_measurement(&sample(180.0, 1, false)).unwrap();
        db.insert_measurement(&sample(195.0, 2, true)).unwrap();
        assert_eq!(db.delete_all_measurements().unwrap(), 2);
        assert!(db.load_measurements().unwrap().is_empty());
    }

    #[test]
    fn test_replace_measurements() {
        let db = Database::open_in_memory().unwrap();
        db.insert_measurement(&sample(150.0, 1, false)).unwrap();

        let incoming = vec![
            Measurement {
                id: 99,
                uuid: "keep-this-uuid".to_string(),
                weight_lbs: 172.0,
                recorded_at: 10,
                is_demo: false,
                created_at: "2024-01-01T00:00:00Z".to_string(),
                updated_at: String::new(),
            },
            Measurement {
                id: 100,
                uuid: String::new(),
                weight_lbs: 171.0,
                recorded_at: 20,
                is_demo: true,
                created_at: String::new(),
                updated_at: String::new(),
            },
        ];
        let count = db.replace_measurements(&incoming).unwrap();
        assert_eq!(count, 2);

        let all = db.load_measurements().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].uuid, "keep-this-uuid");
        assert_eq!(all[0].created_at, "2024-01-01T00:00:00Z");
        assert!(!all[1].uuid.is_empty());
        assert!(all[1].is_demo);
    }

    #[test]
    fn test_settings_set_get_delete() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_setting("goal_weight_lbs").unwrap().is_none());

        db.set_setting("goal_weight_lbs", "165").unwrap();
        assert_eq!(
            db.get_setting("goal_weight_lbs").unwrap().as_deref(),
            Some("165")
        );

        db.set_setting("goal_weight_lbs", "160").unwrap();
        assert_eq!(
            db.get_setting("goal_weight_lbs").unwrap().as_deref(),
            Some("160")
        );

        assert!(db.delete_setting("goal_weight_lbs").unwrap());
        assert!(!db.delete_setting("goal_weight_lbs").unwrap());
    }

    #[test]
    fn test_migration_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let version: i64 = db
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }
}
