//! SQLite-based store implementation

use chrono::{DateTime, Local, NaiveDate};
use presence_api::DailyTally;
use presence_util::StaffId;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, ConfirmationOutcome, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Confirmation outcomes per staff member and day
            CREATE TABLE IF NOT EXISTS confirmation_tally (
                staff_id TEXT NOT NULL,
                day TEXT NOT NULL,
                confirmed INTEGER NOT NULL DEFAULT 0,
                missed INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (staff_id, day)
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_tally_day ON confirmation_tally(day);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

impl Store for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| presence_util::now());
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn record_outcome(
        &self,
        staff_id: &StaffId,
        day: NaiveDate,
        outcome: ConfirmationOutcome,
    ) -> StoreResult<()> {
        let conn = self.conn()?;
        let day_str = day_key(day);
        let (confirmed, missed) = match outcome {
            ConfirmationOutcome::Confirmed => (1, 0),
            ConfirmationOutcome::Missed => (0, 1),
        };

        conn.execute(
            r#"
            INSERT INTO confirmation_tally (staff_id, day, confirmed, missed)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(staff_id, day)
            DO UPDATE SET confirmed = confirmed + excluded.confirmed,
                          missed = missed + excluded.missed
            "#,
            params![staff_id.as_str(), day_str, confirmed, missed],
        )?;

        debug!(staff_id = %staff_id, day = %day_str, outcome = ?outcome, "Outcome recorded");
        Ok(())
    }

    fn get_tally(&self, staff_id: &StaffId, day: NaiveDate) -> StoreResult<DailyTally> {
        let conn = self.conn()?;

        let counts: Option<(i64, i64)> = conn
            .query_row(
                "SELECT confirmed, missed FROM confirmation_tally WHERE staff_id = ? AND day = ?",
                params![staff_id.as_str(), day_key(day)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let mut tally = DailyTally::empty(staff_id.clone(), day);
        if let Some((confirmed, missed)) = counts {
            tally.confirmed = confirmed.max(0) as u64;
            tally.missed = missed.max(0) as u64;
        }
        Ok(tally)
    }

    fn is_healthy(&self) -> bool {
        match self.conn() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
