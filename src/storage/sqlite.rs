use crate::model::{PersistenceError, StoredRecord, SummaryRecord};
use crate::utils::parse_datetime;
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;

/// Durable mirror of the history store. The in-memory store stays authoritative;
/// this only keeps the newest summaries across restarts.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database file and creates the schema if needed.
    pub fn new(db_path: &str) -> Result<Self, PersistenceError> {
        Self::init(Connection::open(db_path)?)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, PersistenceError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS summaries (
                id INTEGER PRIMARY KEY,
                filename TEXT NOT NULL,
                total_equipment INTEGER NOT NULL,
                avg_flowrate REAL,
                avg_pressure REAL,
                avg_temperature REAL,
                type_distribution TEXT NOT NULL,
                uploaded_at TEXT NOT NULL
            );
            "
        )?;

        Ok(Self { conn })
    }

    /// Writes one stored summary, replacing any row with the same id.
    pub fn save(&self, record: &StoredRecord) -> Result<(), PersistenceError> {
        let distribution = serde_json::to_string(&record.summary.type_distribution)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO summaries (
                id, filename, total_equipment,
                avg_flowrate, avg_pressure, avg_temperature,
                type_distribution, uploaded_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id as i64,
                &record.summary.filename,
                record.summary.total_equipment as i64,
                record.summary.avg_flowrate,
                record.summary.avg_pressure,
                record.summary.avg_temperature,
                distribution,
                record.uploaded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Deletes everything but the newest `capacity` rows. Returns the number removed.
    pub fn trim_to(&self, capacity: usize) -> Result<usize, PersistenceError> {
        let removed = self.conn.execute(
            "DELETE FROM summaries WHERE id NOT IN (
                SELECT id FROM summaries ORDER BY id DESC LIMIT ?1
            )",
            params![capacity as i64],
        )?;
        Ok(removed)
    }

    /// Newest `n` summaries, returned oldest first so they can be replayed into a store.
    pub fn load_recent(&self, n: usize) -> Result<Vec<StoredRecord>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, filename, total_equipment, avg_flowrate, avg_pressure, avg_temperature,
                    type_distribution, uploaded_at
             FROM summaries ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![n as i64], RawRow::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        records.reverse();

        Ok(records)
    }

    pub fn count(&self) -> Result<usize, PersistenceError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM summaries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Column values as read, before decoding the JSON and timestamp text.
struct RawRow {
    id: i64,
    filename: String,
    total_equipment: i64,
    avg_flowrate: Option<f64>,
    avg_pressure: Option<f64>,
    avg_temperature: Option<f64>,
    type_distribution: String,
    uploaded_at: String,
}

impl RawRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            filename: row.get(1)?,
            total_equipment: row.get(2)?,
            avg_flowrate: row.get(3)?,
            avg_pressure: row.get(4)?,
            avg_temperature: row.get(5)?,
            type_distribution: row.get(6)?,
            uploaded_at: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<StoredRecord, PersistenceError> {
        let uploaded_at = parse_datetime(&self.uploaded_at)
            .ok_or_else(|| PersistenceError::Timestamp(self.uploaded_at.clone()))?;
        let type_distribution: BTreeMap<String, u64> = serde_json::from_str(&self.type_distribution)?;

        Ok(StoredRecord {
            id: self.id as u64,
            summary: SummaryRecord {
                total_equipment: self.total_equipment as u64,
                avg_flowrate: self.avg_flowrate,
                avg_pressure: self.avg_pressure,
                avg_temperature: self.avg_temperature,
                type_distribution,
                filename: self.filename,
            },
            uploaded_at,
        })
    }
}
