// SQLite persistence for evaluation records
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

use super::EvaluationRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("bad timestamp in database: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

pub struct EvaluationStore {
    conn: Connection,
}

impl EvaluationStore {
    /// Open (or create) a database file; `None` keeps everything in memory.
    pub fn open(path: Option<&Path>) -> Result<Self, StoreError> {
        let conn = match path {
            Some(p) => Connection::open(p)?,
            None => Connection::open_in_memory()?,
        };
        Self::create_schema(&conn)?;
        Ok(Self { conn })
    }

    fn create_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS evaluations (
                id INTEGER PRIMARY KEY,
                file_id TEXT NOT NULL,
                rouge_l REAL NOT NULL,
                readability_grade REAL NOT NULL,
                latency_seconds REAL NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_evaluations_file
                ON evaluations(file_id);
        "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, record: &EvaluationRecord) -> Result<i64, StoreError> {
        self.conn.execute(
            r#"INSERT INTO evaluations (file_id, rouge_l, readability_grade, latency_seconds, timestamp)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                record.file_id,
                record.rouge_l,
                record.readability_grade,
                record.latency_seconds,
                record.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_all(&mut self, records: &[EvaluationRecord]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        for record in records {
            tx.execute(
                r#"INSERT INTO evaluations (file_id, rouge_l, readability_grade, latency_seconds, timestamp)
                   VALUES (?1, ?2, ?3, ?4, ?5)"#,
                params![
                    record.file_id,
                    record.rouge_l,
                    record.readability_grade,
                    record.latency_seconds,
                    record.timestamp.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Every stored record, oldest first.
    pub fn all(&self) -> Result<Vec<EvaluationRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT file_id, rouge_l, readability_grade, latency_seconds, timestamp
               FROM evaluations ORDER BY id"#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (file_id, rouge_l, readability_grade, latency_seconds, timestamp) = row?;
            records.push(EvaluationRecord {
                file_id,
                rouge_l,
                readability_grade,
                latency_seconds,
                timestamp: DateTime::parse_from_rfc3339(&timestamp)?.with_timezone(&Utc),
            });
        }
        Ok(records)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM evaluations", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn clear(&self) -> Result<usize, StoreError> {
        Ok(self.conn.execute("DELETE FROM evaluations", [])?)
    }
}
