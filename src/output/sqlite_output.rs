//! SQLite-based output handler implementation
//!
//! This module provides an output handler that stores harvested records in a
//! single SQLite table, replacing its contents on every write.

use crate::output::traits::{OutputHandler, OutputResult};
use crate::state::{Record, RecordMap};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

const CREATE_RECORDS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS records (
    url TEXT PRIMARY KEY NOT NULL,
    question TEXT NOT NULL,
    answer TEXT NOT NULL
);";

/// SQLite output handler
///
/// A connection is opened per call; writes happen only from the engine's control loop,
/// so there is never more than one writer.
pub struct SqliteOutput {
    path: PathBuf,
}

impl SqliteOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> OutputResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(CREATE_RECORDS_TABLE)?;
        Ok(conn)
    }
}

impl OutputHandler for SqliteOutput {
    fn write_records(&self, records: &RecordMap) -> OutputResult<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM records", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO records (url, question, answer) VALUES (?1, ?2, ?3)")?;
            for (url, record) in records {
                stmt.execute(params![url, record.question, record.answer])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn load_records(&self) -> OutputResult<Option<RecordMap>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT url, question, answer FROM records")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                Record::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
            ))
        })?;

        let mut records = RecordMap::new();
        for row in rows {
            let (url, record) = row?;
            records.insert(url, record);
        }

        Ok(Some(records))
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}
