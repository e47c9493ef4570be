//! JSON record writer
//!
//! Writes a single object mapping each URL to its `[question, answer]` pair.

use crate::output::traits::{OutputError, OutputHandler, OutputResult};
use crate::output::write_atomic;
use crate::state::RecordMap;
use std::path::{Path, PathBuf};

/// JSON file output handler
pub struct JsonOutput {
    path: PathBuf,
}

impl JsonOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputHandler for JsonOutput {
    fn write_records(&self, records: &RecordMap) -> OutputResult<()> {
        let encoded = serde_json::to_vec(records)
            .map_err(|e| OutputError::Write(format!("Failed to serialize records: {}", e)))?;
        write_atomic(&self.path, &encoded)?;
        Ok(())
    }

    fn load_records(&self) -> OutputResult<Option<RecordMap>> {
        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let records = serde_json::from_slice(&content).map_err(|e| OutputError::Format {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(Some(records))
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}
