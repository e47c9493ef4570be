//! # Checkpoint Module
//!
//! Saves and restores the crawl state so an interrupted crawl can resume.
//!
//! A checkpoint captures the visited sets, the permanently failed URLs, the URLs still
//! waiting to be fetched and the record count at the moment it was taken. Records
//! themselves are written separately by the output handler at the same moment.
//!
//! The file is JSON and is replaced atomically (temporary sibling + rename), so a reader
//! sees either the previous checkpoint or the new one. A checkpoint that exists but does
//! not parse is treated as fatal: silently starting over would discard the previous run.
//! Its mere presence at startup is the resume signal; it is deleted once a crawl
//! completes.

use crate::output::write_atomic;
use crate::state::{RecordMap, StoreSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while reading or writing checkpoints
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint {path} is corrupt: {message}")]
    Corrupt { path: String, message: String },

    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A durable snapshot of crawl progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Number of records stored when the snapshot was taken
    #[serde(alias = "question_count")]
    pub record_count: usize,

    /// Question pages already visited
    pub question_links: BTreeSet<String>,

    /// Theme pages already visited
    pub theme_links: BTreeSet<String>,

    /// URLs still to be fetched
    #[serde(alias = "url_queue")]
    pub pending_urls: Vec<String>,

    /// URLs dropped after a permanent failure
    #[serde(default)]
    pub failed_links: BTreeSet<String>,

    /// When the snapshot was written
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,

    /// Hash of the configuration file of the run that wrote the checkpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

impl Checkpoint {
    /// Builds a checkpoint from a store snapshot and the pending URLs
    pub fn from_snapshot(
        snapshot: &StoreSnapshot,
        pending_urls: Vec<String>,
        config_hash: Option<String>,
    ) -> Self {
        Self {
            record_count: snapshot.records.len(),
            question_links: snapshot.question_visited.clone(),
            theme_links: snapshot.theme_visited.clone(),
            pending_urls,
            failed_links: snapshot.dropped.clone(),
            saved_at: Some(Utc::now()),
            config_hash,
        }
    }

    /// Converts the checkpoint back into a store snapshot holding `records`
    pub fn to_store_snapshot(&self, records: RecordMap) -> StoreSnapshot {
        StoreSnapshot {
            theme_visited: self.theme_links.clone(),
            question_visited: self.question_links.clone(),
            dropped: self.failed_links.clone(),
            records,
        }
    }
}

/// Reads, writes and deletes the checkpoint file
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    path: PathBuf,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a checkpoint from a previous run exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes the checkpoint atomically
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let encoded = serde_json::to_vec(checkpoint)
            .map_err(|e| CheckpointError::Serialize(e.to_string()))?;
        write_atomic(&self.path, &encoded)?;

        info!(
            "Checkpoint: {} records, {} theme pages, {} question pages, {} pending",
            checkpoint.record_count,
            checkpoint.theme_links.len(),
            checkpoint.question_links.len(),
            checkpoint.pending_urls.len()
        );
        Ok(())
    }

    /// Loads the checkpoint left by a previous run
    ///
    /// Returns `Ok(None)` when there is none (a fresh start) and
    /// `Err(CheckpointError::Corrupt)` when the file cannot be parsed.
    pub fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No checkpoint at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let checkpoint: Checkpoint =
            serde_json::from_slice(&content).map_err(|e| CheckpointError::Corrupt {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        info!(
            "Loaded checkpoint: {} records, {} pending URLs",
            checkpoint.record_count,
            checkpoint.pending_urls.len()
        );
        Ok(Some(checkpoint))
    }

    /// Removes the checkpoint after a completed crawl
    pub fn delete(&self) -> Result<(), CheckpointError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed checkpoint {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
