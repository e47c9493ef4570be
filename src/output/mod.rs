//! Output module for persisting harvested records
//!
//! This module handles:
//! - Writing the record set as JSON or SQLite
//! - Loading records written by an interrupted run
//! - Recording and printing crawl statistics

mod json_output;
mod sqlite_output;
pub mod stats;
mod traits;

pub use json_output::JsonOutput;
pub use sqlite_output::SqliteOutput;
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{OutputError, OutputHandler, OutputResult};

use crate::config::{OutputConfig, OutputFormat};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Builds the output handler selected by the configuration
pub fn build_output_handler(config: &OutputConfig) -> Box<dyn OutputHandler> {
    match config.format {
        OutputFormat::Json => Box::new(JsonOutput::new(&config.records_path)),
        OutputFormat::Sqlite => Box::new(SqliteOutput::new(&config.records_path)),
    }
}

/// Writes `contents` to `path` so readers never observe a partial file
///
/// The data goes to a sibling `<name>.tmp` file which is synced and then renamed
/// over the destination.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp_path = temp_sibling(path);

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp_path, path)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
