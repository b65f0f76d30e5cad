use crate::error::{Error, ErrorKind, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// One cycle's worth of assembled text, one field per configured region,
/// in region order. Immutable once constructed; written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingRecord {
    pub texts: Vec<String>,
}

/// Append-only CSV log of readings.
///
/// The file is opened, written, and closed on every append so an external
/// reader can safely consume the log between cycles. The timestamp is stamped
/// here, at append time, not at cycle start.
pub struct ReadingsLog {
    path: PathBuf,
}

impl ReadingsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ReadingsLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one timestamped row. On the very first append (file does not
    /// exist yet) a header row is written first; an existing file never gets
    /// a second header, including across process restarts.
    pub fn append(&self, record: &ReadingRecord) -> Result<()> {
        let write_header = !self.path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                Error::with_source(
                    ErrorKind::Persistence,
                    format!("failed to open log file {} for append", self.path.display()),
                    e,
                )
            })?;
        let mut writer = csv::Writer::from_writer(file);

        if write_header {
            let mut header = vec!["Timestamp".to_string()];
            header.extend((1..=record.texts.len()).map(|i| format!("ROI {} Text", i)));
            writer.write_record(&header)?;
        }

        // Sortable, locale-independent representation
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        let mut row = Vec::with_capacity(record.texts.len() + 1);
        row.push(timestamp);
        row.extend(record.texts.iter().cloned());
        writer.write_record(&row)?;

        writer.flush().map_err(|e| {
            Error::with_source(
                ErrorKind::Persistence,
                format!("failed to flush log file {}", self.path.display()),
                e,
            )
        })?;
        Ok(())
    }
}
