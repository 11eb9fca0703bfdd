//! Timestamped error-log files.
//!
//! Unexpected failures (storage errors, I/O errors, panics) are written to
//! `error@<timestamp>.log` in the logs directory so they can be inspected after the
//! fact. The user only sees a short message pointing at the file.

use crate::errors::Result;
use chrono::{DateTime, Local};
use std::error::Error as StdError;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tracing::error;

const BANNER: &str = "\
┏━━━━━━━━━━━━━━━━━━━━━━━━━┓
┃ EBook Manager Error Log ┃
┗━━━━━━━━━━━━━━━━━━━━━━━━━┛";

/// Timestamp format used in log file names and the version line.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H.%M.%S";

/// Writer of error-log files into one directory.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    dir: PathBuf,
}

impl ErrorLog {
    /// Log writer for `dir`. The directory must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File name of a log written at `at`.
    #[must_use]
    pub fn file_name(at: DateTime<Local>) -> String {
        format!("error@{}.log", at.format(LOG_TIMESTAMP_FORMAT))
    }

    /// Full log text: banner, version line, then `details`.
    #[must_use]
    pub fn render(details: &str, at: DateTime<Local>) -> String {
        format!(
            "{BANNER}\nE-Book manager version {} @ {}\nDetailed error information below:\n\n{details}\n",
            env!("CARGO_PKG_VERSION"),
            at.format(LOG_TIMESTAMP_FORMAT)
        )
    }

    /// Writes a log for `err` stamped with the current time.
    pub fn record(&self, err: &dyn StdError) -> Result<PathBuf> {
        self.record_at(err, Local::now())
    }

    /// Writes a log for `err` stamped with `at`. An existing file of the same name is
    /// replaced.
    pub fn record_at(&self, err: &dyn StdError, at: DateTime<Local>) -> Result<PathBuf> {
        self.write(&error_chain(err), at)
    }

    /// Writes a log for a panic message. Used from the panic hook, so failures are
    /// reported through `tracing` only.
    pub fn record_panic(&self, message: &str) -> Option<PathBuf> {
        let details = format!("The application panicked: {message}");
        self.write(&details, Local::now())
            .inspect_err(|e| error!("Could not write panic log: {}", e))
            .ok()
    }

    fn write(&self, details: &str, at: DateTime<Local>) -> Result<PathBuf> {
        let path = self.dir.join(Self::file_name(at));
        fs::write(&path, Self::render(details, at))?;
        error!("Error log written to {}", path.display());
        Ok(path)
    }
}

/// Renders an error followed by each of its sources, one per line.
#[must_use]
pub fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(out, "\n  caused by: {cause}");
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::RecordKind;
    use crate::errors::Error;
    use chrono::TimeZone;
    use sea_orm::DbErr;

    #[test]
    fn test_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 9).unwrap();
        assert_eq!(ErrorLog::file_name(at), "error@2024-03-09 07.05.09.log");
    }

    #[test]
    fn test_record_writes_banner_version_and_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log = ErrorLog::new(dir.path());
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 0, 0).unwrap();

        let err = Error::Database(DbErr::Custom("disk I/O error".to_string()));
        let path = log.record_at(&err, at)?;

        let text = fs::read_to_string(path)?;
        assert!(text.contains("EBook Manager Error Log"));
        assert!(text.contains(&format!(
            "E-Book manager version {} @ 2024-03-09 14.00.00",
            env!("CARGO_PKG_VERSION")
        )));
        assert!(text.contains("disk I/O error"));
        Ok(())
    }

    #[test]
    fn test_error_chain_lists_sources() {
        let io = std::io::Error::other("permission denied");
        let err = Error::Io(io);
        let chain = error_chain(&err);
        assert!(chain.contains("permission denied"));

        let plain = Error::NothingSelected {
            kind: RecordKind::Student,
        };
        assert!(!error_chain(&plain).contains("caused by"));
    }

    #[test]
    fn test_record_panic_in_missing_dir_is_reported_not_raised() {
        let log = ErrorLog::new("/nonexistent/ebook-manager/logs");
        assert!(log.record_panic("boom").is_none());
    }
}
