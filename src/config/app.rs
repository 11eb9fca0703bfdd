//! Application configuration loaded from `config.toml`.
//!
//! Every field is optional in the file; anything left out falls back to the defaults
//! below. The file itself is optional too: a missing `config.toml` simply yields
//! [`AppConfig::default`].

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable that overrides the location of `config.toml`
pub const CONFIG_PATH_ENV: &str = "EBOOK_MANAGER_CONFIG";

/// Default number of report lines on continuation pages
pub const DEFAULT_REPORT_PAGE_LINES: usize = 35;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory for databases, reports, exports and logs
    pub data_dir: PathBuf,
    /// Database file name (relative to `data_dir`) or absolute path
    pub database_file: PathBuf,
    /// How many student lines fit on a continuation page of the report
    pub report_page_lines: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map_or_else(|| PathBuf::from("."), PathBuf::from);
        Self {
            data_dir: home.join("EbookManagerData"),
            database_file: PathBuf::from("ebooks.db"),
            report_page_lines: DEFAULT_REPORT_PAGE_LINES,
        }
    }
}

impl AppConfig {
    /// Full path of the database file.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    /// Directory generated reports are written to.
    #[must_use]
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    /// Directory error logs are written to.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Default directory for CSV exports.
    #[must_use]
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    /// Creates the data directory and its `reports`, `logs` and `exports` children.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            self.data_dir.clone(),
            self.reports_dir(),
            self.logs_dir(),
            self.exports_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| Error::Config {
                message: format!("Unable to create {}: {e}", dir.display()),
            })?;
        }
        debug!("Data directories ready under {}", self.data_dir.display());
        Ok(())
    }
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - `report_page_lines` is zero
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    let config: AppConfig = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if config.report_page_lines == 0 {
        return Err(Error::Config {
            message: "report_page_lines must be at least 1".to_string(),
        });
    }

    Ok(config)
}

/// Loads configuration from `$EBOOK_MANAGER_CONFIG` or `./config.toml`, falling back
/// to defaults when neither file exists.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from("config.toml"), PathBuf::from);

    if path.exists() {
        info!("Loading configuration from {}", path.display());
        load_config(path)
    } else {
        info!("No configuration file at {}, using defaults", path.display());
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            data_dir = "/srv/ebooks"
            database_file = "school.db"
            report_page_lines = 20
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/ebooks"));
        assert_eq!(config.database_path(), PathBuf::from("/srv/ebooks/school.db"));
        assert_eq!(config.reports_dir(), PathBuf::from("/srv/ebooks/reports"));
        assert_eq!(config.logs_dir(), PathBuf::from("/srv/ebooks/logs"));
        assert_eq!(config.report_page_lines, 20);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig = toml::from_str(r#"data_dir = "/srv/ebooks""#).unwrap();
        assert_eq!(config.database_file, PathBuf::from("ebooks.db"));
        assert_eq!(config.report_page_lines, DEFAULT_REPORT_PAGE_LINES);
    }

    #[test]
    fn test_load_config_rejects_zero_page_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "report_page_lines = 0\n").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/definitely/not/here/config.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_ensure_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().join("data"),
            ..AppConfig::default()
        };
        config.ensure_directories().unwrap();
        assert!(config.reports_dir().is_dir());
        assert!(config.logs_dir().is_dir());
        assert!(config.exports_dir().is_dir());
    }
}
