//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe database, logging, live-query and calendar settings.
//! - Parse host-provided JSON with defaults for every missing field.
//!
//! # Invariants
//! - `MONO_DB_PATH` (when non-blank) wins over the configured database path.
//! - A validated config always has a calendar start inside the supported
//!   calendar range.

use crate::calendar::{WeekStart, YearMonth, MAX_YEAR_MONTH, MIN_YEAR_MONTH};
use crate::logging::default_log_level;
use crate::store::DEFAULT_LIVE_QUERY_GRACE;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DB_PATH_ENV: &str = "MONO_DB_PATH";
const DEFAULT_DB_FILE_NAME: &str = "mono.sqlite3";

/// Configuration parsing/validation failures.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    InvalidLogLevel(String),
    RelativeLogDir(PathBuf),
    CalendarStartOutOfRange(YearMonth),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
            Self::InvalidLogLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
            Self::CalendarStartOutOfRange(start) => {
                write!(f, "calendar_start {start} is outside {MIN_YEAR_MONTH}..={MAX_YEAR_MONTH}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Database file. `None` falls back to the temp directory.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute directory for rolling log files. `None` disables file logs.
    pub log_dir: Option<PathBuf>,
    pub live_query_grace_ms: u64,
    pub week_start: WeekStart,
    /// Month at calendar offset 0.
    pub calendar_start: YearMonth,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            live_query_grace_ms: DEFAULT_LIVE_QUERY_GRACE.as_millis() as u64,
            week_start: WeekStart::default(),
            calendar_start: MIN_YEAR_MONTH,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "warning" | "error" => {}
            _ => return Err(ConfigError::InvalidLogLevel(self.log_level.clone())),
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }
        if self.calendar_start < MIN_YEAR_MONTH || self.calendar_start > MAX_YEAR_MONTH {
            return Err(ConfigError::CalendarStartOutOfRange(self.calendar_start));
        }
        Ok(())
    }

    /// Database path after applying the environment override and fallback.
    pub fn resolved_db_path(&self) -> PathBuf {
        resolve_db_path(
            std::env::var(DB_PATH_ENV).ok().as_deref(),
            self.db_path.as_deref(),
        )
    }

    pub fn live_query_grace(&self) -> Duration {
        Duration::from_millis(self.live_query_grace_ms)
    }
}

fn resolve_db_path(env_value: Option<&str>, configured: Option<&Path>) -> PathBuf {
    if let Some(raw) = env_value {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    configured
        .map(Path::to_path_buf)
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::{resolve_db_path, ConfigError, CoreConfig};
    use crate::calendar::{WeekStart, YearMonth};
    use std::path::{Path, PathBuf};

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.week_start, WeekStart::Sunday);
        assert_eq!(config.live_query_grace_ms, 5_000);
    }

    #[test]
    fn parses_explicit_fields() {
        let config = CoreConfig::from_json_str(
            r#"{
                "db_path": "/data/mono.db",
                "log_level": "WARN",
                "week_start": "monday",
                "calendar_start": { "year": 2024, "month": 1 },
                "live_query_grace_ms": 250
            }"#,
        )
        .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/data/mono.db")));
        assert_eq!(config.week_start, WeekStart::Monday);
        assert_eq!(config.calendar_start, YearMonth::new(2024, 1).unwrap());
        assert_eq!(config.live_query_grace().as_millis(), 250);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            CoreConfig::from_json_str(r#"{ "log_level": "verbose" }"#),
            Err(ConfigError::InvalidLogLevel(_))
        ));
        assert!(matches!(
            CoreConfig::from_json_str(r#"{ "log_dir": "logs" }"#),
            Err(ConfigError::RelativeLogDir(_))
        ));
        assert!(matches!(
            CoreConfig::from_json_str(r#"{ "calendar_start": { "year": 1969, "month": 12 } }"#),
            Err(ConfigError::CalendarStartOutOfRange(_))
        ));
        assert!(matches!(
            CoreConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_override_wins_unless_blank() {
        let configured = Path::new("/configured.db");
        assert_eq!(
            resolve_db_path(Some(" /env.db "), Some(configured)),
            PathBuf::from("/env.db")
        );
        assert_eq!(
            resolve_db_path(Some("  "), Some(configured)),
            configured.to_path_buf()
        );
        assert!(resolve_db_path(None, None).ends_with("mono.sqlite3"));
    }
}
