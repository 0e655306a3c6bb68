use crate::crawler::EngineSettings;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for Locus
///
/// Every key is optional; missing keys take the defaults below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub logging: LoggingConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlerConfig {
    /// Maximum number of pages to store, 0 for no limit
    #[serde(rename = "max-pages")]
    pub max_pages: u64,

    /// Number of pages fetched at once
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Deadline for each navigation attempt (milliseconds)
    #[serde(rename = "navigation-timeout-ms")]
    pub navigation_timeout_ms: u64,

    /// Deadline for a page to finish loading (milliseconds)
    #[serde(rename = "load-timeout-ms")]
    pub load_timeout_ms: u64,

    /// How long in-flight pages may settle after an interrupt (milliseconds)
    #[serde(rename = "grace-timeout-ms")]
    pub grace_timeout_ms: u64,

    /// Consecutive rounds without progress before a locale is abandoned, 0 to disable
    #[serde(rename = "max-no-progress-rounds")]
    pub max_no_progress_rounds: u32,

    /// Strings every followed URL must contain (any one of them)
    pub patterns: Vec<String>,

    /// Whether non-English sessions also accept English content
    #[serde(rename = "accept-language-fallback")]
    pub accept_language_fallback: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 10_000_000,
            batch_size: 10,
            navigation_timeout_ms: 5000,
            load_timeout_ms: 5000,
            grace_timeout_ms: 10_000,
            max_no_progress_rounds: 5,
            patterns: Vec::new(),
            accept_language_fallback: true,
        }
    }
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn grace_timeout(&self) -> Duration {
        Duration::from_millis(self.grace_timeout_ms)
    }

    /// Engine timing settings derived from this configuration
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            navigation_timeout: self.navigation_timeout(),
            load_timeout: self.load_timeout(),
            grace_timeout: self.grace_timeout(),
            ..EngineSettings::default()
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of: error, warning, info, debug
    pub level: String,

    /// Optional log file, written in addition to stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info.to_string(),
            file: None,
        }
    }
}

/// Operator-facing log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// Name of the level as understood by `EnvFilter` directives
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            other => Err(format!(
                "log level must be one of: error, warning, info, debug; got '{}'",
                other
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        write!(f, "{}", name)
    }
}
