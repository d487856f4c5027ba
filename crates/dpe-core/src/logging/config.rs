//! Where the log level and format come from.
//!
//! `-v`/`-q` beat `DPE_LOG` and `DPE_LOG_FORMAT`, which beat the built-in
//! warn/human default. A set `RUST_LOG` bypasses the level entirely; see
//! [`init_logging`](super::init_logging).

use std::fmt;
use std::str::FromStr;

pub const ENV_LOG_LEVEL: &str = "DPE_LOG";
pub const ENV_LOG_FORMAT: &str = "DPE_LOG_FORMAT";

/// Shape of stderr log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per event.
    Jsonl,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Most verbose event that gets through.
///
/// Warn by default: a calculation that succeeds prints nothing to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogConfig {
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::resolve(|key| std::env::var(key).ok(), cli_level, cli_format)
    }

    /// Unparseable variables are ignored rather than fatal.
    pub fn resolve(
        var: impl Fn(&str) -> Option<String>,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let level = cli_level
            .or_else(|| var(ENV_LOG_LEVEL).and_then(|v| v.parse().ok()))
            .unwrap_or_default();
        let format = cli_format
            .or_else(|| var(ENV_LOG_FORMAT).and_then(|v| v.parse().ok()))
            .unwrap_or_default();
        Self { format, level }
    }
}
