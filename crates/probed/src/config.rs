//! probed.toml configuration parser.
//!
//! ```toml
//! report_interval = "30s"
//! timeout = "2s"
//!
//! [[target]]
//! id = "api"
//! endpoint = "http://127.0.0.1:8080/health"
//! interval = "5s"
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for {field}: {value:?}")]
    Duration { field: String, value: String },

    #[error("duplicate target id: {0}")]
    DuplicateTarget(String),

    #[error("target {0} has an empty endpoint")]
    EmptyEndpoint(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    report_interval: Option<String>,
    timeout: Option<String>,
    #[serde(default, rename = "target")]
    targets: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTarget {
    id: String,
    endpoint: String,
    interval: Option<String>,
}

/// Validated daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedConfig {
    /// How often every target's status is logged.
    pub report_interval: Duration,
    /// Per-check HTTP timeout.
    pub timeout: Duration,
    pub targets: Vec<TargetSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub id: String,
    pub endpoint: String,
    pub interval: Duration,
}

const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

impl ProbedConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> ConfigResult<Self> {
        let raw: RawConfig = toml::from_str(content)?;

        let report_interval =
            optional_duration("report_interval", raw.report_interval, DEFAULT_REPORT_INTERVAL)?;
        let timeout = optional_duration("timeout", raw.timeout, DEFAULT_TIMEOUT)?;

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(raw.targets.len());
        for t in raw.targets {
            if !seen.insert(t.id.clone()) {
                return Err(ConfigError::DuplicateTarget(t.id));
            }
            if t.endpoint.trim().is_empty() {
                return Err(ConfigError::EmptyEndpoint(t.id));
            }
            let field = format!("target {}", t.id);
            let interval = optional_duration(&field, t.interval, DEFAULT_INTERVAL)?;
            targets.push(TargetSpec {
                id: t.id,
                endpoint: t.endpoint,
                interval,
            });
        }

        Ok(Self {
            report_interval,
            timeout,
            targets,
        })
    }
}

fn optional_duration(field: &str, value: Option<String>, default: Duration) -> ConfigResult<Duration> {
    let Some(value) = value else {
        return Ok(default);
    };
    match parse_duration(&value) {
        Some(d) if !d.is_zero() => Ok(d),
        _ => Err(ConfigError::Duration {
            field: field.to_string(),
            value,
        }),
    }
}

/// Parse a duration such as `500ms`, `5s`, `2m`, `1h`, or bare seconds.
///
/// Returns `None` for unknown units or values that do not fit a `Duration`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits.parse().ok()?;
    match unit.trim() {
        "ms" => Some(Duration::from_millis(value)),
        "" | "s" => Some(Duration::from_secs(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        "h" => value.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}
