//! Environment-sourced configuration, read once at process start and
//! passed explicitly into each pipeline stage. Components never consult
//! the environment themselves, which keeps them testable with an injected
//! [`Config`].

use std::collections::BTreeSet;
use std::env;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const ENV_DATA_DIR: &str = "LB_DATA_DIR";
pub const ENV_FILES_DIR: &str = "LB_FILES_DIR";
pub const ENV_LOG_DIR: &str = "LB_LOG_DIR";
pub const ENV_EXCLUDED_TYPES: &str = "LB_EXCLUDED_TYPES";
pub const ENV_FAIL_RATE: &str = "LB_FAIL_RATE";
pub const ENV_LATENCY_MS: &str = "LB_LATENCY_MS";

const DEFAULT_FAIL_RATE: f64 = 0.1;
const DEFAULT_LATENCY_MIN_MS: u64 = 5;
const DEFAULT_LATENCY_MAX_MS: u64 = 40;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a number in [0, 1], got {value:?}")]
    InvalidFailRate { var: &'static str, value: String },
    #[error("{var} must look like \"min..max\" in milliseconds with min <= max, got {value:?}")]
    InvalidLatency { var: &'static str, value: String },
    #[error("log directory {path} is not usable: {source}")]
    LogDirUnavailable {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("required input file {path} is missing or unreadable")]
    InputUnreadable { path: String },
}

/// Bounds for the simulated endpoint's synchronous latency, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyBounds {
    pub min_ms: u64,
    pub max_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub files_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Entity types handled by a separate pipeline; attachments of these
    /// types are routed to the skip stream, by configuration, not error.
    pub excluded_types: BTreeSet<String>,
    pub fail_rate: f64,
    pub latency: LatencyBounds,
}

impl Config {
    /// Load configuration from the environment, validating every value up
    /// front. A bad setting aborts here, before any stream is touched.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = env_path(ENV_DATA_DIR, "data");
        let files_dir = env_path(ENV_FILES_DIR, "files");
        let log_dir = env_path(ENV_LOG_DIR, "logs");

        let excluded_types = env::var(ENV_EXCLUDED_TYPES)
            .map(|raw| parse_excluded_types(&raw))
            .unwrap_or_default();

        let fail_rate = match env::var(ENV_FAIL_RATE) {
            Ok(raw) => parse_fail_rate(&raw).ok_or(ConfigError::InvalidFailRate {
                var: ENV_FAIL_RATE,
                value: raw,
            })?,
            Err(_) => DEFAULT_FAIL_RATE,
        };

        let latency = match env::var(ENV_LATENCY_MS) {
            Ok(raw) => parse_latency(&raw).ok_or(ConfigError::InvalidLatency {
                var: ENV_LATENCY_MS,
                value: raw,
            })?,
            Err(_) => LatencyBounds {
                min_ms: DEFAULT_LATENCY_MIN_MS,
                max_ms: DEFAULT_LATENCY_MAX_MS,
            },
        };

        Ok(Self {
            data_dir,
            files_dir,
            log_dir,
            excluded_types,
            fail_rate,
            latency,
        })
    }

    /// Create the log directory if needed. Called once per command before
    /// any processing; failure here is fatal by design.
    pub fn ensure_log_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.log_dir).map_err(|source| ConfigError::LogDirUnavailable {
            path: self.log_dir.display().to_string(),
            source,
        })
    }

    /// Assert that a stage's required input exists before work begins.
    pub fn require_input(&self, path: &Path) -> Result<(), ConfigError> {
        if path.is_file() {
            Ok(())
        } else {
            Err(ConfigError::InputUnreadable {
                path: path.display().to_string(),
            })
        }
    }

    pub fn inventory_csv(&self) -> PathBuf {
        self.data_dir.join("attachments_inventory.csv")
    }

    pub fn mapping_export_csv(&self) -> PathBuf {
        self.data_dir.join("mapping_export.csv")
    }

    pub fn verification_log_csv(&self) -> PathBuf {
        self.log_dir.join("mapping_verification_log.csv")
    }

    pub fn verification_skips_csv(&self) -> PathBuf {
        self.log_dir.join("mapping_verification_skips.csv")
    }

    pub fn run_log_csv(&self) -> PathBuf {
        self.log_dir.join("attach_runlog.csv")
    }

    pub fn error_log_csv(&self) -> PathBuf {
        self.log_dir.join("attach_errors.csv")
    }

    pub fn duplicate_log_csv(&self) -> PathBuf {
        self.log_dir.join("attach_dups.csv")
    }
}

fn env_path(var: &str, default: &str) -> PathBuf {
    env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn parse_excluded_types(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_fail_rate(raw: &str) -> Option<f64> {
    let rate: f64 = raw.trim().parse().ok()?;
    (0.0..=1.0).contains(&rate).then_some(rate)
}

fn parse_latency(raw: &str) -> Option<LatencyBounds> {
    let (min, max) = raw.trim().split_once("..")?;
    let min_ms: u64 = min.trim().parse().ok()?;
    let max_ms: u64 = max.trim().parse().ok()?;
    (min_ms <= max_ms).then_some(LatencyBounds { min_ms, max_ms })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_rate_bounds_are_enforced() {
        assert_eq!(parse_fail_rate("0"), Some(0.0));
        assert_eq!(parse_fail_rate("1.0"), Some(1.0));
        assert_eq!(parse_fail_rate(" 0.25 "), Some(0.25));
        assert_eq!(parse_fail_rate("1.5"), None);
        assert_eq!(parse_fail_rate("-0.1"), None);
        assert_eq!(parse_fail_rate("abc"), None);
    }

    #[test]
    fn latency_requires_ordered_bounds() {
        assert_eq!(
            parse_latency("5..40"),
            Some(LatencyBounds {
                min_ms: 5,
                max_ms: 40
            })
        );
        assert_eq!(
            parse_latency("0..0"),
            Some(LatencyBounds {
                min_ms: 0,
                max_ms: 0
            })
        );
        assert_eq!(parse_latency("40..5"), None);
        assert_eq!(parse_latency("fast"), None);
    }

    #[test]
    fn excluded_types_split_and_trim() {
        let set = parse_excluded_types("Bill, Invoice ,,Check");
        assert_eq!(set.len(), 3);
        assert!(set.contains("Invoice"));
    }
}
