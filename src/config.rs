use std::path::PathBuf;

use crate::engine::{EngineConfig, OverlapPolicy};

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;
const WAL_FILE_NAME: &str = "roombook.wal";

/// Process settings, read from `ROOMBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    pub compact_threshold: u64,
    pub overlap_policy: OverlapPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            metrics_port: None,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            overlap_policy: OverlapPolicy::Permit,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable values fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: lookup("ROOMBOOK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            metrics_port: lookup("ROOMBOOK_METRICS_PORT").and_then(|s| s.parse().ok()),
            compact_threshold: lookup("ROOMBOOK_COMPACT_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compact_threshold),
            overlap_policy: lookup("ROOMBOOK_OVERLAP_POLICY")
                .and_then(|s| parse_policy(&s))
                .unwrap_or(defaults.overlap_policy),
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(WAL_FILE_NAME)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            overlap_policy: self.overlap_policy,
        }
    }
}

fn parse_policy(s: &str) -> Option<OverlapPolicy> {
    match s.trim().to_ascii_lowercase().as_str() {
        "permit" => Some(OverlapPolicy::Permit),
        "reject" => Some(OverlapPolicy::Reject),
        _ => None,
    }
}
