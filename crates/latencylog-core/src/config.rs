//! Store configuration.

use std::path::PathBuf;

/// Environment variable that overrides the default CSV path.
pub const CSV_PATH_ENV: &str = "LATENCYLOG_CSV";

/// Default backing file, relative to the working directory.
pub const DEFAULT_CSV_PATH: &str = "latency_logs.csv";

/// Where the record store lives. Injected into [`crate::RecordStore`] at
/// construction; nothing else in the crate holds a file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CSV_PATH),
        }
    }
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default config with the path taken from `LATENCYLOG_CSV` when set.
    pub fn from_env() -> Self {
        match std::env::var_os(CSV_PATH_ENV) {
            Some(p) if !p.is_empty() => Self::new(p),
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path() {
        assert_eq!(StoreConfig::default().path, PathBuf::from("latency_logs.csv"));
    }

    #[test]
    fn explicit_path() {
        let cfg = StoreConfig::new("/data/logs.csv");
        assert_eq!(cfg.path, PathBuf::from("/data/logs.csv"));
    }
}
