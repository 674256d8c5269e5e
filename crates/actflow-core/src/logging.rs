//! Logging configuration
//!
//! Holds the settings the binary uses to install its `tracing` subscriber:
//! level, console/file output and log file retention.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

const LOG_FILE_PREFIX: &str = "actflow-";
const LOG_FILE_EXTENSION: &str = "log";

fn default_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_max_log_files() -> usize {
    10
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Level filter (`trace`, `debug`, `info`, `warn`, `error`)
    #[serde(default = "default_level")]
    pub level: String,
    /// Write logs to stderr
    #[serde(default = "default_true")]
    pub console_output: bool,
    /// Write logs to a file in `log_directory`
    #[serde(default)]
    pub file_output: bool,
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    /// Log files kept by [`LogConfig::cleanup_old_logs`]
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            console_output: true,
            file_output: false,
            log_directory: default_log_directory(),
            max_log_files: default_max_log_files(),
        }
    }
}

impl LogConfig {
    /// Parsed level, falling back to INFO for unknown strings
    pub fn parse_level(&self) -> LevelFilter {
        LevelFilter::from_str(self.level.trim()).unwrap_or(LevelFilter::INFO)
    }

    pub fn ensure_log_directory(&self) -> io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_directory)?;
        }
        Ok(())
    }

    /// Path of today's log file
    pub fn current_log_path(&self) -> PathBuf {
        let date = chrono::Local::now().format("%Y-%m-%d");
        self.log_directory
            .join(format!("{LOG_FILE_PREFIX}{date}.{LOG_FILE_EXTENSION}"))
    }

    /// Delete the oldest log files beyond `max_log_files`. Returns how many were removed.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.log_directory.is_dir() {
            return Ok(0);
        }

        let mut logs = Vec::new();
        for entry in fs::read_dir(&self.log_directory)? {
            let entry = entry?;
            let path = entry.path();
            let is_log = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX))
                && path.extension().and_then(|ext| ext.to_str()) == Some(LOG_FILE_EXTENSION);
            if is_log {
                let modified = entry.metadata()?.modified()?;
                logs.push((modified, path));
            }
        }

        if logs.len() <= self.max_log_files {
            return Ok(0);
        }

        logs.sort();
        let excess = logs.len() - self.max_log_files;
        for (_, path) in logs.iter().take(excess) {
            fs::remove_file(path)?;
        }
        Ok(excess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        let mut config = LogConfig::default();
        assert_eq!(config.parse_level(), LevelFilter::INFO);

        config.level = "debug".to_string();
        assert_eq!(config.parse_level(), LevelFilter::DEBUG);

        config.level = "loud".to_string();
        assert_eq!(config.parse_level(), LevelFilter::INFO);
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            file_output: true,
            log_directory: dir.path().to_path_buf(),
            max_log_files: 2,
            ..LogConfig::default()
        };

        for day in 1..=4 {
            let path = dir.path().join(format!("actflow-2024-01-0{day}.log"));
            fs::write(&path, b"log").unwrap();
            // distinct mtimes
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        fs::write(dir.path().join("other.txt"), b"keep").unwrap();

        assert_eq!(config.cleanup_old_logs().unwrap(), 2);
        assert!(!dir.path().join("actflow-2024-01-01.log").exists());
        assert!(dir.path().join("actflow-2024-01-04.log").exists());
        assert!(dir.path().join("other.txt").exists());
    }
}
