//! Subscriber settings
//!
//! Everything here deserializes with defaults, so a `[logging]` table in a
//! process config can name only the fields it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How a scopemesh process writes its logs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `scopemesh=debug,warn`
    pub level: String,
    /// What goes to stdout
    pub console: ConsoleFormat,
    /// Colour pretty console output
    pub ansi: bool,
    /// JSONL log files, off unless set
    pub file: Option<FileSink>,
    /// Shape of every JSONL line, console or file
    pub jsonl: JsonlFields,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: ConsoleFormat::Jsonl,
            ansi: false,
            file: None,
            jsonl: JsonlFields::default(),
        }
    }
}

impl LogConfig {
    /// Pretty coloured console at `debug`, for running demos by hand
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            console: ConsoleFormat::Pretty,
            ansi: true,
            ..Default::default()
        }
    }

    /// Plain console at `warn` so test output stays readable
    pub fn testing() -> Self {
        Self {
            level: "warn".to_string(),
            console: ConsoleFormat::Pretty,
            ..Default::default()
        }
    }
}

/// Console output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    /// Nothing on stdout
    Off,
    /// One JSON object per line
    #[default]
    Jsonl,
    /// tracing-subscriber's human-readable format
    Pretty,
}

/// JSONL files under one directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSink {
    pub directory: PathBuf,
    /// File names start with this; rotated files also carry the date
    pub prefix: String,
    pub rotation: FileRotation,
}

impl FileSink {
    /// Daily-rotated `scopemesh.*` files in `directory`
    pub fn in_dir(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            ..Default::default()
        }
    }
}

impl Default for FileSink {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            prefix: "scopemesh".to_string(),
            rotation: FileRotation::Daily,
        }
    }
}

/// When a new log file is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    #[default]
    Daily,
    Hourly,
    /// One `<prefix>.jsonl`, truncated at startup
    Never,
}

/// Fields included in JSONL output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlFields {
    /// Put event fields at the top level instead of under `fields`
    pub flatten: bool,
    /// Add the enclosing span list, e.g. the `propagate_state` span
    pub spans: bool,
    /// Add source file and line
    pub location: bool,
}

impl Default for JsonlFields {
    fn default() -> Self {
        Self {
            flatten: true,
            spans: true,
            location: false,
        }
    }
}
