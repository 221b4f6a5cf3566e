//! Run configuration: which tasks run, whether they run concurrently, and
//! where source and destination files live.
//!
//! Loaded from an optional TOML file; every absent key falls back to its
//! default (all tasks enabled, concurrent execution, `./src` → `./dst`,
//! `error` log level).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::task::TaskKind;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct Config {
    pub concurrent: bool,
    pub tasks: HashMap<TaskKind, bool>,
    pub src_dir: PathBuf,
    pub dst_dir: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            concurrent: true,
            tasks: TaskKind::ALL.iter().map(|&kind| (kind, true)).collect(),
            src_dir: PathBuf::from("./src"),
            dst_dir: PathBuf::from("./dst"),
            log_level: "error".to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration file at `path`, falling back to defaults
    /// when the file does not exist. A present but malformed file is an
    /// error.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)?;
        Config::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        let file: ConfigFile = toml::from_str(text)?;
        let mut config = Config::default();

        if let Some(enable) = file.concurrency.enable {
            config.concurrent = enable;
        }
        for (name, enabled) in file.task {
            let kind = TaskKind::from_name(&name)?;
            config.tasks.insert(kind, enabled);
        }
        if let Some(src) = file.directory.src {
            config.src_dir = PathBuf::from(src);
        }
        if let Some(dst) = file.directory.dst {
            config.dst_dir = PathBuf::from(dst);
        }
        if let Some(level) = file.log.level {
            config.log_level = level;
        }
        Ok(config)
    }

    /// Enabled tasks in their fixed dispatch order.
    pub fn enabled_tasks(&self) -> Vec<TaskKind> {
        TaskKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.tasks.get(kind).copied().unwrap_or(true))
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    concurrency: ConcurrencySection,
    task: HashMap<String, bool>,
    directory: DirectorySection,
    log: LogSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConcurrencySection {
    enable: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DirectorySection {
    src: Option<String>,
    dst: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LogSection {
    level: Option<String>,
}
