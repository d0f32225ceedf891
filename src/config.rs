use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::options::types::ListName;

pub const ENV_TEAM_GRID_CONFIG: &str = "TEAM_GRID_CONFIG";

const DEFAULT_WORKSPACE: &str = "default";
const DEFAULT_DEBOUNCE_MS: u64 = 800;
const DEFAULT_SAVED_INDICATOR_MS: u64 = 1500;
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_PRIORITIES: &[&str] = &["High", "Medium", "Low"];
const DEFAULT_STATUSES: &[&str] = &["Not started", "In progress", "QA", "Complete"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridConfig {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default)]
    pub grid: GridTiming,
    #[serde(default)]
    pub defaults: OptionDefaults,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            grid: GridTiming::default(),
            defaults: OptionDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// What happens to debounced text that has not been written when the grid unmounts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnmountPolicy {
    #[default]
    Flush,
    Drop,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridTiming {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_saved_indicator_ms")]
    pub saved_indicator_ms: u64,
    #[serde(default)]
    pub unmount: UnmountPolicy,
}

impl Default for GridTiming {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            saved_indicator_ms: DEFAULT_SAVED_INDICATOR_MS,
            unmount: UnmountPolicy::default(),
        }
    }
}

impl GridTiming {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn saved_indicator(&self) -> Duration {
        Duration::from_millis(self.saved_indicator_ms)
    }
}

/// Option lists written into a workspace whose lists are empty on first access.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptionDefaults {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default = "default_priorities")]
    pub priorities: Vec<String>,
    #[serde(default = "default_statuses")]
    pub statuses: Vec<String>,
}

impl Default for OptionDefaults {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            types: Vec::new(),
            priorities: default_priorities(),
            statuses: default_statuses(),
        }
    }
}

impl OptionDefaults {
    pub fn list(&self, name: ListName) -> &[String] {
        match name {
            ListName::Categories => &self.categories,
            ListName::Types => &self.types,
            ListName::Priorities => &self.priorities,
            ListName::Statuses => &self.statuses,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl GridConfig {
    pub fn from_toml_str(raw: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|error| AppError::Config(format!("failed to parse config: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(AppError::Config(format!(
                "failed to read config '{}': {error}",
                path.display()
            ))),
        }
    }

    fn validate(&self) -> AppResult<()> {
        if self.workspace.trim().is_empty() {
            return Err(AppError::Config("workspace must not be empty".to_owned()));
        }
        if self.grid.debounce_ms == 0 {
            return Err(AppError::Config("grid.debounce_ms must be greater than 0".to_owned()));
        }
        for name in ListName::ALL {
            let values = self.defaults.list(name);
            for (index, value) in values.iter().enumerate() {
                if value.trim().is_empty() || values[..index].contains(value) {
                    return Err(AppError::Config(format!(
                        "defaults.{name} contains a blank or duplicate entry: \"{value}\""
                    )));
                }
            }
        }
        Ok(())
    }
}

fn default_workspace() -> String {
    DEFAULT_WORKSPACE.to_owned()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_saved_indicator_ms() -> u64 {
    DEFAULT_SAVED_INDICATOR_MS
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

fn default_priorities() -> Vec<String> {
    DEFAULT_PRIORITIES.iter().map(|value| value.to_string()).collect()
}

fn default_statuses() -> Vec<String> {
    DEFAULT_STATUSES.iter().map(|value| value.to_string()).collect()
}
