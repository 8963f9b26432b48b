// Configuration structures for the bus, logging and the logger producer
// Every section is optional in the TOML file and falls back to its Default

use serde::{Deserialize, Serialize};

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub bus: BusSettings,
    pub logging: LoggingConfig,
    pub logger: LoggerConfig,
}

/// Event bus behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSettings {
    /// Listener count per channel above which a leak warning is logged. 0 disables it.
    pub max_listeners: usize,
    /// Isolate panicking listeners instead of unwinding through `emit`
    pub catch_panics: bool,
}

/// env_logger setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Append-mode log file; empty means stderr
    pub file: String,
}

/// Settings of the `messageLogged` producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub endpoint: String,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            max_listeners: 10,
            catch_panics: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: String::new(),
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            endpoint: "some url here".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Option<log::LevelFilter> {
        self.level.parse().ok()
    }
}

impl BusConfig {
    pub fn builder() -> BusConfigBuilder {
        BusConfigBuilder::new()
    }
}

pub struct BusConfigBuilder {
    config: BusConfig,
}

impl BusConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: BusConfig::default(),
        }
    }

    pub fn max_listeners(mut self, max: usize) -> Self {
        self.config.bus.max_listeners = max;
        self
    }

    pub fn catch_panics(mut self, catch: bool) -> Self {
        self.config.bus.catch_panics = catch;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn log_file(mut self, file: impl Into<String>) -> Self {
        self.config.logging.file = file.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.logger.endpoint = endpoint.into();
        self
    }

    pub fn build(self) -> BusConfig {
        self.config
    }
}

impl Default for BusConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
