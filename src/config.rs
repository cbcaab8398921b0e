//! Configuration management for model schemas and the trace tool
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (models.toml)
//! - Environment variables (MODELS__*)
//!
//! ## Example config file (models.toml):
//! ```toml
//! [emitter]
//! max_listeners = 32
//!
//! [trace]
//! rounds = 10
//! snapshot_first = true
//! output_format = "pretty"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::emitter::DEFAULT_MAX_LISTENERS;
use crate::error::Result;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Event emitter settings
    #[serde(default)]
    pub emitter: EmitterConfig,

    /// Trace tool settings
    #[serde(default)]
    pub trace: TraceConfig,
}

/// Event emitter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// Listener count per event kind above which a warning is logged (0 disables)
    #[serde(default = "default_max_listeners")]
    pub max_listeners: usize,
}

/// Trace tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Number of scoring rounds to play
    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// Take a snapshot before the first round
    #[serde(default)]
    pub snapshot_first: bool,

    /// How events are printed
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Output format for traced events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Compact,
    /// Indented JSON
    Pretty,
    /// Human-readable lines
    Text,
}

fn default_max_listeners() -> usize {
    DEFAULT_MAX_LISTENERS
}

fn default_rounds() -> u32 {
    10
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            max_listeners: default_max_listeners(),
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            snapshot_first: false,
            output_format: OutputFormat::Compact,
        }
    }
}

impl ModelConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["models.toml", ".models.toml", "config/models.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "models") {
            let xdg_config = config_dir.config_dir().join("models.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("MODELS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
