//! Runtime configuration, loadable from TOML.

use crate::error::{RuntimeError, RuntimeResult};
use crate::io::IoConfig;
use crate::logging::LogLevel;
use crate::physics::PhysicsSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One extension to load at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    pub name: String,
    pub load_symbol: String,
    pub unload_symbol: String,
    pub reloadable: bool,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            load_symbol: "extension_load".to_string(),
            unload_symbol: "extension_unload".to_string(),
            reloadable: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level for the default channel: trace, debug, info, warn,
    /// error, fatal, off.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn parsed_level(&self) -> Option<LogLevel> {
        match self.level.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "fatal" => Some(LogLevel::Fatal),
            "off" => Some(LogLevel::Off),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub enabled: bool,
    pub simulation_frame_rate: f32,
    pub simulation_multiplier: f32,
    pub sleep_epsilon: f32,
    pub position_epsilon: f32,
    pub velocity_epsilon: f32,
    pub max_position_iterations: u32,
    pub max_velocity_iterations: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        let defaults = PhysicsSettings::default();
        Self {
            enabled: defaults.enabled,
            simulation_frame_rate: defaults.simulation_frame_rate,
            simulation_multiplier: defaults.simulation_multiplier,
            sleep_epsilon: defaults.sleep_epsilon,
            position_epsilon: defaults.position_epsilon,
            velocity_epsilon: defaults.velocity_epsilon,
            max_position_iterations: defaults.max_position_iterations,
            max_velocity_iterations: defaults.max_velocity_iterations,
        }
    }
}

impl PhysicsConfig {
    pub fn to_settings(&self) -> PhysicsSettings {
        PhysicsSettings {
            enabled: self.enabled,
            sleep_epsilon: self.sleep_epsilon,
            position_epsilon: self.position_epsilon,
            velocity_epsilon: self.velocity_epsilon,
            max_position_iterations: self.max_position_iterations,
            max_velocity_iterations: self.max_velocity_iterations,
            simulation_multiplier: self.simulation_multiplier,
            simulation_frame_rate: self.simulation_frame_rate,
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub extension_paths: Vec<PathBuf>,
    pub extensions: Vec<ExtensionConfig>,
    pub io: IoConfig,
    pub logging: LoggingConfig,
    pub physics: PhysicsConfig,
}

impl RuntimeConfig {
    pub fn from_toml_str(text: &str) -> RuntimeResult<Self> {
        let config: RuntimeConfig =
            toml::from_str(text).map_err(|e| RuntimeError::InvalidConfig {
                field: "<toml>".to_string(),
                value: String::new(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> RuntimeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| RuntimeError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Validates ranges and enumerations before the runtime starts.
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.logging.parsed_level().is_none() {
            return Err(RuntimeError::InvalidConfig {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                reason: "expected trace|debug|info|warn|error|fatal|off".to_string(),
            });
        }

        if !(1.0..=1000.0).contains(&self.physics.simulation_frame_rate) {
            return Err(RuntimeError::InvalidConfig {
                field: "physics.simulation_frame_rate".to_string(),
                value: self.physics.simulation_frame_rate.to_string(),
                reason: "must be in 1..=1000".to_string(),
            });
        }

        if self.io.key_repeat_rate <= 0.0 {
            return Err(RuntimeError::InvalidConfig {
                field: "io.key_repeat_rate".to_string(),
                value: self.io.key_repeat_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        for extension in &self.extensions {
            if extension.name.is_empty() {
                return Err(RuntimeError::InvalidConfig {
                    field: "extensions.name".to_string(),
                    value: String::new(),
                    reason: "extension name cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }
}
