// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::analytics::{BehaviorConfig, TrackerConfig, ZoneEngineConfig};
use crate::types::Zone;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub zones: ZoneEngineConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    pub cameras: Vec<CameraConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "argus=info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub camera_id: String,
    /// Danger zones for this camera; validated by ZoneEngine::configure
    #[serde(default)]
    pub zones: Vec<Zone>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        let config: Config =
            serde_yaml::from_str(&contents).with_context(|| format!("parsing config {path}"))?;
        Ok(config)
    }
}
