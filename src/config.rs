//! Runtime configuration loaded from `mission.json`.
//!
//! Every struct is `#[serde(default)]`, so the file only needs the keys it
//! wants to override. Timing is tuned per deployment (dwell 3s or 5s, spawn
//! 3s or 7s), so none of it is hard-coded in the engine.

use crate::error::ConfigError;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub mission: MissionConfig,
    pub camera: CameraConfig,
    pub capture: CaptureConfig,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            mission: MissionConfig::default(),
            camera: CameraConfig::default(),
            capture: CaptureConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mission.validate()?;
        self.level_filter()?;
        Ok(())
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }
}

/// Mission Progress Engine tuning.
///
/// Distances are in canvas pixels, durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MissionConfig {
    pub target_count: usize,
    pub spawn_delay_ms: u64,
    /// distance covered per motion tick, may be negative
    pub speed: f64,
    pub tick_interval_ms: u64,
    pub dwell_ms: u64,
    pub proximity_threshold: f64,
    pub initial_distance: f64,
    /// Image per target, cycled when shorter than `target_count`.
    /// Moon stays last: reaching it ends the journey.
    pub target_assets: Vec<String>,
    pub rocket_asset: String,
}

impl Default for MissionConfig {
    fn default() -> Self {
        MissionConfig {
            target_count: 5,
            spawn_delay_ms: 3000,
            speed: 1.0,
            tick_interval_ms: 16,
            dwell_ms: 5000,
            proximity_threshold: 10.0,
            initial_distance: 150.0,
            target_assets: ["mars.svg", "jupiter.svg", "saturn.svg", "uranus.svg", "moon.svg"]
                .iter()
                .map(|asset| asset.to_string())
                .collect(),
            rocket_asset: "rocket.svg".to_string(),
        }
    }
}

impl MissionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_count == 0 {
            return Err(ConfigError::ZeroTargets);
        }
        // zero periods would make the scheduler fire forever inside one frame
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.spawn_delay_ms == 0 {
            return Err(ConfigError::ZeroSpawnDelay);
        }
        if !(self.proximity_threshold > 0.0) || !self.proximity_threshold.is_finite() {
            return Err(ConfigError::NonPositiveThreshold(self.proximity_threshold));
        }
        if !self.speed.is_finite() {
            return Err(ConfigError::NonFiniteSpeed(self.speed));
        }
        if self.target_assets.is_empty() {
            return Err(ConfigError::NoTargetAssets);
        }
        Ok(())
    }

    pub fn spawn_delay(&self) -> Duration {
        Duration::from_millis(self.spawn_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn dwell_duration(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    pub fn asset_for(&self, index: usize) -> &str {
        // validate() guarantees at least one asset
        &self.target_assets[index % self.target_assets.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    /// `user` (front) or `environment` (rear)
    pub facing_mode: String,
    pub audio: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            facing_mode: "environment".to_string(),
            audio: false,
        }
    }
}

/// One encoding the capture collaborator may be asked for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CaptureFormat {
    pub mime_type: String,
    pub extension: String,
}

impl CaptureFormat {
    pub fn new(mime_type: &str, extension: &str) -> Self {
        CaptureFormat {
            mime_type: mime_type.to_string(),
            extension: extension.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Preference order. iOS Safari only records mp4, so it goes first.
    pub formats: Vec<CaptureFormat>,
    pub file_prefix: String,
    pub share_title: String,
    pub share_text: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            formats: vec![
                CaptureFormat::new("video/mp4", "mp4"),
                CaptureFormat::new("video/webm;codecs=vp9", "webm"),
                CaptureFormat::new("video/webm", "webm"),
            ],
            file_prefix: "video".to_string(),
            share_title: "Space Journey".to_string(),
            share_text: "My space journey recording".to_string(),
        }
    }
}
