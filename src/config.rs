//! Simulation settings
//!
//! Balancing values are consumed here, not derived. Loaded from JSON by the
//! host; anything missing falls back to the defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::STAT_RECOMPUTE_INTERVAL;
use crate::sim::{CameraConfig, PhysicsConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub physics: PhysicsConfig,
    pub camera: CameraConfig,
    /// Derived stats are recomputed every N ticks
    pub stat_recompute_interval: u64,
    /// Upper bound on a single frame's delta (seconds); `None` keeps the raw delta
    pub max_frame_delta: Option<f32>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            camera: CameraConfig::default(),
            stat_recompute_interval: STAT_RECOMPUTE_INTERVAL,
            max_frame_delta: None,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let damping = self.physics.damping_factor;
        if !(damping > 0.0 && damping <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "damping_factor must be in (0, 1], got {damping}"
            )));
        }
        let PhysicsConfig {
            repulsion_constant,
            attraction_constant,
            ..
        } = self.physics;
        if !repulsion_constant.is_finite() || !attraction_constant.is_finite() {
            return Err(ConfigError::Invalid("force constants must be finite".into()));
        }
        if self.camera.position_speed <= 0.0 || self.camera.zoom_speed <= 0.0 {
            return Err(ConfigError::Invalid("camera speeds must be positive".into()));
        }
        if self.stat_recompute_interval == 0 {
            return Err(ConfigError::Invalid(
                "stat_recompute_interval must be at least 1".into(),
            ));
        }
        if let Some(max) = self.max_frame_delta {
            if max <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "max_frame_delta must be positive, got {max}"
                )));
            }
        }
        Ok(())
    }
}
