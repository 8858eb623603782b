//! Sensor settings.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SensorError};
use armature_dynamics::Real;

/// Settings of a 360° multi-layer ranging sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LidarConfig {
    /// Beams per layer.
    pub resolution: usize,
    /// Number of vertical layers.
    pub layers: usize,
    /// Horizontal field of view (degrees).
    pub horizontal_fov: Real,
    /// Vertical field of view (degrees).
    pub vertical_fov: Real,
    /// Minimum range (m). Rays start this far from the sensor origin.
    pub range_min: Real,
    /// Maximum range (m).
    pub range_max: Real,
    /// Scan rate (Hz). Zero or negative scans on every update.
    pub frequency: Real,
    /// Number of scans kept, oldest dropped first. Must be at least 1.
    pub history_length: usize,
}

impl Default for LidarConfig {
    fn default() -> Self {
        Self {
            resolution: 360,
            layers: 16,
            horizontal_fov: 360.0,
            vertical_fov: 42.4,
            range_min: 0.0,
            range_max: 100.0,
            frequency: 10.0,
            history_length: 16,
        }
    }
}

impl LidarConfig {
    /// Parse from a TOML document and validate.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| SensorError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Total number of beams per scan.
    pub fn beams(&self) -> usize {
        self.resolution * self.layers
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 || self.layers == 0 {
            return Err(SensorError::InvalidConfig(
                "resolution and layers must be at least 1".into(),
            ));
        }
        if !(0.0..=360.0).contains(&self.horizontal_fov) || !(0.0..=180.0).contains(&self.vertical_fov) {
            return Err(SensorError::InvalidConfig(format!(
                "field of view out of range: {}° x {}°",
                self.horizontal_fov, self.vertical_fov
            )));
        }
        if self.history_length == 0 {
            return Err(SensorError::InvalidConfig(
                "history_length must be at least 1".into(),
            ));
        }
        if !(self.range_min >= 0.0 && self.range_min < self.range_max) {
            return Err(SensorError::InvalidConfig(format!(
                "range [{}, {}] is empty",
                self.range_min, self.range_max
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_device() {
        let config = LidarConfig::default();
        assert_eq!(config.horizontal_fov, 360.0);
        assert_eq!(config.vertical_fov, 42.4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = LidarConfig::from_toml_str(
            r#"
            resolution = 8
            layers = 2
            range_max = 20.0
            "#,
        )
        .unwrap();
        assert_eq!(config.beams(), 16);
        assert_eq!(config.range_max, 20.0);
        assert_eq!(config.frequency, 10.0);
    }

    #[test]
    fn test_rejects_empty_range() {
        assert!(LidarConfig::from_toml_str("range_min = 5.0\nrange_max = 1.0").is_err());
        assert!(LidarConfig::from_toml_str("layers = 0").is_err());
    }

    #[test]
    fn test_rejects_unbounded_history() {
        assert!(matches!(
            LidarConfig::from_toml_str("history_length = 0"),
            Err(SensorError::InvalidConfig(_))
        ));
        assert!(LidarConfig::from_toml_str("history_length = 1").is_ok());
    }
}
