//! World settings.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorldError};
use armature_dynamics::Real;

/// Simulation parameters for a [`PhysicsWorld`](crate::PhysicsWorld).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Gravity in m/s².
    pub gravity: [Real; 3],
    /// Fixed step length in seconds.
    pub timestep: Real,
    /// Rapier pipeline steps per world step, each `timestep / substeps` long.
    pub substeps: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 0.0, -9.81],
            timestep: 1.0 / 240.0,
            substeps: 1,
        }
    }
}

impl WorldConfig {
    /// Parse from a TOML document and validate.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Gravity as a vector.
    pub fn gravity_vector(&self) -> Vector3<Real> {
        Vector3::from(self.gravity)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.timestep > 0.0 && self.timestep.is_finite()) {
            return Err(WorldError::InvalidConfig(format!(
                "timestep must be positive, got {}",
                self.timestep
            )));
        }
        if self.substeps == 0 {
            return Err(WorldError::InvalidConfig("substeps must be at least 1".into()));
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(WorldError::InvalidConfig("gravity must be finite".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = WorldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gravity_vector(), Vector3::new(0.0, 0.0, -9.81));
    }

    #[test]
    fn test_from_toml() {
        let config = WorldConfig::from_toml_str(
            r#"
            gravity = [0.0, -9.81, 0.0]
            timestep = 0.001
            "#,
        )
        .unwrap();
        assert_eq!(config.gravity[1], -9.81);
        assert_eq!(config.timestep, 0.001);
        assert_eq!(config.substeps, 1);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            WorldConfig::from_toml_str("timestep = 0.0"),
            Err(WorldError::InvalidConfig(_))
        ));
        assert!(matches!(
            WorldConfig::from_toml_str("substeps = 0"),
            Err(WorldError::InvalidConfig(_))
        ));
        assert!(matches!(
            WorldConfig::from_toml_str("timestep = \"fast\""),
            Err(WorldError::Config(_))
        ));
    }
}
