//! Construction-time settings for mechanisms and joint actuators.

use serde::{Deserialize, Serialize};

use crate::error::{DynamicsError, Result};
use crate::Real;

/// Construction-time description of a mechanism.
///
/// All fields are immutable once the body is registered in a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanismConfig {
    /// Mechanism name, used in logs and errors.
    pub name: String,
    /// Total number of links including the base. Fixed for the body's lifetime.
    pub total_links: usize,
    /// Pin the base link to the world.
    pub fixed_base: bool,
    /// Allow collisions between non-adjacent links of the same mechanism.
    pub self_collision: bool,
    /// Emit render records for the base link.
    pub base_renderable: bool,
}

impl Default for MechanismConfig {
    fn default() -> Self {
        Self {
            name: "mechanism".to_string(),
            total_links: 1,
            fixed_base: false,
            self_collision: false,
            base_renderable: true,
        }
    }
}

impl MechanismConfig {
    /// Config with the given name and link count, other fields default.
    pub fn new(name: impl Into<String>, total_links: usize) -> Self {
        Self {
            name: name.into(),
            total_links,
            ..Self::default()
        }
    }

    /// Pin or release the base link.
    #[must_use]
    pub fn with_fixed_base(mut self, fixed: bool) -> Self {
        self.fixed_base = fixed;
        self
    }

    /// Parse from a TOML document and validate.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| DynamicsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DynamicsError::InvalidConfig(
                "mechanism name must not be empty".into(),
            ));
        }
        if self.total_links == 0 {
            return Err(DynamicsError::InvalidConfig(
                "a mechanism needs at least the base link".into(),
            ));
        }
        Ok(())
    }
}

/// Gains and limits for a joint actuator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    /// Derivative gain applied while holding a position target.
    pub derivative_gain: Real,
    /// Output clamp `(lower, upper)` in Nm or N.
    pub torque_limits: (Real, Real),
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            derivative_gain: 1.0,
            torque_limits: (-1000.0, 1000.0),
        }
    }
}

impl ActuatorConfig {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        let (lower, upper) = self.torque_limits;
        if !(lower <= upper) {
            return Err(DynamicsError::InvalidConfig(format!(
                "torque limits inverted: [{lower}, {upper}]"
            )));
        }
        if !(self.derivative_gain >= 0.0) {
            return Err(DynamicsError::InvalidConfig(format!(
                "derivative gain must be non-negative, got {}",
                self.derivative_gain
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mechanism_from_toml() {
        let config = MechanismConfig::from_toml_str(
            r#"
            name = "arm"
            total_links = 3
            fixed_base = true
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "arm");
        assert_eq!(config.total_links, 3);
        assert!(config.fixed_base);
        assert!(config.base_renderable);
        assert!(!config.self_collision);
    }

    #[test]
    fn test_mechanism_rejects_zero_links() {
        let err = MechanismConfig::from_toml_str("total_links = 0").unwrap_err();
        assert!(matches!(err, DynamicsError::InvalidConfig(_)));
    }

    #[test]
    fn test_actuator_limits_validated() {
        let config = ActuatorConfig {
            torque_limits: (5.0, -5.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ActuatorConfig::default().validate().is_ok());
    }
}
