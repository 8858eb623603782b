//! Error types for sensors.

use thiserror::Error;

/// Errors reported by sensors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Settings failed to parse or validate.
    #[error("invalid sensor configuration: {0}")]
    InvalidConfig(String),

    /// The sensor is mounted on a link the mechanism does not have.
    #[error("sensor '{name}' is mounted on link {link}, but the mechanism has {links} links")]
    InvalidLink {
        /// Sensor name.
        name: String,
        /// Mount link index.
        link: usize,
        /// Number of links in the mechanism.
        links: usize,
    },
}

/// Result type for sensor operations.
pub type Result<T> = std::result::Result<T, SensorError>;
