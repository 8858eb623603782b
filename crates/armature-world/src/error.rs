//! Error types for the dynamics world.

use armature_dynamics::DynamicsError;
use thiserror::Error;

/// Errors that can occur while simulating the world.
#[derive(Error, Debug)]
pub enum WorldError {
    /// Integration produced NaN or infinite state.
    #[error("non-finite state in '{0}' after integration")]
    NonFiniteState(String),

    /// A multibody description is inconsistent.
    #[error("invalid multibody description: {0}")]
    InvalidDescription(String),

    /// Settings failed validation.
    #[error("invalid world configuration: {0}")]
    InvalidConfig(String),

    /// Settings failed to parse.
    #[error("failed to parse world configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl From<WorldError> for DynamicsError {
    fn from(err: WorldError) -> Self {
        match err {
            WorldError::InvalidDescription(msg) => DynamicsError::InvalidTopology(msg),
            WorldError::InvalidConfig(msg) => DynamicsError::InvalidConfig(msg),
            WorldError::Config(e) => DynamicsError::InvalidConfig(e.to_string()),
            other => DynamicsError::Solver(other.to_string()),
        }
    }
}

/// Result type for world operations.
pub type Result<T> = std::result::Result<T, WorldError>;
