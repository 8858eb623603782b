//! Error types for mechanism construction and control.

use thiserror::Error;

/// Errors reported by [`ArticulatedBody`](crate::ArticulatedBody) operations.
///
/// Construction errors (`InvalidIndex`, `InvalidTopology`) are caller bugs
/// and should abort mechanism assembly. Missing-controller errors
/// (`NoMotor`, `NoLimit`) are recoverable: attach the controller and retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DynamicsError {
    /// Link or joint index outside the current tree.
    #[error("{what} index {index} out of range (len {len})")]
    InvalidIndex {
        /// Which index space was addressed ("link" or "joint").
        what: &'static str,
        /// The offending index.
        index: usize,
        /// Size of the index space at the time of the call.
        len: usize,
    },

    /// Structural violation of the tree or of the construction phase.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// The joint has no motor attached.
    #[error("joint {0} has no motor")]
    NoMotor(usize),

    /// The joint has no limit attached.
    #[error("joint {0} has no limit")]
    NoLimit(usize),

    /// The operation needs a live registration in a dynamics world.
    #[error("mechanism '{0}' is not registered in a dynamics world")]
    NotRegistered(String),

    /// The mechanism is already registered.
    #[error("mechanism '{0}' is already registered in a dynamics world")]
    AlreadyRegistered(String),

    /// The world does not know the given multibody handle.
    #[error("unknown multibody handle")]
    UnknownHandle,

    /// Configuration failed to parse or validate.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The external solver reported a failure.
    #[error("solver failure: {0}")]
    Solver(String),
}

impl DynamicsError {
    pub(crate) fn link_index(index: usize, len: usize) -> Self {
        Self::InvalidIndex {
            what: "link",
            index,
            len,
        }
    }

    pub(crate) fn joint_index(index: usize, len: usize) -> Self {
        Self::InvalidIndex {
            what: "joint",
            index,
            len,
        }
    }

    pub(crate) fn topology(msg: impl Into<String>) -> Self {
        Self::InvalidTopology(msg.into())
    }
}

/// Result type for mechanism operations.
pub type Result<T> = std::result::Result<T, DynamicsError>;
