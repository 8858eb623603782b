#![warn(missing_docs)]

//! Articulated rigid-body mechanisms.
//!
//! This crate builds kinematic trees of rigid links connected by typed
//! joints, layers per-joint actuators over raw joint-torque injection, and
//! exposes joint state and constraint feedback for sensing and control.
//! Integration is delegated to a world implementing [`DynamicsWorld`].
//!
//! # Features
//!
//! - Revolute, prismatic and fixed joints with optional motor and limit slots
//! - Position/velocity setpoint tracking and one-step open-loop drives
//! - Signum and viscous joint damping
//! - Per-joint reaction feedback at the child centre of mass
//! - Render records and bounding boxes on demand
//!
//! # Example
//!
//! ```ignore
//! use armature_dynamics::{ArticulatedBody, Link, MechanismConfig, step_world};
//! use nalgebra::{Isometry3, Point3, Vector3};
//!
//! let config = MechanismConfig::new("arm", 2).with_fixed_base(true);
//! let base = Link::cuboid("base", Vector3::new(0.1, 0.1, 0.1), 1000.0);
//! let mut arm = ArticulatedBody::new(config, base)?;
//!
//! let upper = Link::cuboid("upper", Vector3::new(0.5, 0.05, 0.05), 1000.0);
//! arm.attach_link(upper, Isometry3::translation(0.5, 0.0, 0.0))?;
//! let shoulder = arm.add_revolute_joint(0, 1, Point3::origin(), Vector3::z(), false)?;
//! arm.add_joint_motor(shoulder)?;
//!
//! arm.add_to_dynamics_world(&mut world, Isometry3::identity())?;
//! arm.motor_position_setpoint(shoulder, std::f64::consts::FRAC_PI_2, 20.0)?;
//! step_world(&mut world, &mut [&mut arm])?;
//! ```

pub mod actuator;
pub mod binding;
pub mod body;
pub mod config;
pub mod control;
pub mod error;
pub mod joint;
pub mod link;
pub mod render;

pub use actuator::{ActuatorAdapter, ActuatorState};
pub use binding::{
    step_world, DynamicsWorld, JointDesc, LinkDesc, MultibodyDesc, MultibodyHandle,
    MultibodyState, StepInputs, WorldId,
};
pub use body::ArticulatedBody;
pub use config::{ActuatorConfig, MechanismConfig};
pub use control::{JointCommand, Observation};
pub use error::{DynamicsError, Result};
pub use joint::{Joint, JointFeedback, JointKind, JointLimit, JointReading};
pub use link::{Link, MassProperties};
pub use render::{Renderable, RenderableKind, JOINT_MARKER_LENGTH};

/// Scalar type used throughout the mechanism layer.
pub type Real = f64;
