#![warn(missing_docs)]

//! Rapier-backed rigid-body world for armature mechanisms.
//!
//! [`PhysicsWorld`] implements [`armature_dynamics::DynamicsWorld`]. Each
//! registered mechanism becomes a set of rapier rigid bodies joined by
//! impulse joints; the world steps them together, enforces joint limits,
//! filters self-contacts and reports per-joint reaction feedback. Static
//! scene geometry can be added for contacts and ray casts.
//!
//! # Example
//!
//! ```ignore
//! use armature_world::{PhysicsWorld, WorldConfig};
//!
//! let mut world = PhysicsWorld::new(WorldConfig::default())?;
//! arm.add_to_dynamics_world(&mut world, Isometry3::identity())?;
//! for _ in 0..240 {
//!     world.step(&mut [&mut arm])?;
//! }
//! ```

mod config;
mod contact;
mod error;
mod mechanism;
mod world;

pub use config::WorldConfig;
pub use error::{Result, WorldError};
pub use rapier3d::prelude::ColliderHandle;
pub use world::{
    PhysicsWorld, RayHit, MASK_ALL, MASK_ANIMATED_COLLIDING, MASK_DYNAMIC,
    MASK_STATIC,
};
