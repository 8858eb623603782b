#![warn(missing_docs)]

//! Ranging sensors mounted on armature mechanisms.
//!
//! Sensors read link transforms from an
//! [`ArticulatedBody`](armature_dynamics::ArticulatedBody) and cast rays
//! through a [`RayCaster`], which [`armature_world::PhysicsWorld`] implements.
//!
//! # Example
//!
//! ```ignore
//! use armature_sensor::{Lidar360, LidarConfig};
//!
//! let mut lidar = Lidar360::new("lidar", LidarConfig::default(), 1, Isometry3::identity())?;
//! world.step(&mut [&mut rover])?;
//! if lidar.update(&rover, &world, world.config().timestep)? {
//!     println!("nearest: {:?}", lidar.distances().iter().cloned().fold(f64::NAN, f64::min));
//! }
//! ```

pub mod config;
pub mod error;
pub mod lidar;

pub use config::LidarConfig;
pub use error::{Result, SensorError};
pub use lidar::{Lidar360, LidarSample, RayCaster, LIDAR_RAY_MASK};
