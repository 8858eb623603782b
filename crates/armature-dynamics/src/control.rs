//! Batch joint commands and observations for control loops.

use serde::{Deserialize, Serialize};

use crate::body::ArticulatedBody;
use crate::error::Result;
use crate::Real;

/// Joint state snapshot taken between steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Joint positions (rad or m), zero for fixed joints.
    pub joint_positions: Vec<Real>,
    /// Joint velocities (rad/s or m/s), zero for fixed joints.
    pub joint_velocities: Vec<Real>,
    /// Link poses as `[x, y, z, qw, qx, qy, qz]` in meters.
    pub link_poses: Vec<[Real; 7]>,
}

impl Observation {
    /// Zero observation with the given dimensions.
    pub fn zeros(num_joints: usize, num_links: usize) -> Self {
        Self {
            joint_positions: vec![0.0; num_joints],
            joint_velocities: vec![0.0; num_joints],
            link_poses: vec![[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]; num_links],
        }
    }
}

/// Command vector indexed by joint. Entries for fixed joints are ignored;
/// missing trailing entries leave those joints untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JointCommand {
    /// Open-loop generalized forces for the next step (Nm or N).
    Torque(Vec<Real>),
    /// Position targets with a shared proportional gain.
    PositionTarget {
        /// Targets (rad or m).
        targets: Vec<Real>,
        /// Proportional gain.
        kp: Real,
    },
    /// Velocity targets with a shared gain.
    VelocityTarget {
        /// Targets (rad/s or m/s).
        targets: Vec<Real>,
        /// Velocity gain.
        kd: Real,
    },
}

impl ArticulatedBody {
    /// Issue a batch command for the next step.
    ///
    /// Position and velocity commands require a motor on every addressed
    /// movable joint and fail with `NoMotor` at the first joint without one;
    /// joints before it keep their new setpoints.
    pub fn apply_commands(&mut self, command: &JointCommand) -> Result<()> {
        let movable: Vec<usize> = (0..self.num_joints())
            .filter(|&j| self.joint_kind(j).map(|k| k.has_dof()).unwrap_or(false))
            .collect();

        match command {
            JointCommand::Torque(torques) => {
                for &j in &movable {
                    if let Some(&torque) = torques.get(j) {
                        self.drive_joint(j, torque)?;
                    }
                }
            }
            JointCommand::PositionTarget { targets, kp } => {
                for &j in &movable {
                    if let Some(&target) = targets.get(j) {
                        self.motor_position_setpoint(j, target, *kp)?;
                    }
                }
            }
            JointCommand::VelocityTarget { targets, kd } => {
                for &j in &movable {
                    if let Some(&target) = targets.get(j) {
                        self.motor_velocity_setpoint(j, target, *kd)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Snapshot of joint state and link poses.
    pub fn observe(&self) -> Observation {
        let mut obs = Observation::zeros(self.num_joints(), self.num_links());

        for j in 0..self.num_joints() {
            if let Ok(reading) = self.joint_position(j) {
                obs.joint_positions[j] = reading.value.unwrap_or(0.0);
            }
            if let Ok(reading) = self.joint_velocity(j) {
                obs.joint_velocities[j] = reading.value.unwrap_or(0.0);
            }
        }

        for (i, pose) in obs.link_poses.iter_mut().enumerate() {
            if let Ok(t) = self.link_transform(i) {
                let q = t.rotation;
                *pose = [
                    t.translation.x,
                    t.translation.y,
                    t.translation.z,
                    q.w,
                    q.i,
                    q.j,
                    q.k,
                ];
            }
        }

        obs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::ActuatorState;
    use crate::config::MechanismConfig;
    use crate::error::DynamicsError;
    use crate::link::Link;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, Point3, Vector3};

    /// base -fixed- bracket -revolute- arm
    fn welded_elbow() -> ArticulatedBody {
        let config = MechanismConfig::new("elbow", 3);
        let block = |name: &str| Link::cuboid(name, Vector3::new(0.2, 0.05, 0.05), 1000.0);
        let mut body = ArticulatedBody::new(config, block("base")).unwrap();
        body.attach_link(block("bracket"), Isometry3::translation(0.4, 0.0, 0.0))
            .unwrap();
        body.attach_link(block("arm"), Isometry3::translation(0.4, 0.0, 0.0))
            .unwrap();
        body.add_fixed_joint(0, 1).unwrap();
        body.add_revolute_joint(1, 2, Point3::new(0.6, 0.0, 0.0), Vector3::z(), false)
            .unwrap();
        body
    }

    #[test]
    fn test_commands_skip_fixed_joints() {
        let mut body = welded_elbow();
        body.add_joint_motor(1).unwrap();

        // A direct drive on the fixed joint is an error; the batch skips it.
        assert!(body.drive_joint(0, 1.0).is_err());
        body.apply_commands(&JointCommand::Torque(vec![9.0, 2.0]))
            .unwrap();
        assert_eq!(body.motor(1).unwrap().state(), ActuatorState::OpenLoopOverride);

        body.apply_commands(&JointCommand::PositionTarget {
            targets: vec![5.0, 0.3],
            kp: 10.0,
        })
        .unwrap();
        assert_eq!(body.motor(1).unwrap().target(), Some(0.3));
        assert_eq!(body.motor(0), Err(DynamicsError::NoMotor(0)));
    }

    #[test]
    fn test_commands_need_motors() {
        let config = MechanismConfig::new("pair", 3);
        let block = |name: &str| Link::cuboid(name, Vector3::new(0.2, 0.05, 0.05), 1000.0);
        let mut body = ArticulatedBody::new(config, block("base")).unwrap();
        body.attach_link(block("a"), Isometry3::translation(0.4, 0.0, 0.0))
            .unwrap();
        body.attach_link(block("b"), Isometry3::translation(0.4, 0.0, 0.0))
            .unwrap();
        body.add_revolute_joint(0, 1, Point3::new(0.2, 0.0, 0.0), Vector3::z(), false)
            .unwrap();
        body.add_revolute_joint(1, 2, Point3::new(0.6, 0.0, 0.0), Vector3::z(), false)
            .unwrap();
        body.add_joint_motor(0).unwrap();

        let err = body
            .apply_commands(&JointCommand::VelocityTarget {
                targets: vec![1.0, 2.0],
                kd: 3.0,
            })
            .unwrap_err();
        assert_eq!(err, DynamicsError::NoMotor(1));
        assert_eq!(body.motor(0).unwrap().state(), ActuatorState::VelocityHold);
        assert_eq!(body.motor(0).unwrap().target(), Some(1.0));

        // Short vectors leave trailing joints alone.
        body.apply_commands(&JointCommand::PositionTarget {
            targets: vec![0.5],
            kp: 1.0,
        })
        .unwrap();
        assert_eq!(body.motor(0).unwrap().target(), Some(0.5));
    }

    #[test]
    fn test_observation_json_round_trip() {
        let mut body = welded_elbow();
        body.set_joint_ic(1, 0.4, -1.5).unwrap();
        let obs = body.observe();
        assert_eq!(obs.joint_positions, vec![0.0, 0.4]);
        assert_eq!(obs.joint_velocities, vec![0.0, -1.5]);
        assert_relative_eq!(obs.link_poses[2][0], 0.8);
        assert_relative_eq!(obs.link_poses[2][3], 1.0);

        let json = serde_json::to_string(&obs).unwrap();
        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, obs);

        let command = JointCommand::VelocityTarget {
            targets: vec![0.0, 1.0],
            kd: 2.0,
        };
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(serde_json::from_str::<JointCommand>(&json).unwrap(), command);
    }
}
