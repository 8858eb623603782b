//! Per-joint actuator: setpoint tracking layered above joint-torque injection.
//!
//! # State machine
//!
//! ```text
//!            position setpoint            velocity setpoint
//!   Idle ───────────────────▶ PositionHold ◀──────────▶ VelocityHold
//!     │                            │                         │
//!     └──── drive_joint ───▶ OpenLoopOverride ◀── drive ─────┘
//!                  (one step, then back to the previous state)
//! ```
//!
//! Hold laws re-run every step. An open-loop drive only marks the current
//! step; the motor output is still computed and summed with the drive.

use crate::config::ActuatorConfig;
use crate::error::Result;
use crate::Real;

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorState {
    /// No setpoint since the motor was attached.
    Idle,
    /// Tracking a position target.
    PositionHold,
    /// Tracking a velocity target.
    VelocityHold,
    /// An open-loop drive was issued for the upcoming step.
    OpenLoopOverride,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Setpoint {
    None,
    Position { target: Real, kp: Real },
    Velocity { target: Real, kd: Real },
}

/// Joint motor with position/velocity setpoint tracking and torque limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorAdapter {
    setpoint: Setpoint,
    derivative_gain: Real,
    torque_limits: (Real, Real),
    override_pending: bool,
    last_torque: Real,
}

impl Default for ActuatorAdapter {
    fn default() -> Self {
        Self::new(&ActuatorConfig::default())
    }
}

impl ActuatorAdapter {
    /// Motor in the idle state.
    pub fn new(config: &ActuatorConfig) -> Self {
        Self {
            setpoint: Setpoint::None,
            derivative_gain: config.derivative_gain,
            torque_limits: config.torque_limits,
            override_pending: false,
            last_torque: 0.0,
        }
    }

    /// Track a position with proportional gain `kp`.
    ///
    /// While holding position the configured derivative gain damps the
    /// joint velocity.
    pub fn set_position_target(&mut self, target: Real, kp: Real) {
        self.setpoint = Setpoint::Position { target, kp };
    }

    /// Track a velocity with gain `kd`.
    pub fn set_velocity_target(&mut self, target: Real, kd: Real) {
        self.setpoint = Setpoint::Velocity { target, kd };
    }

    /// Clamp the motor output to `[lower, upper]`.
    pub fn set_torque_limits(&mut self, lower: Real, upper: Real) -> Result<()> {
        ActuatorConfig {
            derivative_gain: self.derivative_gain,
            torque_limits: (lower, upper),
        }
        .validate()?;
        self.torque_limits = (lower, upper);
        Ok(())
    }

    /// Output clamp.
    pub fn torque_limits(&self) -> (Real, Real) {
        self.torque_limits
    }

    /// Derivative gain used while holding a position.
    pub fn derivative_gain(&self) -> Real {
        self.derivative_gain
    }

    /// Current controller state.
    pub fn state(&self) -> ActuatorState {
        if self.override_pending {
            return ActuatorState::OpenLoopOverride;
        }
        match self.setpoint {
            Setpoint::None => ActuatorState::Idle,
            Setpoint::Position { .. } => ActuatorState::PositionHold,
            Setpoint::Velocity { .. } => ActuatorState::VelocityHold,
        }
    }

    /// Active target, position or velocity depending on the hold mode.
    pub fn target(&self) -> Option<Real> {
        match self.setpoint {
            Setpoint::None => None,
            Setpoint::Position { target, .. } | Setpoint::Velocity { target, .. } => Some(target),
        }
    }

    /// Torque produced during the last step.
    pub fn last_torque(&self) -> Real {
        self.last_torque
    }

    /// Compute the control torque for the current joint state.
    pub fn compute(&mut self, position: Real, velocity: Real) -> Real {
        let raw = match self.setpoint {
            Setpoint::None => 0.0,
            Setpoint::Position { target, kp } => {
                kp * (target - position) - self.derivative_gain * velocity
            }
            Setpoint::Velocity { target, kd } => kd * (target - velocity),
        };
        let (lower, upper) = self.torque_limits;
        self.last_torque = raw.clamp(lower, upper);
        self.last_torque
    }

    pub(crate) fn mark_override(&mut self) {
        self.override_pending = true;
    }

    /// Step boundary: an open-loop override lasts exactly one step.
    pub(crate) fn end_step(&mut self) {
        self.override_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_idle_outputs_nothing() {
        let mut motor = ActuatorAdapter::default();
        assert_eq!(motor.state(), ActuatorState::Idle);
        assert_eq!(motor.compute(1.0, 1.0), 0.0);
        assert_eq!(motor.target(), None);
    }

    #[test]
    fn test_position_law() {
        let mut motor = ActuatorAdapter::new(&ActuatorConfig {
            derivative_gain: 2.0,
            ..Default::default()
        });
        motor.set_position_target(1.0, 10.0);
        assert_eq!(motor.state(), ActuatorState::PositionHold);
        // 10 * (1 - 0.5) - 2 * 0.25
        assert_relative_eq!(motor.compute(0.5, 0.25), 4.5);
    }

    #[test]
    fn test_velocity_law() {
        let mut motor = ActuatorAdapter::default();
        motor.set_velocity_target(2.0, 3.0);
        assert_eq!(motor.state(), ActuatorState::VelocityHold);
        assert_relative_eq!(motor.compute(100.0, 1.0), 3.0);
    }

    #[test]
    fn test_output_clamped() {
        let mut motor = ActuatorAdapter::default();
        motor.set_torque_limits(-1.0, 2.0).unwrap();
        motor.set_velocity_target(10.0, 10.0);
        assert_relative_eq!(motor.compute(0.0, 0.0), 2.0);
        motor.set_velocity_target(-10.0, 10.0);
        assert_relative_eq!(motor.compute(0.0, 0.0), -1.0);
        assert_relative_eq!(motor.last_torque(), -1.0);
    }

    #[test]
    fn test_inverted_limits_rejected() {
        let mut motor = ActuatorAdapter::default();
        assert!(motor.set_torque_limits(1.0, -1.0).is_err());
        assert_eq!(motor.torque_limits(), (-1000.0, 1000.0));
    }

    #[test]
    fn test_override_lasts_one_step() {
        let mut motor = ActuatorAdapter::default();
        motor.set_velocity_target(1.0, 1.0);
        motor.mark_override();
        assert_eq!(motor.state(), ActuatorState::OpenLoopOverride);
        motor.end_step();
        assert_eq!(motor.state(), ActuatorState::VelocityHold);

        let mut idle = ActuatorAdapter::default();
        idle.mark_override();
        idle.end_step();
        assert_eq!(idle.state(), ActuatorState::Idle);
    }

    #[test]
    fn test_setpoint_is_idempotent() {
        let mut once = ActuatorAdapter::default();
        once.set_position_target(0.3, 5.0);
        let mut twice = ActuatorAdapter::default();
        twice.set_position_target(0.3, 5.0);
        twice.set_position_target(0.3, 5.0);
        assert_eq!(once, twice);
    }
}
