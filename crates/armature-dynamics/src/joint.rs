//! Typed joints between links.

use nalgebra::{Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::actuator::ActuatorAdapter;
use crate::error::{DynamicsError, Result};
use crate::Real;

/// Joint type. Determines the number of degrees of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointKind {
    /// One rotational DoF about an axis through a pivot.
    Revolute,
    /// One translational DoF along an axis.
    Prismatic,
    /// Rigid connection, no DoF.
    Fixed,
}

impl JointKind {
    /// Number of scalar degrees of freedom.
    pub fn dof(self) -> usize {
        match self {
            JointKind::Revolute | JointKind::Prismatic => 1,
            JointKind::Fixed => 0,
        }
    }

    /// Whether the joint carries a position/velocity.
    pub fn has_dof(self) -> bool {
        self.dof() > 0
    }
}

/// Position bounds on a joint DoF (rad or m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimit {
    /// Lower bound.
    pub lower: Real,
    /// Upper bound.
    pub upper: Real,
}

impl JointLimit {
    /// Limit with `lower <= upper`.
    pub fn new(lower: Real, upper: Real) -> Result<Self> {
        if !(lower <= upper) {
            return Err(DynamicsError::topology(format!(
                "joint limit lower bound {lower} exceeds upper bound {upper}"
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Whether `value` lies within the bounds.
    pub fn contains(&self, value: Real) -> bool {
        (self.lower..=self.upper).contains(&value)
    }
}

/// Constraint reaction at a joint, in the child link's centre-of-mass frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointFeedback {
    /// Reaction force acting on the child.
    pub force: Vector3<Real>,
    /// Lever arm (COM → pivot) crossed with the force.
    pub torque: Vector3<Real>,
}

/// Scalar joint state together with the joint kind.
///
/// `value` is `None` for fixed joints, which have no degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointReading {
    /// Joint kind.
    pub kind: JointKind,
    /// Position or velocity, if the joint has a DoF.
    pub value: Option<Real>,
}

/// A joint of an articulated body.
///
/// Geometry is stored in the parent link frame (axis, pivot) and in the child
/// link frame (`child_pivot`). Motor and limit are single optional slots.
#[derive(Debug, Clone)]
pub struct Joint {
    kind: JointKind,
    parent: usize,
    child: usize,
    axis: Unit<Vector3<Real>>,
    pivot: Point3<Real>,
    child_pivot: Point3<Real>,
    allow_self_collision: bool,
    sig_damping: Real,
    vel_damping: Real,
    motor: Option<ActuatorAdapter>,
    limit: Option<JointLimit>,
    feedback: JointFeedback,
    position: Real,
    velocity: Real,
    applied_drive: Real,
    damping_torque: Real,
}

impl Joint {
    pub(crate) fn new(
        kind: JointKind,
        parent: usize,
        child: usize,
        axis: Unit<Vector3<Real>>,
        pivot: Point3<Real>,
        child_pivot: Point3<Real>,
        allow_self_collision: bool,
    ) -> Self {
        Self {
            kind,
            parent,
            child,
            axis,
            pivot,
            child_pivot,
            allow_self_collision,
            sig_damping: 0.0,
            vel_damping: 0.0,
            motor: None,
            limit: None,
            feedback: JointFeedback::default(),
            position: 0.0,
            velocity: 0.0,
            applied_drive: 0.0,
            damping_torque: 0.0,
        }
    }

    /// Joint kind.
    pub fn kind(&self) -> JointKind {
        self.kind
    }

    /// Parent link index.
    pub fn parent(&self) -> usize {
        self.parent
    }

    /// Child link index.
    pub fn child(&self) -> usize {
        self.child
    }

    /// Joint axis in the parent link frame.
    pub fn axis(&self) -> &Unit<Vector3<Real>> {
        &self.axis
    }

    /// Pivot in the parent link frame.
    pub fn pivot(&self) -> &Point3<Real> {
        &self.pivot
    }

    /// Pivot in the child link frame.
    pub fn child_pivot(&self) -> &Point3<Real> {
        &self.child_pivot
    }

    /// Whether the two joined links may collide.
    pub fn allows_self_collision(&self) -> bool {
        self.allow_self_collision
    }

    /// `(signum, viscous)` damping coefficients.
    pub fn damping(&self) -> (Real, Real) {
        (self.sig_damping, self.vel_damping)
    }

    /// Attached motor, if any.
    pub fn motor(&self) -> Option<&ActuatorAdapter> {
        self.motor.as_ref()
    }

    /// Attached limit, if any.
    pub fn limit(&self) -> Option<&JointLimit> {
        self.limit.as_ref()
    }

    /// Last cached constraint reaction.
    pub fn feedback(&self) -> &JointFeedback {
        &self.feedback
    }

    /// Damping generalized force for a given joint velocity.
    ///
    /// `-(sig * sign(v) + vel * v)`, with `sign(0) = 0`. Zero for fixed joints.
    pub fn damping_force(&self, velocity: Real) -> Real {
        if !self.kind.has_dof() {
            return 0.0;
        }
        let sign = if velocity > 0.0 {
            1.0
        } else if velocity < 0.0 {
            -1.0
        } else {
            0.0
        };
        -(self.sig_damping * sign + self.vel_damping * velocity)
    }

    pub(crate) fn reading(&self, value: Real) -> JointReading {
        JointReading {
            kind: self.kind,
            value: self.kind.has_dof().then_some(value),
        }
    }

    pub(crate) fn position(&self) -> Real {
        self.position
    }

    pub(crate) fn velocity(&self) -> Real {
        self.velocity
    }

    pub(crate) fn applied_drive(&self) -> Real {
        self.applied_drive
    }

    pub(crate) fn damping_torque(&self) -> Real {
        self.damping_torque
    }

    pub(crate) fn motor_mut(&mut self) -> Option<&mut ActuatorAdapter> {
        self.motor.as_mut()
    }

    pub(crate) fn set_motor(&mut self, motor: ActuatorAdapter) {
        self.motor = Some(motor);
    }

    pub(crate) fn set_limit(&mut self, limit: JointLimit) {
        self.limit = Some(limit);
    }

    pub(crate) fn set_damping(&mut self, sig: Real, vel: Real) {
        self.sig_damping = sig;
        self.vel_damping = vel;
    }

    pub(crate) fn set_state(&mut self, position: Real, velocity: Real) {
        self.position = position;
        self.velocity = velocity;
    }

    pub(crate) fn set_feedback(&mut self, feedback: JointFeedback) {
        self.feedback = feedback;
    }

    pub(crate) fn set_applied_drive(&mut self, drive: Real) {
        self.applied_drive = drive;
    }

    pub(crate) fn set_damping_torque(&mut self, torque: Real) {
        self.damping_torque = torque;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn revolute() -> Joint {
        Joint::new(
            JointKind::Revolute,
            0,
            1,
            Vector3::z_axis(),
            Point3::origin(),
            Point3::new(-0.5, 0.0, 0.0),
            false,
        )
    }

    #[test]
    fn test_dof_by_kind() {
        assert_eq!(JointKind::Revolute.dof(), 1);
        assert_eq!(JointKind::Prismatic.dof(), 1);
        assert_eq!(JointKind::Fixed.dof(), 0);
    }

    #[test]
    fn test_viscous_damping_sign() {
        let mut joint = revolute();
        joint.set_damping(0.0, 0.8);
        assert_relative_eq!(joint.damping_force(2.5), -0.8 * 2.5);
        assert_relative_eq!(joint.damping_force(-1.0), 0.8);
        assert_eq!(joint.damping_force(0.0), 0.0);
    }

    #[test]
    fn test_signum_damping() {
        let mut joint = revolute();
        joint.set_damping(0.3, 0.0);
        assert_relative_eq!(joint.damping_force(0.01), -0.3);
        assert_relative_eq!(joint.damping_force(-5.0), 0.3);
        assert_eq!(joint.damping_force(0.0), 0.0);
    }

    #[test]
    fn test_fixed_joint_has_no_damping() {
        let mut joint = revolute();
        joint.kind = JointKind::Fixed;
        joint.set_damping(1.0, 1.0);
        assert_eq!(joint.damping_force(3.0), 0.0);
    }

    #[test]
    fn test_limit_bounds() {
        assert!(JointLimit::new(1.0, 0.0).is_err());
        let limit = JointLimit::new(0.0, 0.5).unwrap();
        assert!(limit.contains(0.25));
        assert!(!limit.contains(0.6));
    }

    #[test]
    fn test_reading_for_fixed() {
        let mut joint = revolute();
        assert_eq!(joint.reading(1.0).value, Some(1.0));
        joint.kind = JointKind::Fixed;
        let reading = joint.reading(1.0);
        assert_eq!(reading.kind, JointKind::Fixed);
        assert_eq!(reading.value, None);
    }
}
