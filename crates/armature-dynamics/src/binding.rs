//! Boundary between mechanisms and the rigid-body world that integrates them.
//!
//! A mechanism registers a [`MultibodyDesc`] once. Each step the driver
//! ([`step_world`]) runs the body's actuation phase, hands the resulting
//! [`StepInputs`] to the world, and copies the world's [`MultibodyState`]
//! back into the body's caches. The world never calls into a mechanism and a
//! mechanism never calls the integration algorithm.

use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::{Isometry3, Point3, Unit, Vector3};
use parry3d::shape::SharedShape;

use crate::body::ArticulatedBody;
use crate::error::Result;
use crate::joint::{JointFeedback, JointKind, JointLimit};
use crate::link::MassProperties;
use crate::Real;

slotmap::new_key_type! {
    /// Handle of a multibody registered in a dynamics world.
    pub struct MultibodyHandle;
}

/// Identity of a dynamics world instance.
///
/// Handles are only meaningful in the world that issued them; a body
/// remembers the id alongside its handle so it can refuse a foreign world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(u64);

impl WorldId {
    /// A process-unique id.
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Link entry of a registered multibody.
#[derive(Clone)]
pub struct LinkDesc {
    /// Collision shape in the link frame.
    pub shape: SharedShape,
    /// Mass properties in the link frame.
    pub mass: MassProperties,
    /// Parent link, `None` for the base.
    pub parent: Option<usize>,
    /// Pose relative to the parent link frame at zero joint displacement.
    pub rest_transform: Isometry3<Real>,
}

/// Joint entry of a registered multibody.
#[derive(Debug, Clone)]
pub struct JointDesc {
    /// Joint kind.
    pub kind: JointKind,
    /// Parent link index.
    pub parent: usize,
    /// Child link index.
    pub child: usize,
    /// Axis in the parent frame.
    pub axis: Unit<Vector3<Real>>,
    /// Pivot in the parent frame.
    pub pivot: Point3<Real>,
    /// Pivot in the child frame.
    pub child_pivot: Point3<Real>,
    /// Whether the two links joined here may collide.
    pub allow_self_collision: bool,
}

/// Everything a world needs to simulate a mechanism.
#[derive(Clone)]
pub struct MultibodyDesc {
    /// Mechanism name.
    pub name: String,
    /// Links; index 0 is the base. Parents precede children.
    pub links: Vec<LinkDesc>,
    /// Joints in creation order.
    pub joints: Vec<JointDesc>,
    /// Whether the base is pinned to the world.
    pub fixed_base: bool,
    /// Whether non-adjacent links may collide.
    pub self_collision: bool,
    /// Initial joint positions, one per joint (ignored for fixed joints).
    pub initial_positions: Vec<Real>,
    /// Initial joint velocities, one per joint.
    pub initial_velocities: Vec<Real>,
}

/// Generalized inputs for one step. Missing entries count as zero.
#[derive(Debug, Clone, Default)]
pub struct StepInputs {
    /// Non-constraint generalized force per joint (motor + drive + damping).
    pub joint_forces: Vec<Real>,
    /// Active limit per joint.
    pub joint_limits: Vec<Option<JointLimit>>,
    /// World-frame force at each link's centre of mass.
    pub link_forces: Vec<Vector3<Real>>,
    /// World-frame torque on each link.
    pub link_torques: Vec<Vector3<Real>>,
}

/// Simulated state of a registered multibody.
#[derive(Debug, Clone, Default)]
pub struct MultibodyState {
    /// World pose of each link frame.
    pub link_transforms: Vec<Isometry3<Real>>,
    /// World-frame linear velocity of each link's centre of mass.
    pub link_linear_velocities: Vec<Vector3<Real>>,
    /// World-frame angular velocity of each link.
    pub link_angular_velocities: Vec<Vector3<Real>>,
    /// Joint positions (zero for fixed joints).
    pub joint_positions: Vec<Real>,
    /// Joint velocities (zero for fixed joints).
    pub joint_velocities: Vec<Real>,
    /// Constraint reaction per joint from the last step.
    pub joint_feedback: Vec<JointFeedback>,
}

/// A rigid-body world that can host articulated mechanisms.
///
/// Stepping is split in two: [`apply_inputs`](Self::apply_inputs) queues the
/// generalized inputs of each mechanism, then [`advance`](Self::advance)
/// integrates every hosted mechanism together by one timestep.
pub trait DynamicsWorld {
    /// Identity of this world instance.
    fn id(&self) -> WorldId;

    /// Gravity applied to registered mechanisms.
    fn gravity(&self) -> Vector3<Real>;

    /// Fixed step length in seconds.
    fn timestep(&self) -> Real;

    /// Register a mechanism with its base at `transform`.
    fn insert_multibody(
        &mut self,
        desc: MultibodyDesc,
        transform: Isometry3<Real>,
    ) -> Result<MultibodyHandle>;

    /// Unregister a mechanism.
    fn remove_multibody(&mut self, handle: MultibodyHandle) -> Result<()>;

    /// Current state of a mechanism.
    fn multibody_state(&self, handle: MultibodyHandle) -> Result<&MultibodyState>;

    /// Overwrite one joint's position and velocity.
    fn set_joint_state(
        &mut self,
        handle: MultibodyHandle,
        joint: usize,
        position: Real,
        velocity: Real,
    ) -> Result<()>;

    /// Move the base link frame.
    fn set_base_transform(
        &mut self,
        handle: MultibodyHandle,
        transform: Isometry3<Real>,
    ) -> Result<()>;

    /// Queue `inputs` for the mechanism's next [`advance`](Self::advance).
    fn apply_inputs(&mut self, handle: MultibodyHandle, inputs: StepInputs) -> Result<()>;

    /// Integrate every hosted mechanism by one timestep.
    fn advance(&mut self) -> Result<()>;
}

/// Run one synchronous step for `bodies`.
///
/// Every body must be registered in `world`; otherwise nothing is touched
/// and the error is returned. Then each body runs its actuation phase
/// (gravity, motors, drives, damping, link wrenches), the world advances
/// once, and joint state and feedback are read back. Per-step commands are
/// drained and motor overrides cleared whether or not integration succeeds.
pub fn step_world<W: DynamicsWorld + ?Sized>(
    world: &mut W,
    bodies: &mut [&mut ArticulatedBody],
) -> Result<()> {
    let handles = bodies
        .iter()
        .map(|body| body.registered_in(&*world))
        .collect::<Result<Vec<_>>>()?;

    let gravity = world.gravity();
    for i in 0..bodies.len() {
        let inputs = bodies[i].actuation_phase(gravity);
        if let Err(err) = world.apply_inputs(handles[i], inputs) {
            for body in bodies[..=i].iter_mut() {
                body.abort_step();
            }
            return Err(err);
        }
    }

    if let Err(err) = world.advance() {
        for body in bodies.iter_mut() {
            body.abort_step();
        }
        return Err(err);
    }

    for (body, &handle) in bodies.iter_mut().zip(&handles) {
        body.read_back(world.multibody_state(handle)?);
    }
    Ok(())
}
