//! The articulated body: link tree construction, actuation and state queries.
//!
//! A body goes through two phases. During construction links are attached
//! and joints created; [`ArticulatedBody::add_to_dynamics_world`] validates
//! the tree, registers it and freezes the topology for good. After that the
//! body only accepts per-step commands and answers queries from the state
//! cached at the end of the last step.

use nalgebra::{Isometry3, Point3, Unit, Vector3};
use parry3d::bounding_volume::{Aabb, BoundingVolume};
use tracing::{debug, trace, warn};

use crate::actuator::ActuatorAdapter;
use crate::binding::{
    DynamicsWorld, JointDesc, LinkDesc, MultibodyDesc, MultibodyHandle, MultibodyState,
    StepInputs, WorldId,
};
use crate::config::{ActuatorConfig, MechanismConfig};
use crate::error::{DynamicsError, Result};
use crate::joint::{Joint, JointFeedback, JointKind, JointLimit, JointReading};
use crate::link::Link;
use crate::render::{Renderable, RenderableKind, JOINT_MARKER_LENGTH};
use crate::Real;

/// Commands issued between two steps, drained by the actuation phase.
#[derive(Debug, Clone, Default)]
struct StepCommands {
    drives: Vec<Option<Real>>,
    link_forces: Vec<Vector3<Real>>,
    link_torques: Vec<Vector3<Real>>,
    gravity: Option<Vector3<Real>>,
    damping: Option<Vec<Real>>,
}

impl StepCommands {
    fn new(num_links: usize, num_joints: usize) -> Self {
        Self {
            drives: vec![None; num_joints],
            link_forces: vec![Vector3::zeros(); num_links],
            link_torques: vec![Vector3::zeros(); num_links],
            gravity: None,
            damping: None,
        }
    }
}

/// Where a body is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Registration {
    world: WorldId,
    handle: MultibodyHandle,
}

/// A tree of rigid links connected by typed joints.
#[derive(Debug)]
pub struct ArticulatedBody {
    config: MechanismConfig,
    links: Vec<Link>,
    rest_poses: Vec<Isometry3<Real>>,
    joints: Vec<Joint>,
    incoming: Vec<Option<usize>>,
    commands: StepCommands,
    link_transforms: Vec<Isometry3<Real>>,
    link_linear_velocities: Vec<Vector3<Real>>,
    link_angular_velocities: Vec<Vector3<Real>>,
    registration: Option<Registration>,
    frozen: bool,
}

impl ArticulatedBody {
    /// Start a mechanism with its base link (index 0).
    pub fn new(config: MechanismConfig, mut base: Link) -> Result<Self> {
        config.validate()?;
        base.set_transform(Isometry3::identity());
        base.set_renderable(config.base_renderable);

        Ok(Self {
            config,
            links: vec![base],
            rest_poses: vec![Isometry3::identity()],
            joints: Vec::new(),
            incoming: vec![None],
            commands: StepCommands::new(1, 0),
            link_transforms: vec![Isometry3::identity()],
            link_linear_velocities: vec![Vector3::zeros()],
            link_angular_velocities: vec![Vector3::zeros()],
            registration: None,
            frozen: false,
        })
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Append a link.
    ///
    /// `parent_transform` is relative to the previously attached link. Returns
    /// the new link index.
    pub fn attach_link(&mut self, mut link: Link, parent_transform: Isometry3<Real>) -> Result<usize> {
        self.ensure_constructing("attach a link")?;
        if self.links.len() >= self.config.total_links {
            return Err(DynamicsError::topology(format!(
                "mechanism '{}' already holds its {} declared links",
                self.config.name, self.config.total_links
            )));
        }

        let rest = self.rest_poses[self.links.len() - 1] * parent_transform;
        link.set_transform(parent_transform);

        self.links.push(link);
        self.rest_poses.push(rest);
        self.incoming.push(None);
        self.commands.link_forces.push(Vector3::zeros());
        self.commands.link_torques.push(Vector3::zeros());
        self.link_transforms.push(rest);
        self.link_linear_velocities.push(Vector3::zeros());
        self.link_angular_velocities.push(Vector3::zeros());

        Ok(self.links.len() - 1)
    }

    /// Rotational joint about `axis` through `pivot`, both in the mechanism
    /// frame at rest. Returns the joint index.
    pub fn add_revolute_joint(
        &mut self,
        parent: usize,
        child: usize,
        pivot: Point3<Real>,
        axis: Vector3<Real>,
        allow_self_collision: bool,
    ) -> Result<usize> {
        self.add_joint(JointKind::Revolute, parent, child, Some(pivot), axis, allow_self_collision)
    }

    /// Translational joint along `axis` (mechanism frame at rest).
    pub fn add_prismatic_joint(
        &mut self,
        parent: usize,
        child: usize,
        axis: Vector3<Real>,
        allow_self_collision: bool,
    ) -> Result<usize> {
        self.add_joint(JointKind::Prismatic, parent, child, None, axis, allow_self_collision)
    }

    /// Rigid joint. The two links never collide with each other.
    pub fn add_fixed_joint(&mut self, parent: usize, child: usize) -> Result<usize> {
        self.add_joint(JointKind::Fixed, parent, child, None, Vector3::z(), false)
    }

    fn add_joint(
        &mut self,
        kind: JointKind,
        parent: usize,
        child: usize,
        pivot: Option<Point3<Real>>,
        axis: Vector3<Real>,
        allow_self_collision: bool,
    ) -> Result<usize> {
        self.ensure_constructing("add a joint")?;
        self.check_link(parent)?;
        self.check_link(child)?;
        if parent >= child {
            return Err(DynamicsError::topology(format!(
                "joint parent {parent} must precede child {child}"
            )));
        }
        if let Some(existing) = self.incoming[child] {
            return Err(DynamicsError::topology(format!(
                "link {child} already has incoming joint {existing}"
            )));
        }
        let axis = Unit::try_new(axis, 1.0e-9)
            .ok_or_else(|| DynamicsError::topology("joint axis has zero length"))?;

        let parent_rest = self.rest_poses[parent];
        let child_rest = self.rest_poses[child];
        let pivot = pivot.unwrap_or_else(|| Point3::from(child_rest.translation.vector));

        let joint = Joint::new(
            kind,
            parent,
            child,
            Unit::new_normalize(parent_rest.inverse_transform_vector(&axis)),
            parent_rest.inverse_transform_point(&pivot),
            child_rest.inverse_transform_point(&pivot),
            allow_self_collision,
        );

        let index = self.joints.len();
        self.joints.push(joint);
        self.incoming[child] = Some(index);
        self.commands.drives.push(None);
        Ok(index)
    }

    /// Attach a motor with default gains, replacing any existing one.
    pub fn add_joint_motor(&mut self, index: usize) -> Result<()> {
        self.add_joint_motor_with(index, ActuatorConfig::default())
    }

    /// Attach a motor with explicit gains and limits, replacing any existing one.
    pub fn add_joint_motor_with(&mut self, index: usize, config: ActuatorConfig) -> Result<()> {
        self.check_joint(index)?;
        config.validate()?;
        self.joints[index].set_motor(ActuatorAdapter::new(&config));
        Ok(())
    }

    /// Attach position bounds, replacing any existing limit.
    pub fn add_joint_limit(&mut self, index: usize, lower: Real, upper: Real) -> Result<()> {
        self.check_joint(index)?;
        if !self.joints[index].kind().has_dof() {
            return Err(DynamicsError::topology(format!(
                "joint {index} is fixed and cannot be limited"
            )));
        }
        let limit = JointLimit::new(lower, upper)?;
        self.joints[index].set_limit(limit);
        Ok(())
    }

    /// Signum and viscous damping coefficients of a joint.
    pub fn set_joint_damping(&mut self, index: usize, constant: Real, viscous: Real) -> Result<()> {
        self.check_joint(index)?;
        if !(constant >= 0.0 && viscous >= 0.0) {
            return Err(DynamicsError::InvalidConfig(format!(
                "joint {index}: damping coefficients must be non-negative, got ({constant}, {viscous})"
            )));
        }
        self.joints[index].set_damping(constant, viscous);
        Ok(())
    }

    /// Initial position and velocity of a joint, used at registration.
    pub fn set_joint_ic(&mut self, index: usize, position: Real, velocity: Real) -> Result<()> {
        self.check_joint(index)?;
        self.ensure_constructing("set an initial condition")?;
        if !self.joints[index].kind().has_dof() {
            return Err(DynamicsError::topology(format!(
                "joint {index} is fixed and has no state"
            )));
        }
        self.joints[index].set_state(position, velocity);
        Ok(())
    }

    /// Show or hide the base link in render records.
    pub fn set_base_renderable(&mut self, renderable: bool) {
        self.config.base_renderable = renderable;
        self.links[0].set_renderable(renderable);
    }

    /// Allow collisions between non-adjacent links. Construction only.
    pub fn set_self_collision(&mut self, enabled: bool) -> Result<()> {
        self.ensure_constructing("change self-collision")?;
        self.config.self_collision = enabled;
        Ok(())
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register with a dynamics world, base at `transform`, and freeze the tree.
    pub fn add_to_dynamics_world<W: DynamicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        transform: Isometry3<Real>,
    ) -> Result<MultibodyHandle> {
        if self.registration.is_some() {
            return Err(DynamicsError::AlreadyRegistered(self.config.name.clone()));
        }
        if self.links.len() != self.config.total_links {
            return Err(DynamicsError::topology(format!(
                "mechanism '{}' has {} of {} declared links",
                self.config.name,
                self.links.len(),
                self.config.total_links
            )));
        }
        if let Some(orphan) = (1..self.links.len()).find(|&i| self.incoming[i].is_none()) {
            return Err(DynamicsError::topology(format!(
                "link {orphan} has no incoming joint"
            )));
        }

        let handle = world.insert_multibody(self.describe(), transform)?;
        self.registration = Some(Registration {
            world: world.id(),
            handle,
        });
        self.frozen = true;
        self.sync_state(world.multibody_state(handle)?);

        debug!(
            mechanism = %self.config.name,
            links = self.links.len(),
            joints = self.joints.len(),
            fixed_base = self.config.fixed_base,
            "registered mechanism"
        );
        Ok(handle)
    }

    /// Unregister from the world. The topology stays frozen.
    pub fn remove_from_dynamics_world<W: DynamicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
    ) -> Result<()> {
        let handle = self.registered_in(world)?;
        world.remove_multibody(handle)?;
        self.registration = None;
        debug!(mechanism = %self.config.name, "unregistered mechanism");
        Ok(())
    }

    /// Overwrite a joint's position and velocity in the live world.
    pub fn set_joint_state<W: DynamicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        index: usize,
        position: Real,
        velocity: Real,
    ) -> Result<()> {
        self.check_joint(index)?;
        let handle = self.registered_in(world)?;
        if !self.joints[index].kind().has_dof() {
            return Err(DynamicsError::topology(format!(
                "joint {index} is fixed and has no state"
            )));
        }
        world.set_joint_state(handle, index, position, velocity)?;
        self.sync_state(world.multibody_state(handle)?);
        Ok(())
    }

    /// Move the base link in the live world.
    pub fn set_base_transform<W: DynamicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        transform: Isometry3<Real>,
    ) -> Result<()> {
        let handle = self.registered_in(world)?;
        world.set_base_transform(handle, transform)?;
        self.sync_state(world.multibody_state(handle)?);
        Ok(())
    }

    /// World pose of the base link.
    pub fn base_transform(&self) -> Isometry3<Real> {
        self.link_transforms[0]
    }

    fn describe(&self) -> MultibodyDesc {
        let links = self
            .links
            .iter()
            .enumerate()
            .map(|(i, link)| {
                let parent = self.incoming[i].map(|j| self.joints[j].parent());
                let rest_transform = match parent {
                    Some(p) => self.rest_poses[p].inverse() * self.rest_poses[i],
                    None => Isometry3::identity(),
                };
                LinkDesc {
                    shape: link.shape().clone(),
                    mass: *link.mass_properties(),
                    parent,
                    rest_transform,
                }
            })
            .collect();

        let joints = self
            .joints
            .iter()
            .map(|joint| JointDesc {
                kind: joint.kind(),
                parent: joint.parent(),
                child: joint.child(),
                axis: *joint.axis(),
                pivot: *joint.pivot(),
                child_pivot: *joint.child_pivot(),
                allow_self_collision: joint.allows_self_collision(),
            })
            .collect();

        MultibodyDesc {
            name: self.config.name.clone(),
            links,
            joints,
            fixed_base: self.config.fixed_base,
            self_collision: self.config.self_collision,
            initial_positions: self.joints.iter().map(Joint::position).collect(),
            initial_velocities: self.joints.iter().map(Joint::velocity).collect(),
        }
    }

    // =========================================================================
    // Per-step commands
    // =========================================================================

    /// Track a position target on the joint's motor.
    pub fn motor_position_setpoint(&mut self, index: usize, target: Real, kp: Real) -> Result<()> {
        self.warn_if_fixed(index, "position setpoint")?;
        self.motor_mut(index)?.set_position_target(target, kp);
        Ok(())
    }

    /// Track a velocity target on the joint's motor.
    pub fn motor_velocity_setpoint(&mut self, index: usize, target: Real, kd: Real) -> Result<()> {
        self.warn_if_fixed(index, "velocity setpoint")?;
        self.motor_mut(index)?.set_velocity_target(target, kd);
        Ok(())
    }

    /// Open-loop generalized force for the next step, added to the motor
    /// output. Repeated calls before a step keep the last value.
    pub fn drive_joint(&mut self, index: usize, force_torque: Real) -> Result<()> {
        self.check_joint(index)?;
        if !self.joints[index].kind().has_dof() {
            return Err(DynamicsError::topology(format!(
                "joint {index} is fixed and cannot be driven"
            )));
        }
        self.commands.drives[index] = Some(force_torque);
        if let Some(motor) = self.joints[index].motor_mut() {
            motor.mark_override();
        }
        Ok(())
    }

    /// Gravity for the next step. Without this call the world's gravity is used.
    pub fn apply_gravity(&mut self, gravity: Vector3<Real>) {
        self.commands.gravity = Some(gravity);
    }

    /// Evaluate joint damping from the current velocities for the next step.
    ///
    /// The actuation phase evaluates damping itself when this was not called,
    /// so damping is applied exactly once per step either way.
    pub fn apply_damping(&mut self) {
        self.commands.damping = Some(self.damping_torques());
    }

    /// External force at a link's centre of mass for the next step (world frame).
    pub fn add_link_force(&mut self, index: usize, force: Vector3<Real>) -> Result<()> {
        self.check_link(index)?;
        self.commands.link_forces[index] += force;
        Ok(())
    }

    /// External torque on a link for the next step (world frame).
    pub fn add_link_torque(&mut self, index: usize, torque: Vector3<Real>) -> Result<()> {
        self.check_link(index)?;
        self.commands.link_torques[index] += torque;
        Ok(())
    }

    fn damping_torques(&self) -> Vec<Real> {
        self.joints
            .iter()
            .map(|joint| joint.damping_force(joint.velocity()))
            .collect()
    }

    /// Drain the step commands into solver inputs.
    pub(crate) fn actuation_phase(&mut self, world_gravity: Vector3<Real>) -> StepInputs {
        let fresh = StepCommands::new(self.links.len(), self.joints.len());
        let commands = std::mem::replace(&mut self.commands, fresh);
        let damping = commands.damping.unwrap_or_else(|| self.damping_torques());
        let gravity = commands.gravity.unwrap_or(world_gravity);

        let mut joint_forces = vec![0.0; self.joints.len()];
        for (j, joint) in self.joints.iter_mut().enumerate() {
            let drive = commands.drives.get(j).copied().flatten().unwrap_or(0.0);
            let damp = damping.get(j).copied().unwrap_or(0.0);
            joint.set_applied_drive(drive);
            joint.set_damping_torque(damp);
            if !joint.kind().has_dof() {
                continue;
            }
            let (position, velocity) = (joint.position(), joint.velocity());
            let motor = joint
                .motor_mut()
                .map(|m| m.compute(position, velocity))
                .unwrap_or(0.0);
            joint_forces[j] = motor + drive + damp;
        }

        let link_forces = self
            .links
            .iter()
            .zip(&commands.link_forces)
            .map(|(link, external)| gravity * link.mass() + external)
            .collect();

        trace!(mechanism = %self.config.name, ?joint_forces, "actuation phase");

        StepInputs {
            joint_forces,
            joint_limits: self.joints.iter().map(|j| j.limit().copied()).collect(),
            link_forces,
            link_torques: commands.link_torques,
        }
    }

    /// Clear one-step motor overrides after a step that did not complete.
    pub(crate) fn abort_step(&mut self) {
        for joint in &mut self.joints {
            if let Some(motor) = joint.motor_mut() {
                motor.end_step();
            }
        }
        warn!(mechanism = %self.config.name, "step aborted");
    }

    /// Copy the solver's post-step state into the caches.
    pub(crate) fn read_back(&mut self, state: &MultibodyState) {
        self.sync_state(state);
        for (j, joint) in self.joints.iter_mut().enumerate() {
            joint.set_feedback(state.joint_feedback.get(j).copied().unwrap_or_default());
            if let Some(motor) = joint.motor_mut() {
                motor.end_step();
            }
            if let Some(limit) = joint.limit() {
                let q = joint.position();
                if q <= limit.lower || q >= limit.upper {
                    debug!(mechanism = %self.config.name, joint = j, position = q, "joint at limit");
                }
            }
        }
    }

    fn sync_state(&mut self, state: &MultibodyState) {
        let n = self.links.len();
        if state.link_transforms.len() == n {
            self.link_transforms.clone_from(&state.link_transforms);
        }
        if state.link_linear_velocities.len() == n {
            self.link_linear_velocities.clone_from(&state.link_linear_velocities);
        }
        if state.link_angular_velocities.len() == n {
            self.link_angular_velocities.clone_from(&state.link_angular_velocities);
        }
        for (j, joint) in self.joints.iter_mut().enumerate() {
            let position = state.joint_positions.get(j).copied().unwrap_or(0.0);
            let velocity = state.joint_velocities.get(j).copied().unwrap_or(0.0);
            joint.set_state(position, velocity);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Joint position with its kind; no value for fixed joints.
    pub fn joint_position(&self, index: usize) -> Result<JointReading> {
        let joint = self.joint(index)?;
        Ok(joint.reading(joint.position()))
    }

    /// Joint velocity with its kind; no value for fixed joints.
    pub fn joint_velocity(&self, index: usize) -> Result<JointReading> {
        let joint = self.joint(index)?;
        Ok(joint.reading(joint.velocity()))
    }

    /// Open-loop drive applied in the most recent step.
    ///
    /// Motor output, damping and constraint forces are not included.
    pub fn joint_torque(&self, index: usize) -> Result<Real> {
        Ok(self.joint(index)?.applied_drive())
    }

    /// Damping generalized force applied in the most recent step.
    pub fn joint_damping_torque(&self, index: usize) -> Result<Real> {
        Ok(self.joint(index)?.damping_torque())
    }

    /// Constraint reaction on the child link from the most recent step.
    pub fn joint_feedback(&self, index: usize) -> Result<JointFeedback> {
        Ok(*self.joint(index)?.feedback())
    }

    /// The joint's motor.
    pub fn motor(&self, index: usize) -> Result<&ActuatorAdapter> {
        self.joint(index)?.motor().ok_or(DynamicsError::NoMotor(index))
    }

    /// The joint's motor, mutably (torque limits and similar).
    pub fn motor_mut(&mut self, index: usize) -> Result<&mut ActuatorAdapter> {
        self.check_joint(index)?;
        self.joints[index]
            .motor_mut()
            .ok_or(DynamicsError::NoMotor(index))
    }

    /// The joint's limit.
    pub fn joint_limit(&self, index: usize) -> Result<JointLimit> {
        self.joint(index)?
            .limit()
            .copied()
            .ok_or(DynamicsError::NoLimit(index))
    }

    /// Joint by index.
    pub fn joint(&self, index: usize) -> Result<&Joint> {
        self.joints
            .get(index)
            .ok_or(DynamicsError::joint_index(index, self.joints.len()))
    }

    /// Kind of a joint.
    pub fn joint_kind(&self, index: usize) -> Result<JointKind> {
        Ok(self.joint(index)?.kind())
    }

    /// Link by index.
    pub fn link(&self, index: usize) -> Result<&Link> {
        self.links
            .get(index)
            .ok_or(DynamicsError::link_index(index, self.links.len()))
    }

    /// World pose of a link frame (mechanism frame before registration).
    pub fn link_transform(&self, index: usize) -> Result<Isometry3<Real>> {
        self.check_link(index)?;
        Ok(self.link_transforms[index])
    }

    /// World linear velocity of a link's centre of mass.
    pub fn link_linear_velocity(&self, index: usize) -> Result<Vector3<Real>> {
        self.check_link(index)?;
        Ok(self.link_linear_velocities[index])
    }

    /// World angular velocity of a link.
    pub fn link_angular_velocity(&self, index: usize) -> Result<Vector3<Real>> {
        self.check_link(index)?;
        Ok(self.link_angular_velocities[index])
    }

    /// Number of attached links, base included.
    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// Number of joints.
    pub fn num_joints(&self) -> usize {
        self.joints.len()
    }

    /// Mechanism name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Construction-time configuration.
    pub fn config(&self) -> &MechanismConfig {
        &self.config
    }

    /// World handle while registered.
    pub fn handle(&self) -> Option<MultibodyHandle> {
        self.registration.map(|r| r.handle)
    }

    /// Identity of the world this body is registered in.
    pub fn world_id(&self) -> Option<WorldId> {
        self.registration.map(|r| r.world)
    }

    /// Whether the tree can no longer change.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether links `a` and `b` may collide with each other.
    pub fn allows_collision(&self, a: usize, b: usize) -> Result<bool> {
        self.check_link(a)?;
        self.check_link(b)?;
        if a == b {
            return Ok(false);
        }
        let (lo, hi) = (a.min(b), a.max(b));
        match self.incoming[hi].map(|j| &self.joints[j]) {
            Some(joint) if joint.parent() == lo => Ok(joint.allows_self_collision()),
            _ => Ok(self.config.self_collision),
        }
    }

    /// Render records for visible links and movable joint axes.
    pub fn render(&self) -> Vec<Renderable> {
        let mut records: Vec<Renderable> = self
            .links
            .iter()
            .enumerate()
            .filter(|(_, link)| link.is_renderable())
            .map(|(i, link)| Renderable::link(i, link.shape().clone(), &self.link_transforms[i]))
            .collect();

        for (j, joint) in self.joints.iter().enumerate() {
            if !joint.kind().has_dof() {
                continue;
            }
            let start = joint.pivot();
            let end = start + joint.axis().into_inner() * JOINT_MARKER_LENGTH;
            records.push(Renderable::lines(
                RenderableKind::JointAxis,
                j,
                &self.link_transforms[joint.parent()],
                vec![start.cast::<f32>(), end.cast::<f32>()],
            ));
        }
        records
    }

    /// World-space bounding box over all link shapes.
    pub fn aabb(&self) -> Aabb {
        let mut iter = self
            .links
            .iter()
            .zip(&self.link_transforms)
            .map(|(link, pose)| link.shape().compute_aabb(&pose.cast::<f32>()));
        let first = match iter.next() {
            Some(first) => first,
            None => return Aabb::new_invalid(),
        };
        iter.fold(first, |acc, b| acc.merged(&b))
    }

    // =========================================================================
    // Checks
    // =========================================================================

    fn check_link(&self, index: usize) -> Result<()> {
        if index < self.links.len() {
            Ok(())
        } else {
            Err(DynamicsError::link_index(index, self.links.len()))
        }
    }

    fn check_joint(&self, index: usize) -> Result<()> {
        if index < self.joints.len() {
            Ok(())
        } else {
            Err(DynamicsError::joint_index(index, self.joints.len()))
        }
    }

    fn ensure_constructing(&self, action: &str) -> Result<()> {
        if self.frozen {
            return Err(DynamicsError::topology(format!(
                "cannot {action}: mechanism '{}' is frozen",
                self.config.name
            )));
        }
        Ok(())
    }

    /// The body's handle, provided it was issued by `world`.
    pub(crate) fn registered_in<W: DynamicsWorld + ?Sized>(&self, world: &W) -> Result<MultibodyHandle> {
        match self.registration {
            None => Err(DynamicsError::NotRegistered(self.config.name.clone())),
            Some(r) if r.world != world.id() => Err(DynamicsError::UnknownHandle),
            Some(r) => Ok(r.handle),
        }
    }

    fn warn_if_fixed(&self, index: usize, what: &str) -> Result<()> {
        if !self.joint(index)?.kind().has_dof() {
            warn!(mechanism = %self.config.name, joint = index, "{what} on a fixed joint has no effect");
        }
        Ok(())
    }
}
