//! A registered mechanism as rapier rigid bodies linked by impulse joints.
//!
//! Every link becomes one dynamic body (the base is fixed when the mechanism
//! is pinned) carrying the link's mass properties and a zero-density
//! collider. Joints become generic impulse joints whose first frame sits at
//! the pivot with its X axis along the joint axis, so rapier's `AngX` and
//! `LinX` coordinates are the joint positions.
//!
//! Rapier's own gravity is switched off: the actuation phase already folds
//! `m·g` into the link forces, so every external load arrives through
//! [`StepInputs`].

use std::f64::consts::PI;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use rapier3d::prelude::{
    ActiveHooks, ColliderBuilder, ColliderSet, GenericJoint, GenericJointBuilder, Group,
    ImpulseJointHandle, ImpulseJointSet, InteractionGroups, IslandManager, JointAxesMask,
    JointAxis, MassProperties as RigidMass, MultibodyJointSet, RigidBodyBuilder, RigidBodyHandle,
    RigidBodySet,
};
use slotmap::{Key, KeyData};
use tracing::trace;

use armature_dynamics::{
    JointDesc, JointFeedback, JointKind, JointLimit, MultibodyDesc, MultibodyHandle,
    MultibodyState, Real, StepInputs,
};

use crate::error::{Result, WorldError};
use crate::world::MASK_DYNAMIC;

/// Marks a collider as a mechanism link in its `user_data`.
const LINK_TAG: u128 = 1 << 127;

/// `user_data` of the collider of `link` in mechanism `owner`.
pub(crate) fn link_tag(owner: MultibodyHandle, link: usize) -> u128 {
    LINK_TAG | (u128::from(owner.data().as_ffi()) << 32) | link as u128
}

/// Owner and link index of a tagged link collider.
pub(crate) fn decode_tag(tag: u128) -> Option<(MultibodyHandle, usize)> {
    if tag & LINK_TAG == 0 {
        return None;
    }
    let owner = MultibodyHandle::from(KeyData::from_ffi((tag >> 32) as u64));
    Some((owner, (tag & 0xffff_ffff) as usize))
}

/// The rapier sets mechanisms live in.
pub(crate) struct RigidSets {
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub islands: IslandManager,
}

impl Default for RigidSets {
    fn default() -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            islands: IslandManager::new(),
        }
    }
}

/// Link poses and velocities derived from joint coordinates.
struct Placement {
    poses: Vec<Isometry3<Real>>,
    linvels: Vec<Vector3<Real>>,
    angvels: Vec<Vector3<Real>>,
}

/// A registered mechanism inside the world.
pub(crate) struct Mechanism {
    desc: MultibodyDesc,
    incoming: Vec<Option<usize>>,
    bodies: Vec<RigidBodyHandle>,
    joints: Vec<ImpulseJointHandle>,
    limits: Vec<Option<JointLimit>>,
    q: Vec<Real>,
    qd: Vec<Real>,
    pending: Option<StepInputs>,
    applied: StepInputs,
    state: MultibodyState,
}

impl Mechanism {
    /// Check the description and map each link to its incoming joint.
    pub(crate) fn validate(desc: &MultibodyDesc) -> Result<Vec<Option<usize>>> {
        let invalid = |msg: String| WorldError::InvalidDescription(format!("{}: {msg}", desc.name));

        let nl = desc.links.len();
        if nl == 0 {
            return Err(invalid("no links".into()));
        }
        if desc.joints.len() != nl - 1 {
            return Err(invalid(format!(
                "{} joints for {} links",
                desc.joints.len(),
                nl
            )));
        }

        let mut incoming = vec![None; nl];
        for (j, joint) in desc.joints.iter().enumerate() {
            if joint.parent >= joint.child || joint.child >= nl {
                return Err(invalid(format!(
                    "joint {j} connects {} -> {}",
                    joint.parent, joint.child
                )));
            }
            if incoming[joint.child].replace(j).is_some() {
                return Err(invalid(format!("link {} has two parents", joint.child)));
            }
            if desc.links[joint.child].parent != Some(joint.parent) {
                return Err(invalid(format!(
                    "joint {j} disagrees with the parent of link {}",
                    joint.child
                )));
            }
        }

        for (k, link) in desc.links.iter().enumerate() {
            if !(link.mass.mass > 0.0) {
                return Err(invalid(format!("link {k} has non-positive mass")));
            }
            let inertia = &link.mass.inertia;
            if inertia.iter().any(|v| !v.is_finite()) || inertia.diagonal().iter().all(|&v| v <= 0.0) {
                return Err(invalid(format!("link {k} has a degenerate inertia tensor")));
            }
        }
        Ok(incoming)
    }

    /// Create bodies, colliders and joints for a validated description.
    pub(crate) fn build(
        desc: MultibodyDesc,
        incoming: Vec<Option<usize>>,
        base: Isometry3<Real>,
        owner: MultibodyHandle,
        sets: &mut RigidSets,
    ) -> Self {
        let nj = desc.joints.len();
        let read = |values: &[Real], j: usize| {
            if desc.joints[j].kind.has_dof() {
                values.get(j).copied().unwrap_or(0.0)
            } else {
                0.0
            }
        };
        let q = (0..nj).map(|j| read(&desc.initial_positions, j)).collect();
        let qd = (0..nj).map(|j| read(&desc.initial_velocities, j)).collect();

        let mut mechanism = Self {
            incoming,
            bodies: Vec::with_capacity(desc.links.len()),
            joints: Vec::with_capacity(nj),
            limits: vec![None; nj],
            q,
            qd,
            pending: None,
            applied: StepInputs::default(),
            state: MultibodyState::default(),
            desc,
        };

        let placement = mechanism.place(base, Vector3::zeros(), Vector3::zeros());
        for (k, link) in mechanism.desc.links.iter().enumerate() {
            let builder = if k == 0 && mechanism.desc.fixed_base {
                RigidBodyBuilder::fixed()
            } else {
                RigidBodyBuilder::dynamic()
            };
            let mass = RigidMass::with_inertia_matrix(
                link.mass.local_com.cast::<f32>(),
                link.mass.mass as f32,
                link.mass.inertia.cast::<f32>(),
            );
            let body = builder
                .position(placement.poses[k].cast::<f32>())
                .linvel(placement.linvels[k].cast::<f32>())
                .angvel(placement.angvels[k].cast::<f32>())
                .additional_mass_properties(mass)
                .can_sleep(false)
                .build();
            let handle = sets.bodies.insert(body);

            let collider = ColliderBuilder::new(link.shape.clone())
                .density(0.0)
                .collision_groups(InteractionGroups::new(
                    Group::from_bits_truncate(MASK_DYNAMIC),
                    Group::ALL,
                ))
                .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS)
                .user_data(link_tag(owner, k))
                .build();
            sets.colliders
                .insert_with_parent(collider, handle, &mut sets.bodies);
            mechanism.bodies.push(handle);
        }

        for joint in &mechanism.desc.joints {
            let rest = mechanism.desc.links[joint.child].rest_transform;
            let handle = sets.impulse_joints.insert(
                mechanism.bodies[joint.parent],
                mechanism.bodies[joint.child],
                rigid_joint(joint, &rest),
                true,
            );
            mechanism.joints.push(handle);
        }

        mechanism.read_state(&sets.bodies);
        mechanism.state.joint_feedback = vec![JointFeedback::default(); nj];
        mechanism
    }

    /// Delete the mechanism's bodies, with their colliders and joints.
    pub(crate) fn remove(self, sets: &mut RigidSets) {
        for handle in self.bodies {
            sets.bodies.remove(
                handle,
                &mut sets.islands,
                &mut sets.colliders,
                &mut sets.impulse_joints,
                &mut sets.multibody_joints,
                true,
            );
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.desc.name
    }

    pub(crate) fn num_links(&self) -> usize {
        self.desc.links.len()
    }

    pub(crate) fn state(&self) -> &MultibodyState {
        &self.state
    }

    /// Inputs for the next step. Replaces inputs queued earlier.
    pub(crate) fn queue_inputs(&mut self, inputs: StepInputs) {
        self.pending = Some(inputs);
    }

    pub(crate) fn set_joint_state(
        &mut self,
        joint: usize,
        position: Real,
        velocity: Real,
        sets: &mut RigidSets,
    ) -> bool {
        match self.desc.joints.get(joint) {
            Some(desc) if desc.kind.has_dof() => {
                self.q[joint] = position;
                self.qd[joint] = velocity;
                self.replace(self.state.link_transforms[0], sets);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_base_transform(&mut self, transform: Isometry3<Real>, sets: &mut RigidSets) {
        self.replace(transform, sets);
    }

    /// Load this step's wrenches onto the rapier bodies.
    ///
    /// Without queued inputs the mechanism only feels gravity.
    pub(crate) fn begin_step(&mut self, gravity: Vector3<Real>, sets: &mut RigidSets) {
        let inputs = self
            .pending
            .take()
            .unwrap_or_else(|| self.gravity_inputs(gravity));
        self.sync_limits(&inputs, &mut sets.impulse_joints);

        for (k, &handle) in self.bodies.iter().enumerate() {
            if let Some(body) = sets.bodies.get_mut(handle) {
                body.reset_forces(true);
                body.reset_torques(true);
                body.add_force(link_force(&inputs, k).cast::<f32>(), true);
                body.add_torque(link_torque(&inputs, k).cast::<f32>(), true);
            }
        }

        for (j, joint) in self.desc.joints.iter().enumerate() {
            let force = inputs.joint_forces.get(j).copied().unwrap_or(0.0);
            if force == 0.0 || !joint.kind.has_dof() {
                continue;
            }
            let axis = self.state.link_transforms[joint.parent].rotation * joint.axis.into_inner();
            let load = (axis * force).cast::<f32>();
            let (parent, child) = (self.bodies[joint.parent], self.bodies[joint.child]);
            match joint.kind {
                JointKind::Revolute => {
                    if let Some(body) = sets.bodies.get_mut(child) {
                        body.add_torque(load, true);
                    }
                    if let Some(body) = sets.bodies.get_mut(parent) {
                        body.add_torque(-load, true);
                    }
                }
                JointKind::Prismatic => {
                    let anchor = (self.state.link_transforms[joint.child] * joint.child_pivot).cast::<f32>();
                    if let Some(body) = sets.bodies.get_mut(child) {
                        body.add_force_at_point(load, anchor, true);
                    }
                    if let Some(body) = sets.bodies.get_mut(parent) {
                        body.add_force_at_point(-load, anchor, true);
                    }
                }
                JointKind::Fixed => {}
            }
        }

        self.applied = inputs;
    }

    /// Read the integrated bodies back and derive joint feedback.
    pub(crate) fn finish_step(&mut self, bodies: &RigidBodySet, dt: Real) -> Result<()> {
        let before = std::mem::take(&mut self.state.link_linear_velocities);
        self.read_state(bodies);

        let finite = self
            .state
            .link_transforms
            .iter()
            .all(|t| t.translation.vector.iter().chain(t.rotation.coords.iter()).all(|v| v.is_finite()))
            && self.q.iter().chain(&self.qd).all(|v| v.is_finite());
        if !finite {
            return Err(WorldError::NonFiniteState(self.desc.name.clone()));
        }

        self.state.joint_feedback = self.feedback(&before, dt);
        trace!(mechanism = %self.desc.name, q = ?self.q, "mechanism step");
        Ok(())
    }

    /// Inputs that only apply gravity.
    fn gravity_inputs(&self, gravity: Vector3<Real>) -> StepInputs {
        StepInputs {
            link_forces: self
                .desc
                .links
                .iter()
                .map(|link| gravity * link.mass.mass)
                .collect(),
            ..StepInputs::default()
        }
    }

    fn sync_limits(&mut self, inputs: &StepInputs, impulse_joints: &mut ImpulseJointSet) {
        for (j, joint) in self.desc.joints.iter().enumerate() {
            let wanted = inputs.joint_limits.get(j).copied().flatten();
            if wanted == self.limits[j] {
                continue;
            }
            if let (Some(limit), Some(axis)) = (wanted, free_axis(joint.kind)) {
                if let Some(rigid) = impulse_joints.get_mut(self.joints[j], true) {
                    rigid
                        .data
                        .set_limits(axis, [limit.lower as f32, limit.upper as f32]);
                }
                self.limits[j] = wanted;
            }
        }
    }

    /// Reaction of each joint on its child, in the child link frame.
    ///
    /// The constraint force on a subtree is its momentum change per step
    /// minus the external and actuation forces it received.
    fn feedback(&self, before: &[Vector3<Real>], dt: Real) -> Vec<JointFeedback> {
        let mut transmitted = vec![Vector3::zeros(); self.desc.joints.len()];
        for (k, link) in self.desc.links.iter().enumerate() {
            let v0 = before.get(k).copied().unwrap_or_else(Vector3::zeros);
            let dv = self.state.link_linear_velocities[k] - v0;
            let net = dv * (link.mass.mass / dt) - link_force(&self.applied, k);
            let mut at = k;
            while let Some(j) = self.incoming[at] {
                transmitted[j] += net;
                at = self.desc.joints[j].parent;
            }
        }

        self.desc
            .joints
            .iter()
            .enumerate()
            .map(|(j, joint)| {
                let mut force = transmitted[j];
                if joint.kind == JointKind::Prismatic {
                    let axis = self.state.link_transforms[joint.parent].rotation * joint.axis.into_inner();
                    force -= axis * self.applied.joint_forces.get(j).copied().unwrap_or(0.0);
                }
                let child = joint.child;
                let local = self.state.link_transforms[child].rotation.inverse() * force;
                let com = self.desc.links[child].mass.local_com;
                JointFeedback {
                    force: local,
                    torque: (joint.child_pivot - com).cross(&local),
                }
            })
            .collect()
    }

    /// Refresh link state and joint coordinates from the rapier bodies.
    fn read_state(&mut self, bodies: &RigidBodySet) {
        let nl = self.desc.links.len();
        self.state.link_transforms.resize(nl, Isometry3::identity());
        self.state.link_linear_velocities.resize(nl, Vector3::zeros());
        self.state.link_angular_velocities.resize(nl, Vector3::zeros());
        for (k, &handle) in self.bodies.iter().enumerate() {
            if let Some(body) = bodies.get(handle) {
                self.state.link_transforms[k] = body.position().cast::<Real>();
                self.state.link_linear_velocities[k] = body.linvel().cast::<Real>();
                self.state.link_angular_velocities[k] = body.angvel().cast::<Real>();
            }
        }

        for (j, joint) in self.desc.joints.iter().enumerate() {
            let (q, qd) = self.measure(joint);
            self.q[j] = match joint.kind {
                JointKind::Revolute => self.q[j] + wrap_angle(q - self.q[j]),
                _ => q,
            };
            self.qd[j] = qd;
        }
        self.state.joint_positions.clone_from(&self.q);
        self.state.joint_velocities.clone_from(&self.qd);
    }

    /// Raw joint coordinate and rate from the current link state.
    fn measure(&self, joint: &JointDesc) -> (Real, Real) {
        let s = &self.state;
        let (p, c) = (joint.parent, joint.child);
        let rest = self.desc.links[c].rest_transform;
        let motion = s.link_transforms[p].inverse() * s.link_transforms[c] * rest.inverse();
        let axis = s.link_transforms[p].rotation * joint.axis.into_inner();

        match joint.kind {
            JointKind::Revolute => {
                let q = motion.rotation.scaled_axis().dot(&joint.axis);
                let qd = (s.link_angular_velocities[c] - s.link_angular_velocities[p]).dot(&axis);
                (q, qd)
            }
            JointKind::Prismatic => {
                let q = motion.translation.vector.dot(&joint.axis);
                let anchor = s.link_transforms[c] * joint.child_pivot;
                let qd = (self.point_velocity(c, &anchor) - self.point_velocity(p, &anchor)).dot(&axis);
                (q, qd)
            }
            JointKind::Fixed => (0.0, 0.0),
        }
    }

    fn point_velocity(&self, link: usize, point: &nalgebra::Point3<Real>) -> Vector3<Real> {
        let s = &self.state;
        let com = s.link_transforms[link] * self.desc.links[link].mass.local_com;
        s.link_linear_velocities[link] + s.link_angular_velocities[link].cross(&(point - com))
    }

    /// Link poses and velocities for the current joint coordinates with the
    /// base at `base` moving with `base_linvel` (COM) and `base_angvel`.
    fn place(
        &self,
        base: Isometry3<Real>,
        base_linvel: Vector3<Real>,
        base_angvel: Vector3<Real>,
    ) -> Placement {
        let nl = self.desc.links.len();
        let mut placement = Placement {
            poses: vec![base; nl],
            linvels: vec![base_linvel; nl],
            angvels: vec![base_angvel; nl],
        };
        for k in 1..nl {
            let Some(j) = self.incoming[k] else { continue };
            let joint = &self.desc.joints[j];
            let p = joint.parent;
            let parent_pose = placement.poses[p];
            let pose = parent_pose * joint_motion(joint, self.q[j]) * self.desc.links[k].rest_transform;

            let com_p = parent_pose * self.desc.links[p].mass.local_com;
            let com_k = pose * self.desc.links[k].mass.local_com;
            let axis = parent_pose.rotation * joint.axis.into_inner();
            let mut omega = placement.angvels[p];
            let mut v = placement.linvels[p] + omega.cross(&(com_k - com_p));
            match joint.kind {
                JointKind::Revolute => {
                    let spin = axis * self.qd[j];
                    v += spin.cross(&(com_k - parent_pose * joint.pivot));
                    omega += spin;
                }
                JointKind::Prismatic => v += axis * self.qd[j],
                JointKind::Fixed => {}
            }

            placement.poses[k] = pose;
            placement.linvels[k] = v;
            placement.angvels[k] = omega;
        }
        placement
    }

    /// Teleport every body to the placement of the current coordinates.
    fn replace(&mut self, base: Isometry3<Real>, sets: &mut RigidSets) {
        let placement = self.place(
            base,
            self.state.link_linear_velocities[0],
            self.state.link_angular_velocities[0],
        );
        for (k, &handle) in self.bodies.iter().enumerate() {
            if let Some(body) = sets.bodies.get_mut(handle) {
                body.set_position(placement.poses[k].cast::<f32>(), true);
                body.set_linvel(placement.linvels[k].cast::<f32>(), true);
                body.set_angvel(placement.angvels[k].cast::<f32>(), true);
            }
        }
        self.read_state(&sets.bodies);
    }
}

fn link_force(inputs: &StepInputs, link: usize) -> Vector3<Real> {
    inputs.link_forces.get(link).copied().unwrap_or_else(Vector3::zeros)
}

fn link_torque(inputs: &StepInputs, link: usize) -> Vector3<Real> {
    inputs.link_torques.get(link).copied().unwrap_or_else(Vector3::zeros)
}

fn free_axis(kind: JointKind) -> Option<JointAxis> {
    match kind {
        JointKind::Revolute => Some(JointAxis::AngX),
        JointKind::Prismatic => Some(JointAxis::LinX),
        JointKind::Fixed => None,
    }
}

fn wrap_angle(angle: Real) -> Real {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// Relative motion of the child produced by the joint displacement,
/// expressed in the parent frame.
fn joint_motion(joint: &JointDesc, q: Real) -> Isometry3<Real> {
    match joint.kind {
        JointKind::Revolute => {
            let rotation = UnitQuaternion::from_axis_angle(&joint.axis, q);
            let shift = joint.pivot.coords - rotation * joint.pivot.coords;
            Isometry3::from_parts(Translation3::from(shift), rotation)
        }
        JointKind::Prismatic => Isometry3::from_parts(
            Translation3::from(joint.axis.into_inner() * q),
            UnitQuaternion::identity(),
        ),
        JointKind::Fixed => Isometry3::identity(),
    }
}

/// Impulse joint whose first frame has its X axis along the joint axis.
fn rigid_joint(joint: &JointDesc, rest: &Isometry3<Real>) -> GenericJoint {
    let mask = match joint.kind {
        JointKind::Revolute => JointAxesMask::LOCKED_REVOLUTE_AXES,
        JointKind::Prismatic => JointAxesMask::LOCKED_PRISMATIC_AXES,
        JointKind::Fixed => JointAxesMask::LOCKED_FIXED_AXES,
    };
    let align = UnitQuaternion::rotation_between(&Vector3::x(), &joint.axis)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI));
    let frame1 = Isometry3::from_parts(Translation3::from(joint.pivot.coords), align);
    let frame2 = rest.inverse() * frame1;

    GenericJointBuilder::new(mask)
        .local_frame1(frame1.cast::<f32>())
        .local_frame2(frame2.cast::<f32>())
        .contacts_enabled(joint.allow_self_collision)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use armature_dynamics::{LinkDesc, MassProperties};
    use nalgebra::{Matrix3, Point3, Unit};
    use parry3d::shape::SharedShape;
    use slotmap::SlotMap;

    fn link(parent: Option<usize>, rest: Isometry3<Real>) -> LinkDesc {
        LinkDesc {
            shape: SharedShape::ball(0.05),
            mass: MassProperties::new(2.0, Point3::origin(), Matrix3::identity() * 0.01),
            parent,
            rest_transform: rest,
        }
    }

    fn pendulum(kind: JointKind, q0: Real) -> MultibodyDesc {
        MultibodyDesc {
            name: "pendulum".into(),
            links: vec![
                link(None, Isometry3::identity()),
                link(Some(0), Isometry3::translation(1.0, 0.0, 0.0)),
            ],
            joints: vec![JointDesc {
                kind,
                parent: 0,
                child: 1,
                axis: Unit::new_normalize(Vector3::z()),
                pivot: Point3::origin(),
                child_pivot: Point3::new(-1.0, 0.0, 0.0),
                allow_self_collision: false,
            }],
            fixed_base: true,
            self_collision: false,
            initial_positions: vec![q0],
            initial_velocities: vec![0.0],
        }
    }

    fn build(desc: MultibodyDesc) -> (Mechanism, RigidSets) {
        let mut sets = RigidSets::default();
        let mut keys: SlotMap<MultibodyHandle, ()> = SlotMap::with_key();
        let incoming = Mechanism::validate(&desc).unwrap();
        let mechanism = Mechanism::build(desc, incoming, Isometry3::identity(), keys.insert(()), &mut sets);
        (mechanism, sets)
    }

    #[test]
    fn test_tag_round_trip() {
        let mut keys: SlotMap<MultibodyHandle, ()> = SlotMap::with_key();
        keys.insert(());
        let handle = keys.insert(());
        assert_eq!(decode_tag(link_tag(handle, 7)), Some((handle, 7)));
        assert_eq!(decode_tag(0), None);
    }

    #[test]
    fn test_initial_placement() {
        let (mechanism, sets) = build(pendulum(JointKind::Revolute, std::f64::consts::FRAC_PI_2));
        let tip = mechanism.state().link_transforms[1];
        assert_relative_eq!(tip.translation.vector, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(mechanism.state().joint_positions[0], std::f64::consts::FRAC_PI_2, epsilon = 1e-6);
        assert_eq!(sets.bodies.len(), 2);
        assert_eq!(sets.colliders.len(), 2);
        assert_eq!(sets.impulse_joints.len(), 1);
    }

    #[test]
    fn test_prismatic_coordinate() {
        let (mut mechanism, mut sets) = build(pendulum(JointKind::Prismatic, 0.25));
        assert_relative_eq!(mechanism.state().joint_positions[0], 0.25, epsilon = 1e-6);
        assert_relative_eq!(
            mechanism.state().link_transforms[1].translation.x,
            1.0,
            epsilon = 1e-6
        );
        assert_relative_eq!(
            mechanism.state().link_transforms[1].translation.z,
            0.25,
            epsilon = 1e-6
        );

        assert!(mechanism.set_joint_state(0, -0.5, 2.0, &mut sets));
        assert_relative_eq!(mechanism.state().joint_positions[0], -0.5, epsilon = 1e-6);
        assert_relative_eq!(mechanism.state().joint_velocities[0], 2.0, epsilon = 1e-5);
        assert_relative_eq!(mechanism.state().link_linear_velocities[1].z, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_revolute_unwraps_past_half_turn() {
        let (mut mechanism, mut sets) = build(pendulum(JointKind::Revolute, 3.0));
        assert!(mechanism.set_joint_state(0, 3.5, 0.0, &mut sets));
        assert_relative_eq!(mechanism.state().joint_positions[0], 3.5, epsilon = 1e-5);
    }

    #[test]
    fn test_remove_clears_sets() {
        let (mechanism, mut sets) = build(pendulum(JointKind::Fixed, 0.0));
        mechanism.remove(&mut sets);
        assert_eq!(sets.bodies.len(), 0);
        assert_eq!(sets.colliders.len(), 0);
        assert_eq!(sets.impulse_joints.len(), 0);
    }

    #[test]
    fn test_rejects_mismatched_description() {
        let mut desc = pendulum(JointKind::Revolute, 0.0);
        desc.joints.clear();
        assert!(matches!(
            Mechanism::validate(&desc),
            Err(WorldError::InvalidDescription(_))
        ));

        let mut desc = pendulum(JointKind::Revolute, 0.0);
        desc.links[1].mass.mass = 0.0;
        assert!(Mechanism::validate(&desc).is_err());
    }
}
