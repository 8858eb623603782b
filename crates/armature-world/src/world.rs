//! Physics world management using Rapier3d.

use nalgebra::{Isometry3, Point3, Vector3};
use parry3d::shape::SharedShape;
use rapier3d::prelude::{
    BroadPhaseMultiSap, CCDSolver, Collider, ColliderBuilder, ColliderHandle, Group,
    IntegrationParameters, InteractionGroups, NarrowPhase, PhysicsPipeline, QueryFilter,
    QueryPipeline, Ray,
};
use slotmap::SlotMap;
use tracing::{debug, trace};

use armature_dynamics::{
    step_world, ArticulatedBody, DynamicsError, DynamicsWorld, MultibodyDesc, MultibodyHandle,
    MultibodyState, Real, StepInputs, WorldId,
};

use crate::config::WorldConfig;
use crate::contact::{CollisionRules, SelfCollisionFilter};
use crate::error::Result;
use crate::mechanism::{decode_tag, Mechanism, RigidSets};

/// Collision category of static scene geometry.
pub const MASK_STATIC: u32 = 1 << 0;
/// Collision category of mechanism links.
pub const MASK_DYNAMIC: u32 = 1 << 1;
/// Collision category of animated geometry that still blocks rays.
pub const MASK_ANIMATED_COLLIDING: u32 = 1 << 2;
/// Every category.
pub const MASK_ALL: u32 = u32::MAX;

/// Nearest ray hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin (m).
    pub distance: Real,
    /// Hit point in world coordinates.
    pub point: Point3<Real>,
    /// Mechanism that was hit, `None` for static geometry.
    pub multibody: Option<MultibodyHandle>,
}

/// Rigid-body world hosting articulated mechanisms and static geometry.
pub struct PhysicsWorld {
    id: WorldId,
    config: WorldConfig,

    // Rapier components
    pipeline: PhysicsPipeline,
    integration_params: IntegrationParameters,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    sets: RigidSets,
    filter: SelfCollisionFilter,

    mechanisms: SlotMap<MultibodyHandle, Mechanism>,
    time: Real,
    steps: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::with_config(WorldConfig::default())
    }
}

impl PhysicsWorld {
    /// Create a world from validated settings.
    pub fn new(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: WorldConfig) -> Self {
        let mut integration_params = IntegrationParameters::default();
        integration_params.dt = (config.timestep / config.substeps.max(1) as Real) as f32;

        Self {
            id: WorldId::fresh(),
            config,
            pipeline: PhysicsPipeline::new(),
            integration_params,
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            sets: RigidSets::default(),
            filter: SelfCollisionFilter::default(),
            mechanisms: SlotMap::with_key(),
            time: 0.0,
            steps: 0,
        }
    }

    /// Create a world from a TOML settings document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Self::new(WorldConfig::from_toml_str(source)?)
    }

    /// Current settings.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Set gravity vector (m/s²).
    pub fn set_gravity(&mut self, gravity: Vector3<Real>) {
        self.config.gravity = gravity.into();
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> Real {
        self.time
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Number of registered mechanisms.
    pub fn num_multibodies(&self) -> usize {
        self.mechanisms.len()
    }

    /// Add immovable geometry in the given collision categories.
    ///
    /// Mechanism links collide with it. Ray queries see it from the next
    /// step on.
    pub fn add_static_collider(
        &mut self,
        shape: SharedShape,
        pose: Isometry3<Real>,
        groups: u32,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::new(shape)
            .position(pose.cast::<f32>())
            .collision_groups(InteractionGroups::new(
                Group::from_bits_truncate(groups),
                Group::ALL,
            ))
            .build();
        self.sets.colliders.insert(collider)
    }

    /// Remove static geometry. Returns whether it existed.
    ///
    /// Link colliders are owned by their mechanism and are left alone.
    pub fn remove_static_collider(&mut self, handle: ColliderHandle) -> bool {
        let is_static = self
            .sets
            .colliders
            .get(handle)
            .is_some_and(|c| c.parent().is_none());
        is_static
            && self
                .sets
                .colliders
                .remove(handle, &mut self.sets.islands, &mut self.sets.bodies, true)
                .is_some()
    }

    /// Advance one fixed step.
    ///
    /// `bodies` run their actuation phase and read back their state.
    /// Registered mechanisms not listed still integrate under gravity with
    /// no joint forces.
    pub fn step(&mut self, bodies: &mut [&mut ArticulatedBody]) -> armature_dynamics::Result<()> {
        step_world(self, bodies)
    }

    /// Nearest hit along a ray against geometry whose categories intersect
    /// `mask`. Mechanism links belong to [`MASK_DYNAMIC`].
    ///
    /// Geometry is seen as of the last completed step.
    pub fn cast_ray(
        &self,
        origin: Point3<Real>,
        direction: Vector3<Real>,
        max_distance: Real,
        mask: u32,
        exclude: Option<MultibodyHandle>,
    ) -> Option<RayHit> {
        let dir = direction.try_normalize(1.0e-12)?;
        let ray = Ray::new(origin.cast::<f32>(), dir.cast::<f32>());
        let keep = |_: ColliderHandle, collider: &Collider| match (exclude, decode_tag(collider.user_data)) {
            (Some(skip), Some((owner, _))) => owner != skip,
            _ => true,
        };
        let filter = QueryFilter::new()
            .groups(InteractionGroups::new(Group::ALL, Group::from_bits_truncate(mask)))
            .predicate(&keep);

        let (handle, toi) = self.query_pipeline.cast_ray(
            &self.sets.bodies,
            &self.sets.colliders,
            &ray,
            max_distance as f32,
            true,
            filter,
        )?;
        let distance = toi as Real;
        let multibody = self
            .sets
            .colliders
            .get(handle)
            .and_then(|c| decode_tag(c.user_data))
            .map(|(owner, _)| owner);
        Some(RayHit {
            distance,
            point: origin + dir * distance,
            multibody,
        })
    }

    fn mechanism_mut(&mut self, handle: MultibodyHandle) -> armature_dynamics::Result<&mut Mechanism> {
        self.mechanisms
            .get_mut(handle)
            .ok_or(DynamicsError::UnknownHandle)
    }
}

impl DynamicsWorld for PhysicsWorld {
    fn id(&self) -> WorldId {
        self.id
    }

    fn gravity(&self) -> Vector3<Real> {
        self.config.gravity_vector()
    }

    fn timestep(&self) -> Real {
        self.config.timestep
    }

    fn insert_multibody(
        &mut self,
        desc: MultibodyDesc,
        transform: Isometry3<Real>,
    ) -> armature_dynamics::Result<MultibodyHandle> {
        let incoming = Mechanism::validate(&desc)?;
        let rules = CollisionRules::new(&desc);
        let sets = &mut self.sets;
        let handle = self
            .mechanisms
            .insert_with_key(|key| Mechanism::build(desc, incoming, transform, key, sets));
        self.filter.insert(handle, rules);

        let mechanism = &self.mechanisms[handle];
        debug!(
            multibody = %mechanism.name(),
            links = mechanism.num_links(),
            "inserted multibody"
        );
        Ok(handle)
    }

    fn remove_multibody(&mut self, handle: MultibodyHandle) -> armature_dynamics::Result<()> {
        let mechanism = self
            .mechanisms
            .remove(handle)
            .ok_or(DynamicsError::UnknownHandle)?;
        debug!(multibody = %mechanism.name(), "removed multibody");
        mechanism.remove(&mut self.sets);
        self.filter.remove(handle);
        Ok(())
    }

    fn multibody_state(&self, handle: MultibodyHandle) -> armature_dynamics::Result<&MultibodyState> {
        self.mechanisms
            .get(handle)
            .map(Mechanism::state)
            .ok_or(DynamicsError::UnknownHandle)
    }

    fn set_joint_state(
        &mut self,
        handle: MultibodyHandle,
        joint: usize,
        position: Real,
        velocity: Real,
    ) -> armature_dynamics::Result<()> {
        let mechanism = self
            .mechanisms
            .get_mut(handle)
            .ok_or(DynamicsError::UnknownHandle)?;
        if mechanism.set_joint_state(joint, position, velocity, &mut self.sets) {
            Ok(())
        } else {
            Err(DynamicsError::InvalidTopology(format!(
                "multibody '{}' has no movable joint {joint}",
                mechanism.name()
            )))
        }
    }

    fn set_base_transform(
        &mut self,
        handle: MultibodyHandle,
        transform: Isometry3<Real>,
    ) -> armature_dynamics::Result<()> {
        let mechanism = self
            .mechanisms
            .get_mut(handle)
            .ok_or(DynamicsError::UnknownHandle)?;
        mechanism.set_base_transform(transform, &mut self.sets);
        Ok(())
    }

    fn apply_inputs(
        &mut self,
        handle: MultibodyHandle,
        inputs: StepInputs,
    ) -> armature_dynamics::Result<()> {
        self.mechanism_mut(handle)?.queue_inputs(inputs);
        Ok(())
    }

    fn advance(&mut self) -> armature_dynamics::Result<()> {
        let gravity = self.config.gravity_vector();
        let dt = self.config.timestep;
        for mechanism in self.mechanisms.values_mut() {
            mechanism.begin_step(gravity, &mut self.sets);
        }

        // Gravity reaches the links as forces from the actuation phase.
        let no_gravity = Vector3::zeros();
        for _ in 0..self.config.substeps.max(1) {
            self.pipeline.step(
                &no_gravity,
                &self.integration_params,
                &mut self.sets.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.sets.bodies,
                &mut self.sets.colliders,
                &mut self.sets.impulse_joints,
                &mut self.sets.multibody_joints,
                &mut self.ccd_solver,
                Some(&mut self.query_pipeline),
                &self.filter,
                &(),
            );
        }

        for mechanism in self.mechanisms.values_mut() {
            mechanism.finish_step(&self.sets.bodies, dt)?;
        }

        self.time += dt;
        self.steps += 1;
        trace!(step = self.steps, time = self.time, "world step");
        Ok(())
    }
}
