//! Contact filtering between links of the same mechanism.

use std::collections::HashMap;

use rapier3d::prelude::{ColliderHandle, PairFilterContext, PhysicsHooks, SolverFlags};

use armature_dynamics::{MultibodyDesc, MultibodyHandle};

use crate::mechanism::decode_tag;

/// Which link pairs of one mechanism may touch.
#[derive(Debug, Clone)]
pub(crate) struct CollisionRules {
    self_collision: bool,
    /// Per link: parent link and whether the joint allows contact.
    parent: Vec<Option<(usize, bool)>>,
}

impl CollisionRules {
    pub(crate) fn new(desc: &MultibodyDesc) -> Self {
        let mut parent = vec![None; desc.links.len()];
        for joint in &desc.joints {
            if let Some(slot) = parent.get_mut(joint.child) {
                *slot = Some((joint.parent, joint.allow_self_collision));
            }
        }
        Self {
            self_collision: desc.self_collision,
            parent,
        }
    }

    /// Adjacent links follow their joint's flag, others the mechanism's.
    pub(crate) fn allows(&self, a: usize, b: usize) -> bool {
        if a == b {
            return false;
        }
        let (lo, hi) = (a.min(b), a.max(b));
        match self.parent.get(hi).copied().flatten() {
            Some((p, allow)) if p == lo => allow,
            _ => self.self_collision,
        }
    }
}

/// Rapier hook applying each mechanism's [`CollisionRules`].
///
/// Pairs involving static geometry or two different mechanisms always
/// collide.
#[derive(Debug, Default)]
pub(crate) struct SelfCollisionFilter {
    rules: HashMap<MultibodyHandle, CollisionRules>,
}

impl SelfCollisionFilter {
    pub(crate) fn insert(&mut self, handle: MultibodyHandle, rules: CollisionRules) {
        self.rules.insert(handle, rules);
    }

    pub(crate) fn remove(&mut self, handle: MultibodyHandle) {
        self.rules.remove(&handle);
    }

    /// Whether colliders tagged `a` and `b` may touch.
    pub(crate) fn allows(&self, a: u128, b: u128) -> bool {
        match (decode_tag(a), decode_tag(b)) {
            (Some((owner_a, link_a)), Some((owner_b, link_b))) if owner_a == owner_b => self
                .rules
                .get(&owner_a)
                .map_or(true, |rules| rules.allows(link_a, link_b)),
            _ => true,
        }
    }
}

impl PhysicsHooks for SelfCollisionFilter {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        let tag = |handle: ColliderHandle| context.colliders.get(handle).map_or(0, |c| c.user_data);
        self.allows(tag(context.collider1), tag(context.collider2))
            .then_some(SolverFlags::COMPUTE_IMPULSES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanism::link_tag;
    use armature_dynamics::{JointDesc, JointKind, LinkDesc, MassProperties, Real};
    use nalgebra::{Isometry3, Matrix3, Point3, Unit, Vector3};
    use parry3d::shape::SharedShape;
    use slotmap::SlotMap;

    fn chain(self_collision: bool, first_allows: bool) -> MultibodyDesc {
        let link = |parent: Option<usize>| LinkDesc {
            shape: SharedShape::ball(0.1),
            mass: MassProperties::new(1.0, Point3::origin(), Matrix3::identity() * 0.01),
            parent,
            rest_transform: Isometry3::translation(0.5, 0.0, 0.0),
        };
        let joint = |parent: usize, allow: bool| JointDesc {
            kind: JointKind::Revolute,
            parent,
            child: parent + 1,
            axis: Unit::new_normalize(Vector3::z()),
            pivot: Point3::new(0.25, 0.0, 0.0),
            child_pivot: Point3::new(-0.25, 0.0, 0.0),
            allow_self_collision: allow,
        };
        MultibodyDesc {
            name: "chain".into(),
            links: vec![link(None), link(Some(0)), link(Some(1))],
            joints: vec![joint(0, first_allows), joint(1, false)],
            fixed_base: true,
            self_collision,
            initial_positions: vec![0.0 as Real; 2],
            initial_velocities: vec![0.0; 2],
        }
    }

    #[test]
    fn test_rules_follow_joint_and_mechanism_flags() {
        let rules = CollisionRules::new(&chain(false, true));
        assert!(rules.allows(1, 0));
        assert!(!rules.allows(1, 2));
        assert!(!rules.allows(0, 2));
        assert!(!rules.allows(2, 2));

        let rules = CollisionRules::new(&chain(true, false));
        assert!(!rules.allows(0, 1));
        assert!(rules.allows(0, 2));
    }

    #[test]
    fn test_filter_only_applies_within_a_mechanism() {
        let mut keys: SlotMap<MultibodyHandle, ()> = SlotMap::with_key();
        let (a, b) = (keys.insert(()), keys.insert(()));
        let mut filter = SelfCollisionFilter::default();
        filter.insert(a, CollisionRules::new(&chain(false, false)));
        filter.insert(b, CollisionRules::new(&chain(false, false)));

        assert!(!filter.allows(link_tag(a, 0), link_tag(a, 2)));
        assert!(filter.allows(link_tag(a, 0), link_tag(b, 0)));
        assert!(filter.allows(link_tag(a, 1), 0));

        filter.remove(a);
        assert!(filter.allows(link_tag(a, 0), link_tag(a, 2)));
    }
}
