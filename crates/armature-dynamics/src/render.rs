//! Render records produced on demand. Nothing here is cached.

use nalgebra::{Isometry3, Matrix4, Point3};
use parry3d::shape::SharedShape;

use crate::Real;

/// Length of the axis marker drawn for movable joints (m).
pub const JOINT_MARKER_LENGTH: Real = 0.1;

/// What a render record depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderableKind {
    /// Link geometry.
    Link,
    /// Axis marker of a movable joint.
    JointAxis,
    /// Line list (sensor beams and similar overlays).
    Lines,
}

/// Geometry plus model transform, ready for a renderer.
#[derive(Clone)]
pub struct Renderable {
    /// Record type.
    pub kind: RenderableKind,
    /// Link or joint index the record belongs to.
    pub index: usize,
    /// Model matrix (object to world).
    pub model: Matrix4<f32>,
    /// Shape for [`RenderableKind::Link`] records.
    pub shape: Option<SharedShape>,
    /// Line end points, pairwise, in model space.
    pub points: Vec<Point3<f32>>,
}

impl Renderable {
    /// Link geometry at a world pose.
    pub fn link(index: usize, shape: SharedShape, pose: &Isometry3<Real>) -> Self {
        Self {
            kind: RenderableKind::Link,
            index,
            model: pose.to_homogeneous().cast::<f32>(),
            shape: Some(shape),
            points: Vec::new(),
        }
    }

    /// Line list in a given frame.
    pub fn lines(
        kind: RenderableKind,
        index: usize,
        frame: &Isometry3<Real>,
        points: Vec<Point3<f32>>,
    ) -> Self {
        Self {
            kind,
            index,
            model: frame.to_homogeneous().cast::<f32>(),
            shape: None,
            points,
        }
    }
}
