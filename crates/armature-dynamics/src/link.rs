//! Rigid links: collision shape, mass properties and the attach transform.

use std::fmt;

use nalgebra::{Isometry3, Matrix3, Point3, Vector3};
use parry3d::shape::SharedShape;

use crate::Real;

/// Mass, centre of mass and inertia of a link.
///
/// The inertia tensor is expressed at the centre of mass, in the link frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    /// Mass in kg.
    pub mass: Real,
    /// Centre of mass in the link frame.
    pub local_com: Point3<Real>,
    /// Inertia tensor at the centre of mass (kg·m²).
    pub inertia: Matrix3<Real>,
}

impl MassProperties {
    /// Build from explicit values.
    pub fn new(mass: Real, local_com: Point3<Real>, inertia: Matrix3<Real>) -> Self {
        Self {
            mass,
            local_com,
            inertia,
        }
    }

    /// Integrate a shape at uniform density (kg/m³).
    pub fn from_shape(shape: &SharedShape, density: Real) -> Self {
        let props = shape.mass_properties(density as f32);
        Self {
            mass: props.mass() as Real,
            local_com: props.local_com.cast::<Real>(),
            inertia: props.reconstruct_inertia_matrix().cast::<Real>(),
        }
    }

    /// Inertia tensor rotated into another frame.
    pub fn world_inertia(&self, pose: &Isometry3<Real>) -> Matrix3<Real> {
        let rot = pose.rotation.to_rotation_matrix();
        rot.matrix() * self.inertia * rot.matrix().transpose()
    }
}

/// A rigid link of an articulated body.
#[derive(Clone)]
pub struct Link {
    name: String,
    shape: SharedShape,
    mass: MassProperties,
    transform: Isometry3<Real>,
    renderable: bool,
}

impl Link {
    /// Link with explicit mass properties.
    pub fn new(name: impl Into<String>, shape: SharedShape, mass: MassProperties) -> Self {
        Self {
            name: name.into(),
            shape,
            mass,
            transform: Isometry3::identity(),
            renderable: true,
        }
    }

    /// Link whose mass properties are integrated from the shape.
    pub fn from_shape(name: impl Into<String>, shape: SharedShape, density: Real) -> Self {
        let mass = MassProperties::from_shape(&shape, density);
        Self::new(name, shape, mass)
    }

    /// Box link centred on its frame.
    pub fn cuboid(name: impl Into<String>, half_extents: Vector3<Real>, density: Real) -> Self {
        let shape = SharedShape::cuboid(
            half_extents.x as f32,
            half_extents.y as f32,
            half_extents.z as f32,
        );
        Self::from_shape(name, shape, density)
    }

    /// Sphere link centred on its frame.
    pub fn ball(name: impl Into<String>, radius: Real, density: Real) -> Self {
        Self::from_shape(name, SharedShape::ball(radius as f32), density)
    }

    /// Cylinder link along the local Y axis.
    pub fn cylinder(
        name: impl Into<String>,
        half_height: Real,
        radius: Real,
        density: Real,
    ) -> Self {
        let shape = SharedShape::cylinder(half_height as f32, radius as f32);
        Self::from_shape(name, shape, density)
    }

    /// Capsule link along the local Z axis.
    pub fn capsule(
        name: impl Into<String>,
        half_height: Real,
        radius: Real,
        density: Real,
    ) -> Self {
        let shape = SharedShape::capsule_z(half_height as f32, radius as f32);
        Self::from_shape(name, shape, density)
    }

    /// Hide or show this link in render records.
    #[must_use]
    pub fn with_renderable(mut self, renderable: bool) -> Self {
        self.renderable = renderable;
        self
    }

    /// Link name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Collision shape in the link frame.
    pub fn shape(&self) -> &SharedShape {
        &self.shape
    }

    /// Mass properties.
    pub fn mass_properties(&self) -> &MassProperties {
        &self.mass
    }

    /// Mass in kg.
    pub fn mass(&self) -> Real {
        self.mass.mass
    }

    /// Transform relative to the previously attached link.
    pub fn transform(&self) -> &Isometry3<Real> {
        &self.transform
    }

    /// Whether render records are produced for this link.
    pub fn is_renderable(&self) -> bool {
        self.renderable
    }

    pub(crate) fn set_transform(&mut self, transform: Isometry3<Real>) {
        self.transform = transform;
    }

    pub(crate) fn set_renderable(&mut self, renderable: bool) {
        self.renderable = renderable;
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("name", &self.name)
            .field("shape", &self.shape.shape_type())
            .field("mass", &self.mass)
            .field("transform", &self.transform)
            .field("renderable", &self.renderable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cuboid_mass() {
        // 1.0 x 0.1 x 0.1 m box of water
        let link = Link::cuboid("bar", Vector3::new(0.5, 0.05, 0.05), 1000.0);
        assert_relative_eq!(link.mass(), 10.0, max_relative = 1e-4);

        let izz = link.mass_properties().inertia[(2, 2)];
        assert_relative_eq!(izz, 10.0 * (1.0 + 0.01) / 12.0, max_relative = 1e-4);
        assert!(link.mass_properties().local_com.coords.norm() < 1e-6);
    }

    #[test]
    fn test_world_inertia_rotates() {
        let link = Link::cuboid("bar", Vector3::new(0.5, 0.05, 0.05), 1000.0);
        let quarter = Isometry3::rotation(Vector3::z() * std::f64::consts::FRAC_PI_2);
        let world = link.mass_properties().world_inertia(&quarter);
        let local = link.mass_properties().inertia;
        assert_relative_eq!(world[(0, 0)], local[(1, 1)], max_relative = 1e-9);
        assert_relative_eq!(world[(1, 1)], local[(0, 0)], max_relative = 1e-9);
    }
}
