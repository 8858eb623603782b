//! Integration test: a LiDAR mounted on a mechanism scanning a physics world.

use approx::assert_relative_eq;
use armature_dynamics::{ArticulatedBody, Link, MechanismConfig, Real};
use armature_sensor::{Lidar360, LidarConfig, SensorError};
use armature_world::{PhysicsWorld, WorldConfig, MASK_STATIC};
use nalgebra::{Isometry3, Vector3};
use parry3d::shape::SharedShape;

const DT: Real = 1.0 / 240.0;

/// Index of the beam pointing along +x for a 4-beam single-layer sensor.
const FORWARD: usize = 2;

fn world() -> PhysicsWorld {
    PhysicsWorld::new(WorldConfig {
        gravity: [0.0, 0.0, 0.0],
        timestep: DT,
        ..Default::default()
    })
    .unwrap()
}

fn block(name: &str, at: Isometry3<Real>, world: &mut PhysicsWorld) -> ArticulatedBody {
    let config = MechanismConfig::new(name, 1).with_fixed_base(true);
    let link = Link::cuboid("block", Vector3::new(0.1, 0.1, 0.1), 500.0);
    let mut body = ArticulatedBody::new(config, link).unwrap();
    body.add_to_dynamics_world(world, at).unwrap();
    body
}

fn flat_config(frequency: Real) -> LidarConfig {
    LidarConfig {
        resolution: 4,
        layers: 1,
        vertical_fov: 0.0,
        frequency,
        ..Default::default()
    }
}

/// Sensor half a metre above the link origin, clear of the link itself.
fn mount() -> Isometry3<Real> {
    Isometry3::translation(0.0, 0.0, 0.5)
}

#[test]
fn test_scan_hits_static_wall() {
    let mut world = world();
    world.add_static_collider(
        SharedShape::cuboid(0.1, 5.0, 5.0),
        Isometry3::translation(3.0, 0.0, 0.0),
        MASK_STATIC,
    );
    let mut mast = block("mast", Isometry3::identity(), &mut world);
    let mut lidar = Lidar360::new("front", flat_config(0.0), 0, mount()).unwrap();

    world.step(&mut [&mut mast]).unwrap();
    assert!(lidar.update(&mast, &world, DT).unwrap());

    let distances = lidar.distances();
    assert_relative_eq!(distances[FORWARD], 2.9, epsilon = 1e-4);
    // Nothing behind the sensor.
    assert_eq!(distances[0], 0.0);
}

#[test]
fn test_scan_sees_other_mechanisms() {
    let mut world = world();
    let mut mast = block("mast", Isometry3::identity(), &mut world);
    let mut obstacle = block("obstacle", Isometry3::translation(1.5, 0.0, 0.5), &mut world);
    let mut lidar = Lidar360::new("front", flat_config(0.0), 0, mount()).unwrap();

    world.step(&mut [&mut mast, &mut obstacle]).unwrap();
    lidar.update(&mast, &world, DT).unwrap();
    assert_relative_eq!(lidar.distances()[FORWARD], 1.4, epsilon = 1e-4);
}

#[test]
fn test_scan_rate_gates_updates() {
    let mut world = world();
    let mut mast = block("mast", Isometry3::identity(), &mut world);
    let mut lidar = Lidar360::new("front", flat_config(10.0), 0, mount()).unwrap();

    let mut scans = 0;
    for _ in 0..48 {
        world.step(&mut [&mut mast]).unwrap();
        if lidar.update(&mast, &world, DT).unwrap() {
            scans += 1;
        }
    }
    assert_eq!(scans, 2);
    assert_eq!(lidar.history().count(), 2);
    let last = lidar.last_sample().unwrap();
    assert_relative_eq!(last.time, 48.0 * DT, epsilon = 1e-9);
}

#[test]
fn test_mount_on_missing_link_is_reported() {
    let mut world = world();
    let mast = block("mast", Isometry3::identity(), &mut world);
    let mut lidar = Lidar360::new("rear", flat_config(0.0), 3, mount()).unwrap();

    let err = lidar.update(&mast, &world, DT).unwrap_err();
    assert_eq!(
        err,
        SensorError::InvalidLink {
            name: "rear".into(),
            link: 3,
            links: 1,
        }
    );
}
