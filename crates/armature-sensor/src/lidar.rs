//! 360° multi-layer ranging sensor mounted on a mechanism link.
//!
//! Beams sweep `[-h/2, h/2)` horizontally and `[-v/2, v/2)` vertically in
//! the sensor frame (x forward, z up). Each beam reports the distance from
//! the sensor origin to the nearest hit, or 0 when nothing is hit within
//! range.

use std::collections::VecDeque;

use nalgebra::{Isometry3, Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use armature_dynamics::{ArticulatedBody, Real, Renderable, RenderableKind};
use armature_world::{PhysicsWorld, MASK_ANIMATED_COLLIDING, MASK_DYNAMIC, MASK_STATIC};

use crate::config::LidarConfig;
use crate::error::{Result, SensorError};

/// Categories a scan beam can hit.
pub const LIDAR_RAY_MASK: u32 = MASK_STATIC | MASK_DYNAMIC | MASK_ANIMATED_COLLIDING;

/// Anything that can answer nearest-hit ray queries.
pub trait RayCaster {
    /// Distance to the nearest hit along `direction`, within `max_distance`.
    fn cast_ray(
        &self,
        origin: Point3<Real>,
        direction: &Unit<Vector3<Real>>,
        max_distance: Real,
        mask: u32,
    ) -> Option<Real>;
}

impl RayCaster for PhysicsWorld {
    fn cast_ray(
        &self,
        origin: Point3<Real>,
        direction: &Unit<Vector3<Real>>,
        max_distance: Real,
        mask: u32,
    ) -> Option<Real> {
        PhysicsWorld::cast_ray(self, origin, direction.into_inner(), max_distance, mask, None)
            .map(|hit| hit.distance)
    }
}

/// One complete scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LidarSample {
    /// Sensor time at which the scan was taken (s).
    pub time: Real,
    /// Distances, layer-major (`layer * resolution + beam`).
    pub distances: Vec<Real>,
}

/// 360° LiDAR attached to a link of an [`ArticulatedBody`].
#[derive(Debug, Clone)]
pub struct Lidar360 {
    name: String,
    config: LidarConfig,
    link: usize,
    mount: Isometry3<Real>,
    directions: Vec<Unit<Vector3<Real>>>,
    distances: Vec<Real>,
    history: VecDeque<LidarSample>,
    frame: Isometry3<Real>,
    since_scan: Real,
    time: Real,
}

impl Lidar360 {
    /// Sensor mounted on `link` at `mount` (link frame).
    pub fn new(
        name: impl Into<String>,
        config: LidarConfig,
        link: usize,
        mount: Isometry3<Real>,
    ) -> Result<Self> {
        config.validate()?;
        let directions = beam_directions(&config);
        Ok(Self {
            name: name.into(),
            distances: vec![0.0; config.beams()],
            config,
            link,
            mount,
            directions,
            history: VecDeque::new(),
            frame: Isometry3::identity(),
            since_scan: 0.0,
            time: 0.0,
        })
    }

    /// Sensor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Settings.
    pub fn config(&self) -> &LidarConfig {
        &self.config
    }

    /// Link the sensor is mounted on.
    pub fn link(&self) -> usize {
        self.link
    }

    /// Beam directions in the sensor frame, layer-major.
    pub fn directions(&self) -> &[Unit<Vector3<Real>>] {
        &self.directions
    }

    /// Latest distances, layer-major.
    pub fn distances(&self) -> &[Real] {
        &self.distances
    }

    /// Stored scans, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &LidarSample> {
        self.history.iter()
    }

    /// Most recent scan.
    pub fn last_sample(&self) -> Option<&LidarSample> {
        self.history.back()
    }

    /// Current world pose of the sensor frame.
    pub fn sensor_frame(&self, body: &ArticulatedBody) -> Result<Isometry3<Real>> {
        let link = body.link_transform(self.link).map_err(|_| {
            warn!(sensor = %self.name, link = self.link, links = body.num_links(), "sensor link out of range");
            SensorError::InvalidLink {
                name: self.name.clone(),
                link: self.link,
                links: body.num_links(),
            }
        })?;
        Ok(link * self.mount)
    }

    /// Advance sensor time by `dt` and scan when a period has elapsed.
    ///
    /// Returns whether a scan was taken.
    pub fn update<C: RayCaster + ?Sized>(
        &mut self,
        body: &ArticulatedBody,
        caster: &C,
        dt: Real,
    ) -> Result<bool> {
        let frame = self.sensor_frame(body)?;
        self.time += dt;
        self.since_scan += dt;

        if self.config.frequency > 0.0 {
            let period = 1.0 / self.config.frequency;
            if self.since_scan + 1.0e-9 < period {
                return Ok(false);
            }
            self.since_scan -= period;
        } else {
            self.since_scan = 0.0;
        }

        self.scan(frame, caster);
        Ok(true)
    }

    /// Take a scan from an explicit world frame.
    pub fn scan<C: RayCaster + ?Sized>(&mut self, frame: Isometry3<Real>, caster: &C) -> &[Real] {
        let origin = Point3::from(frame.translation.vector);
        let reach = self.config.range_max - self.config.range_min;

        for (distance, local) in self.distances.iter_mut().zip(&self.directions) {
            let dir = Unit::new_unchecked(frame.rotation * local.into_inner());
            let start = origin + dir.into_inner() * self.config.range_min;
            *distance = caster
                .cast_ray(start, &dir, reach, LIDAR_RAY_MASK)
                .map_or(0.0, |toi| self.config.range_min + toi);
        }

        self.frame = frame;
        self.history.push_back(LidarSample {
            time: self.time,
            distances: self.distances.clone(),
        });
        while self.history.len() > self.config.history_length {
            self.history.pop_front();
        }
        trace!(sensor = %self.name, time = self.time, "lidar scan");
        &self.distances
    }

    /// Beam lines from the sensor origin to each measured point.
    pub fn render(&self) -> Renderable {
        let mut points = Vec::with_capacity(self.distances.len() * 2);
        for (dir, distance) in self.directions.iter().zip(&self.distances) {
            points.push(Point3::origin());
            points.push(Point3::from(dir.into_inner() * *distance).cast::<f32>());
        }
        Renderable::lines(RenderableKind::Lines, self.link, &self.frame, points)
    }
}

fn beam_directions(config: &LidarConfig) -> Vec<Unit<Vector3<Real>>> {
    let h_range = config.horizontal_fov.to_radians();
    let v_range = config.vertical_fov.to_radians();

    let mut dirs = Vec::with_capacity(config.beams());
    for j in 0..config.layers {
        let v = j as Real / config.layers as Real * v_range - 0.5 * v_range;
        for i in 0..config.resolution {
            let h = i as Real / config.resolution as Real * h_range - 0.5 * h_range;
            dirs.push(Unit::new_normalize(Vector3::new(
                v.cos() * h.cos(),
                v.cos() * h.sin(),
                v.sin(),
            )));
        }
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Infinite wall at x = `at`.
    struct Wall {
        at: Real,
    }

    impl RayCaster for Wall {
        fn cast_ray(
            &self,
            origin: Point3<Real>,
            direction: &Unit<Vector3<Real>>,
            max_distance: Real,
            _mask: u32,
        ) -> Option<Real> {
            if direction.x <= 0.0 {
                return None;
            }
            let toi = (self.at - origin.x) / direction.x;
            (toi >= 0.0 && toi <= max_distance).then_some(toi)
        }
    }

    fn config(resolution: usize, layers: usize) -> LidarConfig {
        LidarConfig {
            resolution,
            layers,
            vertical_fov: 0.0,
            frequency: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_beam_layout() {
        let lidar = Lidar360::new("lidar", config(4, 1), 0, Isometry3::identity()).unwrap();
        let dirs = lidar.directions();
        assert_eq!(dirs.len(), 4);
        // -180°, -90°, 0°, 90°
        assert_relative_eq!(dirs[0].x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(dirs[1].y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(dirs[2].x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(dirs[3].y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_layers_span_fov() {
        let mut cfg = config(1, 2);
        cfg.vertical_fov = 42.4;
        let lidar = Lidar360::new("lidar", cfg, 0, Isometry3::identity()).unwrap();
        let lowest = lidar.directions()[0].z.asin().to_degrees();
        assert_relative_eq!(lowest, -21.2, epsilon = 1e-9);
        assert_relative_eq!(lidar.directions()[1].z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scan_measures_from_origin() {
        let mut cfg = config(4, 1);
        cfg.range_min = 0.5;
        let mut lidar = Lidar360::new("lidar", cfg, 0, Isometry3::identity()).unwrap();
        let distances = lidar.scan(Isometry3::identity(), &Wall { at: 3.0 }).to_vec();
        assert_relative_eq!(distances[2], 3.0, epsilon = 1e-12);
        // Misses report zero.
        assert_eq!(distances[0], 0.0);
        assert_eq!(distances[1], 0.0);
    }

    #[test]
    fn test_scan_follows_frame_rotation() {
        let mut lidar = Lidar360::new("lidar", config(4, 1), 0, Isometry3::identity()).unwrap();
        let turned = Isometry3::rotation(Vector3::z() * std::f64::consts::FRAC_PI_2);
        let distances = lidar.scan(turned, &Wall { at: 2.0 }).to_vec();
        // The -90° beam now points along +x.
        assert_relative_eq!(distances[1], 2.0, epsilon = 1e-9);
        assert_eq!(distances[2], 0.0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut cfg = config(2, 1);
        cfg.history_length = 3;
        let mut lidar = Lidar360::new("lidar", cfg, 0, Isometry3::identity()).unwrap();
        for _ in 0..5 {
            lidar.scan(Isometry3::identity(), &Wall { at: 1.0 });
        }
        assert_eq!(lidar.history().count(), 3);
        assert!(lidar.last_sample().is_some());

        let mut unbounded = config(2, 1);
        unbounded.history_length = 0;
        assert!(Lidar360::new("lidar", unbounded, 0, Isometry3::identity()).is_err());
    }

    #[test]
    fn test_render_has_two_points_per_beam() {
        let mut lidar = Lidar360::new("lidar", config(4, 2), 0, Isometry3::identity()).unwrap();
        lidar.scan(Isometry3::identity(), &Wall { at: 1.0 });
        let item = lidar.render();
        assert_eq!(item.kind, RenderableKind::Lines);
        assert_eq!(item.points.len(), 16);
    }

    #[test]
    fn test_sample_serializes() {
        let sample = LidarSample {
            time: 0.5,
            distances: vec![1.0, 0.0],
        };
        let json = serde_json::to_string(&sample).unwrap();
        let back: LidarSample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }
}
