//! Detour waypoint candidates.
//!
//! The orchestrator routes through these points to force the routing service
//! around hazards. Candidates come from four sources, concatenated in this
//! order:
//! 1. A ring of points around each dangerous flood zone
//! 2. Two perpendicular offsets at the midpoint of each blocked road
//! 3. Evenly spaced points on the straight start→end line
//! 4. A few jittered points near the midpoint, for route diversity
//!
//! Randomness comes from a seedable [`SmallRng`] owned by the generator, so
//! tests and replays can be made deterministic via [`PlannerConfig::rng_seed`].

use std::f64::consts::PI;

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::geo_utils::{
    interpolate, max_vertex_distance_deg, planar_distance_deg, point_in_polygon, polygon_centroid,
};
use crate::{BlockedRoad, Coordinate, FloodZone, PlannerConfig};

/// Generates detour waypoint candidates for one planning invocation.
pub struct WaypointGenerator {
    rng: SmallRng,
    ring_points: u32,
    ring_radius_factor: f64,
    detour_offset_deg: f64,
    interpolation_spacing_deg: f64,
    random_points: u32,
    random_jitter_deg: f64,
}

impl WaypointGenerator {
    /// Create a generator, seeding from `config.rng_seed` or OS entropy.
    pub fn new(config: &PlannerConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    /// Create a generator with an explicit random source.
    pub fn with_rng(config: &PlannerConfig, rng: SmallRng) -> Self {
        Self {
            rng,
            ring_points: config.ring_points,
            ring_radius_factor: config.ring_radius_factor,
            detour_offset_deg: config.detour_offset_deg,
            interpolation_spacing_deg: config.interpolation_spacing_deg,
            random_points: config.random_points,
            random_jitter_deg: config.random_jitter_deg,
        }
    }

    /// All candidate waypoints for a start/end pair and hazard snapshot.
    pub fn generate(
        &mut self,
        start: Coordinate,
        end: Coordinate,
        zones: &[FloodZone],
        roads: &[BlockedRoad],
    ) -> Vec<Coordinate> {
        let mut waypoints = self.ring_waypoints(zones);
        let ring_count = waypoints.len();

        waypoints.extend(self.detour_waypoints(roads));
        let detour_count = waypoints.len() - ring_count;

        waypoints.extend(self.line_waypoints(start, end));
        waypoints.extend(self.random_waypoints(start, end));

        debug!(
            "[Waypoints] {} candidates ({} ring, {} road detour, {} line/random)",
            waypoints.len(),
            ring_count,
            detour_count,
            waypoints.len() - ring_count - detour_count
        );

        waypoints
    }

    /// Points on a circle around each dangerous zone, outside every zone.
    fn ring_waypoints(&self, zones: &[FloodZone]) -> Vec<Coordinate> {
        let mut waypoints = Vec::new();

        for zone in zones.iter().filter(|z| z.is_avoidable()) {
            let Some(center) = polygon_centroid(&zone.boundary) else {
                continue;
            };
            let radius = max_vertex_distance_deg(&center, &zone.boundary) * self.ring_radius_factor;

            for i in 0..self.ring_points {
                let angle = 2.0 * PI * i as f64 / self.ring_points as f64;
                let candidate = Coordinate::new(
                    center.latitude + radius * angle.cos(),
                    center.longitude + radius * angle.sin(),
                );

                let inside_any = zones
                    .iter()
                    .filter(|z| !z.is_degenerate())
                    .any(|z| point_in_polygon(&candidate, &z.boundary));
                if !inside_any {
                    waypoints.push(candidate);
                }
            }
        }

        waypoints
    }

    /// Two points either side of each blocked road, perpendicular at its midpoint.
    fn detour_waypoints(&self, roads: &[BlockedRoad]) -> Vec<Coordinate> {
        let mut waypoints = Vec::with_capacity(roads.len() * 2);

        for road in roads.iter().filter(|r| !r.is_degenerate()) {
            let mid = road.start.midpoint(&road.end);
            let length = planar_distance_deg(&road.start, &road.end);

            // Unit normal to the road direction (lat, lng) -> (-lng, lat)
            let normal_lat = -(road.end.longitude - road.start.longitude) / length;
            let normal_lng = (road.end.latitude - road.start.latitude) / length;
            let offset = self.detour_offset_deg;

            waypoints.push(Coordinate::new(
                mid.latitude + normal_lat * offset,
                mid.longitude + normal_lng * offset,
            ));
            waypoints.push(Coordinate::new(
                mid.latitude - normal_lat * offset,
                mid.longitude - normal_lng * offset,
            ));
        }

        waypoints
    }

    /// Interior points of the straight start→end line, at least two.
    fn line_waypoints(&self, start: Coordinate, end: Coordinate) -> Vec<Coordinate> {
        let distance = planar_distance_deg(&start, &end);
        let count = ((distance / self.interpolation_spacing_deg).floor() as usize).max(2);

        (1..=count)
            .map(|i| interpolate(&start, &end, i as f64 / (count + 1) as f64))
            .collect()
    }

    /// Points jittered uniformly in a box around the midpoint.
    fn random_waypoints(&mut self, start: Coordinate, end: Coordinate) -> Vec<Coordinate> {
        let mid = start.midpoint(&end);
        let half = self.random_jitter_deg / 2.0;

        (0..self.random_points)
            .map(|_| {
                let dlat = if half > 0.0 {
                    self.rng.gen_range(-half..=half)
                } else {
                    0.0
                };
                let dlng = if half > 0.0 {
                    self.rng.gen_range(-half..=half)
                } else {
                    0.0
                };
                Coordinate::new(mid.latitude + dlat, mid.longitude + dlng)
            })
            .collect()
    }
}
