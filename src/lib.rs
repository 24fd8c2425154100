//! # Flood Router
//!
//! Hazard-aware route planning for flood emergencies.
//!
//! This library provides:
//! - Safe routes between two coordinates that avoid dangerous flood zones and
//!   blocked roads, built on top of any turn-by-turn routing service
//! - A straight-line fallback route when the routing service is unavailable
//! - District-to-district shortest paths over a small location graph with
//!   risk-weighted Dijkstra
//!
//! ## Features
//!
//! - **`http`** - Enable the reqwest-backed OSRM client
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use flood_router::{Coordinate, PlannerConfig, synthesize_direct_route};
//!
//! let t_nagar = Coordinate::new(13.0418, 80.2341);
//! let anna_nagar = Coordinate::new(13.085, 80.2101);
//!
//! let route = synthesize_direct_route(t_nagar, anna_nagar, &PlannerConfig::default());
//! assert_eq!(route.steps.len(), 3);
//! assert!(route.distance_m > 0.0);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, RouteError};

// Geographic utilities (distance, polygons, segments)
pub mod geo_utils;
pub use geo_utils::{
    distance_point_to_segment, haversine_distance, point_in_polygon, segments_intersect,
};

// Flood zone / blocked road crossing checks
pub mod hazards;
pub use hazards::{route_crosses_blocked_roads, route_crosses_flood_zones, HazardIndex};

// Detour waypoint candidates
pub mod waypoints;
pub use waypoints::WaypointGenerator;

// Straight-line route used when the routing service fails
pub mod fallback;
pub use fallback::synthesize_direct_route;

// Routing service boundary (provider trait + OSRM response mapping)
pub mod gateway;
pub use gateway::{
    instruction_for_maneuver, parse_osrm_response, RouteProvider, StraightLineProvider,
};

// HTTP client for the routing service
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::OsrmClient;

// Safe-route orchestration
pub mod planner;
pub use planner::{PlanStage, SafeRoutePlanner};

// Location graph + risk-weighted Dijkstra
pub mod network;
pub use network::{Connection, GraphNode, NetworkPath, RiskLevel, RoadNetwork};

// Named locations and the district-level planner
pub mod districts;
pub use districts::{
    find_location, plan_between, plan_district_route, tamil_nadu_locations, NamedLocation,
};

// Human-readable distance/duration
pub mod format;
pub use format::{format_distance, format_duration};

// ============================================================================
// Core Types
// ============================================================================

/// A coordinate in decimal degrees.
///
/// Geometry treats `longitude` as x and `latitude` as y.
///
/// # Example
/// ```
/// use flood_router::Coordinate;
/// let chennai = Coordinate::new(13.0827, 80.2707);
/// assert!(chennai.is_finite());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components are finite numbers. This is the only validation the
    /// planners apply to caller coordinates.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Midpoint in coordinate space (not the geodesic midpoint).
    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        Coordinate::new(
            (self.latitude + other.latitude) / 2.0,
            (self.longitude + other.longitude) / 2.0,
        )
    }
}

/// Flood zone severity as reported by the hazard feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Safe,
}

impl Severity {
    /// Critical and High zones are impassable; the rest are advisory.
    pub fn is_dangerous(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

/// A polygonal flood-risk area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodZone {
    pub name: String,
    pub severity: Severity,
    /// Polygon ring. The closing vertex may be omitted or repeated.
    pub boundary: Vec<Coordinate>,
}

impl FloodZone {
    pub fn new(name: impl Into<String>, severity: Severity, boundary: Vec<Coordinate>) -> Self {
        Self {
            name: name.into(),
            severity,
            boundary,
        }
    }

    /// Fewer than 3 vertices cannot enclose anything; such zones are skipped.
    pub fn is_degenerate(&self) -> bool {
        self.boundary.len() < 3
    }

    /// Dangerous and usable for containment tests.
    pub fn is_avoidable(&self) -> bool {
        self.severity.is_dangerous() && !self.is_degenerate()
    }
}

/// Condition of a blocked road segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoadStatus {
    Blocked,
    Damaged,
    Demolished,
}

/// A two-point road stretch that routes must not cross or pass close to.
///
/// Longer roads are modeled as consecutive segments by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedRoad {
    pub name: String,
    pub start: Coordinate,
    pub end: Coordinate,
    pub status: RoadStatus,
}

impl BlockedRoad {
    pub fn new(
        name: impl Into<String>,
        start: Coordinate,
        end: Coordinate,
        status: RoadStatus,
    ) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            status,
        }
    }

    /// Zero-length segments are skipped by the evaluator and generator.
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }
}

/// One maneuver of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction: String,
    /// Distance in meters covered by this step
    pub distance_m: f64,
    /// Duration in seconds of this step
    pub duration_s: f64,
    /// Where the maneuver happens
    pub location: Coordinate,
}

/// A complete route: totals, maneuvers and dense geometry for rendering.
///
/// Totals always equal the sum of the step values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInstructions {
    /// Total distance in meters
    pub distance_m: f64,
    /// Total duration in seconds
    pub duration_s: f64,
    pub steps: Vec<RouteStep>,
    pub polyline: Vec<Coordinate>,
}

impl RouteInstructions {
    /// Build a route whose totals are derived from its steps.
    pub fn from_steps(steps: Vec<RouteStep>, polyline: Vec<Coordinate>) -> Self {
        let distance_m = steps.iter().map(|s| s.distance_m).sum();
        let duration_s = steps.iter().map(|s| s.duration_s).sum();
        Self {
            distance_m,
            duration_s,
            steps,
            polyline,
        }
    }

    /// Join consecutive legs into one route.
    ///
    /// Distances, durations, steps and polylines are concatenated in order.
    pub fn concat(legs: &[RouteInstructions]) -> RouteInstructions {
        let mut steps = Vec::with_capacity(legs.iter().map(|l| l.steps.len()).sum());
        let mut polyline = Vec::with_capacity(legs.iter().map(|l| l.polyline.len()).sum());
        let mut distance_m = 0.0;
        let mut duration_s = 0.0;

        for leg in legs {
            distance_m += leg.distance_m;
            duration_s += leg.duration_s;
            steps.extend(leg.steps.iter().cloned());
            polyline.extend(leg.polyline.iter().copied());
        }

        RouteInstructions {
            distance_m,
            duration_s,
            steps,
            polyline,
        }
    }

    /// Check the step-sum invariant within the given tolerances.
    pub fn is_consistent(&self, distance_tolerance_m: f64, duration_tolerance_s: f64) -> bool {
        let step_distance: f64 = self.steps.iter().map(|s| s.distance_m).sum();
        let step_duration: f64 = self.steps.iter().map(|s| s.duration_s).sum();
        (step_distance - self.distance_m).abs() <= distance_tolerance_m
            && (step_duration - self.duration_s).abs() <= duration_tolerance_s
    }
}

/// Outcome of a planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoutePlan {
    /// Avoids every dangerous flood zone and blocked road
    Safe(RouteInstructions),
    /// No hazard-free route was found; callers should warn the user
    BestEffort(RouteInstructions),
    /// No route exists between the endpoints
    Unreachable,
}

impl RoutePlan {
    pub fn is_safe(&self) -> bool {
        matches!(self, RoutePlan::Safe(_))
    }

    /// The route, if any, regardless of its safety.
    pub fn route(&self) -> Option<&RouteInstructions> {
        match self {
            RoutePlan::Safe(route) | RoutePlan::BestEffort(route) => Some(route),
            RoutePlan::Unreachable => None,
        }
    }

    pub fn into_route(self) -> Option<RouteInstructions> {
        match self {
            RoutePlan::Safe(route) | RoutePlan::BestEffort(route) => Some(route),
            RoutePlan::Unreachable => None,
        }
    }
}

/// How strictly a route is tested against flood zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossingCheck {
    /// Only polyline vertices are tested for containment. Can miss a thin
    /// zone lying between two sampled vertices.
    VertexSampling,
    /// Vertices plus every polyline segment against the zone polygon.
    SegmentIntersection,
}

/// Configuration for safe-route planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Distance (degrees) under which a route counts as touching a blocked road.
    /// Default: 0.0005 (~50 meters)
    pub proximity_threshold_deg: f64,

    /// Flood zone crossing strictness.
    /// Default: VertexSampling
    pub crossing_check: CrossingCheck,

    /// Waypoints placed on the ring around each dangerous zone.
    /// Default: 8
    pub ring_points: u32,

    /// Ring radius as a multiple of the zone's max centroid-to-vertex distance.
    /// Default: 1.5
    pub ring_radius_factor: f64,

    /// Perpendicular offset (degrees) of detour points around a blocked road.
    /// Default: 0.005 (~500 meters)
    pub detour_offset_deg: f64,

    /// Spacing (degrees) of interpolated points along the direct line.
    /// Default: 0.01 (~1 km)
    pub interpolation_spacing_deg: f64,

    /// Random diversity points near the midpoint of the direct line.
    /// Default: 5
    pub random_points: u32,

    /// Full width (degrees) of the random jitter box around the midpoint.
    /// Default: 0.01 (~1 km)
    pub random_jitter_deg: f64,

    /// Seed for waypoint randomness. `None` seeds from OS entropy.
    /// Default: None
    pub rng_seed: Option<u64>,

    /// Safe single-waypoint routes collected before picking the shortest.
    /// Default: 3
    pub max_safe_candidates: usize,

    /// Cap on waypoint pairs tried in the two-waypoint stage. `None` tries all.
    ///
    /// With `n` candidates the uncapped stage tries up to `n * (n - 1) / 2`
    /// pairs at three provider calls each. Line candidates grow with distance
    /// (one per `interpolation_spacing_deg`), so a district-scale trip can
    /// produce hundreds of candidates and tens of thousands of requests. Set a
    /// cap when planning against a rate-limited service such as `OsrmClient`.
    /// Default: None
    pub max_waypoint_pairs: Option<usize>,

    /// Assumed travel speed for synthesized routes, km/h.
    /// Default: 30.0
    pub fallback_speed_kmh: f64,

    /// One synthesized polyline point per this many meters.
    /// Default: 500.0
    pub fallback_sample_spacing_m: f64,

    /// Minimum number of segments in a synthesized polyline.
    /// Default: 5
    pub fallback_min_segments: u32,

    /// Timeout for a single routing service call, milliseconds.
    /// Default: 10000
    pub request_timeout_ms: u64,

    /// Waypoint candidates evaluated concurrently.
    /// Default: 8
    pub max_concurrent_requests: usize,

    /// Nearest neighbours each location connects to in the district graph.
    /// Default: 3
    pub neighbor_count: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_deg: 0.0005,
            crossing_check: CrossingCheck::VertexSampling,
            ring_points: 8,
            ring_radius_factor: 1.5,
            detour_offset_deg: 0.005,
            interpolation_spacing_deg: 0.01,
            random_points: 5,
            random_jitter_deg: 0.01,
            rng_seed: None,
            max_safe_candidates: 3,
            max_waypoint_pairs: None,
            fallback_speed_kmh: 30.0,
            fallback_sample_spacing_m: 500.0,
            fallback_min_segments: 5,
            request_timeout_ms: 10_000,
            max_concurrent_requests: 8,
            neighbor_count: 3,
        }
    }
}

impl PlannerConfig {
    /// Reject values that would make the planners loop, divide by zero or
    /// never finish.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("proximity_threshold_deg", self.proximity_threshold_deg),
            ("ring_radius_factor", self.ring_radius_factor),
            ("detour_offset_deg", self.detour_offset_deg),
            ("interpolation_spacing_deg", self.interpolation_spacing_deg),
            ("fallback_speed_kmh", self.fallback_speed_kmh),
            ("fallback_sample_spacing_m", self.fallback_sample_spacing_m),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(RouteError::ConfigError {
                    message: format!("{} must be a positive number, got {}", name, value),
                });
            }
        }
        if !(self.random_jitter_deg.is_finite() && self.random_jitter_deg >= 0.0) {
            return Err(RouteError::ConfigError {
                message: format!(
                    "random_jitter_deg must be non-negative, got {}",
                    self.random_jitter_deg
                ),
            });
        }
        if self.fallback_min_segments == 0 {
            return Err(RouteError::ConfigError {
                message: "fallback_min_segments must be at least 1".to_string(),
            });
        }
        if self.max_safe_candidates == 0 || self.max_concurrent_requests == 0 {
            return Err(RouteError::ConfigError {
                message: "max_safe_candidates and max_concurrent_requests must be at least 1"
                    .to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(RouteError::ConfigError {
                message: "request_timeout_ms must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Fallback speed in meters per second.
    pub fn fallback_speed_mps(&self) -> f64 {
        self.fallback_speed_kmh * 1000.0 / 3600.0
    }
}

// ============================================================================
// Tests
// ============================================================================
