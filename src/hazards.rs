//! Hazard avoidance checks for candidate routes.
//!
//! A route is unsafe when it enters a dangerous (Critical/High) flood zone or
//! crosses, or passes within a small threshold of, a blocked road segment.
//! Degenerate hazards (zones with fewer than 3 vertices, zero-length roads)
//! are ignored rather than reported as errors.
//!
//! The free functions are the reference implementation. [`HazardIndex`]
//! answers the same questions for many candidate routes against one hazard
//! snapshot, using R-tree envelopes to skip hazards that are nowhere near.

use geo::{Coord, Intersects, Line, LineString, Polygon};
use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::{distance_point_to_segment, point_in_polygon, segments_intersect};
use crate::{BlockedRoad, Coordinate, CrossingCheck, FloodZone, PlannerConfig};

/// Default blocked-road proximity threshold in degrees (~50 meters).
pub const DEFAULT_PROXIMITY_THRESHOLD_DEG: f64 = 0.0005;

/// Does any polyline vertex fall inside a dangerous flood zone?
///
/// Only vertices are sampled, so a route can slip through a thin zone lying
/// between two vertices. Use [`HazardIndex`] with
/// [`CrossingCheck::SegmentIntersection`] for the stricter test.
pub fn route_crosses_flood_zones(polyline: &[Coordinate], zones: &[FloodZone]) -> bool {
    let dangerous: Vec<&FloodZone> = zones.iter().filter(|z| z.is_avoidable()).collect();
    if dangerous.is_empty() {
        return false;
    }

    polyline.iter().any(|point| {
        dangerous
            .iter()
            .any(|zone| point_in_polygon(point, &zone.boundary))
    })
}

/// Does any polyline segment cross or come within ~50 m of a blocked road?
pub fn route_crosses_blocked_roads(polyline: &[Coordinate], roads: &[BlockedRoad]) -> bool {
    route_crosses_blocked_roads_within(polyline, roads, DEFAULT_PROXIMITY_THRESHOLD_DEG)
}

/// [`route_crosses_blocked_roads`] with an explicit proximity threshold in degrees.
pub fn route_crosses_blocked_roads_within(
    polyline: &[Coordinate],
    roads: &[BlockedRoad],
    proximity_threshold_deg: f64,
) -> bool {
    if roads.is_empty() {
        return false;
    }

    polyline.windows(2).any(|pair| {
        roads
            .iter()
            .filter(|road| !road.is_degenerate())
            .any(|road| segment_touches_road(&pair[0], &pair[1], road, proximity_threshold_deg))
    })
}

/// Segment intersection plus a proximity test from both segment endpoints.
///
/// The proximity half catches near-misses that coarse polyline sampling
/// would otherwise let through.
fn segment_touches_road(
    a: &Coordinate,
    b: &Coordinate,
    road: &BlockedRoad,
    proximity_threshold_deg: f64,
) -> bool {
    if segments_intersect(a, b, &road.start, &road.end) {
        return true;
    }

    let nearest = distance_point_to_segment(a, &road.start, &road.end)
        .min(distance_point_to_segment(b, &road.start, &road.end));
    nearest < proximity_threshold_deg
}

/// Convert a zone boundary to a geo polygon (x = longitude, y = latitude).
fn to_geo_polygon(boundary: &[Coordinate]) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = boundary
        .iter()
        .map(|c| Coord {
            x: c.longitude,
            y: c.latitude,
        })
        .collect();
    Polygon::new(LineString::new(ring), vec![])
}

fn to_geo_line(a: &Coordinate, b: &Coordinate) -> Line<f64> {
    Line::new(
        Coord {
            x: a.longitude,
            y: a.latitude,
        },
        Coord {
            x: b.longitude,
            y: b.latitude,
        },
    )
}

// ============================================================================
// Spatial index
// ============================================================================

/// Bounding box of a hazard, referencing its slot in the index.
#[derive(Debug, Clone)]
struct HazardEnvelope {
    idx: usize,
    min_lat: f64,
    max_lat: f64,
    min_lng: f64,
    max_lng: f64,
}

impl HazardEnvelope {
    fn from_points(idx: usize, points: &[Coordinate], buffer: f64) -> Self {
        let mut env = Self {
            idx,
            min_lat: f64::MAX,
            max_lat: f64::MIN,
            min_lng: f64::MAX,
            max_lng: f64::MIN,
        };
        for p in points {
            env.min_lat = env.min_lat.min(p.latitude);
            env.max_lat = env.max_lat.max(p.latitude);
            env.min_lng = env.min_lng.min(p.longitude);
            env.max_lng = env.max_lng.max(p.longitude);
        }
        env.min_lat -= buffer;
        env.max_lat += buffer;
        env.min_lng -= buffer;
        env.max_lng += buffer;
        env
    }
}

impl RTreeObject for HazardEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_lng, self.min_lat], [self.max_lng, self.max_lat])
    }
}

fn point_envelope(p: &Coordinate) -> AABB<[f64; 2]> {
    AABB::from_point([p.longitude, p.latitude])
}

fn segment_envelope(a: &Coordinate, b: &Coordinate) -> AABB<[f64; 2]> {
    AABB::from_corners([a.longitude, a.latitude], [b.longitude, b.latitude])
}

#[derive(Debug, Clone)]
struct IndexedZone {
    boundary: Vec<Coordinate>,
    /// Only built for [`CrossingCheck::SegmentIntersection`]
    polygon: Option<Polygon<f64>>,
}

/// Hazard snapshot prepared for repeated route evaluation.
///
/// Built once per planning invocation and dropped with it; nothing is
/// shared between requests.
#[derive(Debug, Clone)]
pub struct HazardIndex {
    zones: Vec<IndexedZone>,
    zone_tree: RTree<HazardEnvelope>,
    roads: Vec<BlockedRoad>,
    road_tree: RTree<HazardEnvelope>,
    proximity_threshold_deg: f64,
    crossing_check: CrossingCheck,
}

impl HazardIndex {
    /// Index the dangerous zones and non-degenerate roads of a snapshot.
    pub fn new(zones: &[FloodZone], roads: &[BlockedRoad], config: &PlannerConfig) -> Self {
        let strict = config.crossing_check == CrossingCheck::SegmentIntersection;

        let zones: Vec<IndexedZone> = zones
            .iter()
            .filter(|z| z.is_avoidable())
            .map(|z| IndexedZone {
                boundary: z.boundary.clone(),
                polygon: strict.then(|| to_geo_polygon(&z.boundary)),
            })
            .collect();
        let zone_envelopes = zones
            .iter()
            .enumerate()
            .map(|(i, z)| HazardEnvelope::from_points(i, &z.boundary, 0.0))
            .collect();

        let roads: Vec<BlockedRoad> = roads
            .iter()
            .filter(|r| !r.is_degenerate())
            .cloned()
            .collect();
        // Expanded by the threshold so near-misses still hit the envelope
        let road_envelopes = roads
            .iter()
            .enumerate()
            .map(|(i, r)| {
                HazardEnvelope::from_points(i, &[r.start, r.end], config.proximity_threshold_deg)
            })
            .collect();

        Self {
            zones,
            zone_tree: RTree::bulk_load(zone_envelopes),
            roads,
            road_tree: RTree::bulk_load(road_envelopes),
            proximity_threshold_deg: config.proximity_threshold_deg,
            crossing_check: config.crossing_check,
        }
    }

    /// Number of dangerous zones and blocked roads that take part in checks.
    pub fn hazard_count(&self) -> (usize, usize) {
        (self.zones.len(), self.roads.len())
    }

    /// Is the point inside any indexed (dangerous) zone?
    pub fn point_in_dangerous_zone(&self, point: &Coordinate) -> bool {
        self.zone_tree
            .locate_in_envelope_intersecting(&point_envelope(point))
            .any(|env| point_in_polygon(point, &self.zones[env.idx].boundary))
    }

    /// Flood zone crossing according to the configured [`CrossingCheck`].
    pub fn crosses_flood_zones(&self, polyline: &[Coordinate]) -> bool {
        if self.zones.is_empty() {
            return false;
        }
        if polyline.iter().any(|p| self.point_in_dangerous_zone(p)) {
            return true;
        }

        match self.crossing_check {
            CrossingCheck::VertexSampling => false,
            CrossingCheck::SegmentIntersection => polyline.windows(2).any(|pair| {
                let line = to_geo_line(&pair[0], &pair[1]);
                self.zone_tree
                    .locate_in_envelope_intersecting(&segment_envelope(&pair[0], &pair[1]))
                    .any(|env| {
                        self.zones[env.idx]
                            .polygon
                            .as_ref()
                            .is_some_and(|poly| line.intersects(poly))
                    })
            }),
        }
    }

    /// Blocked road crossing, same semantics as [`route_crosses_blocked_roads_within`].
    pub fn crosses_blocked_roads(&self, polyline: &[Coordinate]) -> bool {
        if self.roads.is_empty() {
            return false;
        }

        polyline.windows(2).any(|pair| {
            self.road_tree
                .locate_in_envelope_intersecting(&segment_envelope(&pair[0], &pair[1]))
                .any(|env| {
                    segment_touches_road(
                        &pair[0],
                        &pair[1],
                        &self.roads[env.idx],
                        self.proximity_threshold_deg,
                    )
                })
        })
    }

    /// A safe route avoids every dangerous zone and every blocked road.
    pub fn is_route_safe(&self, polyline: &[Coordinate]) -> bool {
        !self.crosses_flood_zones(polyline) && !self.crosses_blocked_roads(polyline)
    }
}
