//! Geometry kernel: great-circle distance, ray casting, segment tests.
//!
//! Everything here is a pure function. Planar helpers work directly in
//! degrees (longitude as x, latitude as y); they are only used for relative
//! comparisons against small fixed thresholds, never for metric distances.

use crate::Coordinate;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters.
///
/// # Example
/// ```
/// use flood_router::{Coordinate, haversine_distance};
/// let chennai = Coordinate::new(13.0827, 80.2707);
/// let vellore = Coordinate::new(12.9165, 79.1325);
/// let d = haversine_distance(&chennai, &vellore);
/// assert!(d > 120_000.0 && d < 130_000.0);
/// ```
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Total great-circle length of a polyline in meters.
pub fn polyline_length(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Ray-casting containment test.
///
/// Casts a horizontal ray from `point` and counts polygon edges crossing it;
/// an odd count means inside. Points exactly on an edge get whatever the
/// arithmetic yields.
///
/// # Example
/// ```
/// use flood_router::{Coordinate, point_in_polygon};
/// let square = [
///     Coordinate::new(0.0, 0.0),
///     Coordinate::new(0.0, 2.0),
///     Coordinate::new(2.0, 2.0),
///     Coordinate::new(2.0, 0.0),
/// ];
/// assert!(point_in_polygon(&Coordinate::new(1.0, 1.0), &square));
/// assert!(!point_in_polygon(&Coordinate::new(3.0, 3.0), &square));
/// ```
pub fn point_in_polygon(point: &Coordinate, polygon: &[Coordinate]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let x = point.longitude;
    let y = point.latitude;
    let mut inside = false;
    let mut j = polygon.len() - 1;

    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].longitude, polygon[i].latitude);
        let (xj, yj) = (polygon[j].longitude, polygon[j].latitude);

        // (yi > y) != (yj > y) guarantees yj != yi, so the division is safe
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Parametric intersection test for segments p1-p2 and p3-p4.
///
/// Parallel and collinear segments (zero determinant) never intersect, even
/// when they overlap.
pub fn segments_intersect(
    p1: &Coordinate,
    p2: &Coordinate,
    p3: &Coordinate,
    p4: &Coordinate,
) -> bool {
    let d1x = p2.longitude - p1.longitude;
    let d1y = p2.latitude - p1.latitude;
    let d2x = p4.longitude - p3.longitude;
    let d2y = p4.latitude - p3.latitude;

    let det = d1x * d2y - d1y * d2x;
    if det == 0.0 {
        return false;
    }

    let ox = p3.longitude - p1.longitude;
    let oy = p3.latitude - p1.latitude;
    let t = (ox * d2y - oy * d2x) / det;
    let u = (ox * d1y - oy * d1x) / det;

    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// Euclidean distance in degrees between two coordinates.
pub fn planar_distance_deg(a: &Coordinate, b: &Coordinate) -> f64 {
    let dx = b.longitude - a.longitude;
    let dy = b.latitude - a.latitude;
    (dx * dx + dy * dy).sqrt()
}

/// Distance in degrees from `point` to the segment `a`-`b`.
///
/// The projection parameter is clamped to [0, 1]; a zero-length segment
/// degrades to point distance.
pub fn distance_point_to_segment(point: &Coordinate, a: &Coordinate, b: &Coordinate) -> f64 {
    let dx = b.longitude - a.longitude;
    let dy = b.latitude - a.latitude;
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        return planar_distance_deg(point, a);
    }

    let t = (((point.longitude - a.longitude) * dx + (point.latitude - a.latitude) * dy) / len_sq)
        .clamp(0.0, 1.0);
    let projection = Coordinate::new(a.latitude + t * dy, a.longitude + t * dx);

    planar_distance_deg(point, &projection)
}

/// Linear interpolation in coordinate space; `fraction` 0 is `a`, 1 is `b`.
pub fn interpolate(a: &Coordinate, b: &Coordinate, fraction: f64) -> Coordinate {
    Coordinate::new(
        a.latitude + fraction * (b.latitude - a.latitude),
        a.longitude + fraction * (b.longitude - a.longitude),
    )
}

/// Vertex ring without a repeated closing vertex.
fn open_ring(polygon: &[Coordinate]) -> &[Coordinate] {
    match (polygon.first(), polygon.last()) {
        (Some(first), Some(last)) if polygon.len() > 1 && first == last => {
            &polygon[..polygon.len() - 1]
        }
        _ => polygon,
    }
}

/// Average of the polygon's distinct vertices.
///
/// Returns `None` for an empty polygon.
pub fn polygon_centroid(polygon: &[Coordinate]) -> Option<Coordinate> {
    let ring = open_ring(polygon);
    if ring.is_empty() {
        return None;
    }

    let n = ring.len() as f64;
    let lat = ring.iter().map(|c| c.latitude).sum::<f64>() / n;
    let lng = ring.iter().map(|c| c.longitude).sum::<f64>() / n;
    Some(Coordinate::new(lat, lng))
}

/// Largest planar distance (degrees) from `center` to any polygon vertex.
pub fn max_vertex_distance_deg(center: &Coordinate, polygon: &[Coordinate]) -> f64 {
    polygon
        .iter()
        .map(|v| planar_distance_deg(center, v))
        .fold(0.0, f64::max)
}
