//! Straight-line route synthesis.
//!
//! Used whenever the routing service cannot produce the direct leg. The
//! synthesized route never fails: it follows the straight line between the
//! endpoints, assumes a constant travel speed, and carries a minimal
//! three-step instruction list.

use crate::geo_utils::{haversine_distance, interpolate};
use crate::{Coordinate, PlannerConfig, RouteInstructions, RouteStep};

/// Build a straight-line route from `start` to `end`.
///
/// - Distance is the great-circle distance.
/// - Duration assumes `config.fallback_speed_kmh` (30 km/h by default).
/// - The polyline has one segment per `fallback_sample_spacing_m` meters,
///   at least `fallback_min_segments`, and includes both endpoints.
/// - Steps: start (zero length), continue straight at the midpoint, arrive;
///   the last two split distance and duration evenly.
///
/// # Example
/// ```
/// use flood_router::{Coordinate, PlannerConfig, synthesize_direct_route};
///
/// let p = Coordinate::new(13.0827, 80.2707);
/// let route = synthesize_direct_route(p, p, &PlannerConfig::default());
/// assert_eq!(route.distance_m, 0.0);
/// assert_eq!(route.duration_s, 0.0);
/// ```
pub fn synthesize_direct_route(
    start: Coordinate,
    end: Coordinate,
    config: &PlannerConfig,
) -> RouteInstructions {
    let distance = haversine_distance(&start, &end);
    let duration = distance / config.fallback_speed_mps();

    let segments = ((distance / config.fallback_sample_spacing_m).floor() as usize)
        .max(config.fallback_min_segments as usize)
        .max(1);
    let polyline: Vec<Coordinate> = (0..=segments)
        .map(|i| {
            if i == segments {
                end
            } else {
                interpolate(&start, &end, i as f64 / segments as f64)
            }
        })
        .collect();

    let steps = vec![
        RouteStep {
            instruction: "Start navigation".to_string(),
            distance_m: 0.0,
            duration_s: 0.0,
            location: start,
        },
        RouteStep {
            instruction: "Continue straight".to_string(),
            distance_m: distance * 0.5,
            duration_s: duration * 0.5,
            location: start.midpoint(&end),
        },
        RouteStep {
            instruction: "Arrive at destination".to_string(),
            distance_m: distance * 0.5,
            duration_s: duration * 0.5,
            location: end,
        },
    ];

    RouteInstructions {
        distance_m: distance,
        duration_s: duration,
        steps,
        polyline,
    }
}
