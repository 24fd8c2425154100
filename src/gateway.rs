//! Boundary to the external turn-by-turn routing service.
//!
//! The orchestrator only sees [`RouteProvider`]. Every failure mode of a
//! provider (network error, bad status, malformed body, "no route") is an
//! `Err` value; the orchestrator decides whether that means falling back to a
//! synthesized route or rejecting a waypoint candidate.
//!
//! This module also holds the OSRM response model and its conversion into
//! [`RouteInstructions`]. The HTTP transport lives in `http.rs` behind the
//! `http` feature, so the mapping can be exercised without a network stack.

use std::future::Future;

use log::debug;
use serde::Deserialize;

use crate::fallback::synthesize_direct_route;
use crate::{Coordinate, PlannerConfig, Result, RouteError, RouteInstructions, RouteStep};

/// A turn-by-turn routing backend.
///
/// Implementations must not panic on service failures; return
/// [`RouteError::NoRouteFound`], [`RouteError::HttpError`] or
/// [`RouteError::ParseError`] instead.
pub trait RouteProvider: Send + Sync {
    /// Request a single route from `start` to `end`.
    fn request_route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> impl Future<Output = Result<RouteInstructions>> + Send;
}

/// Offline provider that answers every request with a straight-line route.
///
/// Useful when no routing service is reachable at all, and as a predictable
/// backend for tests.
#[derive(Debug, Clone, Default)]
pub struct StraightLineProvider {
    config: PlannerConfig,
}

impl StraightLineProvider {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }
}

impl RouteProvider for StraightLineProvider {
    fn request_route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> impl Future<Output = Result<RouteInstructions>> + Send {
        let route = synthesize_direct_route(start, end, &self.config);
        async move { Ok(route) }
    }
}

// ============================================================================
// OSRM response model
// ============================================================================

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: OsrmGeometry,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: [longitude, latitude]
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    duration: f64,
    #[serde(default)]
    instruction: Option<String>,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
    /// [longitude, latitude]
    location: [f64; 2],
}

fn lng_lat(pair: [f64; 2]) -> Coordinate {
    Coordinate::new(pair[1], pair[0])
}

/// Build the OSRM route URL for a start/end pair.
///
/// `base_url` is the profile endpoint, e.g.
/// `https://router.project-osrm.org/route/v1/driving/`.
pub fn osrm_route_url(base_url: &str, start: Coordinate, end: Coordinate) -> String {
    let base = base_url.trim_end_matches('/');
    format!(
        "{}/{},{};{},{}?overview=full&geometries=geojson&steps=true",
        base, start.longitude, start.latitude, end.longitude, end.latitude
    )
}

/// Decode an OSRM `route` response body into [`RouteInstructions`].
///
/// Only the first route is used. Steps of all legs are concatenated and the
/// totals are recomputed from them so the step-sum invariant holds exactly.
/// A route whose geometry has fewer than two points is not usable and is
/// reported as [`RouteError::NoRouteFound`].
pub fn parse_osrm_response(body: &str) -> Result<RouteInstructions> {
    let response: OsrmResponse =
        serde_json::from_str(body).map_err(|e| RouteError::ParseError {
            message: e.to_string(),
        })?;

    if response.code != "Ok" {
        return Err(RouteError::NoRouteFound {
            message: match response.message {
                Some(msg) => format!("{}: {}", response.code, msg),
                None => response.code,
            },
        });
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| RouteError::NoRouteFound {
            message: "response contained no routes".to_string(),
        })?;

    convert_route(route)
}

fn convert_route(route: OsrmRoute) -> Result<RouteInstructions> {
    let polyline: Vec<Coordinate> = route
        .geometry
        .coordinates
        .into_iter()
        .map(lng_lat)
        .collect();

    let origin = match polyline.as_slice() {
        [first, _, ..] => *first,
        _ => {
            return Err(RouteError::NoRouteFound {
                message: format!("route geometry has {} point(s)", polyline.len()),
            })
        }
    };

    let mut steps: Vec<RouteStep> = route
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(|step| {
            let instruction = match step.instruction {
                Some(text) if !text.trim().is_empty() => text,
                _ => instruction_for_maneuver(
                    &step.maneuver.kind,
                    step.maneuver.modifier.as_deref(),
                )
                .to_string(),
            };
            RouteStep {
                instruction,
                distance_m: step.distance,
                duration_s: step.duration,
                location: lng_lat(step.maneuver.location),
            }
        })
        .collect();

    if steps.is_empty() {
        // Requested without steps or the service dropped them; keep totals
        steps.push(RouteStep {
            instruction: "Continue straight".to_string(),
            distance_m: route.distance,
            duration_s: route.duration,
            location: origin,
        });
    }

    let instructions = RouteInstructions::from_steps(steps, polyline);
    if (instructions.distance_m - route.distance).abs() > 1.0 {
        debug!(
            "[Osrm] Step distances sum to {:.1}m, route reports {:.1}m",
            instructions.distance_m, route.distance
        );
    }
    Ok(instructions)
}

/// Human-readable text for an OSRM maneuver type and modifier.
///
/// Used when the service returns no prose instruction. Anything unknown reads
/// as "Continue straight".
pub fn instruction_for_maneuver(kind: &str, modifier: Option<&str>) -> &'static str {
    let modifier = modifier.unwrap_or("");

    match kind {
        "turn" | "end of road" => match modifier {
            "left" => "Turn left",
            "right" => "Turn right",
            "slight left" => "Turn slightly left",
            "slight right" => "Turn slightly right",
            "sharp left" => "Turn sharp left",
            "sharp right" => "Turn sharp right",
            "uturn" => "Make a U-turn",
            _ => "Continue straight",
        },
        "depart" => "Start navigation",
        "arrive" => "Arrive at destination",
        "new name" | "continue" => match modifier {
            "uturn" => "Make a U-turn",
            _ => "Continue straight",
        },
        "roundabout" | "rotary" => "Enter the roundabout",
        "exit roundabout" | "exit rotary" => "Exit the roundabout",
        "fork" => match modifier {
            "left" | "slight left" | "sharp left" => "Keep left at the fork",
            "right" | "slight right" | "sharp right" => "Keep right at the fork",
            _ => "Continue at the fork",
        },
        "merge" => "Merge with the road",
        "on ramp" | "off ramp" | "ramp" => match modifier {
            "left" | "slight left" | "sharp left" => "Take the ramp on the left",
            "right" | "slight right" | "sharp right" => "Take the ramp on the right",
            _ => "Take the ramp",
        },
        _ => "Continue straight",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "code": "Ok",
        "routes": [{
            "distance": 1530.4,
            "duration": 212.7,
            "geometry": {
                "type": "LineString",
                "coordinates": [[80.2341, 13.0418], [80.2300, 13.0500], [80.2250, 13.0550]]
            },
            "legs": [{
                "distance": 1530.4,
                "duration": 212.7,
                "summary": "Usman Road",
                "steps": [
                    {"distance": 600.0, "duration": 80.0, "name": "Usman Road",
                     "maneuver": {"type": "depart", "location": [80.2341, 13.0418]}},
                    {"distance": 930.4, "duration": 132.7, "name": "",
                     "maneuver": {"type": "turn", "modifier": "slight right", "location": [80.2300, 13.0500]}},
                    {"distance": 0.0, "duration": 0.0, "name": "",
                     "maneuver": {"type": "arrive", "location": [80.2250, 13.0550]}}
                ]
            }]
        }],
        "waypoints": []
    }"#;

    #[test]
    fn test_parse_osrm_response() {
        let route = parse_osrm_response(SAMPLE_RESPONSE).unwrap();

        assert_eq!(route.polyline.len(), 3);
        assert_eq!(route.polyline[0], Coordinate::new(13.0418, 80.2341));
        assert_eq!(route.steps.len(), 3);
        assert_eq!(route.steps[0].instruction, "Start navigation");
        assert_eq!(route.steps[1].instruction, "Turn slightly right");
        assert_eq!(route.steps[2].instruction, "Arrive at destination");
        assert_eq!(route.steps[1].location, Coordinate::new(13.05, 80.23));
        assert!((route.distance_m - 1530.4).abs() < 1e-6);
        assert!(route.is_consistent(1.0, 1.0));
    }

    #[test]
    fn test_prose_instruction_preferred() {
        let body = r#"{"code":"Ok","routes":[{"distance":10,"duration":2,
            "geometry":{"coordinates":[[80.0,13.0],[80.0001,13.0]]},
            "legs":[{"steps":[{"distance":10,"duration":2,"instruction":"Head east on Beach Road",
                "maneuver":{"type":"depart","location":[80.0,13.0]}}]}]}]}"#;
        let route = parse_osrm_response(body).unwrap();
        assert_eq!(route.steps[0].instruction, "Head east on Beach Road");
    }

    #[test]
    fn test_multi_leg_steps_concatenated() {
        let body = r#"{"code":"Ok","routes":[{"distance":30,"duration":6,
            "geometry":{"coordinates":[[80.0,13.0],[80.0002,13.0]]},
            "legs":[
                {"steps":[{"distance":10,"duration":2,"maneuver":{"type":"depart","location":[80.0,13.0]}}]},
                {"steps":[{"distance":20,"duration":4,"maneuver":{"type":"arrive","location":[80.0002,13.0]}}]}
            ]}]}"#;
        let route = parse_osrm_response(body).unwrap();
        assert_eq!(route.steps.len(), 2);
        assert!((route.distance_m - 30.0).abs() < 1e-9);
        assert!((route.duration_s - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_steps_keep_totals() {
        let body = r#"{"code":"Ok","routes":[{"distance":420.0,"duration":50.0,
            "geometry":{"coordinates":[[80.0,13.0],[80.004,13.0]]},"legs":[{"steps":[]}]}]}"#;
        let route = parse_osrm_response(body).unwrap();
        assert_eq!(route.steps.len(), 1);
        assert!((route.distance_m - 420.0).abs() < 1e-9);
        assert!(route.is_consistent(1.0, 1.0));
    }

    #[test]
    fn test_no_route_is_error() {
        let body = r#"{"code":"NoRoute","message":"Impossible route between points","routes":[]}"#;
        match parse_osrm_response(body) {
            Err(RouteError::NoRouteFound { message }) => {
                assert!(message.contains("NoRoute"));
                assert!(message.contains("Impossible"));
            }
            other => panic!("expected NoRouteFound, got {:?}", other),
        }

        let empty = r#"{"code":"Ok","routes":[]}"#;
        assert!(matches!(
            parse_osrm_response(empty),
            Err(RouteError::NoRouteFound { .. })
        ));
    }

    #[test]
    fn test_empty_geometry_is_no_route() {
        let empty = r#"{"code":"Ok","routes":[{"distance":0.0,"duration":0.0,
            "geometry":{"coordinates":[]},"legs":[]}]}"#;
        assert!(matches!(
            parse_osrm_response(empty),
            Err(RouteError::NoRouteFound { .. })
        ));

        let single = r#"{"code":"Ok","routes":[{"distance":0.0,"duration":0.0,
            "geometry":{"coordinates":[[80.23,13.03]]},
            "legs":[{"steps":[{"distance":0.0,"duration":0.0,
                "maneuver":{"type":"arrive","location":[80.23,13.03]}}]}]}]}"#;
        assert!(matches!(
            parse_osrm_response(single),
            Err(RouteError::NoRouteFound { .. })
        ));
    }

    #[test]
    fn test_malformed_body_is_parse_error() {
        assert!(matches!(
            parse_osrm_response("<html>502 Bad Gateway</html>"),
            Err(RouteError::ParseError { .. })
        ));
    }

    #[test]
    fn test_maneuver_mapping() {
        assert_eq!(instruction_for_maneuver("turn", Some("left")), "Turn left");
        assert_eq!(instruction_for_maneuver("turn", Some("right")), "Turn right");
        assert_eq!(instruction_for_maneuver("turn", Some("slight left")), "Turn slightly left");
        assert_eq!(instruction_for_maneuver("turn", Some("sharp right")), "Turn sharp right");
        assert_eq!(instruction_for_maneuver("turn", Some("uturn")), "Make a U-turn");
        assert_eq!(instruction_for_maneuver("depart", None), "Start navigation");
        assert_eq!(instruction_for_maneuver("arrive", None), "Arrive at destination");
        assert_eq!(instruction_for_maneuver("new name", None), "Continue straight");
        assert_eq!(instruction_for_maneuver("roundabout", None), "Enter the roundabout");
        assert_eq!(instruction_for_maneuver("exit roundabout", None), "Exit the roundabout");
        assert_eq!(instruction_for_maneuver("fork", Some("left")), "Keep left at the fork");
        assert_eq!(instruction_for_maneuver("fork", Some("right")), "Keep right at the fork");
        assert_eq!(instruction_for_maneuver("fork", None), "Continue at the fork");
        assert_eq!(instruction_for_maneuver("merge", None), "Merge with the road");
        assert_eq!(
            instruction_for_maneuver("on ramp", Some("right")),
            "Take the ramp on the right"
        );
        assert_eq!(instruction_for_maneuver("off ramp", None), "Take the ramp");
        assert_eq!(instruction_for_maneuver("notification", None), "Continue straight");
        assert_eq!(instruction_for_maneuver("", None), "Continue straight");
    }

    #[test]
    fn test_osrm_url_format() {
        let url = osrm_route_url(
            "https://router.project-osrm.org/route/v1/driving/",
            Coordinate::new(13.03, 80.23),
            Coordinate::new(13.09, 80.21),
        );
        assert_eq!(
            url,
            "https://router.project-osrm.org/route/v1/driving/80.23,13.03;80.21,13.09?overview=full&geometries=geojson&steps=true"
        );
    }

    #[tokio::test]
    async fn test_straight_line_provider() {
        let provider = StraightLineProvider::default();
        let start = Coordinate::new(13.03, 80.23);
        let end = Coordinate::new(13.09, 80.21);
        let route = provider.request_route(start, end).await.unwrap();
        assert_eq!(route.steps.len(), 3);
        assert_eq!(route.polyline[0], start);
    }
}
