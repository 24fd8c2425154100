//! Named locations and district-to-district planning.
//!
//! Tamil Nadu districts plus the main Chennai localities, resolved by name and
//! routed over the [`RoadNetwork`] location graph.

use log::info;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::geo_utils::haversine_distance;
use crate::network::{NetworkPath, RoadNetwork};
use crate::{
    Coordinate, FloodZone, OptionExt, PlannerConfig, Result, RouteError, RouteInstructions,
    RoutePlan, RouteStep,
};

/// A named place usable as a district planner endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NamedLocation {
    pub name: &'static str,
    pub coordinates: Coordinate,
}

const TAMIL_NADU: &[(&str, f64, f64)] = &[
    ("Chennai", 13.0827, 80.2707),
    ("Coimbatore", 11.0168, 76.9558),
    ("Madurai", 9.9252, 78.1198),
    ("Tiruchirappalli", 10.7905, 78.7047),
    ("Salem", 11.6643, 78.146),
    ("Tirunelveli", 8.7139, 77.7567),
    ("Tiruppur", 11.1085, 77.3411),
    ("Erode", 11.341, 77.7172),
    ("Vellore", 12.9165, 79.1325),
    ("Thoothukkudi", 8.7642, 78.1348),
    ("Dindigul", 10.3624, 77.9695),
    ("Thanjavur", 10.787, 79.1378),
    ("Ranipet", 12.9277, 79.3193),
    ("Sivaganga", 9.8433, 78.4809),
    ("Kanyakumari", 8.0883, 77.5385),
    ("Namakkal", 11.2189, 78.1674),
    ("Karur", 10.9601, 78.0766),
    ("Tiruvarur", 10.7661, 79.6344),
    ("Nagapattinam", 10.7672, 79.8449),
    ("Krishnagiri", 12.5266, 78.2141),
    ("Cuddalore", 11.748, 79.7714),
    ("Dharmapuri", 12.121, 78.1582),
    ("Kanchipuram", 12.8185, 79.6947),
    ("Tiruvannamalai", 12.2253, 79.0747),
    ("Pudukkottai", 10.3833, 78.8001),
    ("Nilgiris", 11.4916, 76.7337),
    ("Ramanathapuram", 9.3639, 78.8395),
    ("Virudhunagar", 9.568, 77.9624),
    ("Ariyalur", 11.14, 79.0786),
    ("Perambalur", 11.2342, 78.8807),
    ("Kallakurichi", 11.7383, 78.9571),
    ("Tenkasi", 8.9598, 77.3161),
    ("Chengalpattu", 12.6819, 79.9888),
    ("Mayiladuthurai", 11.1014, 79.6583),
    ("Tirupattur", 12.495, 78.5686),
    ("Villupuram", 11.9401, 79.4861),
    ("Theni", 10.0104, 77.4768),
    // Chennai localities
    ("Chennai Central", 13.0827, 80.2707),
    ("T. Nagar", 13.0418, 80.2341),
    ("Adyar", 13.0012, 80.2565),
    ("Anna Nagar", 13.085, 80.2101),
    ("Velachery", 12.9815, 80.2176),
    ("Tambaram", 12.9249, 80.1),
    ("Porur", 13.0359, 80.1567),
    ("Sholinganallur", 12.901, 80.2279),
    ("Guindy", 13.0067, 80.2206),
    ("Mylapore", 13.0368, 80.2676),
];

static LOCATIONS: Lazy<Vec<NamedLocation>> = Lazy::new(|| {
    TAMIL_NADU
        .iter()
        .map(|&(name, lat, lng)| NamedLocation {
            name,
            coordinates: Coordinate::new(lat, lng),
        })
        .collect()
});

/// All known locations in lookup order.
pub fn tamil_nadu_locations() -> &'static [NamedLocation] {
    &LOCATIONS
}

/// First location whose name contains `query`, ignoring case and surrounding
/// whitespace.
pub fn find_location(query: &str) -> Result<&'static NamedLocation> {
    find_in(tamil_nadu_locations(), query)
}

fn find_in<'a>(locations: &'a [NamedLocation], query: &str) -> Result<&'a NamedLocation> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(RouteError::InvalidInput {
            message: "location name is empty".to_string(),
        });
    }

    locations
        .iter()
        .find(|l| l.name.to_lowercase().contains(&needle))
        .ok_or_location_not_found(query.trim())
}

/// Plan between two named Tamil Nadu locations over the location graph.
///
/// `Safe` when every traversed edge is outside all flood zones, `BestEffort`
/// when the path uses a risky edge (only possible with advisory zones, or
/// with `avoid_hazards` off), `Unreachable` when the graph has no path.
pub fn plan_district_route(
    from: &str,
    to: &str,
    zones: &[FloodZone],
    avoid_hazards: bool,
    config: &PlannerConfig,
) -> Result<RoutePlan> {
    plan_between(tamil_nadu_locations(), from, to, zones, avoid_hazards, config)
}

/// [`plan_district_route`] over a caller-supplied location table.
pub fn plan_between(
    locations: &[NamedLocation],
    from: &str,
    to: &str,
    zones: &[FloodZone],
    avoid_hazards: bool,
    config: &PlannerConfig,
) -> Result<RoutePlan> {
    config.validate()?;
    let origin = find_in(locations, from)?;
    let destination = find_in(locations, to)?;

    let network = RoadNetwork::build(
        locations.iter().map(|l| (l.name, l.coordinates)),
        zones,
        config.neighbor_count,
    );
    let path = network.shortest_path(origin.name, destination.name, avoid_hazards)?;

    if path.is_empty() {
        info!(
            "[RoadNetwork] {} is unreachable from {}",
            destination.name,
            origin.name
        );
        return Ok(RoutePlan::Unreachable);
    }

    let hazard_free = path.is_hazard_free();
    let route = path_instructions(&path, config);
    Ok(if hazard_free {
        RoutePlan::Safe(route)
    } else {
        RoutePlan::BestEffort(route)
    })
}

fn path_instructions(path: &NetworkPath, config: &PlannerConfig) -> RouteInstructions {
    let speed = config.fallback_speed_mps();
    let mut steps = Vec::with_capacity(path.node_ids.len());

    steps.push(RouteStep {
        instruction: format!("Start at {}", path.node_ids[0]),
        distance_m: 0.0,
        duration_s: 0.0,
        location: path.coordinates[0],
    });

    for (hop, ids) in path.coordinates.windows(2).zip(path.node_ids.iter().skip(1)) {
        let distance_m = haversine_distance(&hop[0], &hop[1]);
        steps.push(RouteStep {
            instruction: format!("Head towards {}", ids),
            distance_m,
            duration_s: distance_m / speed,
            location: hop[0],
        });
    }

    RouteInstructions::from_steps(steps, path.coordinates.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;

    fn location(name: &'static str, lat: f64, lng: f64) -> NamedLocation {
        NamedLocation {
            name,
            coordinates: Coordinate::new(lat, lng),
        }
    }

    /// Three towns on a parallel plus one to the north
    fn corridor() -> Vec<NamedLocation> {
        vec![
            location("Westport", 13.0, 80.0),
            location("Midtown", 13.0, 80.1),
            location("Eastgate", 13.0, 80.2),
            location("Hilltop", 13.08, 80.1),
        ]
    }

    fn zone_around(severity: Severity, lat: f64, lng: f64, half: f64) -> FloodZone {
        FloodZone::new(
            "zone",
            severity,
            vec![
                Coordinate::new(lat - half, lng - half),
                Coordinate::new(lat - half, lng + half),
                Coordinate::new(lat + half, lng + half),
                Coordinate::new(lat + half, lng - half),
            ],
        )
    }

    #[test]
    fn test_find_location() {
        assert_eq!(find_location("chennai").unwrap().name, "Chennai");
        assert_eq!(find_location("  ANNA NAGAR ").unwrap().name, "Anna Nagar");
        assert_eq!(find_location("anna").unwrap().name, "Tiruvannamalai");
        assert_eq!(find_location("t. nagar").unwrap().name, "T. Nagar");
        // Substring match takes the first entry in table order
        assert_eq!(find_location("nagar").unwrap().name, "Virudhunagar");

        assert!(matches!(
            find_location("Atlantis"),
            Err(RouteError::LocationNotFound { .. })
        ));
        assert!(matches!(
            find_location("   "),
            Err(RouteError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_table_has_unique_names() {
        let locations = tamil_nadu_locations();
        let mut names: Vec<&str> = locations.iter().map(|l| l.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), locations.len());
        assert!(locations.iter().all(|l| l.coordinates.is_finite()));
    }

    #[test]
    fn test_plan_along_corridor() {
        let config = PlannerConfig::default();
        let plan = plan_between(&corridor(), "westport", "eastgate", &[], true, &config).unwrap();

        let route = match plan {
            RoutePlan::Safe(route) => route,
            other => panic!("expected safe route, got {:?}", other),
        };
        assert_eq!(route.steps.len(), route.polyline.len());
        assert_eq!(route.polyline[0], Coordinate::new(13.0, 80.0));
        assert_eq!(*route.polyline.last().unwrap(), Coordinate::new(13.0, 80.2));
        assert_eq!(route.steps[0].instruction, "Start at Westport");
        assert_eq!(
            route.steps.last().unwrap().instruction,
            "Head towards Eastgate"
        );
        assert!(route.is_consistent(1.0, 1.0));
        let direct = haversine_distance(
            &Coordinate::new(13.0, 80.0),
            &Coordinate::new(13.0, 80.2),
        );
        assert!(route.distance_m >= direct - 1.0);
        // 30 km/h
        assert!((route.duration_s - route.distance_m / (30_000.0 / 3600.0)).abs() < 1e-6);
    }

    #[test]
    fn test_flooded_edge_avoided_or_flagged() {
        let config = PlannerConfig::default();
        // Sits on the Westport-Midtown midpoint
        let zones = vec![zone_around(Severity::Critical, 13.0, 80.05, 0.01)];

        let avoiding =
            plan_between(&corridor(), "Westport", "Midtown", &zones, true, &config).unwrap();
        match avoiding {
            RoutePlan::Safe(route) => {
                // Detours via Hilltop
                assert_eq!(route.polyline.len(), 3);
                assert_eq!(route.steps[1].instruction, "Head towards Hilltop");
            }
            other => panic!("expected detour, got {:?}", other),
        }

        let ignoring =
            plan_between(&corridor(), "Westport", "Midtown", &zones, false, &config).unwrap();
        match ignoring {
            RoutePlan::BestEffort(route) => assert_eq!(route.polyline.len(), 2),
            other => panic!("expected best effort, got {:?}", other),
        }
    }

    #[test]
    fn test_unreachable_destination() {
        let config = PlannerConfig {
            neighbor_count: 1,
            ..PlannerConfig::default()
        };
        // Single nearest neighbour: Westport and Midtown only point at each other
        let locations = vec![
            location("Westport", 13.0, 80.0),
            location("Midtown", 13.0, 80.01),
            location("Faraway", 14.0, 81.0),
        ];
        let plan = plan_between(&locations, "Westport", "Faraway", &[], true, &config).unwrap();
        assert_eq!(plan, RoutePlan::Unreachable);
    }

    #[test]
    fn test_same_location_and_real_table() {
        let config = PlannerConfig::default();

        let plan = plan_district_route("Guindy", "guindy", &[], true, &config).unwrap();
        let route = plan.route().unwrap();
        assert!(plan.is_safe());
        assert_eq!(route.steps.len(), 1);
        assert_eq!(route.distance_m, 0.0);

        // Mylapore is T. Nagar's nearest neighbour
        let plan = plan_district_route("T. Nagar", "Mylapore", &[], true, &config).unwrap();
        assert_eq!(plan.route().unwrap().polyline.len(), 2);

        assert!(matches!(
            plan_district_route("T. Nagar", "Gotham", &[], true, &config),
            Err(RouteError::LocationNotFound { .. })
        ));
    }
}
