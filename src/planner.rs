//! Safe-route orchestration.
//!
//! A single invocation walks through a fixed sequence of attempts and returns
//! the first route that avoids every dangerous flood zone and blocked road:
//!
//! ```text
//! TryDirect -> TrySingleWaypoint -> TryDoubleWaypoint -> ReturnUnsafeDirect
//! ```
//!
//! - **Direct**: one provider call; a failed or timed-out call is replaced by
//!   a synthesized straight-line route.
//! - **Single waypoint**: routes start→w→end in candidate order, keeps the first
//!   `max_safe_candidates` safe ones and returns the shortest.
//! - **Double waypoint**: routes start→wi→wj→end for i < j and returns the
//!   first safe one.
//! - Otherwise the direct route is returned as [`RoutePlan::BestEffort`].
//!
//! Candidate requests are fanned out through an ordered buffered stream, so
//! results are consumed in candidate order while up to
//! `max_concurrent_requests` candidates are in flight. Once a stage has what
//! it needs the stream is dropped along with any outstanding requests.

use std::pin::pin;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use crate::fallback::synthesize_direct_route;
use crate::gateway::RouteProvider;
use crate::hazards::HazardIndex;
use crate::waypoints::WaypointGenerator;
use crate::{
    BlockedRoad, Coordinate, FloodZone, OptionExt, PlannerConfig, Result, RouteError,
    RouteInstructions, RoutePlan,
};

/// Attempt stage of a planning invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanStage {
    TryDirect,
    TrySingleWaypoint,
    TryDoubleWaypoint,
    ReturnUnsafeDirect,
}

/// Finds hazard-free routes on top of a [`RouteProvider`].
///
/// The planner itself is stateless between calls; hazard indexes and waypoint
/// candidates are rebuilt from the snapshot passed to each invocation.
pub struct SafeRoutePlanner<P> {
    provider: P,
    config: PlannerConfig,
}

impl<P: RouteProvider> SafeRoutePlanner<P> {
    pub fn new(provider: P, config: PlannerConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Plan a route from the user's current location.
    ///
    /// `None` means the location is unknown and fails with
    /// [`RouteError::InvalidInput`] before any routing work.
    pub async fn find_safe_route_from(
        &self,
        start: Option<Coordinate>,
        end: Coordinate,
        zones: &[FloodZone],
        roads: &[BlockedRoad],
    ) -> Result<RoutePlan> {
        let start = start.ok_or_invalid_input("current location is not available")?;
        self.find_safe_route(start, end, zones, roads).await
    }

    /// Plan a route from `start` to `end` that avoids the given hazards.
    ///
    /// Returns `Err` only for invalid input or configuration. Provider
    /// failures degrade to fallback routes and rejected candidates.
    pub async fn find_safe_route(
        &self,
        start: Coordinate,
        end: Coordinate,
        zones: &[FloodZone],
        roads: &[BlockedRoad],
    ) -> Result<RoutePlan> {
        let (plan, _) = self
            .find_safe_route_with_stage(start, end, zones, roads)
            .await?;
        Ok(plan)
    }

    /// Same as [`find_safe_route`](Self::find_safe_route), also reporting the
    /// stage that produced the result.
    pub async fn find_safe_route_with_stage(
        &self,
        start: Coordinate,
        end: Coordinate,
        zones: &[FloodZone],
        roads: &[BlockedRoad],
    ) -> Result<(RoutePlan, PlanStage)> {
        validate_endpoints(&start, &end)?;
        self.config.validate()?;

        let started = Instant::now();
        let index = HazardIndex::new(zones, roads, &self.config);
        let (zone_count, road_count) = index.hazard_count();
        info!(
            "[SafeRoute] Planning with {} dangerous zones, {} blocked roads",
            zone_count, road_count
        );

        // Stage 1: direct
        let direct = match self.request_leg(start, end).await {
            Ok(route) => route,
            Err(e) => {
                warn!("[SafeRoute] Direct route failed ({}), using straight line", e);
                synthesize_direct_route(start, end, &self.config)
            }
        };
        if index.is_route_safe(&direct.polyline) {
            info!(
                "[SafeRoute] Direct route is safe ({:.0}m) in {:?}",
                direct.distance_m,
                started.elapsed()
            );
            return Ok((RoutePlan::Safe(direct), PlanStage::TryDirect));
        }

        let mut generator = WaypointGenerator::new(&self.config);
        let waypoints = generator.generate(start, end, zones, roads);

        // Stage 2: one waypoint, best of the first few safe candidates
        debug!("[SafeRoute] Stage {:?}", PlanStage::TrySingleWaypoint);
        if let Some(route) = self
            .best_single_waypoint_route(start, end, &waypoints, &index)
            .await
        {
            info!(
                "[SafeRoute] Safe single-waypoint route ({:.0}m) in {:?}",
                route.distance_m,
                started.elapsed()
            );
            return Ok((RoutePlan::Safe(route), PlanStage::TrySingleWaypoint));
        }

        // Stage 3: two waypoints, first safe pair
        debug!("[SafeRoute] Stage {:?}", PlanStage::TryDoubleWaypoint);
        if let Some(route) = self
            .first_double_waypoint_route(start, end, &waypoints, &index)
            .await
        {
            info!(
                "[SafeRoute] Safe two-waypoint route ({:.0}m) in {:?}",
                route.distance_m,
                started.elapsed()
            );
            return Ok((RoutePlan::Safe(route), PlanStage::TryDoubleWaypoint));
        }

        warn!(
            "[SafeRoute] No safe route among {} candidates, returning direct route in {:?}",
            waypoints.len(),
            started.elapsed()
        );
        Ok((RoutePlan::BestEffort(direct), PlanStage::ReturnUnsafeDirect))
    }

    async fn best_single_waypoint_route(
        &self,
        start: Coordinate,
        end: Coordinate,
        waypoints: &[Coordinate],
        index: &HazardIndex,
    ) -> Option<RouteInstructions> {
        if waypoints.is_empty() {
            return None;
        }

        let safe: Vec<RouteInstructions> = stream::iter(waypoints.iter().copied())
            .map(|w| self.route_via(vec![start, w, end]))
            .buffered(self.config.max_concurrent_requests)
            .filter_map(|route| async move {
                route.filter(|r| index.is_route_safe(&r.polyline))
            })
            .take(self.config.max_safe_candidates)
            .collect()
            .await;

        debug!("[SafeRoute] {} safe single-waypoint candidates", safe.len());
        shortest(safe)
    }

    async fn first_double_waypoint_route(
        &self,
        start: Coordinate,
        end: Coordinate,
        waypoints: &[Coordinate],
        index: &HazardIndex,
    ) -> Option<RouteInstructions> {
        let n = waypoints.len();
        if n < 2 {
            return None;
        }

        let pairs = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .take(self.config.max_waypoint_pairs.unwrap_or(usize::MAX));

        let found = stream::iter(pairs)
            .map(|(i, j)| self.route_via(vec![start, waypoints[i], waypoints[j], end]))
            .buffered(self.config.max_concurrent_requests)
            .filter_map(|route| async move {
                route.filter(|r| index.is_route_safe(&r.polyline))
            });
        let mut found = pin!(found);
        found.next().await
    }

    /// Route through `points` in order, one provider call per leg.
    ///
    /// `None` if any leg fails; the candidate is then skipped.
    async fn route_via(&self, points: Vec<Coordinate>) -> Option<RouteInstructions> {
        let legs = join_all(
            points
                .windows(2)
                .map(|pair| self.request_leg(pair[0], pair[1])),
        )
        .await;

        match legs.into_iter().collect::<Result<Vec<_>>>() {
            Ok(legs) => Some(RouteInstructions::concat(&legs)),
            Err(e) => {
                debug!("[SafeRoute] Candidate skipped: {}", e);
                None
            }
        }
    }

    /// One provider call bounded by the request timeout.
    async fn request_leg(&self, start: Coordinate, end: Coordinate) -> Result<RouteInstructions> {
        let timeout = Duration::from_millis(self.config.request_timeout_ms);
        match tokio::time::timeout(timeout, self.provider.request_route(start, end)).await {
            Ok(result) => result,
            Err(_) => Err(RouteError::Timeout {
                after_ms: self.config.request_timeout_ms,
            }),
        }
    }
}

fn validate_endpoints(start: &Coordinate, end: &Coordinate) -> Result<()> {
    if !start.is_finite() {
        return Err(RouteError::InvalidInput {
            message: format!(
                "start coordinate is not finite: ({}, {})",
                start.latitude, start.longitude
            ),
        });
    }
    if !end.is_finite() {
        return Err(RouteError::InvalidInput {
            message: format!(
                "end coordinate is not finite: ({}, {})",
                end.latitude, end.longitude
            ),
        });
    }
    Ok(())
}

/// Shortest route by total distance; the earliest wins ties.
fn shortest(routes: Vec<RouteInstructions>) -> Option<RouteInstructions> {
    routes
        .into_iter()
        .reduce(|best, r| if r.distance_m < best.distance_m { r } else { best })
}
