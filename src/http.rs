//! HTTP client for an OSRM-compatible routing service.
//!
//! - Connection pooling through a shared reqwest [`Client`]
//! - Retry with exponential backoff on 429 and transport errors
//! - Every failure surfaces as a [`RouteError`]; the planner decides what a
//!   failed leg means

use std::future::Future;
use std::time::{Duration, Instant};

use log::{debug, warn};
use reqwest::Client;

use crate::gateway::{osrm_route_url, parse_osrm_response, RouteProvider};
use crate::{Coordinate, Result, RouteError, RouteInstructions};

/// Public demo server; fine for development, rate limited in production.
pub const DEFAULT_OSRM_BASE_URL: &str = "https://router.project-osrm.org/route/v1/driving/";

const MAX_RETRIES: u32 = 2;
const MAX_IDLE_PER_HOST: usize = 8;

/// Routing provider backed by the OSRM `route` HTTP API.
///
/// Each candidate leg is one request. Against the public server, pair the
/// client with a `PlannerConfig::max_waypoint_pairs` cap (a few hundred
/// pairs) so long trips stay within its rate limit.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    client: Client,
    base_url: String,
}

impl OsrmClient {
    /// Client against the public OSRM demo server.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(DEFAULT_OSRM_BASE_URL, timeout)
    }

    /// Client against a self-hosted OSRM profile endpoint.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .timeout(timeout)
            .build()
            .map_err(|e| RouteError::HttpError {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_route(&self, start: Coordinate, end: Coordinate) -> Result<RouteInstructions> {
        let url = osrm_route_url(&self.base_url, start, end);
        let started = Instant::now();
        let mut retries = 0;

        loop {
            match self.client.get(&url).send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                        retries += 1;
                        let backoff = Duration::from_millis(500 * (1 << retries));
                        warn!("[Osrm] 429, retry {} after {:?}", retries, backoff);
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    // OSRM answers "NoRoute" with 400 and a JSON body; let the
                    // body parser report it when there is one.
                    let body = resp.text().await.map_err(|e| RouteError::HttpError {
                        message: format!("Failed to read body: {}", e),
                        status_code: Some(status.as_u16()),
                    })?;

                    if !status.is_success() {
                        return match parse_osrm_response(&body) {
                            Err(err @ RouteError::NoRouteFound { .. }) => Err(err),
                            _ => Err(RouteError::HttpError {
                                message: format!("HTTP {}", status),
                                status_code: Some(status.as_u16()),
                            }),
                        };
                    }

                    let route = parse_osrm_response(&body)?;
                    debug!(
                        "[Osrm] Route {:.0}m / {:.0}s with {} steps in {:?}",
                        route.distance_m,
                        route.duration_s,
                        route.steps.len(),
                        started.elapsed()
                    );
                    return Ok(route);
                }
                Err(e) if e.is_timeout() => {
                    return Err(RouteError::Timeout {
                        after_ms: started.elapsed().as_millis() as u64,
                    });
                }
                Err(e) => {
                    if retries >= MAX_RETRIES {
                        return Err(RouteError::HttpError {
                            message: format!("Request error: {}", e),
                            status_code: e.status().map(|s| s.as_u16()),
                        });
                    }
                    retries += 1;
                    let backoff = Duration::from_millis(250 * (1 << retries));
                    warn!("[Osrm] Request error: {}, retry {} after {:?}", e, retries, backoff);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

impl RouteProvider for OsrmClient {
    fn request_route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> impl Future<Output = Result<RouteInstructions>> + Send {
        self.fetch_route(start, end)
    }
}
