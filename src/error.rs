//! Unified error handling for the flood-router library.
//!
//! Only [`RouteError::InvalidInput`] and [`RouteError::LocationNotFound`] reach
//! callers of the planners. Provider failures (`NoRouteFound`, `HttpError`,
//! `Timeout`, `ParseError`) are caught by the orchestrator and turned into a
//! fallback route or a rejected candidate.

use std::fmt;

/// Unified error type for flood-router operations.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteError {
    /// Missing or non-finite coordinates, blank location queries
    InvalidInput { message: String },
    /// A location name or graph node id could not be resolved
    LocationNotFound { query: String },
    /// The routing service returned no usable route
    NoRouteFound { message: String },
    /// HTTP transport or status failure
    HttpError {
        message: String,
        status_code: Option<u16>,
    },
    /// A routing request did not finish within the configured timeout
    Timeout { after_ms: u64 },
    /// The routing service returned a body we could not decode
    ParseError { message: String },
    /// Configuration error
    ConfigError { message: String },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidInput { message } => {
                write!(f, "Invalid input: {}", message)
            }
            RouteError::LocationNotFound { query } => {
                write!(f, "Location '{}' could not be found", query)
            }
            RouteError::NoRouteFound { message } => {
                write!(f, "No route found: {}", message)
            }
            RouteError::HttpError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
            RouteError::Timeout { after_ms } => {
                write!(f, "Routing request timed out after {} ms", after_ms)
            }
            RouteError::ParseError { message } => {
                write!(f, "Failed to parse routing response: {}", message)
            }
            RouteError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
        }
    }
}

impl std::error::Error for RouteError {}

impl RouteError {
    /// Whether the orchestrator should swallow this error and degrade
    /// (fallback route or skipped candidate) instead of returning it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RouteError::NoRouteFound { .. }
                | RouteError::HttpError { .. }
                | RouteError::Timeout { .. }
                | RouteError::ParseError { .. }
        )
    }
}

/// Result type alias for flood-router operations.
pub type Result<T> = std::result::Result<T, RouteError>;

/// Extension trait for converting Option to RouteError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an invalid input error.
    fn ok_or_invalid_input(self, message: &str) -> Result<T>;

    /// Convert Option to Result with a location-not-found error.
    fn ok_or_location_not_found(self, query: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid_input(self, message: &str) -> Result<T> {
        self.ok_or_else(|| RouteError::InvalidInput {
            message: message.to_string(),
        })
    }

    fn ok_or_location_not_found(self, query: &str) -> Result<T> {
        self.ok_or_else(|| RouteError::LocationNotFound {
            query: query.to_string(),
        })
    }
}
