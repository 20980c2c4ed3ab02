//! Error types for the race simulation.

use std::fmt;

/// Result type for simulation setup and command handling.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors surfaced at construction time or at the collaborator boundary.
///
/// Per-tick physics never returns these; broken invariants inside a tick are
/// programming errors and panic in every build.
#[derive(Debug)]
pub enum SimError {
    /// An AI vehicle was given no waypoints.
    EmptyWaypoints,
    /// A waypoint coordinate is not a finite number.
    InvalidWaypoint {
        /// Position of the waypoint in the source list.
        index: usize,
        x: f64,
        y: f64,
    },
    /// Attempted to normalize a vector of zero length.
    ZeroLengthVector,
    /// A command referenced a vehicle that does not exist.
    UnknownVehicle(String),
    /// A command referenced a vehicle that cannot take player input.
    NotPlayerControlled(String),
    /// Two vehicles were registered under the same name.
    DuplicateVehicle(String),
    /// Configuration could not be interpreted.
    Config {
        /// Where the configuration came from.
        path: String,
        /// Description of the problem.
        message: String,
    },
    /// Filesystem error while reading configuration.
    Io(std::io::Error),
    /// Malformed JSON (configuration or collaborator message).
    Json(serde_json::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::EmptyWaypoints => write!(f, "waypoint list is empty"),
            SimError::InvalidWaypoint { index, x, y } => {
                write!(f, "waypoint {index} is not finite: ({x}, {y})")
            }
            SimError::ZeroLengthVector => write!(f, "cannot normalize a zero-length vector"),
            SimError::UnknownVehicle(name) => write!(f, "no vehicle named {name}"),
            SimError::NotPlayerControlled(name) => {
                write!(f, "vehicle {name} is not player controlled")
            }
            SimError::DuplicateVehicle(name) => write!(f, "vehicle {name} already exists"),
            SimError::Config { path, message } => {
                write!(f, "invalid config {path}: {message}")
            }
            SimError::Io(e) => write!(f, "io error: {e}"),
            SimError::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Io(e) => Some(e),
            SimError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Io(e)
    }
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::Json(e)
    }
}
