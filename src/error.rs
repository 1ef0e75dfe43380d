use crate::simulation_engine::intersection::IntersectionId;
use crate::simulation_engine::vehicles::VehicleId;

/// Failures of the admission and signaling core.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("Attempted to release the head of an empty waiting queue")]
    EmptyQueueRelease,
    #[error("Completion signal was fulfilled more than once")]
    DoubleFulfillment,
    #[error("Waiting side of the completion signal was dropped before release")]
    ReceiverDropped,
    #[error("Intersection must be started before vehicles can enter")]
    NotStarted,
    #[error("Background task is already running")]
    AlreadyStarted,
    #[error("Stopped while waiting")]
    Stopped,
    #[error("Vehicle {vehicle} reported departure from intersection {intersection} it does not occupy")]
    UnexpectedDeparture {
        intersection: IntersectionId,
        vehicle: VehicleId,
    },
}

/// Invalid configuration values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Dwell interval lower bound {min} ms exceeds upper bound {max} ms")]
    InvertedDwellRange { min: u64, max: u64 },
    #[error("Dwell interval bounds must be positive")]
    ZeroDwell,
    #[error("Grid of {rows}x{cols} intersections is outside 1..={max} per side")]
    GridSize { rows: u32, cols: u32, max: u32 },
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
