//! Admission control for road intersections shared by concurrently running
//! vehicles.
//!
//! Each [`Intersection`] owns a [`TrafficLight`] and a queue of waiting
//! vehicles. Vehicles call [`Intersection::enter`] from their own task and
//! are admitted one at a time, in arrival order, once the light has been
//! green for them.

pub mod communication;
pub mod config;
pub mod control_system;
pub mod error;
pub mod global_variables;
pub mod simulation_engine;

pub use communication::Channel;
pub use config::{GreenWait, IntersectionConfig, LightConfig, SimulationConfig};
pub use control_system::{Phase, TrafficLight};
pub use error::{ConfigError, ControlError};
pub use simulation_engine::intersection::{Intersection, IntersectionId, Occupancy};
pub use simulation_engine::streets::{Street, StreetId};
pub use simulation_engine::vehicles::{Vehicle, VehicleId, VehicleType};
