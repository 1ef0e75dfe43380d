use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub u64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Different types of vehicles in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VehicleType {
    #[default]
    Car,
    Bus,
    Truck,
    EmergencyVan,
}

/// A vehicle travelling through the network. Intersections only look at its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub vehicle_type: VehicleType,
}

impl Vehicle {
    pub fn new(id: u64, vehicle_type: VehicleType) -> Self {
        Self {
            id: VehicleId(id),
            vehicle_type,
        }
    }

    pub fn car(id: u64) -> Self {
        Self::new(id, VehicleType::Car)
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} {}", self.vehicle_type, self.id)
    }
}
