// simulation_engine/mod.rs
pub mod grid;
pub mod intersection;
pub mod simulation;
pub mod streets;
pub mod vehicles;
pub mod waiting_vehicles;
