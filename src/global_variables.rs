// Traffic light dwell bounds (milliseconds)
pub const DWELL_MIN_MS: u64 = 4000;
pub const DWELL_MAX_MS: u64 = 6000;

// Demo simulation defaults
pub const DEFAULT_GRID_SIZE: u32 = 2;
pub const MAX_GRID_SIZE: u32 = 64;
pub const DEFAULT_VEHICLE_COUNT: u64 = 12;
pub const DEFAULT_RUN_SECONDS: u64 = 30;
pub const DEFAULT_CROSSING_MS: u64 = 300;
