// src/config.rs

use crate::error::ConfigError;
use crate::global_variables::{
    DEFAULT_CROSSING_MS, DEFAULT_GRID_SIZE, DEFAULT_RUN_SECONDS, DEFAULT_VEHICLE_COUNT,
    DWELL_MAX_MS, DWELL_MIN_MS, MAX_GRID_SIZE,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Timing of a traffic light's phase oscillator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Shortest dwell before a toggle, inclusive.
    pub dwell_min_ms: u64,
    /// Longest dwell before a toggle, inclusive.
    pub dwell_max_ms: u64,
    /// Seed for the oscillator's generator; drawn from the OS when absent.
    pub seed: Option<u64>,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            dwell_min_ms: DWELL_MIN_MS,
            dwell_max_ms: DWELL_MAX_MS,
            seed: None,
        }
    }
}

impl LightConfig {
    /// A light that always holds each phase for exactly `dwell_ms`.
    pub fn fixed(dwell_ms: u64) -> Self {
        Self {
            dwell_min_ms: dwell_ms,
            dwell_max_ms: dwell_ms,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dwell_min_ms == 0 || self.dwell_max_ms == 0 {
            return Err(ConfigError::ZeroDwell);
        }
        if self.dwell_min_ms > self.dwell_max_ms {
            return Err(ConfigError::InvertedDwellRange {
                min: self.dwell_min_ms,
                max: self.dwell_max_ms,
            });
        }
        Ok(())
    }

    /// Draws a dwell interval uniformly from the configured bounds. An
    /// inverted range collapses to its lower bound.
    pub fn draw_dwell<R: Rng>(&self, rng: &mut R) -> Duration {
        let max = self.dwell_max_ms.max(self.dwell_min_ms);
        let ms = rng.random_range(self.dwell_min_ms..=max);
        Duration::from_millis(ms)
    }
}

/// How a vehicle arriving on red waits for the light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GreenWait {
    /// Every vehicle waiting at the moment of a green toggle is released.
    #[default]
    Broadcast,
    /// Each green toggle releases a single waiter; others wait for a later green.
    SingleDelivery,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntersectionConfig {
    pub light: LightConfig,
    pub green_wait: GreenWait,
}

impl IntersectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.light.validate()
    }
}

/// Settings for the demo simulation driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub intersection: IntersectionConfig,
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub vehicle_count: u64,
    pub run_seconds: u64,
    /// Time a vehicle spends inside an intersection before departing.
    pub crossing_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            intersection: IntersectionConfig::default(),
            grid_rows: DEFAULT_GRID_SIZE,
            grid_cols: DEFAULT_GRID_SIZE,
            vehicle_count: DEFAULT_VEHICLE_COUNT,
            run_seconds: DEFAULT_RUN_SECONDS,
            crossing_ms: DEFAULT_CROSSING_MS,
        }
    }
}

impl SimulationConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let side = 1..=MAX_GRID_SIZE;
        if !side.contains(&self.grid_rows) || !side.contains(&self.grid_cols) {
            return Err(ConfigError::GridSize {
                rows: self.grid_rows,
                cols: self.grid_cols,
                max: MAX_GRID_SIZE,
            });
        }
        self.intersection.validate()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn default_dwell_bounds() {
        let config = LightConfig::default();
        assert_eq!(config.dwell_min_ms, 4000);
        assert_eq!(config.dwell_max_ms, 6000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn drawn_dwell_stays_in_bounds() {
        let config = LightConfig::default();
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..1000 {
            let dwell = config.draw_dwell(&mut rng);
            assert!(dwell >= Duration::from_millis(4000));
            assert!(dwell <= Duration::from_millis(6000));
        }
    }

    #[test]
    fn rejects_bad_ranges() {
        let inverted = LightConfig {
            dwell_min_ms: 10,
            dwell_max_ms: 5,
            seed: None,
        };
        assert_eq!(
            inverted.validate(),
            Err(ConfigError::InvertedDwellRange { min: 10, max: 5 })
        );
        assert_eq!(LightConfig::fixed(0).validate(), Err(ConfigError::ZeroDwell));
    }

    #[test]
    fn parses_partial_json() {
        let config = SimulationConfig::from_json(
            r#"{ "vehicle_count": 3, "intersection": { "green_wait": "single_delivery" } }"#,
        )
        .unwrap();
        assert_eq!(config.vehicle_count, 3);
        assert_eq!(config.run_seconds, DEFAULT_RUN_SECONDS);
        assert_eq!(config.intersection.green_wait, GreenWait::SingleDelivery);
        assert_eq!(config.intersection.light, LightConfig::default());
    }

    #[test]
    fn json_with_invalid_light_is_rejected() {
        let result = SimulationConfig::from_json(
            r#"{ "intersection": { "light": { "dwell_min_ms": 900, "dwell_max_ms": 100 } } }"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvertedDwellRange { min: 900, max: 100 })
        ));
    }

    #[test]
    fn grid_dimensions_are_bounded() {
        let result =
            SimulationConfig::from_json(r#"{ "grid_rows": 4294967295, "grid_cols": 4294967295 }"#);
        assert_eq!(
            result,
            Err(ConfigError::GridSize {
                rows: u32::MAX,
                cols: u32::MAX,
                max: MAX_GRID_SIZE,
            })
        );

        let empty = SimulationConfig {
            grid_cols: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            empty.validate(),
            Err(ConfigError::GridSize { cols: 0, .. })
        ));

        let largest = SimulationConfig {
            grid_rows: MAX_GRID_SIZE,
            grid_cols: MAX_GRID_SIZE,
            ..SimulationConfig::default()
        };
        assert_eq!(largest.validate(), Ok(()));
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }
}
