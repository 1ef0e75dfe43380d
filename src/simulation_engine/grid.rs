use crate::config::IntersectionConfig;
use crate::error::ControlError;
use crate::simulation_engine::intersection::{Intersection, IntersectionId};
use crate::simulation_engine::streets::{Street, StreetId};
use std::sync::Arc;

/// A rectangular grid of intersections joined by two-way streets.
///
/// Intersections and streets live in flat vectors and are looked up by id;
/// intersection `(row, col)` has id `row * cols + col`.
pub struct TrafficGrid {
    pub rows: u32,
    pub cols: u32,
    intersections: Vec<Arc<Intersection>>,
    streets: Vec<Street>,
}

impl TrafficGrid {
    /// `rows * cols` must fit in a `u32`; [`crate::SimulationConfig::validate`]
    /// keeps both sides small.
    pub fn new(rows: u32, cols: u32, config: &IntersectionConfig) -> Self {
        let intersections: Vec<_> = (0..rows * cols)
            .map(|id| {
                let mut config = config.clone();
                // Keep seeded lights from toggling in lockstep.
                config.light.seed = config.light.seed.map(|seed| seed.wrapping_add(id as u64));
                Arc::new(Intersection::with_config(IntersectionId(id), config))
            })
            .collect();

        let mut grid = Self {
            rows,
            cols,
            intersections,
            streets: Vec::new(),
        };

        // Horizontal streets: (row, col) <-> (row, col + 1)
        for row in 0..rows {
            for col in 0..cols.saturating_sub(1) {
                grid.connect(grid.id_at(row, col), grid.id_at(row, col + 1));
            }
        }
        // Vertical streets: (row, col) <-> (row + 1, col)
        for col in 0..cols {
            for row in 0..rows.saturating_sub(1) {
                grid.connect(grid.id_at(row, col), grid.id_at(row + 1, col));
            }
        }
        grid
    }

    fn connect(&mut self, from: IntersectionId, to: IntersectionId) {
        let street = Street::new(self.streets.len() as u32, from, to);
        for end in [from, to] {
            if let Some(intersection) = self.intersection(end) {
                intersection.add_street(street.clone());
            }
        }
        self.streets.push(street);
    }

    pub fn id_at(&self, row: u32, col: u32) -> IntersectionId {
        IntersectionId(row * self.cols + col)
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&Arc<Intersection>> {
        self.intersections.get(id.0 as usize)
    }

    pub fn intersections(&self) -> &[Arc<Intersection>] {
        &self.intersections
    }

    pub fn street(&self, id: StreetId) -> Option<&Street> {
        self.streets.get(id.0 as usize)
    }

    pub fn streets(&self) -> &[Street] {
        &self.streets
    }

    pub fn start_all(&self) -> Result<(), ControlError> {
        for intersection in &self.intersections {
            intersection.start()?;
        }
        Ok(())
    }

    pub async fn stop_all(&self) {
        for intersection in &self.intersections {
            intersection.stop().await;
        }
    }
}
