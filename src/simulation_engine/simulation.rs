// simulation.rs
use crate::config::SimulationConfig;
use crate::error::ControlError;
use crate::simulation_engine::grid::TrafficGrid;
use crate::simulation_engine::vehicles::{Vehicle, VehicleType};

use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Totals gathered over one simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub vehicles_spawned: u64,
    pub crossings: u64,
}

fn random_vehicle_type<R: Rng>(rng: &mut R) -> VehicleType {
    let rand_val: f64 = rng.random_range(0.0..1.0);
    if rand_val < 0.50 {
        VehicleType::Car
    } else if rand_val < 0.81 {
        VehicleType::Truck
    } else if rand_val < 0.99 {
        VehicleType::Bus
    } else {
        VehicleType::EmergencyVan
    }
}

/// Drives a vehicle from intersection to intersection until an intersection
/// turns it away.
///
/// At each intersection the vehicle waits to be admitted, crosses, reports
/// its departure and then picks a random outgoing street other than the one
/// it arrived on.
async fn simulate_vehicle_journey(
    vehicle: Vehicle,
    grid: Arc<TrafficGrid>,
    crossing: Duration,
    crossings: Arc<AtomicU64>,
) {
    let mut rng = SmallRng::from_os_rng();
    let Some(mut street) = grid.streets().choose(&mut rng).cloned() else {
        return;
    };
    let mut heading = street.to;

    loop {
        sleep(Duration::from_millis(rng.random_range(200..1000))).await;

        let Some(intersection) = grid.intersection(heading) else {
            log::warn!("Vehicle {} drove off the grid at {}", vehicle, heading);
            break;
        };

        if let Err(err) = intersection.enter(&vehicle).await {
            log::info!(
                "Vehicle {} leaves the simulation at intersection {}: {}",
                vehicle,
                heading,
                err
            );
            break;
        }

        sleep(crossing).await;
        let outgoing = intersection.adjacent_streets(street.id);
        if let Err(err) = intersection.depart(&vehicle) {
            log::error!("Vehicle {}: {}", vehicle, err);
            break;
        }
        crossings.fetch_add(1, Ordering::Relaxed);

        // Dead end: turn around on the incoming street.
        if let Some(next) = outgoing.choose(&mut rng) {
            street = next.clone();
        }
        heading = match street.other_end(intersection.id()) {
            Some(next) => next,
            None => break,
        };
    }
}

/// Builds a grid, lets vehicles roam it for the configured time, then stops
/// every intersection and waits for all vehicles to leave.
pub async fn run_simulation(config: SimulationConfig) -> Result<SimulationReport, ControlError> {
    let grid = Arc::new(TrafficGrid::new(
        config.grid_rows,
        config.grid_cols,
        &config.intersection,
    ));
    grid.start_all()?;
    log::info!(
        "Simulation started: {}x{} grid, {} vehicles",
        config.grid_rows,
        config.grid_cols,
        config.vehicle_count
    );

    let crossings = Arc::new(AtomicU64::new(0));
    let crossing = Duration::from_millis(config.crossing_ms);
    let mut rng = SmallRng::from_os_rng();
    let mut journeys = Vec::new();

    for id in 0..config.vehicle_count {
        let vehicle = Vehicle::new(id, random_vehicle_type(&mut rng));
        log::debug!("Spawned vehicle {}", vehicle);
        journeys.push(tokio::spawn(simulate_vehicle_journey(
            vehicle,
            Arc::clone(&grid),
            crossing,
            Arc::clone(&crossings),
        )));
        sleep(Duration::from_millis(rng.random_range(50..300))).await;
    }

    sleep(Duration::from_secs(config.run_seconds)).await;
    grid.stop_all().await;

    for journey in journeys {
        if let Err(err) = journey.await {
            log::error!("Vehicle task failed: {}", err);
        }
    }

    let report = SimulationReport {
        vehicles_spawned: config.vehicle_count,
        crossings: crossings.load(Ordering::Relaxed),
    };
    log::info!(
        "Simulation finished: {} crossings by {} vehicles",
        report.crossings,
        report.vehicles_spawned
    );
    Ok(report)
}
