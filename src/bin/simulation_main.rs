// simulation_main.rs
use rts_intersection::config::SimulationConfig;
use rts_intersection::simulation_engine::simulation::run_simulation;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    env_logger::init();

    // Optional JSON config path as the only argument.
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => match SimulationConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Invalid configuration: {}", e);
                std::process::exit(1);
            }
        },
        None => SimulationConfig::default(),
    };

    match run_simulation(config).await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize report: {}", e),
        },
        Err(e) => {
            eprintln!("Simulation failed: {}", e);
            std::process::exit(1);
        }
    }
}
