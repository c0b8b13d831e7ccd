//! morphevo CLI - Run evolution cycles from a JSON configuration.

use std::fs;
use std::path::PathBuf;

use morphevo::{
    evolve::{fitness, EvolutionEngine, PopulationStore},
    scene::HeadlessScene,
    schema::EngineConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [cycles]", args[0]);
        eprintln!();
        eprintln!("Evolve quadruped morphologies with the headless stand-in scene.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to engine configuration file");
        eprintln!("  cycles       Number of create-or-continue cycles (default: 1)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let cycles: u32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1);

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: EngineConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    let store = match &config.store_path {
        Some(path) => PopulationStore::open(path, config.population_size),
        None => PopulationStore::open_in_memory(config.population_size),
    }
    .unwrap_or_else(|e| {
        eprintln!("Error opening population store: {}", e);
        std::process::exit(1);
    });

    let mut engine = EvolutionEngine::new(store, HeadlessScene::new(), config)
        .unwrap_or_else(|e| {
            eprintln!("Error creating engine: {}", e);
            std::process::exit(1);
        });

    println!("morphevo");
    println!("========");
    println!(
        "Resuming from generation {}",
        engine.current_generation().unwrap_or(0)
    );
    println!();

    for _ in 0..cycles {
        let generation = match engine.create_or_continue() {
            Ok(g) => g,
            Err(e) => {
                eprintln!("Cycle failed: {}", e);
                std::process::exit(1);
            }
        };

        println!("Generation {}:", generation);
        match engine.store().get_by_generation(generation) {
            Ok(members) => {
                for creature in members {
                    let score = fitness::score(Some(creature.distance_traveled));
                    println!(
                        "  {:<14} distance={:>8.3}  fitness={:>10.3}",
                        creature.model_name, creature.distance_traveled, score
                    );
                }
            }
            Err(e) => eprintln!("  could not read generation: {}", e),
        }
        println!();
    }
}

fn print_example_config() {
    let example = EngineConfig {
        store_path: Some(PathBuf::from("population.db")),
        random_seed: Some(42),
        ..Default::default()
    };
    println!("{}", serde_json::to_string_pretty(&example).unwrap());
}
