//! Eco Search CLI - Run an evolutionary search from JSON configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use eco_search::{
    compute::evolution::{EvolutionEngine, SimulatorEvaluator},
    schema::EvolutionConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [output_dir]", args[0]);
        eprintln!();
        eprintln!("Evolve ecological interaction networks against an external simulator.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to evolution configuration file");
        eprintln!("  output_dir   Directory for summaries and the final population");
        eprintln!("               (overrides output_dir in the configuration)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: EvolutionConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });
    if let Some(dir) = args.get(2) {
        config.output_dir = Some(PathBuf::from(dir));
    }
    if config.output_dir.is_none() {
        config.output_dir = Some(PathBuf::from("."));
    }

    let evaluator = SimulatorEvaluator::new(&config).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    println!("Eco Search");
    println!("==========");
    println!(
        "Population: {} x {} generations",
        config.population.size, config.population.max_generations
    );
    println!(
        "Network: {:?} ({} species)",
        config.network.scheme, config.simulator.species_count
    );
    println!("Simulator: {}", config.simulator.binary.display());
    println!(
        "Objectives: {}",
        config
            .objectives
            .iter()
            .map(|o| o.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();

    let mut engine = EvolutionEngine::new(config.clone(), evaluator).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let start = Instant::now();
    let result = engine
        .run_with_callback(|progress| {
            println!(
                "  Generation {}/{}: diversity={:.4}, failed={}",
                progress.generation,
                progress.total_generations,
                progress.summary.diversity,
                progress.summary.failed
            );
        })
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    println!();
    println!("Stopped: {:?}", result.stats.stop_reason);
    println!(
        "Evaluations: {} in {:.2}s",
        result.stats.total_evaluations,
        start.elapsed().as_secs_f32()
    );
    if let Some(dir) = &config.output_dir {
        println!("Output: {}", dir.display());
    }
}

fn print_example_config() {
    let config = EvolutionConfig::default();

    match serde_json::to_string_pretty(&config) {
        Ok(json) => {
            println!("Example configuration (config.json):");
            println!("{}", json);
        }
        Err(e) => {
            eprintln!("Error serializing example config: {}", e);
            std::process::exit(1);
        }
    }
}
