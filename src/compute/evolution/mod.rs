//! Evolutionary search over interaction-network genomes.
//!
//! # Overview
//!
//! - **Genome Operations** (`genome`): Random generation, crossover, and mutation
//! - **Fitness** (`fitness`): The evaluator seam and the external-simulator evaluator
//! - **Niching** (`niching`): Fitness sharing by genome distance
//! - **Selection** (`selection`): Lexicase parent selection
//! - **Search** (`search`): The generational loop
//! - **Archive** (`archive`): Summary files, final population and JSON result
//!
//! # Example
//!
//! ```rust,no_run
//! use eco_search::compute::evolution::{EvolutionEngine, SimulatorEvaluator};
//! use eco_search::schema::EvolutionConfig;
//!
//! let config = EvolutionConfig::default();
//! let evaluator = SimulatorEvaluator::new(&config).unwrap();
//! let mut engine = EvolutionEngine::new(config, evaluator).unwrap();
//! let result = engine
//!     .run_with_callback(|progress| {
//!         println!("Generation {}/{}", progress.generation, progress.total_generations);
//!     })
//!     .unwrap();
//!
//! for scored in &result.final_population {
//!     println!("{}", scored.fitness);
//! }
//! ```

mod archive;
mod fitness;
mod genome;
mod niching;
mod search;
mod selection;

pub use archive::{
    AVERAGE_FITNESS_FILE, FINAL_POPULATION_FILE, MAX_FITNESS_FILE, RESULT_FILE, RunArchive,
    format_individual, run_header,
};
pub use fitness::{EvaluationError, FitnessEvaluator, OutputError, SimulatorEvaluator};
pub use genome::{GenomeRng, genome_distance};
pub use niching::{apply_sharing, niche_counts};
pub use search::{EvolutionEngine, EvolutionError};
pub use selection::{Candidate, select_one};
