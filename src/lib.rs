//! Eco Search - Evolutionary search over ecological interaction networks.
//!
//! Genomes describe an ecosystem's abiotic settings plus the parameters of a
//! Klemm–Eguíluz network generator. Each genome becomes a signed, weighted
//! species interaction matrix, an external ecology simulator scores it on
//! several objectives, and lexicase selection with optional fitness sharing
//! drives the population.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, genome layout and fitness record types
//! - `compute`: Network construction and the evolutionary search
//!
//! # Example
//!
//! ```rust
//! use eco_search::{
//!     compute::NetworkGenerator,
//!     schema::{CommunityParams, NetworkConfig, NetworkParams},
//! };
//!
//! let generator = NetworkGenerator::new(NetworkConfig::default(), 9);
//! let matrix = generator.generate(&NetworkParams::Community(CommunityParams {
//!     clique_size: 3,
//!     clique_linkage: 0.5,
//!     muw: 0.2,
//!     beta: 1.5,
//!     pct_pos_in: 0.7,
//!     pct_pos_out: 0.3,
//! }));
//!
//! assert_eq!(matrix.size(), 9);
//! println!("connectance: {:.3}", matrix.connectance());
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, SimulatorEvaluator};
pub use compute::{InteractionMatrix, NetworkGenerator};
pub use schema::{EvolutionConfig, FitnessRecord, Genome, GenomeSchema};
