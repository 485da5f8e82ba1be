//! Network-generation and simulator invocation settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Network construction scheme; selects the structural gene layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkScheme {
    /// Klemm–Eguíluz with uniform [-1, 1] weights.
    Klemm,
    /// Klemm–Eguíluz with evolvable clipped Gaussian weights.
    KlemmGaussian,
    /// Klemm–Eguíluz topology with community-biased edge signs.
    #[default]
    KlemmCommunity,
}

/// How genomes become interaction matrices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub scheme: NetworkScheme,
    /// Seed used for every matrix; identical genomes give identical matrices.
    #[serde(default)]
    pub seed: u64,
    /// Off-diagonal connectance to enforce after construction.
    #[serde(default)]
    pub target_connectance: Option<f64>,
    /// Constant written on the diagonal.
    #[serde(default)]
    pub self_interaction: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            scheme: NetworkScheme::default(),
            seed: 0,
            target_connectance: None,
            self_interaction: 0.0,
        }
    }
}

/// External simulator binary and the fixed world settings passed to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Path to the simulator executable.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    /// Number of species (matrix side).
    #[serde(default = "default_species_count")]
    pub species_count: usize,
    #[serde(default = "default_world_size")]
    pub world_x: usize,
    #[serde(default = "default_world_size")]
    pub world_y: usize,
    #[serde(default = "default_updates")]
    pub updates: usize,
    /// Per-cell population cap.
    #[serde(default = "default_max_pop")]
    pub max_pop: u64,
    /// Group reproduction threshold.
    #[serde(default = "default_repro_threshold")]
    pub repro_threshold: u64,
    /// Simulator seed; replicate `r` runs with `seed + r`.
    #[serde(default)]
    pub seed: Option<i64>,
    /// Stochastic replicates per genome.
    #[serde(default = "default_replicates")]
    pub replicates: usize,
    /// Directory the simulator runs in and writes its tables to.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default = "default_matrix_file")]
    pub matrix_file: String,
    /// Time-series table with running means.
    #[serde(default = "default_data_file")]
    pub data_file: String,
    /// Single-row table of bounded scores.
    #[serde(default = "default_scores_file")]
    pub scores_file: String,
    /// Skip the simulator for all-zero matrices.
    #[serde(default = "default_skip_degenerate")]
    pub skip_degenerate: bool,
    /// Concurrent evaluations, each in its own subdirectory (0 or 1 = sequential).
    #[serde(default)]
    pub parallel_workers: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            species_count: default_species_count(),
            world_x: default_world_size(),
            world_y: default_world_size(),
            updates: default_updates(),
            max_pop: default_max_pop(),
            repro_threshold: default_repro_threshold(),
            seed: None,
            replicates: default_replicates(),
            work_dir: default_work_dir(),
            matrix_file: default_matrix_file(),
            data_file: default_data_file(),
            scores_file: default_scores_file(),
            skip_degenerate: default_skip_degenerate(),
            parallel_workers: 0,
        }
    }
}

fn default_binary() -> PathBuf {
    PathBuf::from("./chemical-ecology")
}
fn default_species_count() -> usize {
    9
}
fn default_world_size() -> usize {
    10
}
fn default_updates() -> usize {
    1000
}
fn default_max_pop() -> u64 {
    10_000
}
fn default_repro_threshold() -> u64 {
    100_000_000
}
fn default_replicates() -> usize {
    1
}
fn default_work_dir() -> PathBuf {
    PathBuf::from("eval")
}
fn default_matrix_file() -> String {
    "interaction_matrix.dat".to_string()
}
fn default_data_file() -> String {
    "a-eco_data.csv".to_string()
}
fn default_scores_file() -> String {
    "scores.csv".to_string()
}
fn default_skip_degenerate() -> bool {
    true
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(target) = self.target_connectance
            && !(0.0..=1.0).contains(&target)
        {
            return Err(ConfigError::InvalidConnectance(target));
        }
        if !self.self_interaction.is_finite() {
            return Err(ConfigError::InvalidSelfInteraction(self.self_interaction));
        }
        Ok(())
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.species_count == 0 {
            return Err(ConfigError::NoSpecies);
        }
        if self.world_x == 0 || self.world_y == 0 {
            return Err(ConfigError::InvalidWorld);
        }
        if self.replicates == 0 {
            return Err(ConfigError::NoReplicates);
        }
        for name in [&self.matrix_file, &self.data_file, &self.scores_file] {
            if name.is_empty() {
                return Err(ConfigError::EmptyFileName);
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Species count must be non-zero")]
    NoSpecies,
    #[error("World dimensions must be non-zero")]
    InvalidWorld,
    #[error("At least one replicate per genome is required")]
    NoReplicates,
    #[error("Simulator file names must be non-empty")]
    EmptyFileName,
    #[error("Target connectance {0} must lie in [0, 1]")]
    InvalidConnectance(f64),
    #[error("Self-interaction {0} must be finite")]
    InvalidSelfInteraction(f64),
}
