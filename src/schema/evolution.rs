//! Evolution configuration types for interaction-network search.
//!
//! This module provides the run configuration (population, variation,
//! niching, gene bounds, simulator and network settings) together with the
//! progress and result types reported by the evolution engine.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{
    ConfigError, FitnessRecord, Genome, GenomeSchema, NetworkConfig, Objective, SchemaError,
    SimulatorConfig, default_objectives,
};

/// Top-level configuration for an evolutionary run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Crossover and mutation settings.
    #[serde(default)]
    pub genetic: GeneticAlgorithmConfig,
    /// Fitness sharing settings.
    #[serde(default)]
    pub niching: NichingConfig,
    /// Per-gene bounds.
    #[serde(default)]
    pub constraints: GenomeConstraints,
    /// Network construction settings.
    #[serde(default)]
    pub network: NetworkConfig,
    /// External simulator settings.
    #[serde(default)]
    pub simulator: SimulatorConfig,
    /// Objectives read from the simulator output.
    #[serde(default = "default_objectives")]
    pub objectives: Vec<Objective>,
    /// Where summaries and the final population are written.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            genetic: GeneticAlgorithmConfig::default(),
            niching: NichingConfig::default(),
            constraints: GenomeConstraints::default(),
            network: NetworkConfig::default(),
            simulator: SimulatorConfig::default(),
            objectives: default_objectives(),
            output_dir: None,
            random_seed: None,
        }
    }
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Number of generations before the final evaluation.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_max_generations() -> usize {
    100
}

/// Variation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticAlgorithmConfig {
    /// Probability that a parent pair swaps structural genes.
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Standard deviation of Gaussian mutation on continuous genes.
    #[serde(default = "default_mutation_strength")]
    pub mutation_strength: f64,
    /// Per-gene mutation probability; `None` means `1 / gene_count`.
    #[serde(default)]
    pub mutation_rate: Option<f64>,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            crossover_rate: default_crossover_rate(),
            mutation_strength: default_mutation_strength(),
            mutation_rate: None,
        }
    }
}

fn default_crossover_rate() -> f64 {
    0.9
}
fn default_mutation_strength() -> f64 {
    0.1
}

/// Fitness sharing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NichingConfig {
    /// Apply sharing before selection.
    #[serde(default)]
    pub enabled: bool,
    /// Niche radius; `None` means `population_size / 2`.
    #[serde(default)]
    pub radius: Option<f64>,
    /// Shape exponent of the sharing function.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Divisor applied to structural genes before measuring distance.
    #[serde(default = "default_structural_scale")]
    pub structural_scale: f64,
    /// Treatment of negative objective values.
    #[serde(default)]
    pub negative_values: NegativeSharing,
}

impl Default for NichingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: None,
            alpha: default_alpha(),
            structural_scale: default_structural_scale(),
            negative_values: NegativeSharing::default(),
        }
    }
}

impl NichingConfig {
    /// Niche radius for a population of the given size.
    pub fn radius_for(&self, population_size: usize) -> f64 {
        self.radius
            .unwrap_or_else(|| (population_size as f64 / 2.0).max(f64::MIN_POSITIVE))
    }
}

fn default_alpha() -> f64 {
    1.0
}
fn default_structural_scale() -> f64 {
    10.0
}

/// How sharing treats objectives whose value is negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeSharing {
    /// Divide like every other value; moves negatives toward zero.
    #[default]
    Divide,
    /// Multiply negatives by the share so crowding always lowers fitness.
    Penalize,
}

/// Genome constraints (parameter bounds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeConstraints {
    #[serde(default = "default_unit_bounds")]
    pub diffusion_bounds: (f64, f64),
    #[serde(default = "default_unit_bounds")]
    pub seeding_bounds: (f64, f64),
    #[serde(default = "default_unit_bounds")]
    pub clear_bounds: (f64, f64),
    /// Inclusive clique size range; the upper end may not exceed the species count.
    #[serde(default = "default_clique_size_bounds")]
    pub clique_size_bounds: (usize, usize),
    #[serde(default = "default_unit_bounds")]
    pub clique_linkage_bounds: (f64, f64),
    #[serde(default = "default_weight_mean_bounds")]
    pub weight_mean_bounds: (f64, f64),
    #[serde(default = "default_unit_bounds")]
    pub weight_sigma_bounds: (f64, f64),
    #[serde(default = "default_unit_bounds")]
    pub muw_bounds: (f64, f64),
    #[serde(default = "default_beta_bounds")]
    pub beta_bounds: (f64, f64),
    #[serde(default = "default_sign_bounds")]
    pub pct_pos_in_bounds: (f64, f64),
    #[serde(default = "default_sign_bounds")]
    pub pct_pos_out_bounds: (f64, f64),
}

impl Default for GenomeConstraints {
    fn default() -> Self {
        Self {
            diffusion_bounds: default_unit_bounds(),
            seeding_bounds: default_unit_bounds(),
            clear_bounds: default_unit_bounds(),
            clique_size_bounds: default_clique_size_bounds(),
            clique_linkage_bounds: default_unit_bounds(),
            weight_mean_bounds: default_weight_mean_bounds(),
            weight_sigma_bounds: default_unit_bounds(),
            muw_bounds: default_unit_bounds(),
            beta_bounds: default_beta_bounds(),
            pct_pos_in_bounds: default_sign_bounds(),
            pct_pos_out_bounds: default_sign_bounds(),
        }
    }
}

fn default_unit_bounds() -> (f64, f64) {
    (0.0, 1.0)
}
fn default_clique_size_bounds() -> (usize, usize) {
    (1, 9)
}
fn default_weight_mean_bounds() -> (f64, f64) {
    (-1.0, 1.0)
}
fn default_beta_bounds() -> (f64, f64) {
    (0.0, 3.0)
}
fn default_sign_bounds() -> (f64, f64) {
    (0.0, 0.75)
}

// ============================================================================
// Progress and results
// ============================================================================

/// Mean and max of one objective over a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveSummary {
    pub name: String,
    pub mean: f64,
    pub max: f64,
}

/// Summary statistics recorded once per generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: usize,
    pub objectives: Vec<ObjectiveSummary>,
    /// Mean pairwise genome distance.
    pub diversity: f64,
    /// Individuals whose evaluation produced the sentinel record.
    pub failed: usize,
}

/// Per-generation history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionHistory {
    pub generations: Vec<GenerationSummary>,
}

/// Progress report passed to callbacks after each generation.
#[derive(Debug, Clone)]
pub struct EvolutionProgress {
    pub generation: usize,
    pub total_generations: usize,
    pub summary: GenerationSummary,
}

/// A genome together with its final fitness record.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredGenome {
    pub genome: Genome,
    pub fitness: FitnessRecord,
}

/// Run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations completed before the final evaluation.
    pub generations: usize,
    /// Genomes evaluated, final pass included.
    pub total_evaluations: u64,
    pub elapsed_seconds: f64,
    pub stop_reason: StopReason,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// User cancelled.
    Cancelled,
}

/// Result of an evolution run.
#[derive(Debug, Clone, Serialize)]
pub struct EvolutionResult {
    pub final_population: Vec<ScoredGenome>,
    pub history: EvolutionHistory,
    pub stats: EvolutionStats,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("No objectives specified")]
    NoObjectives,
    #[error("Duplicate objective name: {0}")]
    DuplicateObjective(String),
    #[error("Invalid rate: {0}")]
    InvalidRate(String),
    #[error("Invalid niching parameter: {0}")]
    InvalidNiching(String),
    #[error("Genome schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("Base config validation failed: {0}")]
    BaseConfigError(#[from] ConfigError),
}

impl EvolutionConfig {
    /// Validate the configuration and build the run's gene table.
    pub fn genome_schema(&self) -> Result<GenomeSchema, EvolutionConfigError> {
        Ok(GenomeSchema::new(
            self.network.scheme,
            &self.constraints,
            self.simulator.species_count,
        )?)
    }

    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.simulator.validate()?;
        self.network.validate()?;

        if self.population.size < 2 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }

        if self.objectives.is_empty() {
            return Err(EvolutionConfigError::NoObjectives);
        }
        let mut seen = HashSet::new();
        for objective in &self.objectives {
            if !seen.insert(objective.name.as_str()) {
                return Err(EvolutionConfigError::DuplicateObjective(
                    objective.name.clone(),
                ));
            }
        }

        let check_rate = |rate: f64, name: &str| {
            if (0.0..=1.0).contains(&rate) {
                Ok(())
            } else {
                Err(EvolutionConfigError::InvalidRate(format!(
                    "{name} ({rate}) must lie in [0, 1]"
                )))
            }
        };
        check_rate(self.genetic.crossover_rate, "crossover_rate")?;
        if let Some(rate) = self.genetic.mutation_rate {
            check_rate(rate, "mutation_rate")?;
        }
        if !(self.genetic.mutation_strength >= 0.0 && self.genetic.mutation_strength.is_finite()) {
            return Err(EvolutionConfigError::InvalidRate(format!(
                "mutation_strength ({}) must be finite and non-negative",
                self.genetic.mutation_strength
            )));
        }

        let niching = &self.niching;
        if let Some(radius) = niching.radius
            && !(radius > 0.0 && radius.is_finite())
        {
            return Err(EvolutionConfigError::InvalidNiching(format!(
                "radius {radius} must be positive"
            )));
        }
        if !(niching.alpha > 0.0 && niching.alpha.is_finite()) {
            return Err(EvolutionConfigError::InvalidNiching(format!(
                "alpha {} must be positive",
                niching.alpha
            )));
        }
        if !(niching.structural_scale > 0.0 && niching.structural_scale.is_finite()) {
            return Err(EvolutionConfigError::InvalidNiching(format!(
                "structural_scale {} must be positive",
                niching.structural_scale
            )));
        }

        self.genome_schema()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = EvolutionConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_population_too_small() {
        let config = EvolutionConfig {
            population: PopulationConfig {
                size: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::PopulationTooSmall)
        ));
    }

    #[test]
    fn test_schema_mismatch_fails_fast() {
        let mut config = EvolutionConfig::default();
        config.simulator.species_count = 5;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::Schema(_))
        ));
    }

    #[test]
    fn test_duplicate_objectives_rejected() {
        let mut config = EvolutionConfig::default();
        let first = config.objectives[0].clone();
        config.objectives.push(first);
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::DuplicateObjective(_))
        ));
    }

    #[test]
    fn test_invalid_crossover_rate() {
        let mut config = EvolutionConfig::default();
        config.genetic.crossover_rate = 1.5;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::InvalidRate(_))
        ));
    }

    #[test]
    fn test_niche_radius_default() {
        let niching = NichingConfig::default();
        assert_eq!(niching.radius_for(20), 10.0);
    }

    #[test]
    fn test_serialization() {
        let config = EvolutionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EvolutionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.population.size, config.population.size);
        assert_eq!(parsed.objectives, config.objectives);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let parsed: EvolutionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.population.size, 50);
        assert_eq!(parsed.genetic.crossover_rate, 0.9);
        assert_eq!(parsed.objectives.len(), 8);
    }
}
