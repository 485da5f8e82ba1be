//! The generational evolution loop.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::seq::SliceRandom;

use crate::schema::{
    EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionProgress, EvolutionResult,
    EvolutionStats, FitnessRecord, GenerationSummary, Genome, GenomeSchema, ObjectiveSummary,
    ScoredGenome, StopReason,
};

use super::archive::RunArchive;
use super::fitness::{EvaluationError, FitnessEvaluator};
use super::genome::{GenomeRng, genome_distance};
use super::niching::apply_sharing;
use super::selection::{Candidate, select_one};

/// Errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] EvolutionConfigError),
    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("Evaluator returned {found} records for {expected} genomes")]
    RecordCount { expected: usize, found: usize },
    #[error("Failed to write run output: {0}")]
    Archive(#[from] io::Error),
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine<E: FitnessEvaluator> {
    config: EvolutionConfig,
    schema: GenomeSchema,
    evaluator: E,
    rng: GenomeRng,
    population: Vec<Genome>,
    history: EvolutionHistory,
    generation: usize,
    evaluations: u64,
    cancelled: Arc<AtomicBool>,
}

impl<E: FitnessEvaluator> EvolutionEngine<E> {
    /// Create a new evolution engine. The configuration and its gene table
    /// are validated here.
    pub fn new(config: EvolutionConfig, evaluator: E) -> Result<Self, EvolutionError> {
        config.validate()?;
        let schema = config.genome_schema()?;
        let rng = match config.random_seed {
            Some(seed) => GenomeRng::new(seed),
            None => GenomeRng::random(),
        };

        Ok(Self {
            config,
            schema,
            evaluator,
            rng,
            population: Vec::new(),
            history: EvolutionHistory::default(),
            generation: 0,
            evaluations: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get cancellation handle. Setting it stops the run before the next
    /// generation; the final evaluation still happens.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    pub fn genome_schema(&self) -> &GenomeSchema {
        &self.schema
    }

    /// Initialize the population with random genomes.
    pub fn initialize(&mut self) {
        self.generation = 0;
        self.evaluations = 0;
        self.history = EvolutionHistory::default();
        self.population = (0..self.config.population.size)
            .map(|_| self.rng.random_genome(&self.schema))
            .collect();
    }

    /// Evaluate the current population and check every record's key set.
    fn evaluate_population(&mut self) -> Result<Vec<FitnessRecord>, EvolutionError> {
        let records = self.evaluator.evaluate_population(&self.population)?;
        if records.len() != self.population.len() {
            return Err(EvolutionError::RecordCount {
                expected: self.population.len(),
                found: records.len(),
            });
        }

        let fitness = self.evaluator.fitness_schema();
        if let Some((index, record)) = records
            .iter()
            .enumerate()
            .find(|(_, record)| !fitness.matches(record))
        {
            return Err(EvaluationError::KeyMismatch {
                index,
                expected: fitness.names().to_vec(),
                found: record.names().to_vec(),
            }
            .into());
        }

        self.evaluations += records.len() as u64;
        Ok(records)
    }

    /// Per-objective mean and max, diversity and failure count.
    fn summarize(&self, records: &[FitnessRecord]) -> GenerationSummary {
        let fitness = self.evaluator.fitness_schema();
        let n = records.len().max(1) as f64;

        let objectives = fitness
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values = records.iter().map(|r| r.value(i));
                ObjectiveSummary {
                    name: name.clone(),
                    mean: values.clone().sum::<f64>() / n,
                    max: values.fold(f64::NEG_INFINITY, f64::max),
                }
            })
            .collect();

        let sentinel = fitness.sentinel();
        GenerationSummary {
            generation: self.generation,
            objectives,
            diversity: self.compute_diversity(),
            failed: records.iter().filter(|r| **r == sentinel).count(),
        }
    }

    /// Mean pairwise genome distance.
    fn compute_diversity(&self) -> f64 {
        let scale = self.config.niching.structural_scale;
        let mut total = 0.0;
        let mut count = 0usize;
        for i in 0..self.population.len() {
            for j in (i + 1)..self.population.len() {
                total += genome_distance(&self.population[i], &self.population[j], scale);
                count += 1;
            }
        }
        if count > 0 { total / count as f64 } else { 0.0 }
    }

    /// Lexicase-select parents, then breed and mutate a full replacement
    /// population.
    fn breed(&mut self, records: Vec<FitnessRecord>) {
        let size = self.config.population.size;
        let genetic = &self.config.genetic;
        let objectives = self.evaluator.fitness_schema().objective_indices();

        let mut pool: Vec<Candidate> = self
            .population
            .iter()
            .cloned()
            .zip(records)
            .enumerate()
            .map(|(index, (genome, fitness))| Candidate {
                index,
                genome,
                fitness,
            })
            .collect();

        let parent_count = (size / 2).max(1);
        let mut parents = Vec::with_capacity(parent_count);
        while parents.len() < parent_count {
            match select_one(&mut pool, &objectives, self.rng.rng_mut()) {
                Some(winner) => parents.push(winner.genome),
                None => break,
            }
        }

        let mut offspring = Vec::with_capacity(size);
        while offspring.len() < size {
            let (Some(p1), Some(p2)) = (
                parents.choose(self.rng.rng_mut()),
                parents.choose(self.rng.rng_mut()),
            ) else {
                break;
            };
            let (c1, c2) = self.rng.crossover(p1, p2, genetic.crossover_rate);
            offspring.push(c1);
            if offspring.len() < size {
                offspring.push(c2);
            }
        }

        for child in &mut offspring {
            self.rng.mutate(
                child,
                &self.schema,
                genetic.mutation_rate,
                genetic.mutation_strength,
            );
        }

        self.population = offspring;
    }

    /// Share fitness when niching is on, then breed from the result.
    fn advance(&mut self, records: Vec<FitnessRecord>) {
        let records = if self.config.niching.enabled {
            apply_sharing(&self.population, &records, &self.config.niching)
        } else {
            records
        };
        self.breed(records);
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<EvolutionResult, EvolutionError>
    where
        F: FnMut(&EvolutionProgress),
    {
        let start_time = Instant::now();
        let archive = self
            .config
            .output_dir
            .as_ref()
            .map(RunArchive::create)
            .transpose()?;

        self.initialize();
        let total_generations = self.config.population.max_generations;

        let mut stop_reason = StopReason::MaxGenerations;
        while self.generation < total_generations {
            if self.cancelled.load(Ordering::Relaxed) {
                stop_reason = StopReason::Cancelled;
                break;
            }

            let records = self.evaluate_population()?;
            let summary = self.summarize(&records);
            log::info!("{}", describe(&summary, total_generations));
            if let Some(archive) = &archive {
                archive.append_summary(&summary)?;
            }
            self.history.generations.push(summary.clone());

            self.advance(records);
            self.generation += 1;

            callback(&EvolutionProgress {
                generation: self.generation,
                total_generations,
                summary,
            });
        }

        let records = self.evaluate_population()?;
        let final_population: Vec<ScoredGenome> = self
            .population
            .iter()
            .cloned()
            .zip(records)
            .map(|(genome, fitness)| ScoredGenome { genome, fitness })
            .collect();

        let result = EvolutionResult {
            final_population,
            history: self.history.clone(),
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                elapsed_seconds: start_time.elapsed().as_secs_f64(),
                stop_reason,
            },
        };

        if let Some(archive) = &archive {
            archive.write_final_population(&self.config, &self.schema, &result.final_population)?;
            archive.write_result(&result)?;
            log::info!("run output written to {}", archive.dir().display());
        }

        Ok(result)
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, EvolutionError> {
        self.run_with_callback(|_| {})
    }
}

fn describe(summary: &GenerationSummary, total: usize) -> String {
    let objectives: Vec<String> = summary
        .objectives
        .iter()
        .map(|o| format!("{} {:.4}/{:.4}", o.name, o.mean, o.max))
        .collect();
    format!(
        "generation {}/{}: {} | diversity {:.4} | failed {}",
        summary.generation + 1,
        total,
        objectives.join(", "),
        summary.diversity,
        summary.failed
    )
}
