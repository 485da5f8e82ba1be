//! Fitness evaluation for interaction-network genomes.
//!
//! The [`FitnessEvaluator`] trait is the seam between the evolution loop and
//! whatever scores a genome. [`SimulatorEvaluator`] builds the genome's
//! interaction matrix, runs the external ecology simulator on it and reads
//! the objective values back from the simulator's CSV tables.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use rayon::prelude::*;

use crate::compute::{InteractionMatrix, NetworkGenerator};
use crate::schema::{
    AbioticParams, EvolutionConfig, EvolutionConfigError, FitnessRecord, FitnessSchema, Genome,
    GenomeSchema, Measurement, Objective, SchemaError, SimulatorConfig,
};

const SPAWN_ATTEMPTS: u32 = 50;
const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Scores genomes against a fixed set of objectives.
pub trait FitnessEvaluator {
    /// Key set of every record this evaluator produces.
    fn fitness_schema(&self) -> &FitnessSchema;

    /// Evaluate one genome.
    fn evaluate(&self, genome: &Genome) -> Result<FitnessRecord, EvaluationError>;

    /// Evaluate a population, returning records in population order.
    fn evaluate_population(&self, genomes: &[Genome]) -> Result<Vec<FitnessRecord>, EvaluationError> {
        genomes.iter().map(|genome| self.evaluate(genome)).collect()
    }
}

/// Errors that stop evaluation. Simulator crashes and unreadable output are
/// not errors; they give the genome the sentinel record.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] EvolutionConfigError),
    #[error("Genome does not match the run's gene layout: {0}")]
    Schema(#[from] SchemaError),
    #[error("Failed to prepare {}: {source}", path.display())]
    WorkDir { path: PathBuf, source: io::Error },
    #[error("Failed to write interaction matrix {}: {source}", path.display())]
    Matrix { path: PathBuf, source: csv::Error },
    #[error("Failed to launch simulator {}: {source}", binary.display())]
    Spawn { binary: PathBuf, source: io::Error },
    #[error("Fitness record {index} has keys {found:?}, expected {expected:?}")]
    KeyMismatch {
        index: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Problems reading the simulator's output tables.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: csv::Error },
    #[error("{} has no data rows", path.display())]
    Empty { path: PathBuf },
    #[error("{} has no column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("{}: column '{column}' holds non-numeric value '{value}'", path.display())]
    NotNumeric {
        path: PathBuf,
        column: String,
        value: String,
    },
}

/// Runs the external simulator on each genome's interaction matrix.
pub struct SimulatorEvaluator {
    schema: GenomeSchema,
    fitness: FitnessSchema,
    objectives: Vec<Objective>,
    generator: NetworkGenerator,
    simulator: SimulatorConfig,
}

impl SimulatorEvaluator {
    /// Build an evaluator for a validated configuration.
    ///
    /// A relative binary path containing a directory component is resolved
    /// against the current directory, since the simulator runs inside the
    /// working directory.
    pub fn new(config: &EvolutionConfig) -> Result<Self, EvaluationError> {
        config.validate()?;
        let schema = config.genome_schema()?;

        let mut simulator = config.simulator.clone();
        if simulator.binary.components().count() > 1 {
            simulator.binary =
                std::path::absolute(&simulator.binary).map_err(|source| EvaluationError::WorkDir {
                    path: simulator.binary.clone(),
                    source,
                })?;
        }

        Ok(Self {
            schema,
            fitness: FitnessSchema::new(&config.objectives),
            objectives: config.objectives.clone(),
            generator: NetworkGenerator::new(
                config.network.clone(),
                config.simulator.species_count,
            ),
            simulator,
        })
    }

    pub fn genome_schema(&self) -> &GenomeSchema {
        &self.schema
    }

    /// Evaluate one genome inside `work_dir`.
    pub fn evaluate_in(&self, genome: &Genome, work_dir: &Path) -> Result<FitnessRecord, EvaluationError> {
        let decoded = self.schema.decode(genome)?;
        let matrix = self.generator.generate(&decoded.network);

        if matrix.is_degenerate() && self.simulator.skip_degenerate {
            log::debug!("degenerate network, simulator skipped");
            return Ok(self.fitness.sentinel());
        }

        self.write_matrix(&matrix, work_dir)?;

        let mut replicates = Vec::with_capacity(self.simulator.replicates);
        for replicate in 0..self.simulator.replicates {
            match self.run_replicate(&decoded.abiotic, work_dir, replicate)? {
                Some(record) => replicates.push(record),
                None => return Ok(self.fitness.sentinel()),
            }
        }

        let record = self.fitness.aggregate(&replicates);
        log::debug!("evaluated genome {:?}: {record}", genome.genes);
        Ok(record)
    }

    fn write_matrix(&self, matrix: &InteractionMatrix, work_dir: &Path) -> Result<(), EvaluationError> {
        fs::create_dir_all(work_dir).map_err(|source| EvaluationError::WorkDir {
            path: work_dir.to_path_buf(),
            source,
        })?;
        let path = work_dir.join(&self.simulator.matrix_file);
        matrix
            .write_csv(&path)
            .map_err(|source| EvaluationError::Matrix { path, source })
    }

    /// One simulator run. `Ok(None)` marks a failed run.
    fn run_replicate(
        &self,
        abiotic: &AbioticParams,
        work_dir: &Path,
        replicate: usize,
    ) -> Result<Option<FitnessRecord>, EvaluationError> {
        for name in [&self.simulator.data_file, &self.simulator.scores_file] {
            let path = work_dir.join(name);
            match fs::remove_file(&path) {
                Err(source) if source.kind() != io::ErrorKind::NotFound => {
                    return Err(EvaluationError::WorkDir { path, source });
                }
                _ => {}
            }
        }

        let status = self.launch(&self.simulator_args(abiotic, replicate), work_dir)?;

        if !status.success() {
            log::warn!("simulator exited with {status}; genome gets sentinel fitness");
            return Ok(None);
        }

        match self.read_outputs(work_dir) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                log::warn!("unusable simulator output ({e}); genome gets sentinel fitness");
                Ok(None)
            }
        }
    }

    /// Run the simulator to completion. A binary that is still open for
    /// writing somewhere (ETXTBSY) is retried a bounded number of times.
    fn launch(&self, args: &[String], work_dir: &Path) -> Result<ExitStatus, EvaluationError> {
        let mut attempt = 1;
        loop {
            let result = Command::new(&self.simulator.binary)
                .args(args)
                .current_dir(work_dir)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .status();
            match result {
                Err(e) if e.kind() == io::ErrorKind::ExecutableFileBusy && attempt < SPAWN_ATTEMPTS => {
                    log::debug!("simulator binary busy, retrying launch ({attempt}/{SPAWN_ATTEMPTS})");
                    attempt += 1;
                    thread::sleep(SPAWN_RETRY_DELAY);
                }
                result => {
                    return result.map_err(|source| EvaluationError::Spawn {
                        binary: self.simulator.binary.clone(),
                        source,
                    });
                }
            }
        }
    }

    fn simulator_args(&self, abiotic: &AbioticParams, replicate: usize) -> Vec<String> {
        let sim = &self.simulator;
        let mut args = vec![
            "-DIFFUSION".to_string(),
            abiotic.diffusion.to_string(),
            "-SEEDING_PROB".to_string(),
            abiotic.seeding_prob.to_string(),
            "-PROB_CLEAR".to_string(),
            abiotic.clear_prob.to_string(),
            "-INTERACTION_SOURCE".to_string(),
            sim.matrix_file.clone(),
            "-REPRO_THRESHOLD".to_string(),
            sim.repro_threshold.to_string(),
            "-MAX_POP".to_string(),
            sim.max_pop.to_string(),
            "-WORLD_X".to_string(),
            sim.world_x.to_string(),
            "-WORLD_Y".to_string(),
            sim.world_y.to_string(),
            "-UPDATES".to_string(),
            sim.updates.to_string(),
            "-N_TYPES".to_string(),
            sim.species_count.to_string(),
        ];
        if let Some(seed) = sim.seed {
            args.push("-SEED".to_string());
            args.push((seed + replicate as i64).to_string());
        }
        args
    }

    fn read_outputs(&self, work_dir: &Path) -> Result<FitnessRecord, OutputError> {
        let mut series = None;
        let mut scores = None;

        let mut values = Vec::with_capacity(self.objectives.len());
        for objective in &self.objectives {
            let value = match &objective.measurement {
                Measurement::SeriesDelta { column } => {
                    let table = load(&mut series, &work_dir.join(&self.simulator.data_file))?;
                    table.last(column)? - table.first(column)?
                }
                Measurement::SeriesFinal { column } => {
                    load(&mut series, &work_dir.join(&self.simulator.data_file))?.last(column)?
                }
                Measurement::Score { column, baseline } => {
                    let table = load(&mut scores, &work_dir.join(&self.simulator.scores_file))?;
                    let score = table.first(column)?;
                    match baseline {
                        Some(baseline) => score - table.first(baseline)?,
                        None => score,
                    }
                }
            };
            values.push(value);
        }

        Ok(self.fitness.record(values))
    }
}

impl FitnessEvaluator for SimulatorEvaluator {
    fn fitness_schema(&self) -> &FitnessSchema {
        &self.fitness
    }

    fn evaluate(&self, genome: &Genome) -> Result<FitnessRecord, EvaluationError> {
        self.evaluate_in(genome, &self.simulator.work_dir)
    }

    /// Sequential in one directory, or contiguous chunks on the rayon pool
    /// with one `worker-<n>` subdirectory per chunk.
    fn evaluate_population(&self, genomes: &[Genome]) -> Result<Vec<FitnessRecord>, EvaluationError> {
        let workers = self.simulator.parallel_workers;
        if workers <= 1 || genomes.len() <= 1 {
            return genomes.iter().map(|genome| self.evaluate(genome)).collect();
        }

        let chunk_size = genomes.len().div_ceil(workers);
        let chunks: Vec<Result<Vec<FitnessRecord>, EvaluationError>> = genomes
            .par_chunks(chunk_size)
            .enumerate()
            .map(|(worker, chunk)| {
                let dir = self.simulator.work_dir.join(format!("worker-{worker}"));
                chunk.iter().map(|genome| self.evaluate_in(genome, &dir)).collect()
            })
            .collect();

        let mut records = Vec::with_capacity(genomes.len());
        for chunk in chunks {
            records.extend(chunk?);
        }
        Ok(records)
    }
}

/// A CSV table with a header row, read whole.
struct Table {
    path: PathBuf,
    headers: csv::StringRecord,
    rows: Vec<csv::StringRecord>,
}

impl Table {
    fn read(path: &Path) -> Result<Self, OutputError> {
        let read_error = |source| OutputError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(read_error)?;
        let headers = reader.headers().map_err(read_error)?.clone();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_error)?;

        if rows.is_empty() {
            return Err(OutputError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    fn first(&self, column: &str) -> Result<f64, OutputError> {
        self.value(0, column)
    }

    fn last(&self, column: &str) -> Result<f64, OutputError> {
        self.value(self.rows.len() - 1, column)
    }

    fn value(&self, row: usize, column: &str) -> Result<f64, OutputError> {
        let index = self
            .headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| OutputError::MissingColumn {
                path: self.path.clone(),
                column: column.to_string(),
            })?;
        let field = self.rows[row].get(index).unwrap_or("");
        field.parse().map_err(|_| OutputError::NotNumeric {
            path: self.path.clone(),
            column: column.to_string(),
            value: field.to_string(),
        })
    }
}

fn load<'a>(slot: &'a mut Option<Table>, path: &Path) -> Result<&'a Table, OutputError> {
    let table = match slot.take() {
        Some(table) => table,
        None => Table::read(path)?,
    };
    Ok(slot.insert(table))
}
