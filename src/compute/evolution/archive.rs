//! Run output: per-generation summaries, the final population and a JSON
//! result.
//!
//! Summary files hold one block per generation of `name: value` lines, each
//! block followed by a blank line. The final population file lists one
//! individual per line as a fitness map literal followed by the genome.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::schema::{
    EvolutionConfig, EvolutionResult, GeneKind, GenerationSummary, GenomeSchema, ScoredGenome,
    format_float,
};

pub const AVERAGE_FITNESS_FILE: &str = "average_fitness.txt";
pub const MAX_FITNESS_FILE: &str = "max_fitness.txt";
pub const FINAL_POPULATION_FILE: &str = "final_population.txt";
pub const RESULT_FILE: &str = "result.json";

/// Output directory of one run.
#[derive(Debug)]
pub struct RunArchive {
    dir: PathBuf,
}

impl RunArchive {
    /// Create the directory and start empty summary files.
    pub fn create<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        File::create(dir.join(AVERAGE_FITNESS_FILE))?;
        File::create(dir.join(MAX_FITNESS_FILE))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append one generation's means and maxima.
    pub fn append_summary(&self, summary: &GenerationSummary) -> io::Result<()> {
        let mut average = self.append(AVERAGE_FITNESS_FILE)?;
        let mut max = self.append(MAX_FITNESS_FILE)?;
        for objective in &summary.objectives {
            writeln!(average, "{}: {}", objective.name, format_float(objective.mean))?;
            writeln!(max, "{}: {}", objective.name, format_float(objective.max))?;
        }
        writeln!(average)?;
        writeln!(max)?;
        average.flush()?;
        max.flush()
    }

    /// Write the run header and every scored genome.
    pub fn write_final_population(
        &self,
        config: &EvolutionConfig,
        schema: &GenomeSchema,
        population: &[ScoredGenome],
    ) -> io::Result<PathBuf> {
        let path = self.dir.join(FINAL_POPULATION_FILE);
        let mut out = BufWriter::new(File::create(&path)?);

        for (key, value) in run_header(config) {
            writeln!(out, "{key}: {value}")?;
        }
        for scored in population {
            writeln!(out, "{}", format_individual(scored, schema))?;
        }
        out.flush()?;
        Ok(path)
    }

    /// Write the full result as pretty JSON.
    pub fn write_result(&self, result: &EvolutionResult) -> io::Result<PathBuf> {
        let path = self.dir.join(RESULT_FILE);
        let json = serde_json::to_string_pretty(result)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    fn append(&self, name: &str) -> io::Result<BufWriter<File>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(name))?;
        Ok(BufWriter::new(file))
    }
}

/// World and run settings recorded at the top of the final population file.
pub fn run_header(config: &EvolutionConfig) -> Vec<(&'static str, String)> {
    let sim = &config.simulator;
    vec![
        ("N_TYPES", sim.species_count.to_string()),
        ("WORLD_X", sim.world_x.to_string()),
        ("WORLD_Y", sim.world_y.to_string()),
        ("UPDATES", sim.updates.to_string()),
        ("POPULATION_SIZE", config.population.size.to_string()),
        ("GENERATIONS", config.population.max_generations.to_string()),
    ]
}

/// `{'Name': value, ...} [g0, g1, ...]`; integer genes have no fraction.
pub fn format_individual(scored: &ScoredGenome, schema: &GenomeSchema) -> String {
    let genes: Vec<String> = scored
        .genome
        .genes
        .iter()
        .enumerate()
        .map(|(i, &gene)| match schema.genes().get(i).map(|spec| spec.kind) {
            Some(GeneKind::Integer) => format!("{}", gene.round() as i64),
            _ => format_float(gene),
        })
        .collect();
    format!("{} [{}]", scored.fitness, genes.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        EvolutionHistory, EvolutionStats, FitnessSchema, Genome, GenomeConstraints,
        NetworkScheme, ObjectiveSummary, StopReason,
    };
    use tempfile::tempdir;

    fn schema() -> GenomeSchema {
        GenomeSchema::new(NetworkScheme::Klemm, &GenomeConstraints::default(), 9).unwrap()
    }

    fn scored() -> ScoredGenome {
        let fitness = FitnessSchema::from_names(&["Biomass", "Heredity_Score"]);
        ScoredGenome {
            genome: Genome::new(vec![0.5, 0.25, 0.0, 4.0, 0.75]),
            fitness: fitness.record(vec![12.5, 0.0]),
        }
    }

    fn summary(generation: usize, mean: f64, max: f64) -> GenerationSummary {
        GenerationSummary {
            generation,
            objectives: vec![
                ObjectiveSummary {
                    name: "Biomass".into(),
                    mean,
                    max,
                },
                ObjectiveSummary {
                    name: "Heredity".into(),
                    mean: 0.5,
                    max: 1.0,
                },
            ],
            diversity: 0.0,
            failed: 0,
        }
    }

    #[test]
    fn test_individual_line() {
        assert_eq!(
            format_individual(&scored(), &schema()),
            "{'Biomass': 12.5, 'Heredity_Score': 0.0} [0.5, 0.25, 0.0, 4, 0.75]"
        );
    }

    #[test]
    fn test_summary_blocks_append() {
        let dir = tempdir().unwrap();
        let archive = RunArchive::create(dir.path().join("run")).unwrap();
        archive.append_summary(&summary(0, 1.5, 3.0)).unwrap();
        archive.append_summary(&summary(1, 2.0, 4.0)).unwrap();

        let average = fs::read_to_string(archive.dir().join(AVERAGE_FITNESS_FILE)).unwrap();
        assert_eq!(
            average,
            "Biomass: 1.5\nHeredity: 0.5\n\nBiomass: 2.0\nHeredity: 0.5\n\n"
        );
        let max = fs::read_to_string(archive.dir().join(MAX_FITNESS_FILE)).unwrap();
        assert_eq!(max, "Biomass: 3.0\nHeredity: 1.0\n\nBiomass: 4.0\nHeredity: 1.0\n\n");
    }

    #[test]
    fn test_create_truncates_previous_summaries() {
        let dir = tempdir().unwrap();
        let first = RunArchive::create(dir.path()).unwrap();
        first.append_summary(&summary(0, 1.0, 1.0)).unwrap();

        let second = RunArchive::create(dir.path()).unwrap();
        let average = fs::read_to_string(second.dir().join(AVERAGE_FITNESS_FILE)).unwrap();
        assert!(average.is_empty());
    }

    #[test]
    fn test_final_population_file() {
        let dir = tempdir().unwrap();
        let archive = RunArchive::create(dir.path()).unwrap();
        let config = EvolutionConfig::default();

        let path = archive
            .write_final_population(&config, &schema(), &[scored()])
            .unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(
            text,
            "N_TYPES: 9\nWORLD_X: 10\nWORLD_Y: 10\nUPDATES: 1000\nPOPULATION_SIZE: 50\nGENERATIONS: 100\n\
             {'Biomass': 12.5, 'Heredity_Score': 0.0} [0.5, 0.25, 0.0, 4, 0.75]\n"
        );
    }

    #[test]
    fn test_result_json() {
        let dir = tempdir().unwrap();
        let archive = RunArchive::create(dir.path()).unwrap();
        let result = EvolutionResult {
            final_population: vec![scored()],
            history: EvolutionHistory::default(),
            stats: EvolutionStats {
                generations: 0,
                total_evaluations: 1,
                elapsed_seconds: 0.0,
                stop_reason: StopReason::MaxGenerations,
            },
        };

        let path = archive.write_result(&result).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["final_population"][0]["fitness"]["Biomass"], 12.5);
        assert_eq!(value["final_population"][0]["genome"][3], 4.0);
        assert_eq!(value["stats"]["stop_reason"], "MaxGenerations");
    }
}
