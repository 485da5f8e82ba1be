//! Fitness sharing.
//!
//! Each individual's objective values are divided by its niche count, the
//! sum over the population of `max(0, 1 - (d / radius)^alpha)`. An
//! individual always counts itself, so the niche count is at least 1.

use crate::schema::{FitnessRecord, Genome, NegativeSharing, NichingConfig};

use super::genome::genome_distance;

/// Niche count of every genome in the population.
pub fn niche_counts(genomes: &[Genome], config: &NichingConfig) -> Vec<f64> {
    let radius = config.radius_for(genomes.len());

    genomes
        .iter()
        .map(|x| {
            genomes
                .iter()
                .map(|y| {
                    let d = genome_distance(x, y, config.structural_scale);
                    (1.0 - (d / radius).powf(config.alpha)).max(0.0)
                })
                .sum()
        })
        .collect()
}

/// Shared fitness records, one per genome, in population order.
pub fn apply_sharing(
    genomes: &[Genome],
    records: &[FitnessRecord],
    config: &NichingConfig,
) -> Vec<FitnessRecord> {
    debug_assert_eq!(genomes.len(), records.len());

    niche_counts(genomes, config)
        .into_iter()
        .zip(records)
        .map(|(share, record)| {
            record.map_values(|v| match config.negative_values {
                NegativeSharing::Penalize if v < 0.0 => v * share,
                _ => v / share,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FitnessSchema;

    fn enabled() -> NichingConfig {
        NichingConfig {
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_pair_halves_values() {
        let genome = Genome::new(vec![0.1, 0.2, 0.3, 4.0, 0.5]);
        let genomes = vec![genome.clone(), genome];
        let schema = FitnessSchema::from_names(&["a", "b"]);
        let records = vec![schema.record(vec![2.0, 8.0]), schema.record(vec![4.0, 0.0])];

        let shared = apply_sharing(&genomes, &records, &enabled());
        assert_eq!(shared[0].values(), &[1.0, 4.0]);
        assert_eq!(shared[1].values(), &[2.0, 0.0]);
    }

    #[test]
    fn test_niche_count_at_least_one() {
        let genomes: Vec<Genome> = (0..6)
            .map(|i| Genome::new(vec![i as f64 * 0.2, 0.5, 0.1, i as f64, 0.3]))
            .collect();
        for count in niche_counts(&genomes, &enabled()) {
            assert!(count >= 1.0);
        }
    }

    #[test]
    fn test_distant_genomes_unshared() {
        let genomes = vec![
            Genome::new(vec![0.0, 0.0, 0.0]),
            Genome::new(vec![5.0, 5.0, 5.0]),
        ];
        let config = NichingConfig {
            radius: Some(1.0),
            ..enabled()
        };
        assert_eq!(niche_counts(&genomes, &config), vec![1.0, 1.0]);
    }

    #[test]
    fn test_penalize_negative_values() {
        let genome = Genome::new(vec![0.5, 0.5, 0.5]);
        let genomes = vec![genome.clone(), genome];
        let schema = FitnessSchema::from_names(&["a"]);
        let records = vec![schema.record(vec![-2.0]), schema.record(vec![2.0])];

        let divided = apply_sharing(&genomes, &records, &enabled());
        assert_eq!(divided[0].values(), &[-1.0]);

        let config = NichingConfig {
            negative_values: NegativeSharing::Penalize,
            ..enabled()
        };
        let penalized = apply_sharing(&genomes, &records, &config);
        assert_eq!(penalized[0].values(), &[-4.0]);
        assert_eq!(penalized[1].values(), &[1.0]);
    }
}
