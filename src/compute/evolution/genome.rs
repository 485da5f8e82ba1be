//! Genome manipulation utilities for evolutionary search.
//!
//! Provides random generation, crossover, and mutation operations over the
//! flat gene layout described by a [`GenomeSchema`].

use rand::prelude::*;

use crate::schema::{ABIOTIC_GENES, GeneKind, Genome, GenomeSchema};

/// Random number generator wrapper for every stochastic step of a run.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Underlying generator, for selection shuffles and tie-breaks.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Generate a random genome: uniform for continuous genes, uniform over
    /// the whole numbers in range for integer genes.
    pub fn random_genome(&mut self, schema: &GenomeSchema) -> Genome {
        let genes = schema
            .genes()
            .iter()
            .map(|spec| match spec.kind {
                GeneKind::Continuous => self.rng.gen_range(spec.lower..=spec.upper),
                GeneKind::Integer => {
                    let lower = spec.lower as i64;
                    let upper = spec.upper as i64;
                    self.rng.gen_range(lower..=upper) as f64
                }
            })
            .collect();
        Genome::new(genes)
    }

    /// One-point crossover at the abiotic/structural boundary.
    ///
    /// With probability `rate` the children exchange everything after the
    /// abiotic genes; otherwise they are clones of their parents.
    pub fn crossover(&mut self, parent1: &Genome, parent2: &Genome, rate: f64) -> (Genome, Genome) {
        let mut child1 = parent1.clone();
        let mut child2 = parent2.clone();
        if self.rng.gen_bool(rate) {
            let point = ABIOTIC_GENES.min(child1.len()).min(child2.len());
            child1.genes[point..].swap_with_slice(&mut child2.genes[point..]);
        }
        (child1, child2)
    }

    /// Mutate a genome in place.
    ///
    /// Each gene mutates with probability `rate` (`1 / gene_count` when
    /// `None`). Continuous genes get Gaussian noise of standard deviation
    /// `strength`; integer genes step by ±1. Results are clamped to the
    /// gene's own bounds.
    pub fn mutate(
        &mut self,
        genome: &mut Genome,
        schema: &GenomeSchema,
        rate: Option<f64>,
        strength: f64,
    ) {
        let rate = rate.unwrap_or(1.0 / schema.len().max(1) as f64);

        for (gene, spec) in genome.genes.iter_mut().zip(schema.genes()) {
            if self.rng.r#gen::<f64>() >= rate {
                continue;
            }
            *gene = match spec.kind {
                GeneKind::Continuous => self.gaussian_mutate(*gene, strength, (spec.lower, spec.upper)),
                GeneKind::Integer => {
                    let step = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                    spec.clamp(*gene + step)
                }
            };
        }
    }

    /// Gaussian mutation: add noise to a value.
    pub fn gaussian_mutate(&mut self, value: f64, strength: f64, bounds: (f64, f64)) -> f64 {
        let noise: f64 = self.rng.sample(rand_distr::StandardNormal);
        let mutated = value + noise * strength;
        mutated.clamp(bounds.0, bounds.1)
    }
}

/// Euclidean distance with structural genes divided by `structural_scale`.
pub fn genome_distance(g1: &Genome, g2: &Genome, structural_scale: f64) -> f64 {
    g1.genes
        .iter()
        .zip(&g2.genes)
        .enumerate()
        .map(|(i, (a, b))| {
            let d = a - b;
            if i < ABIOTIC_GENES {
                d
            } else {
                d / structural_scale
            }
        })
        .map(|d| d * d)
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GenomeConstraints, NetworkScheme};
    use proptest::prelude::*;

    fn schema() -> GenomeSchema {
        GenomeSchema::new(
            NetworkScheme::KlemmCommunity,
            &GenomeConstraints::default(),
            9,
        )
        .unwrap()
    }

    #[test]
    fn test_random_genome() {
        let mut rng = GenomeRng::new(42);
        let schema = schema();

        for _ in 0..100 {
            let genome = rng.random_genome(&schema);
            assert!(schema.validate(&genome).is_ok());
        }
    }

    #[test]
    fn test_crossover_always_swaps_suffix() {
        let mut rng = GenomeRng::new(42);
        let g1 = Genome::new(vec![0.1, 0.2, 0.3, 4.0, 0.5, 0.6]);
        let g2 = Genome::new(vec![0.9, 0.8, 0.7, 2.0, 0.1, 0.2]);

        for _ in 0..50 {
            let (c1, c2) = rng.crossover(&g1, &g2, 1.0);
            assert_eq!(c1.genes, vec![0.1, 0.2, 0.3, 2.0, 0.1, 0.2]);
            assert_eq!(c2.genes, vec![0.9, 0.8, 0.7, 4.0, 0.5, 0.6]);
        }
    }

    #[test]
    fn test_crossover_never_swaps() {
        let mut rng = GenomeRng::new(7);
        let g1 = Genome::new(vec![0.1, 0.2, 0.3, 4.0, 0.5]);
        let g2 = Genome::new(vec![0.9, 0.8, 0.7, 2.0, 0.1]);

        for _ in 0..50 {
            let (c1, c2) = rng.crossover(&g1, &g2, 0.0);
            assert_eq!(c1, g1);
            assert_eq!(c2, g2);
        }
    }

    #[test]
    fn test_mutation_changes_something_at_full_rate() {
        let mut rng = GenomeRng::new(3);
        let schema = schema();
        let original = rng.random_genome(&schema);
        let mut genome = original.clone();

        rng.mutate(&mut genome, &schema, Some(1.0), 0.1);
        assert_ne!(genome, original);
        assert!(schema.validate(&genome).is_ok());
    }

    #[test]
    fn test_integer_gene_steps_by_one() {
        let mut rng = GenomeRng::new(5);
        let schema = schema();
        let mut genome = rng.random_genome(&schema);
        let before = genome.genes[3];

        rng.mutate(&mut genome, &schema, Some(1.0), 0.1);
        let after = genome.genes[3];
        assert_eq!(after.fract(), 0.0);
        assert!((after - before).abs() <= 1.0);
    }

    #[test]
    fn test_genome_distance() {
        let g1 = Genome::new(vec![0.0, 0.0, 0.0, 1.0]);
        let g2 = Genome::new(vec![0.3, 0.4, 0.0, 1.0]);
        let g3 = Genome::new(vec![0.0, 0.0, 0.0, 11.0]);

        assert!(genome_distance(&g1, &g1, 10.0).abs() < 1e-12);
        assert!((genome_distance(&g1, &g2, 10.0) - 0.5).abs() < 1e-12);
        assert!((genome_distance(&g1, &g3, 10.0) - 1.0).abs() < 1e-12);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_mutation_respects_bounds(seed in any::<u64>(), strength in 0.0f64..=2.0) {
            let schema = schema();
            let mut rng = GenomeRng::new(seed);
            for _ in 0..320 {
                let mut genome = rng.random_genome(&schema);
                for _ in 0..10 {
                    rng.mutate(&mut genome, &schema, None, strength);
                    rng.mutate(&mut genome, &schema, Some(1.0), strength);
                }
                prop_assert!(schema.validate(&genome).is_ok());
            }
        }
    }
}
