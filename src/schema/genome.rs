//! Genome layout and the codec between flat genomes and run parameters.
//!
//! A genome is a flat vector of `f64` genes. The first [`ABIOTIC_GENES`]
//! genes are the simulator's abiotic controls; the rest parameterise the
//! network generator and depend on the configured [`NetworkScheme`].

use serde::{Deserialize, Serialize};

use super::{GenomeConstraints, NetworkScheme};

/// Number of leading abiotic genes (diffusion, seeding, clearing).
pub const ABIOTIC_GENES: usize = 3;

/// Value domain of a single gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneKind {
    /// Real-valued gene.
    Continuous,
    /// Whole-number gene stored as `f64`.
    Integer,
}

/// Name, kind and inclusive bounds of one gene position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneSpec {
    pub name: String,
    pub kind: GeneKind,
    pub lower: f64,
    pub upper: f64,
}

impl GeneSpec {
    fn continuous(name: &str, bounds: (f64, f64)) -> Self {
        Self {
            name: name.to_string(),
            kind: GeneKind::Continuous,
            lower: bounds.0,
            upper: bounds.1,
        }
    }

    fn integer(name: &str, bounds: (usize, usize)) -> Self {
        Self {
            name: name.to_string(),
            kind: GeneKind::Integer,
            lower: bounds.0 as f64,
            upper: bounds.1 as f64,
        }
    }

    /// Clamp a value into this gene's domain.
    pub fn clamp(&self, value: f64) -> f64 {
        match self.kind {
            GeneKind::Continuous => value.clamp(self.lower, self.upper),
            GeneKind::Integer => value.round().clamp(self.lower, self.upper),
        }
    }

    /// Whether a value lies in this gene's domain.
    pub fn contains(&self, value: f64) -> bool {
        let in_bounds = value >= self.lower && value <= self.upper;
        match self.kind {
            GeneKind::Continuous => in_bounds,
            GeneKind::Integer => in_bounds && value.fract() == 0.0,
        }
    }
}

/// Flat genome shared by every individual in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome {
    pub genes: Vec<f64>,
}

impl Genome {
    pub fn new(genes: Vec<f64>) -> Self {
        Self { genes }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

/// Simulator-level controls independent of the network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbioticParams {
    pub diffusion: f64,
    pub seeding_prob: f64,
    pub clear_prob: f64,
}

/// Distribution of fresh edge weights in the Klemm–Eguíluz construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WeightDistribution {
    /// Uniform on [-1, 1].
    Uniform,
    /// Normal(mean, sigma) clipped to [-1, 1].
    Gaussian { mean: f64, sigma: f64 },
}

/// Parameters of a plain Klemm–Eguíluz network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KlemmParams {
    /// Size of the initial fully connected active set.
    pub clique_size: usize,
    /// Probability that a new node links to an active node.
    pub clique_linkage: f64,
    pub weights: WeightDistribution,
}

/// Parameters of the community-signed Klemm–Eguíluz variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommunityParams {
    pub clique_size: usize,
    pub clique_linkage: f64,
    /// Share of edge weight placed on inter-community edges.
    pub muw: f64,
    /// Exponent coupling edge weight to endpoint degrees.
    pub beta: f64,
    /// Probability that an intra-community edge stays positive.
    pub pct_pos_in: f64,
    /// Probability that an inter-community edge stays positive.
    pub pct_pos_out: f64,
}

/// Structural parameters handed to the network generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum NetworkParams {
    Klemm(KlemmParams),
    Community(CommunityParams),
}

impl NetworkParams {
    /// Scheme this parameter set belongs to.
    pub fn scheme(&self) -> NetworkScheme {
        match self {
            NetworkParams::Klemm(KlemmParams {
                weights: WeightDistribution::Uniform,
                ..
            }) => NetworkScheme::Klemm,
            NetworkParams::Klemm(_) => NetworkScheme::KlemmGaussian,
            NetworkParams::Community(_) => NetworkScheme::KlemmCommunity,
        }
    }
}

/// A genome split into its abiotic and structural halves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodedGenome {
    pub abiotic: AbioticParams,
    pub network: NetworkParams,
}

/// Genome layout errors. These are configuration or programmer errors and
/// stop a run.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Gene '{gene}' has inverted or non-finite bounds ({lower}, {upper})")]
    InvalidBounds { gene: String, lower: f64, upper: f64 },
    #[error("Gene '{gene}' bounds outside its domain: {reason}")]
    OutOfDomain { gene: String, reason: String },
    #[error("Genome has {actual} genes, schema expects {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Gene {index} ('{gene}') = {value} is outside [{lower}, {upper}]")]
    GeneOutOfBounds {
        index: usize,
        gene: String,
        value: f64,
        lower: f64,
        upper: f64,
    },
    #[error("Gene {index} ('{gene}') = {value} must be a whole number")]
    NotInteger {
        index: usize,
        gene: String,
        value: f64,
    },
    #[error("Parameters for scheme {actual:?} cannot be encoded by a {expected:?} schema")]
    SchemeMismatch {
        expected: NetworkScheme,
        actual: NetworkScheme,
    },
}

/// Largest allowed degree exponent for the community scheme.
pub const MAX_BETA: f64 = 10.0;

/// Fixed per-run gene table plus the codec for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeSchema {
    scheme: NetworkScheme,
    genes: Vec<GeneSpec>,
}

impl GenomeSchema {
    /// Build the gene table for a scheme, checking every bound against its
    /// domain.
    pub fn new(
        scheme: NetworkScheme,
        constraints: &GenomeConstraints,
        species_count: usize,
    ) -> Result<Self, SchemaError> {
        let c = constraints;
        let mut genes = vec![
            GeneSpec::continuous("diffusion", c.diffusion_bounds),
            GeneSpec::continuous("seeding_prob", c.seeding_bounds),
            GeneSpec::continuous("clear_prob", c.clear_bounds),
            GeneSpec::integer("clique_size", c.clique_size_bounds),
            GeneSpec::continuous("clique_linkage", c.clique_linkage_bounds),
        ];
        match scheme {
            NetworkScheme::Klemm => {}
            NetworkScheme::KlemmGaussian => {
                genes.push(GeneSpec::continuous("weight_mean", c.weight_mean_bounds));
                genes.push(GeneSpec::continuous("weight_sigma", c.weight_sigma_bounds));
            }
            NetworkScheme::KlemmCommunity => {
                genes.push(GeneSpec::continuous("muw", c.muw_bounds));
                genes.push(GeneSpec::continuous("beta", c.beta_bounds));
                genes.push(GeneSpec::continuous("pct_pos_in", c.pct_pos_in_bounds));
                genes.push(GeneSpec::continuous("pct_pos_out", c.pct_pos_out_bounds));
            }
        }

        for gene in &genes {
            if !gene.lower.is_finite() || !gene.upper.is_finite() || gene.lower > gene.upper {
                return Err(SchemaError::InvalidBounds {
                    gene: gene.name.clone(),
                    lower: gene.lower,
                    upper: gene.upper,
                });
            }
            let (lo, hi) = match gene.name.as_str() {
                "clique_size" => (1.0, species_count as f64),
                "weight_mean" => (-1.0, 1.0),
                "weight_sigma" => (0.0, f64::INFINITY),
                "beta" => (0.0, MAX_BETA),
                _ => (0.0, 1.0),
            };
            if gene.lower < lo || gene.upper > hi {
                return Err(SchemaError::OutOfDomain {
                    gene: gene.name.clone(),
                    reason: format!(
                        "({}, {}) must lie within ({}, {})",
                        gene.lower, gene.upper, lo, hi
                    ),
                });
            }
        }

        Ok(Self { scheme, genes })
    }

    pub fn scheme(&self) -> NetworkScheme {
        self.scheme
    }

    pub fn genes(&self) -> &[GeneSpec] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Check length, bounds and integrality of every gene.
    pub fn validate(&self, genome: &Genome) -> Result<(), SchemaError> {
        if genome.len() != self.genes.len() {
            return Err(SchemaError::LengthMismatch {
                expected: self.genes.len(),
                actual: genome.len(),
            });
        }
        for (index, (spec, &value)) in self.genes.iter().zip(&genome.genes).enumerate() {
            if spec.kind == GeneKind::Integer && value.fract() != 0.0 {
                return Err(SchemaError::NotInteger {
                    index,
                    gene: spec.name.clone(),
                    value,
                });
            }
            if !spec.contains(value) {
                return Err(SchemaError::GeneOutOfBounds {
                    index,
                    gene: spec.name.clone(),
                    value,
                    lower: spec.lower,
                    upper: spec.upper,
                });
            }
        }
        Ok(())
    }

    /// Split a genome into abiotic and network parameters.
    pub fn decode(&self, genome: &Genome) -> Result<DecodedGenome, SchemaError> {
        self.validate(genome)?;
        let g = &genome.genes;

        let abiotic = AbioticParams {
            diffusion: g[0],
            seeding_prob: g[1],
            clear_prob: g[2],
        };
        let clique_size = g[3] as usize;
        let clique_linkage = g[4];

        let network = match self.scheme {
            NetworkScheme::Klemm => NetworkParams::Klemm(KlemmParams {
                clique_size,
                clique_linkage,
                weights: WeightDistribution::Uniform,
            }),
            NetworkScheme::KlemmGaussian => NetworkParams::Klemm(KlemmParams {
                clique_size,
                clique_linkage,
                weights: WeightDistribution::Gaussian {
                    mean: g[5],
                    sigma: g[6],
                },
            }),
            NetworkScheme::KlemmCommunity => NetworkParams::Community(CommunityParams {
                clique_size,
                clique_linkage,
                muw: g[5],
                beta: g[6],
                pct_pos_in: g[7],
                pct_pos_out: g[8],
            }),
        };

        Ok(DecodedGenome { abiotic, network })
    }

    /// Flatten parameters back into a genome.
    pub fn encode(&self, decoded: &DecodedGenome) -> Result<Genome, SchemaError> {
        let actual = decoded.network.scheme();
        if actual != self.scheme {
            return Err(SchemaError::SchemeMismatch {
                expected: self.scheme,
                actual,
            });
        }

        let a = &decoded.abiotic;
        let mut genes = vec![a.diffusion, a.seeding_prob, a.clear_prob];
        match decoded.network {
            NetworkParams::Klemm(p) => {
                genes.push(p.clique_size as f64);
                genes.push(p.clique_linkage);
                if let WeightDistribution::Gaussian { mean, sigma } = p.weights {
                    genes.push(mean);
                    genes.push(sigma);
                }
            }
            NetworkParams::Community(p) => {
                genes.extend([
                    p.clique_size as f64,
                    p.clique_linkage,
                    p.muw,
                    p.beta,
                    p.pct_pos_in,
                    p.pct_pos_out,
                ]);
            }
        }

        let genome = Genome::new(genes);
        self.validate(&genome)?;
        Ok(genome)
    }
}
