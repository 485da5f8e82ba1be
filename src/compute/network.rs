//! Klemm–Eguíluz interaction network construction.
//!
//! Networks grow from a fully connected clique of active nodes. Each new node
//! links to every active node with probability `clique_linkage`, otherwise to
//! a deactivated node picked in proportion to its degree. The new node then
//! joins the active set and one active node is deactivated, favouring low
//! degree. Construction is reseeded on every call, so identical parameters
//! always give identical matrices.

use rand::prelude::*;
use rand_distr::{Normal, StandardNormal};

use super::community::community_network;
use super::matrix::InteractionMatrix;
use crate::schema::{NetworkConfig, NetworkParams, WeightDistribution};

/// Iteration cap for every rejection-sampling loop in network construction.
///
/// Degenerate states (no deactivated node with nonzero degree, an active set
/// of isolated nodes) can make acceptance impossible. Once the budget is
/// spent the attempted edge or deactivation is skipped for that step; the
/// resulting network is still valid, just sparser or with a larger active set.
pub const RETRY_BUDGET: usize = 100;

/// Decimal places kept on freshly drawn weights.
const WEIGHT_DECIMALS: i32 = 3;

/// Weight standard deviation for edges added by [`adjust_connectance`].
const CONNECTANCE_WEIGHT_SIGMA: f64 = 0.25;

/// Builds interaction matrices for one run.
#[derive(Debug, Clone)]
pub struct NetworkGenerator {
    config: NetworkConfig,
    species_count: usize,
}

impl NetworkGenerator {
    pub fn new(config: NetworkConfig, species_count: usize) -> Self {
        Self {
            config,
            species_count,
        }
    }

    pub fn species_count(&self) -> usize {
        self.species_count
    }

    /// Generate the matrix for a parameter set, applying the configured
    /// connectance and self-interaction passes.
    pub fn generate(&self, params: &NetworkParams) -> InteractionMatrix {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut matrix = build(&mut rng, self.species_count, params);

        if let Some(target) = self.config.target_connectance {
            adjust_connectance(&mut matrix, target, &mut rng);
        }
        if self.config.self_interaction != 0.0 {
            let value = self.config.self_interaction.clamp(-1.0, 1.0);
            for i in 0..matrix.size() {
                matrix.set(i, i, value);
            }
        }

        matrix
    }
}

/// Generate a matrix from a seed with no post-processing.
pub fn generate(seed: u64, species_count: usize, params: &NetworkParams) -> InteractionMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    build(&mut rng, species_count, params)
}

fn build<R: Rng + ?Sized>(
    rng: &mut R,
    species_count: usize,
    params: &NetworkParams,
) -> InteractionMatrix {
    match params {
        NetworkParams::Klemm(p) => {
            klemm_eguiluz(
                rng,
                species_count,
                p.clique_size,
                p.clique_linkage,
                &p.weights,
            )
            .matrix
        }
        NetworkParams::Community(p) => community_network(rng, species_count, p),
    }
}

/// Draws directed edge weights.
enum WeightSampler {
    Uniform,
    Gaussian(Normal<f64>),
    Constant(f64),
}

impl WeightSampler {
    fn new(distribution: &WeightDistribution) -> Self {
        match *distribution {
            WeightDistribution::Uniform => WeightSampler::Uniform,
            WeightDistribution::Gaussian { mean, sigma } => match Normal::new(mean, sigma) {
                Ok(normal) => WeightSampler::Gaussian(normal),
                Err(_) => WeightSampler::Constant(mean.clamp(-1.0, 1.0)),
            },
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let raw = match self {
            WeightSampler::Uniform => rng.gen_range(-1.0..=1.0),
            WeightSampler::Gaussian(normal) => normal.sample(rng).clamp(-1.0, 1.0),
            WeightSampler::Constant(value) => *value,
        };
        let scale = 10f64.powi(WEIGHT_DECIMALS);
        (raw * scale).round() / scale
    }
}

/// Klemm–Eguíluz topology with its running degree table.
#[derive(Debug, Clone)]
pub struct KlemmNetwork {
    pub matrix: InteractionMatrix,
    /// Degree per node; every undirected link adds 2 to both endpoints.
    pub degrees: Vec<usize>,
}

impl KlemmNetwork {
    fn link<R: Rng + ?Sized>(&mut self, rng: &mut R, sampler: &WeightSampler, i: usize, j: usize) {
        let forward = sampler.sample(rng);
        let backward = sampler.sample(rng);
        self.matrix.set(i, j, forward);
        self.matrix.set(j, i, backward);
        self.degrees[i] += 2;
        self.degrees[j] += 2;
    }

    fn linked(&self, i: usize, j: usize) -> bool {
        self.matrix.get(i, j) != 0.0 || self.matrix.get(j, i) != 0.0
    }

    /// Link `node` to a deactivated node accepted with probability equal to
    /// its share of the deactivated set's degree.
    fn link_deactivated<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        sampler: &WeightSampler,
        node: usize,
        deactivated: &[usize],
    ) {
        let total: usize = deactivated.iter().map(|&k| self.degrees[k]).sum();

        for _ in 0..RETRY_BUDGET {
            let Some(&target) = deactivated.choose(rng) else {
                return;
            };
            if total == 0 {
                self.link(rng, sampler, node, target);
                return;
            }
            let share = self.degrees[target] as f64 / total as f64;
            if share > rng.r#gen::<f64>() {
                if !self.linked(node, target) {
                    self.link(rng, sampler, node, target);
                }
                return;
            }
        }
        log::trace!("node {node}: no deactivated partner accepted within retry budget");
    }
}

/// Grow a Klemm–Eguíluz network of `size` nodes.
pub fn klemm_eguiluz<R: Rng + ?Sized>(
    rng: &mut R,
    size: usize,
    clique_size: usize,
    clique_linkage: f64,
    weights: &WeightDistribution,
) -> KlemmNetwork {
    let sampler = WeightSampler::new(weights);
    let m = clique_size.min(size);

    let mut network = KlemmNetwork {
        matrix: InteractionMatrix::zeros(size),
        degrees: vec![0; size],
    };
    let mut active: Vec<usize> = (0..m).collect();
    let mut deactivated: Vec<usize> = Vec::new();

    for i in 0..m {
        for j in (i + 1)..m {
            network.link(rng, &sampler, i, j);
        }
    }

    for i in m..size {
        for &j in &active {
            if clique_linkage > rng.r#gen::<f64>() || deactivated.is_empty() {
                network.link(rng, &sampler, i, j);
            } else {
                network.link_deactivated(rng, &sampler, i, &deactivated);
            }
        }

        active.push(i);
        deactivate_one(rng, &network.degrees, &mut active, &mut deactivated);
    }

    network
}

/// Move one active node to the deactivated set, accepted with probability
/// proportional to its inverse degree. Zero-degree nodes are never accepted.
fn deactivate_one<R: Rng + ?Sized>(
    rng: &mut R,
    degrees: &[usize],
    active: &mut Vec<usize>,
    deactivated: &mut Vec<usize>,
) {
    let inverse_total: f64 = active
        .iter()
        .filter(|&&k| degrees[k] > 0)
        .map(|&k| 1.0 / degrees[k] as f64)
        .sum();
    if inverse_total == 0.0 {
        return;
    }

    for _ in 0..RETRY_BUDGET {
        let pos = rng.gen_range(0..active.len());
        let degree = degrees[active[pos]];
        if degree == 0 {
            continue;
        }
        let p = (1.0 / degree as f64) / inverse_total;
        if p > rng.r#gen::<f64>() {
            deactivated.push(active.remove(pos));
            return;
        }
    }
    log::trace!("active set kept {} nodes: retry budget spent", active.len());
}

/// Add or remove random off-diagonal edges until the matrix reaches the
/// target connectance (or the attempt budget runs out).
pub fn adjust_connectance<R: Rng + ?Sized>(
    matrix: &mut InteractionMatrix,
    target: f64,
    rng: &mut R,
) {
    let n = matrix.size();
    if n < 2 {
        return;
    }
    let possible = n * (n - 1);
    let target_edges = (target.clamp(0.0, 1.0) * possible as f64).round() as usize;
    let mut edges = matrix.edge_count();

    for _ in 0..n * n * RETRY_BUDGET {
        if edges == target_edges {
            return;
        }
        let x = rng.gen_range(0..n);
        let y = rng.gen_range(0..n);
        if x == y {
            continue;
        }
        let present = matrix.get(x, y) != 0.0;
        if edges < target_edges && !present {
            let noise: f64 = rng.sample(StandardNormal);
            let weight = (noise * CONNECTANCE_WEIGHT_SIGMA).clamp(-1.0, 1.0);
            if weight != 0.0 {
                matrix.set(x, y, weight);
                edges += 1;
            }
        } else if edges > target_edges && present {
            matrix.set(x, y, 0.0);
            edges -= 1;
        }
    }
    log::debug!("connectance adjustment stopped at {edges}/{target_edges} edges");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CommunityParams, KlemmParams};
    use proptest::prelude::*;

    fn klemm(clique_size: usize, clique_linkage: f64) -> NetworkParams {
        NetworkParams::Klemm(KlemmParams {
            clique_size,
            clique_linkage,
            weights: WeightDistribution::Uniform,
        })
    }

    #[test]
    fn test_initial_clique_fully_connected() {
        let network = klemm_eguiluz(
            &mut StdRng::seed_from_u64(0),
            9,
            4,
            0.5,
            &WeightDistribution::Uniform,
        );
        // Three clique links per member, 2 degree each.
        for i in 0..4 {
            assert!(network.degrees[i] >= 6, "node {i} missing clique edges");
        }
    }

    #[test]
    fn test_diagonal_zero_without_self_interaction() {
        let matrix = generate(3, 12, &klemm(3, 0.2));
        for i in 0..12 {
            assert_eq!(matrix.get(i, i), 0.0);
        }
    }

    #[test]
    fn test_clique_larger_than_network() {
        let network = klemm_eguiluz(
            &mut StdRng::seed_from_u64(1),
            4,
            10,
            0.5,
            &WeightDistribution::Uniform,
        );
        assert_eq!(network.matrix.size(), 4);
        assert_eq!(network.degrees, vec![6; 4]);
    }

    #[test]
    fn test_every_node_connected() {
        // Linkage 1 always links to the active set, so no node is isolated.
        let network = klemm_eguiluz(
            &mut StdRng::seed_from_u64(7),
            20,
            3,
            1.0,
            &WeightDistribution::Uniform,
        );
        assert!(network.degrees.iter().all(|&k| k > 0));
    }

    #[test]
    fn test_degrees_track_links() {
        let network = klemm_eguiluz(
            &mut StdRng::seed_from_u64(11),
            15,
            2,
            0.3,
            &WeightDistribution::Uniform,
        );
        let total_degree: usize = network.degrees.iter().sum();
        // Linked pairs contribute 2 to each endpoint; rounding can zero an
        // entry, so count pairs with either direction present.
        let mut pairs = 0;
        for i in 0..15 {
            for j in (i + 1)..15 {
                if network.linked(i, j) {
                    pairs += 1;
                }
            }
        }
        assert!(total_degree >= pairs * 4);
    }

    #[test]
    fn test_gaussian_weights_clipped() {
        let params = NetworkParams::Klemm(KlemmParams {
            clique_size: 5,
            clique_linkage: 0.7,
            weights: WeightDistribution::Gaussian {
                mean: 0.9,
                sigma: 1.0,
            },
        });
        let matrix = generate(5, 9, &params);
        assert!(matrix.weights().iter().all(|w| (-1.0..=1.0).contains(w)));
    }

    #[test]
    fn test_generator_post_passes() {
        let config = NetworkConfig {
            target_connectance: Some(0.5),
            self_interaction: -0.1,
            ..Default::default()
        };
        let generator = NetworkGenerator::new(config, 10);
        let matrix = generator.generate(&klemm(2, 0.1));

        assert!((matrix.connectance() - 0.5).abs() < 1e-9);
        for i in 0..10 {
            assert_eq!(matrix.get(i, i), -0.1);
        }
    }

    #[test]
    fn test_connectance_can_remove_edges() {
        let mut matrix = generate(2, 6, &klemm(6, 1.0));
        adjust_connectance(&mut matrix, 0.2, &mut StdRng::seed_from_u64(9));
        assert_eq!(matrix.edge_count(), 6);
    }

    fn any_params() -> impl Strategy<Value = NetworkParams> {
        prop_oneof![
            (1usize..=12, 0.0f64..=1.0).prop_map(|(m, u)| klemm(m, u)),
            (1usize..=12, 0.0f64..=1.0, -1.0f64..=1.0, 0.0f64..=1.0).prop_map(
                |(m, u, mean, sigma)| NetworkParams::Klemm(KlemmParams {
                    clique_size: m,
                    clique_linkage: u,
                    weights: WeightDistribution::Gaussian { mean, sigma },
                })
            ),
            (
                1usize..=12,
                0.0f64..=1.0,
                0.0f64..=1.0,
                0.0f64..=3.0,
                0.0f64..=1.0,
                0.0f64..=1.0
            )
                .prop_map(|(m, u, muw, beta, pin, pout)| {
                    NetworkParams::Community(CommunityParams {
                        clique_size: m,
                        clique_linkage: u,
                        muw,
                        beta,
                        pct_pos_in: pin,
                        pct_pos_out: pout,
                    })
                }),
        ]
    }

    proptest! {
        #[test]
        fn prop_generation_is_deterministic(seed in any::<u64>(), params in any_params()) {
            let a = generate(seed, 12, &params);
            let b = generate(seed, 12, &params);
            let bits_a: Vec<u64> = a.weights().iter().map(|w| w.to_bits()).collect();
            let bits_b: Vec<u64> = b.weights().iter().map(|w| w.to_bits()).collect();
            prop_assert_eq!(bits_a, bits_b);
        }

        #[test]
        fn prop_matrix_square_and_bounded(
            seed in any::<u64>(),
            size in 1usize..=16,
            params in any_params(),
        ) {
            let matrix = generate(seed, size, &params);
            prop_assert_eq!(matrix.size(), size);
            prop_assert_eq!(matrix.weights().len(), size * size);
            prop_assert!(matrix.weights().iter().all(|w| (-1.0..=1.0).contains(w)));
        }
    }
}
