//! Community-signed variant of the Klemm–Eguíluz network.
//!
//! The topology comes from [`klemm_eguiluz`]. Communities are found by label
//! propagation on the undirected topology, edges are re-weighted so that a
//! `muw` share of weight falls on inter-community edges, weights are min-max
//! rescaled to [0, 1], and finally each edge is made negative with a
//! probability that depends on whether its endpoints share a community.

use rand::prelude::*;

use super::matrix::InteractionMatrix;
use super::network::{RETRY_BUDGET, klemm_eguiluz};
use crate::schema::{CommunityParams, WeightDistribution};

/// Build a community-signed interaction matrix.
pub fn community_network<R: Rng + ?Sized>(
    rng: &mut R,
    size: usize,
    params: &CommunityParams,
) -> InteractionMatrix {
    let topology = klemm_eguiluz(
        rng,
        size,
        params.clique_size,
        params.clique_linkage,
        &WeightDistribution::Uniform,
    );
    let communities = detect_communities(rng, &topology.matrix);

    // Degrees are taken relative to the largest one so the power stays <= 1.
    let max_degree = topology.degrees.iter().copied().max().unwrap_or(0).max(1) as f64;
    let mut matrix = InteractionMatrix::zeros(size);
    for i in 0..size {
        for j in 0..size {
            if i == j || topology.matrix.get(i, j) == 0.0 {
                continue;
            }
            let mix = if communities[i] == communities[j] {
                1.0 - params.muw
            } else {
                params.muw
            };
            let ki = topology.degrees[i] as f64 / max_degree;
            let kj = topology.degrees[j] as f64 / max_degree;
            let strength = (ki * kj).powf(params.beta / 2.0);
            let jitter = 1.0 - rng.r#gen::<f64>();
            matrix.set(i, j, jitter * strength * mix);
        }
    }

    rescale_unit(&mut matrix);
    assign_signs(
        rng,
        &mut matrix,
        &communities,
        params.pct_pos_in,
        params.pct_pos_out,
    );
    matrix
}

/// Label propagation on the undirected view of `matrix`.
///
/// Returns a community label per node, numbered from 0 in order of first
/// appearance. Isolated nodes form singleton communities.
pub fn detect_communities<R: Rng + ?Sized>(rng: &mut R, matrix: &InteractionMatrix) -> Vec<usize> {
    let n = matrix.size();
    let neighbors: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| j != i && (matrix.get(i, j) != 0.0 || matrix.get(j, i) != 0.0))
                .collect()
        })
        .collect();

    let mut labels: Vec<usize> = (0..n).collect();
    let mut order: Vec<usize> = (0..n).collect();
    let mut counts = vec![0usize; n];

    for _ in 0..RETRY_BUDGET {
        order.shuffle(rng);
        let mut changed = false;

        for &node in &order {
            if neighbors[node].is_empty() {
                continue;
            }
            counts.iter_mut().for_each(|c| *c = 0);
            for &nb in &neighbors[node] {
                counts[labels[nb]] += 1;
            }
            let best = counts.iter().copied().max().unwrap_or(0);
            if counts[labels[node]] == best {
                continue;
            }
            let candidates: Vec<usize> = (0..n).filter(|&l| counts[l] == best).collect();
            if let Some(&label) = candidates.choose(rng) {
                labels[node] = label;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    let mut remap = vec![usize::MAX; n];
    let mut next = 0;
    for label in labels.iter_mut() {
        if remap[*label] == usize::MAX {
            remap[*label] = next;
            next += 1;
        }
        *label = remap[*label];
    }
    labels
}

/// Min-max rescale every nonzero entry using the extremes of the whole
/// matrix, zeros included.
pub fn rescale_unit(matrix: &mut InteractionMatrix) {
    let weights = matrix.weights_mut();
    let min = weights.iter().copied().fold(f64::INFINITY, f64::min);
    let max = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    for w in weights.iter_mut().filter(|w| **w != 0.0) {
        *w = if range > 0.0 { (*w - min) / range } else { 1.0 };
    }
}

/// Flip each nonzero weight negative unless a uniform draw falls within the
/// intra- or inter-community positive probability.
pub fn assign_signs<R: Rng + ?Sized>(
    rng: &mut R,
    matrix: &mut InteractionMatrix,
    communities: &[usize],
    pct_pos_in: f64,
    pct_pos_out: f64,
) {
    let n = matrix.size();
    for i in 0..n {
        for j in 0..n {
            let w = matrix.get(i, j);
            if w == 0.0 {
                continue;
            }
            let keep_positive = if communities[i] == communities[j] {
                pct_pos_in
            } else {
                pct_pos_out
            };
            if rng.r#gen::<f64>() > keep_positive {
                matrix.set(i, j, -w);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pct_pos_in: f64, pct_pos_out: f64) -> CommunityParams {
        CommunityParams {
            clique_size: 3,
            clique_linkage: 0.6,
            muw: 0.3,
            beta: 1.5,
            pct_pos_in,
            pct_pos_out,
        }
    }

    #[test]
    fn test_two_cliques_split() {
        let mut matrix = InteractionMatrix::zeros(6);
        for group in [[0, 1, 2], [3, 4, 5]] {
            for &i in &group {
                for &j in &group {
                    if i != j {
                        matrix.set(i, j, 0.5);
                    }
                }
            }
        }
        let labels = detect_communities(&mut StdRng::seed_from_u64(0), &matrix);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_isolated_nodes_are_singletons() {
        let matrix = InteractionMatrix::zeros(3);
        let labels = detect_communities(&mut StdRng::seed_from_u64(1), &matrix);
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn test_rescale_includes_zero() {
        let mut matrix = InteractionMatrix::from_rows(vec![vec![0.0, 2.0], vec![4.0, 0.0]]).unwrap();
        rescale_unit(&mut matrix);
        assert_eq!(matrix.get(0, 1), 0.5);
        assert_eq!(matrix.get(1, 0), 1.0);
        assert_eq!(matrix.get(0, 0), 0.0);
    }

    #[test]
    fn test_all_positive_when_probabilities_one() {
        let matrix = community_network(&mut StdRng::seed_from_u64(4), 12, &params(1.0, 1.0));
        assert!(matrix.weights().iter().all(|&w| (0.0..=1.0).contains(&w)));
        assert!(!matrix.is_degenerate());
    }

    #[test]
    fn test_all_negative_when_probabilities_zero() {
        let matrix = community_network(&mut StdRng::seed_from_u64(4), 12, &params(0.0, 0.0));
        assert!(matrix.weights().iter().all(|&w| (-1.0..=0.0).contains(&w)));
    }

    #[test]
    fn test_weights_stay_in_unit_range_at_max_beta() {
        let params = CommunityParams {
            clique_size: 8,
            clique_linkage: 0.5,
            muw: 0.3,
            beta: crate::schema::MAX_BETA,
            pct_pos_in: 0.7,
            pct_pos_out: 0.3,
        };
        for seed in 0..5 {
            let matrix = community_network(&mut StdRng::seed_from_u64(seed), 60, &params);
            assert!(
                matrix
                    .weights()
                    .iter()
                    .all(|w| w.is_finite() && (-1.0..=1.0).contains(w))
            );
            assert!(!matrix.is_degenerate());
        }
    }

    #[test]
    fn test_signs_follow_membership() {
        let mut matrix = InteractionMatrix::from_rows(vec![
            vec![0.0, 0.5, 0.5],
            vec![0.5, 0.0, 0.5],
            vec![0.5, 0.5, 0.0],
        ])
        .unwrap();
        let communities = [0, 0, 1];
        assign_signs(
            &mut StdRng::seed_from_u64(2),
            &mut matrix,
            &communities,
            1.0,
            0.0,
        );
        assert!(matrix.get(0, 1) > 0.0);
        assert!(matrix.get(1, 0) > 0.0);
        assert!(matrix.get(0, 2) < 0.0);
        assert!(matrix.get(2, 1) < 0.0);
    }
}
