//! Lexicase parent selection.

use rand::prelude::*;

use crate::schema::{FitnessRecord, Genome};

/// A population member in the selection pool.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Position in the population the pool was built from.
    pub index: usize,
    pub genome: Genome,
    pub fitness: FitnessRecord,
}

/// Pick one candidate by lexicase selection and remove it from the pool.
///
/// Objectives are visited in a random order. At each step only the
/// candidates scoring exactly the best value among the survivors are kept
/// (NaN ranks below every number). Remaining ties are broken uniformly at
/// random. Returns `None` for an empty pool.
pub fn select_one<R: Rng + ?Sized>(
    pool: &mut Vec<Candidate>,
    objectives: &[usize],
    rng: &mut R,
) -> Option<Candidate> {
    if pool.is_empty() {
        return None;
    }

    let mut order = objectives.to_vec();
    order.shuffle(rng);

    let mut survivors: Vec<usize> = (0..pool.len()).collect();
    for &objective in &order {
        if survivors.len() <= 1 {
            break;
        }
        let best = survivors
            .iter()
            .map(|&i| rank_value(pool[i].fitness.value(objective)))
            .fold(f64::NEG_INFINITY, f64::max);
        survivors.retain(|&i| rank_value(pool[i].fitness.value(objective)) == best);
    }

    let winner = match survivors.as_slice() {
        [only] => *only,
        many => *many.choose(rng)?,
    };
    Some(pool.remove(winner))
}

#[inline]
fn rank_value(value: f64) -> f64 {
    if value.is_nan() {
        f64::NEG_INFINITY
    } else {
        value
    }
}
