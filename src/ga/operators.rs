//! GA Operators
//!
//! Initialization, linear fitness scaling, tournament selection,
//! single-point crossover and the two mutation operators (position swap
//! and per-gene re-draw). All randomness flows through the caller's
//! seeded RNG, so a fixed seed reproduces a run exactly.

use super::chromosome::Chromosome;
use rand::rngs::StdRng;
use rand::Rng;

/// Linear-scaling multiplier: the best individual is worth this many
/// times the population average after scaling
const SCALE_MULTIPLIER: f64 = 1.2;

/// Uniform random population: genes in `[0, n)`, `population` individuals
pub fn initialize_population(rng: &mut StdRng, population: usize, n: usize) -> Vec<Chromosome> {
    (0..population)
        .map(|_| {
            Chromosome::new(
                (0..n)
                    .map(|_| rng.gen_range(0..n as u32))
                    .collect(),
            )
        })
        .collect()
}

/// Goldberg linear scaling of raw fitness before selection.
///
/// Scales so the population average keeps its value while the best
/// individual is worth `SCALE_MULTIPLIER` times the average; negative
/// scaled values clamp to zero. A uniform population scales to itself.
pub fn linear_scaling(raw: &[f64]) -> Vec<f64> {
    if raw.is_empty() {
        return Vec::new();
    }
    let max = raw.iter().copied().fold(f64::MIN, f64::max);
    let min = raw.iter().copied().fold(f64::MAX, f64::min);
    let avg = raw.iter().sum::<f64>() / raw.len() as f64;
    if (max - avg).abs() < f64::EPSILON {
        return raw.to_vec();
    }
    let (a, b) = if min > (SCALE_MULTIPLIER * avg - max) / (SCALE_MULTIPLIER - 1.0) {
        let delta = max - avg;
        (
            (SCALE_MULTIPLIER - 1.0) * avg / delta,
            avg * (max - SCALE_MULTIPLIER * avg) / delta,
        )
    } else {
        let delta = avg - min;
        (avg / delta, -min * avg / delta)
    };
    raw.iter().map(|&f| (a * f + b).max(0.0)).collect()
}

/// Tournament selection over scaled fitness: draw `pool` contestants,
/// return the index of the fittest
pub fn tournament_select(rng: &mut StdRng, scaled: &[f64], pool: usize) -> usize {
    let mut winner = rng.gen_range(0..scaled.len());
    for _ in 1..pool {
        let challenger = rng.gen_range(0..scaled.len());
        if scaled[challenger] > scaled[winner] {
            winner = challenger;
        }
    }
    winner
}

/// Single-point crossover. With probability `rate` the parents exchange
/// tails at a random cut; otherwise the offspring are clones.
pub fn single_point_crossover(
    rng: &mut StdRng,
    mother: &Chromosome,
    father: &Chromosome,
    rate: f64,
) -> (Chromosome, Chromosome) {
    let n = mother.len();
    if n < 2 || rng.gen::<f64>() >= rate {
        return (mother.clone(), father.clone());
    }
    let cut = rng.gen_range(1..n);
    let mut sister = mother.genes[..cut].to_vec();
    sister.extend_from_slice(&father.genes[cut..]);
    let mut brother = father.genes[..cut].to_vec();
    brother.extend_from_slice(&mother.genes[cut..]);
    (Chromosome::new(sister), Chromosome::new(brother))
}

/// Swap mutation: with probability `rate`, exchange two random positions
pub fn mutate_swap(rng: &mut StdRng, chromosome: &mut Chromosome, rate: f64) {
    let n = chromosome.len();
    if n < 2 || rng.gen::<f64>() >= rate {
        return;
    }
    let i = rng.gen_range(0..n);
    let j = rng.gen_range(0..n);
    chromosome.genes.swap(i, j);
}

/// Re-draw mutation: each gene is independently replaced by a uniform
/// value in `[0, n)` with probability `rate`
pub fn mutate_redraw(rng: &mut StdRng, chromosome: &mut Chromosome, rate: f64) {
    let n = chromosome.len() as u32;
    for gene in &mut chromosome.genes {
        if rng.gen::<f64>() < rate {
            *gene = rng.gen_range(0..n);
        }
    }
}
