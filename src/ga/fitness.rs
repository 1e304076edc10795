//! Composite Fitness
//!
//! Scores a candidate grouping of basic roles by two error terms:
//!
//! - *Role similarity error*: the worst composite similarity between any
//!   two groups, measured by cosine similarity of average call-frequency
//!   vectors. Merging dissimilar behaviours is penalized by leaving
//!   similar behaviours in separate groups.
//! - *Generalization error*: the over-prediction rate when each basic
//!   role's permissions are predicted from its Jaccard-closest group.
//!
//! `score = 1 / (α·simErr + (1−α)·genErr + 10⁻³)`, higher is better.
//!
//! All three memo layers (average-frequency vectors, pairwise similarity,
//! canonical-chromosome fitness) live inside the evaluator and are
//! dropped with it at the end of the mining run. The caches are
//! append-only and safe for concurrent readers, so population evaluation
//! can fan out across a thread pool.

use super::chromosome::Chromosome;
use crate::lattice::Concept;
use crate::matrix::{BitSet, FrequencyMatrix, PermissionMatrix};
use dashmap::DashMap;

/// Additive fitness floor keeping the score finite on perfect groupings
const SCORE_EPSILON: f64 = 1e-3;

/// Fitness evaluator over a fixed basic-role set
pub struct FitnessEvaluator {
    basic_roles: Vec<Concept>,
    permissions: PermissionMatrix,
    sim_ratio: f64,
    /// Average call-frequency vector per basic role, over the full
    /// function list (zero-frequency columns included)
    afvs: Vec<Vec<f64>>,
    /// Pairwise role similarity, keyed by (low index, high index)
    sim_cache: DashMap<(usize, usize), f64>,
    /// Memoized score per canonical chromosome
    fitness_cache: DashMap<Vec<u32>, f64>,
}

impl FitnessEvaluator {
    /// Build an evaluator; average-frequency vectors are computed eagerly
    pub fn new(
        basic_roles: Vec<Concept>,
        permissions: PermissionMatrix,
        frequencies: &FrequencyMatrix,
        sim_ratio: f64,
    ) -> Self {
        let afvs = basic_roles
            .iter()
            .map(|role| average_frequency_vector(role, frequencies))
            .collect();
        FitnessEvaluator {
            basic_roles,
            permissions,
            sim_ratio,
            afvs,
            sim_cache: DashMap::new(),
            fitness_cache: DashMap::new(),
        }
    }

    /// The basic roles this evaluator scores groupings of
    pub fn basic_roles(&self) -> &[Concept] {
        &self.basic_roles
    }

    /// Score a chromosome, memoized on its canonical form
    pub fn evaluate(&self, chromosome: &Chromosome) -> f64 {
        let canonical = chromosome.canonicalize();
        if let Some(score) = self.fitness_cache.get(&canonical.genes) {
            return *score;
        }
        let (score, _, _) = self.components(&canonical);
        self.fitness_cache.insert(canonical.genes, score);
        score
    }

    /// Score plus its (simErr, genErr) components, uncached
    pub fn components(&self, chromosome: &Chromosome) -> (f64, f64, f64) {
        let groups = chromosome.decode();
        let sim_err = self.similarity_error(&groups);
        let gen_err = self.generalization_error(&groups);
        let a = self.sim_ratio;
        let score = 1.0 / (a * sim_err + (1.0 - a) * gen_err + SCORE_EPSILON);
        (score, sim_err, gen_err)
    }

    /// Cosine similarity of two basic roles' average-frequency vectors.
    ///
    /// A zero vector on either side makes the cosine distance 0, so the
    /// similarity is 1.
    pub fn similarity(&self, a: usize, b: usize) -> f64 {
        let key = (a.min(b), a.max(b));
        if let Some(sim) = self.sim_cache.get(&key) {
            return *sim;
        }
        let sim = cosine_similarity(&self.afvs[a], &self.afvs[b]);
        self.sim_cache.insert(key, sim);
        sim
    }

    /// Composite similarity of two groups: each member's best match on
    /// the other side, averaged over both sides
    fn composite_similarity(&self, g1: &[usize], g2: &[usize]) -> f64 {
        let side = |from: &[usize], to: &[usize]| -> f64 {
            from.iter()
                .map(|&r| {
                    to.iter()
                        .map(|&s| self.similarity(r, s))
                        .fold(0.0, f64::max)
                })
                .sum::<f64>()
        };
        (side(g1, g2) + side(g2, g1)) / (g1.len() + g2.len()) as f64
    }

    /// Worst pairwise composite similarity across the partition
    fn similarity_error(&self, groups: &[Vec<usize>]) -> f64 {
        let mut worst = 0.0f64;
        for i in 0..groups.len() {
            for j in (i + 1)..groups.len() {
                worst = worst.max(self.composite_similarity(&groups[i], &groups[j]));
            }
        }
        worst
    }

    /// Mean over-prediction rate when predicting each basic role from its
    /// Jaccard-closest group
    fn generalization_error(&self, groups: &[Vec<usize>]) -> f64 {
        let group_functions: Vec<BitSet> = groups
            .iter()
            .map(|group| {
                let mut functions = BitSet::new(self.permissions.functions());
                for &r in group {
                    functions.union_with(&self.basic_roles[r].intent);
                }
                functions
            })
            .collect();

        let mut total = 0.0f64;
        let mut counter = 0usize;
        for role in &self.basic_roles {
            let Some(closest) = self.closest_group(&role.intent, &group_functions) else {
                continue;
            };
            let predicted = &group_functions[closest];
            let users = role.extent.count();
            let observed = self.permissions.popcount_sub(&role.extent, predicted);
            let delta = users * predicted.count() - observed;
            if delta == 0 {
                continue;
            }
            let l1 = self.permissions.popcount_rows(&role.extent);
            total += delta as f64 / (l1 + delta) as f64;
            counter += 1;
        }
        if counter > 0 {
            total / counter as f64
        } else {
            0.0
        }
    }

    /// Group with the strictly greatest Jaccard overlap to `functions`.
    /// `None` when every group has zero overlap.
    fn closest_group(&self, functions: &BitSet, group_functions: &[BitSet]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (g, group) in group_functions.iter().enumerate() {
            let score = jaccard(group, functions);
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((g, score));
            }
        }
        best.map(|(g, _)| g)
    }
}

/// Mean per-function call count over the role's members, defined on the
/// full function index
pub fn average_frequency_vector(role: &Concept, frequencies: &FrequencyMatrix) -> Vec<f64> {
    let members = role.extent.count() as f64;
    (0..frequencies.functions())
        .map(|f| frequencies.column_sum(&role.extent, f) as f64 / members)
        .collect()
}

/// Jaccard overlap of two function sets
fn jaccard(a: &BitSet, b: &BitSet) -> f64 {
    let mut intersection = a.clone();
    intersection.intersect_with(b);
    let mut union = a.clone();
    union.union_with(b);
    if union.is_empty() {
        0.0
    } else {
        intersection.count() as f64 / union.count() as f64
    }
}

/// `1 − cosine_distance`, with the zero-vector edge case mapping to 1
fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(users: &[usize], funcs: &[usize], nu: usize, nf: usize) -> Concept {
        Concept {
            extent: BitSet::from_indices(nu, users.iter().copied()),
            intent: BitSet::from_indices(nf, funcs.iter().copied()),
        }
    }

    /// two users with disjoint functions: a→f0 ×10, b→f1 ×1
    fn disjoint_evaluator(sim_ratio: f64) -> FitnessEvaluator {
        let mut p = PermissionMatrix::new(2, 2);
        p.set(0, 0);
        p.set(1, 1);
        let mut f = FrequencyMatrix::new(2, 2);
        f.add(0, 0, 10);
        f.add(1, 1, 1);
        let roles = vec![concept(&[0], &[0], 2, 2), concept(&[1], &[1], 2, 2)];
        FitnessEvaluator::new(roles, p, &f, sim_ratio)
    }

    #[test]
    fn test_afv_means_counts() {
        let mut f = FrequencyMatrix::new(3, 2);
        f.add(0, 0, 4);
        f.add(1, 0, 2);
        f.add(1, 1, 6);
        let role = concept(&[0, 1], &[0], 3, 2);
        let afv = average_frequency_vector(&role, &f);
        assert_eq!(afv, vec![3.0, 3.0]);
    }

    #[test]
    fn test_similarity_of_identical_roles() {
        let eval = disjoint_evaluator(0.5);
        assert!((eval.similarity(0, 0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_similarity_of_orthogonal_roles() {
        let eval = disjoint_evaluator(0.5);
        assert!(eval.similarity(0, 1).abs() < 1e-12);
    }

    #[test]
    fn test_single_group_has_zero_sim_err() {
        let eval = disjoint_evaluator(0.5);
        let (_, sim_err, _) = eval.components(&Chromosome::new(vec![0, 0]));
        assert_eq!(sim_err, 0.0);
    }

    #[test]
    fn test_disjoint_roles_prefer_separation() {
        let eval = disjoint_evaluator(0.5);
        let separate = eval.evaluate(&Chromosome::new(vec![0, 1]));
        let merged = eval.evaluate(&Chromosome::new(vec![0, 0]));
        assert!(
            separate > merged,
            "separate {separate} should beat merged {merged}"
        );
    }

    #[test]
    fn test_exact_grouping_has_zero_gen_err() {
        let eval = disjoint_evaluator(0.5);
        let (_, _, gen_err) = eval.components(&Chromosome::new(vec![0, 1]));
        assert_eq!(gen_err, 0.0);
    }

    #[test]
    fn test_merged_grouping_over_predicts() {
        let eval = disjoint_evaluator(0.0);
        // one group predicts both functions for both users: 2 phantom cells
        let (_, _, gen_err) = eval.components(&Chromosome::new(vec![0, 0]));
        // per role: delta=1, L1=1, err=0.5; mean = 0.5
        assert!((gen_err - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_deterministic_and_cached() {
        let eval = disjoint_evaluator(0.5);
        let a = eval.evaluate(&Chromosome::new(vec![1, 0]));
        let b = eval.evaluate(&Chromosome::new(vec![1, 0]));
        assert_eq!(a, b);
        // permutation-equivalent chromosome hits the same memo entry
        let c = eval.evaluate(&Chromosome::new(vec![0, 1]));
        assert_eq!(a, c);
    }

    #[test]
    fn test_zero_vector_similarity_is_one() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 1.0);
    }
}
