//! Genetic-Algorithm Role Optimizer
//!
//! Clusters basic roles into the final role set. A candidate solution is
//! a grouping chromosome (see [`chromosome`]); its quality is the
//! composite of role-similarity and generalization error (see
//! [`fitness`]). Evolution follows the classic simple-GA loop:
//!
//! ```text
//! Init → Evaluating ↔ Evolving → Done
//! ```
//!
//! Each generation the full population is evaluated (in parallel, the
//! caches make evaluation order irrelevant), then selection, crossover
//! and mutation run serially on the driving thread so a fixed seed
//! reproduces the run bit-for-bit. Cancellation mid-run returns the best
//! individual found so far.

pub mod chromosome;
pub mod fitness;
pub mod operators;

pub use chromosome::Chromosome;
pub use fitness::FitnessEvaluator;

use crate::budget::PhaseBudget;
use crate::config::MiningConfig;
use crate::lattice::Concept;
use crate::matrix::{BitSet, FrequencyMatrix, PermissionMatrix};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Tournament pool size for selection
const TOURNAMENT_POOL: usize = 2;

/// Optimizer lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaState {
    /// Population not yet created
    Init,
    /// Scoring the current population
    Evaluating,
    /// Breeding the next population
    Evolving,
    /// Finished (generation limit or cancellation)
    Done,
}

/// Result of one optimization run
#[derive(Debug, Clone)]
pub struct GaOutcome {
    /// Basic-role index groups of the best individual, in canonical
    /// gene-label order
    pub groups: Vec<Vec<usize>>,
    /// Fitness of the best individual
    pub best_fitness: f64,
    /// Similarity-error component of the best individual
    pub sim_err: f64,
    /// Generalization-error component of the best individual
    pub gen_err: f64,
    /// Generations fully evolved
    pub generations_run: usize,
    /// False when the budget cut the run short
    pub completed: bool,
}

/// Simple GA over grouping chromosomes
pub struct GaOptimizer {
    evaluator: FitnessEvaluator,
    config: MiningConfig,
    state: GaState,
}

impl GaOptimizer {
    /// Build an optimizer over the given basic roles
    pub fn new(
        basic_roles: Vec<Concept>,
        permissions: PermissionMatrix,
        frequencies: &FrequencyMatrix,
        config: MiningConfig,
    ) -> Self {
        let evaluator =
            FitnessEvaluator::new(basic_roles, permissions, frequencies, config.sim_ratio);
        GaOptimizer {
            evaluator,
            config,
            state: GaState::Init,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> GaState {
        self.state
    }

    /// Run the optimization under `budget`.
    ///
    /// On cancellation the best individual found so far is decoded and
    /// returned with `completed = false`.
    pub fn run(&mut self, budget: &PhaseBudget) -> GaOutcome {
        let n = self.evaluator.basic_roles().len();
        if n == 0 {
            self.state = GaState::Done;
            return GaOutcome {
                groups: Vec::new(),
                best_fitness: 0.0,
                sim_err: 0.0,
                gen_err: 0.0,
                generations_run: 0,
                completed: true,
            };
        }
        if n == 1 {
            // single basic role: nothing to cluster
            self.state = GaState::Done;
            return GaOutcome {
                groups: vec![vec![0]],
                best_fitness: 1.0 / 1e-3,
                sim_err: 0.0,
                gen_err: 0.0,
                generations_run: 0,
                completed: true,
            };
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut population =
            operators::initialize_population(&mut rng, self.config.population, n);

        self.state = GaState::Evaluating;
        let mut raw = self.evaluate_population(&mut population);
        let mut best = self.best_of(&population, &raw);

        let mut generations_run = 0;
        let mut completed = true;
        for generation in 1..=self.config.generations {
            if budget.exhausted() {
                warn!(generation, "GA budget exhausted, returning best so far");
                completed = false;
                break;
            }

            self.state = GaState::Evolving;
            let scaled = operators::linear_scaling(&raw);
            let mut next: Vec<Chromosome> = Vec::with_capacity(self.config.population);
            while next.len() < self.config.population {
                let mother = &population[operators::tournament_select(
                    &mut rng,
                    &scaled,
                    TOURNAMENT_POOL,
                )];
                let father = &population[operators::tournament_select(
                    &mut rng,
                    &scaled,
                    TOURNAMENT_POOL,
                )];
                let (mut sister, mut brother) = operators::single_point_crossover(
                    &mut rng,
                    mother,
                    father,
                    self.config.crossover_rate,
                );
                for child in [&mut sister, &mut brother] {
                    operators::mutate_swap(&mut rng, child, self.config.mutation_rate);
                    operators::mutate_redraw(&mut rng, child, self.config.mutation_rate);
                }
                next.push(sister);
                if next.len() < self.config.population {
                    next.push(brother);
                }
            }

            self.state = GaState::Evaluating;
            population = next;
            raw = self.evaluate_population(&mut population);

            if self.config.elitism {
                let (best_idx, worst_idx) = extremes(&raw);
                if best.1 > raw[best_idx] {
                    population[worst_idx] = best.0.clone();
                    raw[worst_idx] = best.1;
                }
            }

            let generation_best = self.best_of(&population, &raw);
            if generation_best.1 > best.1 {
                best = generation_best;
            }
            generations_run = generation;
            debug!(generation, best_fitness = best.1, "generation complete");
        }

        self.state = GaState::Done;
        let canonical = best.0.canonicalize();
        let (score, sim_err, gen_err) = self.evaluator.components(&canonical);
        info!(
            groups = canonical.decode().len(),
            score, sim_err, gen_err, generations_run, "GA finished"
        );
        GaOutcome {
            groups: canonical.decode(),
            best_fitness: score,
            sim_err,
            gen_err,
            generations_run,
            completed,
        }
    }

    /// Score every individual in parallel, then rewrite each into its
    /// canonical form so later operators breed on canonical genes.
    fn evaluate_population(&self, population: &mut [Chromosome]) -> Vec<f64> {
        let raw: Vec<f64> = population
            .par_iter()
            .map(|individual| self.evaluator.evaluate(individual))
            .collect();
        for individual in population.iter_mut() {
            *individual = individual.canonicalize();
        }
        raw
    }

    fn best_of(&self, population: &[Chromosome], raw: &[f64]) -> (Chromosome, f64) {
        let (idx, _) = extremes(raw);
        (population[idx].clone(), raw[idx])
    }
}

/// Indices of the best and worst raw fitness
fn extremes(raw: &[f64]) -> (usize, usize) {
    let mut best = 0;
    let mut worst = 0;
    for (i, &f) in raw.iter().enumerate() {
        if f > raw[best] {
            best = i;
        }
        if f < raw[worst] {
            worst = i;
        }
    }
    (best, worst)
}

/// Materialize final roles from a grouping: the union of member extents
/// and intents per group
pub fn merge_groups(basic_roles: &[Concept], groups: &[Vec<usize>]) -> Vec<Concept> {
    groups
        .iter()
        .map(|group| {
            let mut extent = BitSet::new(
                basic_roles
                    .first()
                    .map_or(0, |c| c.extent.universe()),
            );
            let mut intent = BitSet::new(
                basic_roles
                    .first()
                    .map_or(0, |c| c.intent.universe()),
            );
            for &r in group {
                extent.union_with(&basic_roles[r].extent);
                intent.union_with(&basic_roles[r].intent);
            }
            Concept { extent, intent }
        })
        .collect()
}
