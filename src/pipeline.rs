//! Mining Pipeline
//!
//! The single owning thread that drives one mining run:
//!
//! ```text
//! call records
//!     ↓
//! [HistoryLoader]      → permission + frequency matrices
//!     ↓
//! [LatticeBuilder]     → concept lattice          (budgeted)
//!     ↓
//! [HierarchyReducer]   → basic roles
//!     ↓
//! [GAOptimizer]        → final roles              (budgeted, parallel)
//!     ↓
//! [PolicyDeriver]      → security policies        (needs RW summary)
//! ```
//!
//! Budget overruns and a missing static summary degrade the run and are
//! reported as warnings on the outcome; they never abort it. The caches
//! feeding the GA live inside the run and are dropped with it.

use crate::budget::PhaseBudget;
use crate::config::Config;
use crate::error::{MiningError, MiningResult, MiningWarning};
use crate::ga::{merge_groups, GaOptimizer};
use crate::history::{CallRecord, History};
use crate::lattice::{build_lattice, trivial_partition, Concept};
use crate::matrix::BitSet;
use crate::policy::{derive_policies, Role, RwSummary, SecurityPolicy};
use crate::reducer::reduce_hierarchy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use tracing::{info, warn};

/// Everything one mining run produces
#[derive(Debug, Clone)]
pub struct MiningOutcome {
    /// Final mined roles, in deterministic order
    pub roles: Vec<Role>,
    /// Derived security policies (empty without a static summary)
    pub policies: Vec<SecurityPolicy>,
    /// Conditions that degraded the run
    pub warnings: Vec<MiningWarning>,
    /// Run statistics for the result manifest
    pub stats: MiningStats,
}

/// Statistics describing one run
#[derive(Debug, Clone, Default)]
pub struct MiningStats {
    /// Users observed after filtering
    pub users: usize,
    /// Functions observed after filtering
    pub functions: usize,
    /// Concepts enumerated (0 when the fallback partition was used)
    pub lattice_concepts: usize,
    /// Basic roles after hierarchy reduction
    pub basic_roles: usize,
    /// Generations the GA evolved
    pub ga_generations: usize,
    /// Best fitness reached
    pub best_fitness: f64,
    /// Similarity-error component of the best grouping
    pub sim_err: f64,
    /// Generalization-error component of the best grouping
    pub gen_err: f64,
    /// Wall-clock spent in lattice enumeration
    pub lattice_time: Duration,
    /// Wall-clock spent in GA evolution
    pub ga_time: Duration,
}

/// One-run mining engine over a validated configuration
pub struct MiningPipeline {
    config: Config,
}

impl MiningPipeline {
    /// Create a pipeline, rejecting invalid configuration
    pub fn new(config: Config) -> MiningResult<Self> {
        config.validate()?;
        Ok(MiningPipeline { config })
    }

    /// Run the full pipeline over the given records.
    ///
    /// `summary` is the static read/write analysis; without it the run
    /// returns roles only and a [`MiningWarning::StaticAnalysisMissing`].
    pub fn run(
        &self,
        records: Vec<CallRecord>,
        summary: Option<&RwSummary>,
    ) -> MiningResult<MiningOutcome> {
        let mining = &self.config.mining;
        let mut warnings = Vec::new();
        let mut stats = MiningStats::default();

        let history = History::load(records);
        stats.users = history.permissions.users();
        stats.functions = history.permissions.functions();

        let observed = history.unique_successful_pairs();
        if observed == 0 {
            info!("no successful calls in history; nothing to mine");
            return Ok(MiningOutcome {
                roles: Vec::new(),
                policies: Vec::new(),
                warnings,
                stats,
            });
        }
        if observed < mining.min_history_records {
            return Err(MiningError::InsufficientHistory {
                observed,
                required: mining.min_history_records,
            });
        }

        // cap the user population before lattice enumeration
        let (permissions, frequencies, kept) = if stats.users > mining.lattice_cap_users {
            let mut rng = StdRng::seed_from_u64(mining.seed);
            let mut sampled =
                rand::seq::index::sample(&mut rng, stats.users, mining.lattice_cap_users)
                    .into_vec();
            sampled.sort_unstable();
            warnings.push(MiningWarning::UserPopulationSampled {
                observed: stats.users,
                kept: sampled.len(),
            });
            let keep = BitSet::from_indices(stats.users, sampled.iter().copied());
            let (p, kept) = history.permissions.restrict_users(&keep);
            let mut f = crate::matrix::FrequencyMatrix::new(p.users(), p.functions());
            for (new_u, &old_u) in kept.iter().enumerate() {
                for func in 0..p.functions() {
                    let count = history.frequencies.get(old_u, func);
                    if count > 0 {
                        f.add(new_u, func, count);
                    }
                }
            }
            (p, f, kept)
        } else {
            (
                history.permissions.clone(),
                history.frequencies.clone(),
                (0..stats.users).collect(),
            )
        };

        // concept lattice, falling back to the trivial partition
        let lattice_budget = PhaseBudget::from_secs(mining.timeout_lattice_s);
        let basic_roles: Vec<Concept> = match build_lattice(&permissions, &lattice_budget) {
            Some(lattice) => {
                stats.lattice_concepts = lattice.concepts.len();
                reduce_hierarchy(&lattice.concepts)
            }
            None => {
                warn!("lattice budget exceeded; using trivial partition");
                warnings.push(MiningWarning::LatticeBudgetExceeded {
                    elapsed: lattice_budget.elapsed(),
                });
                trivial_partition(&permissions)
            }
        };
        stats.lattice_time = lattice_budget.elapsed();
        stats.basic_roles = basic_roles.len();

        // GA clustering
        let ga_budget = PhaseBudget::from_secs(mining.timeout_ga_s);
        let mut optimizer = GaOptimizer::new(
            basic_roles.clone(),
            permissions,
            &frequencies,
            mining.clone(),
        );
        let outcome = optimizer.run(&ga_budget);
        stats.ga_time = ga_budget.elapsed();
        stats.ga_generations = outcome.generations_run;
        stats.best_fitness = outcome.best_fitness;
        stats.sim_err = outcome.sim_err;
        stats.gen_err = outcome.gen_err;
        if !outcome.completed {
            warnings.push(MiningWarning::GaBudgetExceeded {
                generation: outcome.generations_run,
                elapsed: ga_budget.elapsed(),
            });
        }

        let merged = merge_groups(&basic_roles, &outcome.groups);
        let roles: Vec<Role> = merged
            .iter()
            .map(|concept| Role {
                users: concept
                    .extent
                    .ones()
                    .map(|u| history.user_map.address(kept[u]).to_string())
                    .collect::<BTreeSet<String>>(),
                functions: concept
                    .intent
                    .ones()
                    .map(|f| history.functions[f].clone())
                    .collect::<BTreeSet<String>>(),
            })
            .collect();
        // basic roles are non-empty pairs, so their unions must be too
        if roles.iter().any(|r| r.users.is_empty() || r.functions.is_empty()) {
            return Err(MiningError::InternalInvariant(
                "final role with an empty user or function set".to_string(),
            ));
        }

        // policy derivation needs the static summary
        let policies = match summary {
            Some(summary) => {
                let deny: HashSet<String> =
                    mining.function_deny_list.iter().cloned().collect();
                derive_policies(&roles, summary, &deny)
            }
            None => {
                warn!("static read/write summary missing; policies not derived");
                warnings.push(MiningWarning::StaticAnalysisMissing);
                Vec::new()
            }
        };

        info!(
            roles = roles.len(),
            policies = policies.len(),
            warnings = warnings.len(),
            "mining run complete"
        );
        Ok(MiningOutcome {
            roles,
            policies,
            warnings,
            stats,
        })
    }
}
