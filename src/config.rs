//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - roleminer.toml (default configuration)
//! - roleminer.local.toml (git-ignored local overrides)
//! - Environment variables (ROLEMINER_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # roleminer.toml
//! [mining]
//! sim_ratio = 0.5
//! generations = 100
//! seed = 2022
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! ROLEMINER_MINING__GENERATIONS=200
//! ROLEMINER_LOGGING__LEVEL=debug
//! ```

use crate::error::{MiningError, MiningResult};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Options recognized by the mining engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Weight of the role-similarity error in the GA fitness, in [0, 1].
    /// The generalization error gets weight `1 - sim_ratio`.
    #[serde(default = "default_sim_ratio")]
    pub sim_ratio: f64,

    /// Number of GA generations
    #[serde(default = "default_generations")]
    pub generations: usize,

    /// GA population size
    #[serde(default = "default_population")]
    pub population: usize,

    /// Probability that each mutation operator fires per individual
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,

    /// Probability of single-point crossover per mating pair
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,

    /// Carry the best individual into the next generation
    #[serde(default = "default_true")]
    pub elitism: bool,

    /// RNG seed. The same seed on the same input reproduces the run exactly.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Sample the user population down to this size before lattice
    /// enumeration
    #[serde(default = "default_lattice_cap_users")]
    pub lattice_cap_users: usize,

    /// Wall-clock budget for lattice enumeration, in seconds (0 = none)
    #[serde(default)]
    pub timeout_lattice_s: u64,

    /// Wall-clock budget for GA evolution, in seconds (0 = none)
    #[serde(default)]
    pub timeout_ga_s: u64,

    /// Minimum distinct successful (caller, function) pairs required
    #[serde(default = "default_min_history_records")]
    pub min_history_records: usize,

    /// Token-standard functions excluded from the policy-relevant set
    #[serde(default = "default_function_deny_list")]
    pub function_deny_list: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_sim_ratio() -> f64 {
    0.5
}
fn default_generations() -> usize {
    100
}
fn default_population() -> usize {
    100
}
fn default_mutation_rate() -> f64 {
    0.10
}
fn default_crossover_rate() -> f64 {
    0.99
}
fn default_true() -> bool {
    true
}
fn default_seed() -> u64 {
    2022
}
fn default_lattice_cap_users() -> usize {
    10_000
}
fn default_min_history_records() -> usize {
    50
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

fn default_function_deny_list() -> Vec<String> {
    [
        "transfer",
        "transferFrom",
        "approve",
        "setApprovalForAll",
        "safeTransferFrom",
        "increaseApproval",
        "decreaseApproval",
        "burn",
        "burnFrom",
        "buy",
        "__fallback__",
        "fallback",
        "__callback",
        "constructor",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for MiningConfig {
    fn default() -> Self {
        MiningConfig {
            sim_ratio: default_sim_ratio(),
            generations: default_generations(),
            population: default_population(),
            mutation_rate: default_mutation_rate(),
            crossover_rate: default_crossover_rate(),
            elitism: true,
            seed: default_seed(),
            lattice_cap_users: default_lattice_cap_users(),
            timeout_lattice_s: 0,
            timeout_ga_s: 0,
            min_history_records: default_min_history_records(),
            function_deny_list: default_function_deny_list(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. roleminer.toml (base configuration)
    /// 2. roleminer.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (ROLEMINER_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("roleminer.toml"))
            .merge(Toml::file("roleminer.local.toml"))
            .merge(Env::prefixed("ROLEMINER_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("ROLEMINER_").split("__"))
            .extract()
    }

    /// Reject out-of-range option values
    pub fn validate(&self) -> MiningResult<()> {
        let m = &self.mining;
        if !(0.0..=1.0).contains(&m.sim_ratio) {
            return Err(MiningError::InvalidConfig(format!(
                "sim_ratio must be in [0, 1], got {}",
                m.sim_ratio
            )));
        }
        if m.generations == 0 {
            return Err(MiningError::InvalidConfig(
                "generations must be positive".to_string(),
            ));
        }
        if m.population == 0 {
            return Err(MiningError::InvalidConfig(
                "population must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&m.mutation_rate) || !(0.0..=1.0).contains(&m.crossover_rate) {
            return Err(MiningError::InvalidConfig(
                "mutation_rate and crossover_rate must be in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
