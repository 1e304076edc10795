//! # Roleminer
//!
//! History-driven role mining for deployed smart contracts: infers a
//! likely access-control structure from the contract's observed
//! caller→function invocation history, then derives information-flow
//! security policies (integrity and separation-of-duty) over the mined
//! roles using a static read/write summary of the contract's functions.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! crawler document (all_txs.json)
//!     ↓
//! [HistoryLoader]        → permission matrix P, frequency matrix F
//!     ↓
//! [LatticeBuilder]       → concept lattice (all maximal user/function pairs)
//!     ↓
//! [HierarchyReducer]     → basic roles (delta-encoded concepts)
//!     ↓
//! [GAOptimizer]          → final roles (similarity + generalization fitness)
//!     ↓
//! [PolicyDeriver]        → integrity / separation-of-duty policies
//!     ↓
//! downstream symbolic-execution fuzzer
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roleminer::{Config, MiningPipeline, RwSummary};
//!
//! let pipeline = MiningPipeline::new(Config::load()?)?;
//! let outcome = pipeline.run(records, Some(&summary))?;
//! for policy in &outcome.policies {
//!     println!("{policy:?}");
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `history` | Call records → user map + boolean/integer matrices |
//! | `lattice` | Formal-concept enumeration (Close-by-One) |
//! | `reducer` | Hierarchy reduction to basic roles |
//! | `ga` | Genetic-algorithm role clustering |
//! | `miners` | Benchmark miners behind a shared contract |
//! | `policy` | Write-set lattice and policy emission |
//! | `pipeline` | End-to-end driver with failure semantics |
//! | `abi` | ABI parsing and 4-byte selector resolution |
//! | `workspace` | Per-address on-disk layout |
//! | `interfaces` | Contracts to the crawler / analyzer / fuzzer |
//! | `config` | Layered configuration (figment) |
//! | `budget` | Wall-clock phase budgets with cancellation |

pub mod abi;
pub mod budget;
pub mod config;
pub mod error;
pub mod ga;
pub mod history;
pub mod interfaces;
pub mod lattice;
pub mod matrix;
pub mod miners;
pub mod pipeline;
pub mod policy;
pub mod reducer;
pub mod workspace;

// Re-export the engine surface
pub use config::{Config, LoggingConfig, MiningConfig};
pub use error::{MiningError, MiningResult, MiningWarning};
pub use history::{CallRecord, History, HistoryDocument, UserMap};
pub use interfaces::{HistorySource, NullResolver, RwSummarySource, SelectorResolver};
pub use matrix::{BitSet, FrequencyMatrix, PermissionMatrix};
pub use pipeline::{MiningOutcome, MiningPipeline, MiningStats};
pub use policy::{PolicyKind, Role, RwSummary, SecurityPolicy};
pub use workspace::{ResultManifest, Workspace};
