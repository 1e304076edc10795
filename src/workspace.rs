//! Per-Address Workspace Layout
//!
//! Each analyzed contract owns one directory under the workspace root:
//!
//! ```text
//! <workspace>/<address>/
//!     all_txs.json      crawler transaction-history document
//!     <name>.abi        contract ABI (name = contract name)
//!     rw_summary.json   static read/write summary (optional)
//!     result.json       result manifest, written by the driver
//! ```
//!
//! The mining core only reads history and ABI; the driver writes the
//! manifest.

use crate::abi::ContractAbi;
use crate::error::{MiningError, MiningResult};
use crate::history::{CallRecord, HistoryDocument};
use crate::interfaces::{HistorySource, RwSummarySource, SelectorResolver};
use crate::pipeline::MiningStats;
use crate::policy::{Role, RwSummary, SecurityPolicy};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// File holding the crawler document
pub const HISTORY_FILE: &str = "all_txs.json";
/// Optional file holding the static read/write summary
pub const RW_SUMMARY_FILE: &str = "rw_summary.json";
/// Result manifest written after a run
pub const MANIFEST_FILE: &str = "result.json";

/// Handle on the workspace root directory
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Workspace { root: root.into() }
    }

    /// Directory owned by one contract address
    pub fn contract_dir(&self, address: &str) -> PathBuf {
        self.root.join(address.to_lowercase())
    }

    /// Read and parse the crawler document for `address`
    pub fn load_history(&self, address: &str) -> MiningResult<HistoryDocument> {
        let path = self.contract_dir(address).join(HISTORY_FILE);
        let text = fs::read_to_string(&path)?;
        HistoryDocument::from_json(&text)
            .map_err(|e| MiningError::InputMalformed(format!("{}: {e}", path.display())))
    }

    /// Locate and parse the contract ABI: the first `.abi` file in the
    /// contract directory. Returns the contract name (file stem) and the
    /// parsed ABI, or `None` when no ABI was fetched.
    pub fn load_abi(&self, address: &str) -> MiningResult<Option<(String, ContractAbi)>> {
        let dir = self.contract_dir(address);
        if !dir.is_dir() {
            return Ok(None);
        }
        let mut entries: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "abi"))
            .collect();
        entries.sort();
        let Some(path) = entries.into_iter().next() else {
            return Ok(None);
        };
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("contract")
            .to_string();
        let abi = ContractAbi::from_json(&fs::read_to_string(&path)?)?;
        Ok(Some((name, abi)))
    }

    /// Read the optional static read/write summary
    pub fn load_rw_summary(&self, address: &str) -> MiningResult<Option<RwSummary>> {
        let path = self.contract_dir(address).join(RW_SUMMARY_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let summary = RwSummary::from_json(&text)
            .map_err(|e| MiningError::InputMalformed(format!("{}: {e}", path.display())))?;
        Ok(Some(summary))
    }

    /// Write the result manifest for `address`
    pub fn write_manifest(&self, address: &str, manifest: &ResultManifest) -> MiningResult<()> {
        let dir = self.contract_dir(address);
        fs::create_dir_all(&dir)?;
        let text = serde_json::to_string_pretty(manifest)?;
        fs::write(dir.join(MANIFEST_FILE), text)?;
        Ok(())
    }
}

/// [`HistorySource`] reading one contract's records from the workspace
pub struct WorkspaceHistory<'a> {
    workspace: &'a Workspace,
    address: String,
    resolver: &'a dyn SelectorResolver,
}

impl<'a> WorkspaceHistory<'a> {
    /// Bind a workspace, address and selector resolver
    pub fn new(
        workspace: &'a Workspace,
        address: impl Into<String>,
        resolver: &'a dyn SelectorResolver,
    ) -> Self {
        WorkspaceHistory {
            workspace,
            address: address.into(),
            resolver,
        }
    }
}

impl HistorySource for WorkspaceHistory<'_> {
    fn records(&self) -> MiningResult<Vec<CallRecord>> {
        let document = self.workspace.load_history(&self.address)?;
        Ok(document.into_records(self.resolver))
    }
}

/// [`RwSummarySource`] reading the optional summary from the workspace
pub struct WorkspaceRw<'a> {
    workspace: &'a Workspace,
    address: String,
}

impl<'a> WorkspaceRw<'a> {
    /// Bind a workspace and address
    pub fn new(workspace: &'a Workspace, address: impl Into<String>) -> Self {
        WorkspaceRw {
            workspace,
            address: address.into(),
        }
    }
}

impl RwSummarySource for WorkspaceRw<'_> {
    fn summary(&self) -> MiningResult<Option<RwSummary>> {
        self.workspace.load_rw_summary(&self.address)
    }
}

/// Result manifest persisted after a run
#[derive(Debug, Clone, Serialize)]
pub struct ResultManifest {
    /// Contract address the run analyzed
    pub address: String,
    /// History cut-off requested on the command line
    pub date: String,
    /// RFC 3339 timestamp of manifest creation
    pub generated_at: String,
    /// Final mined roles
    pub roles: Vec<Role>,
    /// Derived security policies
    pub policies: Vec<SecurityPolicy>,
    /// Human-readable warnings attached to the run
    pub warnings: Vec<String>,
    /// Run statistics
    pub stats: ManifestStats,
}

/// Serializable subset of [`MiningStats`]
#[derive(Debug, Clone, Serialize)]
pub struct ManifestStats {
    /// Users observed after filtering
    pub users: usize,
    /// Functions observed after filtering
    pub functions: usize,
    /// Concepts enumerated
    pub lattice_concepts: usize,
    /// Basic roles after reduction
    pub basic_roles: usize,
    /// Generations evolved
    pub ga_generations: usize,
    /// Best fitness reached
    pub best_fitness: f64,
    /// Similarity error of the best grouping
    pub sim_err: f64,
    /// Generalization error of the best grouping
    pub gen_err: f64,
    /// Milliseconds spent enumerating the lattice
    pub lattice_ms: u128,
    /// Milliseconds spent evolving
    pub ga_ms: u128,
}

impl From<&MiningStats> for ManifestStats {
    fn from(stats: &MiningStats) -> Self {
        ManifestStats {
            users: stats.users,
            functions: stats.functions,
            lattice_concepts: stats.lattice_concepts,
            basic_roles: stats.basic_roles,
            ga_generations: stats.ga_generations,
            best_fitness: stats.best_fitness,
            sim_err: stats.sim_err,
            gen_err: stats.gen_err,
            lattice_ms: stats.lattice_time.as_millis(),
            ga_ms: stats.ga_time.as_millis(),
        }
    }
}

impl ResultManifest {
    /// Assemble a manifest from a finished run
    pub fn new(
        address: &str,
        date: &str,
        roles: Vec<Role>,
        policies: Vec<SecurityPolicy>,
        warnings: &[crate::error::MiningWarning],
        stats: &MiningStats,
    ) -> Self {
        ResultManifest {
            address: address.to_lowercase(),
            date: date.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            roles,
            policies,
            warnings: warnings.iter().map(ToString::to_string).collect(),
            stats: ManifestStats::from(stats),
        }
    }
}
