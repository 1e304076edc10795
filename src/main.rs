//! # Roleminer CLI
//!
//! Mines the likely role structure of a deployed contract from its
//! prepared workspace directory and derives information-flow security
//! policies for downstream testing.
//!
//! ## Usage
//!
//! ```bash
//! # mine roles and policies for one contract
//! roleminer --eth-address 0x0b509f4b044f713a91bb50535914f7ad160532fe \
//!     --workspace ./workspace --mode mine
//!
//! # tighten the GA and require policies for downstream testing
//! roleminer --eth-address 0x... --generations 200 --sim-ratio 0.4 --mode test
//! ```
//!
//! The workspace must contain `<address>/all_txs.json` (crawler output)
//! and may contain `<name>.abi` and `rw_summary.json`. The run writes
//! `<address>/result.json` and a log file into the workspace.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use regex::Regex;
use roleminer::interfaces::SelectorResolver;
use roleminer::workspace::{ResultManifest, Workspace, WorkspaceHistory, WorkspaceRw};
use roleminer::{Config, HistorySource, MiningPipeline, NullResolver, RwSummarySource};
use std::collections::BTreeSet;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Mine role structures of smart contracts for permission bug detection
#[derive(Debug, Parser)]
#[command(name = "roleminer", version, about)]
struct Cli {
    /// Ethereum address of the contract
    #[arg(long)]
    eth_address: String,

    /// Use transaction history up to this date ("latest" or YYYY-MM-DD)
    #[arg(long, default_value = "latest")]
    date: String,

    /// Running mode
    #[arg(long, value_enum, default_value_t = Mode::Test)]
    mode: Mode,

    /// Number of GA generations (overrides configuration)
    #[arg(long)]
    generations: Option<usize>,

    /// Similarity-error weight in [0, 1] (overrides configuration)
    #[arg(long)]
    sim_ratio: Option<f64>,

    /// Workspace directory
    #[arg(long, default_value = "./")]
    workspace: String,

    /// Configuration file (defaults to the roleminer.toml layering)
    #[arg(long)]
    config: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Mine roles and derive policies only
    Mine,
    /// Mine and require policies for the downstream fuzzer
    Test,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    validate_address(&cli.eth_address)?;
    validate_date(&cli.date)?;

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => Config::load().unwrap_or_default(),
    };
    if let Some(generations) = cli.generations {
        config.mining.generations = generations;
    }
    if let Some(sim_ratio) = cli.sim_ratio {
        config.mining.sim_ratio = sim_ratio;
    }

    let workspace = Workspace::new(&cli.workspace);
    let file_appender =
        tracing_appender::rolling::never(&cli.workspace, "roleminer.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(config.logging.level.clone())
        }))
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    info!(address = %cli.eth_address, date = %cli.date, "starting mining run");

    // resolve selectors through the contract ABI when one was fetched
    let abi = workspace
        .load_abi(&cli.eth_address)
        .context("loading contract ABI")?;
    let resolver: Box<dyn SelectorResolver> = match &abi {
        Some((name, abi)) => {
            info!(contract = %name, "loaded contract ABI");
            Box::new(abi.resolver())
        }
        None => {
            warn!("no ABI in workspace; selectors stay unresolved");
            Box::new(NullResolver)
        }
    };

    let records = WorkspaceHistory::new(&workspace, &cli.eth_address, resolver.as_ref())
        .records()
        .context("loading transaction history")?;
    let summary = WorkspaceRw::new(&workspace, &cli.eth_address)
        .summary()
        .context("loading static read/write summary")?;

    let pipeline = MiningPipeline::new(config).context("invalid configuration")?;
    let outcome = pipeline
        .run(records, summary.as_ref())
        .context("mining run failed")?;

    for (index, role) in outcome.roles.iter().enumerate() {
        let functions: Vec<&str> = role.functions.iter().map(String::as_str).collect();
        println!(
            "Role#{index}: {} users -> {}",
            role.users.len(),
            functions.join(" ")
        );
    }
    for (index, policy) in outcome.policies.iter().enumerate() {
        let data: Vec<&str> = policy.data.iter().map(String::as_str).collect();
        let functions: Vec<&str> = policy
            .privileged_functions
            .iter()
            .map(String::as_str)
            .collect();
        println!(
            "Policy#{index} ({:?}): {} via functions {}",
            policy.kind,
            data.join(" "),
            functions.join(" ")
        );
    }
    for warning in &outcome.warnings {
        warn!(%warning, "run degraded");
    }

    // state-changing functions the history never exercised are blind
    // spots for a history-driven miner; surface them for the operator
    if let Some((_, abi)) = &abi {
        let observed: BTreeSet<&str> = outcome
            .roles
            .iter()
            .flat_map(|role| role.functions.iter().map(String::as_str))
            .collect();
        let unexercised: Vec<String> = abi
            .mutable_functions()
            .into_iter()
            .filter(|f| !observed.contains(f.as_str()))
            .collect();
        if !unexercised.is_empty() {
            warn!(
                count = unexercised.len(),
                functions = unexercised.join(" "),
                "state-changing functions never called in the observed history"
            );
        }
    }

    let manifest = ResultManifest::new(
        &cli.eth_address,
        &cli.date,
        outcome.roles.clone(),
        outcome.policies.clone(),
        &outcome.warnings,
        &outcome.stats,
    );
    workspace
        .write_manifest(&cli.eth_address, &manifest)
        .context("writing result manifest")?;

    if cli.mode == Mode::Test && outcome.policies.is_empty() {
        bail!(
            "no security policies derived; cannot hand off to the fuzzer \
             (is rw_summary.json present and the history large enough?)"
        );
    }

    info!("done");
    Ok(())
}

/// Reject anything that is not a 20-byte hex address
fn validate_address(address: &str) -> anyhow::Result<()> {
    let pattern = Regex::new("^0x[0-9a-fA-F]{40}$").expect("static pattern");
    if !pattern.is_match(address) {
        bail!("{address} is not an Ethereum address");
    }
    Ok(())
}

/// Accept "latest" or a calendar date
fn validate_date(date: &str) -> anyhow::Result<()> {
    if date == "latest" {
        return Ok(());
    }
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("{date} is not \"latest\" or YYYY-MM-DD"))?;
    Ok(())
}
