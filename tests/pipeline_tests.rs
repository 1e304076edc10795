//! End-to-end mining pipeline scenarios.

use roleminer::policy::PolicyKind;
use roleminer::{CallRecord, Config, MiningPipeline, RwSummary};
use std::collections::BTreeSet;

fn record(caller: &str, function: &str, count: u64, success: bool) -> CallRecord {
    CallRecord {
        caller: caller.to_string(),
        function: function.to_string(),
        count,
        success,
    }
}

fn config(sim_ratio: f64) -> Config {
    let mut config = Config::default();
    config.mining.sim_ratio = sim_ratio;
    config.mining.min_history_records = 1;
    config.mining.generations = 30;
    config.mining.population = 40;
    config
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn rw(entries: &[(&str, &[&str], &[&str], &[&str])]) -> RwSummary {
    let mut summary = RwSummary::default();
    for (f, reads, reads2, writes) in entries {
        summary.reads.insert((*f).to_string(), set(reads));
        summary.reads2.insert((*f).to_string(), set(reads2));
        summary.writes.insert((*f).to_string(), set(writes));
    }
    summary
}

/// Two users with disjoint functions become two roles and two
/// separation policies.
#[test]
fn scenario_two_users_disjoint() {
    let records = vec![record("0xa", "f1", 1, true), record("0xb", "f2", 1, true)];
    let summary = rw(&[("f1", &[], &[], &["x"]), ("f2", &[], &[], &["y"])]);

    let pipeline = MiningPipeline::new(config(0.5)).expect("pipeline");
    let outcome = pipeline.run(records, Some(&summary)).expect("run");

    assert_eq!(outcome.stats.basic_roles, 2);
    assert_eq!(outcome.roles.len(), 2);
    assert!(outcome
        .roles
        .iter()
        .any(|r| r.users == set(&["0xa"]) && r.functions == set(&["f1"])));
    assert!(outcome
        .roles
        .iter()
        .any(|r| r.users == set(&["0xb"]) && r.functions == set(&["f2"])));

    assert_eq!(outcome.policies.len(), 2);
    assert!(outcome
        .policies
        .iter()
        .all(|p| p.kind == PolicyKind::Separation));
    assert!(outcome
        .policies
        .iter()
        .any(|p| p.data == set(&["x"]) && p.privileged_functions == set(&["f1"])));
    assert!(outcome
        .policies
        .iter()
        .any(|p| p.data == set(&["y"]) && p.privileged_functions == set(&["f2"])));
}

/// A strict privilege hierarchy reduces to delta-encoded basic roles and
/// produces integrity policies along the write-set chain.
#[test]
fn scenario_strict_hierarchy() {
    let records = vec![
        record("0xadmin", "f1", 1, true),
        record("0xadmin", "f2", 1, true),
        record("0xadmin", "f3", 1, true),
        record("0xop", "f2", 1, true),
        record("0xop", "f3", 1, true),
        record("0xuser", "f3", 1, true),
    ];
    let summary = rw(&[
        ("f1", &[], &[], &["x", "y", "z"]),
        ("f2", &[], &[], &["y", "z"]),
        ("f3", &[], &[], &["z"]),
    ]);

    // weight generalization error only: every zero-error partition keeps
    // the three behaviours separate
    let pipeline = MiningPipeline::new(config(0.0)).expect("pipeline");
    let outcome = pipeline.run(records, Some(&summary)).expect("run");

    // delta-encoded roles: each keeps only its distinguishing function
    assert_eq!(outcome.stats.basic_roles, 3);
    assert_eq!(outcome.roles.len(), 3);
    assert!(outcome
        .roles
        .iter()
        .any(|r| r.users == set(&["0xadmin"]) && r.functions == set(&["f1"])));
    assert!(outcome
        .roles
        .iter()
        .any(|r| r.users == set(&["0xadmin", "0xop"]) && r.functions == set(&["f2"])));
    assert!(outcome
        .roles
        .iter()
        .any(|r| r.users == set(&["0xadmin", "0xop", "0xuser"])
            && r.functions == set(&["f3"])));

    // the write-set chain yields integrity policies only
    assert!(!outcome.policies.is_empty());
    assert!(outcome
        .policies
        .iter()
        .all(|p| p.kind == PolicyKind::Integrity));
    // the admin-only role dominates with its exclusive writes
    assert!(outcome
        .policies
        .iter()
        .any(|p| p.role.functions == set(&["f1"]) && p.data.contains("x")));
    // the base variable z is protected by exactly one role
    assert!(outcome.policies.iter().any(|p| p.data.contains("z")));
}

/// A large homogeneous population with a small privileged subgroup
/// splits into exactly two roles.
#[test]
fn scenario_noise_absorption() {
    let mut records = Vec::new();
    for i in 0..100 {
        records.push(record(&format!("0x{i:040x}"), "f1", 1, true));
    }
    // two members of the population also call the privileged function
    records.push(record("0x0000000000000000000000000000000000000000", "f2", 50, true));
    records.push(record("0x0000000000000000000000000000000000000001", "f2", 50, true));

    let pipeline = MiningPipeline::new(config(0.2)).expect("pipeline");
    let outcome = pipeline.run(records, None).expect("run");

    assert_eq!(outcome.roles.len(), 2);
    let noise = outcome
        .roles
        .iter()
        .find(|r| r.functions == set(&["f1"]))
        .expect("noise role");
    let privileged = outcome
        .roles
        .iter()
        .find(|r| r.functions == set(&["f2"]))
        .expect("privileged role");
    assert_eq!(noise.users.len(), 100);
    assert_eq!(privileged.users.len(), 2);
    assert!(outcome.stats.sim_err < 1.0);
    assert!(outcome.stats.gen_err < 0.1);
}

/// Failed calls grant no permission.
#[test]
fn scenario_failed_calls_filtered() {
    let records = vec![record("0xa", "f1", 10, false)];
    let pipeline = MiningPipeline::new(config(0.5)).expect("pipeline");
    let outcome = pipeline.run(records, None).expect("run");
    assert!(outcome.roles.is_empty());
    assert!(outcome.policies.is_empty());
}

/// An unresolved selector flows through the pipeline as its hex string.
#[test]
fn scenario_unknown_selector() {
    let text = r#"{
        "data": { "ethereum": { "smartContractCalls": [
            { "caller": { "address": "0xA" }, "count": 1,
              "smartContractMethod": { "name": null, "signatureHash": "0xdeadbeef" },
              "success": true }
        ] } }
    }"#;
    let document = roleminer::HistoryDocument::from_json(text).expect("parse");
    let records = document.into_records(&roleminer::NullResolver);

    let pipeline = MiningPipeline::new(config(0.5)).expect("pipeline");
    let outcome = pipeline.run(records, None).expect("run");
    assert_eq!(outcome.roles.len(), 1);
    assert_eq!(outcome.roles[0].functions, set(&["0xdeadbeef"]));
}

/// One user collapses to one role and no policies.
#[test]
fn scenario_degenerate_single_user() {
    let records = vec![
        record("0xa", "f1", 1, true),
        record("0xa", "f2", 1, true),
        record("0xa", "f3", 1, true),
    ];
    let summary = rw(&[
        ("f1", &[], &[], &["x"]),
        ("f2", &[], &[], &["y"]),
        ("f3", &[], &[], &["z"]),
    ]);
    let pipeline = MiningPipeline::new(config(0.5)).expect("pipeline");
    let outcome = pipeline.run(records, Some(&summary)).expect("run");
    assert_eq!(outcome.roles.len(), 1);
    assert_eq!(outcome.roles[0].functions, set(&["f1", "f2", "f3"]));
    assert!(outcome.policies.is_empty());
}

/// Two runs with the same seed and inputs agree on roles and policies.
#[test]
fn scenario_seeded_runs_are_identical() {
    let records = vec![
        record("0xa", "f1", 5, true),
        record("0xa", "f2", 1, true),
        record("0xb", "f2", 3, true),
        record("0xc", "f3", 2, true),
        record("0xd", "f3", 9, true),
        record("0xd", "f1", 1, true),
    ];
    let summary = rw(&[
        ("f1", &[], &[], &["x"]),
        ("f2", &[], &[], &["y"]),
        ("f3", &[], &[], &["z"]),
    ]);
    let pipeline = MiningPipeline::new(config(0.5)).expect("pipeline");
    let first = pipeline
        .run(records.clone(), Some(&summary))
        .expect("first run");
    let second = pipeline
        .run(records, Some(&summary))
        .expect("second run");
    assert_eq!(first.roles, second.roles);
    assert_eq!(first.policies, second.policies);
}

/// The deny list keeps token-standard plumbing out of the policies.
#[test]
fn deny_listed_functions_never_privileged() {
    let records = vec![
        record("0xa", "transfer", 3, true),
        record("0xa", "setOwner", 1, true),
        record("0xb", "deposit", 2, true),
    ];
    let summary = rw(&[
        ("transfer", &[], &[], &["balances"]),
        ("setOwner", &[], &[], &["owner"]),
        ("deposit", &[], &[], &["pool"]),
    ]);
    let pipeline = MiningPipeline::new(config(0.5)).expect("pipeline");
    let outcome = pipeline.run(records, Some(&summary)).expect("run");
    for policy in &outcome.policies {
        assert!(!policy.privileged_functions.contains("transfer"));
        assert!(!policy.data.contains("balances"));
    }
}
