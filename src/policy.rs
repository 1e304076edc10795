//! Security Policy Derivation
//!
//! Given the mined roles and a static read/write summary of the
//! contract's functions, builds a partial order over the roles'
//! (deduplicated) write sets and emits information-flow policies:
//!
//! - *integrity*: one role's write authority strictly contains
//!   another's; the dominant role gets a policy over its extra
//!   variables.
//! - *separation of duty*: two roles have incomparable write sets; each
//!   side with exclusive variables gets a policy over them.
//!
//! Each policy is annotated with the privileged functions that cause it:
//! the role's functions whose unconditional writes (`writes \ reads2`)
//! touch the policy's data.
//!
//! The write-set deduplication pass is index-order dependent by
//! construction: a variable owned by an earlier role and absent from
//! every later one is removed from the current role. Role order is the
//! deterministic final-role order, so equal inputs give equal policies.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Per-function state-variable access sets from the static analyzer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RwSummary {
    /// Variables read in conditional positions (guards, require,
    /// ether-send predicates), transitively through calls
    pub reads: HashMap<String, BTreeSet<String>>,
    /// All variables read, transitively
    pub reads2: HashMap<String, BTreeSet<String>>,
    /// Variables written, transitively
    pub writes: HashMap<String, BTreeSet<String>>,
}

impl RwSummary {
    /// Parse a summary from JSON text
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    fn reads_of(&self, function: &str) -> BTreeSet<String> {
        self.reads.get(function).cloned().unwrap_or_default()
    }

    fn reads2_of(&self, function: &str) -> BTreeSet<String> {
        self.reads2.get(function).cloned().unwrap_or_default()
    }

    fn writes_of(&self, function: &str) -> BTreeSet<String> {
        self.writes.get(function).cloned().unwrap_or_default()
    }
}

/// A mined role materialized as address and function name sets
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Role {
    /// Member addresses (lowercased)
    pub users: BTreeSet<String>,
    /// Functions the role may call
    pub functions: BTreeSet<String>,
}

/// Kind of an emitted policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Dominant write authority over the data set
    Integrity,
    /// Exclusive write authority over the data set among incomparable
    /// peers
    Separation,
}

/// One derived information-flow policy
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// The role holding the authority
    pub role: Role,
    /// State variables the policy protects
    pub data: BTreeSet<String>,
    /// Functions of the role that unconditionally write the data
    pub privileged_functions: BTreeSet<String>,
    /// Integrity or separation
    pub kind: PolicyKind,
}

/// Derive the policy set for the given roles.
///
/// Functions on the deny list are excluded from the policy-relevant
/// universe. Functions without a summary entry contribute empty sets.
/// The result is duplicate-free and in deterministic emission order.
pub fn derive_policies(
    roles: &[Role],
    summary: &RwSummary,
    deny_list: &HashSet<String>,
) -> Vec<SecurityPolicy> {
    let n = roles.len();
    let relevant: Vec<Vec<&str>> = roles
        .iter()
        .map(|role| {
            role.functions
                .iter()
                .map(String::as_str)
                .filter(|f| !deny_list.contains(*f))
                .collect()
        })
        .collect();

    // per-role write sets: unconditional-by-guard writes only
    let data_w: Vec<BTreeSet<String>> = relevant
        .iter()
        .map(|functions| {
            let mut writes = BTreeSet::new();
            for f in functions {
                let mut w = summary.writes_of(f);
                for r in summary.reads_of(f) {
                    w.remove(&r);
                }
                writes.extend(w);
            }
            writes
        })
        .collect();

    let data_w = dedup_write_sets(&data_w);

    // lattice[i][j] = +1 when role i's write set strictly contains
    // role j's; antisymmetric, zero diagonal
    let mut lattice = vec![vec![0i8; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            if is_proper_subset(&data_w[j], &data_w[i]) {
                lattice[i][j] = 1;
                lattice[j][i] = -1;
            } else if is_proper_subset(&data_w[i], &data_w[j]) {
                lattice[i][j] = -1;
                lattice[j][i] = 1;
            }
        }
    }

    let mut policies: Vec<SecurityPolicy> = Vec::new();
    let mut push = |policy: SecurityPolicy| {
        if !policies.contains(&policy) {
            policies.push(policy);
        }
    };

    for i in 0..n {
        for j in (i + 1)..n {
            match lattice[i][j] {
                1 => {
                    let data: BTreeSet<String> =
                        data_w[i].difference(&data_w[j]).cloned().collect();
                    push(policy(roles, &relevant, summary, i, data, PolicyKind::Integrity));
                }
                -1 => {
                    let data: BTreeSet<String> =
                        data_w[j].difference(&data_w[i]).cloned().collect();
                    push(policy(roles, &relevant, summary, j, data, PolicyKind::Integrity));
                }
                _ => {
                    let left: BTreeSet<String> =
                        data_w[i].difference(&data_w[j]).cloned().collect();
                    if !left.is_empty() {
                        push(policy(roles, &relevant, summary, i, left, PolicyKind::Separation));
                    }
                    let right: BTreeSet<String> =
                        data_w[j].difference(&data_w[i]).cloned().collect();
                    if !right.is_empty() {
                        push(policy(roles, &relevant, summary, j, right, PolicyKind::Separation));
                    }
                }
            }
        }
    }

    debug!(roles = n, policies = policies.len(), "derived security policies");
    policies
}

/// The canonical left-to-right write-set deduplication:
/// `W_i ← W_i \ ((⋃_{j<i} W_j) \ (⋃_{j>i} W_j))`, evaluated against the
/// original sets.
fn dedup_write_sets(data_w: &[BTreeSet<String>]) -> Vec<BTreeSet<String>> {
    let n = data_w.len();
    let mut prefix: Vec<BTreeSet<String>> = Vec::with_capacity(n);
    let mut acc = BTreeSet::new();
    for w in data_w {
        prefix.push(acc.clone());
        acc.extend(w.iter().cloned());
    }
    let mut suffix: Vec<BTreeSet<String>> = vec![BTreeSet::new(); n];
    let mut acc = BTreeSet::new();
    for i in (0..n).rev() {
        suffix[i] = acc.clone();
        acc.extend(data_w[i].iter().cloned());
    }
    data_w
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let stale: BTreeSet<&String> = prefix[i].difference(&suffix[i]).collect();
            w.iter().filter(|v| !stale.contains(v)).cloned().collect()
        })
        .collect()
}

/// Build one policy tuple with its privileged-function annotation
fn policy(
    roles: &[Role],
    relevant: &[Vec<&str>],
    summary: &RwSummary,
    role_index: usize,
    data: BTreeSet<String>,
    kind: PolicyKind,
) -> SecurityPolicy {
    let privileged_functions = write_functions(&relevant[role_index], summary, &data);
    SecurityPolicy {
        role: roles[role_index].clone(),
        data,
        privileged_functions,
        kind,
    }
}

/// Functions of the role whose unconditional writes (`writes \ reads2`)
/// intersect `data`
fn write_functions(
    functions: &[&str],
    summary: &RwSummary,
    data: &BTreeSet<String>,
) -> BTreeSet<String> {
    functions
        .iter()
        .filter(|f| {
            let mut unconditional = summary.writes_of(f);
            for r in summary.reads2_of(f) {
                unconditional.remove(&r);
            }
            unconditional.iter().any(|v| data.contains(v))
        })
        .map(|f| (*f).to_string())
        .collect()
}

fn is_proper_subset(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    a.len() < b.len() && a.is_subset(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn role(users: &[&str], functions: &[&str]) -> Role {
        Role {
            users: set(users),
            functions: set(functions),
        }
    }

    fn summary(entries: &[(&str, &[&str], &[&str], &[&str])]) -> RwSummary {
        let mut s = RwSummary::default();
        for (f, reads, reads2, writes) in entries {
            s.reads.insert((*f).to_string(), set(reads));
            s.reads2.insert((*f).to_string(), set(reads2));
            s.writes.insert((*f).to_string(), set(writes));
        }
        s
    }

    #[test]
    fn test_disjoint_roles_get_separation_policies() {
        let roles = vec![role(&["0xa"], &["f1"]), role(&["0xb"], &["f2"])];
        let s = summary(&[("f1", &[], &[], &["x"]), ("f2", &[], &[], &["y"])]);
        let policies = derive_policies(&roles, &s, &HashSet::new());
        assert_eq!(policies.len(), 2);
        assert!(policies
            .iter()
            .all(|p| p.kind == PolicyKind::Separation));
        assert_eq!(policies[0].data, set(&["x"]));
        assert_eq!(policies[0].privileged_functions, set(&["f1"]));
        assert_eq!(policies[1].data, set(&["y"]));
        assert_eq!(policies[1].privileged_functions, set(&["f2"]));
    }

    #[test]
    fn test_strict_hierarchy_integrity_policies() {
        // writes[f1] ⊋ writes[f2] ⊋ writes[f3]
        let roles = vec![
            role(&["0xadmin"], &["f1"]),
            role(&["0xadmin", "0xop"], &["f2"]),
            role(&["0xadmin", "0xop", "0xuser"], &["f3"]),
        ];
        let s = summary(&[
            ("f1", &[], &[], &["x", "y", "z"]),
            ("f2", &[], &[], &["y", "z"]),
            ("f3", &[], &[], &["z"]),
        ]);
        let policies = derive_policies(&roles, &s, &HashSet::new());
        assert!(policies.iter().all(|p| p.kind == PolicyKind::Integrity));
        // admin dominates operator over {x, y}
        assert!(policies.iter().any(|p| p.role.functions == set(&["f1"])
            && p.data == set(&["x", "y"])
            && p.privileged_functions == set(&["f1"])));
        // operator dominates user over {z} (after write-set dedup)
        assert!(policies.iter().any(|p| p.role.functions == set(&["f2"])
            && p.data == set(&["z"])
            && p.privileged_functions == set(&["f2"])));
    }

    #[test]
    fn test_dedup_write_sets_left_to_right() {
        // a variable owned to the left and absent to the right is removed
        let sets = vec![set(&["x", "y"]), set(&["y", "z"]), set(&["z"])];
        let deduped = dedup_write_sets(&sets);
        assert_eq!(deduped[0], set(&["x", "y"]));
        // prefix {x,y} \ suffix {z} = {x,y}; removed from {y,z} -> {z}
        assert_eq!(deduped[1], set(&["z"]));
        // prefix {x,y,z} \ suffix {} = all; removed from {z} -> {}
        assert_eq!(deduped[2], BTreeSet::new());
    }

    #[test]
    fn test_lattice_antisymmetry() {
        let roles = vec![
            role(&["0xa"], &["f1"]),
            role(&["0xb"], &["f2"]),
            role(&["0xc"], &["f3"]),
        ];
        let s = summary(&[
            ("f1", &[], &[], &["x", "y"]),
            ("f2", &[], &[], &["y"]),
            ("f3", &[], &[], &["y", "q"]),
        ]);
        // antisymmetry is internal to derive_policies; observable effect:
        // exactly one integrity policy for the single comparable pair
        let policies = derive_policies(&roles, &s, &HashSet::new());
        let integrity: Vec<_> = policies
            .iter()
            .filter(|p| p.kind == PolicyKind::Integrity)
            .collect();
        assert_eq!(integrity.len(), 1);
        assert_eq!(integrity[0].role.functions, set(&["f1"]));
        assert_eq!(integrity[0].data, set(&["x"]));
    }

    #[test]
    fn test_privileged_functions_write_the_data() {
        let roles = vec![role(&["0xa"], &["f1", "f2"]), role(&["0xb"], &["f3"])];
        // f2 writes x but also reads it unconditionally -> not privileged
        let s = summary(&[
            ("f1", &[], &[], &["x"]),
            ("f2", &[], &["x"], &["x"]),
            ("f3", &[], &[], &["y"]),
        ]);
        let policies = derive_policies(&roles, &s, &HashSet::new());
        for p in &policies {
            assert!(p.privileged_functions.is_subset(&p.role.functions));
        }
        let first = policies
            .iter()
            .find(|p| p.data.contains("x"))
            .expect("policy over x");
        assert_eq!(first.privileged_functions, set(&["f1"]));
    }

    #[test]
    fn test_deny_list_excludes_functions() {
        let roles = vec![role(&["0xa"], &["transfer"]), role(&["0xb"], &["f2"])];
        let s = summary(&[
            ("transfer", &[], &[], &["balances"]),
            ("f2", &[], &[], &["y"]),
        ]);
        let deny: HashSet<String> = ["transfer".to_string()].into_iter().collect();
        let policies = derive_policies(&roles, &s, &deny);
        // the deny-listed function contributes no writes, so only the
        // second role has write authority
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].data, set(&["y"]));
    }

    #[test]
    fn test_missing_summary_entries_are_empty() {
        let roles = vec![role(&["0xa"], &["f1"]), role(&["0xb"], &["unknown"])];
        let s = summary(&[("f1", &[], &[], &["x"])]);
        let policies = derive_policies(&roles, &s, &HashSet::new());
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].role.functions, set(&["f1"]));
    }

    #[test]
    fn test_single_role_no_policies() {
        let roles = vec![role(&["0xa"], &["f1", "f2", "f3"])];
        let s = summary(&[("f1", &[], &[], &["x"])]);
        assert!(derive_policies(&roles, &s, &HashSet::new()).is_empty());
    }

    #[test]
    fn test_conditional_reads_excluded_from_writes() {
        // f1 writes {x, guard} but reads guard conditionally: the role's
        // write set keeps only x
        let roles = vec![role(&["0xa"], &["f1"]), role(&["0xb"], &["f2"])];
        let s = summary(&[
            ("f1", &["guard"], &["guard"], &["x", "guard"]),
            ("f2", &[], &[], &["y"]),
        ]);
        let policies = derive_policies(&roles, &s, &HashSet::new());
        let first = policies
            .iter()
            .find(|p| p.role.functions == set(&["f1"]))
            .expect("policy");
        assert_eq!(first.data, set(&["x"]));
    }

    #[test]
    fn test_policies_are_duplicate_free() {
        let roles = vec![
            role(&["0xa"], &["f1"]),
            role(&["0xb"], &["f2"]),
            role(&["0xc"], &["f2"]),
        ];
        let s = summary(&[("f1", &[], &[], &["x"]), ("f2", &[], &[], &["y"])]);
        let policies = derive_policies(&roles, &s, &HashSet::new());
        let mut seen = policies.clone();
        seen.dedup();
        assert_eq!(seen.len(), policies.len());
    }
}
