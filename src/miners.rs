//! Alternative Role Miners
//!
//! Four benchmark miners coexist with the GA optimizer for comparison
//! runs. They share one contract: consume the permission matrix, produce
//! a set of role function-sets. Only the GA miner sits on the mining
//! pipeline's critical path; these exist to benchmark it against
//! classical role-mining strategies.
//!
//! - [`HmMiner`]: concept-lattice pruning (enumerate, then
//!   hierarchy-reduce).
//! - [`HpMiner`]: greedy cover minimization picking the least-privileged
//!   uncovered user, then the least-held uncovered permission.
//! - [`OrcaMiner`]: bottom-up cluster merge of permission singletons by
//!   shared membership.
//! - [`GoMiner`]: greedy edge-count optimization over per-user roles.

use crate::budget::PhaseBudget;
use crate::lattice::{build_lattice, trivial_partition};
use crate::matrix::{BitSet, PermissionMatrix};
use crate::reducer::reduce_hierarchy;
use std::collections::HashSet;

/// Common contract of the benchmark miners
pub trait RoleMiner {
    /// Mine role function-sets from the permission matrix
    fn mine(&self, matrix: &PermissionMatrix, budget: &PhaseBudget) -> Vec<BitSet>;
}

/// Tagged selection of a benchmark miner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miner {
    /// Lattice pruning
    Hm,
    /// Greedy cover minimization
    Hp,
    /// Cluster merge
    Orca,
    /// Greedy optimization
    Go,
}

impl Miner {
    /// Run the selected miner
    pub fn mine(&self, matrix: &PermissionMatrix, budget: &PhaseBudget) -> Vec<BitSet> {
        match self {
            Miner::Hm => HmMiner.mine(matrix, budget),
            Miner::Hp => HpMiner.mine(matrix, budget),
            Miner::Orca => OrcaMiner.mine(matrix, budget),
            Miner::Go => GoMiner.mine(matrix, budget),
        }
    }
}

/// Lattice pruning: the basic-role function sets after hierarchy
/// reduction. Falls back to the trivial partition when the lattice
/// budget runs out.
pub struct HmMiner;

impl RoleMiner for HmMiner {
    fn mine(&self, matrix: &PermissionMatrix, budget: &PhaseBudget) -> Vec<BitSet> {
        let concepts = match build_lattice(matrix, budget) {
            Some(lattice) => reduce_hierarchy(&lattice.concepts),
            None => trivial_partition(matrix),
        };
        concepts.into_iter().map(|c| c.intent).collect()
    }
}

/// Greedy cover: repeatedly take the uncovered user with the fewest
/// permissions (role = all users holding that permission superset), then
/// the uncovered permission with the fewest holders (role = every
/// permission of those holders).
pub struct HpMiner;

impl RoleMiner for HpMiner {
    fn mine(&self, matrix: &PermissionMatrix, budget: &PhaseBudget) -> Vec<BitSet> {
        let users = matrix.users();
        let functions = matrix.functions();
        let mut roles: Vec<BitSet> = Vec::new();
        let mut covered_users = BitSet::new(users);
        let mut covered_permissions = BitSet::new(functions);

        // phase 1: users with the fewest permissions first
        loop {
            if budget.exhausted() {
                return roles;
            }
            let candidate = (0..users)
                .filter(|&u| !covered_users.contains(u) && !matrix.row(u).is_empty())
                .min_by_key(|&u| matrix.row(u).count());
            let Some(user) = candidate else { break };
            let permissions = matrix.row(user).clone();
            // every user holding all of this user's permissions
            let mut members = BitSet::new(users);
            for other in 0..users {
                if permissions.is_subset(matrix.row(other)) {
                    members.insert(other);
                }
            }
            covered_users.union_with(&members);
            covered_permissions.union_with(&permissions);
            roles.push(permissions);
        }

        // phase 2: permissions with the fewest holders first
        loop {
            if budget.exhausted() {
                return roles;
            }
            let candidate = (0..functions)
                .filter(|&f| !covered_permissions.contains(f))
                .map(|f| (f, matrix.holders(f)))
                .filter(|(_, holders)| !holders.is_empty())
                .min_by_key(|(_, holders)| holders.count());
            let Some((_, holders)) = candidate else { break };
            // all permissions assigned to any holder
            let mut permissions = BitSet::new(functions);
            for u in holders.ones() {
                permissions.union_with(matrix.row(u));
            }
            covered_users.union_with(&holders);
            covered_permissions.union_with(&permissions);
            roles.push(permissions);
        }

        roles
    }
}

/// Cluster merge: permission singletons merge pairwise while the merged
/// pair still has common members, preferring pairs with the most shared
/// members and then the most shared rights. Consumed clusters survive as
/// outer roles.
pub struct OrcaMiner;

impl OrcaMiner {
    /// Users holding every permission of the cluster
    fn members(matrix: &PermissionMatrix, cluster: &BitSet) -> BitSet {
        let mut members = BitSet::full(matrix.users());
        for f in cluster.ones() {
            members.intersect_with(&matrix.holders(f));
        }
        members
    }
}

impl RoleMiner for OrcaMiner {
    fn mine(&self, matrix: &PermissionMatrix, budget: &PhaseBudget) -> Vec<BitSet> {
        let functions = matrix.functions();
        let mut clusters: Vec<BitSet> = (0..functions)
            .map(|f| BitSet::from_indices(functions, [f]))
            .collect();
        let mut outer: Vec<BitSet> = Vec::new();
        let mut merged_pairs: HashSet<(BitSet, BitSet)> = HashSet::new();

        loop {
            if budget.exhausted() {
                break;
            }
            // best mergeable pair: max shared members, then max shared rights
            let mut best: Option<(usize, usize, usize, usize)> = None;
            for i in 0..clusters.len() {
                for j in (i + 1)..clusters.len() {
                    let (a, b) = (&clusters[i], &clusters[j]);
                    if a.is_subset(b) || b.is_subset(a) {
                        continue;
                    }
                    let key = (a.clone().min(b.clone()), a.clone().max(b.clone()));
                    if merged_pairs.contains(&key) {
                        continue;
                    }
                    let mut shared_members = Self::members(matrix, a);
                    shared_members.intersect_with(&Self::members(matrix, b));
                    let m = shared_members.count();
                    if m == 0 {
                        continue;
                    }
                    let mut shared_rights = a.clone();
                    shared_rights.intersect_with(b);
                    let r = shared_rights.count();
                    if best.is_none_or(|(bm, br, _, _)| (m, r) > (bm, br)) {
                        best = Some((m, r, i, j));
                    }
                }
            }
            let Some((_, _, i, j)) = best else { break };
            let a = clusters[i].clone();
            let b = clusters[j].clone();
            let mut merged = a.clone();
            merged.union_with(&b);
            merged_pairs.insert((a.clone().min(b.clone()), a.clone().max(b.clone())));
            clusters.remove(j);
            clusters.remove(i);
            clusters.push(merged);
            outer.push(a);
            outer.push(b);
        }

        clusters.extend(outer);
        clusters
    }
}

/// One candidate role of the greedy optimizer
#[derive(Debug, Clone)]
struct GoRole {
    users: BitSet,
    permissions: BitSet,
    /// Permissions granted directly rather than via linked sub-roles
    active: BitSet,
    /// Number of linked sub-roles
    links: usize,
}

/// Greedy optimization: start with one role per user and greedily merge
/// equal roles, link subset roles and extract shared overlaps, keeping a
/// step only when it lowers the total edge-plus-role count.
pub struct GoMiner;

impl GoMiner {
    fn metric(roles: &[GoRole]) -> usize {
        roles.len()
            + roles
                .iter()
                .map(|r| r.users.count() + r.active.count() + r.links)
                .sum::<usize>()
    }
}

impl RoleMiner for GoMiner {
    fn mine(&self, matrix: &PermissionMatrix, budget: &PhaseBudget) -> Vec<BitSet> {
        let mut roles: Vec<GoRole> = (0..matrix.users())
            .filter(|&u| !matrix.row(u).is_empty())
            .map(|u| GoRole {
                users: BitSet::from_indices(matrix.users(), [u]),
                permissions: matrix.row(u).clone(),
                active: matrix.row(u).clone(),
                links: 0,
            })
            .collect();
        let mut metric = Self::metric(&roles);

        // pass 1: merge roles with identical permission sets
        let mut i = 0;
        while i < roles.len() {
            if budget.exhausted() {
                break;
            }
            let mut j = i + 1;
            while j < roles.len() {
                if roles[i].permissions == roles[j].permissions {
                    let mut candidate = roles.clone();
                    let absorbed = candidate.remove(j);
                    candidate[i].users.union_with(&absorbed.users);
                    let new_metric = Self::metric(&candidate);
                    if new_metric <= metric {
                        roles = candidate;
                        metric = new_metric;
                        continue;
                    }
                }
                j += 1;
            }
            i += 1;
        }

        // pass 2: link strict-subset roles, deactivating inherited grants
        for i in 0..roles.len() {
            if budget.exhausted() {
                break;
            }
            for j in 0..roles.len() {
                if i == j {
                    continue;
                }
                if roles[j].permissions.is_proper_subset(&roles[i].permissions) {
                    let mut candidate = roles.clone();
                    candidate[i].active.difference_with(&roles[j].permissions);
                    candidate[i].links += 1;
                    let new_metric = Self::metric(&candidate);
                    if new_metric <= metric {
                        roles = candidate;
                        metric = new_metric;
                    }
                }
            }
        }

        roles.into_iter().map(|r| r.permissions).collect()
    }
}
