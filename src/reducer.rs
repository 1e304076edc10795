//! Hierarchy Reduction
//!
//! Collapses the concept lattice into "basic roles". A concept whose user
//! set is a strict subset of another's is the more privileged of the two;
//! its function set is delta-encoded against all strict ancestors so each
//! basic role carries only the functions that distinguish it. Concepts
//! left with no distinguishing functions are dropped.
//!
//! The reference traversal is children-first. It is expressed here as an
//! explicit work stack plus a processed bitmap; a node's inclusion row is
//! retired once the node has been trimmed so it is never processed twice.

use crate::lattice::Concept;
use crate::matrix::BitSet;
use tracing::debug;

/// Traversal phases for one node on the work stack
enum Phase {
    /// Classify the node and schedule children
    Enter,
    /// Trim the node against its parents after its children finished
    Trim,
}

/// Reduce lattice concepts to basic roles.
///
/// Concepts with an empty user set or an empty function set are ignored.
/// Iteration order is by index, so equal inputs give equal outputs.
/// Duplicate (users, functions) pairs left after trimming are deduplicated.
pub fn reduce_hierarchy(concepts: &[Concept]) -> Vec<Concept> {
    let mut roles: Vec<Concept> = concepts
        .iter()
        .filter(|c| !c.extent.is_empty() && !c.intent.is_empty())
        .cloned()
        .collect();
    let n = roles.len();

    // inclusion[i][j] = role i's users are a strict subset of role j's
    // (stricter membership means higher privilege)
    let inclusion: Vec<Vec<bool>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| i != j && roles[i].extent.is_proper_subset(&roles[j].extent))
                .collect()
        })
        .collect();

    let mut processed = vec![false; n];
    let mut removed = vec![false; n];

    for root in 0..n {
        let mut stack: Vec<(usize, Phase)> = vec![(root, Phase::Enter)];
        while let Some((v, phase)) = stack.pop() {
            if processed[v] {
                continue;
            }
            let has_parents = (0..n).any(|j| inclusion[v][j]);
            // a processed child's row is retired, so it no longer counts
            let children: Vec<usize> =
                (0..n).filter(|&j| inclusion[j][v] && !processed[j]).collect();

            match phase {
                Phase::Enter => {
                    if has_parents && children.is_empty() {
                        trim_against_parents(&mut roles, &inclusion, &mut removed, v);
                        processed[v] = true;
                    } else if !has_parents && !children.is_empty() {
                        // top-level role: keeps its full function set,
                        // children are reduced first
                        for &child in children.iter().rev() {
                            stack.push((child, Phase::Enter));
                        }
                    } else if has_parents && !children.is_empty() {
                        stack.push((v, Phase::Trim));
                        for &child in children.iter().rev() {
                            stack.push((child, Phase::Enter));
                        }
                    }
                }
                Phase::Trim => {
                    trim_against_parents(&mut roles, &inclusion, &mut removed, v);
                    processed[v] = true;
                }
            }
        }
    }

    let mut seen: Vec<(BitSet, BitSet)> = Vec::new();
    let survivors: Vec<Concept> = roles
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !removed[*i])
        .map(|(_, c)| c)
        .filter(|c| {
            let key = (c.extent.clone(), c.intent.clone());
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        })
        .collect();

    debug!(input = concepts.len(), basic_roles = survivors.len(), "reduced hierarchy");
    survivors
}

/// Delta-encode role `v` against the current function sets of its strict
/// ancestors; mark it removed when nothing distinguishing remains.
fn trim_against_parents(
    roles: &mut [Concept],
    inclusion: &[Vec<bool>],
    removed: &mut [bool],
    v: usize,
) {
    let n = roles.len();
    let mut trimmed = roles[v].intent.clone();
    for j in 0..n {
        if inclusion[v][j] {
            trimmed.difference_with(&roles[j].intent);
        }
    }
    if trimmed.is_empty() {
        removed[v] = true;
    } else {
        roles[v].intent = trimmed;
    }
}
