//! Concept Lattice Construction
//!
//! Enumerates the Galois lattice of the boolean permission matrix: every
//! maximal (user-set, function-set) pair closed under the derivation
//! operators. Uses Close-by-One over the function dimension with an
//! explicit work stack, so enumeration order is deterministic and deep
//! lattices cannot overflow the call stack.
//!
//! Lattice size is worst-case exponential in `min(|users|, |functions|)`.
//! Enumeration therefore runs under a [`PhaseBudget`]; on overrun the
//! caller falls back to [`trivial_partition`], one concept per distinct
//! permission row.
//!
//! Nodes are arena-owned; Hasse links are index pairs into the arena.

use crate::budget::PhaseBudget;
use crate::matrix::{BitSet, PermissionMatrix};
use std::collections::HashMap;
use tracing::debug;

/// A formal concept: closed (user-set, function-set) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    /// Users sharing every function of the intent
    pub extent: BitSet,
    /// Functions shared by every user of the extent
    pub intent: BitSet,
}

/// The full concept lattice with lower-neighbour (Hasse) links
#[derive(Debug, Clone)]
pub struct ConceptLattice {
    /// Arena of concepts in enumeration order; the top concept
    /// (all users) is at index 0
    pub concepts: Vec<Concept>,
    /// `lower[i]` holds the indices of the maximal proper subconcepts
    /// of concept `i` (by extent inclusion)
    pub lower: Vec<Vec<usize>>,
}

/// Functions common to every user of `extent`.
///
/// The intent of the empty extent is the full function universe.
pub fn intent_of(p: &PermissionMatrix, extent: &BitSet) -> BitSet {
    let mut users = extent.ones();
    let Some(first) = users.next() else {
        return BitSet::full(p.functions());
    };
    let mut intent = p.row(first).clone();
    for u in users {
        intent.intersect_with(p.row(u));
    }
    intent
}

/// Users holding every function of `intent`.
///
/// The extent of the empty intent is the full user universe.
pub fn extent_of(p: &PermissionMatrix, intent: &BitSet) -> BitSet {
    let mut extent = BitSet::full(p.users());
    for f in intent.ones() {
        extent.intersect_with(&p.holders(f));
    }
    extent
}

/// Enumerate the complete concept lattice of `p`.
///
/// Returns `None` when the budget runs out before enumeration (or Hasse
/// link computation) finishes.
pub fn build_lattice(p: &PermissionMatrix, budget: &PhaseBudget) -> Option<ConceptLattice> {
    let n_funcs = p.functions();
    let holders: Vec<BitSet> = (0..n_funcs).map(|f| p.holders(f)).collect();

    let top_extent = BitSet::full(p.users());
    let top_intent = intent_of(p, &top_extent);

    let mut concepts: Vec<Concept> = Vec::new();
    // (extent, intent, first function index still to try)
    let mut stack: Vec<(BitSet, BitSet, usize)> = vec![(top_extent, top_intent, 0)];

    while let Some((extent, intent, start)) = stack.pop() {
        if budget.exhausted() {
            return None;
        }
        // Children pushed in reverse so the pop order matches the
        // recursive Close-by-One visit order.
        for j in (start..n_funcs).rev() {
            if intent.contains(j) {
                continue;
            }
            let mut child_extent = extent.clone();
            child_extent.intersect_with(&holders[j]);
            let child_intent = intent_of(p, &child_extent);
            // Canonicity: the closure must not introduce a function
            // below j that the parent intent lacks.
            if child_intent.agrees_below(&intent, j) {
                stack.push((child_extent, child_intent, j + 1));
            }
        }
        concepts.push(Concept { extent, intent });
    }

    let lower = lower_neighbors(&concepts, budget)?;
    debug!(concepts = concepts.len(), "enumerated concept lattice");
    Some(ConceptLattice { concepts, lower })
}

/// Maximal-proper-subconcept links for each arena node
fn lower_neighbors(concepts: &[Concept], budget: &PhaseBudget) -> Option<Vec<Vec<usize>>> {
    let n = concepts.len();
    let mut lower = vec![Vec::new(); n];
    for i in 0..n {
        if budget.exhausted() {
            return None;
        }
        let subs: Vec<usize> = (0..n)
            .filter(|&j| concepts[j].extent.is_proper_subset(&concepts[i].extent))
            .collect();
        lower[i] = subs
            .iter()
            .copied()
            .filter(|&j| {
                !subs
                    .iter()
                    .any(|&k| concepts[j].extent.is_proper_subset(&concepts[k].extent))
            })
            .collect();
    }
    Some(lower)
}

/// Fallback partition used when the lattice budget is exhausted: each
/// distinct non-empty permission row becomes one concept grouping the
/// users that share it.
pub fn trivial_partition(p: &PermissionMatrix) -> Vec<Concept> {
    let mut groups: HashMap<BitSet, BitSet> = HashMap::new();
    let mut order: Vec<BitSet> = Vec::new();
    for u in 0..p.users() {
        let row = p.row(u);
        if row.is_empty() {
            continue;
        }
        groups
            .entry(row.clone())
            .or_insert_with(|| {
                order.push(row.clone());
                BitSet::new(p.users())
            })
            .insert(u);
    }
    order
        .into_iter()
        .map(|intent| {
            let extent = groups.remove(&intent).unwrap_or_else(|| BitSet::new(p.users()));
            Concept { extent, intent }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// admin {f1,f2,f3}, operator {f2,f3}, user {f3}
    fn hierarchy_matrix() -> PermissionMatrix {
        let mut p = PermissionMatrix::new(3, 3);
        p.set(0, 0);
        p.set(0, 1);
        p.set(0, 2);
        p.set(1, 1);
        p.set(1, 2);
        p.set(2, 2);
        p
    }

    #[test]
    fn test_lattice_of_hierarchy() {
        let p = hierarchy_matrix();
        let lattice = build_lattice(&p, &PhaseBudget::unlimited()).expect("lattice");
        // chain lattice: {admin}x{f1,f2,f3} ⊂ {admin,op}x{f2,f3} ⊂ {all}x{f3}
        assert_eq!(lattice.concepts.len(), 3);
        // top is all users
        assert_eq!(lattice.concepts[0].extent.count(), 3);
        assert_eq!(lattice.concepts[0].intent.ones().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_closure_property() {
        let p = hierarchy_matrix();
        let lattice = build_lattice(&p, &PhaseBudget::unlimited()).expect("lattice");
        for concept in &lattice.concepts {
            assert_eq!(intent_of(&p, &concept.extent), concept.intent);
            assert_eq!(extent_of(&p, &concept.intent), concept.extent);
        }
    }

    #[test]
    fn test_disjoint_users_have_bottom() {
        // a calls f1, b calls f2
        let mut p = PermissionMatrix::new(2, 2);
        p.set(0, 0);
        p.set(1, 1);
        let lattice = build_lattice(&p, &PhaseBudget::unlimited()).expect("lattice");
        // top (both users, no common function), two singleton concepts,
        // bottom (no user, both functions)
        assert_eq!(lattice.concepts.len(), 4);
        assert!(lattice
            .concepts
            .iter()
            .any(|c| c.extent.is_empty() && c.intent.count() == 2));
        assert!(lattice
            .concepts
            .iter()
            .any(|c| c.extent.count() == 2 && c.intent.is_empty()));
    }

    #[test]
    fn test_lower_neighbors_chain() {
        let p = hierarchy_matrix();
        let lattice = build_lattice(&p, &PhaseBudget::unlimited()).expect("lattice");
        // find concept index by extent size
        let by_size = |n: usize| {
            lattice
                .concepts
                .iter()
                .position(|c| c.extent.count() == n)
                .expect("concept")
        };
        let top = by_size(3);
        let mid = by_size(2);
        let bot = by_size(1);
        assert_eq!(lattice.lower[top], vec![mid]);
        assert_eq!(lattice.lower[mid], vec![bot]);
        assert!(lattice.lower[bot].is_empty());
    }

    #[test]
    fn test_budget_cancellation_returns_none() {
        let p = hierarchy_matrix();
        let budget = PhaseBudget::unlimited();
        budget.cancel();
        assert!(build_lattice(&p, &budget).is_none());
    }

    #[test]
    fn test_trivial_partition_groups_equal_rows() {
        let mut p = PermissionMatrix::new(4, 2);
        p.set(0, 0);
        p.set(1, 0);
        p.set(2, 0);
        p.set(2, 1);
        // user 3 has no permissions and is dropped
        let partition = trivial_partition(&p);
        assert_eq!(partition.len(), 2);
        assert_eq!(partition[0].extent.ones().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(partition[1].extent.ones().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_empty_matrix() {
        let p = PermissionMatrix::new(0, 0);
        let lattice = build_lattice(&p, &PhaseBudget::unlimited()).expect("lattice");
        // single degenerate concept
        assert_eq!(lattice.concepts.len(), 1);
        assert!(trivial_partition(&p).is_empty());
    }
}
