//! Chromosome Encoding
//!
//! A candidate clustering of `n` basic roles is a length-`n` integer
//! sequence with gene alphabet `[0, n)`: positions sharing a gene value
//! are grouped into the same final role. Gene values are unordered
//! labels, so chromosomes are canonicalized (relabelled by first
//! occurrence) before fitness lookup; permutation-equivalent individuals
//! then share one memoized fitness value.

/// A grouping chromosome over basic-role indices
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chromosome {
    /// `genes[i] == genes[j]` groups basic roles `i` and `j`
    pub genes: Vec<u32>,
}

impl Chromosome {
    /// Wrap a gene sequence
    pub fn new(genes: Vec<u32>) -> Self {
        Chromosome { genes }
    }

    /// Number of positions
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// True for the empty chromosome
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Relabel genes to 0,1,2,... in order of first occurrence.
    ///
    /// Idempotent, and invariant under any permutation of gene labels.
    pub fn canonicalize(&self) -> Chromosome {
        let mut relabel: std::collections::HashMap<u32, u32> = std::collections::HashMap::new();
        let genes = self
            .genes
            .iter()
            .map(|&g| {
                let next = relabel.len() as u32;
                *relabel.entry(g).or_insert(next)
            })
            .collect();
        Chromosome { genes }
    }

    /// Group basic-role indices by gene value, ordered by first occurrence
    /// of each value. Every group is one candidate final role.
    pub fn decode(&self) -> Vec<Vec<usize>> {
        let canonical = self.canonicalize();
        let group_count = canonical.genes.iter().map(|&g| g + 1).max().unwrap_or(0) as usize;
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); group_count];
        for (index, &gene) in canonical.genes.iter().enumerate() {
            groups[gene as usize].push(index);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_first_occurrence() {
        let c = Chromosome::new(vec![3, 3, 0, 2, 0]);
        assert_eq!(c.canonicalize().genes, vec![0, 0, 1, 2, 1]);
    }

    #[test]
    fn test_canonicalize_idempotent() {
        let c = Chromosome::new(vec![2, 0, 2, 1]);
        let once = c.canonicalize();
        assert_eq!(once.canonicalize(), once);
    }

    #[test]
    fn test_canonicalize_permutation_invariant() {
        // relabel 0->4, 1->2, 3->0 of [0,1,0,3]
        let a = Chromosome::new(vec![0, 1, 0, 3]);
        let b = Chromosome::new(vec![4, 2, 4, 0]);
        assert_eq!(a.canonicalize(), b.canonicalize());
    }

    #[test]
    fn test_decode_groups() {
        let c = Chromosome::new(vec![1, 0, 1, 2]);
        assert_eq!(c.decode(), vec![vec![0, 2], vec![1], vec![3]]);
    }

    #[test]
    fn test_decode_single_group() {
        let c = Chromosome::new(vec![5, 5, 5]);
        assert_eq!(c.decode(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_empty() {
        let c = Chromosome::new(vec![]);
        assert!(c.is_empty());
        assert!(c.decode().is_empty());
    }
}
