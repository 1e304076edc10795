//! Permission and Frequency Matrices
//!
//! Dense boolean and integer matrices indexed `[user × function]`, plus the
//! fixed-width bit set used for concept extents and intents throughout the
//! lattice, reducer and GA layers.
//!
//! # Memory Layout
//!
//! Bit data is stored as `u64` words, `ceil(n/64)` words per row. Population
//! counts reduce to `count_ones` over the word array.

/// A fixed-universe bit set over `0..len` indices.
///
/// Universe size is fixed at construction; all set operations assume both
/// operands share the same universe.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitSet {
    len: usize,
    words: Vec<u64>,
}

impl BitSet {
    /// Create an empty set over the universe `0..len`
    pub fn new(len: usize) -> Self {
        BitSet {
            len,
            words: vec![0u64; len.div_ceil(64)],
        }
    }

    /// Create a set containing every index in `0..len`
    pub fn full(len: usize) -> Self {
        let mut set = BitSet::new(len);
        for i in 0..len {
            set.insert(i);
        }
        set
    }

    /// Create a set from an iterator of indices
    pub fn from_indices(len: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut set = BitSet::new(len);
        for i in indices {
            set.insert(i);
        }
        set
    }

    /// Universe size
    pub fn universe(&self) -> usize {
        self.len
    }

    /// Insert an index
    pub fn insert(&mut self, idx: usize) {
        debug_assert!(idx < self.len);
        self.words[idx / 64] |= 1u64 << (idx % 64);
    }

    /// Remove an index
    pub fn remove(&mut self, idx: usize) {
        debug_assert!(idx < self.len);
        self.words[idx / 64] &= !(1u64 << (idx % 64));
    }

    /// Test membership
    pub fn contains(&self, idx: usize) -> bool {
        idx < self.len && self.words[idx / 64] & (1u64 << (idx % 64)) != 0
    }

    /// Number of elements
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True when the set has no elements
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// `self ⊆ other`
    pub fn is_subset(&self, other: &BitSet) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .all(|(a, b)| a & !b == 0)
    }

    /// `self ⊊ other`
    pub fn is_proper_subset(&self, other: &BitSet) -> bool {
        self.is_subset(other) && self != other
    }

    /// In-place union
    pub fn union_with(&mut self, other: &BitSet) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= b;
        }
    }

    /// In-place intersection
    pub fn intersect_with(&mut self, other: &BitSet) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= b;
        }
    }

    /// In-place difference (`self \ other`)
    pub fn difference_with(&mut self, other: &BitSet) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= !b;
        }
    }

    /// True when the two sets share at least one element
    pub fn intersects(&self, other: &BitSet) -> bool {
        self.words.iter().zip(&other.words).any(|(a, b)| a & b != 0)
    }

    /// True when `self` and `other` contain exactly the same indices
    /// below `limit`
    pub fn agrees_below(&self, other: &BitSet, limit: usize) -> bool {
        let full_words = limit / 64;
        if self.words[..full_words] != other.words[..full_words] {
            return false;
        }
        let rem = limit % 64;
        if rem == 0 {
            return true;
        }
        let mask = (1u64 << rem) - 1;
        (self.words[full_words] & mask) == (other.words[full_words] & mask)
    }

    /// Iterate set indices in ascending order
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            (0..64)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| wi * 64 + bit)
        })
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.ones()).finish()
    }
}

/// Boolean user×function permission matrix.
///
/// `get(u, f)` is true iff at least one successful call record with caller
/// `u` and function `f` was observed.
#[derive(Clone, Debug)]
pub struct PermissionMatrix {
    users: usize,
    functions: usize,
    rows: Vec<BitSet>,
}

impl PermissionMatrix {
    /// Create an all-false matrix
    pub fn new(users: usize, functions: usize) -> Self {
        PermissionMatrix {
            users,
            functions,
            rows: vec![BitSet::new(functions); users],
        }
    }

    /// Number of users (rows)
    pub fn users(&self) -> usize {
        self.users
    }

    /// Number of functions (columns)
    pub fn functions(&self) -> usize {
        self.functions
    }

    /// Grant permission `f` to user `u`
    pub fn set(&mut self, user: usize, function: usize) {
        self.rows[user].insert(function);
    }

    /// Test permission
    pub fn get(&self, user: usize, function: usize) -> bool {
        self.rows[user].contains(function)
    }

    /// The permission row of one user
    pub fn row(&self, user: usize) -> &BitSet {
        &self.rows[user]
    }

    /// Users holding permission `f`, as a bit set over users
    pub fn holders(&self, function: usize) -> BitSet {
        BitSet::from_indices(
            self.users,
            (0..self.users).filter(|&u| self.get(u, function)),
        )
    }

    /// Count of set cells in the submatrix `users × functions`
    pub fn popcount_sub(&self, users: &BitSet, functions: &BitSet) -> usize {
        users
            .ones()
            .map(|u| {
                let mut row = self.rows[u].clone();
                row.intersect_with(functions);
                row.count()
            })
            .sum()
    }

    /// Count of set cells in the rows of `users` (all functions)
    pub fn popcount_rows(&self, users: &BitSet) -> usize {
        users.ones().map(|u| self.rows[u].count()).sum()
    }

    /// Restrict the matrix to a subset of users, renumbering rows densely.
    /// Returns the restricted matrix and the kept original user indices.
    pub fn restrict_users(&self, keep: &BitSet) -> (PermissionMatrix, Vec<usize>) {
        let kept: Vec<usize> = keep.ones().collect();
        let mut out = PermissionMatrix::new(kept.len(), self.functions);
        for (new_u, &old_u) in kept.iter().enumerate() {
            out.rows[new_u] = self.rows[old_u].clone();
        }
        (out, kept)
    }
}

/// Integer user×function call-count matrix, same shape as the permission
/// matrix. `P[u,f] = (F[u,f] > 0)` holds by construction in the loader.
#[derive(Clone, Debug)]
pub struct FrequencyMatrix {
    users: usize,
    functions: usize,
    counts: Vec<u64>,
}

impl FrequencyMatrix {
    /// Create an all-zero matrix
    pub fn new(users: usize, functions: usize) -> Self {
        FrequencyMatrix {
            users,
            functions,
            counts: vec![0; users * functions],
        }
    }

    /// Number of users (rows)
    pub fn users(&self) -> usize {
        self.users
    }

    /// Number of functions (columns)
    pub fn functions(&self) -> usize {
        self.functions
    }

    /// Add `count` calls to cell `(user, function)`
    pub fn add(&mut self, user: usize, function: usize, count: u64) {
        self.counts[user * self.functions + function] += count;
    }

    /// Call count at `(user, function)`
    pub fn get(&self, user: usize, function: usize) -> u64 {
        self.counts[user * self.functions + function]
    }

    /// Sum of `F[u, function]` over the given users
    pub fn column_sum(&self, users: &BitSet, function: usize) -> u64 {
        users.ones().map(|u| self.get(u, function)).sum()
    }
}
