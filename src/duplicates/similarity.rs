//! Neighbour search and connectivity over perceptual codes.
//!
//! [`CodeIndex`] keeps one BK-tree per code length (codes of different
//! lengths have no distance) and answers "which codes lie strictly below the
//! cutoff". [`UnionFind`] turns those neighbour pairs into connected
//! components.

use std::collections::{BTreeMap, HashMap};

use bk_tree::{BKTree, Metric};

use crate::scanner::fingerprint::hamming;

/// Hamming distance between equal-length perceptual codes.
#[derive(Default, Clone, Copy, Debug)]
pub struct CodeMetric;

impl Metric<Vec<u8>> for CodeMetric {
    fn distance(&self, a: &Vec<u8>, b: &Vec<u8>) -> u32 {
        hamming(a, b)
    }

    fn threshold_distance(&self, a: &Vec<u8>, b: &Vec<u8>, threshold: u32) -> Option<u32> {
        let d = self.distance(a, b);
        if d <= threshold {
            Some(d)
        } else {
            None
        }
    }
}

/// Index over a fixed set of distinct perceptual codes.
///
/// Each code is identified by its position in the slice it was built from.
pub struct CodeIndex {
    trees: BTreeMap<usize, BKTree<Vec<u8>, CodeMetric>>,
    ids: HashMap<Vec<u8>, usize>,
}

impl std::fmt::Debug for CodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeIndex")
            .field("codes", &self.ids.len())
            .field("lengths", &self.trees.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CodeIndex {
    /// Build an index; duplicate codes keep the id of their first occurrence.
    #[must_use]
    pub fn new(codes: &[Vec<u8>]) -> Self {
        let mut trees: BTreeMap<usize, BKTree<Vec<u8>, CodeMetric>> = BTreeMap::new();
        let mut ids = HashMap::with_capacity(codes.len());

        for (id, code) in codes.iter().enumerate() {
            if ids.contains_key(code) {
                continue;
            }
            ids.insert(code.clone(), id);
            trees
                .entry(code.len())
                .or_insert_with(|| BKTree::new(CodeMetric))
                .add(code.clone());
        }

        Self { trees, ids }
    }

    /// Number of distinct codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the index holds no codes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids of every indexed code with distance `< cutoff` from `code`.
    ///
    /// Includes `code` itself when it is indexed. A cutoff of zero matches
    /// nothing.
    #[must_use]
    pub fn within(&self, code: &[u8], cutoff: u32) -> Vec<usize> {
        if cutoff == 0 {
            return Vec::new();
        }
        let Some(tree) = self.trees.get(&code.len()) else {
            return Vec::new();
        };

        let query = code.to_vec();
        let mut found: Vec<usize> = tree
            .find(&query, cutoff - 1)
            .filter_map(|(_, key)| self.ids.get(key).copied())
            .collect();
        found.sort_unstable();
        found
    }
}

/// Disjoint-set forest with path halving and union by size.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    /// Create `n` singleton sets.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Representative of the set containing `x`.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets containing `a` and `b`. Returns false if already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }

    /// Group element indices by set, each set in ascending index order.
    ///
    /// Sets are ordered by their smallest element.
    pub fn components(&mut self) -> Vec<Vec<usize>> {
        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut order: Vec<usize> = Vec::new();
        for i in 0..self.parent.len() {
            let root = self.find(i);
            let members = by_root.entry(root).or_default();
            if members.is_empty() {
                order.push(root);
            }
            members.push(i);
        }
        order
            .into_iter()
            .filter_map(|root| by_root.remove(&root))
            .collect()
    }
}

/// Connected components of distinct codes under "distance `< cutoff`".
///
/// Returns components of code ids (positions in `codes`), ordered by their
/// smallest id. `codes` must not contain duplicates.
#[must_use]
pub fn connected_codes(codes: &[Vec<u8>], cutoff: u32) -> Vec<Vec<usize>> {
    let mut uf = UnionFind::new(codes.len());
    if cutoff > 0 {
        let index = CodeIndex::new(codes);
        for (id, code) in codes.iter().enumerate() {
            for neighbour in index.within(code, cutoff) {
                if neighbour > id {
                    uf.union(id, neighbour);
                }
            }
        }
    }
    uf.components()
}
