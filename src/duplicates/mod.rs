//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Exact grouping by fingerprint identity
//! - Perceptual grouping as connected components under a distance cutoff
//! - BK-tree neighbour search shared with cross-corpus pruning

pub mod groups;
pub mod similarity;

pub use groups::{group, DuplicateGroup, GroupingStats, Similarity};
pub use similarity::{connected_codes, CodeIndex, CodeMetric, UnionFind};
