//! Deduplication of undirected vertex pairs at scale.
//!
//! Two independent usage modes exist over the same [`EdgeTuple`] type:
//!
//! - [`EdgeLocator::build`] sorts an edge array once and answers
//!   [`find_edge`](EdgeLocator::find_edge) existence queries through a
//!   bin-per-`v0` index.
//! - [`merge_edges`] sorts an edge array so duplicates become contiguous runs
//!   and returns the run offsets; callers use the run index as a new stable
//!   identifier (e.g. a new point id).
//!
//! Both modes compare only the canonical `(v0, v1)` pair; the payload is
//! carried but never participates in ordering or equality.

use core::cmp::Ordering;

use rayon::prelude::*;

/// The default average number of edges covered by one locator bin.
pub const DEFAULT_EDGES_PER_BIN: usize = 5;

/// An undirected edge stored in canonical order (`v0 <= v1`) with a payload.
#[derive(Copy, Clone, Debug)]
pub struct EdgeTuple<T> {
    /// The smaller endpoint id.
    pub v0: u32,
    /// The larger endpoint id.
    pub v1: u32,
    /// The payload carried by this tuple. Never compared.
    pub data: T,
}

impl<T> EdgeTuple<T> {
    /// Builds the canonical tuple for the undirected edge `(a, b)`, swapping
    /// the endpoints if they are out of order.
    pub fn new(a: u32, b: u32, data: T) -> Self {
        if a <= b {
            Self { v0: a, v1: b, data }
        } else {
            Self { v0: b, v1: a, data }
        }
    }

    /// Whether this tuple is the undirected edge `(a, b)`, in either order.
    pub fn is_edge(&self, a: u32, b: u32) -> bool {
        (self.v0, self.v1) == if a <= b { (a, b) } else { (b, a) }
    }

    fn key(&self) -> (u32, u32) {
        (self.v0, self.v1)
    }
}

impl<T> PartialEq for EdgeTuple<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for EdgeTuple<T> {}

impl<T> PartialOrd for EdgeTuple<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for EdgeTuple<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// A build-once, query-many locator over a sorted edge array.
///
/// Building sorts the array in place (parallel sort) and derives a bin index
/// over the observed `v0` range; queries canonicalize their endpoints,
/// compute the bin, and linearly scan it for an exact match. The locator
/// never mutates the array after construction, and queries for a `v0`
/// outside the indexed range simply miss.
pub struct EdgeLocator<'a, T> {
    edges: &'a [EdgeTuple<T>],
    bin_offsets: Vec<usize>,
    num_unique: usize,
    min_v0: u32,
    max_v0: u32,
}

impl<'a, T: Send> EdgeLocator<'a, T> {
    /// Sorts `edges` in place and builds the locator with
    /// [`DEFAULT_EDGES_PER_BIN`].
    pub fn build(edges: &'a mut [EdgeTuple<T>]) -> Self {
        Self::build_with_bin_size(edges, DEFAULT_EDGES_PER_BIN)
    }

    /// Sorts `edges` in place and builds the locator with an average of
    /// `edges_per_bin` edges covered by each bin.
    pub fn build_with_bin_size(edges: &'a mut [EdgeTuple<T>], edges_per_bin: usize) -> Self {
        edges.par_sort_unstable();
        let edges = &*edges;

        if edges.is_empty() {
            return Self {
                edges,
                bin_offsets: vec![0, 0],
                num_unique: 0,
                // An empty v0 range: every query falls outside of it.
                min_v0: u32::MAX,
                max_v0: 0,
            };
        }

        let min_v0 = edges[0].v0;
        let max_v0 = edges[edges.len() - 1].v0;
        let num_bins = edges.len().div_ceil(edges_per_bin.max(1)).max(1);

        let mut bin_offsets = vec![0usize; num_bins + 1];
        let mut num_unique = 1;
        for (i, edge) in edges.iter().enumerate() {
            bin_offsets[bin_of(edge.v0, min_v0, max_v0, num_bins) + 1] += 1;
            if i > 0 && edges[i - 1].key() != edge.key() {
                num_unique += 1;
            }
        }
        for i in 1..bin_offsets.len() {
            bin_offsets[i] += bin_offsets[i - 1];
        }

        Self {
            edges,
            bin_offsets,
            num_unique,
            min_v0,
            max_v0,
        }
    }

    /// The number of distinct undirected edges in the array.
    pub fn num_unique_edges(&self) -> usize {
        self.num_unique
    }

    /// Returns the index of the undirected edge `(a, b)` in the sorted array,
    /// or `None` if it is absent or its smaller endpoint lies outside the
    /// range of indexed edges.
    pub fn find_edge(&self, a: u32, b: u32) -> Option<usize> {
        let (v0, v1) = if a <= b { (a, b) } else { (b, a) };
        if v0 < self.min_v0 || v0 > self.max_v0 {
            return None;
        }

        let num_bins = self.bin_offsets.len() - 1;
        let bin = bin_of(v0, self.min_v0, self.max_v0, num_bins);
        let start = self.bin_offsets[bin];
        let end = self.bin_offsets[bin + 1];
        self.edges[start..end]
            .iter()
            .position(|edge| edge.key() == (v0, v1))
            .map(|k| start + k)
    }
}

/// The bin holding every edge whose smaller endpoint is `v0`. Monotone in
/// `v0` so edges sharing a smaller endpoint never straddle a bin boundary.
fn bin_of(v0: u32, min_v0: u32, max_v0: u32, num_bins: usize) -> usize {
    let range = (max_v0 - min_v0) as u64 + 1;
    ((v0 - min_v0) as u64 * num_bins as u64 / range) as usize
}

/// Sorts `edges` in place (parallel sort) so duplicate undirected edges form
/// contiguous runs, and returns the run offsets.
///
/// `offsets[i]` is the start of the i-th unique edge's duplicate run and
/// `offsets[offsets.len() - 1] == edges.len()`; the number of unique edges is
/// `offsets.len() - 1`. Runs appear in sorted `(v0, v1)` order.
pub fn merge_edges<T: Send>(edges: &mut [EdgeTuple<T>]) -> Vec<usize> {
    edges.par_sort_unstable();

    let mut offsets = Vec::new();
    for i in 0..edges.len() {
        if i == 0 || edges[i - 1].key() != edges[i].key() {
            offsets.push(i);
        }
    }
    offsets.push(edges.len());
    offsets
}
