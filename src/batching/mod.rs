//! Decomposition of a linear index range into fixed-size batches carrying an
//! associative payload.
//!
//! Batches amortize per-element bookkeeping during parallel work: a sizing
//! pass accumulates counts into each batch's payload, empty batches are
//! [trimmed](Batches::trim), and [`Batches::build_offsets`] turns the
//! surviving payloads into global exclusive prefix offsets so that later
//! passes can write to disjoint, pre-computed output regions.

use rayon::prelude::*;

/// Associative accumulator carried by a [`Batch`].
///
/// `Default` must be the identity of [`BatchData::combine`], and `combine`
/// must be associative; commutativity is not required.
pub trait BatchData: Copy + Default + Send + Sync {
    /// Combines two payloads.
    fn combine(self, rhs: Self) -> Self;
}

impl BatchData for usize {
    fn combine(self, rhs: Self) -> Self {
        self + rhs
    }
}

/// A contiguous sub-range `[begin, end)` of element indices and its payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Batch<T> {
    /// The first element index covered by this batch.
    pub begin: usize,
    /// One past the last element index covered by this batch.
    pub end: usize,
    /// The accumulated payload.
    pub data: T,
}

impl<T> Batch<T> {
    /// The element index range covered by this batch.
    pub fn range(&self) -> core::ops::Range<usize> {
        self.begin..self.end
    }

    /// The number of elements covered by this batch.
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Whether this batch covers no elements.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// An ordered sequence of [`Batch`]es partitioning `[0, numberOfElements)`.
///
/// Until [trimmed](Batches::trim), batches are contiguous, non-overlapping,
/// and cover the full range; the last batch absorbs the remainder when the
/// element count is not a multiple of the batch size.
///
/// None of the mutating operations may be called concurrently with each other
/// on the same instance.
#[derive(Clone, Debug)]
pub struct Batches<T: BatchData> {
    batches: Vec<Batch<T>>,
}

impl<T: BatchData> Batches<T> {
    /// Partitions `[0, num_elements)` into batches of `batch_size` elements,
    /// built in parallel with identity payloads.
    ///
    /// Produces zero batches when `num_elements == 0`. A `batch_size` of zero
    /// is treated as one.
    pub fn new(num_elements: usize, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        let num_batches = num_elements.div_ceil(batch_size);
        let batches = (0..num_batches)
            .into_par_iter()
            .map(|i| Batch {
                begin: i * batch_size,
                end: ((i + 1) * batch_size).min(num_elements),
                data: T::default(),
            })
            .collect();
        Self { batches }
    }

    /// The number of batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Whether there are no batches.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// The batches as a slice.
    pub fn as_slice(&self) -> &[Batch<T>] {
        &self.batches
    }

    /// The batches as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [Batch<T>] {
        &mut self.batches
    }

    /// The contiguous per-worker chunk length used by [`Batches::trim`] and
    /// [`Batches::build_offsets`].
    fn worker_chunk(&self) -> usize {
        let shares = rayon::current_num_threads().min(self.batches.len()).max(1);
        self.batches.len().div_ceil(shares)
    }

    /// Removes every batch for which `discard` returns `true`.
    ///
    /// Each worker performs an in-place stable compaction of its contiguous
    /// sub-range of batches; a serial pass then closes the gaps between
    /// worker sub-ranges. Surviving batches keep their relative order. No-op
    /// when there are zero batches.
    pub fn trim<F>(&mut self, discard: F)
    where
        F: Fn(&Batch<T>) -> bool + Sync,
    {
        if self.batches.is_empty() {
            return;
        }

        let chunk = self.worker_chunk();
        let kept: Vec<usize> = self
            .batches
            .par_chunks_mut(chunk)
            .map(|share| {
                let mut n = 0;
                for i in 0..share.len() {
                    if !discard(&share[i]) {
                        if i != n {
                            share[n] = share[i];
                        }
                        n += 1;
                    }
                }
                n
            })
            .collect();

        // Close the gaps between worker shares, left to right.
        let mut dst = kept[0];
        for (share, &num_kept) in kept.iter().enumerate().skip(1) {
            let src = share * chunk;
            self.batches.copy_within(src..src + num_kept, dst);
            dst += num_kept;
        }
        self.batches.truncate(dst);
    }

    /// Converts each batch's payload from a local sum into a global exclusive
    /// prefix offset, and returns the grand total.
    ///
    /// Three steps: parallel per-worker partial sums, a serial prefix over the
    /// worker partials, then a parallel rewrite of each batch's payload into
    /// `previous-batch-offset + previous-batch-sum`. Returns `T::default()`
    /// when there are zero batches.
    pub fn build_offsets(&mut self) -> T {
        if self.batches.is_empty() {
            return T::default();
        }

        let chunk = self.worker_chunk();
        let partials: Vec<T> = self
            .batches
            .par_chunks(chunk)
            .map(|share| {
                share
                    .iter()
                    .fold(T::default(), |sum, batch| sum.combine(batch.data))
            })
            .collect();

        let mut share_offsets = Vec::with_capacity(partials.len());
        let mut total = T::default();
        for partial in partials {
            share_offsets.push(total);
            total = total.combine(partial);
        }

        self.batches
            .par_chunks_mut(chunk)
            .zip(share_offsets.into_par_iter())
            .for_each(|(share, mut offset)| {
                for batch in share {
                    let sum = batch.data;
                    batch.data = offset;
                    offset = offset.combine(sum);
                }
            });

        total
    }
}

impl<'a, T: BatchData> IntoIterator for &'a Batches<T> {
    type Item = &'a Batch<T>;
    type IntoIter = core::slice::Iter<'a, Batch<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter()
    }
}
