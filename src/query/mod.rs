//! Plane clipping and cutting queries over convex-polygon meshes.

pub use self::clip::{ClipAttributes, ClipOutput, PlaneClipper};
pub use self::cut::{CutAttributes, CutOutput, PlaneCutter};

mod capping;
mod clip;
mod cut;

use core::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::math::Real;
use crate::shape::{Plane, PointCoords};

/// The default batch size of both queries, governing parallel granularity and
/// trimming overhead, not correctness.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// How many iterations the designated first worker runs between two polls of
/// the caller's abort flag.
fn poll_cadence(chunk_len: usize) -> usize {
    (chunk_len / 10 + 1).min(1000)
}

/// Cooperative-cancellation token scoped to one query invocation.
///
/// The worker owning the first chunk of each parallel pass polls the caller's
/// flag at the [`poll_cadence`] and relays it to the other workers through
/// `stop`; the other workers only ever read `stop`.
pub(crate) struct AbortCheck<'a> {
    caller: Option<&'a AtomicBool>,
    stop: AtomicBool,
}

impl<'a> AbortCheck<'a> {
    pub fn new(caller: Option<&'a AtomicBool>) -> Self {
        Self {
            caller,
            stop: AtomicBool::new(false),
        }
    }

    /// Polled by the first worker only.
    pub fn poll_first(&self) -> bool {
        if let Some(flag) = self.caller {
            if flag.load(Ordering::Relaxed) {
                self.stop.store(true, Ordering::Relaxed);
            }
        }
        self.triggered()
    }

    /// Whether the invocation was aborted; checked by every worker.
    pub fn triggered(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Carves `slice` into disjoint mutable sub-slices covering the given sorted,
/// non-overlapping `[start, end)` bounds.
///
/// This is how the queries hand each batch its pre-computed output region:
/// the regions are carved serially, then written in parallel.
pub(crate) fn carve_disjoint<'a, T>(
    mut slice: &'a mut [T],
    bounds: impl Iterator<Item = (usize, usize)>,
) -> Vec<&'a mut [T]> {
    let mut carved = Vec::new();
    let mut pos = 0;
    for (start, end) in bounds {
        let (_, rest) = slice.split_at_mut(start - pos);
        let (mine, rest) = rest.split_at_mut(end - start);
        carved.push(mine);
        slice = rest;
        pos = end;
    }
    carved
}

/// Evaluates the plane equation at every point, in parallel chunks of
/// `batch_size`. The caller must discard the values if `check` triggered.
pub(crate) fn evaluate_points(
    points: &PointCoords,
    plane: &Plane,
    batch_size: usize,
    check: &AbortCheck,
) -> Vec<Real> {
    let mut values = vec![0.0; points.len()];
    values
        .par_chunks_mut(batch_size)
        .enumerate()
        .for_each(|(chunk_id, chunk)| {
            let base = chunk_id * batch_size;
            let cadence = poll_cadence(chunk.len());
            for (k, value) in chunk.iter_mut().enumerate() {
                if k % cadence == 0 {
                    let aborted = if chunk_id == 0 {
                        check.poll_first()
                    } else {
                        check.triggered()
                    };
                    if aborted {
                        return;
                    }
                }
                *value = plane.eval(&points.get(base + k));
            }
        });
    values
}

/// Re-encodes a point buffer at the given output precision.
pub(crate) fn reencode_points(
    points: &PointCoords,
    precision: crate::shape::PointPrecision,
) -> PointCoords {
    if points.precision() == precision {
        points.clone()
    } else {
        let widened: Vec<_> = (0..points.len())
            .into_par_iter()
            .map(|i| points.get(i))
            .collect();
        PointCoords::from_points(&widened, precision)
    }
}
