//! Cutting a convex-polygon mesh by a plane, extracting the cross-section as
//! line segments.

use core::sync::atomic::{AtomicBool, Ordering};

use arrayvec::ArrayVec;
use rayon::prelude::*;

use crate::attributes::AttributeInterpolator;
use crate::batching::{Batch, BatchData, Batches};
use crate::locator::{merge_edges, EdgeTuple};
use crate::math::{Point, Real, Vector};
use crate::query::clip::intersection_parameter;
use crate::query::{carve_disjoint, evaluate_points, AbortCheck, DEFAULT_BATCH_SIZE};
use crate::shape::{CellArray, OutputPointsPrecision, Plane, PointCoords, PolyMesh};

/// Cell-map sentinel for a cell that does not straddle the plane.
const UNCUT: u32 = u32::MAX;

/// Per-batch output size accounting for the cutter: one line per straddling
/// cell.
#[derive(Copy, Clone, Debug, Default)]
struct CutBatchData {
    lines: usize,
}

impl BatchData for CutBatchData {
    fn combine(self, rhs: Self) -> Self {
        Self {
            lines: self.lines + rhs.lines,
        }
    }
}

/// The line connectivity slot reserved for a cut edge's eventual new point
/// id.
#[derive(Copy, Clone, Debug, Default)]
struct CutSlot {
    line: usize,
}

/// Attribute collaborators consumed by [`PlaneCutter::cut`]; only used when
/// [`PlaneCutter::interpolate_attributes`] is set.
pub struct CutAttributes<'a> {
    /// Point attributes, edge-interpolated at every new cross-section point.
    pub point: &'a mut dyn AttributeInterpolator,
    /// Cell attributes, copied from each intersected cell onto its output
    /// line.
    pub cell: &'a mut dyn AttributeInterpolator,
}

/// The result of a plane cut.
pub struct CutOutput {
    /// The cross-section: points and 2-point line segments, one per
    /// intersected cell.
    pub mesh: PolyMesh,
    /// One plane normal per output point, when
    /// [`PlaneCutter::compute_normals`] is set.
    pub normals: Option<Vec<Vector>>,
}

/// Cuts a convex-polygon mesh by a plane, producing one 2-point line segment
/// per cell straddling the plane.
///
/// Endpoints are interpolated where cell edges cross the plane and
/// deduplicated across cells, so adjacent cells share their cross-section
/// points. The same convexity clamp as the clipper applies to cells crossing
/// the plane on more than two edges.
#[derive(Clone, Debug)]
pub struct PlaneCutter {
    /// The number of cells (or points) per parallel batch.
    pub batch_size: usize,
    /// Emit a constant plane-normal point-normal array on the output.
    pub compute_normals: bool,
    /// Interpolate point attributes and copy cell attributes onto the
    /// output.
    pub interpolate_attributes: bool,
    /// Storage precision of the output points.
    pub output_points_precision: OutputPointsPrecision,
}

impl Default for PlaneCutter {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            compute_normals: false,
            interpolate_attributes: false,
            output_points_precision: OutputPointsPrecision::default(),
        }
    }
}

impl PlaneCutter {
    /// Runs the cut. Returns `None` if the invocation was aborted through
    /// `abort`, in which case all partial work is discarded.
    pub fn cut(
        &self,
        mesh: &PolyMesh,
        plane: &Plane,
        mut attributes: Option<CutAttributes>,
        abort: Option<&AtomicBool>,
    ) -> Option<CutOutput> {
        let precision = self.output_points_precision.resolve(mesh.points.precision());
        let num_points = mesh.num_points();
        let num_cells = mesh.polys.num_cells();
        let batch_size = self.batch_size.max(1);
        let check = AbortCheck::new(abort);

        let empty = |attributes: &mut Option<CutAttributes>| {
            if let Some(attrs) = attributes.as_mut() {
                attrs.point.resize(0);
                attrs.cell.resize(0);
            }
            CutOutput {
                mesh: PolyMesh::empty(precision),
                normals: self.compute_normals.then(Vec::new),
            }
        };

        if num_points == 0 || num_cells == 0 {
            log::debug!("plane cut: empty input mesh");
            return Some(empty(&mut attributes));
        }

        // Point classification: only the above/below side is needed, no
        // compaction.
        let values = evaluate_points(&mesh.points, plane, batch_size, &check);
        if check.triggered() {
            return None;
        }

        // A cell can only straddle the plane if points exist on both sides;
        // OR-reduce per-worker flags to find out before running the batch
        // machinery.
        let (any_above, any_below) = values
            .par_chunks(batch_size)
            .map(|chunk| {
                let mut above = false;
                let mut below = false;
                for &v in chunk {
                    if v > 0.0 {
                        above = true;
                    } else {
                        below = true;
                    }
                }
                (above, below)
            })
            .reduce(|| (false, false), |a, b| (a.0 || b.0, a.1 || b.1));
        if !(any_above && any_below) {
            log::debug!("plane cut: no cell straddles the plane");
            return Some(empty(&mut attributes));
        }

        // Cell classification and sizing; the cell map is overwritten with
        // the cell's output line index during extraction.
        let mut cell_map = vec![UNCUT; num_cells];
        let mut batches = Batches::<CutBatchData>::new(num_cells, batch_size);
        batches
            .as_mut_slice()
            .par_iter_mut()
            .zip(cell_map.par_chunks_mut(batch_size))
            .enumerate()
            .for_each(|(batch_id, (batch, cell_states))| {
                let cadence = super::poll_cadence(batch.len());
                for (k, c) in batch.range().enumerate() {
                    if k % cadence == 0 {
                        let aborted = if batch_id == 0 {
                            check.poll_first()
                        } else {
                            check.triggered()
                        };
                        if aborted {
                            return;
                        }
                    }

                    let cell = mesh.polys.cell(c);
                    let mut above = false;
                    let mut below = false;
                    for &p in cell {
                        if values[p as usize] > 0.0 {
                            above = true;
                        } else {
                            below = true;
                        }
                    }
                    if above && below {
                        cell_states[k] = 0;
                        batch.data.lines += 1;
                    }
                }
            });
        if check.triggered() {
            return None;
        }

        batches.trim(|batch| batch.data.lines == 0);
        let totals = batches.build_offsets();
        let num_lines = totals.lines;

        let mut line_offsets = vec![0usize; num_lines + 1];
        let mut line_conn = vec![0u32; 2 * num_lines];
        let mut edges = vec![EdgeTuple::new(0, 0, CutSlot::default()); 2 * num_lines];

        line_offsets
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, offset)| *offset = 2 * i);

        let clamped = AtomicBool::new(false);
        {
            let num_batches = batches.len();
            let batch_slice = batches.as_slice();
            let next_lines = |i: usize| {
                if i + 1 < num_batches {
                    batch_slice[i + 1].data.lines
                } else {
                    num_lines
                }
            };

            let edge_slices = carve_disjoint(
                &mut edges,
                (0..num_batches).map(|i| (2 * batch_slice[i].data.lines, 2 * next_lines(i))),
            );
            let state_slices = carve_disjoint(
                &mut cell_map,
                batch_slice.iter().map(|b| (b.begin, b.end)),
            );

            batch_slice
                .par_iter()
                .zip(edge_slices)
                .zip(state_slices)
                .enumerate()
                .for_each(|(batch_id, ((batch, edges_s), states))| {
                    extract_batch(
                        mesh, &values, batch, batch_id, edges_s, states, &check, &clamped,
                    );
                });
        }
        if check.triggered() {
            return None;
        }

        // Every unique cut edge becomes one output point.
        let group_offsets = merge_edges(&mut edges);
        let num_new = group_offsets.len() - 1;

        let edge_params: Vec<(u32, u32, Real)> = (0..num_new)
            .into_par_iter()
            .map(|g| {
                let edge = &edges[group_offsets[g]];
                (edge.v0, edge.v1, intersection_parameter(&values, edge))
            })
            .collect();
        let new_points: Vec<Point> = edge_params
            .par_iter()
            .map(|&(v0, v1, t)| {
                let a = mesh.points.get(v0 as usize);
                let b = mesh.points.get(v1 as usize);
                a + (b - a) * t
            })
            .collect();

        for g in 0..num_new {
            for edge in &edges[group_offsets[g]..group_offsets[g + 1]] {
                line_conn[edge.data.line] = g as u32;
            }
        }

        if self.interpolate_attributes {
            if let Some(attrs) = attributes.as_mut() {
                attrs.point.resize(num_new);
                for (g, &(v0, v1, t)) in edge_params.iter().enumerate() {
                    attrs.point.interpolate_edge(v0 as usize, v1 as usize, t, g);
                }

                attrs.cell.resize(num_lines);
                for (c, &line) in cell_map.iter().enumerate() {
                    if line != UNCUT {
                        attrs.cell.copy(c, line as usize);
                    }
                }
            }
        }

        let normals = self
            .compute_normals
            .then(|| vec![plane.normal().into_inner(); num_new]);

        Some(CutOutput {
            mesh: PolyMesh {
                points: PointCoords::from_points(&new_points, precision),
                polys: CellArray::new(),
                lines: CellArray::from_raw_parts(line_offsets, line_conn),
            },
            normals,
        })
    }
}

/// Walks one batch of cells and emits raw duplicate cut edges into the
/// batch's carved output region, recording each cell's output line index in
/// the cell map.
fn extract_batch(
    mesh: &PolyMesh,
    values: &[Real],
    batch: &Batch<CutBatchData>,
    batch_id: usize,
    edges_s: &mut [EdgeTuple<CutSlot>],
    states: &mut [u32],
    check: &AbortCheck,
    clamped: &AtomicBool,
) {
    let cadence = super::poll_cadence(batch.len());
    let mut local_line = 0;

    for (k, c) in batch.range().enumerate() {
        if k % cadence == 0 {
            let aborted = if batch_id == 0 {
                check.poll_first()
            } else {
                check.triggered()
            };
            if aborted {
                return;
            }
        }

        if states[k] == UNCUT {
            continue;
        }

        let cell = mesh.polys.cell(c);
        let npts = cell.len();
        let line_id = batch.data.lines + local_line;
        states[k] = line_id as u32;
        local_line += 1;

        let mut crossings: ArrayVec<(u32, u32), 2> = ArrayVec::new();
        for i in 0..npts {
            let a = cell[i];
            let b = cell[(i + 1) % npts];
            let above_a = values[a as usize] > 0.0;
            let above_b = values[b as usize] > 0.0;
            if above_a != above_b && crossings.try_push((a, b)).is_err() {
                if !clamped.swap(true, Ordering::Relaxed) {
                    log::warn!(
                        "cell {} crosses the plane on more than two edges; \
                         clamping to the first two crossings",
                        c
                    );
                }
                break;
            }
        }
        // Straddling cells cross at least twice unless degenerate; pad so
        // the 2-entries-per-line layout stays exact.
        while !crossings.is_full() {
            let a = crossings.first().map(|&(a, _)| a).unwrap_or(cell[0]);
            crossings.push((a, a));
        }

        for (i, &(a, b)) in crossings.iter().enumerate() {
            let slot = CutSlot {
                line: 2 * line_id + i,
            };
            edges_s[2 * (local_line - 1) + i] = EdgeTuple::new(a, b, slot);
        }
    }
}
