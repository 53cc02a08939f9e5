//! Clipping a convex-polygon mesh by a plane.

use core::sync::atomic::{AtomicBool, Ordering};

use arrayvec::ArrayVec;
use rayon::prelude::*;

use crate::attributes::AttributeInterpolator;
use crate::batching::{BatchData, Batches};
use crate::locator::{merge_edges, EdgeTuple};
use crate::math::{Point, Real};
use crate::query::capping::build_caps;
use crate::query::{
    carve_disjoint, evaluate_points, reencode_points, AbortCheck, DEFAULT_BATCH_SIZE,
};
use crate::shape::{CellArray, OutputPointsPrecision, Plane, PointCoords, PolyMesh};

/// Keep-map sentinel for a discarded point (and, reused on the cell map, for
/// a discarded cell).
const DISCARDED: u32 = u32::MAX;

/// Per-batch output size accounting for the clipper.
#[derive(Copy, Clone, Debug, Default)]
struct ClipBatchData {
    /// Output cells (kept + clipped).
    cells: usize,
    /// Output cell connectivity entries.
    conn: usize,
    /// Output boundary lines (one per clipped cell).
    lines: usize,
    /// Output line connectivity entries (always `2 * lines`).
    line_conn: usize,
}

impl BatchData for ClipBatchData {
    fn combine(self, rhs: Self) -> Self {
        Self {
            cells: self.cells + rhs.cells,
            conn: self.conn + rhs.conn,
            lines: self.lines + rhs.lines,
            line_conn: self.line_conn + rhs.line_conn,
        }
    }
}

/// Where a clip edge's eventual new point id must be written back: the
/// cell-local connectivity slot and the line connectivity slot reserved
/// during extraction.
#[derive(Copy, Clone, Debug, Default)]
struct ClipSlots {
    conn: usize,
    line: usize,
}

/// Attribute collaborators consumed by [`PlaneClipper::clip`].
pub struct ClipAttributes<'a> {
    /// Point attributes: copied for kept points, edge-interpolated for new
    /// clip points.
    pub point: &'a mut dyn AttributeInterpolator,
    /// Cell attributes: copied for kept and clipped cells.
    pub cell: &'a mut dyn AttributeInterpolator,
    /// Point attributes of the boundary output; only consumed when
    /// [`PlaneClipper::pass_cap_point_data`] is set.
    pub cap_point: Option<&'a mut dyn AttributeInterpolator>,
}

/// The result of a plane clip.
pub struct ClipOutput {
    /// The retained/clipped geometry, with polygon connectivity.
    pub mesh: PolyMesh,
    /// The cut boundary: 2-point line loops and, if capping was requested,
    /// triangulated cap polygons. `None` unless loops or capping were
    /// requested. Its points are exactly the new clip points, and its
    /// connectivity uses local ids `0..num_new_points`.
    pub boundary: Option<PolyMesh>,
}

/// Clips a convex-polygon mesh by a plane, keeping the side the plane normal
/// points into (`dot(normal, p - origin) > 0`).
///
/// Clipped cells get new points interpolated where their edges cross the
/// plane; new points are deduplicated across cells so neighbors sharing a
/// clip edge converge on one shared point. Non-convex cells are not
/// supported: a cell found crossing the plane on more than two edges is
/// clamped to its first two crossings, a documented approximation.
#[derive(Clone, Debug)]
pub struct PlaneClipper {
    /// The number of cells (or points) per parallel batch.
    pub batch_size: usize,
    /// Emit the boundary output with the clip-loop line segments.
    pub clipping_loops: bool,
    /// Close the boundary loops into triangulated cap polygons (implies the
    /// boundary output).
    pub capping: bool,
    /// Interpolate point attributes onto the boundary output. Off by default
    /// since cap triangulation synthesizes no sensible cell-interior data.
    pub pass_cap_point_data: bool,
    /// Storage precision of the output points.
    pub output_points_precision: OutputPointsPrecision,
}

impl Default for PlaneClipper {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            clipping_loops: false,
            capping: false,
            pass_cap_point_data: false,
            output_points_precision: OutputPointsPrecision::default(),
        }
    }
}

impl PlaneClipper {
    /// Runs the clip. Returns `None` if the invocation was aborted through
    /// `abort`, in which case all partial work is discarded.
    pub fn clip(
        &self,
        mesh: &PolyMesh,
        plane: &Plane,
        mut attributes: Option<ClipAttributes>,
        abort: Option<&AtomicBool>,
    ) -> Option<ClipOutput> {
        let precision = self.output_points_precision.resolve(mesh.points.precision());
        let num_points = mesh.num_points();
        let num_cells = mesh.polys.num_cells();
        let batch_size = self.batch_size.max(1);
        let check = AbortCheck::new(abort);

        let empty = |attributes: &mut Option<ClipAttributes>| {
            if let Some(attrs) = attributes.as_mut() {
                attrs.point.resize(0);
                attrs.cell.resize(0);
                if self.pass_cap_point_data {
                    if let Some(cap) = attrs.cap_point.as_mut() {
                        cap.resize(0);
                    }
                }
            }
            ClipOutput {
                mesh: PolyMesh::empty(precision),
                boundary: (self.clipping_loops || self.capping)
                    .then(|| PolyMesh::empty(precision)),
            }
        };

        if num_points == 0 || num_cells == 0 {
            log::debug!("plane clip: empty input mesh");
            return Some(empty(&mut attributes));
        }

        // Point classification: parallel evaluate, serial prefix count.
        let values = evaluate_points(&mesh.points, plane, batch_size, &check);
        if check.triggered() {
            return None;
        }

        let mut keep_map = vec![DISCARDED; num_points];
        let mut num_kept = 0usize;
        for (i, &value) in values.iter().enumerate() {
            if value > 0.0 {
                keep_map[i] = num_kept as u32;
                num_kept += 1;
            }
        }

        if num_kept == 0 {
            log::debug!("plane clip: no point above the plane");
            return Some(empty(&mut attributes));
        }
        if num_kept == num_points {
            log::debug!("plane clip: every point above the plane, structural copy");
            return Some(self.structural_copy(mesh, precision, &mut attributes));
        }

        // Cell classification and per-batch size accounting. The cell map
        // holds the kept-vertex count for now; extraction overwrites it with
        // the cell's final output index.
        let mut cell_map = vec![0u32; num_cells];
        let mut batches = Batches::<ClipBatchData>::new(num_cells, batch_size);
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
                    let kept = cell
                        .iter()
                        .filter(|&&p| keep_map[p as usize] != DISCARDED)
                        .count();
                    cell_states[k] = if kept == 0 { DISCARDED } else { kept as u32 };
                    if kept == 0 {
                        continue;
                    }
                    batch.data.cells += 1;
                    if kept == cell.len() {
                        batch.data.conn += kept;
                    } else {
                        // A convex cell crosses the plane on exactly two
                        // edges, hence exactly two new points and one line.
                        batch.data.conn += kept + 2;
                        batch.data.lines += 1;
                        batch.data.line_conn += 2;
                    }
                }
            });
        if check.triggered() {
            return None;
        }

        batches.trim(|batch| batch.data.cells == 0);
        let totals = batches.build_offsets();

        let num_out_cells = totals.cells;
        let num_lines = totals.lines;

        // Pre-sized output arrays; every batch writes to its own offset-derived
        // sub-range carved below.
        let mut cell_offsets = vec![0usize; num_out_cells + 1];
        let mut conn = vec![0u32; totals.conn];
        let mut line_offsets = vec![0usize; num_lines + 1];
        let mut line_conn = vec![0u32; totals.line_conn];
        let mut edges =
            vec![EdgeTuple::new(0, 0, ClipSlots::default()); totals.line_conn];

        line_offsets
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, offset)| *offset = 2 * i);

        let clamped = AtomicBool::new(false);
        {
            let num_batches = batches.len();
            let batch_slice = batches.as_slice();
            let next = |i: usize| {
                if i + 1 < num_batches {
                    batch_slice[i + 1].data
                } else {
                    totals
                }
            };

            let conn_slices = carve_disjoint(
                &mut conn,
                (0..num_batches).map(|i| (batch_slice[i].data.conn, next(i).conn)),
            );
            let offset_slices = carve_disjoint(
                &mut cell_offsets[..num_out_cells],
                (0..num_batches).map(|i| (batch_slice[i].data.cells, next(i).cells)),
            );
            let edge_slices = carve_disjoint(
                &mut edges,
                (0..num_batches).map(|i| (batch_slice[i].data.line_conn, next(i).line_conn)),
            );
            let state_slices = carve_disjoint(
                &mut cell_map,
                batch_slice.iter().map(|b| (b.begin, b.end)),
            );

            batch_slice
                .par_iter()
                .zip(conn_slices)
                .zip(offset_slices)
                .zip(edge_slices)
                .zip(state_slices)
                .enumerate()
                .for_each(
                    |(batch_id, ((((batch, conn_s), offsets_s), edges_s), states))| {
                        self.extract_batch(
                            mesh,
                            &keep_map,
                            batch,
                            batch_id,
                            conn_s,
                            offsets_s,
                            edges_s,
                            states,
                            &check,
                            &clamped,
                        );
                    },
                );
        }
        if check.triggered() {
            return None;
        }
        cell_offsets[num_out_cells] = totals.conn;

        // Edge merge: every unique undirected clip edge becomes one new point.
        let group_offsets = merge_edges(&mut edges);
        let num_new = group_offsets.len() - 1;

        // Output points: kept points unchanged (order preserving), then one
        // interpolated point per unique clip edge.
        let kept_points: Vec<Point> = (0..num_points)
            .into_par_iter()
            .filter(|&i| keep_map[i] != DISCARDED)
            .map(|i| mesh.points.get(i))
            .collect();
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

        // Connectivity patch: every duplicate in a group rewrites its
        // recorded slots to the group's final point id. Each slot is written
        // exactly once.
        for g in 0..num_new {
            let final_id = (num_kept + g) as u32;
            for edge in &edges[group_offsets[g]..group_offsets[g + 1]] {
                conn[edge.data.conn] = final_id;
                line_conn[edge.data.line] = g as u32;
            }
        }

        if let Some(attrs) = attributes.as_mut() {
            attrs.point.resize(num_kept + num_new);
            for (i, &id) in keep_map.iter().enumerate() {
                if id != DISCARDED {
                    attrs.point.copy(i, id as usize);
                }
            }
            for (g, &(v0, v1, t)) in edge_params.iter().enumerate() {
                attrs
                    .point
                    .interpolate_edge(v0 as usize, v1 as usize, t, num_kept + g);
            }

            attrs.cell.resize(num_out_cells);
            for (c, &id) in cell_map.iter().enumerate() {
                if id != DISCARDED {
                    attrs.cell.copy(c, id as usize);
                }
            }

            if self.pass_cap_point_data {
                if let Some(cap) = attrs.cap_point.as_mut() {
                    cap.resize(num_new);
                    for (g, &(v0, v1, t)) in edge_params.iter().enumerate() {
                        cap.interpolate_edge(v0 as usize, v1 as usize, t, g);
                    }
                }
            }
        }

        let mut out_points = kept_points;
        out_points.extend_from_slice(&new_points);

        let boundary = (self.clipping_loops || self.capping).then(|| {
            let lines = CellArray::from_raw_parts(line_offsets, line_conn);
            let polys = if self.capping {
                build_caps(&new_points, &lines, plane)
            } else {
                CellArray::new()
            };
            PolyMesh {
                points: PointCoords::from_points(&new_points, precision),
                polys,
                lines,
            }
        });

        Some(ClipOutput {
            mesh: PolyMesh {
                points: PointCoords::from_points(&out_points, precision),
                polys: CellArray::from_raw_parts(cell_offsets, conn),
                lines: CellArray::new(),
            },
            boundary,
        })
    }

    /// Walks one batch of cells and emits connectivity, cell offsets, and raw
    /// duplicate clip edges into the batch's carved output regions.
    fn extract_batch(
        &self,
        mesh: &PolyMesh,
        keep_map: &[u32],
        batch: &crate::batching::Batch<ClipBatchData>,
        batch_id: usize,
        conn_s: &mut [u32],
        offsets_s: &mut [usize],
        edges_s: &mut [EdgeTuple<ClipSlots>],
        states: &mut [u32],
        check: &AbortCheck,
        clamped: &AtomicBool,
    ) {
        let offsets = batch.data;
        let cadence = super::poll_cadence(batch.len());
        let mut local_conn = 0;
        let mut local_cell = 0;
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

            if states[k] == DISCARDED {
                continue;
            }
            let kept = states[k] as usize;

            let cell = mesh.polys.cell(c);
            let npts = cell.len();
            offsets_s[local_cell] = offsets.conn + local_conn;
            states[k] = (offsets.cells + local_cell) as u32;
            local_cell += 1;

            if kept == npts {
                for &p in cell {
                    conn_s[local_conn] = keep_map[p as usize];
                    local_conn += 1;
                }
                continue;
            }

            // Clipped cell: locate the (at most two) boundary-crossing edges
            // of the vertex ring.
            let mut crossings: ArrayVec<usize, 2> = ArrayVec::new();
            for i in 0..npts {
                let ka = keep_map[cell[i] as usize] != DISCARDED;
                let kb = keep_map[cell[(i + 1) % npts] as usize] != DISCARDED;
                if ka != kb && crossings.try_push(i).is_err() {
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

            // Emit the ring in order, reserving a placeholder slot wherever a
            // crossing edge will contribute a new point; the slot is patched
            // with the final point id after edge merging. Degenerate cells
            // may cross fewer than twice and are padded so the sized
            // `kept + 2` layout stays exact.
            let line_id = offsets.lines + local_line;
            local_line += 1;
            let mut num_cross = 0;
            for i in 0..npts {
                let a = cell[i];
                let mapped = keep_map[a as usize];
                if mapped != DISCARDED {
                    conn_s[local_conn] = mapped;
                    local_conn += 1;
                }
                if num_cross < crossings.len() && crossings[num_cross] == i {
                    let b = cell[(i + 1) % npts];
                    let slots = ClipSlots {
                        conn: offsets.conn + local_conn,
                        line: 2 * line_id + num_cross,
                    };
                    edges_s[2 * (local_line - 1) + num_cross] = EdgeTuple::new(a, b, slots);
                    conn_s[local_conn] = DISCARDED;
                    local_conn += 1;
                    num_cross += 1;
                }
            }
            while num_cross < 2 {
                let a = cell[0];
                let slots = ClipSlots {
                    conn: offsets.conn + local_conn,
                    line: 2 * line_id + num_cross,
                };
                edges_s[2 * (local_line - 1) + num_cross] = EdgeTuple::new(a, a, slots);
                conn_s[local_conn] = DISCARDED;
                local_conn += 1;
                num_cross += 1;
            }
        }
    }

    /// The all-points-kept cull path: a structural copy of the input.
    fn structural_copy(
        &self,
        mesh: &PolyMesh,
        precision: crate::shape::PointPrecision,
        attributes: &mut Option<ClipAttributes>,
    ) -> ClipOutput {
        if let Some(attrs) = attributes.as_mut() {
            let num_points = mesh.num_points();
            attrs.point.resize(num_points);
            for i in 0..num_points {
                attrs.point.copy(i, i);
            }
            let num_cells = mesh.polys.num_cells();
            attrs.cell.resize(num_cells);
            for c in 0..num_cells {
                attrs.cell.copy(c, c);
            }
            // No clip points on this path, so the boundary carries no data.
            if self.pass_cap_point_data {
                if let Some(cap) = attrs.cap_point.as_mut() {
                    cap.resize(0);
                }
            }
        }

        ClipOutput {
            mesh: PolyMesh {
                points: reencode_points(&mesh.points, precision),
                polys: mesh.polys.clone(),
                lines: CellArray::new(),
            },
            boundary: (self.clipping_loops || self.capping).then(|| PolyMesh::empty(precision)),
        }
    }
}

/// The interpolation parameter of a clip edge: `t = -v0 / (v1 - v0)` over the
/// plane values of its endpoints; degenerate edges default to `t = 0`.
pub(crate) fn intersection_parameter<T>(values: &[Real], edge: &EdgeTuple<T>) -> Real {
    let v0 = values[edge.v0 as usize];
    let v1 = values[edge.v1 as usize];
    let denom = v1 - v0;
    if denom == 0.0 {
        0.0
    } else {
        -v0 / denom
    }
}
