//! Closing the cut boundary of a clipped mesh into triangulated cap
//! polygons.
//!
//! The clipper emits one 2-point line segment per clipped cell; on a closed,
//! manifold cut these segments chain into loops lying in the cutting plane.
//! Each traced loop that closes is triangulated independently by ear
//! clipping; loops hitting a dead end (open or non-manifold boundaries)
//! silently contribute no triangles.

use smallvec::SmallVec;

use crate::math::{Point, Point2, Real};
use crate::shape::{CellArray, Plane};
use crate::utils::{is_point_in_triangle, polygon_orientation, Orientation};

/// Builds the cap polygons for the given boundary line segments. `points`
/// are the new clip points the line connectivity refers to.
pub(crate) fn build_caps(points: &[Point], lines: &CellArray, plane: &Plane) -> CellArray {
    let num_lines = lines.num_cells();
    let mut caps = CellArray::new();
    if num_lines == 0 {
        return caps;
    }

    // Static point -> incident-lines links.
    let mut link_offsets = vec![0usize; points.len() + 1];
    for segment in lines.iter() {
        for &p in segment {
            link_offsets[p as usize + 1] += 1;
        }
    }
    for i in 1..link_offsets.len() {
        link_offsets[i] += link_offsets[i - 1];
    }
    let mut links = vec![0u32; 2 * num_lines];
    let mut cursors = link_offsets.clone();
    for (l, segment) in lines.iter().enumerate() {
        for &p in segment {
            links[cursors[p as usize]] = l as u32;
            cursors[p as usize] += 1;
        }
    }

    // Project once onto the plane basis; loops live in the cutting plane.
    let [u, v] = plane.basis();
    let flat: Vec<Point2<Real>> = points
        .iter()
        .map(|p| {
            let d = p - plane.origin();
            Point2::new(d.dot(&u), d.dot(&v))
        })
        .collect();

    let mut visited = vec![false; num_lines];
    for l in 0..num_lines {
        if visited[l] {
            continue;
        }
        if let Some(loop_points) = trace_loop(l, lines, &link_offsets, &links, &mut visited) {
            if loop_points.len() >= 3 {
                triangulate_loop(&loop_points, &flat, &mut caps);
            }
        }
    }
    caps
}

/// Walks the point/line adjacency starting from `start_line` until the walk
/// returns to its starting point (closed loop) or runs out of unvisited
/// incident lines (dead end). Returns the loop's point ids, without
/// repeating the starting point, or `None` on a dead end.
fn trace_loop(
    start_line: usize,
    lines: &CellArray,
    link_offsets: &[usize],
    links: &[u32],
    visited: &mut [bool],
) -> Option<SmallVec<[u32; 16]>> {
    let segment = lines.cell(start_line);
    let start = segment[0];
    let mut current = segment[1];
    visited[start_line] = true;

    let mut loop_points: SmallVec<[u32; 16]> = SmallVec::new();
    loop_points.push(start);

    loop {
        if current == start {
            return Some(loop_points);
        }
        loop_points.push(current);

        let incident = &links[link_offsets[current as usize]..link_offsets[current as usize + 1]];
        let next = incident
            .iter()
            .copied()
            .find(|&l| !visited[l as usize])?;
        visited[next as usize] = true;

        let segment = lines.cell(next as usize);
        current = if segment[0] == current {
            segment[1]
        } else {
            segment[0]
        };
    }
}

/// Ear-clips one closed loop and appends its triangles to `caps`.
///
/// Ear clipping expects counter-clockwise winding; the traced loop has
/// whatever winding the traversal found, so it is reversed first when
/// needed. Degenerate loops that defeat the triangulator are dropped,
/// consistent with the open-boundary policy.
fn triangulate_loop(loop_points: &[u32], flat: &[Point2<Real>], caps: &mut CellArray) {
    let mut ids: SmallVec<[u32; 16]> = SmallVec::from_slice(loop_points);
    let mut polygon: Vec<Point2<Real>> =
        ids.iter().map(|&p| flat[p as usize]).collect();

    if polygon_orientation(&polygon) == Orientation::Cw {
        ids.reverse();
        polygon.reverse();
    }

    if let Some(triangles) = ear_clip(&polygon) {
        for [a, b, c] in triangles {
            caps.push_cell(&[ids[a as usize], ids[b as usize], ids[c as usize]]);
        }
    }
}

/// Per-vertex state of the ear-clipping triangulator.
#[derive(Clone, Default)]
struct EarVertex {
    /// Not yet clipped.
    active: bool,
    /// Currently an ear tip.
    is_ear: bool,
    /// `cos` of the corner angle; pointier ears are clipped first.
    pointiness: Real,
    prev: usize,
    next: usize,
}

fn update_ear_vertex(idx: usize, info: &mut EarVertex, polygon: &[Point2<Real>]) -> bool {
    let p = polygon[idx];
    let prev = polygon[info.prev];
    let next = polygon[info.next];

    let to_prev = (prev - p).normalize();
    let to_next = (next - p).normalize();
    info.pointiness = to_prev.dot(&to_next);
    if info.pointiness.is_nan() {
        return false;
    }

    // An ear tip is a convex corner whose triangle contains no other loop
    // vertex.
    let mut degenerate = false;
    info.is_ear = to_prev.perp(&to_next) < 0.0
        && (0..polygon.len())
            .filter(|&i| i != info.prev && i != idx && i != info.next)
            .all(|i| {
                match is_point_in_triangle(&polygon[i], &prev, &p, &next) {
                    Some(inside) => !inside,
                    None => {
                        degenerate = true;
                        true
                    }
                }
            });
    !degenerate
}

/// Ear-clipping triangulation of a simple counter-clockwise polygon.
/// Returns exactly `n - 2` triangles of vertex indices, or `None` when the
/// polygon is degenerate or wound the wrong way.
fn ear_clip(polygon: &[Point2<Real>]) -> Option<Vec<[u32; 3]>> {
    let n = polygon.len();
    let mut vertices = vec![EarVertex::default(); n];

    let initialized = vertices.iter_mut().enumerate().all(|(i, info)| {
        info.active = true;
        info.prev = (i + n - 1) % n;
        info.next = (i + 1) % n;
        update_ear_vertex(i, info, polygon)
    });
    if !initialized {
        return None;
    }

    let mut triangles = Vec::with_capacity(n - 2);

    for step in 0..n.saturating_sub(3) {
        // Clip the pointiest active ear.
        let (ear, _) = vertices
            .iter()
            .enumerate()
            .filter(|(_, info)| info.active && info.is_ear)
            .max_by(|(_, a), (_, b)| {
                // NaN pointiness was rejected in update_ear_vertex.
                a.pointiness.partial_cmp(&b.pointiness).unwrap()
            })?;

        vertices[ear].active = false;
        let (prev, next) = (vertices[ear].prev, vertices[ear].next);
        triangles.push([prev as u32, ear as u32, next as u32]);

        vertices[prev].next = next;
        vertices[next].prev = prev;

        // The last three remaining vertices are necessarily an ear.
        if step == n - 4 {
            break;
        }

        if !update_ear_vertex(prev, &mut vertices[prev], polygon)
            || !update_ear_vertex(next, &mut vertices[next], polygon)
        {
            return None;
        }
    }

    let (last, info) = vertices
        .iter()
        .enumerate()
        .find(|(_, info)| info.active)?;
    triangles.push([info.prev as u32, last as u32, info.next as u32]);

    Some(triangles)
}
