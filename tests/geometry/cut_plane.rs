use std::sync::atomic::AtomicBool;

use approx::assert_relative_eq;
use meshclip::attributes::{AttributeArray, LinearAttributes};
use meshclip::math::{Point, Vector};
use meshclip::query::{CutAttributes, PlaneCutter};
use meshclip::shape::Plane;

use crate::support::{cube_shell, triangle};

#[test]
fn triangle_cross_section_is_one_segment() {
    let mesh = triangle();
    let plane = Plane::new(Point::new(1.0, 0.0, 0.0), Vector::x()).unwrap();

    let out = PlaneCutter::default().cut(&mesh, &plane, None, None).unwrap();
    assert_eq!(out.mesh.lines.num_cells(), 1);
    assert_eq!(out.mesh.num_points(), 2);
    assert_eq!(out.mesh.points.get(0), Point::new(1.0, 0.0, 0.0));
    assert_eq!(out.mesh.points.get(1), Point::new(1.0, 1.0, 0.0));
    assert!(out.normals.is_none());
}

#[test]
fn cube_cross_section_is_a_closed_square() {
    let mesh = cube_shell();
    let plane = Plane::new(Point::new(0.0, 0.0, 0.5), Vector::z()).unwrap();

    let out = PlaneCutter::default().cut(&mesh, &plane, None, None).unwrap();

    // One line per straddling side quad; the 4 shared vertical edges
    // deduplicate into 4 shared endpoints.
    assert_eq!(out.mesh.lines.num_cells(), 4);
    assert_eq!(out.mesh.num_points(), 4);

    // Every point must be used by exactly two segments (a closed loop).
    let mut uses = vec![0; out.mesh.num_points()];
    for segment in out.mesh.lines.iter() {
        assert_eq!(segment.len(), 2);
        assert_ne!(segment[0], segment[1]);
        for &p in segment {
            uses[p as usize] += 1;
        }
    }
    assert_eq!(uses, vec![2; 4]);
}

#[test]
fn cut_normals_and_attributes() {
    let mesh = cube_shell();
    let plane = Plane::new(Point::new(0.0, 0.0, 0.5), Vector::z()).unwrap();

    let z_data = (0..mesh.num_points()).map(|i| mesh.points.get(i).z).collect();
    let mut point_attrs = LinearAttributes::new(vec![AttributeArray::scalar("z", z_data)]);
    let mut cell_attrs = LinearAttributes::new(vec![AttributeArray::scalar(
        "cell",
        (0..6).map(|c| c as f64).collect(),
    )]);

    let cutter = PlaneCutter {
        compute_normals: true,
        interpolate_attributes: true,
        ..PlaneCutter::default()
    };
    let out = cutter
        .cut(
            &mesh,
            &plane,
            Some(CutAttributes {
                point: &mut point_attrs,
                cell: &mut cell_attrs,
            }),
            None,
        )
        .unwrap();

    let normals = out.normals.unwrap();
    assert_eq!(normals.len(), 4);
    for n in &normals {
        assert_relative_eq!(*n, Vector::z());
    }

    // Interpolated z is exactly the plane height at every new point.
    assert_eq!(point_attrs.output()[0].data, vec![0.5; 4]);
    // Only the 4 side quads (input cells 2..6) produce lines.
    assert_eq!(cell_attrs.output()[0].data, vec![2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn asymmetric_intersection_parameter() {
    let mesh = triangle();
    // Plane x = 0.5: edge (0, 1) runs from x = 0 to x = 2, so t = 0.25.
    let plane = Plane::new(Point::new(0.5, 0.0, 0.0), Vector::x()).unwrap();
    let out = PlaneCutter::default().cut(&mesh, &plane, None, None).unwrap();
    assert_eq!(out.mesh.points.get(0), Point::new(0.5, 0.0, 0.0));
    assert_eq!(out.mesh.points.get(1), Point::new(0.5, 1.5, 0.0));
}

#[test]
fn non_convex_cell_is_clamped_to_two_crossings() {
    // A bowtie quad crossing the plane on all four edges still produces
    // exactly one 2-point segment, from the first two crossings.
    let points = meshclip::shape::PointCoords::F64(vec![
        Point::new(-1.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(-1.0, 1.0, 0.0),
        Point::new(1.0, 1.0, 0.0),
    ]);
    let polys = meshclip::shape::CellArray::from_parts(vec![0, 4], vec![0, 1, 2, 3]).unwrap();
    let mesh = meshclip::shape::PolyMesh::new(points, polys).unwrap();
    let plane = Plane::new(Point::origin(), Vector::x()).unwrap();

    let out = PlaneCutter::default().cut(&mesh, &plane, None, None).unwrap();
    assert_eq!(out.mesh.lines.num_cells(), 1);
    assert_eq!(out.mesh.lines.cell(0), &[0, 1]);
    assert_eq!(out.mesh.num_points(), 2);
    assert_eq!(out.mesh.points.get(0), Point::new(0.0, 0.0, 0.0));
    assert_eq!(out.mesh.points.get(1), Point::new(0.0, 0.5, 0.0));
}

#[test]
fn one_sided_mesh_has_empty_cross_section() {
    let mesh = triangle();
    let plane = Plane::new(Point::new(5.0, 0.0, 0.0), Vector::x()).unwrap();
    let out = PlaneCutter::default().cut(&mesh, &plane, None, None).unwrap();
    assert_eq!(out.mesh.num_points(), 0);
    assert_eq!(out.mesh.lines.num_cells(), 0);
}

#[test]
fn aborted_invocation_returns_nothing() {
    let mesh = cube_shell();
    let plane = Plane::new(Point::new(0.0, 0.0, 0.5), Vector::z()).unwrap();
    let abort = AtomicBool::new(true);
    assert!(PlaneCutter::default()
        .cut(&mesh, &plane, None, Some(&abort))
        .is_none());
}
