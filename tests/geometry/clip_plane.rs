use std::sync::atomic::AtomicBool;

use approx::assert_relative_eq;
use meshclip::attributes::{AttributeArray, LinearAttributes};
use meshclip::math::{Point, Vector};
use meshclip::query::{ClipAttributes, PlaneClipper};
use meshclip::shape::{OutputPointsPrecision, Plane, PointCoords};

use crate::support::{cube_shell, triangle};

#[test]
fn single_clipped_triangle() {
    let mesh = triangle();
    let plane = Plane::new(Point::new(1.0, 0.0, 0.0), Vector::x()).unwrap();
    let clipper = PlaneClipper {
        clipping_loops: true,
        ..PlaneClipper::default()
    };

    let out = clipper.clip(&mesh, &plane, None, None).unwrap();

    // One clipped cell: 1 retained vertex plus 2 new clip points.
    assert_eq!(out.mesh.polys.num_cells(), 1);
    assert_eq!(out.mesh.polys.cell(0), &[1, 0, 2]);
    assert_eq!(out.mesh.num_points(), 3);
    assert_eq!(out.mesh.points.get(0), Point::new(2.0, 0.0, 0.0));
    assert_eq!(out.mesh.points.get(1), Point::new(1.0, 0.0, 0.0));
    assert_eq!(out.mesh.points.get(2), Point::new(1.0, 1.0, 0.0));

    // Exactly one 2-point line whose endpoints are the 2 new points.
    let boundary = out.boundary.unwrap();
    assert_eq!(boundary.lines.num_cells(), 1);
    assert_eq!(boundary.lines.cell(0), &[0, 1]);
    assert_eq!(boundary.num_points(), 2);
    assert_eq!(boundary.points.get(0), Point::new(1.0, 0.0, 0.0));
    assert_eq!(boundary.points.get(1), Point::new(1.0, 1.0, 0.0));
}

#[test]
fn triangle_attributes_are_interpolated() {
    let mesh = triangle();
    let plane = Plane::new(Point::new(1.0, 0.0, 0.0), Vector::x()).unwrap();

    let mut point_attrs =
        LinearAttributes::new(vec![AttributeArray::scalar("s", vec![0.0, 10.0, 20.0])]);
    let mut cell_attrs = LinearAttributes::new(vec![AttributeArray::scalar("id", vec![7.0])]);

    let _ = PlaneClipper::default()
        .clip(
            &mesh,
            &plane,
            Some(ClipAttributes {
                point: &mut point_attrs,
                cell: &mut cell_attrs,
                cap_point: None,
            }),
            None,
        )
        .unwrap();

    // Kept point first, then the two interpolated clip points.
    assert_eq!(point_attrs.output()[0].data, vec![10.0, 5.0, 15.0]);
    assert_eq!(cell_attrs.output()[0].data, vec![7.0]);
}

#[test]
fn mesh_fully_below_is_discarded() {
    let mesh = triangle();
    let plane = Plane::new(Point::new(5.0, 0.0, 0.0), Vector::x()).unwrap();
    let out = PlaneClipper::default().clip(&mesh, &plane, None, None).unwrap();
    assert_eq!(out.mesh.num_points(), 0);
    assert_eq!(out.mesh.polys.num_cells(), 0);
    assert!(out.boundary.is_none());
}

#[test]
fn mesh_fully_above_is_copied() {
    let mesh = triangle();
    let plane = Plane::new(Point::new(-5.0, 0.0, 0.0), Vector::x()).unwrap();
    let out = PlaneClipper::default().clip(&mesh, &plane, None, None).unwrap();
    assert_eq!(out.mesh.points, mesh.points);
    assert_eq!(out.mesh.polys, mesh.polys);
    assert!(out.boundary.is_none());
}

#[test]
fn capped_cube_cross_section() {
    let mesh = cube_shell();
    let plane = Plane::new(Point::new(0.0, 0.0, 0.5), Vector::z()).unwrap();
    let clipper = PlaneClipper {
        capping: true,
        ..PlaneClipper::default()
    };

    let out = clipper.clip(&mesh, &plane, None, None).unwrap();

    // Top face kept whole, 4 side quads clipped; 4 shared vertical edges
    // deduplicate to 4 new points.
    assert_eq!(out.mesh.polys.num_cells(), 5);
    assert_eq!(out.mesh.num_points(), 8);

    let boundary = out.boundary.unwrap();
    assert_eq!(boundary.num_points(), 4);
    assert_eq!(boundary.lines.num_cells(), 4);
    for p in 0..4 {
        assert_relative_eq!(boundary.points.get(p).z, 0.5);
    }

    // A closed 4-sided loop caps with exactly N - 2 = 2 triangles covering
    // the unit-square cross-section.
    assert_eq!(boundary.polys.num_cells(), 2);
    let mut area = 0.0;
    for tri in boundary.polys.iter() {
        let a = boundary.points.get(tri[0] as usize);
        let b = boundary.points.get(tri[1] as usize);
        let c = boundary.points.get(tri[2] as usize);
        area += (b - a).cross(&(c - a)).norm() / 2.0;
    }
    assert_relative_eq!(area, 1.0, epsilon = 1.0e-12);
}

#[test]
fn cap_point_data_is_opt_in() {
    let mesh = cube_shell();
    let plane = Plane::new(Point::new(0.0, 0.0, 0.5), Vector::z()).unwrap();

    // Point scalar equal to z, so every cap point must interpolate to 0.5.
    let z_scalar = |mesh: &meshclip::shape::PolyMesh| {
        let data = (0..mesh.num_points()).map(|i| mesh.points.get(i).z).collect();
        LinearAttributes::new(vec![AttributeArray::scalar("z", data)])
    };

    let mut point_attrs = z_scalar(&mesh);
    let mut cell_attrs = LinearAttributes::new(vec![AttributeArray::scalar(
        "cell",
        (0..6).map(|c| c as f64).collect(),
    )]);
    let mut cap_attrs = z_scalar(&mesh);

    let clipper = PlaneClipper {
        capping: true,
        pass_cap_point_data: true,
        ..PlaneClipper::default()
    };
    let _ = clipper
        .clip(
            &mesh,
            &plane,
            Some(ClipAttributes {
                point: &mut point_attrs,
                cell: &mut cell_attrs,
                cap_point: Some(&mut cap_attrs),
            }),
            None,
        )
        .unwrap();

    assert_eq!(cap_attrs.output()[0].data, vec![0.5; 4]);
    // Cell data follows the output cell order: the kept top face first.
    assert_eq!(cell_attrs.output()[0].data, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn non_convex_cell_is_clamped_to_two_crossings() {
    // A bowtie quad whose vertex ring alternates sides, crossing the plane
    // on all four edges. The clip keeps the first two crossings and still
    // produces well-formed output.
    let points = meshclip::shape::PointCoords::F64(vec![
        Point::new(-1.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(-1.0, 1.0, 0.0),
        Point::new(1.0, 1.0, 0.0),
    ]);
    let polys = meshclip::shape::CellArray::from_parts(vec![0, 4], vec![0, 1, 2, 3]).unwrap();
    let mesh = meshclip::shape::PolyMesh::new(points, polys).unwrap();
    let plane = Plane::new(Point::origin(), Vector::x()).unwrap();
    let clipper = PlaneClipper {
        clipping_loops: true,
        ..PlaneClipper::default()
    };

    let out = clipper.clip(&mesh, &plane, None, None).unwrap();

    // 2 kept vertices plus exactly 2 new points, despite the 4 crossings.
    assert_eq!(out.mesh.polys.num_cells(), 1);
    assert_eq!(out.mesh.polys.cell(0), &[2, 0, 3, 1]);
    assert_eq!(out.mesh.num_points(), 4);
    assert_eq!(out.mesh.points.get(2), Point::new(0.0, 0.0, 0.0));
    assert_eq!(out.mesh.points.get(3), Point::new(0.0, 0.5, 0.0));

    let boundary = out.boundary.unwrap();
    assert_eq!(boundary.lines.num_cells(), 1);
    assert_eq!(boundary.lines.cell(0), &[0, 1]);
}

#[test]
fn cull_paths_clear_cap_point_data() {
    let mesh = cube_shell();
    let z_scalar = |mesh: &meshclip::shape::PolyMesh| {
        let data = (0..mesh.num_points()).map(|i| mesh.points.get(i).z).collect();
        LinearAttributes::new(vec![AttributeArray::scalar("z", data)])
    };
    let mut point_attrs = z_scalar(&mesh);
    let mut cell_attrs = LinearAttributes::new(vec![AttributeArray::scalar(
        "cell",
        (0..6).map(|c| c as f64).collect(),
    )]);
    let mut cap_attrs = z_scalar(&mesh);
    let clipper = PlaneClipper {
        capping: true,
        pass_cap_point_data: true,
        ..PlaneClipper::default()
    };

    // Fill the cap output with a real cross-section first.
    let _ = clipper
        .clip(
            &mesh,
            &Plane::new(Point::new(0.0, 0.0, 0.5), Vector::z()).unwrap(),
            Some(ClipAttributes {
                point: &mut point_attrs,
                cell: &mut cell_attrs,
                cap_point: Some(&mut cap_attrs),
            }),
            None,
        )
        .unwrap();
    assert_eq!(cap_attrs.output()[0].data.len(), 4);

    // Both cull paths must leave no stale cap tuples behind.
    for origin_z in [5.0, -5.0] {
        let _ = clipper
            .clip(
                &mesh,
                &Plane::new(Point::new(0.0, 0.0, origin_z), Vector::z()).unwrap(),
                Some(ClipAttributes {
                    point: &mut point_attrs,
                    cell: &mut cell_attrs,
                    cap_point: Some(&mut cap_attrs),
                }),
                None,
            )
            .unwrap();
        assert!(cap_attrs.output()[0].data.is_empty());
    }
}

#[test]
fn forced_single_precision_output() {
    let mesh = cube_shell();
    let plane = Plane::new(Point::new(0.0, 0.0, 0.5), Vector::z()).unwrap();
    let clipper = PlaneClipper {
        output_points_precision: OutputPointsPrecision::Single,
        ..PlaneClipper::default()
    };

    let out = clipper.clip(&mesh, &plane, None, None).unwrap();
    assert!(matches!(out.mesh.points, PointCoords::F32(_)));
    assert_eq!(out.mesh.num_points(), 8);
}

#[test]
fn aborted_invocation_returns_nothing() {
    let mesh = cube_shell();
    let plane = Plane::new(Point::new(0.0, 0.0, 0.5), Vector::z()).unwrap();
    let abort = AtomicBool::new(true);
    assert!(PlaneClipper::default()
        .clip(&mesh, &plane, None, Some(&abort))
        .is_none());
}
