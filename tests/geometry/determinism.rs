use meshclip::math::{Point, Real, Vector};
use meshclip::query::{PlaneClipper, PlaneCutter};
use meshclip::shape::{CellArray, Plane, PointCoords, PolyMesh};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A jittered n x n grid of quads, so batches straddle cells of every
/// classification (kept, discarded, clipped).
fn bumpy_grid(n: usize, seed: u64) -> PolyMesh {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            points.push(Point::new(
                i as Real,
                j as Real,
                rng.gen_range(-0.4..0.4),
            ));
        }
    }

    let mut polys = CellArray::new();
    for j in 0..n {
        for i in 0..n {
            let p = (j * (n + 1) + i) as u32;
            let stride = (n + 1) as u32;
            polys.push_cell(&[p, p + 1, p + 1 + stride, p + stride]);
        }
    }
    PolyMesh::new(PointCoords::F64(points), polys).unwrap()
}

fn tilted_plane() -> Plane {
    Plane::new(Point::new(8.0, 8.0, 0.0), Vector::new(1.0, 0.3, 0.2)).unwrap()
}

#[test]
fn clip_output_is_independent_of_batch_size() {
    let mesh = bumpy_grid(16, 42);
    let plane = tilted_plane();

    let reference = PlaneClipper {
        batch_size: 10_000,
        clipping_loops: true,
        capping: true,
        ..PlaneClipper::default()
    }
    .clip(&mesh, &plane, None, None)
    .unwrap();
    assert!(reference.mesh.polys.num_cells() > 0);

    for batch_size in [1, 7, 64] {
        let out = PlaneClipper {
            batch_size,
            clipping_loops: true,
            capping: true,
            ..PlaneClipper::default()
        }
        .clip(&mesh, &plane, None, None)
        .unwrap();
        assert_eq!(out.mesh, reference.mesh);
        assert_eq!(out.boundary, reference.boundary);
    }
}

#[test]
fn cut_output_is_independent_of_batch_size() {
    let mesh = bumpy_grid(16, 7);
    let plane = tilted_plane();

    let reference = PlaneCutter {
        batch_size: 10_000,
        ..PlaneCutter::default()
    }
    .cut(&mesh, &plane, None, None)
    .unwrap();
    assert!(reference.mesh.lines.num_cells() > 0);

    for batch_size in [1, 7, 64] {
        let out = PlaneCutter {
            batch_size,
            ..PlaneCutter::default()
        }
        .cut(&mesh, &plane, None, None)
        .unwrap();
        assert_eq!(out.mesh, reference.mesh);
    }
}
