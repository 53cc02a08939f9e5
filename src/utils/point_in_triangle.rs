//! In-plane orientation predicates used by the cap triangulator.

use crate::math::{Point2, Real};

/// The winding direction of a corner or polygon.
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub enum Orientation {
    /// Counter-clockwise
    Ccw,
    /// Clockwise
    Cw,
    /// Neither (degenerate, collinear points)
    None,
}

fn orientation_from_cross(cross: Real) -> Orientation {
    if cross > 0.0 {
        Orientation::Ccw
    } else if cross < 0.0 {
        Orientation::Cw
    } else {
        Orientation::None
    }
}

/// The turn taken at `b` when walking `a -> b -> c`.
pub fn corner_direction(a: &Point2<Real>, b: &Point2<Real>, c: &Point2<Real>) -> Orientation {
    orientation_from_cross((b - a).perp(&(c - b)))
}

/// The winding direction of a simple polygon, from its signed area.
pub fn polygon_orientation(points: &[Point2<Real>]) -> Orientation {
    let mut doubled_area = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        doubled_area += p.coords.perp(&q.coords);
    }
    orientation_from_cross(doubled_area)
}

/// Returns `Some(true)` if `p` lies inside (or on the boundary of) the
/// triangle `(a, b, c)`, and `None` when the triangle is degenerate.
pub fn is_point_in_triangle(
    p: &Point2<Real>,
    a: &Point2<Real>,
    b: &Point2<Real>,
    c: &Point2<Real>,
) -> Option<bool> {
    let turns = [
        corner_direction(a, b, p),
        corner_direction(b, c, p),
        corner_direction(c, a, p),
    ];

    if turns == [Orientation::None; 3] {
        return None;
    }

    // Inside iff the three turns never disagree (boundary turns are neutral).
    let inside = !(turns.contains(&Orientation::Ccw) && turns.contains(&Orientation::Cw));
    Some(inside)
}
