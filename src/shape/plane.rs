use crate::math::{Point, Real, Unit, UnitVector, Vector};

/// An oriented cutting plane defined by an origin and a unit normal.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Plane {
    origin: Point,
    normal: UnitVector,
}

impl Plane {
    /// Builds a plane from an origin and a (not necessarily unit) normal.
    ///
    /// The normal is re-normalized; returns `None` if its length is too close
    /// to zero for normalization to be meaningful.
    pub fn new(origin: Point, normal: Vector) -> Option<Self> {
        let normal = Unit::try_new(normal, 1.0e-12)?;
        Some(Self { origin, normal })
    }

    /// The plane origin.
    pub fn origin(&self) -> &Point {
        &self.origin
    }

    /// The unit plane normal.
    pub fn normal(&self) -> &UnitVector {
        &self.normal
    }

    /// The signed distance `dot(normal, p - origin)`.
    ///
    /// Strictly positive values classify `p` as above the plane; zero and
    /// negative values classify it as below, so a point lying exactly on the
    /// plane is treated as below (discarded by the clipper).
    pub fn eval(&self, p: &Point) -> Real {
        self.normal.dot(&(p - self.origin))
    }

    /// An orthonormal basis of the plane, for 2D work on the cut
    /// cross-section.
    pub fn basis(&self) -> [Vector; 2] {
        let n = &*self.normal;
        // Derive the first tangent from the axis least aligned with the
        // normal, so the cross products stay well conditioned.
        let u = if n.x.abs() > n.y.abs() {
            Vector::new(-n.z, 0.0, n.x)
        } else {
            Vector::new(0.0, n.z, -n.y)
        }
        .normalize();
        let v = n.cross(&u);
        [u, v]
    }
}
