/*!
meshclip
========

**meshclip** is a parallel, batched plane clipping/cutting engine for meshes
made of convex polygon cells, written with the rust programming language.

Two queries are provided over the same flat offsets+connectivity mesh
representation:

- [`query::PlaneClipper`] keeps the part of the mesh lying strictly above a
  plane, interpolating new points where cell edges cross it, and can close the
  cut boundary into triangulated cap polygons.
- [`query::PlaneCutter`] extracts the cross-section itself as a set of 2-point
  line segments, one per intersected cell.

Both are built from two reusable pieces: an index-range batch partitioner with
associative per-batch payloads ([`batching`]) and a sort-based deduplicator
for undirected edges ([`locator`]).
*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]

#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;

pub extern crate nalgebra as na;

pub mod attributes;
pub mod batching;
pub mod locator;
pub mod query;
pub mod shape;
pub mod utils;

/// Aliases for the mathematical types used throughout this crate.
pub mod math {
    pub use na::{Point2, Point3, Unit, Vector2, Vector3};

    /// The scalar type used for all interior arithmetic.
    ///
    /// Narrower point storage only exists at the mesh boundary (see
    /// [`crate::shape::PointCoords`]); every computation runs in double
    /// precision.
    pub type Real = f64;

    /// The point type.
    pub type Point = Point3<Real>;

    /// The vector type.
    pub type Vector = Vector3<Real>;

    /// The unit vector type.
    pub type UnitVector = Unit<Vector3<Real>>;
}
