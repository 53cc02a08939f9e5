//! Small geometric helpers.

pub use self::point_in_triangle::{
    corner_direction, is_point_in_triangle, polygon_orientation, Orientation,
};

mod point_in_triangle;
