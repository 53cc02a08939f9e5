//! The mesh data model: flat offsets+connectivity polygon meshes and the
//! cutting plane.

pub use self::plane::Plane;
pub use self::poly_mesh::{
    CellArray, MeshError, OutputPointsPrecision, PointCoords, PointPrecision, PolyMesh,
};

mod plane;
mod poly_mesh;
