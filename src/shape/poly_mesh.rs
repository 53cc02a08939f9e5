use crate::math::{Point, Point3};

/// Storage precision of a point coordinate buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum PointPrecision {
    /// 32-bit floating point storage.
    Single,
    /// 64-bit floating point storage.
    Double,
}

/// Requested storage precision for the output points of a query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum OutputPointsPrecision {
    /// Use the same precision as the input point buffer.
    #[default]
    MatchInput,
    /// Force 32-bit storage.
    Single,
    /// Force 64-bit storage.
    Double,
}

impl OutputPointsPrecision {
    /// Resolves the requested precision against the input buffer's precision.
    pub fn resolve(self, input: PointPrecision) -> PointPrecision {
        match self {
            OutputPointsPrecision::MatchInput => input,
            OutputPointsPrecision::Single => PointPrecision::Single,
            OutputPointsPrecision::Double => PointPrecision::Double,
        }
    }
}

/// A dense array of 3D point coordinates in one of the two standard
/// floating-point widths.
///
/// All interior arithmetic runs in [`crate::math::Real`]; this enum only
/// decides how coordinates are stored at the mesh boundary.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum PointCoords {
    /// 32-bit coordinates.
    F32(Vec<Point3<f32>>),
    /// 64-bit coordinates.
    F64(Vec<Point3<f64>>),
}

impl PointCoords {
    /// An empty buffer with the given storage precision.
    pub fn with_precision(precision: PointPrecision) -> Self {
        match precision {
            PointPrecision::Single => PointCoords::F32(Vec::new()),
            PointPrecision::Double => PointCoords::F64(Vec::new()),
        }
    }

    /// Encodes computed points into a buffer with the given precision.
    pub fn from_points(points: &[Point], precision: PointPrecision) -> Self {
        match precision {
            PointPrecision::Single => {
                PointCoords::F32(points.iter().map(|p| p.cast::<f32>()).collect())
            }
            PointPrecision::Double => PointCoords::F64(points.to_vec()),
        }
    }

    /// The storage precision of this buffer.
    pub fn precision(&self) -> PointPrecision {
        match self {
            PointCoords::F32(_) => PointPrecision::Single,
            PointCoords::F64(_) => PointPrecision::Double,
        }
    }

    /// The number of points.
    pub fn len(&self) -> usize {
        match self {
            PointCoords::F32(pts) => pts.len(),
            PointCoords::F64(pts) => pts.len(),
        }
    }

    /// Whether the buffer holds no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The i-th point, widened to the interior scalar type.
    pub fn get(&self, i: usize) -> Point {
        match self {
            PointCoords::F32(pts) => pts[i].cast::<f64>(),
            PointCoords::F64(pts) => pts[i],
        }
    }

    /// Appends a point, narrowing it if this is a 32-bit buffer.
    pub fn push(&mut self, p: Point) {
        match self {
            PointCoords::F32(pts) => pts.push(p.cast::<f32>()),
            PointCoords::F64(pts) => pts.push(p),
        }
    }
}

impl From<Vec<Point3<f32>>> for PointCoords {
    fn from(pts: Vec<Point3<f32>>) -> Self {
        PointCoords::F32(pts)
    }
}

impl From<Vec<Point3<f64>>> for PointCoords {
    fn from(pts: Vec<Point3<f64>>) -> Self {
        PointCoords::F64(pts)
    }
}

/// An inconsistency found while building a mesh from raw buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// The offsets array was empty; it must hold at least the leading zero.
    #[error("the offsets array must hold at least one entry")]
    EmptyOffsets,
    /// The offsets array did not start at zero.
    #[error("the offsets array must start at 0 (found {0})")]
    BadLeadingOffset(usize),
    /// The offsets array decreased at the given entry.
    #[error("the offsets array decreases at entry {0}")]
    NonMonotonicOffsets(usize),
    /// The last offset did not match the connectivity length.
    #[error("the last offset ({last}) does not match the connectivity length ({len})")]
    OffsetsConnectivityMismatch {
        /// The last entry of the offsets array.
        last: usize,
        /// The length of the connectivity array.
        len: usize,
    },
    /// A cell referenced a point id outside the point buffer.
    #[error("cell {cell} references point {point} but the mesh only has {num_points} points")]
    PointOutOfBounds {
        /// The offending cell.
        cell: usize,
        /// The out-of-bounds point id.
        point: u32,
        /// The number of points in the mesh.
        num_points: usize,
    },
}

/// Cells stored as an offsets array (`num_cells + 1` monotone entries) plus a
/// flat connectivity array of point ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CellArray {
    offsets: Vec<usize>,
    connectivity: Vec<u32>,
}

impl CellArray {
    /// An empty cell array.
    pub fn new() -> Self {
        Self {
            offsets: vec![0],
            connectivity: Vec::new(),
        }
    }

    /// Builds a cell array from raw buffers, validating the offsets
    /// invariants.
    pub fn from_parts(offsets: Vec<usize>, connectivity: Vec<u32>) -> Result<Self, MeshError> {
        let Some(&first) = offsets.first() else {
            return Err(MeshError::EmptyOffsets);
        };
        if first != 0 {
            return Err(MeshError::BadLeadingOffset(first));
        }
        for i in 1..offsets.len() {
            if offsets[i] < offsets[i - 1] {
                return Err(MeshError::NonMonotonicOffsets(i));
            }
        }
        let last = offsets[offsets.len() - 1];
        if last != connectivity.len() {
            return Err(MeshError::OffsetsConnectivityMismatch {
                last,
                len: connectivity.len(),
            });
        }
        Ok(Self {
            offsets,
            connectivity,
        })
    }

    /// Builds a cell array from buffers whose invariants hold by
    /// construction (pre-sized pipeline outputs).
    pub(crate) fn from_raw_parts(offsets: Vec<usize>, connectivity: Vec<u32>) -> Self {
        debug_assert!(offsets.first() == Some(&0));
        debug_assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
        debug_assert_eq!(*offsets.last().unwrap(), connectivity.len());
        Self {
            offsets,
            connectivity,
        }
    }

    /// The number of cells.
    pub fn num_cells(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Whether the array holds no cells.
    pub fn is_empty(&self) -> bool {
        self.num_cells() == 0
    }

    /// The point ids of the i-th cell.
    pub fn cell(&self, i: usize) -> &[u32] {
        &self.connectivity[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Iterates over the cells, in order.
    pub fn iter(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.offsets
            .windows(2)
            .map(move |w| &self.connectivity[w[0]..w[1]])
    }

    /// Appends a cell.
    pub fn push_cell(&mut self, points: &[u32]) {
        self.connectivity.extend_from_slice(points);
        self.offsets.push(self.connectivity.len());
    }

    /// The offsets array.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// The flat connectivity array.
    pub fn connectivity(&self) -> &[u32] {
        &self.connectivity
    }
}

/// A mesh of convex polygon cells and 2-point line cells over a shared point
/// buffer, stored as flat offset+connectivity arrays.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PolyMesh {
    /// The point coordinates.
    pub points: PointCoords,
    /// The polygon cells.
    pub polys: CellArray,
    /// The line cells.
    pub lines: CellArray,
}

impl PolyMesh {
    /// Builds a polygon mesh, validating that every cell references an
    /// existing point.
    pub fn new(points: PointCoords, polys: CellArray) -> Result<Self, MeshError> {
        let num_points = points.len();
        for (cell, pts) in polys.iter().enumerate() {
            for &p in pts {
                if p as usize >= num_points {
                    return Err(MeshError::PointOutOfBounds {
                        cell,
                        point: p,
                        num_points,
                    });
                }
            }
        }
        Ok(Self {
            points,
            polys,
            lines: CellArray::new(),
        })
    }

    /// An empty mesh with the given point storage precision.
    pub fn empty(precision: PointPrecision) -> Self {
        Self {
            points: PointCoords::with_precision(precision),
            polys: CellArray::new(),
            lines: CellArray::new(),
        }
    }

    /// The number of points.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }
}
