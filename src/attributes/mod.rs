//! Attribute copying and edge interpolation.
//!
//! The queries treat attribute handling as a capability: any collaborator
//! able to copy a source tuple to a destination slot and to write a linear
//! blend of two source tuples is substitutable. [`LinearAttributes`] is the
//! concrete implementation shipped with this crate, operating on named `f64`
//! component arrays.

use crate::math::Real;

/// Capability interface consumed by the clip/cut queries to carry attribute
/// data from the input mesh onto the output mesh.
///
/// Destination slots are indices into the output side; the queries call
/// [`resize`](AttributeInterpolator::resize) with the final output tuple
/// count before any copy or interpolation.
pub trait AttributeInterpolator {
    /// Presizes the destination side to `len` tuples.
    fn resize(&mut self, len: usize);

    /// Copies source tuple `src` to destination tuple `dst` unchanged.
    fn copy(&mut self, src: usize, dst: usize);

    /// Writes `source[v0] + (source[v1] - source[v0]) * t` to destination
    /// tuple `dst`.
    fn interpolate_edge(&mut self, v0: usize, v1: usize, t: Real, dst: usize);
}

/// A named array of fixed-width `f64` tuples.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeArray {
    /// The attribute name.
    pub name: String,
    /// The number of components per tuple. Must be non-zero.
    pub components: usize,
    /// The flat component data, `components` entries per tuple.
    pub data: Vec<Real>,
}

impl AttributeArray {
    /// Builds a named attribute array.
    pub fn new(name: impl Into<String>, components: usize, data: Vec<Real>) -> Self {
        Self {
            name: name.into(),
            components,
            data,
        }
    }

    /// A single-component (scalar) attribute array.
    pub fn scalar(name: impl Into<String>, data: Vec<Real>) -> Self {
        Self::new(name, 1, data)
    }

    /// The number of tuples.
    pub fn len(&self) -> usize {
        self.data.len() / self.components
    }

    /// Whether the array holds no tuples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Linear interpolation from a set of source attribute arrays into a mirrored
/// set of output arrays.
#[derive(Clone, Debug, Default)]
pub struct LinearAttributes {
    source: Vec<AttributeArray>,
    output: Vec<AttributeArray>,
}

impl LinearAttributes {
    /// Builds the interpolator; the output side mirrors the source names and
    /// component counts, initially empty.
    pub fn new(source: Vec<AttributeArray>) -> Self {
        let output = source
            .iter()
            .map(|a| AttributeArray::new(a.name.clone(), a.components, Vec::new()))
            .collect();
        Self { source, output }
    }

    /// The output arrays produced so far.
    pub fn output(&self) -> &[AttributeArray] {
        &self.output
    }

    /// Consumes the interpolator and returns the output arrays.
    pub fn into_output(self) -> Vec<AttributeArray> {
        self.output
    }
}

impl AttributeInterpolator for LinearAttributes {
    fn resize(&mut self, len: usize) {
        for array in &mut self.output {
            array.data.resize(len * array.components, 0.0);
        }
    }

    fn copy(&mut self, src: usize, dst: usize) {
        for (source, output) in self.source.iter().zip(self.output.iter_mut()) {
            let nc = source.components;
            output.data[dst * nc..(dst + 1) * nc]
                .copy_from_slice(&source.data[src * nc..(src + 1) * nc]);
        }
    }

    fn interpolate_edge(&mut self, v0: usize, v1: usize, t: Real, dst: usize) {
        for (source, output) in self.source.iter().zip(self.output.iter_mut()) {
            let nc = source.components;
            for c in 0..nc {
                let a = source.data[v0 * nc + c];
                let b = source.data[v1 * nc + c];
                output.data[dst * nc + c] = a + (b - a) * t;
            }
        }
    }
}
