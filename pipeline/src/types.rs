//! Core data types for the pipeline.

use std::ops::{Index, Range};

/// A 3D vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Returns the components as `[x, y, z]`.
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// A generated vector tagged with the global index it belongs to.
///
/// The tag lets the collector place results by index regardless of the
/// order in which workers deliver them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedVector {
    pub index: usize,
    pub vector: Vec3,
}

/// A contiguous half-open index range `[start, start + count)` owned by one
/// worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chunk {
    pub start: usize,
    pub count: usize,
}

impl Chunk {
    /// Creates a new chunk.
    #[must_use]
    pub const fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// One past the last index of the chunk.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.count
    }

    /// The chunk as an index range.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Returns `true` if the chunk holds no indices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns `true` if `index` falls inside the chunk.
    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end()
    }
}

/// The ordered output of a pipeline run, one vector per global index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultBuffer {
    values: Vec<Vec3>,
}

impl ResultBuffer {
    /// Creates a buffer of `len` zero vectors.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self {
            values: vec![Vec3::ZERO; len],
        }
    }

    /// Creates a buffer holding a copy of `values`.
    #[must_use]
    pub fn copy_from_slice(values: &[Vec3]) -> Self {
        Self {
            values: values.to_vec(),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the buffer has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the vector at `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Vec3> {
        self.values.get(index).copied()
    }

    /// The vectors in index order.
    #[must_use]
    pub fn as_slice(&self) -> &[Vec3] {
        &self.values
    }

    /// Iterates the vectors in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Vec3> {
        self.values.iter()
    }

    /// Consumes the buffer, returning the underlying vectors.
    #[must_use]
    pub fn into_vec(self) -> Vec<Vec3> {
        self.values
    }
}

impl From<Vec<Vec3>> for ResultBuffer {
    fn from(values: Vec<Vec3>) -> Self {
        Self { values }
    }
}

impl Index<usize> for ResultBuffer {
    type Output = Vec3;

    fn index(&self, index: usize) -> &Vec3 {
        &self.values[index]
    }
}

impl<'a> IntoIterator for &'a ResultBuffer {
    type Item = &'a Vec3;
    type IntoIter = std::slice::Iter<'a, Vec3>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_array_conversion() {
        let v = Vec3::from([1.0, -2.0, 3.5]);
        assert_eq!(v, Vec3::new(1.0, -2.0, 3.5));
        assert_eq!(v.to_array(), [1.0, -2.0, 3.5]);
        assert_eq!(Vec3::default(), Vec3::ZERO);
    }

    #[test]
    fn chunk_bounds() {
        let chunk = Chunk::new(10, 5);
        assert_eq!(chunk.end(), 15);
        assert_eq!(chunk.range(), 10..15);
        assert!(chunk.contains(10));
        assert!(chunk.contains(14));
        assert!(!chunk.contains(15));
        assert!(!chunk.contains(9));
        assert!(!chunk.is_empty());
        assert!(Chunk::new(3, 0).is_empty());
    }

    #[test]
    fn result_buffer_zeroed() {
        let buffer = ResultBuffer::zeroed(3);
        assert_eq!(buffer.len(), 3);
        assert!(buffer.iter().all(|v| *v == Vec3::ZERO));
        assert_eq!(buffer.get(3), None);
        assert!(ResultBuffer::default().is_empty());
    }

    #[test]
    fn result_buffer_copies_slice() {
        let values = [Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)];
        let buffer = ResultBuffer::copy_from_slice(&values);
        assert_eq!(buffer.as_slice(), &values);
        assert_eq!(buffer[1], values[1]);
        assert_eq!(buffer.into_vec(), values.to_vec());
    }
}
