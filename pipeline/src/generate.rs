//! Deterministic per-index vector generation.

use crate::error::SourceError;
use crate::types::Vec3;

/// Every generated component lies in `[-COMPONENT_RANGE, COMPONENT_RANGE]`.
pub const COMPONENT_RANGE: f32 = 11.0;

/// Produces the vector for a global index.
///
/// Implementations are shared by all workers and must be safe to call
/// concurrently.
pub trait VectorSource: Send + Sync {
    /// Returns the vector for `index`.
    fn vector_at(&self, index: usize) -> Result<Vec3, SourceError>;
}

/// The default source: [`vector_at`] seeded by the index alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededSource;

impl VectorSource for SeededSource {
    fn vector_at(&self, index: usize) -> Result<Vec3, SourceError> {
        Ok(vector_at(index))
    }
}

impl<F> VectorSource for F
where
    F: Fn(usize) -> Result<Vec3, SourceError> + Send + Sync,
{
    fn vector_at(&self, index: usize) -> Result<Vec3, SourceError> {
        self(index)
    }
}

/// Returns the vector for `index`.
///
/// The result depends only on `index`: a fresh generator is seeded from the
/// index and three draws become the x, y and z components.
#[must_use]
pub fn vector_at(index: usize) -> Vec3 {
    let mut rng = IndexRng::new(index as u64);
    Vec3::new(
        rng.range_f32(-COMPONENT_RANGE, COMPONENT_RANGE),
        rng.range_f32(-COMPONENT_RANGE, COMPONENT_RANGE),
        rng.range_f32(-COMPONENT_RANGE, COMPONENT_RANGE),
    )
}

/// Small LCG, seeded through splitmix64 so neighbouring indices diverge on
/// the first draw.
struct IndexRng {
    state: u64,
}

impl IndexRng {
    fn new(seed: u64) -> Self {
        Self {
            state: splitmix64(seed),
        }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        let unit = f64::from(self.next_u32()) / f64::from(u32::MAX);
        let (min, max) = (f64::from(min), f64::from(max));
        (min + (max - min) * unit) as f32
    }
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
