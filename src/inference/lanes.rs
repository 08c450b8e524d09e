//! Four-wide lane abstraction used by the block evaluator.
//!
//! Grouped blocks compare four `(feature, threshold)` pairs at once. A lane is
//! either one tree of a [`GroupedTrees`] block or one split of a 4-split chunk
//! of a [`GroupedChunks`] block. The evaluator is generic over
//! [`LaneBackend`], so the SIMD and portable paths share one implementation and
//! can be checked against each other.
//!
//! [`GroupedTrees`]: crate::io::BlockKind::GroupedTrees
//! [`GroupedChunks`]: crate::io::BlockKind::GroupedChunks

use wide::{f32x4, u32x4, CmpGt};

/// Number of lanes in a grouped record.
pub const LANES: usize = 4;

/// Lane-wise operations over four `f32` feature values and four `u32` index bits.
pub trait LaneBackend: Copy + Default + Send + Sync + 'static {
    type F32s: Copy;
    type U32s: Copy;

    fn load(values: [f32; LANES]) -> Self::F32s;

    fn from_array(bits: [u32; LANES]) -> Self::U32s;

    fn splat(bits: u32) -> Self::U32s;

    /// `bits[k]` in lanes where `values[k] > thresholds[k]`, zero elsewhere.
    ///
    /// NaN never compares greater, so NaN lanes yield zero.
    fn select_gt(values: Self::F32s, thresholds: Self::F32s, bits: Self::U32s) -> Self::U32s;

    fn or(a: Self::U32s, b: Self::U32s) -> Self::U32s;

    fn shl(a: Self::U32s, n: u32) -> Self::U32s;

    /// Wrapping sum of the four lanes.
    fn hsum(a: Self::U32s) -> u32;

    fn to_array(a: Self::U32s) -> [u32; LANES];

    #[inline]
    fn zero() -> Self::U32s {
        Self::splat(0)
    }
}

// =============================================================================
// SIMD backend
// =============================================================================

/// Backend on `wide` vectors (SSE/NEON/WASM SIMD, scalar emulation elsewhere).
#[derive(Debug, Clone, Copy, Default)]
pub struct WideLanes;

impl LaneBackend for WideLanes {
    type F32s = f32x4;
    type U32s = u32x4;

    #[inline]
    fn load(values: [f32; LANES]) -> f32x4 {
        f32x4::from(values)
    }

    #[inline]
    fn from_array(bits: [u32; LANES]) -> u32x4 {
        u32x4::from(bits)
    }

    #[inline]
    fn splat(bits: u32) -> u32x4 {
        u32x4::splat(bits)
    }

    #[inline]
    fn select_gt(values: f32x4, thresholds: f32x4, bits: u32x4) -> u32x4 {
        // Comparison masks are all-ones or all-zeros per lane
        let mask: u32x4 = bytemuck::cast(values.cmp_gt(thresholds));
        mask & bits
    }

    #[inline]
    fn or(a: u32x4, b: u32x4) -> u32x4 {
        a | b
    }

    #[inline]
    fn shl(a: u32x4, n: u32) -> u32x4 {
        a << n
    }

    #[inline]
    fn hsum(a: u32x4) -> u32 {
        ScalarLanes::hsum(Self::to_array(a))
    }

    #[inline]
    fn to_array(a: u32x4) -> [u32; LANES] {
        bytemuck::cast(a)
    }
}

// =============================================================================
// Portable backend
// =============================================================================

/// Plain-array backend with the same semantics as [`WideLanes`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarLanes;

impl LaneBackend for ScalarLanes {
    type F32s = [f32; LANES];
    type U32s = [u32; LANES];

    #[inline]
    fn load(values: [f32; LANES]) -> [f32; LANES] {
        values
    }

    #[inline]
    fn from_array(bits: [u32; LANES]) -> [u32; LANES] {
        bits
    }

    #[inline]
    fn splat(bits: u32) -> [u32; LANES] {
        [bits; LANES]
    }

    #[inline]
    fn select_gt(
        values: [f32; LANES],
        thresholds: [f32; LANES],
        bits: [u32; LANES],
    ) -> [u32; LANES] {
        std::array::from_fn(|k| if values[k] > thresholds[k] { bits[k] } else { 0 })
    }

    #[inline]
    fn or(a: [u32; LANES], b: [u32; LANES]) -> [u32; LANES] {
        std::array::from_fn(|k| a[k] | b[k])
    }

    #[inline]
    fn shl(a: [u32; LANES], n: u32) -> [u32; LANES] {
        a.map(|x| x << n)
    }

    #[inline]
    fn hsum(a: [u32; LANES]) -> u32 {
        a.into_iter().fold(0u32, u32::wrapping_add)
    }

    #[inline]
    fn to_array(a: [u32; LANES]) -> [u32; LANES] {
        a
    }
}

// =============================================================================
// Runtime selection
// =============================================================================

/// Lane backend chosen at model construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// [`WideLanes`].
    #[default]
    Simd,
    /// [`ScalarLanes`].
    Scalar,
}
