//! Row-major layout derivation for tensor descriptors.

use smallvec::SmallVec;

/// Strides for a contiguous row-major (last-dimension-contiguous) layout.
///
/// `stride[last] = 1`, `stride[i] = dims[i + 1] * stride[i + 1]`. Always
/// the same length as `dims`; a 1-D shape yields `[1]` and a 0-D shape
/// yields an empty sequence.
pub fn row_major_strides(dims: &[i64]) -> SmallVec<[i64; 4]> {
    let ndim = dims.len();
    let mut strides = SmallVec::from_elem(1i64, ndim);
    for i in (0..ndim.saturating_sub(1)).rev() {
        strides[i] = dims[i + 1] * strides[i + 1];
    }
    strides
}
