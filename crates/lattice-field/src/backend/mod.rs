//! Array backends.
//!
//! The axis algebra only computes parameters; allocation, transposition,
//! rechunking and friends are delegated to an [`ArrayBackend`] injected
//! into every field.
//!
//! - [`NdArrayBackend`]: eager, in-memory arrays backed by `ndarray`.
//! - [`GraphBackend`]: lazy handles; every call records a node of a
//!   computation graph that an external scheduler evaluates.

mod dense;
mod graph;

pub use self::dense::NdArrayBackend;
pub use self::graph::{GraphBackend, GraphNode, GraphOp, LazyArray, NodeId};

use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::error::{FieldError, Result};
use crate::types::{AxisIndex, DType};

/// Primitive array operations a field needs from its storage.
///
/// Axis arguments are physical positions; shapes and chunks are given in
/// the array's current axis order.
pub trait ArrayBackend: Send + Sync {
    /// Handle to an array owned by this backend.
    type Array: Clone + Debug;

    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Allocate a zero-filled array.
    fn zeros(&self, shape: &[usize], chunks: &[usize], dtype: DType) -> Result<Self::Array>;

    /// Extent of every dimension.
    fn shape(&self, array: &Self::Array) -> Vec<usize>;

    /// Permute dimensions; `axes[i]` is the source dimension of output `i`.
    fn transpose(&self, array: &Self::Array, axes: &[usize]) -> Result<Self::Array>;

    /// Drop the given size-one dimensions.
    fn squeeze(&self, array: &Self::Array, axes: &[usize]) -> Result<Self::Array>;

    /// Re-partition into chunks of the given sizes.
    fn rechunk(&self, array: &Self::Array, chunks: &[usize]) -> Result<Self::Array>;

    /// Cyclically shift `axes[i]` by `shifts[i]`.
    fn roll(&self, array: &Self::Array, shifts: &[isize], axes: &[usize]) -> Result<Self::Array>;

    /// Extract the selected region.
    fn get(&self, array: &Self::Array, selection: &[AxisIndex]) -> Result<Self::Array>;

    /// Assign `value`, broadcast to the selected region, in place.
    fn set(
        &self,
        array: &mut Self::Array,
        selection: &[AxisIndex],
        value: &Self::Array,
    ) -> Result<()>;
}

/// Check that `axes` is a permutation of `0..ndim`.
pub(crate) fn check_permutation(axes: &[usize], ndim: usize) -> Result<()> {
    let distinct: BTreeSet<usize> = axes.iter().copied().collect();
    if axes.len() != ndim || distinct.len() != ndim || axes.iter().any(|&a| a >= ndim) {
        return Err(FieldError::backend(format!(
            "{axes:?} is not a permutation of {ndim} axes"
        )));
    }
    Ok(())
}

/// Check that `axes` are distinct size-one dimensions of `shape`.
pub(crate) fn check_squeeze(axes: &[usize], shape: &[usize]) -> Result<()> {
    let distinct: BTreeSet<usize> = axes.iter().copied().collect();
    if distinct.len() != axes.len() {
        return Err(FieldError::backend(format!("duplicate squeeze axes {axes:?}")));
    }
    for &axis in axes {
        match shape.get(axis) {
            Some(1) => {}
            Some(size) => {
                return Err(FieldError::backend(format!(
                    "cannot squeeze dimension {axis} of size {size}"
                )))
            }
            None => {
                return Err(FieldError::backend(format!(
                    "squeeze axis {axis} out of range for {} dimensions",
                    shape.len()
                )))
            }
        }
    }
    Ok(())
}

/// Check that a selection fits `shape`.
pub(crate) fn check_selection(selection: &[AxisIndex], shape: &[usize]) -> Result<()> {
    if selection.len() != shape.len() {
        return Err(FieldError::backend(format!(
            "selection has {} entries for {} dimensions",
            selection.len(),
            shape.len()
        )));
    }
    if let Some((axis, index)) = selection
        .iter()
        .zip(shape)
        .enumerate()
        .find(|(_, (index, size))| !index.fits(**size))
        .map(|(axis, (index, _))| (axis, index))
    {
        return Err(FieldError::backend(format!(
            "{index:?} is out of range for dimension {axis} of size {}",
            shape[axis]
        )));
    }
    Ok(())
}

/// Check that `from` broadcasts to `to` (trailing dimensions aligned).
pub(crate) fn check_broadcast(from: &[usize], to: &[usize]) -> Result<()> {
    let compatible = from.len() <= to.len()
        && from
            .iter()
            .rev()
            .zip(to.iter().rev())
            .all(|(f, t)| f == t || *f == 1);
    if !compatible {
        return Err(FieldError::backend(format!(
            "cannot broadcast shape {from:?} to {to:?}"
        )));
    }
    Ok(())
}

/// Check that roll shifts and axes line up with the array.
pub(crate) fn check_roll(shifts: &[isize], axes: &[usize], ndim: usize) -> Result<()> {
    if shifts.len() != axes.len() {
        return Err(FieldError::backend(format!(
            "{} shifts given for {} axes",
            shifts.len(),
            axes.len()
        )));
    }
    if let Some(axis) = axes.iter().find(|&&a| a >= ndim) {
        return Err(FieldError::backend(format!(
            "roll axis {axis} out of range for {ndim} dimensions"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_permutation() {
        assert!(check_permutation(&[2, 0, 1], 3).is_ok());
        assert!(check_permutation(&[0, 0, 1], 3).is_err());
        assert!(check_permutation(&[0, 1], 3).is_err());
        assert!(check_permutation(&[0, 1, 3], 3).is_err());
    }

    #[test]
    fn test_check_squeeze() {
        assert!(check_squeeze(&[1], &[4, 1, 3]).is_ok());
        assert!(check_squeeze(&[0], &[4, 1, 3]).is_err());
        assert!(check_squeeze(&[1, 1], &[4, 1, 3]).is_err());
        assert!(check_squeeze(&[5], &[4, 1, 3]).is_err());
    }

    #[test]
    fn test_check_broadcast() {
        assert!(check_broadcast(&[], &[4, 3]).is_ok());
        assert!(check_broadcast(&[3], &[4, 3]).is_ok());
        assert!(check_broadcast(&[1, 3], &[4, 3]).is_ok());
        assert!(check_broadcast(&[4], &[4, 3]).is_err());
        assert!(check_broadcast(&[2, 4, 3], &[4, 3]).is_err());
    }
}
