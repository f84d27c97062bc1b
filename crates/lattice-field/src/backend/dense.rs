//! Eager in-memory backend on top of `ndarray`.

use std::fmt::Debug;
use std::marker::PhantomData;

use ndarray::{concatenate, ArrayD, Axis, IxDyn, Slice};
use num_traits::Zero;
use tracing::debug;

use super::{check_broadcast, check_permutation, check_roll, check_selection, check_squeeze};
use super::ArrayBackend;
use crate::error::{FieldError, Result};
use crate::transform::selected_shape;
use crate::types::{AxisIndex, DType};

/// Dense, eagerly evaluated arrays of element type `T`.
///
/// `ndarray` has no notion of chunks, so chunk arguments are only checked
/// for consistency and rechunking returns an unchanged copy. The element
/// type is fixed by `T`; the requested dtype is only logged.
#[derive(Debug)]
pub struct NdArrayBackend<T> {
    _elem: PhantomData<fn() -> T>,
}

impl<T> NdArrayBackend<T> {
    pub fn new() -> Self {
        Self { _elem: PhantomData }
    }
}

impl<T> Default for NdArrayBackend<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ArrayBackend for NdArrayBackend<T>
where
    T: Clone + Zero + Debug + Send + Sync + 'static,
{
    type Array = ArrayD<T>;

    fn name(&self) -> &str {
        "ndarray"
    }

    fn zeros(&self, shape: &[usize], chunks: &[usize], dtype: DType) -> Result<Self::Array> {
        if shape.len() != chunks.len() {
            return Err(FieldError::backend(format!(
                "chunks {chunks:?} do not match shape {shape:?}"
            )));
        }
        debug!(shape = ?shape, dtype = %dtype, "Allocating zeros");
        Ok(ArrayD::zeros(IxDyn(shape)))
    }

    fn shape(&self, array: &Self::Array) -> Vec<usize> {
        array.shape().to_vec()
    }

    fn transpose(&self, array: &Self::Array, axes: &[usize]) -> Result<Self::Array> {
        check_permutation(axes, array.ndim())?;
        Ok(array
            .clone()
            .permuted_axes(IxDyn(axes))
            .as_standard_layout()
            .into_owned())
    }

    fn squeeze(&self, array: &Self::Array, axes: &[usize]) -> Result<Self::Array> {
        check_squeeze(axes, array.shape())?;
        let mut sorted = axes.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));

        let mut out = array.clone();
        for axis in sorted {
            out = out.index_axis_move(Axis(axis), 0);
        }
        Ok(out)
    }

    fn rechunk(&self, array: &Self::Array, chunks: &[usize]) -> Result<Self::Array> {
        if chunks.len() != array.ndim() {
            return Err(FieldError::backend(format!(
                "chunks {chunks:?} do not match shape {:?}",
                array.shape()
            )));
        }
        Ok(array.clone())
    }

    fn roll(&self, array: &Self::Array, shifts: &[isize], axes: &[usize]) -> Result<Self::Array> {
        check_roll(shifts, axes, array.ndim())?;

        let mut out = array.clone();
        for (&shift, &axis) in shifts.iter().zip(axes) {
            let len = out.len_of(Axis(axis));
            if len == 0 {
                continue;
            }
            let split = len - shift.rem_euclid(len as isize) as usize;
            if split == len {
                continue;
            }
            let rolled = concatenate(
                Axis(axis),
                &[
                    out.slice_axis(Axis(axis), Slice::from(split..)),
                    out.slice_axis(Axis(axis), Slice::from(..split)),
                ],
            )
            .map_err(|e| FieldError::backend(e.to_string()))?;
            out = rolled;
        }
        Ok(out)
    }

    fn get(&self, array: &Self::Array, selection: &[AxisIndex]) -> Result<Self::Array> {
        check_selection(selection, array.shape())?;

        let mut view = array.view();
        for (pos, index) in selection.iter().enumerate().rev() {
            match *index {
                AxisIndex::Full => {}
                AxisIndex::Index(i) => view = view.index_axis_move(Axis(pos), i),
                AxisIndex::Slice { start, end, step } => view.slice_axis_inplace(
                    Axis(pos),
                    Slice::new(start as isize, Some(end as isize), step as isize),
                ),
            }
        }
        Ok(view.to_owned())
    }

    fn set(
        &self,
        array: &mut Self::Array,
        selection: &[AxisIndex],
        value: &Self::Array,
    ) -> Result<()> {
        check_selection(selection, array.shape())?;
        check_broadcast(value.shape(), &selected_shape(array.shape(), selection))?;

        let mut view = array.view_mut();
        for (pos, index) in selection.iter().enumerate().rev() {
            match *index {
                AxisIndex::Full => {}
                AxisIndex::Index(i) => view = view.index_axis_move(Axis(pos), i),
                AxisIndex::Slice { start, end, step } => view.slice_axis_inplace(
                    Axis(pos),
                    Slice::new(start as isize, Some(end as isize), step as isize),
                ),
            }
        }
        view.assign(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array};

    fn backend() -> NdArrayBackend<f64> {
        NdArrayBackend::new()
    }

    fn grid(rows: usize, cols: usize) -> ArrayD<f64> {
        Array::from_shape_fn((rows, cols), |(r, c)| (r * 10 + c) as f64).into_dyn()
    }

    #[test]
    fn test_zeros() {
        let array = backend().zeros(&[2, 3], &[1, 3], DType::Float64).unwrap();
        assert_eq!(array.shape(), &[2, 3]);
        assert!(array.iter().all(|v| *v == 0.0));
        assert!(backend().zeros(&[2, 3], &[1], DType::Float64).is_err());
    }

    #[test]
    fn test_transpose() {
        let array = grid(2, 3);
        let t = backend().transpose(&array, &[1, 0]).unwrap();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t[&[2, 1][..]], 12.0);
        assert!(backend().transpose(&array, &[0, 0]).is_err());
    }

    #[test]
    fn test_squeeze() {
        let array = ArrayD::<f64>::zeros(IxDyn(&[1, 3, 1]));
        let squeezed = backend().squeeze(&array, &[0, 2]).unwrap();
        assert_eq!(squeezed.shape(), &[3]);
        assert!(backend().squeeze(&array, &[1]).is_err());
    }

    #[test]
    fn test_roll_matches_cyclic_shift() {
        let array = arr1(&[0.0, 1.0, 2.0, 3.0]).into_dyn();
        let rolled = backend().roll(&array, &[1], &[0]).unwrap();
        assert_eq!(rolled, arr1(&[3.0, 0.0, 1.0, 2.0]).into_dyn());

        let back = backend().roll(&array, &[-1], &[0]).unwrap();
        assert_eq!(back, arr1(&[1.0, 2.0, 3.0, 0.0]).into_dyn());

        let full_turn = backend().roll(&array, &[4], &[0]).unwrap();
        assert_eq!(full_turn, array);
    }

    #[test]
    fn test_get_index_and_slice() {
        let array = grid(3, 4);
        let row = backend()
            .get(&array, &[AxisIndex::Index(1), AxisIndex::Full])
            .unwrap();
        assert_eq!(row, arr1(&[10.0, 11.0, 12.0, 13.0]).into_dyn());

        let block = backend()
            .get(&array, &[AxisIndex::range(1..3), AxisIndex::Index(2)])
            .unwrap();
        assert_eq!(block, arr1(&[12.0, 22.0]).into_dyn());

        let everything = backend()
            .get(&array, &[AxisIndex::Full, AxisIndex::Full])
            .unwrap();
        assert_eq!(everything, array);
    }

    #[test]
    fn test_set_broadcasts_value() {
        let mut array = grid(2, 3);
        let value = arr1(&[-1.0]).into_dyn();
        backend()
            .set(&mut array, &[AxisIndex::Index(0), AxisIndex::Full], &value)
            .unwrap();
        assert_eq!(
            array,
            arr2(&[[-1.0, -1.0, -1.0], [10.0, 11.0, 12.0]]).into_dyn()
        );

        let bad = arr1(&[1.0, 2.0]).into_dyn();
        assert!(backend()
            .set(&mut array, &[AxisIndex::Index(0), AxisIndex::Full], &bad)
            .is_err());
    }
}
