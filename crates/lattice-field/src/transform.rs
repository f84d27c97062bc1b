//! Parameters of axis-aware array operations.
//!
//! These functions only translate axis names into axis positions; the
//! array work itself is done by an [`crate::backend::ArrayBackend`].

use std::collections::BTreeSet;

use tracing::trace;

use crate::error::{FieldError, Result};
use crate::types::{same_multiset, AxisIndex, AxisKey, AxisName, SubOrders};

/// Build a per-position selection from named coordinates.
///
/// Positions default to [`AxisIndex::Full`]. Each coordinate overrides the
/// next not-yet-selected occurrence of its axis, so naming a repeated axis
/// twice addresses both of its occurrences.
pub fn selection<S: AsRef<str>>(
    axes_order: &[AxisName],
    shape: &[usize],
    coords: &[(S, AxisIndex)],
) -> Result<Vec<AxisIndex>> {
    check_shape("getitem", axes_order, shape)?;

    let mut mask = vec![AxisIndex::Full; axes_order.len()];
    let mut assigned = vec![false; axes_order.len()];

    for (name, index) in coords {
        let name = name.as_ref();
        if !axes_order.iter().any(|axis| axis == name) {
            return Err(FieldError::unknown_axis(name));
        }
        let pos = (0..axes_order.len())
            .find(|&p| axes_order[p] == name && !assigned[p])
            .ok_or_else(|| {
                FieldError::invalid_params(
                    "getitem",
                    format!("more coordinates than occurrences of axis '{name}'"),
                )
            })?;
        if !index.fits(shape[pos]) {
            return Err(FieldError::invalid_params(
                "getitem",
                format!(
                    "{index:?} is out of range for axis '{name}' of size {}",
                    shape[pos]
                ),
            ));
        }
        mask[pos] = *index;
        assigned[pos] = true;
    }
    Ok(mask)
}

/// Shape of the region picked by a selection.
pub fn selected_shape(shape: &[usize], selection: &[AxisIndex]) -> Vec<usize> {
    shape
        .iter()
        .zip(selection)
        .filter_map(|(size, index)| index.selected_len(*size))
        .collect()
}

/// Axis positions removed and kept by a squeeze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqueezePlan {
    /// Positions dropped from the array, ascending.
    pub removed: Vec<usize>,
    /// Positions that survive, ascending.
    pub kept: Vec<usize>,
}

/// Work out which axis occurrences a squeeze to `keep_axes` removes.
///
/// An occurrence is kept when its axis is listed in `keep_axes` and either
/// its size is above one or `keep_axes` lists the axis exactly as often as
/// the order still holds it (occurrences removed earlier in the walk no
/// longer count). Anything else must have size one.
pub fn squeeze_plan<S: AsRef<str>>(
    keep_axes: &[S],
    axes_order: &[AxisName],
    shape: &[usize],
) -> Result<SqueezePlan> {
    check_shape("squeeze", axes_order, shape)?;

    let keep: Vec<&str> = keep_axes.iter().map(|s| s.as_ref()).collect();
    let mut working: Vec<&str> = axes_order.iter().map(String::as_str).collect();
    let mut plan = SqueezePlan {
        removed: Vec::new(),
        kept: Vec::new(),
    };

    for (i, (axis, &size)) in axes_order.iter().zip(shape).enumerate() {
        let axis = axis.as_str();
        let listed = keep.iter().filter(|k| **k == axis).count();
        let present = working.iter().filter(|w| **w == axis).count();

        if listed > 0 && (size > 1 || listed == present) {
            plan.kept.push(i);
            continue;
        }
        if size != 1 {
            return Err(FieldError::Squeeze {
                axis: axis.to_string(),
                size,
            });
        }
        if let Some(w) = working.iter().position(|w| *w == axis) {
            working.remove(w);
        }
        plan.removed.push(i);
    }

    let surviving: Vec<&str> = plan.kept.iter().map(|&i| axes_order[i].as_str()).collect();
    if !same_multiset(&surviving, &keep) {
        return Err(FieldError::axis_mismatch(&keep, &surviving));
    }
    trace!(removed = ?plan.removed, "Planned squeeze");
    Ok(plan)
}

/// Axis permutation taking `old_order` to `new_order`.
///
/// `result[i]` is the old position of the axis that ends up at position
/// `i`. Occurrences of a repeated name are matched first to first, so they
/// keep their relative order.
pub fn reorder_permutation<A: AsRef<str>, B: AsRef<str>>(
    new_order: &[A],
    old_order: &[B],
) -> Result<Vec<usize>> {
    if !same_multiset(new_order, old_order) {
        return Err(FieldError::ReorderMismatch {
            new: new_order.iter().map(|s| s.as_ref().to_string()).collect(),
            old: old_order.iter().map(|s| s.as_ref().to_string()).collect(),
        });
    }

    let mut remaining: Vec<(usize, &str)> = old_order
        .iter()
        .enumerate()
        .map(|(i, name)| (i, name.as_ref()))
        .collect();
    let mut axes = Vec::with_capacity(new_order.len());
    for name in new_order {
        let name = name.as_ref();
        // Multisets match, so every lookup succeeds.
        if let Some(idx) = remaining.iter().position(|(_, n)| *n == name) {
            axes.push(remaining.remove(idx).0);
        }
    }
    Ok(axes)
}

/// Per-position shifts of a roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollPlan {
    pub shifts: Vec<isize>,
    pub axes: Vec<usize>,
}

/// Match named shifts to axis positions.
///
/// A plain axis takes `shifts[0]`. For an axis occurring k > 1 times the
/// hint for that axis (its sub-order) must have k entries: the j-th
/// occurrence in the order takes `shifts[hint[j]]`.
pub fn roll_plan<S: AsRef<str>>(
    axes_order: &[AxisName],
    shifts: &[(S, Vec<isize>)],
    hints: &SubOrders,
) -> Result<RollPlan> {
    let mut plan = RollPlan {
        shifts: Vec::new(),
        axes: Vec::new(),
    };

    for (axis, shift) in shifts {
        let axis = axis.as_ref();
        let positions: Vec<usize> = (0..axes_order.len())
            .filter(|&p| axes_order[p] == axis)
            .collect();
        if positions.is_empty() {
            return Err(FieldError::unknown_axis(axis));
        }

        let hint = if positions.len() > 1 {
            hints.get(axis).cloned().ok_or_else(|| {
                FieldError::invalid_params(
                    "roll",
                    format!(
                        "axis '{axis}' occurs {} times and needs a sub-order hint",
                        positions.len()
                    ),
                )
            })?
        } else {
            vec![0]
        };
        if hint.len() != positions.len() {
            return Err(FieldError::invalid_params(
                "roll",
                format!(
                    "hint {hint:?} does not cover the {} occurrences of axis '{axis}'",
                    positions.len()
                ),
            ));
        }

        for (pos, h) in positions.into_iter().zip(hint) {
            let value = shift.get(h).copied().ok_or_else(|| {
                FieldError::invalid_params(
                    "roll",
                    format!("no shift at index {h} for axis '{axis}' (got {shift:?})"),
                )
            })?;
            plan.axes.push(pos);
            plan.shifts.push(value);
        }
    }
    Ok(plan)
}

/// Permutation exchanging the occurrences of one repeated axis.
///
/// The occurrences of `axis` are labelled with `old_sub_order` (current
/// layout) and `new_sub_order` (target layout); every other axis keeps its
/// position.
pub fn transpose_permutation(
    axis: &str,
    axes_order: &[AxisName],
    new_sub_order: &[usize],
    old_sub_order: &[usize],
) -> Result<Vec<usize>> {
    let count = axes_order.iter().filter(|a| *a == axis).count();
    if count == 0 {
        return Err(FieldError::unknown_axis(axis));
    }
    let new_set: BTreeSet<usize> = new_sub_order.iter().copied().collect();
    let old_set: BTreeSet<usize> = old_sub_order.iter().copied().collect();
    if new_sub_order.len() != count
        || old_sub_order.len() != count
        || new_set.len() != count
        || new_set != old_set
    {
        return Err(FieldError::invalid_params(
            "transpose",
            format!(
                "axis '{axis}' occurs {count} times; new order {new_sub_order:?} and \
                 old order {old_sub_order:?} must be permutations of the same {count} indices"
            ),
        ));
    }

    let mut old_labels: Vec<AxisKey> = axes_order.iter().map(AxisKey::plain).collect();
    let mut new_labels = old_labels.clone();
    let plain = AxisKey::plain(axis);
    for (&new, &old) in new_sub_order.iter().zip(old_sub_order) {
        if let Some(idx) = old_labels.iter().position(|label| *label == plain) {
            old_labels[idx] = AxisKey::occurrence(axis, old);
            new_labels[idx] = AxisKey::occurrence(axis, new);
        }
    }

    let mut remaining: Vec<(usize, AxisKey)> = old_labels.into_iter().enumerate().collect();
    let mut axes = Vec::with_capacity(new_labels.len());
    for label in &new_labels {
        if let Some(idx) = remaining.iter().position(|(_, l)| l == label) {
            axes.push(remaining.remove(idx).0);
        }
    }
    Ok(axes)
}

fn check_shape(op: &'static str, axes_order: &[AxisName], shape: &[usize]) -> Result<()> {
    if axes_order.len() != shape.len() {
        return Err(FieldError::invalid_params(
            op,
            format!(
                "axes order has {} entries but the array has {} dimensions",
                axes_order.len(),
                shape.len()
            ),
        ));
    }
    Ok(())
}
