//! The tunable axis-order space.
//!
//! An external tuner picks the axes order of a field among every distinct
//! arrangement of its axis multiset. [`Permutation`] describes that space.

use crate::error::{FieldError, Result};
use crate::types::{name_counts, same_multiset, AxesOrder, AxisName};

/// Legal axis orders of a multiset of axis names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    items: Vec<AxisName>,
}

impl Permutation {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<AxisName>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// The order used before any tuning: the items as given.
    pub fn default_value(&self) -> AxesOrder {
        AxesOrder::new(self.items.iter().cloned())
    }

    /// Whether `order` is one of the legal values.
    pub fn contains<S: AsRef<str>>(&self, order: &[S]) -> bool {
        same_multiset(&self.items, order)
    }

    /// Accept `order` as a value of this tunable.
    pub fn validate<S: AsRef<str>>(&self, order: &[S]) -> Result<AxesOrder> {
        if !self.contains(order) {
            return Err(FieldError::axis_mismatch(&self.items, order));
        }
        Ok(AxesOrder::new(order.iter().map(|s| s.as_ref())))
    }

    /// Number of distinct orders, or None if it does not fit in a usize.
    pub fn count(&self) -> Option<usize> {
        let mut total: usize = 1;
        let mut n: usize = 0;
        for (_, k) in name_counts(&self.items) {
            for i in 1..=k {
                n += 1;
                total = total.checked_mul(n)? / i;
            }
        }
        Some(total)
    }

    /// Iterate over the distinct orders in lexicographic order.
    pub fn iter(&self) -> PermutationIter {
        let mut sorted = self.items.clone();
        sorted.sort();
        PermutationIter {
            current: Some(sorted),
        }
    }

    /// The first `limit` orders, for bounded searches.
    pub fn candidates(&self, limit: usize) -> Vec<AxesOrder> {
        self.iter().take(limit).collect()
    }
}

/// Iterator over the distinct arrangements of a multiset.
#[derive(Debug, Clone)]
pub struct PermutationIter {
    current: Option<Vec<AxisName>>,
}

impl Iterator for PermutationIter {
    type Item = AxesOrder;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        let mut next = current.clone();
        if next_permutation(&mut next) {
            self.current = Some(next);
        }
        Some(AxesOrder::from(current))
    }
}

/// Advance to the next lexicographic arrangement; false after the last.
fn next_permutation<T: Ord>(items: &mut [T]) -> bool {
    if items.len() < 2 {
        return false;
    }
    let mut i = items.len() - 1;
    while i > 0 && items[i - 1] >= items[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = items.len() - 1;
    while items[j] <= items[i - 1] {
        j -= 1;
    }
    items.swap(i - 1, j);
    items[i..].reverse();
    true
}
