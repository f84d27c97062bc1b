//! Core value types of the axis-order algebra.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, Range};

use serde::{Deserialize, Serialize};

/// Symbolic name of a logical axis (e.g. "x", "color").
pub type AxisName = String;

/// Per-axis occurrence ranks for axes that appear more than once.
///
/// `sub_orders["color"] == [1, 0]` means the first physical occurrence of
/// `color` carries rank 1 and the second carries rank 0.
pub type SubOrders = BTreeMap<AxisName, Vec<usize>>;

/// A resolved axis: name and extent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisSpec {
    pub name: AxisName,
    pub size: usize,
}

impl AxisSpec {
    /// Create a new axis spec.
    pub fn new(name: impl Into<AxisName>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

impl<S: Into<AxisName>> From<(S, usize)> for AxisSpec {
    fn from((name, size): (S, usize)) -> Self {
        Self::new(name, size)
    }
}

/// Count the occurrences of every name in a sequence.
pub fn name_counts<S: AsRef<str>>(names: &[S]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for name in names {
        *counts.entry(name.as_ref()).or_insert(0) += 1;
    }
    counts
}

/// Check whether two name sequences hold the same multiset of names.
pub fn same_multiset<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
    a.len() == b.len() && name_counts(a) == name_counts(b)
}

/// Physical storage order of a field's axis occurrences.
///
/// A name may appear several times (e.g. the two color indices of a gauge
/// link).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AxesOrder(Vec<AxisName>);

impl AxesOrder {
    /// Create an order from any sequence of names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<AxisName>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Number of occurrences of `name`.
    pub fn count(&self, name: &str) -> usize {
        self.0.iter().filter(|n| n.as_str() == name).count()
    }

    /// Positions of every occurrence of `name`, in order.
    pub fn positions(&self, name: &str) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, n)| n.as_str() == name)
            .map(|(i, _)| i)
            .collect()
    }

    /// Names occurring more than once, sorted.
    pub fn repeated(&self) -> Vec<&str> {
        name_counts(&self.0)
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name)
            .collect()
    }

    /// Check that `other` is a permutation of this order.
    pub fn same_axes<S: AsRef<str>>(&self, other: &[S]) -> bool {
        same_multiset(&self.0, other)
    }

    pub fn as_slice(&self) -> &[AxisName] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<AxisName> {
        self.0
    }
}

impl Deref for AxesOrder {
    type Target = [AxisName];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<AxisName>> for AxesOrder {
    fn from(names: Vec<AxisName>) -> Self {
        Self(names)
    }
}

impl From<&[&str]> for AxesOrder {
    fn from(names: &[&str]) -> Self {
        Self::new(names.iter().copied())
    }
}

impl<S: Into<AxisName>> FromIterator<S> for AxesOrder {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for AxesOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// Requested chunk sizes, keyed by axis name.
///
/// A name may appear once per occurrence of the axis; entries are consumed
/// in order. Axes without an entry are stored unchunked.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkSpec(Vec<(AxisName, usize)>);

impl ChunkSpec {
    /// Create an empty chunk spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, builder style.
    pub fn with(mut self, name: impl Into<AxisName>, size: usize) -> Self {
        self.push(name, size);
        self
    }

    /// Add an entry.
    pub fn push(&mut self, name: impl Into<AxisName>, size: usize) {
        self.0.push((name.into(), size));
    }

    pub fn entries(&self) -> &[(AxisName, usize)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The names referenced by this spec, in entry order.
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl<S: Into<AxisName>> FromIterator<(S, usize)> for ChunkSpec {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, s)| (n.into(), s)).collect())
    }
}

/// Scalar element type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float32,
    Float64,
    Complex64,
    #[default]
    Complex128,
    Int32,
    Int64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn itemsize(&self) -> usize {
        match self {
            Self::Float32 | Self::Int32 => 4,
            Self::Float64 | Self::Int64 | Self::Complex64 => 8,
            Self::Complex128 => 16,
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "float32" | "f32" => Some(Self::Float32),
            "float64" | "f64" | "double" => Some(Self::Float64),
            "complex64" | "c64" => Some(Self::Complex64),
            "complex128" | "c128" | "complex" => Some(Self::Complex128),
            "int32" | "i32" => Some(Self::Int32),
            "int64" | "i64" => Some(Self::Int64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An axis order entry that may carry an occurrence rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AxisKey {
    /// An axis addressed by name only.
    Plain(AxisName),
    /// One occurrence of a repeated axis.
    Occurrence { name: AxisName, rank: usize },
}

impl AxisKey {
    pub fn plain(name: impl Into<AxisName>) -> Self {
        Self::Plain(name.into())
    }

    pub fn occurrence(name: impl Into<AxisName>, rank: usize) -> Self {
        Self::Occurrence {
            name: name.into(),
            rank,
        }
    }

    /// The axis name, without rank.
    pub fn name(&self) -> &str {
        match self {
            Self::Plain(name) | Self::Occurrence { name, .. } => name,
        }
    }

    pub fn rank(&self) -> Option<usize> {
        match self {
            Self::Plain(_) => None,
            Self::Occurrence { rank, .. } => Some(*rank),
        }
    }
}

impl fmt::Display for AxisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(name) => write!(f, "{name}"),
            Self::Occurrence { name, rank } => write!(f, "{name}[{rank}]"),
        }
    }
}

/// Selection applied to one axis occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AxisIndex {
    /// Keep the whole axis.
    #[default]
    Full,
    /// Pick a single element; the axis is dropped from the result.
    Index(usize),
    /// Strided half-open range `start..end`.
    Slice { start: usize, end: usize, step: usize },
}

impl AxisIndex {
    /// Contiguous range selection.
    pub fn range(range: Range<usize>) -> Self {
        Self::Slice {
            start: range.start,
            end: range.end,
            step: 1,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }

    /// Whether applying this selection removes the axis.
    pub fn drops_axis(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// Extent of the axis after selection, or None if it is dropped.
    pub fn selected_len(&self, size: usize) -> Option<usize> {
        match *self {
            Self::Full => Some(size),
            Self::Index(_) => None,
            Self::Slice { start, end, step } => {
                let end = end.min(size);
                if end <= start || step == 0 {
                    Some(0)
                } else {
                    Some((end - start).div_ceil(step))
                }
            }
        }
    }

    /// Check that the selection fits an axis of extent `size`.
    pub fn fits(&self, size: usize) -> bool {
        match *self {
            Self::Full => true,
            Self::Index(i) => i < size,
            Self::Slice { start, end, step } => step > 0 && start <= end && end <= size,
        }
    }
}

impl From<usize> for AxisIndex {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<Range<usize>> for AxisIndex {
    fn from(range: Range<usize>) -> Self {
        Self::range(range)
    }
}
