//! Field-type descriptors and the catalog of named field types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldError, Result};
use crate::types::AxisSpec;

/// Symbolic description of how a field decomposes into axes.
///
/// Descriptors are resolved against a lattice and a [`FieldTypeCatalog`] by
/// [`crate::expand`]. In JSON/YAML a descriptor is a string, a list of
/// descriptors, or a mapping of axis names to extents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum FieldTypeDescriptor {
    /// A lattice attribute, axis name or catalog entry.
    Name(String),
    /// Concatenation of sub-descriptors.
    List(Vec<FieldTypeDescriptor>),
    /// Axes already resolved to extents, in order.
    Sizes(Vec<AxisSpec>),
}

impl FieldTypeDescriptor {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Build a list of named descriptors.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(names.into_iter().map(|n| Self::Name(n.into())).collect())
    }

    /// Build an explicit mapping of axes to extents.
    pub fn sizes<I, A>(axes: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AxisSpec>,
    {
        Self::Sizes(axes.into_iter().map(Into::into).collect())
    }

    /// Parse a descriptor from a dynamic JSON value.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(name) => Ok(Self::Name(name.clone())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_value)
                .collect::<Result<Vec<_>>>()
                .map(Self::List),
            Value::Object(map) => map
                .iter()
                .map(|(name, size)| {
                    size.as_u64()
                        .map(|size| AxisSpec::new(name.clone(), size as usize))
                        .ok_or_else(|| {
                            FieldError::unknown_axis(format!("{name} (non-integer size {size})"))
                        })
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Sizes),
            other => Err(FieldError::unknown_axis(other.to_string())),
        }
    }

    /// Convert to a dynamic JSON value.
    ///
    /// Mappings with repeated names become a list of single-entry mappings,
    /// which parse back to an equivalent descriptor.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Name(name) => Value::String(name.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_value).collect()),
            Self::Sizes(axes) => {
                let mut map = Map::new();
                let unique = axes
                    .iter()
                    .all(|axis| map.insert(axis.name.clone(), axis.size.into()).is_none());
                if unique {
                    Value::Object(map)
                } else {
                    Value::Array(
                        axes.iter()
                            .map(|axis| {
                                let mut single = Map::new();
                                single.insert(axis.name.clone(), axis.size.into());
                                Value::Object(single)
                            })
                            .collect(),
                    )
                }
            }
        }
    }
}

impl TryFrom<Value> for FieldTypeDescriptor {
    type Error = FieldError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(&value)
    }
}

impl From<FieldTypeDescriptor> for Value {
    fn from(descriptor: FieldTypeDescriptor) -> Self {
        descriptor.to_value()
    }
}

impl From<&str> for FieldTypeDescriptor {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for FieldTypeDescriptor {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Vec<&str>> for FieldTypeDescriptor {
    fn from(names: Vec<&str>) -> Self {
        Self::names(names)
    }
}

impl From<Vec<FieldTypeDescriptor>> for FieldTypeDescriptor {
    fn from(items: Vec<FieldTypeDescriptor>) -> Self {
        Self::List(items)
    }
}

impl fmt::Display for FieldTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Named decompositions of composite field types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTypeCatalog {
    entries: BTreeMap<String, FieldTypeDescriptor>,
}

impl FieldTypeCatalog {
    /// Catalog with no entries.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The standard lattice QCD field types.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        catalog.insert("scalar", FieldTypeDescriptor::names(["dims"]));
        catalog.insert("vector", FieldTypeDescriptor::names(["dims", "dofs"]));
        catalog.insert("propagator", FieldTypeDescriptor::names(["vector", "dofs"]));
        catalog.insert(
            "gauge",
            FieldTypeDescriptor::names(["dims", "gauge_dofs", "gauge_dofs"]),
        );
        catalog.insert("gauge_links", FieldTypeDescriptor::names(["gauge", "n_dims"]));
        catalog
    }

    /// Add or replace an entry, returning the previous descriptor.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        descriptor: FieldTypeDescriptor,
    ) -> Option<FieldTypeDescriptor> {
        self.entries.insert(name.into(), descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&FieldTypeDescriptor> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FieldTypeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
