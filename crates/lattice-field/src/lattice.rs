//! The lattice: catalog of axis names and extents a field lives on.

use std::collections::{BTreeMap, BTreeSet};

use crate::descriptor::FieldTypeDescriptor;
use crate::error::{FieldError, Result};
use crate::types::{AxisSpec, DType};

/// Attribute names with a fixed meaning in every lattice.
pub const RESERVED_NAMES: [&str; 3] = ["dims", "dofs", "n_dims"];

/// Value a lattice attribute resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A single axis extent.
    Size(usize),
    /// A descriptor that must be expanded further.
    Descriptor(FieldTypeDescriptor),
}

/// Result of looking a name up in the lattice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(Resolved),
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Space-time dimensions, internal degrees of freedom and element type.
///
/// Name resolution:
/// - every dimension and dof name resolves to its extent;
/// - `dims` and `dofs` resolve to their ordered mappings;
/// - `n_dims` resolves to the number of dimensions;
/// - aliases resolve to their descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    dims: Vec<AxisSpec>,
    dofs: Vec<AxisSpec>,
    aliases: BTreeMap<String, FieldTypeDescriptor>,
    dtype: DType,
}

impl Lattice {
    /// Create a lattice with the given dimensions.
    ///
    /// Dofs default to `spin: 4, color: 3`, `gauge_dofs` aliases `[color]`
    /// and the element type is `complex128`.
    pub fn new<I, A>(dims: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<AxisSpec>,
    {
        let mut aliases = BTreeMap::new();
        aliases.insert(
            "gauge_dofs".to_string(),
            FieldTypeDescriptor::names(["color"]),
        );
        let lattice = Self {
            dims: dims.into_iter().map(Into::into).collect(),
            dofs: vec![AxisSpec::new("spin", 4), AxisSpec::new("color", 3)],
            aliases,
            dtype: DType::default(),
        };
        lattice.validate()?;
        Ok(lattice)
    }

    /// Replace the internal degrees of freedom.
    pub fn with_dofs<I, A>(mut self, dofs: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<AxisSpec>,
    {
        self.dofs = dofs.into_iter().map(Into::into).collect();
        self.validate()?;
        Ok(self)
    }

    /// Add or replace an alias.
    pub fn with_alias(
        mut self,
        name: impl Into<String>,
        descriptor: FieldTypeDescriptor,
    ) -> Result<Self> {
        self.aliases.insert(name.into(), descriptor);
        self.validate()?;
        Ok(self)
    }

    /// Drop every alias, including the default `gauge_dofs`.
    pub fn without_aliases(mut self) -> Self {
        self.aliases.clear();
        self
    }

    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn dims(&self) -> &[AxisSpec] {
        &self.dims
    }

    pub fn dofs(&self) -> &[AxisSpec] {
        &self.dofs
    }

    pub fn aliases(&self) -> &BTreeMap<String, FieldTypeDescriptor> {
        &self.aliases
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn n_dims(&self) -> usize {
        self.dims.len()
    }

    /// Number of lattice sites.
    pub fn volume(&self) -> usize {
        self.dims.iter().map(|d| d.size).product()
    }

    pub fn is_dim(&self, name: &str) -> bool {
        self.dims.iter().any(|d| d.name == name)
    }

    pub fn is_dof(&self, name: &str) -> bool {
        self.dofs.iter().any(|d| d.name == name)
    }

    /// Resolve a name against the lattice attributes.
    pub fn lookup(&self, name: &str) -> Lookup {
        let found = match name {
            "dims" => Some(Resolved::Descriptor(FieldTypeDescriptor::Sizes(
                self.dims.clone(),
            ))),
            "dofs" => Some(Resolved::Descriptor(FieldTypeDescriptor::Sizes(
                self.dofs.clone(),
            ))),
            "n_dims" => Some(Resolved::Size(self.n_dims())),
            _ => self
                .dims
                .iter()
                .chain(self.dofs.iter())
                .find(|axis| axis.name == name)
                .map(|axis| Resolved::Size(axis.size))
                .or_else(|| {
                    self.aliases
                        .get(name)
                        .map(|descriptor| Resolved::Descriptor(descriptor.clone()))
                }),
        };
        match found {
            Some(resolved) => Lookup::Found(resolved),
            None => Lookup::NotFound,
        }
    }

    /// Check whether the lattice defines `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_found()
    }

    fn validate(&self) -> Result<()> {
        if self.dims.is_empty() {
            return Err(FieldError::invalid_lattice("at least one dimension is required"));
        }

        let mut seen: BTreeSet<&str> = RESERVED_NAMES.iter().copied().collect();
        for axis in self.dims.iter().chain(self.dofs.iter()) {
            if axis.size == 0 {
                return Err(FieldError::invalid_lattice(format!(
                    "axis '{}' has zero extent",
                    axis.name
                )));
            }
            if !seen.insert(axis.name.as_str()) {
                return Err(FieldError::invalid_lattice(format!(
                    "name '{}' is defined more than once",
                    axis.name
                )));
            }
        }
        for name in self.aliases.keys() {
            if !seen.insert(name.as_str()) {
                return Err(FieldError::invalid_lattice(format!(
                    "alias '{name}' shadows another lattice name"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice() -> Lattice {
        Lattice::new([("t", 8), ("x", 4), ("y", 4), ("z", 4)]).unwrap()
    }

    #[test]
    fn test_lookup_axes() {
        let lattice = lattice();
        assert_eq!(lattice.lookup("t"), Lookup::Found(Resolved::Size(8)));
        assert_eq!(lattice.lookup("color"), Lookup::Found(Resolved::Size(3)));
        assert_eq!(lattice.lookup("n_dims"), Lookup::Found(Resolved::Size(4)));
        assert_eq!(lattice.lookup("flavor"), Lookup::NotFound);
    }

    #[test]
    fn test_lookup_groups_and_aliases() {
        let lattice = lattice();
        match lattice.lookup("dofs") {
            Lookup::Found(Resolved::Descriptor(FieldTypeDescriptor::Sizes(axes))) => {
                assert_eq!(axes, vec![AxisSpec::new("spin", 4), AxisSpec::new("color", 3)]);
            }
            other => panic!("unexpected lookup result: {other:?}"),
        }
        assert_eq!(
            lattice.lookup("gauge_dofs"),
            Lookup::Found(Resolved::Descriptor(FieldTypeDescriptor::names(["color"])))
        );
    }

    #[test]
    fn test_volume_and_membership() {
        let lattice = lattice();
        assert_eq!(lattice.volume(), 512);
        assert!(lattice.is_dim("x"));
        assert!(!lattice.is_dim("spin"));
        assert!(lattice.is_dof("spin"));
        assert!(lattice.contains("dims"));
        assert!(!lattice.contains("propagator"));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Lattice::new(Vec::<AxisSpec>::new()),
            Err(FieldError::InvalidLattice(_))
        ));
        assert!(matches!(
            Lattice::new([("x", 4), ("x", 4)]),
            Err(FieldError::InvalidLattice(_))
        ));
        assert!(matches!(
            Lattice::new([("x", 0)]),
            Err(FieldError::InvalidLattice(_))
        ));
        assert!(matches!(
            Lattice::new([("dims", 4)]),
            Err(FieldError::InvalidLattice(_))
        ));
        assert!(matches!(
            lattice().with_dofs([("x", 2)]),
            Err(FieldError::InvalidLattice(_))
        ));
        assert!(matches!(
            lattice().with_alias("spin", FieldTypeDescriptor::names(["color"])),
            Err(FieldError::InvalidLattice(_))
        ));
    }

    #[test]
    fn test_custom_dofs_and_dtype() {
        let lattice = lattice()
            .with_dofs([("color", 2)])
            .unwrap()
            .with_dtype(DType::Complex64);
        assert_eq!(lattice.dofs().len(), 1);
        assert_eq!(lattice.dtype(), DType::Complex64);
        assert_eq!(lattice.lookup("spin"), Lookup::NotFound);
    }
}
