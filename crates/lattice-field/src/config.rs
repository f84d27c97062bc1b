//! Configuration: layout defaults and lattice definition files.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::{FieldTypeCatalog, FieldTypeDescriptor};
use crate::error::{FieldError, Result};
use crate::lattice::Lattice;
use crate::types::{AxisSpec, ChunkSpec, DType};

/// Defaults applied when laying out fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Upper bound on the number of axis orders enumerated for a field.
    pub max_order_candidates: usize,

    /// Element type used when a lattice file does not set one.
    pub default_dtype: DType,

    /// Uniform chunk size for lattice dimensions; None keeps full extents.
    pub default_chunk: Option<usize>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_order_candidates: 64,
            default_dtype: DType::Complex128,
            default_chunk: None,
        }
    }
}

impl LayoutConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("LATTICE_FIELD_MAX_ORDER_CANDIDATES") {
            if let Ok(limit) = val.parse() {
                config.max_order_candidates = limit;
            }
        }

        if let Ok(val) = std::env::var("LATTICE_FIELD_DTYPE") {
            if let Some(dtype) = DType::parse(&val) {
                config.default_dtype = dtype;
            }
        }

        if let Ok(val) = std::env::var("LATTICE_FIELD_DEFAULT_CHUNK") {
            if let Ok(chunk) = val.parse() {
                config.default_chunk = Some(chunk);
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_order_candidates == 0 {
            return Err("max_order_candidates must be > 0".to_string());
        }

        if self.default_chunk == Some(0) {
            return Err("default_chunk must be > 0".to_string());
        }

        Ok(())
    }

    /// Chunk entries for the lattice dimensions among `axes`.
    ///
    /// Every occurrence of a dimension gets `default_chunk`, capped at the
    /// dimension's extent. Empty when no default chunk is configured.
    pub fn default_chunk_spec(&self, lattice: &Lattice, axes: &[AxisSpec]) -> ChunkSpec {
        let Some(chunk) = self.default_chunk else {
            return ChunkSpec::new();
        };
        axes.iter()
            .filter(|axis| lattice.is_dim(&axis.name))
            .map(|axis| (axis.name.clone(), chunk.min(axis.size).max(1)))
            .collect()
    }
}

/// A lattice definition file.
///
/// ```yaml
/// dims: {t: 8, x: 4, y: 4, z: 4}
/// dofs: {spin: 4, color: 3}
/// aliases:
///   gauge_dofs: [color]
/// dtype: complex64
/// field_types:
///   clover: [dims, spin, spin, color, color]
/// ```
///
/// Omitted `dofs` and `aliases` keep the lattice defaults; an omitted
/// `dtype` falls back to [`LayoutConfig::default_dtype`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeConfig {
    #[serde(with = "ordered_axes")]
    pub dims: Vec<AxisSpec>,

    #[serde(default, with = "optional_ordered_axes", skip_serializing_if = "Option::is_none")]
    pub dofs: Option<Vec<AxisSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<BTreeMap<String, FieldTypeDescriptor>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<DType>,

    /// Field types added to the standard catalog.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_types: BTreeMap<String, FieldTypeDescriptor>,
}

impl LatticeConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FieldError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml_str(&content)?;
        debug!(path = %path.display(), dims = config.dims.len(), "Loaded lattice config");
        Ok(config)
    }

    /// Build the lattice and the field-type catalog it defines.
    pub fn build(&self, layout: &LayoutConfig) -> Result<(Lattice, FieldTypeCatalog)> {
        let mut lattice = Lattice::new(self.dims.iter().cloned())?;
        if let Some(dofs) = &self.dofs {
            lattice = lattice.with_dofs(dofs.iter().cloned())?;
        }
        if let Some(aliases) = &self.aliases {
            lattice = lattice.without_aliases();
            for (name, descriptor) in aliases {
                lattice = lattice.with_alias(name.clone(), descriptor.clone())?;
            }
        }
        lattice = lattice.with_dtype(self.dtype.unwrap_or(layout.default_dtype));

        let mut catalog = FieldTypeCatalog::standard();
        for (name, descriptor) in &self.field_types {
            if lattice.contains(name) {
                return Err(FieldError::invalid_lattice(format!(
                    "field type '{name}' is already defined by the lattice"
                )));
            }
            catalog.insert(name.clone(), descriptor.clone());
        }
        Ok((lattice, catalog))
    }
}

/// Read and build a lattice definition file.
pub fn load_lattice_config(
    path: impl AsRef<Path>,
    layout: &LayoutConfig,
) -> Result<(Lattice, FieldTypeCatalog)> {
    LatticeConfig::load(path)?.build(layout)
}

/// Ordered `name: size` mappings.
mod ordered_axes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::{Map, Value};

    use crate::types::AxisSpec;

    pub fn serialize<S: Serializer>(axes: &[AxisSpec], serializer: S) -> Result<S::Ok, S::Error> {
        to_map(axes).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<AxisSpec>, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        from_map(map).map_err(D::Error::custom)
    }

    pub(super) fn to_map(axes: &[AxisSpec]) -> Map<String, Value> {
        axes.iter()
            .map(|axis| (axis.name.clone(), Value::from(axis.size)))
            .collect()
    }

    pub(super) fn from_map(map: Map<String, Value>) -> Result<Vec<AxisSpec>, String> {
        map.into_iter()
            .map(|(name, value)| match value.as_u64() {
                Some(size) => Ok(AxisSpec::new(name, size as usize)),
                None => Err(format!(
                    "size of axis '{name}' must be a non-negative integer"
                )),
            })
            .collect()
    }
}

mod optional_ordered_axes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::{Map, Value};

    use super::ordered_axes::{from_map, to_map};
    use crate::types::AxisSpec;

    pub fn serialize<S: Serializer>(
        axes: &Option<Vec<AxisSpec>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        axes.as_deref().map(to_map).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<AxisSpec>>, D::Error> {
        Option::<Map<String, Value>>::deserialize(deserializer)?
            .map(from_map)
            .transpose()
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::expand;

    const LATTICE_YAML: &str = r#"
dims: {t: 8, x: 4, y: 4, z: 4}
dofs:
  spin: 4
  color: 3
dtype: complex64
field_types:
  clover: [dims, spin, spin, color, color]
"#;

    #[test]
    fn test_layout_defaults() {
        let config = LayoutConfig::default();
        assert_eq!(config.max_order_candidates, 64);
        assert_eq!(config.default_dtype, DType::Complex128);
        assert!(config.validate().is_ok());

        let bad = LayoutConfig {
            default_chunk: Some(0),
            ..LayoutConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_default_chunk_spec() {
        let lattice = Lattice::new([("t", 8), ("x", 2)]).unwrap();
        let axes = vec![
            AxisSpec::new("t", 8),
            AxisSpec::new("x", 2),
            AxisSpec::new("color", 3),
        ];
        let config = LayoutConfig {
            default_chunk: Some(4),
            ..LayoutConfig::default()
        };
        let spec = config.default_chunk_spec(&lattice, &axes);
        assert_eq!(
            spec.entries(),
            &[("t".to_string(), 4), ("x".to_string(), 2)]
        );
        assert!(LayoutConfig::default()
            .default_chunk_spec(&lattice, &axes)
            .is_empty());
    }

    #[test]
    fn test_parse_lattice_yaml_keeps_order() {
        let config = LatticeConfig::from_yaml_str(LATTICE_YAML).unwrap();
        let names: Vec<&str> = config.dims.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["t", "x", "y", "z"]);
        assert_eq!(config.dtype, Some(DType::Complex64));
        assert!(config.aliases.is_none());
    }

    #[test]
    fn test_build_lattice_and_catalog() {
        let config = LatticeConfig::from_yaml_str(LATTICE_YAML).unwrap();
        let (lattice, catalog) = config.build(&LayoutConfig::default()).unwrap();
        assert_eq!(lattice.volume(), 512);
        assert_eq!(lattice.dtype(), DType::Complex64);
        assert!(catalog.contains("gauge_links"));

        let axes = expand(&"clover".into(), &lattice, &catalog).unwrap();
        assert_eq!(axes.len(), 8);
        assert_eq!(axes[4], AxisSpec::new("spin", 4));
    }

    #[test]
    fn test_dtype_falls_back_to_layout_default() {
        let config = LatticeConfig::from_yaml_str("dims: {x: 4}").unwrap();
        let layout = LayoutConfig {
            default_dtype: DType::Float64,
            ..LayoutConfig::default()
        };
        let (lattice, _) = config.build(&layout).unwrap();
        assert_eq!(lattice.dtype(), DType::Float64);
        assert!(lattice.contains("gauge_dofs"));
    }

    #[test]
    fn test_invalid_configs() {
        assert!(LatticeConfig::from_yaml_str("dims: {x: -1}").is_err());
        assert!(LatticeConfig::from_yaml_str("dofs: {spin: 4}").is_err());

        let zero = LatticeConfig::from_yaml_str("dims: {x: 0}").unwrap();
        assert!(matches!(
            zero.build(&LayoutConfig::default()),
            Err(FieldError::InvalidLattice(_))
        ));

        let shadowing = LatticeConfig::from_yaml_str("dims: {x: 4}\nfield_types:\n  x: [dims]").unwrap();
        assert!(matches!(
            shadowing.build(&LayoutConfig::default()),
            Err(FieldError::InvalidLattice(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lattice.yaml");
        std::fs::write(&path, LATTICE_YAML).unwrap();

        let (lattice, _) = load_lattice_config(&path, &LayoutConfig::default()).unwrap();
        assert_eq!(lattice.n_dims(), 4);

        assert!(matches!(
            load_lattice_config(dir.path().join("missing.yaml"), &LayoutConfig::default()),
            Err(FieldError::Config(_))
        ));
    }
}
