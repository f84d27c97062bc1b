//! Common test fixtures for lattice-field tests.
//!
//! This module provides pre-defined lattices, field types and axes orders
//! that show up across the test suite.

/// Lattice definition files (YAML).
pub mod lattices {
    /// A small 4D lattice with the default degrees of freedom.
    pub const SMALL_4D: &str = r#"
dims:
  t: 4
  x: 2
  y: 2
  z: 2
"#;

    /// A 4D lattice with one extra dimension of extent one, for squeezing.
    pub const WITH_UNIT_DIM: &str = r#"
dims:
  t: 4
  x: 2
  y: 1
  z: 2
dofs:
  spin: 4
  color: 3
"#;

    /// A 2D lattice with SU(2) color, single precision and custom field types.
    pub const SU2_2D: &str = r#"
dims: {t: 6, x: 3}
dofs: {spin: 2, color: 2}
aliases:
  gauge_dofs: [color]
  link_dirs: {mu: 2}
dtype: complex64
field_types:
  clover: [dims, spin, spin, color, color]
  plaquette: [dims, link_dirs, link_dirs]
"#;

    /// Rejected: an axis of extent zero.
    pub const ZERO_EXTENT: &str = "dims: {t: 4, x: 0}\n";

    /// Rejected: a negative extent.
    pub const NEGATIVE_EXTENT: &str = "dims: {t: -4}\n";

    /// Rejected: a dof reuses a dimension name.
    pub const DUPLICATE_NAME: &str = "dims: {t: 4, x: 2}\ndofs: {x: 3}\n";
}

/// Dimensions of the lattices above, as `(name, extent)` pairs.
pub mod dims {
    pub const SMALL_4D: [(&str, usize); 4] = [("t", 4), ("x", 2), ("y", 2), ("z", 2)];

    pub const WITH_UNIT_DIM: [(&str, usize); 4] = [("t", 4), ("x", 2), ("y", 1), ("z", 2)];
}

/// Names of the standard field types.
pub mod field_types {
    pub const SCALAR: &str = "scalar";
    pub const VECTOR: &str = "vector";
    pub const PROPAGATOR: &str = "propagator";
    pub const GAUGE: &str = "gauge";
    pub const GAUGE_LINKS: &str = "gauge_links";

    pub const ALL: [&str; 5] = [SCALAR, VECTOR, PROPAGATOR, GAUGE, GAUGE_LINKS];
}

/// Axes orders on the small 4D lattice.
pub mod orders {
    /// Expansion order of a vector field.
    pub const VECTOR: [&str; 6] = ["t", "x", "y", "z", "spin", "color"];

    /// Dofs-first order of a vector field.
    pub const VECTOR_DOFS_FIRST: [&str; 6] = ["spin", "color", "t", "x", "y", "z"];

    /// Expansion order of a gauge link field.
    pub const GAUGE_LINKS: [&str; 7] = ["t", "x", "y", "z", "color", "color", "n_dims"];

    /// Gauge link order with the color occurrences split apart.
    pub const GAUGE_LINKS_SPLIT_COLOR: [&str; 7] =
        ["color", "t", "x", "n_dims", "y", "z", "color"];
}
