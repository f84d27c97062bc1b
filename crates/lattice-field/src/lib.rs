//! Axis-Order Algebra for Lattice Fields
//!
//! This crate maps the logical axes of lattice QCD fields (space-time
//! dimensions, spin, color, ...) onto a physical array layout. It enables:
//!
//! - **Type expansion**: symbolic field types such as `gauge_links` resolve
//!   to ordered `(axis, size)` lists against a lattice
//! - **Tunable layouts**: any permutation of the axis multiset is a legal
//!   axes order; chunking and worker counts follow from it
//! - **Repeated axes**: a gauge matrix carries `color` twice, and the
//!   occurrences are tracked by rank through every transform
//! - **Pluggable storage**: the array work is delegated to an
//!   [`ArrayBackend`], eager (`ndarray`) or lazy (recorded graph)
//!
//! # Architecture
//!
//! ```text
//! FieldTypeDescriptor ──► expand() ──► [AxisSpec]
//!                                           │
//!            AxesOrder + ChunkSpec ─────────┤
//!                                           ▼
//!                            shape() / chunks() / num_workers()
//!                                           │
//!                                           ▼
//!      Field::{getitem, setitem, squeeze, rechunk, reorder, roll, transpose}
//!                                           │
//!                                           ▼
//!                                    ArrayBackend
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lattice_field::{Field, Lattice, NdArrayBackend};
//!
//! let lattice = Lattice::new([("t", 8), ("x", 4), ("y", 4), ("z", 4)])?;
//! let field = Field::builder()
//!     .lattice(lattice)?
//!     .field_type("gauge_links")?
//!     .build(Arc::new(NdArrayBackend::<f64>::new()))?;
//!
//! let reordered = field.reorder(&["color", "color", "n_dims", "t", "x", "y", "z"])?;
//! let swapped = reordered.transpose("color", &[1, 0], None)?;
//! ```

pub mod backend;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod expand;
pub mod field;
pub mod lattice;
pub mod layout;
pub mod occurrence;
pub mod transform;
pub mod tunable;
pub mod types;

// Re-export commonly used types at crate root
pub use backend::{ArrayBackend, GraphBackend, GraphNode, GraphOp, LazyArray, NdArrayBackend, NodeId};
pub use config::{load_lattice_config, LatticeConfig, LayoutConfig};
pub use descriptor::{FieldTypeCatalog, FieldTypeDescriptor};
pub use error::{FieldError, Result};
pub use expand::{expand, is_known};
pub use field::{Field, FieldBuilder};
pub use lattice::{Lattice, Lookup, Resolved};
pub use layout::{chunks, num_workers, shape};
pub use occurrence::{default_sub_orders, recombine, split};
pub use transform::{RollPlan, SqueezePlan};
pub use tunable::{Permutation, PermutationIter};
pub use types::{AxesOrder, AxisIndex, AxisKey, AxisName, AxisSpec, ChunkSpec, DType, SubOrders};
