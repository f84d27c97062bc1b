//! Expansion of field-type descriptors into ordered axis lists.

use tracing::trace;

use crate::descriptor::{FieldTypeCatalog, FieldTypeDescriptor};
use crate::error::{FieldError, Result};
use crate::lattice::{Lattice, Lookup, Resolved};
use crate::types::AxisSpec;

/// Nesting limit for descriptor resolution; deeper chains are cyclic.
const MAX_DEPTH: usize = 64;

/// Resolve a descriptor into its ordered list of axes.
///
/// Names are looked up in the lattice first and in the field-type catalog
/// second. Expansion is pure: the same inputs always give the same axes.
pub fn expand(
    descriptor: &FieldTypeDescriptor,
    lattice: &Lattice,
    catalog: &FieldTypeCatalog,
) -> Result<Vec<AxisSpec>> {
    let mut axes = Vec::new();
    expand_into(descriptor, lattice, catalog, 0, &mut axes)?;
    trace!(descriptor = %descriptor, axes = axes.len(), "Expanded field type");
    Ok(axes)
}

/// Check that every name in the descriptor resolves.
pub fn is_known(
    descriptor: &FieldTypeDescriptor,
    lattice: &Lattice,
    catalog: &FieldTypeCatalog,
) -> bool {
    expand(descriptor, lattice, catalog).is_ok()
}

fn expand_into(
    descriptor: &FieldTypeDescriptor,
    lattice: &Lattice,
    catalog: &FieldTypeCatalog,
    depth: usize,
    out: &mut Vec<AxisSpec>,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(FieldError::unknown_axis(format!(
            "{descriptor} (cyclic field type definition)"
        )));
    }

    match descriptor {
        FieldTypeDescriptor::List(items) => {
            for item in items {
                expand_into(item, lattice, catalog, depth + 1, out)?;
            }
        }
        FieldTypeDescriptor::Sizes(axes) => {
            if let Some(axis) = axes.iter().find(|axis| axis.size == 0) {
                return Err(FieldError::invalid_params(
                    "expand",
                    format!("axis '{}' has zero extent", axis.name),
                ));
            }
            out.extend(axes.iter().cloned())
        }
        FieldTypeDescriptor::Name(name) => {
            let resolved = match lattice.lookup(name) {
                Lookup::Found(resolved) => resolved,
                Lookup::NotFound => match catalog.get(name) {
                    Some(sub) => Resolved::Descriptor(sub.clone()),
                    None => return Err(FieldError::unknown_axis(name.clone())),
                },
            };
            match resolved {
                Resolved::Size(size) => out.push(AxisSpec::new(name.clone(), size)),
                Resolved::Descriptor(sub) => {
                    expand_into(&sub, lattice, catalog, depth + 1, out)?
                }
            }
        }
    }
    Ok(())
}
