//! Shape and chunk algebra.
//!
//! Axis names may repeat, so every derivation walks the axes order and
//! consumes the first not-yet-used entry with the requested name. Each
//! occurrence is matched exactly once, which is what makes the order and
//! the expanded axes interchangeable as multisets.

use crate::error::{FieldError, Result};
use crate::types::{name_counts, AxisSpec, ChunkSpec};

/// Concrete sizes of `axes` laid out in `axes_order`.
pub fn shape<S: AsRef<str>>(axes: &[AxisSpec], axes_order: &[S]) -> Result<Vec<usize>> {
    let mut remaining: Vec<&AxisSpec> = axes.iter().collect();
    let mut shape = Vec::with_capacity(axes_order.len());

    for name in axes_order {
        let name = name.as_ref();
        let idx = remaining
            .iter()
            .position(|axis| axis.name == name)
            .ok_or_else(|| mismatch(axes, axes_order))?;
        shape.push(remaining.remove(idx).size);
    }

    if !remaining.is_empty() {
        return Err(mismatch(axes, axes_order));
    }
    Ok(shape)
}

/// Chunk sizes of `axes` laid out in `axes_order`.
///
/// An explicit entry of `chunk_spec` wins for the occurrence it is matched
/// to; other occurrences are stored in one chunk of their full extent.
pub fn chunks<S: AsRef<str>>(
    axes: &[AxisSpec],
    chunk_spec: &ChunkSpec,
    axes_order: &[S],
) -> Result<Vec<usize>> {
    validate_chunk_spec(axes, chunk_spec)?;

    let mut remaining: Vec<&AxisSpec> = axes.iter().collect();
    let mut requested: Vec<&(String, usize)> = chunk_spec.entries().iter().collect();
    let mut chunks = Vec::with_capacity(axes_order.len());

    for name in axes_order {
        let name = name.as_ref();
        let idx = remaining
            .iter()
            .position(|axis| axis.name == name)
            .ok_or_else(|| mismatch(axes, axes_order))?;
        let full = remaining.remove(idx).size;

        match requested.iter().position(|(key, _)| key == name) {
            Some(c) => chunks.push(requested.remove(c).1),
            None => chunks.push(full),
        }
    }

    if !remaining.is_empty() {
        return Err(mismatch(axes, axes_order));
    }
    Ok(chunks)
}

/// Check a chunk spec against the axes of a field.
///
/// Every key must name an axis, at most once per occurrence, and every
/// chunk size must be positive.
pub fn validate_chunk_spec(axes: &[AxisSpec], chunk_spec: &ChunkSpec) -> Result<()> {
    let names: Vec<&str> = axes.iter().map(|a| a.name.as_str()).collect();
    let available = name_counts(&names);

    for (name, count) in name_counts(&chunk_spec.names()) {
        if available.get(name).copied().unwrap_or(0) < count {
            return Err(FieldError::ChunkKey(name.to_string()));
        }
    }
    if let Some((name, _)) = chunk_spec.entries().iter().find(|(_, size)| *size == 0) {
        return Err(FieldError::invalid_params(
            "chunks",
            format!("chunk size of axis '{name}' must be positive"),
        ));
    }
    Ok(())
}

/// Number of chunks, i.e. parallel work units, implied by a layout.
pub fn num_workers(shape: &[usize], chunks: &[usize]) -> Result<usize> {
    if shape.len() != chunks.len() {
        return Err(FieldError::invalid_params(
            "num_workers",
            format!(
                "shape has {} axes but chunks has {}",
                shape.len(),
                chunks.len()
            ),
        ));
    }
    if chunks.contains(&0) {
        return Err(FieldError::invalid_params(
            "num_workers",
            "chunk sizes must be positive",
        ));
    }
    Ok(shape
        .iter()
        .zip(chunks)
        .map(|(extent, chunk)| extent.div_ceil(*chunk))
        .product())
}

fn mismatch<S: AsRef<str>>(axes: &[AxisSpec], axes_order: &[S]) -> FieldError {
    let expected: Vec<&str> = axes.iter().map(|a| a.name.as_str()).collect();
    FieldError::axis_mismatch(expected.as_slice(), axes_order)
}
