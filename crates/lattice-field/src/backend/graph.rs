//! Lazy backend recording a computation graph.
//!
//! Nothing is computed here. Every operation appends a [`GraphNode`] with
//! the inferred shape and chunks of its output, and returns a [`LazyArray`]
//! pointing at it. Evaluating the graph is left to an external scheduler.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{check_broadcast, check_permutation, check_roll, check_selection, check_squeeze};
use super::ArrayBackend;
use crate::error::{FieldError, Result};
use crate::layout::num_workers;
use crate::transform::selected_shape;
use crate::types::{AxisIndex, DType};

pub type NodeId = usize;

/// Operation recorded by a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GraphOp {
    Zeros { dtype: DType },
    /// Externally provided data.
    Source,
    Transpose { axes: Vec<usize> },
    Squeeze { axes: Vec<usize> },
    Rechunk { chunks: Vec<usize> },
    Roll { shifts: Vec<isize>, axes: Vec<usize> },
    GetItem { selection: Vec<AxisIndex> },
    /// Inputs are the target and the assigned value.
    SetItem { selection: Vec<AxisIndex> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub op: GraphOp,
    pub inputs: Vec<NodeId>,
    pub shape: Vec<usize>,
    pub chunks: Vec<usize>,
}

impl GraphNode {
    /// Number of chunks a scheduler would process for this node.
    pub fn num_workers(&self) -> Result<usize> {
        num_workers(&self.shape, &self.chunks)
    }
}

/// Handle to the output of a graph node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LazyArray {
    id: NodeId,
    shape: Vec<usize>,
    chunks: Vec<usize>,
}

impl LazyArray {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn chunks(&self) -> &[usize] {
        &self.chunks
    }
}

/// Backend whose arrays are nodes of a recorded graph.
#[derive(Debug, Default)]
pub struct GraphBackend {
    nodes: Mutex<Vec<GraphNode>>,
}

impl GraphBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register externally provided data of the given layout.
    pub fn source(&self, shape: &[usize], chunks: &[usize]) -> Result<LazyArray> {
        check_chunks(shape, chunks)?;
        self.push(GraphOp::Source, Vec::new(), shape.to_vec(), chunks.to_vec())
    }

    /// Snapshot of every recorded node, in creation order.
    pub fn nodes(&self) -> Result<Vec<GraphNode>> {
        Ok(self.lock()?.clone())
    }

    pub fn node(&self, id: NodeId) -> Result<Option<GraphNode>> {
        Ok(self.lock()?.get(id).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<GraphNode>>> {
        self.nodes
            .lock()
            .map_err(|_| FieldError::backend("graph lock poisoned"))
    }

    fn push(
        &self,
        op: GraphOp,
        inputs: Vec<NodeId>,
        shape: Vec<usize>,
        chunks: Vec<usize>,
    ) -> Result<LazyArray> {
        let mut nodes = self.lock()?;
        let id = nodes.len();
        trace!(id, op = ?op, shape = ?shape, "Recording graph node");
        nodes.push(GraphNode {
            id,
            op,
            inputs,
            shape: shape.clone(),
            chunks: chunks.clone(),
        });
        Ok(LazyArray { id, shape, chunks })
    }
}

fn check_chunks(shape: &[usize], chunks: &[usize]) -> Result<()> {
    if shape.len() != chunks.len() || chunks.contains(&0) {
        return Err(FieldError::backend(format!(
            "chunks {chunks:?} do not fit shape {shape:?}"
        )));
    }
    Ok(())
}

impl ArrayBackend for GraphBackend {
    type Array = LazyArray;

    fn name(&self) -> &str {
        "graph"
    }

    fn zeros(&self, shape: &[usize], chunks: &[usize], dtype: DType) -> Result<Self::Array> {
        check_chunks(shape, chunks)?;
        self.push(
            GraphOp::Zeros { dtype },
            Vec::new(),
            shape.to_vec(),
            chunks.to_vec(),
        )
    }

    fn shape(&self, array: &Self::Array) -> Vec<usize> {
        array.shape.clone()
    }

    fn transpose(&self, array: &Self::Array, axes: &[usize]) -> Result<Self::Array> {
        check_permutation(axes, array.shape.len())?;
        let shape = axes.iter().map(|&a| array.shape[a]).collect();
        let chunks = axes.iter().map(|&a| array.chunks[a]).collect();
        self.push(
            GraphOp::Transpose {
                axes: axes.to_vec(),
            },
            vec![array.id],
            shape,
            chunks,
        )
    }

    fn squeeze(&self, array: &Self::Array, axes: &[usize]) -> Result<Self::Array> {
        check_squeeze(axes, &array.shape)?;
        let keep = |(i, _): &(usize, &usize)| !axes.contains(i);
        let shape = array.shape.iter().enumerate().filter(keep).map(|(_, s)| *s).collect();
        let chunks = array.chunks.iter().enumerate().filter(keep).map(|(_, c)| *c).collect();
        self.push(
            GraphOp::Squeeze {
                axes: axes.to_vec(),
            },
            vec![array.id],
            shape,
            chunks,
        )
    }

    fn rechunk(&self, array: &Self::Array, chunks: &[usize]) -> Result<Self::Array> {
        check_chunks(&array.shape, chunks)?;
        self.push(
            GraphOp::Rechunk {
                chunks: chunks.to_vec(),
            },
            vec![array.id],
            array.shape.clone(),
            chunks.to_vec(),
        )
    }

    fn roll(&self, array: &Self::Array, shifts: &[isize], axes: &[usize]) -> Result<Self::Array> {
        check_roll(shifts, axes, array.shape.len())?;
        self.push(
            GraphOp::Roll {
                shifts: shifts.to_vec(),
                axes: axes.to_vec(),
            },
            vec![array.id],
            array.shape.clone(),
            array.chunks.clone(),
        )
    }

    fn get(&self, array: &Self::Array, selection: &[AxisIndex]) -> Result<Self::Array> {
        check_selection(selection, &array.shape)?;
        let shape = selected_shape(&array.shape, selection);
        let chunks = selection
            .iter()
            .zip(&array.chunks)
            .filter(|(index, _)| !index.drops_axis())
            .zip(&shape)
            .map(|((_, chunk), len)| (*chunk).min(*len).max(1))
            .collect();
        self.push(
            GraphOp::GetItem {
                selection: selection.to_vec(),
            },
            vec![array.id],
            shape,
            chunks,
        )
    }

    fn set(
        &self,
        array: &mut Self::Array,
        selection: &[AxisIndex],
        value: &Self::Array,
    ) -> Result<()> {
        check_selection(selection, &array.shape)?;
        check_broadcast(&value.shape, &selected_shape(&array.shape, selection))?;
        let updated = self.push(
            GraphOp::SetItem {
                selection: selection.to_vec(),
            },
            vec![array.id, value.id],
            array.shape.clone(),
            array.chunks.clone(),
        )?;
        *array = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_zeros_records_node() {
        let backend = GraphBackend::new();
        let array = backend.zeros(&[8, 8], &[4, 4], DType::Complex128).unwrap();
        assert_eq!(array.id(), 0);
        assert_eq!(backend.len().unwrap(), 1);

        let node = backend.node(0).unwrap().unwrap();
        assert_eq!(node.op, GraphOp::Zeros { dtype: DType::Complex128 });
        assert!(node.inputs.is_empty());
        assert_eq!(node.num_workers().unwrap(), 4);
    }

    #[test]
    fn test_shape_inference() {
        let backend = GraphBackend::new();
        let array = backend.source(&[4, 1, 3], &[2, 1, 3]).unwrap();

        let t = backend.transpose(&array, &[2, 0, 1]).unwrap();
        assert_eq!(t.shape(), &[3, 4, 1]);
        assert_eq!(t.chunks(), &[3, 2, 1]);

        let s = backend.squeeze(&array, &[1]).unwrap();
        assert_eq!(s.shape(), &[4, 3]);
        assert_eq!(s.chunks(), &[2, 3]);

        let r = backend.rechunk(&array, &[4, 1, 1]).unwrap();
        assert_eq!(r.shape(), array.shape());
        assert_eq!(r.chunks(), &[4, 1, 1]);

        let g = backend
            .get(
                &array,
                &[AxisIndex::range(0..1), AxisIndex::Index(0), AxisIndex::Full],
            )
            .unwrap();
        assert_eq!(g.shape(), &[1, 3]);
        assert_eq!(g.chunks(), &[1, 3]);

        let node = backend.node(g.id()).unwrap().unwrap();
        assert_eq!(node.inputs, vec![array.id()]);
    }

    #[test]
    fn test_setitem_replaces_handle() {
        let backend = GraphBackend::new();
        let mut target = backend.zeros(&[4, 3], &[4, 3], DType::Float64).unwrap();
        let value = backend.source(&[3], &[3]).unwrap();
        let before = target.id();

        backend
            .set(&mut target, &[AxisIndex::Index(1), AxisIndex::Full], &value)
            .unwrap();
        assert_ne!(target.id(), before);
        assert_eq!(target.shape(), &[4, 3]);

        let node = backend.node(target.id()).unwrap().unwrap();
        assert_eq!(node.inputs, vec![before, value.id()]);
    }

    #[test]
    fn test_invalid_operations_record_nothing() {
        let backend = GraphBackend::new();
        let array = backend.source(&[4, 3], &[2, 3]).unwrap();
        assert!(backend.transpose(&array, &[0]).is_err());
        assert!(backend.squeeze(&array, &[0]).is_err());
        assert!(backend.rechunk(&array, &[0, 3]).is_err());
        assert!(backend.roll(&array, &[1], &[2]).is_err());
        assert_eq!(backend.len().unwrap(), 1);
    }

    #[test]
    fn test_poisoned_graph_reports_error() {
        let backend = Arc::new(GraphBackend::new());
        backend.source(&[2], &[2]).unwrap();

        let shared = Arc::clone(&backend);
        let _ = std::thread::spawn(move || {
            let _guard = shared.nodes.lock().unwrap();
            panic!("writer died holding the graph");
        })
        .join();

        assert!(matches!(backend.len(), Err(FieldError::Backend(_))));
        assert!(matches!(backend.is_empty(), Err(FieldError::Backend(_))));
        assert!(backend.nodes().is_err());
    }
}
