//! JSON layout reports.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use lattice_field::{
    AxesOrder, AxisSpec, DType, Field, FieldBuilder, FieldTypeDescriptor, GraphBackend, SubOrders,
};

/// Layout summary of one field.
#[derive(Debug, Serialize)]
pub struct LayoutReport {
    pub field_type: FieldTypeDescriptor,
    pub axes: Vec<AxisSpec>,
    pub axes_order: AxesOrder,
    pub shape: Vec<usize>,
    pub chunks: Vec<usize>,
    pub num_workers: usize,
    pub size: usize,
    pub byte_size: usize,
    pub dtype: DType,
    #[serde(skip_serializing_if = "SubOrders::is_empty")]
    pub sub_orders: SubOrders,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Candidate>>,
}

/// One alternative axes order and the layout it gives.
#[derive(Debug, Serialize)]
pub struct Candidate {
    pub axes_order: AxesOrder,
    pub shape: Vec<usize>,
    pub chunks: Vec<usize>,
    pub num_workers: usize,
}

impl LayoutReport {
    pub fn from_field(field: &Field<GraphBackend>) -> Result<Self> {
        Ok(Self {
            field_type: field.field_type().clone(),
            axes: field.axes().to_vec(),
            axes_order: field.axes_order().clone(),
            shape: field.shape().to_vec(),
            chunks: field.chunk_shape().to_vec(),
            num_workers: field.num_workers()?,
            size: field.size(),
            byte_size: field.byte_size(),
            dtype: field.dtype(),
            sub_orders: field.sub_orders().clone(),
            candidates: None,
        })
    }

    /// Attach the first `limit` legal axes orders of the field.
    pub fn with_candidates(mut self, field: &Field<GraphBackend>, limit: usize) -> Result<Self> {
        // Candidates are laid out on a scratch graph so the report's own
        // field stays a single node.
        let scratch = Arc::new(GraphBackend::new());
        let mut candidates = Vec::with_capacity(limit);

        for order in field.axes_order_options().candidates(limit) {
            let candidate = FieldBuilder::from_field(field)
                .axes_order(order)
                .build(Arc::clone(&scratch))?;
            candidates.push(Candidate {
                axes_order: candidate.axes_order().clone(),
                shape: candidate.shape().to_vec(),
                chunks: candidate.chunk_shape().to_vec(),
                num_workers: candidate.num_workers()?,
            });
        }

        debug!(count = candidates.len(), "Enumerated candidate orders");
        self.candidates = Some(candidates);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_field::{ChunkSpec, Lattice};
    use test_utils::{dims, field_types};

    fn field() -> Field<GraphBackend> {
        Field::builder()
            .lattice(Lattice::new(dims::SMALL_4D).unwrap())
            .unwrap()
            .field_type(field_types::GAUGE)
            .unwrap()
            .chunks(ChunkSpec::new().with("t", 2))
            .build(Arc::new(GraphBackend::new()))
            .unwrap()
    }

    #[test]
    fn test_report_fields() {
        let report = LayoutReport::from_field(&field()).unwrap();
        assert_eq!(report.shape, vec![4, 2, 2, 2, 3, 3]);
        assert_eq!(report.chunks, vec![2, 2, 2, 2, 3, 3]);
        assert_eq!(report.num_workers, 2);
        assert_eq!(report.size, 288);
        assert!(report.candidates.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["dtype"], "complex128");
        assert_eq!(json["axes_order"][4], "color");
        assert_eq!(json["sub_orders"]["color"][1], 1);
    }

    #[test]
    fn test_candidates() {
        let field = field();
        let report = LayoutReport::from_field(&field)
            .unwrap()
            .with_candidates(&field, 5)
            .unwrap();
        let candidates = report.candidates.unwrap();
        assert_eq!(candidates.len(), 5);
        assert!(candidates.iter().all(|c| c.num_workers == 2));
        assert_eq!(
            candidates[0].axes_order,
            AxesOrder::new(["color", "color", "t", "x", "y", "z"])
        );
        assert_eq!(field.backend().len().unwrap(), 1);
    }
}
