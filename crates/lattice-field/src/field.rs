//! Lattice fields: typed arrays with a tunable physical layout.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::backend::ArrayBackend;
use crate::descriptor::{FieldTypeCatalog, FieldTypeDescriptor};
use crate::error::{FieldError, Result};
use crate::expand::expand;
use crate::lattice::Lattice;
use crate::layout;
use crate::occurrence::{default_sub_orders, split};
use crate::transform::{
    reorder_permutation, roll_plan, selection, squeeze_plan, transpose_permutation,
};
use crate::tunable::Permutation;
use crate::types::{AxesOrder, AxisIndex, AxisKey, AxisName, AxisSpec, ChunkSpec, DType, SubOrders};

/// A field living on a lattice.
///
/// The field type and lattice are fixed at construction. The axes order,
/// chunking and sub-orders of repeated axes describe the physical layout of
/// the backing array and change through the transform methods, each of
/// which returns a new field sharing the lattice and backend.
pub struct Field<B: ArrayBackend> {
    lattice: Arc<Lattice>,
    catalog: Arc<FieldTypeCatalog>,
    field_type: FieldTypeDescriptor,
    axes: Vec<AxisSpec>,
    axes_order: AxesOrder,
    chunk_spec: ChunkSpec,
    sub_orders: SubOrders,
    shape: Vec<usize>,
    chunk_shape: Vec<usize>,
    array: B::Array,
    backend: Arc<B>,
}

impl<B: ArrayBackend> Field<B> {
    pub fn builder() -> FieldBuilder<B> {
        FieldBuilder::new()
    }

    pub fn lattice(&self) -> &Arc<Lattice> {
        &self.lattice
    }

    pub fn catalog(&self) -> &Arc<FieldTypeCatalog> {
        &self.catalog
    }

    pub fn field_type(&self) -> &FieldTypeDescriptor {
        &self.field_type
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Expanded axes, in expansion order.
    pub fn axes(&self) -> &[AxisSpec] {
        &self.axes
    }

    pub fn axes_order(&self) -> &AxesOrder {
        &self.axes_order
    }

    pub fn chunk_spec(&self) -> &ChunkSpec {
        &self.chunk_spec
    }

    pub fn sub_orders(&self) -> &SubOrders {
        &self.sub_orders
    }

    /// Extents in the current axes order.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Chunk sizes in the current axes order.
    pub fn chunk_shape(&self) -> &[usize] {
        &self.chunk_shape
    }

    pub fn num_workers(&self) -> Result<usize> {
        layout::num_workers(&self.shape, &self.chunk_shape)
    }

    /// Number of elements.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn byte_size(&self) -> usize {
        self.size() * self.dtype().itemsize()
    }

    pub fn dtype(&self) -> DType {
        self.lattice.dtype()
    }

    /// Axes that are lattice dimensions, in expansion order.
    pub fn dims(&self) -> Vec<&str> {
        self.axis_names_where(|name| self.lattice.is_dim(name))
    }

    /// Axes that are internal degrees of freedom, in expansion order.
    pub fn dofs(&self) -> Vec<&str> {
        self.axis_names_where(|name| self.lattice.is_dof(name))
    }

    /// The space of legal axes orders.
    pub fn axes_order_options(&self) -> Permutation {
        Permutation::new(self.axes.iter().map(|axis| axis.name.clone()))
    }

    /// Axes order with repeated axes labelled by their occurrence rank.
    pub fn indices_order(&self) -> Result<Vec<AxisKey>> {
        split(self.axes_order.as_slice(), &self.sub_orders)
    }

    pub fn array(&self) -> &B::Array {
        &self.array
    }

    pub fn into_array(self) -> B::Array {
        self.array
    }

    /// Extract the region addressed by named coordinates.
    ///
    /// Unnamed axes are taken whole; naming a repeated axis twice addresses
    /// its first and second occurrence.
    pub fn getitem<S: AsRef<str>>(&self, coords: &[(S, AxisIndex)]) -> Result<B::Array> {
        let mask = selection(&self.axes_order, &self.shape, coords)?;
        self.backend.get(&self.array, &mask)
    }

    /// Assign `value` to the region addressed by named coordinates.
    pub fn setitem<S: AsRef<str>>(
        &mut self,
        value: &B::Array,
        coords: &[(S, AxisIndex)],
    ) -> Result<()> {
        let mask = selection(&self.axes_order, &self.shape, coords)?;
        self.backend.set(&mut self.array, &mask, value)
    }

    /// Drop size-one axes so that exactly `keep_axes` remain.
    ///
    /// The result is typed by the explicit sizes of the surviving axes, in
    /// their physical order.
    pub fn squeeze<S: AsRef<str>>(&self, keep_axes: &[S]) -> Result<Self> {
        let plan = squeeze_plan(keep_axes, &self.axes_order, &self.shape)?;
        let array = self.backend.squeeze(&self.array, &plan.removed)?;

        let axes: Vec<AxisSpec> = plan
            .kept
            .iter()
            .map(|&i| AxisSpec::new(self.axes_order[i].clone(), self.shape[i]))
            .collect();
        let axes_order = AxesOrder::new(axes.iter().map(|axis| axis.name.clone()));
        let chunk_spec: ChunkSpec = plan
            .kept
            .iter()
            .filter(|&&i| self.chunk_shape[i] != self.shape[i])
            .map(|&i| (self.axes_order[i].clone(), self.chunk_shape[i]))
            .collect();

        let mut sub_orders = SubOrders::new();
        for (name, ranks) in &self.sub_orders {
            let surviving: Vec<usize> = self
                .axes_order
                .positions(name)
                .into_iter()
                .zip(ranks)
                .filter(|(pos, _)| plan.kept.contains(pos))
                .map(|(_, rank)| *rank)
                .collect();
            if surviving.len() > 1 {
                sub_orders.insert(name.clone(), dense_ranks(&surviving));
            }
        }

        debug!(removed = ?plan.removed, order = %axes_order, "Squeezed field");
        self.assemble(
            FieldTypeDescriptor::Sizes(axes.clone()),
            axes,
            axes_order,
            chunk_spec,
            sub_orders,
            array,
        )
    }

    /// Re-partition the array; the shape is unchanged.
    pub fn rechunk(&self, chunk_spec: ChunkSpec) -> Result<Self> {
        let chunks = layout::chunks(&self.axes, &chunk_spec, self.axes_order.as_slice())?;
        let array = self.backend.rechunk(&self.array, &chunks)?;
        debug!(chunks = ?chunks, "Rechunked field");
        self.relayout(
            self.axes_order.clone(),
            chunk_spec,
            self.sub_orders.clone(),
            array,
        )
    }

    /// Move to a new axes order, transposing the data.
    pub fn reorder<S: AsRef<str>>(&self, new_order: &[S]) -> Result<Self> {
        let axes = reorder_permutation(new_order, self.axes_order.as_slice())?;
        let array = self.backend.transpose(&self.array, &axes)?;
        let axes_order = AxesOrder::new(new_order.iter().map(|name| name.as_ref()));
        debug!(from = %self.axes_order, to = %axes_order, "Reordered field");
        self.relayout(
            axes_order,
            self.chunk_spec.clone(),
            self.sub_orders.clone(),
            array,
        )
    }

    /// Cyclically shift named axes.
    ///
    /// A repeated axis takes one shift per occurrence rank; `hints` gives the
    /// rank order of its occurrences and defaults to the field's sub-orders.
    pub fn roll<S: AsRef<str>>(
        &self,
        shifts: &[(S, Vec<isize>)],
        hints: &SubOrders,
    ) -> Result<Self> {
        let mut merged = self.sub_orders.clone();
        merged.extend(hints.iter().map(|(k, v)| (k.clone(), v.clone())));

        let plan = roll_plan(&self.axes_order, shifts, &merged)?;
        let array = self.backend.roll(&self.array, &plan.shifts, &plan.axes)?;
        debug!(axes = ?plan.axes, shifts = ?plan.shifts, "Rolled field");
        self.relayout(
            self.axes_order.clone(),
            self.chunk_spec.clone(),
            self.sub_orders.clone(),
            array,
        )
    }

    /// Exchange the occurrences of a repeated axis.
    ///
    /// Occurrences labelled `old_sub_order` (the current sub-order when
    /// None) are moved to where `new_sub_order` puts them. The recorded
    /// sub-order follows the occurrences, so explicit labels never rewrite
    /// which rank sits where.
    pub fn transpose(
        &self,
        axis: &str,
        new_sub_order: &[usize],
        old_sub_order: Option<&[usize]>,
    ) -> Result<Self> {
        let current = self
            .sub_orders
            .get(axis)
            .cloned()
            .unwrap_or_else(|| (0..self.axes_order.count(axis)).collect());
        let old = old_sub_order
            .map(<[usize]>::to_vec)
            .unwrap_or_else(|| current.clone());

        let axes = transpose_permutation(axis, &self.axes_order, new_sub_order, &old)?;
        let array = self.backend.transpose(&self.array, &axes)?;

        // The occurrence labelled old[p] carries rank current[p]; it lands
        // where new names the same label.
        let mut sub_orders = self.sub_orders.clone();
        if new_sub_order.len() > 1 {
            let moved: Vec<usize> = new_sub_order
                .iter()
                .filter_map(|label| old.iter().position(|o| o == label))
                .map(|p| current[p])
                .collect();
            sub_orders.insert(axis.to_string(), moved);
        }
        debug!(axis, new = ?new_sub_order, old = ?old, "Transposed field");
        self.relayout(
            self.axes_order.clone(),
            self.chunk_spec.clone(),
            sub_orders,
            array,
        )
    }

    fn axis_names_where(&self, pred: impl Fn(&str) -> bool) -> Vec<&str> {
        self.axes
            .iter()
            .map(|axis| axis.name.as_str())
            .filter(|name| pred(name))
            .collect()
    }

    fn relayout(
        &self,
        axes_order: AxesOrder,
        chunk_spec: ChunkSpec,
        sub_orders: SubOrders,
        array: B::Array,
    ) -> Result<Self> {
        self.assemble(
            self.field_type.clone(),
            self.axes.clone(),
            axes_order,
            chunk_spec,
            sub_orders,
            array,
        )
    }

    fn assemble(
        &self,
        field_type: FieldTypeDescriptor,
        axes: Vec<AxisSpec>,
        axes_order: AxesOrder,
        chunk_spec: ChunkSpec,
        sub_orders: SubOrders,
        array: B::Array,
    ) -> Result<Self> {
        let shape = layout::shape(&axes, axes_order.as_slice())?;
        let chunk_shape = layout::chunks(&axes, &chunk_spec, axes_order.as_slice())?;
        Ok(Self {
            lattice: Arc::clone(&self.lattice),
            catalog: Arc::clone(&self.catalog),
            field_type,
            axes,
            axes_order,
            chunk_spec,
            sub_orders,
            shape,
            chunk_shape,
            array,
            backend: Arc::clone(&self.backend),
        })
    }
}

impl<B: ArrayBackend> Clone for Field<B> {
    fn clone(&self) -> Self {
        Self {
            lattice: Arc::clone(&self.lattice),
            catalog: Arc::clone(&self.catalog),
            field_type: self.field_type.clone(),
            axes: self.axes.clone(),
            axes_order: self.axes_order.clone(),
            chunk_spec: self.chunk_spec.clone(),
            sub_orders: self.sub_orders.clone(),
            shape: self.shape.clone(),
            chunk_shape: self.chunk_shape.clone(),
            array: self.array.clone(),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: ArrayBackend> fmt::Debug for Field<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("field_type", &self.field_type)
            .field("axes_order", &self.axes_order)
            .field("shape", &self.shape)
            .field("chunk_shape", &self.chunk_shape)
            .field("sub_orders", &self.sub_orders)
            .field("dtype", &self.dtype())
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Ranks of `values` among themselves, e.g. `[7, 2, 5] -> [2, 0, 1]`.
fn dense_ranks(values: &[usize]) -> Vec<usize> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    values
        .iter()
        .map(|v| sorted.iter().position(|s| s == v).unwrap_or(0))
        .collect()
}

/// Builder for [`Field`].
///
/// The lattice and field type can be set once. Everything else has a
/// default: the standard catalog, the expansion order, full-extent chunks,
/// identity sub-orders and a zero-filled array.
pub struct FieldBuilder<B: ArrayBackend> {
    lattice: Option<Arc<Lattice>>,
    field_type: Option<FieldTypeDescriptor>,
    catalog: Option<Arc<FieldTypeCatalog>>,
    axes_order: Option<AxesOrder>,
    chunk_spec: ChunkSpec,
    sub_orders: SubOrders,
    array: Option<B::Array>,
}

impl<B: ArrayBackend> Default for FieldBuilder<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ArrayBackend> FieldBuilder<B> {
    pub fn new() -> Self {
        Self {
            lattice: None,
            field_type: None,
            catalog: None,
            axes_order: None,
            chunk_spec: ChunkSpec::new(),
            sub_orders: SubOrders::new(),
            array: None,
        }
    }

    /// Start from the type and layout of an existing field.
    ///
    /// Lattice and field type are preset and cannot be assigned again.
    pub fn from_field(field: &Field<B>) -> Self {
        Self {
            lattice: Some(Arc::clone(&field.lattice)),
            field_type: Some(field.field_type.clone()),
            catalog: Some(Arc::clone(&field.catalog)),
            axes_order: Some(field.axes_order.clone()),
            chunk_spec: field.chunk_spec.clone(),
            sub_orders: field.sub_orders.clone(),
            array: None,
        }
    }

    pub fn lattice(mut self, lattice: impl Into<Arc<Lattice>>) -> Result<Self> {
        if self.lattice.is_some() {
            return Err(FieldError::WriteOnce("lattice"));
        }
        self.lattice = Some(lattice.into());
        Ok(self)
    }

    pub fn field_type(mut self, field_type: impl Into<FieldTypeDescriptor>) -> Result<Self> {
        if self.field_type.is_some() {
            return Err(FieldError::WriteOnce("field_type"));
        }
        self.field_type = Some(field_type.into());
        Ok(self)
    }

    pub fn catalog(mut self, catalog: impl Into<Arc<FieldTypeCatalog>>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn axes_order(mut self, axes_order: impl Into<AxesOrder>) -> Self {
        self.axes_order = Some(axes_order.into());
        self
    }

    pub fn chunks(mut self, chunk_spec: ChunkSpec) -> Self {
        self.chunk_spec = chunk_spec;
        self
    }

    /// Sub-orders of repeated axes; axes not listed keep the identity.
    pub fn sub_orders(mut self, sub_orders: SubOrders) -> Self {
        self.sub_orders = sub_orders;
        self
    }

    /// Use existing data instead of allocating zeros.
    pub fn array(mut self, array: B::Array) -> Self {
        self.array = Some(array);
        self
    }

    pub fn build(self, backend: Arc<B>) -> Result<Field<B>> {
        let lattice = self
            .lattice
            .ok_or_else(|| FieldError::invalid_params("field", "a lattice is required"))?;
        let field_type = self
            .field_type
            .ok_or_else(|| FieldError::invalid_params("field", "a field type is required"))?;
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(FieldTypeCatalog::standard()));

        let axes = expand(&field_type, &lattice, &catalog)?;
        let options = Permutation::new(axes.iter().map(|axis| axis.name.clone()));
        let axes_order = match self.axes_order {
            Some(order) => options.validate(order.as_slice())?,
            None => options.default_value(),
        };

        let mut sub_orders = default_sub_orders(&axes_order);
        sub_orders.extend(self.sub_orders);
        split(axes_order.as_slice(), &sub_orders)?;

        let shape = layout::shape(&axes, axes_order.as_slice())?;
        let chunk_shape = layout::chunks(&axes, &self.chunk_spec, axes_order.as_slice())?;

        let array = match self.array {
            Some(array) => {
                let found = backend.shape(&array);
                if found != shape {
                    let expected = labelled(&axes_order, &shape);
                    let found = labelled(&axes_order, &found);
                    return Err(FieldError::axis_mismatch(
                        expected.as_slice(),
                        found.as_slice(),
                    ));
                }
                array
            }
            None => backend.zeros(&shape, &chunk_shape, lattice.dtype())?,
        };

        debug!(
            field_type = %field_type,
            order = %axes_order,
            shape = ?shape,
            backend = backend.name(),
            "Built field"
        );
        Ok(Field {
            lattice,
            catalog,
            field_type,
            axes,
            axes_order,
            chunk_spec: self.chunk_spec,
            sub_orders,
            shape,
            chunk_shape,
            array,
            backend,
        })
    }
}

/// `name:size` labels for error reports.
fn labelled(order: &[AxisName], shape: &[usize]) -> Vec<String> {
    if order.len() != shape.len() {
        return shape.iter().map(usize::to_string).collect();
    }
    order
        .iter()
        .zip(shape)
        .map(|(name, size)| format!("{name}:{size}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GraphBackend, NdArrayBackend};
    use ndarray::{ArrayD, IxDyn};

    type Dense = NdArrayBackend<f64>;

    fn lattice() -> Arc<Lattice> {
        Arc::new(Lattice::new([("t", 4), ("x", 2)]).unwrap())
    }

    fn build(field_type: &str) -> Field<Dense> {
        Field::builder()
            .lattice(lattice())
            .unwrap()
            .field_type(field_type)
            .unwrap()
            .build(Arc::new(Dense::new()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let field = build("vector");
        assert_eq!(
            field.axes_order(),
            &AxesOrder::new(["t", "x", "spin", "color"])
        );
        assert_eq!(field.shape(), &[4, 2, 4, 3]);
        assert_eq!(field.chunk_shape(), field.shape());
        assert_eq!(field.num_workers().unwrap(), 1);
        assert_eq!(field.size(), 96);
        assert_eq!(field.byte_size(), 96 * 16);
        assert_eq!(field.dims(), vec!["t", "x"]);
        assert_eq!(field.dofs(), vec!["spin", "color"]);
        assert_eq!(field.array().shape(), &[4, 2, 4, 3]);
    }

    #[test]
    fn test_write_once() {
        let builder = Field::<Dense>::builder().lattice(lattice()).unwrap();
        assert_eq!(
            builder.lattice(lattice()).err(),
            Some(FieldError::WriteOnce("lattice"))
        );

        let field = build("scalar");
        let seeded = FieldBuilder::from_field(&field);
        assert_eq!(
            seeded.field_type("vector").err(),
            Some(FieldError::WriteOnce("field_type"))
        );
    }

    #[test]
    fn test_missing_inputs() {
        let result = Field::<Dense>::builder()
            .field_type("scalar")
            .unwrap()
            .build(Arc::new(Dense::new()));
        assert!(matches!(result, Err(FieldError::ParameterValidation { .. })));

        let unknown = Field::<Dense>::builder()
            .lattice(lattice())
            .unwrap()
            .field_type("flavor")
            .unwrap()
            .build(Arc::new(Dense::new()));
        assert!(matches!(unknown, Err(FieldError::UnknownAxis(_))));
    }

    #[test]
    fn test_explicit_order_and_chunks() {
        let field = Field::<Dense>::builder()
            .lattice(lattice())
            .unwrap()
            .field_type("scalar")
            .unwrap()
            .axes_order(AxesOrder::new(["x", "t"]))
            .chunks(ChunkSpec::new().with("t", 2))
            .build(Arc::new(Dense::new()))
            .unwrap();
        assert_eq!(field.shape(), &[2, 4]);
        assert_eq!(field.chunk_shape(), &[2, 2]);
        assert_eq!(field.num_workers().unwrap(), 2);

        let bad = Field::<Dense>::builder()
            .lattice(lattice())
            .unwrap()
            .field_type("scalar")
            .unwrap()
            .axes_order(AxesOrder::new(["x", "x"]))
            .build(Arc::new(Dense::new()));
        assert!(matches!(bad, Err(FieldError::AxisMismatch { .. })));
    }

    #[test]
    fn test_array_shape_checked() {
        let result = Field::<Dense>::builder()
            .lattice(lattice())
            .unwrap()
            .field_type("scalar")
            .unwrap()
            .array(ArrayD::zeros(IxDyn(&[2, 4])))
            .build(Arc::new(Dense::new()));
        assert!(matches!(result, Err(FieldError::AxisMismatch { .. })));
    }

    #[test]
    fn test_gauge_sub_orders() {
        let field = build("gauge");
        assert_eq!(
            field.sub_orders().get("color"),
            Some(&vec![0, 1])
        );
        assert_eq!(
            field.indices_order().unwrap(),
            vec![
                AxisKey::plain("t"),
                AxisKey::plain("x"),
                AxisKey::occurrence("color", 0),
                AxisKey::occurrence("color", 1),
            ]
        );

        let swapped = field.transpose("color", &[1, 0], None).unwrap();
        assert_eq!(swapped.sub_orders().get("color"), Some(&vec![1, 0]));
        assert_eq!(swapped.axes_order(), field.axes_order());
    }

    #[test]
    fn test_squeeze_drops_unit_axes() {
        let lattice = Arc::new(Lattice::new([("t", 4), ("x", 1)]).unwrap());
        let field = Field::<Dense>::builder()
            .lattice(lattice)
            .unwrap()
            .field_type("gauge")
            .unwrap()
            .chunks(ChunkSpec::new().with("t", 2))
            .build(Arc::new(Dense::new()))
            .unwrap();

        let squeezed = field.squeeze(&["t", "color", "color"]).unwrap();
        assert_eq!(squeezed.axes_order(), &AxesOrder::new(["t", "color", "color"]));
        assert_eq!(squeezed.shape(), &[4, 3, 3]);
        assert_eq!(squeezed.chunk_shape(), &[2, 3, 3]);
        assert_eq!(
            squeezed.field_type(),
            &FieldTypeDescriptor::sizes([("t", 4), ("color", 3), ("color", 3)])
        );
        assert_eq!(squeezed.sub_orders().get("color"), Some(&vec![0, 1]));
    }

    #[test]
    fn test_graph_backend_records_layout() {
        let backend = Arc::new(GraphBackend::new());
        let field = Field::<GraphBackend>::builder()
            .lattice(lattice())
            .unwrap()
            .field_type("vector")
            .unwrap()
            .chunks(ChunkSpec::new().with("t", 1))
            .build(Arc::clone(&backend))
            .unwrap();
        assert_eq!(field.array().chunks(), &[1, 2, 4, 3]);

        let reordered = field.reorder(&["color", "spin", "x", "t"]).unwrap();
        assert_eq!(reordered.array().shape(), &[3, 4, 2, 4]);
        assert_eq!(reordered.array().chunks(), reordered.chunk_shape());
        assert_eq!(backend.len().unwrap(), 2);
    }

    #[test]
    fn test_dense_ranks() {
        assert_eq!(dense_ranks(&[7, 2, 5]), vec![2, 0, 1]);
        assert_eq!(dense_ranks(&[0, 1]), vec![0, 1]);
    }
}
