//! Computing concrete tensor shapes from the axis constraint system.
//!
//! Resolution is a fixed two-pass ordering over `(tensor_id, axis_id)` keys:
//! all independent sizes first (batch, fixed, parameterized), then every
//! `SizeReference`, inputs before outputs. No graph library needed since
//! references may only point at independent axes.

use std::collections::BTreeMap;

use super::axes::AxisSizeView;
use super::axis_size::QualifiedAxisId;
use super::tensor_id::{AxisId, TensorId};
use super::ModelDescr;

/// The resolved extent of an output axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputSize {
    Fixed(usize),
    /// Known only at inference time.
    DataDependent { min: usize, max: Option<usize> },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AxisSizes {
    pub inputs: BTreeMap<QualifiedAxisId, usize>,
    pub outputs: BTreeMap<QualifiedAxisId, OutputSize>,
}

impl AxisSizes {
    /// `AxisSizes` regrouped per tensor.
    pub fn output_tensor_sizes(&self) -> BTreeMap<TensorId, BTreeMap<AxisId, OutputSize>> {
        let mut out: BTreeMap<TensorId, BTreeMap<AxisId, OutputSize>> = BTreeMap::new();
        for (qual_id, size) in self.outputs.iter() {
            let _ = out
                .entry(qual_id.tensor_id.clone())
                .or_default()
                .insert(qual_id.axis_id.clone(), *size);
        }
        out
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("batch size mismatch for tensors '{first_tensor}' ({first_size}) and '{second_tensor}' ({second_size})")]
    InconsistentBatchSize {
        first_tensor: TensorId,
        first_size: usize,
        second_tensor: TensorId,
        second_size: usize,
    },
    #[error("Size increment factor (n) missing for parameterized axis '{0}'")]
    MissingN(QualifiedAxisId),
    #[error("Unknown axis '{0}' in input sizes")]
    UnknownAxis(QualifiedAxisId),
    #[error("Unknown tensor '{0}' in input sizes")]
    UnknownTensor(TensorId),
    #[error("Axis reference '{reference}' of '{referencing}' cannot be resolved")]
    UnresolvableReference {
        referencing: QualifiedAxisId,
        reference: QualifiedAxisId,
    },
    #[error("Resolved size {found} of axis '{axis}' is not positive")]
    NonPositiveSize { axis: QualifiedAxisId, found: i64 },
}

impl ModelDescr {
    /// Infer the batch size from concrete tensor sizes; any non-1 batch
    /// extent fixes it, mismatching non-1 extents are an error.
    pub fn get_batch_size(
        tensor_sizes: &BTreeMap<TensorId, BTreeMap<AxisId, usize>>,
    ) -> Result<usize, ShapeError> {
        let mut batch_size = 1usize;
        let mut fixed_by: Option<&TensorId> = None;
        for (tensor_id, axes) in tensor_sizes.iter() {
            for (axis_id, size) in axes.iter() {
                if !axis_id.is_batch() || *size == 1 || *size == batch_size {
                    continue;
                }
                if batch_size != 1 {
                    let first_tensor = fixed_by.expect("a tensor fixed the batch size before").clone();
                    return Err(ShapeError::InconsistentBatchSize {
                        first_tensor,
                        first_size: batch_size,
                        second_tensor: tensor_id.clone(),
                        second_size: *size,
                    });
                }
                batch_size = *size;
                fixed_by = Some(tensor_id);
            }
        }
        Ok(batch_size)
    }

    /// Scale factor `n` for each parameterized input axis such that the valid
    /// input size is >= the given input size.
    pub fn get_ns(
        &self,
        input_sizes: &BTreeMap<TensorId, BTreeMap<AxisId, usize>>,
    ) -> Result<BTreeMap<QualifiedAxisId, usize>, ShapeError> {
        let mut ns = BTreeMap::new();
        for (tensor_id, axes) in input_sizes.iter() {
            let Some(tensor) = self.inputs.iter().find(|t| &t.id == tensor_id) else {
                return Err(ShapeError::UnknownTensor(tensor_id.clone()));
            };
            for (axis_id, size) in axes.iter() {
                let qual_id = QualifiedAxisId {
                    tensor_id: tensor_id.clone(),
                    axis_id: axis_id.clone(),
                };
                let Some(axis) = tensor.axes.iter().find(|a| a.id() == axis_id) else {
                    return Err(ShapeError::UnknownAxis(qual_id));
                };
                if let AxisSizeView::Parameterized(parameterized) = axis.size_view() {
                    let _ = ns.insert(qual_id, parameterized.get_n(*size));
                }
            }
        }
        Ok(ns)
    }

    /// Output sizes for concrete input sizes. Only if the input sizes are
    /// valid is the output exact; otherwise it may be larger than the actual
    /// (valid) output.
    pub fn get_output_tensor_sizes(
        &self,
        input_sizes: &BTreeMap<TensorId, BTreeMap<AxisId, usize>>,
    ) -> Result<BTreeMap<TensorId, BTreeMap<AxisId, OutputSize>>, ShapeError> {
        let batch_size = Self::get_batch_size(input_sizes)?;
        let ns = self.get_ns(input_sizes)?;
        let sizes = self.get_axis_sizes(&ns, Some(batch_size), &BTreeMap::new())?;
        Ok(sizes.output_tensor_sizes())
    }

    /// Determine input and output axis sizes for scale factors `ns` of
    /// parameterized input sizes.
    ///
    /// `max_input_shape` caps the derived sizes: a parameterized axis larger
    /// than its cap is clamped to the largest still-valid `n`.
    pub fn get_axis_sizes(
        &self,
        ns: &BTreeMap<QualifiedAxisId, usize>,
        batch_size: Option<usize>,
        max_input_shape: &BTreeMap<QualifiedAxisId, usize>,
    ) -> Result<AxisSizes, ShapeError> {
        let batch_size = batch_size.unwrap_or_else(|| {
            max_input_shape
                .iter()
                .find(|(qual_id, _)| qual_id.axis_id.is_batch())
                .map(|(_, size)| *size)
                .unwrap_or(1)
        });

        // unit/scale of every axis, for reference resolution
        let mut scales: BTreeMap<QualifiedAxisId, f32> = BTreeMap::new();
        for tensor in self.inputs.iter() {
            for axis in tensor.axes.iter() {
                let _ = scales.insert(qualified(&tensor.id, axis.id()), axis.scale());
            }
        }
        for tensor in self.outputs.iter() {
            for axis in tensor.axes.iter() {
                let _ = scales.insert(qualified(&tensor.id, axis.id()), axis.scale());
            }
        }

        let mut sizes = AxisSizes::default();

        let resolve_independent = |qual_id: &QualifiedAxisId,
                                   view: AxisSizeView<'_>|
         -> Result<Option<OutputSize>, ShapeError> {
            match view {
                AxisSizeView::Batch { .. } => Ok(Some(OutputSize::Fixed(batch_size))),
                AxisSizeView::Fixed(size) => Ok(Some(OutputSize::Fixed(size))),
                AxisSizeView::Parameterized(parameterized) => {
                    let Some(n) = ns.get(qual_id).copied() else {
                        return Err(ShapeError::MissingN(qual_id.clone()));
                    };
                    let n = match max_input_shape.get(qual_id) {
                        Some(cap) => n.min(parameterized.get_n(*cap)),
                        None => n,
                    };
                    Ok(Some(OutputSize::Fixed(parameterized.get_size(n))))
                }
                AxisSizeView::DataDependent(size) => Ok(Some(OutputSize::DataDependent {
                    min: size.min,
                    max: size.max,
                })),
                AxisSizeView::Reference(_) => Ok(None),
            }
        };

        // first pass: everything but the `SizeReference` input sizes
        for tensor in self.inputs.iter() {
            for axis in tensor.axes.iter() {
                let qual_id = qualified(&tensor.id, axis.id());
                if let Some(OutputSize::Fixed(size)) = resolve_independent(&qual_id, axis.size_view())? {
                    let _ = sizes.inputs.insert(qual_id, size);
                }
            }
        }

        // second pass: referencing input axes
        for tensor in self.inputs.iter() {
            for axis in tensor.axes.iter() {
                let AxisSizeView::Reference(reference) = axis.size_view() else {
                    continue;
                };
                let qual_id = qualified(&tensor.id, axis.id());
                let ref_id = reference.qualified_axis_id();
                let Some(ref_size) = sizes.inputs.get(&ref_id).copied() else {
                    return Err(ShapeError::UnresolvableReference {
                        referencing: qual_id,
                        reference: ref_id,
                    });
                };
                let ref_scale = scales.get(&ref_id).copied().unwrap_or(1.0);
                let resolved = reference.resolve(ref_size, ref_scale, axis.scale());
                if resolved < 1 {
                    return Err(ShapeError::NonPositiveSize {
                        axis: qual_id,
                        found: resolved,
                    });
                }
                let _ = sizes.inputs.insert(qual_id, resolved as usize);
            }
        }

        // third pass: output axes, references resolving against inputs and
        // previously resolved outputs, in declaration order
        for tensor in self.outputs.iter() {
            for axis in tensor.axes.iter() {
                let qual_id = qualified(&tensor.id, axis.id());
                match axis.size_view() {
                    AxisSizeView::Reference(reference) => {
                        let ref_id = reference.qualified_axis_id();
                        let ref_size = sizes.inputs.get(&ref_id).copied().or(match sizes.outputs.get(&ref_id) {
                            Some(OutputSize::Fixed(size)) => Some(*size),
                            _ => None,
                        });
                        let Some(ref_size) = ref_size else {
                            return Err(ShapeError::UnresolvableReference {
                                referencing: qual_id,
                                reference: ref_id,
                            });
                        };
                        let ref_scale = scales.get(&ref_id).copied().unwrap_or(1.0);
                        let resolved = reference.resolve(ref_size, ref_scale, axis.scale());
                        if resolved < 1 {
                            return Err(ShapeError::NonPositiveSize {
                                axis: qual_id,
                                found: resolved,
                            });
                        }
                        let _ = sizes.outputs.insert(qual_id, OutputSize::Fixed(resolved as usize));
                    }
                    view => {
                        if let Some(size) = resolve_independent(&qual_id, view)? {
                            let _ = sizes.outputs.insert(qual_id, size);
                        }
                    }
                }
            }
        }

        Ok(sizes)
    }
}

fn qualified(tensor_id: &TensorId, axis_id: &AxisId) -> QualifiedAxisId {
    QualifiedAxisId {
        tensor_id: tensor_id.clone(),
        axis_id: axis_id.clone(),
    }
}
