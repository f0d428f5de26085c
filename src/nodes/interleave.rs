use std::borrow::Borrow;

use ndarray::{ArrayD, ArrayViewD, Axis, Ix4, Slice};

use crate::foundation::batch::{Batch, FrameBatch, LatentBatch, LatentValue};
use crate::foundation::error::{NodeError, NodeResult};

/// Batch sizes that differed, and the common count the output was truncated to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Truncation {
    pub sizes: Vec<usize>,
    pub count: usize,
}

/// Interleaved output together with the truncation that was applied, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct Interleaved<T> {
    pub batch: T,
    pub truncation: Option<Truncation>,
}

impl<T> Interleaved<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Interleaved<U> {
        Interleaved {
            batch: f(self.batch),
            truncation: self.truncation,
        }
    }

    pub fn into_inner(self) -> T {
        self.batch
    }
}

/// Round-robin interleave `batches`: `out[i * n + k] == batches[k][i]`.
///
/// All inputs must be the same kind. Inputs of different sizes are truncated to the
/// shortest one; the truncation is logged at `warn` level and reported in the result.
#[tracing::instrument(skip(batches), fields(inputs = batches.len()))]
pub fn interleave(batches: &[Batch]) -> NodeResult<Interleaved<Batch>> {
    if batches.len() < 2 {
        return Err(NodeError::validation("at least two batches must be provided"));
    }

    let kind = batches[0].kind();
    if let Some(other) = batches.iter().map(Batch::kind).find(|k| *k != kind) {
        return Err(NodeError::type_mismatch(format!(
            "all inputs must have the same type (IMAGE or LATENT), got {kind} and {other}"
        )));
    }

    match &batches[0] {
        Batch::Frames(_) => {
            let frames: Vec<&FrameBatch> = batches
                .iter()
                .filter_map(|b| match b {
                    Batch::Frames(f) => Some(f),
                    Batch::Latent(_) => None,
                })
                .collect();
            Ok(interleave_frames(&frames)?.map(Batch::Frames))
        }
        Batch::Latent(_) => {
            let latents: Vec<&LatentBatch> = batches
                .iter()
                .filter_map(|b| match b {
                    Batch::Latent(l) => Some(l),
                    Batch::Frames(_) => None,
                })
                .collect();
            Ok(interleave_latents(&latents)?.map(Batch::Latent))
        }
    }
}

pub fn interleave_frames<B: Borrow<FrameBatch>>(
    batches: &[B],
) -> NodeResult<Interleaved<FrameBatch>> {
    let views: Vec<ArrayViewD<'_, f32>> = batches
        .iter()
        .map(|b| {
            let b: &FrameBatch = b.borrow();
            b.data().view().into_dyn()
        })
        .collect();
    let (out, truncation) = interleave_tensors(&views)?;
    warn_on_truncation(truncation.as_ref());

    let out = out
        .into_dimensionality::<Ix4>()
        .map_err(|e| NodeError::shape_mismatch(format!("interleaved frames are not 4D: {e}")))?;
    Ok(Interleaved {
        batch: FrameBatch::new(out),
        truncation,
    })
}

/// Interleave latent batches.
///
/// `"samples"` is always interleaved. An auxiliary entry is carried over only when every
/// input has it as a tensor whose leading dimension equals that input's samples count;
/// every other auxiliary entry is dropped from the output.
pub fn interleave_latents<B: Borrow<LatentBatch>>(
    batches: &[B],
) -> NodeResult<Interleaved<LatentBatch>> {
    let batches: Vec<&LatentBatch> = batches
        .iter()
        .map(|b| {
            let b: &LatentBatch = b.borrow();
            b
        })
        .collect();
    let samples: Vec<ArrayViewD<'_, f32>> = batches.iter().map(|b| b.samples().view()).collect();
    let (samples_out, truncation) = interleave_tensors(&samples)?;
    warn_on_truncation(truncation.as_ref());

    let mut out = LatentBatch::new(samples_out);
    for key in batches[0].extra().keys() {
        let aligned: Option<Vec<ArrayViewD<'_, f32>>> = batches
            .iter()
            .map(|b| match b.get(key) {
                Some(LatentValue::Tensor(t)) if t.shape().first() == Some(&b.len()) => {
                    Some(t.view())
                }
                _ => None,
            })
            .collect();
        let Some(values) = aligned else {
            tracing::debug!(key = key.as_str(), "dropping auxiliary latent entry");
            continue;
        };
        match interleave_tensors(&values) {
            Ok((value, _)) => out.insert(key.clone(), LatentValue::Tensor(value)),
            Err(e) => {
                tracing::debug!(key = key.as_str(), error = %e, "dropping auxiliary latent entry");
            }
        }
    }

    Ok(Interleaved {
        batch: out,
        truncation,
    })
}

fn warn_on_truncation(truncation: Option<&Truncation>) {
    if let Some(t) = truncation {
        tracing::warn!(
            sizes = ?t.sizes,
            count = t.count,
            "batch sizes differ {:?}; truncating to shortest",
            t.sizes
        );
    }
}

fn interleave_tensors(
    tensors: &[ArrayViewD<'_, f32>],
) -> NodeResult<(ArrayD<f32>, Option<Truncation>)> {
    if tensors.len() < 2 {
        return Err(NodeError::validation("at least two batches are required"));
    }
    if let Some(idx) = tensors.iter().position(|t| t.ndim() == 0) {
        return Err(NodeError::validation(format!(
            "input {} has no batch dimension",
            idx + 1
        )));
    }

    let base = &tensors[0].shape()[1..];
    for (idx, t) in tensors.iter().enumerate().skip(1) {
        let shape = &t.shape()[1..];
        if shape != base {
            let n = idx + 1;
            return Err(NodeError::shape_mismatch(format!(
                "input {n} has shape {shape:?}, input 1 has {base:?} (only batch size may differ)"
            )));
        }
    }

    let sizes: Vec<usize> = tensors.iter().map(|t| t.shape()[0]).collect();
    let count = sizes.iter().copied().min().unwrap_or(0);
    let truncation = sizes
        .iter()
        .any(|&s| s != count)
        .then(|| Truncation {
            sizes: sizes.clone(),
            count,
        });
    if count == 0 {
        return Err(NodeError::empty("inputs must contain at least one frame"));
    }

    let trimmed: Vec<ArrayViewD<'_, f32>> = tensors
        .iter()
        .map(|t| t.slice_axis(Axis(0), Slice::from(0..count)))
        .collect();
    // [count, n, ...] flattened row-major gives out[i * n + k] = in[k][i].
    let stacked = ndarray::stack(Axis(1), &trimmed)
        .map_err(|e| NodeError::shape_mismatch(format!("cannot stack inputs: {e}")))?;

    let mut out_shape = Vec::with_capacity(base.len() + 1);
    out_shape.push(count * tensors.len());
    out_shape.extend_from_slice(base);
    let out = stacked
        .into_shape_with_order(out_shape)
        .map_err(|e| NodeError::shape_mismatch(format!("cannot reshape interleaved output: {e}")))?;
    Ok((out, truncation))
}
