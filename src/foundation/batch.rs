use std::collections::BTreeMap;

use ndarray::{Array4, ArrayD, ArrayView3, Ix4};

use crate::foundation::error::{NodeError, NodeResult};

/// Key of the primary tensor in a [`LatentBatch`].
pub const SAMPLES_KEY: &str = "samples";

/// Batch of equally sized image frames laid out as `[batch, height, width, channel]`.
///
/// Values are `f32` and nominally in `[0, 1]`. A zero-length batch can be represented, but
/// every operation that consumes frames rejects it.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBatch {
    data: Array4<f32>,
}

impl FrameBatch {
    pub fn new(data: Array4<f32>) -> Self {
        Self { data }
    }

    /// Build a batch from a dynamic-rank tensor, which must have exactly four dimensions.
    pub fn from_dyn(data: ArrayD<f32>) -> NodeResult<Self> {
        let ndim = data.ndim();
        let data = data.into_dimensionality::<Ix4>().map_err(|_| {
            NodeError::validation(format!(
                "IMAGE input must be a 4D tensor [N, H, W, C], got {ndim} dimensions"
            ))
        })?;
        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn height(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn channels(&self) -> usize {
        self.data.shape()[3]
    }

    /// Per-frame shape `[height, width, channel]`.
    pub fn frame_shape(&self) -> [usize; 3] {
        [self.height(), self.width(), self.channels()]
    }

    pub fn frame(&self, index: usize) -> Option<ArrayView3<'_, f32>> {
        (index < self.len()).then(|| self.data.index_axis(ndarray::Axis(0), index))
    }

    pub fn frames(&self) -> impl Iterator<Item = ArrayView3<'_, f32>> {
        self.data.outer_iter()
    }

    pub fn data(&self) -> &Array4<f32> {
        &self.data
    }

    pub fn into_data(self) -> Array4<f32> {
        self.data
    }

    pub fn into_dyn(self) -> ArrayD<f32> {
        self.data.into_dyn()
    }
}

/// Value stored under a [`LatentBatch`] key.
#[derive(Clone, Debug, PartialEq)]
pub enum LatentValue {
    Tensor(ArrayD<f32>),
    Scalar(f64),
}

impl LatentValue {
    pub fn as_tensor(&self) -> Option<&ArrayD<f32>> {
        match self {
            LatentValue::Tensor(t) => Some(t),
            LatentValue::Scalar(_) => None,
        }
    }

    /// Leading dimension, or `None` for scalars and rank-0 tensors.
    pub fn leading_dim(&self) -> Option<usize> {
        self.as_tensor().and_then(|t| t.shape().first().copied())
    }
}

/// Named bundle of tensors produced by a generative stage.
///
/// The `"samples"` tensor is mandatory; other entries are auxiliary metadata. An auxiliary
/// tensor whose leading dimension equals the samples' leading dimension is batch-aligned.
#[derive(Clone, Debug, PartialEq)]
pub struct LatentBatch {
    samples: ArrayD<f32>,
    extra: BTreeMap<String, LatentValue>,
}

impl LatentBatch {
    pub fn new(samples: ArrayD<f32>) -> Self {
        Self {
            samples,
            extra: BTreeMap::new(),
        }
    }

    /// Build a batch from a loose key/value mapping as handed over by a host.
    pub fn from_entries(mut entries: BTreeMap<String, LatentValue>) -> NodeResult<Self> {
        match entries.remove(SAMPLES_KEY) {
            Some(LatentValue::Tensor(samples)) => Ok(Self {
                samples,
                extra: entries,
            }),
            Some(LatentValue::Scalar(_)) => Err(NodeError::type_mismatch(
                "LATENT samples must be a tensor",
            )),
            None => Err(NodeError::unsupported("LATENT input is missing 'samples'")),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: LatentValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert an auxiliary entry. Inserting under `"samples"` replaces the samples tensor
    /// when the value is a tensor and is ignored otherwise.
    pub fn insert(&mut self, key: impl Into<String>, value: LatentValue) {
        let key = key.into();
        if key == SAMPLES_KEY {
            if let LatentValue::Tensor(t) = value {
                self.samples = t;
            }
            return;
        }
        self.extra.insert(key, value);
    }

    pub fn samples(&self) -> &ArrayD<f32> {
        &self.samples
    }

    /// Leading dimension of `"samples"` (0 for a rank-0 tensor).
    pub fn len(&self) -> usize {
        self.samples.shape().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<&LatentValue> {
        self.extra.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        key == SAMPLES_KEY || self.extra.contains_key(key)
    }

    /// Auxiliary entries, excluding `"samples"`.
    pub fn extra(&self) -> &BTreeMap<String, LatentValue> {
        &self.extra
    }

    pub fn into_entries(self) -> BTreeMap<String, LatentValue> {
        let mut entries = self.extra;
        entries.insert(SAMPLES_KEY.to_string(), LatentValue::Tensor(self.samples));
        entries
    }
}

/// Either kind of batch accepted by the interleaver.
#[derive(Clone, Debug, PartialEq)]
pub enum Batch {
    Frames(FrameBatch),
    Latent(LatentBatch),
}

impl Batch {
    pub fn kind(&self) -> BatchKind {
        match self {
            Batch::Frames(_) => BatchKind::Image,
            Batch::Latent(_) => BatchKind::Latent,
        }
    }
}

impl From<FrameBatch> for Batch {
    fn from(value: FrameBatch) -> Self {
        Batch::Frames(value)
    }
}

impl From<LatentBatch> for Batch {
    fn from(value: LatentBatch) -> Self {
        Batch::Latent(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum BatchKind {
    #[serde(rename = "IMAGE")]
    Image,
    #[serde(rename = "LATENT")]
    Latent,
}

impl std::fmt::Display for BatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchKind::Image => f.write_str("IMAGE"),
            BatchKind::Latent => f.write_str("LATENT"),
        }
    }
}
