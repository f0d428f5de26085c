//! Host-facing node surface: dynamic values, node descriptors and name-based dispatch.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use ndarray::ArrayD;

use crate::foundation::batch::{Batch, FrameBatch, LatentBatch};
use crate::foundation::error::{NodeError, NodeResult};
use crate::nodes::NodeContext;
use crate::nodes::interleave::interleave;
use crate::nodes::merge::{MergeInput, MergeOpts, merge_frames};
use crate::nodes::split::{SplitOpts, split_video};
use crate::video::{HostVideo, VideoHandle, VideoRef};

pub const CATEGORY: &str = "ffmpeg";

/// Upper bound on interleave inputs exposed to the host UI.
pub const MAX_INTERLEAVE_INPUTS: usize = 6;

/// Value flowing along a host edge.
#[derive(Clone, Debug)]
pub enum NodeValue {
    Image(ArrayD<f32>),
    Latent(LatentBatch),
    Video(Arc<dyn HostVideo>),
    Path(PathBuf),
    Float(f64),
}

impl NodeValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeValue::Image(_) => "IMAGE",
            NodeValue::Latent(_) => "LATENT",
            NodeValue::Video(_) => "VIDEO",
            NodeValue::Path(_) => "STRING",
            NodeValue::Float(_) => "FLOAT",
        }
    }
}

impl From<FrameBatch> for NodeValue {
    fn from(value: FrameBatch) -> Self {
        NodeValue::Image(value.into_dyn())
    }
}

impl From<Batch> for NodeValue {
    fn from(value: Batch) -> Self {
        match value {
            Batch::Frames(f) => f.into(),
            Batch::Latent(l) => NodeValue::Latent(l),
        }
    }
}

impl From<VideoRef> for NodeValue {
    fn from(value: VideoRef) -> Self {
        match value {
            VideoRef::File(f) => NodeValue::Video(Arc::new(f)),
            VideoRef::Host(v) => NodeValue::Video(v),
        }
    }
}

pub type NodeInputs = BTreeMap<String, NodeValue>;

/// Numeric widget constraints shown by the host UI.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct FloatRange {
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct InputSpec {
    pub name: &'static str,
    /// Comma-separated accepted types, e.g. `"IMAGE,VIDEO"`.
    pub types: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<FloatRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<&'static str>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct OutputSpec {
    pub name: &'static str,
    pub types: &'static str,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct NodeDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub inputs: Vec<InputSpec>,
    pub outputs: Vec<OutputSpec>,
}

pub trait Node: Send + Sync {
    fn descriptor(&self) -> NodeDescriptor;

    /// Run the node. Outputs are in descriptor order.
    fn execute(&self, ctx: &NodeContext<'_>, inputs: NodeInputs) -> NodeResult<Vec<NodeValue>>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SplitVideoNode;

impl Node for SplitVideoNode {
    fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            name: "FFmpegSplitVideo",
            display_name: "FFmpeg Split Video",
            category: CATEGORY,
            inputs: vec![
                InputSpec {
                    name: "video",
                    types: "IMAGE,VIDEO",
                    required: true,
                    range: None,
                    tooltip: Some("Video input or frame batch."),
                },
                InputSpec {
                    name: "fps",
                    types: "FLOAT",
                    required: true,
                    range: Some(FloatRange {
                        default: 0.0,
                        min: 0.0,
                        max: 120.0,
                        step: 1.0,
                    }),
                    tooltip: None,
                },
            ],
            outputs: vec![OutputSpec {
                name: "frames",
                types: "IMAGE",
            }],
        }
    }

    fn execute(&self, ctx: &NodeContext<'_>, mut inputs: NodeInputs) -> NodeResult<Vec<NodeValue>> {
        let fps = float_input(&mut inputs, "fps", SplitOpts::default().fps)?;
        let video = video_handle(take_required(&mut inputs, "video")?)?;
        let frames = split_video(ctx, video, &SplitOpts::with_fps(fps))?;
        Ok(vec![frames.into()])
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MergeFramesNode;

impl Node for MergeFramesNode {
    fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            name: "FFmpegMergeFrames",
            display_name: "FFmpeg Merge Frames",
            category: CATEGORY,
            inputs: vec![
                InputSpec {
                    name: "frames",
                    types: "IMAGE,VIDEO",
                    required: true,
                    range: None,
                    tooltip: Some("Frame batch to merge into a video."),
                },
                InputSpec {
                    name: "fps",
                    types: "FLOAT",
                    required: true,
                    range: Some(FloatRange {
                        default: 30.0,
                        min: 1.0,
                        max: 120.0,
                        step: 1.0,
                    }),
                    tooltip: None,
                },
            ],
            outputs: vec![
                OutputSpec {
                    name: "video",
                    types: "VIDEO",
                },
                OutputSpec {
                    name: "frames",
                    types: "IMAGE",
                },
            ],
        }
    }

    fn execute(&self, ctx: &NodeContext<'_>, mut inputs: NodeInputs) -> NodeResult<Vec<NodeValue>> {
        let fps = float_input(&mut inputs, "fps", MergeOpts::default().fps)?;
        let input = match take_required(&mut inputs, "frames")? {
            NodeValue::Video(video) => MergeInput::Video(video),
            NodeValue::Image(tensor) => MergeInput::Frames(FrameBatch::from_dyn(tensor)?),
            other => {
                return Err(NodeError::unsupported(format!(
                    "frames input must be IMAGE or VIDEO, got {}",
                    other.type_name()
                )));
            }
        };
        let out = merge_frames(ctx, input, &MergeOpts::with_fps(fps))?;
        Ok(vec![out.video.into(), out.frames.into()])
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct InterleaveFramesNode;

const INTERLEAVE_INPUTS: [(&str, &str); MAX_INTERLEAVE_INPUTS] = [
    ("batch1", "First batch to interleave."),
    ("batch2", "Second batch to interleave."),
    ("batch3", "Third batch to interleave."),
    ("batch4", "Fourth batch to interleave."),
    ("batch5", "Fifth batch to interleave."),
    ("batch6", "Sixth batch to interleave."),
];

impl Node for InterleaveFramesNode {
    fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            name: "InterleaveFrames",
            display_name: "Interleave Frames",
            category: CATEGORY,
            inputs: INTERLEAVE_INPUTS
                .iter()
                .enumerate()
                .map(|(idx, &(name, tooltip))| InputSpec {
                    name,
                    types: "IMAGE,LATENT",
                    required: idx < 2,
                    range: None,
                    tooltip: Some(tooltip),
                })
                .collect(),
            outputs: vec![OutputSpec {
                name: "batch",
                types: "IMAGE,LATENT",
            }],
        }
    }

    fn execute(
        &self,
        _ctx: &NodeContext<'_>,
        mut inputs: NodeInputs,
    ) -> NodeResult<Vec<NodeValue>> {
        let mut batches = Vec::with_capacity(MAX_INTERLEAVE_INPUTS);
        for (idx, (name, _)) in INTERLEAVE_INPUTS.iter().enumerate() {
            let value = if idx < 2 {
                Some(take_required(&mut inputs, name)?)
            } else {
                inputs.remove(*name)
            };
            if let Some(value) = value {
                batches.push(batch_input(value)?);
            }
        }
        let out = interleave(&batches)?;
        Ok(vec![out.batch.into()])
    }
}

/// Built-in nodes, addressable by their descriptor name.
pub struct NodeRegistry {
    nodes: Vec<Box<dyn Node>>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl NodeRegistry {
    pub fn builtin() -> Self {
        Self {
            nodes: vec![
                Box::new(SplitVideoNode),
                Box::new(MergeFramesNode),
                Box::new(InterleaveFramesNode),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Node> {
        self.nodes
            .iter()
            .find(|n| n.descriptor().name == name)
            .map(|n| n.as_ref())
    }

    pub fn descriptors(&self) -> Vec<NodeDescriptor> {
        self.nodes.iter().map(|n| n.descriptor()).collect()
    }

    pub fn execute(
        &self,
        name: &str,
        ctx: &NodeContext<'_>,
        inputs: NodeInputs,
    ) -> NodeResult<Vec<NodeValue>> {
        let node = self
            .get(name)
            .ok_or_else(|| NodeError::validation(format!("unknown node '{name}'")))?;
        node.execute(ctx, inputs)
    }
}

fn take_required(inputs: &mut NodeInputs, name: &str) -> NodeResult<NodeValue> {
    inputs
        .remove(name)
        .ok_or_else(|| NodeError::validation(format!("missing required input '{name}'")))
}

fn float_input(inputs: &mut NodeInputs, name: &str, default: f64) -> NodeResult<f64> {
    match inputs.remove(name) {
        None => Ok(default),
        Some(NodeValue::Float(v)) => Ok(v),
        Some(other) => Err(NodeError::type_mismatch(format!(
            "input '{name}' must be FLOAT, got {}",
            other.type_name()
        ))),
    }
}

fn video_handle(value: NodeValue) -> NodeResult<VideoHandle> {
    match value {
        NodeValue::Image(tensor) => Ok(VideoHandle::Frames(FrameBatch::from_dyn(tensor)?)),
        NodeValue::Video(video) => VideoHandle::from_host(video.as_ref()),
        NodeValue::Path(path) => Ok(VideoHandle::Path(path)),
        other => Ok(VideoHandle::Unsupported(other.type_name().to_string())),
    }
}

fn batch_input(value: NodeValue) -> NodeResult<Batch> {
    match value {
        NodeValue::Image(tensor) => Ok(Batch::Frames(FrameBatch::from_dyn(tensor)?)),
        NodeValue::Latent(latent) => Ok(Batch::Latent(latent)),
        other => Err(NodeError::type_mismatch(format!(
            "input must be IMAGE or LATENT, got {}",
            other.type_name()
        ))),
    }
}
