#![forbid(unsafe_code)]

//! Video/frame nodes for node-graph hosts.
//!
//! Splits videos into frame batches and merges frame batches back into videos by driving an
//! external `ffmpeg` process, and round-robin interleaves frame or latent batches.

pub mod foundation;
pub mod frames;
pub mod nodes;
pub mod registry;
pub mod scratch;
pub mod transcode;
pub mod video;

pub use foundation::batch::{Batch, BatchKind, FrameBatch, LatentBatch, LatentValue, SAMPLES_KEY};
pub use foundation::error::{NodeError, NodeResult};
pub use nodes::NodeContext;
pub use nodes::interleave::{
    Interleaved, Truncation, interleave, interleave_frames, interleave_latents,
};
pub use nodes::merge::{MergeInput, MergeOpts, MergeOutput, merge_frames};
pub use nodes::split::{SplitOpts, split_video};
pub use registry::{Node, NodeDescriptor, NodeInputs, NodeRegistry, NodeValue};
pub use scratch::{ScratchDir, ScratchFile, TempArea};
pub use transcode::ffmpeg::FfmpegCli;
pub use transcode::{Invocation, Transcoder};
pub use video::{HostVideo, StreamSource, VideoComponents, VideoFile, VideoHandle, VideoRef};
