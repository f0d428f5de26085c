use std::sync::Arc;

use crate::foundation::batch::FrameBatch;
use crate::foundation::error::{NodeError, NodeResult};
use crate::frames::save_frames;
use crate::nodes::NodeContext;
use crate::scratch::ScratchDir;
use crate::transcode::Invocation;
use crate::video::{HostVideo, VideoFile, VideoRef};

/// File name of the encoded video inside the merge directory.
pub const OUTPUT_FILE_NAME: &str = "output.mp4";

/// Options for [`merge_frames`].
#[derive(Clone, Debug, PartialEq)]
pub struct MergeOpts {
    /// Frame rate of the produced video.
    pub fps: f64,
    /// Video codec passed to `-c:v`.
    pub codec: String,
    /// Pixel format passed to `-pix_fmt`.
    pub pix_fmt: String,
}

impl Default for MergeOpts {
    fn default() -> Self {
        Self {
            fps: 30.0,
            codec: "libx264".to_string(),
            pix_fmt: "yuv420p".to_string(),
        }
    }
}

impl MergeOpts {
    pub fn with_fps(fps: f64) -> Self {
        Self {
            fps,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> NodeResult<()> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(NodeError::validation(format!(
                "merge fps must be a positive number, got {}",
                self.fps
            )));
        }
        if self.codec.trim().is_empty() {
            return Err(NodeError::validation("merge codec must not be empty"));
        }
        if self.pix_fmt.trim().is_empty() {
            return Err(NodeError::validation("merge pixel format must not be empty"));
        }
        Ok(())
    }
}

/// What the merge node accepts.
#[derive(Clone, Debug)]
pub enum MergeInput {
    Frames(FrameBatch),
    /// Already a video; passed through together with its decoded frames.
    Video(Arc<dyn HostVideo>),
}

impl From<FrameBatch> for MergeInput {
    fn from(value: FrameBatch) -> Self {
        MergeInput::Frames(value)
    }
}

#[derive(Clone, Debug)]
pub struct MergeOutput {
    pub video: VideoRef,
    pub frames: FrameBatch,
}

/// Encode `input` into a video file.
///
/// Frames are written to a scratch directory that is removed before returning. On success
/// the encoded file, which must be non-empty, is handed to the caller and is no longer managed here; on failure
/// nothing is left behind.
#[tracing::instrument(skip(ctx, input, opts), fields(fps = opts.fps))]
pub fn merge_frames(
    ctx: &NodeContext<'_>,
    input: MergeInput,
    opts: &MergeOpts,
) -> NodeResult<MergeOutput> {
    let frames = match input {
        MergeInput::Video(video) => {
            tracing::debug!("input is already a video");
            let components = video.components(ctx)?;
            return Ok(MergeOutput {
                video: VideoRef::Host(video),
                frames: components.images,
            });
        }
        MergeInput::Frames(frames) => frames,
    };

    opts.validate()?;
    validate_frames(&frames, opts)?;

    let root = ctx.temp.scratch_dir("ffmpeg_merge_")?;
    let output_path = root.path().join(OUTPUT_FILE_NAME);
    {
        let frames_dir = ScratchDir::create_in(root.path(), "frames_")?;
        save_frames(&frames, frames_dir.path())?;
        ctx.transcoder.run(Invocation::encode_frames(
            frames_dir.path(),
            opts.fps,
            &opts.codec,
            &opts.pix_fmt,
            &output_path,
        ))?;
    }

    let produced = std::fs::metadata(&output_path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false);
    if !produced {
        return Err(NodeError::no_output(ctx.transcoder.name(), &output_path));
    }

    root.keep();
    tracing::debug!(path = %output_path.display(), frames = frames.len(), "encoded video");
    Ok(MergeOutput {
        video: VideoRef::File(VideoFile::new(output_path)),
        frames,
    })
}

fn validate_frames(frames: &FrameBatch, opts: &MergeOpts) -> NodeResult<()> {
    if frames.is_empty() {
        return Err(NodeError::empty("frames input is empty"));
    }
    if !matches!(frames.channels(), 1 | 3 | 4) {
        return Err(NodeError::unsupported(format!(
            "frames must have 1, 3 or 4 channels, got {}",
            frames.channels()
        )));
    }
    if frames.width() == 0 || frames.height() == 0 {
        return Err(NodeError::validation("frame width/height must be non-zero"));
    }
    if opts.pix_fmt == "yuv420p"
        && (!frames.width().is_multiple_of(2) || !frames.height().is_multiple_of(2))
    {
        return Err(NodeError::validation(format!(
            "frame width/height must be even for yuv420p output, got {}x{}",
            frames.width(),
            frames.height()
        )));
    }
    Ok(())
}
