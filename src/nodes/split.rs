use crate::foundation::batch::FrameBatch;
use crate::foundation::error::{NodeError, NodeResult};
use crate::frames::load_frames;
use crate::nodes::NodeContext;
use crate::transcode::Invocation;
use crate::video::{VideoHandle, extension_for};

/// Options for [`split_video`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitOpts {
    /// Target frame rate. `0` (or any non-positive value) keeps the source's native rate.
    pub fps: f64,
}

impl Default for SplitOpts {
    fn default() -> Self {
        Self { fps: 0.0 }
    }
}

impl SplitOpts {
    pub fn with_fps(fps: f64) -> Self {
        Self { fps }
    }
}

/// Decode `video` into a frame batch.
///
/// An already decoded batch is returned unchanged without running the transcoder. Byte
/// streams are spooled to a scratch file first. The scratch file and the frame directory
/// are removed before returning, whatever the outcome.
#[tracing::instrument(skip(ctx, video), fields(source = video.state()))]
pub fn split_video(
    ctx: &NodeContext<'_>,
    video: VideoHandle,
    opts: &SplitOpts,
) -> NodeResult<FrameBatch> {
    let (input_path, _input_file) = match video {
        VideoHandle::Frames(batch) => {
            tracing::debug!(frames = batch.len(), "input is already decoded");
            return Ok(batch);
        }
        VideoHandle::Unsupported(what) => {
            return Err(NodeError::unsupported(format!(
                "input is not a supported video type ({what})"
            )));
        }
        VideoHandle::Path(path) => (path, None),
        VideoHandle::Stream {
            mut reader,
            format_hint,
        } => {
            let suffix = format!(".{}", extension_for(format_hint.as_deref()));
            let file = ctx
                .temp
                .scratch_file_from("ffmpeg_input_", &suffix, &mut reader)?;
            (file.path().to_path_buf(), Some(file))
        }
    };

    let frames_dir = ctx.temp.scratch_dir("ffmpeg_split_")?;
    ctx.transcoder.run(Invocation::extract_frames(
        &input_path,
        frames_dir.path(),
        opts.fps,
    ))?;

    let frames = load_frames(frames_dir.path())?;
    tracing::debug!(frames = frames.len(), "extracted frames");
    Ok(frames)
}
