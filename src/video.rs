//! Video references exchanged with the host.

use std::fmt;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::batch::FrameBatch;
use crate::foundation::error::{NodeError, NodeResult};
use crate::nodes::NodeContext;
use crate::nodes::split::{SplitOpts, split_video};

/// Readable, rewindable byte source.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Where a host video keeps its encoded bytes.
pub enum StreamSource {
    Path(PathBuf),
    Bytes(Box<dyn ReadSeek>),
    /// Anything else; carries a short description for diagnostics.
    Unsupported(String),
}

impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSource::Path(p) => f.debug_tuple("Path").field(p).finish(),
            StreamSource::Bytes(_) => f.write_str("Bytes(..)"),
            StreamSource::Unsupported(what) => f.debug_tuple("Unsupported").field(what).finish(),
        }
    }
}

/// Decoded parts of a video.
#[derive(Clone, Debug)]
pub struct VideoComponents {
    pub images: FrameBatch,
    pub frame_rate: Option<f64>,
}

/// Video object owned by the host.
pub trait HostVideo: fmt::Debug + Send + Sync {
    /// Encoded byte source of the video.
    fn stream_source(&self) -> NodeResult<StreamSource>;

    /// Decode the video into frames, using the caller's transcoder and temp area.
    fn components(&self, ctx: &NodeContext<'_>) -> NodeResult<VideoComponents>;

    /// Container format name as reported by a demuxer, e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`.
    fn container_format(&self) -> NodeResult<String> {
        Err(NodeError::unsupported("container format is unknown"))
    }
}

/// Video input to the split node, resolved once at entry.
pub enum VideoHandle {
    Path(PathBuf),
    Stream {
        reader: Box<dyn ReadSeek>,
        format_hint: Option<String>,
    },
    /// Already decoded; split returns it unchanged.
    Frames(FrameBatch),
    Unsupported(String),
}

impl VideoHandle {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        VideoHandle::Path(path.into())
    }

    pub fn bytes(bytes: Vec<u8>, format_hint: Option<String>) -> Self {
        VideoHandle::Stream {
            reader: Box::new(std::io::Cursor::new(bytes)),
            format_hint,
        }
    }

    /// Resolve a host video through its stream source.
    pub fn from_host(video: &dyn HostVideo) -> NodeResult<Self> {
        Ok(match video.stream_source()? {
            StreamSource::Path(path) => VideoHandle::Path(path),
            StreamSource::Bytes(reader) => VideoHandle::Stream {
                reader,
                format_hint: video.container_format().ok(),
            },
            StreamSource::Unsupported(what) => VideoHandle::Unsupported(what),
        })
    }

    /// Short state name used in logs.
    pub fn state(&self) -> &'static str {
        match self {
            VideoHandle::Path(_) => "path",
            VideoHandle::Stream { .. } => "stream",
            VideoHandle::Frames(_) => "frames",
            VideoHandle::Unsupported(_) => "unsupported",
        }
    }
}

impl fmt::Debug for VideoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoHandle::Path(p) => f.debug_tuple("Path").field(p).finish(),
            VideoHandle::Stream { format_hint, .. } => f
                .debug_struct("Stream")
                .field("format_hint", format_hint)
                .finish_non_exhaustive(),
            VideoHandle::Frames(b) => f.debug_tuple("Frames").field(&b.data().shape()).finish(),
            VideoHandle::Unsupported(what) => f.debug_tuple("Unsupported").field(what).finish(),
        }
    }
}

impl From<FrameBatch> for VideoHandle {
    fn from(value: FrameBatch) -> Self {
        VideoHandle::Frames(value)
    }
}

/// File extension for a container hint: first comma-separated name, `mp4` when missing.
pub fn extension_for(format_hint: Option<&str>) -> &str {
    format_hint
        .and_then(|h| h.split(',').next())
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("mp4")
}

/// Video backed by a file on disk, as produced by the merge node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFile {
    path: PathBuf,
}

impl VideoFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HostVideo for VideoFile {
    fn stream_source(&self) -> NodeResult<StreamSource> {
        Ok(StreamSource::Path(self.path.clone()))
    }

    fn components(&self, ctx: &NodeContext<'_>) -> NodeResult<VideoComponents> {
        let images = split_video(ctx, VideoHandle::path(&self.path), &SplitOpts::default())?;
        Ok(VideoComponents {
            images,
            frame_rate: None,
        })
    }

    fn container_format(&self) -> NodeResult<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .ok_or_else(|| {
                NodeError::unsupported(format!(
                    "'{}' has no extension",
                    self.path.display()
                ))
            })
    }
}

/// Video produced by a node: either a new file or the host's own object passed through.
#[derive(Clone, Debug)]
pub enum VideoRef {
    File(VideoFile),
    Host(Arc<dyn HostVideo>),
}

impl VideoRef {
    /// Path of the video when it is file-backed.
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            VideoRef::File(f) => Some(f.path()),
            VideoRef::Host(_) => None,
        }
    }
}
