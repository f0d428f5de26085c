//! External transcoder invocation.
//!
//! Nodes describe what they want done as an [`Invocation`] and hand it to a [`Transcoder`],
//! which blocks until the external process has exited.

use std::ffi::{OsStr, OsString};
use std::path::Path;

use crate::foundation::error::NodeResult;

/// `ffmpeg` command-line backend.
pub mod ffmpeg;

/// File name pattern used for frame sequences on both the extract and encode side.
pub const FRAME_PATTERN: &str = "frame_%06d.png";

/// Something that can run one transcoder invocation to completion.
pub trait Transcoder {
    /// Name used in diagnostics (for example `"ffmpeg"`).
    fn name(&self) -> &str;

    /// Run `invocation`, blocking until the process exits.
    ///
    /// Returns `Ok(())` only for a zero exit status.
    fn run(&self, invocation: Invocation) -> NodeResult<()>;
}

/// Argument list for a single transcoder run, without the fixed quiet flags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn as_slice(&self) -> &[OsString] {
        &self.args
    }

    pub fn into_args(self) -> Vec<OsString> {
        self.args
    }

    /// Decode `input` into numbered PNGs inside `frames_dir`.
    ///
    /// A rate filter is only added for a finite, positive `fps`; otherwise frames are
    /// extracted at the source's native rate.
    pub fn extract_frames(input: &Path, frames_dir: &Path, fps: f64) -> Self {
        let mut inv = Self::new().arg("-y").arg("-i").arg(input);
        if fps.is_finite() && fps > 0.0 {
            inv = inv.arg("-vf").arg(format!("fps={fps}"));
        }
        inv.args(["-vsync", "0"]).arg(frames_dir.join(FRAME_PATTERN))
    }

    /// Encode the numbered PNGs inside `frames_dir` into `output`.
    pub fn encode_frames(
        frames_dir: &Path,
        fps: f64,
        codec: &str,
        pix_fmt: &str,
        output: &Path,
    ) -> Self {
        Self::new()
            .arg("-y")
            .arg("-framerate")
            .arg(format!("{fps}"))
            .arg("-i")
            .arg(frames_dir.join(FRAME_PATTERN))
            .args(["-c:v", codec, "-pix_fmt", pix_fmt])
            .arg(output)
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
