use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::foundation::error::{NodeError, NodeResult};
use crate::transcode::{Invocation, Transcoder};

/// Flags prepended to every invocation: no banner, errors only.
pub const QUIET_FLAGS: [&str; 3] = ["-hide_banner", "-loglevel", "error"];

/// Runs the system `ffmpeg` binary (or a compatible one) as a blocking subprocess.
///
/// The program is looked up on `PATH` on every run, so a missing binary is reported as
/// [`NodeError::ToolNotFound`] without any process being started.
#[derive(Clone, Debug)]
pub struct FfmpegCli {
    program: OsString,
    name: String,
}

impl Default for FfmpegCli {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegCli {
    /// Use `program`, either a bare name searched on `PATH` or an explicit path.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        let program = program.as_ref().to_os_string();
        let name = Path::new(&program)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string_lossy().into_owned());
        Self { program, name }
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Resolve the program to an executable path, if it can be found.
    pub fn locate(&self) -> Option<PathBuf> {
        find_program(&self.program)
    }

    /// Return `true` when the program resolves on `PATH`.
    pub fn is_available(&self) -> bool {
        self.locate().is_some()
    }
}

impl Transcoder for FfmpegCli {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, invocation: Invocation) -> NodeResult<()> {
        let program = self
            .locate()
            .ok_or_else(|| NodeError::tool_not_found(&self.name))?;

        tracing::debug!(program = %program.display(), args = %invocation, "running transcoder");

        let output = Command::new(&program)
            .args(QUIET_FLAGS)
            .args(invocation.into_args())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    NodeError::tool_not_found(&self.name)
                } else {
                    NodeError::tool_failed(
                        &self.name,
                        format!("failed to start {}: {e}", self.name),
                    )
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::trace!(stdout = %stdout.trim(), "transcoder stdout");
        }

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = match stderr.trim() {
            "" => match output.status.code() {
                Some(code) => format!("{} failed with exit code {code}", self.name),
                None => format!("{} was terminated ({})", self.name, output.status),
            },
            text => text.to_string(),
        };
        Err(NodeError::tool_failed(&self.name, message))
    }
}

/// Resolve `program` the way a shell would: names containing a path separator are used
/// as given, bare names are searched in each `PATH` entry.
pub fn find_program(program: &OsStr) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| executable_names(program).map(move |name| dir.join(name)))
        .find(|p| is_executable(p))
}

#[cfg(windows)]
fn executable_names(program: &OsStr) -> impl Iterator<Item = OsString> {
    let bare = program.to_os_string();
    let mut exe = bare.clone();
    exe.push(".exe");
    [bare, exe].into_iter()
}

#[cfg(not(windows))]
fn executable_names(program: &OsStr) -> impl Iterator<Item = OsString> {
    std::iter::once(program.to_os_string())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt as _;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
