//! Scoped temporary files and directories.
//!
//! Every entity handed out here is removed when its guard is dropped, on success and error
//! paths alike. Removal failures are logged and otherwise ignored so they never replace the
//! error that is already propagating.

use std::io::{Read, Seek, SeekFrom, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tempfile::{TempDir, TempPath};

use crate::foundation::error::NodeResult;

/// Host-managed directory under which per-invocation scratch entities are created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TempArea {
    root: PathBuf,
}

impl Default for TempArea {
    fn default() -> Self {
        Self::system()
    }
}

impl TempArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<system temp dir>/ffnodes`.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir().join("ffnodes"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the root, creating it if it does not exist yet.
    pub fn ensure(&self) -> NodeResult<&Path> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create temp area '{}'", self.root.display()))?;
        Ok(&self.root)
    }

    /// Create a uniquely named directory `<root>/<prefix>XXXXXX`.
    pub fn scratch_dir(&self, prefix: &str) -> NodeResult<ScratchDir> {
        ScratchDir::create_in(self.ensure()?, prefix)
    }

    /// Create a uniquely named file `<root>/<prefix>XXXXXX<suffix>` holding all bytes of
    /// `source`, read from its start.
    pub fn scratch_file_from<R: Read + Seek + ?Sized>(
        &self,
        prefix: &str,
        suffix: &str,
        source: &mut R,
    ) -> NodeResult<ScratchFile> {
        let root = self.ensure()?;
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(root)
            .with_context(|| format!("failed to create temp file in '{}'", root.display()))?;

        source
            .seek(SeekFrom::Start(0))
            .context("failed to rewind video stream")?;
        let written = std::io::copy(source, file.as_file_mut())
            .with_context(|| format!("failed to write '{}'", file.path().display()))?;
        file.as_file_mut()
            .flush()
            .with_context(|| format!("failed to flush '{}'", file.path().display()))?;

        let path = file.into_temp_path();
        tracing::debug!(path = %path.display(), bytes = written, "wrote scratch file");
        Ok(ScratchFile {
            path: path.to_path_buf(),
            guard: Some(path),
        })
    }
}

/// Temporary directory removed (recursively) on drop unless [`ScratchDir::keep`] is called.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    guard: Option<TempDir>,
}

impl ScratchDir {
    /// Create a uniquely named directory `<parent>/<prefix>XXXXXX`.
    pub fn create_in(parent: &Path, prefix: &str) -> NodeResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(parent)
            .with_context(|| format!("failed to create temp directory in '{}'", parent.display()))?;
        tracing::debug!(path = %dir.path().display(), "created scratch directory");
        Ok(Self {
            path: dir.path().to_path_buf(),
            guard: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Give up ownership: the directory stays on disk and its path is returned.
    pub fn keep(mut self) -> PathBuf {
        if let Some(dir) = self.guard.take() {
            let _ = dir.keep();
        }
        std::mem::take(&mut self.path)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.guard.take()
            && let Err(e) = dir.close()
        {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove scratch directory"
            );
        }
    }
}

/// Temporary file removed on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    guard: Option<TempPath>,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(path) = self.guard.take()
            && let Err(e) = path.close()
        {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove scratch file"
            );
        }
    }
}
