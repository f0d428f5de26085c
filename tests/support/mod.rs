#![allow(dead_code)]

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ffnodes::foundation::batch::FrameBatch;
use ffnodes::foundation::error::{NodeError, NodeResult};
use ffnodes::frames::{list_frames, save_frames};
use ffnodes::{Invocation, Transcoder};
use ndarray::Array4;

/// How the stub responds to an invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StubMode {
    /// Extraction writes `N` frames, where `N` is the integer stored in the input file.
    /// Encoding writes the number of input frames to the output file.
    Work,
    /// Exit as if the tool had failed.
    Fail,
    /// Succeed without writing anything.
    Silent,
    /// Succeed after creating a zero-byte output file.
    Empty,
}

/// In-process stand-in for ffmpeg that records every invocation.
#[derive(Debug)]
pub struct StubTranscoder {
    mode: StubMode,
    frame_size: (usize, usize),
    calls: Mutex<Vec<Vec<OsString>>>,
}

impl StubTranscoder {
    pub fn new(mode: StubMode) -> Self {
        Self {
            mode,
            frame_size: (4, 6),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|args| {
                args.iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect()
            })
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Path passed after `-i` in the given recorded call.
    pub fn input_of(&self, call: usize) -> PathBuf {
        let calls = self.calls();
        let args = &calls[call];
        let pos = args.iter().position(|a| a == "-i").unwrap();
        PathBuf::from(&args[pos + 1])
    }

    fn extract(&self, args: &[OsString]) -> NodeResult<()> {
        let input = arg_after(args, "-i");
        let count: usize = std::fs::read_to_string(&input)
            .map_err(|e| NodeError::tool_failed("stub", format!("{}: {e}", input.display())))?
            .trim()
            .parse()
            .map_err(|_| NodeError::tool_failed("stub", "input is not a frame count"))?;
        let out_dir = last_path(args).parent().unwrap().to_path_buf();
        let (h, w) = self.frame_size;
        let mut data = Array4::<f32>::zeros((count, h, w, 3));
        for i in 0..count {
            data[[i, 0, 0, 0]] = i as f32 / 255.0;
        }
        save_frames(&FrameBatch::new(data), &out_dir)?;
        Ok(())
    }

    fn encode(&self, args: &[OsString]) -> NodeResult<()> {
        let pattern = arg_after(args, "-i");
        let frames = list_frames(pattern.parent().unwrap())?;
        std::fs::write(last_path(args), frames.len().to_string())
            .map_err(|e| NodeError::tool_failed("stub", e.to_string()))?;
        Ok(())
    }
}

impl Transcoder for StubTranscoder {
    fn name(&self) -> &str {
        "stub"
    }

    fn run(&self, invocation: Invocation) -> NodeResult<()> {
        let args = invocation.into_args();
        self.calls.lock().unwrap().push(args.clone());
        match self.mode {
            StubMode::Fail => Err(NodeError::tool_failed("stub", "stub: simulated failure")),
            StubMode::Silent => Ok(()),
            StubMode::Empty => std::fs::write(last_path(&args), b"")
                .map_err(|e| NodeError::tool_failed("stub", e.to_string())),
            StubMode::Work if args.iter().any(|a| a == "-framerate") => self.encode(&args),
            StubMode::Work => self.extract(&args),
        }
    }
}

fn arg_after(args: &[OsString], flag: &str) -> PathBuf {
    let pos = args.iter().position(|a| a == flag).unwrap();
    PathBuf::from(&args[pos + 1])
}

fn last_path(args: &[OsString]) -> PathBuf {
    PathBuf::from(args.last().unwrap())
}

/// Write a fake "video" whose content tells the stub how many frames to extract.
pub fn fake_video(dir: &Path, name: &str, frames: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, frames.to_string()).unwrap();
    path
}

/// Entries currently inside `dir`, sorted by name.
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(rd) => rd
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// Batch of `n` frames of `h`x`w`x`c`, frame `i` filled with `i / 255`.
pub fn ramp_batch(n: usize, h: usize, w: usize, c: usize) -> FrameBatch {
    let mut data = Array4::<f32>::zeros((n, h, w, c));
    for (i, mut frame) in data.outer_iter_mut().enumerate() {
        frame.fill(i as f32 / 255.0);
    }
    FrameBatch::new(data)
}
