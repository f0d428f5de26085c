//! Frame sequences on disk: `frame_000001.png`, `frame_000002.png`, ...

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use ndarray::{Array4, ArrayView3};

use crate::foundation::batch::FrameBatch;
use crate::foundation::error::{NodeError, NodeResult};

const FRAME_PREFIX: &str = "frame_";
const FRAME_EXT: &str = "png";

/// Path of the 1-based frame `number` inside `dir`, matching `frame_%06d.png`.
pub fn frame_path(dir: &Path, number: u64) -> PathBuf {
    dir.join(format!("{FRAME_PREFIX}{number:06}.{FRAME_EXT}"))
}

/// Parse the frame number out of a `frame_%06d.png` file name.
fn frame_number(file_name: &str) -> Option<u64> {
    let digits = file_name
        .strip_prefix(FRAME_PREFIX)?
        .strip_suffix(FRAME_EXT)?
        .strip_suffix('.')?;
    if digits.len() < 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// List the numbered frame files in `dir`, ordered by frame number. Other entries are
/// ignored.
pub fn list_frames(dir: &Path) -> NodeResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read frame directory '{}'", dir.display()))?;

    let mut numbered = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in '{}'", dir.display()))?;
        let name = entry.file_name();
        let Some(number) = name.to_str().and_then(frame_number) else {
            continue;
        };
        numbered.push((number, entry.path()));
    }
    numbered.sort_by_key(|(n, _)| *n);
    Ok(numbered.into_iter().map(|(_, p)| p).collect())
}

/// Load every numbered frame in `dir` as an RGB batch with values in `[0, 1]`.
pub fn load_frames(dir: &Path) -> NodeResult<FrameBatch> {
    let paths = list_frames(dir)?;
    if paths.is_empty() {
        return Err(NodeError::empty(format!(
            "no frames found in '{}'",
            dir.display()
        )));
    }

    let mut dims: Option<(u32, u32)> = None;
    let mut data = Vec::new();
    for path in &paths {
        let rgb = image::open(path)
            .with_context(|| format!("failed to decode frame '{}'", path.display()))?
            .to_rgb8();
        let (w, h) = rgb.dimensions();
        match dims {
            None => {
                dims = Some((w, h));
                data.reserve(paths.len() * (w as usize) * (h as usize) * 3);
            }
            Some((w0, h0)) if (w0, h0) != (w, h) => {
                return Err(NodeError::shape_mismatch(format!(
                    "frame '{}' is {w}x{h}, expected {w0}x{h0}",
                    path.display()
                )));
            }
            Some(_) => {}
        }
        data.extend(rgb.as_raw().iter().map(|&v| f32::from(v) / 255.0));
    }

    let (w, h) = dims.unwrap_or((0, 0));
    let array = Array4::from_shape_vec((paths.len(), h as usize, w as usize, 3), data)
        .context("frame data does not match the decoded dimensions")?;
    Ok(FrameBatch::new(array))
}

/// Write every frame of `batch` into `dir` as `frame_000001.png`, `frame_000002.png`, ...
///
/// 1-, 3- and 4-channel frames are written as grayscale, RGB and RGBA PNGs.
pub fn save_frames(batch: &FrameBatch, dir: &Path) -> NodeResult<usize> {
    let color = color_type_for(batch.channels())?;
    let width = u32::try_from(batch.width())
        .map_err(|_| NodeError::validation("frame width does not fit in u32"))?;
    let height = u32::try_from(batch.height())
        .map_err(|_| NodeError::validation("frame height does not fit in u32"))?;

    let mut buf = Vec::with_capacity(batch.width() * batch.height() * batch.channels());
    for (idx, frame) in batch.frames().enumerate() {
        quantize_into(&mut buf, frame);
        let path = frame_path(dir, idx as u64 + 1);
        image::save_buffer_with_format(
            &path,
            &buf,
            width,
            height,
            color,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("failed to write frame '{}'", path.display()))?;
    }
    Ok(batch.len())
}

fn color_type_for(channels: usize) -> NodeResult<image::ColorType> {
    match channels {
        1 => Ok(image::ColorType::L8),
        3 => Ok(image::ColorType::Rgb8),
        4 => Ok(image::ColorType::Rgba8),
        n => Err(NodeError::unsupported(format!(
            "frames with {n} channels cannot be written as images (expected 1, 3 or 4)"
        ))),
    }
}

fn quantize_into(buf: &mut Vec<u8>, frame: ArrayView3<'_, f32>) {
    buf.clear();
    buf.extend(frame.iter().map(|&v| quantize(v)));
}

fn quantize(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
