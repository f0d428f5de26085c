#[cfg(feature = "media-ffmpeg")]
mod media_pipeline {
    use std::path::Path;
    use std::process::Command;

    use ffnodes::{
        FfmpegCli, MergeOpts, NodeContext, SplitOpts, TempArea, VideoHandle, merge_frames,
        split_video,
    };
    use ndarray::Array4;

    fn ffmpeg_available() -> bool {
        FfmpegCli::default().is_available()
    }

    fn synth_clip(path: &Path) -> anyhow::Result<()> {
        let status = Command::new("ffmpeg")
            .args([
                "-v",
                "error",
                "-y",
                "-f",
                "lavfi",
                "-i",
                "testsrc=size=64x48:rate=10",
                "-t",
                "1",
                "-pix_fmt",
                "yuv420p",
                "-c:v",
                "libx264",
            ])
            .arg(path)
            .status()?;
        anyhow::ensure!(status.success(), "ffmpeg failed creating clip.mp4");
        Ok(())
    }

    #[test]
    fn split_real_clip_at_native_and_reduced_rate() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        synth_clip(&clip).unwrap();

        let transcoder = FfmpegCli::default();
        let temp = TempArea::new(dir.path().join("scratch"));
        let ctx = NodeContext::new(&transcoder, &temp);

        let native = split_video(&ctx, VideoHandle::path(&clip), &SplitOpts::default()).unwrap();
        assert_eq!(native.len(), 10);
        assert_eq!(native.frame_shape(), [48, 64, 3]);

        let halved =
            split_video(&ctx, VideoHandle::path(&clip), &SplitOpts::with_fps(5.0)).unwrap();
        assert!((4..=6).contains(&halved.len()), "{}", halved.len());

        let bytes = std::fs::read(&clip).unwrap();
        let streamed = split_video(
            &ctx,
            VideoHandle::bytes(bytes, Some("mov,mp4,m4a,3gp,3g2,mj2".to_string())),
            &SplitOpts::default(),
        )
        .unwrap();
        assert_eq!(streamed.len(), native.len());
        assert!(std::fs::read_dir(temp.root()).unwrap().next().is_none());
    }

    #[test]
    fn merge_then_split_round_trips_frame_count() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegCli::default();
        let temp = TempArea::new(dir.path().join("scratch"));
        let ctx = NodeContext::new(&transcoder, &temp);

        let frames = Array4::from_shape_fn((12, 32, 48, 3), |(n, y, x, c)| {
            ((n * 7 + y + x * 3 + c * 11) % 256) as f32 / 255.0
        });
        let merged = merge_frames(
            &ctx,
            ffnodes::FrameBatch::new(frames).into(),
            &MergeOpts::with_fps(24.0),
        )
        .unwrap();
        let path = merged.video.file_path().unwrap().to_path_buf();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);

        let split = split_video(&ctx, VideoHandle::path(&path), &SplitOpts::default()).unwrap();
        assert!(split.len().abs_diff(12) <= 1, "{}", split.len());
        assert_eq!(split.frame_shape(), [32, 48, 3]);
    }
}
