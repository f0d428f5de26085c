mod support;

use std::sync::Arc;

use ffnodes::{
    HostVideo, MergeInput, MergeOpts, NodeContext, NodeError, NodeResult, SplitOpts,
    StreamSource, TempArea, VideoComponents, VideoFile, VideoHandle, VideoRef, merge_frames,
    split_video,
};
use support::{StubMode, StubTranscoder, entries, fake_video, ramp_batch};

fn area(tmp: &tempfile::TempDir) -> TempArea {
    TempArea::new(tmp.path().join("area"))
}

#[test]
fn split_path_extracts_frames_and_cleans_up() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Work);
    let ctx = NodeContext::new(&stub, &temp);
    let video = fake_video(tmp.path(), "clip.mp4", 5);

    let frames = split_video(&ctx, VideoHandle::path(&video), &SplitOpts::default()).unwrap();
    assert_eq!(frames.len(), 5);
    assert_eq!(frames.frame_shape(), [4, 6, 3]);
    assert_eq!(frames.data()[[3, 0, 0, 0]], 3.0 / 255.0);

    assert_eq!(stub.call_count(), 1);
    assert_eq!(stub.input_of(0), video);
    assert!(!stub.calls()[0].iter().any(|a| a == "-vf"));
    assert!(entries(temp.root()).is_empty());
}

#[test]
fn split_with_rate_passes_fps_filter() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Work);
    let ctx = NodeContext::new(&stub, &temp);
    let video = fake_video(tmp.path(), "clip.mp4", 2);

    split_video(&ctx, VideoHandle::path(&video), &SplitOpts::with_fps(12.0)).unwrap();
    let args = &stub.calls()[0];
    let vf = args.iter().position(|a| a == "-vf").unwrap();
    assert_eq!(args[vf + 1], "fps=12");
}

#[test]
fn split_returns_decoded_batch_without_running_transcoder() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Work);
    let ctx = NodeContext::new(&stub, &temp);
    let batch = ramp_batch(3, 2, 2, 3);

    let out = split_video(&ctx, batch.clone().into(), &SplitOpts::default()).unwrap();
    assert_eq!(out, batch);
    assert_eq!(stub.call_count(), 0);
    assert!(!temp.root().exists());
}

#[test]
fn split_rejects_unsupported_input() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Work);
    let ctx = NodeContext::new(&stub, &temp);

    let err = split_video(
        &ctx,
        VideoHandle::Unsupported("remote url".to_string()),
        &SplitOpts::default(),
    )
    .unwrap_err();
    assert!(matches!(err, NodeError::UnsupportedInput(_)));
    assert_eq!(stub.call_count(), 0);
}

#[test]
fn split_stream_spools_to_named_scratch_file() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Work);
    let ctx = NodeContext::new(&stub, &temp);

    let handle = VideoHandle::bytes(b"4".to_vec(), Some("mov,mp4,m4a".to_string()));
    let frames = split_video(&ctx, handle, &SplitOpts::default()).unwrap();
    assert_eq!(frames.len(), 4);

    let input = stub.input_of(0);
    let name = input.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("ffmpeg_input_"), "{name}");
    assert!(name.ends_with(".mov"), "{name}");
    assert_eq!(input.parent().unwrap(), temp.root());
    assert!(!input.exists());
    assert!(entries(temp.root()).is_empty());
}

#[test]
fn split_failure_propagates_tool_message_and_cleans_up() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Fail);
    let ctx = NodeContext::new(&stub, &temp);

    let handle = VideoHandle::bytes(b"4".to_vec(), None);
    let err = split_video(&ctx, handle, &SplitOpts::default()).unwrap_err();
    assert!(matches!(err, NodeError::ToolExecutionFailed { .. }));
    assert_eq!(err.to_string(), "stub: simulated failure");
    assert!(stub.input_of(0).to_string_lossy().ends_with(".mp4"));
    assert!(entries(temp.root()).is_empty());
}

#[test]
fn split_with_no_extracted_frames_is_empty_input() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Silent);
    let ctx = NodeContext::new(&stub, &temp);
    let video = fake_video(tmp.path(), "clip.mp4", 3);

    let err = split_video(&ctx, VideoHandle::path(&video), &SplitOpts::default()).unwrap_err();
    assert!(matches!(err, NodeError::EmptyInput(_)));
    assert!(entries(temp.root()).is_empty());
}

#[test]
fn merge_keeps_only_the_encoded_video() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Work);
    let ctx = NodeContext::new(&stub, &temp);
    let batch = ramp_batch(3, 4, 6, 3);

    let out = merge_frames(&ctx, batch.clone().into(), &MergeOpts::with_fps(24.0)).unwrap();
    assert_eq!(out.frames, batch);

    let path = out.video.file_path().unwrap().to_path_buf();
    assert_eq!(path.file_name().unwrap(), "output.mp4");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "3");

    let root = path.parent().unwrap();
    assert!(
        root.file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("ffmpeg_merge_")
    );
    assert_eq!(entries(root), vec!["output.mp4".to_string()]);
    assert_eq!(entries(temp.root()).len(), 1);

    let args = &stub.calls()[0];
    let rate = args.iter().position(|a| a == "-framerate").unwrap();
    assert_eq!(args[rate + 1], "24");
    assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
    assert!(args.windows(2).any(|w| w == ["-pix_fmt", "yuv420p"]));
}

#[test]
fn merge_without_output_file_fails_and_cleans_up() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Silent);
    let ctx = NodeContext::new(&stub, &temp);

    let err = merge_frames(&ctx, ramp_batch(2, 4, 4, 3).into(), &MergeOpts::default())
        .unwrap_err();
    match err {
        NodeError::EncodeProducedNoOutput { tool, path } => {
            assert_eq!(tool, "stub");
            assert_eq!(path.file_name().unwrap(), "output.mp4");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(entries(temp.root()).is_empty());
}

#[test]
fn merge_with_empty_output_file_fails_and_cleans_up() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Empty);
    let ctx = NodeContext::new(&stub, &temp);

    let err = merge_frames(&ctx, ramp_batch(2, 4, 4, 3).into(), &MergeOpts::default())
        .unwrap_err();
    assert!(matches!(err, NodeError::EncodeProducedNoOutput { .. }));
    assert_eq!(stub.call_count(), 1);
    assert!(entries(temp.root()).is_empty());
}

#[test]
fn merge_tool_failure_cleans_up() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Fail);
    let ctx = NodeContext::new(&stub, &temp);

    let err = merge_frames(&ctx, ramp_batch(2, 4, 4, 3).into(), &MergeOpts::default())
        .unwrap_err();
    assert!(matches!(err, NodeError::ToolExecutionFailed { .. }));
    assert!(entries(temp.root()).is_empty());
}

#[test]
fn merge_validates_before_touching_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Work);
    let ctx = NodeContext::new(&stub, &temp);

    let odd = merge_frames(&ctx, ramp_batch(2, 3, 4, 3).into(), &MergeOpts::default());
    assert!(matches!(odd, Err(NodeError::Validation(_))));
    let empty = merge_frames(&ctx, ramp_batch(0, 4, 4, 3).into(), &MergeOpts::default());
    assert!(matches!(empty, Err(NodeError::EmptyInput(_))));
    let zero_fps = merge_frames(&ctx, ramp_batch(1, 4, 4, 3).into(), &MergeOpts::with_fps(0.0));
    assert!(matches!(zero_fps, Err(NodeError::Validation(_))));

    assert_eq!(stub.call_count(), 0);
    assert!(!temp.root().exists());
}

#[derive(Debug)]
struct DecodedVideo;

impl HostVideo for DecodedVideo {
    fn stream_source(&self) -> NodeResult<StreamSource> {
        Ok(StreamSource::Unsupported("in-memory".to_string()))
    }

    fn components(&self, _ctx: &NodeContext<'_>) -> NodeResult<VideoComponents> {
        Ok(VideoComponents {
            images: ramp_batch(2, 2, 2, 3),
            frame_rate: Some(25.0),
        })
    }
}

#[test]
fn merge_passes_videos_through_with_their_frames() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Work);
    let ctx = NodeContext::new(&stub, &temp);

    let video: Arc<dyn HostVideo> = Arc::new(DecodedVideo);
    let out = merge_frames(&ctx, MergeInput::Video(video.clone()), &MergeOpts::default()).unwrap();
    assert_eq!(out.frames, ramp_batch(2, 2, 2, 3));
    match out.video {
        VideoRef::Host(v) => assert!(Arc::ptr_eq(&v, &video)),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(stub.call_count(), 0);
}

#[test]
fn merge_decodes_video_files_with_the_callers_transcoder() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Work);
    let ctx = NodeContext::new(&stub, &temp);
    let clip = fake_video(tmp.path(), "clip.mp4", 3);

    let video: Arc<dyn HostVideo> = Arc::new(VideoFile::new(&clip));
    let out = merge_frames(&ctx, MergeInput::Video(video), &MergeOpts::default()).unwrap();
    assert_eq!(out.frames.len(), 3);
    assert!(matches!(out.video, VideoRef::Host(_)));

    assert_eq!(stub.call_count(), 1);
    assert_eq!(stub.input_of(0), clip);
    assert!(!stub.calls()[0].iter().any(|a| a == "-framerate"));
    assert!(entries(temp.root()).is_empty());
}

#[test]
fn merged_video_splits_back_to_the_same_frame_count() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = area(&tmp);
    let stub = StubTranscoder::new(StubMode::Work);
    let ctx = NodeContext::new(&stub, &temp);

    let merged = merge_frames(&ctx, ramp_batch(7, 4, 6, 3).into(), &MergeOpts::default()).unwrap();
    let path = merged.video.file_path().unwrap().to_path_buf();
    let frames = split_video(&ctx, VideoHandle::path(&path), &SplitOpts::default()).unwrap();
    assert_eq!(frames.len(), merged.frames.len());
    assert_eq!(frames.frame_shape(), merged.frames.frame_shape());
}
