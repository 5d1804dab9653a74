use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use super::*;
use crate::media::command::FfmpegCommand;
use crate::media::runner::MediaInfo;

/// Knows the durations of the source clips only; stitched intermediates fail to probe.
#[derive(Default)]
struct Recorder {
    durations: HashMap<PathBuf, f64>,
    runs: Mutex<Vec<FfmpegCommand>>,
}

impl MediaRunner for Recorder {
    fn run(&self, _stage: Stage, cmd: &FfmpegCommand) -> ReelResult<()> {
        self.runs.lock().unwrap().push(cmd.clone());
        Ok(())
    }

    fn probe(&self, path: &Path) -> ReelResult<MediaInfo> {
        self.durations
            .get(path)
            .map(|d| MediaInfo {
                duration_sec: Some(*d),
                ..MediaInfo::default()
            })
            .ok_or_else(|| ReelError::media(Stage::Probe, "unknown file"))
    }
}

fn stitcher() -> SegmentStitcher {
    SegmentStitcher::new(0.7, EncodeProfile::default())
}

#[test]
fn single_clip_passes_through_without_commands() {
    let runner = Recorder::default();
    let clip = ClipRef::new("a.mp4", 5.0);
    let out = stitcher()
        .stitch(&runner, std::slice::from_ref(&clip), Path::new("tmp"))
        .unwrap();
    assert_eq!(out, clip);
    assert!(runner.runs.lock().unwrap().is_empty());
}

#[test]
fn empty_input_is_rejected() {
    let err = stitcher()
        .stitch(&Recorder::default(), &[], Path::new("tmp"))
        .unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[test]
fn two_ten_second_clips_fade_at_nine_point_three() {
    let runner = Recorder {
        durations: HashMap::from([(PathBuf::from("a.mp4"), 10.0), (PathBuf::from("b.mp4"), 10.0)]),
        ..Recorder::default()
    };
    let clips = [ClipRef::new("a.mp4", 10.0), ClipRef::new("b.mp4", 10.0)];
    let out = stitcher().stitch(&runner, &clips, Path::new("tmp")).unwrap();

    assert!((out.duration_sec - 19.3).abs() < 1e-9);
    assert!((stitcher().planned_duration(&clips) - 19.3).abs() < 1e-9);
    let runs = runner.runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    let graph = runs[0].arg_value("-filter_complex").unwrap();
    assert!(graph.contains("xfade=transition=fade:duration=0.7:offset=9.3"), "{graph}");
    assert!(runs[0].has_arg("-an"));
    assert!(out.path.starts_with("tmp"));
}

#[test]
fn fold_feeds_each_result_into_the_next_step() {
    let runner = Recorder {
        durations: HashMap::from([(PathBuf::from("a.mp4"), 10.0)]),
        ..Recorder::default()
    };
    let clips = [
        ClipRef::new("a.mp4", 10.0),
        ClipRef::new("b.mp4", 8.0),
        ClipRef::new("c.mp4", 6.0),
    ];
    let out = stitcher().stitch(&runner, &clips, Path::new("tmp")).unwrap();
    assert!((out.duration_sec - (24.0 - 2.0 * 0.7)).abs() < 1e-9);

    let runs = runner.runs.lock().unwrap();
    assert_eq!(runs.len(), 2);
    // Second step's left operand is the first step's output.
    assert_eq!(runs[1].inputs()[0].path, runs[0].output());
    assert_eq!(runs[1].inputs()[1].path, PathBuf::from("c.mp4"));
    let graph = runs[1].arg_value("-filter_complex").unwrap();
    assert!(graph.contains("offset=16.6"), "{graph}");
}

#[test]
fn probe_failure_falls_back_to_declared_duration() {
    let runner = Recorder::default();
    let clips = [ClipRef::new("a.mp4", 4.0), ClipRef::new("b.mp4", 4.0)];
    stitcher().stitch(&runner, &clips, Path::new("tmp")).unwrap();
    let graph = runner.runs.lock().unwrap()[0]
        .arg_value("-filter_complex")
        .unwrap();
    assert!(graph.contains("offset=3.3"), "{graph}");
}
