use std::collections::HashMap;
use std::sync::Mutex;

use super::*;
use crate::assemble::job::ClipRef;
use crate::effects::watermark::{WatermarkConfig, WatermarkMode};
use crate::media::runner::MediaInfo;
use crate::title::plan::TitleSpec;

/// Records every command, writes a placeholder output, fails the listed tags.
#[derive(Default)]
struct FakeRunner {
    fail_tags: Vec<&'static str>,
    durations: HashMap<PathBuf, f64>,
    runs: Mutex<Vec<(Stage, FfmpegCommand)>>,
}

impl FakeRunner {
    fn failing(tags: &[&'static str]) -> Self {
        Self {
            fail_tags: tags.to_vec(),
            ..Self::default()
        }
    }

    fn tags(&self) -> Vec<String> {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.tag().to_string())
            .collect()
    }

    fn command(&self, tag: &str) -> FfmpegCommand {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .find(|(_, c)| c.tag() == tag)
            .map(|(_, c)| c.clone())
            .unwrap()
    }
}

impl MediaRunner for FakeRunner {
    fn run(&self, stage: Stage, cmd: &FfmpegCommand) -> ReelResult<()> {
        self.runs.lock().unwrap().push((stage, cmd.clone()));
        if self.fail_tags.contains(&cmd.tag()) {
            return Err(ReelError::media(stage, format!("{} exited with 1", cmd.tag())));
        }
        ensure_parent_dir(cmd.output())?;
        std::fs::write(cmd.output(), cmd.tag()).unwrap();
        Ok(())
    }

    fn probe(&self, path: &Path) -> ReelResult<MediaInfo> {
        self.durations
            .get(path)
            .map(|d| MediaInfo {
                width: Some(720),
                height: Some(1280),
                duration_sec: Some(*d),
                fps: Some(24.0),
                has_audio: false,
            })
            .ok_or_else(|| ReelError::media(Stage::Probe, "no such file"))
    }
}

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn file(&self, name: &str) -> PathBuf {
        let p = self.dir.path().join(name);
        std::fs::write(&p, b"data").unwrap();
        p
    }

    fn png(&self, name: &str, w: u32, h: u32) -> PathBuf {
        let p = self.dir.path().join(name);
        image::RgbaImage::new(w, h).save(&p).unwrap();
        p
    }

    fn temp(&self) -> PathBuf {
        self.dir.path().join("renders/temp")
    }

    fn job(&self, clips: &[(&str, f64)]) -> RenderJob {
        let clips = clips
            .iter()
            .map(|(name, d)| ClipRef::new(self.file(name), *d))
            .collect();
        RenderJob::new(clips, self.dir.path().join("renders/final.mp4"))
    }

    fn params(&self) -> AssemblyParams {
        AssemblyParams {
            corner_watermark: Some(CornerWatermark {
                path: self.dir.path().join("no_corner.png"),
                ..CornerWatermark::default()
            }),
            full_watermark_image: self.dir.path().join("no_full.png"),
            ..AssemblyParams::default()
        }
    }
}

fn pipeline(runner: &Arc<FakeRunner>, params: AssemblyParams) -> OverlayPipeline {
    OverlayPipeline::new(runner.clone(), params)
}

#[test]
fn single_clip_without_extras_is_only_remuxed() {
    let fx = Fixture::new();
    let runner = Arc::new(FakeRunner::default());
    let job = fx.job(&[("a.mp4", 5.0)]);

    let report = pipeline(&runner, fx.params()).run(&job, &fx.temp()).unwrap();

    assert_eq!(runner.tags(), ["faststart_copy"]);
    assert_eq!(std::fs::read(&job.output).unwrap(), b"faststart_copy");
    assert_eq!(report.outcome(Stage::Mux), Some(&StageOutcome::Applied));
    assert!(matches!(
        report.outcome(Stage::CornerWatermark),
        Some(StageOutcome::Skipped { .. })
    ));
    assert_eq!(report.planned_duration_sec, 5.0);
}

#[test]
fn two_clips_with_music_stitch_then_mux() {
    let fx = Fixture::new();
    let mut job = fx.job(&[("a.mp4", 10.0), ("b.mp4", 10.0)]);
    job.music = Some(fx.file("song.mp3"));
    let runner = Arc::new(FakeRunner {
        durations: job
            .clips
            .iter()
            .map(|c| (c.path.clone(), c.duration_sec))
            .collect(),
        ..FakeRunner::default()
    });

    let report = pipeline(&runner, fx.params()).run(&job, &fx.temp()).unwrap();

    assert_eq!(runner.tags(), ["xfade", "mux_music"]);
    assert!((report.planned_duration_sec - 19.3).abs() < 1e-9);
    let mux = runner.command("mux_music");
    let args = mux.to_arg_strings();
    let music = job.music.as_ref().unwrap().to_str().unwrap();
    assert_eq!(&args[..4], ["-stream_loop", "-1", "-i", music]);
    assert_eq!(mux.arg_value("-af").as_deref(), Some("volume=0.6"));
    assert_eq!(mux.arg_value("-c:v").as_deref(), Some("copy"));
    assert!(mux.has_arg("-shortest"));
    assert_eq!(mux.output(), job.output);
    // The mux reads the stitched file.
    let xfade_out = runner.command("xfade").output().to_path_buf();
    assert_eq!(mux.inputs()[1].path, xfade_out);
}

#[test]
fn concat_falls_back_to_reencode_when_copy_fails() {
    let fx = Fixture::new();
    let runner = Arc::new(FakeRunner::failing(&["concat_copy"]));
    let p = pipeline(&runner, fx.params());
    let tmp = TempNames::new(&fx.temp());
    let segments = [fx.file("stitched.mp4"), fx.file("title.mp4")];
    let mut report = AssemblyReport::new(PathBuf::from("out.mp4"));

    let out = p.concat(&segments, &tmp, &mut report).unwrap();

    assert_eq!(runner.tags(), ["concat_copy", "concat_reencode"]);
    assert!(out.is_file());
    let reencode = runner.command("concat_reencode");
    assert_eq!(reencode.arg_value("-r").as_deref(), Some("24"));
    assert_eq!(reencode.arg_value("-b:a").as_deref(), Some("192k"));
    assert!(matches!(
        report.outcome(Stage::Concat),
        Some(StageOutcome::Fallback { .. })
    ));

    let list = std::fs::read_to_string(&reencode.inputs()[0].path).unwrap();
    let lines: Vec<&str> = list.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.starts_with("file '/")));
    assert!(lines[1].ends_with("title.mp4'"));
}

#[test]
fn concat_failure_after_fallback_is_fatal() {
    let fx = Fixture::new();
    let runner = Arc::new(FakeRunner::failing(&["concat_copy", "concat_reencode"]));
    let p = pipeline(&runner, fx.params());
    let segments = [fx.file("a.mp4"), fx.file("b.mp4")];
    let err = p
        .concat(
            &segments,
            &TempNames::new(&fx.temp()),
            &mut AssemblyReport::new(PathBuf::from("out.mp4")),
        )
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Concat));
}

#[test]
fn failing_optional_stages_are_skipped() {
    let fx = Fixture::new();
    let mut job = fx.job(&[("a.mp4", 5.0)]);
    job.background_overlay = Some(fx.png("bg.png", 8, 8));
    let mut params = fx.params();
    params.corner_watermark = Some(CornerWatermark {
        path: fx.png("corner.png", 240, 60),
        ..CornerWatermark::default()
    });
    let runner = Arc::new(FakeRunner::failing(&["bg_overlay", "wm_corner"]));

    let report = pipeline(&runner, params).run(&job, &fx.temp()).unwrap();

    assert_eq!(runner.tags(), ["bg_overlay", "wm_corner", "faststart_copy"]);
    for stage in [Stage::AmbientBackground, Stage::CornerWatermark] {
        assert!(
            matches!(report.outcome(stage), Some(StageOutcome::Skipped { reason }) if reason.contains("exited")),
            "{stage}"
        );
    }
    // The remux still reads the original clip.
    assert_eq!(runner.command("faststart_copy").inputs()[0].path, job.clips[0].path);
    assert!(job.output.is_file());
}

#[test]
fn applied_stages_chain_their_outputs() {
    let fx = Fixture::new();
    let mut job = fx.job(&[("a.mp4", 5.0)]);
    job.background_overlay = Some(fx.png("bg.png", 8, 8));
    let mut params = fx.params();
    params.corner_watermark = Some(CornerWatermark {
        path: fx.png("corner.png", 240, 60),
        ..CornerWatermark::default()
    });
    let runner = Arc::new(FakeRunner::default());

    pipeline(&runner, params).run(&job, &fx.temp()).unwrap();

    let bg = runner.command("bg_overlay");
    let corner = runner.command("wm_corner");
    assert_eq!(corner.inputs()[0].path, bg.output());
    assert_eq!(
        runner.command("faststart_copy").inputs()[0].path,
        corner.output()
    );
}

#[test]
fn grid_watermark_tiles_every_cell() {
    let fx = Fixture::new();
    let mut job = fx.job(&[("a.mp4", 5.0)]);
    job.watermark = Some(WatermarkConfig {
        mode: WatermarkMode::Grid,
        ..WatermarkConfig::default()
    });
    let mut params = fx.params();
    params.full_watermark_image = fx.png("mark.png", 400, 200);
    let runner = Arc::new(FakeRunner {
        durations: HashMap::from([(job.clips[0].path.clone(), 5.0)]),
        ..FakeRunner::default()
    });

    let report = pipeline(&runner, params).run(&job, &fx.temp()).unwrap();

    assert_eq!(report.outcome(Stage::FullWatermark), Some(&StageOutcome::Applied));
    let wm = runner.command("wm_fullscreen");
    let graph = wm.graph().unwrap();
    graph.validate().unwrap();
    let text = graph.to_string();
    assert!(text.contains("scale=208:104,split=18"), "{text}");
    assert_eq!(text.matches("overlay=").count(), 18);
    assert!(text.ends_with("[v]"));
}

#[test]
fn missing_watermark_image_skips_the_stage() {
    let fx = Fixture::new();
    let mut job = fx.job(&[("a.mp4", 5.0)]);
    job.watermark = Some(WatermarkConfig::default());
    let runner = Arc::new(FakeRunner::default());

    let report = pipeline(&runner, fx.params()).run(&job, &fx.temp()).unwrap();

    assert!(matches!(
        report.outcome(Stage::FullWatermark),
        Some(StageOutcome::Skipped { .. })
    ));
    assert!(!runner.tags().iter().any(|t| t == "wm_fullscreen"));
}

#[test]
fn mux_failure_is_fatal() {
    let fx = Fixture::new();
    let mut job = fx.job(&[("a.mp4", 5.0)]);
    job.music = Some(fx.file("song.mp3"));
    let runner = Arc::new(FakeRunner::failing(&["mux_music"]));

    let err = pipeline(&runner, fx.params()).run(&job, &fx.temp()).unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Mux));
    assert!(!job.output.exists());
}

#[test]
fn faststart_failure_still_delivers_a_copy() {
    let fx = Fixture::new();
    let job = fx.job(&[("a.mp4", 5.0)]);
    let runner = Arc::new(FakeRunner::failing(&["faststart_copy"]));

    let report = pipeline(&runner, fx.params()).run(&job, &fx.temp()).unwrap();

    assert_eq!(std::fs::read(&job.output).unwrap(), b"data");
    assert!(matches!(
        report.outcome(Stage::Mux),
        Some(StageOutcome::Fallback { .. })
    ));
}

#[test]
fn missing_music_is_rejected_before_any_work() {
    let fx = Fixture::new();
    let mut job = fx.job(&[("a.mp4", 5.0)]);
    job.music = Some(fx.dir.path().join("absent.mp3"));
    let runner = Arc::new(FakeRunner::default());

    let err = pipeline(&runner, fx.params()).run(&job, &fx.temp()).unwrap_err();

    assert!(matches!(err, ReelError::Validation(_)));
    assert!(runner.tags().is_empty());
}

#[test]
fn title_without_fonts_is_skipped() {
    let fx = Fixture::new();
    let mut job = fx.job(&[("a.mp4", 5.0)]);
    job.title = Some(TitleSpec::Plain {
        text: "In loving memory".to_string(),
    });
    let mut params = fx.params();
    params.fonts = FontConfig {
        regular: vec![fx.dir.path().join("none.ttf")],
        bold: vec![],
    };
    let runner = Arc::new(FakeRunner::default());

    let report = pipeline(&runner, params).run(&job, &fx.temp()).unwrap();

    assert!(matches!(
        report.outcome(Stage::Title),
        Some(StageOutcome::Skipped { .. })
    ));
    assert!(matches!(
        report.outcome(Stage::Concat),
        Some(StageOutcome::Skipped { .. })
    ));
    assert_eq!(report.planned_duration_sec, 5.0);
}

#[test]
fn concat_entries_are_absolute_and_quote_escaped() {
    let entry = concat_list_entry(Path::new("/tmp/it's here.mp4")).unwrap();
    assert_eq!(entry, r"file '/tmp/it'\''s here.mp4'");

    let relative = concat_list_entry(Path::new("clip.mp4")).unwrap();
    let inner = relative
        .strip_prefix("file '")
        .and_then(|s| s.strip_suffix('\''))
        .unwrap();
    assert!(Path::new(inner).is_absolute());
}
