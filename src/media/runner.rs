use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::Context as _;
use serde::Deserialize;

use crate::foundation::error::{ReelError, ReelResult, Stage};
use crate::foundation::naming::timestamped_name;
use crate::media::command::FfmpegCommand;

/// What the pipeline needs to know about a media file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_sec: Option<f64>,
    pub fps: Option<f64>,
    pub has_audio: bool,
}

/// Executes ffmpeg commands and probes media files.
///
/// The pipeline only talks to this trait, so tests substitute a recorder.
pub trait MediaRunner: Send + Sync {
    /// Run `cmd`; a non-zero exit becomes a [`ReelError::Media`] attributed to `stage`.
    fn run(&self, stage: Stage, cmd: &FfmpegCommand) -> ReelResult<()>;

    fn probe(&self, path: &Path) -> ReelResult<MediaInfo>;
}

/// [`MediaRunner`] backed by the system `ffmpeg`/`ffprobe`.
#[derive(Clone, Debug)]
pub struct FfmpegRunner {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    log_dir: Option<PathBuf>,
    stderr_tail_lines: usize,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            log_dir: None,
            stderr_tail_lines: 20,
        }
    }
}

impl FfmpegRunner {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            ..Self::default()
        }
    }

    /// Keep each invocation's stdout/stderr as `<dir>/ffmpeg_<tag>_<stamp>.{out,err}.log`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    fn write_logs(&self, tag: &str, out: &Output) -> Option<PathBuf> {
        let dir = self.log_dir.as_ref()?;
        let err_name = timestamped_name(&format!("ffmpeg_{tag}"), "err.log");
        let out_path = dir.join(err_name.replace(".err.log", ".out.log"));
        let err_path = dir.join(err_name);
        let res = std::fs::create_dir_all(dir)
            .and_then(|_| std::fs::write(&out_path, &out.stdout))
            .and_then(|_| std::fs::write(&err_path, &out.stderr));
        match res {
            Ok(()) => Some(err_path),
            Err(e) => {
                tracing::warn!(tag, error = %e, "failed to write ffmpeg logs");
                None
            }
        }
    }
}

impl MediaRunner for FfmpegRunner {
    #[tracing::instrument(skip(self, cmd), fields(tag = cmd.tag()))]
    fn run(&self, stage: Stage, cmd: &FfmpegCommand) -> ReelResult<()> {
        cmd.validate()?;
        ensure_parent_dir(cmd.output())?;
        tracing::debug!(command = %cmd, "running ffmpeg");

        let out = Command::new(&self.ffmpeg)
            .args(["-y", "-loglevel", "error"])
            .args(cmd.to_args())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                ReelError::media(
                    stage,
                    format!("failed to spawn ffmpeg (is it installed and on PATH?): {e}"),
                )
            })?;
        let log = self.write_logs(cmd.tag(), &out);

        if !out.status.success() {
            let tail = stderr_tail(&out.stderr, self.stderr_tail_lines);
            tracing::error!(
                %stage,
                output = %cmd.output().display(),
                log = ?log,
                stderr = %tail,
                "ffmpeg failed"
            );
            return Err(ReelError::media(
                stage,
                format!("ffmpeg exited with status {}: {}", out.status, tail),
            ));
        }
        if !cmd.output().exists() {
            return Err(ReelError::media(
                stage,
                format!("ffmpeg produced no file at '{}'", cmd.output().display()),
            ));
        }
        Ok(())
    }

    fn probe(&self, path: &Path) -> ReelResult<MediaInfo> {
        let out = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| ReelError::media(Stage::Probe, format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(ReelError::media(
                Stage::Probe,
                format!(
                    "ffprobe failed for '{}': {}",
                    path.display(),
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            ));
        }
        parse_probe_json(&out.stdout)
    }
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output.
pub fn parse_probe_json(bytes: &[u8]) -> ReelResult<MediaInfo> {
    #[derive(Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        duration: Option<String>,
    }
    #[derive(Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| ReelError::media(Stage::Probe, format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let parse_secs = |s: Option<&String>| {
        s.and_then(|v| v.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
    };
    let duration_sec = parse_secs(parsed.format.as_ref().and_then(|f| f.duration.as_ref()))
        .or_else(|| parse_secs(video.and_then(|v| v.duration.as_ref())));

    Ok(MediaInfo {
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
        duration_sec,
        fps: video
            .and_then(|v| v.r_frame_rate.as_deref())
            .and_then(parse_ff_ratio)
            .map(|(n, d)| f64::from(n) / f64::from(d)),
        has_audio: parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")),
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let (a, b) = s.split_once('/')?;
    let a = a.parse::<u32>().ok()?;
    let b = b.parse::<u32>().ok()?;
    if a == 0 || b == 0 {
        return None;
    }
    Some((a, b))
}

/// Last `n` non-empty lines of ffmpeg's stderr.
pub(crate) fn stderr_tail(stderr: &[u8], n: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/media/runner.rs"]
mod tests;
