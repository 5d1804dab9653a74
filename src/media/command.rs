use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::fmt_num;
use crate::media::graph::FilterGraph;

/// Output encoding shared by every stage: H.264/yuv420p video and AAC audio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeProfile {
    pub fps: Fps,
    pub video_codec: String,
    pub crf: u8,
    pub preset: String,
    pub pix_fmt: String,
    pub audio_codec: String,
    pub audio_sample_rate: u32,
    pub audio_bitrate: String,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            video_codec: "libx264".to_string(),
            crf: 18,
            preset: "veryfast".to_string(),
            pix_fmt: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_sample_rate: 44_100,
            audio_bitrate: "192k".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputKind {
    File,
    /// A still image repeated forever (`-loop 1`).
    LoopedImage,
    /// A media file restarted at EOF forever (`-stream_loop -1`).
    StreamLoop,
    /// An ffconcat list (`-f concat -safe 0`).
    ConcatList,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Input {
    pub kind: InputKind,
    pub path: PathBuf,
}

/// One ffmpeg invocation: inputs, optional filter graph, output options and output path.
///
/// The runner adds `-y -loglevel error` in front; everything else is explicit here.
#[derive(Clone, Debug, PartialEq)]
pub struct FfmpegCommand {
    tag: String,
    inputs: Vec<Input>,
    graph: Option<FilterGraph>,
    output_args: Vec<OsString>,
    output: PathBuf,
}

impl FfmpegCommand {
    /// `tag` names the invocation in logs and log file names.
    pub fn new(tag: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            tag: tag.into(),
            inputs: Vec::new(),
            graph: None,
            output_args: Vec::new(),
            output: output.into(),
        }
    }

    fn push_input(mut self, kind: InputKind, path: &Path) -> Self {
        self.inputs.push(Input {
            kind,
            path: path.to_path_buf(),
        });
        self
    }

    pub fn input(self, path: &Path) -> Self {
        self.push_input(InputKind::File, path)
    }

    pub fn looped_image(self, path: &Path) -> Self {
        self.push_input(InputKind::LoopedImage, path)
    }

    pub fn stream_loop(self, path: &Path) -> Self {
        self.push_input(InputKind::StreamLoop, path)
    }

    pub fn concat_list(self, path: &Path) -> Self {
        self.push_input(InputKind::ConcatList, path)
    }

    pub fn filter_graph(mut self, graph: FilterGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn arg(mut self, a: impl Into<OsString>) -> Self {
        self.output_args.push(a.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// `-map <spec>`; pass `[v]` for graph outputs or `0:a?` for optional input streams.
    pub fn map(self, spec: &str) -> Self {
        self.args(["-map", spec])
    }

    pub fn encode_video(self, profile: &EncodeProfile) -> Self {
        self.args([
            "-c:v",
            profile.video_codec.as_str(),
            "-crf",
            &profile.crf.to_string(),
            "-preset",
            profile.preset.as_str(),
            "-pix_fmt",
            profile.pix_fmt.as_str(),
        ])
    }

    pub fn encode_audio(self, profile: &EncodeProfile) -> Self {
        self.args([
            "-c:a",
            profile.audio_codec.as_str(),
            "-b:a",
            profile.audio_bitrate.as_str(),
            "-ar",
            &profile.audio_sample_rate.to_string(),
        ])
    }

    pub fn rate(self, fps: Fps) -> Self {
        self.args(["-r".to_string(), fps.to_string()])
    }

    pub fn duration(self, secs: f64) -> Self {
        self.args(["-t".to_string(), fmt_num(secs)])
    }

    pub fn copy_streams(self) -> Self {
        self.args(["-c", "copy"])
    }

    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    pub fn shortest(self) -> Self {
        self.arg("-shortest")
    }

    /// Move the moov atom to the front for progressive playback.
    pub fn faststart(self) -> Self {
        self.args(["-movflags", "+faststart"])
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn graph(&self) -> Option<&FilterGraph> {
        self.graph.as_ref()
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.inputs.is_empty() {
            return Err(ReelError::validation(format!(
                "ffmpeg command '{}' has no inputs",
                self.tag
            )));
        }
        if let Some(graph) = &self.graph {
            graph.validate()?;
        }
        Ok(())
    }

    /// Arguments after the program name and global flags.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut out: Vec<OsString> = Vec::new();
        for input in &self.inputs {
            match input.kind {
                InputKind::File => {}
                InputKind::LoopedImage => out.extend(["-loop", "1"].map(OsString::from)),
                InputKind::StreamLoop => out.extend(["-stream_loop", "-1"].map(OsString::from)),
                InputKind::ConcatList => {
                    out.extend(["-f", "concat", "-safe", "0"].map(OsString::from));
                }
            }
            out.push("-i".into());
            out.push(input.path.clone().into_os_string());
        }
        if let Some(graph) = &self.graph {
            out.push("-filter_complex".into());
            out.push(graph.to_string().into());
        }
        out.extend(self.output_args.iter().cloned());
        out.push(self.output.clone().into_os_string());
        out
    }

    /// Lossy string form of [`FfmpegCommand::to_args`], for logs and assertions.
    pub fn to_arg_strings(&self) -> Vec<String> {
        self.to_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Value following the first occurrence of `flag`.
    pub fn arg_value(&self, flag: &str) -> Option<String> {
        let args = self.to_arg_strings();
        let pos = args.iter().position(|a| a == flag)?;
        args.get(pos + 1).cloned()
    }

    pub fn has_arg(&self, flag: &str) -> bool {
        self.to_arg_strings().iter().any(|a| a == flag)
    }
}

impl fmt::Display for FfmpegCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ffmpeg {}", self.to_arg_strings().join(" "))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/command.rs"]
mod tests;
