use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::fmt_num;
use crate::media::command::{EncodeProfile, FfmpegCommand};
use crate::media::graph::{Filter, FilterChain, FilterGraph, Pad};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkMode {
    /// One large mark centered on the frame.
    #[default]
    Single,
    /// The mark tiled over a `cols x rows` grid.
    Grid,
}

impl FromStr for WatermarkMode {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "grid" => Ok(Self::Grid),
            other => Err(ReelError::validation(format!(
                "unknown watermark mode '{other}' (expected single or grid)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub mode: WatermarkMode,
    /// Opacity of the mark, 0..=1.
    pub alpha: f64,
    /// Mark width as a fraction of frame width (single mode), clamped to 0.2..=1.5.
    pub scale: f64,
    pub rotate_deg: f64,
    pub grid_cols: u32,
    pub grid_rows: u32,
    pub grid_margin_px: u32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            mode: WatermarkMode::Single,
            alpha: 0.25,
            scale: 0.90,
            rotate_deg: 0.0,
            grid_cols: 3,
            grid_rows: 6,
            grid_margin_px: 16,
        }
    }
}

impl WatermarkConfig {
    pub fn validate(&self) -> ReelResult<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ReelError::validation("watermark alpha must be within 0..=1"));
        }
        if !self.scale.is_finite() || !self.rotate_deg.is_finite() {
            return Err(ReelError::validation(
                "watermark scale/rotation must be finite",
            ));
        }
        Ok(())
    }

    pub fn effective_scale(&self) -> f64 {
        self.scale.clamp(0.2, 1.5)
    }

    pub fn cols(&self) -> u32 {
        self.grid_cols.max(1)
    }

    pub fn rows(&self) -> u32 {
        self.grid_rows.max(1)
    }
}

/// Top-left corner of one grid copy, in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridCell {
    pub col: u32,
    pub row: u32,
    pub x: i32,
    pub y: i32,
}

/// Pixel layout of the grid mode: one scaled mark size and a position per cell.
#[derive(Clone, Debug, PartialEq)]
pub struct GridLayout {
    pub mark_width: u32,
    pub mark_height: u32,
    pub cells: Vec<GridCell>,
}

impl GridLayout {
    /// Mark width is `frame_width/cols − 2·margin`; each copy is centered in its cell.
    pub fn compute(cfg: &WatermarkConfig, frame: (u32, u32), mark: (u32, u32)) -> ReelResult<Self> {
        let (fw, fh) = frame;
        let (mw, mh) = mark;
        if fw == 0 || fh == 0 || mw == 0 || mh == 0 {
            return Err(ReelError::validation(
                "watermark grid needs non-empty frame and mark sizes",
            ));
        }
        let cols = cfg.cols();
        let rows = cfg.rows();
        let cell_w = f64::from(fw) / f64::from(cols);
        let cell_h = f64::from(fh) / f64::from(rows);
        let mark_width = (cell_w - 2.0 * f64::from(cfg.grid_margin_px))
            .round()
            .max(1.0) as u32;
        let mark_height = (f64::from(mark_width) * f64::from(mh) / f64::from(mw))
            .round()
            .max(1.0) as u32;

        let mut cells = Vec::with_capacity((cols * rows) as usize);
        for row in 0..rows {
            for col in 0..cols {
                let x = cell_w * f64::from(col) + (cell_w - f64::from(mark_width)) / 2.0;
                let y = cell_h * f64::from(row) + (cell_h - f64::from(mark_height)) / 2.0;
                cells.push(GridCell {
                    col,
                    row,
                    x: x.round() as i32,
                    y: y.round() as i32,
                });
            }
        }
        Ok(Self {
            mark_width,
            mark_height,
            cells,
        })
    }
}

/// Large semi-transparent mark over the whole frame (free-tier scenes).
#[derive(Clone, Debug, PartialEq)]
pub struct FullFrameWatermark {
    pub path: PathBuf,
    pub config: WatermarkConfig,
}

impl FullFrameWatermark {
    pub fn new(path: impl Into<PathBuf>, config: WatermarkConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    /// Graph over input 0 (video) and input 1 (looped mark image) producing `[v]`.
    ///
    /// `frame` and `mark` are pixel sizes; the main video is never rescaled.
    pub fn graph(&self, frame: (u32, u32), mark: (u32, u32)) -> ReelResult<FilterGraph> {
        self.config.validate()?;
        let faded = |chain: FilterChain| {
            chain
                .then(Filter::new("format").arg("rgba"))
                .then(Filter::new("colorchannelmixer").kv("aa", fmt_num(self.config.alpha)))
        };
        match self.config.mode {
            WatermarkMode::Single => Ok(self.single_graph(faded, frame, mark)),
            WatermarkMode::Grid => {
                let layout = GridLayout::compute(&self.config, frame, mark)?;
                Ok(grid_graph(faded, &layout))
            }
        }
    }

    fn single_graph(
        &self,
        faded: impl Fn(FilterChain) -> FilterChain,
        frame: (u32, u32),
        mark: (u32, u32),
    ) -> FilterGraph {
        let width = (f64::from(frame.0) * self.config.effective_scale())
            .round()
            .max(1.0);
        let height = if mark.0 == 0 {
            -1.0
        } else {
            (width * f64::from(mark.1) / f64::from(mark.0)).round().max(1.0)
        };
        let mut scaled = faded(FilterChain::new([Pad::video(1)]))
            .then(Filter::new("scale").arg(fmt_num(width)).arg(fmt_num(height)));
        if self.config.rotate_deg.abs() > 0.01 {
            let rad = fmt_num(self.config.rotate_deg.to_radians());
            scaled = scaled.then(
                Filter::new("rotate")
                    .kv("a", &rad)
                    .kv("c", "none")
                    .kv("ow", format!("rotw({rad})"))
                    .kv("oh", format!("roth({rad})")),
            );
        }
        FilterGraph::new()
            .with(scaled.to([Pad::new("wm")]))
            .with(
                FilterChain::new([Pad::video(0), Pad::new("wm")])
                    .then(
                        Filter::new("overlay")
                            .kv("x", "(W-w)/2")
                            .kv("y", "(H-h)/2")
                            .kv("shortest", 1)
                            .kv("format", "auto"),
                    )
                    .to([Pad::new("v")]),
            )
    }

    pub fn command(
        &self,
        input: &Path,
        output: &Path,
        frame: (u32, u32),
        mark: (u32, u32),
        profile: &EncodeProfile,
    ) -> ReelResult<FfmpegCommand> {
        Ok(FfmpegCommand::new("wm_fullscreen", output)
            .input(input)
            .looped_image(&self.path)
            .filter_graph(self.graph(frame, mark)?)
            .map("[v]")
            .map("0:a?")
            .encode_video(profile)
            .args(["-c:a", "copy"])
            .faststart())
    }
}

/// Split the faded, scaled mark into one stream per cell and chain the overlays.
fn grid_graph(faded: impl Fn(FilterChain) -> FilterChain, layout: &GridLayout) -> FilterGraph {
    let n = layout.cells.len();
    let copies: Vec<Pad> = (0..n).map(|i| Pad::new(format!("w{i}"))).collect();
    let mut graph = FilterGraph::new().with(
        faded(FilterChain::new([Pad::video(1)]))
            .then(
                Filter::new("scale")
                    .arg(layout.mark_width)
                    .arg(layout.mark_height),
            )
            .then(Filter::new("split").arg(n))
            .to(copies.clone()),
    );
    let mut prev = Pad::video(0);
    for (i, (cell, copy)) in layout.cells.iter().zip(copies).enumerate() {
        let next = if i + 1 == n {
            Pad::new("v")
        } else {
            Pad::new(format!("t{i}"))
        };
        graph.push(
            FilterChain::new([prev, copy])
                .then(
                    Filter::new("overlay")
                        .kv("x", cell.x)
                        .kv("y", cell.y)
                        .kv("shortest", 1)
                        .kv("format", "auto"),
                )
                .to([next.clone()]),
        );
        prev = next;
    }
    graph
}

/// Small logo pinned to the top-right corner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerWatermark {
    pub path: PathBuf,
    pub width_px: u32,
    pub margin_px: u32,
}

impl Default for CornerWatermark {
    fn default() -> Self {
        Self {
            path: PathBuf::from("assets/watermark_black.jpg"),
            width_px: 120,
            margin_px: 24,
        }
    }
}

impl CornerWatermark {
    pub fn graph(&self) -> FilterGraph {
        let m = self.margin_px;
        FilterGraph::new()
            .with(
                FilterChain::new([Pad::video(1)])
                    .then(Filter::new("scale").arg(self.width_px).arg(-1))
                    .to([Pad::new("wm")]),
            )
            .with(
                FilterChain::new([Pad::video(0), Pad::new("wm")])
                    .then(Filter::new("overlay").arg(format!("W-w-{m}")).arg(m))
                    .to([Pad::new("v")]),
            )
    }

    pub fn command(&self, input: &Path, output: &Path, profile: &EncodeProfile) -> FfmpegCommand {
        FfmpegCommand::new("wm_corner", output)
            .input(input)
            .input(&self.path)
            .filter_graph(self.graph())
            .map("[v]")
            .map("0:a?")
            .encode_video(profile)
            .args(["-c:a", "copy"])
            .faststart()
    }

    /// Height of the mark once scaled to `width_px`, if the image is readable.
    pub fn scaled_height(&self) -> Option<u32> {
        let (w, h) = image::image_dimensions(&self.path).ok()?;
        if w == 0 {
            return None;
        }
        Some((f64::from(self.width_px) * f64::from(h) / f64::from(w)).round() as u32)
    }

    /// First row below the mark that title text may use.
    pub fn safe_top_px(&self) -> u32 {
        match self.scaled_height() {
            Some(h) => self.margin_px + h + 12,
            None => 160,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/watermark.rs"]
mod tests;
