use std::path::{Path, PathBuf};
use std::process::Command;

use image::RgbaImage;

use crate::cutout::matte::{refine_matte, visible_area_frac};
use crate::foundation::error::{ReelError, ReelResult, ServiceStatus, Stage};
use crate::foundation::naming::unique_suffix;
use crate::raster::decode::{decode_rgba, load_rgba};

/// Turns a photo into an RGBA image whose background pixels are transparent.
pub trait CutoutProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn cut(&self, image: &RgbaImage) -> ReelResult<RgbaImage>;

    /// Same as [`CutoutProvider::cut`], starting from encoded image bytes.
    fn cut_bytes(&self, bytes: &[u8]) -> ReelResult<RgbaImage> {
        let image = decode_rgba(bytes)
            .map_err(|e| ReelError::validation(format!("photo is not a readable image: {e}")))?;
        self.cut(&image)
    }
}

/// Keeps the photo's own alpha channel; for inputs that are already cut out.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlphaPassthrough;

impl CutoutProvider for AlphaPassthrough {
    fn name(&self) -> &str {
        "alpha-passthrough"
    }

    fn cut(&self, image: &RgbaImage) -> ReelResult<RgbaImage> {
        Ok(image.clone())
    }
}

/// Runs an external segmentation program through temporary PNG files.
///
/// `{input}` and `{output}` in `args` are replaced by the temp file paths, e.g.
/// `rembg i -m isnet-general-use {input} {output}`.
#[derive(Clone, Debug)]
pub struct CommandCutoutProvider {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    work_dir: PathBuf,
}

impl CommandCutoutProvider {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<PathBuf>,
        args: Vec<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            work_dir: work_dir.into(),
        }
    }

    /// Parse a whitespace separated command line such as `"rembg i {input} {output}"`.
    pub fn from_command_line(
        name: impl Into<String>,
        line: &str,
        work_dir: impl Into<PathBuf>,
    ) -> ReelResult<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ReelError::validation("cutout command line is empty"))?;
        let args: Vec<String> = parts.collect();
        let mentions = |token: &str| args.iter().any(|a| a.contains(token));
        if !mentions("{input}") || !mentions("{output}") {
            return Err(ReelError::validation(
                "cutout command line must reference {input} and {output}",
            ));
        }
        Ok(Self::new(name, program, args, work_dir))
    }

    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

impl CutoutProvider for CommandCutoutProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, image), fields(provider = %self.name))]
    fn cut(&self, image: &RgbaImage) -> ReelResult<RgbaImage> {
        use anyhow::Context as _;
        std::fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("create cutout work dir '{}'", self.work_dir.display()))?;
        let token = unique_suffix();
        let input = self.work_dir.join(format!("cut_in_{token}.png"));
        let output = self.work_dir.join(format!("cut_out_{token}.png"));
        image
            .save_with_format(&input, image::ImageFormat::Png)
            .with_context(|| format!("write cutout input '{}'", input.display()))?;

        let result = Command::new(&self.program)
            .args(self.expand_args(&input, &output))
            .output();
        let _ = std::fs::remove_file(&input);

        let out = result.map_err(|e| {
            ReelError::service(
                Stage::Cutout,
                ServiceStatus::GenerationFailed,
                format!("failed to spawn '{}': {e}", self.program.display()),
            )
        })?;
        if !out.status.success() {
            let _ = std::fs::remove_file(&output);
            return Err(ReelError::service(
                Stage::Cutout,
                ServiceStatus::GenerationFailed,
                format!(
                    "'{}' exited with status {}: {}",
                    self.program.display(),
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            ));
        }
        if !output.exists() {
            return Err(ReelError::service(
                Stage::Cutout,
                ServiceStatus::NoOutput,
                format!("'{}' produced no output file", self.program.display()),
            ));
        }
        let cut = load_rgba(&output);
        let _ = std::fs::remove_file(&output);
        cut
    }
}

/// Tries providers in order and keeps the most plausible matte.
///
/// The first primary provider that succeeds wins, unless its visible area covers less than
/// `min_area_frac` of the photo; then every rescue provider is tried and the result with the
/// larger visible area is kept. The winning matte is eroded and feathered when `refine` is set.
pub struct BestOfCutout {
    primary: Vec<Box<dyn CutoutProvider>>,
    rescue: Vec<Box<dyn CutoutProvider>>,
    min_area_frac: f64,
    refine: bool,
}

impl BestOfCutout {
    pub const DEFAULT_MIN_AREA_FRAC: f64 = 0.12;

    pub fn new(primary: Vec<Box<dyn CutoutProvider>>) -> Self {
        Self {
            primary,
            rescue: Vec::new(),
            min_area_frac: Self::DEFAULT_MIN_AREA_FRAC,
            refine: true,
        }
    }

    pub fn with_rescue(mut self, rescue: Vec<Box<dyn CutoutProvider>>) -> Self {
        self.rescue = rescue;
        self
    }

    pub fn with_min_area_frac(mut self, frac: f64) -> Self {
        self.min_area_frac = frac.clamp(0.0, 1.0);
        self
    }

    pub fn with_refine(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }
}

impl CutoutProvider for BestOfCutout {
    fn name(&self) -> &str {
        "best-of"
    }

    #[tracing::instrument(skip(self, image))]
    fn cut(&self, image: &RgbaImage) -> ReelResult<RgbaImage> {
        let mut best: Option<(RgbaImage, f64)> = None;
        let mut last_err: Option<ReelError> = None;

        for provider in &self.primary {
            match provider.cut(image) {
                Ok(out) => {
                    let area = visible_area_frac(&out);
                    tracing::debug!(provider = provider.name(), area, "primary cutout");
                    if area > 0.0 {
                        best = Some((out, area));
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "cutout provider failed");
                    last_err = Some(e);
                }
            }
        }

        let needs_rescue = best
            .as_ref()
            .is_none_or(|(_, area)| *area < self.min_area_frac);
        if needs_rescue {
            for provider in &self.rescue {
                match provider.cut(image) {
                    Ok(out) => {
                        let area = visible_area_frac(&out);
                        tracing::debug!(provider = provider.name(), area, "rescue cutout");
                        if area > 0.0 && best.as_ref().is_none_or(|(_, a)| area > *a) {
                            best = Some((out, area));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(provider = provider.name(), error = %e, "rescue cutout failed");
                        last_err = Some(e);
                    }
                }
            }
        }

        let Some((mut out, area)) = best else {
            return Err(match last_err {
                Some(e) => e,
                None => ReelError::service(
                    Stage::Cutout,
                    ServiceStatus::NoOutput,
                    "no person found in the photo",
                ),
            });
        };
        if area < self.min_area_frac {
            tracing::warn!(area, "cutout foreground is unusually small");
        }
        if self.refine {
            refine_matte(&mut out)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cutout/provider.rs"]
mod tests;
