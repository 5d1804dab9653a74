use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult};
use crate::title::fit::{TextExtent, TextMeasure};

/// Candidate font files, tried in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub regular: Vec<PathBuf>,
    pub bold: Vec<PathBuf>,
}

impl Default for FontConfig {
    fn default() -> Self {
        let paths = |list: &[&str]| list.iter().map(PathBuf::from).collect();
        Self {
            regular: paths(&[
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                "/usr/share/fonts/TTF/DejaVuSans.ttf",
                "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
                "/System/Library/Fonts/Supplemental/Arial.ttf",
                "/Library/Fonts/Arial Unicode.ttf",
                "/Library/Fonts/Arial.ttf",
            ]),
            bold: paths(&[
                "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
                "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
                "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
                "/Library/Fonts/Arial Bold.ttf",
            ]),
        }
    }
}

impl FontConfig {
    /// Put `path` in front of the regular (or bold) candidates.
    pub fn prefer(&mut self, path: impl Into<PathBuf>, bold: bool) {
        let list = if bold { &mut self.bold } else { &mut self.regular };
        list.insert(0, path.into());
    }
}

#[derive(Clone, Debug)]
pub struct FontFace {
    pub path: PathBuf,
    pub bytes: Arc<Vec<u8>>,
}

impl FontFace {
    pub fn load(path: &Path) -> ReelResult<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            bytes: Arc::new(bytes),
        })
    }
}

/// Regular and bold faces used by the title cards.
#[derive(Clone, Debug)]
pub struct FontSet {
    pub regular: FontFace,
    pub bold: FontFace,
}

impl FontSet {
    /// First readable candidate of each list. A missing bold face falls back to regular.
    pub fn resolve(cfg: &FontConfig) -> ReelResult<Self> {
        let first = |list: &[PathBuf]| list.iter().find_map(|p| FontFace::load(p).ok());
        let regular = first(&cfg.regular)
            .or_else(|| first(&cfg.bold))
            .ok_or_else(|| {
                ReelError::validation(format!(
                    "no usable title font among {} candidates",
                    cfg.regular.len() + cfg.bold.len()
                ))
            })?;
        let bold = first(&cfg.bold).unwrap_or_else(|| regular.clone());
        tracing::debug!(regular = %regular.path.display(), bold = %bold.path.display(), "fonts resolved");
        Ok(Self { regular, bold })
    }

    pub fn face(&self, bold: bool) -> &FontFace {
        if bold { &self.bold } else { &self.regular }
    }
}

/// RGBA8 brush color carried through Parley layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Parley layout contexts with the title faces registered.
///
/// Bold lines ask for weight 700 in the bold face's family, so a regular and a bold file
/// sharing one family name still shape with the right face.
pub struct ParleyText {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    regular_family: String,
    bold_family: String,
}

impl ParleyText {
    pub fn new(fonts: &FontSet) -> ReelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let regular_family = register(&mut font_ctx, &fonts.regular)?;
        let bold_family = register(&mut font_ctx, &fonts.bold)?;
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            regular_family,
            bold_family,
        })
    }

    /// Single-line layout (no wrapping; callers wrap words themselves).
    pub fn layout_line(
        &mut self,
        text: &str,
        size_px: f32,
        bold: bool,
        brush: TextBrush,
    ) -> ReelResult<parley::Layout<TextBrush>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ReelError::validation("text size_px must be finite and > 0"));
        }
        let family = if bold {
            self.bold_family.clone()
        } else {
            self.regular_family.clone()
        };
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        if bold {
            builder.push_default(parley::style::StyleProperty::FontWeight(
                parley::style::FontWeight::BOLD,
            ));
        }
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

impl TextMeasure for ParleyText {
    fn measure(&mut self, text: &str, size_px: f32, bold: bool) -> ReelResult<TextExtent> {
        let layout = self.layout_line(text, size_px, bold, TextBrush::default())?;
        Ok(TextExtent {
            width: layout.width(),
            height: layout.height(),
        })
    }
}

fn register(font_ctx: &mut parley::FontContext, face: &FontFace) -> ReelResult<String> {
    let families = font_ctx
        .collection
        .register_fonts(parley::fontique::Blob::from(face.bytes.as_ref().clone()), None);
    let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
        ReelError::validation(format!(
            "no font families registered from '{}'",
            face.path.display()
        ))
    })?;
    Ok(font_ctx
        .collection
        .family_name(family_id)
        .ok_or_else(|| ReelError::validation("registered font family has no name"))?
        .to_string())
}

#[cfg(test)]
#[path = "../../tests/unit/title/fonts.rs"]
mod tests;
