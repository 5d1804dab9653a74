use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult};

/// Pixel size of one laid-out line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

/// Measures single lines of text. Implemented by the Parley engine and by test fakes.
pub trait TextMeasure {
    fn measure(&mut self, text: &str, size_px: f32, bold: bool) -> ReelResult<TextExtent>;
}

/// Font size search range and line spacing for one text block.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub max_size: u32,
    pub min_size: u32,
    /// Line advance as a multiple of the line height.
    pub line_spacing: f32,
    pub bold: bool,
}

impl TextStyle {
    pub const fn new(max_size: u32, min_size: u32, line_spacing: f32, bold: bool) -> Self {
        Self {
            max_size,
            min_size,
            line_spacing,
            bold,
        }
    }

    fn validate(&self) -> ReelResult<()> {
        if self.min_size == 0 || self.min_size > self.max_size {
            return Err(ReelError::validation(format!(
                "text size range {}..{} is invalid",
                self.min_size, self.max_size
            )));
        }
        if !(self.line_spacing.is_finite() && self.line_spacing >= 1.0) {
            return Err(ReelError::validation("line_spacing must be >= 1"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FittedLine {
    pub text: String,
    pub extent: TextExtent,
}

/// Result of fitting a block: the chosen size, its lines, and whether the box was satisfied.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedText {
    pub size_px: u32,
    pub bold: bool,
    pub line_spacing: f32,
    pub lines: Vec<FittedLine>,
    pub total_height: f32,
    pub max_width: f32,
    pub fits: bool,
}

impl FittedText {
    /// Vertical advance after `line`.
    pub fn advance(&self, line: &FittedLine) -> f32 {
        (line.extent.height * self.line_spacing).floor()
    }
}

/// Greedy word wrap at `box_w`. A word wider than the box gets a line of its own.
pub fn wrap_words(
    measure: &mut dyn TextMeasure,
    text: &str,
    size_px: f32,
    bold: bool,
    box_w: f32,
) -> ReelResult<Vec<String>> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        if cur.is_empty() {
            cur.push_str(word);
            continue;
        }
        let candidate = format!("{cur} {word}");
        if measure.measure(&candidate, size_px, bold)?.width <= box_w {
            cur = candidate;
        } else {
            lines.push(std::mem::replace(&mut cur, word.to_string()));
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    Ok(lines)
}

fn fit_at(
    measure: &mut dyn TextMeasure,
    text: &str,
    size: u32,
    style: &TextStyle,
    box_w: f32,
    box_h: f32,
) -> ReelResult<FittedText> {
    let size_px = size as f32;
    let wrapped = wrap_words(measure, text, size_px, style.bold, box_w)?;
    let mut lines = Vec::with_capacity(wrapped.len());
    for text in wrapped {
        let extent = measure.measure(&text, size_px, style.bold)?;
        lines.push(FittedLine { text, extent });
    }
    let heights: f32 = lines.iter().map(|l| l.extent.height).sum();
    let first_h = lines.first().map_or(0.0, |l| l.extent.height);
    let gaps = lines.len().saturating_sub(1) as f32;
    let total_height = (heights + gaps * first_h * (style.line_spacing - 1.0)).floor();
    let max_width = lines.iter().map(|l| l.extent.width).fold(0.0, f32::max);
    Ok(FittedText {
        size_px: size,
        bold: style.bold,
        line_spacing: style.line_spacing,
        fits: total_height <= box_h && max_width <= box_w,
        lines,
        total_height,
        max_width,
    })
}

/// Largest size (stepping down by 2 px from `max_size`) whose wrapped text fits `box_w x box_h`.
///
/// When nothing fits, the smallest tried size is returned with `fits == false`.
pub fn fit_text_in_box(
    measure: &mut dyn TextMeasure,
    text: &str,
    box_w: f32,
    box_h: f32,
    style: &TextStyle,
) -> ReelResult<FittedText> {
    style.validate()?;
    let mut size = style.max_size;
    loop {
        let fitted = fit_at(measure, text, size, style, box_w, box_h)?;
        if fitted.fits || size < style.min_size + 2 {
            return Ok(fitted);
        }
        size -= 2;
    }
}

/// Single unwrapped line shrunk from `max_size` by 2 px until it is no wider than `max_w`.
pub fn fit_single_line(
    measure: &mut dyn TextMeasure,
    text: &str,
    max_w: f32,
    style: &TextStyle,
) -> ReelResult<FittedText> {
    style.validate()?;
    let mut size = style.max_size;
    loop {
        let extent = measure.measure(text, size as f32, style.bold)?;
        let fits = extent.width <= max_w;
        if fits || size < style.min_size + 2 {
            return Ok(FittedText {
                size_px: size,
                bold: style.bold,
                line_spacing: style.line_spacing,
                lines: vec![FittedLine {
                    text: text.to_string(),
                    extent,
                }],
                total_height: extent.height,
                max_width: extent.width,
                fits,
            });
        }
        size -= 2;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/title/fit.rs"]
mod tests;
