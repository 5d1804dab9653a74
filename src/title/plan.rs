use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{ReelError, ReelResult};
use crate::title::fit::{
    FittedText, TextExtent, TextMeasure, TextStyle, fit_single_line, fit_text_in_box,
};

/// What the closing card shows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TitleSpec {
    Plain { text: String },
    Memorial(MemorialTitle),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorialTitle {
    pub name: String,
    pub dates: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleParams {
    pub background: Rgba8,
    pub text_color: Rgba8,
    pub plain: TextStyle,
    pub plain_margin_px: u32,
    pub pad_px: u32,
    pub name: TextStyle,
    pub name_box_frac: f64,
    pub dates: TextStyle,
    pub dates_box_frac: f64,
    pub dates_color: Rgba8,
    pub body: TextStyle,
    /// The memorial text never starts above this fraction of the card height.
    pub body_top_frac: f64,
    pub decoration_width_frac: f64,
    pub min_column_px: u32,
    pub duration_sec: f64,
}

impl Default for TitleParams {
    fn default() -> Self {
        Self {
            background: Rgba8::BLACK,
            text_color: Rgba8::WHITE,
            plain: TextStyle::new(60, 12, 1.0, true),
            plain_margin_px: 20,
            pad_px: 24,
            name: TextStyle::new(72, 26, 1.12, true),
            name_box_frac: 0.16,
            dates: TextStyle::new(42, 20, 1.0, false),
            dates_box_frac: 0.08,
            dates_color: Rgba8::rgb(200, 200, 200),
            body: TextStyle::new(40, 18, 1.18, false),
            body_top_frac: 0.52,
            decoration_width_frac: 0.32,
            min_column_px: 100,
            duration_sec: 2.0,
        }
    }
}

/// One line of text positioned on the card; `top` is the top of its line box.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub size_px: u32,
    pub bold: bool,
    pub color: Rgba8,
    pub center_x: f32,
    pub top: f32,
    pub extent: TextExtent,
}

impl PlacedLine {
    pub fn left(&self) -> f32 {
        self.center_x - self.extent.width / 2.0
    }
}

/// Where the decoration image is drawn, already scaled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecorationSlot {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Which pass placed the memorial text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemorialFlow {
    FullWidth,
    BesideDecoration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CardPlan {
    pub canvas: Canvas,
    pub background: Rgba8,
    pub lines: Vec<PlacedLine>,
    pub decoration: Option<DecorationSlot>,
    pub flow: Option<MemorialFlow>,
    /// `false` when some block had to be drawn at its minimum size and still overflows.
    pub fits: bool,
}

/// Stack `fitted` lines centered on `center_x`, vertically centered in `[y0, y0 + box_h)`.
fn place_block(fitted: &FittedText, center_x: f32, y0: f32, box_h: f32, color: Rgba8) -> Vec<PlacedLine> {
    let mut y = y0 + ((box_h - fitted.total_height) / 2.0).floor().max(0.0);
    fitted
        .lines
        .iter()
        .map(|line| {
            let placed = PlacedLine {
                text: line.text.clone(),
                size_px: fitted.size_px,
                bold: fitted.bold,
                color,
                center_x,
                top: y,
                extent: line.extent,
            };
            y += fitted.advance(line);
            placed
        })
        .collect()
}

/// One bold line centered on a solid card, shrunk until it clears the side margins.
pub fn plan_plain_title(
    measure: &mut dyn TextMeasure,
    canvas: Canvas,
    text: &str,
    params: &TitleParams,
) -> ReelResult<CardPlan> {
    let w = canvas.width as f32;
    let h = canvas.height as f32;
    let max_w = w - 2.0 * params.plain_margin_px as f32;
    let fitted = fit_single_line(measure, text, max_w, &params.plain)?;
    let line_h = fitted.total_height;
    let lines = place_block(&fitted, w / 2.0, (h - line_h) / 2.0, line_h, params.text_color);
    Ok(CardPlan {
        canvas,
        background: params.background,
        lines,
        decoration: None,
        flow: None,
        fits: fitted.fits,
    })
}

/// Name and dates at the top, memorial text below, decoration bottom-left.
///
/// `decoration` is the source pixel size of the decoration image, `safe_top` the rows kept
/// free for the corner watermark.
pub fn plan_memorial_card(
    measure: &mut dyn TextMeasure,
    canvas: Canvas,
    title: &MemorialTitle,
    decoration: Option<(u32, u32)>,
    safe_top: u32,
    params: &TitleParams,
) -> ReelResult<CardPlan> {
    let w = canvas.w();
    let h = canvas.h();
    let pad = params.pad_px as i32;
    let (left, right, top, bottom) = (pad, w - pad, pad, h - pad);
    if right - left <= 0 || bottom - top <= 0 {
        return Err(ReelError::validation("title padding leaves no room for text"));
    }

    let slot = match decoration {
        Some((dw, dh)) if dw > 0 && dh > 0 => {
            let width = (f64::from(canvas.width) * params.decoration_width_frac).floor() as u32;
            let height = (f64::from(dh) * f64::from(width) / f64::from(dw)).floor() as u32;
            Some(DecorationSlot {
                x: left,
                y: h - pad - height as i32,
                width,
                height,
            })
        }
        _ => None,
    };

    let center = w as f32 / 2.0;
    let full_w = (right - left) as f32;
    let mut lines = Vec::new();
    let mut fits = true;

    let name_y0 = top + safe_top as i32;
    let name_h = (f64::from(canvas.height) * params.name_box_frac).floor() as i32;
    let name = fit_text_in_box(measure, &title.name, full_w, name_h as f32, &params.name)?;
    fits &= name.fits;
    lines.extend(place_block(&name, center, name_y0 as f32, name_h as f32, params.text_color));

    let dates_y0 = name_y0 + name_h + (f64::from(params.pad_px) * 0.6).floor() as i32;
    let dates_h = (f64::from(canvas.height) * params.dates_box_frac).floor() as i32;
    let dates = fit_text_in_box(measure, &title.dates, full_w, dates_h as f32, &params.dates)?;
    fits &= dates.fits;
    lines.extend(place_block(&dates, center, dates_y0 as f32, dates_h as f32, params.dates_color));

    let body_top = canvas
        .frac_h(params.body_top_frac)
        .max(dates_y0 + dates_h + pad);
    let full_h = (bottom - body_top) as f32;
    let pass_a = fit_text_in_box(measure, &title.text, full_w, full_h, &params.body)?;
    let flow = if pass_a.fits {
        lines.extend(place_block(&pass_a, center, body_top as f32, full_h, params.text_color));
        MemorialFlow::FullWidth
    } else {
        let reserved = slot.map_or(0, |s| s.width as i32 + pad);
        let col_left = left.max(reserved + pad);
        let min_col = params.min_column_px as i32;
        let col_w = (right - col_left).max(min_col);
        let col_h = (bottom - body_top).max(min_col);
        let pass_b =
            fit_text_in_box(measure, &title.text, col_w as f32, col_h as f32, &params.body)?;
        if !pass_b.fits {
            tracing::warn!(
                size_px = pass_b.size_px,
                height = pass_b.total_height,
                box_h = col_h,
                "memorial text overflows its column at the minimum size"
            );
        }
        fits &= pass_b.fits;
        let col_center = col_left as f32 + col_w as f32 / 2.0;
        lines.extend(place_block(
            &pass_b,
            col_center,
            body_top as f32,
            col_h as f32,
            params.text_color,
        ));
        MemorialFlow::BesideDecoration
    };
    tracing::debug!(?flow, lines = lines.len(), body_top, "memorial card planned");

    Ok(CardPlan {
        canvas,
        background: params.background,
        lines,
        decoration: slot,
        flow: Some(flow),
        fits,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/title/plan.rs"]
mod tests;
