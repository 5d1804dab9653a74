use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::error::{ReelError, ReelResult};
use crate::layout::engine::{LayoutDiagnostic, LayoutOutcome};
use crate::layout::framing::FramingMode;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonMetrics {
    pub rect: PixelRect,
    pub height_px: i32,
    pub width_px: i32,
    pub height_frac: f64,
    pub width_frac: f64,
    pub center_x_frac: f64,
    pub scale: f64,
    pub floor_y: i32,
}

/// Placement report written next to every start frame.
///
/// Callers read it for the width-mismatch warning and debug overlays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    pub canvas: Canvas,
    pub framing: FramingMode,
    pub people: Vec<PersonMetrics>,
    pub gap_px: Option<i32>,
    pub gap_frac: Option<f64>,
    pub min_gap_px: Option<i32>,
    pub diagnostics: Vec<LayoutDiagnostic>,
}

impl LayoutMetrics {
    pub fn from_outcome(outcome: &LayoutOutcome) -> Self {
        let canvas = outcome.canvas;
        let w = f64::from(canvas.width);
        let h = f64::from(canvas.height);
        let people = outcome
            .placements
            .iter()
            .map(|p| PersonMetrics {
                rect: p.rect,
                height_px: p.rect.height(),
                width_px: p.rect.width(),
                height_frac: f64::from(p.rect.height()) / h,
                width_frac: f64::from(p.rect.width()) / w,
                center_x_frac: p.rect.center_x() / w,
                scale: p.scale,
                floor_y: p.floor_y,
            })
            .collect();
        Self {
            canvas,
            framing: outcome.spec.mode,
            people,
            gap_px: outcome.gap_px,
            gap_frac: outcome.gap_px.map(|g| f64::from(g) / w),
            min_gap_px: outcome.min_gap_px,
            diagnostics: outcome.diagnostics.clone(),
        }
    }

    /// Width ratio of a mismatched pair, if one was reported.
    pub fn width_mismatch(&self) -> Option<f64> {
        self.diagnostics.iter().find_map(|d| match d {
            LayoutDiagnostic::WidthMismatch { ratio, .. } => Some(*ratio),
            _ => None,
        })
    }

    pub fn to_json_pretty(&self) -> ReelResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ReelError::serde(e.to_string()))
    }

    pub fn from_json(s: &str) -> ReelResult<Self> {
        serde_json::from_str(s).map_err(|e| ReelError::serde(e.to_string()))
    }
}
