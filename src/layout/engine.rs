use serde::{Deserialize, Serialize};

use crate::foundation::bounded::LoopStatus;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::layout::framing::{FramingMode, FramingSpec, FramingTable};
use crate::layout::geometry::{Footprint, Placement, SafeArea};
use crate::layout::{pair, single};

/// Layout tunables. Every field has a production default, so `{}` is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    pub canvas: Canvas,
    pub margin_px: i32,
    /// Global ceiling for the visible-height fraction.
    pub max_visible_frac: f64,
    /// Shared target for two-person frames.
    pub pair_target_frac: f64,
    /// Largest enlargement applied to a source photo.
    pub max_upscale: f64,
    /// Extra enlargement the anti-dwarf growth loop may use on top of `max_upscale`.
    pub growth_upscale_cap: f64,
    pub growth_step: f64,
    pub growth_iterations: u32,
    pub min_gap_px: i32,
    pub min_gap_frac: f64,
    pub ideal_gap_frac: f64,
    pub allow_waist_overlap: bool,
    /// Largest overlap, as a fraction of canvas width, allowed for waist-up pairs.
    pub waist_overlap_frac: f64,
    pub width_fit_iterations: u32,
    pub width_fit_safety: f64,
    /// Width fit stops shrinking below this scale and falls back to the hard correction.
    pub min_scale: f64,
    pub gap_repair_iterations: u32,
    pub gap_repair_shrink: f64,
    /// Width ratio above which a pair is reported as mismatched.
    pub width_warn_ratio: f64,
    pub framings: FramingTable,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            margin_px: 20,
            max_visible_frac: 0.82,
            pair_target_frac: 0.76,
            max_upscale: 1.8,
            growth_upscale_cap: 1.12,
            growth_step: 1.04,
            growth_iterations: 12,
            min_gap_px: 5,
            min_gap_frac: 0.01,
            ideal_gap_frac: 0.005,
            allow_waist_overlap: true,
            waist_overlap_frac: 0.10,
            width_fit_iterations: 60,
            width_fit_safety: 0.985,
            min_scale: 0.05,
            gap_repair_iterations: 20,
            gap_repair_shrink: 0.98,
            width_warn_ratio: 1.40,
            framings: FramingTable::default(),
        }
    }
}

impl LayoutParams {
    pub fn validate(&self) -> ReelResult<()> {
        if self.margin_px < 0 || self.margin_px * 2 >= self.canvas.w() {
            return Err(ReelError::validation("layout margin does not fit the canvas"));
        }
        if self.max_upscale <= 0.0 || self.growth_upscale_cap < 1.0 {
            return Err(ReelError::validation("upscale caps must be positive"));
        }
        if self.growth_step <= 1.0 {
            return Err(ReelError::validation("growth_step must be > 1"));
        }
        if self.gap_repair_shrink <= 0.0 || self.gap_repair_shrink >= 1.0 {
            return Err(ReelError::validation("gap_repair_shrink must be in (0, 1)"));
        }
        if self.width_fit_safety <= 0.0 || self.width_fit_safety > 1.0 {
            return Err(ReelError::validation("width_fit_safety must be in (0, 1]"));
        }
        if self.min_scale <= 0.0 {
            return Err(ReelError::validation("min_scale must be > 0"));
        }
        Ok(())
    }

    /// Minimum horizontal gap between a pair, negative when overlap is allowed.
    pub fn min_gap(&self, spec: &FramingSpec) -> i32 {
        if spec.allow_overlap {
            -self.canvas.frac_w(self.waist_overlap_frac)
        } else {
            self.min_gap_px.max(self.canvas.frac_w(self.min_gap_frac))
        }
    }

    pub fn ideal_gap(&self, spec: &FramingSpec) -> i32 {
        self.min_gap(spec).max(self.canvas.frac_w(self.ideal_gap_frac))
    }
}

/// Manual nudges a caller may apply on top of the automatic layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOverrides {
    /// Preferred pair gap in pixels (still bounded by the minimum gap).
    pub gap_px: Option<i32>,
    /// Preferred pair gap as a fraction of canvas width.
    pub gap_frac: Option<f64>,
    /// Relative size change, clamped to +-20%.
    pub scale_pct: f64,
    /// Horizontal shift of the person or group, in pixels.
    pub shift_px: i32,
}

impl LayoutOverrides {
    pub(crate) fn scale_factor(&self) -> f64 {
        1.0 + self.scale_pct.clamp(-0.2, 0.2)
    }

    pub(crate) fn preferred_gap(&self, canvas: Canvas) -> Option<i32> {
        self.gap_px.or_else(|| self.gap_frac.map(|f| canvas.frac_w(f)))
    }
}

/// Which bounded correction loop a diagnostic is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Constraint {
    Growth,
    WidthFit,
    GapRepair,
}

/// Non-fatal findings reported with a layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LayoutDiagnostic {
    /// A correction loop ended without reaching its goal; the best placement found is used.
    ConstraintExhausted {
        constraint: Constraint,
        steps: u32,
        status: LoopStatus,
    },
    /// The source photo was too small to reach the requested size without over-enlarging.
    UpscaleCapped {
        person: usize,
        requested: f64,
        applied: f64,
    },
    /// The two people differ strongly in width, so their composited heights will differ.
    WidthMismatch { ratio: f64, threshold: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayoutOutcome {
    pub canvas: Canvas,
    pub spec: FramingSpec,
    pub safe_area: SafeArea,
    pub placements: Vec<Placement>,
    /// Gap between visible rects of a pair; negative values are overlap.
    pub gap_px: Option<i32>,
    pub min_gap_px: Option<i32>,
    pub diagnostics: Vec<LayoutDiagnostic>,
}

/// Computes placements for one or two cutouts.
#[derive(Clone, Debug, Default)]
pub struct LayoutEngine {
    params: LayoutParams,
}

impl LayoutEngine {
    pub fn new(params: LayoutParams) -> ReelResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    pub fn canvas(&self) -> Canvas {
        self.params.canvas
    }

    pub fn framing(&self, mode: FramingMode, people: usize) -> ReelResult<FramingSpec> {
        FramingSpec::resolve(mode, people, &self.params)
    }

    pub fn place(&self, people: &[Footprint], spec: &FramingSpec) -> ReelResult<LayoutOutcome> {
        self.place_with(people, spec, &LayoutOverrides::default())
    }

    #[tracing::instrument(skip(self, people, overrides), fields(framing = %spec.mode, people = people.len()))]
    pub fn place_with(
        &self,
        people: &[Footprint],
        spec: &FramingSpec,
        overrides: &LayoutOverrides,
    ) -> ReelResult<LayoutOutcome> {
        if people.len() != spec.people {
            return Err(ReelError::validation(format!(
                "framing resolved for {} people but {} cutouts were given",
                spec.people,
                people.len()
            )));
        }
        let canvas = self.params.canvas;
        let safe_area = SafeArea::new(canvas, self.params.margin_px, spec);

        let outcome = match people {
            [one] => {
                let placed = single::place_single(one, spec, &self.params, &safe_area, overrides);
                LayoutOutcome {
                    canvas,
                    spec: spec.clone(),
                    safe_area,
                    placements: vec![placed.placement],
                    gap_px: None,
                    min_gap_px: None,
                    diagnostics: placed.diagnostics,
                }
            }
            [left, right] => {
                let placed =
                    pair::place_pair([left, right], spec, &self.params, &safe_area, overrides);
                LayoutOutcome {
                    canvas,
                    spec: spec.clone(),
                    safe_area,
                    placements: placed.placements.to_vec(),
                    gap_px: Some(placed.gap_px),
                    min_gap_px: Some(placed.min_gap_px),
                    diagnostics: placed.diagnostics,
                }
            }
            _ => {
                return Err(ReelError::validation(format!(
                    "a start frame holds one or two people, got {}",
                    people.len()
                )));
            }
        };

        for d in &outcome.diagnostics {
            tracing::warn!(diagnostic = ?d, "layout diagnostic");
        }
        for (i, p) in outcome.placements.iter().enumerate() {
            tracing::debug!(
                person = i,
                scale = p.scale,
                rect = ?p.rect,
                frac = p.visible_frac(canvas),
                "placed cutout"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/engine.rs"]
mod tests;
