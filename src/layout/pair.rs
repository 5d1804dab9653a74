use crate::foundation::bounded::iterate_bounded;
use crate::layout::engine::{Constraint, LayoutDiagnostic, LayoutOverrides, LayoutParams};
use crate::layout::framing::FramingSpec;
use crate::layout::geometry::{Footprint, Placement, SafeArea};

pub(crate) struct PairPlacement {
    pub placements: [Placement; 2],
    pub gap_px: i32,
    pub min_gap_px: i32,
    pub diagnostics: Vec<LayoutDiagnostic>,
}

/// Two people side by side, left to right in input order.
pub(crate) fn place_pair(
    fps: [&Footprint; 2],
    spec: &FramingSpec,
    params: &LayoutParams,
    area: &SafeArea,
    overrides: &LayoutOverrides,
) -> PairPlacement {
    let canvas = params.canvas;
    let floor_y = spec.floor_y(canvas);
    let room = area.room_frac(floor_y, canvas);
    let mut diagnostics = Vec::new();

    let base = spec.target_frac.min(spec.max_frac).max(spec.min_frac);
    let target = (base * overrides.scale_factor())
        .clamp(spec.min_frac, spec.max_frac)
        .min(room);

    let mut ks = [0.0f64; 2];
    for (i, fp) in fps.iter().enumerate() {
        let (k, capped) = fp.scale_for_fraction(target, canvas, params.max_upscale);
        if capped {
            diagnostics.push(LayoutDiagnostic::UpscaleCapped {
                person: i,
                requested: target * f64::from(canvas.height) / f64::from(fp.visible_height()),
                applied: k,
            });
        }
        ks[i] = k;
    }

    let min_gap = params.min_gap(spec);
    let ideal_gap = overrides
        .preferred_gap(canvas)
        .map_or(params.ideal_gap(spec), |g| g.max(min_gap));
    let avail = area.width();

    let need = |k: &[f64; 2]| visible_width(fps[0], k[0]) + visible_width(fps[1], k[1]) + min_gap;
    let fit = iterate_bounded(
        ks,
        params.width_fit_iterations,
        |k| need(k) <= avail,
        |k| {
            let ratio = f64::from(avail) / f64::from(need(k).max(1));
            let f = (ratio * params.width_fit_safety).clamp(0.40, 0.995);
            let next = [k[0] * f, k[1] * f];
            if next.iter().any(|&s| s < params.min_scale) {
                return None;
            }
            Some(next)
        },
    );
    ks = fit.state;
    if !fit.is_satisfied() {
        diagnostics.push(LayoutDiagnostic::ConstraintExhausted {
            constraint: Constraint::WidthFit,
            steps: fit.steps,
            status: fit.status,
        });
        ks = hard_fit(fps, ks, avail, min_gap);
    }

    let group = Group {
        fps,
        area,
        floor_y,
        min_gap,
        ideal_gap,
    };
    let center_x = f64::from(canvas.w()) / 2.0;
    let (mut placements, mut gap) = group.place(ks, center_x + f64::from(overrides.shift_px));

    if !group.is_valid(&placements, gap) {
        // Re-center first; only shrink if the centered group is still too tight.
        (placements, gap) = group.place(ks, center_x);
        if !group.is_valid(&placements, gap) {
            let repaired = iterate_bounded(
                (ks, placements, gap),
                params.gap_repair_iterations,
                |(_, pl, g)| group.is_valid(pl, *g),
                |(k, _, _)| {
                    let next = [k[0] * params.gap_repair_shrink, k[1] * params.gap_repair_shrink];
                    if next.iter().any(|&s| s < params.min_scale) {
                        return None;
                    }
                    let (pl, g) = group.place(next, center_x);
                    Some((next, pl, g))
                },
            );
            if !repaired.is_satisfied() {
                diagnostics.push(LayoutDiagnostic::ConstraintExhausted {
                    constraint: Constraint::GapRepair,
                    steps: repaired.steps,
                    status: repaired.status,
                });
            }
            (_, placements, gap) = repaired.state;
        }
    }

    let wl = placements[0].rect.width().max(1);
    let wr = placements[1].rect.width().max(1);
    let ratio = f64::from(wl.max(wr)) / f64::from(wl.min(wr));
    if ratio >= params.width_warn_ratio {
        diagnostics.push(LayoutDiagnostic::WidthMismatch {
            ratio,
            threshold: params.width_warn_ratio,
        });
    }

    PairPlacement {
        placements,
        gap_px: gap,
        min_gap_px: min_gap,
        diagnostics,
    }
}

fn visible_width(fp: &Footprint, k: f64) -> i32 {
    fp.scaled_visible(k).width()
}

/// Closed-form shrink so that both visible widths plus the minimum gap fit `avail`.
///
/// Scaled widths can exceed `w * k` by up to two pixels each from outward rounding, hence the
/// four pixel allowance.
fn hard_fit(fps: [&Footprint; 2], ks: [f64; 2], avail: i32, min_gap: i32) -> [f64; 2] {
    let src = f64::from(fps[0].visible_width()) * ks[0] + f64::from(fps[1].visible_width()) * ks[1];
    let f = (f64::from(avail - min_gap - 4) / src).clamp(1e-3, 1.0);
    [ks[0] * f, ks[1] * f]
}

struct Group<'a> {
    fps: [&'a Footprint; 2],
    area: &'a SafeArea,
    floor_y: i32,
    min_gap: i32,
    ideal_gap: i32,
}

impl Group<'_> {
    /// Place both people as one group centered on `center_x`, clamped into the safe area.
    fn place(&self, ks: [f64; 2], center_x: f64) -> ([Placement; 2], i32) {
        let avail = self.area.width();
        let wl = visible_width(self.fps[0], ks[0]);
        let wr = visible_width(self.fps[1], ks[1]);
        let gap = self.ideal_gap.min(avail - wl - wr).max(self.min_gap);
        let group_w = wl + gap + wr;
        let mut left = (center_x - f64::from(group_w) / 2.0).round() as i32;
        if group_w <= avail {
            left = left.clamp(self.area.rect.x0, self.area.rect.x1 - group_w);
        } else {
            left = self.area.rect.x0;
        }
        let l = Placement::anchor(self.fps[0], ks[0], left, self.floor_y);
        let r = Placement::anchor(self.fps[1], ks[1], left + wl + gap, self.floor_y);
        let measured = r.rect.x0 - l.rect.x1;
        ([l, r], measured)
    }

    fn is_valid(&self, pl: &[Placement; 2], gap: i32) -> bool {
        gap >= self.min_gap && self.area.contains(&pl[0].rect) && self.area.contains(&pl[1].rect)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/pair.rs"]
mod tests;
