use crate::foundation::bounded::iterate_bounded;
use crate::layout::engine::{Constraint, LayoutDiagnostic, LayoutOverrides, LayoutParams};
use crate::layout::framing::FramingSpec;
use crate::layout::geometry::{Footprint, Placement, SafeArea};

pub(crate) struct SinglePlacement {
    pub placement: Placement,
    pub diagnostics: Vec<LayoutDiagnostic>,
}

/// One person, centered, feet on the framing floor.
///
/// The target fraction is clamped to `[min, max]` and to the room between the safe top and the
/// floor. If the placed figure still ends up below the anti-dwarf minimum (small source photo,
/// very wide pose), a bounded growth loop enlarges it step by step and gives up as soon as a
/// step would leave the safe area.
pub(crate) fn place_single(
    fp: &Footprint,
    spec: &FramingSpec,
    params: &LayoutParams,
    area: &SafeArea,
    overrides: &LayoutOverrides,
) -> SinglePlacement {
    let canvas = params.canvas;
    let floor_y = spec.floor_y(canvas);
    let room = area.room_frac(floor_y, canvas);
    let center_x = f64::from(canvas.w()) / 2.0 + f64::from(overrides.shift_px);
    let mut diagnostics = Vec::new();

    let base = spec.target_frac.min(spec.max_frac).max(spec.min_frac);
    let target = (base * overrides.scale_factor())
        .clamp(spec.min_frac, spec.max_frac)
        .min(room);

    let (mut k, capped) = fp.scale_for_fraction(target, canvas, params.max_upscale);
    if capped {
        diagnostics.push(LayoutDiagnostic::UpscaleCapped {
            person: 0,
            requested: target * f64::from(canvas.height) / f64::from(fp.visible_height()),
            applied: k,
        });
    }
    let fit_k = f64::from(area.width() - 2) / f64::from(fp.visible_width());
    if k > fit_k {
        tracing::debug!(k, fit_k, "single cutout is wider than the safe area");
        k = fit_k;
    }
    let mut placement = centered_in(fp, k, center_x, floor_y, area);

    if placement.visible_frac(canvas) < spec.min_frac {
        let growth_cap = params.max_upscale * params.growth_upscale_cap;
        let ceiling = spec.max_frac.min(room);
        let grown = iterate_bounded(
            (target, placement),
            params.growth_iterations,
            |(_, p)| p.visible_frac(canvas) >= spec.min_frac,
            |(t, p)| {
                let next_t = (t * params.growth_step).min(ceiling);
                let (next_k, _) = fp.scale_for_fraction(next_t, canvas, growth_cap);
                if next_k <= p.scale * (1.0 + 1e-9) {
                    return None;
                }
                let candidate = centered_in(fp, next_k, center_x, floor_y, area);
                // Never grow past the safe area.
                if !area.contains(&candidate.rect) {
                    return None;
                }
                Some((next_t, candidate))
            },
        );
        placement = grown.state.1;
        if !grown.is_satisfied() {
            diagnostics.push(LayoutDiagnostic::ConstraintExhausted {
                constraint: Constraint::Growth,
                steps: grown.steps,
                status: grown.status,
            });
        }
    }

    SinglePlacement {
        placement,
        diagnostics,
    }
}

fn centered_in(
    fp: &Footprint,
    k: f64,
    center_x: f64,
    floor_y: i32,
    area: &SafeArea,
) -> Placement {
    let p = Placement::anchor_centered(fp, k, center_x, floor_y);
    p.shifted(area.clamp_shift(&p.rect))
}

#[cfg(test)]
#[path = "../../tests/unit/layout/single.rs"]
mod tests;
