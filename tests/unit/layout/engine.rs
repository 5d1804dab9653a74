use super::*;
use crate::foundation::core::PixelRect;

fn fp(width: u32, height: u32, visible: PixelRect) -> Footprint {
    Footprint {
        width,
        height,
        visible,
    }
}

fn engine() -> LayoutEngine {
    LayoutEngine::new(LayoutParams::default()).unwrap()
}

/// Deterministic spread of portrait-ish cutouts: visible heights 600..2400, aspect 0.25..0.75,
/// with transparent padding around the figure.
fn portrait_sweep() -> Vec<Footprint> {
    let mut out = Vec::new();
    for vh in [600u32, 900, 1400, 2400] {
        for aspect in [0.25f64, 0.4, 0.55, 0.75] {
            let vw = (f64::from(vh) * aspect).round() as u32;
            let pad_x = vw / 5;
            let pad_top = vh / 10;
            out.push(fp(
                vw + 2 * pad_x,
                vh + pad_top,
                PixelRect::new(
                    pad_x as i32,
                    pad_top as i32,
                    (pad_x + vw) as i32,
                    (pad_top + vh) as i32,
                ),
            ));
        }
    }
    out
}

#[test]
fn scenario_a_single_full_body_is_two_thirds_and_centered() {
    let e = engine();
    let spec = e.framing(FramingMode::FullBody, 1).unwrap();
    let out = e
        .place(&[fp(800, 1600, PixelRect::new(100, 40, 700, 1600))], &spec)
        .unwrap();
    let p = out.placements[0];
    let frac = p.visible_frac(out.canvas);
    assert!((frac - 0.66).abs() <= 2.0 / 1280.0, "frac {frac}");
    assert!((p.rect.center_x() / 720.0 - 0.5).abs() <= 1.0 / 720.0);
    assert!(out.gap_px.is_none());
}

#[test]
fn scenario_b_width_mismatch_comes_with_metrics() {
    let e = engine();
    let spec = e.framing(FramingMode::FullBody, 2).unwrap();
    let left = fp(400, 1000, PixelRect::from_size(400, 1000));
    let right = fp(600, 1000, PixelRect::from_size(600, 1000));
    let out = e.place(&[left, right], &spec).unwrap();
    let metrics = crate::layout::metrics::LayoutMetrics::from_outcome(&out);
    let ratio = metrics.width_mismatch().expect("mismatch reported");
    assert!(ratio >= 1.4);
    assert_eq!(metrics.people.len(), 2);
    assert!(metrics.gap_px.unwrap() >= 7);
}

#[test]
fn single_placements_stay_within_fraction_bounds_and_margins() {
    let e = engine();
    for mode in FramingMode::ALL {
        let spec = e.framing(mode, 1).unwrap();
        for f in portrait_sweep() {
            let out = e.place(&[f], &spec).unwrap();
            let p = out.placements[0];
            let frac = p.visible_frac(out.canvas);
            assert!(frac >= spec.min_frac, "{mode} {f:?} frac {frac}");
            assert!(frac <= spec.max_frac + 2.0 / 1280.0, "{mode} {f:?} frac {frac}");
            assert!(out.safe_area.contains(&p.rect), "{mode} {f:?} {:?}", p.rect);
        }
    }
}

#[test]
fn unclamped_single_placement_reproduces_target() {
    let e = engine();
    for mode in FramingMode::ALL {
        let spec = e.framing(mode, 1).unwrap();
        for f in portrait_sweep() {
            let out = e.place(&[f], &spec).unwrap();
            if !out.diagnostics.is_empty() {
                continue;
            }
            let p = out.placements[0];
            let remeasured = f.scaled_visible(p.scale).height();
            let frac = f64::from(remeasured) / 1280.0;
            assert!((frac - spec.target_frac).abs() <= 2.0 / 1280.0, "{mode} {f:?}");
        }
    }
}

#[test]
fn pair_placements_respect_gap_and_margins() {
    let e = engine();
    let sweep = portrait_sweep();
    for mode in FramingMode::ALL {
        let spec = e.framing(mode, 2).unwrap();
        let min_gap = e.params().min_gap(&spec);
        for (i, l) in sweep.iter().enumerate() {
            let r = &sweep[(i * 7 + 3) % sweep.len()];
            let out = e.place(&[*l, *r], &spec).unwrap();
            let [a, b] = [out.placements[0], out.placements[1]];
            let gap = b.rect.x0 - a.rect.x1;
            assert_eq!(Some(gap), out.gap_px);
            assert!(gap >= min_gap, "{mode} gap {gap} < {min_gap}");
            if mode == FramingMode::WaistUp {
                assert!(gap >= -72);
            } else {
                assert!(gap >= 7);
            }
            assert!(out.safe_area.contains(&a.rect), "{mode} {:?}", a.rect);
            assert!(out.safe_area.contains(&b.rect), "{mode} {:?}", b.rect);
        }
    }
}

#[test]
fn people_count_is_validated() {
    let e = engine();
    let spec = e.framing(FramingMode::FullBody, 1).unwrap();
    let f = fp(10, 10, PixelRect::from_size(10, 10));
    assert!(matches!(e.place(&[], &spec), Err(ReelError::Validation(_))));
    assert!(matches!(e.place(&[f, f], &spec), Err(ReelError::Validation(_))));
}

#[test]
fn params_default_from_empty_json() {
    let parsed: LayoutParams = serde_json::from_str("{}").unwrap();
    assert_eq!(parsed, LayoutParams::default());
    let partial: LayoutParams = serde_json::from_str(r#"{"margin_px": 32}"#).unwrap();
    assert_eq!(partial.margin_px, 32);
    assert_eq!(partial.max_upscale, 1.8);
}

#[test]
fn invalid_params_are_rejected() {
    let bad = LayoutParams {
        margin_px: 400,
        ..LayoutParams::default()
    };
    assert!(LayoutEngine::new(bad).is_err());
    let bad = LayoutParams {
        gap_repair_shrink: 1.0,
        ..LayoutParams::default()
    };
    assert!(LayoutEngine::new(bad).is_err());
}

#[test]
fn min_and_ideal_gap_follow_overlap_rule() {
    let params = LayoutParams::default();
    let full = FramingSpec::resolve(FramingMode::FullBody, 2, &params).unwrap();
    let waist = FramingSpec::resolve(FramingMode::WaistUp, 2, &params).unwrap();
    assert_eq!(params.min_gap(&full), 7);
    assert_eq!(params.ideal_gap(&full), 7);
    assert_eq!(params.min_gap(&waist), -72);
    assert_eq!(params.ideal_gap(&waist), 4);
}
