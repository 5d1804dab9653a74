use super::*;
use crate::foundation::core::{PixelRect, Rgba8};
use crate::layout::engine::{LayoutEngine, LayoutParams};
use crate::layout::framing::FramingMode;

fn gray_background(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_pixel(w, h, image::Rgba([128, 128, 128, 255]))
}

/// Transparent canvas with an opaque red body.
fn red_figure(w: u32, h: u32, body: PixelRect) -> Cutout {
    let mut img = RgbaImage::new(w, h);
    for y in body.y0..body.y1 {
        for x in body.x0..body.x1 {
            img.put_pixel(x as u32, y as u32, image::Rgba([220, 20, 20, 255]));
        }
    }
    Cutout::new(img, None).unwrap()
}

fn layout_for(cutouts: &[Cutout], mode: FramingMode) -> LayoutOutcome {
    let engine = LayoutEngine::new(LayoutParams::default()).unwrap();
    let spec = engine.framing(mode, cutouts.len()).unwrap();
    let fps: Vec<_> = cutouts.iter().map(Cutout::footprint).collect();
    engine.place(&fps, &spec).unwrap()
}

#[test]
fn background_is_cover_fit_and_opaque() {
    let r = CompositeRenderer::default();
    let canvas = Canvas::default();
    let bg = r
        .prepare_background(&gray_background(300, 200), canvas)
        .unwrap();
    assert_eq!((bg.width, bg.height), (720, 1280));
    assert_eq!(bg.pixel(0, 0), [128, 128, 128, 255]);
    assert_eq!(bg.pixel(719, 1279), [128, 128, 128, 255]);
}

#[test]
fn cutout_lands_on_its_rect_with_a_shadow_beside_it() {
    let cut = red_figure(300, 700, PixelRect::new(50, 40, 250, 700));
    let outcome = layout_for(std::slice::from_ref(&cut), FramingMode::FullBody);
    let frame = CompositeRenderer::default()
        .render(&gray_background(720, 1280), &[cut], &outcome)
        .unwrap();

    let rect = outcome.placements[0].rect;
    let cx = rect.center_x() as u32;
    let cy = ((rect.y0 + rect.y1) / 2) as u32;
    let inside = frame.frame.pixel(cx, cy);
    assert!(inside[0] > 200 && inside[1] < 40, "{inside:?}");

    // Shadow is offset right/down, so the column just right of the body darkens.
    let beside = frame.frame.pixel((rect.x1 + 1) as u32, cy);
    let far = frame.frame.pixel(5, cy);
    assert_eq!(far, [128, 128, 128, 255]);
    assert!(beside[0] < 120, "{beside:?}");

    assert_eq!(frame.metrics.people.len(), 1);
    assert_eq!(frame.metrics.people[0].rect, rect);
}

#[test]
fn shadow_can_be_disabled() {
    let cut = red_figure(300, 700, PixelRect::new(50, 40, 250, 700));
    let outcome = layout_for(std::slice::from_ref(&cut), FramingMode::FullBody);
    let params = CompositeParams {
        shadow_opacity: 0.0,
        ..CompositeParams::default()
    };
    let frame = CompositeRenderer::new(params)
        .render(&gray_background(720, 1280), &[cut], &outcome)
        .unwrap();
    let rect = outcome.placements[0].rect;
    let cy = ((rect.y0 + rect.y1) / 2) as u32;
    assert_eq!(
        frame.frame.pixel((rect.x1 + 2) as u32, cy),
        [128, 128, 128, 255]
    );
}

#[test]
fn cutout_edges_blend_without_a_dark_fringe() {
    let cut = red_figure(300, 700, PixelRect::new(50, 40, 250, 700));
    let outcome = layout_for(std::slice::from_ref(&cut), FramingMode::FullBody);
    let params = CompositeParams {
        shadow_opacity: 0.0,
        ..CompositeParams::default()
    };
    let frame = CompositeRenderer::new(params)
        .render(&gray_background(720, 1280), &[cut], &outcome)
        .unwrap();
    let rect = outcome.placements[0].rect;
    let cy = ((rect.y0 + rect.y1) / 2) as u32;

    // Red over gray never drops the red channel below the gray.
    for x in (rect.x0 - 4)..(rect.x1 + 4) {
        let px = frame.frame.pixel(x as u32, cy);
        assert!(px[0] >= 127, "dark fringe at x={x}: {px:?}");
    }
    for x in [rect.x0 - 3, rect.x1 + 2, rect.x1 + 3] {
        assert_eq!(frame.frame.pixel(x as u32, cy), [128, 128, 128, 255], "x={x}");
    }
}

#[test]
fn scaled_layer_is_valid_premultiplied() {
    let cut = red_figure(300, 700, PixelRect::new(50, 40, 250, 700));
    let outcome = layout_for(std::slice::from_ref(&cut), FramingMode::FullBody);
    let placement = outcome.placements[0];
    let layer = scaled_layer(&cut, &placement).unwrap();
    assert_eq!(
        (layer.width, layer.height),
        (placement.image_width, placement.image_height)
    );
    for px in layer.data.chunks_exact(4) {
        assert!(px[..3].iter().all(|&c| c <= px[3]), "{px:?}");
    }
    // Transparent margin to the left of the body stays transparent.
    let left = (placement.rect.x0 - placement.origin_x - 3) as u32;
    let mid = placement.image_height / 2;
    assert_eq!(layer.pixel(left, mid), [0, 0, 0, 0]);
}

#[test]
fn waist_framing_fogs_the_bottom_rows() {
    let cut = red_figure(300, 700, PixelRect::new(50, 40, 250, 700));
    let outcome = layout_for(std::slice::from_ref(&cut), FramingMode::WaistUp);
    let frame = CompositeRenderer::default()
        .render(&gray_background(720, 1280), &[cut], &outcome)
        .unwrap();
    let bottom = frame.frame.pixel(5, 1279);
    // Fog color is warm: red channel rises above the gray, blue stays below red.
    assert!(bottom[0] > 200, "{bottom:?}");
    assert!(bottom[2] < bottom[0]);
    assert_eq!(frame.frame.pixel(5, 100), [128, 128, 128, 255]);
}

#[test]
fn cutout_count_must_match_placements() {
    let cut = red_figure(300, 700, PixelRect::new(50, 40, 250, 700));
    let outcome = layout_for(std::slice::from_ref(&cut), FramingMode::FullBody);
    let err = CompositeRenderer::default()
        .render(&gray_background(720, 1280), &[cut.clone(), cut], &outcome)
        .unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[test]
fn fog_ramp_is_zero_above_start() {
    let canvas = Canvas::default();
    let mut frame = FrameRGBA::new_filled(720, 1280, [0, 0, 0, 255]);
    let fog = FogSpec {
        start_frac: 0.5,
        color: Rgba8::WHITE,
        max_alpha: 255,
    };
    apply_fog(&mut frame, &fog, canvas);
    assert_eq!(frame.pixel(0, 639), [0, 0, 0, 255]);
    assert!(frame.pixel(0, 1279)[0] > 250);
    let mid = frame.pixel(0, 960)[0];
    assert!((120..=136).contains(&mid), "{mid}");
}

#[test]
fn start_frame_round_trips_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let cut = red_figure(300, 700, PixelRect::new(50, 40, 250, 700));
    let outcome = layout_for(std::slice::from_ref(&cut), FramingMode::FullBody);
    let frame = CompositeRenderer::default()
        .render(&gray_background(720, 1280), &[cut], &outcome)
        .unwrap();
    let png = dir.path().join("out/start.png");
    let json = dir.path().join("out/start.json");
    frame.save_png(&png).unwrap();
    frame.save_metrics_json(&json).unwrap();
    let img = image::open(&png).unwrap();
    assert_eq!((img.width(), img.height()), (720, 1280));
    let metrics = LayoutMetrics::from_json(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(metrics, frame.metrics);
}
