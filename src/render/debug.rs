use crate::foundation::core::{PixelRect, Rgba8};
use crate::layout::engine::LayoutOutcome;
use crate::raster::frame::FrameRGBA;

const SAFE_AREA: Rgba8 = Rgba8::rgb(64, 160, 255);
const PERSON: Rgba8 = Rgba8::rgb(64, 255, 96);
const FLOOR: Rgba8 = Rgba8::rgb(255, 64, 64);

/// Copy of `frame` with the safe area, each visible rect and each floor line outlined.
pub fn annotate(frame: &FrameRGBA, outcome: &LayoutOutcome) -> FrameRGBA {
    let mut out = frame.clone();
    out.stroke_rect(outcome.safe_area.rect, SAFE_AREA.to_premul());
    for p in &outcome.placements {
        out.stroke_rect(p.rect, PERSON.to_premul());
        let floor = PixelRect::new(p.rect.x0, p.floor_y - 1, p.rect.x1, p.floor_y);
        out.stroke_rect(floor, FLOOR.to_premul());
    }
    out
}
