use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::math::scaled_len;
use crate::layout::framing::FramingSpec;

/// Geometry of a cutout as the layout engine sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
    /// Visible (alpha-bbox) content in image pixels.
    pub visible: PixelRect,
}

impl Footprint {
    pub fn visible_height(&self) -> u32 {
        self.visible.height().max(1) as u32
    }

    pub fn visible_width(&self) -> u32 {
        self.visible.width().max(1) as u32
    }

    pub fn scaled_size(&self, k: f64) -> (u32, u32) {
        (scaled_len(self.width, k), scaled_len(self.height, k))
    }

    /// Conservative visible bounds after scaling by `k` (outward rounding).
    pub fn scaled_visible(&self, k: f64) -> PixelRect {
        let (sw, sh) = self.scaled_size(k);
        let x0 = (f64::from(self.visible.x0) * k).floor() as i32;
        let y0 = (f64::from(self.visible.y0) * k).floor() as i32;
        let x1 = ((f64::from(self.visible.x1) * k).ceil() as i32).min(sw as i32);
        let y1 = ((f64::from(self.visible.y1) * k).ceil() as i32).min(sh as i32);
        PixelRect::new(x0, y0, x1.max(x0 + 1), y1.max(y0 + 1))
    }

    /// Scale making the visible height `frac * H`, capped at `max_upscale`.
    ///
    /// Returns the applied scale and whether the cap kicked in.
    pub fn scale_for_fraction(&self, frac: f64, canvas: Canvas, max_upscale: f64) -> (f64, bool) {
        let wanted = frac * f64::from(canvas.height) / f64::from(self.visible_height());
        if wanted > max_upscale {
            (max_upscale, true)
        } else {
            (wanted, false)
        }
    }
}

/// Where a scaled cutout lands on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub scale: f64,
    /// Top-left corner of the scaled image on the canvas.
    pub origin_x: i32,
    pub origin_y: i32,
    pub image_width: u32,
    pub image_height: u32,
    /// Visible content on the canvas.
    pub rect: PixelRect,
    pub floor_y: i32,
}

impl Placement {
    /// Place `fp` at scale `k` so its visible content starts at column `left` and its bottom
    /// rests on `floor_y`.
    pub fn anchor(fp: &Footprint, k: f64, left: i32, floor_y: i32) -> Self {
        let vis = fp.scaled_visible(k);
        let (image_width, image_height) = fp.scaled_size(k);
        let origin_x = left - vis.x0;
        let origin_y = floor_y - vis.y1;
        Self {
            scale: k,
            origin_x,
            origin_y,
            image_width,
            image_height,
            rect: vis.translate(origin_x, origin_y),
            floor_y,
        }
    }

    /// Like [`Placement::anchor`], centering the visible content on `center_x`.
    pub fn anchor_centered(fp: &Footprint, k: f64, center_x: f64, floor_y: i32) -> Self {
        let w = fp.scaled_visible(k).width();
        let left = (center_x - f64::from(w) / 2.0).round() as i32;
        Self::anchor(fp, k, left, floor_y)
    }

    pub fn shifted(&self, dx: i32) -> Self {
        Self {
            origin_x: self.origin_x + dx,
            rect: self.rect.translate(dx, 0),
            ..*self
        }
    }

    pub fn visible_frac(&self, canvas: Canvas) -> f64 {
        f64::from(self.rect.height()) / f64::from(canvas.height)
    }
}

/// Region the visible content must stay inside.
///
/// Left, right and top keep a margin; the bottom is the canvas edge itself so full-body feet
/// may touch it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SafeArea {
    pub rect: PixelRect,
}

impl SafeArea {
    pub fn new(canvas: Canvas, margin_px: i32, spec: &FramingSpec) -> Self {
        let top = margin_px.max(canvas.frac_h(spec.headroom_frac));
        Self {
            rect: PixelRect::new(margin_px, top, canvas.w() - margin_px, canvas.h()),
        }
    }

    pub fn width(&self) -> i32 {
        self.rect.width()
    }

    pub fn contains(&self, r: &PixelRect) -> bool {
        self.rect.contains(r)
    }

    /// Largest visible-height fraction whose top still clears the safe area for `floor_y`.
    pub fn room_frac(&self, floor_y: i32, canvas: Canvas) -> f64 {
        f64::from(floor_y - self.rect.y0 - 2).max(1.0) / f64::from(canvas.height)
    }

    /// Horizontal shift needed to pull `r` inside the safe area (`0` when it already fits or
    /// cannot fit at all).
    pub fn clamp_shift(&self, r: &PixelRect) -> i32 {
        if r.width() > self.width() {
            return 0;
        }
        if r.x0 < self.rect.x0 {
            self.rect.x0 - r.x0
        } else if r.x1 > self.rect.x1 {
            self.rect.x1 - r.x1
        } else {
            0
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/geometry.rs"]
mod tests;
