use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::foundation::core::PixelRect;
use crate::foundation::error::{ReelError, ReelResult};
use crate::layout::geometry::Footprint;
use crate::raster::blur::blur_gray8;
use crate::raster::decode::load_rgba;

/// Alpha at or above this value counts as visible content.
pub const VISIBLE_ALPHA_THRESHOLD: u8 = 20;

const FEATHER_SIGMA: f32 = 1.2;

/// A photo with its background removed (straight alpha).
#[derive(Clone, Debug)]
pub struct Cutout {
    image: RgbaImage,
    visible: PixelRect,
    source: Option<PathBuf>,
}

impl Cutout {
    pub fn new(image: RgbaImage, source: Option<PathBuf>) -> ReelResult<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ReelError::validation("cutout image is empty"));
        }
        let visible = visible_bbox(&image);
        Ok(Self {
            image,
            visible,
            source,
        })
    }

    /// Load an already matted PNG from disk.
    pub fn load(path: &Path) -> ReelResult<Self> {
        Self::new(load_rgba(path)?, Some(path.to_path_buf()))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Bounds of the visible (alpha >= 20) content in image pixels.
    pub fn visible_bbox(&self) -> PixelRect {
        self.visible
    }

    pub fn visible_height(&self) -> u32 {
        self.visible.height() as u32
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn footprint(&self) -> Footprint {
        Footprint {
            width: self.image.width(),
            height: self.image.height(),
            visible: self.visible,
        }
    }
}

/// Tight bounds of pixels whose alpha is at least `threshold`.
pub fn alpha_bbox(img: &RgbaImage, threshold: u8) -> Option<PixelRect> {
    let (w, h) = img.dimensions();
    let mut x0 = u32::MAX;
    let mut y0 = u32::MAX;
    let mut x1 = 0u32;
    let mut y1 = 0u32;
    for (x, y, px) in img.enumerate_pixels() {
        if px.0[3] >= threshold {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x + 1);
            y1 = y1.max(y + 1);
        }
    }
    if x0 == u32::MAX || w == 0 || h == 0 {
        return None;
    }
    Some(PixelRect::new(x0 as i32, y0 as i32, x1 as i32, y1 as i32))
}

/// Visible bounds with fallbacks: faint content first, then the whole image.
pub fn visible_bbox(img: &RgbaImage) -> PixelRect {
    alpha_bbox(img, VISIBLE_ALPHA_THRESHOLD)
        .or_else(|| alpha_bbox(img, 1))
        .unwrap_or_else(|| PixelRect::from_size(img.width(), img.height()))
}

/// Share of the image covered by the visible bbox; `0.0` when nothing is visible.
pub fn visible_area_frac(img: &RgbaImage) -> f64 {
    let total = f64::from(img.width()) * f64::from(img.height());
    if total <= 0.0 {
        return 0.0;
    }
    alpha_bbox(img, VISIBLE_ALPHA_THRESHOLD)
        .map(|r| r.area() as f64 / total)
        .unwrap_or(0.0)
}

/// Shrink the matte by one pixel to drop background halo, then feather its edge.
pub fn refine_matte(img: &mut RgbaImage) -> ReelResult<()> {
    let (w, h) = img.dimensions();
    let alpha: Vec<u8> = img.pixels().map(|p| p.0[3]).collect();
    let eroded = erode3(&alpha, w as usize, h as usize);
    let feathered = blur_gray8(&eroded, w, h, FEATHER_SIGMA)?;
    for (px, a) in img.pixels_mut().zip(feathered) {
        px.0[3] = a;
    }
    Ok(())
}

fn erode3(alpha: &[u8], w: usize, h: usize) -> Vec<u8> {
    let mut out = vec![0u8; alpha.len()];
    for y in 0..h {
        for x in 0..w {
            let mut m = u8::MAX;
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    m = m.min(alpha[ny * w + nx]);
                }
            }
            out[y * w + x] = m;
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/cutout/matte.rs"]
mod tests;
