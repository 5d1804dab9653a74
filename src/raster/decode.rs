use std::path::Path;

use anyhow::Context;
use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};

/// Decode an image file into straight-alpha RGBA8.
pub fn load_rgba(path: &Path) -> ReelResult<RgbaImage> {
    let bytes = std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    let img = decode_rgba(&bytes).with_context(|| format!("decode image '{}'", path.display()))?;
    Ok(img)
}

pub fn decode_rgba(bytes: &[u8]) -> anyhow::Result<RgbaImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(dyn_img.to_rgba8())
}

pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

/// Scale `img` to cover the canvas, then center-crop the overflow.
pub fn cover_fit(img: &RgbaImage, canvas: Canvas) -> ReelResult<RgbaImage> {
    let (iw, ih) = img.dimensions();
    if iw == 0 || ih == 0 {
        return Err(ReelError::validation("background image is empty"));
    }
    let scale = f64::max(
        f64::from(canvas.width) / f64::from(iw),
        f64::from(canvas.height) / f64::from(ih),
    );
    let sw = ((f64::from(iw) * scale).ceil() as u32).max(canvas.width);
    let sh = ((f64::from(ih) * scale).ceil() as u32).max(canvas.height);
    let scaled = imageops::resize(img, sw, sh, FilterType::Lanczos3);
    let left = (sw - canvas.width) / 2;
    let top = (sh - canvas.height) / 2;
    Ok(imageops::crop_imm(&scaled, left, top, canvas.width, canvas.height).to_image())
}

#[cfg(test)]
#[path = "../../tests/unit/raster/decode.rs"]
mod tests;
