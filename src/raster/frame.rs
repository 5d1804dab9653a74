use std::path::Path;

use anyhow::Context;
use image::RgbaImage;

use crate::foundation::core::PixelRect;
use crate::foundation::error::{ReelError, ReelResult};
use crate::raster::composite::{over, over_solid_in_place};
use crate::raster::decode::{premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};

/// A rendered RGBA8 frame.
///
/// Frames are **premultiplied alpha** while they move through the compositor; conversion back to
/// straight alpha happens only when writing files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn new_filled(width: u32, height: u32, premul: [u8; 4]) -> Self {
        let data = premul.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            data,
            premultiplied: true,
        }
    }

    pub fn from_straight(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        let mut data = img.into_raw();
        premultiply_rgba8_in_place(&mut data);
        Self {
            width,
            height,
            data,
            premultiplied: true,
        }
    }

    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> ReelResult<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return Err(ReelError::render("frame data does not match width*height*4"));
        }
        Ok(Self {
            width,
            height,
            data,
            premultiplied: true,
        })
    }

    pub fn to_straight_image(&self) -> ReelResult<RgbaImage> {
        let mut data = self.data.clone();
        if self.premultiplied {
            unpremultiply_rgba8_in_place(&mut data);
        }
        RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| ReelError::render("frame buffer size mismatch"))
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.width as usize * 4;
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Composite `src` with its top-left corner at `(x, y)`, clipping to this frame.
    pub fn draw_over(&mut self, src: &FrameRGBA, x: i32, y: i32, opacity: f32) {
        let dst_w = self.width as i32;
        let dst_h = self.height as i32;
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + src.width as i32).min(dst_w);
        let y1 = (y + src.height as i32).min(dst_h);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        for dy in y0..y1 {
            let sy = (dy - y) as usize;
            for dx in x0..x1 {
                let sx = (dx - x) as usize;
                let si = (sy * src.width as usize + sx) * 4;
                let di = (dy as usize * self.width as usize + dx as usize) * 4;
                let s = [
                    src.data[si],
                    src.data[si + 1],
                    src.data[si + 2],
                    src.data[si + 3],
                ];
                if s[3] == 0 {
                    continue;
                }
                let d = [
                    self.data[di],
                    self.data[di + 1],
                    self.data[di + 2],
                    self.data[di + 3],
                ];
                self.data[di..di + 4].copy_from_slice(&over(d, s, opacity));
            }
        }
    }

    /// Blend a solid premultiplied color over one row.
    pub fn blend_row(&mut self, y: u32, premul: [u8; 4]) {
        if y < self.height {
            over_solid_in_place(self.row_mut(y), premul);
        }
    }

    /// Overwrite the one-pixel outline of `rect` (clipped) with an opaque color.
    pub fn stroke_rect(&mut self, rect: PixelRect, premul: [u8; 4]) {
        let w = self.width as i32;
        let h = self.height as i32;
        let mut put = |x: i32, y: i32| {
            if x >= 0 && y >= 0 && x < w && y < h {
                let idx = (y as usize * w as usize + x as usize) * 4;
                self.data[idx..idx + 4].copy_from_slice(&premul);
            }
        };
        for x in rect.x0..rect.x1 {
            put(x, rect.y0);
            put(x, rect.y1 - 1);
        }
        for y in rect.y0..rect.y1 {
            put(rect.x0, y);
            put(rect.x1 - 1, y);
        }
    }

    pub fn save_png(&self, path: &Path) -> ReelResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        let img = self.to_straight_image()?;
        img.save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/frame.rs"]
mod tests;
