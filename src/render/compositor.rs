use std::path::Path;

use anyhow::Context;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::cutout::matte::{Cutout, alpha_bbox};
use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::error::{ReelError, ReelResult};
use crate::layout::engine::LayoutOutcome;
use crate::layout::framing::FogSpec;
use crate::layout::geometry::Placement;
use crate::layout::metrics::LayoutMetrics;
use crate::raster::blur::{blur_rgba8_premul, radius_for_sigma};
use crate::raster::decode::{cover_fit, premultiply_rgba8_in_place};
use crate::raster::frame::FrameRGBA;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeParams {
    pub background_blur_sigma: f32,
    pub shadow_blur_sigma: f32,
    pub shadow_opacity: f32,
    pub shadow_offset_x: i32,
    pub shadow_offset_y: i32,
    /// Apply the framing's fog gradient when it defines one.
    pub fog: bool,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            background_blur_sigma: 0.8,
            shadow_blur_sigma: 6.0,
            shadow_opacity: 0.45,
            shadow_offset_x: 3,
            shadow_offset_y: 8,
            fog: true,
        }
    }
}

/// Finished start frame plus the placement report that goes with it.
#[derive(Clone, Debug)]
pub struct StartFrame {
    pub frame: FrameRGBA,
    pub metrics: LayoutMetrics,
}

impl StartFrame {
    pub fn save_png(&self, path: &Path) -> ReelResult<()> {
        self.frame.save_png(path)
    }

    pub fn save_metrics_json(&self, path: &Path) -> ReelResult<()> {
        let json = self.metrics.to_json_pretty()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create metrics dir '{}'", parent.display()))?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("write metrics '{}'", path.display()))?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct CompositeRenderer {
    params: CompositeParams,
}

impl CompositeRenderer {
    pub fn new(params: CompositeParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CompositeParams {
        &self.params
    }

    /// Cover-fit, flatten onto black and lightly blur the background.
    pub fn prepare_background(&self, background: &RgbaImage, canvas: Canvas) -> ReelResult<FrameRGBA> {
        let fitted = FrameRGBA::from_straight(cover_fit(background, canvas)?);
        let mut flat = FrameRGBA::new_filled(canvas.width, canvas.height, [0, 0, 0, 255]);
        flat.draw_over(&fitted, 0, 0, 1.0);
        let data = blur_rgba8_premul(
            &flat.data,
            canvas.width,
            canvas.height,
            self.params.background_blur_sigma,
        )?;
        FrameRGBA::from_premul(canvas.width, canvas.height, data)
    }

    /// Draw background, then shadow and cutout for each placement, then fog.
    #[tracing::instrument(skip_all, fields(people = cutouts.len()))]
    pub fn render(
        &self,
        background: &RgbaImage,
        cutouts: &[Cutout],
        outcome: &LayoutOutcome,
    ) -> ReelResult<StartFrame> {
        if cutouts.len() != outcome.placements.len() {
            return Err(ReelError::validation(format!(
                "{} cutouts but {} placements",
                cutouts.len(),
                outcome.placements.len()
            )));
        }
        let canvas = outcome.canvas;
        let mut frame = self.prepare_background(background, canvas)?;

        for (cutout, placement) in cutouts.iter().zip(&outcome.placements) {
            let layer = scaled_layer(cutout, placement)?;
            if self.params.shadow_opacity > 0.0 {
                let (shadow, pad) = self.shadow_of(&layer)?;
                frame.draw_over(
                    &shadow,
                    placement.origin_x + self.params.shadow_offset_x - pad,
                    placement.origin_y + self.params.shadow_offset_y - pad,
                    1.0,
                );
            }
            frame.draw_over(&layer, placement.origin_x, placement.origin_y, 1.0);
        }

        if self.params.fog
            && let Some(fog) = outcome.spec.fog
        {
            apply_fog(&mut frame, &fog, canvas);
        }

        Ok(StartFrame {
            frame,
            metrics: LayoutMetrics::from_outcome(outcome),
        })
    }

    /// Black silhouette of `layer`, blurred and faded. Padded by the blur radius so the soft
    /// edge is not clipped; the pad is returned so callers can offset the draw.
    fn shadow_of(&self, layer: &FrameRGBA) -> ReelResult<(FrameRGBA, i32)> {
        let pad = radius_for_sigma(self.params.shadow_blur_sigma);
        let w = layer.width + 2 * pad;
        let h = layer.height + 2 * pad;
        let op = (self.params.shadow_opacity.clamp(0.0, 1.0) * 255.0).round() as u16;
        let mut data = vec![0u8; w as usize * h as usize * 4];
        for y in 0..layer.height {
            for x in 0..layer.width {
                let a = layer.pixel(x, y)[3];
                let idx = (((y + pad) * w + x + pad) as usize) * 4;
                data[idx + 3] = crate::foundation::math::mul_div255_u8(u16::from(a), op);
            }
        }
        let blurred = blur_rgba8_premul(&data, w, h, self.params.shadow_blur_sigma)?;
        Ok((FrameRGBA::from_premul(w, h, blurred)?, pad as i32))
    }
}

/// Resize the cutout to its placement in premultiplied space.
///
/// Lanczos ringing is cut back: color never exceeds alpha, and everything outside the scaled
/// alpha support (plus one pixel) is transparent.
fn scaled_layer(cutout: &Cutout, placement: &Placement) -> ReelResult<FrameRGBA> {
    let (w, h) = (placement.image_width, placement.image_height);
    let mut premul = cutout.image().clone();
    premultiply_rgba8_in_place(&mut premul);
    let mut data = imageops::resize(&premul, w, h, FilterType::Lanczos3).into_raw();

    let keep = alpha_bbox(cutout.image(), 1).map(|r| scale_out(r, placement.scale, 1));
    for (i, px) in data.chunks_exact_mut(4).enumerate() {
        let x = (i % w as usize) as i32;
        let y = (i / w as usize) as i32;
        let inside = keep.is_some_and(|k| x >= k.x0 && x < k.x1 && y >= k.y0 && y < k.y1);
        if !inside {
            px.fill(0);
            continue;
        }
        let a = px[3];
        for c in &mut px[..3] {
            *c = (*c).min(a);
        }
    }
    FrameRGBA::from_premul(w, h, data)
}

/// `r` scaled by `k`, rounded outward and grown by `pad` on every side.
fn scale_out(r: PixelRect, k: f64, pad: i32) -> PixelRect {
    PixelRect::new(
        (f64::from(r.x0) * k).floor() as i32 - pad,
        (f64::from(r.y0) * k).floor() as i32 - pad,
        (f64::from(r.x1) * k).ceil() as i32 + pad,
        (f64::from(r.y1) * k).ceil() as i32 + pad,
    )
}

/// Blend the fog color row by row with a linear alpha ramp to the bottom edge.
pub fn apply_fog(frame: &mut FrameRGBA, fog: &FogSpec, canvas: Canvas) {
    let start = canvas.frac_h(fog.start_frac).max(0);
    for y in start..canvas.h().min(frame.height as i32) {
        let alpha = fog.alpha_at(y, canvas);
        if alpha == 0 {
            continue;
        }
        frame.blend_row(y as u32, fog.color.with_alpha(alpha).to_premul());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
