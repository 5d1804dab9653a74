use rayon::prelude::*;

use crate::foundation::error::{ReelError, ReelResult};

/// Kernel radius covering three standard deviations.
pub fn radius_for_sigma(sigma: f32) -> u32 {
    if !sigma.is_finite() || sigma <= 0.0 {
        return 0;
    }
    (sigma * 3.0).ceil() as u32
}

/// Separable Gaussian blur over a premultiplied RGBA8 buffer.
pub fn blur_rgba8_premul(src: &[u8], width: u32, height: u32, sigma: f32) -> ReelResult<Vec<u8>> {
    blur_channels::<4>(src, width, height, sigma)
}

/// Separable Gaussian blur over a single 8-bit channel (alpha mattes).
pub fn blur_gray8(src: &[u8], width: u32, height: u32, sigma: f32) -> ReelResult<Vec<u8>> {
    blur_channels::<1>(src, width, height, sigma)
}

fn blur_channels<const C: usize>(
    src: &[u8],
    width: u32,
    height: u32,
    sigma: f32,
) -> ReelResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(C))
        .ok_or_else(|| ReelError::render("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(ReelError::render(format!(
            "blur expects a buffer of width*height*{C} bytes"
        )));
    }
    let radius = radius_for_sigma(sigma);
    if radius == 0 || expected_len == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    horizontal_pass::<C>(src, &mut tmp, width, &kernel);
    vertical_pass::<C>(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> ReelResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(ReelError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(ReelError::render("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Push the rounding residue into the center tap so the kernel sums to exactly 1.0.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }

    Ok(weights)
}

fn horizontal_pass<const C: usize>(src: &[u8], dst: &mut [u8], width: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let row_len = width as usize * C;
    dst.par_chunks_mut(row_len)
        .zip(src.par_chunks(row_len))
        .for_each(|(dst_row, src_row)| {
            for x in 0..w {
                let mut acc = [0u64; C];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                    let idx = sx as usize * C;
                    for c in 0..C {
                        acc[c] += u64::from(kw) * u64::from(src_row[idx + c]);
                    }
                }
                let out_idx = x as usize * C;
                for c in 0..C {
                    dst_row[out_idx + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn vertical_pass<const C: usize>(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let h = height as i32;
    let row_len = width as usize * C;
    dst.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, dst_row)| {
            for i in 0..row_len {
                let mut acc = 0u64;
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y as i32 + ki as i32 - radius).clamp(0, h - 1);
                    acc += u64::from(kw) * u64::from(src[sy as usize * row_len + i]);
                }
                dst_row[i] = q16_to_u8(acc);
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/raster/blur.rs"]
mod tests;
