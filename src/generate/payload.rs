use std::path::Path;

use anyhow::Context as _;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult};

/// Size ceiling and re-encoding ladder for start-frame uploads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadPolicy {
    pub max_data_uri_bytes: usize,
    pub jpeg_qualities: Vec<u8>,
    /// Skip the original encoding and go straight to JPEG.
    pub prefer_jpeg: bool,
}

impl Default for PayloadPolicy {
    fn default() -> Self {
        Self {
            max_data_uri_bytes: 5_000_000,
            jpeg_qualities: vec![88, 80, 72],
            prefer_jpeg: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedFrame {
    pub data_uri: String,
    /// JPEG quality used, `None` when the file was sent as is.
    pub jpeg_quality: Option<u8>,
}

impl EncodedFrame {
    pub fn len(&self) -> usize {
        self.data_uri.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_uri.is_empty()
    }
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

fn encode_jpeg(img: &image::RgbImage, quality: u8) -> ReelResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        .context("jpeg encode")?;
    Ok(buf)
}

/// Encode the start frame as a data URI under `policy.max_data_uri_bytes`.
///
/// Walks the JPEG quality ladder until the URI fits. If nothing fits, the smallest
/// attempt is returned and the provider gets to decide.
#[tracing::instrument(skip(policy), fields(path = %path.display()))]
pub fn encode_start_frame(path: &Path, policy: &PayloadPolicy) -> ReelResult<EncodedFrame> {
    let bytes = std::fs::read(path).with_context(|| format!("read '{}'", path.display()))?;
    let limit = policy.max_data_uri_bytes;

    let mut last = None;
    if !policy.prefer_jpeg || policy.jpeg_qualities.is_empty() {
        let frame = EncodedFrame {
            data_uri: data_uri(mime_for(path), &bytes),
            jpeg_quality: None,
        };
        if frame.len() <= limit {
            return Ok(frame);
        }
        last = Some(frame);
    }

    if !policy.jpeg_qualities.is_empty() {
        let rgb = image::load_from_memory(&bytes)
            .map_err(|e| ReelError::validation(format!("start frame '{}': {e}", path.display())))?
            .to_rgb8();
        for &q in &policy.jpeg_qualities {
            let frame = EncodedFrame {
                data_uri: data_uri("image/jpeg", &encode_jpeg(&rgb, q)?),
                jpeg_quality: Some(q),
            };
            tracing::debug!(quality = q, len = frame.len(), "jpeg attempt");
            if frame.len() <= limit {
                return Ok(frame);
            }
            last = Some(frame);
        }
    }

    let frame = last.ok_or_else(|| ReelError::validation("no encoding attempted"))?;
    tracing::warn!(len = frame.len(), limit, "start frame still above the size limit");
    Ok(frame)
}

#[cfg(test)]
#[path = "../../tests/unit/generate/payload.rs"]
mod tests;
