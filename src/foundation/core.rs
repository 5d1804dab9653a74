use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult};

/// Output canvas size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 720,
            height: 1280,
        }
    }
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> ReelResult<Self> {
        if width == 0 || height == 0 {
            return Err(ReelError::validation("canvas width/height must be > 0"));
        }
        Ok(Self { width, height })
    }

    pub fn w(self) -> i32 {
        self.width as i32
    }

    pub fn h(self) -> i32 {
        self.height as i32
    }

    /// Convert a fraction of the canvas height to pixels (rounded).
    pub fn frac_h(self, frac: f64) -> i32 {
        (frac * f64::from(self.height)).round() as i32
    }

    /// Convert a fraction of the canvas width to pixels (rounded).
    pub fn frac_w(self, frac: f64) -> i32 {
        (frac * f64::from(self.width)).round() as i32
    }
}

/// Output frame rate as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32,
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 24, den: 1 }
    }
}

impl Fps {
    pub fn new(num: u32, den: u32) -> ReelResult<Self> {
        if num == 0 || den == 0 {
            return Err(ReelError::validation("fps num/den must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

/// ffmpeg rate syntax: `24` or `30000/1001`.
impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Axis-aligned pixel rectangle, half-open: `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl PixelRect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width().max(0)) * i64::from(self.height().max(0))
    }

    pub fn center_x(&self) -> f64 {
        f64::from(self.x0 + self.x1) / 2.0
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x0 + dx, self.y0 + dy, self.x1 + dx, self.y1 + dy)
    }

    pub fn contains(&self, other: &PixelRect) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Straight-alpha RGBA color used in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Premultiplied byte representation.
    pub fn to_premul(self) -> [u8; 4] {
        let a = u16::from(self.a);
        [
            crate::foundation::math::mul_div255_u8(u16::from(self.r), a),
            crate::foundation::math::mul_div255_u8(u16::from(self.g), a),
            crate::foundation::math::mul_div255_u8(u16::from(self.b), a),
            self.a,
        ]
    }
}
