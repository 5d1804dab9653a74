use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{ReelError, ReelResult};
use crate::layout::engine::LayoutParams;

/// Vertical crop convention for the start frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FramingMode {
    #[default]
    FullBody,
    WaistUp,
    ChestUp,
}

impl FramingMode {
    pub const ALL: [FramingMode; 3] = [Self::FullBody, Self::WaistUp, Self::ChestUp];

    pub fn key(self) -> &'static str {
        match self {
            Self::FullBody => "full-body",
            Self::WaistUp => "waist-up",
            Self::ChestUp => "chest-up",
        }
    }
}

impl fmt::Display for FramingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FramingMode {
    type Err = ReelError;

    fn from_str(s: &str) -> ReelResult<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "full-body" | "full" | "fullbody" => Ok(Self::FullBody),
            "waist-up" | "waist" => Ok(Self::WaistUp),
            "chest-up" | "chest" => Ok(Self::ChestUp),
            other => Err(ReelError::validation(format!(
                "unknown framing '{other}' (expected full-body, waist-up or chest-up)"
            ))),
        }
    }
}

/// Color wash that fades in toward the bottom edge, hiding the missing legs of waist/chest
/// framings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FogSpec {
    /// Row (fraction of canvas height) where the fog starts at zero opacity.
    pub start_frac: f64,
    pub color: Rgba8,
    /// Opacity reached at the bottom edge.
    pub max_alpha: u8,
}

impl FogSpec {
    /// Alpha for canvas row `y`: linear from `start` to `max_alpha` at the bottom edge.
    pub fn alpha_at(&self, y: i32, canvas: Canvas) -> u8 {
        let start = canvas.frac_h(self.start_frac);
        let h = canvas.h();
        if y < start || h <= start {
            return 0;
        }
        let t = f64::from(y - start) / f64::from(h - start);
        (f64::from(self.max_alpha) * t).round().clamp(0.0, 255.0) as u8
    }
}

/// Tunables for one framing mode (configuration form).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingProfile {
    pub single_target_frac: f64,
    /// Pair target; `None` uses the shared pair target of [`LayoutParams`].
    pub pair_target_frac: Option<f64>,
    pub single_min_frac: f64,
    pub pair_min_frac: f64,
    /// Virtual floor as a fraction of canvas height; `None` is the bottom edge.
    pub floor_frac: Option<f64>,
    pub headroom_frac: f64,
    pub fog: Option<FogSpec>,
}

impl Default for FramingProfile {
    fn default() -> Self {
        Self::full_body()
    }
}

const FOG_COLOR: Rgba8 = Rgba8::rgb(255, 224, 170);

impl FramingProfile {
    pub fn full_body() -> Self {
        Self {
            single_target_frac: 0.66,
            pair_target_frac: None,
            single_min_frac: 0.66,
            pair_min_frac: 0.64,
            floor_frac: None,
            headroom_frac: 0.005,
            fog: None,
        }
    }

    pub fn waist_up() -> Self {
        Self {
            single_target_frac: 0.56,
            pair_target_frac: None,
            single_min_frac: 0.56,
            pair_min_frac: 0.54,
            floor_frac: Some(0.88),
            headroom_frac: 0.02,
            fog: Some(FogSpec {
                start_frac: 0.80,
                color: FOG_COLOR,
                max_alpha: 180,
            }),
        }
    }

    pub fn chest_up() -> Self {
        Self {
            single_target_frac: 0.48,
            pair_target_frac: None,
            single_min_frac: 0.48,
            pair_min_frac: 0.46,
            floor_frac: Some(0.74),
            headroom_frac: 0.03,
            fog: Some(FogSpec {
                start_frac: 0.62,
                color: FOG_COLOR,
                max_alpha: 210,
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingTable {
    pub full_body: FramingProfile,
    pub waist_up: FramingProfile,
    pub chest_up: FramingProfile,
}

impl Default for FramingTable {
    fn default() -> Self {
        Self {
            full_body: FramingProfile::full_body(),
            waist_up: FramingProfile::waist_up(),
            chest_up: FramingProfile::chest_up(),
        }
    }
}

impl FramingTable {
    pub fn profile(&self, mode: FramingMode) -> &FramingProfile {
        match mode {
            FramingMode::FullBody => &self.full_body,
            FramingMode::WaistUp => &self.waist_up,
            FramingMode::ChestUp => &self.chest_up,
        }
    }
}

/// Resolved framing for a given mode and number of people.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FramingSpec {
    pub mode: FramingMode,
    pub people: usize,
    pub target_frac: f64,
    /// Anti-dwarf floor for the visible-height fraction.
    pub min_frac: f64,
    pub max_frac: f64,
    pub floor_frac: Option<f64>,
    pub headroom_frac: f64,
    pub fog: Option<FogSpec>,
    /// Pairs may overlap slightly instead of keeping a gap.
    pub allow_overlap: bool,
}

impl FramingSpec {
    pub fn resolve(mode: FramingMode, people: usize, params: &LayoutParams) -> ReelResult<Self> {
        let profile = params.framings.profile(mode);
        let (target_frac, min_frac) = match people {
            1 => (profile.single_target_frac, profile.single_min_frac),
            2 => (
                profile.pair_target_frac.unwrap_or(params.pair_target_frac),
                profile.pair_min_frac,
            ),
            n => {
                return Err(ReelError::validation(format!(
                    "a start frame holds one or two people, got {n}"
                )));
            }
        };
        let max_frac = params.max_visible_frac;
        if !(0.0 < min_frac && min_frac <= max_frac && max_frac <= 1.0) {
            return Err(ReelError::validation(format!(
                "framing '{mode}' has inconsistent fractions: min {min_frac}, max {max_frac}"
            )));
        }
        Ok(Self {
            mode,
            people,
            target_frac,
            min_frac,
            max_frac,
            floor_frac: profile.floor_frac,
            headroom_frac: profile.headroom_frac,
            fog: profile.fog,
            allow_overlap: people == 2 && mode == FramingMode::WaistUp && params.allow_waist_overlap,
        })
    }

    /// Canvas row the bottom of the visible content rests on (exclusive bound).
    pub fn floor_y(&self, canvas: Canvas) -> i32 {
        match self.floor_frac {
            None => canvas.h(),
            Some(f) => canvas.frac_h(f).clamp(1, canvas.h()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/framing.rs"]
mod tests;
