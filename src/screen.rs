//! Resolution and scaling context threaded through the patch engines.
//!
//! The game is hardcoded to a 1920x1080 virtual viewport. Everything the
//! engines need to know about the target resolution is precomputed once into
//! an immutable [`ScaleContext`] and passed down explicitly, so the engines
//! stay independently testable.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The virtual viewport the game was authored against.
pub const DEFAULT_SCREEN: Screen = Screen {
    width: 1920,
    height: 1080,
};

/// A screen size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    pub width: i32,
    pub height: i32,
}

impl Screen {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub const fn center_x(&self) -> i32 {
        self.width / 2
    }

    pub const fn center_y(&self) -> i32 {
        self.height / 2
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How the virtual viewport is derived from the display resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scaling {
    /// Expand the viewport horizontally, keeping the default 1080 virtual
    /// height (most elements keep their size, more world is visible).
    #[default]
    HorPlus,
    /// Use the display resolution as the virtual viewport 1:1.
    PixelBased,
}

#[derive(Error, Debug)]
#[error("unknown scaling type '{0}' (expected 'hor+' or 'pixel')")]
pub struct ScalingParseError(String);

impl FromStr for Scaling {
    type Err = ScalingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hor+" => Ok(Scaling::HorPlus),
            "pixel" => Ok(Scaling::PixelBased),
            other => Err(ScalingParseError(other.to_string())),
        }
    }
}

impl fmt::Display for Scaling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scaling::HorPlus => write!(f, "hor+"),
            Scaling::PixelBased => write!(f, "pixel"),
        }
    }
}

/// Immutable patch-run context: default and target viewports plus derived
/// scale factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleContext {
    /// The viewport the game was authored against (1920x1080).
    pub default: Screen,
    /// The virtual viewport to patch in.
    pub new: Screen,
    /// The actual display resolution requested by the user.
    pub resolution: Screen,
    pub scale_x: f64,
    pub scale_y: f64,
    /// max(scale_x, scale_y), used for uniform rescales.
    pub scale: f64,
    /// Recenter HUD elements instead of pinning them to screen edges.
    pub center_hud: bool,
}

impl ScaleContext {
    /// Compute the virtual viewport and scale factors for a display
    /// resolution.
    pub fn compute(resolution: Screen, scaling: Scaling, center_hud: bool) -> Self {
        let new = match scaling {
            Scaling::HorPlus => {
                // Truncating division matches the game's integer viewport.
                let virtual_width = (f64::from(resolution.width) / f64::from(resolution.height)
                    * f64::from(DEFAULT_SCREEN.height)) as i32;
                Screen::new(virtual_width, DEFAULT_SCREEN.height)
            }
            Scaling::PixelBased => resolution,
        };
        let scale_x = f64::from(new.width) / f64::from(DEFAULT_SCREEN.width);
        let scale_y = f64::from(new.height) / f64::from(DEFAULT_SCREEN.height);
        Self {
            default: DEFAULT_SCREEN,
            new,
            resolution,
            scale_x,
            scale_y,
            scale: scale_x.max(scale_y),
            center_hud,
        }
    }
}
