use serde::{Deserialize, Serialize};

/// A position along one canvas axis.
///
/// Absolute coordinates may be negative (content partially off-canvas). Percentages are kept
/// as their own variant and only resolved against the canvas extent at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coord {
    /// Absolute pixel offset from the canvas origin.
    Px(i64),
    /// Percentage of the canvas extent on this axis (`50.0` = middle).
    Percent(f64),
}

impl Coord {
    /// Resolve to absolute pixels for an axis `extent` pixels long.
    pub fn resolve(self, extent: u32) -> i64 {
        match self {
            Self::Px(v) => v,
            Self::Percent(p) => (f64::from(extent) * p / 100.0).round() as i64,
        }
    }

    /// `true` when this coordinate depends on the canvas size.
    pub fn is_relative(self) -> bool {
        matches!(self, Self::Percent(_))
    }
}

impl Default for Coord {
    fn default() -> Self {
        Self::Px(0)
    }
}

impl From<i64> for Coord {
    fn from(v: i64) -> Self {
        Self::Px(v)
    }
}

impl From<i32> for Coord {
    fn from(v: i32) -> Self {
        Self::Px(i64::from(v))
    }
}

/// Canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bytes in one packed RGBA8 frame of this size.
    pub fn rgba_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
