//! Fixed-point per-pixel filters over RGBA bytes. Alpha is never touched.

use crate::timeline::model::{Clip, ColorFilter, CustomFilter};

pub fn invert(px: &mut [u8]) {
    px[0] = 255 - px[0];
    px[1] = 255 - px[1];
    px[2] = 255 - px[2];
}

pub fn grayscale(px: &mut [u8]) {
    let (r, g, b) = (u32::from(px[0]), u32::from(px[1]), u32::from(px[2]));
    let gray = ((77 * r + 150 * g + 29 * b) >> 8) as u8;
    px[0] = gray;
    px[1] = gray;
    px[2] = gray;
}

pub fn sepia(px: &mut [u8]) {
    let (r, g, b) = (u32::from(px[0]), u32::from(px[1]), u32::from(px[2]));
    px[0] = ((402 * r + 787 * g + 194 * b) >> 10).min(255) as u8;
    px[1] = ((357 * r + 702 * g + 172 * b) >> 10).min(255) as u8;
    px[2] = ((278 * r + 547 * g + 134 * b) >> 10).min(255) as u8;
}

/// Intensity threshold, not a gradient: mid-range pixels turn white, the rest black.
pub fn edge(px: &mut [u8]) {
    let avg = (u32::from(px[0]) + u32::from(px[1]) + u32::from(px[2])) / 3;
    let v = if avg > 85 && avg < 170 { 255 } else { 0 };
    px[0] = v;
    px[1] = v;
    px[2] = v;
}

/// Apply one built-in filter to a single pixel.
pub fn apply_builtin(filter: ColorFilter, px: &mut [u8]) {
    match filter {
        ColorFilter::Invert => invert(px),
        ColorFilter::Grayscale => grayscale(px),
        ColorFilter::Sepia => sepia(px),
        ColorFilter::Edge => edge(px),
    }
}

#[derive(Clone, Debug)]
enum Step {
    Builtin(ColorFilter),
    Custom(CustomFilter),
}

/// Built-in and custom filters composed into one per-pixel function.
#[derive(Clone, Debug, Default)]
pub struct PixelTransform {
    steps: Vec<Step>,
}

impl PixelTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every filter on `clip`: built-ins first, then custom transforms, in declaration order.
    pub fn for_clip(clip: &Clip) -> Self {
        let mut t = Self::new();
        for &f in &clip.filters {
            t = t.then(f);
        }
        for c in &clip.custom_filters {
            t = t.then_custom(c.clone());
        }
        t
    }

    pub fn then(mut self, filter: ColorFilter) -> Self {
        self.steps.push(Step::Builtin(filter));
        self
    }

    pub fn then_custom(mut self, filter: CustomFilter) -> Self {
        self.steps.push(Step::Custom(filter));
        self
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step on each whole pixel of `chunk`. A trailing partial pixel is left alone.
    pub fn apply(&self, chunk: &mut [u8]) {
        if self.steps.is_empty() {
            return;
        }
        for px in chunk.chunks_exact_mut(4) {
            for step in &self.steps {
                match step {
                    Step::Builtin(f) => apply_builtin(*f, px),
                    Step::Custom(c) => c.apply(px),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/filters.rs"]
mod tests;
