use crate::foundation::error::{MontageError, MontageResult};
use crate::timeline::model::{Clip, Composite, CompositeItem, Placement, Timeline};
use crate::timeline::overlay::{Overlay, SubtitleOverlay, TextOverlay};

/// Builder for composite [`Timeline`]s.
///
/// Setters consume and return the builder; [`TimelineBuilder::build`] validates and yields an
/// immutable timeline.
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    comp: Composite,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the canvas size. Without this the canvas grows to fit every item.
    pub fn canvas(mut self, width: u32, height: u32) -> Self {
        self.comp.width = width;
        self.comp.height = height;
        self
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.comp.fps = fps;
        self
    }

    pub fn background(mut self, color: impl Into<String>) -> Self {
        self.comp.background = Some(color.into());
        self
    }

    pub fn item(mut self, item: CompositeItem) -> Self {
        self.comp.items.push(item);
        self
    }

    /// Place `clip` on the canvas.
    pub fn clip(self, clip: Clip, placement: Placement) -> Self {
        self.item(CompositeItem::new(clip, placement))
    }

    pub fn overlay(mut self, overlay: Overlay) -> Self {
        self.comp.overlays.push(overlay);
        self
    }

    pub fn text(self, text: TextOverlay, placement: Placement) -> Self {
        self.overlay(Overlay::text(text, placement))
    }

    pub fn image(self, path: impl Into<std::path::PathBuf>, placement: Placement) -> Self {
        self.overlay(Overlay::image(path, placement))
    }

    pub fn color(self, color: impl Into<String>, placement: Placement) -> Self {
        self.overlay(Overlay::color(color, placement))
    }

    pub fn subtitle(self, subtitle: SubtitleOverlay) -> Self {
        self.overlay(Overlay::subtitle(subtitle))
    }

    /// Validate and build the timeline.
    pub fn build(self) -> MontageResult<Timeline> {
        validate_composite(&self.comp)?;
        Ok(Timeline::Composite(self.comp))
    }
}

/// Structural checks that do not touch the filesystem.
pub(crate) fn validate_composite(comp: &Composite) -> MontageResult<()> {
    if (comp.width == 0) != (comp.height == 0) {
        return Err(MontageError::configuration(
            "canvas width and height must both be set or both be 0",
        ));
    }
    for (i, item) in comp.items.iter().enumerate() {
        validate_placement(&item.placement).map_err(|e| {
            MontageError::configuration(format!("item {i}: {e}"))
        })?;
        if !item.clip.duration.is_finite() || item.clip.duration < 0.0 {
            return Err(MontageError::configuration(format!(
                "item {i}: clip duration must be a non-negative number"
            )));
        }
    }
    for (i, overlay) in comp.overlays.iter().enumerate() {
        validate_placement(&overlay.placement).map_err(|e| {
            MontageError::configuration(format!("{} overlay {i}: {e}", overlay.kind.name()))
        })?;
    }
    Ok(())
}

fn validate_placement(p: &Placement) -> Result<(), String> {
    if !p.start.is_finite() || p.start < 0.0 {
        return Err(format!("start must be >= 0, got {}", p.start));
    }
    if !p.duration.is_finite() || p.duration < 0.0 {
        return Err(format!("duration must be >= 0, got {}", p.duration));
    }
    let anims = &p.animations;
    let windows = [
        anims.position.map(|a| (a.start, a.duration)),
        anims.rotation.map(|a| (a.start, a.duration)),
        anims.scale.map(|a| (a.start, a.duration)),
    ];
    for (start, duration) in windows.into_iter().flatten() {
        if !start.is_finite() || !duration.is_finite() {
            return Err("animation window must be finite".to_owned());
        }
    }
    if let Some(s) = anims.scale
        && (s.from <= 0.0 || s.to <= 0.0)
    {
        return Err("scale factors must be > 0".to_owned());
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/builder.rs"]
mod tests;
