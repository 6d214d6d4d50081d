use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Coord, Size};
use crate::foundation::error::{MontageError, MontageResult};
use crate::timeline::overlay::Overlay;

/// Where a clip's pixels come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    /// A media file read by the engine.
    File(PathBuf),
    /// A generated solid color (`"black"`, `"#ff0000"`, `"red@0.5"`).
    Color(String),
}

impl MediaSource {
    /// File path for file-backed sources.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(p) => Some(p.as_path()),
            Self::Color(_) => None,
        }
    }

    /// `false` when the source cannot possibly be resolved (empty path or color).
    pub fn is_specified(&self) -> bool {
        match self {
            Self::File(p) => !p.as_os_str().is_empty(),
            Self::Color(c) => !c.trim().is_empty(),
        }
    }
}

/// Audio stream metadata attached to a clip.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    pub codec: String,
    #[serde(default)]
    pub sample_rate: u32,
    #[serde(default)]
    pub channels: u16,
    #[serde(default)]
    pub bit_rate: u64,
    #[serde(default)]
    pub duration: f64,
}

/// Subclip window `[start, end)` in source seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trim {
    start: f64,
    end: f64,
}

impl Trim {
    /// Create a window, requiring `0 <= start < end`.
    pub fn new(start: f64, end: f64) -> MontageResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(MontageError::configuration("trim bounds must be finite"));
        }
        if start < 0.0 {
            return Err(MontageError::configuration(format!(
                "trim start must be >= 0, got {start}"
            )));
        }
        if start >= end {
            return Err(MontageError::configuration(format!(
                "trim start ({start}) must be before end ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(self) -> f64 {
        self.start
    }

    pub fn end(self) -> f64 {
        self.end
    }

    pub fn len(self) -> f64 {
        self.end - self.start
    }
}

/// Built-in per-pixel color filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFilter {
    Invert,
    Grayscale,
    Sepia,
    Edge,
}

/// Signature of a caller-supplied per-pixel transform. The slice is one RGBA pixel.
pub type PixelFn = dyn Fn(&mut [u8]) + Send + Sync;

/// A named caller-supplied pixel transform. Only the raw-frame pipeline can run these.
#[derive(Clone)]
pub struct CustomFilter {
    name: String,
    f: Arc<PixelFn>,
}

impl CustomFilter {
    pub fn new(name: impl Into<String>, f: impl Fn(&mut [u8]) + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply to one 4-byte RGBA pixel.
    #[inline]
    pub fn apply(&self, px: &mut [u8]) {
        (self.f)(px)
    }
}

impl std::fmt::Debug for CustomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A media source plus the metadata the compiler needs about it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clip {
    pub source: MediaSource,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Frames per second; `0` means unknown.
    #[serde(default)]
    pub fps: u32,
    /// Full source duration in seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub trim: Option<Trim>,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub pixel_format: Option<String>,
    #[serde(default)]
    pub bit_rate: Option<u64>,
    #[serde(default)]
    pub audio: Option<AudioInfo>,
    #[serde(default)]
    pub filters: Vec<ColorFilter>,
    #[serde(skip)]
    pub custom_filters: Vec<CustomFilter>,
}

impl Clip {
    fn with_source(source: MediaSource) -> Self {
        Self {
            source,
            width: 0,
            height: 0,
            fps: 0,
            duration: 0.0,
            trim: None,
            codec: None,
            pixel_format: None,
            bit_rate: None,
            audio: None,
            filters: Vec::new(),
            custom_filters: Vec::new(),
        }
    }

    /// A file clip without probed metadata. Fill in dimensions and duration with the
    /// `with_*` setters, or use [`Clip::open`] to probe the file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_source(MediaSource::File(path.into()))
    }

    /// A generated solid-color clip.
    pub fn color(color: impl Into<String>, width: u32, height: u32, duration: f64) -> Self {
        let mut clip = Self::with_source(MediaSource::Color(color.into()));
        clip.width = width;
        clip.height = height;
        clip.duration = duration.max(0.0);
        clip
    }

    /// Probe `path` with the media engine and build a clip from the result.
    pub fn open(path: impl AsRef<Path>) -> MontageResult<Self> {
        let path = path.as_ref();
        let info = crate::engine::probe::probe(path)?;
        info.into_clip(path)
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration.max(0.0);
        self
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }

    pub fn with_audio(mut self, audio: AudioInfo) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_filter(mut self, filter: ColorFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_custom_filter(mut self, filter: CustomFilter) -> Self {
        self.custom_filters.push(filter);
        self
    }

    /// Restrict playback to `[start, end)` seconds of the current window.
    ///
    /// `start` is clamped to 0 and `end` to the playable duration. Subclipping a subclip
    /// is relative to the existing window.
    pub fn subclip(&self, start: f64, end: f64) -> MontageResult<Self> {
        let start = start.max(0.0);
        let end = end.min(self.play_duration());
        let offset = self.trim.map(Trim::start).unwrap_or(0.0);
        let trim = Trim::new(offset + start, offset + end)?;
        let mut out = self.clone();
        out.trim = Some(trim);
        Ok(out)
    }

    /// Seconds of this clip that actually play (trim window or full duration).
    pub fn play_duration(&self) -> f64 {
        match self.trim {
            Some(t) => t.len(),
            None => self.duration,
        }
    }

    /// Expected frame count for the playable window.
    pub fn frame_count(&self) -> u64 {
        (f64::from(self.fps) * self.play_duration()).round().max(0.0) as u64
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn has_audio(&self) -> bool {
        self.audio.as_ref().is_some_and(|a| !a.codec.is_empty())
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty() || !self.custom_filters.is_empty()
    }

    /// `true` when the clip can be handed to the engine at all.
    pub fn is_resolvable(&self) -> bool {
        self.source.is_specified()
    }

    /// Check that a file-backed source exists and is readable.
    pub fn verify_source(&self) -> MontageResult<()> {
        let Some(path) = self.source.path() else {
            return Ok(());
        };
        std::fs::File::open(path).map_err(|e| {
            MontageError::resource(format!("cannot read '{}': {e}", path.display()))
        })?;
        Ok(())
    }
}

/// Linear position ramp. Times are local to the owning layer's start.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionAnim {
    pub from_x: f64,
    pub from_y: f64,
    pub to_x: f64,
    pub to_y: f64,
    pub start: f64,
    pub duration: f64,
}

/// Linear rotation ramp in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotationAnim {
    pub from_deg: f64,
    pub to_deg: f64,
    pub start: f64,
    pub duration: f64,
}

/// Linear uniform scale ramp (`1.0` = natural size).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleAnim {
    pub from: f64,
    pub to: f64,
    pub start: f64,
    pub duration: f64,
}

/// One animation to attach to a layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationParams {
    Position(PositionAnim),
    Rotation(RotationAnim),
    Scale(ScaleAnim),
}

/// The animations attached to a layer, at most one per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Animations {
    #[serde(default)]
    pub position: Option<PositionAnim>,
    #[serde(default)]
    pub rotation: Option<RotationAnim>,
    #[serde(default)]
    pub scale: Option<ScaleAnim>,
}

impl Animations {
    /// Attach `params`, replacing any previous animation of the same kind.
    pub fn set(&mut self, params: AnimationParams) {
        match params {
            AnimationParams::Position(p) => self.position = Some(p),
            AnimationParams::Rotation(r) => self.rotation = Some(r),
            AnimationParams::Scale(s) => self.scale = Some(s),
        }
    }

    /// `true` when the layer needs a geometric transform (rotate or scale over time).
    pub fn transforms(&self) -> bool {
        self.rotation.is_some() || self.scale.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && !self.transforms()
    }
}

fn default_opacity() -> f64 {
    1.0
}

/// Canvas placement shared by composite items and every overlay kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(default)]
    pub x: Coord,
    #[serde(default)]
    pub y: Coord,
    /// Size override; `0` inherits the source size on that axis.
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Timeline second at which the layer appears.
    #[serde(default)]
    pub start: f64,
    /// Display duration; `0` means the source's natural end (or the canvas end).
    #[serde(default)]
    pub duration: f64,
    #[serde(default = "default_opacity")]
    opacity: f64,
    #[serde(default)]
    pub layer: i32,
    #[serde(default)]
    pub animations: Animations,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            x: Coord::default(),
            y: Coord::default(),
            width: 0,
            height: 0,
            start: 0.0,
            duration: 0.0,
            opacity: 1.0,
            layer: 0,
            animations: Animations::default(),
        }
    }
}

impl Placement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, x: impl Into<Coord>, y: impl Into<Coord>) -> Self {
        self.x = x.into();
        self.y = y.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn start_at(mut self, start: f64) -> Self {
        self.start = start.max(0.0);
        self
    }

    pub fn lasting(mut self, duration: f64) -> Self {
        self.duration = duration.max(0.0);
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.set_opacity(opacity);
        self
    }

    pub fn on_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn animate(mut self, params: AnimationParams) -> Self {
        self.animations.set(params);
        self
    }

    /// Set opacity, clamped to `[0, 1]`. NaN becomes fully opaque.
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = clamp_opacity(opacity);
    }

    pub fn opacity(&self) -> f64 {
        clamp_opacity(self.opacity)
    }

    /// Display duration given the source's natural length.
    pub fn effective_duration(&self, natural: f64) -> f64 {
        if self.duration > 0.0 {
            self.duration
        } else {
            natural.max(0.0)
        }
    }

    /// `true` when the layer is only shown for part of the timeline.
    pub fn is_gated(&self) -> bool {
        self.start > 0.0 || self.duration > 0.0
    }
}

fn clamp_opacity(v: f64) -> f64 {
    if v.is_nan() { 1.0 } else { v.clamp(0.0, 1.0) }
}

/// A clip placed on the canvas.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompositeItem {
    pub clip: Clip,
    #[serde(default)]
    pub placement: Placement,
}

impl CompositeItem {
    pub fn new(clip: Clip, placement: Placement) -> Self {
        Self { clip, placement }
    }

    /// Seconds this item stays visible.
    pub fn display_duration(&self) -> f64 {
        self.placement
            .effective_duration(self.clip.play_duration())
    }

    /// Timeline second at which this item disappears.
    pub fn end(&self) -> f64 {
        self.placement.start + self.display_duration()
    }

    /// Size on the canvas, after overrides. A single-axis override inherits the other axis.
    pub fn display_size(&self) -> Size {
        let w = if self.placement.width > 0 {
            self.placement.width
        } else {
            self.clip.width
        };
        let h = if self.placement.height > 0 {
            self.placement.height
        } else {
            self.clip.height
        };
        Size::new(w, h)
    }
}

/// Spatial composition: a canvas, layered clips and overlays.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Composite {
    /// Canvas width; `0` computes it from the items.
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Output frame rate; `0` takes the first item's rate.
    #[serde(default)]
    pub fps: u32,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub items: Vec<CompositeItem>,
    /// All overlays in declaration order.
    #[serde(default)]
    pub overlays: Vec<Overlay>,
}

impl Composite {
    /// Latest end time over all items.
    pub fn duration(&self) -> f64 {
        self.items
            .iter()
            .filter(|i| i.clip.is_resolvable())
            .map(CompositeItem::end)
            .fold(0.0, f64::max)
    }

    /// Canvas size: explicit when set, otherwise the bounding extent of all items.
    pub fn canvas(&self) -> Size {
        if self.width > 0 && self.height > 0 {
            return Size::new(self.width, self.height);
        }
        let mut w = 0i64;
        let mut h = 0i64;
        for item in self.items.iter().filter(|i| i.clip.is_resolvable()) {
            let size = item.display_size();
            w = w.max(item.placement.x.resolve(self.width) + i64::from(size.width));
            h = h.max(item.placement.y.resolve(self.height) + i64::from(size.height));
        }
        Size::new(
            if self.width > 0 { self.width } else { clamp_u32(w) },
            if self.height > 0 { self.height } else { clamp_u32(h) },
        )
    }

    /// Frame rate: explicit, else the first item with a known rate, else `fallback`.
    pub fn frame_rate(&self, fallback: u32) -> u32 {
        if self.fps > 0 {
            return self.fps;
        }
        self.items
            .iter()
            .map(|i| i.clip.fps)
            .find(|&f| f > 0)
            .unwrap_or(fallback)
    }

    pub fn background_color(&self) -> &str {
        self.background.as_deref().unwrap_or("black")
    }
}

fn clamp_u32(v: i64) -> u32 {
    v.clamp(0, i64::from(u32::MAX)) as u32
}

/// A lazy sequential join of clips. Never nested: nested joins are flattened on construction.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Concatenation {
    pub clips: Vec<Clip>,
    /// Sum of member play durations.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub fps: u32,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub pixel_format: Option<String>,
    #[serde(default)]
    pub bit_rate: Option<u64>,
    /// `true` when any member carries audio.
    #[serde(default)]
    pub has_audio: bool,
}

/// Root of a composition description.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Timeline {
    Composite(Composite),
    Concat(Concatenation),
}

impl Timeline {
    /// Parse a JSON timeline description.
    pub fn from_json_str(s: &str) -> MontageResult<Self> {
        serde_json::from_str(s).map_err(|e| MontageError::serde(e.to_string()))
    }

    /// Read and parse a JSON timeline description from disk.
    pub fn from_path(path: impl AsRef<Path>) -> MontageResult<Self> {
        use anyhow::Context as _;
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read timeline '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> MontageResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| MontageError::serde(e.to_string()))
    }

    pub fn duration(&self) -> f64 {
        match self {
            Self::Composite(c) => c.duration(),
            Self::Concat(c) => c.duration,
        }
    }

    pub fn canvas(&self) -> Size {
        match self {
            Self::Composite(c) => c.canvas(),
            Self::Concat(c) => Size::new(c.width, c.height),
        }
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            Self::Composite(c) => Some(c),
            Self::Concat(_) => None,
        }
    }

    pub fn as_concat(&self) -> Option<&Concatenation> {
        match self {
            Self::Concat(c) => Some(c),
            Self::Composite(_) => None,
        }
    }
}

impl From<Composite> for Timeline {
    fn from(c: Composite) -> Self {
        Self::Composite(c)
    }
}

impl From<Concatenation> for Timeline {
    fn from(c: Concatenation) -> Self {
        Self::Concat(c)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/model.rs"]
mod tests;
