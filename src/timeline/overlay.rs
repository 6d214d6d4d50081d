use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::timeline::model::Placement;

/// Nine-point anchor for text placed relative to the canvas edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub dx: i32,
    pub dy: i32,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Border {
    pub width: u32,
    #[serde(default)]
    pub color: Option<String>,
}

/// Filled box drawn behind the text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub color: String,
    #[serde(default = "default_box_opacity")]
    pub opacity: f64,
}

fn default_box_opacity() -> f64 {
    0.5
}

fn default_font_size() -> u32 {
    24
}

fn default_font_color() -> String {
    "white".to_owned()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub text: String,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_font_color")]
    pub font_color: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub shadow: Option<Shadow>,
    #[serde(default)]
    pub border: Option<Border>,
    #[serde(default, rename = "box")]
    pub text_box: Option<TextBox>,
    /// Fade-in length in seconds.
    #[serde(default)]
    pub fade_in: f64,
    #[serde(default)]
    pub fade_out: f64,
    /// When set, the placement's `x`/`y` are ignored in favor of the anchor.
    #[serde(default)]
    pub align: Option<Alignment>,
}

impl TextOverlay {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_family: None,
            font_size: default_font_size(),
            font_color: default_font_color(),
            bold: false,
            italic: false,
            shadow: None,
            border: None,
            text_box: None,
            fade_in: 0.0,
            fade_out: 0.0,
            align: None,
        }
    }

    pub fn font(mut self, family: impl Into<String>, size: u32) -> Self {
        self.font_family = Some(family.into());
        self.font_size = size;
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.font_color = color.into();
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn shadow(mut self, dx: i32, dy: i32, color: impl Into<String>) -> Self {
        self.shadow = Some(Shadow {
            dx,
            dy,
            color: color.into(),
        });
        self
    }

    pub fn border(mut self, width: u32, color: Option<String>) -> Self {
        self.border = Some(Border { width, color });
        self
    }

    pub fn boxed(mut self, color: impl Into<String>, opacity: f64) -> Self {
        self.text_box = Some(TextBox {
            color: color.into(),
            opacity: opacity.clamp(0.0, 1.0),
        });
        self
    }

    pub fn fade(mut self, fade_in: f64, fade_out: f64) -> Self {
        self.fade_in = fade_in.max(0.0);
        self.fade_out = fade_out.max(0.0);
        self
    }

    pub fn align(mut self, align: Alignment) -> Self {
        self.align = Some(align);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageOverlay {
    pub path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorOverlay {
    pub color: String,
}

/// Subtitle container format, inferred from the file extension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleFormat {
    #[default]
    Srt,
    Ass,
    Vtt,
}

impl SubtitleFormat {
    /// Infer from the extension; unknown or missing extensions are treated as SubRip.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("ass") | Some("ssa") => Self::Ass,
            Some("vtt") => Self::Vtt,
            _ => Self::Srt,
        }
    }
}

fn default_encoding() -> String {
    "UTF-8".to_owned()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubtitleOverlay {
    pub path: PathBuf,
    pub format: SubtitleFormat,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub font_size: Option<u32>,
    #[serde(default)]
    pub font_color: Option<String>,
    #[serde(default)]
    pub margin_v: Option<u32>,
    #[serde(default)]
    pub margin_h: Option<u32>,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

impl SubtitleOverlay {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = SubtitleFormat::from_path(&path);
        Self {
            path,
            format,
            font_family: None,
            font_size: None,
            font_color: None,
            margin_v: None,
            margin_h: None,
            encoding: default_encoding(),
        }
    }

    pub fn font(mut self, family: impl Into<String>, size: u32) -> Self {
        self.font_family = Some(family.into());
        self.font_size = Some(size);
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.font_color = Some(color.into());
        self
    }

    pub fn margins(mut self, vertical: u32, horizontal: u32) -> Self {
        self.margin_v = Some(vertical);
        self.margin_h = Some(horizontal);
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// `true` when any style override was set explicitly.
    pub fn has_style(&self) -> bool {
        self.font_family.is_some()
            || self.font_size.is_some()
            || self.font_color.is_some()
            || self.margin_v.is_some()
            || self.margin_h.is_some()
    }
}

/// Per-kind payload of an overlay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayKind {
    Text(TextOverlay),
    Image(ImageOverlay),
    Color(ColorOverlay),
    Subtitle(SubtitleOverlay),
}

impl OverlayKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
            Self::Color(_) => "color",
            Self::Subtitle(_) => "subtitle",
        }
    }
}

/// A layer drawn over the composited clips.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    #[serde(default)]
    pub placement: Placement,
    pub kind: OverlayKind,
}

impl Overlay {
    pub fn new(kind: OverlayKind, placement: Placement) -> Self {
        Self { placement, kind }
    }

    pub fn text(text: TextOverlay, placement: Placement) -> Self {
        Self::new(OverlayKind::Text(text), placement)
    }

    pub fn image(path: impl Into<PathBuf>, placement: Placement) -> Self {
        Self::new(
            OverlayKind::Image(ImageOverlay { path: path.into() }),
            placement,
        )
    }

    pub fn color(color: impl Into<String>, placement: Placement) -> Self {
        Self::new(
            OverlayKind::Color(ColorOverlay {
                color: color.into(),
            }),
            placement,
        )
    }

    pub fn subtitle(subtitle: SubtitleOverlay) -> Self {
        Self::new(OverlayKind::Subtitle(subtitle), Placement::default())
    }

    pub fn is_subtitle(&self) -> bool {
        matches!(self.kind, OverlayKind::Subtitle(_))
    }

    /// Timeline second at which the overlay disappears, bounded by `canvas_end`.
    pub fn end(&self, canvas_end: f64) -> f64 {
        if self.placement.duration > 0.0 {
            self.placement.start + self.placement.duration
        } else {
            canvas_end
        }
    }

    /// Seconds the overlay is visible within a canvas ending at `canvas_end`.
    pub fn visible_duration(&self, canvas_end: f64) -> f64 {
        let d = self.end(canvas_end) - self.placement.start;
        if d > 0.0 { d } else { canvas_end }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/overlay.rs"]
mod tests;
