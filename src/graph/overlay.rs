//! Node construction for text, image, color and subtitle overlays.

use std::path::{Path, PathBuf};

use crate::animation::linear::{fade_alpha, local_time, position_exprs};
use crate::foundation::core::Size;
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::format::{
    ass_color, escape_filter_path, escape_font_path, escape_text, fmt2, normalize_color,
};
use crate::graph::chain::{
    centered_position, color_source, overlay, overlay_position, rgba, rgba_transform_filters,
    setpts, size_override,
};
use crate::graph::node::{Filter, InputTable, NodeDecl};
use crate::timeline::model::Placement;
use crate::timeline::overlay::{
    Alignment, ColorOverlay, ImageOverlay, Overlay, OverlayKind, SubtitleFormat, SubtitleOverlay,
    TextOverlay,
};

/// Canvas facts every overlay needs.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Canvas {
    pub(crate) size: Size,
    pub(crate) fps: u32,
    pub(crate) duration: f64,
    pub(crate) verify_sources: bool,
}

/// Build the nodes that draw `ov` over `input`, producing `output`.
///
/// `key` makes intermediate labels unique. Missing files yield a recoverable
/// [`MontageError::Resource`].
pub(crate) fn overlay_nodes(
    ov: &Overlay,
    key: usize,
    input: &str,
    output: &str,
    canvas: &Canvas,
    inputs: &mut InputTable,
) -> MontageResult<Vec<NodeDecl>> {
    match &ov.kind {
        OverlayKind::Text(text) if ov.placement.animations.transforms() => Ok(
            transformed_text_nodes(text, &ov.placement, key, input, output, canvas),
        ),
        OverlayKind::Text(text) => Ok(vec![
            NodeDecl::new()
                .input(input)
                .filter(drawtext(text, &ov.placement, canvas))
                .output(output),
        ]),
        OverlayKind::Image(image) => image_nodes(image, ov, key, input, output, canvas, inputs),
        OverlayKind::Color(color) => Ok(color_nodes(color, ov, key, input, output, canvas)),
        OverlayKind::Subtitle(sub) => Ok(vec![
            NodeDecl::new()
                .input(input)
                .filter(subtitle_filter(sub, canvas.verify_sources)?)
                .output(output),
        ]),
    }
}

fn window(ov: &Overlay, canvas: &Canvas) -> Option<(f64, f64)> {
    ov.placement
        .is_gated()
        .then(|| (ov.placement.start, ov.end(canvas.duration)))
}

/// Position expressions for an anchored text (top-left of the text box).
pub(crate) fn alignment_position(align: Alignment) -> (&'static str, &'static str) {
    match align {
        Alignment::TopLeft => ("10", "10"),
        Alignment::TopCenter => ("(w-text_w)/2", "10"),
        Alignment::TopRight => ("(w-text_w-10)", "10"),
        Alignment::CenterLeft => ("10", "(h-text_h)/2"),
        Alignment::Center => ("(w-text_w)/2", "(h-text_h)/2"),
        Alignment::CenterRight => ("(w-text_w-10)", "(h-text_h)/2"),
        Alignment::BottomLeft => ("10", "(h-text_h-10)"),
        Alignment::BottomCenter => ("(w-text_w)/2", "(h-text_h-10)"),
        Alignment::BottomRight => ("(w-text_w-10)", "(h-text_h-10)"),
    }
}

/// Target center of an anchored text when it is drawn on its own canvas.
pub(crate) fn alignment_center(align: Alignment) -> (&'static str, &'static str) {
    let x = match align {
        Alignment::TopLeft | Alignment::CenterLeft | Alignment::BottomLeft => "w/4",
        Alignment::TopCenter | Alignment::Center | Alignment::BottomCenter => "w/2",
        Alignment::TopRight | Alignment::CenterRight | Alignment::BottomRight => "3*w/4",
    };
    let y = match align {
        Alignment::TopLeft | Alignment::TopCenter | Alignment::TopRight => "h/8",
        Alignment::CenterLeft | Alignment::Center | Alignment::CenterRight => "h/2",
        Alignment::BottomLeft | Alignment::BottomCenter | Alignment::BottomRight => "7*h/8",
    };
    (x, y)
}

/// How `drawtext` should find its font.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum FontRef {
    File(PathBuf),
    /// Resolved by fontconfig at render time.
    Family(String),
}

const FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype",
    "/usr/share/fonts/TTF",
    "/usr/share/fonts",
    "/usr/local/share/fonts",
    "/Library/Fonts",
    "/System/Library/Fonts",
    "C:/Windows/Fonts",
];

/// Look for a font file for `family`, trying the styled variant before the plain one.
pub(crate) fn resolve_font(family: &str, bold: bool, italic: bool) -> FontRef {
    resolve_font_in(FONT_DIRS.iter().map(|d| Path::new(*d)), family, bold, italic)
}

pub(crate) fn resolve_font_in<'a>(
    dirs: impl Iterator<Item = &'a Path> + Clone,
    family: &str,
    bold: bool,
    italic: bool,
) -> FontRef {
    let style = match (bold, italic) {
        (true, true) => Some("-BoldItalic"),
        (true, false) => Some("-Bold"),
        (false, true) => Some("-Italic"),
        (false, false) => None,
    };
    let mut stems = Vec::with_capacity(4);
    if let Some(style) = style {
        stems.push(format!("{family}{style}"));
    }
    stems.push(family.to_owned());
    stems.push(family.to_lowercase());
    for stem in &stems {
        for dir in dirs.clone() {
            for ext in ["ttf", "otf"] {
                let candidate = dir.join(format!("{stem}.{ext}"));
                if candidate.is_file() {
                    return FontRef::File(candidate);
                }
            }
        }
    }
    FontRef::Family(family.to_owned())
}

/// Font, color and decoration options shared by both text paths.
fn text_style_parts(text: &TextOverlay, parts: &mut Vec<String>) {
    if let Some(family) = &text.font_family {
        match resolve_font(family, text.bold, text.italic) {
            FontRef::File(path) => parts.push(format!(
                "fontfile={}",
                escape_font_path(&path.to_string_lossy().replace('\\', "/"))
            )),
            FontRef::Family(name) => parts.push(format!("font='{}'", escape_text(&name))),
        }
    }
    parts.push(format!("fontsize={}", text.font_size));
    parts.push(format!("fontcolor={}", normalize_color(&text.font_color)));
    if let Some(shadow) = &text.shadow {
        parts.push(format!("shadowx={}", shadow.dx));
        parts.push(format!("shadowy={}", shadow.dy));
        parts.push(format!("shadowcolor={}", normalize_color(&shadow.color)));
    }
    if let Some(border) = text.border.as_ref().filter(|b| b.width > 0) {
        parts.push(format!("borderw={}", border.width));
        if let Some(c) = &border.color {
            parts.push(format!("bordercolor={}", normalize_color(c)));
        }
    }
    if let Some(b) = &text.text_box {
        parts.push("box=1".to_owned());
        parts.push(format!(
            "boxcolor={}@{}",
            normalize_color(&b.color),
            fmt2(b.opacity)
        ));
        parts.push("boxborderw=5".to_owned());
    }
}

/// `drawtext` drawing directly onto the composite.
pub(crate) fn drawtext(text: &TextOverlay, placement: &Placement, canvas: &Canvas) -> Filter {
    let mut parts = vec![format!("text='{}'", escape_text(&text.text))];
    if let Some(anim) = &placement.animations.position {
        let (x, y) = position_exprs(anim, &local_time(placement.start));
        parts.push(format!("x='{x}'"));
        parts.push(format!("y='{y}'"));
    } else if let Some(align) = text.align {
        let (x, y) = alignment_position(align);
        parts.push(format!("x={x}"));
        parts.push(format!("y={y}"));
    } else {
        parts.push(format!("x={}", placement.x.resolve(canvas.size.width)));
        parts.push(format!("y={}", placement.y.resolve(canvas.size.height)));
    }
    text_style_parts(text, &mut parts);

    let end = if placement.duration > 0.0 {
        placement.start + placement.duration
    } else {
        canvas.duration
    };
    if placement.is_gated() {
        parts.push(crate::graph::chain::enable_between(placement.start, end));
    }
    if text.fade_in > 0.0 || text.fade_out > 0.0 {
        parts.push(format!(
            "alpha='{}'",
            fade_alpha(placement.start, end, text.fade_in, text.fade_out)
        ));
    }
    Filter::with_args("drawtext", parts.join(":"))
}

/// Rotated or scaled text: draw centered on a transparent canvas that lives for the
/// overlay's duration, transform it, then overlay it so the stated position is the center.
fn transformed_text_nodes(
    text: &TextOverlay,
    placement: &Placement,
    key: usize,
    input: &str,
    output: &str,
    canvas: &Canvas,
) -> Vec<NodeDecl> {
    let start = placement.start;
    let visible = if placement.duration > 0.0 {
        placement.duration
    } else if canvas.duration - start > 0.0 {
        canvas.duration - start
    } else {
        canvas.duration
    };
    let base = format!("tcanvas{key}");
    let drawn = format!("text{key}");

    let mut parts = vec![
        format!("text='{}'", escape_text(&text.text)),
        "x=(w-text_w)/2".to_owned(),
        "y=(h-text_h)/2".to_owned(),
    ];
    text_style_parts(text, &mut parts);
    if text.fade_in > 0.0 || text.fade_out > 0.0 {
        // The canvas starts at local time zero, before the shift below.
        parts.push(format!(
            "alpha='{}'",
            fade_alpha(0.0, visible, text.fade_in, text.fade_out)
        ));
    }

    let canvas_node = NodeDecl::new()
        .filter(color_source("black@0", canvas.size, canvas.fps, visible))
        .filter(rgba())
        .output(base.clone());
    let text_node = NodeDecl::new()
        .input(base)
        .filter(Filter::with_args("drawtext", parts.join(":")))
        .filter(setpts(start))
        .filters(rgba_transform_filters(placement, None))
        .filter(rgba())
        .output(drawn.clone());

    let position = match (&placement.animations.position, text.align) {
        (None, Some(align)) => {
            let (cx, cy) = alignment_center(align);
            format!("x={cx}-w/2:y={cy}-h/2")
        }
        _ => centered_position(placement, canvas.size),
    };
    let overlay_node = NodeDecl::new()
        .input(input)
        .input(drawn)
        .filter(overlay(position, Some((start, start + visible))))
        .output(output);

    vec![canvas_node, text_node, overlay_node]
}

fn image_nodes(
    image: &ImageOverlay,
    ov: &Overlay,
    key: usize,
    input: &str,
    output: &str,
    canvas: &Canvas,
    inputs: &mut InputTable,
) -> MontageResult<Vec<NodeDecl>> {
    if image.path.as_os_str().is_empty() {
        return Err(MontageError::resource("image overlay has no path"));
    }
    let natural = if canvas.verify_sources {
        let (w, h) = image::image_dimensions(&image.path).map_err(|e| {
            MontageError::resource(format!(
                "cannot read image '{}': {e}",
                image.path.display()
            ))
        })?;
        Size::new(w, h)
    } else {
        Size::default()
    };
    let idx = inputs.looped_image(&image.path, canvas.duration);
    let label = format!("img{key}");
    let chain = NodeDecl::new()
        .input(format!("{idx}:v"))
        .filter(rgba())
        .filters(rgba_transform_filters(
            &ov.placement,
            size_override(&ov.placement, natural),
        ))
        .output(label.clone());
    let node = NodeDecl::new()
        .input(input)
        .input(label)
        .filter(overlay(
            overlay_position(&ov.placement, canvas.size),
            window(ov, canvas),
        ))
        .output(output);
    Ok(vec![chain, node])
}

fn color_nodes(
    color: &ColorOverlay,
    ov: &Overlay,
    key: usize,
    input: &str,
    output: &str,
    canvas: &Canvas,
) -> Vec<NodeDecl> {
    let size = size_override(&ov.placement, canvas.size).unwrap_or(canvas.size);
    let label = format!("col{key}");
    let chain = NodeDecl::new()
        .filter(color_source(&color.color, size, canvas.fps, canvas.duration))
        .filter(rgba())
        .filters(rgba_transform_filters(&ov.placement, None))
        .output(label.clone());
    let node = NodeDecl::new()
        .input(input)
        .input(label)
        .filter(overlay(
            overlay_position(&ov.placement, canvas.size),
            window(ov, canvas),
        ))
        .output(output);
    vec![chain, node]
}

/// `ass` or `subtitles` filter burning in an external subtitle file.
pub(crate) fn subtitle_filter(sub: &SubtitleOverlay, verify: bool) -> MontageResult<Filter> {
    if sub.path.as_os_str().is_empty() || (verify && !sub.path.is_file()) {
        return Err(MontageError::resource(format!(
            "subtitle file not found: {}",
            sub.path.display()
        )));
    }
    let path = escape_filter_path(&sub.path);
    if sub.format == SubtitleFormat::Ass {
        return Ok(Filter::with_args("ass", path));
    }

    let mut args = vec![format!("filename={path}")];
    if sub.has_style() {
        let mut style = Vec::new();
        if let Some(f) = &sub.font_family {
            style.push(format!("FontName={f}"));
        }
        if let Some(s) = sub.font_size {
            style.push(format!("FontSize={s}"));
        }
        if let Some(c) = &sub.font_color {
            style.push(format!("PrimaryColour={}", ass_color(c)));
        }
        if let Some(v) = sub.margin_v {
            style.push(format!("MarginV={v}"));
        }
        if let Some(h) = sub.margin_h {
            style.push(format!("MarginL={h}"));
            style.push(format!("MarginR={h}"));
        }
        args.push(format!("force_style='{}'", style.join(",")));
    }
    if !sub.encoding.is_empty() {
        args.push(format!("charenc={}", sub.encoding));
    }
    Ok(Filter::with_args("subtitles", args.join(":")))
}

#[cfg(test)]
#[path = "../../tests/unit/graph/overlay.rs"]
mod tests;
