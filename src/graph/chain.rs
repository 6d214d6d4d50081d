//! Filter chains shared by clips, images, color layers and transformed text.

use crate::animation::linear::{local_time, position_exprs, rotation_expr, scale_expr};
use crate::foundation::core::Size;
use crate::foundation::format::{fmt3, normalize_color};
use crate::graph::node::Filter;
use crate::timeline::model::{Clip, ColorFilter, Placement};

/// Engine equivalent of a built-in pixel filter.
pub fn engine_filter(filter: ColorFilter) -> Filter {
    match filter {
        ColorFilter::Invert => Filter::new("negate"),
        ColorFilter::Grayscale => {
            Filter::with_args("colorchannelmixer", ".3:.4:.3:0:.3:.4:.3:0:.3:.4:.3")
        }
        ColorFilter::Sepia => Filter::with_args(
            "colorchannelmixer",
            ".393:.769:.189:0:.349:.686:.168:0:.272:.534:.131",
        ),
        ColorFilter::Edge => Filter::new("edgedetect"),
    }
}

/// Engine filters for a clip's built-in filters. Custom transforms have no engine
/// equivalent and are skipped with a warning.
pub fn clip_filters(clip: &Clip) -> Vec<Filter> {
    if !clip.custom_filters.is_empty() {
        tracing::warn!(
            count = clip.custom_filters.len(),
            "custom pixel filters only run in the raw-frame pipeline; skipped in graph"
        );
    }
    clip.filters.iter().copied().map(engine_filter).collect()
}

/// Solid color source of the given size and length.
pub fn color_source(color: &str, size: Size, fps: u32, duration: f64) -> Filter {
    Filter::with_args(
        "color",
        format!(
            "c={}:s={}x{}:r={}:d={}",
            normalize_color(color),
            size.width,
            size.height,
            fps,
            fmt3(duration)
        ),
    )
}

/// `trim` for a subclip window, resetting local time to zero.
pub fn trim(start: f64, end: f64) -> Filter {
    Filter::with_args(
        "trim",
        format!("start={}:end={}", fmt3(start), fmt3(end)),
    )
}

/// Reset timestamps to zero, optionally shifting the stream to start at `offset` seconds.
pub fn setpts(offset: f64) -> Filter {
    if offset > 0.0 {
        Filter::with_args("setpts", format!("PTS-STARTPTS+{}/TB", fmt3(offset)))
    } else {
        Filter::with_args("setpts", "PTS-STARTPTS")
    }
}

pub fn rgba() -> Filter {
    Filter::with_args("format", "rgba")
}

fn scale_dim(v: u32) -> String {
    if v == 0 { "-2".to_owned() } else { v.to_string() }
}

pub fn scale_to(size: Size) -> Filter {
    Filter::with_args(
        "scale",
        format!("{}:{}", scale_dim(size.width), scale_dim(size.height)),
    )
}

/// Per-frame scale by a factor expression.
pub fn scale_by(expr: &str) -> Filter {
    Filter::with_args(
        "scale",
        format!("w='trunc(iw*{expr})':h='trunc(ih*{expr})':eval=frame"),
    )
}

/// Per-frame rotation by an angle expression (radians). The output frame grows to the
/// content's diagonal so no corner is clipped.
pub fn rotate_by(expr: &str) -> Filter {
    Filter::with_args(
        "rotate",
        format!("'{expr}':fillcolor=none:ow='hypot(iw,ih)':oh='ow'"),
    )
}

/// Scale override, scale/rotation animations and opacity for one layer, in that order.
///
/// Animation times are local to `placement.start`.
pub fn transform_filters(placement: &Placement, static_size: Option<Size>) -> Vec<Filter> {
    transforms(placement, static_size, false)
}

/// [`transform_filters`] for a stream already converted to `rgba`.
pub fn rgba_transform_filters(placement: &Placement, static_size: Option<Size>) -> Vec<Filter> {
    transforms(placement, static_size, true)
}

fn transforms(placement: &Placement, static_size: Option<Size>, mut has_alpha: bool) -> Vec<Filter> {
    let tvar = local_time(placement.start);
    let mut out = Vec::new();
    if let Some(size) = static_size {
        out.push(scale_to(size));
    }
    if let Some(s) = &placement.animations.scale {
        out.push(scale_by(&scale_expr(s, &tvar)));
    }
    if let Some(r) = &placement.animations.rotation {
        out.push(rgba());
        has_alpha = true;
        out.push(rotate_by(&rotation_expr(r, &tvar)));
    }
    let opacity = placement.opacity();
    if opacity < 1.0 {
        if !has_alpha {
            out.push(rgba());
        }
        out.push(Filter::with_args(
            "colorchannelmixer",
            format!("aa={}", fmt3(opacity)),
        ));
    }
    out
}

/// Static size override for a layer, if any axis is overridden.
pub fn size_override(placement: &Placement, natural: Size) -> Option<Size> {
    if placement.width == 0 && placement.height == 0 {
        return None;
    }
    Some(Size::new(
        if placement.width > 0 {
            placement.width
        } else {
            natural.width
        },
        if placement.height > 0 {
            placement.height
        } else {
            natural.height
        },
    ))
}

/// `x=..:y=..` for a top-left anchored overlay.
pub fn overlay_position(placement: &Placement, canvas: Size) -> String {
    match &placement.animations.position {
        Some(anim) => {
            let (x, y) = position_exprs(anim, &local_time(placement.start));
            format!("x='{x}':y='{y}'")
        }
        None => format!(
            "x={}:y={}",
            placement.x.resolve(canvas.width),
            placement.y.resolve(canvas.height)
        ),
    }
}

/// `x=..:y=..` for an overlay whose stated position is the center of the overlaid frame.
pub fn centered_position(placement: &Placement, canvas: Size) -> String {
    match &placement.animations.position {
        Some(anim) => {
            let (x, y) = position_exprs(anim, &local_time(placement.start));
            format!("x='{x}-w/2':y='{y}-h/2'")
        }
        None => format!(
            "x={}-w/2:y={}-h/2",
            placement.x.resolve(canvas.width),
            placement.y.resolve(canvas.height)
        ),
    }
}

/// Visibility predicate for the window `[start, end)`.
pub fn enable_between(start: f64, end: f64) -> String {
    format!("enable='between(t,{},{})'", fmt3(start), fmt3(end))
}

/// `overlay` filter with an optional visibility window.
pub fn overlay(position: String, window: Option<(f64, f64)>) -> Filter {
    match window {
        Some((start, end)) => Filter::with_args(
            "overlay",
            format!("{position}:{}", enable_between(start, end)),
        ),
        None => Filter::with_args("overlay", position),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/chain.rs"]
mod tests;
