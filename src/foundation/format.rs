//! Number and string formatting for filter-graph text.
//!
//! Filter expressions are parsed by the media engine, so every float goes through a fixed
//! precision formatter and every user string is escaped before it is embedded.

use std::path::Path;

/// Format `v` with exactly three decimals. Negative zero prints as `0.000`.
pub fn fmt3(v: f64) -> String {
    let s = format!("{v:.3}");
    if s == "-0.000" { "0.000".to_owned() } else { s }
}

/// Format `v` with exactly two decimals (opacities in color specs).
pub fn fmt2(v: f64) -> String {
    let s = format!("{v:.2}");
    if s == "-0.00" { "0.00".to_owned() } else { s }
}

/// Escape text for embedding inside a quoted `drawtext` value.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '\\' | '\'' | ':' | '%' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Convert `#rrggbb` style colors to the engine's `0xrrggbb` form. Named colors pass through.
pub fn normalize_color(color: &str) -> String {
    match color.strip_prefix('#') {
        Some(hex) => format!("0x{hex}"),
        None => color.to_owned(),
    }
}

/// Path as it must appear as a filter option value (`subtitles=filename=...`).
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").replace(':', "\\:")
}

/// Font file path for `drawtext=fontfile=`. Colons are escaped twice because the value passes
/// through both the graph parser and the option parser.
pub fn escape_font_path(path: &str) -> String {
    path.replace(':', "\\\\:")
}

/// Color in the `&HAABBGGRR` form used by ASS style overrides.
///
/// Accepts `#rrggbb`, `0xrrggbb` and a handful of common names. Anything else is passed
/// through untouched.
pub fn ass_color(color: &str) -> String {
    let hex = match color.to_ascii_lowercase().as_str() {
        "white" => "ffffff".to_owned(),
        "black" => "000000".to_owned(),
        "red" => "ff0000".to_owned(),
        "green" => "00ff00".to_owned(),
        "blue" => "0000ff".to_owned(),
        "yellow" => "ffff00".to_owned(),
        "cyan" => "00ffff".to_owned(),
        "magenta" => "ff00ff".to_owned(),
        other => match other.strip_prefix('#').or_else(|| other.strip_prefix("0x")) {
            Some(h) if h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()) => h.to_owned(),
            _ => return color.to_owned(),
        },
    };
    let (r, g, b) = (&hex[0..2], &hex[2..4], &hex[4..6]);
    format!("&H00{}{}{}", b, g, r).to_uppercase()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/format.rs"]
mod tests;
