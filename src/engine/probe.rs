use std::path::Path;

use serde::Deserialize;

use crate::foundation::error::{MontageError, MontageResult};
use crate::timeline::model::{AudioInfo, Clip};

/// Source metadata reported by `ffprobe`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    /// Rounded average frame rate; 30 when the probe does not report one.
    pub fps: u32,
    pub duration: f64,
    pub frame_count: Option<u64>,
    pub bit_rate: Option<u64>,
    pub codec: Option<String>,
    pub pixel_format: Option<String>,
    pub audio: Option<AudioInfo>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    nb_frames: Option<String>,
    bit_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

const DEFAULT_FPS: u32 = 30;

fn parse_num<T: std::str::FromStr>(s: Option<&String>) -> Option<T> {
    s.and_then(|v| v.trim().parse().ok())
}

/// Round an `num/den` rate string. Unparseable or zero rates yield `None`.
pub(crate) fn parse_frame_rate(rate: &str) -> Option<u32> {
    let (num, den) = rate.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 {
        return None;
    }
    let fps = (num / den).round();
    (fps > 0.0 && fps.is_finite()).then_some(fps as u32)
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output.
pub fn parse_probe_json(bytes: &[u8]) -> MontageResult<MediaInfo> {
    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| MontageError::serde(format!("ffprobe json parse failed: {e}")))?;

    let mut info = MediaInfo {
        fps: DEFAULT_FPS,
        ..MediaInfo::default()
    };
    let mut video_seen = false;
    for s in &parsed.streams {
        match s.codec_type.as_deref() {
            Some("video") if !video_seen => {
                video_seen = true;
                info.width = s.width.unwrap_or(0);
                info.height = s.height.unwrap_or(0);
                info.codec = s.codec_name.clone();
                info.pixel_format = s.pix_fmt.clone();
                info.duration = parse_num(s.duration.as_ref()).unwrap_or(0.0);
                info.frame_count = parse_num(s.nb_frames.as_ref());
                info.bit_rate = parse_num(s.bit_rate.as_ref());
                info.fps = s
                    .avg_frame_rate
                    .as_deref()
                    .and_then(parse_frame_rate)
                    .unwrap_or(DEFAULT_FPS);
            }
            Some("audio") if info.audio.is_none() => {
                info.audio = Some(AudioInfo {
                    codec: s.codec_name.clone().unwrap_or_default(),
                    sample_rate: parse_num(s.sample_rate.as_ref()).unwrap_or(0),
                    channels: s.channels.unwrap_or(0),
                    bit_rate: parse_num(s.bit_rate.as_ref()).unwrap_or(0),
                    duration: parse_num(s.duration.as_ref()).unwrap_or(0.0),
                });
            }
            _ => {}
        }
    }
    if info.duration <= 0.0 {
        let container = parsed.format.as_ref().and_then(|f| f.duration.as_ref());
        info.duration = parse_num(container).unwrap_or(0.0);
    }
    Ok(info)
}

/// Probe `path` with `ffprobe`.
///
/// An unreadable file or a failed probe is a [`MontageError::Resource`]: the caller can drop
/// the clip and carry on.
#[tracing::instrument]
pub fn probe(path: &Path) -> MontageResult<MediaInfo> {
    if path.as_os_str().is_empty() {
        return Err(MontageError::resource("media path is empty"));
    }
    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| MontageError::engine(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(MontageError::resource(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_probe_json(&out.stdout)
}

impl MediaInfo {
    /// Build a file clip, rejecting sources without usable dimensions or duration.
    pub fn into_clip(self, path: &Path) -> MontageResult<Clip> {
        if self.width == 0 || self.height == 0 {
            return Err(MontageError::resource(format!(
                "'{}' has invalid dimensions ({}x{})",
                path.display(),
                self.width,
                self.height
            )));
        }
        if self.duration.is_nan() || self.duration <= 0.0 {
            return Err(MontageError::resource(format!(
                "'{}' has invalid duration ({:.2})",
                path.display(),
                self.duration
            )));
        }
        let mut clip = Clip::file(path)
            .with_size(self.width, self.height)
            .with_fps(self.fps)
            .with_duration(self.duration);
        clip.codec = self.codec;
        clip.pixel_format = self.pixel_format;
        clip.bit_rate = self.bit_rate;
        clip.audio = self.audio;
        Ok(clip)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/probe.rs"]
mod tests;
