//! Render strategy selection and execution.

use std::ffi::OsString;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::ffmpeg::{
    AudioSource, EncodeSettings, EncoderCaps, EngineProcess, decoder_args, encoder_args,
    ensure_parent_dir, graph_args, passthrough_args, run_ffmpeg,
};
use crate::foundation::error::{MontageError, MontageResult};
use crate::graph::compiler::{CompileOpts, compile};
use crate::pixel::filters::PixelTransform;
use crate::pixel::pipeline::{PipelineStats, PixelPipelineOpts, run_pixel_pipeline};
use crate::timeline::model::{Clip, Timeline};

/// How a timeline reaches the output file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategy {
    /// Stream copy of a single unmodified source.
    Passthrough,
    /// Decode to raw RGBA, filter per pixel, re-encode.
    PixelPipeline,
    /// Compile a filter graph and run it in one engine process.
    Graph,
}

/// Everything [`render`] needs besides the timeline and the encoder probe.
#[derive(Clone, Debug, Default)]
pub struct RenderOpts {
    pub compile: CompileOpts,
    pub encode: EncodeSettings,
    pub pixel: PixelPipelineOpts,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderReport {
    pub strategy: RenderStrategy,
    /// Set for pixel pipeline runs.
    pub pipeline: Option<PipelineStats>,
}

/// The single clip a timeline plays unmodified in space, if there is one.
///
/// Trims and per-pixel filters are allowed; anything that moves, resizes, layers or
/// delays the clip is not.
fn sole_source(timeline: &Timeline) -> Option<&Clip> {
    let clip = match timeline {
        Timeline::Concat(c) => match c.clips.as_slice() {
            [only] => only,
            _ => return None,
        },
        Timeline::Composite(c) => {
            let [item] = c.items.as_slice() else {
                return None;
            };
            let p = &item.placement;
            let natural = item.clip.size();
            let canvas = c.canvas();
            let plain = c.overlays.is_empty()
                && p.animations.is_empty()
                && p.opacity() >= 1.0
                && p.start <= 0.0
                && p.x.resolve(canvas.width) == 0
                && p.y.resolve(canvas.height) == 0
                && item.display_size() == natural
                && canvas == natural
                && (p.duration <= 0.0 || p.duration >= item.clip.play_duration());
            if !plain {
                return None;
            }
            &item.clip
        }
    };
    clip.source.path().is_some().then_some(clip)
}

/// Pick the cheapest strategy that renders `timeline` faithfully.
#[tracing::instrument(skip(timeline))]
pub fn plan(timeline: &Timeline) -> RenderStrategy {
    let Some(clip) = sole_source(timeline) else {
        return RenderStrategy::Graph;
    };
    let strategy = if clip.has_filters() {
        if clip.size().is_empty() || clip.fps == 0 {
            if !clip.custom_filters.is_empty() {
                tracing::warn!("clip size or frame rate unknown; custom filters need the pixel pipeline and will be skipped");
            }
            RenderStrategy::Graph
        } else {
            RenderStrategy::PixelPipeline
        }
    } else if clip.trim.is_none() {
        RenderStrategy::Passthrough
    } else {
        RenderStrategy::Graph
    };
    tracing::debug!(?strategy, "planned render");
    strategy
}

/// Untrimmed, unfiltered sole source usable as a stream copy.
fn passthrough_source(timeline: &Timeline) -> Option<&Path> {
    sole_source(timeline)
        .filter(|c| c.trim.is_none() && !c.has_filters())
        .and_then(|c| c.source.path())
}

/// Render `timeline` into `out` with the strategy chosen by [`plan`].
#[tracing::instrument(skip(timeline, opts, caps))]
pub fn render(
    timeline: &Timeline,
    out: &Path,
    opts: &RenderOpts,
    caps: &EncoderCaps,
) -> MontageResult<RenderReport> {
    if out.as_os_str().is_empty() {
        return Err(MontageError::configuration("missing output path"));
    }
    let strategy = plan(timeline);
    let mut report = RenderReport {
        strategy,
        pipeline: None,
    };
    match strategy {
        RenderStrategy::Passthrough => {
            let Some(clip) = sole_source(timeline) else {
                return Err(MontageError::configuration("timeline has no source to copy"));
            };
            clip.verify_source().map_err(MontageError::escalate)?;
            let Some(input) = clip.source.path() else {
                return Err(MontageError::configuration("timeline has no source to copy"));
            };
            ensure_parent_dir(out)?;
            run_ffmpeg(&passthrough_args(input, out, opts.encode.overwrite))?;
        }
        RenderStrategy::PixelPipeline => {
            let Some(clip) = sole_source(timeline) else {
                return Err(MontageError::configuration("timeline has no source to filter"));
            };
            clip.verify_source().map_err(MontageError::escalate)?;
            ensure_parent_dir(out)?;
            report.pipeline = Some(render_pixels(clip, out, opts, caps)?);
        }
        RenderStrategy::Graph => match compile(timeline, &opts.compile) {
            Ok(graph) => {
                ensure_parent_dir(out)?;
                run_ffmpeg(&graph_args(&graph, &opts.encode, caps, out))?;
            }
            Err(MontageError::Compilation(msg)) => {
                let Some(input) = passthrough_source(timeline) else {
                    return Err(MontageError::Compilation(msg));
                };
                tracing::warn!(reason = %msg, "graph compilation failed; copying the source instead");
                ensure_parent_dir(out)?;
                run_ffmpeg(&passthrough_args(input, out, opts.encode.overwrite))?;
                report.strategy = RenderStrategy::Passthrough;
            }
            Err(e) => return Err(e),
        },
    }
    tracing::info!(strategy = ?report.strategy, out = %out.display(), "render finished");
    Ok(report)
}

/// Decoder and encoder argument lists for a pixel pipeline run.
///
/// The raw stream between them always runs at the clip's own rate; an output frame rate
/// override only applies on the encoder's output side.
fn pixel_commands(
    clip: &Clip,
    out: &Path,
    encode: &EncodeSettings,
    caps: &EncoderCaps,
) -> MontageResult<(Vec<OsString>, Vec<OsString>)> {
    let decode = decoder_args(clip)?;
    let audio = clip
        .source
        .path()
        .filter(|_| clip.has_audio())
        .map(|path| AudioSource {
            path,
            trim: clip.trim,
        });
    let encode = encoder_args(clip.size(), clip.fps, encode, caps, audio, out);
    Ok((decode, encode))
}

/// Decoder → pixel pipeline → encoder, with audio muxed straight from the source.
fn render_pixels(
    clip: &Clip,
    out: &Path,
    opts: &RenderOpts,
    caps: &EncoderCaps,
) -> MontageResult<PipelineStats> {
    let (decode, encode) = pixel_commands(clip, out, &opts.encode, caps)?;
    let transform = PixelTransform::for_clip(clip);
    let pixel = PixelPipelineOpts {
        expected_frames: Some(clip.frame_count()),
        ..opts.pixel.clone()
    };

    let mut decoder = EngineProcess::decoder(&decode)?;
    let mut encoder = match EngineProcess::encoder(&encode) {
        Ok(e) => e,
        Err(e) => {
            decoder.kill();
            let _ = decoder.finish();
            return Err(e);
        }
    };
    let reader = decoder.take_stdout()?;
    let writer = encoder.take_stdin()?;

    let piped = run_pixel_pipeline(reader, writer, clip.size().rgba_len(), &transform, &pixel);
    if piped.is_err() {
        decoder.kill();
    }
    let encoded = encoder.finish();
    let decoded = decoder.finish();
    let stats = piped?;
    encoded?;
    decoded?;
    Ok(stats)
}

#[cfg(test)]
#[path = "../../tests/unit/engine/strategy.rs"]
mod tests;
