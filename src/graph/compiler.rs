use serde::{Deserialize, Serialize};

use crate::foundation::core::Size;
use crate::foundation::error::{MontageError, MontageResult};
use crate::graph::audio::{AudioLayer, audio_nodes};
use crate::graph::chain::{
    clip_filters, color_source, overlay, overlay_position, setpts, size_override,
    transform_filters, trim,
};
use crate::graph::node::{CompiledGraph, GraphBuilder, InputTable, NodeDecl, VIDEO_OUT};
use crate::graph::overlay::{Canvas, overlay_nodes};
use crate::timeline::builder::validate_composite;
use crate::timeline::model::{Composite, CompositeItem, MediaSource, Timeline};
use crate::timeline::overlay::Overlay;

/// Where subtitle overlays land in the overlay stack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleLayering {
    /// Subtitles are drawn after every other overlay, in declaration order.
    #[default]
    AlwaysOnTop,
    /// Subtitles sort by their placement layer like any other overlay.
    ByLayer,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompileOpts {
    /// Check that referenced files exist before emitting nodes for them.
    pub verify_sources: bool,
    pub subtitle_layering: SubtitleLayering,
    /// Frame rate used when neither the timeline nor any clip names one.
    pub default_fps: u32,
    pub audio_sample_rate: u32,
}

impl Default for CompileOpts {
    fn default() -> Self {
        Self {
            verify_sources: true,
            subtitle_layering: SubtitleLayering::AlwaysOnTop,
            default_fps: 30,
            audio_sample_rate: 48_000,
        }
    }
}

/// Compile a timeline into an engine filter graph.
///
/// The result always ends in the `outv` video label, plus `outa` when any clip carries
/// audio.
#[tracing::instrument(skip(timeline, opts))]
pub fn compile(timeline: &Timeline, opts: &CompileOpts) -> MontageResult<CompiledGraph> {
    let graph = match timeline {
        Timeline::Composite(comp) => compile_composite(comp, opts)?,
        Timeline::Concat(concat) => crate::graph::concat::compile_concat(concat, opts)?,
    };
    tracing::debug!(
        inputs = graph.inputs.len(),
        nodes = graph.nodes.len(),
        has_audio = graph.has_audio,
        "compiled filter graph"
    );
    Ok(graph)
}

/// Items that can actually be composed, in declaration order.
fn composable_items(comp: &Composite, opts: &CompileOpts) -> MontageResult<Vec<CompositeItem>> {
    let mut kept = Vec::with_capacity(comp.items.len());
    let mut last_resource = None;
    for (i, item) in comp.items.iter().enumerate() {
        if !item.clip.is_resolvable() {
            tracing::debug!(item = i, "skipping item without a source");
            continue;
        }
        if item.display_duration() <= 0.0 {
            tracing::warn!(item = i, source = ?item.clip.source, "skipping item with no duration");
            continue;
        }
        if opts.verify_sources
            && let Err(e) = item.clip.verify_source()
        {
            tracing::warn!(item = i, error = %e, "skipping unreadable item");
            last_resource = Some(e);
            continue;
        }
        kept.push(item.clone());
    }
    if kept.is_empty() {
        return Err(match last_resource {
            Some(e) if comp.items.len() == 1 => e.escalate(),
            _ => MontageError::configuration("nothing to compose: timeline has no valid clips"),
        });
    }
    Ok(kept)
}

/// Overlays in drawing order.
fn overlay_order<'a>(overlays: &'a [Overlay], layering: SubtitleLayering) -> Vec<&'a Overlay> {
    let mut ordered: Vec<&Overlay> = match layering {
        SubtitleLayering::ByLayer => overlays.iter().collect(),
        SubtitleLayering::AlwaysOnTop => overlays.iter().filter(|o| !o.is_subtitle()).collect(),
    };
    ordered.sort_by_key(|o| o.placement.layer);
    if layering == SubtitleLayering::AlwaysOnTop {
        ordered.extend(overlays.iter().filter(|o| o.is_subtitle()));
    }
    ordered
}

/// A lone color clip covering the whole canvas needs nothing but its generator.
fn solid_only(items: &[CompositeItem], comp: &Composite, canvas: Size) -> Option<String> {
    let [only] = items else {
        return None;
    };
    let MediaSource::Color(color) = &only.clip.source else {
        return None;
    };
    let p = &only.placement;
    let shown = only.display_size();
    let plain = comp.overlays.is_empty()
        && (shown == canvas || shown.is_empty())
        && p.animations.is_empty()
        && p.opacity() >= 1.0
        && p.start <= 0.0
        && p.x.resolve(comp.width) == 0
        && p.y.resolve(comp.height) == 0;
    plain.then(|| color.clone())
}

pub(crate) fn compile_composite(comp: &Composite, opts: &CompileOpts) -> MontageResult<CompiledGraph> {
    validate_composite(comp)?;
    let items = composable_items(comp, opts)?;
    let sized = Composite {
        width: comp.width,
        height: comp.height,
        fps: comp.fps,
        background: None,
        items,
        overlays: Vec::new(),
    };
    let size = sized.canvas();
    let duration = sized.duration();
    let fps = sized.frame_rate(opts.default_fps);
    if size.is_empty() {
        return Err(MontageError::configuration(
            "canvas size is zero; set it explicitly or give clips dimensions",
        ));
    }
    if duration <= 0.0 {
        return Err(MontageError::configuration("timeline duration is zero"));
    }

    let mut builder = GraphBuilder::new();
    let mut inputs = InputTable::default();

    if let Some(color) = solid_only(&sized.items, comp, size) {
        let node = NodeDecl::new()
            .filter(color_source(&color, size, fps, duration))
            .filters(clip_filters(&sized.items[0].clip))
            .output(VIDEO_OUT);
        builder.push(node);
        return Ok(CompiledGraph {
            inputs: Vec::new(),
            nodes: builder.into_nodes(),
            has_audio: false,
            size,
            fps,
            duration,
        });
    }

    builder.push(
        NodeDecl::new()
            .filter(color_source(comp.background_color(), size, fps, duration))
            .output("base"),
    );

    let mut ordered: Vec<&CompositeItem> = sized.items.iter().collect();
    ordered.sort_by_key(|i| i.placement.layer);

    let mut prev = "base".to_owned();
    let mut audio = Vec::new();
    for (i, item) in ordered.into_iter().enumerate() {
        let (input, nodes) = item_nodes(item, i, &prev, size, fps, duration, &mut inputs);
        if builder.push_all(nodes) {
            prev = format!("comp{i}");
            audio.push(AudioLayer { item, input });
        } else {
            tracing::warn!(item = i, "item dropped from composition");
        }
    }
    if audio.is_empty() {
        return Err(MontageError::compilation(
            "no clip produced a valid graph node",
        ));
    }

    let canvas = Canvas {
        size,
        fps,
        duration,
        verify_sources: opts.verify_sources,
    };
    for (k, ov) in overlay_order(&comp.overlays, opts.subtitle_layering)
        .into_iter()
        .enumerate()
    {
        let label = format!("ov{k}");
        match overlay_nodes(ov, k, &prev, &label, &canvas, &mut inputs) {
            Ok(nodes) => {
                if builder.push_all(nodes) {
                    prev = label;
                }
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(overlay = k, kind = ov.kind.name(), error = %e, "skipping overlay");
            }
            Err(e) => return Err(e),
        }
    }
    builder.rename_output(&prev, VIDEO_OUT);

    let audio_nodes = audio_nodes(&audio, opts.audio_sample_rate);
    let has_audio = !audio_nodes.is_empty() && builder.push_all(audio_nodes);
    if builder.dropped() > 0 {
        tracing::warn!(dropped = builder.dropped(), "graph compiled with dropped segments");
    }

    Ok(CompiledGraph {
        inputs: inputs.into_inputs(),
        nodes: builder.into_nodes(),
        has_audio,
        size,
        fps,
        duration,
    })
}

/// Chain and overlay nodes for one placed clip, plus its engine input index.
fn item_nodes(
    item: &CompositeItem,
    i: usize,
    prev: &str,
    canvas: Size,
    fps: u32,
    canvas_end: f64,
    inputs: &mut InputTable,
) -> (Option<usize>, Vec<NodeDecl>) {
    let p = &item.placement;
    let mut chain = NodeDecl::new();
    let mut input = None;
    match &item.clip.source {
        MediaSource::File(path) => {
            let idx = inputs.file(path);
            input = Some(idx);
            chain = chain.input(format!("{idx}:v"));
            if let Some(t) = item.clip.trim {
                chain = chain.filter(trim(t.start(), t.end())).filter(setpts(p.start));
            } else if p.start > 0.0 {
                chain = chain.filter(setpts(p.start));
            }
        }
        MediaSource::Color(color) => {
            let natural = item.clip.size();
            let size = if natural.is_empty() { canvas } else { natural };
            chain = chain.filter(color_source(color, size, fps, item.display_duration()));
            if p.start > 0.0 {
                chain = chain.filter(setpts(p.start));
            }
        }
    }
    chain = chain
        .filters(transform_filters(p, size_override(p, item.clip.size())))
        .filters(clip_filters(&item.clip));

    let mut nodes = Vec::with_capacity(2);
    let layer = if chain.filters.is_empty() {
        chain.inputs.first().cloned().unwrap_or_default()
    } else {
        let label = format!("clip{i}");
        nodes.push(chain.output(label.clone()));
        label
    };
    // Items ending before the canvas must not freeze on their last frame.
    let window = (p.is_gated() || item.end() < canvas_end).then(|| (p.start, item.end()));
    nodes.push(
        NodeDecl::new()
            .input(prev)
            .input(layer)
            .filter(overlay(overlay_position(p, canvas), window))
            .output(format!("comp{i}")),
    );
    (input, nodes)
}

#[cfg(test)]
#[path = "../../tests/unit/graph/compiler.rs"]
mod tests;
