//! Filter graphs for sequential joins.

use crate::foundation::core::Size;
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::format::fmt3;
use crate::graph::chain::{clip_filters, color_source, setpts, trim};
use crate::graph::compiler::{CompileOpts, compile_composite};
use crate::graph::node::{
    AUDIO_OUT, CompiledGraph, Filter, GraphBuilder, InputTable, NodeDecl, VIDEO_OUT,
};
use crate::timeline::model::{Clip, Composite, CompositeItem, Concatenation, MediaSource, Placement};

/// Compile a concatenation. A single member compiles exactly like a one-item composite.
#[tracing::instrument(skip(concat, opts), fields(clips = concat.clips.len()))]
pub(crate) fn compile_concat(
    concat: &Concatenation,
    opts: &CompileOpts,
) -> MontageResult<CompiledGraph> {
    let clips = readable_members(concat, opts)?;
    if let [only] = clips.as_slice() {
        let comp = Composite {
            items: vec![CompositeItem::new((*only).clone(), Placement::default())],
            ..Composite::default()
        };
        return compile_composite(&comp, opts);
    }

    // The first readable member sets the join's geometry, even if earlier ones were dropped.
    let Some(lead) = clips.first().copied() else {
        return Err(MontageError::configuration("nothing to compose: concatenation is empty"));
    };
    let size = lead.size();
    if size.is_empty() {
        return Err(MontageError::configuration(format!(
            "cannot join clips: first readable member {:?} has no known size",
            lead.source
        )));
    }
    let fps = if lead.fps > 0 {
        lead.fps
    } else {
        opts.default_fps
    };
    let with_audio = clips.iter().any(|c| c.has_audio());

    let mut inputs = InputTable::default();
    let mut nodes = Vec::with_capacity(clips.len() * 2 + 1);
    let mut join = NodeDecl::new();
    for (i, clip) in clips.iter().enumerate() {
        let input = clip.source.path().map(|p| inputs.file(p));
        nodes.push(video_chain(clip, input, size, fps).output(format!("v{i}")));
        join = join.input(format!("v{i}"));
        if with_audio {
            nodes.push(audio_chain(clip, input, opts.audio_sample_rate).output(format!("a{i}")));
            join = join.input(format!("a{i}"));
        }
    }
    let join = join
        .filter(Filter::with_args(
            "concat",
            format!("n={}:v=1:a={}", clips.len(), u8::from(with_audio)),
        ))
        .output(VIDEO_OUT);
    nodes.push(if with_audio { join.output(AUDIO_OUT) } else { join });

    let mut builder = GraphBuilder::new();
    if !builder.push_all(nodes) {
        return Err(MontageError::compilation(
            "concatenation graph contains an invalid segment",
        ));
    }
    Ok(CompiledGraph {
        inputs: inputs.into_inputs(),
        nodes: builder.into_nodes(),
        has_audio: with_audio,
        size,
        fps,
        duration: clips.iter().map(|c| c.play_duration()).sum(),
    })
}

fn readable_members<'a>(
    concat: &'a Concatenation,
    opts: &CompileOpts,
) -> MontageResult<Vec<&'a Clip>> {
    let mut kept = Vec::with_capacity(concat.clips.len());
    let mut last_resource = None;
    for (i, clip) in concat.clips.iter().enumerate() {
        if opts.verify_sources
            && let Err(e) = clip.verify_source()
        {
            tracing::warn!(clip = i, error = %e, "dropping unreadable clip from concatenation");
            last_resource = Some(e);
            continue;
        }
        kept.push(clip);
    }
    if kept.is_empty() {
        return Err(match last_resource {
            Some(e) if concat.clips.len() == 1 => e.escalate(),
            _ => MontageError::configuration(
                "nothing to compose: concatenation has no readable clips",
            ),
        });
    }
    Ok(kept)
}

/// Video chain for one member, normalized to the join's size and rate.
fn video_chain(clip: &Clip, input: Option<usize>, size: Size, fps: u32) -> NodeDecl {
    let node = match (&clip.source, input) {
        (MediaSource::File(_), Some(idx)) => {
            let node = NodeDecl::new().input(format!("{idx}:v"));
            match clip.trim {
                Some(t) => node.filter(trim(t.start(), t.end())),
                None => node.filter(Filter::new("copy")),
            }
            .filter(setpts(0.0))
        }
        _ => {
            let natural = clip.size();
            let gen_size = if natural.is_empty() { size } else { natural };
            NodeDecl::new().filter(color_source(
                color_name(clip),
                gen_size,
                fps,
                clip.play_duration(),
            ))
        }
    };
    let node = node.filters(clip_filters(clip));
    let (w, h) = (size.width, size.height);
    node.filter(Filter::with_args(
        "scale",
        format!("{w}:{h}:force_original_aspect_ratio=decrease"),
    ))
    .filter(Filter::with_args("pad", format!("{w}:{h}:(ow-iw)/2:(oh-ih)/2")))
    .filter(Filter::with_args("setsar", "1"))
    .filter(Filter::with_args("fps", fps.to_string()))
}

fn color_name(clip: &Clip) -> &str {
    match &clip.source {
        MediaSource::Color(c) => c,
        MediaSource::File(_) => "black",
    }
}

/// Audio chain for one member; silence when it has no stream of its own.
fn audio_chain(clip: &Clip, input: Option<usize>, sample_rate: u32) -> NodeDecl {
    let node = match input.filter(|_| clip.has_audio()) {
        Some(idx) => {
            let node = NodeDecl::new().input(format!("{idx}:a"));
            match clip.trim {
                Some(t) => node.filter(Filter::with_args(
                    "atrim",
                    format!("start={}:end={}", fmt3(t.start()), fmt3(t.end())),
                )),
                None => node.filter(Filter::new("acopy")),
            }
            .filter(Filter::with_args("asetpts", "PTS-STARTPTS"))
        }
        None => NodeDecl::new().filter(Filter::with_args(
            "aevalsrc",
            format!("0:s={sample_rate}:d={}", fmt3(clip.play_duration())),
        )),
    };
    node.filter(Filter::with_args(
        "aformat",
        format!("sample_rates={sample_rate}:channel_layouts=stereo"),
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/graph/concat.rs"]
mod tests;
