//! Audio mixing for composites: one chain per placed clip, mixed into the audio output.

use crate::foundation::format::fmt3;
use crate::graph::node::{AUDIO_OUT, Filter, NodeDecl};
use crate::timeline::model::CompositeItem;

/// A placed clip together with its engine input index, if it has one.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AudioLayer<'a> {
    pub(crate) item: &'a CompositeItem,
    pub(crate) input: Option<usize>,
}

fn delay(start: f64) -> Option<Filter> {
    let ms = (start * 1000.0).round() as u64;
    (ms > 0).then(|| Filter::with_args("adelay", format!("delays={ms}:all=1")))
}

fn resample(sample_rate: u32) -> Filter {
    Filter::with_args(
        "aformat",
        format!("sample_rates={sample_rate}:channel_layouts=stereo"),
    )
}

fn layer_chain(layer: &AudioLayer<'_>, label: String, sample_rate: u32) -> NodeDecl {
    let item = layer.item;
    let shown = item.display_duration();
    let node = match layer.input.filter(|_| item.clip.has_audio()) {
        Some(idx) => {
            let node = NodeDecl::new().input(format!("{idx}:a"));
            let node = if item.clip.trim.is_some() || item.placement.duration > 0.0 {
                let from = item.clip.trim.map(|t| t.start()).unwrap_or(0.0);
                // Never read past the clip's own window, however long it is shown.
                let end = from + shown.min(item.clip.play_duration());
                node.filter(Filter::with_args(
                    "atrim",
                    format!("start={}:end={}", fmt3(from), fmt3(end)),
                ))
            } else {
                node
            };
            node.filter(Filter::with_args("asetpts", "PTS-STARTPTS"))
        }
        None => NodeDecl::new().filter(Filter::with_args(
            "aevalsrc",
            format!("0:s={sample_rate}:d={}", fmt3(shown)),
        )),
    };
    node.filters(delay(item.placement.start))
        .filter(resample(sample_rate))
        .output(label)
}

/// Audio nodes for `layers`, ending in the reserved audio label.
///
/// Layers without an audio stream contribute silence of their display length so the mix
/// keeps their timing. Returns no nodes when no layer carries audio.
pub(crate) fn audio_nodes(layers: &[AudioLayer<'_>], sample_rate: u32) -> Vec<NodeDecl> {
    let audible = layers
        .iter()
        .any(|l| l.input.is_some() && l.item.clip.has_audio());
    if !audible {
        return Vec::new();
    }

    if let [only] = layers {
        return vec![layer_chain(only, AUDIO_OUT.to_owned(), sample_rate)];
    }

    let mut nodes: Vec<NodeDecl> = layers
        .iter()
        .enumerate()
        .map(|(i, l)| layer_chain(l, format!("a{i}"), sample_rate))
        .collect();
    let mix = (0..layers.len())
        .fold(NodeDecl::new(), |n, i| n.input(format!("a{i}")))
        .filter(Filter::with_args(
            "amix",
            format!(
                "inputs={}:duration=longest:dropout_transition=0:normalize=0",
                layers.len()
            ),
        ))
        .output(AUDIO_OUT);
    nodes.push(mix);
    nodes
}

#[cfg(test)]
#[path = "../../tests/unit/graph/audio.rs"]
mod tests;
