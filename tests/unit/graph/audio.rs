use super::*;
use crate::timeline::model::{AudioInfo, Clip, Placement};

fn aac() -> AudioInfo {
    AudioInfo {
        codec: "aac".to_owned(),
        sample_rate: 44100,
        channels: 2,
        bit_rate: 128_000,
        duration: 10.0,
    }
}

fn rendered(nodes: &[NodeDecl]) -> Vec<String> {
    nodes.iter().map(ToString::to_string).collect()
}

#[test]
fn silent_timeline_has_no_audio() {
    let item = CompositeItem::new(Clip::file("a.mp4").with_duration(4.0), Placement::new());
    let layers = [AudioLayer {
        item: &item,
        input: Some(0),
    }];
    assert!(audio_nodes(&layers, 48000).is_empty());
}

#[test]
fn single_layer_writes_the_output_label() {
    let clip = Clip::file("a.mp4")
        .with_duration(10.0)
        .with_audio(aac())
        .subclip(1.0, 4.0)
        .unwrap();
    let item = CompositeItem::new(clip, Placement::new().start_at(2.0));
    let nodes = audio_nodes(
        &[AudioLayer {
            item: &item,
            input: Some(0),
        }],
        48000,
    );
    assert_eq!(
        rendered(&nodes),
        ["[0:a]atrim=start=1.000:end=4.000,asetpts=PTS-STARTPTS,adelay=delays=2000:all=1,aformat=sample_rates=48000:channel_layouts=stereo[outa]"]
    );
}

#[test]
fn silence_fills_layers_without_audio() {
    let talking = CompositeItem::new(
        Clip::file("a.mp4").with_duration(5.0).with_audio(aac()),
        Placement::new(),
    );
    let mute = CompositeItem::new(
        Clip::color("red", 10, 10, 3.0),
        Placement::new().start_at(1.5),
    );
    let nodes = audio_nodes(
        &[
            AudioLayer {
                item: &talking,
                input: Some(0),
            },
            AudioLayer {
                item: &mute,
                input: None,
            },
        ],
        44100,
    );
    assert_eq!(
        rendered(&nodes),
        [
            "[0:a]asetpts=PTS-STARTPTS,aformat=sample_rates=44100:channel_layouts=stereo[a0]",
            "aevalsrc=0:s=44100:d=3.000,adelay=delays=1500:all=1,aformat=sample_rates=44100:channel_layouts=stereo[a1]",
            "[a0][a1]amix=inputs=2:duration=longest:dropout_transition=0:normalize=0[outa]",
        ]
    );
}

#[test]
fn display_duration_cuts_audio() {
    let item = CompositeItem::new(
        Clip::file("a.mp4").with_duration(10.0).with_audio(aac()),
        Placement::new().lasting(2.5),
    );
    let nodes = audio_nodes(
        &[AudioLayer {
            item: &item,
            input: Some(3),
        }],
        48000,
    );
    assert!(nodes[0].to_string().starts_with("[3:a]atrim=start=0.000:end=2.500,"));
}

#[test]
fn long_display_never_reads_past_the_trim() {
    let clip = Clip::file("a.mp4")
        .with_duration(10.0)
        .with_audio(aac())
        .subclip(1.0, 4.0)
        .unwrap();
    let item = CompositeItem::new(clip, Placement::new().lasting(10.0));
    let nodes = audio_nodes(
        &[AudioLayer {
            item: &item,
            input: Some(0),
        }],
        48000,
    );
    assert!(
        nodes[0]
            .to_string()
            .starts_with("[0:a]atrim=start=1.000:end=4.000,asetpts=PTS-STARTPTS,")
    );
}
