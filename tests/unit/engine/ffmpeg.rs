use super::*;

use std::path::PathBuf;

use crate::graph::node::{GraphInput, NodeDecl};

fn strs(args: &[OsString]) -> Vec<String> {
    args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
}

const ENCODERS: &str = "Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC
 V....D h264_qsv             H.264 / AVC (Intel Quick Sync Video acceleration)
 V....D h264_nvenc           NVIDIA NVENC H.264 encoder
 A....D aac                  AAC (Advanced Audio Coding)
";

#[test]
fn parses_video_encoders_only() {
    let caps = EncoderCaps::parse_encoders(ENCODERS);
    assert!(caps.has("libx264"));
    assert!(caps.has("h264_nvenc"));
    assert!(!caps.has("aac"));
    assert_eq!(caps.best_h264(), "h264_nvenc");
}

#[test]
fn best_h264_follows_priority_then_falls_back() {
    let caps = EncoderCaps::parse_encoders(" V..... h264_amf x\n V..... h264_videotoolbox y\n");
    assert_eq!(caps.best_h264(), "h264_amf");
    assert_eq!(EncoderCaps::software().best_h264(), "libx264");
}

#[test]
fn preset_mapping_per_family() {
    assert_eq!(map_preset("h264_nvenc", "veryfast").as_deref(), Some("fast"));
    assert_eq!(map_preset("h264_nvenc", "placebo").as_deref(), Some("hq"));
    assert_eq!(map_preset("h264_nvenc", "bogus").as_deref(), Some("medium"));
    assert_eq!(map_preset("h264_amf", "fast").as_deref(), Some("speed"));
    assert_eq!(map_preset("h264_amf", "veryslow").as_deref(), Some("quality"));
    assert_eq!(map_preset("h264_amf", "medium").as_deref(), Some("balanced"));
    assert_eq!(map_preset("h264_qsv", "superfast").as_deref(), Some("veryfast"));
    assert_eq!(map_preset("h264_qsv", "slow").as_deref(), Some("slow"));
    assert_eq!(map_preset("h264_qsv", "placebo").as_deref(), Some("veryslow"));
    assert_eq!(map_preset("h264_videotoolbox", "slow"), None);
    assert_eq!(map_preset("libx264", "veryslow").as_deref(), Some("veryslow"));
    assert_eq!(map_preset("libx264", ""), None);
}

#[test]
fn odd_sizes_use_full_chroma() {
    assert_eq!(output_pixel_format(Size::new(1280, 720)), "yuv420p");
    assert_eq!(output_pixel_format(Size::new(641, 360)), "yuv444p");
}

fn graph(has_audio: bool) -> CompiledGraph {
    CompiledGraph {
        inputs: vec![
            GraphInput::File(PathBuf::from("in.mp4")),
            GraphInput::LoopedImage {
                path: PathBuf::from("logo.png"),
                duration: 4.0,
            },
        ],
        nodes: vec![
            NodeDecl::new()
                .input("0:v")
                .filter(crate::graph::node::Filter::with_args("scale", "640:360"))
                .output("outv"),
        ],
        has_audio,
        size: Size::new(640, 360),
        fps: 30,
        duration: 4.0,
    }
}

#[test]
fn graph_args_layout() {
    let args = graph_args(
        &graph(true),
        &EncodeSettings::default(),
        &EncoderCaps::software(),
        Path::new("out/final.mp4"),
    );
    assert_eq!(
        strs(&args),
        [
            "-loglevel", "error", "-i", "in.mp4", "-loop", "1", "-t", "4.000", "-i", "logo.png",
            "-filter_complex", "[0:v]scale=640:360[outv]", "-map", "[outv]", "-map", "[outa]",
            "-c:v", "libx264", "-preset", "medium", "-pix_fmt", "yuv420p", "-c:a", "aac",
            "-b:a", "192k", "-y", "out/final.mp4",
        ]
    );
}

#[test]
fn graph_args_without_audio_and_with_overrides() {
    let settings = EncodeSettings {
        codec: Some("h264_videotoolbox".to_owned()),
        bit_rate: Some("4M".to_owned()),
        fps: Some(25),
        threads: Some(2),
        overwrite: false,
        ..EncodeSettings::default()
    };
    let args = strs(&graph_args(
        &graph(false),
        &settings,
        &EncoderCaps::software(),
        Path::new("o.mp4"),
    ));
    assert!(!args.iter().any(|a| a == "[outa]"));
    assert!(!args.iter().any(|a| a == "-preset"));
    let tail: Vec<&str> = args.iter().skip_while(|a| *a != "-c:v").map(String::as_str).collect();
    assert_eq!(
        tail,
        [
            "-c:v", "h264_videotoolbox", "-b:v", "4M", "-r", "25", "-pix_fmt", "yuv420p",
            "-threads", "2", "-an", "-n", "o.mp4",
        ]
    );
}

#[test]
fn passthrough_is_a_stream_copy() {
    assert_eq!(
        strs(&passthrough_args(Path::new("a.mp4"), Path::new("b.mp4"), true)),
        ["-loglevel", "error", "-i", "a.mp4", "-c", "copy", "-y", "b.mp4"]
    );
}

#[test]
fn decoder_seeks_before_input_and_limits_after() {
    let clip = Clip::file("a.mp4")
        .with_size(320, 240)
        .with_fps(24)
        .with_duration(10.0)
        .subclip(1.5, 4.0)
        .unwrap();
    assert_eq!(
        strs(&decoder_args(&clip).unwrap()),
        [
            "-loglevel", "error", "-ss", "1.500", "-i", "a.mp4", "-t", "2.500", "-f",
            "rawvideo", "-pix_fmt", "rgba", "-r", "24", "-",
        ]
    );
}

#[test]
fn decoder_rejects_generated_and_rateless_clips() {
    let color = Clip::color("red", 16, 16, 1.0).with_fps(30);
    assert!(matches!(
        decoder_args(&color),
        Err(MontageError::Configuration(_))
    ));
    let rateless = Clip::file("a.mp4").with_duration(1.0);
    assert!(matches!(
        decoder_args(&rateless),
        Err(MontageError::Configuration(_))
    ));
}

#[test]
fn encoder_reads_raw_frames_and_muxes_source_audio() {
    let trim = Trim::new(2.0, 5.0).unwrap();
    let args = strs(&encoder_args(
        Size::new(641, 361),
        30,
        &EncodeSettings::default(),
        &EncoderCaps::software(),
        Some(AudioSource {
            path: Path::new("src.mp4"),
            trim: Some(trim),
        }),
        Path::new("out.mp4"),
    ));
    assert_eq!(
        args,
        [
            "-loglevel", "error", "-f", "rawvideo", "-vcodec", "rawvideo", "-s", "641x361",
            "-pix_fmt", "rgba", "-r", "30", "-i", "-", "-ss", "2.000", "-i", "src.mp4", "-t",
            "3.000", "-map", "0:v:0", "-map", "1:a:0?", "-c:v", "libx264", "-preset", "medium",
            "-pix_fmt", "yuv444p", "-c:a", "aac", "-b:a", "192k", "-shortest", "-y", "out.mp4",
        ]
    );
}

#[test]
fn silent_encoder_drops_audio() {
    let args = strs(&encoder_args(
        Size::new(64, 64),
        30,
        &EncodeSettings::default(),
        &EncoderCaps::software(),
        None,
        Path::new("out.mp4"),
    ));
    assert!(!args.iter().any(|a| a == "-map"));
    assert_eq!(&args[args.len() - 3..], ["-an", "-y", "out.mp4"]);
}

#[test]
fn settings_deserialize_with_defaults() {
    let s: EncodeSettings = serde_json::from_str(r#"{"codec":"libx265"}"#).unwrap();
    assert_eq!(s.codec.as_deref(), Some("libx265"));
    assert_eq!(s.preset.as_deref(), Some("medium"));
    assert!(s.overwrite);
    assert_eq!(s.audio_bit_rate, "192k");
}

#[test]
fn ensure_parent_dir_creates_nested_dirs() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("target/montage-tests/ffmpeg");
    let out = root.join("a/b/out.mp4");
    let _ = std::fs::remove_dir_all(&root);
    ensure_parent_dir(&out).unwrap();
    assert!(root.join("a/b").is_dir());
    ensure_parent_dir(Path::new("bare.mp4")).unwrap();
}

#[test]
fn failing_ffmpeg_reports_engine_error() {
    if !is_ffmpeg_on_path() {
        return;
    }
    let args: Vec<OsString> = ["-loglevel", "error", "-i", "/definitely/not/here.mp4", "-f", "null", "-"]
        .into_iter()
        .map(Into::into)
        .collect();
    let err = run_ffmpeg(&args).unwrap_err();
    assert!(matches!(err, MontageError::Engine(ref m) if m.contains("ffmpeg exited with status")));
}
