use super::*;

const SAMPLE: &str = r#"{
  "streams": [
    {
      "codec_type": "video",
      "codec_name": "h264",
      "width": 1920,
      "height": 1080,
      "pix_fmt": "yuv420p",
      "avg_frame_rate": "30000/1001",
      "duration": "12.345",
      "nb_frames": "370",
      "bit_rate": "4500000"
    },
    {
      "codec_type": "audio",
      "codec_name": "aac",
      "sample_rate": "48000",
      "channels": 2,
      "bit_rate": "192000",
      "duration": "12.300"
    }
  ],
  "format": { "duration": "12.400" }
}"#;

#[test]
fn parses_video_and_audio_streams() {
    let info = parse_probe_json(SAMPLE.as_bytes()).unwrap();
    assert_eq!((info.width, info.height), (1920, 1080));
    assert_eq!(info.fps, 30);
    assert_eq!(info.duration, 12.345);
    assert_eq!(info.frame_count, Some(370));
    assert_eq!(info.bit_rate, Some(4_500_000));
    assert_eq!(info.codec.as_deref(), Some("h264"));
    let audio = info.audio.unwrap();
    assert_eq!(audio.codec, "aac");
    assert_eq!(audio.sample_rate, 48000);
    assert_eq!(audio.channels, 2);
    assert_eq!(audio.bit_rate, 192_000);
}

#[test]
fn falls_back_to_container_duration_and_default_fps() {
    let json = r#"{"streams":[{"codec_type":"video","width":64,"height":48,"avg_frame_rate":"0/0"}],
                  "format":{"duration":"3.5"}}"#;
    let info = parse_probe_json(json.as_bytes()).unwrap();
    assert_eq!(info.fps, 30);
    assert_eq!(info.duration, 3.5);
    assert!(info.audio.is_none());
    assert!(info.frame_count.is_none());
}

#[test]
fn frame_rate_parsing() {
    assert_eq!(parse_frame_rate("25/1"), Some(25));
    assert_eq!(parse_frame_rate("24000/1001"), Some(24));
    assert_eq!(parse_frame_rate("0/0"), None);
    assert_eq!(parse_frame_rate("abc"), None);
}

#[test]
fn garbage_is_a_serde_error() {
    assert!(matches!(
        parse_probe_json(b"not json"),
        Err(MontageError::Serde(_))
    ));
}

#[test]
fn into_clip_rejects_unusable_sources() {
    let p = Path::new("x.mp4");
    let no_size = MediaInfo {
        duration: 1.0,
        ..MediaInfo::default()
    };
    assert!(no_size.into_clip(p).unwrap_err().is_recoverable());

    let no_duration = MediaInfo {
        width: 2,
        height: 2,
        ..MediaInfo::default()
    };
    assert!(no_duration.into_clip(p).unwrap_err().is_recoverable());

    let clip = parse_probe_json(SAMPLE.as_bytes())
        .unwrap()
        .into_clip(p)
        .unwrap();
    assert_eq!(clip.source.path(), Some(p));
    assert_eq!(clip.fps, 30);
    assert!(clip.has_audio());
    assert_eq!(clip.play_duration(), 12.345);
}

#[test]
fn empty_path_is_a_resource_error() {
    assert!(probe(Path::new("")).unwrap_err().is_recoverable());
}
