use super::*;

fn clip(path: &str, dur: f64) -> Clip {
    Clip::file(path).with_size(640, 360).with_fps(30).with_duration(dur)
}

#[test]
fn empty_input_is_a_configuration_error() {
    let err = concatenate(Vec::<Clip>::new()).unwrap_err();
    assert!(matches!(err, MontageError::Configuration(_)));
}

#[test]
fn all_invalid_input_is_a_configuration_error() {
    let err = concatenate(vec![Clip::file(""), clip("a.mp4", 0.0)]).unwrap_err();
    assert!(err.to_string().contains("no valid clips"));
}

#[test]
fn durations_sum_and_hints_come_from_first_valid() {
    let first = clip("a.mp4", 2.0).with_codec("h264");
    let second = clip("b.mp4", 10.0).with_size(1920, 1080).subclip(1.0, 4.0).unwrap();
    let tl = concatenate(vec![Clip::file(""), first, second]).unwrap();
    let joined = tl.as_concat().unwrap();
    assert_eq!(joined.clips.len(), 2);
    assert_eq!(joined.duration, 5.0);
    assert_eq!((joined.width, joined.height), (640, 360));
    assert_eq!(joined.codec.as_deref(), Some("h264"));
    assert!(!joined.has_audio);
}

#[test]
fn nested_concatenations_flatten() {
    let inner = concatenate(vec![clip("a.mp4", 1.0), clip("b.mp4", 2.0)]).unwrap();
    let Timeline::Concat(inner) = inner else {
        panic!("expected concat");
    };
    let outer = concatenate(vec![
        ConcatSource::from(inner),
        ConcatSource::from(clip("c.mp4", 3.0)),
    ])
    .unwrap();
    let joined = outer.as_concat().unwrap();
    assert_eq!(joined.clips.len(), 3);
    assert_eq!(joined.duration, 6.0);
}

#[test]
fn passthrough_only_for_single_plain_member() {
    let single = concatenate(vec![clip("a.mp4", 3.0)]).unwrap();
    assert!(single.as_concat().unwrap().is_passthrough());

    let trimmed = concatenate(vec![clip("a.mp4", 3.0).subclip(1.0, 2.0).unwrap()]).unwrap();
    assert!(!trimmed.as_concat().unwrap().is_passthrough());

    let two = concatenate(vec![clip("a.mp4", 3.0), clip("b.mp4", 3.0)]).unwrap();
    assert!(!two.as_concat().unwrap().is_passthrough());
}
