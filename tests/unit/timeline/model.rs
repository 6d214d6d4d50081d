use super::*;

fn clip10() -> Clip {
    Clip::file("a.mp4")
        .with_size(640, 360)
        .with_fps(25)
        .with_duration(10.0)
}

#[test]
fn trim_rejects_empty_or_negative_windows() {
    assert!(Trim::new(1.0, 4.0).is_ok());
    assert!(matches!(
        Trim::new(4.0, 4.0),
        Err(MontageError::Configuration(_))
    ));
    assert!(Trim::new(-1.0, 4.0).is_err());
    assert!(Trim::new(0.0, f64::NAN).is_err());
}

#[test]
fn subclip_clamps_to_source_bounds() {
    let c = clip10().subclip(-2.0, 50.0).unwrap();
    let t = c.trim.unwrap();
    assert_eq!(t.start(), 0.0);
    assert_eq!(t.end(), 10.0);
    assert_eq!(c.play_duration(), 10.0);
}

#[test]
fn subclip_of_subclip_is_relative() {
    let c = clip10().subclip(2.0, 8.0).unwrap().subclip(1.0, 3.0).unwrap();
    let t = c.trim.unwrap();
    assert_eq!(t.start(), 3.0);
    assert_eq!(t.end(), 5.0);
    assert_eq!(c.frame_count(), 50);
}

#[test]
fn subclip_with_inverted_range_fails() {
    assert!(clip10().subclip(5.0, 5.0).is_err());
    assert!(clip10().subclip(12.0, 20.0).is_err());
}

#[test]
fn opacity_is_clamped_on_write() {
    assert_eq!(Placement::new().with_opacity(1.7).opacity(), 1.0);
    assert_eq!(Placement::new().with_opacity(-0.3).opacity(), 0.0);
    assert_eq!(Placement::new().with_opacity(f64::NAN).opacity(), 1.0);
    assert_eq!(Placement::new().opacity(), 1.0);
}

#[test]
fn animations_keep_one_per_kind() {
    let p = Placement::new()
        .animate(AnimationParams::Scale(ScaleAnim {
            from: 1.0,
            to: 2.0,
            start: 0.0,
            duration: 1.0,
        }))
        .animate(AnimationParams::Scale(ScaleAnim {
            from: 1.0,
            to: 3.0,
            start: 0.0,
            duration: 1.0,
        }));
    assert_eq!(p.animations.scale.unwrap().to, 3.0);
    assert!(p.animations.transforms());
    assert!(p.animations.position.is_none());
}

#[test]
fn composite_duration_is_max_item_end() {
    let comp = Composite {
        items: vec![
            CompositeItem::new(clip10(), Placement::new()),
            CompositeItem::new(clip10(), Placement::new().start_at(4.0).lasting(3.0)),
            CompositeItem::new(clip10().subclip(0.0, 2.0).unwrap(), Placement::new().start_at(9.0)),
        ],
        ..Composite::default()
    };
    assert_eq!(comp.duration(), 11.0);
}

#[test]
fn auto_canvas_covers_every_item() {
    let comp = Composite {
        items: vec![
            CompositeItem::new(clip10(), Placement::new()),
            CompositeItem::new(clip10(), Placement::new().at(100, 50).size(320, 0)),
            CompositeItem::new(clip10(), Placement::new().at(-200, 0)),
        ],
        ..Composite::default()
    };
    assert_eq!(comp.canvas(), Size::new(640, 410));
}

#[test]
fn frame_rate_falls_back_to_first_known() {
    let mut comp = Composite {
        items: vec![CompositeItem::new(Clip::file("x.mp4"), Placement::new())],
        ..Composite::default()
    };
    assert_eq!(comp.frame_rate(30), 30);
    comp.items.push(CompositeItem::new(clip10(), Placement::new()));
    assert_eq!(comp.frame_rate(30), 25);
    comp.fps = 60;
    assert_eq!(comp.frame_rate(30), 60);
}

#[test]
fn unresolvable_sources() {
    assert!(!Clip::file("").is_resolvable());
    assert!(!Clip::color(" ", 10, 10, 1.0).is_resolvable());
    assert!(Clip::color("red", 10, 10, 1.0).is_resolvable());
}

#[test]
fn verify_source_reports_missing_file_as_resource() {
    let err = Clip::file("target/montage-tests/definitely-missing.mp4")
        .verify_source()
        .unwrap_err();
    assert!(err.is_recoverable());
    assert!(Clip::color("red", 2, 2, 1.0).verify_source().is_ok());
}

#[test]
fn custom_filters_are_runtime_only() {
    let clip = clip10().with_custom_filter(CustomFilter::new("zero-red", |px| px[0] = 0));
    let json = serde_json::to_string(&clip).unwrap();
    let back: Clip = serde_json::from_str(&json).unwrap();
    assert!(back.custom_filters.is_empty());

    let mut px = [9u8, 8, 7, 6];
    clip.custom_filters[0].apply(&mut px);
    assert_eq!(px, [0, 8, 7, 6]);
}

#[test]
fn timeline_json_is_tagged_by_kind() {
    let json = r#"{
        "kind": "composite",
        "width": 1280,
        "height": 720,
        "items": [
            { "clip": { "source": { "file": "in.mp4" }, "duration": 4.0 },
              "placement": { "x": { "percent": 50.0 }, "opacity": 3.0 } }
        ],
        "overlays": [
            { "kind": { "type": "text", "text": "hi" }, "placement": { "layer": 2 } }
        ]
    }"#;
    let tl = Timeline::from_json_str(json).unwrap();
    let comp = tl.as_composite().unwrap();
    assert_eq!(comp.items[0].placement.x, Coord::Percent(50.0));
    assert_eq!(comp.items[0].placement.opacity(), 1.0);
    assert_eq!(comp.overlays[0].placement.layer, 2);
    assert_eq!(tl.duration(), 4.0);

    let err = Timeline::from_json_str("{").unwrap_err();
    assert!(matches!(err, MontageError::Serde(_)));
}
