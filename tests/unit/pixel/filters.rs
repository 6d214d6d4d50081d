use super::*;

fn run(filter: ColorFilter, px: [u8; 4]) -> [u8; 4] {
    let mut px = px;
    apply_builtin(filter, &mut px);
    px
}

#[test]
fn builtin_values() {
    assert_eq!(run(ColorFilter::Invert, [10, 20, 30, 255]), [245, 235, 225, 255]);
    assert_eq!(run(ColorFilter::Grayscale, [255, 0, 0, 255]), [76, 76, 76, 255]);
    assert_eq!(run(ColorFilter::Sepia, [255, 255, 255, 255]), [255, 255, 238, 255]);
    assert_eq!(run(ColorFilter::Sepia, [0, 0, 0, 7]), [0, 0, 0, 7]);
    assert_eq!(run(ColorFilter::Edge, [100, 100, 100, 1]), [255, 255, 255, 1]);
    assert_eq!(run(ColorFilter::Edge, [85, 85, 85, 1]), [0, 0, 0, 1]);
    assert_eq!(run(ColorFilter::Edge, [200, 200, 200, 1]), [0, 0, 0, 1]);
}

#[test]
fn alpha_is_never_touched() {
    for f in [
        ColorFilter::Invert,
        ColorFilter::Grayscale,
        ColorFilter::Sepia,
        ColorFilter::Edge,
    ] {
        for a in [0u8, 13, 128, 255] {
            assert_eq!(run(f, [90, 140, 200, a])[3], a, "{f:?}");
        }
    }
}

#[test]
fn steps_compose_per_pixel_in_order() {
    let t = PixelTransform::new()
        .then(ColorFilter::Invert)
        .then(ColorFilter::Grayscale);
    let mut buf = [10, 20, 30, 255, 0, 0, 0, 0];
    t.apply(&mut buf);
    assert_eq!(buf, [236, 236, 236, 255, 255, 255, 255, 0]);
}

#[test]
fn custom_steps_run_after_builtins() {
    let clip = Clip::file("a.mp4")
        .with_filter(ColorFilter::Invert)
        .with_custom_filter(CustomFilter::new("zero-red", |px: &mut [u8]| px[0] = 0));
    let t = PixelTransform::for_clip(&clip);
    assert!(!t.is_identity());
    let mut buf = [10, 20, 30, 40];
    t.apply(&mut buf);
    assert_eq!(buf, [0, 235, 225, 40]);
}

#[test]
fn partial_trailing_pixel_is_left_alone() {
    let t = PixelTransform::new().then(ColorFilter::Invert);
    let mut buf = [0, 0, 0, 0, 9, 9];
    t.apply(&mut buf);
    assert_eq!(buf, [255, 255, 255, 0, 9, 9]);
    assert!(PixelTransform::new().is_identity());
}
