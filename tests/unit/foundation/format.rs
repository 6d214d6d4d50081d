use super::*;

#[test]
fn fmt3_is_fixed_precision() {
    assert_eq!(fmt3(2.0), "2.000");
    assert_eq!(fmt3(1.23456), "1.235");
    assert_eq!(fmt3(-0.0001), "0.000");
    assert_eq!(fmt3(-1.5), "-1.500");
    assert_eq!(fmt2(0.5), "0.50");
}

#[test]
fn escape_text_handles_engine_specials() {
    assert_eq!(escape_text("it's 50%"), "it\\'s 50\\%");
    assert_eq!(escape_text("a:b\\c"), "a\\:b\\\\c");
    assert_eq!(escape_text("plain"), "plain");
}

#[test]
fn normalize_color_rewrites_hex_only() {
    assert_eq!(normalize_color("#ff8800"), "0xff8800");
    assert_eq!(normalize_color("white"), "white");
    assert_eq!(normalize_color("0x112233"), "0x112233");
}

#[test]
fn filter_paths_use_forward_slashes_and_escaped_colons() {
    let p = Path::new("C:\\subs\\a.srt");
    assert_eq!(escape_filter_path(p), "C\\:/subs/a.srt");
    assert_eq!(escape_font_path("C:/Windows/Fonts/arial.ttf"), "C\\\\:/Windows/Fonts/arial.ttf");
}

#[test]
fn ass_color_swaps_to_bgr() {
    assert_eq!(ass_color("#ff8000"), "&H000080FF");
    assert_eq!(ass_color("0x112233"), "&H00332211");
    assert_eq!(ass_color("Yellow"), "&H0000FFFF");
    assert_eq!(ass_color("&H00FFFFFF"), "&H00FFFFFF");
}
