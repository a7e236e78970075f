//! Property-based tests for CSS color parsing and formatting.

use achroma_reader::services::color_math::{
    color_to_css, first_meaningful_color, parse_color_value, pt_to_px, relative_luminance,
};
use achroma_reader::types::color::Color;
use proptest::prelude::*;

proptest! {
    #[test]
    fn formatted_colors_parse_back(r in any::<u8>(), g in any::<u8>(), b in any::<u8>(), a in 0.001f64..=1.0) {
        let color = Color::rgba(r, g, b, a);
        let parsed = parse_color_value(&color_to_css(&color)).expect("formatted color parses");
        prop_assert_eq!((parsed.r, parsed.g, parsed.b), (r, g, b));
        prop_assert!((parsed.a - a).abs() <= 0.0005 + f64::EPSILON);
    }

    #[test]
    fn hex_and_rgb_agree(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
        let hex = parse_color_value(&format!("#{:02x}{:02X}{:02x}", r, g, b));
        let rgb = parse_color_value(&format!("rgb({}, {}, {})", r, g, b));
        prop_assert_eq!(hex, Some(Color::rgb(r, g, b)));
        prop_assert_eq!(hex, rgb);
    }

    #[test]
    fn luminance_is_bounded_and_monotonic_in_gray(level in 0u8..255) {
        let darker = relative_luminance(&Color::rgb(level, level, level));
        let lighter = relative_luminance(&Color::rgb(level + 1, level + 1, level + 1));
        prop_assert!((0.0..=1.0).contains(&darker));
        prop_assert!(darker < lighter);
    }

    #[test]
    fn parsing_never_panics(input in "\\PC{0,24}") {
        if let Some(color) = parse_color_value(&input) {
            prop_assert!(color.a > 0.0 && color.a <= 1.0);
        }
    }

    #[test]
    fn chosen_background_is_never_negligible(alphas in prop::collection::vec(0.0f64..=1.0, 0..5)) {
        let candidates: Vec<Option<Color>> = alphas
            .iter()
            .map(|a| Some(Color::rgba(10, 20, 30, *a)))
            .collect();
        if let Some(chosen) = first_meaningful_color(&candidates) {
            prop_assert!(chosen.a > 0.05);
            if chosen.a < 0.75 {
                prop_assert!(alphas.iter().all(|a| *a < 0.75));
            }
        }
    }

    #[test]
    fn px_conversion_rounds(pt in 24.0f64..=72.0) {
        let px = pt_to_px(pt) as f64;
        prop_assert!((px - pt * 4.0 / 3.0).abs() <= 0.5);
    }
}
