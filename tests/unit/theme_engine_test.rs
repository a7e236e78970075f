//! Unit tests for theme detection and palette derivation.

use std::collections::BTreeMap;

use achroma_reader::services::color_math::{parse_color_value, relative_luminance};
use achroma_reader::services::theme_engine::{
    choose_theme_mode, default_palette, detect_theme, detect_theme_or_default, ModeSignals,
};
use achroma_reader::types::errors::HostError;
use achroma_reader::types::theme::{ElementStyle, PageStyleSnapshot, ThemeMode};
use rstest::rstest;

fn element(background: Option<&str>, color: Option<&str>) -> ElementStyle {
    ElementStyle {
        background_color: background.map(str::to_string),
        color: color.map(str::to_string),
        ..Default::default()
    }
}

fn page(body: ElementStyle) -> PageStyleSnapshot {
    PageStyleSnapshot {
        body: Some(body),
        ..Default::default()
    }
}

#[rstest]
#[case("rgb(18, 18, 18)", "rgb(240, 240, 240)", ThemeMode::Dark)]
#[case("#ffffff", "#222", ThemeMode::Light)]
#[case("rgb(30, 40, 50)", "rgb(20, 20, 20)", ThemeMode::Dark)]
#[case("rgb(250, 250, 250)", "rgb(255, 255, 255)", ThemeMode::Light)]
fn test_mode_from_luminance(#[case] bg: &str, #[case] fg: &str, #[case] expected: ThemeMode) {
    let theme = detect_theme(&page(element(Some(bg), Some(fg))));
    assert_eq!(theme.mode, expected);
}

#[rstest]
#[case("data-theme", "dark", ThemeMode::Dark)]
#[case("data-color-mode", "night", ThemeMode::Dark)]
#[case("data-bs-theme", "light", ThemeMode::Light)]
fn test_attribute_beats_luminance(#[case] name: &str, #[case] value: &str, #[case] expected: ThemeMode) {
    let mut attributes = BTreeMap::new();
    attributes.insert(name.to_string(), value.to_string());
    let snapshot = PageStyleSnapshot {
        root: ElementStyle {
            attributes,
            ..Default::default()
        },
        // Luminance alone would say the opposite for the dark cases.
        body: Some(element(Some("#ffffff"), Some("#000000"))),
        ..Default::default()
    };
    assert_eq!(detect_theme(&snapshot).mode, expected);
}

#[test]
fn test_dark_class_on_body() {
    let mut body = element(Some("#fafafa"), Some("#111"));
    body.class_list = vec!["layout".to_string(), "Dark-Mode".to_string()];
    assert_eq!(detect_theme(&page(body)).mode, ThemeMode::Dark);
}

#[test]
fn test_color_scheme_meta_is_used_last() {
    let snapshot = PageStyleSnapshot {
        body: Some(element(None, None)),
        color_scheme_meta: Some("dark".to_string()),
        ..Default::default()
    };
    assert_eq!(detect_theme(&snapshot).mode, ThemeMode::Dark);
}

#[test]
fn test_ambiguous_color_scheme_is_ignored() {
    let mut body = element(Some("#ffffff"), Some("#000000"));
    body.color_scheme = Some("light dark".to_string());
    assert_eq!(detect_theme(&page(body)).mode, ThemeMode::Light);
}

#[test]
fn test_prefers_dark_is_the_last_signal() {
    let snapshot = PageStyleSnapshot {
        body: Some(element(None, None)),
        prefers_dark: Some(true),
        ..Default::default()
    };
    assert_eq!(detect_theme(&snapshot).mode, ThemeMode::Dark);
}

#[test]
fn test_mid_luminance_without_text_uses_preference() {
    let signals = ModeSignals {
        background_luminance: Some(0.5),
        ..Default::default()
    };
    assert_eq!(choose_theme_mode(&signals), ThemeMode::Light);
    let signals = ModeSignals {
        background_luminance: Some(0.5),
        prefers_dark: true,
        ..Default::default()
    };
    assert_eq!(choose_theme_mode(&signals), ThemeMode::Dark);
}

#[test]
fn test_palette_overrides_page_colors() {
    let snapshot = PageStyleSnapshot {
        body: Some(element(Some("rgb(20, 20, 20)"), Some("#eeeeee"))),
        link_color: Some("rgba(0, 0, 238, 0.5)".to_string()),
        ..Default::default()
    };
    let theme = detect_theme(&snapshot);
    assert_eq!(theme.palette.background, "rgb(20, 20, 20)");
    assert_eq!(theme.palette.text_color, "rgb(238, 238, 238)");
    assert_eq!(theme.palette.link_color, "rgba(0, 0, 238, 0.5)");
    assert_eq!(theme.palette.panel_background, default_palette(ThemeMode::Dark).panel_background);
}

#[test]
fn test_translucent_body_loses_to_opaque_root() {
    let snapshot = PageStyleSnapshot {
        root: element(Some("rgb(10, 10, 10)"), None),
        body: Some(element(Some("rgba(255, 255, 255, 0.3)"), Some("#fff"))),
        ..Default::default()
    };
    assert_eq!(detect_theme(&snapshot).palette.background, "rgb(10, 10, 10)");
}

#[test]
fn test_failed_snapshot_uses_light_default() {
    let theme = detect_theme_or_default(Err(HostError::Detached));
    assert_eq!(theme.mode, ThemeMode::Light);
    assert_eq!(theme.palette, default_palette(ThemeMode::Light));
}

#[test]
fn test_empty_page_is_light_default() {
    let theme = detect_theme(&PageStyleSnapshot::default());
    assert_eq!(theme.mode, ThemeMode::Light);
    assert_eq!(theme.palette, default_palette(ThemeMode::Light));
}

#[rstest]
#[case("#000", 0.0)]
#[case("#fff", 1.0)]
fn test_luminance_extremes(#[case] css: &str, #[case] expected: f64) {
    let color = parse_color_value(css).unwrap();
    assert!((relative_luminance(&color) - expected).abs() < 1e-9);
}
