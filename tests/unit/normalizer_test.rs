//! Unit tests for the settings normalizer: clamping, coercion, legacy migration,
//! profile reconciliation and deep merge.

use achroma_reader::services::settings_normalizer::{
    apply_patch, coerce_number, is_legacy_shape, merge_patch, migrate_legacy, normalize,
    normalize_optional, to_value,
};
use achroma_reader::types::settings::{LegendStyle, Settings, DEFAULT_HEADING_FONT};
use rstest::rstest;
use serde_json::{json, Map, Value};

fn profile_with(field: &str, value: Value) -> Value {
    let mut profile = Map::new();
    profile.insert(field.to_string(), value);
    json!({
        "activeProfileId": "p",
        "profiles": { "p": Value::Object(profile) },
        "profilesOrder": ["p"],
    })
}

// ─── Clamping ───

#[rstest]
#[case("fontSize", json!(10), 24.0)]
#[case("fontSize", json!(999), 72.0)]
#[case("fontSize", json!("48"), 48.0)]
#[case("fontSize", json!("huge"), 36.0)]
#[case("fontSize", json!(null), 36.0)]
#[case("brightness", json!(0), 0.4)]
#[case("brightness", json!(0.85), 0.85)]
#[case("contrast", json!(5), 2.0)]
#[case("contrast", json!(0.2), 1.0)]
#[case("letterSpacing", json!(-1), -0.05)]
#[case("lineHeight", json!(true), 1.65)]
fn test_profile_numbers_are_clamped(#[case] field: &str, #[case] raw: Value, #[case] expected: f64) {
    let settings = normalize(&profile_with(field, raw));
    let profile = &settings.profiles["p"];
    let actual = match field {
        "fontSize" => profile.font_size,
        "brightness" => profile.brightness,
        "contrast" => profile.contrast,
        "letterSpacing" => profile.letter_spacing,
        "lineHeight" => profile.line_height,
        other => panic!("unexpected field {}", other),
    };
    assert!((actual - expected).abs() < 1e-9, "{}: {} != {}", field, actual, expected);
}

#[rstest]
#[case(json!(12), Some(12.0))]
#[case(json!("1.5"), Some(1.5))]
#[case(json!(" 7 "), Some(7.0))]
#[case(json!(""), None)]
#[case(json!("abc"), None)]
#[case(json!([1]), None)]
#[case(json!(0), Some(0.0))]
fn test_coerce_number(#[case] raw: Value, #[case] expected: Option<f64>) {
    assert_eq!(coerce_number(Some(&raw)), expected);
}

#[test]
fn test_feature_blocks_are_clamped() {
    let settings = normalize(&json!({
        "profiles": {"default": {}},
        "imageAdjustments": {"enabled": 1, "contrast": 9, "desaturate": 0},
        "readingMask": {"enabled": "yes", "height": 5, "opacity": 2},
        "colorLegend": {"enabled": true, "style": "pattern"},
    }));
    assert!(settings.image_adjustments.enabled);
    assert_eq!(settings.image_adjustments.contrast, 2.0);
    // Only an explicit `false` turns desaturation off.
    assert!(settings.image_adjustments.desaturate);
    assert!(settings.reading_mask.enabled);
    assert_eq!(settings.reading_mask.height, 80.0);
    assert_eq!(settings.reading_mask.opacity, 0.8);
    assert_eq!(settings.color_legend.style, LegendStyle::Pattern);
}

#[test]
fn test_unknown_legend_style_falls_back_to_text() {
    let settings = normalize(&json!({"colorLegend": {"enabled": true, "style": "emoji"}}));
    assert_eq!(settings.color_legend.style, LegendStyle::Text);
}

// ─── Totality ───

#[rstest]
#[case(json!(null))]
#[case(json!(42))]
#[case(json!("settings"))]
#[case(json!([1, 2, 3]))]
#[case(json!({"profiles": []}))]
#[case(json!({"profiles": {}, "profilesOrder": "nope"}))]
fn test_garbage_yields_defaults(#[case] raw: Value) {
    assert_eq!(normalize(&raw), Settings::default());
}

#[test]
fn test_normalize_optional_none_is_default() {
    assert_eq!(normalize_optional(None), Settings::default());
}

// ─── Legacy migration ───

#[test]
fn test_legacy_blob_is_wrapped_into_default_profile() {
    let legacy = json!({"enabled": true, "fontSize": 40, "brightness": 0.5, "contrast": 1.2, "adaptiveMode": false});
    assert!(is_legacy_shape(&legacy));
    let settings = normalize(&legacy);
    assert!(settings.enabled);
    assert!(!settings.adaptive_mode);
    assert_eq!(settings.active_profile_id, "default");
    assert_eq!(settings.profiles_order, vec!["default".to_string()]);
    let profile = &settings.profiles["default"];
    assert_eq!(profile.font_size, 40.0);
    assert_eq!(profile.brightness, 0.5);
    assert_eq!(profile.contrast, 1.2);
}

#[test]
fn test_migration_passes_through_migrated_input() {
    let current = to_value(&Settings::default());
    assert!(!is_legacy_shape(&current));
    assert_eq!(migrate_legacy(&current), current);
}

#[test]
fn test_migrated_blob_has_no_top_level_profile_fields() {
    let migrated = migrate_legacy(&json!({"fontSize": 30, "enabled": true}));
    assert!(migrated.get("fontSize").is_none());
    assert_eq!(migrated["enabled"], json!(true));
    assert_eq!(migrated["profilesOrder"], json!(["default"]));
}

// ─── Profiles ───

#[test]
fn test_unlisted_profiles_are_appended_to_order() {
    let settings = normalize(&json!({
        "activeProfileId": "b",
        "profiles": {"a": {"name": "A"}, "b": {"name": "B"}, "c": {"name": "C"}},
        "profilesOrder": ["b", "ghost"],
    }));
    assert_eq!(settings.profiles_order, vec!["b", "ghost", "a", "c"]);
    assert_eq!(settings.profiles.len(), 4);
    assert_eq!(settings.profiles["ghost"].font_size, 36.0);
    assert_eq!(settings.active_profile_id, "b");
}

#[test]
fn test_unknown_active_id_falls_back_to_first_in_order() {
    let settings = normalize(&json!({
        "activeProfileId": "missing",
        "profiles": {"x": {}, "y": {}},
        "profilesOrder": ["y", "x"],
    }));
    assert_eq!(settings.active_profile_id, "y");
}

#[test]
fn test_key_wins_over_embedded_id() {
    let settings = normalize(&json!({
        "profiles": {"work": {"id": "other", "name": "Work"}},
        "profilesOrder": ["work"],
    }));
    assert_eq!(settings.profiles["work"].id, "work");
}

#[test]
fn test_blank_profile_key_gets_generated_id() {
    let settings = normalize(&json!({"profiles": {"": {"name": "Nameless"}}}));
    assert_eq!(settings.profiles.len(), 1);
    let id = &settings.profiles_order[0];
    assert!(id.starts_with("profile-"));
    assert_eq!(settings.profiles[id].name, "Nameless");
}

#[test]
fn test_heading_font_rules() {
    let missing = normalize(&profile_with("fontFamily", json!("Arial")));
    assert_eq!(missing.profiles["p"].heading_font_family, DEFAULT_HEADING_FONT);

    let blank = normalize(&json!({
        "profiles": {"p": {"fontFamily": "Arial", "headingFontFamily": "  "}},
    }));
    assert_eq!(blank.profiles["p"].heading_font_family, "Arial");
}

// ─── Merge ───

#[test]
fn test_merge_patch_is_deep_and_arrays_replace() {
    let target = json!({"a": {"b": 1, "c": 2}, "list": [1, 2], "keep": true});
    let patch = json!({"a": {"b": 9}, "list": [3], "new": null});
    let merged = merge_patch(&target, &patch);
    assert_eq!(merged, json!({"a": {"b": 9, "c": 2}, "list": [3], "keep": true, "new": null}));
}

#[test]
fn test_merge_patch_ignores_non_object_patch() {
    let target = json!({"a": 1});
    assert_eq!(merge_patch(&target, &json!(5)), target);
}

#[test]
fn test_apply_patch_renormalizes() {
    let current = Settings::default();
    let next = apply_patch(&current, &json!({"profiles": {"default": {"fontSize": 100}}, "enabled": true}));
    assert!(next.enabled);
    assert_eq!(next.profiles["default"].font_size, 72.0);
    assert_eq!(next.profiles["default"].brightness, 0.7);
}

#[test]
fn test_to_value_uses_camel_case() {
    let value = to_value(&Settings::default());
    assert!(value.get("activeProfileId").is_some());
    assert!(value.get("profilesOrder").is_some());
    assert!(value["imageAdjustments"].get("contrast").is_some());
}
