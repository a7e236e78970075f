//! Property-based tests for the settings normalizer.
//!
//! For arbitrary input (garbage JSON, legacy blobs, partially valid multi-profile
//! blobs) normalization must be total, idempotent, range-clamped, and produce a
//! profile order covering exactly the profile set with a resolvable active id.

use std::collections::BTreeSet;

use achroma_reader::services::settings_normalizer::{merge_patch, normalize, to_value};
use achroma_reader::types::settings::{
    Settings, BRIGHTNESS_RANGE, CONTRAST_RANGE, FONT_SIZE_RANGE, IMAGE_CONTRAST_RANGE,
    LETTER_SPACING_RANGE, LINE_HEIGHT_RANGE, MASK_HEIGHT_RANGE, MASK_OPACITY_RANGE,
};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const PROFILE_KEYS: &[&str] = &[
    "id",
    "name",
    "fontSize",
    "brightness",
    "contrast",
    "fontFamily",
    "headingFontFamily",
    "boldText",
    "letterSpacing",
    "lineHeight",
];

const FEATURE_KEYS: &[&str] = &["enabled", "contrast", "desaturate", "annotate", "height", "opacity", "style"];

// --- Strategies ---

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|i| json!(i)),
        (-500.0f64..500.0).prop_map(|f| json!(f)),
        "[0-9]{1,3}(\\.[0-9]{1,2})?".prop_map(Value::String),
        "[ a-z]{0,6}".prop_map(Value::String),
    ]
}

fn arb_json() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(3, 32, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-zA-Z]{1,10}", inner), 0..5)
                .prop_map(|pairs| Value::Object(pairs.into_iter().collect())),
        ]
    })
}

fn arb_object(keys: &'static [&'static str]) -> impl Strategy<Value = Value> {
    prop::collection::vec((prop::sample::select(keys), arb_leaf()), 0..keys.len()).prop_map(|pairs| {
        let mut map = Map::new();
        for (key, value) in pairs {
            map.insert(key.to_string(), value);
        }
        Value::Object(map)
    })
}

fn arb_profiles() -> impl Strategy<Value = Value> {
    prop::collection::vec(("[a-c ]{0,2}", arb_object(PROFILE_KEYS)), 0..4)
        .prop_map(|pairs| Value::Object(pairs.into_iter().collect()))
}

fn arb_order() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec(
            prop_oneof!["[a-d]{1,2}".prop_map(Value::String), arb_leaf()],
            0..5
        )
        .prop_map(Value::Array),
        arb_leaf(),
    ]
}

/// Settings-shaped blobs: every top-level key is optional and may hold garbage.
fn arb_settings_blob() -> impl Strategy<Value = Value> {
    (
        prop::option::of(arb_profiles()),
        prop::option::of(arb_order()),
        prop::option::of(prop_oneof!["[a-c]{1,2}".prop_map(Value::String), arb_leaf()]),
        prop::option::of(arb_leaf()),
        prop::option::of(arb_object(FEATURE_KEYS)),
        prop::option::of(arb_object(FEATURE_KEYS)),
        prop::option::of(arb_object(PROFILE_KEYS)),
    )
        .prop_map(|(profiles, order, active, enabled, images, mask, legacy)| {
            let mut root = match legacy {
                // Legacy blobs carry profile fields at the top level.
                Some(Value::Object(fields)) => fields,
                _ => Map::new(),
            };
            let mut put = |key: &str, value: Option<Value>| {
                if let Some(value) = value {
                    root.insert(key.to_string(), value);
                }
            };
            put("profiles", profiles);
            put("profilesOrder", order);
            put("activeProfileId", active);
            put("enabled", enabled);
            put("imageAdjustments", images);
            put("readingMask", mask);
            Value::Object(root)
        })
}

fn arb_input() -> impl Strategy<Value = Value> {
    prop_oneof![arb_json(), arb_settings_blob()]
}

// --- Invariant checks ---

fn assert_invariants(settings: &Settings) -> Result<(), TestCaseError> {
    prop_assert!(!settings.profiles.is_empty());
    prop_assert!(settings.profiles.contains_key(&settings.active_profile_id));

    let ordered: BTreeSet<&String> = settings.profiles_order.iter().collect();
    let keys: BTreeSet<&String> = settings.profiles.keys().collect();
    prop_assert_eq!(ordered.len(), settings.profiles_order.len(), "order has duplicates");
    prop_assert_eq!(ordered, keys);

    for (key, profile) in &settings.profiles {
        prop_assert_eq!(key, &profile.id);
        prop_assert!(!profile.id.trim().is_empty());
        prop_assert!(FONT_SIZE_RANGE.contains(profile.font_size));
        prop_assert!(BRIGHTNESS_RANGE.contains(profile.brightness));
        prop_assert!(CONTRAST_RANGE.contains(profile.contrast));
        prop_assert!(LETTER_SPACING_RANGE.contains(profile.letter_spacing));
        prop_assert!(LINE_HEIGHT_RANGE.contains(profile.line_height));
        prop_assert!(!profile.font_family.trim().is_empty());
        prop_assert!(!profile.heading_font_family.trim().is_empty());
    }
    prop_assert!(IMAGE_CONTRAST_RANGE.contains(settings.image_adjustments.contrast));
    prop_assert!(MASK_HEIGHT_RANGE.contains(settings.reading_mask.height));
    prop_assert!(MASK_OPACITY_RANGE.contains(settings.reading_mask.opacity));
    Ok(())
}

proptest! {
    #[test]
    fn normalize_is_total_and_satisfies_invariants(raw in arb_input()) {
        let settings = normalize(&raw);
        assert_invariants(&settings)?;
    }

    #[test]
    fn normalize_is_idempotent(raw in arb_input()) {
        let once = normalize(&raw);
        let twice = normalize(&to_value(&once));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn patches_keep_invariants(base in arb_settings_blob(), patch in arb_settings_blob()) {
        let current = normalize(&base);
        let next = normalize(&merge_patch(&to_value(&current), &patch));
        assert_invariants(&next)?;
    }

    #[test]
    fn explicit_profile_values_inside_range_survive(
        font in 24.0f64..=72.0,
        brightness in 0.4f64..=1.0,
        contrast in 1.0f64..=2.0,
    ) {
        let settings = normalize(&json!({
            "profiles": {"p": {"fontSize": font, "brightness": brightness, "contrast": contrast}},
        }));
        let profile = &settings.profiles["p"];
        prop_assert_eq!(profile.font_size, font);
        prop_assert_eq!(profile.brightness, brightness);
        prop_assert_eq!(profile.contrast, contrast);
    }
}
