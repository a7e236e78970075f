//! Settings Normalizer — turns any stored or user-supplied blob into canonical [`Settings`].
//!
//! Normalization is total: `null`, garbage-typed fields, partial feature blocks and the
//! legacy single-profile shape all produce a fully populated, range-clamped structure.
//! Each field is owned by one reducer rule that performs its own coercion and clamp, so
//! the range constants in [`crate::types::settings`] are the single source of truth.

use std::collections::{BTreeMap, HashSet};

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::types::settings::{
    ColorLegendSettings, CustomFonts, ImageAdjustments, LegendStyle, OnboardingState, Profile,
    Range, ReadingMaskSettings, Settings, BRIGHTNESS_RANGE, CONTRAST_RANGE, DEFAULT_PROFILE_ID,
    DEFAULT_PROFILE_NAME, FONT_SIZE_RANGE, IMAGE_CONTRAST_RANGE, LETTER_SPACING_RANGE,
    LINE_HEIGHT_RANGE, MASK_HEIGHT_RANGE, MASK_OPACITY_RANGE,
};

/// A numeric field: coerced, defaulted individually, then clamped.
pub struct NumberRule<T> {
    pub key: &'static str,
    pub range: Range,
    pub get: fn(&T) -> f64,
    pub set: fn(&mut T, f64),
}

/// A boolean field: missing keeps the default, present values are coerced.
pub struct BoolRule<T> {
    pub key: &'static str,
    pub coerce: fn(&Value) -> bool,
    pub set: fn(&mut T, bool),
}

pub const PROFILE_NUMBER_RULES: &[NumberRule<Profile>] = &[
    NumberRule { key: "fontSize", range: FONT_SIZE_RANGE, get: |p| p.font_size, set: |p, v| p.font_size = v },
    NumberRule { key: "brightness", range: BRIGHTNESS_RANGE, get: |p| p.brightness, set: |p, v| p.brightness = v },
    NumberRule { key: "contrast", range: CONTRAST_RANGE, get: |p| p.contrast, set: |p, v| p.contrast = v },
    NumberRule { key: "letterSpacing", range: LETTER_SPACING_RANGE, get: |p| p.letter_spacing, set: |p, v| p.letter_spacing = v },
    NumberRule { key: "lineHeight", range: LINE_HEIGHT_RANGE, get: |p| p.line_height, set: |p, v| p.line_height = v },
];

const PROFILE_BOOL_RULES: &[BoolRule<Profile>] = &[
    BoolRule { key: "boldText", coerce: truthy, set: |p, v| p.bold_text = v },
];

pub const IMAGE_NUMBER_RULES: &[NumberRule<ImageAdjustments>] = &[
    NumberRule { key: "contrast", range: IMAGE_CONTRAST_RANGE, get: |i| i.contrast, set: |i, v| i.contrast = v },
];

const IMAGE_BOOL_RULES: &[BoolRule<ImageAdjustments>] = &[
    BoolRule { key: "enabled", coerce: truthy, set: |i, v| i.enabled = v },
    BoolRule { key: "desaturate", coerce: not_false, set: |i, v| i.desaturate = v },
    BoolRule { key: "annotate", coerce: truthy, set: |i, v| i.annotate = v },
];

pub const CUSTOM_FONT_NUMBER_RULES: &[NumberRule<CustomFonts>] = &[
    NumberRule { key: "letterSpacing", range: LETTER_SPACING_RANGE, get: |c| c.letter_spacing, set: |c, v| c.letter_spacing = v },
    NumberRule { key: "lineHeight", range: LINE_HEIGHT_RANGE, get: |c| c.line_height, set: |c, v| c.line_height = v },
];

const CUSTOM_FONT_BOOL_RULES: &[BoolRule<CustomFonts>] = &[
    BoolRule { key: "boldText", coerce: truthy, set: |c, v| c.bold_text = v },
];

pub const READING_MASK_NUMBER_RULES: &[NumberRule<ReadingMaskSettings>] = &[
    NumberRule { key: "height", range: MASK_HEIGHT_RANGE, get: |m| m.height, set: |m, v| m.height = v },
    NumberRule { key: "opacity", range: MASK_OPACITY_RANGE, get: |m| m.opacity, set: |m, v| m.opacity = v },
];

const READING_MASK_BOOL_RULES: &[BoolRule<ReadingMaskSettings>] = &[
    BoolRule { key: "enabled", coerce: truthy, set: |m, v| m.enabled = v },
];

// ─── Coercion ───

/// JavaScript-style truthiness of a JSON value.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |v| v != 0.0 && !v.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn not_false(value: &Value) -> bool {
    !matches!(value, Value::Bool(false))
}

/// Coerces numbers and numeric strings; everything else is "no value".
///
/// An explicit `0` is a value, not a request for the default.
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Returns the value when it is a string with visible content.
pub fn non_blank(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn apply_rules<T>(
    target: &mut T,
    source: Option<&Map<String, Value>>,
    numbers: &[NumberRule<T>],
    bools: &[BoolRule<T>],
) {
    for rule in numbers {
        let fallback = (rule.get)(target);
        let raw = source.and_then(|m| m.get(rule.key));
        let value = coerce_number(raw).unwrap_or(fallback);
        (rule.set)(target, rule.range.clamp(value));
    }
    for rule in bools {
        if let Some(raw) = source.and_then(|m| m.get(rule.key)) {
            (rule.set)(target, (rule.coerce)(raw));
        }
    }
}

// ─── Merge ───

/// Deep-merges `patch` over `target`.
///
/// Sequences replace, plain objects merge recursively, every other value (including
/// `null`) overwrites.
pub fn merge_patch(target: &Value, patch: &Value) -> Value {
    let Value::Object(patch_map) = patch else {
        return target.clone();
    };
    let mut output = match target {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    for (key, value) in patch_map {
        let merged = match value {
            Value::Object(_) => {
                let base = output
                    .get(key)
                    .filter(|v| v.is_object())
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                merge_patch(&base, value)
            }
            other => other.clone(),
        };
        output.insert(key.clone(), merged);
    }
    Value::Object(output)
}

// ─── Profiles ───

/// Generates a fresh, unique profile id.
pub fn generate_profile_id() -> String {
    format!("profile-{}", Uuid::new_v4())
}

fn ensure_profile_id(value: Option<&Value>, fallback_id: &str) -> String {
    if let Some(id) = non_blank(value) {
        return id.to_string();
    }
    if !fallback_id.trim().is_empty() {
        return fallback_id.to_string();
    }
    generate_profile_id()
}

/// Normalizes one profile. Missing or invalid fields fall back individually.
pub fn normalize_profile(raw: &Value, fallback_id: &str) -> Profile {
    let source = raw.as_object();
    let field = |key: &str| source.and_then(|m| m.get(key));

    let mut profile = Profile::default();
    apply_rules(&mut profile, source, PROFILE_NUMBER_RULES, PROFILE_BOOL_RULES);

    profile.id = ensure_profile_id(field("id"), fallback_id);
    if let Some(name) = non_blank(field("name")) {
        profile.name = name.to_string();
    }
    if let Some(family) = non_blank(field("fontFamily")) {
        profile.font_family = family.to_string();
    }
    match field("headingFontFamily") {
        None => {}
        Some(heading) => {
            profile.heading_font_family = non_blank(Some(heading))
                .map(str::to_string)
                .unwrap_or_else(|| profile.font_family.clone());
        }
    }
    profile
}

/// Normalizes a profile stored under `key`; the key is authoritative for the id.
fn normalize_keyed_profile(source: Option<&Value>, key: &str) -> Profile {
    let mut shell = match source {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    shell.insert("id".to_string(), Value::String(key.to_string()));
    normalize_profile(&Value::Object(shell), key)
}

// ─── Legacy ───

const LEGACY_PROFILE_KEYS: &[&str] = &["fontSize", "brightness", "contrast"];

/// True when `raw` predates multi-profile settings.
pub fn is_legacy_shape(raw: &Value) -> bool {
    !matches!(raw.get("profiles"), Some(Value::Object(_)))
}

/// Wraps a legacy single-profile blob into the multi-profile structure.
///
/// Already-migrated input passes through unchanged. Non-object input becomes an
/// empty legacy blob.
pub fn migrate_legacy(raw: &Value) -> Value {
    if !is_legacy_shape(raw) {
        return raw.clone();
    }
    let source = raw.as_object().cloned().unwrap_or_default();
    let profile = normalize_profile(
        &json!({
            "id": DEFAULT_PROFILE_ID,
            "name": DEFAULT_PROFILE_NAME,
            "fontSize": source.get("fontSize").cloned().unwrap_or(Value::Null),
            "brightness": source.get("brightness").cloned().unwrap_or(Value::Null),
            "contrast": source.get("contrast").cloned().unwrap_or(Value::Null),
        }),
        DEFAULT_PROFILE_ID,
    );
    if !source.is_empty() {
        tracing::debug!(target: "achroma_reader", "migrating legacy single-profile settings");
    }

    let mut migrated: Map<String, Value> = source
        .into_iter()
        .filter(|(key, _)| {
            !LEGACY_PROFILE_KEYS.contains(&key.as_str())
                && key != "profiles"
                && key != "profilesOrder"
                && key != "activeProfileId"
        })
        .collect();
    migrated.insert("activeProfileId".into(), json!(DEFAULT_PROFILE_ID));
    let mut profiles = Map::new();
    profiles.insert(
        DEFAULT_PROFILE_ID.to_string(),
        serde_json::to_value(&profile).unwrap_or(Value::Null),
    );
    migrated.insert("profiles".into(), Value::Object(profiles));
    migrated.insert("profilesOrder".into(), json!([DEFAULT_PROFILE_ID]));
    Value::Object(migrated)
}

// ─── Settings ───

fn section<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    root.get(key).and_then(Value::as_object)
}

fn bool_or(root: &Map<String, Value>, key: &str, default: bool) -> bool {
    root.get(key).map_or(default, truthy)
}

struct Reconciled {
    profiles: BTreeMap<String, Profile>,
    order: Vec<String>,
}

/// Builds the profile set: explicitly ordered ids first, then unlisted keys in
/// insertion order.
fn reconcile_profiles(root: &Map<String, Value>) -> Reconciled {
    let empty = Map::new();
    let available = section(root, "profiles").unwrap_or(&empty);

    let requested: Vec<String> = match root.get("profilesOrder") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => available.keys().cloned().collect(),
    };

    let mut result = Reconciled {
        profiles: BTreeMap::new(),
        order: Vec::new(),
    };
    let mut visited: HashSet<String> = HashSet::new();
    let mut ensure = |key: &str, result: &mut Reconciled| {
        if !visited.insert(key.to_string()) {
            return;
        }
        let profile = normalize_keyed_profile(available.get(key), key);
        if !result.profiles.contains_key(&profile.id) {
            result.order.push(profile.id.clone());
        }
        result.profiles.insert(profile.id.clone(), profile);
    };

    for key in &requested {
        ensure(key, &mut result);
    }
    for key in available.keys() {
        ensure(key, &mut result);
    }

    if result.profiles.is_empty() {
        let profile = Profile::default();
        result.order.push(profile.id.clone());
        result.profiles.insert(profile.id.clone(), profile);
    }
    result
}

fn normalize_image_adjustments(root: &Map<String, Value>) -> ImageAdjustments {
    let mut block = ImageAdjustments::default();
    apply_rules(&mut block, section(root, "imageAdjustments"), IMAGE_NUMBER_RULES, IMAGE_BOOL_RULES);
    block
}

fn normalize_custom_fonts(root: &Map<String, Value>) -> CustomFonts {
    let source = section(root, "customFonts");
    let mut block = CustomFonts::default();
    apply_rules(&mut block, source, CUSTOM_FONT_NUMBER_RULES, CUSTOM_FONT_BOOL_RULES);
    if let Some(body) = non_blank(source.and_then(|m| m.get("body"))) {
        block.body = body.to_string();
    }
    if let Some(heading) = non_blank(source.and_then(|m| m.get("heading"))) {
        block.heading = heading.to_string();
    }
    block
}

fn normalize_color_legend(root: &Map<String, Value>) -> ColorLegendSettings {
    let source = section(root, "colorLegend");
    let field = |key: &str| source.and_then(|m| m.get(key));
    ColorLegendSettings {
        enabled: field("enabled").map_or(false, truthy),
        style: match field("style").and_then(Value::as_str) {
            Some("pattern") => LegendStyle::Pattern,
            _ => LegendStyle::Text,
        },
    }
}

fn normalize_reading_mask(root: &Map<String, Value>) -> ReadingMaskSettings {
    let mut block = ReadingMaskSettings::default();
    apply_rules(&mut block, section(root, "readingMask"), READING_MASK_NUMBER_RULES, READING_MASK_BOOL_RULES);
    block
}

fn normalize_onboarding(root: &Map<String, Value>) -> OnboardingState {
    OnboardingState {
        completed: section(root, "onboarding")
            .and_then(|m| m.get("completed"))
            .map_or(false, truthy),
    }
}

/// Normalizes an arbitrary JSON value into canonical settings. Never fails.
pub fn normalize(raw: &Value) -> Settings {
    let migrated = migrate_legacy(raw);
    let empty = Map::new();
    let root = migrated.as_object().unwrap_or(&empty);
    let defaults = Settings::default();

    let Reconciled { profiles, order } = reconcile_profiles(root);

    let active_profile_id = match root.get("activeProfileId").and_then(Value::as_str) {
        Some(id) if profiles.contains_key(id) => id.to_string(),
        _ => order
            .first()
            .cloned()
            .or_else(|| profiles.keys().next().cloned())
            .unwrap_or_else(|| DEFAULT_PROFILE_ID.to_string()),
    };

    Settings {
        enabled: bool_or(root, "enabled", defaults.enabled),
        active_profile_id,
        profiles,
        profiles_order: order,
        adaptive_mode: bool_or(root, "adaptiveMode", defaults.adaptive_mode),
        image_adjustments: normalize_image_adjustments(root),
        custom_fonts: normalize_custom_fonts(root),
        color_legend: normalize_color_legend(root),
        reading_mask: normalize_reading_mask(root),
        onboarding: normalize_onboarding(root),
    }
}

/// Normalizes an optional blob; `None` yields the canonical defaults.
pub fn normalize_optional(raw: Option<&Value>) -> Settings {
    normalize(raw.unwrap_or(&Value::Null))
}

/// Re-normalizes typed settings after a JSON patch has been merged into them.
pub fn apply_patch(current: &Settings, patch: &Value) -> Settings {
    normalize(&merge_patch(&to_value(current), patch))
}

/// Serializes settings to their canonical JSON form.
pub fn to_value(settings: &Settings) -> Value {
    serde_json::to_value(settings).unwrap_or(Value::Null)
}
