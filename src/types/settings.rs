use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default body font stack used by new profiles and custom fonts.
pub const DEFAULT_BODY_FONT: &str = "'Verdana', 'Geneva', sans-serif";
/// Default heading font stack used by new profiles and custom fonts.
pub const DEFAULT_HEADING_FONT: &str = "'Georgia', 'Times New Roman', serif";
/// Id of the profile synthesized when no usable profile exists.
pub const DEFAULT_PROFILE_ID: &str = "default";
/// Display name of the synthesized profile.
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// Inclusive numeric range a normalized field is clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const FONT_SIZE_RANGE: Range = Range::new(24.0, 72.0);
pub const BRIGHTNESS_RANGE: Range = Range::new(0.4, 1.0);
pub const CONTRAST_RANGE: Range = Range::new(1.0, 2.0);
pub const LETTER_SPACING_RANGE: Range = Range::new(-0.05, 0.3);
pub const LINE_HEIGHT_RANGE: Range = Range::new(1.2, 2.4);
pub const IMAGE_CONTRAST_RANGE: Range = Range::new(1.0, 2.0);
pub const MASK_HEIGHT_RANGE: Range = Range::new(80.0, 400.0);
pub const MASK_OPACITY_RANGE: Range = Range::new(0.1, 0.8);

/// One named set of typography and contrast preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    /// Point size, converted to pixels when styles are applied.
    pub font_size: f64,
    pub brightness: f64,
    pub contrast: f64,
    pub font_family: String,
    pub heading_font_family: String,
    pub bold_text: bool,
    /// Em units.
    pub letter_spacing: f64,
    pub line_height: f64,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            id: DEFAULT_PROFILE_ID.to_string(),
            name: DEFAULT_PROFILE_NAME.to_string(),
            font_size: 36.0,
            brightness: 0.7,
            contrast: 1.5,
            font_family: DEFAULT_BODY_FONT.to_string(),
            heading_font_family: DEFAULT_HEADING_FONT.to_string(),
            bold_text: true,
            letter_spacing: 0.12,
            line_height: 1.65,
        }
    }
}

/// Full per-scope reader configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    pub active_profile_id: String,
    pub profiles: BTreeMap<String, Profile>,
    /// Display order; a permutation of the keys of `profiles`.
    pub profiles_order: Vec<String>,
    pub adaptive_mode: bool,
    pub image_adjustments: ImageAdjustments,
    pub custom_fonts: CustomFonts,
    pub color_legend: ColorLegendSettings,
    pub reading_mask: ReadingMaskSettings,
    pub onboarding: OnboardingState,
}

impl Default for Settings {
    fn default() -> Self {
        let profile = Profile::default();
        let mut profiles = BTreeMap::new();
        profiles.insert(profile.id.clone(), profile);
        Self {
            enabled: false,
            active_profile_id: DEFAULT_PROFILE_ID.to_string(),
            profiles,
            profiles_order: vec![DEFAULT_PROFILE_ID.to_string()],
            adaptive_mode: true,
            image_adjustments: ImageAdjustments::default(),
            custom_fonts: CustomFonts::default(),
            color_legend: ColorLegendSettings::default(),
            reading_mask: ReadingMaskSettings::default(),
            onboarding: OnboardingState::default(),
        }
    }
}

impl Settings {
    /// Returns the active profile, falling back to the first ordered profile,
    /// then any profile, then a fresh default.
    pub fn active_profile(&self) -> Profile {
        if let Some(profile) = self.profiles.get(&self.active_profile_id) {
            return profile.clone();
        }
        if let Some(profile) = self
            .profiles_order
            .first()
            .and_then(|id| self.profiles.get(id))
        {
            return profile.clone();
        }
        self.profiles
            .values()
            .next()
            .cloned()
            .unwrap_or_default()
    }
}

/// Image filter options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageAdjustments {
    pub enabled: bool,
    pub desaturate: bool,
    pub contrast: f64,
    pub annotate: bool,
}

impl Default for ImageAdjustments {
    fn default() -> Self {
        Self {
            enabled: false,
            desaturate: true,
            contrast: 1.1,
            annotate: false,
        }
    }
}

/// Font overrides kept across merges; not read by the active profile logic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomFonts {
    pub body: String,
    pub heading: String,
    pub letter_spacing: f64,
    pub line_height: f64,
    pub bold_text: bool,
}

impl Default for CustomFonts {
    fn default() -> Self {
        Self {
            body: DEFAULT_BODY_FONT.to_string(),
            heading: DEFAULT_HEADING_FONT.to_string(),
            letter_spacing: 0.12,
            line_height: 1.65,
            bold_text: true,
        }
    }
}

/// How color-coded page elements are explained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LegendStyle {
    #[default]
    Text,
    Pattern,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ColorLegendSettings {
    pub enabled: bool,
    pub style: LegendStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingMaskSettings {
    pub enabled: bool,
    /// Band height in pixels.
    pub height: f64,
    pub opacity: f64,
}

impl Default for ReadingMaskSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            height: 220.0,
            opacity: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingState {
    pub completed: bool,
}

/// Which settings record an operation targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Per-hostname record.
    #[default]
    Domain,
    /// Global template applied to new domains.
    Defaults,
}

impl Scope {
    /// Parses a scope name; anything other than `defaults` targets the domain.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("defaults") => Scope::Defaults,
            _ => Scope::Domain,
        }
    }
}
