//! Style Engine — derives the page-level CSS variables from a profile and a theme.

use crate::services::color_math::pt_to_px;
use crate::types::settings::{ImageAdjustments, Profile};
use crate::types::theme::ThemeProfile;

/// Variables written by [`compute_style_variables`], in write order.
pub const STYLE_VARIABLES: &[&str] = &[
    "--achroma-font-size",
    "--achroma-heading-size",
    "--achroma-base-font",
    "--achroma-brightness",
    "--achroma-contrast",
    "--achroma-scroll-padding",
    "--achroma-background",
    "--achroma-panel-background",
    "--achroma-text-color",
    "--achroma-link-color",
    "--achroma-border-color",
    "--achroma-button-background",
    "--achroma-button-hover",
    "--achroma-button-text",
    "--achroma-body-font",
    "--achroma-heading-font",
    "--achroma-letter-spacing",
    "--achroma-line-height",
    "--achroma-bold-weight",
];

/// Variables written by [`compute_image_variables`].
pub const IMAGE_VARIABLES: &[&str] = &[
    "--achroma-image-contrast",
    "--achroma-image-desaturate",
    "--achroma-image-annotation-opacity",
];

/// Every variable the reader may set; removed on deactivation.
pub fn all_variable_names() -> impl Iterator<Item = &'static str> {
    STYLE_VARIABLES.iter().chain(IMAGE_VARIABLES.iter()).copied()
}

/// Pixel sizes derived from a profile's point size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub font_px: i64,
    pub base_px: i64,
    pub heading_px: i64,
}

impl FontMetrics {
    pub fn from_points(pt: f64) -> Self {
        let font_px = pt_to_px(pt);
        Self {
            font_px,
            base_px: ((font_px as f64 * 0.55).round() as i64).max(18),
            heading_px: (font_px as f64 * 1.35).round() as i64,
        }
    }
}

pub type StyleVariables = Vec<(&'static str, String)>;

/// Same profile and theme always produce the same variables.
pub fn compute_style_variables(profile: &Profile, theme: &ThemeProfile) -> StyleVariables {
    let metrics = FontMetrics::from_points(profile.font_size);
    let palette = &theme.palette;
    let values = [
        format!("{}px", metrics.font_px),
        format!("{}px", metrics.heading_px),
        format!("{}px", metrics.base_px),
        profile.brightness.to_string(),
        profile.contrast.to_string(),
        "5rem".to_string(),
        palette.background.clone(),
        palette.panel_background.clone(),
        palette.text_color.clone(),
        palette.link_color.clone(),
        palette.border_color.clone(),
        palette.button_background.clone(),
        palette.button_hover.clone(),
        palette.button_text.clone(),
        profile.font_family.clone(),
        profile.heading_font_family.clone(),
        format!("{}em", profile.letter_spacing),
        profile.line_height.to_string(),
        if profile.bold_text { "700" } else { "600" }.to_string(),
    ];
    STYLE_VARIABLES.iter().copied().zip(values).collect()
}

/// Image filter variables; empty when image adjustments are off.
pub fn compute_image_variables(adjustments: &ImageAdjustments) -> StyleVariables {
    if !adjustments.enabled {
        return Vec::new();
    }
    let flag = |on: bool| if on { "1" } else { "0" }.to_string();
    vec![
        (IMAGE_VARIABLES[0], adjustments.contrast.to_string()),
        (IMAGE_VARIABLES[1], flag(adjustments.desaturate)),
        (IMAGE_VARIABLES[2], flag(adjustments.annotate)),
    ]
}

/// Toolbar status text, e.g. `Font 48px · Brightness 70% · Contrast 150%`.
pub fn inline_status(profile: &Profile) -> String {
    format!(
        "Font {}px · Brightness {}% · Contrast {}%",
        pt_to_px(profile.font_size),
        (profile.brightness * 100.0).round() as i64,
        (profile.contrast * 100.0).round() as i64
    )
}
