//! Theme Engine — detects a page's existing light/dark theme and derives the override palette.
//!
//! Detection reads a [`PageStyleSnapshot`] and never fails: an unreadable page yields the
//! built-in light theme.

use crate::services::color_math::{
    color_to_css_or, first_meaningful_color, parse_optional, relative_luminance,
};
use crate::types::color::Color;
use crate::types::errors::HostError;
use crate::types::theme::{ElementStyle, Palette, PageStyleSnapshot, ThemeMode, ThemeProfile};

/// Built-in dark palette. Panel, border and button slots are never taken from the page.
struct DarkPalette;
impl DarkPalette {
    const BACKGROUND: &'static str = "#121212";
    const PANEL_BACKGROUND: &'static str = "rgba(32, 32, 32, 0.92)";
    const TEXT: &'static str = "#f5f5f5";
    const LINK: &'static str = "#f0f0f0";
    const BORDER: &'static str = "rgba(255, 255, 255, 0.2)";
    const BUTTON_BG: &'static str = "#2d2d2d";
    const BUTTON_HOVER: &'static str = "#3a3a3a";
    const BUTTON_TEXT: &'static str = "#f5f5f5";
}

/// Built-in light palette.
struct LightPalette;
impl LightPalette {
    const BACKGROUND: &'static str = "#f5f5f5";
    const PANEL_BACKGROUND: &'static str = "rgba(232, 232, 232, 0.95)";
    const TEXT: &'static str = "#000000";
    const LINK: &'static str = "#101010";
    const BORDER: &'static str = "rgba(0, 0, 0, 0.2)";
    const BUTTON_BG: &'static str = "#ffffff";
    const BUTTON_HOVER: &'static str = "#f0f0f0";
    const BUTTON_TEXT: &'static str = "#101010";
}

/// Attributes that commonly carry a site's theme name.
pub const THEME_ATTRIBUTES: &[&str] = &[
    "data-theme",
    "data-color-mode",
    "data-mode",
    "data-ui-theme",
    "data-bs-theme",
    "data-theme-mode",
];

/// Class tokens that mark a dark theme.
pub const DARK_CLASS_KEYWORDS: &[&str] = &[
    "dark",
    "theme-dark",
    "dark-mode",
    "mode-dark",
    "night",
    "night-mode",
];

/// The built-in palette for a mode.
pub fn default_palette(mode: ThemeMode) -> Palette {
    match mode {
        ThemeMode::Dark => Palette {
            background: DarkPalette::BACKGROUND.into(),
            panel_background: DarkPalette::PANEL_BACKGROUND.into(),
            text_color: DarkPalette::TEXT.into(),
            link_color: DarkPalette::LINK.into(),
            border_color: DarkPalette::BORDER.into(),
            button_background: DarkPalette::BUTTON_BG.into(),
            button_hover: DarkPalette::BUTTON_HOVER.into(),
            button_text: DarkPalette::BUTTON_TEXT.into(),
        },
        ThemeMode::Light => Palette {
            background: LightPalette::BACKGROUND.into(),
            panel_background: LightPalette::PANEL_BACKGROUND.into(),
            text_color: LightPalette::TEXT.into(),
            link_color: LightPalette::LINK.into(),
            border_color: LightPalette::BORDER.into(),
            button_background: LightPalette::BUTTON_BG.into(),
            button_hover: LightPalette::BUTTON_HOVER.into(),
            button_text: LightPalette::BUTTON_TEXT.into(),
        },
    }
}

/// Light mode with the built-in light palette.
pub fn default_theme() -> ThemeProfile {
    ThemeProfile {
        mode: ThemeMode::Light,
        palette: default_palette(ThemeMode::Light),
    }
}

/// Classifies free text as dark or light; ambiguous or empty text is no signal.
fn classify(text: &str, dark_words: &[&str]) -> Option<ThemeMode> {
    let normalized = text.to_lowercase();
    let has_dark = dark_words.iter().any(|word| normalized.contains(word));
    let has_light = normalized.contains("light");
    match (has_dark, has_light) {
        (true, false) => Some(ThemeMode::Dark),
        (false, true) => Some(ThemeMode::Light),
        _ => None,
    }
}

fn theme_from_element(element: &ElementStyle) -> Option<ThemeMode> {
    for name in THEME_ATTRIBUTES {
        let Some(value) = element.attributes.get(*name) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        if let Some(mode) = classify(value, &["dark", "night"]) {
            return Some(mode);
        }
    }

    let tokens: Vec<String> = element.class_list.iter().map(|t| t.to_lowercase()).collect();
    if tokens
        .iter()
        .any(|token| DARK_CLASS_KEYWORDS.contains(&token.as_str()))
    {
        return Some(ThemeMode::Dark);
    }
    if tokens.iter().any(|token| token.contains("light")) {
        return Some(ThemeMode::Light);
    }
    None
}

/// Explicit theme attributes or classes on the root element, then the body.
pub fn resolve_theme_from_attributes(snapshot: &PageStyleSnapshot) -> Option<ThemeMode> {
    std::iter::once(&snapshot.root)
        .chain(snapshot.body.as_ref())
        .find_map(theme_from_element)
}

/// An unambiguous `color-scheme` from body, root, then the meta tag.
pub fn resolve_explicit_color_scheme(snapshot: &PageStyleSnapshot) -> Option<ThemeMode> {
    let computed = snapshot
        .body
        .iter()
        .chain(std::iter::once(&snapshot.root))
        .filter_map(|element| element.color_scheme.as_deref())
        .filter(|value| !value.is_empty());
    computed
        .chain(snapshot.color_scheme_meta.as_deref())
        .find_map(|value| classify(value, &["dark"]))
}

/// Inputs to the final mode decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeSignals {
    pub attribute_scheme: Option<ThemeMode>,
    pub color_scheme: Option<ThemeMode>,
    pub background_luminance: Option<f64>,
    pub text_luminance: Option<f64>,
    pub prefers_dark: bool,
}

/// Applies the signal priority: attributes, `color-scheme`, luminance comparison,
/// luminance alone, then the OS preference.
pub fn choose_theme_mode(signals: &ModeSignals) -> ThemeMode {
    if let Some(mode) = signals.attribute_scheme {
        return mode;
    }
    if let Some(mode) = signals.color_scheme {
        return mode;
    }
    if let (Some(bg), Some(text)) = (signals.background_luminance, signals.text_luminance) {
        if bg < text && bg <= 0.45 {
            return ThemeMode::Dark;
        }
        if bg > text && bg >= 0.55 {
            return ThemeMode::Light;
        }
    }
    if let Some(bg) = signals.background_luminance {
        if bg <= 0.35 {
            return ThemeMode::Dark;
        }
        if bg >= 0.7 {
            return ThemeMode::Light;
        }
    }
    if signals.prefers_dark {
        ThemeMode::Dark
    } else {
        ThemeMode::Light
    }
}

/// Page-derived colors that may override palette slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageColors {
    pub background: Option<Color>,
    pub text: Option<Color>,
    pub link: Option<Color>,
}

/// Starts from the built-in palette and overrides background, text and link when known.
pub fn build_palette_for_mode(mode: ThemeMode, colors: &PageColors) -> Palette {
    let mut palette = default_palette(mode);
    palette.background = color_to_css_or(colors.background.as_ref(), &palette.background);
    palette.text_color = color_to_css_or(colors.text.as_ref(), &palette.text_color);
    palette.link_color = color_to_css_or(colors.link.as_ref(), &palette.link_color);
    palette
}

/// Extracts the page colors theme detection works from.
pub fn collect_page_colors(snapshot: &PageStyleSnapshot) -> PageColors {
    let body = snapshot.body_or_root();
    let candidates = [
        parse_optional(body.background_color.as_deref()),
        parse_optional(snapshot.root.background_color.as_deref()),
        parse_optional(snapshot.theme_color_meta.as_deref()),
    ];
    PageColors {
        background: first_meaningful_color(&candidates),
        text: parse_optional(body.color.as_deref()),
        link: parse_optional(snapshot.link_color.as_deref()),
    }
}

/// Detects the page's theme and derives its palette.
pub fn detect_theme(snapshot: &PageStyleSnapshot) -> ThemeProfile {
    let colors = collect_page_colors(snapshot);
    let signals = ModeSignals {
        attribute_scheme: resolve_theme_from_attributes(snapshot),
        color_scheme: resolve_explicit_color_scheme(snapshot),
        background_luminance: colors.background.as_ref().map(relative_luminance),
        text_luminance: colors.text.as_ref().map(relative_luminance),
        prefers_dark: snapshot.prefers_dark.unwrap_or(false),
    };
    let mode = choose_theme_mode(&signals);
    tracing::debug!(
        target: "achroma_reader",
        ?mode,
        attribute = ?signals.attribute_scheme,
        scheme = ?signals.color_scheme,
        background = ?signals.background_luminance,
        "theme detected"
    );
    ThemeProfile {
        mode,
        palette: build_palette_for_mode(mode, &colors),
    }
}

/// Detection over a host read that may have failed.
pub fn detect_theme_or_default(snapshot: Result<PageStyleSnapshot, HostError>) -> ThemeProfile {
    match snapshot {
        Ok(snapshot) => detect_theme(&snapshot),
        Err(e) => {
            tracing::warn!(target: "achroma_reader", error = %e, "theme detection failed; using light defaults");
            default_theme()
        }
    }
}
