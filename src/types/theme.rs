use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Binary color mode decision for a page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
}

/// Override palette written into the page as CSS variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    pub background: String,
    pub panel_background: String,
    pub text_color: String,
    pub link_color: String,
    pub border_color: String,
    pub button_background: String,
    pub button_hover: String,
    pub button_text: String,
}

/// Detected page mode plus derived palette. Computed once per activation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThemeProfile {
    pub mode: ThemeMode,
    pub palette: Palette,
}

/// Computed style signals of a single element (root or body).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementStyle {
    pub background_color: Option<String>,
    pub color: Option<String>,
    pub color_scheme: Option<String>,
    /// Element attributes, e.g. `data-theme`.
    pub attributes: BTreeMap<String, String>,
    pub class_list: Vec<String>,
}

/// Everything theme detection reads from a live page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PageStyleSnapshot {
    pub root: ElementStyle,
    /// `None` when the document has no body; the root stands in for it.
    pub body: Option<ElementStyle>,
    /// Computed color of the first `a[href]`, if any.
    pub link_color: Option<String>,
    /// `<meta name="theme-color">` content.
    pub theme_color_meta: Option<String>,
    /// `<meta name="color-scheme">` content.
    pub color_scheme_meta: Option<String>,
    /// `prefers-color-scheme: dark` match; `None` when unavailable.
    pub prefers_dark: Option<bool>,
}

impl PageStyleSnapshot {
    pub fn body_or_root(&self) -> &ElementStyle {
        self.body.as_ref().unwrap_or(&self.root)
    }
}
