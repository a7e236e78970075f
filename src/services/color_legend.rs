//! Color legend — groups color-coded page elements by background and labels each color.

use serde::Serialize;

use crate::services::color_math::{color_to_css_or, parse_optional};
use crate::types::color::Color;
use crate::types::page::{LegendCandidate, NodeId};
use crate::types::settings::{ColorLegendSettings, LegendStyle};

/// Maximum number of candidates inspected per scan.
pub const MAX_SCANNED: usize = 800;
/// Maximum number of legend entries shown.
pub const MAX_ENTRIES: usize = 8;
/// Maximum number of distinct labels kept per entry.
pub const MAX_LABELS: usize = 3;
/// Backgrounds fainter than this carry no meaning.
pub const MIN_ALPHA: f64 = 0.1;

/// Overlays applied round-robin in pattern style.
pub const PATTERNS: [&str; 5] = [
    "repeating-linear-gradient(45deg, rgba(255, 255, 255, 0.35) 0 8px, transparent 8px 16px)",
    "repeating-linear-gradient(-45deg, rgba(255, 255, 255, 0.35) 0 10px, transparent 10px 20px)",
    "repeating-linear-gradient(90deg, rgba(255, 255, 255, 0.35) 0 6px, transparent 6px 12px)",
    "repeating-linear-gradient(0deg, rgba(255, 255, 255, 0.25) 0 12px, transparent 12px 24px)",
    "repeating-linear-gradient(135deg, rgba(255, 255, 255, 0.4) 0 6px, transparent 6px 12px)",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    /// `r-g-b-alphaPercent`.
    pub key: String,
    pub color: Color,
    /// Swatch color as CSS.
    pub swatch: String,
    pub label: String,
    pub nodes: Vec<NodeId>,
    /// Pattern overlay for this color, set in pattern style only.
    pub pattern: Option<&'static str>,
}

struct Group {
    key: String,
    color: Color,
    labels: Vec<String>,
    nodes: Vec<NodeId>,
}

fn group_key(color: &Color) -> String {
    format!(
        "{}-{}-{}-{}",
        color.r,
        color.g,
        color.b,
        (color.a * 100.0).round() as i64
    )
}

fn candidate_text(candidate: &LegendCandidate) -> Option<String> {
    [&candidate.text, &candidate.aria_label, &candidate.title]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Groups candidates by background color into at most [`MAX_ENTRIES`] entries,
/// in first-seen order.
pub fn collect_legend_entries(candidates: &[LegendCandidate]) -> Vec<LegendEntry> {
    let mut groups: Vec<Group> = Vec::new();

    for candidate in candidates.iter().take(MAX_SCANNED) {
        let Some(color) = parse_optional(candidate.background_color.as_deref()) else {
            continue;
        };
        if color.a < MIN_ALPHA {
            continue;
        }
        let Some(text) = candidate_text(candidate) else {
            continue;
        };
        let key = group_key(&color);
        let index = match groups.iter().position(|g| g.key == key) {
            Some(index) => index,
            None => {
                groups.push(Group {
                    key,
                    color,
                    labels: Vec::new(),
                    nodes: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        if !group.labels.contains(&text) {
            group.labels.push(text);
        }
        if !group.nodes.contains(&candidate.id) {
            group.nodes.push(candidate.id);
        }
    }

    groups
        .into_iter()
        .take(MAX_ENTRIES)
        .map(|group| LegendEntry {
            swatch: color_to_css_or(Some(&group.color), "#ccc"),
            label: group
                .labels
                .iter()
                .take(MAX_LABELS)
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
            key: group.key,
            color: group.color,
            nodes: group.nodes,
            pattern: None,
        })
        .collect()
}

/// Builds the legend for the given settings; empty when disabled or nothing qualifies.
pub fn build_legend(config: &ColorLegendSettings, candidates: &[LegendCandidate]) -> Vec<LegendEntry> {
    if !config.enabled {
        return Vec::new();
    }
    let mut entries = collect_legend_entries(candidates);
    if config.style == LegendStyle::Pattern {
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.pattern = Some(PATTERNS[index % PATTERNS.len()]);
        }
    }
    entries
}
