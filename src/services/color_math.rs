//! Color math — CSS color parsing, relative luminance and CSS formatting.
//!
//! Parsing is deliberately partial: anything that is not a functional `rgb()`/`rgba()`
//! value or a 3/4/6/8-digit hex literal yields `None`, which callers treat as
//! "no signal" rather than as a default color.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::color::Color;

/// Alpha at or above which a background candidate counts as opaque enough.
pub const OPAQUE_ENOUGH_ALPHA: f64 = 0.75;
/// Alpha at or below which a background candidate is ignored.
pub const NEGLIGIBLE_ALPHA: f64 = 0.05;

fn rgb_function() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"rgba?\(([^)]+)\)").expect("static regex"))
}

fn leading_float() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("static regex")
    })
}

/// Parses the numeric prefix of a token (`"12px"` → 12, `"50%"` → 50).
fn parse_float_prefix(token: &str) -> Option<f64> {
    let matched = leading_float().find(token.trim())?;
    matched.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn clamp_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn hex_byte(digits: &str) -> Option<u8> {
    u8::from_str_radix(digits, 16).ok()
}

fn with_alpha(r: u8, g: u8, b: u8, a: f64) -> Option<Color> {
    if a <= 0.0 {
        return None;
    }
    Some(Color::rgba(r, g, b, a))
}

fn parse_rgb_function(normalized: &str) -> Option<Color> {
    let captures = rgb_function().captures(normalized)?;
    let parts: Vec<&str> = captures[1].split(',').map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }
    let r = clamp_channel(parse_float_prefix(parts[0])?);
    let g = clamp_channel(parse_float_prefix(parts[1])?);
    let b = clamp_channel(parse_float_prefix(parts[2])?);
    let a = match parts.get(3) {
        Some(part) => parse_float_prefix(part)?.clamp(0.0, 1.0),
        None => 1.0,
    };
    with_alpha(r, g, b, a)
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 | 4 => {
            let nibble = |i: usize| {
                let digit = &hex[i..i + 1];
                hex_byte(&format!("{}{}", digit, digit))
            };
            let a = if hex.len() == 4 {
                f64::from(nibble(3)?) / 255.0
            } else {
                1.0
            };
            with_alpha(nibble(0)?, nibble(1)?, nibble(2)?, a)
        }
        6 | 8 => {
            let a = if hex.len() == 8 {
                f64::from(hex_byte(&hex[6..8])?) / 255.0
            } else {
                1.0
            };
            with_alpha(
                hex_byte(&hex[0..2])?,
                hex_byte(&hex[2..4])?,
                hex_byte(&hex[4..6])?,
                a,
            )
        }
        _ => None,
    }
}

/// Parses a CSS color value into a [`Color`].
///
/// Returns `None` for `transparent`, `inherit`, `initial`, empty or unparseable input,
/// and for colors whose alpha is zero.
pub fn parse_color_value(value: &str) -> Option<Color> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty()
        || normalized == "transparent"
        || normalized == "inherit"
        || normalized == "initial"
    {
        return None;
    }
    if normalized.starts_with("rgb") {
        return parse_rgb_function(&normalized);
    }
    if let Some(hex) = normalized.strip_prefix('#') {
        return parse_hex(hex);
    }
    None
}

/// Convenience wrapper for optional computed-style values.
pub fn parse_optional(value: Option<&str>) -> Option<Color> {
    value.and_then(parse_color_value)
}

/// WCAG relative luminance in linear light.
pub fn relative_luminance(color: &Color) -> f64 {
    fn to_linear(channel: u8) -> f64 {
        let c = f64::from(channel) / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * to_linear(color.r) + 0.7152 * to_linear(color.g) + 0.0722 * to_linear(color.b)
}

/// Formats a color as `rgb(r, g, b)`, or `rgba(r, g, b, a)` with alpha rounded
/// to three decimals when not fully opaque.
pub fn color_to_css(color: &Color) -> String {
    let alpha = color.a.clamp(0.0, 1.0);
    if alpha >= 1.0 {
        return format!("rgb({}, {}, {})", color.r, color.g, color.b);
    }
    let rounded = (alpha * 1000.0).round() / 1000.0;
    format!("rgba({}, {}, {}, {})", color.r, color.g, color.b, rounded)
}

/// Formats an optional color, using `fallback` when absent.
pub fn color_to_css_or(color: Option<&Color>, fallback: &str) -> String {
    color.map(color_to_css).unwrap_or_else(|| fallback.to_string())
}

/// Picks the representative background among ordered candidates.
///
/// The first candidate that is opaque enough wins. A translucent candidate is chosen
/// only when no other candidate is opaque enough. Candidates with negligible alpha
/// are never chosen. Layered translucent backgrounds are not composited.
pub fn first_meaningful_color(candidates: &[Option<Color>]) -> Option<Color> {
    for (index, candidate) in candidates.iter().enumerate() {
        let Some(color) = candidate else {
            continue;
        };
        if color.a <= NEGLIGIBLE_ALPHA {
            continue;
        }
        if color.a >= OPAQUE_ENOUGH_ALPHA {
            return Some(*color);
        }
        let other_opaque = candidates.iter().enumerate().any(|(other, c)| {
            other != index && matches!(c, Some(c) if c.a >= OPAQUE_ENOUGH_ALPHA)
        });
        if !other_opaque {
            return Some(*color);
        }
    }
    None
}

/// Converts typographic points to CSS pixels at the fixed 4/3 ratio.
pub fn pt_to_px(pt: f64) -> i64 {
    (pt * 4.0 / 3.0).round() as i64
}
