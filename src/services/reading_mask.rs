//! Reading mask — shades the viewport above and below a band that follows the pointer.

use serde::Serialize;

use crate::types::settings::ReadingMaskSettings;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaskGeometry {
    pub top_height: f64,
    pub bottom_height: f64,
    pub opacity: f64,
}

/// Band centre clamped so the band stays inside the viewport when it fits.
pub fn band_center(viewport_height: f64, pointer_y: f64, band_height: f64) -> f64 {
    let half = band_height / 2.0;
    half.max((viewport_height - half).min(pointer_y))
}

/// Shade heights for the current pointer position.
pub fn compute_mask_geometry(
    config: &ReadingMaskSettings,
    viewport_height: f64,
    pointer_y: Option<f64>,
) -> MaskGeometry {
    let half = config.height / 2.0;
    let y = pointer_y.unwrap_or(viewport_height / 2.0);
    let center = band_center(viewport_height, y, config.height);
    MaskGeometry {
        top_height: (center - half).max(0.0),
        bottom_height: (viewport_height - (center + half)).max(0.0),
        opacity: config.opacity,
    }
}
