// Achroma Reader services
// Services hold the pure logic (normalization, color math, theme and style derivation)
// plus the storage, messaging and page host seams.

pub mod color_legend;
pub mod color_math;
pub mod image_annotator;
pub mod messaging;
pub mod page_host;
pub mod reading_mask;
pub mod settings_normalizer;
pub mod storage;
pub mod style_engine;
pub mod theme_engine;
