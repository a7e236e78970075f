// Achroma Reader shared type definitions
// Each submodule defines types used across the application.

pub mod color;
pub mod errors;
pub mod page;
pub mod settings;
pub mod theme;
