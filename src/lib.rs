//! Achroma Reader — settings normalization, theme adaptation and page styling core
//! for a reader aimed at people with achromatopsia.
//!
//! This library crate exposes all modules for use by the host binary and integration tests.

pub mod app;
pub mod config;
pub mod database;
pub mod logging;
pub mod managers;
pub mod message_handler;
pub mod platform;
pub mod services;
pub mod types;
