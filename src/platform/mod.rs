// Per-OS data directory for the settings database.
// The platform module is selected with `cfg(target_os)` at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Directory name used on case-sensitive platforms.
pub const APP_DIR: &str = "achroma-reader";
/// Directory name used on macOS and Windows.
pub const APP_DIR_DISPLAY: &str = "AchromaReader";

/// Returns the platform data directory for the reader.
///
/// - **Linux**: `$XDG_DATA_HOME/achroma-reader` or `~/.local/share/achroma-reader`
/// - **macOS**: `~/Library/Application Support/AchromaReader`
/// - **Windows**: `%APPDATA%/AchromaReader`
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}
