//! Popup-side delivery of messages to a tab's content context.
//!
//! A send that fails because the content context is missing (or the extension lacks
//! site access) triggers exactly one recovery attempt: confirm or request the origin
//! permission, inject the content context, retry once.

use serde_json::{json, Value};
use url::Url;

use crate::types::errors::MessageError;

/// Scope tag every reader message carries.
pub const MESSAGE_SCOPE: &str = "ACHROMA_READER";

/// Transport to the content context of one tab.
pub trait ContentChannel {
    /// Sends a message and returns the response. Errors carry the browser's text.
    fn send(&mut self, message: &Value) -> Result<Value, String>;
    /// Injects the content stylesheet and script into the tab.
    fn inject(&mut self) -> Result<(), String>;
}

/// Browser permission API for origin access.
pub trait SitePermissions {
    fn contains(&self, origin_pattern: &str) -> Result<bool, String>;
    fn request(&mut self, origin_pattern: &str) -> Result<bool, String>;
    fn file_scheme_access(&self) -> bool;
}

/// Result of checking site access before injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied,
    Unsupported,
}

/// Wraps a message type and payload into a scoped envelope.
pub fn envelope(message_type: &str, payload: Option<Value>) -> Value {
    let mut message = json!({ "scope": MESSAGE_SCOPE, "type": message_type });
    if let Some(payload) = payload {
        message["payload"] = payload;
    }
    message
}

/// `<origin>/*` for http, https and ftp URLs.
pub fn origin_pattern(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.scheme() {
        "http" | "https" | "ftp" => Some(format!("{}/*", parsed.origin().ascii_serialization())),
        _ => None,
    }
}

/// Browser errors that mean the content context or site access is missing.
pub fn is_host_permission_error(message: &str) -> bool {
    let normalized = message.to_lowercase();
    normalized.contains("missing host permission")
        || normalized.contains("cannot access contents of the page")
        || normalized.contains("cannot access contents of url")
}

pub fn should_attempt_recovery(message: &str) -> bool {
    let normalized = message.to_lowercase();
    normalized.contains("could not establish connection")
        || normalized.contains("receiving end does not exist")
        || is_host_permission_error(&normalized)
}

/// Confirms access to the tab's origin, requesting it when missing.
///
/// Without a permission API access is assumed.
pub fn ensure_site_permission(
    permissions: Option<&mut dyn SitePermissions>,
    tab_url: &str,
) -> PermissionOutcome {
    let Some(permissions) = permissions else {
        return PermissionOutcome::Granted;
    };
    let Some(pattern) = origin_pattern(tab_url) else {
        return PermissionOutcome::Unsupported;
    };
    let granted = permissions
        .contains(&pattern)
        .and_then(|has| if has { Ok(true) } else { permissions.request(&pattern) });
    match granted {
        Ok(true) => PermissionOutcome::Granted,
        Ok(false) => PermissionOutcome::Denied,
        Err(e) => {
            tracing::warn!(target: "achroma_reader", error = %e, "unable to confirm site permission");
            PermissionOutcome::Denied
        }
    }
}

/// Sends a message, recovering once from a missing content context.
pub fn send_with_recovery(
    channel: &mut dyn ContentChannel,
    permissions: Option<&mut dyn SitePermissions>,
    tab_url: &str,
    message: &Value,
) -> Result<Value, MessageError> {
    let first_error = match channel.send(message) {
        Ok(response) => return Ok(response),
        Err(e) => e,
    };
    if !should_attempt_recovery(&first_error) {
        return Err(MessageError::Channel(first_error));
    }

    tracing::info!(target: "achroma_reader", error = %first_error, "content context missing; attempting recovery");
    match ensure_site_permission(permissions, tab_url) {
        PermissionOutcome::Granted => {}
        PermissionOutcome::Unsupported => {
            return Err(MessageError::SiteUnsupported(tab_url.to_string()))
        }
        PermissionOutcome::Denied => {
            return Err(MessageError::PermissionDenied(
                origin_pattern(tab_url).unwrap_or_else(|| tab_url.to_string()),
            ))
        }
    }

    channel.inject().map_err(MessageError::RecoveryFailed)?;
    channel.send(message).map_err(|e| {
        tracing::error!(target: "achroma_reader", error = %e, "retry after injection failed");
        MessageError::RecoveryFailed(e)
    })
}

/// Whether the reader can run in a tab with this URL.
pub fn evaluate_tab_eligibility(tab_url: &str, file_scheme_access: bool) -> bool {
    if tab_url.is_empty() {
        return false;
    }
    let Ok(url) = Url::parse(tab_url) else {
        return false;
    };
    match url.scheme() {
        "http" | "https" | "ftp" => true,
        "file" => file_scheme_access,
        "blob" => url.path().starts_with("http"),
        _ => false,
    }
}

/// Status text for errors the user can act on; `None` for generic failures.
pub fn user_facing_error(error: &MessageError) -> Option<&'static str> {
    match error {
        MessageError::PermissionDenied(_) => {
            Some("Grant site access to use the reader on this page.")
        }
        MessageError::SiteUnsupported(_) => Some("The reader cannot run on this page."),
        MessageError::Channel(text) | MessageError::RecoveryFailed(text)
            if is_host_permission_error(text) =>
        {
            Some("Site access is required for this page.")
        }
        _ => None,
    }
}
