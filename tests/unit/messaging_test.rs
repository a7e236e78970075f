//! Unit tests for popup-side delivery: recovery, permission checks and tab eligibility.

use std::collections::VecDeque;

use achroma_reader::services::messaging::{
    ensure_site_permission, envelope, evaluate_tab_eligibility, send_with_recovery,
    user_facing_error, ContentChannel, PermissionOutcome, SitePermissions,
};
use achroma_reader::types::errors::MessageError;
use rstest::rstest;
use serde_json::{json, Value};

const NO_RECEIVER: &str = "Could not establish connection. Receiving end does not exist.";

/// Replies from a script; records sends and injections.
#[derive(Default)]
struct ScriptedChannel {
    replies: VecDeque<Result<Value, String>>,
    sent: usize,
    injected: usize,
    inject_error: Option<String>,
}

impl ScriptedChannel {
    fn new(replies: Vec<Result<Value, String>>) -> Self {
        Self {
            replies: replies.into(),
            ..Default::default()
        }
    }
}

impl ContentChannel for ScriptedChannel {
    fn send(&mut self, _message: &Value) -> Result<Value, String> {
        self.sent += 1;
        self.replies
            .pop_front()
            .unwrap_or_else(|| Err("no scripted reply".to_string()))
    }

    fn inject(&mut self) -> Result<(), String> {
        self.injected += 1;
        match &self.inject_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

struct FakePermissions {
    granted: bool,
    grant_on_request: bool,
    requested: Vec<String>,
}

impl FakePermissions {
    fn new(granted: bool, grant_on_request: bool) -> Self {
        Self {
            granted,
            grant_on_request,
            requested: Vec::new(),
        }
    }
}

impl SitePermissions for FakePermissions {
    fn contains(&self, _origin_pattern: &str) -> Result<bool, String> {
        Ok(self.granted)
    }

    fn request(&mut self, origin_pattern: &str) -> Result<bool, String> {
        self.requested.push(origin_pattern.to_string());
        self.granted = self.grant_on_request;
        Ok(self.grant_on_request)
    }

    fn file_scheme_access(&self) -> bool {
        false
    }
}

fn toggle() -> Value {
    envelope("TOGGLE", Some(json!({"enabled": true})))
}

#[test]
fn test_first_send_success_needs_no_recovery() {
    let mut channel = ScriptedChannel::new(vec![Ok(json!({"active": true}))]);
    let res = send_with_recovery(&mut channel, None, "https://example.com/", &toggle()).unwrap();
    assert_eq!(res, json!({"active": true}));
    assert_eq!(channel.sent, 1);
    assert_eq!(channel.injected, 0);
}

#[test]
fn test_missing_receiver_injects_and_retries_once() {
    let mut channel = ScriptedChannel::new(vec![Err(NO_RECEIVER.to_string()), Ok(json!({"ok": true}))]);
    let mut perms = FakePermissions::new(true, true);
    let res = send_with_recovery(&mut channel, Some(&mut perms), "https://example.com/page", &toggle());
    assert_eq!(res.unwrap(), json!({"ok": true}));
    assert_eq!(channel.sent, 2);
    assert_eq!(channel.injected, 1);
    assert!(perms.requested.is_empty());
}

#[test]
fn test_permission_requested_when_missing() {
    let mut channel = ScriptedChannel::new(vec![Err(NO_RECEIVER.to_string()), Ok(json!({"ok": true}))]);
    let mut perms = FakePermissions::new(false, true);
    let res = send_with_recovery(&mut channel, Some(&mut perms), "https://news.example.org/a?b=1", &toggle());
    assert!(res.is_ok());
    assert_eq!(perms.requested, vec!["https://news.example.org/*".to_string()]);
}

#[test]
fn test_denied_permission_is_distinct_error() {
    let mut channel = ScriptedChannel::new(vec![Err(NO_RECEIVER.to_string())]);
    let mut perms = FakePermissions::new(false, false);
    let err = send_with_recovery(&mut channel, Some(&mut perms), "https://example.com/", &toggle()).unwrap_err();
    assert!(matches!(err, MessageError::PermissionDenied(ref o) if o == "https://example.com/*"));
    assert_eq!(channel.injected, 0);
    assert!(user_facing_error(&err).is_some());
}

#[test]
fn test_unsupported_scheme_is_distinct_error() {
    let mut channel = ScriptedChannel::new(vec![Err(NO_RECEIVER.to_string())]);
    let mut perms = FakePermissions::new(true, true);
    let err = send_with_recovery(&mut channel, Some(&mut perms), "chrome://settings", &toggle()).unwrap_err();
    assert!(matches!(err, MessageError::SiteUnsupported(_)));
}

#[test]
fn test_retry_failure_is_recovery_failed() {
    let mut channel = ScriptedChannel::new(vec![Err(NO_RECEIVER.to_string()), Err(NO_RECEIVER.to_string())]);
    let err = send_with_recovery(&mut channel, None, "https://example.com/", &toggle()).unwrap_err();
    assert!(matches!(err, MessageError::RecoveryFailed(_)));
    // Exactly one retry.
    assert_eq!(channel.sent, 2);
}

#[test]
fn test_injection_failure_is_recovery_failed() {
    let mut channel = ScriptedChannel::new(vec![Err(NO_RECEIVER.to_string())]);
    channel.inject_error = Some("Cannot access contents of the page".to_string());
    let err = send_with_recovery(&mut channel, None, "https://example.com/", &toggle()).unwrap_err();
    assert!(matches!(err, MessageError::RecoveryFailed(_)));
    assert_eq!(user_facing_error(&err), Some("Site access is required for this page."));
}

#[test]
fn test_other_errors_are_not_recovered() {
    let mut channel = ScriptedChannel::new(vec![Err("The message port closed".to_string())]);
    let err = send_with_recovery(&mut channel, None, "https://example.com/", &toggle()).unwrap_err();
    assert!(matches!(err, MessageError::Channel(_)));
    assert_eq!(channel.injected, 0);
    assert_eq!(user_facing_error(&err), None);
}

#[test]
fn test_no_permission_api_assumes_access() {
    assert_eq!(ensure_site_permission(None, "https://example.com"), PermissionOutcome::Granted);
    let mut perms = FakePermissions::new(false, false);
    assert_eq!(
        ensure_site_permission(Some(&mut perms), "file:///home/me/a.html"),
        PermissionOutcome::Unsupported
    );
}

#[rstest]
#[case("https://example.com", false, true)]
#[case("http://example.com/a", false, true)]
#[case("ftp://files.example.com/x", false, true)]
#[case("file:///tmp/a.html", false, false)]
#[case("file:///tmp/a.html", true, true)]
#[case("blob:https://example.com/123", false, true)]
#[case("blob:null/123", false, false)]
#[case("chrome://extensions", true, false)]
#[case("about:blank", true, false)]
#[case("", true, false)]
fn test_tab_eligibility(#[case] url: &str, #[case] file_access: bool, #[case] expected: bool) {
    assert_eq!(evaluate_tab_eligibility(url, file_access), expected);
}
