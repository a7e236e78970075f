//! Message handler for the reader's popup/content protocol.
//!
//! `handle_message` dispatches one typed message to the [`ReaderApp`] and returns the
//! response object. Kept apart from the host loop so it can be unit-tested directly.

use std::sync::Mutex;
use std::time::Instant;

use serde_json::{json, Map, Value};

use crate::app::ReaderApp;
use crate::managers::profile_manager::CreateProfileRequest;
use crate::managers::shortcut_manager::KeyEvent;
use crate::services::messaging::MESSAGE_SCOPE;
use crate::services::page_host::PageUpdate;
use crate::types::page::MutationBatch;
use crate::types::settings::Scope;

fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(|v| v.as_str())
}

fn bool_field(payload: &Value, key: &str) -> Option<bool> {
    payload.get(key).and_then(|v| v.as_bool())
}

fn decode<T: serde::de::DeserializeOwned>(payload: &Value, what: &str) -> Result<T, String> {
    serde_json::from_value(payload.clone()).map_err(|e| format!("invalid {}: {}", what, e))
}

/// Keys of an `UPDATE_SETTINGS` payload that steer the write rather than change settings.
const UPDATE_CONTROL_KEYS: [&str; 3] = ["scope", "replace", "coalesce"];

/// The settings patch of an `UPDATE_SETTINGS` payload: `updates` when present,
/// otherwise the payload itself minus the control keys.
fn update_patch(payload: &Value) -> Result<Value, String> {
    match payload.get("updates") {
        Some(updates) if updates.is_object() => Ok(updates.clone()),
        Some(_) => Err("updates must be an object".to_string()),
        None => match payload {
            Value::Object(fields) => Ok(Value::Object(
                fields
                    .iter()
                    .filter(|(key, _)| !UPDATE_CONTROL_KEYS.contains(&key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            )),
            _ => Err("updates must be an object".to_string()),
        },
    }
}

/// Dispatch a message to the reader.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_message(app: &Mutex<ReaderApp>, message_type: &str, payload: &Value) -> Result<Value, String> {
    match message_type {
        // ─── State ───
        "GET_STATE" | "OPEN_POPUP" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            Ok(a.state())
        }
        "TOGGLE" => {
            let enabled = bool_field(payload, "enabled");
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let active = a.toggle(enabled).map_err(|e| e.to_string())?;
            Ok(json!({"active": active}))
        }
        "UPDATE_SETTINGS" => {
            let updates = update_patch(payload)?;
            let scope = Scope::parse(str_field(payload, "scope"));
            let replace = bool_field(payload, "replace").unwrap_or(false);
            let coalesce = bool_field(payload, "coalesce").unwrap_or(false);
            let mut a = app.lock().map_err(|e| e.to_string())?;
            if coalesce && scope == Scope::Domain && !replace {
                a.queue_settings_patch(&updates, Instant::now());
                return Ok(json!({"ok": true, "queued": true}));
            }
            a.apply_setting_changes(&updates, scope, replace).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Profiles ───
        "CREATE_PROFILE" => {
            let name = str_field(payload, "name").ok_or("missing name")?;
            let request = CreateProfileRequest {
                name: name.to_string(),
                base_profile_id: str_field(payload, "baseProfileId").map(str::to_string),
                activate: bool_field(payload, "activate").unwrap_or(false),
            };
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let id = a.create_profile(&request).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "id": id}))
        }
        "UPDATE_PROFILE" => {
            let id = str_field(payload, "id").ok_or("missing id")?;
            let changes = payload.get("changes").ok_or("missing changes")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.update_profile(id, changes).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "DELETE_PROFILE" => {
            let id = str_field(payload, "id").ok_or("missing id")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.delete_profile(id).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "SET_ACTIVE_PROFILE" => {
            let id = str_field(payload, "id").ok_or("missing id")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.set_active_profile(id).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Export / import ───
        "EXPORT_SETTINGS" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "snapshot": a.export_settings()}))
        }
        "IMPORT_SETTINGS" => {
            let snapshot = payload.get("snapshot").unwrap_or(payload);
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.import_settings(snapshot).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "RESET_SETTINGS" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.reset_settings().map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Onboarding ───
        "SHOW_ONBOARDING" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.show_onboarding();
            Ok(json!({"ok": true}))
        }
        "DISMISS_ONBOARDING" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.dismiss_onboarding();
            Ok(json!({"ok": true}))
        }

        // ─── Page events ───
        "KEYDOWN" => {
            let event: KeyEvent = decode(payload, "key event")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let handled = a.keydown(&event).map_err(|e| e.to_string())?;
            Ok(json!({"handled": handled, "active": a.is_active()}))
        }
        "PAGE_UPDATE" => {
            let update: PageUpdate = decode(payload, "page update")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.page_update(&update);
            Ok(json!({"ok": true}))
        }
        "DOM_MUTATIONS" => {
            let batch: MutationBatch = decode(payload, "mutation batch")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.handle_mutations(&batch, Instant::now());
            Ok(json!({"ok": true}))
        }

        "ping" => Ok(json!({"pong": true})),
        _ => Err(format!("unknown message type: {}", message_type)),
    }
}

/// Handles one request envelope `{id, scope, type, payload}` and builds the response line.
///
/// Result objects are flattened next to the `id`; failures become `{id, ok:false, error}`.
pub fn handle_request(app: &Mutex<ReaderApp>, request: &Value) -> Value {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    if str_field(request, "scope") != Some(MESSAGE_SCOPE) {
        return json!({"id": id, "ignored": true});
    }
    let message_type = str_field(request, "type").unwrap_or("");
    let payload = request.get("payload").cloned().unwrap_or_else(|| json!({}));

    match handle_message(app, message_type, &payload) {
        Ok(Value::Object(result)) => {
            let mut response = Map::new();
            response.insert("id".to_string(), id);
            response.extend(result);
            Value::Object(response)
        }
        Ok(other) => json!({"id": id, "result": other}),
        Err(error) => {
            tracing::debug!(target: "achroma_reader", message_type, error = %error, "message failed");
            json!({"id": id, "ok": false, "error": error})
        }
    }
}
