//! App Core — the reader's explicit state record for one page.
//!
//! [`ReaderApp`] owns the loaded settings, the activation state and every resource
//! acquired while active. Pure work (normalization, theme detection, style derivation)
//! lives in `services`; this module sequences it and performs the side effects through
//! the store and the page host.

use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};

use crate::managers::activation_scope::ActivationScope;
use crate::managers::profile_manager::{CreateProfileRequest, ProfileManager, ProfileManagerTrait};
use crate::managers::shortcut_manager::{KeyEvent, ShortcutAction, ShortcutManager, ShortcutManagerTrait};
use crate::managers::update_coalescer::PatchCoalescer;
use crate::services::color_legend::{build_legend, LegendEntry};
use crate::services::image_annotator::ImageAnnotator;
use crate::services::page_host::{PageCommand, PageHost, PageUpdate};
use crate::services::reading_mask::compute_mask_geometry;
use crate::services::settings_normalizer::{merge_patch, normalize, normalize_optional, to_value};
use crate::services::storage::{domain_key, AreaName, StorageArea, StorageChange, DEFAULTS_KEY};
use crate::services::style_engine::{
    all_variable_names, compute_image_variables, compute_style_variables, inline_status,
    IMAGE_VARIABLES,
};
use crate::services::theme_engine::{default_theme, detect_theme_or_default};
use crate::types::errors::{HostError, MessageError, ProfileError};
use crate::types::page::{ImageNode, ListenerKind, MutationBatch};
use crate::types::settings::{Profile, Scope, Settings};
use crate::types::theme::ThemeProfile;

/// Version tag of exported snapshots.
pub const EXPORT_VERSION: u64 = 1;

const MASK_LISTENERS: [ListenerKind; 3] = [
    ListenerKind::PointerMove,
    ListenerKind::Scroll,
    ListenerKind::Resize,
];

pub struct ReaderApp {
    domain: String,
    domain_key: String,
    store: Box<dyn StorageArea>,
    page: Box<dyn PageHost>,
    settings: Settings,
    defaults: Settings,
    profile: Profile,
    active: bool,
    theme: Option<ThemeProfile>,
    last_error: Option<String>,
    /// Auto-activation waits for the first style snapshot.
    awaiting_snapshot: bool,
    scope: ActivationScope,
    annotator: ImageAnnotator,
    legend: Vec<LegendEntry>,
    pointer_y: Option<f64>,
    onboarding_visible: bool,
    coalescer: PatchCoalescer,
    profiles: ProfileManager,
    shortcuts: ShortcutManager,
}

impl ReaderApp {
    /// Creates the app without touching the store; call [`ReaderApp::init`] next.
    pub fn new(
        domain: &str,
        store: Box<dyn StorageArea>,
        page: Box<dyn PageHost>,
        delay: Duration,
    ) -> Self {
        let settings = Settings::default();
        let profile = settings.active_profile();
        Self {
            domain: domain.to_string(),
            domain_key: domain_key(domain),
            store,
            page,
            defaults: settings.clone(),
            settings,
            profile,
            active: false,
            theme: None,
            last_error: None,
            awaiting_snapshot: false,
            scope: ActivationScope::new(delay),
            annotator: ImageAnnotator::new(),
            legend: Vec::new(),
            pointer_y: None,
            onboarding_visible: false,
            coalescer: PatchCoalescer::new(delay),
            profiles: ProfileManager::new(),
            shortcuts: ShortcutManager::new(),
        }
    }

    /// Loads settings and activates when the stored state says so.
    ///
    /// Without a style snapshot yet, activation is deferred to the first
    /// [`ReaderApp::page_update`] that carries one.
    pub fn init(&mut self) {
        self.load_settings();
        if !self.settings.enabled {
            return;
        }
        if self.page.snapshot().is_err() {
            tracing::debug!(target: "achroma_reader", "auto-activation waiting for page snapshot");
            self.awaiting_snapshot = true;
            return;
        }
        if let Err(e) = self.activate() {
            tracing::error!(target: "achroma_reader", error = %e, "failed to auto-activate on load");
        }
    }

    fn activate_deferred(&mut self) {
        self.awaiting_snapshot = false;
        if self.settings.enabled && !self.active {
            if let Err(e) = self.activate() {
                tracing::error!(target: "achroma_reader", error = %e, "failed to auto-activate on load");
            }
        }
    }

    // ─── Accessors ───

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn theme(&self) -> Option<&ThemeProfile> {
        self.theme.as_ref()
    }

    pub fn legend(&self) -> &[LegendEntry] {
        &self.legend
    }

    pub fn page(&self) -> &dyn PageHost {
        self.page.as_ref()
    }

    pub fn page_mut(&mut self) -> &mut dyn PageHost {
        self.page.as_mut()
    }

    /// Read-only snapshot for the popup.
    pub fn state(&self) -> Value {
        json!({
            "settings": to_value(&self.settings),
            "defaults": to_value(&self.defaults),
            "active": self.active,
            "profile": serde_json::to_value(&self.profile).unwrap_or(Value::Null),
            "domain": self.domain,
            "theme": self.theme.as_ref().and_then(|t| serde_json::to_value(t).ok()),
            "error": self.last_error,
            "onboardingVisible": self.onboarding_visible,
            "shortcut": self.shortcuts.describe(ShortcutAction::ToggleReader),
        })
    }

    // ─── Persistence ───

    fn read(&self, area: AreaName, key: &str) -> Option<Value> {
        match self.store.get(area, key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(target: "achroma_reader", area = area.as_str(), key, error = %e, "storage read failed");
                None
            }
        }
    }

    /// Loads defaults and the domain record; domain values override defaults.
    pub fn load_settings(&mut self) {
        let default_raw = self
            .read(AreaName::Local, DEFAULTS_KEY)
            .or_else(|| self.read(AreaName::Sync, DEFAULTS_KEY));
        let domain_raw = self.read(AreaName::Local, &self.domain_key);

        self.defaults = normalize_optional(default_raw.as_ref());
        let combined = match domain_raw {
            Some(domain) => merge_patch(
                &default_raw.unwrap_or_else(|| Value::Object(Map::new())),
                &domain,
            ),
            None => default_raw.unwrap_or(Value::Null),
        };
        self.settings = normalize(&combined);
        self.profile = self.settings.active_profile();
        tracing::debug!(
            target: "achroma_reader",
            domain = %self.domain,
            enabled = self.settings.enabled,
            profile = %self.profile.id,
            "settings loaded"
        );
    }

    fn persist(&mut self, scope: Scope) {
        let (key, value) = match scope {
            Scope::Defaults => (DEFAULTS_KEY.to_string(), to_value(&self.defaults)),
            Scope::Domain => (self.domain_key.clone(), to_value(&self.settings)),
        };
        let mut result = self.store.set(AreaName::Local, &key, &value);
        if result.is_ok() && scope == Scope::Defaults {
            result = self.store.set(AreaName::Sync, &key, &value);
        }
        if let Err(e) = result {
            tracing::error!(target: "achroma_reader", key = %key, error = %e, "failed to persist settings");
            self.last_error = Some(e.to_string());
        }
    }

    /// Merges (or replaces) a patch into one scope, re-normalizes and persists.
    pub fn save_settings(&mut self, patch: &Value, scope: Scope, replace: bool) {
        let target = match scope {
            Scope::Defaults => &self.defaults,
            Scope::Domain => &self.settings,
        };
        let raw = if replace && patch.is_object() {
            patch.clone()
        } else {
            merge_patch(&to_value(target), patch)
        };
        let normalized = normalize(&raw);
        match scope {
            Scope::Defaults => self.defaults = normalized,
            Scope::Domain => {
                self.settings = normalized;
                self.profile = self.settings.active_profile();
            }
        }
        self.persist(scope);
    }

    /// Saves and, when active, re-applies everything settings drive.
    pub fn apply_setting_changes(&mut self, patch: &Value, scope: Scope, replace: bool) -> Result<(), HostError> {
        self.save_settings(patch, scope, replace);
        self.refresh_active()
    }

    /// Queues a domain patch; it commits once edits pause.
    pub fn queue_settings_patch(&mut self, patch: &Value, now: Instant) {
        self.coalescer.push(patch, now);
    }

    fn replace_domain_settings(&mut self, next: Settings) -> Result<(), HostError> {
        self.settings = next;
        self.profile = self.settings.active_profile();
        self.persist(Scope::Domain);
        self.refresh_active()
    }

    // ─── Activation ───

    /// Activates or deactivates; `None` flips the current state. Persists `enabled`.
    pub fn toggle(&mut self, enable: Option<bool>) -> Result<bool, HostError> {
        let deferred = std::mem::take(&mut self.awaiting_snapshot);
        let target = enable.unwrap_or(!self.active);
        if target == self.active {
            if deferred {
                self.save_settings(&json!({ "enabled": target }), Scope::Domain, false);
            }
            return Ok(self.active);
        }
        if target {
            self.activate()?;
        } else {
            self.deactivate();
        }
        self.save_settings(&json!({ "enabled": target }), Scope::Domain, false);
        Ok(self.active)
    }

    /// Detects the page theme once and applies every enabled feature.
    ///
    /// On failure everything acquired so far is released again.
    pub fn activate(&mut self) -> Result<(), HostError> {
        if self.active {
            return Ok(());
        }
        self.theme = Some(detect_theme_or_default(self.page.snapshot()));
        self.active = true;

        match self.refresh_active() {
            Ok(()) => {
                self.last_error = None;
                tracing::info!(target: "achroma_reader", domain = %self.domain, "reader activated");
                Ok(())
            }
            Err(e) => {
                tracing::error!(target: "achroma_reader", error = %e, "activation failed");
                self.deactivate();
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Removes all styles and overlays and releases every registration.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        for (kind, id) in self.scope.teardown() {
            tracing::debug!(target: "achroma_reader", ?kind, "releasing listener");
            self.page.release_listener(id);
        }
        for name in all_variable_names() {
            self.page.apply(PageCommand::RemoveProperty { name: name.to_string() });
        }
        self.clear_annotations();
        self.clear_legend();
        self.page.apply(PageCommand::Mask { geometry: None });
        self.active = false;
        self.theme = None;
        self.last_error = None;
        tracing::info!(target: "achroma_reader", domain = %self.domain, "reader deactivated");
    }

    fn refresh_active(&mut self) -> Result<(), HostError> {
        if !self.active {
            return Ok(());
        }
        self.apply_styles();
        self.apply_image_adjustments(None);
        self.update_legend();
        self.update_reading_mask()?;
        if self.settings.adaptive_mode {
            self.setup_adaptive_mode()?;
        } else {
            self.teardown_adaptive_mode();
        }
        Ok(())
    }

    /// Writes the profile and palette variables plus the status line.
    pub fn apply_styles(&mut self) {
        let fallback;
        let theme = match &self.theme {
            Some(theme) => theme,
            None => {
                fallback = default_theme();
                &fallback
            }
        };
        for (name, value) in compute_style_variables(&self.profile, theme) {
            self.page.apply(PageCommand::SetProperty { name: name.to_string(), value });
        }
        self.page.apply(PageCommand::Status { text: inline_status(&self.profile) });
    }

    /// Sets image variables and annotates `images`, or every page image when `None`.
    fn apply_image_adjustments(&mut self, images: Option<&[ImageNode]>) {
        let config = self.settings.image_adjustments.clone();
        if !config.enabled {
            for name in IMAGE_VARIABLES {
                self.page.apply(PageCommand::RemoveProperty { name: name.to_string() });
            }
            self.clear_annotations();
            return;
        }
        for (name, value) in compute_image_variables(&config) {
            self.page.apply(PageCommand::SetProperty { name: name.to_string(), value });
        }
        if !config.annotate {
            self.clear_annotations();
            return;
        }
        let added = match images {
            Some(images) => self.annotator.annotate(images),
            None => {
                let all = self.page.images();
                self.annotator.annotate(&all)
            }
        };
        if !added.is_empty() {
            self.page.apply(PageCommand::Annotate { annotations: added });
        }
    }

    fn clear_annotations(&mut self) {
        let removed = self.annotator.clear();
        if !removed.is_empty() {
            self.page.apply(PageCommand::RemoveAnnotations { nodes: removed });
        }
    }

    /// Rebuilds the color legend from the page's current candidates.
    pub fn update_legend(&mut self) {
        let entries = build_legend(&self.settings.color_legend, &self.page.legend_candidates());
        if entries.is_empty() {
            self.clear_legend();
            return;
        }
        self.legend = entries.clone();
        self.page.apply(PageCommand::ShowLegend { entries });
    }

    fn clear_legend(&mut self) {
        if !self.legend.is_empty() {
            self.legend.clear();
            self.page.apply(PageCommand::ClearLegend);
        }
    }

    fn update_reading_mask(&mut self) -> Result<(), HostError> {
        if !self.settings.reading_mask.enabled {
            let mut released = false;
            for kind in MASK_LISTENERS {
                if let Some(id) = self.scope.release(kind) {
                    self.page.release_listener(id);
                    released = true;
                }
            }
            if released {
                self.page.apply(PageCommand::Mask { geometry: None });
            }
            return Ok(());
        }
        for kind in MASK_LISTENERS {
            if !self.scope.is_registered(kind) {
                let id = self.page.register_listener(kind)?;
                if let Some(previous) = self.scope.register(kind, id) {
                    self.page.release_listener(previous);
                }
            }
        }
        self.reposition_mask();
        Ok(())
    }

    fn reposition_mask(&mut self) {
        if !self.scope.is_registered(ListenerKind::PointerMove) {
            return;
        }
        let geometry = compute_mask_geometry(
            &self.settings.reading_mask,
            self.page.viewport_height(),
            self.pointer_y,
        );
        self.page.apply(PageCommand::Mask { geometry: Some(geometry) });
    }

    fn setup_adaptive_mode(&mut self) -> Result<(), HostError> {
        if self.scope.is_registered(ListenerKind::MutationObserver) {
            return Ok(());
        }
        let id = self.page.register_listener(ListenerKind::MutationObserver)?;
        self.scope.register(ListenerKind::MutationObserver, id);
        Ok(())
    }

    fn teardown_adaptive_mode(&mut self) {
        if let Some(id) = self.scope.release(ListenerKind::MutationObserver) {
            self.page.release_listener(id);
        }
        self.scope.cancel_legend_refresh();
    }

    // ─── Page events ───

    /// Handles one mutation batch. The theme is not re-detected.
    pub fn handle_mutations(&mut self, batch: &MutationBatch, now: Instant) {
        if !self.active
            || !self.settings.adaptive_mode
            || !self.scope.is_registered(ListenerKind::MutationObserver)
        {
            return;
        }
        if batch.has_additions() && self.settings.image_adjustments.enabled {
            self.apply_image_adjustments(Some(batch.added_images.as_slice()));
        }
        if !batch.removed_nodes.is_empty() && !self.annotator.is_empty() {
            let removed = self.annotator.remove_nodes(&batch.removed_nodes);
            if !removed.is_empty() {
                self.page.apply(PageCommand::RemoveAnnotations { nodes: removed });
            }
        }
        if self.settings.color_legend.enabled {
            self.scope.schedule_legend_refresh(now);
        }
    }

    /// Takes new page observations; pointer and viewport changes move the mask.
    pub fn page_update(&mut self, update: &PageUpdate) {
        self.page.ingest(update);
        if self.awaiting_snapshot && update.snapshot.is_some() {
            self.activate_deferred();
        }
        if let Some(y) = update.pointer_y.filter(|y| y.is_finite()) {
            self.pointer_y = Some(y);
        }
        if self.active && (update.pointer_y.is_some() || update.viewport_height.is_some()) {
            self.reposition_mask();
        }
    }

    /// Applies a change written by another context. Only the local area is watched.
    pub fn handle_storage_change(&mut self, change: &StorageChange) -> Result<(), HostError> {
        if change.area != AreaName::Local {
            return Ok(());
        }
        let Some(value) = &change.new_value else {
            return Ok(());
        };
        if change.key == DEFAULTS_KEY {
            self.defaults = normalize(value);
        }
        if change.key == self.domain_key {
            let updated = normalize(value);
            if updated == self.settings {
                return Ok(());
            }
            tracing::debug!(target: "achroma_reader", key = %change.key, "settings changed externally");
            self.settings = updated;
            self.profile = self.settings.active_profile();
            return self.refresh_active();
        }
        Ok(())
    }

    /// Maps a key event onto a reader action. Returns true when it was consumed.
    pub fn keydown(&mut self, event: &KeyEvent) -> Result<bool, HostError> {
        match self.shortcuts.action_for(event) {
            Some(ShortcutAction::ToggleReader) => {
                self.toggle(None)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ─── Timers ───

    /// Earliest pending timer, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.scope.next_deadline(), self.coalescer.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Runs every timer whose deadline has passed.
    pub fn poll_timers(&mut self, now: Instant) -> Result<(), HostError> {
        if self.scope.legend_refresh_due(now) && self.active && self.settings.color_legend.enabled {
            self.update_legend();
        }
        if let Some(patch) = self.coalescer.take_due(now) {
            tracing::debug!(target: "achroma_reader", "committing coalesced settings patch");
            self.apply_setting_changes(&patch, Scope::Domain, false)?;
        }
        Ok(())
    }

    /// Commits a queued patch immediately.
    pub fn flush_pending(&mut self) -> Result<(), HostError> {
        match self.coalescer.flush() {
            Some(patch) => self.apply_setting_changes(&patch, Scope::Domain, false),
            None => Ok(()),
        }
    }

    // ─── Profiles ───

    pub fn create_profile(&mut self, request: &CreateProfileRequest) -> Result<String, ProfileError> {
        let (next, id) = self.profiles.create_profile(&self.settings, request)?;
        self.commit_profiles(next);
        Ok(id)
    }

    pub fn update_profile(&mut self, id: &str, changes: &Value) -> Result<(), ProfileError> {
        let next = self.profiles.update_profile(&self.settings, id, changes)?;
        self.commit_profiles(next);
        Ok(())
    }

    pub fn delete_profile(&mut self, id: &str) -> Result<(), ProfileError> {
        let next = self.profiles.delete_profile(&self.settings, id)?;
        self.commit_profiles(next);
        Ok(())
    }

    pub fn set_active_profile(&mut self, id: &str) -> Result<(), ProfileError> {
        let next = self.profiles.set_active_profile(&self.settings, id)?;
        self.commit_profiles(next);
        Ok(())
    }

    fn commit_profiles(&mut self, next: Settings) {
        if let Err(e) = self.replace_domain_settings(next) {
            tracing::warn!(target: "achroma_reader", error = %e, "re-applying after profile change failed");
            self.last_error = Some(e.to_string());
        }
    }

    // ─── Export / import / reset ───

    pub fn export_settings(&self) -> Value {
        json!({
            "version": EXPORT_VERSION,
            "exportedAt": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "domain": self.domain,
            "settings": to_value(&self.settings),
            "defaults": to_value(&self.defaults),
        })
    }

    /// Accepts an exported snapshot or a bare settings blob.
    pub fn import_settings(&mut self, payload: &Value) -> Result<(), MessageError> {
        let Value::Object(map) = payload else {
            return Err(MessageError::InvalidPayload("import expects a JSON object".into()));
        };
        let (settings_raw, defaults_raw) = match map.get("settings") {
            Some(settings @ Value::Object(_)) => (settings, map.get("defaults").filter(|d| d.is_object())),
            _ => (payload, None),
        };
        if let Some(defaults) = defaults_raw {
            self.save_settings(defaults, Scope::Defaults, true);
        }
        self.save_settings(settings_raw, Scope::Domain, true);
        tracing::info!(target: "achroma_reader", with_defaults = defaults_raw.is_some(), "settings imported");
        self.refresh_active()
            .map_err(|e| MessageError::Channel(e.to_string()))
    }

    /// Replaces the domain record with the defaults, keeping the current `enabled` state.
    pub fn reset_settings(&mut self) -> Result<(), HostError> {
        let mut next = self.defaults.clone();
        next.enabled = self.settings.enabled;
        self.replace_domain_settings(next)
    }

    // ─── Onboarding ───

    pub fn show_onboarding(&mut self) {
        self.onboarding_visible = true;
        self.page.apply(PageCommand::Onboarding { visible: true });
    }

    pub fn dismiss_onboarding(&mut self) {
        self.onboarding_visible = false;
        self.page.apply(PageCommand::Onboarding { visible: false });
        self.save_settings(&json!({ "onboarding": { "completed": true } }), Scope::Domain, false);
    }
}

impl Drop for ReaderApp {
    fn drop(&mut self) {
        self.deactivate();
    }
}
