//! Profile Manager — profile lifecycle edits layered on the normalizer.
//!
//! Every operation takes the current settings and returns new, re-normalized settings;
//! nothing is persisted here.

use serde_json::{Map, Value};

use crate::services::settings_normalizer::{
    generate_profile_id, merge_patch, normalize, normalize_profile, to_value,
};
use crate::types::errors::ProfileError;
use crate::types::settings::{Profile, Settings};

/// Parameters of a create request.
#[derive(Debug, Clone, Default)]
pub struct CreateProfileRequest {
    pub name: String,
    /// Profile to copy; defaults are used when absent or unknown.
    pub base_profile_id: Option<String>,
    pub activate: bool,
}

/// Trait defining profile lifecycle operations.
pub trait ProfileManagerTrait {
    fn create_profile(
        &self,
        settings: &Settings,
        request: &CreateProfileRequest,
    ) -> Result<(Settings, String), ProfileError>;
    fn update_profile(&self, settings: &Settings, id: &str, changes: &Value) -> Result<Settings, ProfileError>;
    fn delete_profile(&self, settings: &Settings, id: &str) -> Result<Settings, ProfileError>;
    fn set_active_profile(&self, settings: &Settings, id: &str) -> Result<Settings, ProfileError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileManager;

impl ProfileManager {
    pub fn new() -> Self {
        Self
    }

    fn require<'a>(settings: &'a Settings, id: &str) -> Result<&'a Profile, ProfileError> {
        settings
            .profiles
            .get(id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    fn renormalize(settings: &Settings) -> Settings {
        normalize(&to_value(settings))
    }
}

impl ProfileManagerTrait for ProfileManager {
    fn create_profile(
        &self,
        settings: &Settings,
        request: &CreateProfileRequest,
    ) -> Result<(Settings, String), ProfileError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ProfileError::InvalidRequest("profile name is required".into()));
        }

        let mut profile = request
            .base_profile_id
            .as_deref()
            .and_then(|id| settings.profiles.get(id))
            .cloned()
            .unwrap_or_default();
        profile.id = generate_profile_id();
        profile.name = name.to_string();

        let id = profile.id.clone();
        let mut next = settings.clone();
        next.profiles.insert(id.clone(), profile);
        next.profiles_order.push(id.clone());
        if request.activate {
            next.active_profile_id = id.clone();
        }
        tracing::info!(target: "achroma_reader", profile_id = %id, activate = request.activate, "profile created");
        Ok((Self::renormalize(&next), id))
    }

    fn update_profile(&self, settings: &Settings, id: &str, changes: &Value) -> Result<Settings, ProfileError> {
        let current = Self::require(settings, id)?;
        let Value::Object(changes) = changes else {
            return Err(ProfileError::InvalidRequest("changes must be an object".into()));
        };
        let mut patch: Map<String, Value> = changes.clone();
        patch.remove("id");

        let merged = merge_patch(
            &serde_json::to_value(current).unwrap_or(Value::Null),
            &Value::Object(patch),
        );
        let updated = normalize_profile(&merged, id);

        let mut next = settings.clone();
        next.profiles.insert(id.to_string(), updated);
        Ok(Self::renormalize(&next))
    }

    fn delete_profile(&self, settings: &Settings, id: &str) -> Result<Settings, ProfileError> {
        Self::require(settings, id)?;
        if settings.profiles.len() <= 1 {
            tracing::warn!(target: "achroma_reader", profile_id = %id, "refusing to delete the last profile");
            return Err(ProfileError::LastProfile(id.to_string()));
        }

        let mut next = settings.clone();
        next.profiles.remove(id);
        next.profiles_order.retain(|p| p != id);
        if next.active_profile_id == id {
            if let Some(first) = next.profiles_order.first() {
                next.active_profile_id = first.clone();
            }
        }
        tracing::info!(target: "achroma_reader", profile_id = %id, "profile deleted");
        Ok(Self::renormalize(&next))
    }

    fn set_active_profile(&self, settings: &Settings, id: &str) -> Result<Settings, ProfileError> {
        Self::require(settings, id)?;
        let mut next = settings.clone();
        next.active_profile_id = id.to_string();
        Ok(next)
    }
}
