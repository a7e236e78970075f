use std::fmt;

// === StorageError ===

/// Errors related to the persistent key-value store.
#[derive(Debug)]
pub enum StorageError {
    /// The store cannot be reached from this context.
    Unavailable(String),
    /// Database operation failed.
    DatabaseError(String),
    /// Failed to serialize or deserialize a stored value.
    SerializationError(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            StorageError::DatabaseError(msg) => write!(f, "Storage database error: {}", msg),
            StorageError::SerializationError(msg) => {
                write!(f, "Storage serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}

// === ProfileError ===

/// Errors related to profile lifecycle operations.
#[derive(Debug)]
pub enum ProfileError {
    /// Profile with the given ID was not found.
    NotFound(String),
    /// The last remaining profile cannot be removed.
    LastProfile(String),
    /// The request is missing a required field.
    InvalidRequest(String),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::NotFound(id) => write!(f, "Profile not found: {}", id),
            ProfileError::LastProfile(id) => {
                write!(f, "Cannot delete the last remaining profile: {}", id)
            }
            ProfileError::InvalidRequest(msg) => write!(f, "Invalid profile request: {}", msg),
        }
    }
}

impl std::error::Error for ProfileError {}

// === HostError ===

/// Errors raised by the page host (the live document the reader styles).
#[derive(Debug)]
pub enum HostError {
    /// Computed styles could not be read.
    SnapshotFailed(String),
    /// The page is gone or not attached.
    Detached,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::SnapshotFailed(msg) => write!(f, "Style snapshot failed: {}", msg),
            HostError::Detached => write!(f, "Page host detached"),
        }
    }
}

impl std::error::Error for HostError {}

// === MessageError ===

/// Errors surfaced while delivering a message to the content context.
#[derive(Debug)]
pub enum MessageError {
    /// The channel failed and no recovery applies.
    Channel(String),
    /// Site access was refused by the user or the browser.
    PermissionDenied(String),
    /// The page cannot host the reader at all.
    SiteUnsupported(String),
    /// Re-establishing the content context did not help.
    RecoveryFailed(String),
    /// The message payload was malformed.
    InvalidPayload(String),
}

impl MessageError {
    /// True for errors the UI should answer with an access prompt.
    pub fn is_permission(&self) -> bool {
        matches!(self, MessageError::PermissionDenied(_))
    }

    /// Machine-readable code for the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            MessageError::Channel(_) => "CHANNEL_ERROR",
            MessageError::PermissionDenied(_) => "HOST_PERMISSION_DENIED",
            MessageError::SiteUnsupported(_) => "SITE_UNSUPPORTED",
            MessageError::RecoveryFailed(_) => "RECOVERY_FAILED",
            MessageError::InvalidPayload(_) => "INVALID_PAYLOAD",
        }
    }
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::Channel(msg) => write!(f, "Message channel error: {}", msg),
            MessageError::PermissionDenied(origin) => {
                write!(f, "Site access required: {}", origin)
            }
            MessageError::SiteUnsupported(url) => write!(f, "Page not supported: {}", url),
            MessageError::RecoveryFailed(msg) => {
                write!(f, "Content context recovery failed: {}", msg)
            }
            MessageError::InvalidPayload(msg) => write!(f, "Invalid message payload: {}", msg),
        }
    }
}

impl std::error::Error for MessageError {}

// === ConfigError ===

/// Errors related to host configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    InvalidValue(String, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(key, value) => {
                write!(f, "Invalid value for {}: {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
