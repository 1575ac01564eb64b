//! Unified error type for mongo-profiles.
//!
//! All public APIs return `Result<T, MprofError>`. The variants follow the
//! failure classes callers need to tell apart: validation, not-found,
//! connectivity, circuit-open, and persistence.

use std::fmt;

use chrono::{DateTime, Utc};

/// The unified error type for all profile store and connection manager operations.
#[derive(Debug)]
pub enum MprofError {
    // ── I/O & filesystem ───────────────────────────────────────────────
    /// Filesystem or I/O operation failed.
    Io(std::io::Error),

    // ── Serialization ──────────────────────────────────────────────────
    /// JSON serialization/deserialization error.
    Json(serde_json::Error),

    /// KDL settings file parsing error.
    Config(String),

    // ── Encryption ─────────────────────────────────────────────────────
    /// Encryption or decryption of a stored URI failed.
    Encryption(String),

    // ── Validation ─────────────────────────────────────────────────────
    /// Profile name does not match `^[A-Za-z0-9_-]+$`.
    InvalidName(String),

    /// Connection string does not start with a recognized scheme.
    InvalidUri(String),

    /// A required field is missing or empty.
    Validation(String),

    /// A profile with this name already exists.
    DuplicateName(String),

    // ── Lookup errors ──────────────────────────────────────────────────
    /// A requested profile was not found.
    NotFound(String),

    // ── Connectivity ───────────────────────────────────────────────────
    /// Connection attempts for this profile are suspended until `retry_at`.
    CircuitOpen {
        profile: String,
        retry_at: DateTime<Utc>,
    },

    /// Connecting to or talking to the server for a profile failed.
    Connection { profile: String, message: String },

    /// Raw driver error not yet attributed to a profile.
    Driver(mongodb::error::Error),

    // ── Catch-all ──────────────────────────────────────────────────────
    /// Any other error.
    Other(String),
}

// ── Display ────────────────────────────────────────────────────────────

impl fmt::Display for MprofError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MprofError::Io(e) => write!(f, "{}", e),
            MprofError::Json(e) => write!(f, "JSON error: {}", e),
            MprofError::Config(msg) => write!(f, "config error: {}", msg),
            MprofError::Encryption(msg) => write!(f, "encryption error: {}", msg),
            MprofError::InvalidName(name) => write!(
                f,
                "invalid profile name '{}': only letters, digits, '_' and '-' are allowed",
                name
            ),
            MprofError::InvalidUri(msg) => write!(f, "invalid connection string: {}", msg),
            MprofError::Validation(msg) => write!(f, "{}", msg),
            MprofError::DuplicateName(name) => {
                write!(f, "a profile named '{}' already exists", name)
            }
            MprofError::NotFound(msg) => write!(f, "{}", msg),
            MprofError::CircuitOpen { profile, retry_at } => write!(
                f,
                "connections to '{}' are temporarily disabled until {}",
                profile,
                retry_at.to_rfc3339()
            ),
            MprofError::Connection { profile, message } => {
                write!(f, "connection '{}': {}", profile, message)
            }
            MprofError::Driver(e) => write!(f, "driver error: {}", e),
            MprofError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for MprofError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MprofError::Io(e) => Some(e),
            MprofError::Json(e) => Some(e),
            MprofError::Driver(e) => Some(e),
            _ => None,
        }
    }
}

// ── From implementations for common error types ────────────────────────

impl From<std::io::Error> for MprofError {
    fn from(e: std::io::Error) -> Self {
        MprofError::Io(e)
    }
}

impl From<serde_json::Error> for MprofError {
    fn from(e: serde_json::Error) -> Self {
        MprofError::Json(e)
    }
}

impl From<mongodb::error::Error> for MprofError {
    fn from(e: mongodb::error::Error) -> Self {
        MprofError::Driver(e)
    }
}

impl From<String> for MprofError {
    fn from(s: String) -> Self {
        MprofError::Other(s)
    }
}

impl From<&str> for MprofError {
    fn from(s: &str) -> Self {
        MprofError::Other(s.to_string())
    }
}

// ── Convenience constructors ───────────────────────────────────────────

impl MprofError {
    /// Create an encryption/decryption error.
    pub fn encryption(message: impl Into<String>) -> Self {
        MprofError::Encryption(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        MprofError::NotFound(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        MprofError::Validation(message.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        MprofError::Config(message.into())
    }

    /// Create a connection error for a profile, translating common driver
    /// failures into user-friendly messages.
    pub fn connection(profile: impl Into<String>, e: impl fmt::Display) -> Self {
        MprofError::Connection {
            profile: profile.into(),
            message: friendly_driver_message(&e.to_string()),
        }
    }

    /// True for the "temporarily disabled" class.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, MprofError::CircuitOpen { .. })
    }

    /// True when the error means "no such profile".
    pub fn is_not_found(&self) -> bool {
        matches!(self, MprofError::NotFound(_))
    }
}

/// Map raw driver text onto short messages. Unknown messages pass through.
pub(crate) fn friendly_driver_message(msg: &str) -> String {
    if msg.contains("Server selection timeout") {
        "server unreachable (server selection timed out)".to_string()
    } else if msg.contains("Authentication failed") || msg.contains("AuthenticationFailed") {
        "authentication failed (check username, password and authSource)".to_string()
    } else if msg.contains("failed to lookup address")
        || msg.contains("No such host")
        || msg.contains("DNS")
    {
        "host name could not be resolved".to_string()
    } else if msg.contains("Connection refused") {
        "connection refused".to_string()
    } else {
        msg.to_string()
    }
}

/// Convenience type alias for Results using MprofError.
pub type Result<T> = std::result::Result<T, MprofError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendly_driver_message() {
        assert_eq!(
            friendly_driver_message("Server selection timeout: No available servers"),
            "server unreachable (server selection timed out)"
        );
        assert_eq!(
            friendly_driver_message("Command failed: Authentication failed."),
            "authentication failed (check username, password and authSource)"
        );
        assert_eq!(friendly_driver_message("something odd"), "something odd");
    }

    #[test]
    fn test_error_classes() {
        let open = MprofError::CircuitOpen {
            profile: "prod".to_string(),
            retry_at: Utc::now(),
        };
        assert!(open.is_circuit_open());
        assert!(open.to_string().contains("temporarily disabled"));
        assert!(MprofError::not_found("nope").is_not_found());
        assert!(!MprofError::DuplicateName("a".into()).is_circuit_open());
    }
}
