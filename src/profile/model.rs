//! Profile data model: in-memory profiles, their on-disk form, and partial updates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format tag written into every profiles file.
pub const STORAGE_VERSION: &str = "1.0";

/// Deployment environment a profile points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Environment {
    Development,
    Staging,
    Production,
    Testing,
    Local,
    Other(String),
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "staging" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            "testing" | "test" => Environment::Testing,
            "local" => Environment::Local,
            _ => Environment::Other(s),
        }
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.to_string()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
            Environment::Testing => write!(f, "testing"),
            Environment::Local => write!(f, "local"),
            Environment::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Per-profile connection tuning. Every field is optional; unset fields
/// fall back to the manager's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pool_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_pool_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_idle_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_selection_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_frequency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_writes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_reads: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_allow_invalid_certificates: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_mechanism: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

/// Bookkeeping attached to each profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetadata {
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tested: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for ProfileMetadata {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            last_used: None,
            last_tested: None,
            environment: None,
            is_default: false,
            description: None,
        }
    }
}

/// A named connection configuration with its URI in plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    pub name: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ConnectionOptions>,
    #[serde(default)]
    pub metadata: ProfileMetadata,
}

impl ConnectionProfile {
    /// Create a profile with just a name and a connection string.
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            database: None,
            alias: None,
            tags: Vec::new(),
            options: None,
            metadata: ProfileMetadata::default(),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.metadata.environment = Some(environment);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn as_default(mut self) -> Self {
        self.metadata.is_default = true;
        self
    }

    pub fn is_default(&self) -> bool {
        self.metadata.is_default
    }
}

/// On-disk form of a profile: the URI only appears encrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProfile {
    pub name: String,
    pub encrypted_uri: String,
    pub iv: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ConnectionOptions>,
    pub metadata: ProfileMetadata,
}

impl StoredProfile {
    /// Combine a profile's plain fields with an already-encrypted URI.
    pub(crate) fn from_parts(profile: &ConnectionProfile, encrypted_uri: String, iv: String) -> Self {
        Self {
            name: profile.name.clone(),
            encrypted_uri,
            iv,
            database: profile.database.clone(),
            alias: profile.alias.clone(),
            tags: profile.tags.clone(),
            options: profile.options.clone(),
            metadata: profile.metadata.clone(),
        }
    }

    /// Rebuild the in-memory profile given the decrypted URI.
    pub(crate) fn into_profile(self, uri: String) -> ConnectionProfile {
        ConnectionProfile {
            name: self.name,
            uri,
            database: self.database,
            alias: self.alias,
            tags: self.tags,
            options: self.options,
            metadata: self.metadata,
        }
    }
}

/// The whole profiles file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStorage {
    pub version: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub profiles: Vec<StoredProfile>,
}

impl ProfileStorage {
    pub fn empty() -> Self {
        Self {
            version: STORAGE_VERSION.to_string(),
            created_at: Utc::now(),
            profiles: Vec::new(),
        }
    }
}

/// Metadata fields to merge into an existing profile. `None` leaves the
/// field as is.
#[derive(Debug, Clone, Default)]
pub struct MetadataUpdate {
    pub last_used: Option<DateTime<Utc>>,
    pub last_tested: Option<DateTime<Utc>>,
    pub environment: Option<Environment>,
    pub is_default: Option<bool>,
    pub description: Option<String>,
}

/// Partial update for [`ConnectionProfile`]. The name cannot be changed.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub uri: Option<String>,
    pub database: Option<String>,
    pub alias: Option<String>,
    pub tags: Option<Vec<String>>,
    pub options: Option<ConnectionOptions>,
    pub metadata: Option<MetadataUpdate>,
}

impl ProfileUpdate {
    /// Apply onto a profile. Metadata is merged key by key; `createdAt`
    /// is never touched.
    pub(crate) fn apply_to(self, profile: &mut ConnectionProfile) {
        if let Some(uri) = self.uri {
            profile.uri = uri;
        }
        if let Some(database) = self.database {
            profile.database = Some(database);
        }
        if let Some(alias) = self.alias {
            profile.alias = Some(alias);
        }
        if let Some(tags) = self.tags {
            profile.tags = tags;
        }
        if let Some(options) = self.options {
            profile.options = Some(options);
        }
        if let Some(m) = self.metadata {
            let meta = &mut profile.metadata;
            if let Some(v) = m.last_used {
                meta.last_used = Some(v);
            }
            if let Some(v) = m.last_tested {
                meta.last_tested = Some(v);
            }
            if let Some(v) = m.environment {
                meta.environment = Some(v);
            }
            if let Some(v) = m.is_default {
                meta.is_default = v;
            }
            if let Some(v) = m.description {
                meta.description = Some(v);
            }
        }
    }
}
