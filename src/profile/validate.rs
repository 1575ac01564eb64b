//! Profile validation.

use std::sync::LazyLock;

use regex::Regex;

use super::model::ConnectionProfile;
use crate::error::{MprofError, Result};

/// Recognized connection string schemes.
pub const URI_SCHEMES: [&str; 2] = ["mongodb://", "mongodb+srv://"];

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").unwrap_or_else(|e| panic!("invalid name pattern: {}", e))
});

/// Check a profile name against `^[A-Za-z0-9_-]+$`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MprofError::validation("profile name is required"));
    }
    if !NAME_RE.is_match(name) {
        return Err(MprofError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Check that a connection string uses a recognized scheme and has
/// something after it.
pub fn validate_uri(uri: &str) -> Result<()> {
    if uri.trim().is_empty() {
        return Err(MprofError::validation("connection string is required"));
    }
    let rest = URI_SCHEMES
        .iter()
        .find_map(|scheme| uri.strip_prefix(scheme))
        .ok_or_else(|| {
            MprofError::InvalidUri(format!(
                "must start with {} (got '{}')",
                URI_SCHEMES.join(" or "),
                redact(uri)
            ))
        })?;
    if rest.is_empty() {
        return Err(MprofError::InvalidUri("host is missing".to_string()));
    }
    Ok(())
}

/// Validate every field the store depends on.
pub fn validate_profile(profile: &ConnectionProfile) -> Result<()> {
    validate_name(&profile.name)?;
    validate_uri(&profile.uri)
}

/// Turn bare `host:port` input into a connection string. URIs that already
/// carry a scheme pass through untouched.
pub fn normalize_uri(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("mongodb://{}", trimmed)
    }
}

/// Hide credentials before a URI goes into an error message.
fn redact(uri: &str) -> String {
    match (uri.find("://"), uri.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &uri[..scheme_end], &uri[at..])
        }
        _ => uri.to_string(),
    }
}
