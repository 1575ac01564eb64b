//! Connection option defaults and per-profile resolution.

use std::time::Duration;

use crate::profile::ConnectionOptions;

/// Fully resolved connection settings handed to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub max_idle_time: Duration,
    pub server_selection_timeout: Duration,
    pub connect_timeout: Duration,
    /// Upper bound for any single command round trip.
    pub socket_timeout: Duration,
    pub heartbeat_frequency: Duration,
    pub retry_writes: bool,
    pub retry_reads: bool,
    pub read_preference: String,
    pub tls: Option<bool>,
    pub tls_allow_invalid_certificates: Option<bool>,
    pub auth_source: Option<String>,
    pub auth_mechanism: Option<String>,
    pub app_name: Option<String>,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            max_pool_size: 10,
            min_pool_size: 0,
            max_idle_time: Duration::from_secs(30),
            server_selection_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            socket_timeout: Duration::from_secs(45),
            heartbeat_frequency: Duration::from_secs(10),
            retry_writes: true,
            retry_reads: true,
            read_preference: "primaryPreferred".to_string(),
            tls: None,
            tls_allow_invalid_certificates: None,
            auth_source: None,
            auth_mechanism: None,
            app_name: Some("mprof".to_string()),
        }
    }
}

impl ResolvedOptions {
    /// Overlay a profile's own options onto these defaults, field by field.
    pub fn resolve(&self, overrides: Option<&ConnectionOptions>) -> Self {
        let mut resolved = self.clone();
        let Some(o) = overrides else {
            return resolved;
        };

        if let Some(v) = o.max_pool_size {
            resolved.max_pool_size = v;
        }
        if let Some(v) = o.min_pool_size {
            resolved.min_pool_size = v;
        }
        if let Some(ms) = o.max_idle_time_ms {
            resolved.max_idle_time = Duration::from_millis(ms);
        }
        if let Some(ms) = o.server_selection_timeout_ms {
            resolved.server_selection_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = o.connect_timeout_ms {
            resolved.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = o.socket_timeout_ms {
            resolved.socket_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = o.heartbeat_frequency_ms {
            resolved.heartbeat_frequency = Duration::from_millis(ms);
        }
        if let Some(v) = o.retry_writes {
            resolved.retry_writes = v;
        }
        if let Some(v) = o.retry_reads {
            resolved.retry_reads = v;
        }
        if let Some(v) = &o.read_preference {
            resolved.read_preference = v.clone();
        }
        if o.tls.is_some() {
            resolved.tls = o.tls;
        }
        if o.tls_allow_invalid_certificates.is_some() {
            resolved.tls_allow_invalid_certificates = o.tls_allow_invalid_certificates;
        }
        if o.auth_source.is_some() {
            resolved.auth_source = o.auth_source.clone();
        }
        if o.auth_mechanism.is_some() {
            resolved.auth_mechanism = o.auth_mechanism.clone();
        }
        if o.app_name.is_some() {
            resolved.app_name = o.app_name.clone();
        }

        resolved
    }

    /// Append read preference and TLS/auth settings to a connection string
    /// as query parameters. Parameters already present in the URI win.
    pub fn apply_to_uri(&self, uri: &str) -> String {
        let mut params: Vec<(&str, String)> = vec![("readPreference", self.read_preference.clone())];
        if let Some(v) = self.tls {
            params.push(("tls", v.to_string()));
        }
        if let Some(v) = self.tls_allow_invalid_certificates {
            params.push(("tlsAllowInvalidCertificates", v.to_string()));
        }
        if let Some(v) = &self.auth_source {
            params.push(("authSource", v.clone()));
        }
        if let Some(v) = &self.auth_mechanism {
            params.push(("authMechanism", v.clone()));
        }

        let existing = uri
            .split_once('?')
            .map(|(_, q)| q.to_ascii_lowercase())
            .unwrap_or_default();
        let present = |key: &str| {
            let key = key.to_ascii_lowercase();
            existing
                .split('&')
                .any(|pair| pair.split('=').next() == Some(key.as_str()))
        };

        let additions: Vec<String> = params
            .into_iter()
            .filter(|(key, _)| !present(key))
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        if additions.is_empty() {
            return uri.to_string();
        }

        let after_scheme = uri.split_once("://").map(|(_, rest)| rest).unwrap_or(uri);
        let separator = if after_scheme.contains('?') {
            if uri.ends_with('?') || uri.ends_with('&') { "" } else { "&" }
        } else if after_scheme.contains('/') {
            "?"
        } else {
            "/?"
        };

        format!("{}{}{}", uri, separator, additions.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_overrides_per_field() {
        let defaults = ResolvedOptions::default();
        let overrides = ConnectionOptions {
            max_pool_size: Some(50),
            server_selection_timeout_ms: Some(1500),
            retry_writes: Some(false),
            ..Default::default()
        };

        let resolved = defaults.resolve(Some(&overrides));
        assert_eq!(resolved.max_pool_size, 50);
        assert_eq!(resolved.server_selection_timeout, Duration::from_millis(1500));
        assert!(!resolved.retry_writes);
        // Everything else comes from the defaults
        assert_eq!(resolved.connect_timeout, defaults.connect_timeout);
        assert_eq!(resolved.read_preference, "primaryPreferred");
        assert!(resolved.retry_reads);
    }

    #[test]
    fn test_resolve_without_overrides() {
        let defaults = ResolvedOptions::default();
        assert_eq!(defaults.resolve(None), defaults);
    }

    #[test]
    fn test_apply_to_uri() {
        let opts = ResolvedOptions {
            auth_source: Some("admin".to_string()),
            ..Default::default()
        };
        assert_eq!(
            opts.apply_to_uri("mongodb://localhost:27017"),
            "mongodb://localhost:27017/?readPreference=primaryPreferred&authSource=admin"
        );
        assert_eq!(
            opts.apply_to_uri("mongodb://localhost:27017/app"),
            "mongodb://localhost:27017/app?readPreference=primaryPreferred&authSource=admin"
        );
        // Existing parameters are kept and not duplicated
        assert_eq!(
            opts.apply_to_uri("mongodb://h/?readPreference=secondary"),
            "mongodb://h/?readPreference=secondary&authSource=admin"
        );
    }
}
