//! Health results and topology detection from `serverStatus`.

use std::fmt;

use bson::{Bson, Document};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Cluster shape as observed from a server's own status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Topology {
    Single,
    ReplicaSetNoPrimary,
    ReplicaSetWithPrimary,
    Sharded,
    Unknown,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Topology::Single => "single",
            Topology::ReplicaSetNoPrimary => "replica set (no primary)",
            Topology::ReplicaSetWithPrimary => "replica set (with primary)",
            Topology::Sharded => "sharded",
            Topology::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Point-in-time result of testing a profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHealth {
    pub is_connected: bool,
    /// Round trip in milliseconds. On failure, time spent until the failure.
    pub latency: u64,
    pub server_version: Option<String>,
    pub replica_set: Option<String>,
    pub topology: Topology,
    pub connection_count: Option<u64>,
    pub tested_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl ConnectionHealth {
    /// A failed test result.
    pub fn failed(latency: u64, error: impl Into<String>) -> Self {
        Self {
            is_connected: false,
            latency,
            server_version: None,
            replica_set: None,
            topology: Topology::Unknown,
            connection_count: None,
            tested_at: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// Cluster membership reported by `serverStatus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterRole {
    ReplicaSetMember {
        set_name: Option<String>,
        is_primary: bool,
    },
    ShardRouter,
    Standalone,
}

/// The parts of `serverStatus` this crate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub version: Option<String>,
    pub role: ClusterRole,
    pub connections_current: Option<u64>,
}

impl ServerStatus {
    /// Decode from a raw `serverStatus` reply. Missing or oddly typed fields
    /// are treated as absent rather than as errors.
    pub fn from_document(doc: &Document) -> Self {
        let role = if let Ok(repl) = doc.get_document("repl") {
            let set_name = repl.get_str("setName").ok().map(str::to_string);
            let is_primary = ["isWritablePrimary", "ismaster"]
                .iter()
                .any(|key| repl.get(*key).and_then(Bson::as_bool).unwrap_or(false));
            ClusterRole::ReplicaSetMember {
                set_name,
                is_primary,
            }
        } else if doc.contains_key("sharding") {
            ClusterRole::ShardRouter
        } else {
            ClusterRole::Standalone
        };

        let connections_current = doc
            .get_document("connections")
            .ok()
            .and_then(|c| c.get("current"))
            .and_then(as_u64);

        Self {
            version: doc.get_str("version").ok().map(str::to_string),
            role,
            connections_current,
        }
    }

    pub fn topology(&self) -> Topology {
        derive_topology(&self.role)
    }

    pub fn replica_set(&self) -> Option<&str> {
        match &self.role {
            ClusterRole::ReplicaSetMember { set_name, .. } => set_name.as_deref(),
            _ => None,
        }
    }
}

/// Replication info wins over sharding info; neither means a single node.
pub fn derive_topology(role: &ClusterRole) -> Topology {
    match role {
        ClusterRole::ReplicaSetMember { is_primary: true, .. } => Topology::ReplicaSetWithPrimary,
        ClusterRole::ReplicaSetMember { is_primary: false, .. } => Topology::ReplicaSetNoPrimary,
        ClusterRole::ShardRouter => Topology::Sharded,
        ClusterRole::Standalone => Topology::Single,
    }
}

/// Version string from a `buildInfo` reply.
pub fn build_version(doc: &Document) -> Option<String> {
    doc.get_str("version").ok().map(str::to_string)
}

fn as_u64(value: &Bson) -> Option<u64> {
    match value {
        Bson::Int32(n) => u64::try_from(*n).ok(),
        Bson::Int64(n) => u64::try_from(*n).ok(),
        Bson::Double(n) if *n >= 0.0 => Some(*n as u64),
        _ => None,
    }
}
