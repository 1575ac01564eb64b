//! Shared helpers for the integration tests.

#![allow(dead_code)]

pub mod fake_driver;

use std::path::PathBuf;

use mongo_profiles::ProfileStore;
use mongo_profiles::crypto::UriCipher;

pub const TEST_SECRET: &str = "integration-test-secret";

/// A fresh directory under the system temp dir. Not created yet.
pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("mprof-test-{}", uuid::Uuid::new_v4()))
}

/// A store in a fresh temp dir.
pub fn temp_store() -> ProfileStore {
    store_at(temp_dir().join("profiles.json"))
}

pub fn store_at(path: PathBuf) -> ProfileStore {
    ProfileStore::new(path, UriCipher::new(TEST_SECRET))
}
