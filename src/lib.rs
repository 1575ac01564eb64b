//! mongo-profiles - encrypted MongoDB connection profiles and a small,
//! health-checked connection pool.
//!
//! This crate provides:
//! - A [`ProfileStore`] that keeps named connection profiles on disk with
//!   every connection string encrypted, cached in memory, and rewritten
//!   atomically on change
//! - A [`ConnectionManager`] that pools one live connection per profile,
//!   tests servers, caches health results, and stops retrying unreachable
//!   servers for a while after repeated failures
//!
//! The two never call each other; the caller loads a profile from the store,
//! hands it to the manager, and writes bookkeeping back.
//!
//! # Example
//!
//! ```no_run
//! use mongo_profiles::{Config, ConnectionManager, ConnectionProfile, ProfileStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let store = ProfileStore::open(&config);
//!     store
//!         .add(ConnectionProfile::new("local", "mongodb://localhost:27017"))
//!         .await?;
//!
//!     let manager = ConnectionManager::with_mongo(config.manager_config());
//!     if let Some(profile) = store.get("local").await? {
//!         let health = manager.test(&profile).await;
//!         println!("{}: connected={} ({}ms)", profile.name, health.is_connected, health.latency);
//!         store.mark_tested(&profile.name).await?;
//!     }
//!     manager.cleanup().await;
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod connection;
pub mod crypto;
pub mod error;
pub mod profile;
pub mod utils;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use connection::{ConnectionHealth, ConnectionManager, ManagerConfig, Topology};
pub use error::{MprofError, Result};
pub use profile::{ConnectionProfile, ProfileStore, ProfileUpdate};
