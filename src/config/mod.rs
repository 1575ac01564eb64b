//! Configuration loading and management.

mod loader;
mod types;

pub use types::{
    CONFIG_DIR_ENV, Config, ConnectionSettings, DEFAULT_SECRET, ManagerSettings, SECRET_ENV,
    Settings,
};
