//! Utility functions shared across the application.

mod error;
pub(crate) mod permissions;

pub use error::format_error;
pub use permissions::restrict_file_permissions;
