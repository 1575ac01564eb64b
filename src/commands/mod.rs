//! Command handlers for the mprof CLI.
//!
//! This module contains all the command handler functions, organized by command type.

mod config_cmd;
mod connectivity;
mod export_import;
mod profile;

pub use config_cmd::{handle_config_generate, handle_config_show};
pub use connectivity::{handle_databases, handle_test};
pub use export_import::{handle_export, handle_import};
pub use profile::{AddArgs, handle_add, handle_default, handle_list, handle_remove, handle_show};
