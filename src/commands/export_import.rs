//! Export and import command handlers - moving profiles between machines.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::profile::ProfileStore;
use crate::utils::restrict_file_permissions;

/// Handle the export command - write the still-encrypted profiles file
pub async fn handle_export(store: &ProfileStore, output: Option<PathBuf>) -> Result<()> {
    let data = store.export().await?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, &data).await?;
            restrict_file_permissions(&path)?;
            eprintln!("Exported profiles to {}", path.display());
        }
        None => println!("{}", data),
    }

    Ok(())
}

/// Handle the import command - add every valid profile from an export file
pub async fn handle_import(store: &ProfileStore, file: &Path) -> Result<()> {
    let data = tokio::fs::read_to_string(file).await?;
    let imported = store.import(&data).await?;
    println!("Imported {} profile(s) from {}", imported, file.display());
    Ok(())
}
