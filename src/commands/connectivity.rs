//! Test and databases command handlers - talking to servers.

use super::profile::resolve_profile;
use crate::connection::{ConnectionHealth, ConnectionManager};
use crate::error::Result;
use crate::profile::ProfileStore;

/// Handle the test command - test one profile, or all of them concurrently
pub async fn handle_test(
    store: &ProfileStore,
    manager: &ConnectionManager,
    name: Option<String>,
    all: bool,
) -> Result<()> {
    let results = if all {
        let profiles = store.list().await?;
        if profiles.is_empty() {
            eprintln!("No profiles to test.");
            return Ok(());
        }
        manager.test_all(&profiles).await
    } else {
        let profile = resolve_profile(store, name.as_deref()).await?;
        let health = manager.test(&profile).await;
        vec![(profile.name, health)]
    };

    for (name, health) in &results {
        print_health(name, health);
        if health.is_connected {
            store.mark_tested(name).await?;
        }
    }

    Ok(())
}

/// Handle the databases command - connect through the pool and list databases,
/// optionally with their collections. Returns the listing that was printed.
pub async fn handle_databases(
    store: &ProfileStore,
    manager: &ConnectionManager,
    name: Option<String>,
    collections: bool,
) -> Result<Vec<(String, Vec<String>)>> {
    let profile = resolve_profile(store, name.as_deref()).await?;
    let client = manager.connect(&profile).await?;

    let mut listing = Vec::new();
    for db in client.list_database_names().await? {
        let names = if collections {
            let mut names = client.list_collection_names(&db).await?;
            names.sort();
            names
        } else {
            Vec::new()
        };
        listing.push((db, names));
    }
    store.mark_used(&profile.name).await?;

    for (db, names) in &listing {
        println!("{}", db);
        for collection in names {
            println!("  {}", collection);
        }
    }

    Ok(listing)
}

fn print_health(name: &str, health: &ConnectionHealth) {
    if health.is_connected {
        println!(
            "{}: ok ({}ms) version={} topology={}{}{}",
            name,
            health.latency,
            health.server_version.as_deref().unwrap_or("?"),
            health.topology,
            health
                .replica_set
                .as_ref()
                .map(|rs| format!(" replicaSet={}", rs))
                .unwrap_or_default(),
            health
                .connection_count
                .map(|c| format!(" connections={}", c))
                .unwrap_or_default(),
        );
    } else {
        println!(
            "{}: FAILED after {}ms: {}",
            name,
            health.latency,
            health.error.as_deref().unwrap_or("unknown error")
        );
    }
}
