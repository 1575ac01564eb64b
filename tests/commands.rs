//! Command handlers wired to a temp store and a fake driver.

mod common;

use common::fake_driver::FakeDriver;
use common::temp_store;
use mongo_profiles::commands::handle_databases;
use mongo_profiles::{ConnectionManager, ConnectionProfile, ManagerConfig};

#[tokio::test]
async fn test_databases_lists_collections() {
    let store = temp_store();
    store
        .add(ConnectionProfile::new("local", "mongodb://localhost:27017").as_default())
        .await
        .unwrap();
    let driver = FakeDriver::new();
    let manager = ConnectionManager::new(driver.clone(), ManagerConfig::default());

    let listing = handle_databases(&store, &manager, None, true).await.unwrap();

    assert_eq!(
        listing,
        vec![
            ("admin".to_string(), vec!["admin_events".to_string(), "users".to_string()]),
            ("app".to_string(), vec!["app_events".to_string(), "users".to_string()]),
        ]
    );
    assert_eq!(driver.clients()[0].collection_listings(), 2);
    assert!(manager.is_pooled("local"));

    let used = store.get("local").await.unwrap().unwrap();
    assert!(used.metadata.last_used.is_some());
    manager.cleanup().await;
}

#[tokio::test]
async fn test_databases_without_collections() {
    let store = temp_store();
    store
        .add(ConnectionProfile::new("local", "mongodb://localhost:27017"))
        .await
        .unwrap();
    let driver = FakeDriver::new();
    let manager = ConnectionManager::new(driver.clone(), ManagerConfig::default());

    let listing = handle_databases(&store, &manager, Some("local".to_string()), false)
        .await
        .unwrap();

    let names: Vec<&str> = listing.iter().map(|(db, _)| db.as_str()).collect();
    assert_eq!(names, vec!["admin", "app"]);
    assert!(listing.iter().all(|(_, collections)| collections.is_empty()));
    assert_eq!(driver.clients()[0].collection_listings(), 0);
    manager.cleanup().await;
}

#[tokio::test]
async fn test_databases_needs_a_profile() {
    let store = temp_store();
    let manager = ConnectionManager::new(FakeDriver::new(), ManagerConfig::default());

    let err = handle_databases(&store, &manager, None, false).await.unwrap_err();
    assert!(err.is_not_found());
}
