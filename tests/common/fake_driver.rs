//! In-memory driver that counts what the manager asks of it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bson::{Document, doc};

use mongo_profiles::connection::{DatabaseClient, DatabaseDriver, ResolvedOptions};
use mongo_profiles::{MprofError, Result};

#[derive(Default)]
pub struct FakeDriver {
    connects: AtomicUsize,
    down: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    clients: Mutex<Vec<Arc<FakeClient>>>,
}

impl FakeDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of times `connect` was called, successful or not.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Make every connect to `uri` fail (or succeed again).
    pub fn set_down(&self, uri: &str, down: bool) {
        let mut set = self.down.lock().unwrap();
        if down {
            set.insert(uri.to_string());
        } else {
            set.remove(uri);
        }
    }

    /// Make every connect take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Every client handed out so far, oldest first.
    pub fn clients(&self) -> Vec<Arc<FakeClient>> {
        self.clients.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatabaseDriver for FakeDriver {
    async fn connect(&self, uri: &str, _options: &ResolvedOptions) -> Result<Arc<dyn DatabaseClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.down.lock().unwrap().contains(uri) {
            return Err(MprofError::Other(format!("connect ECONNREFUSED {}", uri)));
        }

        let client = Arc::new(FakeClient::default());
        self.clients.lock().unwrap().push(Arc::clone(&client));
        Ok(client)
    }
}

#[derive(Default)]
pub struct FakeClient {
    pings: AtomicUsize,
    collection_listings: AtomicUsize,
    dead: AtomicBool,
    closed: AtomicBool,
}

impl FakeClient {
    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn collection_listings(&self) -> usize {
        self.collection_listings.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Make subsequent pings fail.
    pub fn kill(&self) {
        self.dead.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatabaseClient for FakeClient {
    async fn ping(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.dead.load(Ordering::SeqCst) {
            return Err(MprofError::Other("connection reset".to_string()));
        }
        Ok(())
    }

    async fn server_status(&self) -> Result<Document> {
        Ok(doc! {
            "version": "7.0.4",
            "repl": { "setName": "rs0", "isWritablePrimary": true },
            "connections": { "current": 7_i32 },
        })
    }

    async fn build_info(&self) -> Result<Document> {
        Ok(doc! { "version": "7.0.5" })
    }

    async fn list_database_names(&self) -> Result<Vec<String>> {
        Ok(vec!["admin".to_string(), "app".to_string()])
    }

    async fn list_collection_names(&self, database: &str) -> Result<Vec<String>> {
        self.collection_listings.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["users".to_string(), format!("{}_events", database)])
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
