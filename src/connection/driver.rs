//! Database driver seam.
//!
//! The manager only needs a handful of primitives from the driver: open a
//! client, ping, `serverStatus`, `buildInfo`, list databases/collections and
//! close. [`MongoDriver`] provides them on top of the `mongodb` crate.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::{Document, doc};
use mongodb::Client;
use mongodb::options::ClientOptions;

use super::options::ResolvedOptions;
use crate::error::{MprofError, Result};

/// A live client handle for one server or cluster.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Minimal round trip (`{ ping: 1 }` against `admin`).
    async fn ping(&self) -> Result<()>;

    /// Raw `serverStatus` reply.
    async fn server_status(&self) -> Result<Document>;

    /// Raw `buildInfo` reply.
    async fn build_info(&self) -> Result<Document>;

    async fn list_database_names(&self) -> Result<Vec<String>>;

    async fn list_collection_names(&self, database: &str) -> Result<Vec<String>>;

    /// Close the handle and its sockets.
    async fn close(&self) -> Result<()>;
}

/// Opens [`DatabaseClient`]s.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Open a client and verify the server answers before returning it.
    async fn connect(&self, uri: &str, options: &ResolvedOptions) -> Result<Arc<dyn DatabaseClient>>;
}

/// Driver backed by the official MongoDB crate.
#[derive(Debug, Default, Clone)]
pub struct MongoDriver;

impl MongoDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatabaseDriver for MongoDriver {
    async fn connect(&self, uri: &str, options: &ResolvedOptions) -> Result<Arc<dyn DatabaseClient>> {
        let uri = options.apply_to_uri(uri);
        let mut client_options = ClientOptions::parse(&uri).await?;

        // Values spelled out in the connection string take precedence.
        client_options.max_pool_size.get_or_insert(options.max_pool_size);
        client_options.min_pool_size.get_or_insert(options.min_pool_size);
        client_options.max_idle_time.get_or_insert(options.max_idle_time);
        client_options
            .server_selection_timeout
            .get_or_insert(options.server_selection_timeout);
        client_options.connect_timeout.get_or_insert(options.connect_timeout);
        client_options.heartbeat_freq.get_or_insert(options.heartbeat_frequency);
        client_options.retry_writes.get_or_insert(options.retry_writes);
        client_options.retry_reads.get_or_insert(options.retry_reads);
        if client_options.app_name.is_none() {
            client_options.app_name = options.app_name.clone();
        }

        let client = Client::with_options(client_options)?;
        let handle = MongoClient {
            client,
            op_timeout: options.socket_timeout,
        };

        // The driver connects lazily; force a round trip so failures show up here.
        handle.ping().await?;
        tracing::debug!("connected to MongoDB");

        Ok(Arc::new(handle))
    }
}

/// [`DatabaseClient`] over a `mongodb::Client`.
pub struct MongoClient {
    client: Client,
    op_timeout: Duration,
}

impl MongoClient {
    async fn admin_command(&self, command: Document) -> Result<Document> {
        let admin = self.client.database("admin");
        with_timeout(self.op_timeout, async move {
            admin.run_command(command).await.map_err(MprofError::from)
        })
        .await
    }
}

#[async_trait]
impl DatabaseClient for MongoClient {
    async fn ping(&self) -> Result<()> {
        self.admin_command(doc! { "ping": 1 }).await.map(|_| ())
    }

    async fn server_status(&self) -> Result<Document> {
        self.admin_command(doc! { "serverStatus": 1 }).await
    }

    async fn build_info(&self) -> Result<Document> {
        self.admin_command(doc! { "buildInfo": 1 }).await
    }

    async fn list_database_names(&self) -> Result<Vec<String>> {
        let client = self.client.clone();
        with_timeout(self.op_timeout, async move {
            client.list_database_names().await.map_err(MprofError::from)
        })
        .await
    }

    async fn list_collection_names(&self, database: &str) -> Result<Vec<String>> {
        let db = self.client.database(database);
        with_timeout(self.op_timeout, async move {
            db.list_collection_names().await.map_err(MprofError::from)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        with_timeout(self.op_timeout, async {
            self.client.clone().shutdown().await;
            Ok(())
        })
        .await
    }
}

/// Bound a driver call by `limit`.
async fn with_timeout<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(MprofError::Other(format!(
            "operation timed out after {}ms",
            limit.as_millis()
        ))),
    }
}
