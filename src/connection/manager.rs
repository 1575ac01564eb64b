//! Connection manager: pooled connections, health checks and circuit breaking.
//!
//! The manager keeps at most one live connection per profile name. Health
//! tests always use their own short-lived connection so they never disturb
//! the pool. A background task closes connections that have been idle longer
//! than the idle timeout.
//!
//! ## Concurrency
//!
//! Pool and breaker maps sit behind plain mutexes that are only held for map
//! operations, never across an `.await`, so slow servers for one profile do
//! not hold up work on another. `connect` additionally takes a per-name async
//! lock: concurrent callers for the same profile wait for the one in-flight
//! attempt and then reuse its connection instead of opening duplicates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::breaker::{CircuitBreaker, CircuitBreakerState};
use super::driver::{DatabaseClient, DatabaseDriver, MongoDriver};
use super::health::{ConnectionHealth, ServerStatus, Topology, build_version};
use super::options::ResolvedOptions;
use crate::error::{MprofError, Result, friendly_driver_message};
use crate::profile::ConnectionProfile;

/// Manager timings and connection defaults.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// How long a health result is served from cache.
    pub health_ttl: Duration,
    /// Pooled connections unused for longer than this are closed.
    pub idle_timeout: Duration,
    /// How often the idle reaper runs.
    pub reap_interval: Duration,
    /// Consecutive failures that open a profile's circuit.
    pub failure_threshold: u32,
    /// How long an open circuit refuses attempts.
    pub cooldown: Duration,
    /// Connection settings every profile starts from.
    pub defaults: ResolvedOptions,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            health_ttl: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(5 * 60),
            reap_interval: Duration::from_secs(60),
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
            defaults: ResolvedOptions::default(),
        }
    }
}

struct CachedHealth {
    health: ConnectionHealth,
    expires_at: Instant,
}

struct PooledConnection {
    client: Arc<dyn DatabaseClient>,
    profile: ConnectionProfile,
    last_used: Instant,
    health: Option<CachedHealth>,
}

struct ManagerState {
    driver: Arc<dyn DatabaseDriver>,
    config: ManagerConfig,
    pool: Mutex<HashMap<String, PooledConnection>>,
    breaker: CircuitBreaker,
    connect_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// Registry of live connections keyed by profile name.
pub struct ConnectionManager {
    state: Arc<ManagerState>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Create a manager and start its idle reaper. Must be called from
    /// within a Tokio runtime.
    pub fn new(driver: Arc<dyn DatabaseDriver>, config: ManagerConfig) -> Self {
        let breaker = CircuitBreaker::new(config.failure_threshold, config.cooldown);
        let state = Arc::new(ManagerState {
            driver,
            config,
            pool: Mutex::new(HashMap::new()),
            breaker,
            connect_locks: Mutex::new(HashMap::new()),
        });
        let reaper = spawn_reaper(&state);

        Self {
            state,
            reaper: Mutex::new(Some(reaper)),
        }
    }

    /// Manager over the real MongoDB driver.
    pub fn with_mongo(config: ManagerConfig) -> Self {
        Self::new(Arc::new(MongoDriver::new()), config)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.state.config
    }

    /// Return a live client for `profile`, reusing the pooled one when it
    /// still answers a ping.
    ///
    /// Fails with [`MprofError::CircuitOpen`] without any network attempt
    /// while the profile's circuit is open, and with
    /// [`MprofError::Connection`] when the attempt itself fails.
    pub async fn connect(&self, profile: &ConnectionProfile) -> Result<Arc<dyn DatabaseClient>> {
        let name = profile.name.as_str();
        let flight = self.state.connect_lock(name);
        let result = {
            let _in_flight = flight.lock().await;
            self.connect_locked(profile).await
        };
        self.state.release_connect_lock(name, flight);
        result
    }

    /// Number of profile names with a connect in progress.
    pub fn connects_in_flight(&self) -> usize {
        self.state.connect_locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    async fn connect_locked(&self, profile: &ConnectionProfile) -> Result<Arc<dyn DatabaseClient>> {
        let name = profile.name.as_str();

        if let Some(client) = self.state.pooled_client(name) {
            match client.ping().await {
                Ok(()) => {
                    self.state.touch(name);
                    tracing::debug!(profile = %name, "reusing pooled connection");
                    return Ok(client);
                }
                Err(e) => {
                    tracing::debug!(profile = %name, error = %e, "pooled connection failed liveness probe");
                    if let Some(stale) = self.state.take(name) {
                        close_quietly(name, stale.client).await;
                    }
                }
            }
        }

        if let Err(retry_in) = self.state.breaker.check(name, Instant::now()) {
            let retry_in = chrono::Duration::from_std(retry_in).unwrap_or_else(|_| chrono::Duration::zero());
            return Err(MprofError::CircuitOpen {
                profile: name.to_string(),
                retry_at: Utc::now() + retry_in,
            });
        }

        let options = self.state.config.defaults.resolve(profile.options.as_ref());
        match self.state.driver.connect(&profile.uri, &options).await {
            Ok(client) => {
                self.state.breaker.record_success(name);
                let replaced = {
                    let mut pool = self.state.lock_pool();
                    pool.insert(
                        name.to_string(),
                        PooledConnection {
                            client: Arc::clone(&client),
                            profile: profile.clone(),
                            last_used: Instant::now(),
                            health: None,
                        },
                    )
                };
                if let Some(old) = replaced {
                    close_quietly(name, old.client).await;
                }
                tracing::debug!(profile = %name, "connection pooled");
                Ok(client)
            }
            Err(e) => {
                self.state.breaker.record_failure(name, Instant::now());
                Err(MprofError::connection(name, e))
            }
        }
    }

    /// Close one pooled connection, or all of them when `name` is `None`.
    /// Close failures are logged and otherwise ignored.
    pub async fn disconnect(&self, name: Option<&str>) {
        self.state.disconnect(name).await;
    }

    /// Test `profile` on a fresh, short-lived connection. Never fails:
    /// problems are reported in the returned result.
    pub async fn test(&self, profile: &ConnectionProfile) -> ConnectionHealth {
        self.state.test(profile).await
    }

    /// Health of the pooled connection for `name`, from cache while fresh.
    /// Fails with `NotFound` if nothing is pooled under that name.
    pub async fn get_health(&self, name: &str) -> Result<ConnectionHealth> {
        self.state.get_health(name).await
    }

    /// Health of every pooled connection, checked concurrently.
    pub async fn list_connections(&self) -> Vec<(String, ConnectionHealth)> {
        let names = self.pooled_names();
        let tasks = names.into_iter().map(|name| {
            let state = Arc::clone(&self.state);
            let task_name = name.clone();
            let handle = tokio::spawn(async move { state.get_health(&task_name).await });
            (name, handle)
        });
        gather(tasks, |result| match result {
            Ok(Ok(health)) => health,
            Ok(Err(e)) => ConnectionHealth::failed(0, e.to_string()),
            Err(e) => ConnectionHealth::failed(0, format!("health check aborted: {}", e)),
        })
        .await
    }

    /// Test many profiles at once. One profile's failure does not affect
    /// the others.
    pub async fn test_all(&self, profiles: &[ConnectionProfile]) -> Vec<(String, ConnectionHealth)> {
        let tasks = profiles.iter().map(|profile| {
            let state = Arc::clone(&self.state);
            let profile = profile.clone();
            let name = profile.name.clone();
            let handle = tokio::spawn(async move { state.test(&profile).await });
            (name, handle)
        });
        gather(tasks, |result| match result {
            Ok(health) => health,
            Err(e) => ConnectionHealth::failed(0, format!("test aborted: {}", e)),
        })
        .await
    }

    /// Run one idle sweep now. Returns how many connections were closed.
    pub async fn reap_idle(&self) -> usize {
        self.state.reap_idle().await
    }

    /// Stop the idle reaper and close everything.
    pub async fn cleanup(&self) {
        let reaper = self.reaper.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = reaper {
            handle.abort();
        }
        self.state.disconnect(None).await;
        self.state
            .connect_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn is_pooled(&self, name: &str) -> bool {
        self.state.lock_pool().contains_key(name)
    }

    /// Names with a pooled connection, sorted.
    pub fn pooled_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock_pool().keys().cloned().collect();
        names.sort();
        names
    }

    /// Circuit breaker record for `name`, if it has recorded failures.
    pub fn breaker_state(&self, name: &str) -> Option<CircuitBreakerState> {
        self.state.breaker.state(name)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.reaper.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

impl ManagerState {
    fn lock_pool(&self) -> std::sync::MutexGuard<'_, HashMap<String, PooledConnection>> {
        self.pool.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn connect_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.connect_locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    /// Drop the per-name lock once no other caller holds or waits on it.
    fn release_connect_lock(&self, name: &str, flight: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.connect_locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = locks.get(name)
            && Arc::ptr_eq(entry, &flight)
            && Arc::strong_count(&flight) == 2
        {
            locks.remove(name);
        }
    }

    fn pooled_client(&self, name: &str) -> Option<Arc<dyn DatabaseClient>> {
        self.lock_pool().get(name).map(|c| Arc::clone(&c.client))
    }

    fn touch(&self, name: &str) {
        if let Some(conn) = self.lock_pool().get_mut(name) {
            conn.last_used = Instant::now();
        }
    }

    fn take(&self, name: &str) -> Option<PooledConnection> {
        self.lock_pool().remove(name)
    }

    async fn disconnect(&self, name: Option<&str>) {
        let drained: Vec<(String, PooledConnection)> = {
            let mut pool = self.lock_pool();
            match name {
                Some(n) => pool.remove(n).map(|c| (n.to_string(), c)).into_iter().collect(),
                None => pool.drain().collect(),
            }
        };

        for (name, conn) in drained {
            close_quietly(&name, conn.client).await;
        }
    }

    async fn test(&self, profile: &ConnectionProfile) -> ConnectionHealth {
        let started = Instant::now();
        let options = self.config.defaults.resolve(profile.options.as_ref());

        let client = match self.driver.connect(&profile.uri, &options).await {
            Ok(client) => client,
            Err(e) => {
                tracing::debug!(profile = %profile.name, error = %e, "health test could not connect");
                return ConnectionHealth::failed(
                    elapsed_ms(started),
                    friendly_driver_message(&e.to_string()),
                );
            }
        };

        let health = probe(client.as_ref(), started).await;
        if let Err(e) = client.close().await {
            tracing::debug!(profile = %profile.name, error = %e, "failed to close test connection");
        }
        health
    }

    async fn get_health(&self, name: &str) -> Result<ConnectionHealth> {
        let profile = {
            let pool = self.lock_pool();
            let conn = pool
                .get(name)
                .ok_or_else(|| MprofError::not_found(format!("no pooled connection for '{}'", name)))?;
            if let Some(cached) = &conn.health
                && cached.expires_at > Instant::now()
            {
                return Ok(cached.health.clone());
            }
            conn.profile.clone()
        };

        let health = self.test(&profile).await;

        if let Some(conn) = self.lock_pool().get_mut(name) {
            conn.health = Some(CachedHealth {
                health: health.clone(),
                expires_at: Instant::now() + self.config.health_ttl,
            });
        }
        Ok(health)
    }

    async fn reap_idle(&self) -> usize {
        let now = Instant::now();
        let idle: Vec<(String, PooledConnection)> = {
            let mut pool = self.lock_pool();
            let names: Vec<String> = pool
                .iter()
                .filter(|(_, c)| now.duration_since(c.last_used) > self.config.idle_timeout)
                .map(|(name, _)| name.clone())
                .collect();
            names
                .into_iter()
                .filter_map(|name| pool.remove(&name).map(|c| (name, c)))
                .collect()
        };

        let count = idle.len();
        for (name, conn) in idle {
            tracing::debug!(profile = %name, "closing idle connection");
            close_quietly(&name, conn.client).await;
        }
        count
    }
}

/// Ping, then gather server status and version. Status and version are
/// best effort; only the ping decides `is_connected`.
async fn probe(client: &dyn DatabaseClient, started: Instant) -> ConnectionHealth {
    let ping_started = Instant::now();
    if let Err(e) = client.ping().await {
        return ConnectionHealth::failed(elapsed_ms(started), friendly_driver_message(&e.to_string()));
    }
    let latency = elapsed_ms(ping_started);

    let status = match client.server_status().await {
        Ok(doc) => Some(ServerStatus::from_document(&doc)),
        Err(e) => {
            tracing::debug!(error = %e, "serverStatus unavailable");
            None
        }
    };
    let build_version = match client.build_info().await {
        Ok(doc) => build_version(&doc),
        Err(e) => {
            tracing::debug!(error = %e, "buildInfo unavailable");
            None
        }
    };

    ConnectionHealth {
        is_connected: true,
        latency,
        server_version: build_version.or_else(|| status.as_ref().and_then(|s| s.version.clone())),
        replica_set: status.as_ref().and_then(|s| s.replica_set().map(str::to_string)),
        topology: status.as_ref().map(ServerStatus::topology).unwrap_or(Topology::Unknown),
        connection_count: status.as_ref().and_then(|s| s.connections_current),
        tested_at: Utc::now(),
        error: None,
    }
}

async fn gather<T, F>(
    tasks: impl Iterator<Item = (String, JoinHandle<T>)>,
    into_health: F,
) -> Vec<(String, ConnectionHealth)>
where
    F: Fn(std::result::Result<T, tokio::task::JoinError>) -> ConnectionHealth,
{
    let (names, handles): (Vec<String>, Vec<JoinHandle<T>>) = tasks.unzip();
    let results = futures::future::join_all(handles).await;
    names
        .into_iter()
        .zip(results.into_iter().map(into_health))
        .collect()
}

async fn close_quietly(name: &str, client: Arc<dyn DatabaseClient>) {
    if let Err(e) = client.close().await {
        tracing::warn!(profile = %name, error = %e, "error while closing connection");
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn spawn_reaper(state: &Arc<ManagerState>) -> JoinHandle<()> {
    let weak: Weak<ManagerState> = Arc::downgrade(state);
    let period = state.config.reap_interval;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(state) = weak.upgrade() else {
                break;
            };
            let closed = state.reap_idle().await;
            if closed > 0 {
                tracing::debug!(closed, "idle reaper closed connections");
            }
        }
    })
}
