//! LiveHub - per-user realtime delivery
//!
//! Every open event stream registers one connection. A user may hold several
//! (one per browser tab). Domain notifications are fanned out to all of them.
//!
//! ```text
//! request handlers ──send_to_user──┐
//!                                  ▼
//!                          LiveHub registry ◀──expire_stale── sweeper task
//!                          ├── connections: id → Entry
//!                          └── by_user: user → {id}
//!                                  │ mpsc (bounded)
//!                                  ▼
//!                          LiveConnection ──▶ SSE stream
//!                          (connected, events, heartbeat)
//! ```
//!
//! The registry lock is never held across an await. Sends clone the target
//! senders under a read lock and then wait (bounded) without it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures::Stream;
use serde::Serialize;
use shared::LiveMessage;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Delivery tuning
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Per-connection queue length
    pub queue_capacity: usize,
    /// Max wait for queue space before a message is dropped for a connection
    pub send_timeout: Duration,
    pub heartbeat_interval: Duration,
    /// Connections without a heartbeat for this long are reaped
    pub stale_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            send_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(30),
            stale_timeout: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

struct Entry {
    user_id: i64,
    tx: mpsc::Sender<LiveMessage>,
    cancel: CancellationToken,
    last_heartbeat: Instant,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<String, Entry>,
    by_user: HashMap<i64, HashSet<String>>,
}

impl Registry {
    /// Remove one connection from both indices and cancel it
    fn remove(&mut self, connection_id: &str) -> Option<i64> {
        let entry = self.connections.remove(connection_id)?;
        entry.cancel.cancel();
        if let Some(ids) = self.by_user.get_mut(&entry.user_id) {
            ids.remove(connection_id);
            if ids.is_empty() {
                self.by_user.remove(&entry.user_id);
            }
        }
        Some(entry.user_id)
    }
}

/// Connection counts for the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LiveStats {
    pub online_users: usize,
    pub total_connections: usize,
}

struct HubInner {
    registry: RwLock<Registry>,
    config: LiveConfig,
}

/// Connection registry shared by handlers, streams and the sweeper
#[derive(Clone)]
pub struct LiveHub {
    inner: Arc<HubInner>,
}

impl LiveHub {
    pub fn new(config: LiveConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                registry: RwLock::new(Registry::default()),
                config,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new connection for `user_id`
    pub fn register(&self, user_id: i64) -> LiveConnection {
        let config = &self.inner.config;
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let cancel = CancellationToken::new();

        {
            let mut registry = self.write();
            registry.connections.insert(
                id.clone(),
                Entry {
                    user_id,
                    tx,
                    cancel: cancel.clone(),
                    last_heartbeat: Instant::now(),
                },
            );
            registry
                .by_user
                .entry(user_id)
                .or_default()
                .insert(id.clone());
        }

        tracing::info!(user_id, connection_id = %id, "Live connection registered");

        let mut heartbeat = tokio::time::interval_at(
            Instant::now() + config.heartbeat_interval,
            config.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        LiveConnection {
            id,
            user_id,
            rx,
            cancel,
            heartbeat,
            hub: self.clone(),
            connected_sent: false,
        }
    }

    /// Remove a connection. Unknown ids are ignored.
    pub fn unregister(&self, connection_id: &str) -> bool {
        let removed = self.write().remove(connection_id);
        match removed {
            Some(user_id) => {
                tracing::info!(user_id, connection_id = %connection_id, "Live connection unregistered");
                true
            }
            None => false,
        }
    }

    /// Refresh a connection's heartbeat timestamp
    pub fn touch(&self, connection_id: &str) {
        if let Some(entry) = self.write().connections.get_mut(connection_id) {
            entry.last_heartbeat = Instant::now();
        }
    }

    /// Deliver `message` to every connection of `user_id`.
    ///
    /// Each connection gets at most `send_timeout` to accept the message;
    /// slow or closed connections are skipped. Returns how many connections
    /// accepted it (0 for offline users).
    pub async fn send_to_user(&self, user_id: i64, message: &LiveMessage) -> usize {
        let targets: Vec<(String, mpsc::Sender<LiveMessage>)> = {
            let registry = self.read();
            let Some(ids) = registry.by_user.get(&user_id) else {
                return 0;
            };
            ids.iter()
                .filter_map(|id| {
                    registry
                        .connections
                        .get(id)
                        .map(|entry| (id.clone(), entry.tx.clone()))
                })
                .collect()
        };

        let send_timeout = self.inner.config.send_timeout;
        let sends = targets.into_iter().map(|(connection_id, tx)| async move {
            match tokio::time::timeout(send_timeout, tx.send(message.clone())).await {
                Ok(Ok(())) => true,
                Ok(Err(_)) => {
                    tracing::debug!(user_id, connection_id = %connection_id, "Live connection closed, message dropped");
                    false
                }
                Err(_) => {
                    tracing::warn!(
                        user_id,
                        connection_id = %connection_id,
                        kind = %message.kind,
                        "Live send timed out, message dropped"
                    );
                    false
                }
            }
        });

        futures::future::join_all(sends)
            .await
            .into_iter()
            .filter(|delivered| *delivered)
            .count()
    }

    /// Unregister every connection whose last heartbeat is older than the
    /// stale timeout. Returns the number removed.
    pub fn expire_stale(&self) -> usize {
        let stale_timeout = self.inner.config.stale_timeout;
        let now = Instant::now();
        let mut registry = self.write();

        let stale: Vec<String> = registry
            .connections
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_heartbeat) > stale_timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            if let Some(user_id) = registry.remove(id) {
                tracing::info!(user_id, connection_id = %id, "Stale live connection expired");
            }
        }
        stale.len()
    }

    pub fn is_online(&self, user_id: i64) -> bool {
        self.read().by_user.contains_key(&user_id)
    }

    pub fn user_connection_count(&self, user_id: i64) -> usize {
        self.read().by_user.get(&user_id).map_or(0, HashSet::len)
    }

    pub fn stats(&self) -> LiveStats {
        let registry = self.read();
        LiveStats {
            online_users: registry.by_user.len(),
            total_connections: registry.connections.len(),
        }
    }

    /// Cancel every connection (server shutdown)
    pub fn close_all(&self) {
        let mut registry = self.write();
        let count = registry.connections.len();
        for (_, entry) in registry.connections.drain() {
            entry.cancel.cancel();
        }
        registry.by_user.clear();
        if count > 0 {
            tracing::info!(count, "Closed all live connections");
        }
    }

    /// Periodic stale-connection sweep until `shutdown` fires
    pub async fn run_sweeper(self, shutdown: CancellationToken) {
        let period = self.inner.config.sweep_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let expired = self.expire_stale();
                    if expired > 0 {
                        let stats = self.stats();
                        tracing::info!(
                            expired,
                            online_users = stats.online_users,
                            total_connections = stats.total_connections,
                            "Live connection sweep"
                        );
                    }
                }
            }
        }
    }
}

/// One registered event stream
///
/// Yields the `connected` frame first, then queued events and heartbeats.
/// Dropping it unregisters the connection.
pub struct LiveConnection {
    id: String,
    user_id: i64,
    rx: mpsc::Receiver<LiveMessage>,
    cancel: CancellationToken,
    heartbeat: Interval,
    hub: LiveHub,
    connected_sent: bool,
}

impl LiveConnection {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Next frame for the client; `None` once the connection is closed
    pub async fn next_message(&mut self) -> Option<LiveMessage> {
        if !self.connected_sent {
            self.connected_sent = true;
            return Some(LiveMessage::connected(self.user_id, &self.id));
        }

        // heartbeat ahead of the queue so a backlog cannot starve it
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            _ = self.heartbeat.tick() => {
                self.hub.touch(&self.id);
                Some(LiveMessage::heartbeat())
            }
            message = self.rx.recv() => {
                if message.is_some() {
                    self.hub.touch(&self.id);
                }
                message
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = LiveMessage> + Send + 'static {
        futures::stream::unfold(self, |mut conn| async move {
            let message = conn.next_message().await?;
            Some((message, conn))
        })
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        self.hub.unregister(&self.id);
    }
}
