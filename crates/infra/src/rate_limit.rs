//! Per-client admission control.
//!
//! A client is admitted when its previous admitted request is at least
//! `window` old. Keys idle for longer than `ttl` are evicted by a periodic
//! sweep. State is local to this process.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::RateLimitConfig;

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    ttl: Duration,
    last_seen: RwLock<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new(window: Duration, ttl: Duration) -> Self {
        Self {
            window,
            ttl,
            last_seen: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window, config.ttl)
    }

    /// Admit or reject one request from `key`.
    ///
    /// The read lock answers the common "too soon" case; the write lock is
    /// only taken to record an admission, re-checking under it so two racing
    /// requests cannot both get in.
    pub fn admit(&self, key: &str) -> bool {
        let now = Instant::now();

        {
            let last_seen = self.last_seen.read().unwrap_or_else(|e| e.into_inner());
            if let Some(last) = last_seen.get(key)
                && now.duration_since(*last) < self.window
            {
                return false;
            }
        }

        let mut last_seen = self.last_seen.write().unwrap_or_else(|e| e.into_inner());
        if let Some(last) = last_seen.get(key)
            && now.duration_since(*last) < self.window
        {
            return false;
        }
        last_seen.insert(key.to_owned(), now);
        true
    }

    /// Evict keys idle for longer than the ttl; returns how many went.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut last_seen = self.last_seen.write().unwrap_or_else(|e| e.into_inner());
        let before = last_seen.len();
        last_seen.retain(|_, last| now.duration_since(*last) <= self.ttl);
        before - last_seen.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.last_seen.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Run [`RateLimiter::sweep`] every `every` until the handle is shut down.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let limiter = Arc::clone(self);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let evicted = limiter.sweep();
                        if evicted > 0 {
                            debug!(evicted, remaining = limiter.tracked_keys(), "rate limiter sweep");
                        }
                    }
                }
            }
            info!("rate limiter sweeper stopped");
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            join: Some(join),
        }
    }
}

/// Handle for the running sweeper (shutdown hook).
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            join.abort();
        }
    }
}

/// Key a request is limited by.
///
/// With `trust_forwarded_for`, the first `X-Forwarded-For` hop wins; otherwise
/// (or when the header is absent or blank) the transport peer address.
pub fn client_key(forwarded_for: Option<&str>, peer: Option<IpAddr>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for
        && let Some(first) = forwarded_for
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
    {
        return first.to_owned();
    }

    match peer {
        Some(ip) => ip.to_string(),
        None => "unknown".to_owned(),
    }
}
