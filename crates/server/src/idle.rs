//! Idle connection expiry
//!
//! The [`IdleTracker`] pairs a timer store with a registry of cancellation tokens,
//! one per open connection. When a deadline passes the connection's token is
//! cancelled; the task serving the connection observes it and drops the session.
//! A connection that already closed has no registry entry, so a late expiry does nothing.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use micro_httpd::timer::{TimerId, TimerStore, Timers};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub type ConnectionId = u64;

/// A connection as known to the tracker.
#[derive(Debug)]
pub struct Registration {
    pub id: ConnectionId,
    /// Cancelled when the connection idles out or the server shuts down.
    pub token: CancellationToken,
    pub timer: TimerId,
}

#[derive(Debug)]
struct Inner {
    timers: Timers<ConnectionId>,
    connections: HashMap<ConnectionId, CancellationToken>,
    next_id: ConnectionId,
}

#[derive(Debug)]
pub struct IdleTracker {
    inner: Mutex<Inner>,
    timeout: Duration,
    shutdown: CancellationToken,
}

impl IdleTracker {
    /// Connection tokens are children of `shutdown`, so cancelling it ends every connection.
    pub fn new(timers: Timers<ConnectionId>, timeout: Duration, shutdown: CancellationToken) -> Self {
        Self { inner: Mutex::new(Inner { timers, connections: HashMap::new(), next_id: 0 }), timeout, shutdown }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts tracking a new connection with a deadline of `now` plus the idle timeout.
    pub fn register(&self, now: Instant) -> Registration {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let token = self.shutdown.child_token();
        inner.connections.insert(id, token.clone());
        let timer = inner.timers.insert(now + self.timeout, id);
        Registration { id, token, timer }
    }

    /// Pushes the deadline of a connection back after activity.
    ///
    /// Returns the id replacing `timer`, or `None` if the connection already expired.
    pub fn touch(&self, timer: TimerId, now: Instant) -> Option<TimerId> {
        self.lock().timers.adjust(timer, now + self.timeout)
    }

    /// Stops tracking a closed connection.
    pub fn deregister(&self, id: ConnectionId, timer: Option<TimerId>) {
        let mut inner = self.lock();
        if let Some(timer) = timer {
            inner.timers.remove(timer);
        }
        inner.connections.remove(&id);
    }

    /// Expires every connection whose deadline passed and returns how many were cancelled.
    pub fn tick(&self, now: Instant) -> usize {
        let mut inner = self.lock();
        let Inner { timers, connections, .. } = &mut *inner;

        let mut cancelled = 0;
        timers.tick(now, &mut |id| {
            if let Some(token) = connections.remove(&id) {
                info!(connection = id, "idle connection expired");
                token.cancel();
                cancelled += 1;
            } else {
                debug!(connection = id, "expired connection already closed");
            }
        });
        cancelled
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns true once the server started shutting down.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
