//! Accept loop and per-connection tasks
//!
//! Each accepted connection is served by its own task owning a [`Session`]. The task
//! waits for the one readiness the session asked for, runs the next session step,
//! and repeats until the session closes, the socket fails, or the connection's
//! cancellation token fires because it idled out or the server shuts down.
//!
//! Processing a complete request reads the file from disk. On a multi-thread runtime
//! that step runs under [`block_in_place`](tokio::task::block_in_place) so the other
//! connections on the same worker keep being served.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use micro_httpd::connection::{Rearm, Session};
use micro_httpd::protocol::SessionError;
use micro_httpd::resource::{DocRoot, ResourceResolver};
use tokio::io::{AsyncWriteExt, Interest};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::select;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ServerConfig};
use crate::idle::{IdleTracker, Registration};

const BUSY_MESSAGE: &[u8] = b"Internal server busy";

#[derive(Debug)]
pub struct Server<R = DocRoot> {
    config: ServerConfig,
    resolver: Arc<R>,
}

impl Server<DocRoot> {
    /// A server answering from the configured document root.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `config` does not pass [`ServerConfig::validate`].
    pub fn new(config: ServerConfig) -> Result<Self, ConfigError> {
        let resolver = DocRoot::with_max_file_size(config.doc_root.clone(), config.max_file_size);
        Self::with_resolver(config, resolver)
    }
}

impl<R> Server<R>
where
    R: ResourceResolver + Send + Sync + 'static,
{
    /// # Errors
    ///
    /// Returns `ConfigError` if `config` does not pass [`ServerConfig::validate`].
    pub fn with_resolver(config: ServerConfig, resolver: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, resolver: Arc::new(resolver) })
    }

    /// Binds a listener to the configured address.
    ///
    /// # Errors
    ///
    /// Returns the bind error, e.g. when the address is already in use.
    pub async fn bind(&self) -> io::Result<TcpListener> {
        TcpListener::bind(&self.config.address).await
    }

    /// Serves connections from `listener` until `shutdown` is cancelled.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) {
        let timers = self.config.timers(Instant::now());
        let tracker = Arc::new(IdleTracker::new(timers, self.config.idle_timeout, shutdown.clone()));
        let ticker = tokio::spawn(run_ticker(Arc::clone(&tracker), self.config.tick_interval, shutdown.clone()));

        loop {
            let (tcp_stream, peer) = select! {
                () = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            if tracker.connection_count() >= self.config.max_connections {
                warn!(%peer, max = self.config.max_connections, "too many connections, rejecting peer");
                tokio::spawn(reject_busy(tcp_stream, peer));
                continue;
            }

            let registration = tracker.register(Instant::now());
            let session = Session::with_capacity(self.config.read_buffer, self.config.write_buffer);
            debug!(%peer, connection = registration.id, "accepted connection");
            tokio::spawn(serve_connection(
                tcp_stream,
                peer,
                session,
                Arc::clone(&self.resolver),
                Arc::clone(&tracker),
                registration,
            ));
        }

        info!("stop accepting connections");
        if let Err(e) = ticker.await {
            error!(cause = %e, "idle ticker failed");
        }
    }
}

async fn run_ticker(tracker: Arc<IdleTracker>, period: Duration, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        select! {
            () = shutdown.cancelled() => break,
            _ = interval.tick() => {
                let expired = tracker.tick(Instant::now());
                if expired > 0 {
                    debug!(expired, "expired idle connections");
                }
            }
        }
    }
}

async fn reject_busy(mut tcp_stream: TcpStream, peer: SocketAddr) {
    if let Err(e) = tcp_stream.write_all(BUSY_MESSAGE).await {
        debug!(%peer, cause = %e, "failed to send busy message");
    }
}

async fn serve_connection<R: ResourceResolver>(
    mut tcp_stream: TcpStream,
    peer: SocketAddr,
    mut session: Session,
    resolver: Arc<R>,
    tracker: Arc<IdleTracker>,
    registration: Registration,
) {
    let Registration { id, token, timer } = registration;
    session.set_timer(Some(timer));

    match drive(&mut tcp_stream, &mut session, &*resolver, &tracker, &token).await {
        Ok(Closed::Finished) => debug!(%peer, connection = id, "connection closed"),
        Ok(Closed::IdleTimeout) => debug!(%peer, connection = id, timeout = ?tracker.timeout(), "closing idle connection"),
        Ok(Closed::Shutdown) => debug!(%peer, connection = id, "closing connection on shutdown"),
        Err(SessionError::PeerClosed) => debug!(%peer, connection = id, "peer closed connection"),
        Err(e) => warn!(%peer, connection = id, cause = %e, "connection failed"),
    }

    tracker.deregister(id, session.timer());
}

/// Why a connection ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closed {
    /// The session finished its last response.
    Finished,
    IdleTimeout,
    Shutdown,
}

/// Runs session steps until the session closes or the token is cancelled.
async fn drive<R: ResourceResolver + ?Sized>(
    tcp_stream: &mut TcpStream,
    session: &mut Session,
    resolver: &R,
    tracker: &IdleTracker,
    token: &CancellationToken,
) -> Result<Closed, SessionError> {
    let mut rearm = Rearm::Read;
    loop {
        let interest = match rearm {
            Rearm::Read => Interest::READABLE,
            Rearm::Write => Interest::WRITABLE,
            Rearm::Close => return Ok(Closed::Finished),
        };

        select! {
            () = token.cancelled() => {
                return Ok(if tracker.is_shutting_down() { Closed::Shutdown } else { Closed::IdleTimeout });
            }
            ready = tcp_stream.ready(interest) => {
                ready?;
            }
        }

        rearm = match rearm {
            Rearm::Read => {
                if session.read(tcp_stream)? > 0 {
                    let timer = session.timer().and_then(|timer| tracker.touch(timer, Instant::now()));
                    session.set_timer(timer);
                }
                blocking(|| session.process(resolver))
            }
            Rearm::Write => session.write(tcp_stream)?,
            Rearm::Close => return Ok(Closed::Finished),
        };
    }
}

/// Runs `f`, which may block on the filesystem, without stalling the worker's other tasks.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    if Handle::current().runtime_flavor() == RuntimeFlavor::MultiThread {
        tokio::task::block_in_place(f)
    } else {
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use micro_httpd::timer::{TimeHeap, Timers};

    async fn connected() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn cancelled_connection_reports_the_reason() {
        let shutdown = CancellationToken::new();
        let tracker = IdleTracker::new(Timers::Heap(TimeHeap::new()), Duration::from_millis(50), shutdown.clone());
        let resolver = DocRoot::new(".");
        let start = Instant::now();

        let (_client, mut stream) = connected().await;
        let idle = tracker.register(start);
        assert_eq!(tracker.tick(start + Duration::from_millis(100)), 1);
        let closed = drive(&mut stream, &mut Session::new(), &resolver, &tracker, &idle.token).await.unwrap();
        assert_eq!(closed, Closed::IdleTimeout);

        let (_client, mut stream) = connected().await;
        let live = tracker.register(Instant::now());
        shutdown.cancel();
        let closed = drive(&mut stream, &mut Session::new(), &resolver, &tracker, &live.token).await.unwrap();
        assert_eq!(closed, Closed::Shutdown);
    }

    #[tokio::test]
    async fn served_connection_finishes() {
        let tracker = IdleTracker::new(Timers::Heap(TimeHeap::new()), Duration::from_secs(5), CancellationToken::new());
        let registration = tracker.register(Instant::now());
        let (mut client, mut stream) = connected().await;

        client.write_all(b"GET /missing.html HTTP/1.1\r\n\r\n").await.unwrap();
        let closed = drive(&mut stream, &mut Session::new(), &DocRoot::new("."), &tracker, &registration.token)
            .await
            .unwrap();
        assert_eq!(closed, Closed::Finished);
    }
}
