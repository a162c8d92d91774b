//! Command line and environment configuration
//!
//! Every option can be given as a flag or through an `HTTPD_*` environment variable:
//!
//! ```bash
//! micro-httpd --port 8080 --doc-root ./public --timer heap
//! HTTPD_PORT=8080 HTTPD_DOC_ROOT=./public micro-httpd
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use micro_httpd::codec::READ_BUFFER_SIZE;
use micro_httpd::connection::WRITE_BUFFER_SIZE;
use micro_httpd::resource::DEFAULT_MAX_FILE_SIZE;
use micro_httpd::timer::{DEFAULT_SLOTS, SortedList, TimeHeap, TimeWheel, Timers};
use thiserror::Error;
use tracing::Level;

/// Which timer store tracks idle connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimerStrategy {
    /// Linked list sorted by deadline
    List,
    /// Hashed timing wheel, one slot per tick interval
    Wheel,
    /// Binary min-heap with lazy removal
    Heap,
}

/// Raw options as parsed by clap.
#[derive(Debug, Clone, Parser)]
#[command(name = "micro-httpd")]
#[command(about = "A micro HTTP/1.1 static file server")]
#[command(version)]
pub struct Config {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1", env = "HTTPD_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080, env = "HTTPD_PORT")]
    pub port: u16,

    /// Directory served as the document root
    #[arg(long, default_value = ".", env = "HTTPD_DOC_ROOT")]
    pub doc_root: PathBuf,

    /// Seconds a connection may stay silent before it is closed
    #[arg(long = "idle-timeout", default_value_t = 15, env = "HTTPD_IDLE_TIMEOUT")]
    pub idle_timeout_secs: u64,

    /// Seconds between two expiry passes over the timer store
    #[arg(long = "tick-interval", default_value_t = 5, env = "HTTPD_TICK_INTERVAL")]
    pub tick_interval_secs: u64,

    #[arg(long, value_enum, default_value_t = TimerStrategy::Wheel, env = "HTTPD_TIMER")]
    pub timer: TimerStrategy,

    /// Number of slots of the timing wheel
    #[arg(long, default_value_t = DEFAULT_SLOTS, env = "HTTPD_WHEEL_SLOTS")]
    pub wheel_slots: usize,

    /// Per connection read buffer size, the largest request accepted
    #[arg(long, default_value_t = READ_BUFFER_SIZE, env = "HTTPD_READ_BUFFER")]
    pub read_buffer: usize,

    /// Initial per connection buffer size for response heads
    #[arg(long, default_value_t = WRITE_BUFFER_SIZE, env = "HTTPD_WRITE_BUFFER")]
    pub write_buffer: usize,

    /// Largest file served in bytes; bigger files are answered with 500
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE, env = "HTTPD_MAX_FILE_SIZE")]
    pub max_file_size: u64,

    /// Connections served at once; further peers are told the server is busy
    #[arg(long, default_value_t = 65536, env = "HTTPD_MAX_CONNECTIONS")]
    pub max_connections: usize,

    #[arg(long, default_value_t = Level::INFO, env = "HTTPD_LOG_LEVEL")]
    pub log_level: Level,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("tick interval {tick:?} is longer than idle timeout {timeout:?}")]
    TickExceedsTimeout { tick: Duration, timeout: Duration },

    #[error("document root {} is not a directory", path.display())]
    DocRoot { path: PathBuf },
}

impl ConfigError {
    fn zero(name: &'static str) -> Self {
        Self::Zero { name }
    }
}

/// Validated settings the server runs with.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub doc_root: PathBuf,
    pub idle_timeout: Duration,
    pub tick_interval: Duration,
    pub timer: TimerStrategy,
    pub wheel_slots: usize,
    pub read_buffer: usize,
    pub write_buffer: usize,
    pub max_connections: usize,
    pub max_file_size: u64,
}

impl Config {
    /// Checks the options and turns them into a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a size or duration is zero, the tick interval is longer
    /// than the idle timeout, or the document root is not a directory.
    pub fn validate(self) -> Result<ServerConfig, ConfigError> {
        let config = ServerConfig {
            address: format!("{}:{}", self.host, self.port),
            doc_root: self.doc_root,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            tick_interval: Duration::from_secs(self.tick_interval_secs),
            timer: self.timer,
            wheel_slots: self.wheel_slots,
            read_buffer: self.read_buffer,
            write_buffer: self.write_buffer,
            max_connections: self.max_connections,
            max_file_size: self.max_file_size,
        };
        config.validate()?;
        Ok(config)
    }
}

impl ServerConfig {
    /// # Errors
    ///
    /// See [`Config::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("idle timeout", self.idle_timeout.as_nanos()),
            ("tick interval", self.tick_interval.as_nanos()),
            ("wheel slots", self.wheel_slots as u128),
            ("read buffer", self.read_buffer as u128),
            ("write buffer", self.write_buffer as u128),
            ("max connections", self.max_connections as u128),
            ("max file size", u128::from(self.max_file_size)),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::zero(*name));
        }
        if self.tick_interval > self.idle_timeout {
            return Err(ConfigError::TickExceedsTimeout { tick: self.tick_interval, timeout: self.idle_timeout });
        }
        if !self.doc_root.is_dir() {
            return Err(ConfigError::DocRoot { path: self.doc_root.clone() });
        }
        Ok(())
    }

    /// Creates the configured timer store; a wheel starts turning at `start`.
    pub fn timers<T>(&self, start: Instant) -> Timers<T> {
        match self.timer {
            TimerStrategy::List => Timers::List(SortedList::new()),
            TimerStrategy::Wheel => Timers::Wheel(TimeWheel::new(self.wheel_slots, self.tick_interval, start)),
            TimerStrategy::Heap => Timers::Heap(TimeHeap::new()),
        }
    }
}
