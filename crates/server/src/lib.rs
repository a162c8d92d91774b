//! tokio runtime for the `micro-httpd` static file server
//!
//! - [`config`]: clap options and their validation
//! - [`idle`]: idle connection expiry on top of a timer store
//! - [`server`]: the accept loop and one task per connection

pub mod config;
pub mod idle;
pub mod server;

pub use config::{Config, ConfigError, ServerConfig, TimerStrategy};
pub use server::Server;
