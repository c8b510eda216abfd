//! Shared building blocks for the remote-service workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): error location tracking used by every error type
//! - **models**: plain data describing servers, connections and remote paths
//! - **remote-core**: whitelist, watcher, connection gate and service lifecycle
//! - **remote-node**: binary wiring config, logging and a TCP acceptor together

pub mod error;

pub use error::error_location::ErrorLocation;
