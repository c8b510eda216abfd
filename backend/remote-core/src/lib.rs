//! Remote service core: whitelist-gated RPC endpoint lifecycle.
//!
//! - [`paths`]: which remote-interface directories a server exposes
//! - [`whitelist`]: loading, reloading and watching the IP whitelist
//! - [`gate`]: per-connection allow/deny decisions
//! - [`rpc`]: traits the RPC transport implements
//! - [`service`]: startup and shutdown orchestration

pub mod config;
pub mod error;
pub mod gate;
pub mod paths;
pub mod rpc;
pub mod service;
pub mod whitelist;

pub use config::{NodeConfig, RemoteConfig};
pub use error::{ConfigError, CoreError, RemoteError};
pub use gate::{ConnectionGate, GateDecision};
pub use paths::PathResolver;
pub use rpc::{
    ConnectionKicker, ConnectionListener, RpcServer, RpcServerFactory, RpcServerOptions,
    UNAUTHORIZED_REASON,
};
pub use service::{RemoteService, ServiceState};
pub use whitelist::{Whitelist, WhitelistSource, WhitelistStore};

#[cfg(test)]
mod tests;
