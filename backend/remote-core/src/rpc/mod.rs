//! Seam between the remote service and the RPC transport.
//!
//! The service never speaks the RPC protocol itself. It builds an
//! [`RpcServer`] through an [`RpcServerFactory`], registers a
//! [`ConnectionListener`] for inbound connections and asks the server to
//! start, stop or kick connections.

use crate::error::remote::RemoteError;

use models::{AppContext, ConnectionEvent, RemotePathRecord};

use std::sync::Arc;

use serde_json::{Map, Value};

/// Reason passed to [`ConnectionKicker::kick_by_id`] for connections from
/// addresses outside the whitelist.
pub const UNAUTHORIZED_REASON: &str = "unauthorized";

/// Options the RPC server is created with.
#[derive(Debug, Clone)]
pub struct RpcServerOptions {
    pub port: u16,
    /// Remote-interface directories, system before user.
    pub paths: Vec<RemotePathRecord>,
    pub context: Arc<AppContext>,
    pub buffer_msg: bool,
    /// Heartbeat interval.
    pub interval: u64,
    pub rpc_debug_log: bool,
    /// Log target for verbose RPC logging, set when `rpc_debug_log` is on.
    pub rpc_logger: Option<&'static str>,
    /// Options the service does not interpret.
    pub extra: Map<String, Value>,
}

/// Terminates established connections by id.
pub trait ConnectionKicker: Send + Sync {
    /// Fire-and-forget; unknown ids are ignored.
    fn kick_by_id(&self, id: &str, reason: &str);
}

/// Receives one call per inbound connection.
pub trait ConnectionListener: Send + Sync {
    /// `kicker` is the server that accepted the connection.
    fn on_connection(&self, event: ConnectionEvent, kicker: &dyn ConnectionKicker);
}

/// An RPC server endpoint.
pub trait RpcServer: ConnectionKicker {
    /// Replace the connection listener.
    fn on_connection(&mut self, listener: Arc<dyn ConnectionListener>);

    /// Begin accepting connections.
    fn start(&mut self) -> Result<(), RemoteError>;

    /// Stop accepting connections. `force` drops in-flight work instead of
    /// draining it.
    fn stop(&mut self, force: bool) -> Result<(), RemoteError>;
}

/// Builds RPC servers.
pub trait RpcServerFactory {
    type Server: RpcServer;

    fn create(&self, options: RpcServerOptions) -> Result<Self::Server, RemoteError>;
}
