// Unit tests for the node binary's library side.
// Tests over real sockets live in integration_tests/.


use models::{AppContext, ServerRecordBuilder};
use remote_core::RpcServerOptions;

use serde_json::Map;
use std::sync::Arc;

/// Options for an acceptor on `port`.
pub(crate) fn options(port: u16) -> RpcServerOptions {
    let record = ServerRecordBuilder::default()
        .with_id("chat-server-1")
        .with_server_type("chat")
        .with_port(6050)
        .build()
        .expect("valid record");

    RpcServerOptions {
        port,
        paths: Vec::new(),
        context: Arc::new(AppContext::new(".", record)),
        buffer_msg: false,
        interval: 30,
        rpc_debug_log: false,
        rpc_logger: None,
        extra: Map::new(),
    }
}
