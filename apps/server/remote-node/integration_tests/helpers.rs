//! Test helpers for socket-level tests.
//!
//! - [`RecordingListener`]: records connection events and optionally kicks them
//! - [`connect`] / [`is_connection_closed`]: client-side socket checks
//! - [`free_port`]: an unused local port for configs that need a real one

use models::{AppContext, ConnectionEvent, ServerRecord, ServerRecordBuilder};
use remote_core::{ConnectionKicker, ConnectionListener, RpcServerOptions};

use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Map;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ConnectionEvent>>,
    kick_all: bool,
}

impl RecordingListener {
    /// A listener that kicks every connection it sees.
    pub fn kicking() -> Self {
        Self {
            kick_all: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<ConnectionEvent> {
        self.events.lock().expect("events").clone()
    }

    /// Wait for `count` events.
    pub async fn wait_for_events(&self, count: usize) -> Vec<ConnectionEvent> {
        for _ in 0..100 {
            let events = self.events();
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.events()
    }
}

impl ConnectionListener for RecordingListener {
    fn on_connection(&self, event: ConnectionEvent, kicker: &dyn ConnectionKicker) {
        if self.kick_all
            && let Some(ref id) = event.id
        {
            kicker.kick_by_id(id, "unauthorized");
        }
        self.events.lock().expect("events").push(event);
    }
}

pub fn options(port: u16) -> RpcServerOptions {
    RpcServerOptions {
        port,
        paths: Vec::new(),
        context: Arc::new(AppContext::new(".", test_record(6050))),
        buffer_msg: false,
        interval: 30,
        rpc_debug_log: true,
        rpc_logger: Some("rpc-debug"),
        extra: Map::new(),
    }
}

pub fn test_record(port: u16) -> ServerRecord {
    ServerRecordBuilder::default()
        .with_id("chat-server-1")
        .with_server_type("chat")
        .with_port(port)
        .build()
        .expect("valid record")
}

pub fn free_port() -> u16 {
    StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("free port")
}

pub async fn connect(port: u16) -> TcpStream {
    TcpStream::connect(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
        .await
        .expect("Failed to connect to acceptor")
}

/// True if the server closed the stream within 500ms.
pub async fn is_connection_closed(stream: &mut TcpStream) -> bool {
    let mut buffer = [0u8; 16];
    match tokio::time::timeout(Duration::from_millis(500), stream.read(&mut buffer)).await {
        Err(_) => false,
        Ok(Ok(0)) => true,
        Ok(Ok(_)) => false,
        Ok(Err(_)) => true,
    }
}
