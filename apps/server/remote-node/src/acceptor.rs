//! TCP acceptor for the remote service.
//!
//! Listens on `0.0.0.0:<port>`, gives every accepted connection a UUID and
//! reports it to the registered [`ConnectionListener`] before reading from it.
//! Message framing and dispatch are not implemented: received bytes are
//! drained and only their sizes are logged on the RPC debug target.
//!
//! Each connection owns a cancellation token kept in a shared map, so
//! [`ConnectionKicker::kick_by_id`] and a forced stop can close it from any
//! thread.

use common::ErrorLocation;

use models::ConnectionEvent;
use remote_core::{
    ConnectionKicker, ConnectionListener, RemoteError, RpcServer, RpcServerFactory,
    RpcServerOptions,
};

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};
use std::panic::Location;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Creates a [`TcpRpcServer`] per remote service.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpRpcServerFactory;

impl RpcServerFactory for TcpRpcServerFactory {
    type Server = TcpRpcServer;

    fn create(&self, options: RpcServerOptions) -> Result<TcpRpcServer, RemoteError> {
        debug!(
            "Creating TCP acceptor on port {} with {} remote path(s)",
            options.port,
            options.paths.len()
        );
        Ok(TcpRpcServer::new(options))
    }
}

/// State shared between the server handle and its accept/connection tasks.
struct Shared {
    listener: RwLock<Option<Arc<dyn ConnectionListener>>>,
    connections: Mutex<HashMap<String, CancellationToken>>,
    rpc_logger: Option<&'static str>,
}

impl Shared {
    fn register(&self, id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), token.clone());
        token
    }

    fn forget(&self, id: &str) {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    fn close_all(&self) -> usize {
        let mut connections = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let count = connections.len();
        for (_, token) in connections.drain() {
            token.cancel();
        }
        count
    }

    fn emit(&self, event: ConnectionEvent) {
        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(listener) = listener {
            listener.on_connection(event, self);
        }
    }
}

impl ConnectionKicker for Shared {
    fn kick_by_id(&self, id: &str, reason: &str) {
        let token = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        match token {
            Some(token) => {
                info!("Kicking connection {id}: {reason}");
                token.cancel();
            }
            None => debug!("Kick for unknown connection {id} ignored"),
        }
    }
}

/// An [`RpcServer`] over plain TCP.
pub struct TcpRpcServer {
    options: RpcServerOptions,
    shared: Arc<Shared>,
    shutdown: CancellationToken,
    local_addr: Option<SocketAddr>,
    task: Option<JoinHandle<()>>,
}

impl TcpRpcServer {
    pub fn new(options: RpcServerOptions) -> Self {
        let shared = Arc::new(Shared {
            listener: RwLock::new(None),
            connections: Mutex::new(HashMap::new()),
            rpc_logger: options.rpc_logger,
        });

        Self {
            options,
            shared,
            shutdown: CancellationToken::new(),
            local_addr: None,
            task: None,
        }
    }

    pub fn options(&self) -> &RpcServerOptions {
        &self.options
    }

    /// Bound address once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of connections currently open.
    pub fn connection_count(&self) -> usize {
        self.shared
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_accepting(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl ConnectionKicker for TcpRpcServer {
    fn kick_by_id(&self, id: &str, reason: &str) {
        self.shared.kick_by_id(id, reason);
    }
}

impl RpcServer for TcpRpcServer {
    fn on_connection(&mut self, listener: Arc<dyn ConnectionListener>) {
        *self
            .shared
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    /// Bind and spawn the accept loop on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`RemoteError::InvalidState`] if already started or stopped
    /// - [`RemoteError::Server`] outside a Tokio runtime
    /// - [`RemoteError::Io`] if the port cannot be bound
    fn start(&mut self) -> Result<(), RemoteError> {
        if self.task.is_some() || self.shutdown.is_cancelled() {
            return Err(RemoteError::InvalidState {
                message: "TCP acceptor can only be started once".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let handle = Handle::try_current().map_err(|e| RemoteError::Server {
            message: format!("TCP acceptor needs a Tokio runtime: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let std_listener = StdTcpListener::bind((Ipv4Addr::UNSPECIFIED, self.options.port))?;
        std_listener.set_nonblocking(true)?;
        let local_addr = std_listener.local_addr()?;

        let listener = {
            let _runtime = handle.enter();
            TcpListener::from_std(std_listener)?
        };

        self.task = Some(handle.spawn(accept_loop(
            listener,
            Arc::clone(&self.shared),
            self.shutdown.clone(),
        )));
        self.local_addr = Some(local_addr);

        info!(
            "RPC acceptor for {} listening on {local_addr}",
            self.options.context.server_id()
        );
        Ok(())
    }

    fn stop(&mut self, force: bool) -> Result<(), RemoteError> {
        self.shutdown.cancel();

        if force {
            let closed = self.shared.close_all();
            info!("RPC acceptor stopped, {closed} connection(s) closed");
        } else {
            info!(
                "RPC acceptor stopped, {} connection(s) left to finish",
                self.connection_count()
            );
        }

        Ok(())
    }
}

impl Drop for TcpRpcServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.shared.close_all();
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => admit(stream, peer, &shared),
                Err(e) => warn!("Failed to accept connection: {e}"),
            },
        }
    }

    debug!("Accept loop finished");
}

/// Register, spawn the reader, then report the connection so a kick issued
/// by the listener finds it.
fn admit(stream: TcpStream, peer: SocketAddr, shared: &Arc<Shared>) {
    let id = Uuid::new_v4().to_string();
    let token = shared.register(&id);

    debug!("Connection {id} accepted from {peer}");
    tokio::spawn(serve_connection(
        stream,
        id.clone(),
        token,
        Arc::clone(shared),
    ));

    shared.emit(ConnectionEvent::new(peer.ip().to_string(), id));
}

async fn serve_connection(
    mut stream: TcpStream,
    id: String,
    token: CancellationToken,
    shared: Arc<Shared>,
) {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("Connection {id} closed by server");
                break;
            }
            read = stream.read(&mut buffer) => match read {
                Ok(0) => {
                    debug!("Connection {id} closed by peer");
                    break;
                }
                Ok(size) => {
                    if let Some(target) = shared.rpc_logger {
                        debug!(target: target, "Connection {id} received {size} byte(s)");
                    }
                }
                Err(e) => {
                    debug!("Connection {id} read failed: {e}");
                    break;
                }
            },
        }
    }

    shared.forget(&id);
    if let Err(e) = stream.shutdown().await {
        debug!("Connection {id} shutdown failed: {e}");
    }
}
