//! Test helpers for remote service integration tests.
//!
//! - [`RecordingFactory`] / [`RecordingServer`]: an RPC server that records what the
//!   service asks of it and can replay connection events to the registered listener
//! - [`NoInterfaces`]: keeps the host's interface addresses out of the whitelist
//! - [`test_context`]: a validated app context rooted at a temp dir

use models::{AppContext, ConnectionEvent, ServerRecordBuilder};
use remote_core::whitelist::{InterfaceAddresses, PlatformFamily};
use remote_core::{
    ConnectionKicker, ConnectionListener, RemoteConfig, RemoteError, RemoteService, RpcServer,
    RpcServerFactory, RpcServerOptions,
};

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_PORT: u16 = 4050;

/// Everything the service did to its RPC server.
#[derive(Default)]
pub struct Recorder {
    options: Mutex<Option<RpcServerOptions>>,
    listener: Mutex<Option<Arc<dyn ConnectionListener>>>,
    started: AtomicBool,
    stops: Mutex<Vec<bool>>,
    kicks: Mutex<Vec<(String, String)>>,
}

impl Recorder {
    pub fn options(&self) -> RpcServerOptions {
        self.options
            .lock()
            .expect("options")
            .clone()
            .expect("Server was never created")
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().expect("listener").is_some()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> Vec<bool> {
        self.stops.lock().expect("stops").clone()
    }

    pub fn kicks(&self) -> Vec<(String, String)> {
        self.kicks.lock().expect("kicks").clone()
    }

    /// Report a connection the way a transport would.
    pub fn emit(&self, ip: &str, id: &str) {
        self.emit_event(ConnectionEvent::new(ip, id));
    }

    pub fn emit_event(&self, event: ConnectionEvent) {
        let listener = self.listener.lock().expect("listener").clone();
        if let Some(listener) = listener {
            listener.on_connection(event, self);
        }
    }
}

impl ConnectionKicker for Recorder {
    fn kick_by_id(&self, id: &str, reason: &str) {
        self.kicks
            .lock()
            .expect("kicks")
            .push((id.to_string(), reason.to_string()));
    }
}

pub struct RecordingServer {
    recorder: Arc<Recorder>,
    fail_start: bool,
}

impl ConnectionKicker for RecordingServer {
    fn kick_by_id(&self, id: &str, reason: &str) {
        self.recorder.kick_by_id(id, reason);
    }
}

impl RpcServer for RecordingServer {
    fn on_connection(&mut self, listener: Arc<dyn ConnectionListener>) {
        *self.recorder.listener.lock().expect("listener") = Some(listener);
    }

    fn start(&mut self) -> Result<(), RemoteError> {
        if self.fail_start {
            return Err(RemoteError::Server {
                message: "port already in use".to_string(),
                location: common::ErrorLocation::caller(),
            });
        }
        self.recorder.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self, force: bool) -> Result<(), RemoteError> {
        self.recorder.stops.lock().expect("stops").push(force);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingFactory {
    pub recorder: Arc<Recorder>,
    pub fail_start: bool,
}

impl RecordingFactory {
    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }
}

impl RpcServerFactory for RecordingFactory {
    type Server = RecordingServer;

    fn create(&self, options: RpcServerOptions) -> Result<RecordingServer, RemoteError> {
        *self.recorder.options.lock().expect("options") = Some(options);
        Ok(RecordingServer {
            recorder: Arc::clone(&self.recorder),
            fail_start: self.fail_start,
        })
    }
}

/// No interface has any address.
pub struct NoInterfaces;

impl InterfaceAddresses for NoInterfaces {
    fn ipv4_addresses(&self, _interface: &str) -> Vec<Ipv4Addr> {
        Vec::new()
    }
}

pub fn test_context(base: &Path, server_type: &str, frontend: bool) -> AppContext {
    let record = ServerRecordBuilder::default()
        .with_id(format!("{server_type}-server-1"))
        .with_server_type(server_type)
        .with_port(TEST_PORT)
        .with_frontend(frontend)
        .build()
        .expect("valid record");
    AppContext::new(base, record)
}

/// A service over a recording server that never sees the host's interfaces.
/// Returns the recorder alongside so tests can inspect the server after the
/// service takes ownership of it.
pub fn test_service(
    context: AppContext,
    config: RemoteConfig,
    factory: RecordingFactory,
) -> (RemoteService<RecordingFactory>, Arc<Recorder>) {
    let recorder = Arc::clone(&factory.recorder);
    let service = RemoteService::new(Arc::new(context), config, factory)
        .with_interfaces(PlatformFamily::Other, Arc::new(NoInterfaces));
    (service, recorder)
}

pub fn write_whitelist(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("whitelist.json");
    std::fs::write(&path, contents).expect("write whitelist");
    path
}
