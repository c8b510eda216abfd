//! Remote service lifecycle.
//!
//! Startup order:
//!
//! 1. take the RPC port from the current server record
//! 2. resolve the remote-interface directories
//! 3. create the RPC server with those directories and the app context
//! 4. when a whitelist is configured: canonicalize its path, load it and
//!    start polling it for changes
//! 5. register the connection gate and start the server
//!
//! Shutdown closes the gate, cancels the poller and stops the server.

pub mod state;

pub use state::ServiceState;

use crate::config::{RPC_DEBUG_LOG_TARGET, RemoteConfig};
use crate::error::remote::RemoteError;
use crate::gate::ConnectionGate;
use crate::paths::PathResolver;
use crate::rpc::{ConnectionListener, RpcServer, RpcServerFactory, RpcServerOptions};
use crate::whitelist::{
    FileWatcher, InterfaceAddresses, PlatformFamily, SystemInterfaces, WhitelistSource,
    WhitelistStore, resolve_source_path,
};

use models::{AppContext, RemotePathRecord};

use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};

/// The remote service component of a server node.
pub struct RemoteService<F: RpcServerFactory> {
    context: Arc<AppContext>,
    config: RemoteConfig,
    factory: F,
    resolver: PathResolver,
    platform: PlatformFamily,
    interfaces: Arc<dyn InterfaceAddresses>,
    state: ServiceState,
    server: Option<F::Server>,
    gate: Option<Arc<ConnectionGate>>,
    whitelist: Option<WhitelistStore>,
    watcher: Option<FileWatcher>,
}

impl<F: RpcServerFactory> RemoteService<F> {
    /// Component name under which the service registers with the node.
    pub const NAME: &'static str = "__remote__";

    pub fn new(context: Arc<AppContext>, config: RemoteConfig, factory: F) -> Self {
        let resolver = PathResolver::new(config.sys_remote_root(context.base()), context.base());

        Self {
            context,
            config,
            factory,
            resolver,
            platform: PlatformFamily::current(),
            interfaces: Arc::new(SystemInterfaces),
            state: ServiceState::Created,
            server: None,
            gate: None,
            whitelist: None,
            watcher: None,
        }
    }

    pub fn with_path_resolver(mut self, resolver: PathResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Override where local interface addresses come from.
    pub fn with_interfaces(
        mut self,
        platform: PlatformFamily,
        interfaces: Arc<dyn InterfaceAddresses>,
    ) -> Self {
        self.platform = platform;
        self.interfaces = interfaces;
        self
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn server(&self) -> Option<&F::Server> {
        self.server.as_ref()
    }

    pub fn gate(&self) -> Option<&Arc<ConnectionGate>> {
        self.gate.as_ref()
    }

    pub fn whitelist(&self) -> Option<&WhitelistStore> {
        self.whitelist.as_ref()
    }

    /// Options the RPC server is created with for `paths`.
    pub fn server_options(&self, paths: Vec<RemotePathRecord>) -> RpcServerOptions {
        let rpc_debug_log = self.config.rpc_debug_log(&self.context);

        RpcServerOptions {
            port: self.context.current_server().port,
            paths,
            context: Arc::clone(&self.context),
            buffer_msg: self.config.buffer_msg(),
            interval: self.config.interval(),
            rpc_debug_log,
            rpc_logger: rpc_debug_log.then_some(RPC_DEBUG_LOG_TARGET),
            extra: self.config.extra.clone(),
        }
    }

    /// Bring the service up.
    ///
    /// Returns after yielding once to the scheduler so that code following
    /// the call observes a fully started component.
    ///
    /// # Errors
    ///
    /// - [`RemoteError::InvalidState`] unless the service is freshly created
    /// - [`RemoteError::Config`] if the whitelist path cannot be resolved or
    ///   the whitelist cannot be loaded
    /// - any error from the RPC server factory or `start`
    ///
    /// On error the service ends up [`ServiceState::Stopped`].
    pub async fn start(&mut self) -> Result<(), RemoteError> {
        self.state.advance(ServiceState::Starting)?;

        match self.bring_up() {
            Ok(()) => {
                self.state.advance(ServiceState::Running)?;
                info!(
                    "Remote service for {} running on port {}",
                    self.context.server_id(),
                    self.context.current_server().port
                );
            }
            Err(e) => {
                error!(
                    "Remote service for {} failed to start: {e}",
                    self.context.server_id()
                );
                self.state.advance(ServiceState::Stopped)?;
                return Err(e);
            }
        }

        tokio::task::yield_now().await;
        Ok(())
    }

    fn bring_up(&mut self) -> Result<(), RemoteError> {
        let paths = self.resolver.resolve_for(&self.context);
        let options = self.server_options(paths);
        let mut server = self.factory.create(options)?;

        let whitelist = match self.config.whitelist_path {
            Some(ref path) => Some(self.open_whitelist(path)?),
            None => None,
        };

        let gate = Arc::new(ConnectionGate::new(whitelist.clone()));
        let listener: Arc<dyn ConnectionListener> = gate.clone();
        server.on_connection(listener);

        let watcher = whitelist.as_ref().map(|store| self.watch_whitelist(store));

        server.start()?;

        self.server = Some(server);
        self.gate = Some(gate);
        self.whitelist = whitelist;
        self.watcher = watcher;
        Ok(())
    }

    fn open_whitelist(&self, path: &Path) -> Result<WhitelistStore, RemoteError> {
        let real_path = resolve_source_path(path)?;
        let source = WhitelistSource::new(real_path)
            .with_platform(self.platform)
            .with_interfaces(Arc::clone(&self.interfaces));

        Ok(WhitelistStore::open(source)?)
    }

    fn watch_whitelist(&self, store: &WhitelistStore) -> FileWatcher {
        let reload_store = store.clone();

        FileWatcher::watch_from(
            store.source().path().to_path_buf(),
            self.config.whitelist_interval(),
            store.opened_modified(),
            move || {
                if let Err(e) = reload_store.reload() {
                    warn!("Whitelist reload failed, keeping previous list: {e}");
                }
            },
        )
    }

    /// Stop the service. `force` is passed to the RPC server.
    ///
    /// Stopping an already stopped service is a no-op.
    ///
    /// # Errors
    ///
    /// - [`RemoteError::InvalidState`] if the service never reached
    ///   [`ServiceState::Running`]
    /// - any error from the RPC server's `stop`
    pub async fn stop(&mut self, force: bool) -> Result<(), RemoteError> {
        if self.state == ServiceState::Stopped {
            warn!(
                "Remote service for {} already stopped",
                self.context.server_id()
            );
            tokio::task::yield_now().await;
            return Ok(());
        }

        self.state.advance(ServiceState::Stopping)?;

        if let Some(ref gate) = self.gate {
            gate.close();
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.cancel();
        }

        let result = match self.server.as_mut() {
            Some(server) => server.stop(force),
            None => Ok(()),
        };

        self.state.advance(ServiceState::Stopped)?;
        info!(
            "Remote service for {} stopped (force: {force})",
            self.context.server_id()
        );

        tokio::task::yield_now().await;
        result
    }
}
