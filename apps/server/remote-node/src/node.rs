//! Node startup: config file to running remote service.

use crate::acceptor::TcpRpcServerFactory;

use remote_core::{CoreError, NodeConfig, RemoteService};

use std::path::Path;
use std::sync::Arc;

use log::info;

/// Load the node config at `config_path` and start its remote service on the
/// TCP acceptor.
///
/// # Errors
///
/// - [`CoreError::Config`] if the config cannot be loaded or is invalid
/// - [`CoreError::Remote`] if the service fails to start
pub async fn start(config_path: &Path) -> Result<RemoteService<TcpRpcServerFactory>, CoreError> {
    info!("Loading node config from {}", config_path.display());
    let config = NodeConfig::load(config_path)?;
    let context = Arc::new(config.app_context());

    let mut service = RemoteService::new(context, config.remote, TcpRpcServerFactory);
    service.start().await?;

    info!(
        "Node {} ({}) up",
        service.context().server_id(),
        service.context().server_type()
    );
    Ok(service)
}
