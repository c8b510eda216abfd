use crate::helpers::{connect, free_port, is_connection_closed};

use remote_core::{ConfigError, CoreError, RemoteError, ServiceState};
use remote_node::node;

use std::fs::write;

use serde_json::json;
use tempfile::TempDir;

/// **VALUE**: Verifies the node wiring end to end: config file, remote service, whitelist
/// and TCP acceptor.
///
/// **WHY THIS MATTERS**: Each piece is tested on its own; this catches them not fitting
/// together, e.g. the service never registering its gate with the real acceptor, or the
/// config's relative whitelist path not resolving.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The acceptor does not bind the port from the server record
/// - Loopback peers are kicked despite always being whitelisted
/// - Stop does not close connections when forced
#[tokio::test]
async fn given_node_config_with_whitelist_when_running_then_loopback_peer_stays_connected() {
    // GIVEN: A node config with a relative whitelist path and a free port
    let dir = TempDir::new().expect("temp dir");
    let port = free_port();
    write(dir.path().join("whitelist.json"), r#"["10.1.2.3"]"#).expect("write whitelist");
    let config_path = dir.path().join("node.json");
    write(
        &config_path,
        json!({
            "server": {
                "id": "chat-server-1",
                "serverType": "chat",
                "host": "127.0.0.1",
                "port": port
            },
            "remote": { "whitelistPath": "whitelist.json" }
        })
        .to_string(),
    )
    .expect("write config");

    // WHEN: Starting the node and connecting from loopback
    let mut service = node::start(&config_path).await.expect("start");
    let mut client = connect(port).await;

    // THEN: The connection is accepted and kept
    assert_eq!(service.state(), ServiceState::Running);
    assert!(!is_connection_closed(&mut client).await);
    assert!(
        service
            .whitelist()
            .expect("whitelist")
            .snapshot()
            .contains("10.1.2.3")
    );

    // WHEN: Stopping forcefully
    service.stop(true).await.expect("stop");

    // THEN: The connection is closed
    assert!(is_connection_closed(&mut client).await);
    assert_eq!(service.state(), ServiceState::Stopped);
}

/// **VALUE**: Verifies that a broken config file fails startup as a config error.
///
/// **WHY THIS MATTERS**: The binary maps the error kind to its exit message. A config problem
/// reported as a remote failure sends operators looking at the network instead of the file.
#[tokio::test]
async fn given_invalid_config_when_starting_node_then_returns_config_error() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("node.json");
    write(&config_path, "{ not json").expect("write config");

    let result = node::start(&config_path).await;

    assert!(
        matches!(result, Err(CoreError::Config(ConfigError::ParseError { .. }))),
        "Got: {:?}",
        result.err()
    );
}

/// **VALUE**: Verifies that a missing whitelist fails startup as a remote error.
#[tokio::test]
async fn given_missing_whitelist_when_starting_node_then_returns_remote_error() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("node.json");
    write(
        &config_path,
        json!({
            "server": {
                "id": "chat-server-1",
                "serverType": "chat",
                "host": "127.0.0.1",
                "port": free_port()
            },
            "remote": { "whitelistPath": "absent.json" }
        })
        .to_string(),
    )
    .expect("write config");

    let result = node::start(&config_path).await;

    assert!(
        matches!(
            result,
            Err(CoreError::Remote(RemoteError::Config(ConfigError::PathResolution { .. })))
        ),
        "Got: {:?}",
        result.err()
    );
}
