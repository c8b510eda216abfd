use crate::helpers::{
    RecordingFactory, TEST_PORT, test_context, test_service, write_whitelist,
};

use models::{ConnectionEvent, PathNamespace};
use remote_core::config::{RPC_DEBUG_LOG_SETTING, RPC_DEBUG_LOG_TARGET};
use remote_core::{ConfigError, RemoteConfig, RemoteError, ServiceState, UNAUTHORIZED_REASON};

use std::fs::create_dir_all;

use serde_json::json;
use tempfile::TempDir;

/// **VALUE**: Verifies that the RPC server is created with every option the service derives.
///
/// **WHY THIS MATTERS**: The RPC server is the only consumer of these options. A wrong port
/// binds the wrong socket; reversed paths let framework remotes shadow application ones; a
/// dropped pass-through key silently ignores operator configuration.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The port is not taken from the current server record
/// - Remote paths are reordered or include missing directories
/// - The legacy `cacheMsg` key no longer enables buffering
/// - The RPC debug logger is not attached when the app setting is on
/// - Unknown config keys are not passed through
#[tokio::test]
async fn given_full_config_when_starting_then_server_receives_derived_options() {
    // GIVEN: A frontend connector with both remote directories present
    let dir = TempDir::new().expect("temp dir");
    let base = dir.path().join("game");
    create_dir_all(base.join("lib/common/remote/frontend")).expect("sys dir");
    create_dir_all(base.join("app/servers/connector/remote")).expect("user dir");

    let context = test_context(&base, "connector", true).with_enabled(RPC_DEBUG_LOG_SETTING);
    let config: RemoteConfig = serde_json::from_value(json!({
        "cacheMsg": true,
        "interval": 50,
        "acceptorTimeout": 3000
    }))
    .expect("valid config");
    let (mut service, recorder) = test_service(context, config, RecordingFactory::default());

    // WHEN: Starting
    service.start().await.expect("start");

    // THEN: Options reflect the context and config
    let options = recorder.options();
    assert_eq!(options.port, TEST_PORT);
    let namespaces: Vec<_> = options.paths.iter().map(|p| p.namespace).collect();
    assert_eq!(namespaces, vec![PathNamespace::Sys, PathNamespace::User]);
    assert!(options.buffer_msg);
    assert_eq!(options.interval, 50);
    assert!(options.rpc_debug_log);
    assert_eq!(options.rpc_logger, Some(RPC_DEBUG_LOG_TARGET));
    assert_eq!(options.extra.get("acceptorTimeout"), Some(&json!(3000)));
    assert_eq!(options.context.server_id(), "connector-server-1");

    // THEN: Running with a listener registered
    assert_eq!(service.state(), ServiceState::Running);
    assert!(recorder.is_started());
    assert!(recorder.has_listener());
}

/// **VALUE**: Verifies that nothing is filtered when no whitelist is configured.
///
/// **WHY THIS MATTERS**: Filtering is opt-in. Existing deployments without a whitelist must
/// keep accepting connections from anywhere.
#[tokio::test]
async fn given_no_whitelist_when_connections_arrive_then_none_are_kicked() {
    // GIVEN: A running service without whitelistPath
    let dir = TempDir::new().expect("temp dir");
    let (mut service, recorder) = test_service(
        test_context(dir.path(), "chat", false),
        RemoteConfig::default(),
        RecordingFactory::default(),
    );
    service.start().await.expect("start");

    // WHEN: Connections arrive from arbitrary addresses
    recorder.emit("9.9.9.9", "c1");
    recorder.emit("203.0.113.7", "c2");

    // THEN: No kicks, no whitelist
    assert!(recorder.kicks().is_empty());
    assert!(service.whitelist().is_none());
    assert!(!service.gate().expect("gate").is_filtering());
}

/// **VALUE**: Verifies end-to-end enforcement of the whitelist.
///
/// **WHY THIS MATTERS**: This is the security property of the whole component. Connections
/// from unlisted addresses must be kicked with the `unauthorized` reason; listed and loopback
/// addresses must stay connected.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The gate is never registered with the server
/// - The whitelist is loaded but not consulted
/// - Loopback is not merged in
/// - The kick uses the wrong id or reason
#[tokio::test]
async fn given_whitelist_when_connections_arrive_then_only_unlisted_are_kicked() {
    // GIVEN: A whitelist allowing 1.2.3.4
    let dir = TempDir::new().expect("temp dir");
    let path = write_whitelist(dir.path(), r#"["1.2.3.4"]"#);
    let (mut service, recorder) = test_service(
        test_context(dir.path(), "chat", false),
        RemoteConfig::default().with_whitelist_path(&path),
        RecordingFactory::default(),
    );
    service.start().await.expect("start");

    // WHEN: Listed, loopback and unlisted peers connect
    recorder.emit("1.2.3.4", "c1");
    recorder.emit("127.0.0.1", "c2");
    recorder.emit("9.9.9.9", "c3");

    // THEN: Only the unlisted peer is kicked
    assert_eq!(
        recorder.kicks(),
        vec![("c3".to_string(), UNAUTHORIZED_REASON.to_string())]
    );
}

/// **VALUE**: Verifies that incomplete connection events are let through.
#[tokio::test]
async fn given_whitelist_when_event_lacks_ip_then_connection_is_not_kicked() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_whitelist(dir.path(), r#"["1.2.3.4"]"#);
    let (mut service, recorder) = test_service(
        test_context(dir.path(), "chat", false),
        RemoteConfig::default().with_whitelist_path(&path),
        RecordingFactory::default(),
    );
    service.start().await.expect("start");

    recorder.emit_event(ConnectionEvent {
        ip: None,
        id: Some("c4".to_string()),
    });

    assert!(recorder.kicks().is_empty());
}

/// **VALUE**: Verifies that a whitelist path that does not exist aborts startup.
///
/// **WHY THIS MATTERS**: An operator who configured a whitelist expects filtering. Starting
/// without it would expose the RPC port to everyone.
///
/// **BUG THIS CATCHES**: Would catch a missing file being treated as "no whitelist", or the
/// service being left half-started in `Starting`.
#[tokio::test]
async fn given_missing_whitelist_file_when_starting_then_fails_and_stops() {
    // GIVEN: A whitelistPath pointing nowhere
    let dir = TempDir::new().expect("temp dir");
    let (mut service, recorder) = test_service(
        test_context(dir.path(), "chat", false),
        RemoteConfig::default().with_whitelist_path(dir.path().join("absent.json")),
        RecordingFactory::default(),
    );

    // WHEN: Starting
    let result = service.start().await;

    // THEN: Configuration error, service stopped, server never started
    assert!(
        matches!(
            result,
            Err(RemoteError::Config(ConfigError::PathResolution { .. }))
        ),
        "Got: {result:?}"
    );
    assert_eq!(service.state(), ServiceState::Stopped);
    assert!(!recorder.is_started());
}

/// **VALUE**: Verifies that a whitelist file with the wrong shape aborts startup.
#[tokio::test]
async fn given_non_array_whitelist_when_starting_then_fails() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_whitelist(dir.path(), r#"{"allow": ["1.2.3.4"]}"#);
    let (mut service, _recorder) = test_service(
        test_context(dir.path(), "chat", false),
        RemoteConfig::default().with_whitelist_path(&path),
        RecordingFactory::default(),
    );

    let result = service.start().await;

    assert!(matches!(
        result,
        Err(RemoteError::Config(ConfigError::WhitelistNotArray { .. }))
    ));
    assert_eq!(service.state(), ServiceState::Stopped);
}

/// **VALUE**: Verifies that a server start failure is returned and leaves the service stopped.
#[tokio::test]
async fn given_server_start_failure_when_starting_then_error_is_returned() {
    let dir = TempDir::new().expect("temp dir");
    let (mut service, _recorder) = test_service(
        test_context(dir.path(), "chat", false),
        RemoteConfig::default(),
        RecordingFactory::failing_start(),
    );

    let result = service.start().await;

    assert!(matches!(result, Err(RemoteError::Server { .. })));
    assert_eq!(service.state(), ServiceState::Stopped);
    assert!(service.server().is_none());
}

/// **VALUE**: Verifies that starting twice is rejected.
///
/// **BUG THIS CATCHES**: Would catch a second start creating another RPC server on the same
/// port and orphaning the first one.
#[tokio::test]
async fn given_running_service_when_starting_again_then_returns_invalid_state() {
    let dir = TempDir::new().expect("temp dir");
    let (mut service, _recorder) = test_service(
        test_context(dir.path(), "chat", false),
        RemoteConfig::default(),
        RecordingFactory::default(),
    );
    service.start().await.expect("first start");

    let result = service.start().await;

    assert!(matches!(result, Err(RemoteError::InvalidState { .. })));
    assert_eq!(service.state(), ServiceState::Running);
}

/// **VALUE**: Verifies stop semantics: force is passed through, the gate closes and a second
/// stop is a no-op.
///
/// **WHY THIS MATTERS**: Node shutdown calls stop on every component and may repeat it on
/// signals. A second stop must not fail, and connections arriving during shutdown must not be
/// evaluated against a whitelist that is being torn down.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The force flag is dropped or inverted
/// - The server is stopped twice
/// - Events after stop still trigger kicks
#[tokio::test]
async fn given_running_service_when_stopping_then_server_stops_once_with_force() {
    // GIVEN: A running service with a whitelist
    let dir = TempDir::new().expect("temp dir");
    let path = write_whitelist(dir.path(), r#"["1.2.3.4"]"#);
    let (mut service, recorder) = test_service(
        test_context(dir.path(), "chat", false),
        RemoteConfig::default().with_whitelist_path(&path),
        RecordingFactory::default(),
    );
    service.start().await.expect("start");

    // WHEN: Stopping with force, then again
    service.stop(true).await.expect("stop");
    service.stop(false).await.expect("second stop");

    // THEN: One forced stop, gate closed
    assert_eq!(recorder.stops(), vec![true]);
    assert_eq!(service.state(), ServiceState::Stopped);
    assert!(service.gate().expect("gate").is_closed());

    recorder.emit("9.9.9.9", "late");
    assert!(recorder.kicks().is_empty(), "Closed gate must not kick");
}

/// **VALUE**: Verifies that stopping a service that never started is rejected.
#[tokio::test]
async fn given_created_service_when_stopping_then_returns_invalid_state() {
    let dir = TempDir::new().expect("temp dir");
    let (mut service, recorder) = test_service(
        test_context(dir.path(), "chat", false),
        RemoteConfig::default(),
        RecordingFactory::default(),
    );

    let result = service.stop(false).await;

    assert!(matches!(result, Err(RemoteError::InvalidState { .. })));
    assert_eq!(service.state(), ServiceState::Created);
    assert!(recorder.stops().is_empty());
}

/// **VALUE**: Verifies that the service cannot be restarted after stopping.
#[tokio::test]
async fn given_stopped_service_when_starting_then_returns_invalid_state() {
    let dir = TempDir::new().expect("temp dir");
    let (mut service, _recorder) = test_service(
        test_context(dir.path(), "chat", false),
        RemoteConfig::default(),
        RecordingFactory::default(),
    );
    service.start().await.expect("start");
    service.stop(false).await.expect("stop");

    let result = service.start().await;

    assert!(matches!(result, Err(RemoteError::InvalidState { .. })));
}
