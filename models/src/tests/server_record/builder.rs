use crate::{ModelError, ServerRecordBuilder, ServerRole};

fn valid_builder() -> ServerRecordBuilder {
    ServerRecordBuilder::default()
        .with_id("connector-server-1")
        .with_server_type("connector")
        .with_host("127.0.0.1")
        .with_port(4050)
}

/// **VALUE**: Verifies that a fully specified builder produces the expected record.
///
/// **WHY THIS MATTERS**: The service reads the RPC listening port and the server type from
/// this record. A builder that drops or rewrites fields would bind the wrong port or expose
/// the wrong remote directory.
#[test]
fn given_all_fields_when_building_then_returns_record() {
    // GIVEN: A builder with every field set
    let builder = valid_builder().with_frontend(true).with_client_port(3010);

    // WHEN: Building
    let record = builder.build().expect("valid record");

    // THEN: Fields are carried through unchanged
    assert_eq!(record.id, "connector-server-1");
    assert_eq!(record.server_type, "connector");
    assert_eq!(record.port, 4050);
    assert_eq!(record.client_port, Some(3010));
    assert_eq!(record.role(), ServerRole::Frontend);
}

/// **VALUE**: Verifies that a record without the frontend flag is a backend server.
///
/// **BUG THIS CATCHES**: Would catch an inverted role mapping, which would make the path
/// resolver look up the wrong system remote directory.
#[test]
fn given_no_frontend_flag_when_building_then_role_is_backend() {
    let record = valid_builder().build().expect("valid record");

    assert_eq!(record.role(), ServerRole::Backend);
    assert_eq!(record.role().as_str(), "backend");
}

/// **VALUE**: Verifies that the port is mandatory and non-zero.
///
/// **WHY THIS MATTERS**: Port 0 would make the RPC server bind an ephemeral port that no
/// other node knows about.
#[test]
fn given_zero_port_when_building_then_returns_validation_error() {
    // GIVEN: Builder with port zero
    let builder = valid_builder().with_port(0);

    // WHEN: Attempting to build
    let result = builder.build();

    // THEN: Should return validation error
    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Port must be non-zero");
        }
        Ok(record) => panic!("Expected validation error, got {record:?}"),
    }
}

/// **VALUE**: Verifies that a missing server type is rejected.
#[test]
fn given_missing_server_type_when_building_then_returns_validation_error() {
    let builder = ServerRecordBuilder::default()
        .with_id("gate-1")
        .with_port(3014);

    match builder.build() {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Server type is required");
        }
        Ok(record) => panic!("Expected validation error, got {record:?}"),
    }
}

/// **VALUE**: Verifies that server types cannot escape the `app/servers` directory.
///
/// **BUG THIS CATCHES**: Would catch a server type such as `../../etc` being accepted and
/// then joined into a user remote path outside the application base.
#[test]
fn given_server_type_with_separator_when_building_then_returns_validation_error() {
    let result = valid_builder().with_server_type("../chat").build();

    assert!(
        matches!(result, Err(ModelError::Validation { .. })),
        "Path-like server types must be rejected"
    );
}

/// **VALUE**: Verifies the loopback default for an unset host.
#[test]
fn given_no_host_when_building_then_defaults_to_loopback() {
    let record = ServerRecordBuilder::default()
        .with_id("chat-server-1")
        .with_server_type("chat")
        .with_port(6050)
        .build()
        .expect("valid record");

    assert_eq!(record.host, "127.0.0.1");
}
