use crate::helpers::{RecordingListener, connect, is_connection_closed, options};

use remote_core::{RpcServer, RpcServerFactory};
use remote_node::acceptor::TcpRpcServerFactory;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// **VALUE**: Verifies that every accepted connection is reported with its peer IP and a
/// unique id.
///
/// **WHY THIS MATTERS**: The whitelist gate decides on the reported IP and kicks by the
/// reported id. A wrong IP bypasses the whitelist; a repeated id kicks the wrong peer.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The listener is never called
/// - The IP is reported with a port or in a different format
/// - Connection ids are reused
#[tokio::test]
async fn given_started_acceptor_when_clients_connect_then_events_carry_ip_and_unique_id() {
    // GIVEN: A started acceptor with a recording listener
    let listener = Arc::new(RecordingListener::default());
    let mut server = TcpRpcServerFactory.create(options(0)).expect("create");
    server.on_connection(listener.clone());
    server.start().expect("start");
    let port = server.local_addr().expect("bound").port();

    // WHEN: Two clients connect
    let _first = connect(port).await;
    let _second = connect(port).await;

    // THEN: Two events from 127.0.0.1 with distinct UUID ids
    let events = listener.wait_for_events(2).await;
    assert_eq!(events.len(), 2);
    for event in &events {
        assert_eq!(event.ip.as_deref(), Some("127.0.0.1"));
        let id = event.id.as_deref().expect("id");
        assert!(Uuid::parse_str(id).is_ok(), "Id should be a UUID: {id}");
    }
    assert_ne!(events[0].id, events[1].id);

    server.stop(true).expect("stop");
}

/// **VALUE**: Verifies that a kick issued from the listener closes the connection.
///
/// **WHY THIS MATTERS**: This is how non-whitelisted peers are removed. The kick is issued
/// synchronously while the event is delivered, so the connection must already be registered.
///
/// **BUG THIS CATCHES**: Would catch the connection being registered after the event is
/// emitted, which turns every kick into a no-op.
#[tokio::test]
async fn given_kicking_listener_when_client_connects_then_connection_is_closed() {
    // GIVEN: A listener that kicks everyone
    let listener = Arc::new(RecordingListener::kicking());
    let mut server = TcpRpcServerFactory.create(options(0)).expect("create");
    server.on_connection(listener.clone());
    server.start().expect("start");
    let port = server.local_addr().expect("bound").port();

    // WHEN: A client connects
    let mut client = connect(port).await;

    // THEN: The server closes it
    assert!(is_connection_closed(&mut client).await, "Kicked peer must be closed");
    assert_eq!(server.connection_count(), 0);

    server.stop(true).expect("stop");
}

/// **VALUE**: Verifies that allowed connections stay open and survive incoming data.
#[tokio::test]
async fn given_allowing_listener_when_client_sends_data_then_connection_stays_open() {
    let listener = Arc::new(RecordingListener::default());
    let mut server = TcpRpcServerFactory.create(options(0)).expect("create");
    server.on_connection(listener.clone());
    server.start().expect("start");
    let port = server.local_addr().expect("bound").port();

    let mut client = connect(port).await;
    client.write_all(b"hello").await.expect("write");

    assert!(!is_connection_closed(&mut client).await);
    assert_eq!(server.connection_count(), 1);

    server.stop(true).expect("stop");
}

/// **VALUE**: Verifies the difference between graceful and forced stop.
///
/// **WHY THIS MATTERS**: A graceful shutdown lets in-flight RPCs finish; a forced one must not
/// leave sockets open, or the node process lingers until every peer disconnects.
///
/// **BUG THIS CATCHES**: Would catch `force` being ignored in either direction.
#[tokio::test]
async fn given_open_connections_when_stopping_then_force_decides_whether_they_close() {
    // GIVEN: Two acceptors each holding one open connection
    let mut graceful = TcpRpcServerFactory.create(options(0)).expect("create");
    graceful.start().expect("start");
    let mut graceful_client = connect(graceful.local_addr().expect("bound").port()).await;

    let mut forced = TcpRpcServerFactory.create(options(0)).expect("create");
    forced.start().expect("start");
    let mut forced_client = connect(forced.local_addr().expect("bound").port()).await;

    // Let both accept loops register their connection
    tokio::time::sleep(Duration::from_millis(50)).await;

    // WHEN: Stopping one gracefully and one forcefully
    graceful.stop(false).expect("graceful stop");
    forced.stop(true).expect("forced stop");

    // THEN: Only the forced acceptor closes its connection
    assert!(!is_connection_closed(&mut graceful_client).await);
    assert!(is_connection_closed(&mut forced_client).await);

    // AND: Neither accepts new connections
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!graceful.is_accepting());
    assert!(!forced.is_accepting());
}
