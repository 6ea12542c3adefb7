//! State machine tests driving `ConnectionManager` by hand.

mod common;

use common::{FakeTransport, Step, WS_ADDRESS, fixed};
use core_types::{ConnectionState, ReconnectPolicy};
use engine::{ConnectionEvent, ConnectionManager};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

fn manager(
    transport: &FakeTransport,
    policy: ReconnectPolicy,
) -> (ConnectionManager, UnboundedReceiver<ConnectionEvent>) {
    ConnectionManager::new("test-feed", Arc::new(transport.clone()), policy)
}

#[tokio::test]
async fn a_second_start_while_live_opens_nothing() {
    let transport = FakeTransport::new([Step::hold(&[])]);
    let (mut manager, mut events) = manager(&transport, ReconnectPolicy::Manual);

    assert!(manager.start(WS_ADDRESS));
    assert_eq!(manager.state(), ConnectionState::Connecting);
    assert!(!manager.start("ws://elsewhere.test/ws/logs"));

    let opened = events.recv().await.unwrap();
    assert_eq!(opened, ConnectionEvent::Opened { generation: 1 });
    manager.handle_event(opened);
    assert_eq!(manager.state(), ConnectionState::Open);

    assert!(!manager.start(WS_ADDRESS));
    assert_eq!(transport.connect_count(), 1);
    assert_eq!(manager.address(), Some(WS_ADDRESS));
}

#[tokio::test]
async fn stop_is_idempotent_and_ends_idle() {
    let transport = FakeTransport::new([Step::hold(&[])]);
    let (mut manager, mut events) = manager(&transport, fixed(3));

    assert!(!manager.stop());
    assert_eq!(manager.state(), ConnectionState::Idle);

    manager.start(WS_ADDRESS);
    let opened = events.recv().await.unwrap();
    manager.handle_event(opened);
    assert_eq!(manager.state(), ConnectionState::Open);

    assert!(manager.stop());
    assert_eq!(manager.state(), ConnectionState::Idle);
    assert!(!manager.stop());
    assert_eq!(manager.state(), ConnectionState::Idle);
    assert_eq!(manager.address(), None);
}

#[tokio::test]
async fn events_from_a_stopped_attempt_are_ignored() {
    let transport = FakeTransport::new([Step::hold(&["late"])]);
    let (mut manager, mut events) = manager(&transport, fixed(3));

    manager.start(WS_ADDRESS);
    let opened = events.recv().await.unwrap();
    assert!(manager.stop());

    assert_eq!(manager.handle_event(opened), None);
    assert_eq!(
        manager.handle_event(ConnectionEvent::Frame {
            generation: 1,
            text: "late".to_string(),
        }),
        None
    );
    manager.handle_event(ConnectionEvent::Failed {
        generation: 1,
        error: "reset".to_string(),
    });

    assert_eq!(manager.state(), ConnectionState::Idle);
    assert!(!manager.reconnect_pending());
}

#[tokio::test]
async fn only_frames_of_the_open_attempt_are_forwarded() {
    let transport = FakeTransport::new([Step::hold(&["first"])]);
    let (mut manager, mut events) = manager(&transport, ReconnectPolicy::Manual);

    manager.start(WS_ADDRESS);
    let opened = events.recv().await.unwrap();
    manager.handle_event(opened);

    let frame = events.recv().await.unwrap();
    assert_eq!(manager.handle_event(frame), Some("first".to_string()));
    assert_eq!(
        manager.handle_event(ConnectionEvent::Frame {
            generation: 99,
            text: "stray".to_string(),
        }),
        None
    );
}

#[tokio::test]
async fn manual_channels_go_idle_after_a_failure() {
    let transport = FakeTransport::new([Step::Fail]);
    let (mut manager, mut events) = manager(&transport, ReconnectPolicy::Manual);

    manager.start(WS_ADDRESS);
    let failed = events.recv().await.unwrap();
    assert!(matches!(failed, ConnectionEvent::Failed { generation: 1, .. }));
    manager.handle_event(failed);

    assert_eq!(manager.state(), ConnectionState::Idle);
    assert!(!manager.reconnect_pending());
}

#[tokio::test(start_paused = true)]
async fn a_failure_schedules_one_reconnect_at_the_last_address() {
    let transport = FakeTransport::new([Step::Fail, Step::hold(&[])]);
    let (mut manager, mut events) = manager(&transport, fixed(3));
    let mut states = manager.watch_state();

    manager.start(WS_ADDRESS);
    let failed = events.recv().await.unwrap();
    manager.handle_event(failed);
    assert_eq!(manager.state(), ConnectionState::Errored);
    assert!(manager.reconnect_pending());
    assert_eq!(*states.borrow_and_update(), ConnectionState::Errored);

    let due = events.recv().await.unwrap();
    assert_eq!(due, ConnectionEvent::ReconnectDue { generation: 2 });
    manager.handle_event(due.clone());
    assert_eq!(manager.state(), ConnectionState::Connecting);

    let opened = events.recv().await.unwrap();
    assert_eq!(opened, ConnectionEvent::Opened { generation: 3 });
    manager.handle_event(opened);
    assert_eq!(manager.state(), ConnectionState::Open);

    // A duplicate timer event changes nothing.
    manager.handle_event(due);
    assert_eq!(transport.connect_count(), 2);
    assert_eq!(transport.addresses(), vec![WS_ADDRESS.to_string(); 2]);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_a_pending_reconnect() {
    let transport = FakeTransport::new([Step::Fail]);
    let (mut manager, mut events) = manager(&transport, fixed(3));

    manager.start(WS_ADDRESS);
    let failed = events.recv().await.unwrap();
    manager.handle_event(failed);
    assert!(manager.reconnect_pending());

    assert!(manager.stop());
    assert_eq!(manager.state(), ConnectionState::Idle);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(events.try_recv().is_err());
    assert_eq!(transport.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn a_server_close_counts_as_a_drop() {
    let transport = FakeTransport::new([Step::frames(&[])]);
    let (mut manager, mut events) = manager(&transport, fixed(3));

    manager.start(WS_ADDRESS);
    let opened = events.recv().await.unwrap();
    manager.handle_event(opened);
    let closed = events.recv().await.unwrap();
    assert_eq!(closed, ConnectionEvent::Closed { generation: 1 });
    manager.handle_event(closed);

    assert_eq!(manager.state(), ConnectionState::Closed);
    assert!(manager.reconnect_pending());
}
