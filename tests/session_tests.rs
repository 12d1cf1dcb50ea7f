use std::time::Duration;

use echosight::kernel::session::{
    ConnectionState, SessionConfig, SessionEffect, SessionInput, SessionNotice, StreamSession,
};

fn session() -> StreamSession {
    StreamSession::new(SessionConfig::default())
}

fn reconnects(effects: &[SessionEffect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, SessionEffect::ScheduleReconnect { .. }))
        .count()
}

fn open(session: &mut StreamSession) -> u64 {
    session.step(SessionInput::Start);
    let generation = session.generation();
    session.step(SessionInput::Opened { generation });
    generation
}

#[test]
fn test_start_connects() {
    let mut s = session();
    let effects = s.step(SessionInput::Start);

    assert_eq!(effects, vec![SessionEffect::Connect { generation: 1 }]);
    assert_eq!(s.state(), ConnectionState::Connecting);

    // Already connecting: a second start does nothing.
    assert!(s.step(SessionInput::Start).is_empty());
}

#[test]
fn test_open_notifies_and_starts_keepalive() {
    let mut s = session();
    s.step(SessionInput::Start);
    let effects = s.step(SessionInput::Opened { generation: 1 });

    assert_eq!(
        effects,
        vec![
            SessionEffect::Notify(SessionNotice::Connected),
            SessionEffect::StartKeepalive
        ]
    );
    assert!(s.is_connected());
}

#[test]
fn test_messages_delivered_only_while_open() {
    let mut s = session();
    s.step(SessionInput::Start);
    assert!(s
        .step(SessionInput::Message { generation: 1, text: "{}".into() })
        .is_empty());

    s.step(SessionInput::Opened { generation: 1 });
    assert_eq!(
        s.step(SessionInput::Message { generation: 1, text: "{}".into() }),
        vec![SessionEffect::Deliver("{}".into())]
    );
}

#[test]
fn test_close_schedules_exactly_one_reconnect() {
    let mut s = session();
    let generation = open(&mut s);

    let effects = s.step(SessionInput::Closed { generation });
    assert_eq!(
        effects,
        vec![
            SessionEffect::StopKeepalive,
            SessionEffect::Notify(SessionNotice::Disconnected),
            SessionEffect::ScheduleReconnect { generation, delay: Duration::from_millis(1200) },
        ]
    );
    assert_eq!(s.state(), ConnectionState::Disconnected);

    // Duplicate close / trailing error from the same link are ignored.
    assert_eq!(reconnects(&s.step(SessionInput::Closed { generation })), 0);
    assert_eq!(
        reconnects(&s.step(SessionInput::Error { generation, reason: "reset".into() })),
        0
    );
}

#[test]
fn test_reconnect_fires_into_connecting() {
    let mut s = session();
    let generation = open(&mut s);
    s.step(SessionInput::Closed { generation });

    let effects = s.step(SessionInput::ReconnectDue { generation });
    assert_eq!(effects, vec![SessionEffect::Connect { generation: generation + 1 }]);
    assert_eq!(s.state(), ConnectionState::Connecting);

    // A second firing of the same timer is a no-op.
    assert!(s.step(SessionInput::ReconnectDue { generation }).is_empty());
}

#[test]
fn test_error_forces_close_and_converges() {
    let mut s = session();
    let generation = open(&mut s);

    let effects = s.step(SessionInput::Error { generation, reason: "broken pipe".into() });
    assert_eq!(effects[0], SessionEffect::CloseTransport);
    assert!(effects.contains(&SessionEffect::StopKeepalive));
    assert!(effects.contains(&SessionEffect::Notify(SessionNotice::Disconnected)));
    assert_eq!(reconnects(&effects), 1);
}

#[test]
fn test_failed_connect_retries() {
    let mut s = session();
    s.step(SessionInput::Start);

    let effects = s.step(SessionInput::Error { generation: 1, reason: "refused".into() });
    assert!(!effects.contains(&SessionEffect::StopKeepalive));
    assert_eq!(reconnects(&effects), 1);
}

#[test]
fn test_stale_generation_ignored() {
    let mut s = session();
    let first = open(&mut s);
    s.step(SessionInput::Closed { generation: first });
    s.step(SessionInput::ReconnectDue { generation: first });
    s.step(SessionInput::Opened { generation: first + 1 });

    // Late close from the superseded link.
    assert!(s.step(SessionInput::Closed { generation: first }).is_empty());
    assert!(s.is_connected());
}

#[test]
fn test_keepalive_probe_only_while_open() {
    let mut s = session();
    assert!(s.step(SessionInput::KeepaliveDue).is_empty());

    let generation = open(&mut s);
    assert_eq!(s.step(SessionInput::KeepaliveDue), vec![SessionEffect::SendProbe]);

    s.step(SessionInput::Closed { generation });
    assert!(s.step(SessionInput::KeepaliveDue).is_empty());
}

#[test]
fn test_teardown_while_open() {
    let mut s = session();
    let generation = open(&mut s);

    let effects = s.step(SessionInput::Teardown);
    assert_eq!(effects, vec![SessionEffect::StopKeepalive, SessionEffect::CloseTransport]);

    // A late close after teardown schedules nothing.
    assert!(s.step(SessionInput::Closed { generation }).is_empty());
    assert!(s.step(SessionInput::Start).is_empty());
    assert!(!s.reconnect_pending());
}

#[test]
fn test_teardown_cancels_pending_reconnect() {
    let mut s = session();
    let generation = open(&mut s);
    s.step(SessionInput::Closed { generation });
    assert!(s.reconnect_pending());

    assert_eq!(s.step(SessionInput::Teardown), vec![SessionEffect::CancelReconnect]);
    // The timer firing anyway must not reconnect.
    assert!(s.step(SessionInput::ReconnectDue { generation }).is_empty());
    assert_eq!(s.state(), ConnectionState::Disconnected);
}

#[test]
fn test_teardown_while_connecting_drops_late_open() {
    let mut s = session();
    s.step(SessionInput::Start);

    assert_eq!(s.step(SessionInput::Teardown), vec![SessionEffect::CloseTransport]);
    assert!(s.step(SessionInput::Opened { generation: 1 }).is_empty());
    assert!(!s.is_connected());
}

#[test]
fn test_configured_delay_used() {
    let mut s = StreamSession::new(SessionConfig {
        reconnect_delay: Duration::from_millis(50),
        keepalive_interval: Duration::from_secs(1),
    });
    let generation = open(&mut s);

    let effects = s.step(SessionInput::Closed { generation });
    assert!(effects.contains(&SessionEffect::ScheduleReconnect {
        generation,
        delay: Duration::from_millis(50)
    }));
}
