//! Tests for the session service handshake and housekeeping

use super::*;
use crate::domain::{
    create_magic, create_tag, create_who_are_you_packet, Keypair, NodeId, NodeRecord, Packet,
    PacketKind,
};
use crate::ports::TransportError;
use crate::test_utils::{ControllableTimeSource, MemoryTransport};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

// =============================================================================
// HARNESS
// =============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct TestNode {
    service: SessionService<Arc<MemoryTransport>, StdRng>,
    events: UnboundedReceiver<SessionEvent>,
    transport: Arc<MemoryTransport>,
    keypair: Keypair,
    record: NodeRecord,
    addr: SocketAddr,
}

impl TestNode {
    fn id(&self) -> NodeId {
        self.record.node_id()
    }

    /// Drained events, minus the raw `Packet` notifications.
    fn events(&mut self) -> Vec<SessionEvent> {
        self.all_events()
            .into_iter()
            .filter(|e| !matches!(e, SessionEvent::Packet { .. }))
            .collect()
    }

    fn all_events(&mut self) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

fn node_with(seed: u64, port: u16, config: SessionConfig, clock: &ControllableTimeSource) -> TestNode {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(seed);
    let keypair = Keypair::generate(&mut rng);
    let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
    let record = NodeRecord::signed(&keypair, 1, Some(addr)).unwrap();
    let transport = Arc::new(MemoryTransport::new());
    let (service, events) = SessionService::new(
        record.clone(),
        keypair.clone(),
        transport.clone(),
        Box::new(clock.clone()),
        rng,
        config,
    )
    .unwrap();

    TestNode {
        service,
        events,
        transport,
        keypair,
        record,
        addr,
    }
}

fn node(seed: u64, port: u16, clock: &ControllableTimeSource) -> TestNode {
    node_with(seed, port, SessionConfig::for_testing(), clock)
}

/// Hand everything `from` has sent to `to`. Returns the kinds delivered.
fn deliver(from: &TestNode, to: &mut TestNode) -> Vec<PacketKind> {
    from.transport
        .take_sent()
        .into_iter()
        .map(|(dest, packet)| {
            assert_eq!(dest, to.addr);
            let kind = packet.kind();
            to.service.handle_packet(from.addr, packet);
            kind
        })
        .collect()
}

/// Run the full handshake a -> b carrying `ping`, and b's `pong` reply.
fn establish(a: &mut TestNode, b: &mut TestNode) {
    a.service.send_request(&b.record, b"ping".to_vec()).unwrap();
    deliver(a, b);
    deliver(b, a);
    deliver(a, b);
    b.service.send_response(a.id(), a.addr, b"pong").unwrap();
    deliver(b, a);
    a.events();
    b.events();
}

// =============================================================================
// HANDSHAKE
// =============================================================================

#[test]
fn test_cold_handshake_establishes_both_sides() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut b = node(2, 9002, &clock);

    let auth_tag = a.service.send_request(&b.record, b"ping".to_vec()).unwrap();
    assert_eq!(
        a.service.session_state(b.id(), b.addr),
        Some(SessionStatus::RandomSent)
    );
    assert_eq!(a.service.pending_request_count(), 1);

    assert_eq!(deliver(&a, &mut b), vec![PacketKind::Random]);
    assert_eq!(
        b.events(),
        vec![SessionEvent::WhoAreYouRequest {
            node_id: a.id(),
            addr: a.addr,
            auth_tag,
        }]
    );
    assert_eq!(
        b.service.session_state(a.id(), a.addr),
        Some(SessionStatus::WhoAreYouSent)
    );

    assert_eq!(deliver(&b, &mut a), vec![PacketKind::WhoAreYou]);
    assert_eq!(a.events(), vec![SessionEvent::Established(b.record.clone())]);
    assert_eq!(
        a.service.session_state(b.id(), b.addr),
        Some(SessionStatus::HandshakeSent)
    );

    assert_eq!(deliver(&a, &mut b), vec![PacketKind::AuthMessage]);
    assert_eq!(
        b.events(),
        vec![
            SessionEvent::Established(a.record.clone()),
            SessionEvent::Message {
                node_id: a.id(),
                addr: a.addr,
                payload: b"ping".to_vec(),
            },
        ]
    );
    assert_eq!(
        b.service.session_state(a.id(), a.addr),
        Some(SessionStatus::Established)
    );

    b.service.send_response(a.id(), a.addr, b"pong").unwrap();
    assert_eq!(deliver(&b, &mut a), vec![PacketKind::Message]);
    assert_eq!(
        a.events(),
        vec![SessionEvent::Message {
            node_id: b.id(),
            addr: b.addr,
            payload: b"pong".to_vec(),
        }]
    );
    assert_eq!(
        a.service.session_state(b.id(), b.addr),
        Some(SessionStatus::Established)
    );
    assert_eq!(a.service.pending_request_count(), 0);
}

#[test]
fn test_every_inbound_packet_is_reported_raw_first() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut b = node(2, 9002, &clock);

    a.service.send_request(&b.record, b"ping".to_vec()).unwrap();
    let sent = a.transport.take_sent();
    let packet = sent[0].1.clone();
    b.service.handle_packet(a.addr, packet.clone());

    let events = b.all_events();
    assert_eq!(
        events[0],
        SessionEvent::Packet {
            addr: a.addr,
            packet
        }
    );
    assert!(matches!(events[1], SessionEvent::WhoAreYouRequest { .. }));
}

#[test]
fn test_established_session_carries_further_requests_directly() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut b = node(2, 9002, &clock);
    establish(&mut a, &mut b);

    a.service.send_request(&b.record, b"again".to_vec()).unwrap();
    assert_eq!(deliver(&a, &mut b), vec![PacketKind::Message]);
    assert_eq!(
        b.events(),
        vec![SessionEvent::Message {
            node_id: a.id(),
            addr: a.addr,
            payload: b"again".to_vec(),
        }]
    );
    assert_eq!(a.service.pending_request_count(), 1);
}

#[test]
fn test_host_driven_challenge_uses_known_record() {
    let clock = ControllableTimeSource::new(1000);
    let manual = SessionConfig {
        auto_challenge: false,
        ..SessionConfig::for_testing()
    };
    let mut a = node(1, 9001, &clock);
    let mut b = node_with(2, 9002, manual, &clock);

    let auth_tag = a.service.send_request(&b.record, b"ping".to_vec()).unwrap();
    deliver(&a, &mut b);
    assert_eq!(b.events().len(), 1);
    assert_eq!(b.transport.sent_count(), 0);
    assert_eq!(b.service.session_state(a.id(), a.addr), None);

    // b already holds a's record at seq 1, so a does not attach it.
    b.service
        .send_who_are_you(a.addr, a.id(), 1, Some(a.record.clone()), auth_tag)
        .unwrap();
    deliver(&b, &mut a);
    deliver(&a, &mut b);

    assert_eq!(
        b.events(),
        vec![
            SessionEvent::Established(a.record.clone()),
            SessionEvent::Message {
                node_id: a.id(),
                addr: a.addr,
                payload: b"ping".to_vec(),
            },
        ]
    );
}

#[test]
fn test_handshake_without_any_record_fails() {
    let clock = ControllableTimeSource::new(1000);
    let manual = SessionConfig {
        auto_challenge: false,
        ..SessionConfig::for_testing()
    };
    let mut a = node(1, 9001, &clock);
    let mut b = node_with(2, 9002, manual, &clock);

    let auth_tag = a.service.send_request(&b.record, b"ping".to_vec()).unwrap();
    deliver(&a, &mut b);
    b.events();

    // Claims to know seq 1 but holds no record: a attaches none, b cannot verify.
    b.service
        .send_who_are_you(a.addr, a.id(), 1, None, auth_tag)
        .unwrap();
    deliver(&b, &mut a);
    deliver(&a, &mut b);

    assert!(b.events().is_empty());
    assert_eq!(
        b.service.session_state(a.id(), a.addr),
        Some(SessionStatus::WhoAreYouSent)
    );
}

// =============================================================================
// DROPPED PACKETS
// =============================================================================

#[test]
fn test_unsolicited_who_are_you_is_dropped() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let b = node(2, 9002, &clock);
    let mut rng = StdRng::seed_from_u64(99);

    let packet = create_who_are_you_packet(&mut rng, &a.id(), [0u8; 12], 0);
    a.service.handle_packet(b.addr, packet);

    let events = a.all_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], SessionEvent::Packet { .. }));
    assert_eq!(a.transport.sent_count(), 0);
    assert_eq!(a.service.session_count(), 0);
}

#[test]
fn test_who_are_you_with_foreign_magic_is_dropped() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let b = node(2, 9002, &clock);

    let auth_tag = a.service.send_request(&b.record, b"ping".to_vec()).unwrap();
    a.transport.take_sent();

    a.service.handle_packet(
        b.addr,
        Packet::WhoAreYou {
            magic: create_magic(&b.id()),
            token: auth_tag,
            id_nonce: [1u8; 32],
            enr_seq: 0,
        },
    );

    assert!(a.events().is_empty());
    assert_eq!(a.transport.sent_count(), 0);
    assert_eq!(
        a.service.session_state(b.id(), b.addr),
        Some(SessionStatus::RandomSent)
    );
}

#[test]
fn test_replayed_auth_message_is_dropped() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut b = node(2, 9002, &clock);

    a.service.send_request(&b.record, b"ping".to_vec()).unwrap();
    deliver(&a, &mut b);
    deliver(&b, &mut a);
    let (_, auth_message) = a.transport.take_sent().remove(0);
    b.service.handle_packet(a.addr, auth_message.clone());
    b.events();

    b.service.handle_packet(a.addr, auth_message);

    assert!(b.events().is_empty());
    assert_eq!(b.transport.sent_count(), 0);
}

#[test]
fn test_undecryptable_message_leaves_established_session_alone() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut b = node(2, 9002, &clock);
    establish(&mut a, &mut b);

    // Anyone can compute the tag from the two public ids.
    let forged = Packet::Message {
        tag: create_tag(&a.id(), &b.id()),
        auth_tag: [9u8; 12],
        message: vec![0u8; 32],
    };
    b.service.handle_packet(a.addr, forged);

    assert!(b.events().is_empty());
    assert_eq!(b.transport.sent_count(), 0);
    assert_eq!(
        b.service.session_state(a.id(), a.addr),
        Some(SessionStatus::Established)
    );

    b.service.send_response(a.id(), a.addr, b"still").unwrap();
    assert_eq!(deliver(&b, &mut a), vec![PacketKind::Message]);
    assert_eq!(
        a.events(),
        vec![SessionEvent::Message {
            node_id: b.id(),
            addr: b.addr,
            payload: b"still".to_vec(),
        }]
    );
}

#[test]
fn test_message_without_session_is_challenged() {
    let clock = ControllableTimeSource::new(1000);
    let a = node(1, 9001, &clock);
    let mut b = node(2, 9002, &clock);

    b.service.handle_packet(
        a.addr,
        Packet::Message {
            tag: create_tag(&a.id(), &b.id()),
            auth_tag: [7u8; 12],
            message: vec![0u8; 32],
        },
    );

    assert_eq!(
        b.events(),
        vec![SessionEvent::WhoAreYouRequest {
            node_id: a.id(),
            addr: a.addr,
            auth_tag: [7u8; 12],
        }]
    );
    assert_eq!(b.transport.sent_count(), 1);
    assert_eq!(
        b.service.session_state(a.id(), a.addr),
        Some(SessionStatus::WhoAreYouSent)
    );
}

#[test]
fn test_outstanding_challenge_is_not_repeated() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut b = node(2, 9002, &clock);

    a.service.send_request(&b.record, b"ping".to_vec()).unwrap();
    deliver(&a, &mut b);
    b.transport.take_sent();
    b.events();

    clock.advance(1);
    a.service.send_request(&b.record, b"again".to_vec()).unwrap();
    deliver(&a, &mut b);

    assert!(b.events().is_empty());
    assert_eq!(b.transport.sent_count(), 0);
}

#[test]
fn test_lost_who_are_you_is_reissued_on_retry() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut b = node(2, 9002, &clock);

    a.service.send_request(&b.record, b"ping".to_vec()).unwrap();
    deliver(&a, &mut b);
    // The challenge never reaches a.
    assert_eq!(b.transport.take_sent().len(), 1);
    b.events();

    clock.advance(10);
    let retry = a.service.send_request(&b.record, b"retry".to_vec()).unwrap();
    assert_eq!(deliver(&a, &mut b), vec![PacketKind::Random]);
    assert_eq!(
        b.events(),
        vec![SessionEvent::WhoAreYouRequest {
            node_id: a.id(),
            addr: a.addr,
            auth_tag: retry,
        }]
    );

    assert_eq!(deliver(&b, &mut a), vec![PacketKind::WhoAreYou]);
    assert_eq!(deliver(&a, &mut b), vec![PacketKind::AuthMessage]);
    assert_eq!(
        b.events(),
        vec![
            SessionEvent::Established(a.record.clone()),
            SessionEvent::Message {
                node_id: a.id(),
                addr: a.addr,
                payload: b"retry".to_vec(),
            },
        ]
    );
}

// =============================================================================
// HOUSEKEEPING
// =============================================================================

#[test]
fn test_expired_request_reports_timeout_and_drops_half_open_session() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let b = node(2, 9002, &clock);

    let auth_tag = a.service.send_request(&b.record, b"ping".to_vec()).unwrap();
    clock.advance(1);
    assert_eq!(a.service.expire_requests(), 0);

    clock.advance(1);
    assert_eq!(a.service.expire_requests(), 1);
    assert_eq!(
        a.events(),
        vec![SessionEvent::RequestTimeout {
            node_id: b.id(),
            addr: b.addr,
            auth_tag,
        }]
    );
    assert_eq!(a.service.pending_request_count(), 0);
    assert_eq!(a.service.session_state(b.id(), b.addr), None);
}

#[test]
fn test_unanswered_challenge_is_withdrawn() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut b = node(2, 9002, &clock);

    a.service.send_request(&b.record, b"ping".to_vec()).unwrap();
    deliver(&a, &mut b);
    b.transport.take_sent();

    clock.advance(1);
    b.service.expire_requests();
    assert_eq!(
        b.service.session_state(a.id(), a.addr),
        Some(SessionStatus::WhoAreYouSent)
    );

    clock.advance(1);
    assert_eq!(b.service.expire_requests(), 0);
    assert_eq!(b.service.session_state(a.id(), a.addr), None);
}

#[test]
fn test_unanswered_rekey_falls_back_to_previous_keys() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut b = node(2, 9002, &clock);
    establish(&mut a, &mut b);

    // a forgets the session and starts over; b's challenge is lost.
    a.service.remove_session(b.id(), b.addr);
    a.service.send_request(&b.record, b"hello".to_vec()).unwrap();
    deliver(&a, &mut b);
    b.transport.take_sent();
    assert_eq!(
        b.service.session_state(a.id(), a.addr),
        Some(SessionStatus::WhoAreYouSent)
    );

    clock.advance(2);
    b.service.expire_requests();
    assert_eq!(
        b.service.session_state(a.id(), a.addr),
        Some(SessionStatus::Established)
    );
    assert!(b.service.send_response(a.id(), a.addr, b"ok").is_ok());
}

#[test]
fn test_idle_sessions_expire() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut b = node(2, 9002, &clock);
    establish(&mut a, &mut b);

    clock.advance(59);
    assert_eq!(a.service.expire_sessions(), 0);
    clock.advance(1);
    assert_eq!(a.service.expire_sessions(), 1);
    assert_eq!(a.service.session_count(), 0);
}

#[test]
fn test_remove_session_and_stop() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut b = node(2, 9002, &clock);
    establish(&mut a, &mut b);

    assert!(b.service.remove_session(a.id(), a.addr));
    assert!(!b.service.remove_session(a.id(), a.addr));
    assert_eq!(
        b.service.send_response(a.id(), a.addr, b"late"),
        Err(SessionError::NoSession {
            node_id: a.id(),
            addr: a.addr
        })
    );

    a.service.send_request(&b.record, b"x".to_vec()).unwrap();
    a.service.stop();
    assert_eq!(a.service.session_count(), 0);
    assert_eq!(a.service.pending_request_count(), 0);
}

// =============================================================================
// ERRORS
// =============================================================================

#[test]
fn test_send_request_requires_endpoint() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut rng = StdRng::seed_from_u64(5);
    let record = NodeRecord::signed(&Keypair::generate(&mut rng), 1, None).unwrap();

    assert_eq!(
        a.service.send_request(&record, vec![]),
        Err(SessionError::MissingEndpoint {
            node_id: record.node_id()
        })
    );
}

#[test]
fn test_transport_failure_registers_nothing() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let b = node(2, 9002, &clock);
    a.transport.close();

    assert_eq!(
        a.service.send_request(&b.record, b"ping".to_vec()),
        Err(SessionError::Transport(TransportError::Closed))
    );
    assert_eq!(a.service.pending_request_count(), 0);
    assert_eq!(a.service.session_count(), 0);
}

#[test]
fn test_new_rejects_foreign_record_and_bad_config() {
    let mut rng = StdRng::seed_from_u64(8);
    let keypair = Keypair::generate(&mut rng);
    let other = Keypair::generate(&mut rng);
    let foreign = NodeRecord::signed(&other, 1, None).unwrap();
    let own = NodeRecord::signed(&keypair, 1, None).unwrap();
    let clock = ControllableTimeSource::new(0);

    let result = SessionService::new(
        foreign,
        keypair.clone(),
        MemoryTransport::new(),
        Box::new(clock.clone()),
        StdRng::seed_from_u64(1),
        SessionConfig::default(),
    );
    assert!(matches!(result, Err(SessionError::KeypairMismatch)));

    let result = SessionService::new(
        own,
        keypair,
        MemoryTransport::new(),
        Box::new(clock),
        StdRng::seed_from_u64(1),
        SessionConfig {
            request_timeout_secs: 0,
            ..SessionConfig::default()
        },
    );
    assert!(matches!(
        result,
        Err(SessionError::Config(ConfigError::Invalid(_)))
    ));
}

#[test]
fn test_update_local_record() {
    let clock = ControllableTimeSource::new(1000);
    let mut a = node(1, 9001, &clock);
    let mut rng = StdRng::seed_from_u64(3);
    let stranger = NodeRecord::signed(&Keypair::generate(&mut rng), 9, None).unwrap();

    assert_eq!(
        a.service.update_local_record(stranger),
        Err(SessionError::KeypairMismatch)
    );
    assert_eq!(a.service.local_record().seq(), 1);

    let moved = a
        .record
        .with_udp_socket(&a.keypair, "10.0.0.1:9001".parse().unwrap())
        .unwrap();
    a.service.update_local_record(moved.clone()).unwrap();
    assert_eq!(a.service.local_record(), &moved);
    assert_eq!(a.service.local_record().seq(), 2);
}
