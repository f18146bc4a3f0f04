//! Tests for port adapters over shared handles

use super::*;
use crate::domain::{create_random_packet, NodeId};
use crate::test_utils::MemoryTransport;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use std::sync::Arc;

#[test]
fn test_arc_transport_forwards_to_inner() {
    let mut rng = StdRng::seed_from_u64(3);
    let transport = Arc::new(MemoryTransport::new());
    let shared: Arc<dyn Transport> = transport.clone();
    let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
    let packet = create_random_packet(&mut rng, *NodeId::zero().as_bytes());

    shared.send(addr, packet.clone()).unwrap();

    assert_eq!(transport.take_sent(), vec![(addr, packet)]);
    assert!(transport.take_sent().is_empty());
}

#[test]
fn test_closed_transport_reports_error() {
    let mut rng = StdRng::seed_from_u64(4);
    let transport = MemoryTransport::new();
    transport.close();
    let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();

    let result = transport.send(addr, create_random_packet(&mut rng, [0u8; 32]));

    assert_eq!(result, Err(TransportError::Closed));
    assert_eq!(transport.sent_count(), 0);
}

#[test]
fn test_transport_error_display() {
    let err = TransportError::PacketTooLarge {
        size: 1300,
        max: 1280,
    };
    assert_eq!(err.to_string(), "packet of 1300 bytes exceeds maximum of 1280");
}
