//! Events emitted by the session service.

use std::net::SocketAddr;

use crate::domain::{AuthTag, NodeId, NodeRecord, Packet};

/// Notification delivered on the service's event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A peer sent a Random packet, or a message while we hold no keys for
    /// it; answer with `send_who_are_you`.
    WhoAreYouRequest {
        /// Sender id recovered from the packet tag
        node_id: NodeId,
        /// Sender address
        addr: SocketAddr,
        /// Auth tag to echo as the WHOAREYOU token
        auth_tag: AuthTag,
    },
    /// A session was established; carries the peer's verified record.
    Established(NodeRecord),
    /// Decrypted application payload.
    Message {
        /// Sender id
        node_id: NodeId,
        /// Sender address
        addr: SocketAddr,
        /// Plaintext
        payload: Vec<u8>,
    },
    /// Raw inbound packet, emitted before any processing.
    Packet {
        /// Sender address
        addr: SocketAddr,
        /// The packet as received
        packet: Packet,
    },
    /// A request saw no authenticated reply within the request timeout.
    RequestTimeout {
        /// Peer the request was sent to
        node_id: NodeId,
        /// Peer address
        addr: SocketAddr,
        /// Auth tag the request is tracked under
        auth_tag: AuthTag,
    },
}
