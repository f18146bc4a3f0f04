//! Per-peer session and request bookkeeping.

use std::net::SocketAddr;

use crate::domain::{AuthTag, IdNonce, NodeId, NodeRecord, SessionKeys, Timestamp};

/// Sessions are keyed by remote id and address.
pub(crate) type PeerKey = (NodeId, SocketAddr);

/// Handshake progress for one peer.
#[derive(Debug)]
pub(crate) enum SessionState {
    /// Initiator sent a Random packet and awaits a WHOAREYOU.
    RandomSent,
    /// Responder issued a challenge.
    WhoAreYouSent {
        id_nonce: IdNonce,
        auth_tag: AuthTag,
        known_record: Option<NodeRecord>,
        /// Keys of the session being re-keyed; still used until the new handshake completes
        prior_keys: Option<SessionKeys>,
        /// Challenges older than the request timeout are stale
        issued_at: Timestamp,
    },
    /// Initiator sent the AuthMessage; no inbound packet has confirmed the keys yet.
    HandshakeSent { keys: SessionKeys },
    Established { keys: SessionKeys },
}

impl SessionState {
    /// Keys usable for traffic in this state.
    pub(crate) fn keys(&self) -> Option<&SessionKeys> {
        match self {
            Self::RandomSent => None,
            Self::WhoAreYouSent { prior_keys, .. } => prior_keys.as_ref(),
            Self::HandshakeSent { keys } | Self::Established { keys } => Some(keys),
        }
    }

    pub(crate) fn status(&self) -> SessionStatus {
        match self {
            Self::RandomSent => SessionStatus::RandomSent,
            Self::WhoAreYouSent { .. } => SessionStatus::WhoAreYouSent,
            Self::HandshakeSent { .. } => SessionStatus::HandshakeSent,
            Self::Established { .. } => SessionStatus::Established,
        }
    }
}

/// Public view of a session's handshake state (no key material).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Random packet sent, waiting for a challenge
    RandomSent,
    /// Challenge sent, waiting for the AuthMessage
    WhoAreYouSent,
    /// AuthMessage sent, waiting for the first authenticated reply
    HandshakeSent,
    /// Keys confirmed
    Established,
}

#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) state: SessionState,
    pub(crate) remote_record: Option<NodeRecord>,
    pub(crate) last_seen: Timestamp,
}

/// An outbound request waiting for an authenticated reply.
#[derive(Debug, Clone)]
pub(crate) struct PendingRequest {
    pub(crate) node_id: NodeId,
    pub(crate) addr: SocketAddr,
    pub(crate) auth_tag: AuthTag,
    /// Plaintext, re-encrypted if a handshake is needed first
    pub(crate) payload: Vec<u8>,
    pub(crate) remote_record: NodeRecord,
    pub(crate) created_at: Timestamp,
}

impl PendingRequest {
    pub(crate) fn peer_key(&self) -> PeerKey {
        (self.node_id, self.addr)
    }
}
