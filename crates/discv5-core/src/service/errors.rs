//! Errors returned by the session service's outbound operations.

use std::net::SocketAddr;

use thiserror::Error;

use super::config::ConfigError;
use crate::domain::{CryptoError, NodeId, RecordError};
use crate::ports::TransportError;

/// Errors from `SessionService` operations called by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Transport refused the packet
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Key agreement, signing or encryption failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// No session with keys exists for this peer
    #[error("no session with {node_id} at {addr}")]
    NoSession {
        /// Peer id
        node_id: NodeId,
        /// Peer address
        addr: SocketAddr,
    },
    /// Record does not advertise a UDP endpoint
    #[error("record of {node_id} has no UDP endpoint")]
    MissingEndpoint {
        /// Peer id
        node_id: NodeId,
    },
    /// Local record was not signed by the local keypair
    #[error("local record does not belong to the local keypair")]
    KeypairMismatch,
    /// Local record signature is invalid
    #[error(transparent)]
    Record(#[from] RecordError),
}
