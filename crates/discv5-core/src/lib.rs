//! # Discovery v5 Session & Routing Core
//!
//! Encrypted session establishment between discovery peers (the WHOAREYOU
//! challenge/response handshake) and a Kademlia routing table keyed by XOR
//! distance.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** node ids and records, packets, session crypto, routing table
//! - **Ports Layer:** `Transport` and `TimeSource` traits the host implements
//! - **Service Layer:** `SessionService`, the per-peer handshake state machine
//! - **Adapters Layer:** system clock, TOML configuration loading
//!
//! Packet byte encoding and the UDP socket stay with the host: the service
//! consumes decoded [`Packet`]s through [`SessionService::handle_packet`] and
//! hands outgoing ones to its [`Transport`].
//!
//! ## Example
//!
//! ```rust
//! use discv5_core::{xor_dist, KademliaRoutingTable, Keypair, NodeRecord};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let local = Keypair::generate(&mut rng);
//! let mut table = KademliaRoutingTable::new(
//!     local.node_id().as_bytes().to_vec(),
//!     16,
//!     |record: &NodeRecord| record.node_id().as_bytes().to_vec(),
//! )
//! .unwrap();
//!
//! let peer = NodeRecord::signed(&Keypair::generate(&mut rng), 1, None).unwrap();
//! assert!(table.add(peer.clone()).unwrap().is_none());
//!
//! let d = xor_dist(local.node_id().as_bytes(), peer.node_id().as_bytes()).unwrap();
//! assert_eq!(table.peers_of_distance(d), vec![&peer]);
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Test utilities (FixedTimeSource, ControllableTimeSource, MemoryTransport)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// RE-EXPORTS
// =============================================================================

// Domain entities
pub use domain::{
    AuthTag, IdNonce, Keypair, Magic, NodeId, NodeRecord, PublicKey, Tag, Timestamp,
    AUTH_TAG_LENGTH, ID_NONCE_LENGTH, MAGIC_LENGTH, NODE_ID_LENGTH, TAG_LENGTH,
};

// Errors
pub use domain::{CryptoError, KademliaError, NodeIdError, RecordError};

// Routing table
pub use domain::{xor_dist, xor_dist_cmp, KBucket, KademliaRoutingTable};

// Packets
pub use domain::{AuthHeader, AuthResponse, Packet, PacketKind};

// Session keys
pub use domain::SessionKeys;

// Port traits
pub use ports::{TimeSource, Transport, TransportError};

// Service
pub use service::{
    ConfigError, SessionConfig, SessionError, SessionEvent, SessionService, SessionStatus,
};

// Adapters
pub use adapters::{load_config, SystemTimeSource};
