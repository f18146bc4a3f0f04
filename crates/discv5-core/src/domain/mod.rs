//! Domain Layer - Pure protocol logic with no I/O
//!
//! This module contains:
//! - Node identifiers, timestamps and fixed-length protocol values
//! - Node records and secp256k1 keypairs
//! - Generic Kademlia routing table with XOR distance
//! - Packet variants and their constructors
//! - Session crypto (key agreement, HKDF, nonce signatures, AES-GCM)

pub mod crypto;
pub mod enr;
pub mod kademlia;
pub mod packet;
/// Core domain types (entities, values, errors)
pub mod types;

pub use crypto::*;
pub use enr::*;
pub use kademlia::*;
pub use packet::*;
pub use types::*;
