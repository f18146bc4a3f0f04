//! # Node Records
//!
//! Self-signed peer records in the spirit of EIP-778. The session core only
//! reads them: node id, sequence number, public key and UDP endpoint. A
//! remote record is never mutated after it has been received.
//!
//! Identity scheme "v4": secp256k1 keys, `NodeId = keccak256(uncompressed
//! public key without prefix)`.

mod keypair;
mod record;

pub use keypair::{Keypair, PublicKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
pub use record::NodeRecord;
