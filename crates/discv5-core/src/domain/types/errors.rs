//! Domain Errors for the discovery core

use thiserror::Error;

/// Errors constructing a [`NodeId`](super::NodeId).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeIdError {
    /// Input was not exactly 32 bytes
    #[error("NodeId must be {expected} bytes in length, got {actual}")]
    InvalidLength {
        /// Required length in bytes
        expected: usize,
        /// Supplied length in bytes
        actual: usize,
    },
}

/// Errors raised by the Kademlia routing table and distance functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KademliaError {
    /// Local identifier was empty at construction
    #[error("selfId cannot be empty")]
    EmptySelfId,
    /// Bucket capacity was zero at construction
    #[error("k must be positive")]
    InvalidBucketSize,
    /// Distance computed between byte arrays of different lengths
    #[error("arrays are of different lengths ({left} != {right})")]
    LengthMismatch {
        /// Length of the first operand
        left: usize,
        /// Length of the second operand
        right: usize,
    },
    /// Value's distance key equals the local identifier
    #[error("cannot store the local node in its own routing table")]
    SelfEntry,
}

/// Errors from key agreement, signing and authenticated encryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Public key bytes are not a valid curve point
    #[error("Invalid public key")]
    InvalidPublicKey,
    /// Secret key bytes are out of range
    #[error("Invalid private key")]
    InvalidPrivateKey,
    /// Signature bytes are malformed
    #[error("Invalid signature")]
    InvalidSignature,
    /// Ciphertext cannot even hold the authentication tag
    #[error("Ciphertext too short: {actual} bytes, need at least {min}")]
    CiphertextTooShort {
        /// Minimum length (the MAC length)
        min: usize,
        /// Supplied length
        actual: usize,
    },
    /// AEAD encryption failed
    #[error("Encryption failed")]
    EncryptionFailed,
    /// AEAD tag verification failed
    #[error("Decryption failed")]
    DecryptionFailed,
    /// Auth header names a scheme other than the one supported
    #[error("Unsupported auth scheme: {0}")]
    UnsupportedAuthScheme(String),
    /// HKDF rejected the requested output length
    #[error("Key derivation failed")]
    KeyDerivation,
    /// Auth response could not be encoded or decoded
    #[error("Auth response encoding: {0}")]
    Encoding(String),
}

/// Errors building or checking a node record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Record signature does not match its contents
    #[error("Invalid record signature")]
    InvalidSignature,
    /// Sequence number cannot be incremented any further
    #[error("Record sequence number exhausted at {0}")]
    SeqExhausted(u64),
    /// Signing the updated record failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
