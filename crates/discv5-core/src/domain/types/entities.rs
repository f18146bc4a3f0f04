//! Core Domain Entities for the discovery protocol
//!
//! Identifiers and fixed-length protocol values shared by the packet codec,
//! the session crypto and the session service.

use std::fmt;
use std::hash::Hash;

use crate::domain::types::NodeIdError;

/// Length of a [`NodeId`] in bytes.
pub const NODE_ID_LENGTH: usize = 32;

/// Length of an authentication tag (AES-GCM nonce) in bytes.
pub const AUTH_TAG_LENGTH: usize = 12;

/// Length of a WHOAREYOU id nonce in bytes.
pub const ID_NONCE_LENGTH: usize = 32;

/// Length of the per-packet tag in bytes.
pub const TAG_LENGTH: usize = 32;

/// Length of the WHOAREYOU magic in bytes.
pub const MAGIC_LENGTH: usize = 32;

/// Nonce used for message encryption and reply correlation.
pub type AuthTag = [u8; AUTH_TAG_LENGTH];

/// Single-use challenge nonce bound into key derivation and the nonce signature.
pub type IdNonce = [u8; ID_NONCE_LENGTH];

/// Obfuscated source identifier carried by every packet except WHOAREYOU.
pub type Tag = [u8; TAG_LENGTH];

/// Per-node value identifying WHOAREYOU packets addressed to that node.
pub type Magic = [u8; MAGIC_LENGTH];

/// 256-bit node identifier derived from a public key.
///
/// # Security
///
/// Comparison is constant-time. Standard `PartialEq` for byte arrays
/// short-circuits on the first difference, which leaks where two ids diverge.
// The manual PartialEq compares the same bytes that Hash consumes.
#[allow(clippy::derived_hash_with_manual_eq)]
#[derive(Clone, Copy, Hash)]
pub struct NodeId(pub [u8; NODE_ID_LENGTH]);

impl PartialEq for NodeId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        let mut result = 0u8;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            result |= a ^ b;
        }
        result == 0
    }
}

impl Eq for NodeId {}

impl NodeId {
    /// Create a NodeId from a raw 32-byte array.
    pub fn new(bytes: [u8; NODE_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; NODE_ID_LENGTH] {
        &self.0
    }

    /// Create a zero-initialized NodeId.
    pub fn zero() -> Self {
        Self([0u8; NODE_ID_LENGTH])
    }
}

impl TryFrom<&[u8]> for NodeId {
    type Error = NodeIdError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let raw: [u8; NODE_ID_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| NodeIdError::InvalidLength {
                    expected: NODE_ID_LENGTH,
                    actual: bytes.len(),
                })?;
        Ok(Self(raw))
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    /// Abbreviated hex form (`0x1a2b..9f0e`), enough to tell peers apart in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:02x}{:02x}..{:02x}{:02x}",
            self.0[0], self.0[1], self.0[30], self.0[31]
        )
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId(0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// Unix timestamp in seconds
///
/// # Security
///
/// Timestamps are clamped to a reasonable maximum so that a hostile value
/// cannot overflow expiry arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    /// Create a new timestamp, clamping to MAX_REASONABLE.
    pub fn new(secs: u64) -> Self {
        Self(secs.min(Self::MAX_REASONABLE))
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Add seconds to timestamp (saturating at MAX_REASONABLE).
    pub fn add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs).min(Self::MAX_REASONABLE))
    }

    /// Seconds elapsed since `earlier` (zero if `earlier` is in the future).
    pub fn secs_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}
