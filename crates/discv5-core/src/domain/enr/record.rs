//! Signed node record.

use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use super::keypair::{Keypair, PublicKey};
use crate::domain::{CryptoError, NodeId, RecordError};

/// Self-signed node record.
///
/// Carries exactly what the session layer reads from a peer: identity key,
/// sequence number and UDP endpoint. Field layout on the wire belongs to the
/// record codec; inside this crate records travel as `bincode` only when
/// embedded in an auth response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Sequence number (increment on ANY change)
    seq: u64,
    /// Identity key, also used for key agreement
    public_key: PublicKey,
    /// Advertised IP address
    ip: Option<IpAddr>,
    /// Advertised UDP port
    udp_port: Option<u16>,
    /// Signature over `keccak256(signing_payload)`
    signature: Vec<u8>,
}

impl NodeRecord {
    /// Build and sign a record.
    pub fn signed(
        keypair: &Keypair,
        seq: u64,
        udp_socket: Option<SocketAddr>,
    ) -> Result<Self, CryptoError> {
        let mut record = Self {
            seq,
            public_key: keypair.public_key(),
            ip: udp_socket.map(|s| s.ip()),
            udp_port: udp_socket.map(|s| s.port()),
            signature: Vec::new(),
        };
        record.signature = keypair.sign_digest(&record.signing_digest())?;
        Ok(record)
    }

    /// Re-sign with a new UDP endpoint and the next sequence number.
    ///
    /// # Errors
    /// `SeqExhausted` when `seq` is already `u64::MAX`.
    pub fn with_udp_socket(
        &self,
        keypair: &Keypair,
        udp_socket: SocketAddr,
    ) -> Result<Self, RecordError> {
        let seq = self
            .seq
            .checked_add(1)
            .ok_or(RecordError::SeqExhausted(self.seq))?;
        Ok(Self::signed(keypair, seq, Some(udp_socket))?)
    }

    /// Node id derived from the public key.
    pub fn node_id(&self) -> NodeId {
        self.public_key.node_id()
    }

    /// Sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Identity / key-agreement public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Advertised IP address.
    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    /// Advertised UDP port.
    pub fn udp_port(&self) -> Option<u16> {
        self.udp_port
    }

    /// UDP endpoint, if both address and port are advertised.
    pub fn udp_socket(&self) -> Option<SocketAddr> {
        Some(SocketAddr::new(self.ip?, self.udp_port?))
    }

    /// Raw signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Get the signing payload (everything except signature)
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(64);

        payload.extend_from_slice(&self.seq.to_be_bytes());
        payload.extend_from_slice(&self.public_key.to_bytes());

        match self.ip {
            Some(IpAddr::V4(ip)) => {
                payload.push(4);
                payload.extend_from_slice(&ip.octets());
            }
            Some(IpAddr::V6(ip)) => {
                payload.push(16);
                payload.extend_from_slice(&ip.octets());
            }
            None => payload.push(0),
        }
        payload.extend_from_slice(&self.udp_port.unwrap_or(0).to_be_bytes());

        payload
    }

    fn signing_digest(&self) -> [u8; 32] {
        Keccak256::digest(self.signing_payload()).into()
    }

    /// Check the record signature against its own public key.
    pub fn verify(&self) -> Result<(), RecordError> {
        if self
            .public_key
            .verify_digest(&self.signing_digest(), &self.signature)
        {
            Ok(())
        } else {
            Err(RecordError::InvalidSignature)
        }
    }
}
