//! secp256k1 key material for node identity and key agreement.

use std::fmt;

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::domain::{CryptoError, NodeId};

/// Compressed SEC1 public key length.
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// ECDSA signature length (r || s).
pub const SIGNATURE_LENGTH: usize = 64;

/// Compressed secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(k256::PublicKey);

impl PublicKey {
    /// Parse a SEC1-encoded public key (compressed or uncompressed).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        k256::PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Compressed encoding (33 bytes, starting with 0x02 or 0x03).
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        let encoded = self.0.to_encoded_point(true);
        let mut bytes = [0u8; PUBLIC_KEY_LENGTH];
        bytes.copy_from_slice(encoded.as_bytes());
        bytes
    }

    /// Derive the v4 node id: keccak256 over the 64-byte uncompressed point.
    pub fn node_id(&self) -> NodeId {
        let uncompressed = self.0.to_encoded_point(false);
        let digest = Keccak256::digest(&uncompressed.as_bytes()[1..]);
        NodeId::new(digest.into())
    }

    /// Verify a signature over a 32-byte digest.
    pub fn verify_digest(&self, digest: &[u8; 32], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        VerifyingKey::from(&self.0)
            .verify_prehash(digest, &signature)
            .is_ok()
    }

    pub(crate) fn as_inner(&self) -> &k256::PublicKey {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(0x")?;
        for byte in self.to_bytes() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Self::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

/// secp256k1 signing key.
///
/// The inner `SigningKey` zeroizes its scalar on drop.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a random keypair from the supplied CSPRNG.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            signing_key: SigningKey::random(rng),
        }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get the public half.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(k256::PublicKey::from(self.signing_key.verifying_key()))
    }

    /// Node id of the public half.
    pub fn node_id(&self) -> NodeId {
        self.public_key().node_id()
    }

    /// Sign a 32-byte digest (RFC 6979, low-S).
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
        let signature: Signature = self
            .signing_key
            .sign_prehash(digest)
            .map_err(|_| CryptoError::InvalidSignature)?;
        Ok(signature.to_bytes().to_vec())
    }

    /// ECDH against `remote`; the secret is the compressed shared point (33 bytes).
    pub fn derive_secret(&self, remote: &PublicKey) -> [u8; PUBLIC_KEY_LENGTH] {
        let scalar = self.signing_key.as_nonzero_scalar();
        let shared = k256::AffinePoint::from(remote.as_inner().to_projective() * scalar.as_ref());
        let encoded = shared.to_encoded_point(true);
        let mut secret = [0u8; PUBLIC_KEY_LENGTH];
        secret.copy_from_slice(encoded.as_bytes());
        secret
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
