//! Id-nonce signatures.

use sha2::{Digest, Sha256};

use crate::domain::{CryptoError, IdNonce, Keypair, PublicKey};

/// Domain separation prefix of the signed id-nonce digest.
pub const NONCE_PREFIX: &str = "discovery-id-nonce";

/// `sha256(NONCE_PREFIX ‖ id_nonce ‖ ephemeral_pk)`.
pub fn generate_signing_nonce(id_nonce: &IdNonce, ephemeral_pk: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(NONCE_PREFIX.as_bytes());
    hasher.update(id_nonce);
    hasher.update(ephemeral_pk);
    hasher.finalize().into()
}

/// Prove possession of the identity key for this challenge.
pub fn sign_nonce(
    keypair: &Keypair,
    id_nonce: &IdNonce,
    ephemeral_pk: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    keypair.sign_digest(&generate_signing_nonce(id_nonce, ephemeral_pk))
}

/// Check a signature produced by [`sign_nonce`].
pub fn verify_nonce(
    public_key: &PublicKey,
    id_nonce: &IdNonce,
    remote_ephemeral_pk: &[u8],
    signature: &[u8],
) -> bool {
    public_key.verify_digest(&generate_signing_nonce(id_nonce, remote_ephemeral_pk), signature)
}
