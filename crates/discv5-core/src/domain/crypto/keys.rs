//! Session key derivation.

use std::fmt;

use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::domain::{CryptoError, IdNonce, Keypair, NodeId, NodeRecord, PublicKey};

/// HKDF info prefix.
pub const KEY_AGREEMENT_STRING: &str = "discovery v5 key agreement";

/// Length of each derived key.
pub const KEY_LENGTH: usize = 16;

/// The three symmetric keys of one session, from the holder's point of view.
///
/// Zeroized on drop; `Debug` never prints key material.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    /// Encrypts outbound messages
    pub encryption_key: [u8; KEY_LENGTH],
    /// Decrypts inbound messages
    pub decryption_key: [u8; KEY_LENGTH],
    /// Encrypts / decrypts the auth response of the handshake
    pub auth_response_key: [u8; KEY_LENGTH],
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKeys(<redacted>)")
    }
}

/// Initiator side: fresh ephemeral key, ECDH with the remote identity key.
///
/// Returns the session keys and the ephemeral public key (compressed) the
/// remote needs to derive the same secret.
pub fn generate_session_keys<R: RngCore + CryptoRng>(
    rng: &mut R,
    local_id: &NodeId,
    remote_record: &NodeRecord,
    id_nonce: &IdNonce,
) -> Result<(SessionKeys, Vec<u8>), CryptoError> {
    let ephemeral = Keypair::generate(rng);
    let secret = Zeroizing::new(ephemeral.derive_secret(remote_record.public_key()));
    let keys = derive_key(secret.as_ref(), local_id, &remote_record.node_id(), id_nonce)?;
    Ok((keys, ephemeral.public_key().to_bytes().to_vec()))
}

/// HKDF-SHA256: extract with `id_nonce` as salt, expand 48 bytes with info
/// `KEY_AGREEMENT_STRING ‖ first_id ‖ second_id`.
///
/// The output is directional: swapping the ids yields unrelated keys.
pub fn derive_key(
    secret: &[u8],
    first_id: &NodeId,
    second_id: &NodeId,
    id_nonce: &IdNonce,
) -> Result<SessionKeys, CryptoError> {
    let mut info = Vec::with_capacity(KEY_AGREEMENT_STRING.len() + 64);
    info.extend_from_slice(KEY_AGREEMENT_STRING.as_bytes());
    info.extend_from_slice(first_id.as_bytes());
    info.extend_from_slice(second_id.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(&id_nonce[..]), secret);
    let mut okm = Zeroizing::new([0u8; 3 * KEY_LENGTH]);
    hk.expand(&info, okm.as_mut())
        .map_err(|_| CryptoError::KeyDerivation)?;

    let mut keys = SessionKeys {
        encryption_key: [0u8; KEY_LENGTH],
        decryption_key: [0u8; KEY_LENGTH],
        auth_response_key: [0u8; KEY_LENGTH],
    };
    keys.encryption_key.copy_from_slice(&okm[..KEY_LENGTH]);
    keys.decryption_key.copy_from_slice(&okm[KEY_LENGTH..2 * KEY_LENGTH]);
    keys.auth_response_key.copy_from_slice(&okm[2 * KEY_LENGTH..]);
    Ok(keys)
}

/// Responder side of [`generate_session_keys`].
///
/// Derives with the ids in initiator order and swaps the message keys, so
/// the responder decrypts with the initiator's encryption key and vice versa.
pub fn derive_keys_from_pubkey(
    local_keypair: &Keypair,
    local_id: &NodeId,
    remote_id: &NodeId,
    id_nonce: &IdNonce,
    remote_ephemeral_pk: &[u8],
) -> Result<SessionKeys, CryptoError> {
    let ephemeral = PublicKey::from_slice(remote_ephemeral_pk)?;
    let secret = Zeroizing::new(local_keypair.derive_secret(&ephemeral));
    let initiator_view = derive_key(secret.as_ref(), remote_id, local_id, id_nonce)?;

    Ok(SessionKeys {
        encryption_key: initiator_view.decryption_key,
        decryption_key: initiator_view.encryption_key,
        auth_response_key: initiator_view.auth_response_key,
    })
}
