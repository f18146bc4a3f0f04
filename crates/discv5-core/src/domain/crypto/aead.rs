//! AES-128-GCM message and auth-response encryption.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Nonce};

use super::keys::KEY_LENGTH;
use crate::domain::{
    AuthHeader, AuthResponse, AuthTag, CryptoError, AUTH_RESPONSE_VERSION, AUTH_SCHEME_NAME,
    AUTH_TAG_LENGTH,
};

/// Length of the GCM authentication tag appended to every ciphertext.
pub const MAC_LENGTH: usize = 16;

/// Encrypt; returns `ciphertext ‖ tag`.
///
/// # Errors
///
/// Returns `CryptoError::EncryptionFailed` if encryption fails.
pub fn encrypt_message(
    key: &[u8; KEY_LENGTH],
    nonce: &AuthTag,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes128Gcm::new(key.into());
    cipher
        .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt `ciphertext ‖ tag`.
///
/// # Errors
///
/// `CiphertextTooShort` when `data` cannot hold the tag, `DecryptionFailed`
/// when the tag does not verify (wrong key, nonce, AAD or tampering).
pub fn decrypt_message(
    key: &[u8; KEY_LENGTH],
    nonce: &AuthTag,
    data: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if data.len() < MAC_LENGTH {
        return Err(CryptoError::CiphertextTooShort {
            min: MAC_LENGTH,
            actual: data.len(),
        });
    }

    let cipher = Aes128Gcm::new(key.into());
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: data, aad })
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Encrypt an auth response under the auth-response key (zero nonce, no AAD).
///
/// The key is single-use per handshake, which is what makes the fixed nonce safe.
pub fn encrypt_auth_response(
    auth_response_key: &[u8; KEY_LENGTH],
    auth_response: &AuthResponse,
) -> Result<Vec<u8>, CryptoError> {
    let encoded =
        bincode::serialize(auth_response).map_err(|e| CryptoError::Encoding(e.to_string()))?;
    encrypt_message(auth_response_key, &[0u8; AUTH_TAG_LENGTH], &encoded, &[])
}

/// Decrypt and decode the auth response inside `header`.
///
/// # Errors
///
/// `UnsupportedAuthScheme` unless the header names [`AUTH_SCHEME_NAME`];
/// decryption and decoding errors otherwise.
pub fn decrypt_auth_header(
    auth_response_key: &[u8; KEY_LENGTH],
    header: &AuthHeader,
) -> Result<AuthResponse, CryptoError> {
    if header.auth_scheme_name != AUTH_SCHEME_NAME {
        return Err(CryptoError::UnsupportedAuthScheme(
            header.auth_scheme_name.clone(),
        ));
    }

    let plaintext = decrypt_message(
        auth_response_key,
        &[0u8; AUTH_TAG_LENGTH],
        &header.auth_response,
        &[],
    )?;
    let auth_response: AuthResponse =
        bincode::deserialize(&plaintext).map_err(|e| CryptoError::Encoding(e.to_string()))?;

    if auth_response.version != AUTH_RESPONSE_VERSION {
        return Err(CryptoError::Encoding(format!(
            "unsupported auth response version {}",
            auth_response.version
        )));
    }
    Ok(auth_response)
}
