//! # Session Crypto
//!
//! Key agreement, key derivation, id-nonce signatures and authenticated
//! encryption for the discovery handshake.
//!
//! | Step | Algorithm |
//! |------|-----------|
//! | Key agreement | secp256k1 ECDH, secret = compressed shared point |
//! | Key derivation | HKDF-SHA256, 48 bytes split into three 16-byte keys |
//! | Id-nonce proof | ECDSA over `sha256("discovery-id-nonce" ‖ id_nonce ‖ ephemeral_pk)` |
//! | Encryption | AES-128-GCM, 12-byte nonce, 16-byte tag appended |
//!
//! The protocol fixes a single algorithm for each step, so there is no
//! negotiation layer here. Every function is pure; randomness is passed in.

mod aead;
mod keys;
mod nonce;

pub use aead::{
    decrypt_auth_header, decrypt_message, encrypt_auth_response, encrypt_message, MAC_LENGTH,
};
pub use keys::{
    derive_key, derive_keys_from_pubkey, generate_session_keys, SessionKeys, KEY_AGREEMENT_STRING,
    KEY_LENGTH,
};
pub use nonce::{generate_signing_nonce, sign_nonce, verify_nonce, NONCE_PREFIX};
