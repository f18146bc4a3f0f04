//! Packet constructors.

use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use super::types::{
    AuthHeader, AuthResponse, Packet, AUTH_RESPONSE_VERSION, AUTH_SCHEME_NAME,
    RANDOM_DATA_LENGTH, WHOAREYOU_STRING,
};
use crate::domain::{AuthTag, IdNonce, Magic, NodeId, NodeRecord, Tag, AUTH_TAG_LENGTH, ID_NONCE_LENGTH};

/// Fresh random auth tag.
pub fn create_auth_tag<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> AuthTag {
    let mut auth_tag = [0u8; AUTH_TAG_LENGTH];
    rng.fill_bytes(&mut auth_tag);
    auth_tag
}

fn create_id_nonce<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> IdNonce {
    let mut id_nonce = [0u8; ID_NONCE_LENGTH];
    rng.fill_bytes(&mut id_nonce);
    id_nonce
}

/// `sha256(dest_id) XOR src_id`.
///
/// Only the destination can strip the mask, recovering the sender with
/// [`src_id_from_tag`].
pub fn create_tag(src_id: &NodeId, dest_id: &NodeId) -> Tag {
    let mask: [u8; 32] = Sha256::digest(dest_id.as_bytes()).into();
    let mut tag = [0u8; 32];
    for (i, byte) in tag.iter_mut().enumerate() {
        *byte = mask[i] ^ src_id.as_bytes()[i];
    }
    tag
}

/// Recover the sender id from a tag addressed to `local_id`.
pub fn src_id_from_tag(tag: &Tag, local_id: &NodeId) -> NodeId {
    let mask: [u8; 32] = Sha256::digest(local_id.as_bytes()).into();
    let mut src = [0u8; 32];
    for (i, byte) in src.iter_mut().enumerate() {
        *byte = mask[i] ^ tag[i];
    }
    NodeId::new(src)
}

/// `sha256(node_id || "WHOAREYOU")`.
pub fn create_magic(node_id: &NodeId) -> Magic {
    let mut hasher = Sha256::new();
    hasher.update(node_id.as_bytes());
    hasher.update(WHOAREYOU_STRING.as_bytes());
    hasher.finalize().into()
}

/// Random packet: fresh auth tag plus random padding.
pub fn create_random_packet<R: RngCore + CryptoRng + ?Sized>(rng: &mut R, tag: Tag) -> Packet {
    let auth_tag = create_auth_tag(rng);
    let mut data = vec![0u8; RANDOM_DATA_LENGTH];
    rng.fill_bytes(&mut data);
    Packet::Random { tag, auth_tag, data }
}

/// WHOAREYOU challenge for `node_id`, echoing `auth_tag` with a fresh id nonce.
pub fn create_who_are_you_packet<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    node_id: &NodeId,
    auth_tag: AuthTag,
    enr_seq: u64,
) -> Packet {
    Packet::WhoAreYou {
        magic: create_magic(node_id),
        token: auth_tag,
        id_nonce: create_id_nonce(rng),
        enr_seq,
    }
}

/// Auth header for the handshake message; draws a fresh auth tag when none is given.
pub fn create_auth_header<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    id_nonce: IdNonce,
    ephemeral_pubkey: Vec<u8>,
    auth_response: Vec<u8>,
    auth_tag: Option<AuthTag>,
) -> AuthHeader {
    AuthHeader {
        auth_tag: auth_tag.unwrap_or_else(|| create_auth_tag(rng)),
        id_nonce,
        auth_scheme_name: AUTH_SCHEME_NAME.to_string(),
        ephemeral_pubkey,
        auth_response,
    }
}

pub fn create_auth_response(signature: Vec<u8>, node_record: Option<NodeRecord>) -> AuthResponse {
    AuthResponse {
        version: AUTH_RESPONSE_VERSION,
        signature,
        node_record,
    }
}

pub fn create_message_packet(tag: Tag, auth_tag: AuthTag, message: Vec<u8>) -> Packet {
    Packet::Message {
        tag,
        auth_tag,
        message,
    }
}

pub fn create_auth_message_packet(tag: Tag, auth_header: AuthHeader, message: Vec<u8>) -> Packet {
    Packet::AuthMessage {
        tag,
        auth_header,
        message,
    }
}
