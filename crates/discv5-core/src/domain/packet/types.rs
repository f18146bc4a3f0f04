//! Packet types and wire constants.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{AuthTag, IdNonce, Magic, NodeRecord, Tag};

/// Length of the random padding carried by a Random packet.
pub const RANDOM_DATA_LENGTH: usize = 44;

/// Suffix hashed with a node id to form its WHOAREYOU magic.
pub const WHOAREYOU_STRING: &str = "WHOAREYOU";

/// The only supported auth scheme (AES-128-GCM).
pub const AUTH_SCHEME_NAME: &str = "gcm";

/// Version carried by every auth response.
pub const AUTH_RESPONSE_VERSION: u8 = 5;

/// Handshake envelope attached to the first message of a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    /// Nonce of the accompanying encrypted message
    pub auth_tag: AuthTag,
    /// Challenge nonce from the WHOAREYOU being answered
    pub id_nonce: IdNonce,
    /// Must equal [`AUTH_SCHEME_NAME`]
    pub auth_scheme_name: String,
    /// Initiator's ephemeral public key (compressed)
    pub ephemeral_pubkey: Vec<u8>,
    /// Encrypted [`AuthResponse`]
    pub auth_response: Vec<u8>,
}

/// Proof of identity carried (encrypted) inside an [`AuthHeader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Always [`AUTH_RESPONSE_VERSION`]
    pub version: u8,
    /// Id-nonce signature by the sender's identity key
    pub signature: Vec<u8>,
    /// Sender's record, included when the recipient's copy is stale
    pub node_record: Option<NodeRecord>,
}

/// A decoded discovery packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Sent in place of a message when no session exists yet.
    Random {
        /// Obfuscated source id
        tag: Tag,
        /// Echoed back as the WHOAREYOU token
        auth_tag: AuthTag,
        /// Random padding, indistinguishable from ciphertext
        data: Vec<u8>,
    },
    /// Handshake challenge.
    WhoAreYou {
        /// Identifies the intended recipient
        magic: Magic,
        /// Auth tag of the packet that triggered the challenge
        token: AuthTag,
        /// Fresh challenge nonce
        id_nonce: IdNonce,
        /// Sequence number of the recipient's record known to the challenger
        enr_seq: u64,
    },
    /// Handshake completion carrying the first encrypted message.
    AuthMessage {
        /// Obfuscated source id
        tag: Tag,
        /// Handshake envelope
        auth_header: AuthHeader,
        /// Encrypted message body
        message: Vec<u8>,
    },
    /// Ordinary encrypted traffic.
    Message {
        /// Obfuscated source id
        tag: Tag,
        /// Message nonce
        auth_tag: AuthTag,
        /// Encrypted message body
        message: Vec<u8>,
    },
}

/// Packet variant without payload, for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Random,
    WhoAreYou,
    AuthMessage,
    Message,
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => write!(f, "Random"),
            Self::WhoAreYou => write!(f, "WhoAreYou"),
            Self::AuthMessage => write!(f, "AuthMessage"),
            Self::Message => write!(f, "Message"),
        }
    }
}

impl Packet {
    /// Variant of this packet.
    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Random { .. } => PacketKind::Random,
            Self::WhoAreYou { .. } => PacketKind::WhoAreYou,
            Self::AuthMessage { .. } => PacketKind::AuthMessage,
            Self::Message { .. } => PacketKind::Message,
        }
    }

    /// Source tag; WHOAREYOU carries a magic instead.
    pub fn tag(&self) -> Option<&Tag> {
        match self {
            Self::Random { tag, .. } | Self::AuthMessage { tag, .. } | Self::Message { tag, .. } => {
                Some(tag)
            }
            Self::WhoAreYou { .. } => None,
        }
    }

    /// Auth tag a WHOAREYOU sent in reply to this packet would echo.
    pub fn auth_tag(&self) -> Option<&AuthTag> {
        match self {
            Self::Random { auth_tag, .. } | Self::Message { auth_tag, .. } => Some(auth_tag),
            Self::AuthMessage { auth_header, .. } => Some(&auth_header.auth_tag),
            Self::WhoAreYou { .. } => None,
        }
    }

    /// Challenge nonce of a WHOAREYOU.
    pub fn id_nonce(&self) -> Option<&IdNonce> {
        match self {
            Self::WhoAreYou { id_nonce, .. } => Some(id_nonce),
            _ => None,
        }
    }
}
