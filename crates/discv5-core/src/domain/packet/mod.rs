//! # Packet Codec
//!
//! Constructors and in-memory representation of the four discovery packet
//! variants. Byte-level framing belongs to the transport; this module only
//! builds packets and derives the values they carry (tag, magic, auth tag).

mod create;
mod types;

pub use create::{
    create_auth_header, create_auth_message_packet, create_auth_response, create_auth_tag,
    create_magic, create_message_packet, create_random_packet, create_tag,
    create_who_are_you_packet, src_id_from_tag,
};
pub use types::{
    AuthHeader, AuthResponse, Packet, PacketKind, AUTH_RESPONSE_VERSION, AUTH_SCHEME_NAME,
    RANDOM_DATA_LENGTH, WHOAREYOU_STRING,
};
