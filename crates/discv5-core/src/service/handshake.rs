//! Inbound packet handling: the handshake state machine.

use std::net::SocketAddr;

use rand::{CryptoRng, RngCore};
use thiserror::Error;
use tracing::{debug, instrument, trace};

use super::core::SessionService;
use super::errors::SessionError;
use super::events::SessionEvent;
use super::state::{Session, SessionState};
use crate::domain::{
    create_auth_header, create_auth_message_packet, create_auth_response, create_magic,
    create_tag, decrypt_auth_header, decrypt_message, derive_keys_from_pubkey,
    encrypt_auth_response, encrypt_message, generate_session_keys, sign_nonce, src_id_from_tag,
    verify_nonce, AuthHeader, AuthTag, CryptoError, IdNonce, Magic, NodeId, Packet, RecordError,
    Tag,
};
use crate::ports::{Transport, TransportError};

/// Why an inbound packet was dropped.
#[derive(Debug, Error)]
pub(crate) enum Rejection {
    #[error("magic is not ours")]
    ForeignMagic,
    #[error("no pending request for sender address")]
    NoPendingRequest,
    #[error("no outstanding challenge")]
    NoChallenge,
    #[error("challenge with token {token:02x?} already outstanding")]
    ChallengeOutstanding { token: AuthTag },
    #[error("id nonce does not match the challenge")]
    IdNonceMismatch,
    #[error("no record to verify the sender against")]
    UnknownRecord,
    #[error("record belongs to {record}, packet tag says {tag}")]
    NodeIdMismatch { record: NodeId, tag: NodeId },
    #[error("invalid id-nonce signature")]
    InvalidNonceSignature,
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl<T: Transport, R: RngCore + CryptoRng> SessionService<T, R> {
    /// Process one decoded packet received from `src`.
    ///
    /// Emits `SessionEvent::Packet` first, then drives the handshake. Packets
    /// failing any check are dropped and logged; state is left untouched.
    #[instrument(skip_all, fields(addr = %src, kind = %packet.kind()))]
    pub fn handle_packet(&mut self, src: SocketAddr, packet: Packet) {
        self.emit(SessionEvent::Packet {
            addr: src,
            packet: packet.clone(),
        });

        let result = match packet {
            Packet::WhoAreYou {
                magic,
                token,
                id_nonce,
                enr_seq,
            } => self.on_who_are_you(src, magic, token, id_nonce, enr_seq),
            Packet::Random { tag, auth_tag, .. } => self.on_random(src, &tag, auth_tag),
            Packet::AuthMessage {
                tag,
                auth_header,
                message,
            } => self.on_auth_message(src, &tag, auth_header, &message),
            Packet::Message {
                tag,
                auth_tag,
                message,
            } => self.on_message(src, &tag, auth_tag, &message),
        };

        if let Err(reason) = result {
            debug!(reason = %reason, "Dropping packet");
        }
    }

    fn on_random(&mut self, src: SocketAddr, tag: &Tag, auth_tag: AuthTag) -> Result<(), Rejection> {
        let node_id = src_id_from_tag(tag, &self.local_id);
        self.request_challenge(src, node_id, auth_tag)
    }

    /// Ask the host (or, with `auto_challenge`, ourselves) to challenge a peer.
    fn request_challenge(
        &mut self,
        src: SocketAddr,
        node_id: NodeId,
        auth_tag: AuthTag,
    ) -> Result<(), Rejection> {
        if let Some(token) = self.outstanding_challenge(&(node_id, src)) {
            return Err(Rejection::ChallengeOutstanding { token });
        }

        self.emit(SessionEvent::WhoAreYouRequest {
            node_id,
            addr: src,
            auth_tag,
        });

        if self.config.auto_challenge {
            self.send_who_are_you(src, node_id, 0, None, auth_tag)?;
        }
        Ok(())
    }

    /// Initiator: answer a challenge with an AuthMessage carrying the pending request.
    fn on_who_are_you(
        &mut self,
        src: SocketAddr,
        magic: Magic,
        token: AuthTag,
        id_nonce: IdNonce,
        enr_seq: u64,
    ) -> Result<(), Rejection> {
        if magic != create_magic(&self.local_id) {
            return Err(Rejection::ForeignMagic);
        }

        let request_tag = self
            .pending_requests
            .get(&token)
            .filter(|r| r.addr == src)
            .or_else(|| {
                self.pending_requests
                    .values()
                    .filter(|r| r.addr == src)
                    .min_by_key(|r| r.created_at)
            })
            .map(|r| r.auth_tag)
            .ok_or(Rejection::NoPendingRequest)?;
        let Some(request) = self.pending_requests.get(&request_tag) else {
            return Err(Rejection::NoPendingRequest);
        };
        let remote = request.remote_record.clone();
        let node_id = request.node_id;

        let (keys, ephemeral_pk) =
            generate_session_keys(&mut self.rng, &self.local_id, &remote, &id_nonce)?;
        let signature = sign_nonce(&self.keypair, &id_nonce, &ephemeral_pk)?;
        let local_record = (self.local_record.seq() > enr_seq).then(|| self.local_record.clone());
        let auth_response = create_auth_response(signature, local_record);
        let encrypted_response = encrypt_auth_response(&keys.auth_response_key, &auth_response)?;
        let auth_header =
            create_auth_header(&mut self.rng, id_nonce, ephemeral_pk, encrypted_response, None);

        let tag = create_tag(&self.local_id, &node_id);
        let new_auth_tag = auth_header.auth_tag;
        let message = encrypt_message(
            &keys.encryption_key,
            &new_auth_tag,
            &request.payload,
            &tag,
        )?;

        debug!(node_id = %node_id, enr_seq, "Answering WHOAREYOU");
        self.transport
            .send(src, create_auth_message_packet(tag, auth_header, message))?;

        let now = self.now();
        // Re-key the request to the auth tag the peer will see next.
        if let Some(mut request) = self.pending_requests.remove(&request_tag) {
            request.auth_tag = new_auth_tag;
            self.pending_requests.insert(new_auth_tag, request);
        }
        self.sessions.insert(
            (node_id, src),
            Session {
                state: SessionState::HandshakeSent { keys },
                remote_record: Some(remote.clone()),
                last_seen: now,
            },
        );
        self.emit(SessionEvent::Established(remote));
        Ok(())
    }

    /// Responder: complete the handshake we challenged for.
    fn on_auth_message(
        &mut self,
        src: SocketAddr,
        tag: &Tag,
        header: AuthHeader,
        message: &[u8],
    ) -> Result<(), Rejection> {
        let node_id = src_id_from_tag(tag, &self.local_id);
        let key = (node_id, src);

        let (id_nonce, known_record) = match self.sessions.get(&key) {
            Some(Session {
                state:
                    SessionState::WhoAreYouSent {
                        id_nonce,
                        known_record,
                        ..
                    },
                remote_record,
                ..
            }) => (*id_nonce, known_record.clone().or_else(|| remote_record.clone())),
            _ => return Err(Rejection::NoChallenge),
        };
        if header.id_nonce != id_nonce {
            return Err(Rejection::IdNonceMismatch);
        }

        let keys = derive_keys_from_pubkey(
            &self.keypair,
            &self.local_id,
            &node_id,
            &id_nonce,
            &header.ephemeral_pubkey,
        )?;
        let auth_response = decrypt_auth_header(&keys.auth_response_key, &header)?;

        let record = auth_response
            .node_record
            .or(known_record)
            .ok_or(Rejection::UnknownRecord)?;
        if record.node_id() != node_id {
            return Err(Rejection::NodeIdMismatch {
                record: record.node_id(),
                tag: node_id,
            });
        }
        record.verify()?;
        if !verify_nonce(
            record.public_key(),
            &id_nonce,
            &header.ephemeral_pubkey,
            &auth_response.signature,
        ) {
            return Err(Rejection::InvalidNonceSignature);
        }

        let payload = decrypt_message(&keys.decryption_key, &header.auth_tag, message, tag)?;

        debug!(node_id = %node_id, seq = record.seq(), "Session established");
        let now = self.now();
        self.sessions.insert(
            key,
            Session {
                state: SessionState::Established { keys },
                remote_record: Some(record.clone()),
                last_seen: now,
            },
        );
        self.clear_pending(&key);
        self.emit(SessionEvent::Established(record));
        self.emit(SessionEvent::Message {
            node_id,
            addr: src,
            payload,
        });
        Ok(())
    }

    fn on_message(
        &mut self,
        src: SocketAddr,
        tag: &Tag,
        auth_tag: AuthTag,
        message: &[u8],
    ) -> Result<(), Rejection> {
        let node_id = src_id_from_tag(tag, &self.local_id);
        let key = (node_id, src);

        let decrypted = self
            .sessions
            .get(&key)
            .and_then(|s| s.state.keys())
            .map(|keys| decrypt_message(&keys.decryption_key, &auth_tag, message, tag));

        let payload = match decrypted {
            Some(Ok(payload)) => payload,
            // The session stays as is; only a sender without keys is challenged.
            Some(Err(e)) => {
                trace!(node_id = %node_id, "Message did not decrypt under session keys");
                return Err(e.into());
            }
            None => return self.request_challenge(src, node_id, auth_tag),
        };

        let now = self.now();
        if let Some(session) = self.sessions.get_mut(&key) {
            session.last_seen = now;
            let state = std::mem::replace(&mut session.state, SessionState::RandomSent);
            session.state = match state {
                SessionState::HandshakeSent { keys } => {
                    debug!(node_id = %node_id, "Session confirmed");
                    SessionState::Established { keys }
                }
                other => other,
            };
        }
        self.clear_pending(&key);
        self.emit(SessionEvent::Message {
            node_id,
            addr: src,
            payload,
        });
        Ok(())
    }
}
