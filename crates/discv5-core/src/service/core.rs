use std::collections::HashMap;
use std::net::SocketAddr;

use rand::{CryptoRng, RngCore};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use super::config::SessionConfig;
use super::errors::SessionError;
use super::events::SessionEvent;
use super::state::{PeerKey, PendingRequest, Session, SessionState, SessionStatus};
use crate::domain::{
    create_auth_tag, create_message_packet, create_random_packet, create_tag,
    create_who_are_you_packet, encrypt_message, AuthTag, Keypair, NodeId, NodeRecord, Timestamp,
};
use crate::ports::{TimeSource, Transport};

/// Handshake and session manager for one local node.
///
/// Owns one state machine per remote (node id, address) pair and a table of
/// requests awaiting an authenticated reply. All handlers take `&mut self`
/// and run to completion; results are reported on the event channel
/// returned by [`SessionService::new`].
///
/// # Example
///
/// ```rust,ignore
/// let (mut service, mut events) = SessionService::new(
///     local_record,
///     keypair,
///     UdpTransport::bind(addr)?,
///     Box::new(SystemTimeSource::new()),
///     rand::rngs::OsRng,
///     SessionConfig::default(),
/// )?;
///
/// service.send_request(&remote_record, find_node_bytes)?;
/// while let Some(event) = events.recv().await {
///     // feed Established records into the routing table, dispatch messages
/// }
/// ```
pub struct SessionService<T: Transport, R: RngCore + CryptoRng> {
    pub(crate) local_record: NodeRecord,
    pub(crate) keypair: Keypair,
    /// Cached `local_record.node_id()`
    pub(crate) local_id: NodeId,
    pub(crate) transport: T,
    pub(crate) time_source: Box<dyn TimeSource>,
    pub(crate) rng: R,
    pub(crate) config: SessionConfig,
    pub(crate) sessions: HashMap<PeerKey, Session>,
    /// Keyed by the auth tag of the packet that carried the request
    pub(crate) pending_requests: HashMap<AuthTag, PendingRequest>,
    pub(crate) events: mpsc::UnboundedSender<SessionEvent>,
}

impl<T: Transport, R: RngCore + CryptoRng> SessionService<T, R> {
    /// Create a session service and the receiving end of its event channel.
    ///
    /// # Errors
    ///
    /// `KeypairMismatch` if `local_record` was not issued for `keypair`,
    /// `Record` if its signature does not verify, `Config` for invalid timeouts.
    pub fn new(
        local_record: NodeRecord,
        keypair: Keypair,
        transport: T,
        time_source: Box<dyn TimeSource>,
        rng: R,
        config: SessionConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), SessionError> {
        config.validate()?;
        check_local_record(&local_record, &keypair)?;

        let (events, receiver) = mpsc::unbounded_channel();
        let local_id = local_record.node_id();
        info!(node_id = %local_id, seq = local_record.seq(), "Session service started");

        Ok((
            Self {
                local_record,
                keypair,
                local_id,
                transport,
                time_source,
                rng,
                config,
                sessions: HashMap::new(),
                pending_requests: HashMap::new(),
                events,
            },
            receiver,
        ))
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.time_source.now()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            trace!("Event receiver dropped");
        }
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    /// Send `payload` to the peer described by `record`.
    ///
    /// Without a session this sends a Random packet and the payload waits in
    /// the pending-request table until the peer's WHOAREYOU arrives. With
    /// session keys the payload is encrypted and sent directly. Either way
    /// the request is tracked under the returned auth tag until an
    /// authenticated reply arrives or it expires.
    pub fn send_request(
        &mut self,
        record: &NodeRecord,
        payload: Vec<u8>,
    ) -> Result<AuthTag, SessionError> {
        let node_id = record.node_id();
        let addr = record
            .udp_socket()
            .ok_or(SessionError::MissingEndpoint { node_id })?;
        let key = (node_id, addr);
        let tag = create_tag(&self.local_id, &node_id);
        let now = self.now();

        let keys = self.sessions.get(&key).and_then(|s| s.state.keys());
        let (packet, auth_tag) = match keys {
            Some(keys) => {
                let auth_tag = create_auth_tag(&mut self.rng);
                let message = encrypt_message(&keys.encryption_key, &auth_tag, &payload, &tag)?;
                (create_message_packet(tag, auth_tag, message), auth_tag)
            }
            None => {
                let packet = create_random_packet(&mut self.rng, tag);
                let auth_tag = packet.auth_tag().copied().unwrap_or_default();
                (packet, auth_tag)
            }
        };

        debug!(
            node_id = %node_id,
            addr = %addr,
            kind = %packet.kind(),
            "Sending request"
        );
        self.transport.send(addr, packet)?;

        self.sessions.entry(key).or_insert_with(|| Session {
            state: SessionState::RandomSent,
            remote_record: Some(record.clone()),
            last_seen: now,
        });
        self.pending_requests.insert(
            auth_tag,
            PendingRequest {
                node_id,
                addr,
                auth_tag,
                payload,
                remote_record: record.clone(),
                created_at: now,
            },
        );
        Ok(auth_tag)
    }

    /// Send `payload` over an existing session without tracking a reply.
    ///
    /// # Errors
    ///
    /// `NoSession` unless the peer has a session with keys.
    pub fn send_response(
        &mut self,
        node_id: NodeId,
        addr: SocketAddr,
        payload: &[u8],
    ) -> Result<(), SessionError> {
        let keys = self
            .sessions
            .get(&(node_id, addr))
            .and_then(|s| s.state.keys())
            .ok_or(SessionError::NoSession { node_id, addr })?;

        let tag = create_tag(&self.local_id, &node_id);
        let auth_tag = create_auth_tag(&mut self.rng);
        let message = encrypt_message(&keys.encryption_key, &auth_tag, payload, &tag)?;

        trace!(node_id = %node_id, addr = %addr, "Sending response");
        self.transport
            .send(addr, create_message_packet(tag, auth_tag, message))?;
        Ok(())
    }

    /// Challenge `node_id` at `addr`, echoing `auth_tag` as the token.
    ///
    /// `enr_seq` is the sequence number of the peer's record we already hold
    /// (0 when unknown); the peer attaches its record if it has a newer one.
    /// `known_record` is used to verify the peer when it does not. Nothing is
    /// sent while a challenge to the same peer is outstanding.
    pub fn send_who_are_you(
        &mut self,
        addr: SocketAddr,
        node_id: NodeId,
        enr_seq: u64,
        known_record: Option<NodeRecord>,
        auth_tag: AuthTag,
    ) -> Result<(), SessionError> {
        let key = (node_id, addr);
        if let Some(token) = self.outstanding_challenge(&key) {
            debug!(node_id = %node_id, addr = %addr, ?token, "Challenge already outstanding");
            return Ok(());
        }

        let packet = create_who_are_you_packet(&mut self.rng, &node_id, auth_tag, enr_seq);
        let id_nonce = packet.id_nonce().copied().unwrap_or_default();

        debug!(node_id = %node_id, addr = %addr, enr_seq, "Sending WHOAREYOU");
        self.transport.send(addr, packet)?;

        let now = self.now();
        let prior = self.sessions.remove(&key);
        let remote_record = known_record
            .clone()
            .or_else(|| prior.as_ref().and_then(|s| s.remote_record.clone()));
        let prior_keys = prior.and_then(|s| match s.state {
            SessionState::HandshakeSent { keys } | SessionState::Established { keys } => {
                Some(keys)
            }
            SessionState::WhoAreYouSent { prior_keys, .. } => prior_keys,
            SessionState::RandomSent => None,
        });

        self.sessions.insert(
            key,
            Session {
                state: SessionState::WhoAreYouSent {
                    id_nonce,
                    auth_tag,
                    known_record,
                    prior_keys,
                    issued_at: now,
                },
                remote_record,
                last_seen: now,
            },
        );
        Ok(())
    }

    /// Token of the WHOAREYOU we are waiting on for this peer, if any.
    /// A challenge older than the request timeout no longer counts.
    pub(crate) fn outstanding_challenge(&self, key: &PeerKey) -> Option<AuthTag> {
        let now = self.now();
        match self.sessions.get(key).map(|s| &s.state) {
            Some(SessionState::WhoAreYouSent {
                auth_tag,
                issued_at,
                ..
            }) if now.secs_since(*issued_at) < self.config.request_timeout_secs => {
                Some(*auth_tag)
            }
            _ => None,
        }
    }

    // =========================================================================
    // HOUSEKEEPING
    // =========================================================================

    /// Drop requests older than the request timeout, emitting `RequestTimeout`
    /// for each. A peer left with no pending request and no confirmed session
    /// loses its half-open session too. Unanswered challenges past the same
    /// timeout are withdrawn. Returns the number of requests expired.
    pub fn expire_requests(&mut self) -> usize {
        let now = self.now();
        let timeout = self.config.request_timeout_secs;
        self.expire_challenges(now, timeout);

        let expired: Vec<AuthTag> = self
            .pending_requests
            .values()
            .filter(|r| now.secs_since(r.created_at) >= timeout)
            .map(|r| r.auth_tag)
            .collect();

        for auth_tag in &expired {
            let Some(request) = self.pending_requests.remove(auth_tag) else {
                continue;
            };
            let key = request.peer_key();
            debug!(node_id = %request.node_id, addr = %request.addr, "Request timed out");

            let still_pending = self.pending_requests.values().any(|r| r.peer_key() == key);
            let half_open = matches!(
                self.sessions.get(&key).map(|s| &s.state),
                Some(SessionState::RandomSent | SessionState::HandshakeSent { .. })
            );
            if !still_pending && half_open {
                self.sessions.remove(&key);
            }

            self.emit(SessionEvent::RequestTimeout {
                node_id: request.node_id,
                addr: request.addr,
                auth_tag: *auth_tag,
            });
        }
        expired.len()
    }

    /// Withdraw stale challenges. A peer that was being re-keyed falls back
    /// to its previous keys; any other peer loses the session.
    fn expire_challenges(&mut self, now: Timestamp, timeout: u64) {
        let stale: Vec<PeerKey> = self
            .sessions
            .iter()
            .filter(|(_, s)| match &s.state {
                SessionState::WhoAreYouSent { issued_at, .. } => {
                    now.secs_since(*issued_at) >= timeout
                }
                _ => false,
            })
            .map(|(key, _)| *key)
            .collect();

        for key in stale {
            let Some(session) = self.sessions.remove(&key) else {
                continue;
            };
            let (node_id, addr) = key;
            if let SessionState::WhoAreYouSent {
                prior_keys: Some(keys),
                ..
            } = session.state
            {
                debug!(node_id = %node_id, addr = %addr, "Challenge expired, keeping previous session");
                self.sessions.insert(
                    key,
                    Session {
                        state: SessionState::Established { keys },
                        remote_record: session.remote_record,
                        last_seen: session.last_seen,
                    },
                );
            } else {
                debug!(node_id = %node_id, addr = %addr, "Challenge expired");
            }
        }
    }

    /// Drop sessions idle for longer than the session timeout. Returns the number dropped.
    pub fn expire_sessions(&mut self) -> usize {
        let now = self.now();
        let timeout = self.config.session_timeout_secs;
        let before = self.sessions.len();
        self.sessions.retain(|(node_id, addr), session| {
            let keep = now.secs_since(session.last_seen) < timeout;
            if !keep {
                debug!(node_id = %node_id, addr = %addr, "Session expired");
            }
            keep
        });
        before - self.sessions.len()
    }

    /// Forget the session and pending requests for one peer.
    /// Returns whether a session existed.
    pub fn remove_session(&mut self, node_id: NodeId, addr: SocketAddr) -> bool {
        let key = (node_id, addr);
        self.clear_pending(&key);
        self.sessions.remove(&key).is_some()
    }

    pub(crate) fn clear_pending(&mut self, key: &PeerKey) {
        self.pending_requests.retain(|_, r| r.peer_key() != *key);
    }

    /// Drop every session and pending request.
    pub fn stop(&mut self) {
        info!(
            sessions = self.sessions.len(),
            pending = self.pending_requests.len(),
            "Session service stopped"
        );
        self.sessions.clear();
        self.pending_requests.clear();
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Handshake state for a peer, if any.
    pub fn session_state(&self, node_id: NodeId, addr: SocketAddr) -> Option<SessionStatus> {
        self.sessions
            .get(&(node_id, addr))
            .map(|s| s.state.status())
    }

    /// Number of sessions in any state.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of requests awaiting a reply.
    pub fn pending_request_count(&self) -> usize {
        self.pending_requests.len()
    }

    /// Our own record, as attached to outgoing auth responses.
    pub fn local_record(&self) -> &NodeRecord {
        &self.local_record
    }

    /// Our own node id.
    pub fn local_id(&self) -> NodeId {
        self.local_id
    }

    /// Active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the local record, e.g. after the external address changed.
    ///
    /// # Errors
    ///
    /// Same checks as [`SessionService::new`].
    pub fn update_local_record(&mut self, record: NodeRecord) -> Result<(), SessionError> {
        check_local_record(&record, &self.keypair)?;
        info!(seq = record.seq(), "Local record updated");
        self.local_record = record;
        Ok(())
    }
}

fn check_local_record(record: &NodeRecord, keypair: &Keypair) -> Result<(), SessionError> {
    if record.node_id() != keypair.node_id() {
        return Err(SessionError::KeypairMismatch);
    }
    record.verify()?;
    Ok(())
}
