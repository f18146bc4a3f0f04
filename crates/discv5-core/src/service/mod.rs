//! # Session Service
//!
//! Drives the discovery handshake for every remote peer and encrypts
//! traffic over established sessions.
//!
//! ```text
//! initiator                                   responder
//!    | -- Random (tag, auth_tag) ---------------> |  WhoAreYouRequest
//!    | <-------------- WhoAreYou (magic, token) -- |  WhoAreYouSent
//!    | -- AuthMessage (auth header, message) ---> |  Established + Message
//!    |    HandshakeSent, emits Established        |
//!    | <------------------ Message (response) --- |
//!    |    Established                              |
//! ```
//!
//! Packets that fail a check are dropped and logged at `debug`; the
//! handshake never answers a bad packet with an error packet.

// Semantic submodules
mod config;
mod core;
mod errors;
mod events;
mod handshake;
mod state;

// Re-export public API
pub use self::core::SessionService;
pub use config::{ConfigError, SessionConfig};
pub use errors::SessionError;
pub use events::SessionEvent;
pub use state::SessionStatus;

#[cfg(test)]
mod tests;
