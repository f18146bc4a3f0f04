//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! Driven ports the session service needs from its host: a datagram
//! transport for outbound packets and a clock. Inbound packets are pushed
//! into the service directly through `SessionService::handle_packet`.

pub mod outbound;

pub use outbound::{TimeSource, Transport, TransportError};

#[cfg(test)]
mod tests;
