//! # Driven Ports (Outbound SPI)
//!
//! These are the interfaces this crate **requires** the host application to implement.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::{Packet, Timestamp};

/// Outbound packet sink.
///
/// The host owns the socket and the byte-level packet encoding; the session
/// service hands over fully built packets.
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct UdpTransport {
///     socket: std::net::UdpSocket,
/// }
///
/// impl Transport for UdpTransport {
///     fn send(&self, addr: SocketAddr, packet: Packet) -> Result<(), TransportError> {
///         let bytes = encode_packet(&packet);
///         self.socket
///             .send_to(&bytes, addr)
///             .map(|_| ())
///             .map_err(|e| TransportError::Io(e.to_string()))
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Send one packet to `addr`.
    fn send(&self, addr: SocketAddr, packet: Packet) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, addr: SocketAddr, packet: Packet) -> Result<(), TransportError> {
        (**self).send(addr, packet)
    }
}

/// Errors from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Socket-level failure
    #[error("transport I/O error: {0}")]
    Io(String),
    /// Encoded packet exceeds the datagram limit
    #[error("packet of {size} bytes exceeds maximum of {max}")]
    PacketTooLarge {
        /// Encoded size
        size: usize,
        /// Transport limit
        max: usize,
    },
    /// Transport has been shut down
    #[error("transport closed")]
    Closed,
}

/// Abstract interface for time-related operations.
///
/// Enables deterministic testing by injecting controllable time sources.
/// Production implementations use system time; tests use fixed timestamps.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}
