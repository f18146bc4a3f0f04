//! Test utilities for the session service.
//!
//! Deterministic stand-ins for the driven ports. Enable with the
//! `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use discv5_core::test_utils::FixedTimeSource;
//! use discv5_core::TimeSource;
//!
//! let time_source = FixedTimeSource::new(1000);
//! assert_eq!(time_source.now().as_secs(), 1000);
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{Packet, Timestamp};
use crate::ports::{TimeSource, Transport, TransportError};

/// A time source that returns a fixed timestamp.
#[derive(Debug, Clone)]
pub struct FixedTimeSource {
    timestamp: u64,
}

impl FixedTimeSource {
    /// Create a new fixed time source with the given timestamp (in seconds).
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }

    /// Get the configured timestamp value.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.timestamp)
    }
}

/// A clock tests can move forward.
///
/// Clones share the same clock, so a test can keep one handle while the
/// service owns another.
///
/// ```rust
/// use discv5_core::test_utils::ControllableTimeSource;
/// use discv5_core::TimeSource;
///
/// let clock = ControllableTimeSource::new(100);
/// let handle = clock.clone();
/// handle.advance(5);
/// assert_eq!(clock.now().as_secs(), 105);
/// ```
#[derive(Debug, Clone)]
pub struct ControllableTimeSource {
    time: Arc<AtomicU64>,
}

impl ControllableTimeSource {
    /// Start the clock at `initial` seconds.
    pub fn new(initial: u64) -> Self {
        Self {
            time: Arc::new(AtomicU64::new(initial)),
        }
    }

    /// Advances the internal clock by the specified seconds.
    pub fn advance(&self, secs: u64) {
        self.time.fetch_add(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ControllableTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.time.load(Ordering::SeqCst))
    }
}

/// In-memory transport recording every packet handed to it.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<(SocketAddr, Packet)>>,
    closed: AtomicBool,
}

impl MemoryTransport {
    /// Empty, open transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the recorded packets in send order.
    pub fn take_sent(&self) -> Vec<(SocketAddr, Packet)> {
        match self.sent.lock() {
            Ok(mut sent) => std::mem::take(&mut *sent),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Number of packets recorded and not yet drained.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }

    /// Make every subsequent `send` fail with `TransportError::Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Transport for MemoryTransport {
    fn send(&self, addr: SocketAddr, packet: Packet) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.sent
            .lock()
            .map_err(|_| TransportError::Io("transport lock poisoned".to_string()))?
            .push((addr, packet));
        Ok(())
    }
}
