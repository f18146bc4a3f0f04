//! # Adapters
//!
//! Concrete implementations of the driven ports and host-side helpers:
//! the system clock and configuration file loading.

mod config;
mod time;

pub use config::load_config;
pub use time::SystemTimeSource;
