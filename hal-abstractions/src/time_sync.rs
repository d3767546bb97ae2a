#![deny(unsafe_code)]
//! Time-sync client trait and timestamp type
//!
//! The protocol itself (SNTP or otherwise) lives in the vendor network stack.
//! The provisioning core only configures the client and receives a callback
//! each time the system clock has been corrected.

use crate::station::DriverError;

/// Timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    /// Unix timestamp in seconds since epoch (1970-01-01 00:00:00 UTC)
    pub unix_secs: u64,
    /// Microseconds component (0-999,999)
    pub micros: u32,
}

impl Timestamp {
    /// Create a new timestamp
    pub const fn new(unix_secs: u64, micros: u32) -> Self {
        Self { unix_secs, micros }
    }
}

/// Client operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncMode {
    /// Client periodically polls the configured server
    Poll,
    /// Client only listens for server broadcasts
    ListenOnly,
}

/// Invoked after every successful synchronization with the corrected time
pub type SyncCallback = fn(Timestamp);

/// Time-sync protocol client
pub trait TimeSyncClient {
    /// Select the operating mode; must precede `start`
    fn set_mode(&mut self, mode: SyncMode) -> Result<(), DriverError>;

    /// Set the (single) server hostname or address
    fn set_server(&mut self, address: &str) -> Result<(), DriverError>;

    /// Register the completed-synchronization notification
    fn register_callback(&mut self, callback: SyncCallback) -> Result<(), DriverError>;

    /// Start the client
    fn start(&mut self) -> Result<(), DriverError>;
}
