#![deny(unsafe_code)]
//! Wi-Fi station driver trait

use crate::credentials::StoredCredentials;

/// Driver command errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// Driver or network interface not initialized
    NotInitialized,
    /// Command issued before the driver was started
    NotStarted,
    /// Argument rejected by the driver (e.g. malformed config)
    InvalidArgument,
    /// Command not valid in the current driver state
    InvalidState,
    /// Radio stack internal failure
    Internal,
}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "Driver not initialized"),
            Self::NotStarted => write!(f, "Driver not started"),
            Self::InvalidArgument => write!(f, "Invalid argument"),
            Self::InvalidState => write!(f, "Invalid driver state"),
            Self::Internal => write!(f, "Internal driver error"),
        }
    }
}

impl core::error::Error for DriverError {}

/// Wi-Fi station (client) driver
///
/// Every command only *issues* the operation. Its outcome arrives later as a
/// connection event (`StationStarted`, `StationDisconnected`, `GotIp`, ...).
/// An `Err` means the driver refused the command outright.
///
/// Implementations keep the active configuration in their own persistent
/// storage so that `active_config` returns the last applied credentials after
/// a power cycle.
pub trait StationDriver {
    /// Bring up the network interface in station mode with the given hostname
    fn init(&mut self, hostname: &str) -> Result<(), DriverError>;

    /// Start the radio; emits `StationStarted`
    fn start(&mut self) -> Result<(), DriverError>;

    /// Stop the radio; emits `StationStopped`
    fn stop(&mut self) -> Result<(), DriverError>;

    /// Associate with the configured access point
    fn connect(&mut self) -> Result<(), DriverError>;

    /// Drop the current association
    fn disconnect(&mut self) -> Result<(), DriverError>;

    /// Credentials currently configured (empty if none)
    fn active_config(&self) -> Result<StoredCredentials, DriverError>;

    /// Replace and persist the active configuration
    fn set_active_config(&mut self, credentials: &StoredCredentials) -> Result<(), DriverError>;
}
