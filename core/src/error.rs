#![deny(unsafe_code)]
//! Provisioning error types

use provision_hal::{DriverError, StoreError};

/// Provisioning operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProvisionError {
    /// Driver, store or configuration could not be initialized
    Config,
    /// The driver rejected a connect command
    ConnectIssue,
    /// Bounded reconnect attempts were consumed
    RetryExhausted,
    /// The broadcast phase ran past the caller's deadline
    BroadcastTimeout,
    /// Credential store read failed
    StoreRead,
    /// Credential store write failed
    StoreWrite,
    /// No value stored under the requested key
    NotFound,
    /// Stored value is malformed (e.g. not UTF-8)
    InvalidData,
    /// Driver or listener command failed outside of a connect attempt
    Driver,
    /// Event bus queue is full; the event was dropped
    EventBusFull,
}

impl core::fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Config => write!(f, "Initialization failed"),
            Self::ConnectIssue => write!(f, "Connect command rejected"),
            Self::RetryExhausted => write!(f, "Connection retries exhausted"),
            Self::BroadcastTimeout => write!(f, "Broadcast provisioning timed out"),
            Self::StoreRead => write!(f, "Store read failed"),
            Self::StoreWrite => write!(f, "Store write failed"),
            Self::NotFound => write!(f, "Value not found"),
            Self::InvalidData => write!(f, "Invalid stored data"),
            Self::Driver => write!(f, "Driver command failed"),
            Self::EventBusFull => write!(f, "Event bus full"),
        }
    }
}

// Implement core::error::Error for no_std compatibility
impl core::error::Error for ProvisionError {}

impl From<StoreError> for ProvisionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound,
            StoreError::WriteFailed => Self::StoreWrite,
            StoreError::BufferTooSmall => Self::InvalidData,
            StoreError::NotInitialized | StoreError::NoFreePages | StoreError::NewVersionFound => {
                Self::Config
            }
            StoreError::ReadFailed => Self::StoreRead,
        }
    }
}

impl From<DriverError> for ProvisionError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::NotInitialized => Self::Config,
            _ => Self::Driver,
        }
    }
}
