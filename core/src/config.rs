#![deny(unsafe_code)]
//! Provisioning configuration structures

use provision_hal::{BroadcastKey, ProtocolVersion, StoreKey};

use crate::error::ProvisionError;
use crate::retry::MAX_RETRY;

/// Store location of the timezone received with broadcast credentials
pub const TIMEZONE_KEY: StoreKey = StoreKey::new("WIFI", "TZ");

/// Longest hostname accepted by the network interface
pub const HOSTNAME_MAX_LEN: usize = 32;

/// Connection configuration
///
/// Immutable once handed to a [`Provisioner`](crate::Provisioner).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionConfig {
    /// DHCP hostname announced by the station
    pub hostname: &'static str,
    /// Time-sync server hostname or address
    pub time_server: &'static str,
    /// Broadcast payload decryption key (encryption disabled when `None`)
    pub broadcast_key: Option<BroadcastKey>,
    /// Broadcast encoding protocol
    pub protocol: ProtocolVersion,
    /// Consecutive disconnects tolerated per phase
    pub max_retries: u8,
}

impl ConnectionConfig {
    /// Configuration with the given hostname and time server, defaults otherwise
    pub fn new(hostname: &'static str, time_server: &'static str) -> Self {
        Self {
            hostname,
            time_server,
            ..Self::default()
        }
    }

    /// Enable encrypted broadcast provisioning
    pub fn with_broadcast_key(mut self, key: BroadcastKey) -> Self {
        self.broadcast_key = Some(key);
        self
    }

    /// Check the values the network stack will refuse
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.hostname.is_empty() || self.hostname.len() > HOSTNAME_MAX_LEN {
            return Err(ProvisionError::Config);
        }
        if self.time_server.is_empty() {
            return Err(ProvisionError::Config);
        }
        if self.broadcast_key.is_some() && self.protocol != ProtocolVersion::V2 {
            // Only the v2 encoding supports encryption
            return Err(ProvisionError::Config);
        }
        if !self.protocol.carries_aux_data() {
            warn!("Protocol {:?} carries no timezone, local time stays UTC", self.protocol);
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            hostname: "ESP32",
            time_server: "pool.ntp.org",
            broadcast_key: None,
            protocol: ProtocolVersion::V2,
            max_retries: MAX_RETRY,
        }
    }
}
