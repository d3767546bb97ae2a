#![deny(unsafe_code)]
//! Out-of-band credential broadcast listener trait
//!
//! A companion phone app encodes SSID, password and a small reserved payload
//! into Wi-Fi traffic patterns. The listener decodes them in promiscuous mode
//! and reports progress on the event bus:
//! `BroadcastScanDone` → `BroadcastChannelFound` →
//! `BroadcastCredentialsReceived` → `BroadcastAckSent`.

use crate::station::DriverError;

/// Length of the broadcast decryption key (AES-128)
pub const BROADCAST_KEY_LEN: usize = 16;

/// Broadcast payload decryption key
pub type BroadcastKey = [u8; BROADCAST_KEY_LEN];

/// Broadcast encoding protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolVersion {
    /// First generation encoding, no reserved data and no encryption
    V1,
    /// Second generation encoding with reserved data and optional encryption
    #[default]
    V2,
}

impl ProtocolVersion {
    /// Whether the protocol can carry the auxiliary (reserved) data field
    pub const fn carries_aux_data(self) -> bool {
        matches!(self, Self::V2)
    }
}

/// Credential broadcast listener
pub trait BroadcastListener {
    /// Select the protocol and optional decryption key before `start`
    fn configure(
        &mut self,
        version: ProtocolVersion,
        key: Option<&BroadcastKey>,
    ) -> Result<(), DriverError>;

    /// Begin listening; the station must already be started
    fn start(&mut self) -> Result<(), DriverError>;

    /// Stop listening and release the radio
    fn stop(&mut self) -> Result<(), DriverError>;
}
