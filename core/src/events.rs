#![deny(unsafe_code)]
//! Connection events and the bus that carries them
//!
//! The station driver, broadcast listener and time-sync client publish from
//! their callback context; the provisioning event handler is the single
//! consumer. Events are delivered in publish order.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use provision_hal::{Bssid, Password, Ssid};

use crate::error::ProvisionError;

/// Longest auxiliary (reserved) payload a broadcast can carry
pub const AUX_DATA_MAX_LEN: usize = 64;

/// Auxiliary broadcast payload (the timezone string)
pub type AuxData = Vec<u8, AUX_DATA_MAX_LEN>;

/// Default bus depth
pub const EVENT_BUS_DEPTH: usize = 8;

/// Credentials decoded by the broadcast listener
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BroadcastCredentials {
    /// Network name
    pub ssid: Ssid,
    /// Passphrase
    pub password: Password,
    /// Access point the phone was associated with, when reported
    pub bssid: Option<Bssid>,
    /// Reserved data sent alongside the credentials
    pub aux_data: AuxData,
}

/// Asynchronous notification from a network collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionEvent {
    /// Radio started in station mode
    StationStarted,
    /// Radio stopped
    StationStopped,
    /// Associated with the access point (no IP yet)
    StationConnectedL2,
    /// Association lost or attempt failed
    StationDisconnected,
    /// DHCP lease acquired
    GotIp {
        /// IPv4 address octets
        address: [u8; 4],
    },
    /// Listener finished its channel scan
    BroadcastScanDone,
    /// Listener locked onto the broadcasting channel
    BroadcastChannelFound,
    /// Listener decoded a complete credential set
    BroadcastCredentialsReceived(BroadcastCredentials),
    /// Listener acknowledged the phone app; the handshake is over
    BroadcastAckSent,
}

/// Bounded multi-producer, single-consumer event queue
///
/// Using `CriticalSectionRawMutex` makes publishing safe from any priority.
pub struct EventBus<M: RawMutex, const N: usize = EVENT_BUS_DEPTH> {
    channel: Channel<M, ConnectionEvent, N>,
}

impl<M: RawMutex, const N: usize> EventBus<M, N> {
    /// Create an empty bus
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Publish without blocking (callback context)
    ///
    /// A full queue drops the event and reports `EventBusFull`.
    pub fn publish(&self, event: ConnectionEvent) -> Result<(), ProvisionError> {
        self.channel.try_send(event).map_err(|_| {
            error!("Event bus full, event dropped");
            ProvisionError::EventBusFull
        })
    }

    /// Wait for the next event
    pub async fn next(&self) -> ConnectionEvent {
        self.channel.receive().await
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    /// Whether no event is queued
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl<M: RawMutex, const N: usize> Default for EventBus<M, N> {
    fn default() -> Self {
        Self::new()
    }
}
