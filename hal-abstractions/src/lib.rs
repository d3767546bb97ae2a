//! Hardware abstraction traits for headless Wi-Fi provisioning
//!
//! This crate defines the narrow interfaces the provisioning state machine uses
//! to reach its external collaborators. Board support packages implement these
//! traits on top of the vendor radio stack, flash key-value store and time-sync
//! client.
//!
//! - **`station`**: Wi-Fi station driver (`start`/`connect`/active config)
//! - **`broadcast`**: out-of-band credential broadcast listener
//! - **`store`**: namespaced, power-loss durable key-value store
//! - **`time_sync`**: polling time-sync client and its `Timestamp`
//! - **`credentials`**: bounded SSID/password/BSSID container
//!
//! All driver commands are fire-and-forget: completion is reported later as a
//! connection event on the event bus owned by the provisioning core.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod broadcast;
pub mod credentials;
pub mod station;
pub mod store;
pub mod time_sync;

// Re-export commonly used types
pub use broadcast::{BroadcastKey, BroadcastListener, ProtocolVersion, BROADCAST_KEY_LEN};
pub use credentials::{
    Bssid, CredentialsError, Password, Ssid, StoredCredentials, PASSWORD_MAX_LEN, SSID_MAX_LEN,
};
pub use station::{DriverError, StationDriver};
pub use store::{CredentialStore, StoreError, StoreKey};
pub use time_sync::{SyncCallback, SyncMode, TimeSyncClient, Timestamp};
