//! Platform-agnostic Wi-Fi provisioning for headless devices
//!
//! This crate contains the connection logic shared by every board: it has NO
//! hardware dependencies and reaches the radio, flash store and time-sync
//! client only through the traits in `provision-hal`.
//!
//! - **`provisioner`**: stored-credential attempt, broadcast fallback, event handling
//! - **`retry`**: bounded reconnect policy
//! - **`signal`**: rendezvous between the event handler and the waiting task
//! - **`events`**: connection events and their bus
//! - **`post_connect`**: time sync and timezone setup once online
//! - **`time`**: process-wide timezone, sync status and local time formatting

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first: the logging macros are textually scoped
#[macro_use]
mod fmt;

pub mod config;
pub mod error;
pub mod events;
pub mod post_connect;
pub mod provisioner;
pub mod retry;
pub mod signal;
pub mod time;

#[cfg(test)]
mod mock;

// Re-export commonly used types
pub use config::{ConnectionConfig, HOSTNAME_MAX_LEN, TIMEZONE_KEY};
pub use error::ProvisionError;
pub use events::{BroadcastCredentials, ConnectionEvent, EventBus, AUX_DATA_MAX_LEN};
pub use provisioner::{ProvisionState, Provisioner};
pub use retry::{RetryAction, RetryPolicy, MAX_RETRY};
pub use signal::{Rendezvous, SignalBits};
pub use time::{Timezone, Timestamp};
