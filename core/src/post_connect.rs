#![deny(unsafe_code)]
//! Initialization that needs a working connection
//!
//! Both steps are independent of the state machine and can be called directly
//! with any collaborator; [`Provisioner`](crate::Provisioner) wraps them with
//! its own configuration and store.

use provision_hal::{CredentialStore, SyncMode, TimeSyncClient};

use crate::config::TIMEZONE_KEY;
use crate::error::ProvisionError;
use crate::events::AUX_DATA_MAX_LEN;
use crate::time::{self, Timezone};

/// Configure and start the time-sync client against `server`
///
/// The client polls the server and reports every correction to
/// [`time::on_time_synced`].
pub fn init_time_sync<T: TimeSyncClient>(
    client: &mut T,
    server: &str,
) -> Result<(), ProvisionError> {
    info!("Initializing time sync against {}", server);

    client.set_mode(SyncMode::Poll).map_err(|e| {
        error!("Time sync mode rejected: {:?}", e);
        ProvisionError::Driver
    })?;
    client.set_server(server).map_err(|e| {
        error!("Time sync server rejected: {:?}", e);
        ProvisionError::Driver
    })?;
    client
        .register_callback(time::on_time_synced)
        .map_err(|e| {
            error!("Time sync callback rejected: {:?}", e);
            ProvisionError::Driver
        })?;
    client.start().map_err(|e| {
        error!("Time sync start failed: {:?}", e);
        ProvisionError::Driver
    })
}

/// Read the persisted timezone and apply it to local time formatting
///
/// Returns `NotFound` without touching the applied timezone when nothing was
/// stored, and `InvalidData` when the stored bytes are not UTF-8.
pub fn init_timezone<S: CredentialStore>(store: &S) -> Result<Timezone, ProvisionError> {
    let mut buf = [0u8; AUX_DATA_MAX_LEN];
    let len = store.get(TIMEZONE_KEY, &mut buf).map_err(|e| {
        let e = ProvisionError::from(e);
        if e != ProvisionError::NotFound {
            error!("Timezone read failed: {:?}", e);
        }
        e
    })?;

    // Stores may keep a C string terminator
    let value = buf.get(..len).ok_or(ProvisionError::InvalidData)?;
    let raw = value.split(|&b| b == 0).next().unwrap_or(&[]);
    let tz_str = core::str::from_utf8(raw).map_err(|_| {
        error!("Stored timezone is not UTF-8");
        ProvisionError::InvalidData
    })?;

    let tz = Timezone::parse(tz_str);
    if !tz.is_posix() {
        warn!("Timezone {} is not a POSIX TZ string, using UTC", tz_str);
    }
    time::apply_timezone(tz.clone());
    info!("Timezone set to {}", tz_str);

    Ok(tz)
}
