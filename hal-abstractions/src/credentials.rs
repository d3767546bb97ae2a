#![deny(unsafe_code)]
//! Station credentials as held by the driver's persistent configuration

use heapless::Vec;

/// Maximum SSID length in bytes (IEEE 802.11)
pub const SSID_MAX_LEN: usize = 32;

/// Maximum WPA passphrase length in bytes
pub const PASSWORD_MAX_LEN: usize = 64;

/// Raw SSID bytes (not necessarily UTF-8)
pub type Ssid = Vec<u8, SSID_MAX_LEN>;

/// Raw passphrase bytes
pub type Password = Vec<u8, PASSWORD_MAX_LEN>;

/// Access point MAC address
pub type Bssid = [u8; 6];

/// Credentials construction errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CredentialsError {
    /// SSID longer than 32 bytes
    SsidTooLong,
    /// Password longer than 64 bytes
    PasswordTooLong,
}

impl core::fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SsidTooLong => write!(f, "SSID exceeds {} bytes", SSID_MAX_LEN),
            Self::PasswordTooLong => write!(f, "password exceeds {} bytes", PASSWORD_MAX_LEN),
        }
    }
}

impl core::error::Error for CredentialsError {}

/// Station credentials
///
/// An empty SSID means "nothing stored": the driver has never been given a
/// network to join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoredCredentials {
    /// Network name
    pub ssid: Ssid,
    /// Passphrase (empty for open networks)
    pub password: Password,
    /// Pin the association to one access point
    pub bssid: Option<Bssid>,
}

impl StoredCredentials {
    /// Build credentials from byte slices, rejecting over-long fields
    pub fn new(ssid: &[u8], password: &[u8]) -> Result<Self, CredentialsError> {
        Ok(Self {
            ssid: Vec::from_slice(ssid).map_err(|_| CredentialsError::SsidTooLong)?,
            password: Vec::from_slice(password).map_err(|_| CredentialsError::PasswordTooLong)?,
            bssid: None,
        })
    }

    /// True when no network has been configured
    pub fn is_empty(&self) -> bool {
        self.ssid.is_empty()
    }

    /// SSID as text, if it is valid UTF-8
    pub fn ssid_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.ssid).ok()
    }
}
