#![deny(unsafe_code)]
//! Durable key-value store trait
//!
//! Values survive power loss. Keys are split into a namespace and a name so
//! that the provisioning data cannot collide with other subsystems sharing
//! the same flash partition.

/// Namespaced store key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoreKey {
    /// Subsystem namespace (at most 15 bytes on typical flash KV stores)
    pub namespace: &'static str,
    /// Entry name within the namespace
    pub name: &'static str,
}

impl StoreKey {
    /// Create a key
    pub const fn new(namespace: &'static str, name: &'static str) -> Self {
        Self { namespace, name }
    }
}

/// Store operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Store used before `init`
    NotInitialized,
    /// Partition has no free pages; must be erased before use
    NoFreePages,
    /// Partition was written by an incompatible format version; must be erased
    NewVersionFound,
    /// No value under the requested key
    NotFound,
    /// Caller buffer cannot hold the stored value
    BufferTooSmall,
    /// Read failed at the flash layer
    ReadFailed,
    /// Write or commit failed at the flash layer
    WriteFailed,
}

impl StoreError {
    /// Whether the partition must be erased before `init` can succeed
    pub const fn needs_erase(self) -> bool {
        matches!(self, Self::NoFreePages | Self::NewVersionFound)
    }
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "Store not initialized"),
            Self::NoFreePages => write!(f, "No free pages"),
            Self::NewVersionFound => write!(f, "Incompatible store version"),
            Self::NotFound => write!(f, "Key not found"),
            Self::BufferTooSmall => write!(f, "Buffer too small"),
            Self::ReadFailed => write!(f, "Read failed"),
            Self::WriteFailed => write!(f, "Write failed"),
        }
    }
}

impl core::error::Error for StoreError {}

/// Power-loss durable key-value store
pub trait CredentialStore {
    /// Mount the partition
    fn init(&mut self) -> Result<(), StoreError>;

    /// Wipe the whole partition
    fn erase(&mut self) -> Result<(), StoreError>;

    /// Copy the value stored under `key` into `buf`, returning its length
    fn get(&self, key: StoreKey, buf: &mut [u8]) -> Result<usize, StoreError>;

    /// Store `value` under `key`; returns only once the write is committed
    fn set(&mut self, key: StoreKey, value: &[u8]) -> Result<(), StoreError>;
}
