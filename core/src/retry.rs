#![deny(unsafe_code)]
//! Bounded reconnect policy

/// Consecutive disconnects tolerated per connection phase
pub const MAX_RETRY: u8 = 5;

/// Decision taken on a station disconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RetryAction {
    /// Re-issue the connect command
    Retry,
    /// Stop reconnecting and fail the phase
    GiveUp,
}

/// Counts consecutive disconnects since the last reset
///
/// Pure decision logic: callers perform the reconnect or raise the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    count: u8,
    limit: u8,
}

impl RetryPolicy {
    /// Policy with the default limit
    pub const fn new() -> Self {
        Self::with_limit(MAX_RETRY)
    }

    /// Policy tolerating `limit` consecutive disconnects
    pub const fn with_limit(limit: u8) -> Self {
        Self { count: 0, limit }
    }

    /// Account for one disconnect
    ///
    /// The counter stops at the limit; once there every call gives up until
    /// the policy is reset.
    pub fn on_disconnect(&mut self) -> RetryAction {
        if self.count < self.limit {
            self.count += 1;
            RetryAction::Retry
        } else {
            RetryAction::GiveUp
        }
    }

    /// An IP address was acquired
    pub fn on_connected(&mut self) {
        self.reset();
    }

    /// Start a new phase
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Disconnects counted since the last reset
    pub const fn count(&self) -> u8 {
        self.count
    }

    /// Configured limit
    pub const fn limit(&self) -> u8 {
        self.limit
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}
