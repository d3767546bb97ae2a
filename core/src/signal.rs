#![deny(unsafe_code)]
//! Rendezvous between the event handler and the waiting state machine
//!
//! Works like an RTOS event group: the handler raises independent bits, the
//! waiter suspends until any bit of interest is set and consumes the bits it
//! was waiting for. Bits outside the wait mask are left untouched.

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::WakerRegistration;

/// Set of rendezvous flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalBits(u8);

impl SignalBits {
    /// No flag set
    pub const NONE: Self = Self(0);
    /// Station holds an IP address
    pub const CONNECTED: Self = Self(1 << 0);
    /// Current phase failed
    pub const FAILED: Self = Self(1 << 1);
    /// Broadcast handshake completed on the device side
    pub const BROADCAST_DONE: Self = Self(1 << 2);

    /// Every flag
    pub const ALL: Self = Self(Self::CONNECTED.0 | Self::FAILED.0 | Self::BROADCAST_DONE.0);

    /// Whether all flags in `other` are set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flag is set
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Flags set in both
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Flags set in either
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Flags of `self` not in `other`
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Highest priority flag: `CONNECTED`, then `FAILED`, then `BROADCAST_DONE`
    pub const fn highest(self) -> Option<Self> {
        if self.contains(Self::CONNECTED) {
            Some(Self::CONNECTED)
        } else if self.contains(Self::FAILED) {
            Some(Self::FAILED)
        } else if self.contains(Self::BROADCAST_DONE) {
            Some(Self::BROADCAST_DONE)
        } else {
            None
        }
    }
}

impl core::ops::BitOr for SignalBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

struct State {
    bits: SignalBits,
    waker: WakerRegistration,
}

/// Flag set with a single suspended waiter
///
/// `raise` may be called from any context that can take the raw mutex
/// (`CriticalSectionRawMutex` for interrupt-priority callbacks). Only one task
/// may wait at a time; a second waiter replaces the first one's waker.
pub struct Rendezvous<M: RawMutex> {
    state: Mutex<M, RefCell<State>>,
}

impl<M: RawMutex> Rendezvous<M> {
    /// Create with no flag set
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State {
                bits: SignalBits::NONE,
                waker: WakerRegistration::new(),
            })),
        }
    }

    /// Set flags and wake the waiter
    pub fn raise(&self, bits: SignalBits) {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            state.bits = state.bits.union(bits);
            state.waker.wake();
        });
    }

    /// Currently set flags, without consuming them
    pub fn peek(&self) -> SignalBits {
        self.state.lock(|cell| cell.borrow().bits)
    }

    /// Consume and return the flags of `mask` that are set now
    pub fn take(&self, mask: SignalBits) -> SignalBits {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            let hit = state.bits.intersection(mask);
            state.bits = state.bits.difference(hit);
            hit
        })
    }

    /// Suspend until any flag of `mask` is set, then consume those flags
    ///
    /// Returns the consumed flags; never empty. There is no timeout.
    pub async fn wait_any(&self, mask: SignalBits) -> SignalBits {
        poll_fn(|cx| {
            self.state.lock(|cell| {
                let mut state = cell.borrow_mut();
                let hit = state.bits.intersection(mask);
                if hit.is_empty() {
                    state.waker.register(cx.waker());
                    Poll::Pending
                } else {
                    state.bits = state.bits.difference(hit);
                    Poll::Ready(hit)
                }
            })
        })
        .await
    }
}

impl<M: RawMutex> Default for Rendezvous<M> {
    fn default() -> Self {
        Self::new()
    }
}
