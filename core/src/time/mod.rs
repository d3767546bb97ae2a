//! Process-wide time state
//!
//! Holds what the post-connect initializer produces: the timezone applied to
//! local time formatting and the latest clock synchronization reported by the
//! time-sync client. Both live in `critical_section` statics because the sync
//! callback is a plain `fn` invoked from the network stack's context.
#![deny(unsafe_code)]

pub mod calendar;
pub mod zone;

use core::cell::{Cell, RefCell};
use core::fmt::Write;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use heapless::String;

pub use calendar::{CivilDateTime, Weekday};
pub use provision_hal::Timestamp;
pub use zone::{Timezone, ZoneOffset};

/// Length of `YYYY-MM-DDTHH:MM:SS+HH:MM` with room for wide years
pub const LOCAL_TIME_STR_LEN: usize = 32;

static TIMEZONE: Mutex<RefCell<Option<Timezone>>> = Mutex::new(RefCell::new(None));
static LAST_SYNC: Mutex<Cell<Option<Timestamp>>> = Mutex::new(Cell::new(None));
static TIME_SYNCED: AtomicBool = AtomicBool::new(false);

/// Make `tz` the timezone used for local time
pub fn apply_timezone(tz: Timezone) {
    critical_section::with(|cs| {
        TIMEZONE.borrow(cs).replace(Some(tz));
    });
}

/// Timezone currently applied, if any
pub fn current_timezone() -> Option<Timezone> {
    critical_section::with(|cs| TIMEZONE.borrow(cs).borrow().clone())
}

/// Drop the applied timezone; local time falls back to UTC
pub fn clear_timezone() {
    critical_section::with(|cs| {
        TIMEZONE.borrow(cs).replace(None);
    });
}

/// Sync notification registered with the time-sync client
///
/// Records the corrected time and logs it in local time.
pub fn on_time_synced(ts: Timestamp) {
    critical_section::with(|cs| LAST_SYNC.borrow(cs).set(Some(ts)));
    TIME_SYNCED.store(true, Ordering::Release);

    let local = format_local(ts);
    info!("Time synchronized: {}", local.as_str());
}

/// Whether at least one synchronization completed
pub fn is_time_synced() -> bool {
    TIME_SYNCED.load(Ordering::Acquire)
}

/// Time reported by the latest synchronization
pub fn last_sync() -> Option<Timestamp> {
    critical_section::with(|cs| LAST_SYNC.borrow(cs).get())
}

/// Forget all synchronization state
pub fn reset_sync_state() {
    critical_section::with(|cs| LAST_SYNC.borrow(cs).set(None));
    TIME_SYNCED.store(false, Ordering::Release);
}

/// Civil time in the applied timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocalDateTime {
    /// Wall-clock date and time
    pub datetime: CivilDateTime,
    /// Offset from UTC, seconds east
    pub offset_secs: i32,
    /// Whether daylight saving time applies
    pub is_dst: bool,
}

/// Convert `ts` to local time using the applied timezone (UTC if none)
pub fn local_datetime(ts: Timestamp) -> LocalDateTime {
    let unix = i64::try_from(ts.unix_secs).unwrap_or(i64::MAX / 2);
    let offset = critical_section::with(|cs| {
        TIMEZONE
            .borrow(cs)
            .borrow()
            .as_ref()
            .map(|tz| tz.offset_at(unix))
    })
    .unwrap_or(ZoneOffset {
        offset_secs: 0,
        is_dst: false,
    });

    LocalDateTime {
        datetime: calendar::civil_from_unix(unix.saturating_add(offset.offset_secs as i64)),
        offset_secs: offset.offset_secs,
        is_dst: offset.is_dst,
    }
}

/// Format `ts` as ISO-8601 local time with offset, e.g. `2024-07-01T14:00:00+02:00`
pub fn format_local(ts: Timestamp) -> String<LOCAL_TIME_STR_LEN> {
    let local = local_datetime(ts);
    let dt = local.datetime;
    let sign = if local.offset_secs < 0 { '-' } else { '+' };
    let abs = local.offset_secs.unsigned_abs();

    let mut out = String::new();
    // Cannot overflow: the longest rendering is 28 bytes
    let _ = write!(
        out,
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}{:02}:{:02}",
        dt.year,
        dt.month,
        dt.day,
        dt.hour,
        dt.minute,
        dt.second,
        sign,
        abs / 3600,
        (abs % 3600) / 60
    );
    out
}
