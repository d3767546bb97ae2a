//! POSIX `TZ` timezone rules
//!
//! The broadcast payload carries a timezone as a POSIX `TZ` string, e.g.
//! `CET-1CEST,M3.5.0,M10.5.0/3`. Format:
//!
//! ```text
//! std offset [dst [offset] [,start[/time],end[/time]]]
//! ```
//!
//! - names are three or more letters, or `<...>` quoted (`<+0330>`)
//! - offsets are `[+-]hh[:mm[:ss]]` and count hours *west* of UTC
//! - rules are `Mm.w.d` (week `w` of month `m`, weekday `d`, 5 = last),
//!   `Jn` (1-365, February 29 never counted) or `n` (0-365)
//! - a DST zone without rules follows `M3.2.0,M11.1.0`
//!
//! Strings that do not parse (IANA names such as `Europe/Berlin`) are kept by
//! name and behave as UTC, matching the C library.
#![deny(unsafe_code)]

use heapless::String;

use super::calendar::{days_from_civil, days_in_month, is_leap_year, weekday_from_days};

/// Longest timezone string kept
pub const TZ_MAX_LEN: usize = 64;

/// Longest zone abbreviation kept
pub const ZONE_NAME_MAX_LEN: usize = 16;

const DEFAULT_TRANSITION_SECS: i32 = 2 * 3600;
const MAX_OFFSET_HOURS: i32 = 24;
const MAX_TRANSITION_HOURS: i32 = 167;

/// Zone abbreviation (`CET`, `+0330`)
pub type ZoneName = String<ZONE_NAME_MAX_LEN>;

/// Day selector of a DST transition rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RuleDate {
    /// `Jn`: 1-365, February 29 is never counted
    Julian(u16),
    /// `n`: zero-based day of year, 0-365
    DayOfYear(u16),
    /// `Mm.w.d`: weekday `d` of week `w` (5 = last) in month `m`
    MonthWeekDay {
        /// Month, 1-12
        month: u8,
        /// Week, 1-5
        week: u8,
        /// Weekday, 0 = Sunday
        weekday: u8,
    },
}

/// One DST transition: a day plus local wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    /// Day selector
    pub date: RuleDate,
    /// Seconds after local midnight (may be negative or beyond 24h)
    pub time_secs: i32,
}

impl Transition {
    /// Seconds from the epoch to local midnight of the selected day in `year`
    fn local_day_start(&self, year: i32) -> i64 {
        let jan1 = days_from_civil(year, 1, 1);
        let day = match self.date {
            RuleDate::Julian(n) => {
                let mut doy = n as i64 - 1;
                if is_leap_year(year) && n >= 60 {
                    doy += 1;
                }
                jan1 + doy
            }
            RuleDate::DayOfYear(n) => jan1 + n as i64,
            RuleDate::MonthWeekDay {
                month,
                week,
                weekday,
            } => {
                let first = days_from_civil(year, month, 1);
                let first_wd = weekday_from_days(first).0;
                let mut mday = 1 + ((weekday + 7 - first_wd) % 7) as i64 + (week as i64 - 1) * 7;
                let last = days_in_month(year, month) as i64;
                while mday > last {
                    mday -= 7;
                }
                first + mday - 1
            }
        };
        day * 86_400
    }

    /// UTC instant of this transition in `year`, given the offset in force before it
    fn utc_instant(&self, year: i32, offset_before: i32) -> i64 {
        self.local_day_start(year) + self.time_secs as i64 - offset_before as i64
    }
}

/// Daylight saving part of a zone
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DaylightRule {
    /// DST abbreviation
    pub name: ZoneName,
    /// Seconds east of UTC while DST is in force
    pub offset_secs: i32,
    /// Switch to DST
    pub start: Transition,
    /// Switch back to standard time
    pub end: Transition,
}

/// Timezone applied to local time formatting
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timezone {
    raw: String<TZ_MAX_LEN>,
    std_name: ZoneName,
    std_offset_secs: i32,
    dst: Option<DaylightRule>,
    posix: bool,
}

/// Offset in force at an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ZoneOffset {
    /// Seconds east of UTC
    pub offset_secs: i32,
    /// Whether daylight saving time applies
    pub is_dst: bool,
}

impl Timezone {
    /// Coordinated Universal Time
    pub fn utc() -> Self {
        let mut raw = String::new();
        let _ = raw.push_str("UTC0");
        let mut std_name = String::new();
        let _ = std_name.push_str("UTC");
        Self {
            raw,
            std_name,
            std_offset_secs: 0,
            dst: None,
            posix: true,
        }
    }

    /// Interpret a `TZ` value
    ///
    /// Never fails: unparseable values become a UTC zone that keeps the text
    /// (truncated to [`TZ_MAX_LEN`] bytes).
    pub fn parse(tz: &str) -> Self {
        let mut raw = String::new();
        for c in tz.chars() {
            if raw.push(c).is_err() {
                break;
            }
        }

        match Parser::new(tz).zone() {
            Some((std_name, std_offset_secs, dst)) => Self {
                raw,
                std_name,
                std_offset_secs,
                dst,
                posix: true,
            },
            None => {
                let mut std_name = String::new();
                let _ = std_name.push_str("UTC");
                Self {
                    raw,
                    std_name,
                    std_offset_secs: 0,
                    dst: None,
                    posix: false,
                }
            }
        }
    }

    /// The value as it was stored
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the value was a valid POSIX `TZ` string
    pub fn is_posix(&self) -> bool {
        self.posix
    }

    /// Standard time abbreviation
    pub fn std_name(&self) -> &str {
        &self.std_name
    }

    /// Standard offset, seconds east of UTC
    pub fn std_offset_secs(&self) -> i32 {
        self.std_offset_secs
    }

    /// Daylight saving rule, if the zone has one
    pub fn dst(&self) -> Option<&DaylightRule> {
        self.dst.as_ref()
    }

    /// Offset in force at `unix_secs`
    pub fn offset_at(&self, unix_secs: i64) -> ZoneOffset {
        let standard = ZoneOffset {
            offset_secs: self.std_offset_secs,
            is_dst: false,
        };
        let Some(rule) = &self.dst else {
            return standard;
        };

        let local = unix_secs.saturating_add(self.std_offset_secs as i64);
        let (year, _, _) = super::calendar::civil_from_days(local.div_euclid(86_400));

        // Start is given in standard time, end in daylight time
        let start = rule.start.utc_instant(year, self.std_offset_secs);
        let end = rule.end.utc_instant(year, rule.offset_secs);

        let in_dst = if start < end {
            unix_secs >= start && unix_secs < end
        } else {
            // Southern hemisphere: DST spans the new year
            !(unix_secs >= end && unix_secs < start)
        };

        if in_dst {
            ZoneOffset {
                offset_secs: rule.offset_secs,
                is_dst: true,
            }
        } else {
            standard
        }
    }

    /// Abbreviation in force at `unix_secs`
    pub fn name_at(&self, unix_secs: i64) -> &str {
        match &self.dst {
            Some(rule) if self.offset_at(unix_secs).is_dst => &rule.name,
            _ => &self.std_name,
        }
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self::utc()
    }
}

/// Byte-level parser over a `TZ` string
struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            bytes: s.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }

    /// Full zone: returns (std name, std offset east, dst rule)
    fn zone(&mut self) -> Option<(ZoneName, i32, Option<DaylightRule>)> {
        let std_name = self.name()?;
        let std_offset = -self.offset(MAX_OFFSET_HOURS)?;
        if self.at_end() {
            return Some((std_name, std_offset, None));
        }

        let dst_name = self.name()?;
        let dst_offset = match self.peek() {
            Some(b'+' | b'-' | b'0'..=b'9') => -self.offset(MAX_OFFSET_HOURS)?,
            _ => std_offset + 3600,
        };

        let (start, end) = if self.eat(b',') {
            let start = self.transition()?;
            if !self.eat(b',') {
                return None;
            }
            let end = self.transition()?;
            (start, end)
        } else {
            // US rules, as the C library assumes
            (
                Transition {
                    date: RuleDate::MonthWeekDay {
                        month: 3,
                        week: 2,
                        weekday: 0,
                    },
                    time_secs: DEFAULT_TRANSITION_SECS,
                },
                Transition {
                    date: RuleDate::MonthWeekDay {
                        month: 11,
                        week: 1,
                        weekday: 0,
                    },
                    time_secs: DEFAULT_TRANSITION_SECS,
                },
            )
        };

        if !self.at_end() {
            return None;
        }

        Some((
            std_name,
            std_offset,
            Some(DaylightRule {
                name: dst_name,
                offset_secs: dst_offset,
                start,
                end,
            }),
        ))
    }

    fn name(&mut self) -> Option<ZoneName> {
        let mut name = ZoneName::new();
        if self.eat(b'<') {
            while let Some(b) = self.peek() {
                self.pos += 1;
                match b {
                    b'>' => return (name.len() >= 3).then_some(name),
                    b'+' | b'-' | b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' => {
                        name.push(b as char).ok()?;
                    }
                    _ => return None,
                }
            }
            None
        } else {
            while let Some(b) = self.peek() {
                if !b.is_ascii_alphabetic() {
                    break;
                }
                name.push(b as char).ok()?;
                self.pos += 1;
            }
            (name.len() >= 3).then_some(name)
        }
    }

    fn number(&mut self, max_digits: usize) -> Option<i32> {
        let start = self.pos;
        let mut value: i32 = 0;
        while let Some(b @ b'0'..=b'9') = self.peek() {
            if self.pos - start == max_digits {
                return None;
            }
            value = value * 10 + (b - b'0') as i32;
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }

    /// `[+-]hh[:mm[:ss]]` in seconds, as written (west positive)
    fn offset(&mut self, max_hours: i32) -> Option<i32> {
        let sign = if self.eat(b'-') {
            -1
        } else {
            self.eat(b'+');
            1
        };
        let hours = self.number(3)?;
        if hours > max_hours {
            return None;
        }
        let mut secs = hours * 3600;
        if self.eat(b':') {
            let minutes = self.number(2)?;
            if minutes > 59 {
                return None;
            }
            secs += minutes * 60;
            if self.eat(b':') {
                let seconds = self.number(2)?;
                if seconds > 59 {
                    return None;
                }
                secs += seconds;
            }
        }
        Some(sign * secs)
    }

    fn transition(&mut self) -> Option<Transition> {
        let date = if self.eat(b'M') {
            let month = self.number(2)?;
            if !self.eat(b'.') {
                return None;
            }
            let week = self.number(1)?;
            if !self.eat(b'.') {
                return None;
            }
            let weekday = self.number(1)?;
            if !(1..=12).contains(&month) || !(1..=5).contains(&week) || weekday > 6 {
                return None;
            }
            RuleDate::MonthWeekDay {
                month: month as u8,
                week: week as u8,
                weekday: weekday as u8,
            }
        } else if self.eat(b'J') {
            let n = self.number(3)?;
            if !(1..=365).contains(&n) {
                return None;
            }
            RuleDate::Julian(n as u16)
        } else {
            let n = self.number(3)?;
            if n > 365 {
                return None;
            }
            RuleDate::DayOfYear(n as u16)
        };

        let time_secs = if self.eat(b'/') {
            self.offset(MAX_TRANSITION_HOURS)?
        } else {
            DEFAULT_TRANSITION_SECS
        };

        Some(Transition { date, time_secs })
    }
}
