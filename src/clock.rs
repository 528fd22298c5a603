//! The source of "now" and "today" for the scheduler.
//!
//! All dates are taken in a single reference timezone so that a schedule is
//! due on the same calendar day no matter where the batch job runs.

use time::{Date, OffsetDateTime};
use time_tz::Tz;

use crate::{
    Error,
    timezone::{get_timezone, offset_at},
};

/// Supplies the current instant and date.
pub trait Clock {
    /// The current instant in the clock's reference timezone.
    fn now(&self) -> OffsetDateTime;

    /// The current calendar date in the clock's reference timezone.
    fn today(&self) -> Date {
        self.now().date()
    }
}

/// A [Clock] backed by the system time, reported in a fixed IANA timezone.
#[derive(Clone, Copy)]
pub struct SystemClock {
    timezone: &'static Tz,
}

impl SystemClock {
    /// Create a clock for `canonical_timezone`, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezoneError] if the name is not a canonical timezone.
    pub fn new(canonical_timezone: &str) -> Result<Self, Error> {
        get_timezone(canonical_timezone)
            .map(|timezone| Self { timezone })
            .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        now.to_offset(offset_at(self.timezone, now))
    }
}

/// A [Clock] frozen at a single instant.
///
/// Used for tests and for re-running the scheduler for a specific past date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedClock(pub OffsetDateTime);

impl FixedClock {
    /// A clock frozen at midnight UTC on `date`.
    pub fn at_date(date: Date) -> Self {
        Self(date.midnight().assume_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}
