//! Resolving canonical timezone names to UTC offsets.

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone, Tz};

/// Look up a timezone by its canonical name, e.g. "Pacific/Auckland".
pub fn get_timezone(canonical_timezone: &str) -> Option<&'static Tz> {
    time_tz::timezones::get_by_name(canonical_timezone)
}

/// The UTC offset of `tz` at `instant`, accounting for daylight saving.
pub fn offset_at(tz: &Tz, instant: OffsetDateTime) -> UtcOffset {
    tz.get_offset_utc(&instant).to_utc()
}
