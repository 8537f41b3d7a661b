use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use time::{Date, Month, OffsetDateTime, UtcOffset};

pub fn localized_datetime(time: OffsetDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    let utc = time.to_offset(UtcOffset::UTC);
    let datetime_utc = DateTime::<Utc>::from_timestamp(utc.unix_timestamp(), utc.nanosecond())?;
    Some(tz.from_utc_datetime(&datetime_utc.naive_utc()))
}

/// Calendar date of `time` as observed in `tz`.
pub fn localized_date(time: OffsetDateTime, tz: Tz) -> Option<Date> {
    let localized = localized_datetime(time, tz)?;
    let month = Month::try_from(u8::try_from(localized.month()).ok()?).ok()?;
    let day = u8::try_from(localized.day()).ok()?;
    Date::from_calendar_date(localized.year(), month, day).ok()
}
