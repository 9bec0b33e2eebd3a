use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

fn digit_at(bytes: &[u8], position: usize) -> u32 {
    bytes
        .get(position)
        .map_or(0, |byte| u32::from(byte.wrapping_sub(b'0')))
}

/// Decodes `"hh:mm"` or `"hh:mm:ss"` clock text into seconds by reading the
/// digit positions directly. Input is assumed well-formed; characters are not
/// validated, so malformed text produces garbage numbers rather than an error.
pub(crate) fn time_to_seconds(text: &str) -> u32 {
    let bytes = text.as_bytes();
    let hours = digit_at(bytes, 0) * 10 + digit_at(bytes, 1);
    let minutes = digit_at(bytes, 3) * 10 + digit_at(bytes, 4);
    let mut seconds = hours * 3600 + minutes * 60;
    if bytes.len() >= 8 {
        seconds += digit_at(bytes, 6) * 10 + digit_at(bytes, 7);
    }
    seconds
}

/// Combines a calendar date and seconds-from-midnight into an absolute
/// instant in the given timezone. Ambiguous local times (DST fold) resolve to
/// the earliest instant; nonexistent ones yield `None`.
pub(crate) fn local_instant(date: NaiveDate, seconds: u32, timezone: Tz) -> Option<DateTime<Tz>> {
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?;
    timezone.from_local_datetime(&date.and_time(time)).earliest()
}
